use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rand::RngCore as _;
use uuid::Uuid;

use attest_core::{EventKind, NewIdentity};
use attest_service::{spawn_engine, CommandExtractor, Config, Service};
use attest_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(name = "attest", about = "Face-verification attendance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll a new identity from sample face images
    Enroll {
        #[arg(long)]
        name: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        email: String,
        /// Sample images of the same face (3 recommended)
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Verify a live image against a claimed identity id
    Verify {
        id: Uuid,
        image: PathBuf,
    },
    /// Verify by email and print a session token on match
    Login {
        email: String,
        image: PathBuf,
    },
    /// Verify by email and record a check-in
    CheckIn {
        email: String,
        image: PathBuf,
    },
    /// Verify by email and record a check-out
    CheckOut {
        email: String,
        image: PathBuf,
    },
    /// List attendance events, newest first
    Attendance,
    /// List enrolled identities
    Identities,
    /// Generate a session-signing secret for ATTEST_SESSION_SECRET
    Secret,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // The secret generator must work before any configuration exists.
    if let Commands::Secret = cli.command {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        println!("{}", hex::encode(key));
        return Ok(());
    }

    let config = Config::from_env()?;
    let service = open_service(&config).await?;

    match cli.command {
        Commands::Enroll {
            name,
            department,
            email,
            images,
        } => {
            let samples = read_images(&images)?;
            let identity = service
                .enroll(NewIdentity { name, department, email }, &samples)
                .await?;
            println!("enrolled {} ({})", identity.name, identity.id);
        }
        Commands::Verify { id, image } => {
            let result = service.verify(id, &read_image(&image)?).await?;
            if result.recognized {
                println!("MATCH (confidence {:.3})", result.confidence);
            } else {
                println!("NO MATCH (confidence {:.3})", result.confidence);
            }
        }
        Commands::Login { email, image } => {
            let login = service.login(&email, &read_image(&image)?).await?;
            println!(
                "verified {} (confidence {:.3})",
                login.identity.name, login.confidence
            );
            println!("{}", login.token);
        }
        Commands::CheckIn { email, image } => {
            mark(&service, &email, &image, EventKind::CheckIn).await?;
        }
        Commands::CheckOut { email, image } => {
            mark(&service, &email, &image, EventKind::CheckOut).await?;
        }
        Commands::Attendance => {
            for event in service.attendance().await? {
                println!(
                    "{}  {:<9}  {}  (confidence {:.3})",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.kind.as_str(),
                    event.identity_name,
                    event.confidence
                );
            }
        }
        Commands::Identities => {
            for identity in service.identities().await? {
                println!(
                    "{}  {}  {} <{}>",
                    identity.id, identity.department, identity.name, identity.email
                );
            }
        }
        Commands::Secret => unreachable!("handled above"),
    }

    Ok(())
}

async fn open_service(config: &Config) -> Result<Service<SqliteStore>> {
    if let Some(dir) = config.db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;
    }
    let store = SqliteStore::open(&config.db_path)
        .await
        .with_context(|| format!("opening store at {}", config.db_path.display()))?;

    let extractor = CommandExtractor::new(config.extractor_cmd.clone());
    let engine = spawn_engine(extractor, Duration::from_secs(config.extract_timeout_secs));

    Ok(Service::new(store, engine, config))
}

/// One logical request: verify the face, then record the event with
/// the confidence from that same verification.
async fn mark(
    service: &Service<SqliteStore>,
    email: &str,
    image: &Path,
    kind: EventKind,
) -> Result<()> {
    let login = service.login(email, &read_image(image)?).await?;
    let event = service
        .mark_attendance(Some(login.token.as_str()), kind, login.confidence)
        .await?;
    println!(
        "{} recorded for {} at {} (confidence {:.3})",
        event.kind.as_str(),
        event.identity_name,
        event.timestamp.format("%H:%M:%S"),
        event.confidence
    );
    Ok(())
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading image {}", path.display()))
}

fn read_images(paths: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
    paths.iter().map(|path| read_image(path)).collect()
}
