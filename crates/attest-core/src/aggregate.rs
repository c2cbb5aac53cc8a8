//! Enrollment aggregation — one reference embedding from N captures.

use crate::types::{Embedding, EmbeddingError};

/// Strategy for combining per-capture embeddings of one person into a
/// single reference embedding. Swapping in a more robust aggregator
/// (median-of-components, trimmed mean) must not change callers.
pub trait Aggregator {
    fn aggregate(&self, samples: &[Embedding]) -> Result<Embedding, EmbeddingError>;
}

/// Componentwise arithmetic mean across samples.
///
/// Averaging multiple captures of the same face reduces per-shot noise
/// (lighting, pose). This is a known approximation, not an
/// outlier-robust centroid: a single bad capture still shifts the
/// reference.
pub struct MeanAggregator;

impl Aggregator for MeanAggregator {
    fn aggregate(&self, samples: &[Embedding]) -> Result<Embedding, EmbeddingError> {
        let first = samples.first().ok_or(EmbeddingError::EmptySampleSet)?;
        let dim = first.dim();

        for sample in samples {
            if sample.dim() != dim {
                return Err(EmbeddingError::DimensionMismatch {
                    left: dim,
                    right: sample.dim(),
                });
            }
        }

        let mut values = vec![0.0f32; dim];
        for sample in samples {
            for (acc, v) in values.iter_mut().zip(sample.values.iter()) {
                *acc += v;
            }
        }
        let n = samples.len() as f32;
        for acc in values.iter_mut() {
            *acc /= n;
        }

        Ok(Embedding {
            values,
            model_version: first.model_version.clone(),
        })
    }
}
