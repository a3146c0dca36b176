use std::fmt;
use nr_core::{EmbeddingModel, Error, Result};
use sha2::{Digest, Sha256};

const TRIGRAM_WEIGHT: f32 = 0.5;

/// Offline embedding model built from hashed word and character-trigram features.
///
/// Texts sharing most of their words land close together, which is all the
/// deduplicator and ranker need when no real model is configured.
pub struct HashingModel {
    dimension: usize,
}

impl fmt::Debug for HashingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashingModel")
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl HashingModel {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::Config("embedding dimension must be greater than 0".to_string()));
        }
        Ok(Self { dimension })
    }

    fn add_feature(&self, embedding: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let hash = u64::from_le_bytes(bytes);

        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign * weight;
    }
}

#[async_trait::async_trait]
impl EmbeddingModel for HashingModel {
    fn name(&self) -> &str {
        "hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0; self.dimension];
        let lowered = text.to_lowercase();

        for word in lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            self.add_feature(&mut embedding, word, 1.0);

            let chars: Vec<char> = format!("#{}#", word).chars().collect();
            for trigram in chars.windows(3) {
                let trigram: String = trigram.iter().collect();
                self.add_feature(&mut embedding, &trigram, TRIGRAM_WEIGHT);
            }
        }

        let norm = embedding.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(embedding)
    }
}
