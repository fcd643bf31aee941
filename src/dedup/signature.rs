//! Shingle signatures and Jaccard similarity

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Hashed token shingles for one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimilaritySignature {
    shingles: HashSet<u64>,
}

impl SimilaritySignature {
    /// Builds a signature from `shingle_size`-token windows over `text`
    ///
    /// Tokens are lowercased with surrounding punctuation trimmed. Text
    /// shorter than one window yields a single shingle; text without tokens
    /// yields an empty signature.
    pub fn from_text(text: &str, shingle_size: usize) -> Self {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| !t.is_empty())
            .collect();

        let size = shingle_size.max(1);
        let shingles = if tokens.is_empty() {
            HashSet::new()
        } else if tokens.len() < size {
            std::iter::once(hash_window(&tokens)).collect()
        } else {
            tokens.windows(size).map(hash_window).collect()
        };

        Self { shingles }
    }

    /// |A ∩ B| / |A ∪ B|; two empty signatures score 0
    pub fn jaccard(&self, other: &Self) -> f64 {
        if self.shingles.is_empty() && other.shingles.is_empty() {
            return 0.0;
        }

        let intersection = self.shingles.intersection(&other.shingles).count();
        let union = self.shingles.len() + other.shingles.len() - intersection;
        intersection as f64 / union as f64
    }

    pub fn len(&self) -> usize {
        self.shingles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shingles.is_empty()
    }
}

fn hash_window(window: &[&str]) -> u64 {
    let mut hasher = DefaultHasher::new();
    window.hash(&mut hasher);
    hasher.finish()
}
