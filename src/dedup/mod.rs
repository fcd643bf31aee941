//! Near-duplicate detection
//!
//! Documents are compared by the Jaccard similarity of their shingle sets.
//! Each new document is checked pairwise against every document already
//! accepted, which is fine for the tens of documents a run produces.

mod signature;

pub use signature::SimilaritySignature;

use crate::config::ContentConfig;
use crate::extract::ExtractedDocument;

/// Returns true if `signature` is at least `threshold` similar to any corpus entry
pub fn is_duplicate(
    signature: &SimilaritySignature,
    corpus: &[SimilaritySignature],
    threshold: f64,
) -> bool {
    corpus
        .iter()
        .any(|existing| signature.jaccard(existing) >= threshold)
}

/// Keeps the signatures of accepted documents and rejects near-copies
#[derive(Debug, Clone)]
pub struct Deduplicator {
    threshold: f64,
    shingle_size: usize,
    corpus: Vec<SimilaritySignature>,
}

impl Deduplicator {
    pub fn new(threshold: f64, shingle_size: usize) -> Self {
        Self {
            threshold,
            shingle_size: shingle_size.max(1),
            corpus: Vec::new(),
        }
    }

    pub fn from_config(config: &ContentConfig) -> Self {
        Self::new(config.duplicate_threshold, config.shingle_size)
    }

    /// Signature of a document's text
    pub fn signature(&self, doc: &ExtractedDocument) -> SimilaritySignature {
        SimilaritySignature::from_text(&doc.text, self.shingle_size)
    }

    /// Checks a signature against the accepted corpus
    pub fn is_duplicate(&self, signature: &SimilaritySignature) -> bool {
        is_duplicate(signature, &self.corpus, self.threshold)
    }

    /// Accepts `doc` unless it duplicates an accepted document
    ///
    /// Returns true when the document was accepted.
    pub fn admit(&mut self, doc: &ExtractedDocument) -> bool {
        let signature = self.signature(doc);
        if self.is_duplicate(&signature) {
            tracing::debug!("Dropping near-duplicate {}", doc.url);
            return false;
        }
        self.corpus.push(signature);
        true
    }

    /// Number of accepted documents
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}
