//! URL handling module for doc-harvest
//!
//! This module provides URL normalization, domain extraction, wildcard host
//! matching, and the scoring/path rules used to prioritize documentation.

mod domain;
mod matcher;
mod normalize;
mod score;

pub use domain::{extract_domain, origin_key, same_origin};
pub use matcher::matches_wildcard;
pub use normalize::normalize_url;
pub use score::{
    clamp_score, is_binary_path, is_documentation_path, is_skipped_path, score_url,
    DOC_PATH_PATTERNS, SCORE_MAX, SCORE_MIN, SCORE_OFFICIAL_GUIDE, SCORE_SITEMAP_DOC,
    SKIP_PATH_PATTERNS,
};
