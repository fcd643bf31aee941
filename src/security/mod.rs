//! Security boundary for network and disk I/O
//!
//! This module provides:
//! - [`SecurityGuard::check_outbound`]: SSRF protection for every request and
//!   redirect hop
//! - [`check_output_path`]: path-traversal protection for anything the crate
//!   writes to disk (cache directory, report file)
//!
//! A block is never retried and only affects the URL or path at hand.

mod outbound;
mod paths;

pub use outbound::{is_non_public, SecurityGuard};
pub use paths::{check_output_path, default_allowed_roots, resolve_output_path, resolve_path};

use serde::{Serialize, Serializer};
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Why the guard refused an operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockReason {
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("hostname '{0}' is internal")]
    ForbiddenHostname(String),

    #[error("host '{host}' resolves to non-public address {addr}")]
    PrivateAddress { host: String, addr: IpAddr },

    #[error("path '{}' is outside the allowed roots", .0.display())]
    PathOutsideRoots(PathBuf),
}

impl Serialize for BlockReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block(BlockReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn is_blocked(&self) -> bool {
        !self.is_allowed()
    }

    /// Converts the verdict into a `Result` for `?` propagation
    pub fn into_result(self) -> Result<(), BlockReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Block(reason) => Err(reason),
        }
    }
}
