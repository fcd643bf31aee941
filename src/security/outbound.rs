//! Outbound request validation (SSRF protection)
//!
//! Every URL the fetcher is about to request, including each redirect hop,
//! passes through [`SecurityGuard::check_outbound`]. Literal IP hosts are
//! checked directly; hostnames are resolved and every resolved address must
//! be public.

use crate::security::{BlockReason, Verdict};
use crate::url::matches_wildcard;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Hostnames that always point at internal infrastructure
const FORBIDDEN_HOSTNAMES: &[&str] = &["localhost", "metadata.google.internal"];

/// Guards outbound requests and output paths
#[derive(Debug, Clone, Default)]
pub struct SecurityGuard {
    /// Host patterns exempt from the private-address rule
    trusted_hosts: Vec<String>,
}

impl SecurityGuard {
    /// Creates a guard with no trusted hosts
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a guard that lets the given host patterns reach private addresses
    ///
    /// Patterns use the same syntax as [`matches_wildcard`]. This exists for
    /// local mirrors and mock servers; production configs leave it empty.
    pub fn with_trusted_hosts<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trusted_hosts: patterns
                .into_iter()
                .map(|p| p.into().to_lowercase())
                .collect(),
        }
    }

    fn is_trusted(&self, host: &str) -> bool {
        self.trusted_hosts
            .iter()
            .any(|pattern| matches_wildcard(pattern, host))
    }

    /// Checks whether a request to `url` may be issued
    ///
    /// Blocks non-HTTP schemes, missing hosts, well-known internal hostnames,
    /// and any host whose literal or resolved address is loopback, private,
    /// link-local or otherwise non-routable. A host that fails to resolve is
    /// allowed; the request itself will then fail as a network error.
    pub async fn check_outbound(&self, url: &Url) -> Verdict {
        match url.scheme() {
            "http" | "https" => {}
            other => return Verdict::Block(BlockReason::UnsupportedScheme(other.to_string())),
        }

        let host = match url.host() {
            Some(host) => host,
            None => return Verdict::Block(BlockReason::MissingHost),
        };

        let host_str = match &host {
            Host::Domain(d) => d.to_lowercase(),
            Host::Ipv4(ip) => ip.to_string(),
            Host::Ipv6(ip) => ip.to_string(),
        };

        if host_str.is_empty() {
            return Verdict::Block(BlockReason::MissingHost);
        }

        if self.is_trusted(&host_str) {
            return Verdict::Allow;
        }

        match host {
            Host::Ipv4(ip) => check_address(&host_str, IpAddr::V4(ip)),
            Host::Ipv6(ip) => check_address(&host_str, IpAddr::V6(ip)),
            Host::Domain(_) => {
                if is_forbidden_hostname(&host_str) {
                    return Verdict::Block(BlockReason::ForbiddenHostname(host_str));
                }
                self.check_resolved(&host_str, url.port_or_known_default().unwrap_or(80))
                    .await
            }
        }
    }

    async fn check_resolved(&self, host: &str, port: u16) -> Verdict {
        let addrs = match tokio::net::lookup_host((host, port)).await {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!("DNS lookup failed for {}: {}", host, e);
                return Verdict::Allow;
            }
        };

        for addr in addrs {
            if let Verdict::Block(reason) = check_address(host, addr.ip()) {
                return Verdict::Block(reason);
            }
        }

        Verdict::Allow
    }
}

fn is_forbidden_hostname(host: &str) -> bool {
    FORBIDDEN_HOSTNAMES.contains(&host) || host.ends_with(".localhost")
}

fn check_address(host: &str, addr: IpAddr) -> Verdict {
    if is_non_public(addr) {
        Verdict::Block(BlockReason::PrivateAddress {
            host: host.to_string(),
            addr,
        })
    } else {
        Verdict::Allow
    }
}

/// Returns true for loopback, private, link-local and other non-routable addresses
pub fn is_non_public(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_non_public_v4(v4),
        IpAddr::V6(v6) => is_non_public_v6(v6),
    }
}

fn is_non_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (64..128).contains(&b))
        // 0.0.0.0/8 "this network"
        || a == 0
}

fn is_non_public_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_non_public_v4(v4);
    }

    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}
