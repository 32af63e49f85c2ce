//! Client IP resolution behind reverse proxies

use http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// Headers consulted in order, most specific first
const CLIENT_IP_HEADERS: &[&str] = &[
    "x-client-ip",
    "x-forwarded-for",
    "cf-connecting-ip",
    "fastly-client-ip",
    "true-client-ip",
    "x-real-ip",
    "x-cluster-client-ip",
    "x-forwarded",
    "forwarded-for",
    "forwarded",
];

/// Resolves the client address a request originates from
pub trait ClientIpResolver: Send + Sync {
    fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String;
}

/// Default resolver that trusts well-known proxy headers before the peer address
#[derive(Debug, Clone, Default)]
pub struct HeaderClientIpResolver;

impl ClientIpResolver for HeaderClientIpResolver {
    fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        for name in CLIENT_IP_HEADERS {
            let Some(value) = headers.get(*name).and_then(|v| v.to_str().ok()) else {
                continue;
            };
            if let Some(ip) = value.split(',').find_map(parse_candidate) {
                return ip.to_string();
            }
        }
        peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
    }
}

/// Parse one comma-separated entry, accepting the `for=` form of `Forwarded`
fn parse_candidate(entry: &str) -> Option<IpAddr> {
    let entry = entry.trim();
    let entry = entry
        .split(';')
        .find_map(|part| part.trim().strip_prefix("for="))
        .unwrap_or(entry)
        .trim_matches('"');

    if let Ok(ip) = entry.parse::<IpAddr>() {
        return Some(ip);
    }
    // "[::1]:8080" or "10.0.0.1:8080"
    entry.parse::<SocketAddr>().ok().map(|addr| addr.ip())
}
