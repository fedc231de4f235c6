use super::limits::STANDARD_PORTS;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const PRIVATE_HOST_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".lan"];

const PLACEHOLDER_KEY_PATTERNS: &[&str] = &[
    "test",
    "demo",
    "example",
    "sample",
    "placeholder",
    "changeme",
    "change-me",
    "your-api-key",
    "your_api_key",
    "dummy",
    "fake",
    "xxxx",
    "1234567",
];

/// Whether `host` names a loopback, private, link-local or otherwise
/// internal address. Accepts bracketed IPv6 literals as found in URLs.
pub fn is_private_host(host: &str) -> bool {
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_ascii_lowercase();

    if host == "localhost" || PRIVATE_HOST_SUFFIXES.iter().any(|s| host.ends_with(s)) {
        return true;
    }

    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_private_ipv4(ip),
        Ok(IpAddr::V6(ip)) => is_private_ipv6(ip),
        Err(_) => false,
    }
}

fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        // Carrier-grade NAT 100.64.0.0/10
        || (a == 100 && (64..128).contains(&b))
}

fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(mapped) = ip.to_ipv4_mapped() {
        return is_private_ipv4(mapped);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // Unique local fc00::/7
        || (first & 0xfe00) == 0xfc00
        // Link local fe80::/10
        || (first & 0xffc0) == 0xfe80
}

pub fn is_standard_port(port: u16) -> bool {
    STANDARD_PORTS.contains(&port)
}

/// Whether an API key looks like a placeholder or test credential.
pub fn looks_like_placeholder_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    if PLACEHOLDER_KEY_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return true;
    }

    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}
