// SPDX-License-Identifier: GPL-3.0-only
use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::Url;

/// Maximum allowed URL length
const MAX_URL_LENGTH: usize = 2048;

/// Validate a download or catalog URL.
///
/// Only http/https with a host are accepted. Unless `allow_local` is set,
/// loopback and private-network hosts are rejected as well, so a catalog
/// entry cannot point the installer at services on the user's machine.
pub fn validate_url(url_str: &str, allow_local: bool) -> Result<Url> {
    if url_str.len() > MAX_URL_LENGTH {
        return Err(anyhow::anyhow!("URL exceeds maximum length of {} characters", MAX_URL_LENGTH));
    }

    let url = Url::parse(url_str).context("Invalid URL format")?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(anyhow::anyhow!(
                "Invalid URL scheme: {} (only http and https are allowed)",
                scheme
            ));
        }
    }

    let host = url.host_str().ok_or_else(|| anyhow::anyhow!("URL must have a host"))?;

    if !allow_local && is_local_host(host) {
        return Err(anyhow::anyhow!(
            "URL host {} is local or private (enable allow_local_sources to permit it)",
            host
        ));
    }

    Ok(url)
}

fn is_local_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']').to_lowercase();
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => is_local_ipv4(&ip),
        Ok(IpAddr::V6(ip)) => is_local_ipv6(&ip),
        Err(_) => false,
    }
}

fn is_local_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

fn is_local_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let first = ip.segments()[0];
    // fc00::/7 unique local, fe80::/10 link-local
    if (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80 {
        return true;
    }
    ip.to_ipv4_mapped().is_some_and(|v4| is_local_ipv4(&v4))
}
