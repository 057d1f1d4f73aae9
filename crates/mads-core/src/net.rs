//! URL splitting and endpoint host-rewriting (C7).

use crate::error::{MadsError, Result};

/// `scheme://host:port` split into its three parts. Anything else is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitUrl {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

pub fn split_url(uri: &str) -> Result<SplitUrl> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| MadsError::Config(format!("not a scheme://host:port URI: {uri}")))?;
    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| MadsError::Config(format!("missing port in URI: {uri}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| MadsError::Config(format!("invalid port in URI: {uri}")))?;
    if host.is_empty() {
        return Err(MadsError::Config(format!("missing host in URI: {uri}")));
    }
    Ok(SplitUrl {
        scheme: scheme.to_string(),
        host: host.to_string(),
        port,
    })
}

/// Rewrite `endpoint`'s host to `settings_host`, keeping scheme and port.
///
/// Used when an agent loads its configuration remotely: clients need only
/// know the settings URI and automatically target the same broker host for
/// data, rather than trusting a `*` or stale host baked into the TOML.
pub fn rewrite_host(endpoint: &str, settings_host: &str) -> Result<String> {
    let parsed = split_url(endpoint)?;
    Ok(format!("{}://{}:{}", parsed.scheme, settings_host, parsed.port))
}
