//! Client origin metadata
//!
//! IP address and user agent as seen by the server, recorded on sessions.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

const MAX_USER_AGENT_LEN: usize = 512;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOrigin {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl ClientOrigin {
    pub fn new(ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self { ip, user_agent }
    }

    /// Build from request headers. `direct_ip` is the peer address of the
    /// TCP connection, used when no proxy header is present.
    pub fn from_headers(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Self {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect::<String>())
            .filter(|ua| !ua.is_empty());

        Self {
            ip: extract_client_ip(headers, direct_ip),
            user_agent,
        }
    }

    /// IP as string (for storage)
    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }
}

/// First address of `X-Forwarded-For`, else `direct_ip`.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .or(direct_ip)
}
