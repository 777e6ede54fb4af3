use std::time::Duration;

use ilp_common::config::{ProtocolVersion, SenderConfig};
use ilp_common::{CResult, Error};

/// Resolves `ProtocolVersion::Auto` to a concrete version. HTTP transports
/// ask the server via `GET /settings`; non-HTTP transports fall back to the
/// newest version this client can speak without a negotiation round trip
/// (spec.md §6.3).
pub fn resolve(config: &SenderConfig) -> CResult<ProtocolVersion> {
    match config.protocol_version {
        ProtocolVersion::Auto => {
            if config.protocol.is_http() {
                negotiate_http(config)
            } else {
                Ok(ProtocolVersion::V2)
            }
        }
        other => Ok(other),
    }
}

fn negotiate_http(config: &SenderConfig) -> CResult<ProtocolVersion> {
    let scheme = if config.protocol.is_tls() { "https" } else { "http" };
    let url = format!("{scheme}://{}:{}/settings", config.host, config.port);

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_millis))
        .build()
        .map_err(Error::Http)?;

    let response = client.get(&url).send().map_err(Error::Http)?;
    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "settings negotiation failed, defaulting to v1");
        return Ok(ProtocolVersion::V1);
    }

    let body: serde_json::Value = response.json().map_err(Error::Http)?;
    let versions = body.pointer("/line.proto.support.versions").and_then(|v| v.as_array());

    let Some(versions) = versions else {
        return Ok(ProtocolVersion::V1);
    };

    let highest = versions.iter().filter_map(|v| v.as_u64()).max().unwrap_or(1);
    match highest {
        3 => Ok(ProtocolVersion::V3),
        2 => Ok(ProtocolVersion::V2),
        _ => Ok(ProtocolVersion::V1),
    }
}
