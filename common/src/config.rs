use std::path::PathBuf;

use crate::error::{CResult, Error};

/// Wire transport family selected by the config string's scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
    Tcp,
    Tcps,
}

impl Protocol {
    fn parse(s: &str) -> CResult<Self> {
        match s {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "tcp" => Ok(Protocol::Tcp),
            "tcps" => Ok(Protocol::Tcps),
            other => Err(Error::configuration(format!("unsupported protocol '{other}'"))),
        }
    }

    pub fn is_http(&self) -> bool {
        matches!(self, Protocol::Http | Protocol::Https)
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, Protocol::Https | Protocol::Tcps)
    }

    fn default_port(&self) -> u16 {
        match self {
            Protocol::Http | Protocol::Https => 9000,
            Protocol::Tcp | Protocol::Tcps => 9009,
        }
    }
}

/// Line-protocol wire-format generation. `Auto` is only meaningful as a
/// construction-time request; `Sender` always ends up pinned to a concrete
/// version before it writes a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    Auto,
    V1,
    V2,
    V3,
}

impl ProtocolVersion {
    fn parse(s: &str) -> CResult<Self> {
        match s {
            "auto" => Ok(ProtocolVersion::Auto),
            "1" => Ok(ProtocolVersion::V1),
            "2" => Ok(ProtocolVersion::V2),
            "3" => Ok(ProtocolVersion::V3),
            other => Err(Error::configuration(format!("unsupported protocol_version '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVerify {
    On,
    UnsafeOff,
}

impl TlsVerify {
    fn parse(s: &str) -> CResult<Self> {
        match s {
            "on" => Ok(TlsVerify::On),
            "unsafe_off" => Ok(TlsVerify::UnsafeOff),
            other => Err(Error::configuration(format!("unsupported tls_verify '{other}'"))),
        }
    }

    pub fn verify(&self) -> bool {
        matches!(self, TlsVerify::On)
    }
}

#[derive(Debug, Clone)]
pub struct AutoFlushConfig {
    pub enabled: bool,
    /// `None` means "use the transport's default".
    pub rows_threshold: Option<u64>,
    pub interval_millis: Option<u64>,
}

impl Default for AutoFlushConfig {
    fn default() -> Self {
        AutoFlushConfig { enabled: true, rows_threshold: None, interval_millis: Some(1_000) }
    }
}

/// Fully resolved sender configuration: the output of parsing a config
/// string (spec.md §6.4) or reading `QDB_CLIENT_CONF` (spec.md §6.5).
#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
    pub auto_flush: AutoFlushConfig,
    pub init_buf_size: usize,
    pub max_buf_size: usize,
    pub request_min_throughput: u64,
    pub request_timeout_millis: u64,
    pub retry_timeout_millis: u64,
    pub max_name_len: usize,
    pub tls_verify: TlsVerify,
    pub tls_ca: Option<PathBuf>,
    pub protocol_version: ProtocolVersion,
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            protocol: Protocol::Http,
            host: String::from("localhost"),
            port: Protocol::Http.default_port(),
            username: None,
            password: None,
            token: None,
            auto_flush: AutoFlushConfig::default(),
            init_buf_size: 64 * 1024,
            max_buf_size: 100 * 1024 * 1024,
            request_min_throughput: 100_000,
            request_timeout_millis: 10_000,
            retry_timeout_millis: 10_000,
            max_name_len: 127,
            tls_verify: TlsVerify::On,
            tls_ca: None,
            protocol_version: ProtocolVersion::Auto,
        }
    }
}

const DEPRECATED_KEYS: &[&str] = &["bufferSize", "buffer_size", "copyBuffer", "copy_buffer"];

/// Parses `protocol::key=value;key=value;...` per spec.md §6.4.
///
/// `;;` inside a value escapes a literal `;`. Control characters in values
/// are rejected. Unknown keys fail parsing. Deprecated keys are
/// warn-logged and ignored rather than rejected.
pub fn parse_conf(conf: &str) -> CResult<SenderConfig> {
    let (scheme, rest) = conf
        .split_once("::")
        .ok_or_else(|| Error::configuration("missing '::' after protocol"))?;

    let protocol = Protocol::parse(scheme)?;
    let mut config = SenderConfig { protocol, port: protocol.default_port(), ..SenderConfig::default() };

    let mut host_seen = false;
    for (key, value) in split_entries(rest)? {
        apply_entry(&mut config, &key, &value, &mut host_seen)?;
    }

    if !host_seen {
        return Err(Error::configuration("missing required key 'addr'"));
    }

    Ok(config)
}

/// Reads `QDB_CLIENT_CONF` and parses it the same way as `parse_conf`.
pub fn from_env() -> CResult<SenderConfig> {
    let conf = std::env::var("QDB_CLIENT_CONF")
        .map_err(|_| Error::configuration("QDB_CLIENT_CONF is not set"))?;
    parse_conf(&conf)
}

fn split_entries(rest: &str) -> CResult<Vec<(String, String)>> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ';' {
            if chars.peek() == Some(&';') {
                chars.next();
                current.push(';');
                continue;
            }
            if !current.is_empty() {
                entries.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_control() {
            return Err(Error::configuration("control character in configuration string"));
        }
        current.push(c);
    }
    if !current.is_empty() {
        entries.push(current);
    }

    entries
        .into_iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| Error::configuration(format!("malformed key=value entry '{entry}'")))
        })
        .collect()
}

fn apply_entry(config: &mut SenderConfig, key: &str, value: &str, host_seen: &mut bool) -> CResult<()> {
    if DEPRECATED_KEYS.contains(&key) {
        tracing::warn!(key, "ignoring deprecated configuration key");
        return Ok(());
    }

    match key {
        "addr" => {
            let (host, port) = match value.rsplit_once(':') {
                Some((h, p)) => (h.to_string(), parse_u64(p)? as u16),
                None => (value.to_string(), config.protocol.default_port()),
            };
            config.host = host;
            config.port = port;
            *host_seen = true;
        }
        "username" => config.username = Some(value.to_string()),
        "password" => config.password = Some(value.to_string()),
        "token" => config.token = Some(value.to_string()),
        "auto_flush" => config.auto_flush.enabled = parse_on_off(value)?,
        "auto_flush_rows" => config.auto_flush.rows_threshold = Some(parse_u64(value)?),
        "auto_flush_interval" => config.auto_flush.interval_millis = Some(parse_u64(value)?),
        "init_buf_size" => config.init_buf_size = require_at_least(parse_u64(value)?, 1)? as usize,
        "max_buf_size" => config.max_buf_size = require_at_least(parse_u64(value)?, 1)? as usize,
        "request_min_throughput" => config.request_min_throughput = require_at_least(parse_u64(value)?, 1)?,
        "request_timeout" => config.request_timeout_millis = require_at_least(parse_u64(value)?, 1)?,
        "retry_timeout" => config.retry_timeout_millis = parse_u64(value)?,
        "max_name_len" => config.max_name_len = require_at_least(parse_u64(value)?, 1)? as usize,
        "tls_verify" => config.tls_verify = TlsVerify::parse(value)?,
        "tls_ca" => config.tls_ca = Some(PathBuf::from(value)),
        "protocol_version" => config.protocol_version = ProtocolVersion::parse(value)?,
        other => return Err(Error::configuration(format!("unknown configuration key '{other}'"))),
    }
    Ok(())
}

fn parse_u64(value: &str) -> CResult<u64> {
    value
        .parse::<u64>()
        .map_err(|_| Error::configuration(format!("expected a non-negative integer, got '{value}'")))
}

fn require_at_least(value: u64, min: u64) -> CResult<u64> {
    if value < min {
        return Err(Error::configuration(format!("value {value} must be >= {min}")));
    }
    Ok(value)
}

fn parse_on_off(value: &str) -> CResult<bool> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(Error::configuration(format!("expected 'on' or 'off', got '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_http_conf() {
        let config = parse_conf("http::addr=h:9000;auto_flush=off").unwrap();
        assert_eq!(config.protocol, Protocol::Http);
        assert_eq!(config.host, "h");
        assert_eq!(config.port, 9000);
        assert!(!config.auto_flush.enabled);
    }

    #[test]
    fn defaults_port_from_protocol_when_absent() {
        let config = parse_conf("tcp::addr=h;username=bob").unwrap();
        assert_eq!(config.port, 9009);
        assert_eq!(config.username.as_deref(), Some("bob"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse_conf("http::addr=h:9000;bogus=1").is_err());
    }

    #[test]
    fn rejects_missing_addr() {
        assert!(parse_conf("http::username=bob").is_err());
    }

    #[test]
    fn double_semicolon_escapes_literal_semicolon() {
        let config = parse_conf("http::addr=h:9000;username=a;;b").unwrap();
        assert_eq!(config.username.as_deref(), Some("a;b"));
    }

    #[test]
    fn ignores_deprecated_keys() {
        let config = parse_conf("http::addr=h:9000;bufferSize=1024").unwrap();
        assert_eq!(config.host, "h");
    }

    #[test]
    fn rejects_bad_protocol() {
        assert!(parse_conf("ftp::addr=h:9000").is_err());
    }
}
