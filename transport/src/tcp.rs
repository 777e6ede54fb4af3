use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;

use base64::Engine;
use ilp_common::config::SenderConfig;
use ilp_common::{CResult, Error};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

use crate::Transport;

/// Either a plain or TLS-wrapped TCP stream, the same enum-of-variants
/// shape the teacher's `PacketChannel` uses for its socket abstraction.
enum Stream {
    Plain(TcpStream),
    Tls(native_tls::TlsStream<TcpStream>),
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// Sends drained buffer bytes over a raw TCP (or TLS) socket, authenticating
/// with JWK challenge-response on connect when `username`/`token` are set
/// (spec.md §5.2). No retry: the first I/O error is surfaced directly and
/// the connection is left closed for the caller to re-establish.
pub struct TcpTransport {
    host: String,
    port: u16,
    tls: bool,
    username: Option<String>,
    token: Option<String>,
    stream: Option<Stream>,
}

impl TcpTransport {
    pub fn new(config: &SenderConfig) -> Self {
        TcpTransport {
            host: config.host.clone(),
            port: config.port,
            tls: config.protocol.is_tls(),
            username: config.username.clone(),
            token: config.token.clone(),
            stream: None,
        }
    }

}

/// JWK challenge-response: send `<username>\n`, read the server's
/// newline-terminated challenge, sign it with the base64url-decoded private
/// key `token`, and send the base64-encoded signature followed by `\n`.
fn authenticate(stream: &mut Stream, username: &str, token: &str) -> CResult<()> {
    stream.write_all(username.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let challenge = {
        let mut reader = BufReader::new(&mut *stream);
        let mut line = Vec::new();
        reader.read_until(b'\n', &mut line)?;
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        line
    };

    let key_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| Error::configuration(format!("invalid private key token: {e}")))?;
    let private_key = RsaPrivateKey::from_pkcs8_der(&key_bytes)
        .map_err(|e| Error::configuration(format!("invalid private key: {e}")))?;

    let digest = Sha256::digest(&challenge);
    let signature = private_key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
        .map_err(|e| Error::transport(false, format!("failed to sign auth challenge: {e}")))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(signature);
    stream.write_all(encoded.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(())
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> CResult<()> {
        let tcp = TcpStream::connect((self.host.as_str(), self.port))?;
        tcp.set_nodelay(true)?;

        let mut stream = if self.tls {
            let connector = native_tls::TlsConnector::new()
                .map_err(|e| Error::transport(false, format!("tls connector setup failed: {e}")))?;
            let tls = connector
                .connect(&self.host, tcp)
                .map_err(|e| Error::transport(false, format!("tls handshake failed: {e}")))?;
            Stream::Tls(tls)
        } else {
            Stream::Plain(tcp)
        };

        if let (Some(username), Some(token)) = (self.username.clone(), self.token.clone()) {
            authenticate(&mut stream, &username, &token)?;
        }

        self.stream = Some(stream);
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> CResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::transport(false, "tcp transport is not connected"))?;
        stream.write_all(bytes)?;
        stream.flush()?;
        Ok(())
    }

    fn close(&mut self) -> CResult<()> {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::info!(host = %self.host, port = self.port, "closed ilp tcp connection");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_before_connect_fails() {
        let config = SenderConfig { protocol: ilp_common::config::Protocol::Tcp, ..SenderConfig::default() };
        let mut transport = TcpTransport::new(&config);
        assert!(transport.send(b"t x=1i\n").is_err());
    }

    #[test]
    fn send_empty_is_a_noop_even_unconnected() {
        let config = SenderConfig { protocol: ilp_common::config::Protocol::Tcp, ..SenderConfig::default() };
        let mut transport = TcpTransport::new(&config);
        assert!(transport.send(b"").is_ok());
    }

    #[test]
    fn close_without_connect_is_a_noop() {
        let config = SenderConfig { protocol: ilp_common::config::Protocol::Tcp, ..SenderConfig::default() };
        let mut transport = TcpTransport::new(&config);
        assert!(transport.close().is_ok());
    }
}
