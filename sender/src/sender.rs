use ilp_buffer::{ArrayElement, Buffer, EncoderVersion, TimeUnit};
use ilp_common::config::SenderConfig;
use ilp_common::CResult;
use ilp_transport::{HttpTransport, TcpTransport, Transport};

use crate::auto_flush::AutoFlushState;
use crate::protocol_version;

const DEFAULT_HTTP_AUTO_FLUSH_ROWS: u64 = 75_000;
const DEFAULT_TCP_AUTO_FLUSH_ROWS: u64 = 600;

/// Orchestrates a `Buffer` and a `Transport`. Every fluent call builds a
/// row; `at`/`at_now` close it and may trigger an auto-flush (spec.md §6).
pub struct Sender {
    buffer: Buffer,
    transport: Box<dyn Transport>,
    auto_flush: AutoFlushState,
    connected: bool,
}

impl Sender {
    pub fn from_conf(conf: &str) -> CResult<Self> {
        Self::new(ilp_common::config::parse_conf(conf)?)
    }

    pub fn from_env() -> CResult<Self> {
        Self::new(ilp_common::config::from_env()?)
    }

    pub fn new(config: SenderConfig) -> CResult<Self> {
        let version = protocol_version::resolve(&config)?;
        let encoder_version = EncoderVersion::try_from(version)?;
        let buffer = Buffer::with_capacity(
            encoder_version,
            config.init_buf_size,
            config.max_buf_size,
            config.max_name_len,
        );

        let default_rows = if config.protocol.is_http() {
            DEFAULT_HTTP_AUTO_FLUSH_ROWS
        } else {
            DEFAULT_TCP_AUTO_FLUSH_ROWS
        };
        let auto_flush = AutoFlushState::new(&config.auto_flush, default_rows);

        let transport: Box<dyn Transport> = if config.protocol.is_http() {
            Box::new(HttpTransport::new(&config)?)
        } else {
            Box::new(TcpTransport::new(&config))
        };

        Ok(Sender { buffer, transport, auto_flush, connected: false })
    }

    pub fn connect(&mut self) -> CResult<()> {
        self.transport.connect()?;
        self.connected = true;
        Ok(())
    }

    pub fn table(&mut self, name: &str) -> CResult<&mut Self> {
        self.buffer.table(name)?;
        Ok(self)
    }

    pub fn symbol(&mut self, name: &str, value: &str) -> CResult<&mut Self> {
        self.buffer.symbol(name, value)?;
        Ok(self)
    }

    pub fn string_column(&mut self, name: &str, value: &str) -> CResult<&mut Self> {
        self.buffer.string_column(name, value)?;
        Ok(self)
    }

    pub fn boolean_column(&mut self, name: &str, value: bool) -> CResult<&mut Self> {
        self.buffer.boolean_column(name, value)?;
        Ok(self)
    }

    pub fn int_column(&mut self, name: &str, value: i64) -> CResult<&mut Self> {
        self.buffer.int_column(name, value)?;
        Ok(self)
    }

    pub fn float_column(&mut self, name: &str, value: f64) -> CResult<&mut Self> {
        self.buffer.float_column(name, value)?;
        Ok(self)
    }

    pub fn timestamp_column(&mut self, name: &str, value: i64, unit: TimeUnit) -> CResult<&mut Self> {
        self.buffer.timestamp_column(name, value, unit)?;
        Ok(self)
    }

    pub fn array_column(&mut self, name: &str, value: &ArrayElement) -> CResult<&mut Self> {
        self.buffer.array_column(name, value)?;
        Ok(self)
    }

    pub fn decimal_column_text(&mut self, name: &str, value: &str) -> CResult<&mut Self> {
        self.buffer.decimal_column_text(name, value)?;
        Ok(self)
    }

    pub fn decimal_column(&mut self, name: &str, unscaled: &[u8], scale: u8) -> CResult<&mut Self> {
        self.buffer.decimal_column(name, unscaled, scale)?;
        Ok(self)
    }

    pub fn at(&mut self, timestamp: i64, unit: TimeUnit) -> CResult<()> {
        self.buffer.at(timestamp, unit)?;
        self.after_row()
    }

    pub fn at_now(&mut self) -> CResult<()> {
        self.buffer.at_now()?;
        self.after_row()
    }

    fn after_row(&mut self) -> CResult<()> {
        self.auto_flush.record_row();
        if self.auto_flush.should_flush() {
            self.flush()?;
        }
        Ok(())
    }

    /// Drains and sends whatever complete rows are buffered. Returns
    /// `false` (without touching the connection or auto-flush counters) if
    /// there was nothing to drain.
    pub fn flush(&mut self) -> CResult<bool> {
        let Some(bytes) = self.buffer.drain() else {
            return Ok(false);
        };
        if !self.connected {
            self.connect()?;
        }
        self.transport.send(&bytes)?;
        self.auto_flush.reset();
        Ok(true)
    }

    /// Discards any buffered, unflushed rows. Does not touch the
    /// connection.
    pub fn reset(&mut self) -> &mut Self {
        self.buffer.reset();
        self.auto_flush.reset();
        self
    }

    pub fn close(&mut self) -> CResult<()> {
        if self.buffer.current_position() > 0 {
            tracing::warn!("closing sender with unflushed bytes still in the buffer");
        }
        self.transport.close()?;
        self.connected = false;
        Ok(())
    }

    pub fn current_position(&self) -> usize {
        self.buffer.current_position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_resolves_explicit_protocol_version_without_network() {
        let config = SenderConfig {
            protocol_version: ilp_common::config::ProtocolVersion::V2,
            ..SenderConfig::default()
        };
        let sender = Sender::new(config);
        assert!(sender.is_ok());
    }

    #[test]
    fn building_a_row_advances_position() {
        let config = SenderConfig {
            protocol_version: ilp_common::config::ProtocolVersion::V1,
            ..SenderConfig::default()
        };
        let mut sender = Sender::new(config).unwrap();
        assert_eq!(sender.current_position(), 0);
        sender.table("t").unwrap().int_column("x", 1).unwrap();
        assert!(sender.current_position() > 0);
    }
}
