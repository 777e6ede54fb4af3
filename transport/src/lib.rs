pub mod http;
pub mod tcp;

use ilp_common::CResult;

/// A destination a drained `Buffer`'s bytes can be sent to. HTTP transports
/// retry transient failures internally; TCP transports surface the first
/// I/O error directly (spec.md §5).
pub trait Transport {
    /// Establishes the underlying connection. HTTP transports have nothing
    /// to do up front and accept the default no-op; TCP transports dial
    /// and run JWK auth here.
    fn connect(&mut self) -> CResult<()> {
        Ok(())
    }

    /// Sends exactly `bytes`, the drained content of one or more rows.
    /// A no-op on an empty slice.
    fn send(&mut self, bytes: &[u8]) -> CResult<()>;

    /// Closes the underlying connection, if any. Idempotent.
    fn close(&mut self) -> CResult<()>;
}

pub use http::HttpTransport;
pub use tcp::TcpTransport;
