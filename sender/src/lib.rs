pub mod auto_flush;
pub mod protocol_version;
pub mod sender;

pub use ilp_buffer::{ArrayElement, TimeUnit};
pub use sender::Sender;
