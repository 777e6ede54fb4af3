pub mod array;
pub mod buffer;
pub mod decimal;
pub mod escape;
pub mod time;
pub mod validator;

pub use array::ArrayElement;
pub use buffer::{Buffer, EncoderVersion};
pub use time::TimeUnit;
pub use validator::NameKind;
