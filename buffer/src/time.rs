/// Unit of a timestamp value supplied by the caller. `Ns` is the native
/// resolution of the row's designated timestamp; typed timestamp columns
/// are always written out in microseconds regardless of the unit passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Ns,
    Us,
    Ms,
}

impl TimeUnit {
    pub fn to_nanos(self, value: i64) -> i64 {
        match self {
            TimeUnit::Ns => value,
            TimeUnit::Us => value.saturating_mul(1_000),
            TimeUnit::Ms => value.saturating_mul(1_000_000),
        }
    }

    pub fn to_micros(self, value: i64) -> i64 {
        match self {
            TimeUnit::Ns => value / 1_000,
            TimeUnit::Us => value,
            TimeUnit::Ms => value.saturating_mul(1_000),
        }
    }
}
