use time::OffsetDateTime;

/// Source of "now". Swappable so that expiry can be tested without waiting.
pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
}

pub(crate) trait OffsetDateTimeExt: Sized {
    fn unix_timestamp_millis(self) -> i128;
    fn from_unix_timestamp_millis(millis: i128) -> Option<Self>;
}

impl OffsetDateTimeExt for OffsetDateTime {
    fn unix_timestamp_millis(self) -> i128 {
        self.unix_timestamp_nanos() / 1_000_000
    }

    fn from_unix_timestamp_millis(millis: i128) -> Option<Self> {
        OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?).ok()
    }
}
