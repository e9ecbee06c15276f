use anyhow::anyhow;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A modification timestamp as stored in node metadata: nanoseconds since
/// `1970-1-1 00:00:00`, named as [UNIX_EPOCH], in a little-endian `i64`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticks(pub i64);

/// calculate what time is it since [UNIX_EPOCH], in ticks
pub fn now() -> Ticks {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    Ticks(now.as_nanos() as i64)
}

impl Ticks {
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Ticks(raw)
    }
}

impl From<Ticks> for SystemTime {
    fn from(value: Ticks) -> Self {
        if value.0 <= 0 {
            UNIX_EPOCH
        } else {
            UNIX_EPOCH + Duration::from_nanos(value.0 as u64)
        }
    }
}

impl TryFrom<SystemTime> for Ticks {
    type Error = anyhow::Error;
    fn try_from(value: SystemTime) -> Result<Self, Self::Error> {
        match value.duration_since(UNIX_EPOCH) {
            Ok(duration) => Ok(Ticks(duration.as_nanos() as i64)),
            Err(before_epoch_error) => Err(anyhow!(
                "doesn't support time before UNIX_EPOCH: {}",
                before_epoch_error
            )),
        }
    }
}
