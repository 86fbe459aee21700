use thiserror::Error;
use time::Duration;

/// A duration known to be strictly positive, e.g. a session lifetime.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn new_unchecked(duration: Duration) -> Self {
        Self::new(duration).expect("Duration was not positive.")
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

/// Serde adapter for wire timestamps: integer milliseconds since the Unix
/// epoch.
pub mod timestamp_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de, ser};
    use time::UtcDateTime;

    pub fn serialize<S>(value: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = i64::try_from(value.unix_timestamp_nanos() / 1_000_000)
            .map_err(ser::Error::custom)?;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UtcDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        UtcDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use time::{UtcDateTime, macros::utc_datetime};

    #[test]
    fn positive_duration() {
        assert!(PositiveDuration::new(Duration::seconds(1)).is_some());
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::new(Duration::seconds(-1)).is_none());
    }

    #[derive(Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "timestamp_ms")]
        at: UtcDateTime,
    }

    #[test]
    fn timestamp_ms_round_trip() {
        let stamped = Stamped {
            at: utc_datetime!(2025-06-15 12:30:45.123),
        };

        let json = serde_json::to_string(&stamped).unwrap();
        assert_eq!(json, r#"{"at":1749990645123}"#);

        let back: Stamped = serde_json::from_str(&json).unwrap();
        assert_eq!(back.at, stamped.at);
    }

    #[test]
    fn timestamp_ms_epoch_is_zero() {
        let json = serde_json::to_string(&Stamped {
            at: UtcDateTime::UNIX_EPOCH,
        })
        .unwrap();
        assert_eq!(json, r#"{"at":0}"#);
    }
}
