//! Snowflake ids in the Discord bit layout.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u64 = 42;
pub const WORKER_ID_BITS: u64 = 5;
pub const PROCESS_ID_BITS: u64 = 5;
pub const INCREMENT_BITS: u64 = 12;

pub const TIMESTAMP_SHIFT: u64 = WORKER_ID_BITS + PROCESS_ID_BITS + INCREMENT_BITS;
pub const WORKER_ID_SHIFT: u64 = PROCESS_ID_BITS + INCREMENT_BITS;
pub const PROCESS_ID_SHIFT: u64 = INCREMENT_BITS;

/// The point in time a snowflake's 42-bit timestamp counts milliseconds from.
pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimestampError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses more than 42 bits.")]
    TimestampTooLarge,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake part was out of range: {0}")]
pub struct SnowflakePartOutOfRangeError(u64);

/// 5-bit worker id embedded in every generated snowflake.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct WorkerId(u8);

/// 5-bit process id embedded in every generated snowflake.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
pub struct ProcessId(u8);

macro_rules! snowflake_part {
    ($name:ident, $bits:expr) => {
        impl $name {
            #[must_use]
            pub fn new(value: u8) -> Option<Self> {
                (u64::from(value) < 1 << $bits).then_some(Self(value))
            }

            #[must_use]
            pub fn new_unchecked(value: u8) -> Self {
                Self::new(value).expect(concat!(stringify!($name), " out of range."))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl TryFrom<u8> for $name {
            type Error = SnowflakePartOutOfRangeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(SnowflakePartOutOfRangeError(u64::from(value)))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = u8::deserialize(deserializer)?;
                Self::new(inner).ok_or_else(|| {
                    Error::invalid_value(Unexpected::Unsigned(inner.into()), &stringify!($name))
                })
            }
        }
    };
}

snowflake_part!(WorkerId, WORKER_ID_BITS);
snowflake_part!(ProcessId, PROCESS_ID_BITS);

/// A 64-bit id: 42 bits of milliseconds since `SnowflakeEpoch`, then worker
/// id, process id, and a per-generator increment.
///
/// Ordering by id is ordering by creation time (for ids from one generator).
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(
        timestamp_millis: u64,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: u16,
    ) -> Self {
        let inner = timestamp_millis << TIMESTAMP_SHIFT
            | u64::from(worker_id.get()) << WORKER_ID_SHIFT
            | u64::from(process_id.get()) << PROCESS_ID_SHIFT
            | u64::from(increment);

        Self::new(inner)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Milliseconds since the epoch at which this id was generated.
    #[must_use]
    pub fn timestamp_millis(self) -> u64 {
        self.0 >> TIMESTAMP_SHIFT
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn worker_id(self) -> WorkerId {
        WorkerId((self.0 >> WORKER_ID_SHIFT) as u8 & 0b1_1111)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn process_id(self) -> ProcessId {
        ProcessId((self.0 >> PROCESS_ID_SHIFT) as u8 & 0b1_1111)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn increment(self) -> u16 {
        (self.0 & ((1 << INCREMENT_BITS) - 1)) as u16
    }

    /// The creation time encoded in this id.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(self.timestamp_millis() as i64)
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

pub fn timestamp_millis_at<SnowflakeEpoch: Epoch>(
    time: UtcDateTime,
) -> Result<u64, SnowflakeTimestampError> {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeTimestampError::TimeBeforeEpoch);
    }
    let millis = u64::try_from(millis).map_err(|_| SnowflakeTimestampError::TimestampTooLarge)?;
    if millis >= 1 << TIMESTAMP_BITS {
        return Err(SnowflakeTimestampError::TimestampTooLarge);
    }
    Ok(millis)
}

/// Hands out snowflakes for one worker/process pair, bumping the 12-bit
/// increment on every id so ids within one millisecond stay distinct.
#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    next_increment: u16,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            next_increment: 0,
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        let increment = self.next_increment;
        self.next_increment = (self.next_increment + 1) % (1 << INCREMENT_BITS);

        Ok(Snowflake::from_parts(
            timestamp_millis_at::<SnowflakeEpoch>(time)?,
            self.worker_id,
            self.process_id,
            increment,
        ))
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeTimestampError>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    struct MillennialEpoch;
    impl Epoch for MillennialEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2000-01-01 00:00);
    }

    #[test]
    fn part_ranges() {
        for legal in [0, 0xD, 0x1F] {
            assert!(WorkerId::new(legal).is_some());
            assert!(ProcessId::new(legal).is_some());
        }
        for illegal in [0x20, 0xF0, u8::MAX] {
            assert!(WorkerId::new(illegal).is_none());
            assert!(ProcessId::new(illegal).is_none());
        }
    }

    #[test]
    fn pack_and_unpack() {
        let snowflake = Snowflake::<MillennialEpoch>::from_parts(
            1,
            WorkerId::new_unchecked(2),
            ProcessId::new_unchecked(3),
            4,
        );

        assert_eq!(snowflake.get(), (1 << 22) | (2 << 17) | (3 << 12) | 4);
        assert_eq!(snowflake.timestamp_millis(), 1);
        assert_eq!(snowflake.worker_id(), WorkerId::new_unchecked(2));
        assert_eq!(snowflake.process_id(), ProcessId::new_unchecked(3));
        assert_eq!(snowflake.increment(), 4);
    }

    #[test]
    fn created_at_round_trips() {
        let time = utc_datetime!(2025-10-24 10:30);
        let millis = timestamp_millis_at::<MillennialEpoch>(time).unwrap();
        let snowflake = Snowflake::<MillennialEpoch>::from_parts(
            millis,
            WorkerId::default(),
            ProcessId::default(),
            0,
        );

        assert_eq!(snowflake.created_at(), time);
    }

    #[test]
    fn timestamp_bounds() {
        assert_eq!(
            timestamp_millis_at::<MillennialEpoch>(
                MillennialEpoch::EPOCH_TIME - Duration::milliseconds(1)
            ),
            Err(SnowflakeTimestampError::TimeBeforeEpoch)
        );
        assert_eq!(
            timestamp_millis_at::<MillennialEpoch>(
                MillennialEpoch::EPOCH_TIME + Duration::milliseconds(1 << TIMESTAMP_BITS)
            ),
            Err(SnowflakeTimestampError::TimestampTooLarge)
        );
        assert_eq!(
            timestamp_millis_at::<MillennialEpoch>(MillennialEpoch::EPOCH_TIME),
            Ok(0)
        );
    }

    #[test]
    fn generator_bumps_increment() {
        let time = utc_datetime!(2025-10-24 10:55);
        let mut generator = SnowflakeGenerator::<MillennialEpoch>::new(
            WorkerId::new_unchecked(10),
            ProcessId::new_unchecked(0),
        );

        let first = generator.generate_at(time).unwrap();
        let second = generator.generate_at(time).unwrap();

        assert_eq!(first.increment(), 0);
        assert_eq!(second.increment(), 1);
        assert!(second > first);
        assert_eq!(first.created_at(), second.created_at());
    }

    #[test]
    fn ids_order_by_time() {
        let mut generator = SnowflakeGenerator::<MillennialEpoch>::new(
            WorkerId::new_unchecked(1),
            ProcessId::new_unchecked(1),
        );

        let earlier = generator
            .generate_at(utc_datetime!(2025-01-01 00:00))
            .unwrap();
        let later = generator
            .generate_at(utc_datetime!(2025-01-01 00:01))
            .unwrap();

        assert!(later > earlier);
    }
}
