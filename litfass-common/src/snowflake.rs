//! Snowflake IDs: 64-bit, time-sortable, unique per (worker, process).
//!
//! Layout: 42 bits of milliseconds since a deployment-defined epoch, then
//! 5 bits worker id, 5 bits process id, and a 12 bit per-process increment.
//! Ordering by the raw integer is ordering by creation time with the
//! increment as the tie break.

use derive_where::derive_where;
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

/// The instant a deployment's timestamps count from.
pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Snowflake part was out of range for creation: {0}")]
pub struct SnowflakePartOutOfRangeError<TInt>(TInt);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeTimestampFromDateTimeError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

fn fits(value: u64, bits: u64) -> bool {
    value < 1 << bits
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct WorkerId(u8);

impl WorkerId {
    #[must_use]
    pub fn new(id: u8) -> Option<Self> {
        fits(u64::from(id), WORKER_ID_BITS).then_some(Self(id))
    }

    #[must_use]
    pub fn new_unchecked(id: u8) -> Self {
        Self::new(id).expect("WorkerId out of range.")
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for WorkerId {
    type Error = SnowflakePartOutOfRangeError<u8>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(SnowflakePartOutOfRangeError(value))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct ProcessId(u8);

impl ProcessId {
    #[must_use]
    pub fn new(id: u8) -> Option<Self> {
        fits(u64::from(id), PROCESS_ID_BITS).then_some(Self(id))
    }

    #[must_use]
    pub fn new_unchecked(id: u8) -> Self {
        Self::new(id).expect("ProcessId out of range.")
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ProcessId {
    type Error = SnowflakePartOutOfRangeError<u8>;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(SnowflakePartOutOfRangeError(value))
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SnowflakeIncrement(u16);

impl SnowflakeIncrement {
    #[must_use]
    pub fn new(increment: u16) -> Option<Self> {
        fits(u64::from(increment), INCREMENT_BITS).then_some(Self(increment))
    }

    #[must_use]
    pub fn new_unchecked(increment: u16) -> Self {
        Self::new(increment).expect("SnowflakeIncrement out of range.")
    }

    #[must_use]
    pub fn get(self) -> u16 {
        self.0
    }

    /// The following increment, wrapping back to zero past the 12 bit range.
    #[must_use]
    pub fn next(self) -> Self {
        Self((self.0 + 1) % (1 << INCREMENT_BITS))
    }

    pub fn increment(&mut self) {
        *self = self.next();
    }
}

impl TryFrom<u16> for SnowflakeIncrement {
    type Error = SnowflakePartOutOfRangeError<u16>;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(SnowflakePartOutOfRangeError(value))
    }
}

/// Milliseconds since the epoch, 42 bit range.
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct SnowflakeTimestamp<SnowflakeEpoch>(u64, PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> SnowflakeTimestamp<SnowflakeEpoch> {
    #[must_use]
    pub fn new(millis: u64) -> Option<Self> {
        fits(millis, TIMESTAMP_BITS).then_some(Self(millis, PhantomData))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn from_time_unchecked(value: UtcDateTime) -> Self
    where
        SnowflakeEpoch: Epoch,
    {
        Self::try_from(value).expect("Cannot create timestamp.")
    }
}

impl<SnowflakeEpoch: Epoch> TryFrom<UtcDateTime> for SnowflakeTimestamp<SnowflakeEpoch> {
    type Error = SnowflakeTimestampFromDateTimeError;

    fn try_from(value: UtcDateTime) -> Result<Self, Self::Error> {
        let millis = (value - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        if millis < 0 {
            return Err(Self::Error::TimeBeforeEpoch);
        }
        let millis_u64 = u64::try_from(millis).map_err(|_| Self::Error::TimestampTooLarge)?;
        Self::new(millis_u64).ok_or(Self::Error::TimestampTooLarge)
    }
}

impl<SnowflakeEpoch: Epoch> From<SnowflakeTimestamp<SnowflakeEpoch>> for UtcDateTime {
    fn from(value: SnowflakeTimestamp<SnowflakeEpoch>) -> Self {
        let millis = i64::try_from(value.0).expect("Invalid timestamp value");
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis)
    }
}

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(
        timestamp: SnowflakeTimestamp<SnowflakeEpoch>,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: SnowflakeIncrement,
    ) -> Self {
        let snowflake = timestamp.get() << TIMESTAMP_SHIFT
            | u64::from(worker_id.get()) << WORKER_ID_SHIFT
            | u64::from(process_id.get()) << PROCESS_ID_SHIFT
            | u64::from(increment.get());

        Self::new(snowflake)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    fn field(self, shift: u64, bits: u64) -> u64 {
        (self.0 >> shift) & ((1 << bits) - 1)
    }

    #[must_use]
    pub fn timestamp(self) -> SnowflakeTimestamp<SnowflakeEpoch> {
        SnowflakeTimestamp(self.field(TIMESTAMP_SHIFT, TIMESTAMP_BITS), PhantomData)
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        WorkerId(self.field(WORKER_ID_SHIFT, WORKER_ID_BITS) as u8)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        ProcessId(self.field(PROCESS_ID_SHIFT, PROCESS_ID_BITS) as u8)
    }

    #[must_use]
    pub fn increment(self) -> SnowflakeIncrement {
        #[allow(clippy::cast_possible_truncation)]
        SnowflakeIncrement(self.field(0, INCREMENT_BITS) as u16)
    }

    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        SnowflakeTimestamp<SnowflakeEpoch>,
        WorkerId,
        ProcessId,
        SnowflakeIncrement,
    ) {
        (
            self.timestamp(),
            self.worker_id(),
            self.process_id(),
            self.increment(),
        )
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

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    next_increment: SnowflakeIncrement,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            next_increment: SnowflakeIncrement::new_unchecked(0),
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(&mut self, time: UtcDateTime) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        let increment = self.next_increment;
        self.next_increment.increment();

        Snowflake::from_parts(
            SnowflakeTimestamp::from_time_unchecked(time),
            self.worker_id,
            self.process_id,
            increment,
        )
    }

    pub fn generate(&mut self) -> Snowflake<SnowflakeEpoch>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use crate::snowflake::{
        Epoch, ProcessId, Snowflake, SnowflakeGenerator, SnowflakeIncrement, SnowflakeTimestamp,
        SnowflakeTimestampFromDateTimeError, WorkerId,
    };
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    struct MillennialEpoch;
    impl Epoch for MillennialEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2000-1-1 00:00);
    }

    #[test]
    fn legal_part_values() {
        for legal in [0, 0xD, 0x1F] {
            assert!(WorkerId::new(legal).is_some());
            assert!(ProcessId::new(legal).is_some());
        }
        for illegal in [0x20, 0xF0, u8::MAX] {
            assert!(WorkerId::new(illegal).is_none());
            assert!(ProcessId::new(illegal).is_none());
        }

        for legal in [0, 0xFF, 0xFFF] {
            assert!(SnowflakeIncrement::new(legal).is_some());
        }
        for illegal in [0x1000, 0xFF00, u16::MAX] {
            assert!(SnowflakeIncrement::new(illegal).is_none());
        }

        for legal in [0, 0xFFFF, 0x03FF_FFFF_FFFF] {
            assert!(SnowflakeTimestamp::<MillennialEpoch>::new(legal).is_some());
        }
        for illegal in [0x0400_0000_0000, 0x08F0_0000_0000_0000, u64::MAX] {
            assert!(SnowflakeTimestamp::<MillennialEpoch>::new(illegal).is_none());
        }
    }

    #[test]
    fn timestamp_round_trips_through_datetime() {
        let legal_date_times = [
            MillennialEpoch::EPOCH_TIME,
            utc_datetime!(2025-10-24 10:00),
            MillennialEpoch::EPOCH_TIME + Duration::milliseconds(0x03FF_FFFF_FFFF),
        ];

        for date_time in legal_date_times {
            let timestamp = SnowflakeTimestamp::<MillennialEpoch>::try_from(date_time).unwrap();
            assert_eq!(UtcDateTime::from(timestamp), date_time);
        }

        assert_eq!(
            SnowflakeTimestamp::<MillennialEpoch>::try_from(
                MillennialEpoch::EPOCH_TIME - Duration::milliseconds(1)
            ),
            Err(SnowflakeTimestampFromDateTimeError::TimeBeforeEpoch)
        );

        assert_eq!(
            SnowflakeTimestamp::<MillennialEpoch>::try_from(
                MillennialEpoch::EPOCH_TIME + Duration::milliseconds(0x0400_0000_0000)
            ),
            Err(SnowflakeTimestampFromDateTimeError::TimestampTooLarge)
        );
    }

    #[test]
    fn increment_wraps() {
        assert_eq!(
            SnowflakeIncrement::new_unchecked(0).next(),
            SnowflakeIncrement::new_unchecked(1)
        );
        assert_eq!(
            SnowflakeIncrement::new_unchecked(0xFFF).next(),
            SnowflakeIncrement::new_unchecked(0)
        );

        let mut increment = SnowflakeIncrement::new_unchecked(0xFFE);
        increment.increment();
        increment.increment();
        assert_eq!(increment, SnowflakeIncrement::new_unchecked(0));
    }

    #[test]
    fn parts_round_trip() {
        let timestamp = SnowflakeTimestamp::from_time_unchecked(utc_datetime!(2025-10-24 10:30));
        let worker_id = WorkerId::new_unchecked(0b10101);
        let process_id = ProcessId::new_unchecked(0b10001);
        let increment = SnowflakeIncrement::new_unchecked(100);

        let snowflake =
            Snowflake::<MillennialEpoch>::from_parts(timestamp, worker_id, process_id, increment);

        assert_eq!(snowflake.timestamp(), timestamp);
        assert_eq!(snowflake.worker_id(), worker_id);
        assert_eq!(snowflake.process_id(), process_id);
        assert_eq!(snowflake.increment(), increment);
        assert_eq!(
            snowflake.into_parts(),
            (timestamp, worker_id, process_id, increment)
        );
    }

    #[test]
    fn later_time_orders_higher() {
        let worker_id = WorkerId::new_unchecked(0);
        let process_id = ProcessId::new_unchecked(0);
        let mut generator = SnowflakeGenerator::<MillennialEpoch>::new(worker_id, process_id);

        let earlier = generator.generate_at(utc_datetime!(2020-06-01 12:00));
        let later = generator.generate_at(utc_datetime!(2020-06-01 12:00:00.001));
        assert!(later > earlier);
    }

    #[test]
    fn generator_increments_within_same_millisecond() {
        let worker_id = WorkerId::new_unchecked(10);
        let process_id = ProcessId::new_unchecked(0);
        let time = utc_datetime!(2025-10-24 10:55);

        let mut generator = SnowflakeGenerator::<MillennialEpoch>::new(worker_id, process_id);

        let first = generator.generate_at(time);
        let second = generator.generate_at(time);

        assert_eq!(first.increment(), SnowflakeIncrement::new_unchecked(0));
        assert_eq!(second.increment(), SnowflakeIncrement::new_unchecked(1));
        assert!(second > first);
        assert_eq!(first.worker_id(), worker_id);
        assert_eq!(first.process_id(), process_id);
    }
}
