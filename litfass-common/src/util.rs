use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
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

/// Serde helper for PATCH bodies on nullable fields: an absent key leaves the
/// field untouched, an explicit `null` clears it.
///
/// Use with `#[serde(default, deserialize_with = "patch_field::deserialize")]`
/// on an `Option<Option<T>>` field.
pub mod patch_field {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use crate::util::{PositiveDuration, patch_field};
    use serde::Deserialize;
    use time::Duration;

    #[test]
    fn positive_duration_bounds() {
        assert!(PositiveDuration::new(Duration::seconds(1)).is_some());
        assert!(PositiveDuration::new(Duration::ZERO).is_none());
        assert!(PositiveDuration::try_from(Duration::seconds(-1)).is_err());
    }

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, deserialize_with = "patch_field::deserialize")]
        field: Option<Option<u64>>,
    }

    #[test]
    fn patch_field_keeps_clears_and_sets() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.field, None);

        let cleared: Body = serde_json::from_str(r#"{"field": null}"#).unwrap();
        assert_eq!(cleared.field, Some(None));

        let set: Body = serde_json::from_str(r#"{"field": 3}"#).unwrap();
        assert_eq!(set.field, Some(Some(3)));
    }
}
