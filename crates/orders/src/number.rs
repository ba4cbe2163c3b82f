//! Human-readable order numbers: `ORD-<year>-<6-digit sequence>`.

use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderNumber {
    year: i32,
    sequence: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    #[error("sequence {0} outside 1..=999999")]
    SequenceOutOfRange(u64),

    #[error("malformed order number '{0}'")]
    Malformed(String),
}

impl OrderNumber {
    pub const MAX_SEQUENCE: u32 = 999_999;

    pub fn new(year: i32, sequence: u32) -> Result<Self, OrderNumberError> {
        if sequence == 0 || sequence > Self::MAX_SEQUENCE {
            return Err(OrderNumberError::SequenceOutOfRange(u64::from(sequence)));
        }
        Ok(Self { year, sequence })
    }

    /// First free number after `last` (the highest sequence already used in
    /// `year`, or 0 when none).
    pub fn after(year: i32, last: u32) -> Result<Self, OrderNumberError> {
        let next = u64::from(last) + 1;
        let sequence = u32::try_from(next).map_err(|_| OrderNumberError::SequenceOutOfRange(next))?;
        Self::new(year, sequence)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ORD-{}-{:06}", self.year, self.sequence)
    }
}

impl FromStr for OrderNumber {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || OrderNumberError::Malformed(s.to_string());
        let rest = s.strip_prefix("ORD-").ok_or_else(malformed)?;
        let (year, seq) = rest.split_once('-').ok_or_else(malformed)?;
        if year.len() != 4 || seq.len() != 6 {
            return Err(malformed());
        }
        let year: i32 = year.parse().map_err(|_| malformed())?;
        let sequence: u32 = seq.parse().map_err(|_| malformed())?;
        Self::new(year, sequence)
    }
}

impl Serialize for OrderNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OrderNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_with_zero_padding() {
        assert_eq!(OrderNumber::new(2026, 42).unwrap().to_string(), "ORD-2026-000042");
    }

    #[test]
    fn after_fails_past_the_last_sequence() {
        assert_eq!(OrderNumber::after(2026, 0).unwrap().sequence(), 1);
        assert_eq!(
            OrderNumber::after(2026, OrderNumber::MAX_SEQUENCE),
            Err(OrderNumberError::SequenceOutOfRange(1_000_000))
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["ORD-2026-42", "ord-2026-000042", "ORD-26-000042", "ORD-2026-000000", "ORD-2026"] {
            assert!(bad.parse::<OrderNumber>().is_err(), "{bad} should not parse");
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 1000, .. ProptestConfig::default() })]

        #[test]
        fn display_order_matches_sequence_order(a in 1u32..=999_999, b in 1u32..=999_999) {
            let x = OrderNumber::new(2026, a).unwrap().to_string();
            let y = OrderNumber::new(2026, b).unwrap().to_string();
            prop_assert_eq!(x.cmp(&y), a.cmp(&b));
        }
    }
}
