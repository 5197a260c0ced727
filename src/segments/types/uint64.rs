//! 64-bit segment identifier.
//!
//! Segment ids in a volumetric dataset routinely exceed 2^53, so every
//! operation here works on the full 64 bits, including the decimal string
//! form used for persistence and the wire protocol.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// An unsigned 64-bit identifier, viewed as a pair of 32-bit words.
///
/// # Ordering
///
/// Identifiers are totally ordered by their 64-bit magnitude, i.e. first by
/// the high word and then by the low word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uint64(u64);

impl Uint64 {
    pub const ZERO: Uint64 = Uint64(0);
    pub const MAX: Uint64 = Uint64(u64::MAX);

    /// Creates an identifier from its raw value.
    pub const fn new(value: u64) -> Self {
        Uint64(value)
    }

    /// Creates an identifier from its low and high 32-bit words.
    pub const fn from_words(low: u32, high: u32) -> Self {
        Uint64(((high as u64) << 32) | low as u64)
    }

    /// The low 32 bits.
    pub const fn low(&self) -> u32 {
        self.0 as u32
    }

    /// The high 32 bits.
    pub const fn high(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parses `s` as base-10 into `self`.
    ///
    /// Returns `false` if `s` is empty, contains a non-digit, or overflows 64
    /// bits. The value of `self` is unspecified after a failed parse.
    pub fn parse_string(&mut self, s: &str) -> bool {
        if s.is_empty() {
            return false;
        }
        let mut value: u64 = 0;
        for byte in s.bytes() {
            let digit = match byte {
                b'0'..=b'9' => (byte - b'0') as u64,
                _ => return false,
            };
            value = match value.checked_mul(10).and_then(|v| v.checked_add(digit)) {
                Some(v) => v,
                None => return false,
            };
        }
        self.0 = value;
        true
    }

    /// Strict less-than on the 64-bit magnitude.
    pub fn less(a: Uint64, b: Uint64) -> bool {
        a < b
    }

    pub fn equal(a: Uint64, b: Uint64) -> bool {
        a == b
    }

    pub fn compare(a: &Uint64, b: &Uint64) -> Ordering {
        a.cmp(b)
    }
}

impl From<u64> for Uint64 {
    fn from(value: u64) -> Self {
        Uint64(value)
    }
}

impl From<Uint64> for u64 {
    fn from(id: Uint64) -> Self {
        id.0
    }
}

impl fmt::Display for Uint64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uint64 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut id = Uint64::ZERO;
        if id.parse_string(s) {
            Ok(id)
        } else {
            Err(Error::Parse {
                input: s.to_string(),
            })
        }
    }
}

impl Serialize for Uint64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct Uint64Visitor;

impl Visitor<'_> for Uint64Visitor {
    type Value = Uint64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a base-10 string or a non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Uint64, E> {
        v.parse().map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Uint64, E> {
        Ok(Uint64(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Uint64, E> {
        u64::try_from(v)
            .map(Uint64)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }
}

impl<'de> Deserialize<'de> for Uint64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(Uint64Visitor)
    }
}
