//! # Runtime Value Representation
//!
//! `Value<'a>` is the tagged scalar variant handed between the row codec,
//! expressions and operators. Text and binary payloads use `Cow` so reads
//! can borrow from a backing buffer while constructed values own their
//! data.
//!
//! ## Value Variants
//!
//! | Variant | Rust Type | Description |
//! |---------|-----------|-------------|
//! | Null | - | SQL NULL |
//! | Bool | bool | boolean |
//! | Int | i64 | signed integer of any stored width |
//! | Float | f64 | double-precision float |
//! | Decimal | {i128, i16} | unscaled digits plus scale |
//! | Text | Cow<str> | character data |
//! | Binary | Cow<[u8]> | raw bytes |
//! | Date | i32 | days since epoch |
//! | Time | i64 | microseconds since midnight |
//! | Timestamp | i64 | microseconds since epoch |
//! | Interval | {micros, days, months} | calendar interval |
//!
//! ## Comparison Semantics
//!
//! `cmp_total` defines the total order used by sort orderings and index
//! keys: Null sorts before everything, Int and Float compare cross-kind by
//! numeric promotion, and remaining kinds compare within kind, falling back
//! to the discriminator across kinds. Floats use `f64::total_cmp`.
//!
//! ## Hashing
//!
//! `hash_code` is a capability of the string-like variants only; every
//! other variant answers 0.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use eyre::{bail, Result};

/// Discriminator over the scalar kinds a `Value` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConversionType {
    Null = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    Decimal = 4,
    Text = 5,
    Binary = 6,
    Date = 7,
    Time = 8,
    Timestamp = 9,
    Interval = 10,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal { digits: i128, scale: i16 },
    Text(Cow<'a, str>),
    Binary(Cow<'a, [u8]>),
    Date(i32),
    Time(i64),
    Timestamp(i64),
    Interval { micros: i64, days: i32, months: i32 },
}

impl<'a> Value<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn conversion_type(&self) -> ConversionType {
        match self {
            Value::Null => ConversionType::Null,
            Value::Bool(_) => ConversionType::Bool,
            Value::Int(_) => ConversionType::Int,
            Value::Float(_) => ConversionType::Float,
            Value::Decimal { .. } => ConversionType::Decimal,
            Value::Text(_) => ConversionType::Text,
            Value::Binary(_) => ConversionType::Binary,
            Value::Date(_) => ConversionType::Date,
            Value::Time(_) => ConversionType::Time,
            Value::Timestamp(_) => ConversionType::Timestamp,
            Value::Interval { .. } => ConversionType::Interval,
        }
    }

    /// Hash capability of the string-like variants; 0 for all others.
    pub fn hash_code(&self) -> u64 {
        match self {
            Value::Text(s) => {
                let mut hasher = std::collections::hash_map::DefaultHasher::new();
                s.as_bytes().hash(&mut hasher);
                hasher.finish()
            }
            Value::Binary(b) => {
                let mut hasher = std::collections::hash_map::DefaultHasher::new();
                b.hash(&mut hasher);
                hasher.finish()
            }
            _ => 0,
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Date(d) => Ok(*d as i64),
            Value::Time(t) | Value::Timestamp(t) => Ok(*t),
            other => bail!("value {:?} is not an integer", other.conversion_type()),
        }
    }

    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            other => bail!("value {:?} is not a float", other.conversion_type()),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => bail!("value {:?} is not a boolean", other.conversion_type()),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Text(s) => Ok(s.as_ref()),
            other => bail!("value {:?} is not text", other.conversion_type()),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            Value::Binary(b) => Ok(b.as_ref()),
            other => bail!("value {:?} is not binary", other.conversion_type()),
        }
    }

    /// Detaches the value from any backing buffer.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(b),
            Value::Int(i) => Value::Int(i),
            Value::Float(f) => Value::Float(f),
            Value::Decimal { digits, scale } => Value::Decimal { digits, scale },
            Value::Text(s) => Value::Text(Cow::Owned(s.into_owned())),
            Value::Binary(b) => Value::Binary(Cow::Owned(b.into_owned())),
            Value::Date(d) => Value::Date(d),
            Value::Time(t) => Value::Time(t),
            Value::Timestamp(t) => Value::Timestamp(t),
            Value::Interval {
                micros,
                days,
                months,
            } => Value::Interval {
                micros,
                days,
                months,
            },
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal { digits, scale } => {
                Some(*digits as f64 / 10f64.powi(*scale as i32))
            }
            _ => None,
        }
    }

    /// Total order over all values, for sort orderings and index keys.
    pub fn cmp_total(&self, other: &Value<'_>) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.as_ref().cmp(b.as_ref()),
            (Value::Binary(a), Value::Binary(b)) => a.as_ref().cmp(b.as_ref()),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Time(a), Value::Time(b)) => a.cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
            (
                Value::Interval {
                    micros: am,
                    days: ad,
                    months: amo,
                },
                Value::Interval {
                    micros: bm,
                    days: bd,
                    months: bmo,
                },
            ) => (amo, ad, am).cmp(&(bmo, bd, bm)),
            (a, b) => match (a.numeric(), b.numeric()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.conversion_type().cmp(&b.conversion_type()),
            },
        }
    }
}

impl<'a> From<i64> for Value<'a> {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(Cow::Borrowed(v))
    }
}

impl From<String> for Value<'static> {
    fn from(v: String) -> Self {
        Value::Text(Cow::Owned(v))
    }
}

impl<'a> From<bool> for Value<'a> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}
