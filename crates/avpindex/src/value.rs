//! Decoded AVP values and checked conversions.
//!
//! The decoder hands every scalar AVP over as an [`AvpValue`]. Callers ask for a Rust type
//! through [`FromAvpValue`]; asking for a type the value does not hold is reported as
//! [`AvpIndexError::TypeMismatch`] instead of being reinterpreted.
//!
//! | Kind | Rust type | Zero value |
//! |------|-----------|------------|
//! | `Unsigned32` | `u32` | `0` |
//! | `Unsigned64` | `u64` | `0` |
//! | `Integer32` | `i32` | `0` |
//! | `Integer64` | `i64` | `0` |
//! | `Float32` | `f32` | `0.0` |
//! | `Float64` | `f64` | `0.0` |
//! | `Enumerated` | [`Enumerated`] | `Enumerated(0)` |
//! | `Time` | `DateTime<Utc>` | Unix epoch |
//! | `UTF8String` (and identity, URI, octet string) | `String` | `""` |
//! | `Address` | `IpAddr` | `0.0.0.0` |

use crate::error::{AvpIndexError, Result};
use crate::path::AvpId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// The representation a decoded value is held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Unsigned32,
    Unsigned64,
    Integer32,
    Integer64,
    Float32,
    Float64,
    Enumerated,
    Time,
    Utf8String,
    DiameterIdentity,
    DiameterUri,
    OctetString,
    Address,
    Grouped,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Unsigned32 => "Unsigned32",
            ValueKind::Unsigned64 => "Unsigned64",
            ValueKind::Integer32 => "Integer32",
            ValueKind::Integer64 => "Integer64",
            ValueKind::Float32 => "Float32",
            ValueKind::Float64 => "Float64",
            ValueKind::Enumerated => "Enumerated",
            ValueKind::Time => "Time",
            ValueKind::Utf8String => "UTF8String",
            ValueKind::DiameterIdentity => "DiameterIdentity",
            ValueKind::DiameterUri => "DiameterURI",
            ValueKind::OctetString => "OctetString",
            ValueKind::Address => "Address",
            ValueKind::Grouped => "Grouped",
        };
        f.write_str(name)
    }
}

/// A decoded AVP value.
///
/// Grouped AVPs carry no scalar; their content is the child list on the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AvpValue {
    Unsigned32(u32),
    Unsigned64(u64),
    Integer32(i32),
    Integer64(i64),
    Float32(f32),
    Float64(f64),
    Enumerated(u32),
    Time(DateTime<Utc>),
    Utf8String(String),
    DiameterIdentity(String),
    DiameterUri(String),
    OctetString(Vec<u8>),
    Address(IpAddr),
    Grouped,
}

impl AvpValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AvpValue::Unsigned32(_) => ValueKind::Unsigned32,
            AvpValue::Unsigned64(_) => ValueKind::Unsigned64,
            AvpValue::Integer32(_) => ValueKind::Integer32,
            AvpValue::Integer64(_) => ValueKind::Integer64,
            AvpValue::Float32(_) => ValueKind::Float32,
            AvpValue::Float64(_) => ValueKind::Float64,
            AvpValue::Enumerated(_) => ValueKind::Enumerated,
            AvpValue::Time(_) => ValueKind::Time,
            AvpValue::Utf8String(_) => ValueKind::Utf8String,
            AvpValue::DiameterIdentity(_) => ValueKind::DiameterIdentity,
            AvpValue::DiameterUri(_) => ValueKind::DiameterUri,
            AvpValue::OctetString(_) => ValueKind::OctetString,
            AvpValue::Address(_) => ValueKind::Address,
            AvpValue::Grouped => ValueKind::Grouped,
        }
    }

    /// Convert into `T`, failing with `TypeMismatch` (attributed to `id`) when the value is
    /// held in a different representation.
    pub fn decode<T: FromAvpValue>(&self, id: AvpId) -> Result<T> {
        T::from_value(self).ok_or(AvpIndexError::TypeMismatch {
            id,
            expected: T::KIND,
            found: self.kind(),
        })
    }
}

/// Renders the value the way a decoder's display string would.
impl fmt::Display for AvpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvpValue::Unsigned32(v) | AvpValue::Enumerated(v) => write!(f, "{}", v),
            AvpValue::Unsigned64(v) => write!(f, "{}", v),
            AvpValue::Integer32(v) => write!(f, "{}", v),
            AvpValue::Integer64(v) => write!(f, "{}", v),
            AvpValue::Float32(v) => write!(f, "{}", v),
            AvpValue::Float64(v) => write!(f, "{}", v),
            AvpValue::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            AvpValue::Utf8String(s) | AvpValue::DiameterIdentity(s) | AvpValue::DiameterUri(s) => {
                f.write_str(s)
            }
            AvpValue::OctetString(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            AvpValue::Address(ip) => write!(f, "{}", ip),
            AvpValue::Grouped => Ok(()),
        }
    }
}

/// An Enumerated AVP value.
///
/// Enumerated values are carried as `u32` on the wire but are a distinct kind; the newtype
/// keeps `get::<u32>` from silently accepting them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Enumerated(pub u32);

/// A Rust type an [`AvpValue`] can be converted into.
pub trait FromAvpValue: Sized {
    /// Kind reported as `expected` when a conversion fails.
    const KIND: ValueKind;

    /// Value returned by lookups that find no matching AVP.
    fn zero() -> Self;

    /// `None` if `value` is not held in a compatible representation.
    fn from_value(value: &AvpValue) -> Option<Self>;
}

macro_rules! scalar_from_value {
    ($ty:ty, $variant:ident, $zero:expr) => {
        impl FromAvpValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn zero() -> Self {
                $zero
            }

            fn from_value(value: &AvpValue) -> Option<Self> {
                match value {
                    AvpValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

scalar_from_value!(u32, Unsigned32, 0);
scalar_from_value!(u64, Unsigned64, 0);
scalar_from_value!(i32, Integer32, 0);
scalar_from_value!(i64, Integer64, 0);
scalar_from_value!(f32, Float32, 0.0);
scalar_from_value!(f64, Float64, 0.0);
scalar_from_value!(DateTime<Utc>, Time, DateTime::<Utc>::UNIX_EPOCH);
scalar_from_value!(IpAddr, Address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));

impl FromAvpValue for Enumerated {
    const KIND: ValueKind = ValueKind::Enumerated;

    fn zero() -> Self {
        Enumerated(0)
    }

    fn from_value(value: &AvpValue) -> Option<Self> {
        match value {
            AvpValue::Enumerated(v) => Some(Enumerated(*v)),
            _ => None,
        }
    }
}

/// Strings are read from every text-like representation, the way the decoder exposes them
/// all through one octet-string accessor. Non-UTF-8 octets are replaced, not rejected.
impl FromAvpValue for String {
    const KIND: ValueKind = ValueKind::Utf8String;

    fn zero() -> Self {
        String::new()
    }

    fn from_value(value: &AvpValue) -> Option<Self> {
        match value {
            AvpValue::Utf8String(s) | AvpValue::DiameterIdentity(s) | AvpValue::DiameterUri(s) => {
                Some(s.clone())
            }
            AvpValue::OctetString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }
}
