//! # Decoded AVP Records
//!
//! The index never parses wire bytes. It consumes whatever tree the Diameter decoder
//! produced, through the [`AvpRecord`] trait: vendor id, attribute id, a format tag, the
//! decoded value, and for grouped AVPs the ordered child list.
//!
//! [`Avp`] is the record type shipped with the crate. It is plain data (serde-enabled), so a
//! decoder can build it directly and tests can write trees as JSON.
//!
//! ## Preconditions
//!
//! The tree is assumed to be finite and acyclic. Owned `Vec` children make cycles
//! impossible for [`Avp`]; other implementations that generate children lazily are bounded
//! by the index builder's depth guard (see [`crate::config::IndexerConfig`]).

use crate::path::AvpId;
use crate::value::{AvpValue, ValueKind};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Contract between a Diameter decoder and the index.
pub trait AvpRecord {
    fn vendor_id(&self) -> u32;

    fn attr_id(&self) -> u32;

    fn id(&self) -> AvpId {
        AvpId::new(self.vendor_id(), self.attr_id())
    }

    /// Dictionary name (e.g. `"CC-Total-Octets"`), used by the diagnostic helpers.
    fn name(&self) -> &str;

    /// Format tag the dictionary declares for this AVP.
    fn format(&self) -> ValueKind;

    fn value(&self) -> &AvpValue;

    /// AVP Length field as decoded (header plus data, excluding padding).
    fn length(&self) -> u32;

    /// Display string for the value.
    fn decoded_value(&self) -> Cow<'_, str> {
        Cow::Owned(self.value().to_string())
    }

    /// Child AVPs, in wire order. Empty for every non-grouped AVP.
    fn children(&self) -> &[Self]
    where
        Self: Sized;

    /// An AVP with an empty child list is treated as a scalar, whatever its format says.
    fn is_grouped(&self) -> bool
    where
        Self: Sized,
    {
        !self.children().is_empty()
    }
}

const HEADER_LEN: u32 = 8;
const VENDOR_ID_LEN: u32 = 4;

/// A decoded AVP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avp {
    pub vendor_code: u32,
    pub attribute_code: u32,
    pub attribute_name: String,
    pub format: ValueKind,
    pub length: u32,
    pub value: AvpValue,
    /// Decoder-provided display string; rendered from `value` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grouped: Vec<Avp>,
}

impl Avp {
    /// Build a scalar AVP. Format and length are derived from the value.
    pub fn new(id: impl Into<AvpId>, name: impl Into<String>, value: AvpValue) -> Self {
        let id = id.into();
        let length = header_len(id).saturating_add(data_len(&value));
        Self {
            vendor_code: id.vendor_id,
            attribute_code: id.attr_id,
            attribute_name: name.into(),
            format: value.kind(),
            length,
            value,
            decoded_value: None,
            grouped: Vec::new(),
        }
    }

    /// Build a grouped AVP around `children`.
    pub fn grouped(id: impl Into<AvpId>, name: impl Into<String>, children: Vec<Avp>) -> Self {
        let id = id.into();
        let data = children
            .iter()
            .fold(0u32, |total, c| total.saturating_add(padded(c.length)));
        Self {
            vendor_code: id.vendor_id,
            attribute_code: id.attr_id,
            attribute_name: name.into(),
            format: ValueKind::Grouped,
            length: header_len(id).saturating_add(data),
            value: AvpValue::Grouped,
            decoded_value: None,
            grouped: children,
        }
    }

    /// Attach the decoder's display string.
    pub fn with_decoded_value(mut self, decoded: impl Into<String>) -> Self {
        self.decoded_value = Some(decoded.into());
        self
    }
}

fn header_len(id: AvpId) -> u32 {
    if id.vendor_id == 0 {
        HEADER_LEN
    } else {
        HEADER_LEN + VENDOR_ID_LEN
    }
}

fn data_len(value: &AvpValue) -> u32 {
    match value {
        AvpValue::Unsigned32(_)
        | AvpValue::Integer32(_)
        | AvpValue::Float32(_)
        | AvpValue::Enumerated(_)
        | AvpValue::Time(_) => 4,
        AvpValue::Unsigned64(_) | AvpValue::Integer64(_) | AvpValue::Float64(_) => 8,
        AvpValue::Utf8String(s) | AvpValue::DiameterIdentity(s) | AvpValue::DiameterUri(s) => {
            wire_len(s.len())
        }
        AvpValue::OctetString(bytes) => wire_len(bytes.len()),
        // 2-octet address family followed by the address
        AvpValue::Address(std::net::IpAddr::V4(_)) => 2 + 4,
        AvpValue::Address(std::net::IpAddr::V6(_)) => 2 + 16,
        AvpValue::Grouped => 0,
    }
}

/// Lengths past `u32::MAX` saturate; the wire format cannot carry them anyway.
fn wire_len(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn padded(len: u32) -> u32 {
    len.div_ceil(4).saturating_mul(4)
}

impl AvpRecord for Avp {
    fn vendor_id(&self) -> u32 {
        self.vendor_code
    }

    fn attr_id(&self) -> u32 {
        self.attribute_code
    }

    fn name(&self) -> &str {
        &self.attribute_name
    }

    fn format(&self) -> ValueKind {
        self.format
    }

    fn value(&self) -> &AvpValue {
        &self.value
    }

    fn length(&self) -> u32 {
        self.length
    }

    fn decoded_value(&self) -> Cow<'_, str> {
        match &self.decoded_value {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(self.value.to_string()),
        }
    }

    fn children(&self) -> &[Self] {
        &self.grouped
    }
}

/// A decoded Diameter message: the header fields [`crate::dump::render_message`] reports,
/// plus the root AVPs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub command_code: u32,
    pub application_id: u32,
    pub avps: Vec<Avp>,
}

impl Message {
    pub fn new(command_code: u32, application_id: u32, avps: Vec<Avp>) -> Self {
        Self {
            command_code,
            application_id,
            avps,
        }
    }
}
