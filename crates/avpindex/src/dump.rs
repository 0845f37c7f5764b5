//! # Diagnostics
//!
//! Helpers for logging and snapshotting decoded AVP trees. None of them use the index: they
//! walk the tree directly, in document order.
//!
//! - [`walk`]: every AVP with its nesting level.
//! - [`visit_leaves`] / [`visit_message_leaves`]: every non-grouped AVP.
//! - [`add_avp_data_to_map`] / [`json_from_avp_fields`]: flatten allow-listed attribute
//!   names into `name → decoded value`.
//! - [`render_avps`] / [`render_message`]: indented, one AVP per line. The message form
//!   starts with a header line naming the command and application.
//!
//! Rendering returns strings; printing is left to the caller.

use crate::error::Result;
use crate::model::{Avp, AvpRecord, Message};
use std::collections::BTreeMap;
use std::fmt::{self, Write};

const INDENT: &str = "  ";

/// Pre-order iterator over a forest of AVPs, yielding `(level, avp)` with roots at level 0.
pub struct Walk<'a, A> {
    stack: Vec<std::slice::Iter<'a, A>>,
}

impl<'a, A: AvpRecord> Iterator for Walk<'a, A> {
    type Item = (usize, &'a A);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.len().saturating_sub(1);
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(avp) => {
                    let children = avp.children();
                    if !children.is_empty() {
                        self.stack.push(children.iter());
                    }
                    return Some((level, avp));
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// Walk `avps` and all of their descendants in document order.
pub fn walk<A: AvpRecord>(avps: &[A]) -> Walk<'_, A> {
    Walk {
        stack: vec![avps.iter()],
    }
}

/// Call `visitor` for every non-grouped AVP, in document order.
pub fn visit_leaves<'a, A, F>(avps: &'a [A], mut visitor: F)
where
    A: AvpRecord,
    F: FnMut(&'a A),
{
    for (_, avp) in walk(avps) {
        if !avp.is_grouped() {
            visitor(avp);
        }
    }
}

/// [`visit_leaves`] over every AVP of a message.
pub fn visit_message_leaves<'a, F>(message: &'a Message, visitor: F)
where
    F: FnMut(&'a Avp),
{
    visit_leaves(&message.avps, visitor)
}

/// Copy the decoded value of every non-grouped AVP whose name is already a key of `data`.
///
/// Names not present in `data` are ignored. A name that occurs several times ends up with
/// the value of its last occurrence in document order.
pub fn add_avp_data_to_map<A: AvpRecord>(avps: &[A], data: &mut BTreeMap<String, String>) {
    visit_leaves(avps, |avp| {
        if let Some(slot) = data.get_mut(avp.name()) {
            *slot = avp.decoded_value().into_owned();
        }
    });
}

/// Flatten the `include_fields` attributes of `avps` into a JSON object.
///
/// Every requested name appears as a key; names with no matching AVP map to `""`. Keys are
/// sorted.
pub fn json_from_avp_fields<A, S>(avps: &[A], include_fields: &[S]) -> Result<String>
where
    A: AvpRecord,
    S: AsRef<str>,
{
    let mut data: BTreeMap<String, String> = include_fields
        .iter()
        .map(|field| (field.as_ref().to_string(), String::new()))
        .collect();
    add_avp_data_to_map(avps, &mut data);
    Ok(serde_json::to_string(&data)?)
}

/// Write one line per AVP, indented two spaces per nesting level.
///
/// Grouped AVPs show their length; scalar AVPs show their decoded value:
///
/// ```text
/// Multiple-Services-Credit-Control(code=456,vendor=0,format=Grouped): len=52
///   Rating-Group(code=432,vendor=0,format=Unsigned32) = 100
/// ```
pub fn write_avps<A: AvpRecord, W: Write>(out: &mut W, avps: &[A], indent: usize) -> fmt::Result {
    for (level, avp) in walk(avps) {
        let pad = INDENT.repeat(indent + level);
        if avp.is_grouped() {
            writeln!(
                out,
                "{}{}(code={},vendor={},format={}): len={}",
                pad,
                avp.name(),
                avp.attr_id(),
                avp.vendor_id(),
                avp.format(),
                avp.length()
            )?;
        } else {
            writeln!(
                out,
                "{}{}(code={},vendor={},format={}) = {}",
                pad,
                avp.name(),
                avp.attr_id(),
                avp.vendor_id(),
                avp.format(),
                avp.decoded_value()
            )?;
        }
    }
    Ok(())
}

pub fn render_avps<A: AvpRecord>(avps: &[A]) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_avps(&mut out, avps, 0);
    out
}

/// [`render_avps`] under a header line:
///
/// ```text
/// Message(command=272,application=4): avps=9
/// ```
pub fn render_message(message: &Message) -> String {
    let mut out = format!(
        "Message(command={},application={}): avps={}\n",
        message.command_code,
        message.application_id,
        message.avps.len()
    );
    let _ = write_avps(&mut out, &message.avps, 0);
    out
}
