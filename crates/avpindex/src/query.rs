//! # Typed Retrieval
//!
//! [`AvpQuery`] is the lookup surface. It is implemented by the index itself (root scope:
//! "this id, anywhere in the message") and by [`ScopedView`] ("this id, inside these
//! groups"). Every method takes the `(vendor_id, attr_id)` of the AVP wanted and combines it
//! with the receiver's scope into a [`QueryPath`].
//!
//! ```ignore
//! let index = AvpIndex::from_message(&ccr)?;
//! let request_number = index.get_u32(0, 415)?;
//!
//! // Total octets reported inside Used-Service-Unit, inside any MSCC
//! let usage = index
//!     .descend_into_group(0, 456)
//!     .descend_into_group(0, 446)
//!     .accumulate_u64(0, 421)?;
//! ```
//!
//! ## No-Match Policy
//!
//! The `get_*` methods return the type's zero value when nothing matches, so callers can
//! read optional AVPs without branching. Use [`AvpQuery::find`] when absence and zero must
//! be told apart.
//!
//! ## Type Checking
//!
//! Requesting a kind the matched AVP does not hold fails with
//! [`AvpIndexError::TypeMismatch`](crate::AvpIndexError::TypeMismatch). Only the first match
//! is inspected by the getters; [`AvpQuery::accumulate_u64`] checks every match.
//!
//! ## Scope Narrowing
//!
//! [`ScopedView::descend_into_group`] returns a new view one level deeper and leaves the
//! receiver untouched, so one view can seed several independent queries. Scopes
//! disambiguate by id, not by instance: a view scoped to MSCC sees the children of every
//! MSCC in the message.

use crate::error::Result;
use crate::index::{AvpIndex, Leaf};
use crate::model::{Avp, AvpRecord};
use crate::path::{AvpId, QueryPath};
use crate::value::{AvpValue, Enumerated, FromAvpValue};
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use tracing::trace;

/// Lookups against an index, relative to a scope.
pub trait AvpQuery<'a, A: AvpRecord + 'a> {
    fn index(&self) -> &AvpIndex<'a, A>;

    /// Required enclosing groups, innermost first. Empty for the root scope.
    fn scope(&self) -> QueryPath;

    /// The full query path for `(vendor_id, attr_id)` under this scope.
    fn query_path(&self, vendor_id: u32, attr_id: u32) -> QueryPath {
        self.scope().descend(AvpId::new(vendor_id, attr_id))
    }

    /// Matching occurrences, in bucket order. The leaves borrow the receiver.
    fn matches<'s>(&'s self, vendor_id: u32, attr_id: u32) -> Vec<Leaf<'s, 'a, A>>
    where
        'a: 's,
    {
        let query = self.query_path(vendor_id, attr_id);
        self.index().matching(&query).collect()
    }

    /// Value of the first match, or `None` if nothing matches.
    fn find<T: FromAvpValue>(&self, vendor_id: u32, attr_id: u32) -> Result<Option<T>> {
        let query = self.query_path(vendor_id, attr_id);
        match self.index().first_match(&query) {
            Some(leaf) => leaf.avp.value().decode(leaf.avp.id()).map(Some),
            None => Ok(None),
        }
    }

    /// Value of the first match, or `T`'s zero value if nothing matches.
    fn get<T: FromAvpValue>(&self, vendor_id: u32, attr_id: u32) -> Result<T> {
        Ok(self.find(vendor_id, attr_id)?.unwrap_or_else(T::zero))
    }

    fn get_u32(&self, vendor_id: u32, attr_id: u32) -> Result<u32> {
        self.get(vendor_id, attr_id)
    }

    fn get_u64(&self, vendor_id: u32, attr_id: u32) -> Result<u64> {
        self.get(vendor_id, attr_id)
    }

    fn get_i32(&self, vendor_id: u32, attr_id: u32) -> Result<i32> {
        self.get(vendor_id, attr_id)
    }

    fn get_i64(&self, vendor_id: u32, attr_id: u32) -> Result<i64> {
        self.get(vendor_id, attr_id)
    }

    fn get_f32(&self, vendor_id: u32, attr_id: u32) -> Result<f32> {
        self.get(vendor_id, attr_id)
    }

    fn get_f64(&self, vendor_id: u32, attr_id: u32) -> Result<f64> {
        self.get(vendor_id, attr_id)
    }

    fn get_enumerated(&self, vendor_id: u32, attr_id: u32) -> Result<u32> {
        self.get::<Enumerated>(vendor_id, attr_id).map(|e| e.0)
    }

    fn get_time(&self, vendor_id: u32, attr_id: u32) -> Result<DateTime<Utc>> {
        self.get(vendor_id, attr_id)
    }

    fn get_utf8_string(&self, vendor_id: u32, attr_id: u32) -> Result<String> {
        self.get(vendor_id, attr_id)
    }

    fn get_ip_address(&self, vendor_id: u32, attr_id: u32) -> Result<IpAddr> {
        self.get(vendor_id, attr_id)
    }

    /// Call `visitor` once per match, in bucket order. Returns the number of calls.
    fn visit<F>(&self, vendor_id: u32, attr_id: u32, mut visitor: F) -> usize
    where
        F: FnMut(&'a A),
    {
        let query = self.query_path(vendor_id, attr_id);
        let mut count = 0;
        for leaf in self.index().matching(&query) {
            visitor(leaf.avp);
            count += 1;
        }
        count
    }

    /// Sum of every match, widened to `u64`. Zero if nothing matches.
    ///
    /// Unsigned32 and Unsigned64 values are both accepted; any other kind is a
    /// `TypeMismatch`. The sum wraps on overflow.
    fn accumulate_u64(&self, vendor_id: u32, attr_id: u32) -> Result<u64> {
        let mut sum = 0u64;
        let mut failure = None;
        self.visit(vendor_id, attr_id, |avp| {
            if failure.is_some() {
                return;
            }
            let value = match avp.value() {
                AvpValue::Unsigned32(v) => Ok(u64::from(*v)),
                other => other.decode::<u64>(avp.id()),
            };
            match value {
                Ok(v) => sum = sum.wrapping_add(v),
                Err(e) => failure = Some(e),
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(sum),
        }
    }
}

impl<'a, A: AvpRecord> AvpQuery<'a, A> for AvpIndex<'a, A> {
    fn index(&self) -> &AvpIndex<'a, A> {
        self
    }

    fn scope(&self) -> QueryPath {
        QueryPath::any()
    }
}

impl<'a, A: AvpRecord> AvpIndex<'a, A> {
    /// View whose lookups only match AVPs directly inside a `(vendor_id, attr_id)` group.
    pub fn descend_into_group(&self, vendor_id: u32, attr_id: u32) -> ScopedView<'_, 'a, A> {
        ScopedView::new(self, QueryPath::any()).descend_into_group(vendor_id, attr_id)
    }
}

/// An index paired with a scope of required enclosing groups.
pub struct ScopedView<'i, 'a, A: AvpRecord = Avp> {
    index: &'i AvpIndex<'a, A>,
    scope: QueryPath,
}

impl<'i, 'a, A: AvpRecord> ScopedView<'i, 'a, A> {
    /// View over `index` restricted to `scope`.
    pub fn new(index: &'i AvpIndex<'a, A>, scope: QueryPath) -> Self {
        Self { index, scope }
    }

    /// One more required level: matches must sit directly inside a `(vendor_id, attr_id)`
    /// group, which itself sits inside this view's scope.
    pub fn descend_into_group(&self, vendor_id: u32, attr_id: u32) -> ScopedView<'i, 'a, A> {
        let scope = self.scope.descend(AvpId::new(vendor_id, attr_id));
        trace!(scope = %scope, "narrowed AVP query scope");
        Self {
            index: self.index,
            scope,
        }
    }

    pub fn scope_path(&self) -> &QueryPath {
        &self.scope
    }
}

impl<A: AvpRecord> Clone for ScopedView<'_, '_, A> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            scope: self.scope.clone(),
        }
    }
}

impl<A: AvpRecord> std::fmt::Debug for ScopedView<'_, '_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedView")
            .field("scope", &self.scope.to_string())
            .finish()
    }
}

impl<'a, A: AvpRecord> AvpQuery<'a, A> for ScopedView<'_, 'a, A> {
    fn index(&self) -> &AvpIndex<'a, A> {
        self.index
    }

    fn scope(&self) -> QueryPath {
        self.scope.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AvpIndexError;
    use crate::test_utils::{credit_control_request, ids};
    use crate::value::ValueKind;
    use chrono::TimeZone;
    use std::net::Ipv4Addr;

    fn g(id: u32, children: Vec<Avp>) -> Avp {
        Avp::grouped(AvpId::ietf(id), format!("Group-{}", id), children)
    }

    fn scalar(id: u32, value: AvpValue) -> Avp {
        Avp::new(AvpId::ietf(id), format!("Attr-{}", id), value)
    }

    /// Two G(0/100) groups at the root, each holding one A(0/10).
    fn two_groups() -> Vec<Avp> {
        vec![
            g(100, vec![scalar(10, AvpValue::Unsigned32(5))]),
            g(100, vec![scalar(10, AvpValue::Unsigned32(7))]),
        ]
    }

    #[test]
    fn test_root_lookup_returns_first_in_document_order() {
        let roots = two_groups();
        let index = AvpIndex::build(&roots).unwrap();
        assert_eq!(index.get_u32(0, 10).unwrap(), 5);
    }

    #[test]
    fn test_scope_disambiguates_by_id_not_instance() {
        let roots = two_groups();
        let index = AvpIndex::build(&roots).unwrap();
        assert_eq!(
            index.descend_into_group(0, 100).accumulate_u64(0, 10).unwrap(),
            12
        );
    }

    #[test]
    fn test_scoped_lookup_equals_hand_built_query() {
        let roots = vec![
            scalar(10, AvpValue::Unsigned32(1)),
            g(200, vec![scalar(10, AvpValue::Unsigned32(2))]),
            g(100, vec![scalar(10, AvpValue::Unsigned32(3))]),
        ];
        let index = AvpIndex::build(&roots).unwrap();

        let scoped = index.descend_into_group(0, 100).get_u32(0, 10).unwrap();
        let query = QueryPath::new(AvpId::ietf(100)).descend(AvpId::ietf(10));
        let leaf = index.first_match(&query).unwrap();
        let direct = leaf.avp.value().decode::<u32>(leaf.avp.id()).unwrap();

        assert_eq!(scoped, 3);
        assert_eq!(scoped, direct);
        assert_eq!(index.descend_into_group(0, 100).query_path(0, 10), query);
    }

    #[test]
    fn test_chained_scopes_anchor_deeper_levels() {
        let message = credit_control_request();
        let index = AvpIndex::from_message(&message).unwrap();

        let usu = index
            .descend_into_group(ids::MSCC.vendor_id, ids::MSCC.attr_id)
            .descend_into_group(ids::USED_SERVICE_UNIT.vendor_id, ids::USED_SERVICE_UNIT.attr_id);
        assert_eq!(
            usu.accumulate_u64(0, ids::CC_TOTAL_OCTETS.attr_id).unwrap(),
            1_500 + 4_000
        );

        // CC-Total-Octets is not a direct child of MSCC.
        let mscc = index.descend_into_group(0, ids::MSCC.attr_id);
        assert_eq!(mscc.accumulate_u64(0, ids::CC_TOTAL_OCTETS.attr_id).unwrap(), 0);
    }

    #[test]
    fn test_descend_does_not_affect_the_original_view() {
        let message = credit_control_request();
        let index = AvpIndex::from_message(&message).unwrap();
        let mscc = index.descend_into_group(0, ids::MSCC.attr_id);
        let _usu = mscc.descend_into_group(0, ids::USED_SERVICE_UNIT.attr_id);

        assert_eq!(mscc.scope_path().depth(), 1);
        assert_eq!(mscc.get_u32(0, ids::RATING_GROUP.attr_id).unwrap(), 100);
        assert_eq!(index.get_u32(0, ids::CC_REQUEST_NUMBER.attr_id).unwrap(), 1);
    }

    #[test]
    fn test_no_match_returns_zero_for_every_kind() {
        let roots: Vec<Avp> = vec![];
        let index = AvpIndex::build(&roots).unwrap();
        assert_eq!(index.get_u32(0, 1).unwrap(), 0);
        assert_eq!(index.get_u64(0, 1).unwrap(), 0);
        assert_eq!(index.get_i32(0, 1).unwrap(), 0);
        assert_eq!(index.get_i64(0, 1).unwrap(), 0);
        assert_eq!(index.get_f32(0, 1).unwrap(), 0.0);
        assert_eq!(index.get_f64(0, 1).unwrap(), 0.0);
        assert_eq!(index.get_enumerated(0, 1).unwrap(), 0);
        assert_eq!(index.get_time(0, 1).unwrap(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(index.get_utf8_string(0, 1).unwrap(), "");
        assert_eq!(
            index.get_ip_address(0, 1).unwrap(),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
        assert_eq!(index.visit(0, 1, |_| {}), 0);
        assert_eq!(index.accumulate_u64(0, 1).unwrap(), 0);
    }

    #[test]
    fn test_getters_read_every_kind() {
        let t = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap();
        let roots = vec![
            scalar(1, AvpValue::Unsigned32(32)),
            scalar(2, AvpValue::Unsigned64(64)),
            scalar(3, AvpValue::Integer32(-32)),
            scalar(4, AvpValue::Integer64(-64)),
            scalar(5, AvpValue::Float32(3.5)),
            scalar(6, AvpValue::Float64(6.25)),
            scalar(7, AvpValue::Enumerated(4)),
            scalar(8, AvpValue::Time(t)),
            scalar(9, AvpValue::Utf8String("session;1".into())),
            scalar(10, AvpValue::Address(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)))),
        ];
        let index = AvpIndex::build(&roots).unwrap();
        assert_eq!(index.get_u32(0, 1).unwrap(), 32);
        assert_eq!(index.get_u64(0, 2).unwrap(), 64);
        assert_eq!(index.get_i32(0, 3).unwrap(), -32);
        assert_eq!(index.get_i64(0, 4).unwrap(), -64);
        assert_eq!(index.get_f32(0, 5).unwrap(), 3.5);
        assert_eq!(index.get_f64(0, 6).unwrap(), 6.25);
        assert_eq!(index.get_enumerated(0, 7).unwrap(), 4);
        assert_eq!(index.get_time(0, 8).unwrap(), t);
        assert_eq!(index.get_utf8_string(0, 9).unwrap(), "session;1");
        assert_eq!(
            index.get_ip_address(0, 10).unwrap(),
            IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))
        );
    }

    #[test]
    fn test_wrong_kind_is_type_mismatch() {
        let roots = vec![scalar(1, AvpValue::Utf8String("x".into()))];
        let index = AvpIndex::build(&roots).unwrap();
        match index.get_u32(0, 1).unwrap_err() {
            AvpIndexError::TypeMismatch {
                id,
                expected,
                found,
            } => {
                assert_eq!(id, AvpId::ietf(1));
                assert_eq!(expected, ValueKind::Unsigned32);
                assert_eq!(found, ValueKind::Utf8String);
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_accumulate_rejects_non_unsigned_values() {
        let roots = vec![
            scalar(1, AvpValue::Unsigned64(10)),
            scalar(1, AvpValue::Integer32(-1)),
        ];
        let index = AvpIndex::build(&roots).unwrap();
        assert!(matches!(
            index.accumulate_u64(0, 1),
            Err(AvpIndexError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_accumulate_sums_mixed_widths() {
        let roots = vec![
            scalar(1, AvpValue::Unsigned32(u32::MAX)),
            scalar(1, AvpValue::Unsigned64(1)),
        ];
        let index = AvpIndex::build(&roots).unwrap();
        assert_eq!(index.accumulate_u64(0, 1).unwrap(), u64::from(u32::MAX) + 1);
    }

    #[test]
    fn test_find_distinguishes_absent_from_zero() {
        let roots = vec![scalar(1, AvpValue::Unsigned32(0))];
        let index = AvpIndex::build(&roots).unwrap();
        assert_eq!(index.find::<u32>(0, 1).unwrap(), Some(0));
        assert_eq!(index.find::<u32>(0, 2).unwrap(), None);
    }

    #[test]
    fn test_visit_counts_and_orders_matches() {
        let message = credit_control_request();
        let index = AvpIndex::from_message(&message).unwrap();
        let mut rating_groups = Vec::new();
        let count = index.visit(0, ids::RATING_GROUP.attr_id, |avp| {
            if let AvpValue::Unsigned32(v) = avp.value {
                rating_groups.push(v);
            }
        });
        assert_eq!(count, 2);
        assert_eq!(rating_groups, vec![100, 200]);
    }

    #[test]
    fn test_matches_returns_paths() {
        let message = credit_control_request();
        let index = AvpIndex::from_message(&message).unwrap();
        let usu = index.descend_into_group(0, ids::USED_SERVICE_UNIT.attr_id);
        let found = usu.matches(0, ids::CC_TOTAL_OCTETS.attr_id);
        let rendered: Vec<String> = found.iter().map(|leaf| leaf.path.to_string()).collect();
        assert_eq!(rendered, vec!["0/421.0/446.0/456", "0/421.0/446.0/456"]);
    }

    #[test]
    fn test_vendor_specific_scope() {
        let message = credit_control_request();
        let index = AvpIndex::from_message(&message).unwrap();
        let ps = index
            .descend_into_group(ids::SERVICE_INFORMATION.vendor_id, ids::SERVICE_INFORMATION.attr_id)
            .descend_into_group(ids::PS_INFORMATION.vendor_id, ids::PS_INFORMATION.attr_id);
        assert_eq!(
            ps.get_u32(ids::CHARGING_ID.vendor_id, ids::CHARGING_ID.attr_id)
                .unwrap(),
            0x2a
        );
        assert_eq!(
            ps.get_ip_address(ids::SGSN_ADDRESS.vendor_id, ids::SGSN_ADDRESS.attr_id)
                .unwrap(),
            IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))
        );
        // Right id, wrong vendor.
        assert_eq!(ps.get_u32(0, ids::CHARGING_ID.attr_id).unwrap(), 0);
    }
}
