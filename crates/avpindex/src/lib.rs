//! # avpindex
//!
//! Typed, path-aware retrieval over decoded Diameter messages.
//!
//! A decoded Diameter message is a tree: scalar AVPs at the root, grouped AVPs holding
//! further AVPs, sometimes several levels deep. The same attribute routinely shows up more
//! than once (one Rating-Group per Multiple-Services-Credit-Control, one CC-Total-Octets per
//! Used-Service-Unit), so a flat "find the AVP with this code" scan is ambiguous. This crate
//! indexes the tree once and answers "this attribute, inside this group, inside that group"
//! without the caller walking the tree.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Retrieval (query.rs)                                       │
//! │  - AvpQuery: get_* / find / visit / accumulate_u64          │
//! │  - ScopedView: descend_into_group, chainable                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Index (index.rs)                                           │
//! │  - AvpId → every occurrence, document order                 │
//! │  - occurrence paths in a shared arena                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Paths (path.rs)                                            │
//! │  - AvpId, OccurrencePath, QueryPath                         │
//! │  - the asymmetric matcher                                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Decoded records (model.rs, value.rs)                       │
//! │  - AvpRecord: contract with the Diameter decoder            │
//! │  - AvpValue + checked conversions                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```
//! use avpindex::{Avp, AvpId, AvpIndex, AvpQuery, AvpValue};
//!
//! let avps = vec![
//!     Avp::new(AvpId::ietf(415), "CC-Request-Number", AvpValue::Unsigned32(3)),
//!     Avp::grouped(
//!         AvpId::ietf(456),
//!         "Multiple-Services-Credit-Control",
//!         vec![Avp::new(AvpId::ietf(432), "Rating-Group", AvpValue::Unsigned32(100))],
//!     ),
//! ];
//! let index = AvpIndex::build(&avps)?;
//!
//! assert_eq!(index.get_u32(0, 415)?, 3);
//! assert_eq!(index.descend_into_group(0, 456).get_u32(0, 432)?, 100);
//! assert_eq!(index.get_u32(0, 999)?, 0); // absent: zero value
//! # Ok::<(), avpindex::AvpIndexError>(())
//! ```
//!
//! ## Key Principles
//!
//! - **Decoding is not our job.** The index consumes [`AvpRecord`]s and trusts their values.
//! - **Lookups don't fail on absence.** Getters return zero values; [`AvpQuery::find`] is
//!   there when absence matters.
//! - **Lookups do fail on wrong types.** Asking a Unsigned64 AVP for a `u32` is a
//!   [`AvpIndexError::TypeMismatch`], never a reinterpretation.
//! - **Immutable after build.** Queries never mutate the index, so it can be shared.
//! - **No I/O.** Diagnostics in [`dump`] return strings; logging goes through `tracing`.
//!
//! ## Module Overview
//!
//! - [`path`]: identifiers, occurrence and query paths, the matcher
//! - [`index`]: the index and its builder
//! - [`query`]: typed retrieval and scoped views
//! - [`model`]: the record contract and the bundled [`Avp`] type
//! - [`value`]: decoded values and conversions
//! - [`dump`]: flattening, rendering and tree walkers
//! - [`config`]: builder configuration
//! - [`error`]: error types

pub mod config;
pub mod dump;
pub mod error;
pub mod index;
pub mod model;
pub mod path;
pub mod query;
pub mod value;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use config::IndexerConfig;
pub use error::{AvpIndexError, Result};
pub use index::{AvpIndex, Leaf};
pub use model::{Avp, AvpRecord, Message};
pub use path::{matches, AncestorChain, AvpId, OccurrencePath, QueryNode, QueryPath, WILDCARD};
pub use query::{AvpQuery, ScopedView};
pub use value::{AvpValue, Enumerated, FromAvpValue, ValueKind};
