//! Composition of GraphQL selection trees and canonical argument values.
//!
//! Selections are assembled on a [`QueryNode`] from typed field tokens declared with
//! [`field_vocabulary!`], nested relations, polymorphic casts and a pagination bound, then
//! validated into a [`Query`] that renders the selection text.
//!
//! Argument values come from any `T: serde::Serialize`: [`normalize`] turns them into a
//! canonical [`Value`] tree, and [`coerce`] maps each scalar onto its wire representation.
//!
//! ```ignore
//! field_vocabulary! {
//!     pub enum ItemField for "Item" { Name => "Name", CreatedAt => "CreatedAt" }
//! }
//!
//! let mut items = QueryNode::new::<ItemField>("items")?;
//! items.select_fields([ItemField::Name, ItemField::CreatedAt])?.set_pagination(25)?;
//! assert_eq!(items.build()?.to_string(), "items(first: 25) { Name CreatedAt }");
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

pub mod coerce;
pub mod config;
mod display_helpers;
pub mod error;
pub mod normalize;
pub mod selection;
pub mod value;

pub use crate::coerce::ScalarKind;
pub use crate::coerce::WireScalar;
pub use crate::config::Configuration;
pub use crate::error::CoercionError;
pub use crate::error::ComposeError;
pub use crate::error::NormalizeError;
pub use crate::normalize::Normalizer;
pub use crate::normalize::normalize;
pub use crate::selection::FieldToken;
pub use crate::selection::OperationType;
pub use crate::selection::Query;
pub use crate::selection::QueryNode;
pub use crate::selection::Vocabulary;
pub use crate::value::Decimal;
pub use crate::value::Mapping;
pub use crate::value::Scalar;
pub use crate::value::Value;
