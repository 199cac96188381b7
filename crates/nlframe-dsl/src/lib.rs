//! nlframe DSL layer
//!
//! This crate owns the text side of DSL actions:
//!
//! - `literal`: the `Literal` value model shared by entities, parameters and
//!   options, with a small nom parser for Python-style literal text
//! - `entity`: entity types, entity sets and decoded (ordered) entities
//! - `lift`: regex-driven lifting of literal spans into typed placeholders
//! - `combine`: grounding a template with an entity set
//!
//! Everything here is pure; no state survives a call.

pub mod combine;
pub mod entity;
pub mod lift;
pub mod literal;

pub use combine::{placeholder_counts, Combination, CombineError, Combiner};
pub use entity::{EntityCounts, EntitySet, EntityType, OrderedEntities};
pub use lift::EntityLifter;
pub use literal::{parse_literal, Literal, LiteralParseError};
