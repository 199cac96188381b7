//! nlframe code generation
//!
//! Turns a grounded DSL action into a dataframe call:
//!
//! ```text
//!   template + entities ──► ActionCatalog ──► OperationDescriptor
//!                                                  │
//!                              Workspace ──► RefinerSession ◄── user edits
//!                                                  │
//!                                            CodeGenerator ──► code
//! ```
//!
//! - `catalog`: fixed template → operation mapping
//! - `params`: hand-authored parameter tables per operation
//! - `schema`: dataset schemas and the workspace that owns them
//! - `refiner`: the per-selection parameter session (state machine)
//! - `render`: pure code rendering of a session
//! - `resolver`: ranked classifier candidates → resolved operations
//! - `memory`: suggestions from past parameter choices

pub mod catalog;
pub mod config;
pub mod error;
pub mod memory;
pub mod params;
pub mod refiner;
pub mod render;
pub mod resolver;
pub mod schema;

pub use catalog::{ActionCatalog, OperationDescriptor, ParamOverride, ScopeKind, TargetKind};
pub use config::{ConfigError, EngineConfig};
pub use error::{RefineError, SessionWarning};
pub use memory::{remembered_values, suggestions, PastActions, Suggestion};
pub use params::{DType, ParamSpec, Selection};
pub use refiner::{
    Axis, ParameterState, RefinerSession, ReturnBinding, ScopeState, SessionSnapshot,
    SessionState,
};
pub use render::CodeGenerator;
pub use resolver::{Candidate, CandidateResolver, Resolution, ResolvedCandidate};
pub use schema::{Dataset, SchemaSnapshot, Workspace};
