use nlframe_dsl::Literal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a refiner session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RefineError {
    #[error("no operation has been selected")]
    NotSelected,

    #[error("session is finalized")]
    Finalized,

    #[error("template `{0}` has no implemented operation")]
    NotImplemented(String),

    #[error("operation `{operation}` has no parameter `{name}`")]
    UnknownParameter { operation: String, name: String },

    #[error("invalid value for `{name}`: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("operation `{0}` has no scope")]
    NoScope(String),

    #[error("unknown dataset `{0}`")]
    UnknownDataset(String),
}

/// Recoverable problems attached to a session; the session stays editable.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionWarning {
    #[error("`{parameter}` = {value} has no schema options in dataset `{dataset}`")]
    UnresolvedSchemaDependency {
        parameter: String,
        value: Literal,
        dataset: String,
    },
}
