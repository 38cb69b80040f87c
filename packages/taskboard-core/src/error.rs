use thiserror::Error;

use crate::ids::{EntityId, EntityKind};
use crate::validation::FieldError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("invalid session transition: {0}")]
    InvalidTransition(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: EntityId },
    #[error("duplicate id {id} in {kind} partition")]
    DuplicateId { kind: EntityKind, id: EntityId },
    #[error("expected a {expected} entity, got {found}")]
    KindMismatch {
        expected: EntityKind,
        found: EntityKind,
    },
    #[error("unknown {status} value {value:?}")]
    UnknownStatus { status: &'static str, value: String },
    #[error("validation failed: {}", describe_fields(.0))]
    Validation(Vec<FieldError>),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

fn describe_fields(fields: &[FieldError]) -> String {
    fields.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
