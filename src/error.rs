use thiserror::Error;

use crate::view::Column;

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Broad classification used by callers deciding how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected synchronously; nothing was mutated.
    Validation,
    /// An asynchronous storage request failed.
    Storage,
    /// The model found itself in a state it should never reach.
    Internal,
    Config,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("a notebook named \"{0}\" already exists")]
    DuplicateName(String),
    #[error("notebook \"{0}\" can't be modified: {1}")]
    Restricted(String, String),
    #[error("can't delete notebook \"{0}\": it has already been synchronized")]
    AlreadySynchronized(String),
    #[error("notebook \"{0}\" belongs to a linked notebook and is read-only")]
    FromLinkedNotebook(String),
    #[error("column {0:?} is not editable")]
    NotEditable(Column),
    #[error("item not found")]
    ItemNotFound,
    #[error("{operation} failed: {message}")]
    Storage { operation: String, message: String },
    #[error("internal error: {0}")]
    Internal(String),
    #[error("config error: {0}")]
    Config(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InvalidName(_)
            | CatalogError::DuplicateName(_)
            | CatalogError::Restricted(..)
            | CatalogError::AlreadySynchronized(_)
            | CatalogError::FromLinkedNotebook(_)
            | CatalogError::NotEditable(_)
            | CatalogError::ItemNotFound => ErrorKind::Validation,
            CatalogError::Storage { .. } => ErrorKind::Storage,
            CatalogError::Internal(_) => ErrorKind::Internal,
            CatalogError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn storage(operation: &str, err: impl std::fmt::Display) -> Self {
        CatalogError::Storage {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Config(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(CatalogError::DuplicateName("A".into()).kind(), ErrorKind::Validation);
        assert_eq!(CatalogError::storage("put notebook", "disk full").kind(), ErrorKind::Storage);
        assert_eq!(CatalogError::Internal("orphan".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_storage_message() {
        let err = CatalogError::storage("expunge notebook", "locked");
        assert_eq!(err.to_string(), "expunge notebook failed: locked");
    }
}
