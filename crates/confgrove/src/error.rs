use std::path::PathBuf;

use crate::value::ValueKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("config file {} already exists", path.display())]
    AlreadyExists { path: PathBuf },
    #[error("config path {} does not exist", path.display())]
    MissingPath { path: PathBuf },
    #[error("config document {} is not a JSON object", path.display())]
    InvalidDocument { path: PathBuf },
    #[error("category `{path}` missing from config document")]
    MissingCategory { path: String },
    #[error("value `{path}` declared as {expected}, found {found} on disk")]
    TypeMismatch {
        /// Dotted path, e.g. `general.max_speed`.
        path: String,
        expected: ValueKind,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
