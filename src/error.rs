use thiserror::Error;

use crate::ai::{AiError, FlowError};
use crate::config::ConfigError;
use crate::converter::ConvertError;
use crate::csv_json::CsvJsonError;
use crate::notes::NotesError;
use crate::storage::StorageError;
use crate::units::UnitError;

/// Any failure a tool can report
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Units(#[from] UnitError),

    #[error("{0}")]
    Password(String),

    #[error(transparent)]
    CsvJson(#[from] CsvJsonError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Notes(#[from] NotesError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A name or key given on the command line matched nothing
    #[error("{0}")]
    Usage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
