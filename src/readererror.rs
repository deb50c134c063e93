use std::path::PathBuf;

use thiserror::Error;

/// 讀取 BOCOP 解檔案時可能發生的所有錯誤。
///
/// 所有錯誤在偵測點立即回傳（fail-fast），唯一例外是空白檔案
/// 會被轉成單一元素的 placeholder，見 `ExportContent`。
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("time {time} is outside the step domain [{min}, {max}]")]
    OutOfDomain {
        time: f64,
        min: f64,
        max: f64
    },

    #[error("state '{state}' has no adjoint variable '{adjoint}'")]
    MissingAdjoint {
        state: String,
        adjoint: String
    },

    #[error("malformed file {path:?}: line {line}: cannot parse '{token}' as a number")]
    MalformedFile {
        path: PathBuf,
        line: usize,
        token: String
    },

    #[error("the given shape ({n_cols}, {n_rows}) is of size {}, should be {expected}", .n_cols * .n_rows)]
    ShapeMismatch {
        n_cols: usize,
        n_rows: usize,
        expected: usize
    },

    #[error("key '{0}' not found")]
    NameNotFound(String),

    #[error("inversion failed: {0}")]
    InversionFailed(String),

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    JsonParseError(#[from] serde_json::Error)
}

impl ReaderError {
    pub fn invalid_input(message: impl Into<String>) -> ReaderError {
        ReaderError::InvalidInput(message.into())
    }

    pub fn name_not_found(name: &str) -> ReaderError {
        ReaderError::NameNotFound(name.to_owned())
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;
