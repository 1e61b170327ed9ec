/// Error type shared by every stage of the export pipeline
use thiserror::Error;

/// Which index list of a face a bad index came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Position,
    Uv,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Position => f.write_str("position"),
            IndexKind::Uv => f.write_str("uv"),
        }
    }
}

/// Fatal errors. Any of these aborts the run before output is written.
#[derive(Debug, Error)]
pub enum Error {
    #[error("face {face}: {kind} index {index} out of range (have {len})")]
    IndexOutOfRange {
        face: usize,
        kind: IndexKind,
        index: i64,
        len: usize,
    },

    #[error("line {line}: face has {vertices} vertices, need at least 3")]
    FaceTooSmall { line: usize, vertices: usize },

    #[error("{kind} {index} is not a finite number")]
    NonFinite { kind: IndexKind, index: usize },

    #[error("no texture atlas available")]
    MissingAtlas,

    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
