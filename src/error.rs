/// Error types for the recoverable parts of the renderer (asset I/O and
/// worker startup). Rendering preconditions are asserted, not reported.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be opened or read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed line in a wavefront model file
    #[error("model parse error at line {line}: {message}")]
    ObjParse { line: usize, message: String },

    /// A face referenced a vertex, normal or uv that does not exist
    #[error("model line {line}: {kind} index {index} out of range")]
    ObjIndex {
        line: usize,
        kind: &'static str,
        index: i64,
    },

    /// Texture decode or frame encode failure
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// A worker thread could not be spawned
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
