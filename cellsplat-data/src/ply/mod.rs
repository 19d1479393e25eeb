//! Gaussian asset files: a text header followed by fixed 248-byte records.

mod header;
mod loader;

pub use header::{END_HEADER, PlyHeader, splat_property_names};
pub use loader::{load_splats, read_splats, save_splats, write_splats};

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::codec::DecodeError;

/// Errors raised while reading or writing Gaussian assets.
#[derive(Debug, Error)]
pub enum PlyError {
    #[error("header is missing the 'end_header' line")]
    MissingEndHeader,
    #[error("unsupported header: {0}")]
    HeaderMismatch(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<PlyError>,
    },
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PlyError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| PlyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attach the file the error came from.
    fn in_file(self, path: &Path) -> Self {
        match self {
            PlyError::Io { .. } | PlyError::File { .. } => self,
            other => PlyError::File {
                path: path.to_path_buf(),
                source: Box::new(other),
            },
        }
    }
}
