//! the error taxonomy of this crate

use thiserror::Error;

/// Everything that can go wrong while operating on a volume.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VolumeError {
    /// the path does not start with `V:` or walks through a file
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// the addressed file or directory does not exist
    #[error("no such file or directory: {0}")]
    NotFound(String),
    /// the path resolved to a directory where a file was required
    #[error("not a file: {0}")]
    NotAFile(String),
    /// the path resolved to a file where a directory was required
    #[error("not a directory: {0}")]
    NotADirectory(String),
    /// the node table has no free entry left
    #[error("node table has no free entry")]
    OutOfNodes,
    /// the block region has no free block left
    #[error("block region has no free block")]
    OutOfSpace,
    /// the directory anchor block has no free slot left
    #[error("directory has no free slot")]
    DirectoryFull,
    /// a name does not fit the on-image name field
    #[error("name {name:?} exceeds the maximum of {limit} bytes")]
    NameTooLong { name: String, limit: usize },
    /// the image bytes contradict the header or themselves
    #[error("corrupt image: {0}")]
    CorruptImage(String),
    /// the four geometry parameters do not describe a usable image
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    /// host file access failed
    #[error("image I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VolumeError>;
