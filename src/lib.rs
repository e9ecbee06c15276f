//! A self-contained virtual disk: a hierarchical file system whose entire
//! state lives in one contiguous byte buffer that can be persisted to, and
//! reloaded from, a single host file.
//!
//! A [Volume] is created with a chosen [Geometry] and exposes directory and
//! file operations against a root volume designated `V:\`.
//!
//! ```
//! use vdisk::{Geometry, Volume};
//!
//! let mut volume = Volume::format(Geometry::new(64, 12, 65_536, 24)?)?;
//! volume.create_directory("V:\\configs")?;
//! volume.write_file_bytes("V:\\configs\\a.bin", b"hello")?;
//! assert_eq!(volume.read_file_bytes("V:\\configs\\a.bin")?, b"hello");
//!
//! // the whole state travels in the image bytes
//! let reloaded = Volume::from_bytes(volume.save_to_buffer())?;
//! assert!(reloaded.exists_file("V:\\configs\\a.bin")?);
//! # Ok::<(), vdisk::VolumeError>(())
//! ```
pub mod cli_interface;
pub mod error;
pub mod fs;
pub mod mkfs;
pub mod utils;

pub use error::{Result, VolumeError};
pub use fs::{DirectoryHandle, FileHandle, Geometry, NodeKind, NodeRef, Volume};
