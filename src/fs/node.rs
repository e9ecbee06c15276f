//! node entries: the fixed-size records describing files and directories

use super::{is_zero_slot, read_ptr, write_ptr};
use crate::error::{Result, VolumeError};
use crate::fs::geometry::Geometry;
use crate::utils::time_util::Ticks;

/// type tag of a file node
pub const TAG_FILE: u8 = 0x00;
/// type tag of a directory node
pub const TAG_DIRECTORY: u8 = 0xFF;

/// an enum to describe the type of a node
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    #[inline]
    pub const fn tag(self) -> u8 {
        match self {
            NodeKind::File => TAG_FILE,
            NodeKind::Directory => TAG_DIRECTORY,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            TAG_FILE => Ok(NodeKind::File),
            TAG_DIRECTORY => Ok(NodeKind::Directory),
            other => Err(VolumeError::CorruptImage(format!(
                "unknown node type tag {:#04x}",
                other
            ))),
        }
    }
}

/// Which node a path resolved to.
///
/// The root directory has no node-table slot; it is addressed by its own
/// variant instead of a sentinel id.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeRef {
    Root,
    Id(u64),
}

/// One decoded node entry.
///
/// On the image an entry is `[tag][name][file info][anchor pointer]`; a free
/// entry is all zeros. A live entry can never sum to zero: a directory's tag
/// is 0xFF and a file's anchor pointer sits past the node table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub kind: NodeKind,
    pub name: String,
    pub file_info: Vec<u8>,
    /// absolute byte offset of the anchor block
    pub pointer: u64,
}

impl NodeRecord {
    /// a file entry, metadata packed as `[u32 size][i64 modified]`
    pub fn file(
        name: &str,
        size: u32,
        modified: Ticks,
        pointer: u64,
        geometry: &Geometry,
    ) -> Self {
        let mut info = vec![0u8; geometry.file_info_size()];
        info[0..4].copy_from_slice(&size.to_le_bytes());
        info[4..12].copy_from_slice(&modified.raw().to_le_bytes());
        NodeRecord {
            kind: NodeKind::File,
            name: name.to_string(),
            file_info: info,
            pointer,
        }
    }

    /// a directory entry, metadata packed as `[i64 modified]`
    pub fn directory(name: &str, modified: Ticks, pointer: u64, geometry: &Geometry) -> Self {
        let mut info = vec![0u8; geometry.file_info_size()];
        info[0..8].copy_from_slice(&modified.raw().to_le_bytes());
        NodeRecord {
            kind: NodeKind::Directory,
            name: name.to_string(),
            file_info: info,
            pointer,
        }
    }

    /// The root directory's record. It exists only at runtime: the root has
    /// no name, metadata or tag on the image, and its anchor is always the
    /// first block.
    pub fn synthetic_root(geometry: &Geometry) -> Self {
        NodeRecord {
            kind: NodeKind::Directory,
            name: super::path::ROOT_NAME.to_string(),
            file_info: Vec::new(),
            pointer: geometry.storage_start(),
        }
    }

    /// recorded byte length of a file, the first metadata field
    pub fn file_size(&self) -> u32 {
        match self.file_info.get(0..4) {
            Some(bytes) => u32::from_le_bytes(bytes.try_into().unwrap()),
            None => 0,
        }
    }

    /// recorded modification time; files keep it past the size field
    pub fn modified(&self) -> Ticks {
        let range = match self.kind {
            NodeKind::File => self.file_info.get(4..12),
            NodeKind::Directory => self.file_info.get(0..8),
        };
        match range {
            Some(bytes) => Ticks::from_raw(i64::from_le_bytes(bytes.try_into().unwrap())),
            None => Ticks::default(),
        }
    }

    /// Packs the record into `node_entry_size` bytes.
    pub fn pack(&self, geometry: &Geometry) -> Result<Vec<u8>> {
        let name_bytes = self.name.as_bytes();
        if name_bytes.len() > geometry.max_name_length() {
            return Err(VolumeError::NameTooLong {
                name: self.name.clone(),
                limit: geometry.max_name_length(),
            });
        }
        let mut entry = vec![0u8; geometry.node_entry_size()];
        entry[0] = self.kind.tag();
        entry[1..1 + name_bytes.len()].copy_from_slice(name_bytes);
        let info_start = 1 + geometry.max_name_length();
        let info_len = self.file_info.len().min(geometry.file_info_size());
        entry[info_start..info_start + info_len].copy_from_slice(&self.file_info[..info_len]);
        let pointer_start = info_start + geometry.file_info_size();
        write_ptr(
            &mut entry[pointer_start..],
            geometry.pointer_size(),
            self.pointer,
        );
        Ok(entry)
    }

    /// Decodes `node_entry_size` bytes; `None` marks a free entry.
    pub fn unpack(entry: &[u8], geometry: &Geometry) -> Result<Option<Self>> {
        if is_zero_slot(entry) {
            return Ok(None);
        }
        let kind = NodeKind::from_tag(entry[0])?;
        let name_field = &entry[1..1 + geometry.max_name_length()];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(name_field.len());
        let name = String::from_utf8_lossy(&name_field[..name_len]).into_owned();
        let info_start = 1 + geometry.max_name_length();
        let file_info = entry[info_start..info_start + geometry.file_info_size()].to_vec();
        let pointer_start = info_start + geometry.file_info_size();
        let pointer = read_ptr(&entry[pointer_start..], geometry.pointer_size());
        Ok(Some(NodeRecord {
            kind,
            name,
            file_info,
            pointer,
        }))
    }
}
