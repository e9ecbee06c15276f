//! the public operation surface of a [Volume]

use std::path::Path;
use std::time::SystemTime;

use log::info;

use super::fs_layout::{Volume, Walk};
use super::node::{NodeKind, NodeRecord, NodeRef};
use super::path;
use crate::error::{Result, VolumeError};
use crate::utils::time_util;

/// What a file stat looks like to a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHandle {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub last_modified: SystemTime,
}

/// What a directory stat looks like to a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryHandle {
    pub name: String,
    pub path: String,
    pub last_modified: SystemTime,
}

/// existence and stat queries
impl Volume {
    /// Whether a file node sits at exactly this path. Only grammar
    /// violations raise; every resolution miss answers `false`.
    pub fn exists_file(&self, file_path: &str) -> Result<bool> {
        let segments = path::split(file_path)?;
        Ok(matches!(
            self.walk(&segments)?,
            Walk::Found { record, .. } if record.kind == NodeKind::File
        ))
    }

    /// Whether a directory node (or the root) sits at exactly this path.
    pub fn exists_directory(&self, dir_path: &str) -> Result<bool> {
        let segments = path::split(dir_path)?;
        Ok(matches!(
            self.walk(&segments)?,
            Walk::Found { record, .. } if record.kind == NodeKind::Directory
        ))
    }

    pub fn get_file(&self, file_path: &str) -> Result<FileHandle> {
        let segments = path::split(file_path)?;
        let record = self.resolve_file(&segments, file_path)?;
        Ok(FileHandle {
            name: record.name.clone(),
            path: path::display(&segments),
            size: record.file_size() as u64,
            last_modified: record.modified().into(),
        })
    }

    pub fn get_directory(&self, dir_path: &str) -> Result<DirectoryHandle> {
        let segments = path::split(dir_path)?;
        let (_, record) = self.resolve_directory(&segments, dir_path)?;
        Ok(DirectoryHandle {
            name: record.name.clone(),
            path: path::display(&segments),
            last_modified: record.modified().into(),
        })
    }
}

/// directory operations
impl Volume {
    /// Creates a directory at `dir_path`.
    /// # Return
    /// `true` when the directory was created, `false` when a child of that
    /// name already exists; the image is untouched in the latter case.
    pub fn create_directory(&mut self, dir_path: &str) -> Result<bool> {
        info!("create_directory() called with path: {:?}", dir_path);
        let segments = path::split(dir_path)?;
        let geometry = *self.geometry();
        let (&leaf, parent_segments) = match segments.split_last() {
            Some(split) => split,
            // the root exists on every volume
            None => return Ok(false),
        };
        path::validate_name(leaf, &geometry)?;

        let (_, parent) = self.resolve_parent_directory(parent_segments, dir_path)?;
        if self.lookup_child(parent.pointer, leaf)?.is_some() {
            return Ok(false);
        }
        let mut parent_dir = self.load_directory(parent.pointer)?;
        if !parent_dir.has_free_slot() {
            return Err(VolumeError::DirectoryFull);
        }

        // the node entry is registered only after a block was found
        let reserved = self.reserved_anchor_offsets()?;
        let anchor = self.find_free_block(&reserved)?;
        let id = self.find_free_node_id()?;
        let record = NodeRecord::directory(leaf, time_util::now(), anchor, &geometry);
        self.write_node(id, &record)?;
        parent_dir.insert(id)?;
        self.store_directory(parent.pointer, &parent_dir)?;
        Ok(true)
    }

    /// Full paths of the child directories of `dir_path`.
    pub fn list_subdirectories(&self, dir_path: &str) -> Result<Vec<String>> {
        info!("list_subdirectories() called with path: {:?}", dir_path);
        self.list_children(dir_path, NodeKind::Directory)
    }

    /// Full paths of the child files of `dir_path`.
    pub fn list_files(&self, dir_path: &str) -> Result<Vec<String>> {
        info!("list_files() called with path: {:?}", dir_path);
        self.list_children(dir_path, NodeKind::File)
    }

    fn list_children(&self, dir_path: &str, kind: NodeKind) -> Result<Vec<String>> {
        let segments = path::split(dir_path)?;
        let (_, record) = self.resolve_directory(&segments, dir_path)?;
        let canonical = path::display(&segments);
        let dir = self.load_directory(record.pointer)?;
        let mut paths = Vec::new();
        for id in dir.entries() {
            if let Some(child) = self.read_node(NodeRef::Id(id))? {
                if child.kind == kind {
                    paths.push(path::join(&canonical, &child.name));
                }
            }
        }
        Ok(paths)
    }
}

/// file operations
impl Volume {
    /// Reads a whole file back.
    pub fn read_file_bytes(&self, file_path: &str) -> Result<Vec<u8>> {
        info!("read_file_bytes() called with path: {:?}", file_path);
        let segments = path::split(file_path)?;
        let record = self.resolve_file(&segments, file_path)?;
        self.read_chain(record.pointer, record.file_size() as usize)
    }

    /// Writes a whole file, replacing any file already at this path. The
    /// old chain is released before new blocks are claimed.
    pub fn write_file_bytes(&mut self, file_path: &str, data: &[u8]) -> Result<()> {
        info!(
            "write_file_bytes() called with path: {:?}, len: {}",
            file_path,
            data.len()
        );
        if data.len() > u32::MAX as usize {
            return Err(VolumeError::OutOfSpace);
        }
        let (parent_segments, leaf) = path::parent_and_leaf(file_path)?;
        let geometry = *self.geometry();
        path::validate_name(leaf, &geometry)?;

        let (_, parent) = self.resolve_parent_directory(&parent_segments, file_path)?;
        if let Some((existing_id, existing)) = self.lookup_child(parent.pointer, leaf)? {
            if existing.kind == NodeKind::Directory {
                return Err(VolumeError::NotAFile(file_path.to_string()));
            }
            self.remove_file_node(parent.pointer, existing_id, &existing)?;
        }
        let mut parent_dir = self.load_directory(parent.pointer)?;
        if !parent_dir.has_free_slot() {
            return Err(VolumeError::DirectoryFull);
        }

        let reserved = self.reserved_anchor_offsets()?;
        let anchor = self.find_free_block(&reserved)?;
        self.write_chain(anchor, data, &reserved)?;
        let id = match self.find_free_node_id() {
            Ok(id) => id,
            Err(err) => {
                // take the freshly written chain back out of the image
                self.free_chain(anchor)?;
                return Err(err);
            }
        };
        let record = NodeRecord::file(leaf, data.len() as u32, time_util::now(), anchor, &geometry);
        self.write_node(id, &record)?;
        parent_dir.insert(id)?;
        self.store_directory(parent.pointer, &parent_dir)?;
        Ok(())
    }

    /// Deletes a file: its chain, its node entry and its slot in the parent
    /// directory. Directories cannot be deleted.
    pub fn delete_file(&mut self, file_path: &str) -> Result<()> {
        info!("delete_file() called with path: {:?}", file_path);
        let (parent_segments, leaf) = path::parent_and_leaf(file_path)?;
        let (_, parent) = self.resolve_parent_directory(&parent_segments, file_path)?;
        match self.lookup_child(parent.pointer, leaf)? {
            None => Err(VolumeError::NotFound(file_path.to_string())),
            Some((_, record)) if record.kind == NodeKind::Directory => {
                Err(VolumeError::NotAFile(file_path.to_string()))
            }
            Some((id, record)) => self.remove_file_node(parent.pointer, id, &record),
        }
    }

    fn remove_file_node(&mut self, parent_anchor: u64, id: u64, record: &NodeRecord) -> Result<()> {
        self.free_chain(record.pointer)?;
        self.free_node(id)?;
        let mut dir = self.load_directory(parent_anchor)?;
        dir.remove(id);
        self.store_directory(parent_anchor, &dir)
    }
}

/// persistence and space accounting
impl Volume {
    /// a deep copy of the whole image
    pub fn save_to_buffer(&self) -> Vec<u8> {
        self.image().to_vec()
    }

    /// writes the image to a host file
    pub fn save_to_file<P>(&self, host_path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        std::fs::write(host_path, self.image().as_slice())?;
        Ok(())
    }

    /// bytes held in blocks that are currently free
    pub fn free_space(&self) -> u64 {
        self.free_block_count() * self.geometry().block_size() as u64
    }

    /// bytes past header and node table
    pub fn total_space(&self) -> u64 {
        self.geometry().total_space()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::geometry::Geometry;
    use std::time::UNIX_EPOCH;
    use tempfile::tempdir;

    /// one-byte pointers, two blocks, three root slots
    fn tiny() -> Geometry {
        Geometry::new(32, 12, 256, 8).unwrap()
    }

    /// two-byte pointers, 462 blocks, seven slots per directory
    fn small() -> Geometry {
        Geometry::new(64, 12, 65_536, 24).unwrap()
    }

    /// four-byte pointers, 654 blocks, two slots per directory
    fn wide() -> Geometry {
        Geometry::new(20, 12, 1_310_800, 5).unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251 + 1) as u8).collect()
    }

    #[test]
    fn test_pointer_widths_of_the_test_geometries() {
        assert_eq!(tiny().pointer_size(), 1);
        assert_eq!(small().pointer_size(), 2);
        assert_eq!(wide().pointer_size(), 4);
    }

    #[test]
    fn test_fresh_volume_has_an_empty_root() {
        let volume = Volume::format(small()).unwrap();
        assert!(volume.exists_directory("V:\\").unwrap());
        assert!(!volume.exists_file("V:\\").unwrap());
        assert_eq!(volume.list_subdirectories("V:\\").unwrap(), Vec::<String>::new());
        assert_eq!(volume.list_files("V:\\").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_create_directory_is_idempotent() {
        let mut volume = Volume::format(small()).unwrap();
        assert!(volume.create_directory("V:\\configs").unwrap());
        assert!(!volume.create_directory("V:\\configs").unwrap());
        assert_eq!(
            volume.list_subdirectories("V:\\").unwrap(),
            vec!["V:\\configs".to_string()]
        );
        assert!(volume.exists_directory("V:\\configs").unwrap());
        assert!(!volume.exists_file("V:\\configs").unwrap());
    }

    #[test]
    fn test_write_read_roundtrip_through_a_directory() {
        let mut volume = Volume::format(small()).unwrap();
        volume.create_directory("V:\\configs").unwrap();
        let data = pattern(10_000);
        volume.write_file_bytes("V:\\configs\\a.bin", &data).unwrap();

        assert_eq!(volume.read_file_bytes("V:\\configs\\a.bin").unwrap(), data);
        let handle = volume.get_file("V:\\configs\\a.bin").unwrap();
        assert_eq!(handle.size, 10_000);
        assert_eq!(handle.name, "a.bin");
        assert_eq!(handle.path, "V:\\configs\\a.bin");
        assert!(handle.last_modified > UNIX_EPOCH);
        assert_eq!(
            volume.list_files("V:\\configs").unwrap(),
            vec!["V:\\configs\\a.bin".to_string()]
        );
    }

    #[test]
    fn test_delete_restores_free_space() {
        let mut volume = Volume::format(small()).unwrap();
        volume.create_directory("V:\\configs").unwrap();
        let free_before = volume.free_space();

        volume
            .write_file_bytes("V:\\configs\\a.bin", &pattern(10_000))
            .unwrap();
        assert!(volume.free_space() < free_before);

        volume.delete_file("V:\\configs\\a.bin").unwrap();
        assert!(!volume.exists_file("V:\\configs\\a.bin").unwrap());
        assert_eq!(volume.free_space(), free_before);
        assert!(matches!(
            volume.read_file_bytes("V:\\configs\\a.bin"),
            Err(VolumeError::NotFound(_))
        ));
    }

    #[test]
    fn test_replacing_a_file_releases_the_old_chain() {
        let mut volume = Volume::format(small()).unwrap();
        let free_initial = volume.free_space();
        volume.write_file_bytes("V:\\data", &pattern(10_000)).unwrap();

        let replacement = pattern(100);
        volume.write_file_bytes("V:\\data", &replacement).unwrap();
        assert_eq!(volume.read_file_bytes("V:\\data").unwrap(), replacement);
        // 100 payload bytes need exactly two 62 byte blocks
        assert_eq!(
            volume.free_space(),
            free_initial - 2 * volume.geometry().block_size() as u64
        );
        assert_eq!(volume.list_files("V:\\").unwrap().len(), 1);
    }

    #[test]
    fn test_empty_file_is_recorded() {
        let mut volume = Volume::format(small()).unwrap();
        volume.write_file_bytes("V:\\empty", &[]).unwrap();
        assert!(volume.exists_file("V:\\empty").unwrap());
        assert_eq!(volume.get_file("V:\\empty").unwrap().size, 0);
        assert_eq!(volume.read_file_bytes("V:\\empty").unwrap(), Vec::<u8>::new());

        // the zero anchor stays reserved for the empty file
        volume.write_file_bytes("V:\\other", &pattern(40)).unwrap();
        assert_eq!(volume.read_file_bytes("V:\\empty").unwrap(), Vec::<u8>::new());
        assert_eq!(volume.read_file_bytes("V:\\other").unwrap(), pattern(40));
    }

    #[test]
    fn test_save_and_reload_preserve_every_query() {
        let mut volume = Volume::format(small()).unwrap();
        volume.create_directory("V:\\configs").unwrap();
        volume.create_directory("V:\\logs").unwrap();
        let data = pattern(5_000);
        volume.write_file_bytes("V:\\configs\\a.bin", &data).unwrap();

        let reloaded = Volume::from_bytes(volume.save_to_buffer()).unwrap();
        assert_eq!(reloaded.geometry(), volume.geometry());
        assert_eq!(
            reloaded.list_subdirectories("V:\\").unwrap(),
            volume.list_subdirectories("V:\\").unwrap()
        );
        assert_eq!(reloaded.read_file_bytes("V:\\configs\\a.bin").unwrap(), data);
        assert_eq!(
            reloaded.get_file("V:\\configs\\a.bin").unwrap(),
            volume.get_file("V:\\configs\\a.bin").unwrap()
        );
        assert_eq!(reloaded.free_space(), volume.free_space());
    }

    #[test]
    fn test_operation_laws_hold_at_every_pointer_width() {
        for (geometry, payload) in [(tiny(), 20), (small(), 10_000), (wide(), 2_000)] {
            let mut volume = Volume::format(geometry).unwrap();
            assert!(volume.exists_directory("V:\\").unwrap());

            let free_before = volume.free_space();
            let data = pattern(payload);
            volume.write_file_bytes("V:\\f", &data).unwrap();
            assert_eq!(volume.read_file_bytes("V:\\f").unwrap(), data);
            assert_eq!(volume.get_file("V:\\f").unwrap().size, payload as u64);

            volume.delete_file("V:\\f").unwrap();
            assert_eq!(volume.free_space(), free_before);
            assert!(!volume.exists_file("V:\\f").unwrap());
        }
    }

    #[test]
    fn test_nested_directories() {
        let mut volume = Volume::format(wide()).unwrap();
        assert!(volume.create_directory("V:\\a").unwrap());
        assert!(volume.create_directory("V:\\a\\b").unwrap());
        let data = pattern(300);
        volume.write_file_bytes("V:\\a\\b\\f", &data).unwrap();

        assert_eq!(volume.read_file_bytes("V:\\a\\b\\f").unwrap(), data);
        assert_eq!(
            volume.list_subdirectories("V:\\a").unwrap(),
            vec!["V:\\a\\b".to_string()]
        );
        assert_eq!(
            volume.list_files("V:\\a\\b").unwrap(),
            vec!["V:\\a\\b\\f".to_string()]
        );
        assert!(volume.exists_directory("V:\\a\\b").unwrap());
        assert!(!volume.exists_directory("V:\\a\\c").unwrap());
    }

    #[test]
    fn test_listing_separates_files_from_directories() {
        let mut volume = Volume::format(small()).unwrap();
        volume.create_directory("V:\\sub").unwrap();
        volume.write_file_bytes("V:\\one", &pattern(10)).unwrap();
        volume.write_file_bytes("V:\\two", &pattern(10)).unwrap();

        let mut files = volume.list_files("V:\\").unwrap();
        files.sort();
        assert_eq!(files, vec!["V:\\one".to_string(), "V:\\two".to_string()]);
        assert_eq!(
            volume.list_subdirectories("V:\\").unwrap(),
            vec!["V:\\sub".to_string()]
        );
    }

    #[test]
    fn test_root_stat() {
        let volume = Volume::format(small()).unwrap();
        let root = volume.get_directory("V:\\").unwrap();
        assert_eq!(root.name, "V:");
        assert_eq!(root.path, "V:\\");
        assert_eq!(root.last_modified, UNIX_EPOCH);
    }

    #[test]
    fn test_full_directory_is_reported() {
        let mut volume = Volume::format(small()).unwrap();
        for i in 0..volume.geometry().max_items_per_directory() {
            assert!(volume.create_directory(&format!("V:\\d{}", i)).unwrap());
        }
        assert!(matches!(
            volume.create_directory("V:\\overflow"),
            Err(VolumeError::DirectoryFull)
        ));
        assert!(matches!(
            volume.write_file_bytes("V:\\overflow", &[1]),
            Err(VolumeError::DirectoryFull)
        ));
    }

    #[test]
    fn test_exhausted_block_region_is_reported() {
        let mut volume = Volume::format(tiny()).unwrap();
        volume.write_file_bytes("V:\\f", &pattern(10)).unwrap();

        let free_before = volume.free_space();
        assert!(matches!(
            volume.write_file_bytes("V:\\g", &pattern(5)),
            Err(VolumeError::OutOfSpace)
        ));
        // the failed write left nothing behind
        assert_eq!(volume.free_space(), free_before);
        assert!(!volume.exists_file("V:\\g").unwrap());
        assert_eq!(volume.read_file_bytes("V:\\f").unwrap(), pattern(10));
    }

    #[test]
    fn test_name_length_is_enforced() {
        let mut volume = Volume::format(small()).unwrap();
        let long = "x".repeat(volume.geometry().max_name_length() + 1);
        assert!(matches!(
            volume.create_directory(&format!("V:\\{}", long)),
            Err(VolumeError::NameTooLong { .. })
        ));
        assert!(matches!(
            volume.write_file_bytes(&format!("V:\\{}", long), &[1]),
            Err(VolumeError::NameTooLong { .. })
        ));
    }

    #[test]
    fn test_path_grammar_violations_raise_invalid_path() {
        let mut volume = Volume::format(small()).unwrap();
        for bad in ["C:\\x", "x", "", "V:\\\\x"] {
            assert!(matches!(
                volume.exists_file(bad),
                Err(VolumeError::InvalidPath(_))
            ));
        }
        assert!(matches!(
            volume.write_file_bytes("V:\\", &[1]),
            Err(VolumeError::InvalidPath(_))
        ));
        assert!(matches!(
            volume.delete_file("V:\\"),
            Err(VolumeError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_paths_through_a_file_are_invalid() {
        let mut volume = Volume::format(small()).unwrap();
        volume.write_file_bytes("V:\\f", &pattern(10)).unwrap();

        assert!(matches!(
            volume.write_file_bytes("V:\\f\\x", &[1]),
            Err(VolumeError::InvalidPath(_))
        ));
        assert!(matches!(
            volume.read_file_bytes("V:\\f\\x\\y"),
            Err(VolumeError::InvalidPath(_))
        ));
        // a miss is an answer for the existence queries, not an error
        assert!(!volume.exists_file("V:\\f\\x").unwrap());
        assert!(!volume.exists_directory("V:\\f\\x").unwrap());
        assert!(!volume.exists_file("V:\\missing\\x").unwrap());
    }

    #[test]
    fn test_kind_mismatches() {
        let mut volume = Volume::format(small()).unwrap();
        volume.create_directory("V:\\dir").unwrap();
        volume.write_file_bytes("V:\\file", &pattern(10)).unwrap();

        assert!(matches!(
            volume.read_file_bytes("V:\\dir"),
            Err(VolumeError::NotAFile(_))
        ));
        assert!(matches!(
            volume.write_file_bytes("V:\\dir", &[1]),
            Err(VolumeError::NotAFile(_))
        ));
        assert!(matches!(
            volume.delete_file("V:\\dir"),
            Err(VolumeError::NotAFile(_))
        ));
        assert!(matches!(
            volume.list_files("V:\\file"),
            Err(VolumeError::NotADirectory(_))
        ));
        assert!(matches!(
            volume.get_directory("V:\\file"),
            Err(VolumeError::NotADirectory(_))
        ));
        assert!(matches!(
            volume.get_file("V:\\missing"),
            Err(VolumeError::NotFound(_))
        ));
        assert!(matches!(
            volume.delete_file("V:\\missing"),
            Err(VolumeError::NotFound(_))
        ));
    }

    #[test]
    fn test_host_file_roundtrip() {
        let dir = tempdir().unwrap();
        let image_path = dir.path().join("volume.img");
        let data = pattern(1_000);
        {
            let mut volume = Volume::create(&image_path, small()).unwrap();
            volume.create_directory("V:\\configs").unwrap();
            volume.write_file_bytes("V:\\configs\\a.bin", &data).unwrap();
            // dropping the volume flushes the mapping
        }

        let volume = Volume::open(&image_path).unwrap();
        assert_eq!(volume.read_file_bytes("V:\\configs\\a.bin").unwrap(), data);
        assert!(volume.exists_directory("V:\\configs").unwrap());
    }

    #[test]
    fn test_save_to_file_writes_the_image() {
        let dir = tempdir().unwrap();
        let copy_path = dir.path().join("copy.img");
        let mut volume = Volume::format(small()).unwrap();
        volume.write_file_bytes("V:\\f", &pattern(64)).unwrap();
        volume.save_to_file(&copy_path).unwrap();

        let reloaded = Volume::open(&copy_path).unwrap();
        assert_eq!(reloaded.read_file_bytes("V:\\f").unwrap(), pattern(64));
    }

    #[test]
    fn test_adopting_a_mismatched_buffer_is_corrupt() {
        let volume = Volume::format(small()).unwrap();
        let mut bytes = volume.save_to_buffer();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(
            Volume::from_bytes(bytes),
            Err(VolumeError::CorruptImage(_))
        ));
        assert!(matches!(
            Volume::from_bytes(vec![0u8; 64]),
            Err(VolumeError::CorruptImage(_))
        ));
    }

    #[test]
    fn test_total_space_matches_the_geometry() {
        let volume = Volume::format(small()).unwrap();
        let geometry = volume.geometry();
        assert_eq!(
            volume.total_space(),
            geometry.storage_size() as u64 - 12 - geometry.node_table_size()
        );
    }
}
