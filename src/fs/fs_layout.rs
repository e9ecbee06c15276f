//! what a volume looks like on its image, and the engine internals that
//! operate on it
//!
//! The image has the following layout:
//! - header, fixed 12 bytes
//! - node table
//! - block region

use std::fs::OpenOptions;
use std::path::Path;

use log::debug;
use memmap2::MmapMut;

use super::directory::DirectoryBlock;
use super::geometry::Geometry;
use super::image::ImageBuffer;
use super::node::{NodeKind, NodeRecord, NodeRef};
use super::{is_zero_slot, read_ptr, write_ptr};
use crate::error::{Result, VolumeError};

/// A virtual disk over one contiguous byte buffer.
///
/// The volume owns its image exclusively; a second view of the same bytes is
/// obtained by deep-copying them (`save_to_buffer`) and rebuilding a volume
/// over the copy.
#[derive(Debug)]
pub struct Volume {
    geometry: Geometry,
    image: ImageBuffer,
}

/// Where a segment walk ended up.
#[derive(Debug)]
pub(crate) enum Walk {
    /// every segment resolved
    Found { node: NodeRef, record: NodeRecord },
    /// all intermediate directories exist, the final segment does not
    MissingLeaf,
    /// an intermediate segment does not exist
    MissingBranch,
    /// an intermediate segment resolved to a file
    FileOnBranch,
}

/// construction and persistence
impl Volume {
    /// a fresh zeroed volume held in memory
    pub fn format(geometry: Geometry) -> Result<Self> {
        let mut image = ImageBuffer::zeroed(geometry.image_len());
        image.write_at(0, &geometry.to_header())?;
        debug!("formatted in-memory volume of {} bytes", geometry.image_len());
        Ok(Volume { geometry, image })
    }

    /// adopt an existing image, e.g. one produced by `save_to_buffer`
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let geometry = Geometry::from_header(&bytes)?;
        if bytes.len() != geometry.image_len() {
            return Err(VolumeError::CorruptImage(format!(
                "header records {} bytes but the buffer holds {}",
                geometry.image_len(),
                bytes.len()
            )));
        }
        Ok(Volume {
            geometry,
            image: ImageBuffer::from_vec(bytes),
        })
    }

    /// Creates the host image file and the volume over it. The file must not
    /// exist yet; it is sized to the geometry and mapped for the lifetime of
    /// the volume.
    pub fn create<P>(image_path: P, geometry: Geometry) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(image_path.as_ref())?;
        file.set_len(geometry.image_len() as u64)?;

        // Safety
        // This method returns an error when the underlying system call fails,
        // which can happen for a variety of reasons,
        // such as when the file is not open with read and write permissions.
        // from https://docs.rs/memmap2/latest/memmap2/struct.MmapMut.html
        let mapping = unsafe { MmapMut::map_mut(&file)? };
        let mut image = ImageBuffer::from_mapping(mapping);
        image.write_at(0, &geometry.to_header())?;
        debug!(
            "created image {:?} of {} bytes",
            image_path.as_ref(),
            geometry.image_len()
        );
        Ok(Volume { geometry, image })
    }

    /// Opens an existing host image file. Changes are written back when the
    /// volume is dropped.
    pub fn open<P>(image_path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(image_path.as_ref())?;

        // Safety: see `create`
        let mapping = unsafe { MmapMut::map_mut(&file)? };
        let geometry = Geometry::from_header(&mapping)?;
        if mapping.len() != geometry.image_len() {
            return Err(VolumeError::CorruptImage(format!(
                "header records {} bytes but {:?} holds {}",
                geometry.image_len(),
                image_path.as_ref(),
                mapping.len()
            )));
        }
        Ok(Volume {
            geometry,
            image: ImageBuffer::from_mapping(mapping),
        })
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[inline]
    pub(crate) fn image(&self) -> &ImageBuffer {
        &self.image
    }
}

/// node table operations
impl Volume {
    #[inline]
    fn node_entry_offset(&self, id: u64) -> u64 {
        self.geometry.node_table_start() + id * self.geometry.node_entry_size() as u64
    }

    fn check_node_id(&self, id: u64) -> Result<()> {
        if id == 0 || id >= self.geometry.node_table_entry_count() {
            return Err(VolumeError::CorruptImage(format!(
                "node id {} is outside the node table",
                id
            )));
        }
        Ok(())
    }

    /// Reads a node entry; the root resolves to its synthetic record and a
    /// zeroed entry to `None`.
    pub(crate) fn read_node(&self, node: NodeRef) -> Result<Option<NodeRecord>> {
        match node {
            NodeRef::Root => Ok(Some(NodeRecord::synthetic_root(&self.geometry))),
            NodeRef::Id(id) => {
                self.check_node_id(id)?;
                let entry = self
                    .image
                    .slice_at(self.node_entry_offset(id), self.geometry.node_entry_size())?;
                NodeRecord::unpack(entry, &self.geometry)
            }
        }
    }

    pub(crate) fn write_node(&mut self, id: u64, record: &NodeRecord) -> Result<()> {
        self.check_node_id(id)?;
        let entry = record.pack(&self.geometry)?;
        self.image.write_at(self.node_entry_offset(id), &entry)
    }

    pub(crate) fn free_node(&mut self, id: u64) -> Result<()> {
        self.check_node_id(id)?;
        self.image
            .zero_range(self.node_entry_offset(id), self.geometry.node_entry_size())
    }

    /// First free entry past the reserved index 0, detected on the raw
    /// entry bytes.
    pub(crate) fn find_free_node_id(&self) -> Result<u64> {
        let entry_size = self.geometry.node_entry_size();
        for id in 1..self.geometry.node_table_entry_count() {
            let entry = self.image.slice_at(self.node_entry_offset(id), entry_size)?;
            if is_zero_slot(entry) {
                return Ok(id);
            }
        }
        Err(VolumeError::OutOfNodes)
    }

    /// Anchor offsets of every live node.
    ///
    /// An anchor that has not been written yet (an empty directory, a zero
    /// length file) is indistinguishable from a free block, so allocations
    /// must exclude these offsets explicitly.
    pub(crate) fn reserved_anchor_offsets(&self) -> Result<Vec<u64>> {
        let geometry = self.geometry;
        let entry_size = geometry.node_entry_size();
        let pointer_start = 1 + geometry.max_name_length() + geometry.file_info_size();
        let mut reserved = Vec::new();
        for id in 1..geometry.node_table_entry_count() {
            let entry = self.image.slice_at(self.node_entry_offset(id), entry_size)?;
            if is_zero_slot(entry) {
                continue;
            }
            reserved.push(read_ptr(&entry[pointer_start..], geometry.pointer_size()));
        }
        Ok(reserved)
    }
}

/// block allocation
impl Volume {
    /// Linear scan for a free block, lowest index first.
    ///
    /// A block is free exactly when all of its bytes are zero. Block 0 is
    /// the root anchor and never allocated; `exclude` keeps blocks chosen
    /// earlier in the same operation from being handed out twice.
    pub(crate) fn find_free_block(&self, exclude: &[u64]) -> Result<u64> {
        let geometry = self.geometry;
        let block_size = geometry.block_size();
        for index in 1..geometry.block_count() as u64 {
            let offset = geometry.block_offset(index);
            if exclude.contains(&offset) {
                continue;
            }
            if is_zero_slot(self.image.slice_at(offset, block_size)?) {
                return Ok(offset);
            }
        }
        Err(VolumeError::OutOfSpace)
    }

    /// Walks a file chain from `head`, zeroing every visited block; the
    /// terminal block carries a zero next-pointer.
    pub(crate) fn free_chain(&mut self, head: u64) -> Result<()> {
        let geometry = self.geometry;
        let mut cursor = head;
        loop {
            let block = self.image.slice_at(cursor, geometry.block_size())?;
            let next = read_ptr(block, geometry.pointer_size());
            self.image.zero_range(cursor, geometry.block_size())?;
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(())
    }

    /// zeroes back blocks written earlier in a failed operation
    pub(crate) fn release_blocks(&mut self, offsets: &[u64]) -> Result<()> {
        for &offset in offsets {
            self.image.zero_range(offset, self.geometry.block_size())?;
        }
        Ok(())
    }

    pub(crate) fn free_block_count(&self) -> u64 {
        let geometry = self.geometry;
        let mut free = 0;
        for index in 1..geometry.block_count() as u64 {
            let offset = geometry.block_offset(index);
            if self
                .image
                .slice_at(offset, geometry.block_size())
                .map(is_zero_slot)
                .unwrap_or(false)
            {
                free += 1;
            }
        }
        free
    }
}

/// directory blocks
impl Volume {
    pub(crate) fn load_directory(&self, anchor: u64) -> Result<DirectoryBlock> {
        let block = self.image.slice_at(anchor, self.geometry.block_size())?;
        Ok(DirectoryBlock::parse(
            block,
            self.geometry.max_items_per_directory(),
        ))
    }

    pub(crate) fn store_directory(&mut self, anchor: u64, dir: &DirectoryBlock) -> Result<()> {
        let mut block = self.image.slice_at(anchor, self.geometry.block_size())?.to_vec();
        dir.write_into(&mut block);
        self.image.write_at(anchor, &block)
    }

    /// Looks a child up by exact name inside a directory's anchor block.
    pub(crate) fn lookup_child(
        &self,
        dir_anchor: u64,
        name: &str,
    ) -> Result<Option<(u64, NodeRecord)>> {
        let dir = self.load_directory(dir_anchor)?;
        for id in dir.entries() {
            if let Some(record) = self.read_node(NodeRef::Id(id))? {
                if record.name == name {
                    return Ok(Some((id, record)));
                }
            }
        }
        Ok(None)
    }
}

/// path resolution
impl Volume {
    /// Walks `segments` from the root, descending one directory per
    /// segment.
    pub(crate) fn walk(&self, segments: &[&str]) -> Result<Walk> {
        let mut node = NodeRef::Root;
        let mut record = NodeRecord::synthetic_root(&self.geometry);
        let mut remaining = segments.len();
        for &segment in segments {
            if record.kind == NodeKind::File {
                return Ok(Walk::FileOnBranch);
            }
            remaining -= 1;
            match self.lookup_child(record.pointer, segment)? {
                Some((id, child)) => {
                    node = NodeRef::Id(id);
                    record = child;
                }
                None if remaining == 0 => return Ok(Walk::MissingLeaf),
                None => return Ok(Walk::MissingBranch),
            }
        }
        Ok(Walk::Found { node, record })
    }

    /// Resolves a path that must name an existing directory.
    pub(crate) fn resolve_directory(
        &self,
        segments: &[&str],
        path: &str,
    ) -> Result<(NodeRef, NodeRecord)> {
        match self.walk(segments)? {
            Walk::Found { node, record } if record.kind == NodeKind::Directory => {
                Ok((node, record))
            }
            Walk::Found { .. } => Err(VolumeError::NotADirectory(path.to_string())),
            Walk::MissingLeaf | Walk::MissingBranch => {
                Err(VolumeError::NotFound(path.to_string()))
            }
            Walk::FileOnBranch => Err(VolumeError::InvalidPath(path.to_string())),
        }
    }

    /// Resolves the directory a new child goes into. Unlike
    /// [Self::resolve_directory] a file sitting on the parent path is a path
    /// violation, not a kind mismatch.
    pub(crate) fn resolve_parent_directory(
        &self,
        segments: &[&str],
        path: &str,
    ) -> Result<(NodeRef, NodeRecord)> {
        match self.resolve_directory(segments, path) {
            Err(VolumeError::NotADirectory(p)) => Err(VolumeError::InvalidPath(p)),
            other => other,
        }
    }

    /// Resolves a path that must name an existing file.
    pub(crate) fn resolve_file(&self, segments: &[&str], path: &str) -> Result<NodeRecord> {
        match self.walk(segments)? {
            Walk::Found { record, .. } if record.kind == NodeKind::File => Ok(record),
            Walk::Found { .. } => Err(VolumeError::NotAFile(path.to_string())),
            Walk::MissingLeaf | Walk::MissingBranch => {
                Err(VolumeError::NotFound(path.to_string()))
            }
            Walk::FileOnBranch => Err(VolumeError::InvalidPath(path.to_string())),
        }
    }
}

/// file chains
impl Volume {
    /// Streams `data` into a chain of blocks starting at `anchor`.
    ///
    /// Every block is `[next pointer][payload]`; the final block carries a
    /// zero pointer. `reserved` holds anchors of live nodes that the free
    /// scan must not hand out. On an exhausted block region the blocks
    /// written so far are zeroed back before the error propagates.
    pub(crate) fn write_chain(&mut self, anchor: u64, data: &[u8], reserved: &[u64]) -> Result<()> {
        let geometry = self.geometry;
        let width = geometry.pointer_size();
        let space = geometry.actual_space_per_block();
        let chain_len = usize::max(1, data.len().div_ceil(space));

        let mut written: Vec<u64> = Vec::with_capacity(chain_len);
        let mut block = vec![0u8; geometry.block_size()];
        let mut cursor = anchor;
        for index in 0..chain_len {
            let start = index * space;
            let take = space.min(data.len() - start);
            let next = if index + 1 < chain_len {
                let mut exclude = Vec::with_capacity(reserved.len() + 1);
                exclude.extend_from_slice(reserved);
                exclude.push(cursor);
                match self.find_free_block(&exclude) {
                    Ok(offset) => offset,
                    Err(err) => {
                        self.release_blocks(&written)?;
                        return Err(err);
                    }
                }
            } else {
                0
            };
            block.fill(0);
            write_ptr(&mut block, width, next);
            block[width..width + take].copy_from_slice(&data[start..start + take]);
            self.image.write_at(cursor, &block)?;
            written.push(cursor);
            cursor = next;
        }
        Ok(())
    }

    /// Reads `size` bytes back from the chain starting at `head`.
    pub(crate) fn read_chain(&self, head: u64, size: usize) -> Result<Vec<u8>> {
        let geometry = self.geometry;
        let width = geometry.pointer_size();
        let space = geometry.actual_space_per_block();

        let mut out = vec![0u8; size];
        let mut copied = 0;
        let mut cursor = head;
        while copied < out.len() {
            let block = self.image.slice_at(cursor, geometry.block_size())?;
            let take = (out.len() - copied).min(space);
            out[copied..copied + take].copy_from_slice(&block[width..width + take]);
            copied += take;
            let next = read_ptr(block, width);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        if copied < out.len() {
            return Err(VolumeError::CorruptImage(format!(
                "file chain ended after {} of {} bytes",
                copied, size
            )));
        }
        Ok(out)
    }
}
