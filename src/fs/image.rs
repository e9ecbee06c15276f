//! exclusive owner of the bytes backing a volume

use crate::error::{Result, VolumeError};
use log::warn;
use memmap2::MmapMut;

/// The contiguous byte region a volume lives in, either an in-memory vector
/// or a mapping of the host image file.
///
/// All access is bounded: a read or write that would leave the image raises
/// [VolumeError::CorruptImage] instead of touching neighbouring memory.
#[derive(Debug)]
pub struct ImageBuffer {
    backing: Backing,
}

#[derive(Debug)]
enum Backing {
    Memory(Vec<u8>),
    Mapped(MmapMut),
}

impl ImageBuffer {
    /// a fresh zeroed image of `len` bytes
    pub fn zeroed(len: usize) -> Self {
        ImageBuffer {
            backing: Backing::Memory(vec![0u8; len]),
        }
    }

    /// adopt caller-supplied bytes
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        ImageBuffer {
            backing: Backing::Memory(bytes),
        }
    }

    /// adopt a mapping of the host image file
    pub fn from_mapping(mapping: MmapMut) -> Self {
        ImageBuffer {
            backing: Backing::Mapped(mapping),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match &self.backing {
            Backing::Memory(bytes) => bytes,
            Backing::Mapped(mapping) => mapping,
        }
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.backing {
            Backing::Memory(bytes) => bytes,
            Backing::Mapped(mapping) => mapping,
        }
    }

    fn check_range(&self, offset: u64, len: usize) -> Result<usize> {
        let start = offset as usize;
        let end = start.checked_add(len);
        match end {
            Some(end) if end <= self.len() => Ok(start),
            _ => Err(VolumeError::CorruptImage(format!(
                "access of {} bytes at offset {} leaves the {} byte image",
                len,
                offset,
                self.len()
            ))),
        }
    }

    /// a bounded view of `[offset, offset + len)`
    pub fn slice_at(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let start = self.check_range(offset, len)?;
        Ok(&self.as_slice()[start..start + len])
    }

    /// bounded copy-in at `offset`
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let start = self.check_range(offset, bytes.len())?;
        self.as_mut_slice()[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// bounded zeroing of `[offset, offset + len)`
    pub fn zero_range(&mut self, offset: u64, len: usize) -> Result<()> {
        let start = self.check_range(offset, len)?;
        self.as_mut_slice()[start..start + len].fill(0);
        Ok(())
    }

    /// deep copy of the whole image
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}

/// A volume opened from a host path writes its bytes back when it goes out
/// of scope; an in-memory volume releases nothing.
impl Drop for ImageBuffer {
    fn drop(&mut self) {
        if let Backing::Mapped(mapping) = &self.backing {
            if let Err(err) = mapping.flush() {
                warn!("flushing the image mapping failed: {}", err);
            }
        }
    }
}
