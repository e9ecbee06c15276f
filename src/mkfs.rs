//! create a new volume image on the host

use crate::error::VolumeError;
use crate::fs::{Geometry, Volume};
use anyhow::anyhow;
use byte_unit::{Byte, ByteUnit};
use std::path::Path;

/// Creates a fresh image file and the volume over it.
/// # Params
/// - `image_file_path`: the path of the image file; must not exist yet
/// - `storage_size`: the total size of the image in bytes
/// - `block_size`: bytes per block, including the pointer prefix
/// - `file_info_size`: bytes of metadata kept per node
/// - `max_name_length`: the on-image name field width
/// # Return
/// the opened [Volume]; dropping it flushes the image to disk
pub fn mkfs<P>(
    image_file_path: P,
    storage_size: i64,
    block_size: u16,
    file_info_size: u8,
    max_name_length: u8,
) -> anyhow::Result<Volume>
where
    P: AsRef<Path>,
{
    let geometry = match Geometry::new(block_size, file_info_size, storage_size, max_name_length) {
        Ok(geometry) => geometry,
        Err(VolumeError::InvalidGeometry(reason)) => {
            return Err(anyhow!(
                "cannot lay out a {} image with block size {}: {}",
                Byte::from_bytes(storage_size.max(0) as u128).get_appropriate_unit(true),
                Byte::from_bytes(block_size as u128).get_adjusted_unit(ByteUnit::B),
                reason
            ))
        }
        Err(err) => return Err(err.into()),
    };
    Ok(Volume::create(image_file_path, geometry)?)
}
