//! Legacy PVR (v2) compressed-texture containers.
//!
//! Layout: a 52-byte little-endian header followed by the level data, base level first.
//! Gzip-wrapped containers (`.pvr.gz`) are inflated transparently.

use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use flate2::read::GzDecoder;

use crate::error::{Result, TextureError};
use crate::pixel_format::PixelFormat;

/// Size of the container header in bytes.
pub const PVR_HEADER_LEN: usize = 52;

const PVR_TAG: [u8; 4] = *b"PVR!";
const PVR_TAG_OFFSET: usize = 44;
const PVR_FORMAT_MASK: u32 = 0xff;
const MAX_MIPMAPS: usize = 16;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Format code stored in the low byte of the header flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PvrFormat {
    Rgba4444,
    Rgb5a1,
    Rgba8888,
    Rgb565,
    Rgb888,
    I8,
    Ai88,
    Pvrtc2,
    Pvrtc4,
    Bgra8888,
    A8,
}

impl PvrFormat {
    fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0x10 => PvrFormat::Rgba4444,
            0x11 => PvrFormat::Rgb5a1,
            0x12 => PvrFormat::Rgba8888,
            0x13 => PvrFormat::Rgb565,
            0x15 => PvrFormat::Rgb888,
            0x16 => PvrFormat::I8,
            0x17 => PvrFormat::Ai88,
            0x18 => PvrFormat::Pvrtc2,
            0x19 => PvrFormat::Pvrtc4,
            0x1a => PvrFormat::Bgra8888,
            0x1b => PvrFormat::A8,
            _ => return None,
        })
    }

    fn pixel_format(self) -> PixelFormat {
        match self {
            PvrFormat::Rgba4444 => PixelFormat::Rgba4444,
            PvrFormat::Rgb5a1 => PixelFormat::Rgb5a1,
            PvrFormat::Rgba8888 | PvrFormat::Bgra8888 => PixelFormat::Rgba8888,
            PvrFormat::Rgb565 => PixelFormat::Rgb565,
            PvrFormat::Rgb888 => PixelFormat::Rgb888,
            PvrFormat::I8 => PixelFormat::I8,
            PvrFormat::Ai88 => PixelFormat::Ai88,
            PvrFormat::Pvrtc2 => PixelFormat::Pvrtc2,
            PvrFormat::Pvrtc4 => PixelFormat::Pvrtc4,
            PvrFormat::A8 => PixelFormat::A8,
        }
    }
}

#[derive(Debug)]
struct PvrHeader {
    header_length: u32,
    height: u32,
    width: u32,
    flags: u32,
    data_length: u32,
    bitmask_alpha: u32,
}

impl PvrHeader {
    fn read(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PVR_HEADER_LEN {
            return Err(TextureError::invalid_pvr(format!(
                "buffer of {} bytes is shorter than the header",
                bytes.len()
            )));
        }
        if bytes[PVR_TAG_OFFSET..PVR_TAG_OFFSET + 4] != PVR_TAG {
            return Err(TextureError::invalid_pvr("missing PVR! tag"));
        }

        let word = |index: usize| {
            let offset = index * 4;
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };

        Ok(Self {
            header_length: word(0),
            height: word(1),
            width: word(2),
            flags: word(4),
            data_length: word(5),
            bitmask_alpha: word(10),
        })
    }
}

/// One mip level of a container.
#[derive(Debug, Clone, PartialEq)]
pub struct PvrLevel {
    /// Level width in texels.
    pub width: u32,
    /// Level height in texels.
    pub height: u32,
    /// Texel data in the container's pixel format.
    pub data: Bytes,
}

/// Parsed container contents.
#[derive(Debug, Clone, PartialEq)]
pub struct PvrContainer {
    /// Base level width.
    pub width: u32,
    /// Base level height.
    pub height: u32,
    /// Pixel format of every level.
    pub format: PixelFormat,
    /// Whether the alpha bitmask is set.
    pub has_alpha: bool,
    /// Levels, base level first. Never empty.
    pub levels: Vec<PvrLevel>,
}

impl PvrContainer {
    /// Reads and parses a container file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::parse(Bytes::from(bytes))
    }

    /// Parses a container, inflating it first if it is gzip-compressed.
    pub fn parse(bytes: Bytes) -> Result<Self> {
        let bytes = if bytes.len() > 2 && bytes[0..2] == GZIP_MAGIC {
            let mut decoder = GzDecoder::new(&bytes[..]);
            let mut inflated = Vec::new();
            decoder.read_to_end(&mut inflated).map_err(|err| {
                log::error!("PVR: gzip decompression error: {err:?}");
                TextureError::invalid_pvr(format!("gzip decompression failed: {err}"))
            })?;
            Bytes::from(inflated)
        } else {
            bytes
        };

        let header = PvrHeader::read(&bytes)?;
        let code = header.flags & PVR_FORMAT_MASK;
        let pvr_format = PvrFormat::from_code(code).ok_or_else(|| {
            TextureError::invalid_pvr(format!("unsupported pixel format code {code:#x}"))
        })?;
        let format = pvr_format.pixel_format();

        if header.width == 0 || header.height == 0 {
            return Err(TextureError::InvalidDimensions {
                width: header.width,
                height: header.height,
            });
        }

        let data_start = header.header_length as usize;
        if data_start < PVR_HEADER_LEN {
            return Err(TextureError::invalid_pvr(format!(
                "header length {data_start} is too small"
            )));
        }
        let data_end = data_start
            .checked_add(header.data_length as usize)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| {
                TextureError::invalid_pvr(format!(
                    "declared data length {} exceeds the buffer",
                    header.data_length
                ))
            })?;
        let data = bytes.slice(data_start..data_end);

        let mut levels = Vec::new();
        let (mut width, mut height) = (header.width, header.height);
        let mut offset = 0;
        while offset < data.len() && levels.len() < MAX_MIPMAPS {
            let size = level_size(format, width, height).ok_or_else(|| {
                TextureError::invalid_pvr(format!("mip level {width}x{height} is too large"))
            })?;
            if size > data.len() - offset {
                return Err(TextureError::invalid_pvr(format!(
                    "mip level {} needs {size} bytes, {} left",
                    levels.len(),
                    data.len() - offset
                )));
            }

            let mut level_data = data.slice(offset..offset + size);
            if pvr_format == PvrFormat::Bgra8888 {
                level_data = swizzle_bgra(&level_data);
            }

            levels.push(PvrLevel {
                width,
                height,
                data: level_data,
            });
            offset += size;

            if width == 1 && height == 1 {
                break;
            }
            width = (width >> 1).max(1);
            height = (height >> 1).max(1);
        }

        if offset < data.len() {
            log::warn!(
                "PVR: ignoring {} bytes after {} mip levels",
                data.len() - offset,
                levels.len()
            );
        }

        if levels.is_empty() {
            return Err(TextureError::invalid_pvr("container has no texture data"));
        }

        log::trace!(
            "Parsed PVR container {}x{} {format:?} with {} levels",
            header.width,
            header.height,
            levels.len()
        );

        Ok(Self {
            width: header.width,
            height: header.height,
            format,
            has_alpha: header.bitmask_alpha != 0,
            levels,
        })
    }
}

/// Byte size of one level in the given format.
///
/// PVRTC4 uses 4x4 blocks and PVRTC2 8x4 blocks of 64 bits, with at least 2 blocks per axis.
/// Returns `None` when the size does not fit into `usize`.
pub fn level_size(format: PixelFormat, width: u32, height: u32) -> Option<usize> {
    let (block_width, block_height) = match format {
        PixelFormat::Pvrtc4 => (4, 4),
        PixelFormat::Pvrtc2 => (8, 4),
        _ => (1, 1),
    };

    let mut width_blocks = width / block_width;
    let mut height_blocks = height / block_height;
    if format.is_compressed() {
        width_blocks = width_blocks.max(2);
        height_blocks = height_blocks.max(2);
    }

    let block_bytes = block_width * block_height * format.bits_per_pixel() / 8;
    (width_blocks as usize)
        .checked_mul(height_blocks as usize)?
        .checked_mul(block_bytes as usize)
}

fn swizzle_bgra(data: &[u8]) -> Bytes {
    data.chunks_exact(4)
        .flat_map(|t| [t[2], t[1], t[0], t[3]])
        .collect::<Vec<u8>>()
        .into()
}

#[cfg(test)]
pub(crate) mod test_data {
    use super::*;

    /// Builds a container with the given header fields followed by `data`.
    pub(crate) fn container(
        code: u32,
        width: u32,
        height: u32,
        alpha_mask: u32,
        data: &[u8],
    ) -> Vec<u8> {
        let mut words = [0u32; 13];
        words[0] = PVR_HEADER_LEN as u32;
        words[1] = height;
        words[2] = width;
        words[4] = code;
        words[5] = data.len() as u32;
        words[10] = alpha_mask;
        words[11] = u32::from_le_bytes(PVR_TAG);

        let mut bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        bytes.extend_from_slice(data);
        bytes
    }
}
