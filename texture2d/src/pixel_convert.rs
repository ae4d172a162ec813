//! CPU-side pixel conversions between RGBA8888 and the other uncompressed formats.

use crate::error::{Result, TextureError};
use crate::pixel_format::PixelFormat;

/// Scales color channels by alpha in place.
pub fn premultiply_rgba8(pixels: &mut [u8]) {
    for texel in pixels.chunks_exact_mut(4) {
        let alpha = texel[3] as u32;
        for channel in &mut texel[..3] {
            *channel = ((*channel as u32 * alpha + 127) / 255) as u8;
        }
    }
}

/// Copies an RGBA8888 image into the top-left corner of a transparent canvas.
pub fn pad_rgba8(
    src: &[u8],
    width: u32,
    height: u32,
    padded_width: u32,
    padded_height: u32,
) -> Vec<u8> {
    if width == padded_width && height == padded_height {
        return src.to_vec();
    }

    let row_len = width as usize * 4;
    let padded_row_len = padded_width as usize * 4;
    let mut out = vec![0u8; padded_row_len * padded_height as usize];
    for (src_row, dst_row) in src
        .chunks_exact(row_len)
        .zip(out.chunks_exact_mut(padded_row_len))
        .take(height as usize)
    {
        dst_row[..row_len].copy_from_slice(src_row);
    }

    out
}

/// Copies an 8-bit single channel image into the top-left corner of a zeroed canvas.
pub fn pad_a8(
    src: &[u8],
    width: u32,
    height: u32,
    padded_width: u32,
    padded_height: u32,
) -> Vec<u8> {
    let row_len = width as usize;
    let padded_row_len = padded_width as usize;
    let mut out = vec![0u8; padded_row_len * padded_height as usize];
    for (src_row, dst_row) in src
        .chunks_exact(row_len)
        .zip(out.chunks_exact_mut(padded_row_len))
        .take(height as usize)
    {
        dst_row[..row_len].copy_from_slice(src_row);
    }

    out
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

/// Converts RGBA8888 texels into `format`.
pub fn pack_rgba8(src: &[u8], format: PixelFormat) -> Result<Vec<u8>> {
    let format = format.resolve();
    let texels = src.chunks_exact(4);
    let packed = match format {
        PixelFormat::Rgba8888 => src.to_vec(),
        PixelFormat::Rgb888 => texels.flat_map(|t| [t[0], t[1], t[2]]).collect(),
        PixelFormat::Rgb565 => pack_u16(texels, |t| {
            ((t[0] as u16 >> 3) << 11) | ((t[1] as u16 >> 2) << 5) | (t[2] as u16 >> 3)
        }),
        PixelFormat::Rgba4444 => pack_u16(texels, |t| {
            ((t[0] as u16 >> 4) << 12)
                | ((t[1] as u16 >> 4) << 8)
                | ((t[2] as u16 >> 4) << 4)
                | (t[3] as u16 >> 4)
        }),
        PixelFormat::Rgb5a1 => pack_u16(texels, |t| {
            ((t[0] as u16 >> 3) << 11)
                | ((t[1] as u16 >> 3) << 6)
                | ((t[2] as u16 >> 3) << 1)
                | (t[3] as u16 >> 7)
        }),
        PixelFormat::A8 => texels.map(|t| t[3]).collect(),
        PixelFormat::I8 => texels.map(|t| luminance(t[0], t[1], t[2])).collect(),
        PixelFormat::Ai88 => texels
            .flat_map(|t| [luminance(t[0], t[1], t[2]), t[3]])
            .collect(),
        PixelFormat::Pvrtc4 | PixelFormat::Pvrtc2 | PixelFormat::Automatic => {
            return Err(TextureError::UnsupportedFormat(format));
        }
    };

    Ok(packed)
}

fn pack_u16<'a>(texels: impl Iterator<Item = &'a [u8]>, pack: impl Fn(&[u8]) -> u16) -> Vec<u8> {
    texels.flat_map(|t| pack(t).to_le_bytes()).collect()
}

fn expand(value: u16, bits: u32) -> u8 {
    let max = (1u32 << bits) - 1;
    ((value as u32 * 255 + max / 2) / max) as u8
}

/// Expands texels stored in `format` into RGBA8888.
pub fn unpack_to_rgba8(src: &[u8], format: PixelFormat) -> Result<Vec<u8>> {
    let format = format.resolve();
    let rgba = match format {
        PixelFormat::Rgba8888 => src.to_vec(),
        PixelFormat::Rgb888 => src
            .chunks_exact(3)
            .flat_map(|t| [t[0], t[1], t[2], 255])
            .collect(),
        PixelFormat::Rgb565 => unpack_u16(src, |v| {
            [
                expand(v >> 11, 5),
                expand((v >> 5) & 0x3f, 6),
                expand(v & 0x1f, 5),
                255,
            ]
        }),
        PixelFormat::Rgba4444 => unpack_u16(src, |v| {
            [
                expand(v >> 12, 4),
                expand((v >> 8) & 0xf, 4),
                expand((v >> 4) & 0xf, 4),
                expand(v & 0xf, 4),
            ]
        }),
        PixelFormat::Rgb5a1 => unpack_u16(src, |v| {
            [
                expand(v >> 11, 5),
                expand((v >> 6) & 0x1f, 5),
                expand((v >> 1) & 0x1f, 5),
                if v & 1 == 1 { 255 } else { 0 },
            ]
        }),
        PixelFormat::A8 => src.iter().flat_map(|&a| [255, 255, 255, a]).collect(),
        PixelFormat::I8 => src.iter().flat_map(|&i| [i, i, i, 255]).collect(),
        PixelFormat::Ai88 => src
            .chunks_exact(2)
            .flat_map(|t| [t[0], t[0], t[0], t[1]])
            .collect(),
        PixelFormat::Pvrtc4 | PixelFormat::Pvrtc2 | PixelFormat::Automatic => {
            return Err(TextureError::UnsupportedFormat(format));
        }
    };

    Ok(rgba)
}

fn unpack_u16(src: &[u8], unpack: impl Fn(u16) -> [u8; 4]) -> Vec<u8> {
    src.chunks_exact(2)
        .flat_map(|t| unpack(u16::from_le_bytes([t[0], t[1]])))
        .collect()
}

/// Halves an RGBA8888 image with a 2x2 box filter.
///
/// Returns the new image and its size. Odd edges reuse the last row/column.
pub fn downsample_rgba8(src: &[u8], width: u32, height: u32) -> (Vec<u8>, u32, u32) {
    let new_width = (width / 2).max(1);
    let new_height = (height / 2).max(1);
    let mut out = Vec::with_capacity(new_width as usize * new_height as usize * 4);

    let texel = |x: u32, y: u32, c: usize| -> u32 {
        let x = x.min(width - 1) as usize;
        let y = y.min(height - 1) as usize;
        src[(y * width as usize + x) * 4 + c] as u32
    };

    for y in 0..new_height {
        for x in 0..new_width {
            for c in 0..4 {
                let sum = texel(2 * x, 2 * y, c)
                    + texel(2 * x + 1, 2 * y, c)
                    + texel(2 * x, 2 * y + 1, c)
                    + texel(2 * x + 1, 2 * y + 1, c);
                out.push(((sum + 2) / 4) as u8);
            }
        }
    }

    (out, new_width, new_height)
}
