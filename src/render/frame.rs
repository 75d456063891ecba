use crate::foundation::core::{Resolution, Rgba8};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Channel layout of a [`Frame`]'s pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA8 with straight alpha.
    Rgba8,
    /// RGBA8 with color channels multiplied by alpha.
    Rgba8Premul,
}

/// A fixed-format pixel buffer.
///
/// Decode back ends may hand out either format and any row stride >= `width * 4`. Everything the
/// compositor produces is tightly packed [`PixelFormat::Rgba8Premul`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per row.
    pub stride: usize,
    /// Pixel format of `data`.
    pub format: PixelFormat,
    /// Row-major pixel bytes, `stride * height` long.
    pub data: Vec<u8>,
}

impl Frame {
    /// Build a tightly packed frame, validating the buffer length.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> MontageResult<Self> {
        Self::with_stride(width, height, (width as usize) * 4, format, data)
    }

    /// Build a frame whose rows are `stride` bytes apart.
    pub fn with_stride(
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> MontageResult<Self> {
        if width == 0 || height == 0 {
            return Err(MontageError::validation("frame width/height must be > 0"));
        }
        let row = (width as usize)
            .checked_mul(4)
            .ok_or_else(|| MontageError::validation("frame row size overflow"))?;
        if stride < row {
            return Err(MontageError::validation(format!(
                "frame stride {stride} is smaller than row size {row}"
            )));
        }
        let expected = stride
            .checked_mul(height as usize)
            .ok_or_else(|| MontageError::validation("frame buffer size overflow"))?;
        if data.len() != expected {
            return Err(MontageError::validation(format!(
                "frame buffer has {} bytes, expected {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            format,
            data,
        })
    }

    /// Premultiplied frame filled with `color`.
    pub fn solid(resolution: Resolution, color: Rgba8) -> Self {
        Self {
            width: resolution.width,
            height: resolution.height,
            stride: (resolution.width as usize) * 4,
            format: PixelFormat::Rgba8Premul,
            data: color.to_premul().repeat(resolution.pixel_count()),
        }
    }

    /// Fully transparent premultiplied frame.
    pub fn transparent(resolution: Resolution) -> Self {
        Self::solid(resolution, Rgba8::TRANSPARENT)
    }

    /// Frame dimensions.
    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    /// `true` when rows are tightly packed.
    pub fn is_packed(&self) -> bool {
        self.stride == (self.width as usize) * 4
    }

    /// Raw bytes of pixel `(x, y)` in this frame's format.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize) * self.stride + (x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Convert to tightly packed premultiplied RGBA8.
    pub fn into_premultiplied(self) -> Frame {
        let mut out = if self.is_packed() {
            self
        } else {
            let row = (self.width as usize) * 4;
            let mut data = Vec::with_capacity(row * self.height as usize);
            for y in 0..self.height as usize {
                let off = y * self.stride;
                data.extend_from_slice(&self.data[off..off + row]);
            }
            Frame {
                stride: row,
                data,
                ..self
            }
        };
        if out.format == PixelFormat::Rgba8 {
            premultiply_rgba8_in_place(&mut out.data);
            out.format = PixelFormat::Rgba8Premul;
        }
        out
    }

    /// Tightly packed straight-alpha RGBA8 bytes (for image encoders).
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let row = (self.width as usize) * 4;
        let mut out = Vec::with_capacity(row * self.height as usize);
        for y in 0..self.height as usize {
            let off = y * self.stride;
            out.extend_from_slice(&self.data[off..off + row]);
        }
        if self.format == PixelFormat::Rgba8Premul {
            for px in out.chunks_exact_mut(4) {
                let a = u16::from(px[3]);
                if a == 0 {
                    continue;
                }
                for c in &mut px[..3] {
                    *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
