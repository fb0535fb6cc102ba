//! Decoded video frames.
//!
//! Two layouts arrive from capture producers:
//!
//! ```text
//! Packed:  [ px px px px ... ]             width * height * bpp bytes
//! Planar:  Y [ ............ ]              full resolution
//!          U [ ...... ]  V [ ...... ]      half resolution, strided
//! ```
//!
//! Buffers are reference counted so a frame moves through the
//! [`FrameSlot`](crate::FrameSlot) without copying pixels.

use std::sync::Arc;

use crate::error::FrameError;

/// Pixel layout of a packed frame, inferred from the buffer length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte per pixel.
    Gray8,
    /// Three bytes per pixel.
    Rgb8,
    /// Four bytes per pixel.
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }

    fn from_bytes_per_pixel(bpp: usize) -> Option<Self> {
        match bpp {
            1 => Some(Self::Gray8),
            3 => Some(Self::Rgb8),
            4 => Some(Self::Rgba8),
            _ => None,
        }
    }
}

/// One plane of a planar (YUV 4:2:0) frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plane {
    data: Arc<[u8]>,
    pixel_stride: u32,
    row_stride: u32,
}

impl Plane {
    /// Creates a plane. Strides are in bytes.
    #[must_use]
    pub fn new(data: impl Into<Arc<[u8]>>, pixel_stride: u32, row_stride: u32) -> Self {
        Self {
            data: data.into(),
            pixel_stride,
            row_stride,
        }
    }

    /// Plane bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Distance in bytes between horizontally adjacent samples.
    #[must_use]
    pub fn pixel_stride(&self) -> u32 {
        self.pixel_stride
    }

    /// Distance in bytes between the starts of adjacent rows.
    #[must_use]
    pub fn row_stride(&self) -> u32 {
        self.row_stride
    }

    /// Returns the value of the sample at `(col, row)`.
    #[must_use]
    pub fn sample(&self, col: u32, row: u32) -> Option<u8> {
        let idx = offset(row, self.row_stride, col, self.pixel_stride)?;
        self.data.get(idx).copied()
    }

    fn validate(&self, name: &'static str, width: u32, height: u32) -> Result<(), FrameError> {
        if self.pixel_stride == 0 || self.row_stride == 0 {
            return Err(FrameError::ZeroStride { plane: name });
        }
        // The last row of a strided plane may be short, so only count up to its last sample.
        let required = offset(height - 1, self.row_stride, width - 1, self.pixel_stride)
            .and_then(|last| last.checked_add(1))
            .ok_or(FrameError::LayoutOverflow { plane: name })?;
        if self.data.len() < required {
            return Err(FrameError::PlaneTooSmall {
                plane: name,
                required,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

/// Byte offset of sample `(col, row)`, or `None` if it does not fit in `usize`.
fn offset(row: u32, row_stride: u32, col: u32, pixel_stride: u32) -> Option<usize> {
    let row_bytes = usize::try_from(row)
        .ok()?
        .checked_mul(usize::try_from(row_stride).ok()?)?;
    let col_bytes = usize::try_from(col)
        .ok()?
        .checked_mul(usize::try_from(pixel_stride).ok()?)?;
    row_bytes.checked_add(col_bytes)
}

/// Pixel payload of a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameData {
    /// Interleaved pixels.
    Packed {
        /// Inferred pixel format.
        format: PixelFormat,
        /// Pixel bytes, row-major, no padding.
        pixels: Arc<[u8]>,
    },
    /// Separate luma and chroma planes.
    Planar {
        /// Luma plane, full resolution.
        y: Plane,
        /// Chroma U plane, half resolution.
        u: Plane,
        /// Chroma V plane, half resolution.
        v: Plane,
    },
}

/// A decoded video frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoFrame {
    width: u32,
    height: u32,
    data: FrameData,
}

impl VideoFrame {
    /// Creates a packed frame, inferring the pixel format from the buffer size.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if a dimension is zero or the buffer length is
    /// not `width * height * {1, 3, 4}`.
    pub fn packed(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> Result<Self, FrameError> {
        check_dimensions(width, height)?;
        let pixels = pixels.into();
        let area = usize::try_from(u64::from(width) * u64::from(height)).ok();
        let format = match area {
            Some(area) if pixels.len() % area == 0 => {
                PixelFormat::from_bytes_per_pixel(pixels.len() / area)
            }
            _ => None,
        };
        let Some(format) = format else {
            return Err(FrameError::PackedSize {
                width,
                height,
                actual: pixels.len(),
            });
        };
        Ok(Self {
            width,
            height,
            data: FrameData::Packed { format, pixels },
        })
    }

    /// Creates a planar 4:2:0 frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if a dimension is zero, a stride is zero, a
    /// plane's stride layout overflows, or a plane is too short for its
    /// declared strides.
    pub fn planar(width: u32, height: u32, y: Plane, u: Plane, v: Plane) -> Result<Self, FrameError> {
        check_dimensions(width, height)?;
        let (cw, ch) = (width.div_ceil(2), height.div_ceil(2));
        y.validate("y", width, height)?;
        u.validate("u", cw, ch)?;
        v.validate("v", cw, ch)?;
        Ok(Self {
            width,
            height,
            data: FrameData::Planar { y, u, v },
        })
    }

    /// Frame width in pixels.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel payload.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &FrameData {
        &self.data
    }

    /// Returns whether this frame uses the planar layout.
    #[must_use]
    pub fn is_planar(&self) -> bool {
        matches!(self.data, FrameData::Planar { .. })
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::EmptyDimensions { width, height });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_infers_format() {
        let rgb = VideoFrame::packed(4, 2, vec![0u8; 4 * 2 * 3]).unwrap();
        assert!(matches!(
            rgb.data(),
            FrameData::Packed { format: PixelFormat::Rgb8, .. }
        ));

        let rgba = VideoFrame::packed(4, 2, vec![0u8; 4 * 2 * 4]).unwrap();
        assert!(matches!(
            rgba.data(),
            FrameData::Packed { format: PixelFormat::Rgba8, .. }
        ));
    }

    #[test]
    fn test_packed_rejects_odd_sizes() {
        let err = VideoFrame::packed(4, 2, vec![0u8; 17]).unwrap_err();
        assert_eq!(
            err,
            FrameError::PackedSize {
                width: 4,
                height: 2,
                actual: 17
            }
        );
        assert!(VideoFrame::packed(0, 2, vec![0u8; 8]).is_err());
    }

    #[test]
    fn test_planar_accepts_short_last_row() {
        // 6x4 luma with row padding; chroma 3x2 interleaved (pixel stride 2).
        let y = Plane::new(vec![0u8; 8 * 3 + 6], 1, 8);
        let u = Plane::new(vec![0u8; 6 + 5], 2, 6);
        let v = Plane::new(vec![0u8; 6 + 5], 2, 6);
        let frame = VideoFrame::planar(6, 4, y, u, v).unwrap();
        assert!(frame.is_planar());
        assert_eq!((frame.width(), frame.height()), (6, 4));
    }

    #[test]
    fn test_planar_rejects_short_plane() {
        let y = Plane::new(vec![0u8; 10], 1, 6);
        let u = Plane::new(vec![0u8; 6], 1, 3);
        let v = Plane::new(vec![0u8; 6], 1, 3);
        let err = VideoFrame::planar(6, 4, y, u, v).unwrap_err();
        assert!(matches!(err, FrameError::PlaneTooSmall { plane: "y", .. }));
    }

    #[test]
    fn test_oversized_strides_are_rejected_not_wrapped() {
        let tiny = || Plane::new(vec![0u8; 4], u32::MAX, u32::MAX);
        let err = VideoFrame::planar(u32::MAX, u32::MAX, tiny(), tiny(), tiny()).unwrap_err();
        // 64-bit targets can hold the offset, so the short buffer is caught instead.
        assert!(matches!(
            err,
            FrameError::LayoutOverflow { plane: "y" } | FrameError::PlaneTooSmall { plane: "y", .. }
        ));

        let plane = tiny();
        assert_eq!(plane.sample(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_plane_sample_uses_strides() {
        let plane = Plane::new(vec![1, 2, 3, 4, 5, 6, 7, 8], 2, 4);
        assert_eq!(plane.sample(1, 1), Some(7));
        assert_eq!(plane.sample(3, 3), None);
    }
}
