//! Decoded RGB images handed to the renderer.

use std::fmt;

use image::{imageops, DynamicImage, Rgb, RgbImage};

use crate::error::{Error, Result};

/// A fully decoded 8-bit RGB image, rows stored top to bottom.
///
/// Decoding happens before the renderer ever sees the image, so a
/// `SourceImage` is always complete.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    image: RgbImage,
}

impl SourceImage {
    /// Wrap tightly packed RGB8 pixels.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidImage`] if `pixels` is not exactly
    /// `width * height * 3` bytes.
    pub fn from_rgb8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = u64::from(width) * u64::from(height) * 3;
        let len = pixels.len();
        if u64::try_from(len).ok() != Some(expected) {
            return Err(Error::InvalidImage { width, height, len });
        }
        RgbImage::from_raw(width, height, pixels)
            .map(|image| Self { image })
            .ok_or(Error::InvalidImage { width, height, len })
    }

    /// Decode an encoded image (PNG or JPEG) and drop any alpha channel.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if the bytes are not a supported image.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(Error::Decode)?;
        Ok(Self::from_dynamic(&image))
    }

    /// Convert any decoded image to RGB8.
    #[must_use]
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        Self {
            image: image.to_rgb8(),
        }
    }

    /// A black and white checkerboard with square cells of `cell` pixels.
    ///
    /// Used as the image shown before the user picks one.
    #[must_use]
    pub fn checkerboard(width: u32, height: u32, cell: u32) -> Self {
        let cell = cell.max(1);
        let image = RgbImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        Self { image }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `[width, height]` in pixels.
    #[must_use]
    pub fn dimensions(&self) -> [u32; 2] {
        [self.width(), self.height()]
    }

    /// Pixel bytes, rows top to bottom.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Borrow as an [`RgbImage`].
    #[must_use]
    pub fn as_rgb_image(&self) -> &RgbImage {
        &self.image
    }

    /// Pixel bytes with rows bottom to top, the order GL texture uploads
    /// expect for a `t = 0` bottom edge.
    pub(crate) fn flipped_rows(&self) -> Vec<u8> {
        imageops::flip_vertical(&self.image).into_raw()
    }
}

impl From<RgbImage> for SourceImage {
    fn from(image: RgbImage) -> Self {
        Self { image }
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb8_checks_length() {
        SourceImage::from_rgb8(2, 2, vec![0; 12]).unwrap();
        let err = SourceImage::from_rgb8(2, 2, vec![0; 13]).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidImage {
                width: 2,
                height: 2,
                len: 13
            }
        ));
    }

    #[test]
    fn flipped_rows_reverses_row_order() {
        let pixels = vec![
            1, 1, 1, 2, 2, 2, // top row
            3, 3, 3, 4, 4, 4, // bottom row
        ];
        let image = SourceImage::from_rgb8(2, 2, pixels).unwrap();
        assert_eq!(
            image.flipped_rows(),
            vec![3, 3, 3, 4, 4, 4, 1, 1, 1, 2, 2, 2]
        );
    }

    #[test]
    fn checkerboard_alternates_cells() {
        let board = SourceImage::checkerboard(4, 4, 2);
        let img = board.as_rgb_image();
        assert_eq!(img.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(2, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(2, 2), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(1, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn decode_round_trips_png() {
        let board = SourceImage::checkerboard(6, 3, 1);
        let mut png = Vec::new();
        board
            .as_rgb_image()
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let decoded = SourceImage::decode(&png).unwrap();
        assert_eq!(decoded, board);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            SourceImage::decode(b"not an image"),
            Err(Error::Decode(_))
        ));
    }
}
