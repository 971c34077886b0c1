use image::ImageFormat;

use crate::error::{AssetError, Result};

/// Payload formats accepted for logo engravings.
///
/// The allow-list is checked against the *declared* type before any bytes
/// are inspected, so unsupported drops are rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    Png,
    Svg,
    Webp,
}

impl MimeType {
    /// Maps a declared MIME string onto the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::UnsupportedFileType`] for anything else,
    /// including types the image stack could technically decode.
    pub fn from_declared(declared: &str) -> Result<Self> {
        match declared {
            "image/png" => Ok(Self::Png),
            "image/svg+xml" => Ok(Self::Svg),
            "image/webp" => Ok(Self::Webp),
            other => Err(AssetError::UnsupportedFileType {
                declared: other.to_string(),
            }
            .into()),
        }
    }

    /// True for formats carrying vector outlines rather than pixels.
    #[must_use]
    pub fn is_vector(self) -> bool {
        matches!(self, Self::Svg)
    }
}

/// Decodes a raster payload into a tightly packed RGBA buffer.
///
/// The decoder is pinned to the declared format; bytes masquerading as a
/// different type fail instead of being sniffed.
///
/// # Errors
///
/// Returns [`AssetError::LoadFailure`] for undecodable bytes and
/// [`AssetError::UnsupportedFileType`] when called with a vector type.
pub fn decode_rgba(bytes: &[u8], mime: MimeType) -> Result<(u32, u32, Vec<u8>)> {
    let format = match mime {
        MimeType::Png => ImageFormat::Png,
        MimeType::Webp => ImageFormat::WebP,
        MimeType::Svg => {
            return Err(AssetError::UnsupportedFileType {
                declared: "image/svg+xml (vector payloads are parsed, not decoded)".to_string(),
            }
            .into())
        }
    };

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| AssetError::LoadFailure(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, rgba.into_raw()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_accepts_the_three_formats() {
        assert_eq!(MimeType::from_declared("image/png").unwrap(), MimeType::Png);
        assert_eq!(
            MimeType::from_declared("image/svg+xml").unwrap(),
            MimeType::Svg
        );
        assert_eq!(
            MimeType::from_declared("image/webp").unwrap(),
            MimeType::Webp
        );
    }

    #[test]
    fn jpeg_is_rejected_by_declaration() {
        assert!(MimeType::from_declared("image/jpeg").is_err());
        assert!(MimeType::from_declared("").is_err());
    }

    #[test]
    fn garbage_png_bytes_fail_to_decode() {
        assert!(decode_rgba(b"definitely not a png", MimeType::Png).is_err());
    }

    #[test]
    fn png_round_trips_dimensions() {
        // Encode a 2x1 image with the same stack we decode with.
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([255, 255, 255, 255]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();

        let (w, h, pixels) = decode_rgba(&bytes.into_inner(), MimeType::Png).unwrap();
        assert_eq!((w, h), (2, 1));
        assert_eq!(pixels.len(), 8);
        assert_eq!(pixels[0], 0);
        assert_eq!(pixels[4], 255);
    }
}
