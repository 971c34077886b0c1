use kurbo::BezPath;
use ttf_parser::{Face, OutlineBuilder};

use crate::error::{AssetError, Result};
use crate::path::Path;
use crate::trace::flatten_into;

/// Lays out a line of text as closed outline paths, ready for extrusion.
///
/// Glyphs are placed left to right along a single baseline with the font's
/// own advance widths. Output coordinates are y-down to match traced
/// artwork, so the same placement step serves both.
pub struct TypesetText<'a> {
    text: &'a str,
    font_data: &'a [u8],
    size: f64,
}

impl<'a> TypesetText<'a> {
    /// Creates a new `TypesetText` operation over raw font bytes
    /// (TrueType/OpenType).
    #[must_use]
    pub fn new(text: &'a str, font_data: &'a [u8], size: f64) -> Self {
        Self {
            text,
            font_data,
            size,
        }
    }

    /// Executes the layout.
    ///
    /// Text without any outline (empty string, all whitespace) yields an
    /// empty path set; callers treat this as "no engraving".
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::FontLoadFailure`] if the font cannot be parsed.
    pub fn execute(&self) -> Result<Vec<Path>> {
        let face = Face::parse(self.font_data, 0).map_err(|_| AssetError::FontLoadFailure)?;
        let upem = f64::from(face.units_per_em());
        let scale = self.size / upem;
        let fallback_advance = upem / 4.0;

        let tolerance = (self.size * 0.005).max(1e-3);
        let mut pen_x = 0.0;
        let mut paths = Vec::new();

        for ch in self.text.chars() {
            let glyph = face.glyph_index(ch);
            let advance = glyph
                .and_then(|g| face.glyph_hor_advance(g))
                .map_or(fallback_advance, f64::from);

            if let Some(g) = glyph {
                if !ch.is_whitespace() {
                    let mut builder = GlyphOutline::new(pen_x, scale);
                    if face.outline_glyph(g, &mut builder).is_some() {
                        flatten_into(&builder.path, tolerance, &mut paths);
                    }
                }
            }
            pen_x += advance * scale;
        }

        Ok(paths)
    }
}

/// Collects one glyph's outline into a bezier path, applying the pen offset
/// and em scale, and flipping the font's y-up axis to y-down.
struct GlyphOutline {
    path: BezPath,
    pen_x: f64,
    scale: f64,
}

impl GlyphOutline {
    fn new(pen_x: f64, scale: f64) -> Self {
        Self {
            path: BezPath::new(),
            pen_x,
            scale,
        }
    }

    fn point(&self, x: f32, y: f32) -> kurbo::Point {
        kurbo::Point::new(
            self.pen_x + f64::from(x) * self.scale,
            -f64::from(y) * self.scale,
        )
    }
}

impl OutlineBuilder for GlyphOutline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(self.point(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(self.point(x, y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.path.quad_to(self.point(x1, y1), self.point(x, y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.path
            .curve_to(self.point(x1, y1), self.point(x2, y2), self.point(x, y));
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

/// Builds a parseable TrueType font containing only the required metric
/// tables (`head`, `hhea`, `maxp`): no cmap, no glyph data. Every lookup
/// falls through to the fallback advance, which is exactly what the
/// no-outline tests need.
#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn metrics_only_font() -> Vec<u8> {
    let mut head = Vec::new();
    head.extend_from_slice(&0x0001_0000_u32.to_be_bytes()); // version
    head.extend_from_slice(&0x0001_0000_u32.to_be_bytes()); // fontRevision
    head.extend_from_slice(&0_u32.to_be_bytes()); // checkSumAdjustment
    head.extend_from_slice(&0x5F0F_3CF5_u32.to_be_bytes()); // magicNumber
    head.extend_from_slice(&0_u16.to_be_bytes()); // flags
    head.extend_from_slice(&1000_u16.to_be_bytes()); // unitsPerEm
    head.extend_from_slice(&[0; 16]); // created + modified
    head.extend_from_slice(&[0; 8]); // xMin..yMax
    head.extend_from_slice(&0_u16.to_be_bytes()); // macStyle
    head.extend_from_slice(&8_u16.to_be_bytes()); // lowestRecPPEM
    head.extend_from_slice(&2_i16.to_be_bytes()); // fontDirectionHint
    head.extend_from_slice(&0_i16.to_be_bytes()); // indexToLocFormat
    head.extend_from_slice(&0_i16.to_be_bytes()); // glyphDataFormat

    let mut hhea = Vec::new();
    hhea.extend_from_slice(&0x0001_0000_u32.to_be_bytes()); // version
    hhea.extend_from_slice(&800_i16.to_be_bytes()); // ascender
    hhea.extend_from_slice(&(-200_i16).to_be_bytes()); // descender
    hhea.extend_from_slice(&0_i16.to_be_bytes()); // lineGap
    hhea.extend_from_slice(&500_u16.to_be_bytes()); // advanceWidthMax
    hhea.extend_from_slice(&[0; 20]); // side bearings, caret, reserved
    hhea.extend_from_slice(&0_i16.to_be_bytes()); // metricDataFormat
    hhea.extend_from_slice(&0_u16.to_be_bytes()); // numberOfHMetrics

    let mut maxp = Vec::new();
    maxp.extend_from_slice(&0x0000_5000_u32.to_be_bytes()); // version 0.5
    maxp.extend_from_slice(&1_u16.to_be_bytes()); // numGlyphs

    let tables: [(&[u8; 4], &[u8]); 3] = [(b"head", &head), (b"hhea", &hhea), (b"maxp", &maxp)];
    let mut font = Vec::new();
    font.extend_from_slice(&0x0001_0000_u32.to_be_bytes()); // sfnt version
    font.extend_from_slice(&(tables.len() as u16).to_be_bytes());
    font.extend_from_slice(&[0; 6]); // searchRange, entrySelector, rangeShift
    let mut offset = (12 + 16 * tables.len()) as u32;
    for (tag, body) in &tables {
        font.extend_from_slice(*tag);
        font.extend_from_slice(&0_u32.to_be_bytes()); // checksum, unverified
        font.extend_from_slice(&offset.to_be_bytes());
        font.extend_from_slice(&(body.len() as u32).to_be_bytes());
        offset += body.len() as u32;
    }
    for (_, body) in &tables {
        font.extend_from_slice(body);
    }
    font
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn garbage_font_bytes_error() {
        let result = TypesetText::new("A", b"not a font", 3.0).execute();
        assert!(result.is_err());
    }

    #[test]
    fn empty_text_yields_no_paths() {
        let font = metrics_only_font();
        let paths = TypesetText::new("", &font, 3.0).execute().unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn whitespace_text_yields_no_paths() {
        let font = metrics_only_font();
        let paths = TypesetText::new("  \t ", &font, 3.0).execute().unwrap();
        assert!(paths.is_empty());
    }
}
