mod simplify;
mod svg;

pub use simplify::simplify_closed;
pub use svg::ParseSvgPaths;
pub(crate) use svg::flatten_into;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::math::Point2;
use crate::path::Path;

/// Parameters controlling raster tracing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TraceParams {
    /// Luminance threshold: pixels darker than this are foreground.
    pub threshold: u8,
    /// Contours enclosing less than this area (in px²) are discarded.
    pub min_feature_area: f64,
    /// Maximum deviation allowed when simplifying contours.
    pub tolerance: f64,
}

impl Default for TraceParams {
    fn default() -> Self {
        Self {
            threshold: 128,
            min_feature_area: 2.0,
            tolerance: 0.2,
        }
    }
}

/// Traces foreground regions of an RGBA raster into closed outline paths.
///
/// Boundary edges between foreground and background pixels are collected as
/// directed segments and stitched into loops. Outer boundaries come out with
/// positive signed area, holes negative, so nested shapes (counters inside
/// glyphs, rings inside logos) survive into triangulation.
pub struct TraceRaster<'a> {
    pixels: &'a [u8],
    width: u32,
    height: u32,
    params: TraceParams,
}

/// Lattice point on the pixel-corner grid.
type Corner = (i64, i64);

/// Directed boundary edge between two lattice points.
#[derive(Debug, Clone, Copy)]
struct BoundaryEdge {
    start: Corner,
    end: Corner,
}

impl<'a> TraceRaster<'a> {
    /// Creates a new `TraceRaster` operation over a tightly packed RGBA
    /// buffer.
    #[must_use]
    pub fn new(pixels: &'a [u8], width: u32, height: u32, params: TraceParams) -> Self {
        Self {
            pixels,
            width,
            height,
            params,
        }
    }

    /// Executes the trace.
    ///
    /// An all-background image yields an empty path set; callers treat this
    /// as "no engraving", not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::DimensionMismatch`] if the buffer does not
    /// match the declared dimensions.
    pub fn execute(&self) -> Result<Vec<Path>> {
        let expected = self.width as usize * self.height as usize * 4;
        if self.pixels.len() != expected {
            return Err(TraceError::DimensionMismatch {
                width: self.width,
                height: self.height,
                expected,
                actual: self.pixels.len(),
            }
            .into());
        }

        let grid = self.binarize();
        let edges = self.boundary_edges(&grid);
        let loops = stitch_loops(&edges);

        let mut paths = Vec::new();
        for contour in loops {
            let path = Path::closed(contour);
            if path.signed_area().abs() < self.params.min_feature_area {
                continue;
            }
            let simplified = simplify_closed(&path.points, self.params.tolerance);
            if simplified.len() >= 3 {
                paths.push(Path::closed(simplified));
            }
        }
        Ok(paths)
    }

    /// Binarizes the image: opaque pixels darker than the threshold are
    /// foreground. Transparent pixels are always background.
    fn binarize(&self) -> Vec<bool> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut grid = vec![false; w * h];
        for (i, cell) in grid.iter_mut().enumerate() {
            let px = &self.pixels[i * 4..i * 4 + 4];
            if px[3] < 128 {
                continue;
            }
            let lum = 0.299 * f64::from(px[0]) + 0.587 * f64::from(px[1]) + 0.114 * f64::from(px[2]);
            *cell = lum < f64::from(self.params.threshold);
        }
        grid
    }

    /// Emits one directed edge per foreground pixel side that borders
    /// background, oriented so outer loops wind with positive area.
    fn boundary_edges(&self, grid: &[bool]) -> Vec<BoundaryEdge> {
        let (w, h) = (self.width as i64, self.height as i64);
        let fg = |x: i64, y: i64| -> bool {
            if x < 0 || y < 0 || x >= w || y >= h {
                return false;
            }
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            {
                grid[(y * w + x) as usize]
            }
        };

        let mut edges = Vec::new();
        for y in 0..h {
            for x in 0..w {
                if !fg(x, y) {
                    continue;
                }
                if !fg(x, y - 1) {
                    edges.push(BoundaryEdge {
                        start: (x, y),
                        end: (x + 1, y),
                    });
                }
                if !fg(x + 1, y) {
                    edges.push(BoundaryEdge {
                        start: (x + 1, y),
                        end: (x + 1, y + 1),
                    });
                }
                if !fg(x, y + 1) {
                    edges.push(BoundaryEdge {
                        start: (x + 1, y + 1),
                        end: (x, y + 1),
                    });
                }
                if !fg(x - 1, y) {
                    edges.push(BoundaryEdge {
                        start: (x, y + 1),
                        end: (x, y),
                    });
                }
            }
        }
        edges
    }
}

/// Stitches directed boundary edges into closed loops.
///
/// At ambiguous corners (two foreground pixels touching diagonally) the
/// walk picks the sharpest turn that keeps the loop hugging its own
/// 4-connected region, so diagonal neighbors trace as separate contours.
fn stitch_loops(edges: &[BoundaryEdge]) -> Vec<Vec<Point2>> {
    let mut by_start: HashMap<Corner, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        by_start.entry(e.start).or_default().push(i);
    }

    let mut visited = vec![false; edges.len()];
    let mut loops = Vec::new();

    for seed in 0..edges.len() {
        if visited[seed] {
            continue;
        }
        let origin = edges[seed].start;
        let mut contour = Vec::new();
        let mut current = seed;

        loop {
            visited[current] = true;
            let edge = edges[current];
            contour.push(corner_to_point(edge.start));

            if edge.end == origin {
                break;
            }

            let dir = (edge.end.0 - edge.start.0, edge.end.1 - edge.start.1);
            let Some(next) = pick_next(edge.end, dir, &by_start, &visited, edges) else {
                // Dangling chain; should not happen for well-formed grids.
                contour.clear();
                break;
            };
            current = next;
        }

        if contour.len() >= 3 {
            loops.push(contour);
        }
    }
    loops
}

/// Picks the outgoing edge at `point` that turns most sharply toward the
/// loop interior relative to the incoming direction.
fn pick_next(
    point: Corner,
    incoming: (i64, i64),
    by_start: &HashMap<Corner, Vec<usize>>,
    visited: &[bool],
    edges: &[BoundaryEdge],
) -> Option<usize> {
    let candidates = by_start.get(&point)?;
    let mut best: Option<(i64, usize)> = None;
    for &i in candidates {
        if visited[i] {
            continue;
        }
        let out = (
            edges[i].end.0 - edges[i].start.0,
            edges[i].end.1 - edges[i].start.1,
        );
        let cross = incoming.0 * out.1 - incoming.1 * out.0;
        if best.is_none_or(|(b, _)| cross > b) {
            best = Some((cross, i));
        }
    }
    best.map(|(_, i)| i)
}

#[allow(clippy::cast_precision_loss)]
fn corner_to_point(c: Corner) -> Point2 {
    Point2::new(c.0 as f64, c.1 as f64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Builds an RGBA buffer from rows of '#' (black) and '.' (white).
    fn raster(rows: &[&str]) -> (Vec<u8>, u32, u32) {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        let mut pixels = Vec::with_capacity((w * h * 4) as usize);
        for row in rows {
            for ch in row.chars() {
                let v = if ch == '#' { 0u8 } else { 255u8 };
                pixels.extend_from_slice(&[v, v, v, 255]);
            }
        }
        (pixels, w, h)
    }

    #[test]
    fn all_background_yields_no_paths() {
        let (px, w, h) = raster(&["....", "....", "....", "...."]);
        let paths = TraceRaster::new(&px, w, h, TraceParams::default())
            .execute()
            .unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn solid_black_yields_one_rectangle() {
        let (w, h) = (100u32, 100u32);
        let px = vec![0u8, 0, 0, 255]
            .into_iter()
            .cycle()
            .take((w * h * 4) as usize)
            .collect::<Vec<_>>();
        let paths = TraceRaster::new(&px, w, h, TraceParams::default())
            .execute()
            .unwrap();
        assert_eq!(paths.len(), 1);
        let path = &paths[0];
        assert_eq!(path.points.len(), 4);
        let (min, max) = path.bounding_box().unwrap();
        assert_relative_eq!(min.x, 0.0);
        assert_relative_eq!(min.y, 0.0);
        assert_relative_eq!(max.x, 100.0);
        assert_relative_eq!(max.y, 100.0);
        assert_relative_eq!(path.signed_area(), 10_000.0);
    }

    #[test]
    fn ring_produces_outer_and_hole_with_opposite_winding() {
        let (px, w, h) = raster(&[
            "......",
            ".####.",
            ".#..#.",
            ".#..#.",
            ".####.",
            "......",
        ]);
        let paths = TraceRaster::new(&px, w, h, TraceParams::default())
            .execute()
            .unwrap();
        assert_eq!(paths.len(), 2);
        let mut areas: Vec<f64> = paths.iter().map(Path::signed_area).collect();
        areas.sort_by(f64::total_cmp);
        assert_relative_eq!(areas[0], -4.0); // 2x2 hole, clockwise
        assert_relative_eq!(areas[1], 16.0); // 4x4 outer, counter-clockwise
    }

    #[test]
    fn single_pixel_noise_is_discarded() {
        let (px, w, h) = raster(&["....", ".#..", "....", "...."]);
        let paths = TraceRaster::new(&px, w, h, TraceParams::default())
            .execute()
            .unwrap();
        // 1 px² is below the default 2 px² minimum feature area.
        assert!(paths.is_empty());
    }

    #[test]
    fn diagonal_pixels_trace_as_separate_contours() {
        let (px, w, h) = raster(&["#..", ".#.", "..#"]);
        let params = TraceParams {
            min_feature_area: 0.5,
            ..TraceParams::default()
        };
        let paths = TraceRaster::new(&px, w, h, params).execute().unwrap();
        assert_eq!(paths.len(), 3);
        for p in &paths {
            assert_relative_eq!(p.signed_area(), 1.0);
        }
    }

    #[test]
    fn transparent_pixels_are_background() {
        let mut px = vec![0u8; 4 * 4 * 4];
        // All pixels black but transparent, except one opaque.
        for p in px.chunks_mut(4) {
            p[3] = 0;
        }
        px[3] = 255;
        let params = TraceParams {
            min_feature_area: 0.5,
            ..TraceParams::default()
        };
        let paths = TraceRaster::new(&px, 4, 4, params).execute().unwrap();
        assert_eq!(paths.len(), 1);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        let px = vec![0u8; 10];
        let result = TraceRaster::new(&px, 4, 4, TraceParams::default()).execute();
        assert!(result.is_err());
    }
}
