use kurbo::{BezPath, PathEl};

use crate::error::{Result, TraceError};
use crate::math::Point2;
use crate::path::Path;

/// Parses SVG `<path>` outline data into closed paths, bypassing raster
/// tracing for inputs that are already vector.
///
/// Curves are flattened to polylines within `tolerance`, landing in the
/// same [`Path`] representation the raster tracer produces.
pub struct ParseSvgPaths<'a> {
    svg: &'a str,
    tolerance: f64,
}

impl<'a> ParseSvgPaths<'a> {
    /// Creates a new `ParseSvgPaths` operation over an SVG document (or a
    /// bare path-data string).
    #[must_use]
    pub fn new(svg: &'a str, tolerance: f64) -> Self {
        Self { svg, tolerance }
    }

    /// Executes the parse.
    ///
    /// A document without path elements yields an empty set, mirroring the
    /// all-background raster case.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::SvgParse`] if path data is malformed.
    pub fn execute(&self) -> Result<Vec<Path>> {
        let data = if self.svg.contains('<') {
            extract_path_data(self.svg)
        } else {
            vec![self.svg.trim().to_string()]
        };

        let mut paths = Vec::new();
        for d in data {
            let bez =
                BezPath::from_svg(&d).map_err(|e| TraceError::SvgParse(e.to_string()))?;
            flatten_into(&bez, self.tolerance.max(1e-3), &mut paths);
        }
        Ok(paths)
    }
}

/// Pulls the `d` attribute out of every `<path>` element.
fn extract_path_data(svg: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut rest = svg;
    while let Some(open) = rest.find("<path") {
        let tag = &rest[open..];
        let end = tag.find('>').unwrap_or(tag.len());
        if let Some(d) = find_attribute(&tag[..end], 'd') {
            result.push(d.to_string());
        }
        rest = &tag[end..];
        if rest.is_empty() {
            break;
        }
        rest = &rest[1..];
    }
    result
}

/// Finds a single-letter attribute value inside an element tag.
fn find_attribute(tag: &str, name: char) -> Option<&str> {
    let bytes = tag.as_bytes();
    let mut i = 0;
    while i + 2 < bytes.len() {
        if bytes[i].is_ascii_whitespace()
            && bytes[i + 1] == name as u8
            && matches!(bytes[i + 2], b'=' | b' ')
        {
            let after = tag[i + 2..].trim_start_matches([' ', '=']);
            let quote = after.chars().next()?;
            if quote == '"' || quote == '\'' {
                let inner = &after[1..];
                let close = inner.find(quote)?;
                return Some(&inner[..close]);
            }
        }
        i += 1;
    }
    None
}

/// Flattens a bezier path into closed polyline paths.
pub(crate) fn flatten_into(bez: &BezPath, tolerance: f64, out: &mut Vec<Path>) {
    let mut current: Vec<Point2> = Vec::new();
    kurbo::flatten(bez.elements().iter().copied(), tolerance, |el| match el {
        PathEl::MoveTo(p) => {
            finish_contour(&mut current, out);
            current.push(Point2::new(p.x, p.y));
        }
        PathEl::LineTo(p) => {
            current.push(Point2::new(p.x, p.y));
        }
        PathEl::ClosePath => {
            finish_contour(&mut current, out);
        }
        // flatten() only emits the variants above.
        PathEl::QuadTo(..) | PathEl::CurveTo(..) => {}
    });
    // Subpaths without an explicit Z still describe filled regions.
    finish_contour(&mut current, out);
}

fn finish_contour(current: &mut Vec<Point2>, out: &mut Vec<Path>) {
    if current.len() >= 3 {
        let mut points = std::mem::take(current);
        // Drop an explicit closing point that duplicates the start.
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if (first - last).norm() < 1e-9 {
                points.pop();
            }
        }
        if points.len() >= 3 {
            out.push(Path::closed(points));
        }
    } else {
        current.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_rectangle_path_element() {
        let svg = r#"<svg xmlns="x"><path fill="black" d="M 0 0 L 10 0 L 10 10 L 0 10 Z"/></svg>"#;
        let paths = ParseSvgPaths::new(svg, 0.2).execute().unwrap();
        assert_eq!(paths.len(), 1);
        assert_relative_eq!(paths[0].signed_area().abs(), 100.0);
    }

    #[test]
    fn parses_bare_path_data() {
        let paths = ParseSvgPaths::new("M0,0 L4,0 L4,4 L0,4 Z", 0.2)
            .execute()
            .unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].points.len(), 4);
    }

    #[test]
    fn flattens_curves_within_tolerance() {
        // Half circle of radius 10 via a cubic approximation.
        let paths = ParseSvgPaths::new("M -10 0 C -10 -13.3 10 -13.3 10 0 Z", 0.1)
            .execute()
            .unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].points.len() > 4, "curve should be subdivided");
    }

    #[test]
    fn multiple_subpaths_become_multiple_paths() {
        let d = "M0 0 L2 0 L2 2 L0 2 Z M5 5 L8 5 L8 8 L5 8 Z";
        let paths = ParseSvgPaths::new(d, 0.2).execute().unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn document_without_paths_is_empty() {
        let paths = ParseSvgPaths::new("<svg><rect/></svg>", 0.2).execute().unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn malformed_path_data_errors() {
        assert!(ParseSvgPaths::new("M 0 zz", 0.2).execute().is_err());
    }

    #[test]
    fn does_not_confuse_id_attribute_with_d() {
        let svg = r#"<path id="logo" d="M0 0 L1 0 L1 1 Z"/>"#;
        let paths = ParseSvgPaths::new(svg, 0.2).execute().unwrap();
        assert_eq!(paths.len(), 1);
    }
}
