use crate::math::{polygon_2d::perpendicular_distance, Point2};

/// Simplifies a closed contour with Ramer-Douglas-Peucker, bounding vertex
/// count without deviating more than `tolerance` from the input.
///
/// The first point is always retained; the loop is treated as the open
/// polyline that starts and ends there.
#[must_use]
pub fn simplify_closed(points: &[Point2], tolerance: f64) -> Vec<Point2> {
    if points.len() < 3 || tolerance <= 0.0 {
        return points.to_vec();
    }

    // Close the ring explicitly so the wrap-around segment is simplified too.
    let mut ring = points.to_vec();
    ring.push(points[0]);

    let mut keep = vec![false; ring.len()];
    keep[0] = true;
    keep[ring.len() - 1] = true;
    rdp(&ring, 0, ring.len() - 1, tolerance, &mut keep);

    let mut result: Vec<Point2> = ring
        .iter()
        .zip(&keep)
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect();
    // Drop the duplicated closing point.
    result.pop();
    result
}

fn rdp(points: &[Point2], first: usize, last: usize, tolerance: f64, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }

    let a = &points[first];
    let b = &points[last];
    let mut max_dist = 0.0;
    let mut max_index = first;
    for i in first + 1..last {
        let d = perpendicular_distance(&points[i], a, b);
        if d > max_dist {
            max_dist = d;
            max_index = i;
        }
    }

    if max_dist > tolerance {
        keep[max_index] = true;
        rdp(points, first, max_index, tolerance, keep);
        rdp(points, max_index, last, tolerance, keep);
    }
}
