use crate::error::{LoaderError, Result};

/// Areas below this share of the squared bounding box diagonal count as zero.
const EPSILON: f64 = 1e-12;

/// Splits a planar polygon into triangles by ear clipping on the plane the
/// polygon is most aligned with. Returns index triples into `polygon` with the
/// winding of the input.
pub(crate) fn triangulate(polygon: &[[f32; 3]]) -> Result<Vec<[usize; 3]>> {
    let n = polygon.len();
    if n < 3 {
        return Err(LoaderError::Triangulation(format!(
            "face has {} vertices",
            n
        )));
    }
    if n == 3 {
        return Ok(vec![[0, 1, 2]]);
    }

    let tolerance = EPSILON * squared_extent(polygon);
    let normal = newell_normal(polygon);
    let (axis, length) = normal
        .iter()
        .enumerate()
        .map(|(axis, c)| (axis, c.abs()))
        .fold((0, 0.0), |best, curr| if curr.1 > best.1 { curr } else { best });
    if length <= tolerance {
        return Err(LoaderError::Triangulation(
            "polygon has no area".to_string(),
        ));
    }

    // project by dropping the dominant axis
    let (u, v) = match axis {
        0 => (1, 2),
        1 => (2, 0),
        _ => (0, 1),
    };
    let points: Vec<[f64; 2]> = polygon
        .iter()
        .map(|p| [p[u] as f64, p[v] as f64])
        .collect();
    let orientation = if normal[axis] > 0.0 { 1.0 } else { -1.0 };

    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let count = remaining.len();
        let ear = (0..count).find(|&i| {
            let (a, b, c) = corner(&remaining, i);
            is_ear(&points, &remaining, [a, b, c], orientation, tolerance)
        });

        match ear {
            Some(i) => {
                let (a, b, c) = corner(&remaining, i);
                triangles.push([a, b, c]);
                remaining.remove(i);
            }
            None => {
                // collinear vertices contribute no area and can be dropped
                let collinear = (0..count).find(|&i| {
                    let (a, b, c) = corner(&remaining, i);
                    cross(points[a], points[b], points[c]).abs() <= tolerance
                });
                match collinear {
                    Some(i) => {
                        remaining.remove(i);
                    }
                    None => {
                        return Err(LoaderError::Triangulation(format!(
                            "no ear found in polygon with {} vertices",
                            n
                        )))
                    }
                }
            }
        }
    }

    let (a, b, c) = (remaining[0], remaining[1], remaining[2]);
    if cross(points[a], points[b], points[c]).abs() > tolerance {
        triangles.push([a, b, c]);
    }

    if triangles.is_empty() {
        return Err(LoaderError::Triangulation(
            "polygon has no area".to_string(),
        ));
    }
    Ok(triangles)
}

fn corner(remaining: &[usize], i: usize) -> (usize, usize, usize) {
    let count = remaining.len();
    (
        remaining[(i + count - 1) % count],
        remaining[i],
        remaining[(i + 1) % count],
    )
}

fn is_ear(
    points: &[[f64; 2]],
    remaining: &[usize],
    [a, b, c]: [usize; 3],
    orientation: f64,
    tolerance: f64,
) -> bool {
    if cross(points[a], points[b], points[c]) * orientation <= tolerance {
        return false;
    }
    let triangle = [points[a], points[b], points[c]];
    remaining
        .iter()
        .filter(|&&p| p != a && p != b && p != c)
        .all(|&p| !inside_triangle(points[p], triangle, orientation, tolerance))
}

fn cross(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

// points on an edge count as inside
fn inside_triangle(p: [f64; 2], [a, b, c]: [[f64; 2]; 3], orientation: f64, tolerance: f64) -> bool {
    cross(a, b, p) * orientation >= -tolerance
        && cross(b, c, p) * orientation >= -tolerance
        && cross(c, a, p) * orientation >= -tolerance
}

fn squared_extent(polygon: &[[f32; 3]]) -> f64 {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for point in polygon {
        for axis in 0..3 {
            min[axis] = min[axis].min(point[axis] as f64);
            max[axis] = max[axis].max(point[axis] as f64);
        }
    }
    (0..3).map(|axis| (max[axis] - min[axis]).powi(2)).sum()
}

fn newell_normal(polygon: &[[f32; 3]]) -> [f64; 3] {
    let mut normal = [0.0f64; 3];
    for i in 0..polygon.len() {
        let curr = polygon[i];
        let next = polygon[(i + 1) % polygon.len()];
        let (cx, cy, cz) = (curr[0] as f64, curr[1] as f64, curr[2] as f64);
        let (nx, ny, nz) = (next[0] as f64, next[1] as f64, next[2] as f64);
        normal[0] += (cy - ny) * (cz + nz);
        normal[1] += (cz - nz) * (cx + nx);
        normal[2] += (cx - nx) * (cy + ny);
    }
    normal
}
