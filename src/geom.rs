// polygon geometry helpers
//
// - a simple-polygon generator (vertices on a perturbed circle, so the
//   ring never crosses itself)
// - validation predicates used by tests and debug assertions

use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::TAU;

pub type Point = (i32, i32);

/// angular spacing variance used by `dna::random_polygon`
pub const DEFAULT_IRREGULARITY: f64 = 0.7;
/// radial variance used by `dna::random_polygon`
pub const DEFAULT_SPIKEYNESS: f64 = 0.5;

/// generate a simple polygon of `num_pts` vertices around `center`.
///
/// vertices are sampled on a circle of radius `avg_radius`:
/// - `irregularity` in [0, 1] maps to [0, 2π/n] of variance in the angular step
/// - `spikeyness` in [0, 1] maps to [0, avg_radius] of std deviation in the radius,
///   each radius clamped to [0, 2 * avg_radius]
///
/// angles increase monotonically for one full turn, so the ring is star-shaped
/// around `center` and never self-intersects (up to integer rounding).
pub fn generate_polygon<R: Rng>(
    center: Point,
    avg_radius: f64,
    irregularity: f64,
    spikeyness: f64,
    num_pts: usize,
    rng: &mut R,
) -> Vec<Point> {
    profiling::scope!("generate_polygon");
    if num_pts == 0 {
        return Vec::new();
    }

    let avg_radius = avg_radius.max(0.0);
    let base_step = TAU / num_pts as f64;
    let irregularity = irregularity.clamp(0.0, 1.0) * base_step;
    let spikeyness = spikeyness.clamp(0.0, 1.0) * avg_radius;

    // n angle steps, then normalize so they sum to a full turn
    let lower = base_step - irregularity;
    let upper = base_step + irregularity;
    let mut steps: Vec<f64> = (0..num_pts)
        .map(|_| lower + rng.random::<f64>() * (upper - lower))
        .collect();
    let k = steps.iter().sum::<f64>() / TAU;
    if k > 0.0 {
        for s in &mut steps {
            *s /= k;
        }
    }

    // std deviation is finite and non-negative here, construction can't fail
    let radial = Normal::new(avg_radius, spikeyness).ok();

    let mut angle = rng.random::<f64>() * TAU;
    let mut points = Vec::with_capacity(num_pts);
    for step in steps {
        let r = radial
            .as_ref()
            .map_or(avg_radius, |n| n.sample(rng))
            .clamp(0.0, 2.0 * avg_radius);
        let x = center.0 as f64 + r * angle.cos();
        let y = center.1 as f64 + r * angle.sin();
        points.push((x as i32, y as i32));
        angle += step;
    }
    points
}

/// midpoint of two vertices, rounded toward zero
#[inline]
pub fn midpoint(a: Point, b: Point) -> Point {
    ((a.0 + b.0) / 2, (a.1 + b.1) / 2)
}

/// signed area (shoelace). positive for CCW in a y-up frame, zero for degenerate.
pub fn signed_area(pts: &[Point]) -> f64 {
    if pts.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for i in 0..pts.len() {
        let j = (i + 1) % pts.len();
        area += pts[i].0 as f64 * pts[j].1 as f64;
        area -= pts[j].0 as f64 * pts[i].1 as f64;
    }
    area * 0.5
}

/// proper crossing of segments (a, b) and (c, d), touching doesn't count
fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    fn ccw(p: Point, q: Point, r: Point) -> i64 {
        (r.1 as i64 - p.1 as i64) * (q.0 as i64 - p.0 as i64)
            - (q.1 as i64 - p.1 as i64) * (r.0 as i64 - p.0 as i64)
    }

    let abc = ccw(a, b, c).signum();
    let abd = ccw(a, b, d).signum();
    let cda = ccw(c, d, a).signum();
    let cdb = ccw(c, d, b).signum();

    abc * abd < 0 && cda * cdb < 0
}

/// true when no two non-adjacent edges of the ring cross
pub fn is_simple(pts: &[Point]) -> bool {
    let n = pts.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let j = (i + 1) % n;
        for k in (i + 2)..n {
            let l = (k + 1) % n;
            // adjacent at wraparound
            if i == l {
                continue;
            }
            if segments_intersect(pts[i], pts[j], pts[k], pts[l]) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_signed_area_orientation() {
        let ccw = vec![(0, 0), (2, 0), (2, 2), (0, 2)];
        assert_eq!(signed_area(&ccw), 4.0);
        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert_eq!(signed_area(&cw), -4.0);
    }

    #[test]
    fn test_bow_tie_rejected() {
        let pts = vec![(0, 0), (10, 10), (10, 0), (0, 10)];
        assert!(!is_simple(&pts));
    }

    #[test]
    fn test_square_is_simple() {
        let pts = vec![(0, 0), (10, 0), (10, 10), (0, 10)];
        assert!(is_simple(&pts));
    }

    #[test]
    fn test_midpoint_truncates() {
        assert_eq!(midpoint((0, 0), (5, 3)), (2, 1));
        assert_eq!(midpoint((10, 10), (20, 30)), (15, 20));
    }

    #[test]
    fn test_generated_polygons_are_simple() {
        let mut rng = Pcg32::seed_from_u64(7);
        for n in 3..10 {
            for _ in 0..50 {
                let pts = generate_polygon((250, 250), 100.0, DEFAULT_IRREGULARITY, 0.0, n, &mut rng);
                assert_eq!(pts.len(), n);
                assert!(is_simple(&pts), "self-intersecting: {:?}", pts);
            }
        }
    }

    #[test]
    fn test_generated_radius_is_clamped() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..200 {
            let pts = generate_polygon((100, 100), 20.0, 0.7, 1.0, 6, &mut rng);
            for &(x, y) in &pts {
                let dx = (x - 100) as f64;
                let dy = (y - 100) as f64;
                // 2 * radius plus rounding slack
                assert!((dx * dx + dy * dy).sqrt() <= 41.5);
            }
        }
    }

    #[test]
    fn test_zero_points() {
        let mut rng = Pcg32::seed_from_u64(0);
        assert!(generate_polygon((0, 0), 10.0, 0.5, 0.5, 0, &mut rng).is_empty());
    }
}
