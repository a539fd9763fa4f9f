// Angle and geometry helpers. Headings are degrees, 0 pointing east,
// counter-clockwise positive.

use super::state::Point;

/// Normalizes an absolute heading into [0, 360).
pub fn normalize_absolute(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    if r >= 360.0 { 0.0 } else { r }
}

/// Normalizes a relative angle into (-180, 180].
pub fn normalize_relative(degrees: f64) -> f64 {
    let r = normalize_absolute(degrees);
    if r > 180.0 { r - 360.0 } else { r }
}

/// Unit direction vector for a heading.
pub fn direction(heading: f64) -> (f64, f64) {
    let radians = heading.to_radians();
    (radians.cos(), radians.sin())
}

/// Absolute heading from one point toward another, in [0, 360).
pub fn bearing(from: Point, to: Point) -> f64 {
    normalize_absolute((to.y - from.y).atan2(to.x - from.x).to_degrees())
}

/// True when `angle` lies inside the arc swept from `start` by the signed
/// `delta` degrees, endpoints inclusive. Handles the 0/360 wraparound.
pub fn angle_in_sweep(angle: f64, start: f64, delta: f64) -> bool {
    let (from, span) = if delta < 0.0 {
        (start + delta, -delta)
    } else {
        (start, delta)
    };
    if span >= 360.0 {
        return true;
    }
    normalize_absolute(angle - from) <= span
}

/// Shortest distance from point `p` to the segment `a`-`b`.
pub fn segment_point_distance(a: Point, b: Point, p: Point) -> f64 {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return a.distance(p);
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * abx, a.y + t * aby))
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// True when segments `a1`-`a2` and `b1`-`b2` intersect, touching included.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_angles_wrap_into_range() {
        assert_eq!(normalize_absolute(0.0), 0.0);
        assert_eq!(normalize_absolute(360.0), 0.0);
        assert_eq!(normalize_absolute(-90.0), 270.0);
        assert_eq!(normalize_absolute(725.0), 5.0);
    }

    #[test]
    fn relative_angles_prefer_the_short_way() {
        assert_eq!(normalize_relative(270.0), -90.0);
        assert_eq!(normalize_relative(180.0), 180.0);
        assert_eq!(normalize_relative(-180.0), 180.0);
        assert_eq!(normalize_relative(10.0), 10.0);
    }

    #[test]
    fn bearing_is_measured_counter_clockwise_from_east() {
        let origin = Point::new(0.0, 0.0);
        assert_eq!(bearing(origin, Point::new(5.0, 0.0)), 0.0);
        assert_eq!(bearing(origin, Point::new(0.0, 5.0)), 90.0);
        assert_eq!(bearing(origin, Point::new(-5.0, 0.0)), 180.0);
    }

    #[test]
    fn sweeps_cover_the_wraparound() {
        assert!(angle_in_sweep(0.0, 350.0, 20.0));
        assert!(angle_in_sweep(350.0, 350.0, 20.0));
        assert!(angle_in_sweep(10.0, 350.0, 20.0));
        assert!(!angle_in_sweep(11.0, 350.0, 20.0));
        // Negative deltas sweep backwards from the start.
        assert!(angle_in_sweep(355.0, 10.0, -20.0));
        assert!(!angle_in_sweep(15.0, 10.0, -20.0));
        // A zero-degree sweep only matches its own heading.
        assert!(angle_in_sweep(90.0, 90.0, 0.0));
        assert!(!angle_in_sweep(91.0, 90.0, 0.0));
    }

    #[test]
    fn point_distance_clamps_to_segment_ends() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(segment_point_distance(a, b, Point::new(5.0, 3.0)), 3.0);
        assert_eq!(segment_point_distance(a, b, Point::new(14.0, 3.0)), 5.0);
        assert_eq!(segment_point_distance(a, a, Point::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn crossing_and_disjoint_segments() {
        let cross = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        );
        assert!(cross);

        let parallel = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(10.0, 1.0),
        );
        assert!(!parallel);

        // Touching at an endpoint counts.
        let touching = segments_intersect(
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(5.0, 5.0),
            Point::new(10.0, 0.0),
        );
        assert!(touching);
    }
}
