//! 2D affine matrix with a fixed perspective row.
//!
//! # Conventions
//!
//! - Screen coordinates: x grows right, y grows down
//! - Positive angles rotate clockwise on screen
//! - Values are exposed row-major as
//!   `[scale_x, skew_x, trans_x, skew_y, scale_y, trans_y, 0, 0, 1]`
//! - `post_*` operations apply after the current transform (`M' = op * M`)
//!
//! A point maps as:
//! ```text
//! x' = scale_x * x + skew_x * y + trans_x
//! y' = skew_y  * x + scale_y * y + trans_y
//! ```

use serde::{Deserialize, Serialize};

use super::Point;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub scale_x: f64,
    pub skew_x: f64,
    pub trans_x: f64,
    pub skew_y: f64,
    pub scale_y: f64,
    pub trans_y: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    /// Matrix that leaves every point in place.
    pub const fn identity() -> Self {
        Self {
            scale_x: 1.0,
            skew_x: 0.0,
            trans_x: 0.0,
            skew_y: 0.0,
            scale_y: 1.0,
            trans_y: 0.0,
        }
    }

    /// Pure translation by `(dx, dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self {
            trans_x: dx,
            trans_y: dy,
            ..Self::identity()
        }
    }

    /// Uniform scale about a pivot point.
    pub fn scaling(factor: f64, pivot: Point) -> Self {
        Self {
            scale_x: factor,
            trans_x: pivot.x - factor * pivot.x,
            scale_y: factor,
            trans_y: pivot.y - factor * pivot.y,
            ..Self::identity()
        }
    }

    /// Rotation by `degrees` (clockwise on screen) about a pivot point.
    pub fn rotation(degrees: f64, pivot: Point) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            scale_x: cos,
            skew_x: -sin,
            trans_x: pivot.x - cos * pivot.x + sin * pivot.y,
            skew_y: sin,
            scale_y: cos,
            trans_y: pivot.y - sin * pivot.x - cos * pivot.y,
        }
    }

    /// Rebuild a matrix from its nine row-major values.
    ///
    /// The perspective row is ignored; it is always `[0, 0, 1]` here.
    pub fn from_values(values: &[f64; 9]) -> Self {
        Self {
            scale_x: values[0],
            skew_x: values[1],
            trans_x: values[2],
            skew_y: values[3],
            scale_y: values[4],
            trans_y: values[5],
        }
    }

    /// Row-major 3x3 values: `[scale_x, skew_x, trans_x, skew_y, scale_y, trans_y, 0, 0, 1]`.
    pub fn values(&self) -> [f64; 9] {
        [
            self.scale_x,
            self.skew_x,
            self.trans_x,
            self.skew_y,
            self.scale_y,
            self.trans_y,
            0.0,
            0.0,
            1.0,
        ]
    }

    /// `self` followed by `other`, i.e. `other * self`.
    pub fn then(&self, other: &Affine) -> Affine {
        Affine {
            scale_x: other.scale_x * self.scale_x + other.skew_x * self.skew_y,
            skew_x: other.scale_x * self.skew_x + other.skew_x * self.scale_y,
            trans_x: other.scale_x * self.trans_x + other.skew_x * self.trans_y + other.trans_x,
            skew_y: other.skew_y * self.scale_x + other.scale_y * self.skew_y,
            scale_y: other.skew_y * self.skew_x + other.scale_y * self.scale_y,
            trans_y: other.skew_y * self.trans_x + other.scale_y * self.trans_y + other.trans_y,
        }
    }

    /// Translate after the current transform.
    pub fn post_translate(&mut self, dx: f64, dy: f64) {
        *self = self.then(&Affine::translation(dx, dy));
    }

    /// Scale uniformly about `pivot` after the current transform.
    pub fn post_scale(&mut self, factor: f64, pivot: Point) {
        *self = self.then(&Affine::scaling(factor, pivot));
    }

    /// Rotate clockwise by `degrees` about `pivot` after the current transform.
    pub fn post_rotate(&mut self, degrees: f64, pivot: Point) {
        *self = self.then(&Affine::rotation(degrees, pivot));
    }

    /// Apply the full transform, translation included, to a point.
    pub fn map_point(&self, point: Point) -> Point {
        Point::new(
            self.scale_x * point.x + self.skew_x * point.y + self.trans_x,
            self.skew_y * point.x + self.scale_y * point.y + self.trans_y,
        )
    }

    /// Map a vector (no translation).
    pub fn map_vector(&self, dx: f64, dy: f64) -> Point {
        Point::new(
            self.scale_x * dx + self.skew_x * dy,
            self.skew_y * dx + self.scale_y * dy,
        )
    }

    /// Uniform scale encoded in the matrix.
    pub fn scale(&self) -> f64 {
        (self.scale_x * self.scale_x + self.skew_y * self.skew_y).sqrt()
    }

    /// Rotation encoded in the matrix, in degrees within `(-180, 180]`.
    pub fn angle(&self) -> f64 {
        -self.skew_x.atan2(self.scale_x).to_degrees()
    }

    /// Determinant of the linear part; zero means the matrix is not invertible.
    pub fn determinant(&self) -> f64 {
        self.scale_x * self.scale_y - self.skew_x * self.skew_y
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Affine> {
        let det = self.determinant();
        if det.abs() < 1e-12 || !det.is_finite() {
            return None;
        }
        let scale_x = self.scale_y / det;
        let skew_x = -self.skew_x / det;
        let skew_y = -self.skew_y / det;
        let scale_y = self.scale_x / det;
        Some(Affine {
            scale_x,
            skew_x,
            trans_x: -(scale_x * self.trans_x + skew_x * self.trans_y),
            skew_y,
            scale_y,
            trans_y: -(skew_y * self.trans_x + scale_y * self.trans_y),
        })
    }
}

/// Normalize an angle in degrees to `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point_eq(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_identity_maps_points_unchanged() {
        let m = Affine::identity();
        assert_point_eq(m.map_point(Point::new(3.0, 4.0)), Point::new(3.0, 4.0));
        assert_eq!(m.values(), [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rotation_is_clockwise_on_screen() {
        // +x axis rotated 90 degrees clockwise (y down) points to +y
        let m = Affine::rotation(90.0, Point::new(0.0, 0.0));
        assert_point_eq(m.map_point(Point::new(1.0, 0.0)), Point::new(0.0, 1.0));
    }

    #[test]
    fn test_rotation_about_pivot_keeps_pivot() {
        let pivot = Point::new(50.0, 30.0);
        let m = Affine::rotation(37.0, pivot);
        assert_point_eq(m.map_point(pivot), pivot);
    }

    #[test]
    fn test_scale_and_angle_decomposition() {
        let mut m = Affine::identity();
        m.post_scale(2.5, Point::new(10.0, 10.0));
        m.post_rotate(30.0, Point::new(0.0, 0.0));
        m.post_translate(7.0, -3.0);

        assert!((m.scale() - 2.5).abs() < 1e-9);
        assert!((m.angle() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_angle_decomposition() {
        let mut m = Affine::identity();
        m.post_rotate(-45.0, Point::new(5.0, 5.0));
        assert!((m.angle() + 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_post_operations_compose_in_order() {
        let mut m = Affine::identity();
        m.post_translate(10.0, 0.0);
        m.post_scale(2.0, Point::new(0.0, 0.0));
        // translate first, then scale: (1 + 10) * 2
        assert_point_eq(m.map_point(Point::new(1.0, 0.0)), Point::new(22.0, 0.0));
    }

    #[test]
    fn test_invert_round_trips_points() {
        let mut m = Affine::identity();
        m.post_scale(3.0, Point::new(1.0, 2.0));
        m.post_rotate(70.0, Point::new(-4.0, 9.0));
        m.post_translate(12.0, 5.0);

        let inv = m.invert().unwrap();
        let p = Point::new(17.0, -23.0);
        assert_point_eq(inv.map_point(m.map_point(p)), p);
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        let m = Affine::scaling(0.0, Point::new(0.0, 0.0));
        assert!(m.invert().is_none());
    }

    #[test]
    fn test_from_values_round_trip() {
        let mut m = Affine::identity();
        m.post_rotate(12.0, Point::new(3.0, 4.0));
        assert_eq!(Affine::from_values(&m.values()), m);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(450.0), 90.0);
    }
}
