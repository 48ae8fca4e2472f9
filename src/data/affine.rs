//! 2D affine transforms in row-major 3x3 form.

use glam::{DMat3, DVec2};
use serde::{Deserialize, Serialize};

/// Row-major 3x3 matrix; a point maps to
/// `(row0 · [x, y, 1], row1 · [x, y, 1])`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 3]; 3]", into = "[[f64; 3]; 3]")]
pub struct AffineMatrix(DMat3);

impl AffineMatrix {
    /// Identity transform.
    pub const IDENTITY: Self = Self(DMat3::IDENTITY);

    /// Build from rows.
    #[must_use]
    pub fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self(DMat3::from_cols_array_2d(&rows).transpose())
    }

    /// Uniform scale followed by a translation.
    #[must_use]
    pub fn scale_translate(scale: f64, dx: f64, dy: f64) -> Self {
        Self::from_rows([[scale, 0.0, dx], [0.0, scale, dy], [0.0, 0.0, 1.0]])
    }

    /// Rows of the matrix.
    #[must_use]
    pub fn rows(&self) -> [[f64; 3]; 3] {
        self.0.transpose().to_cols_array_2d()
    }

    /// `self * other`: apply `other` first, then `self`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self(self.0 * other.0)
    }

    /// Apply `self` first, then `next`.
    #[must_use]
    pub fn then(&self, next: &Self) -> Self {
        next.compose(self)
    }

    /// Inverse, or `None` when the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.0.determinant();
        (det.is_finite() && det.abs() > f64::EPSILON).then(|| Self(self.0.inverse()))
    }

    /// Map a point.
    #[must_use]
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.0.transform_point2(DVec2::new(x, y));
        (p.x, p.y)
    }
}

impl Default for AffineMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<[[f64; 3]; 3]> for AffineMatrix {
    fn from(rows: [[f64; 3]; 3]) -> Self {
        Self::from_rows(rows)
    }
}

impl From<AffineMatrix> for [[f64; 3]; 3] {
    fn from(m: AffineMatrix) -> Self {
        m.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn rows_are_row_major() {
        let m = AffineMatrix::from_rows([[1.0, 0.0, 5.0], [0.0, 2.0, -1.0], [0.0, 0.0, 1.0]]);
        assert!(close(m.transform_point(1.0, 1.0), (6.0, 1.0)));
        assert_eq!(m.rows()[0], [1.0, 0.0, 5.0]);
    }

    #[test]
    fn sequential_application_equals_composition() {
        let a = AffineMatrix::scale_translate(2.0, 1.0, 0.0);
        let b = AffineMatrix::from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 3.0], [0.0, 0.0, 1.0]]);
        let (x, y) = a.transform_point(0.5, -2.0);
        let stepwise = b.transform_point(x, y);
        assert!(close(a.then(&b).transform_point(0.5, -2.0), stepwise));
        assert!(close(b.compose(&a).transform_point(0.5, -2.0), stepwise));
    }

    #[test]
    fn inverse_undoes_and_singular_has_none() {
        let a = AffineMatrix::scale_translate(4.0, -3.0, 7.0);
        let undone = a.compose(&a.inverse().unwrap());
        assert!(close(undone.transform_point(2.0, 9.0), (2.0, 9.0)));
        assert!(AffineMatrix::scale_translate(0.0, 1.0, 1.0).inverse().is_none());
    }

    #[test]
    fn serializes_as_nested_rows() {
        let m: AffineMatrix =
            serde_json::from_str("[[1,0,2],[0,1,3],[0,0,1]]").unwrap();
        assert!(close(m.transform_point(0.0, 0.0), (2.0, 3.0)));
        assert_eq!(
            serde_json::to_string(&AffineMatrix::IDENTITY).unwrap(),
            "[[1.0,0.0,0.0],[0.0,1.0,0.0],[0.0,0.0,1.0]]"
        );
    }
}
