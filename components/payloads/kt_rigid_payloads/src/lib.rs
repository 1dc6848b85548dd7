//! Rigid body transform payload.
//!
//! A [`RigidTransform`] is a directed SE(3) transform from a `parent` frame to
//! a `child` frame. It keeps the six pose parameters and the homogeneous
//! matrix in sync: building from a pose derives the matrix, building from a
//! matrix back-derives the pose, and every operation producing a new
//! transform (composition, inversion) goes through the pose again.

use core::fmt::{self, Debug, Display};
use serde::{Deserialize, Serialize};
use std::ops::Mul;
use thiserror::Error;
use uom::si::angle::radian;
use uom::si::f64::{Angle, Length};
use uom::si::length::meter;

pub mod euler;

/// Row-major 4x4 homogeneous matrix, translation in the last column.
pub type HomogeneousMatrix = [[f64; 4]; 4];

pub const IDENTITY: HomogeneousMatrix = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Absolute per-element tolerance used by transform equality.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Below this `hypot(R00, R10)` the pitch is considered locked at +/- pi/2.
pub const SINGULARITY_EPSILON: f64 = 1e-9;

/// Raised when a matrix handed to a constructor is not 4x4.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Expected a 4x4 homogeneous matrix, got {rows}x{cols}")]
pub struct ShapeError {
    pub rows: usize,
    pub cols: usize,
}

/// Translation in meters and roll (`theta`), pitch (`phi`), yaw (`psi`) in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub theta: f64,
    pub phi: f64,
    pub psi: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, z: f64, theta: f64, phi: f64, psi: f64) -> Self {
        Self {
            x,
            y,
            z,
            theta,
            phi,
            psi,
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.theta, self.phi, self.psi]
    }
}

/// Whether an edge is traversed as given or as the synthesized inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Origin and unit axes of a frame, read straight off the homogeneous matrix.
/// This is everything a plotter needs to draw the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAxes {
    pub origin: [f64; 3],
    pub x_axis: [f64; 3],
    pub y_axis: [f64; 3],
    pub z_axis: [f64; 3],
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "RigidTransformRepr", into = "RigidTransformRepr")]
pub struct RigidTransform {
    pose: Pose,
    mat: HomogeneousMatrix,
    parent: Option<String>,
    child: Option<String>,
    name: Option<String>,
    direction: Direction,
}

/// Wire shape: the matrix is derived, so only the pose travels.
#[derive(Serialize, Deserialize)]
struct RigidTransformRepr {
    pose: Pose,
    parent: Option<String>,
    child: Option<String>,
    name: Option<String>,
    #[serde(default)]
    direction: Direction,
}

impl From<RigidTransformRepr> for RigidTransform {
    fn from(repr: RigidTransformRepr) -> Self {
        let mut transform = RigidTransform::from_pose(repr.pose);
        transform.parent = repr.parent;
        transform.child = repr.child;
        transform.name = repr.name;
        transform.direction = repr.direction;
        transform
    }
}

impl From<RigidTransform> for RigidTransformRepr {
    fn from(transform: RigidTransform) -> Self {
        Self {
            pose: transform.pose,
            parent: transform.parent,
            child: transform.child,
            name: transform.name,
            direction: transform.direction,
        }
    }
}

impl RigidTransform {
    pub fn new(x: f64, y: f64, z: f64, theta: f64, phi: f64, psi: f64) -> Self {
        Self::from_pose(Pose::new(x, y, z, theta, phi, psi))
    }

    pub fn identity() -> Self {
        Self::from_pose(Pose::default())
    }

    pub fn from_pose(pose: Pose) -> Self {
        Self {
            pose,
            mat: euler::matrix_from_pose(&pose),
            parent: None,
            child: None,
            name: None,
            direction: Direction::Forward,
        }
    }

    /// Create a transform from a 4x4 matrix. The pose is back-derived and the
    /// stored matrix is rebuilt from it, so the rotation block is always the
    /// one described by the pose.
    pub fn from_matrix(mat: HomogeneousMatrix) -> Self {
        Self::from_pose(euler::inverse_pose(&mat))
    }

    /// Create a transform from dynamically shaped rows.
    pub fn try_from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, ShapeError> {
        let rows_len = rows.len();
        let mut mat = [[0.0f64; 4]; 4];
        if rows_len != 4 {
            let cols = rows.first().map_or(0, |row| row.as_ref().len());
            return Err(ShapeError {
                rows: rows_len,
                cols,
            });
        }
        for (dst, src) in mat.iter_mut().zip(rows) {
            let src = src.as_ref();
            if src.len() != 4 {
                return Err(ShapeError {
                    rows: rows_len,
                    cols: src.len(),
                });
            }
            dst.copy_from_slice(src);
        }
        Ok(Self::from_matrix(mat))
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<String>) -> Self {
        self.child = Some(child.into());
        self
    }

    pub fn with_frames(self, parent: impl Into<String>, child: impl Into<String>) -> Self {
        self.with_parent(parent).with_child(child)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Replace the pose, recomputing the matrix in the same step.
    pub fn update_pose(&mut self, pose: Pose) {
        self.mat = euler::matrix_from_pose(&pose);
        self.pose = pose;
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn matrix(&self) -> HomogeneousMatrix {
        self.mat
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn child(&self) -> Option<&str> {
        self.child.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn translation(&self) -> [Length; 3] {
        [
            Length::new::<meter>(self.mat[0][3]),
            Length::new::<meter>(self.mat[1][3]),
            Length::new::<meter>(self.mat[2][3]),
        ]
    }

    /// Roll, pitch, yaw.
    pub fn angles(&self) -> [Angle; 3] {
        [
            Angle::new::<radian>(self.pose.theta),
            Angle::new::<radian>(self.pose.phi),
            Angle::new::<radian>(self.pose.psi),
        ]
    }

    pub fn origin(&self) -> [f64; 3] {
        self.column(3)
    }

    pub fn x_axis(&self) -> [f64; 3] {
        self.column(0)
    }

    pub fn y_axis(&self) -> [f64; 3] {
        self.column(1)
    }

    pub fn z_axis(&self) -> [f64; 3] {
        self.column(2)
    }

    pub fn axes(&self) -> FrameAxes {
        FrameAxes {
            origin: self.origin(),
            x_axis: self.x_axis(),
            y_axis: self.y_axis(),
            z_axis: self.z_axis(),
        }
    }

    fn column(&self, c: usize) -> [f64; 3] {
        [self.mat[0][c], self.mat[1][c], self.mat[2][c]]
    }

    /// Pitch locked at +/- pi/2: roll and yaw are not individually recoverable.
    pub fn is_singular(&self) -> bool {
        euler::is_singular(&self.mat)
    }

    /// `self * other`. The frames chain only when `self.child == other.parent`,
    /// in which case the result runs from `self.parent` to `other.child`;
    /// otherwise the result carries no frame tags.
    pub fn compose(&self, other: &RigidTransform) -> RigidTransform {
        let mut result = Self::from_matrix(euler::multiply(&self.mat, &other.mat));
        if let (Some(child), Some(parent)) = (&self.child, &other.parent) {
            if child == parent {
                result.parent = self.parent.clone();
                result.child = other.child.clone();
            }
        }
        result
    }

    /// Rigid inverse with parent and child swapped. The name is kept since
    /// this is the same edge seen from the other end.
    pub fn inverse(&self) -> RigidTransform {
        let mut result = Self::from_matrix(euler::invert(&self.mat));
        result.parent = self.child.clone();
        result.child = self.parent.clone();
        result.name = self.name.clone();
        result.direction = self.direction.flipped();
        result
    }

    pub fn matrix_approx_eq(&self, mat: &HomogeneousMatrix, epsilon: f64) -> bool {
        self.mat
            .iter()
            .flatten()
            .zip(mat.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    /// Geometry within `epsilon` and identical parent, child and name.
    pub fn approx_eq(&self, other: &RigidTransform, epsilon: f64) -> bool {
        self.parent == other.parent
            && self.child == other.child
            && self.name == other.name
            && self.matrix_approx_eq(&other.mat, epsilon)
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl PartialEq for RigidTransform {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other, DEFAULT_EPSILON)
    }
}

/// Comparing against a bare matrix only looks at the geometry.
impl PartialEq<HomogeneousMatrix> for RigidTransform {
    fn eq(&self, other: &HomogeneousMatrix) -> bool {
        self.matrix_approx_eq(other, DEFAULT_EPSILON)
    }
}

impl Debug for RigidTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.pose;
        write!(
            f,
            "RigidTransform({}, {}, {}, {}, {}, {}",
            p.x, p.y, p.z, p.theta, p.phi, p.psi
        )?;
        if let Some(parent) = &self.parent {
            write!(f, ", parent={parent:?}")?;
        }
        if let Some(child) = &self.child {
            write!(f, ", child={child:?}")?;
        }
        if let Some(name) = &self.name {
            write!(f, ", name={name:?}")?;
        }
        if self.direction == Direction::Backward {
            write!(f, ", backward")?;
        }
        write!(f, ")")
    }
}

impl Display for RigidTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.mat {
            writeln!(
                f,
                "[{:>10.6} {:>10.6} {:>10.6} {:>10.6}]",
                row[0], row[1], row[2], row[3]
            )?;
        }
        Ok(())
    }
}

impl Mul for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(&rhs)
    }
}

impl Mul for &RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl Mul<&RigidTransform> for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: &RigidTransform) -> Self::Output {
        self.compose(rhs)
    }
}

impl TryFrom<Vec<Vec<f64>>> for RigidTransform {
    type Error = ShapeError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::try_from_rows(&rows)
    }
}

#[cfg(feature = "nalgebra")]
mod nalgebra_integration {
    use super::RigidTransform;
    use nalgebra::{Isometry3, Matrix3, Matrix4, Rotation3, Translation3, Vector3};

    impl From<&RigidTransform> for Isometry3<f64> {
        fn from(transform: &RigidTransform) -> Self {
            let mat_array = transform.matrix();
            let flat_transform: [f64; 16] = std::array::from_fn(|i| mat_array[i / 4][i % 4]);
            let matrix = Matrix4::from_row_slice(&flat_transform);

            let rotation_matrix: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into();
            let rotation = Rotation3::from_matrix_unchecked(rotation_matrix);

            let translation_vector: Vector3<f64> = matrix.fixed_view::<3, 1>(0, 3).into();
            let translation = Translation3::from(translation_vector);

            Isometry3::from_parts(translation, rotation.into())
        }
    }

    impl From<Isometry3<f64>> for RigidTransform {
        fn from(iso: Isometry3<f64>) -> Self {
            let matrix = iso.to_homogeneous();
            let mat = std::array::from_fn(|r| std::array::from_fn(|c| matrix[(r, c)]));
            RigidTransform::from_matrix(mat)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn sample_poses() -> Vec<Pose> {
        vec![
            Pose::new(0.3, 0.5, 0.8, 0.0, 0.0, 0.0),
            Pose::new(66.0, 93.0, 0.567, 0.342, 0.0, 0.0),
            Pose::new(66.0, 93.0, 0.567, 0.15, -0.9, 0.3),
            Pose::new(0.32, 0.67, 0.123, 0.56, FRAC_PI_2, 23.4),
            Pose::new(-1.0, 2.0, -3.0, -2.0, -FRAC_PI_2, 1.0),
            Pose::new(0.0, 0.0, -0.2, PI, 0.0, 0.0),
        ]
    }

    #[test]
    fn test_compose_with_inverse_is_identity() {
        for pose in sample_poses() {
            let transform = RigidTransform::from_pose(pose);
            let round_trip = transform.compose(&transform.inverse());
            assert!(
                round_trip.matrix_approx_eq(&IDENTITY, 1e-9),
                "{pose:?} did not round-trip:\n{round_trip}"
            );
        }
    }

    #[test]
    fn test_pose_is_kept_verbatim() {
        let transform = RigidTransform::new(0.3, 0.5, 0.8, 0.0, 0.0, 0.0);
        assert_eq!(transform.pose().to_array(), [0.3, 0.5, 0.8, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_inverse_swaps_frames() {
        let transform = RigidTransform::new(1.0, 2.0, 3.0, 0.1, 0.2, 0.3)
            .with_frames("base", "arm")
            .with_name("base2arm");
        let inverse = transform.inverse();
        assert_eq!(inverse.parent(), Some("arm"));
        assert_eq!(inverse.child(), Some("base"));
        assert_eq!(inverse.name(), Some("base2arm"));
        assert_eq!(inverse.direction(), Direction::Backward);
        assert_eq!(inverse.inverse().direction(), Direction::Forward);
    }

    #[test]
    fn test_inverse_of_translation() {
        let inverse = RigidTransform::new(2.0, 3.0, 4.0, 0.0, 0.0, 0.0).inverse();
        let origin = inverse.origin();
        assert_abs_diff_eq!(origin[0], -2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(origin[1], -3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(origin[2], -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_compose_chains_frames() {
        let base = RigidTransform::identity().with_frames("base", "base");
        let one = RigidTransform::identity().with_frames("base", "one");
        let two = RigidTransform::identity().with_frames("one", "two");
        let three = RigidTransform::identity().with_frames("two", "three");
        let four = RigidTransform::identity().with_frames("two", "four");

        let new = &base * &one;
        assert_eq!(new.parent(), Some("base"));
        assert_eq!(new.child(), Some("one"));

        let new = base.compose(&one).compose(&two).compose(&three);
        assert_eq!(new.parent(), Some("base"));
        assert_eq!(new.child(), Some("three"));

        let new = two.compose(&two.inverse());
        assert_eq!(new.parent(), new.child());
        assert_eq!(new.parent(), Some("one"));

        let new = four * one;
        assert_eq!(new.parent(), None);
        assert_eq!(new.child(), None);
    }

    #[test]
    fn test_compose_matches_matrix_product() {
        let one = RigidTransform::new(0.5, 0.0, 0.0, 0.0, 0.0, 0.0);
        let two = RigidTransform::new(0.5, 0.0, 0.0, 0.0, 0.0, 0.0);
        let expected = euler::multiply(&one.matrix(), &two.matrix());
        assert_eq!(one * two, expected);
    }

    #[test]
    fn test_compose_rederives_pose() {
        let a = RigidTransform::new(1.0, 0.0, 0.0, 0.0, 0.0, FRAC_PI_2);
        let b = RigidTransform::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let pose = a.compose(&b).pose();
        assert_abs_diff_eq!(pose.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pose.y, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(pose.psi, FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_equality_is_name_sensitive() {
        let one = RigidTransform::new(0.5, 0.0, 0.0, 0.0, 0.0, 0.0);
        let two = RigidTransform::new(0.5, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert_eq!(one, two);

        let named = RigidTransform::new(0.5, 0.0, 0.0, 0.0, 0.0, 0.0).with_name("one");
        assert_ne!(named, two);
    }

    #[test]
    fn test_equality_checks_every_tag() {
        let build = || {
            RigidTransform::new(0.32, 0.67, 0.123, 0.56, FRAC_PI_2, 23.4)
                .with_frames("base", "nase")
                .with_name("base2nase")
        };
        let one = build();
        assert_eq!(one, build());
        assert_ne!(one, build().with_parent("flase"));
        assert_ne!(one, build().with_name("space"));
        assert_ne!(one, build().with_child("space"));
    }

    #[test]
    fn test_equality_against_matrix_ignores_tags() {
        let transform = RigidTransform::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
            .with_frames("a", "b")
            .with_name("ab");
        assert_eq!(transform, IDENTITY);
        assert_ne!(RigidTransform::new(1e-6, 0.0, 0.0, 0.0, 0.0, 0.0), IDENTITY);
    }

    #[test]
    fn test_from_matrix_back_derives_pose() {
        let source = RigidTransform::new(0.23, 1.5, 0.89, -1.5, 0.5, -0.4);
        let rebuilt = RigidTransform::from_matrix(source.matrix());
        for (got, want) in rebuilt.pose().to_array().iter().zip(source.pose().to_array()) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_singular_pose_rebuilds_same_matrix() {
        let source = RigidTransform::new(1.0, 2.0, 3.0, 0.4, FRAC_PI_2, -0.7);
        assert!(source.is_singular());
        let rebuilt = RigidTransform::from_matrix(source.matrix());
        assert_eq!(rebuilt, source.matrix());
        assert_abs_diff_eq!(rebuilt.pose().x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rebuilt.pose().phi, FRAC_PI_2, epsilon = 1e-9);
        assert!(!RigidTransform::new(0.0, 0.0, 0.0, FRAC_PI_2, 0.0, 0.0).is_singular());
    }

    #[test]
    fn test_try_from_rows_rejects_bad_shapes() {
        let err = RigidTransform::try_from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap_err();
        assert_eq!(err, ShapeError { rows: 2, cols: 3 });

        let ragged = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.0, 0.0, 1.0],
        ];
        let err = RigidTransform::try_from(ragged).unwrap_err();
        assert_eq!(err, ShapeError { rows: 4, cols: 3 });
        assert_eq!(
            err.to_string(),
            "Expected a 4x4 homogeneous matrix, got 4x3"
        );
    }

    #[test]
    fn test_try_from_rows_accepts_4x4() {
        let rows = vec![
            vec![1.0, 0.0, 0.0, 0.1],
            vec![0.0, 1.0, 0.0, 0.2],
            vec![0.0, 0.0, 1.0, 0.3],
            vec![0.0, 0.0, 0.0, 1.0],
        ];
        let transform = RigidTransform::try_from(rows).unwrap();
        assert_eq!(transform.origin(), [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_update_pose_recomputes_matrix() {
        let mut transform = RigidTransform::identity();
        transform.update_pose(Pose {
            x: 1.0,
            ..transform.pose()
        });
        assert_eq!(transform.pose().x, 1.0);
        assert_eq!(transform.origin(), [1.0, 0.0, 0.0]);

        transform.update_pose(Pose {
            phi: -1.0,
            ..transform.pose()
        });
        assert_eq!(transform.pose().phi, -1.0);
        assert_eq!(
            transform.matrix(),
            euler::matrix_from_pose(&Pose::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0))
        );
    }

    #[test]
    fn test_axes_are_matrix_columns() {
        let transform = RigidTransform::new(1.0, 2.0, 3.0, 0.0, 0.0, FRAC_PI_2);
        let axes = transform.axes();
        assert_eq!(axes.origin, [1.0, 2.0, 3.0]);
        assert_abs_diff_eq!(axes.x_axis[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(axes.y_axis[0], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(axes.z_axis[2], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_uom_accessors() {
        let transform = RigidTransform::new(1.5, 0.0, -2.0, 0.25, 0.0, 0.0);
        let [x, _, z] = transform.translation();
        assert_eq!(x.get::<meter>(), 1.5);
        assert_eq!(z.get::<meter>(), -2.0);
        assert_eq!(transform.angles()[0].get::<radian>(), 0.25);
    }

    #[test]
    fn test_serde_round_trip_recomputes_matrix() {
        let transform = RigidTransform::new(0.1, 0.5, -0.2, PI, 0.0, 0.0)
            .with_frames("base_link", "link3")
            .with_name("1To3");
        let text = ron::to_string(&transform).unwrap();
        let back: RigidTransform = ron::from_str(&text).unwrap();
        assert_eq!(back, transform);
        assert_eq!(back.matrix(), transform.matrix());
    }

    #[cfg(feature = "nalgebra")]
    #[test]
    fn test_nalgebra_conversion() {
        use nalgebra::Isometry3;

        let transform = RigidTransform::new(1.0, 2.0, 3.0, 0.1, 0.2, 0.3);
        let iso: Isometry3<f64> = (&transform).into();
        let back: RigidTransform = iso.into();
        assert_eq!(back, transform);
    }
}
