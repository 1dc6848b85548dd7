//! Roll/pitch/yaw <-> homogeneous matrix conversions.
//!
//! Rotations follow the Z-Y-X convention: `R = Rz(psi) * Ry(phi) * Rx(theta)`,
//! with theta the roll, phi the pitch and psi the yaw, all in radians.
//! Matrices are row-major, translation in the last column.

use crate::{HomogeneousMatrix, Pose, IDENTITY, SINGULARITY_EPSILON};

/// Builds `Translate(x, y, z) * Rz(psi) * Ry(phi) * Rx(theta)`.
pub fn matrix_from_pose(pose: &Pose) -> HomogeneousMatrix {
    let (st, ct) = pose.theta.sin_cos();
    let (sp, cp) = pose.phi.sin_cos();
    let (sy, cy) = pose.psi.sin_cos();

    [
        [cy * cp, cy * sp * st - sy * ct, cy * sp * ct + sy * st, pose.x],
        [sy * cp, sy * sp * st + cy * ct, sy * sp * ct - cy * st, pose.y],
        [-sp, cp * st, cp * ct, pose.z],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// True when the pitch sits at +/- pi/2 and yaw and roll are no longer separable.
pub fn is_singular(mat: &HomogeneousMatrix) -> bool {
    mat[0][0].hypot(mat[1][0]) < SINGULARITY_EPSILON
}

/// Recovers the six pose parameters from a homogeneous matrix.
///
/// Away from gimbal lock the triple is unique with pitch in `[-pi/2, pi/2]`.
/// At gimbal lock only `roll - yaw` (or `roll + yaw`) is observable; yaw is
/// pinned to zero and roll carries the whole rotation about the locked axis,
/// so the returned triple still rebuilds the same matrix.
pub fn inverse_pose(mat: &HomogeneousMatrix) -> Pose {
    let (x, y, z) = (mat[0][3], mat[1][3], mat[2][3]);
    let (r00, r10, r20) = (mat[0][0], mat[1][0], mat[2][0]);
    let (r01, r11, r21) = (mat[0][1], mat[1][1], mat[2][1]);

    let psi = if is_singular(mat) {
        log::trace!("pitch singularity in pose extraction, pinning yaw to 0");
        0.0
    } else {
        r10.atan2(r00)
    };
    let (sy, cy) = psi.sin_cos();

    let phi = (-r20).atan2(r00 * cy + r10 * sy);
    let (sp, cp) = phi.sin_cos();

    let theta = (sp * (r01 * cy + r11 * sy) + r21 * cp).atan2(-r01 * sy + r11 * cy);

    Pose {
        x,
        y,
        z,
        theta,
        phi,
        psi,
    }
}

/// Rigid inverse: rotation transposed, translation `-R^T t`.
pub fn invert(mat: &HomogeneousMatrix) -> HomogeneousMatrix {
    let mut inv = IDENTITY;
    for (i, row) in inv.iter_mut().take(3).enumerate() {
        for (j, cell) in row.iter_mut().take(3).enumerate() {
            *cell = mat[j][i];
        }
        // row i of R^T is column i of R
        row[3] = -(0..3).map(|k| mat[k][i] * mat[k][3]).sum::<f64>();
    }
    inv
}

pub fn multiply(lhs: &HomogeneousMatrix, rhs: &HomogeneousMatrix) -> HomogeneousMatrix {
    let mut result = [[0.0f64; 4]; 4];
    for (i, row) in result.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..4).map(|k| lhs[i][k] * rhs[k][j]).sum();
        }
    }
    result
}
