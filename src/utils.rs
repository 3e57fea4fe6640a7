use std::f64;

use nalgebra::{Matrix3, Vector3};

pub type Vec3f = Vector3<f64>;
pub type Point = Vec3f;
pub type Color = Vec3f;
pub type Mat3f = Matrix3<f64>;

/// Offset used to push secondary rays off a surface and to reject self hits.
pub const SENSIBLE_EPS: f64 = 1e-7;

/// Largest coordinate magnitude treated as finite when growing bounds (2^24-1).
pub const SENSIBLE_INF: f64 = 16777215.0;

pub fn epsilon_point() -> Point {
    return Point::new(SENSIBLE_EPS, SENSIBLE_EPS, SENSIBLE_EPS);
}

/// Dominant direction of a vector, signed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MajorAxis {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl MajorAxis {
    pub fn of(direction: &Vec3f) -> MajorAxis {
        let abs = direction.abs();
        let axis = abs.imax();
        let negative = direction[axis] < 0.0;
        return match (axis, negative) {
            (0, false) => MajorAxis::PosX,
            (0, true) => MajorAxis::NegX,
            (1, false) => MajorAxis::PosY,
            (1, true) => MajorAxis::NegY,
            (_, false) => MajorAxis::PosZ,
            (_, true) => MajorAxis::NegZ,
        };
    }

    pub fn index(&self) -> usize {
        return match self {
            MajorAxis::PosX | MajorAxis::NegX => 0,
            MajorAxis::PosY | MajorAxis::NegY => 1,
            MajorAxis::PosZ | MajorAxis::NegZ => 2,
        };
    }
}

pub fn lerp(min: f64, max: f64, t: f64) -> f64 {
    return min + (max - min) * t;
}

/// Inverse of [`lerp`]. A degenerate range maps everything to zero.
pub fn inv_lerp(min: f64, max: f64, v: f64) -> f64 {
    if (max - min).abs() <= f64::EPSILON {
        return 0.0;
    }
    return (v - min) / (max - min);
}

/// Rotation by `x`, then `y`, then `z` radians about the respective axes.
pub fn rotation(x: f64, y: f64, z: f64) -> Mat3f {
    let (sx, cx) = x.sin_cos();
    let (sy, cy) = y.sin_cos();
    let (sz, cz) = z.sin_cos();

    let rx = Mat3f::new(1.0, 0.0, 0.0, 0.0, cx, -sx, 0.0, sx, cx);
    let ry = Mat3f::new(cy, 0.0, sy, 0.0, 1.0, 0.0, -sy, 0.0, cy);
    let rz = Mat3f::new(cz, -sz, 0.0, sz, cz, 0.0, 0.0, 0.0, 1.0);

    return rz * ry * rx;
}

/// Rotation taking the unit vector `from` onto the unit vector `to`.
///
/// Undefined for exactly opposite vectors; callers nudge those apart.
pub fn rotation_aligning(from: &Vec3f, to: &Vec3f) -> Mat3f {
    let v = from.cross(to);
    let c = from.dot(to);
    let ssm = Mat3f::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0);
    return Mat3f::identity() + ssm + ssm * ssm * (1.0 / (1.0 + c));
}

pub fn degrees_to_radians(v: Vec3f) -> Vec3f {
    return v * (f64::consts::PI / 180.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_axis_picks_signed_largest_component() {
        assert_eq!(MajorAxis::of(&Vec3f::new(0.1, -0.9, 0.2)), MajorAxis::NegY);
        assert_eq!(MajorAxis::of(&Vec3f::new(3.0, 1.0, -2.0)), MajorAxis::PosX);
        assert_eq!(MajorAxis::of(&Vec3f::new(0.0, 0.0, -1.0)).index(), 2);
    }

    #[test]
    fn lerp_and_inverse_agree() {
        let t = inv_lerp(2.0, 6.0, lerp(2.0, 6.0, 0.25));
        assert!((t - 0.25).abs() < 1e-12);
        assert_eq!(inv_lerp(1.0, 1.0, 5.0), 0.0);
    }

    #[test]
    fn rotation_aligning_maps_from_onto_to() {
        let from = Vec3f::new(1.0, 0.0, 0.0);
        let to = Vec3f::new(0.0, 0.0, 1.0);
        let rotated = rotation_aligning(&from, &to) * from;
        assert!((rotated - to).norm() < 1e-9);
    }

    #[test]
    fn quarter_turn_about_z() {
        let r = rotation(0.0, 0.0, f64::consts::FRAC_PI_2);
        let v = r * Vec3f::new(1.0, 0.0, 0.0);
        assert!((v - Vec3f::new(0.0, 1.0, 0.0)).norm() < 1e-9);
    }
}
