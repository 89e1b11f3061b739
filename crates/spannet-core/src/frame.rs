//! 3D frames: an origin plus an orthonormal orientation basis.
//!
//! A [`Frame`] is the spatial payload carried by nodes. It stores the origin
//! and the X and Y axes; the Z axis (the frame "normal") is derived as
//! `X × Y`. Construction always orthonormalises the axes, so every `Frame`
//! value is a proper right-handed basis. Absence of spatial information is
//! modelled with `Option<Frame>` rather than a sentinel value.

use glam::{DMat3, DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Below this length a vector is treated as degenerate.
pub const ZERO_TOLERANCE: f64 = 1e-12;

/// Origin plus orthonormal X/Y axes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FrameRepr", into = "FrameRepr")]
pub struct Frame {
    origin: DVec3,
    x_axis: DVec3,
    y_axis: DVec3,
}

/// Plain serialized shape of a frame.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct FrameRepr {
    origin: DVec3,
    x_axis: DVec3,
    y_axis: DVec3,
}

impl TryFrom<FrameRepr> for Frame {
    type Error = String;

    fn try_from(repr: FrameRepr) -> Result<Self, Self::Error> {
        Frame::new(repr.origin, repr.x_axis, repr.y_axis)
            .ok_or_else(|| "frame axes are degenerate or parallel".to_string())
    }
}

impl From<Frame> for FrameRepr {
    fn from(frame: Frame) -> Self {
        Self {
            origin: frame.origin,
            x_axis: frame.x_axis,
            y_axis: frame.y_axis,
        }
    }
}

impl Frame {
    /// Build a frame from an origin and two axis directions.
    ///
    /// The X axis is normalised and the Y axis is made perpendicular to it.
    /// Returns `None` if either axis is zero-length or the two are parallel.
    pub fn new(origin: DVec3, x_axis: DVec3, y_axis: DVec3) -> Option<Self> {
        let x = x_axis.try_normalize()?;
        let y = y_axis.reject_from_normalized(x);
        if y.length() < ZERO_TOLERANCE {
            return None;
        }
        let y = y.try_normalize()?;
        Some(Self {
            origin,
            x_axis: x,
            y_axis: y,
        })
    }

    /// Build a frame from an origin and a normal (Z axis) direction.
    ///
    /// The in-plane axes are an arbitrary but deterministic orthonormal pair.
    pub fn from_normal(origin: DVec3, normal: DVec3) -> Option<Self> {
        let z = normal.try_normalize()?;
        let (x, _) = z.any_orthonormal_pair();
        let y = z.cross(x);
        Some(Self {
            origin,
            x_axis: x,
            y_axis: y,
        })
    }

    /// The world XY frame at the origin.
    pub fn world_xy() -> Self {
        Self {
            origin: DVec3::ZERO,
            x_axis: DVec3::X,
            y_axis: DVec3::Y,
        }
    }

    /// World-aligned frame at the given point.
    pub fn at(origin: DVec3) -> Self {
        Self {
            origin,
            ..Self::world_xy()
        }
    }

    /// Build a frame from an origin and a rotation of the world basis.
    pub fn from_rotation(origin: DVec3, rotation: DQuat) -> Self {
        let rotation = rotation.normalize();
        Self {
            origin,
            x_axis: rotation * DVec3::X,
            y_axis: rotation * DVec3::Y,
        }
    }

    /// Frame origin.
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    /// Move the frame without changing its orientation.
    pub fn set_origin(&mut self, origin: DVec3) {
        self.origin = origin;
    }

    /// Unit X axis.
    pub fn x_axis(&self) -> DVec3 {
        self.x_axis
    }

    /// Unit Y axis.
    pub fn y_axis(&self) -> DVec3 {
        self.y_axis
    }

    /// Unit Z axis (frame normal), `X × Y`.
    pub fn z_axis(&self) -> DVec3 {
        self.x_axis.cross(self.y_axis)
    }

    /// Orientation as a rotation of the world basis.
    pub fn rotation(&self) -> DQuat {
        DQuat::from_mat3(&DMat3::from_cols(self.x_axis, self.y_axis, self.z_axis())).normalize()
    }

    /// Rotate the frame in place about its own origin.
    pub fn rotate(&mut self, rotation: DQuat) {
        self.x_axis = (rotation * self.x_axis).normalize();
        self.y_axis = (rotation * self.y_axis)
            .reject_from_normalized(self.x_axis)
            .normalize();
    }

    /// Rotate the frame about its own normal by `angle` radians.
    pub fn rotate_about_normal(&mut self, angle: f64) {
        self.rotate(DQuat::from_axis_angle(self.z_axis(), angle));
    }

    /// Rotate the frame so that its normal points along `normal`.
    ///
    /// Returns `false` (frame untouched) when `normal` is degenerate.
    pub fn orient_to_normal(&mut self, normal: DVec3) -> bool {
        let Some(target) = normal.try_normalize() else {
            return false;
        };
        let current = self.z_axis();
        if current.dot(target) <= -1.0 + 1e-12 {
            // Antiparallel: flip about the X axis.
            self.rotate(DQuat::from_axis_angle(self.x_axis, std::f64::consts::PI));
            return true;
        }
        self.rotate(DQuat::from_rotation_arc(current, target));
        true
    }

    /// Remove the normal component of `v`, leaving its in-plane part.
    pub fn project_to_plane(&self, v: DVec3) -> DVec3 {
        let z = self.z_axis();
        v - z * v.dot(z)
    }

    /// Express a world point in frame coordinates.
    pub fn to_local(&self, point: DVec3) -> DVec3 {
        let d = point - self.origin;
        DVec3::new(d.dot(self.x_axis), d.dot(self.y_axis), d.dot(self.z_axis()))
    }

    /// Interpolate between two frames.
    ///
    /// Origins are interpolated linearly, orientations spherically.
    pub fn interpolate(a: &Frame, b: &Frame, t: f64) -> Frame {
        let origin = a.origin.lerp(b.origin, t);
        let rotation = a.rotation().slerp(b.rotation(), t);
        Frame::from_rotation(origin, rotation)
    }

    /// Component-wise comparison within `eps`.
    pub fn abs_diff_eq(&self, other: &Frame, eps: f64) -> bool {
        self.origin.abs_diff_eq(other.origin, eps)
            && self.x_axis.abs_diff_eq(other.x_axis, eps)
            && self.y_axis.abs_diff_eq(other.y_axis, eps)
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::world_xy()
    }
}
