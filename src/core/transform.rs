use crate::core::pbrt::*;
use crate::core::geometry::vector::{Vector3f, Point3f};
use crate::core::geometry::bounds::Bounds3f;
use nalgebra::Matrix3;
use std::ops::{Index, IndexMut, Mul};
use log::error;

pub const MAX_TRANSFORMS: usize = 2;

/// Affine transform: a linear part `l` (columns are the images of the
/// x, y and z axes) plus a translation `p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub l: Matrix3<Float>,
    pub p: Vector3f
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            l: Matrix3::identity(),
            p: Vector3f::zeros()
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(vx: &Vector3f, vy: &Vector3f, vz: &Vector3f, p: &Vector3f) -> Self {
        Self {
            l: Matrix3::from_columns(&[*vx, *vy, *vz]),
            p: *p
        }
    }

    /// Builds the affine part of a column-major 4x4 matrix as written in
    /// scene files: `m[0..3]` is the x axis, `m[12..15]` the translation.
    /// The homogeneous row is not stored.
    pub fn from_col_slice(m: &[Float; 16]) -> Self {
        Self::from_columns(
            &Vector3f::new(m[0], m[1], m[2]),
            &Vector3f::new(m[4], m[5], m[6]),
            &Vector3f::new(m[8], m[9], m[10]),
            &Vector3f::new(m[12], m[13], m[14]))
    }

    pub fn translate(delta: &Vector3f) -> Self {
        Self {
            l: Matrix3::identity(),
            p: *delta
        }
    }

    pub fn scale(x: Float, y: Float, z: Float) -> Self {
        Self {
            l: Matrix3::new(
                x,   0.0, 0.0,
                0.0, y,   0.0,
                0.0, 0.0, z),
            p: Vector3f::zeros()
        }
    }

    /// Rotation by `theta` degrees around `axis`.
    pub fn rotate(theta: Float, axis: &Vector3f) -> Self {
        if axis.norm() == 0.0 {
            error!("Rotate: zero-length rotation axis. Using the identity transformation.");
            return Self::default();
        }

        let a = axis.normalize();
        let sin_theta = radians(theta).sin();
        let cos_theta = radians(theta).cos();
        let mut l: Matrix3<Float> = Matrix3::identity();

        l[(0, 0)] = a.x * a.x + (1.0 - a.x * a.x) * cos_theta;
        l[(0, 1)] = a.x * a.y * (1.0 - cos_theta) - a.z * sin_theta;
        l[(0, 2)] = a.x * a.z * (1.0 - cos_theta) + a.y * sin_theta;

        l[(1, 0)] = a.x * a.y * (1.0 - cos_theta) + a.z * sin_theta;
        l[(1, 1)] = a.y * a.y + (1.0 - a.y * a.y) * cos_theta;
        l[(1, 2)] = a.y * a.z * (1.0 - cos_theta) - a.x * sin_theta;

        l[(2, 0)] = a.x * a.z * (1.0 - cos_theta) - a.y * sin_theta;
        l[(2, 1)] = a.y * a.z * (1.0 - cos_theta) + a.x * sin_theta;
        l[(2, 2)] = a.z * a.z + (1.0 - a.z * a.z) * cos_theta;

        Self { l, p: Vector3f::zeros() }
    }

    /// The camera frame of a `LookAt` statement: z looks from `pos` towards
    /// `look`, x is `z cross up`, and the origin sits at `pos`. The CTM is
    /// multiplied by the inverse of this frame.
    pub fn look_at(pos: &Point3f, look: &Point3f, up: &Vector3f) -> Self {
        let dir = (look - pos).normalize();
        let right = dir.cross(up);

        if right.norm() == 0.0 {
            error!(
                "\"up\" vector ({}, {}, {}) and viewing direction ({}, {}, {}) \
                passed to LookAt are pointing in the same direction. Using \
                the identity transformation.",
                up.x, up.y, up.z, dir.x, dir.y, dir.z);
            return Default::default();
        }

        let right = right.normalize();
        let new_up = right.cross(&dir);

        Self::from_columns(&right, &new_up, &dir, pos)
    }

    pub fn inverse(&self) -> Option<Self> {
        let il = self.l.try_inverse()?;

        Some(Self { l: il, p: -(il * self.p) })
    }

    pub fn vx(&self) -> Vector3f { self.l.column(0).into_owned() }
    pub fn vy(&self) -> Vector3f { self.l.column(1).into_owned() }
    pub fn vz(&self) -> Vector3f { self.l.column(2).into_owned() }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn transform_point(&self, p: &Point3f) -> Point3f {
        self.l * p + self.p
    }

    pub fn transform_vector(&self, v: &Vector3f) -> Vector3f {
        self.l * v
    }

    pub fn transform_bounds(&self, b: &Bounds3f) -> Bounds3f {
        if b.is_empty() {
            return *b;
        }

        (0..8).fold(Bounds3f::default(), |acc, c| {
            acc.union_point(&self.transform_point(&b.corner(c)))
        })
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, t: Transform) -> Self::Output {
        Transform {
            l: self.l * t.l,
            p: self.l * t.p + self.p
        }
    }
}

impl<'a> Mul<&'a Transform> for &'a Transform {
    type Output = Transform;

    fn mul(self, t: &'a Transform) -> Self::Output {
        *self * *t
    }
}

/// The pair of transforms in effect at shutter open and shutter close.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct TransformSet {
    pub t: [Transform; MAX_TRANSFORMS]
}

impl TransformSet {
    pub fn new(start: Transform, end: Transform) -> Self {
        Self { t: [start, end] }
    }

    pub fn from_transform(t: Transform) -> Self {
        Self { t: [t; MAX_TRANSFORMS] }
    }

    pub fn start(&self) -> &Transform {
        &self.t[0]
    }

    pub fn end(&self) -> &Transform {
        &self.t[MAX_TRANSFORMS - 1]
    }

    pub fn is_animated(&self) -> bool {
        for i in 0..MAX_TRANSFORMS - 1 {
            if self.t[i] != self.t[i + 1] { return true; }
        }

        false
    }

    pub fn inverse(&self) -> Option<Self> {
        Some(Self::new(self.t[0].inverse()?, self.t[1].inverse()?))
    }
}

impl Index<usize> for TransformSet {
    type Output = Transform;

    fn index(&self, i: usize) -> &Self::Output {
        assert!(i < MAX_TRANSFORMS);

        &self.t[i]
    }
}

impl IndexMut<usize> for TransformSet {
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        assert!(i < MAX_TRANSFORMS);

        &mut self.t[i]
    }
}

impl Mul<Transform> for TransformSet {
    type Output = TransformSet;

    fn mul(self, t: Transform) -> Self::Output {
        TransformSet::new(self.t[0] * t, self.t[1] * t)
    }
}

impl Mul for TransformSet {
    type Output = TransformSet;

    fn mul(self, ts: TransformSet) -> Self::Output {
        TransformSet::new(self.t[0] * ts.t[0], self.t[1] * ts.t[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_vec_eq(a: &Vector3f, b: &Vector3f) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-5);
    }

    #[test]
    fn rotate_z_quarter_turn() {
        let r = Transform::rotate(90.0, &Vector3f::new(0.0, 0.0, 2.0));

        assert_vec_eq(&r.vx(), &Vector3f::new(0.0, 1.0, 0.0));
        assert_vec_eq(&r.vy(), &Vector3f::new(-1.0, 0.0, 0.0));
        assert_vec_eq(&r.vz(), &Vector3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn composition_applies_last_operation_first() {
        let t = Transform::translate(&Vector3f::new(1.0, 2.0, 3.0))
            * Transform::rotate(90.0, &Vector3f::new(0.0, 0.0, 1.0))
            * Transform::scale(2.0, 2.0, 2.0);

        // scale (1,0,0) -> (2,0,0), rotate -> (0,2,0), translate -> (1,4,3)
        let p = t.transform_point(&Vector3f::new(1.0, 0.0, 0.0));
        assert_vec_eq(&p, &Vector3f::new(1.0, 4.0, 3.0));
        assert_vec_eq(&t.p, &Vector3f::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn inverse_round_trips() {
        let t = Transform::translate(&Vector3f::new(4.0, -1.0, 0.5))
            * Transform::rotate(30.0, &Vector3f::new(1.0, 1.0, 0.0))
            * Transform::scale(1.0, 3.0, 0.5);
        let inv = t.inverse().unwrap();
        let p = Vector3f::new(0.3, 0.7, -2.0);

        assert_vec_eq(&inv.transform_point(&t.transform_point(&p)), &p);
        assert!(Transform::scale(0.0, 1.0, 1.0).inverse().is_none());
    }

    #[test]
    fn look_at_frame() {
        let frame = Transform::look_at(
            &Vector3f::new(0.0, 0.0, -5.0),
            &Vector3f::new(0.0, 0.0, 0.0),
            &Vector3f::new(0.0, 1.0, 0.0));

        assert_vec_eq(&frame.vz(), &Vector3f::new(0.0, 0.0, 1.0));
        assert_vec_eq(&frame.vx(), &Vector3f::new(-1.0, 0.0, 0.0));
        assert_vec_eq(&frame.vy(), &Vector3f::new(0.0, 1.0, 0.0));
        assert_vec_eq(&frame.p, &Vector3f::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn column_major_slice() {
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            5.0, 6.0, 7.0, 1.0];
        let t = Transform::from_col_slice(&m);

        assert_vec_eq(&t.p, &Vector3f::new(5.0, 6.0, 7.0));
        assert!(Transform::translate(&Vector3f::new(5.0, 6.0, 7.0)) == t);
    }

    #[test]
    fn bounds_of_rotated_box() {
        let b = Bounds3f::from_points(&Vector3f::new(0.0, 0.0, 0.0), &Vector3f::new(1.0, 2.0, 3.0));
        let r = Transform::rotate(90.0, &Vector3f::new(0.0, 0.0, 1.0));
        let rb = r.transform_bounds(&b);

        assert_vec_eq(&rb.p_min, &Vector3f::new(-2.0, 0.0, 0.0));
        assert_vec_eq(&rb.p_max, &Vector3f::new(0.0, 1.0, 3.0));
    }
}
