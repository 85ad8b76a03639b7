use crate::core::pbrt::Float;
use nalgebra::Vector3;

pub type Vector3f = Vector3<Float>;
pub type Vector3i = Vector3<i32>;
pub type Point3f = Vector3f;

#[inline]
pub fn vec3f_min(a: &Vector3f, b: &Vector3f) -> Vector3f {
    Vector3f::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z))
}

#[inline]
pub fn vec3f_max(a: &Vector3f, b: &Vector3f) -> Vector3f {
    Vector3f::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z))
}
