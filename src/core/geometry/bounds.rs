use super::vector::{Point3f, Vector3f, vec3f_min, vec3f_max};
use crate::core::pbrt::Float;
use std::fmt;

/// Axis-aligned box. The default value is the empty box, which is the
/// identity for `union_*`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3f {
    pub p_min: Point3f,
    pub p_max: Point3f
}

impl Default for Bounds3f {
    fn default() -> Self {
        Self {
            p_min: Point3f::new(Float::MAX, Float::MAX, Float::MAX),
            p_max: Point3f::new(Float::MIN, Float::MIN, Float::MIN)
        }
    }
}

impl Bounds3f {
    pub fn from_point(p: &Point3f) -> Self {
        Self { p_min: *p, p_max: *p }
    }

    pub fn from_points(p1: &Point3f, p2: &Point3f) -> Self {
        Self {
            p_min: vec3f_min(p1, p2),
            p_max: vec3f_max(p1, p2)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.p_max.x < self.p_min.x ||
        self.p_max.y < self.p_min.y ||
        self.p_max.z < self.p_min.z
    }

    pub fn corner(&self, c: usize) -> Point3f {
        assert!(c < 8);

        Point3f::new(
            if c & 1 == 0 { self.p_min.x } else { self.p_max.x },
            if c & 2 == 0 { self.p_min.y } else { self.p_max.y },
            if c & 4 == 0 { self.p_min.z } else { self.p_max.z })
    }

    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }

    pub fn union_point(&self, p: &Point3f) -> Self {
        Self {
            p_min: vec3f_min(&self.p_min, p),
            p_max: vec3f_max(&self.p_max, p)
        }
    }

    pub fn union_bounds(&self, b: &Self) -> Self {
        Self {
            p_min: vec3f_min(&self.p_min, &b.p_min),
            p_max: vec3f_max(&self.p_max, &b.p_max)
        }
    }

    pub fn inside(&self, p: &Point3f) -> bool {
        p.x >= self.p_min.x && p.x <= self.p_max.x &&
        p.y >= self.p_min.y && p.y <= self.p_max.y &&
        p.z >= self.p_min.z && p.z <= self.p_max.z
    }
}

impl fmt::Display for Bounds3f {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "[ empty ]");
        }

        write!(
            f, "[ ({}, {}, {}) - ({}, {}, {}) ]",
            self.p_min.x, self.p_min.y, self.p_min.z,
            self.p_max.x, self.p_max.y, self.p_max.z)
    }
}
