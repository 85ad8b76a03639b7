use crate::core::pbrt::{Float, clamp};
use crate::core::transform::Transform;
use crate::core::shape::IShape;
use crate::core::geometry::bounds::Bounds3f;
use crate::core::geometry::vector::Point3f;
use crate::core::paramset::ParamSet;
use crate::core::error::Result;

#[derive(Debug, Clone)]
pub struct Sphere {
    pub radius              : Float,
    pub zmin                : Float,
    pub zmax                : Float,
    pub phi_max             : Float,
    pub object_to_world     : Transform,
    pub reverse_orientation : bool
}

impl Sphere {
    pub fn new(
        object_to_world: Transform, reverse_orientation: bool,
        radius: Float, zmin: Float, zmax: Float, phi_max: Float) -> Self {
        Self {
            radius,
            zmin: clamp(zmin.min(zmax), -radius, radius),
            zmax: clamp(zmin.max(zmax), -radius, radius),
            phi_max: clamp(phi_max, 0.0, 360.0),
            object_to_world,
            reverse_orientation
        }
    }
}

impl IShape for Sphere {
    fn object_bound(&self) -> Bounds3f {
        Bounds3f::from_points(
            &Point3f::new(-self.radius, -self.radius, self.zmin),
            &Point3f::new(self.radius, self.radius, self.zmax))
    }

    fn object_to_world(&self) -> &Transform {
        &self.object_to_world
    }

    fn reverse_orientation(&self) -> bool {
        self.reverse_orientation
    }
}

pub fn create_sphere(o2w: Transform, reverse_orientation: bool, params: &ParamSet) -> Result<Sphere> {
    let radius = params.get_param_1f("radius", 1.0)?;
    let zmin = params.get_param_1f("zmin", -radius)?;
    let zmax = params.get_param_1f("zmax", radius)?;
    let phi_max = params.get_param_1f("phimax", 360.0)?;

    Ok(Sphere::new(o2w, reverse_orientation, radius, zmin, zmax, phi_max))
}
