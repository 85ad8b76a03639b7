use crate::core::pbrt::{Float, clamp};
use crate::core::transform::Transform;
use crate::core::shape::IShape;
use crate::core::geometry::bounds::Bounds3f;
use crate::core::geometry::vector::Point3f;
use crate::core::paramset::ParamSet;
use crate::core::error::Result;

/// Disk of `radius` around the z axis, at `height` along it.
#[derive(Debug, Clone)]
pub struct Disk {
    pub height              : Float,
    pub radius              : Float,
    pub inner_radius        : Float,
    pub phi_max             : Float,
    pub object_to_world     : Transform,
    pub reverse_orientation : bool
}

impl Disk {
    pub fn new(
        object_to_world: Transform, reverse_orientation: bool,
        height: Float, radius: Float, inner_radius: Float, phi_max: Float) -> Self {
        Self {
            object_to_world, reverse_orientation,
            height, radius, inner_radius,
            phi_max: clamp(phi_max, 0.0, 360.0)
        }
    }
}

impl IShape for Disk {
    fn object_bound(&self) -> Bounds3f {
        Bounds3f::from_points(
            &Point3f::new(-self.radius, -self.radius, self.height),
            &Point3f::new(self.radius, self.radius, self.height))
    }

    fn object_to_world(&self) -> &Transform {
        &self.object_to_world
    }

    fn reverse_orientation(&self) -> bool {
        self.reverse_orientation
    }
}

pub fn create_disk(o2w: Transform, reverse_orientation: bool, params: &ParamSet) -> Result<Disk> {
    let height = params.get_param_1f("height", 0.0)?;
    let radius = params.get_param_1f("radius", 1.0)?;
    let inner_radius = params.get_param_1f("innerradius", 0.0)?;
    let phi_max = params.get_param_1f("phimax", 360.0)?;

    Ok(Disk::new(o2w, reverse_orientation, height, radius, inner_radius, phi_max))
}
