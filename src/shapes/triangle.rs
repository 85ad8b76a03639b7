use crate::core::pbrt::Float;
use crate::core::transform::Transform;
use crate::core::shape::IShape;
use crate::core::geometry::bounds::Bounds3f;
use crate::core::geometry::vector::{Point3f, Vector3f, Vector3i};
use crate::core::paramset::ParamSet;
use crate::core::error::{PbrtError, Result};
use parking_lot::Mutex;
use log::{error, warn};

/// Indexed triangle soup in object space.
#[derive(Debug)]
pub struct TriangleMesh {
    pub positions           : Vec<Point3f>,
    pub normals             : Vec<Vector3f>,
    pub indices             : Vec<Vector3i>,
    pub object_to_world     : Transform,
    pub reverse_orientation : bool,
    bounds                  : Mutex<Option<Bounds3f>>
}

impl TriangleMesh {
    pub fn new(
        object_to_world: Transform, reverse_orientation: bool,
        positions: Vec<Point3f>, normals: Vec<Vector3f>, indices: Vec<Vector3i>) -> Self {
        Self {
            positions, normals, indices,
            object_to_world, reverse_orientation,
            bounds: Mutex::new(None)
        }
    }

    pub fn num_triangles(&self) -> usize {
        self.indices.len()
    }
}

impl IShape for TriangleMesh {
    // Computed on first use; the mesh never changes afterwards.
    fn object_bound(&self) -> Bounds3f {
        let mut bounds = self.bounds.lock();

        *bounds.get_or_insert_with(|| {
            self.positions
                .iter()
                .fold(Bounds3f::default(), |b, p| b.union_point(p))
        })
    }

    fn object_to_world(&self) -> &Transform {
        &self.object_to_world
    }

    fn reverse_orientation(&self) -> bool {
        self.reverse_orientation
    }

    fn num_primitives(&self) -> usize {
        self.num_triangles()
    }
}

fn to_points(name: &str, v: &[Float]) -> Result<Vec<Point3f>> {
    if v.len() % 3 != 0 {
        return Err(PbrtError::ParamArity {
            name: name.to_owned(),
            expected: "a multiple of 3".to_owned(),
            found: v.len()
        });
    }

    Ok(v.chunks(3).map(|c| Point3f::new(c[0], c[1], c[2])).collect())
}

pub fn create_trianglemesh(
    o2w: Transform, reverse_orientation: bool,
    params: &ParamSet) -> Result<Option<TriangleMesh>> {
    let p = match params.get_floats("P")? {
        Some(p) => to_points("P", p)?,
        None    => {
            error!("Vertex positions \"P\" not provided with triangle mesh shape");
            return Ok(None);
        }
    };

    let vi: Vec<i32> = match params.get_ints("indices")? {
        Some(vi) => vi.to_vec(),
        None if p.len() == 3 => vec![0, 1, 2],
        None => {
            error!("Vertex indices \"indices\" not provided with triangle mesh shape");
            return Ok(None);
        }
    };

    if vi.len() % 3 != 0 {
        return Err(PbrtError::ParamArity {
            name: "indices".to_owned(),
            expected: "a multiple of 3".to_owned(),
            found: vi.len()
        });
    }

    if let Some(&i) = vi.iter().find(|&&i| i < 0 || i as usize >= p.len()) {
        error!(
            "trianglemesh has out of-bounds vertex index {} ({} \"P\" values were given)",
            i, p.len());
        return Ok(None);
    }

    let mut n = match params.get_floats("N")? {
        Some(n) => to_points("N", n)?,
        None    => Vec::new()
    };

    if !n.is_empty() && n.len() != p.len() {
        warn!("Number of \"N\"s for triangle mesh must match \"P\"s. Discarding \"N\"s.");
        n.clear();
    }

    let indices = vi.chunks(3).map(|c| Vector3i::new(c[0], c[1], c[2])).collect();

    Ok(Some(TriangleMesh::new(o2w, reverse_orientation, p, n, indices)))
}
