use crate::core::geometry::bounds::Bounds3f;
use crate::core::error::Result;
use crate::core::scene::{Object, Scene, Shape};
use crate::core::transform::Transform;
use crate::shapes::sphere::{Sphere, create_sphere};
use crate::shapes::disk::{Disk, create_disk};
use crate::shapes::triangle::{TriangleMesh, create_trianglemesh};
use crate::shapes::plymesh::create_plymesh;
use enum_dispatch::enum_dispatch;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use log::{debug, info};

#[enum_dispatch]
pub trait IShape {
    fn object_bound(&self) -> Bounds3f;
    fn object_to_world(&self) -> &Transform;
    fn reverse_orientation(&self) -> bool;

    fn world_bound(&self) -> Bounds3f {
        self.object_to_world().transform_bounds(&self.object_bound())
    }

    fn num_primitives(&self) -> usize {
        1
    }
}

/// Geometry built from a parsed `Shape` statement.
#[enum_dispatch(IShape)]
#[derive(Debug)]
pub enum Shapes {
    TriangleMesh,
    Sphere,
    Disk
}

/// Builds the geometry of a parsed shape. `Ok(None)` means the shape type
/// has no geometric counterpart here.
pub fn create_shape(shape: &Shape, base_path: &Path) -> Result<Option<Shapes>> {
    let o2w = *shape.transform.start();
    let ro = shape.attributes.reverse_orientation;

    let s = match shape.ty.as_str() {
        "sphere"        => create_sphere(o2w, ro, &shape.params)?.into(),
        "disk"          => create_disk(o2w, ro, &shape.params)?.into(),
        "trianglemesh"  => match create_trianglemesh(o2w, ro, &shape.params)? {
            Some(m) => m.into(),
            None    => return Ok(None)
        },
        "plymesh"       => create_plymesh(o2w, ro, &shape.params, base_path)?.into(),
        _               => return Ok(None)
    };

    Ok(Some(s))
}

/// What building all geometry of a scene produced.
#[derive(Debug, Default)]
pub struct SceneGeometry {
    pub bounds          : Bounds3f,
    pub num_shapes      : usize,
    pub num_primitives  : usize,
    pub unsupported     : BTreeMap<String, usize>
}

#[derive(Default)]
struct ObjectGeometry {
    bounds          : Bounds3f,
    num_shapes      : usize,
    num_primitives  : usize,
    unsupported     : BTreeMap<String, usize>
}

fn key(o: &Arc<Object>) -> usize {
    Arc::as_ptr(o) as usize
}

fn collect_objects(o: &Arc<Object>, seen: &mut HashSet<usize>, out: &mut Vec<Arc<Object>>) {
    if !seen.insert(key(o)) {
        return;
    }

    out.push(o.clone());

    for inst in o.instances.iter() {
        collect_objects(&inst.object, seen, out);
    }
}

fn build_object(o: &Object, base_path: &Path) -> Result<ObjectGeometry> {
    let mut g = ObjectGeometry::default();

    for shape in o.shapes.iter() {
        match create_shape(shape, base_path)? {
            Some(s) => {
                g.bounds = g.bounds.union_bounds(&s.world_bound());
                g.num_shapes += 1;
                g.num_primitives += s.num_primitives();
            }
            None => *g.unsupported.entry(shape.ty.clone()).or_insert(0) += 1
        }
    }

    Ok(g)
}

fn instanced_bounds(
    o: &Arc<Object>, own: &HashMap<usize, ObjectGeometry>,
    memo: &mut HashMap<usize, Bounds3f>) -> Bounds3f {
    if let Some(b) = memo.get(&key(o)) {
        return *b;
    }

    let mut b = own.get(&key(o)).map(|g| g.bounds).unwrap_or_default();

    for inst in o.instances.iter() {
        let child = instanced_bounds(&inst.object, own, memo);
        b = b
            .union_bounds(&inst.transform.start().transform_bounds(&child))
            .union_bounds(&inst.transform.end().transform_bounds(&child));
    }

    memo.insert(key(o), b);

    b
}

/// Builds the geometry of every object once, in parallel, and combines
/// the world bounds through the instance hierarchy.
pub fn build_scene_geometry(scene: &Scene) -> Result<SceneGeometry> {
    let mut objects = Vec::new();
    collect_objects(&scene.world, &mut HashSet::new(), &mut objects);

    debug!("Building geometry of {} unique objects", objects.len());

    let built = objects
        .par_iter()
        .map(|o| Ok((key(o), build_object(o, &scene.base_path)?)))
        .collect::<Result<HashMap<_, _>>>()?;

    let mut geometry = SceneGeometry {
        bounds: instanced_bounds(&scene.world, &built, &mut HashMap::new()),
        ..Default::default()
    };

    for g in built.values() {
        geometry.num_shapes += g.num_shapes;
        geometry.num_primitives += g.num_primitives;

        for (ty, n) in g.unsupported.iter() {
            *geometry.unsupported.entry(ty.clone()).or_insert(0) += n;
        }
    }

    for (ty, n) in geometry.unsupported.iter() {
        info!("Ignored {} shapes of unsupported type \"{}\"", n, ty);
    }

    Ok(geometry)
}
