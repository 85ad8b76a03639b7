use crate::core::pbrt::pretty_number;
use crate::core::scene::{Object, Scene};
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::sync::Arc;

/// Count of something both per unique object and over all instances.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub unique      : usize,
    pub instanced   : usize
}

impl Counter {
    pub fn add(&mut self, first_time: bool, n: usize) {
        self.instanced += n;
        if first_time { self.unique += n; }
    }

    fn print<W: Write>(&self, w: &mut W, name: &str) -> std::io::Result<()> {
        writeln!(w, "number of {}", name)?;
        writeln!(w, " - unique    : {}", pretty_number(self.unique))?;
        writeln!(w, " - instanced : {}", pretty_number(self.instanced))
    }
}

/// Scene statistics gathered by walking the instance graph.
#[derive(Debug, Default)]
pub struct SceneStats {
    pub objects             : Counter,
    pub instances           : Counter,
    pub shapes              : Counter,
    pub lights              : Counter,
    pub area_lights         : Counter,
    pub volumes             : Counter,
    pub shapes_by_type      : BTreeMap<String, Counter>,
    pub materials_by_type   : BTreeMap<String, usize>,
    traversed               : HashSet<usize>,
    used_materials          : HashSet<usize>
}

impl SceneStats {
    pub fn gather(scene: &Scene) -> Self {
        let mut stats = SceneStats::default();
        stats.traverse(&scene.world);

        stats
    }

    fn traverse(&mut self, object: &Arc<Object>) {
        let first_time = self.traversed.insert(Arc::as_ptr(object) as usize);

        self.objects.add(first_time, 1);
        self.lights.add(first_time, object.light_sources.len());
        self.volumes.add(first_time, object.volumes.len());
        self.shapes.add(first_time, object.shapes.len());

        for shape in object.shapes.iter() {
            self.shapes_by_type
                .entry(shape.ty.clone())
                .or_default()
                .add(first_time, 1);

            self.area_lights.add(first_time, shape.attributes.area_light_sources.len());

            let (key, ty) = match &shape.material {
                Some(m) => (Arc::as_ptr(m) as usize, m.ty.clone()),
                None    => (0, "null".to_owned())
            };

            if self.used_materials.insert(key) {
                *self.materials_by_type.entry(ty).or_insert(0) += 1;
            }
        }

        self.instances.add(first_time, object.instances.len());

        for inst in object.instances.iter() {
            self.traverse(&inst.object);
        }
    }

    pub fn num_materials(&self) -> usize {
        self.used_materials.len()
    }

    pub fn print<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        self.objects.print(&mut w, "objects")?;
        self.instances.print(&mut w, "instances")?;
        self.shapes.print(&mut w, "shapes")?;

        for (ty, c) in self.shapes_by_type.iter() {
            c.print(&mut w, &format!("{} shapes", ty))?;
        }

        self.area_lights.print(&mut w, "area lights")?;
        self.lights.print(&mut w, "lights")?;
        self.volumes.print(&mut w, "volumes")?;

        writeln!(w, "total num materials {}", self.num_materials())?;
        writeln!(w, "material usage by type:")?;

        for (ty, n) in self.materials_by_type.iter() {
            writeln!(w, " - {}x\t{}", n, ty)?;
        }

        Ok(())
    }
}
