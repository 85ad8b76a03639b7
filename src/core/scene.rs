use crate::core::pbrt::Float;
use crate::core::paramset::ParamSet;
use crate::core::transform::TransformSet;
use crate::core::error::PbrtError;
use crate::core::fileutil::has_extension;
use crate::pbrtparser::pbrtparser::parse_file;
use crate::binary::{read_binary, write_binary};
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Result;
use log::info;

pub type NamedMap<T> = BTreeMap<String, Arc<T>>;

macro_rules! param_node {
    ($(#[$meta:meta])* $name:ident { $($field:ident : $t:ty),* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            pub ty      : String,
            pub params  : ParamSet,
            $(pub $field : $t,)*
        }

        impl $name {
            pub fn new(ty: &str, params: ParamSet $(, $field: $t)*) -> Self {
                Self { ty: ty.to_owned(), params $(, $field)* }
            }
        }

        impl Deref for $name {
            type Target = ParamSet;

            fn deref(&self) -> &ParamSet {
                &self.params
            }
        }
    }
}

param_node!(Camera { transform: TransformSet });
param_node!(Film {});
param_node!(Sampler {});
param_node!(Integrator {});
param_node!(SurfaceIntegrator {});
param_node!(VolumeIntegrator {});
param_node!(PixelFilter {});
param_node!(
    /// Parsed so the statement is consumed, never stored on the scene.
    Accelerator {});
param_node!(
    /// Parsed so the statement is consumed, never stored on the scene.
    Renderer {});
param_node!(Medium {});
param_node!(LightSource { transform: TransformSet });
param_node!(AreaLightSource {});
param_node!(Volume { transform: TransformSet });
param_node!(
    /// `name` is empty for anonymous `Material` statements.
    Material { name: String });
param_node!(
    /// A shape keeps the material, attributes and transform that were
    /// active where it was declared; later statements never change them.
    Shape {
        material: Option<Arc<Material>>,
        attributes: Arc<Attributes>,
        transform: TransformSet
    });

#[derive(Debug, Clone)]
pub struct Texture {
    pub name        : String,
    pub texel_type  : String,
    pub map_type    : String,
    pub params      : ParamSet
}

impl Texture {
    pub fn new(name: &str, texel_type: &str, map_type: &str, params: ParamSet) -> Self {
        Self {
            name: name.to_owned(),
            texel_type: texel_type.to_owned(),
            map_type: map_type.to_owned(),
            params
        }
    }
}

impl Deref for Texture {
    type Target = ParamSet;

    fn deref(&self) -> &ParamSet {
        &self.params
    }
}

/// State inherited through `AttributeBegin`/`AttributeEnd`. The maps are
/// shared between scopes until one of them writes (`Arc::make_mut`).
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    pub reverse_orientation     : bool,
    pub inside_medium           : String,
    pub outside_medium          : String,
    pub area_light_sources      : Vec<Arc<AreaLightSource>>,
    pub named_material          : Arc<NamedMap<Material>>,
    pub named_medium            : Arc<NamedMap<Medium>>,
    pub named_texture           : Arc<NamedMap<Texture>>
}

#[derive(Debug, Default)]
pub struct Object {
    pub name            : String,
    pub shapes          : Vec<Arc<Shape>>,
    pub volumes         : Vec<Arc<Volume>>,
    pub instances       : Vec<Arc<Instance>>,
    pub light_sources   : Vec<Arc<LightSource>>
}

impl Object {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), ..Default::default() }
    }

    /// True if the object has anything of its own, not counting instances.
    pub fn has_content(&self) -> bool {
        !self.shapes.is_empty() || !self.volumes.is_empty() || !self.light_sources.is_empty()
    }
}

#[derive(Debug)]
pub struct Instance {
    pub object      : Arc<Object>,
    pub transform   : TransformSet
}

impl Instance {
    pub fn new(object: Arc<Object>, transform: TransformSet) -> Self {
        Self { object, transform }
    }
}

pub const ROOT_OBJECT_NAME: &str = "<root>";

#[derive(Debug, Clone)]
pub struct Scene {
    pub cameras                 : Vec<Arc<Camera>>,
    pub film                    : Option<Arc<Film>>,
    pub sampler                 : Option<Arc<Sampler>>,
    pub integrator              : Option<Arc<Integrator>>,
    pub volume_integrator       : Option<Arc<VolumeIntegrator>>,
    pub surface_integrator      : Option<Arc<SurfaceIntegrator>>,
    pub pixel_filter            : Option<Arc<PixelFilter>>,
    pub world                   : Arc<Object>,
    pub base_path               : PathBuf,
    pub transform_start_time    : Float,
    pub transform_end_time      : Float
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            cameras: Vec::new(),
            film: None,
            sampler: None,
            integrator: None,
            volume_integrator: None,
            surface_integrator: None,
            pixel_filter: None,
            world: Arc::new(Object::new(ROOT_OBJECT_NAME)),
            base_path: PathBuf::new(),
            transform_start_time: 0.0,
            transform_end_time: 1.0
        }
    }
}

impl Scene {
    /// Loads a scene by file extension: `.pbrt` is parsed as text, `.pbf`
    /// is read as a binary scene.
    pub fn load<P: AsRef<Path>>(path: P, base_path: Option<&Path>) -> Result<Scene> {
        let path = path.as_ref();

        if has_extension(path, "pbrt") {
            parse_file(path, base_path)
        } else if has_extension(path, "pbf") {
            read_binary(path)
        } else {
            Err(PbrtError::UnknownFileFormat(path.to_owned()).into())
        }
    }

    /// Writes the scene as a binary `.pbf` file, returning the byte count.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        write_binary(self, path)
    }

    /// Rewrites the world so that it instances only objects without
    /// instances of their own. Transforms along each instancing path are
    /// composed; objects that already are leaves keep their identity.
    pub fn make_single_level(&mut self) {
        let mut leaves = HashMap::new();
        let mut instances = Vec::new();

        for inst in self.world.instances.iter() {
            flatten_into(&inst.object, inst.transform, &mut instances, &mut leaves);
        }

        info!(
            "Flattened instance hierarchy: {} top-level instances, {} unique objects",
            instances.len(), leaves.len());

        self.world = Arc::new(Object {
            name: self.world.name.clone(),
            shapes: self.world.shapes.clone(),
            volumes: self.world.volumes.clone(),
            light_sources: self.world.light_sources.clone(),
            instances
        });
    }
}

fn flatten_into(
    object: &Arc<Object>, xfm: TransformSet,
    out: &mut Vec<Arc<Instance>>, leaves: &mut HashMap<usize, Arc<Object>>) {
    if object.has_content() {
        let key = Arc::as_ptr(object) as usize;
        let leaf = leaves
            .entry(key)
            .or_insert_with(|| {
                if object.instances.is_empty() {
                    object.clone()
                } else {
                    Arc::new(Object {
                        name: object.name.clone(),
                        shapes: object.shapes.clone(),
                        volumes: object.volumes.clone(),
                        light_sources: object.light_sources.clone(),
                        instances: Vec::new()
                    })
                }
            })
            .clone();

        out.push(Arc::new(Instance::new(leaf, xfm)));
    }

    for inst in object.instances.iter() {
        flatten_into(&inst.object, xfm * inst.transform, out, leaves);
    }
}
