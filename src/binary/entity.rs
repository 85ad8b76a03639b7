use crate::binary::reader::ReadContext;
use crate::binary::writer::BinaryWriter;
use crate::core::error::Result;
use crate::core::scene::*;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

macro_rules! entity_kinds {
    ($($variant:ident => $tag:ident = $value:expr),* $(,)?) => {
        /// Block type tags of the binary format.
        pub mod tags {
            $(pub const $tag: i32 = $value;)*
        }

        /// Any node of the scene graph that gets a block of its own.
        #[derive(Debug, Clone)]
        pub enum Entity {
            $($variant(Arc<$variant>),)*
        }

        impl Entity {
            pub fn tag(&self) -> i32 {
                match self {
                    $(Entity::$variant(_) => tags::$tag,)*
                }
            }

            pub fn type_name(&self) -> &'static str {
                match self {
                    $(Entity::$variant(_) => stringify!($variant),)*
                }
            }
        }

        $(
            impl EntityKind for $variant {
                const TAG: i32 = tags::$tag;
                const NAME: &'static str = stringify!($variant);

                fn into_entity(e: Arc<Self>) -> Entity {
                    Entity::$variant(e)
                }

                fn from_entity(e: &Entity) -> Option<Arc<Self>> {
                    match e {
                        Entity::$variant(x) => Some(x.clone()),
                        _ => None
                    }
                }
            }
        )*
    }
}

pub trait EntityKind: Sized {
    const TAG: i32;
    const NAME: &'static str;

    fn into_entity(e: Arc<Self>) -> Entity;
    fn from_entity(e: &Entity) -> Option<Arc<Self>>;
}

/// A node that knows its own block payload. Nested nodes are written as
/// handles through the writer, so they always land in the file first.
pub trait BinaryEntity: EntityKind {
    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()>;
    fn read_from(r: &mut ReadContext<'_>) -> Result<Self>;
}

entity_kinds! {
    Object              => OBJECT = 100,
    Instance            => INSTANCE = 101,
    Shape               => SHAPE = 102,
    Material            => MATERIAL = 103,
    Camera              => CAMERA = 104,
    Film                => FILM = 105,
    Medium              => MEDIUM = 106,
    Sampler             => SAMPLER = 107,
    PixelFilter         => PIXEL_FILTER = 108,
    Integrator          => INTEGRATOR = 109,
    VolumeIntegrator    => VOLUME_INTEGRATOR = 110,
    SurfaceIntegrator   => SURFACE_INTEGRATOR = 111,
    Texture             => TEXTURE = 112,
    LightSource         => LIGHT_SOURCE = 113,
    AreaLightSource     => AREA_LIGHT_SOURCE = 114,
    Volume              => VOLUME = 115,
    Attributes          => ATTRIBUTES = 116,
    Scene               => SCENE = 117,
}

// Nodes that are nothing but a type name and parameters.
macro_rules! plain_node {
    ($($t:ident),*) => {
        $(
            impl BinaryEntity for $t {
                fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
                    w.write_string(&self.ty)?;
                    w.write_params(&self.params)
                }

                fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
                    let ty = r.read_string()?;
                    let params = r.read_params()?;

                    Ok($t::new(&ty, params))
                }
            }
        )*
    }
}

plain_node!(Film, Sampler, Integrator, SurfaceIntegrator, VolumeIntegrator, PixelFilter, Medium, AreaLightSource);

// Type, parameters and a transform pair.
macro_rules! placed_node {
    ($($t:ident),*) => {
        $(
            impl BinaryEntity for $t {
                fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
                    w.write_string(&self.ty)?;
                    w.write_params(&self.params)?;
                    w.write_transform_set(&self.transform)
                }

                fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
                    let ty = r.read_string()?;
                    let params = r.read_params()?;
                    let transform = r.read_transform_set()?;

                    Ok($t::new(&ty, params, transform))
                }
            }
        )*
    }
}

placed_node!(Camera, LightSource, Volume);

impl BinaryEntity for Material {
    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        w.write_string(&self.ty)?;
        w.write_params(&self.params)?;
        w.write_string(&self.name)
    }

    fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
        let ty = r.read_string()?;
        let params = r.read_params()?;
        let name = r.read_string()?;

        Ok(Material::new(&ty, params, name))
    }
}

impl BinaryEntity for Texture {
    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_string(&self.texel_type)?;
        w.write_string(&self.map_type)?;
        w.write_params(&self.params)
    }

    fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
        let name = r.read_string()?;
        let texel_type = r.read_string()?;
        let map_type = r.read_string()?;
        let params = r.read_params()?;

        Ok(Texture::new(&name, &texel_type, &map_type, params))
    }
}

impl BinaryEntity for Shape {
    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        w.write_string(&self.ty)?;
        w.write_params(&self.params)?;
        w.write_entity(self.material.as_ref())?;
        w.write_entity(Some(&self.attributes))?;
        w.write_transform_set(&self.transform)
    }

    fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
        let ty = r.read_string()?;
        let params = r.read_params()?;
        let material = r.read_entity::<Material>()?;
        let attributes = r.read_required::<Attributes>()?;
        let transform = r.read_transform_set()?;

        Ok(Shape::new(&ty, params, material, attributes, transform))
    }
}

impl BinaryEntity for Attributes {
    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        w.write_bool(self.reverse_orientation)?;
        w.write_string(&self.inside_medium)?;
        w.write_string(&self.outside_medium)?;
        w.write_entities(&self.area_light_sources)?;
        w.write_entity_map(&self.named_material)?;
        w.write_entity_map(&self.named_medium)?;
        w.write_entity_map(&self.named_texture)
    }

    fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
        Ok(Attributes {
            reverse_orientation: r.read_bool()?,
            inside_medium: r.read_string()?,
            outside_medium: r.read_string()?,
            area_light_sources: r.read_entities()?,
            named_material: Arc::new(r.read_entity_map()?),
            named_medium: Arc::new(r.read_entity_map()?),
            named_texture: Arc::new(r.read_entity_map()?)
        })
    }
}

impl BinaryEntity for Object {
    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        w.write_string(&self.name)?;
        w.write_entities(&self.shapes)?;
        w.write_entities(&self.volumes)?;
        w.write_entities(&self.instances)?;
        w.write_entities(&self.light_sources)
    }

    fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
        Ok(Object {
            name: r.read_string()?,
            shapes: r.read_entities()?,
            volumes: r.read_entities()?,
            instances: r.read_entities()?,
            light_sources: r.read_entities()?
        })
    }
}

impl BinaryEntity for Instance {
    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        w.write_entity(Some(&self.object))?;
        w.write_transform_set(&self.transform)
    }

    fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
        let object = r.read_required::<Object>()?;
        let transform = r.read_transform_set()?;

        Ok(Instance::new(object, transform))
    }
}

impl BinaryEntity for Scene {
    fn write_to<W: Write>(&self, w: &mut BinaryWriter<W>) -> Result<()> {
        w.write_entities(&self.cameras)?;
        w.write_entity(self.film.as_ref())?;
        w.write_entity(self.sampler.as_ref())?;
        w.write_entity(self.integrator.as_ref())?;
        w.write_entity(self.volume_integrator.as_ref())?;
        w.write_entity(self.surface_integrator.as_ref())?;
        w.write_entity(self.pixel_filter.as_ref())?;
        w.write_entity(Some(&self.world))?;
        w.write_string(&self.base_path.to_string_lossy())?;
        w.write_f32(self.transform_start_time)?;
        w.write_f32(self.transform_end_time)
    }

    fn read_from(r: &mut ReadContext<'_>) -> Result<Self> {
        Ok(Scene {
            cameras: r.read_entities()?,
            film: r.read_entity()?,
            sampler: r.read_entity()?,
            integrator: r.read_entity()?,
            volume_integrator: r.read_entity()?,
            surface_integrator: r.read_entity()?,
            pixel_filter: r.read_entity()?,
            world: r.read_required()?,
            base_path: PathBuf::from(r.read_string()?),
            transform_start_time: r.read_f32()?,
            transform_end_time: r.read_f32()?
        })
    }
}
