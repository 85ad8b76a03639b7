use crate::core::pbrt::Float;
use crate::core::transform::{Transform, TransformSet, MAX_TRANSFORMS};
use crate::core::paramset::ParamSet;
use crate::core::geometry::vector::{Vector3f, Point3f};
use crate::core::error::{PbrtError, Result};
use crate::core::scene::*;
use crate::pbrtparser::tokens::Loc;
use static_assertions::const_assert_eq;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use log::{debug, warn};

const START_TRANSFORM_BITS: u32 = 1 << 0;
const END_TRANSFORM_BITS: u32 = 1 << 1;
const ALL_TRANSFORM_BITS: u32 = (1 << MAX_TRANSFORMS) - 1;

const_assert_eq!(MAX_TRANSFORMS, 2);

type ObjectId = usize;

const WORLD: ObjectId = 0;

// Objects are collected by index while parsing so that an object can be
// instanced before (or while) it is being defined. `API::finish` turns them
// into the shared, immutable `Object` graph.
#[derive(Default)]
struct ObjectBuilder {
    name            : String,
    defined         : bool,
    shapes          : Vec<Arc<Shape>>,
    volumes         : Vec<Arc<Volume>>,
    light_sources   : Vec<Arc<LightSource>>,
    instances       : Vec<(ObjectId, TransformSet)>
}

impl ObjectBuilder {
    fn new(name: &str) -> Self {
        Self { name: name.to_owned(), ..Default::default() }
    }
}

macro_rules! for_active_transform {
    ($self:ident, $t:ident => $e:expr) => {
        for i in 0..MAX_TRANSFORMS {
            if $self.active_transform_bits & (1 << i) != 0 {
                let $t = $self.curr_transform[i];
                $self.curr_transform[i] = $e;
            }
        }
    }
}

macro_rules! store_option {
    ($x:ident, $field:ident, $node:ident, $stmt:expr) => {
        pub fn $x(&mut self, ty: &str, params: ParamSet) {
            if self.scene.$field.is_some() {
                warn!("{} specified more than once; using the last one", $stmt);
            }

            self.scene.$field = Some(Arc::new($node::new(ty, params)));
        }
    }
}

/// Scene construction state driven by the parser: the current transform
/// with its stack, the attribute and material stacks, the object being
/// defined and the parse-wide table of named objects.
pub struct API {
    curr_transform              : TransformSet,
    active_transform_bits       : u32,
    pushed_transforms           : Vec<TransformSet>,
    named_coordinate_system     : HashMap<String, TransformSet>,
    graphics_state              : Arc<Attributes>,
    pushed_graphics_states      : Vec<Arc<Attributes>>,
    current_material            : Option<Arc<Material>>,
    pushed_materials            : Vec<Option<Arc<Material>>>,
    objects                     : Vec<ObjectBuilder>,
    named_objects               : HashMap<String, ObjectId>,
    object_stack                : Vec<ObjectId>,
    scene                       : Scene
}

impl Default for API {
    fn default() -> Self {
        Self::new(PathBuf::new())
    }
}

impl API {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            curr_transform: TransformSet::default(),
            active_transform_bits: ALL_TRANSFORM_BITS,
            pushed_transforms: Vec::new(),
            named_coordinate_system: HashMap::new(),
            graphics_state: Arc::new(Attributes::default()),
            pushed_graphics_states: Vec::new(),
            current_material: None,
            pushed_materials: Vec::new(),
            objects: vec![ObjectBuilder::new(ROOT_OBJECT_NAME)],
            named_objects: HashMap::new(),
            object_stack: Vec::new(),
            scene: Scene { base_path, ..Default::default() }
        }
    }

    pub fn current_transform(&self) -> &TransformSet {
        &self.curr_transform
    }

    pub fn graphics_state(&self) -> &Attributes {
        &self.graphics_state
    }

    pub fn current_material(&self) -> Option<&Arc<Material>> {
        self.current_material.as_ref()
    }

    pub fn named_texture(&self, name: &str) -> Option<Arc<Texture>> {
        self.graphics_state.named_texture.get(name).cloned()
    }

    fn current_object(&mut self) -> &mut ObjectBuilder {
        let id = self.object_stack.last().copied().unwrap_or(WORLD);

        &mut self.objects[id]
    }

    fn find_named_object(&mut self, name: &str) -> ObjectId {
        if let Some(id) = self.named_objects.get(name) {
            return *id;
        }

        let id = self.objects.len();
        self.objects.push(ObjectBuilder::new(name));
        self.named_objects.insert(name.to_owned(), id);

        id
    }

    fn add_transform(&mut self, tr: Transform) {
        for_active_transform!(self, t => t * tr);
    }

    fn set_transform(&mut self, tr: Transform) {
        for_active_transform!(self, _t => tr);
    }

    // Transforms

    pub fn identity(&mut self) {
        self.set_transform(Transform::new());
    }

    pub fn translate(&mut self, delta: &Vector3f) {
        self.add_transform(Transform::translate(delta));
    }

    pub fn scale(&mut self, s: &Vector3f) {
        self.add_transform(Transform::scale(s.x, s.y, s.z));
    }

    pub fn rotate(&mut self, angle: Float, axis: &Vector3f) {
        self.add_transform(Transform::rotate(angle, axis));
    }

    pub fn look_at(&mut self, eye: &Point3f, look: &Point3f, up: &Vector3f) {
        let frame = Transform::look_at(eye, look, up);

        match frame.inverse() {
            Some(inv) => self.add_transform(inv),
            None => warn!("LookAt: degenerate camera frame. Ignoring it.")
        }
    }

    pub fn concat_transform(&mut self, tr: &Transform) {
        self.add_transform(*tr);
    }

    pub fn transform(&mut self, tr: &Transform) {
        self.set_transform(*tr);
    }

    pub fn coordinate_system(&mut self, name: &str) {
        self.named_coordinate_system.insert(name.to_owned(), self.curr_transform);
    }

    pub fn coord_sys_transform(&mut self, name: &str) {
        match self.named_coordinate_system.get(name) {
            Some(t) => self.curr_transform = *t,
            _ => warn!("Couldn't find named coordinate system \"{}\"", name)
        }
    }

    // Selecting the active transforms also saves the current pair; the
    // matching pop is left to a later TransformEnd/AttributeEnd.
    fn set_active_transform(&mut self, bits: u32) {
        self.active_transform_bits = bits;
        self.pushed_transforms.push(self.curr_transform);
    }

    pub fn active_transform_all(&mut self) {
        self.set_active_transform(ALL_TRANSFORM_BITS);
    }

    pub fn active_transform_starttime(&mut self) {
        self.set_active_transform(START_TRANSFORM_BITS);
    }

    pub fn active_transform_endtime(&mut self) {
        self.set_active_transform(END_TRANSFORM_BITS);
    }

    pub fn transform_times(&mut self, start: Float, end: Float) {
        self.scene.transform_start_time = start;
        self.scene.transform_end_time = end;
    }

    pub fn transform_begin(&mut self) {
        self.pushed_transforms.push(self.curr_transform);
    }

    pub fn transform_end(&mut self, loc: &Loc) -> Result<()> {
        self.curr_transform = self.pushed_transforms.pop().ok_or_else(|| PbrtError::UnbalancedEnd {
            what: "TransformEnd",
            loc: loc.clone()
        })?;

        Ok(())
    }

    // Options block

    pub fn camera(&mut self, ty: &str, params: ParamSet) {
        let camera = Camera::new(ty, params, self.curr_transform);
        self.scene.cameras.push(Arc::new(camera));

        match self.curr_transform.inverse() {
            Some(cam_to_world) => {
                self.named_coordinate_system.insert("camera".to_owned(), cam_to_world);
            }
            None => warn!("Camera transform is not invertible; \"camera\" coordinate system not set")
        }
    }

    store_option!(film, film, Film, "Film");
    store_option!(sampler, sampler, Sampler, "Sampler");
    store_option!(integrator, integrator, Integrator, "Integrator");
    store_option!(surface_integrator, surface_integrator, SurfaceIntegrator, "SurfaceIntegrator");
    store_option!(volume_integrator, volume_integrator, VolumeIntegrator, "VolumeIntegrator");
    store_option!(pixel_filter, pixel_filter, PixelFilter, "PixelFilter");

    pub fn accelerator(&mut self, ty: &str, params: ParamSet) {
        let accel = Accelerator::new(ty, params);
        debug!("Ignoring Accelerator \"{}\" ({} parameters)", accel.ty, accel.len());
    }

    pub fn renderer(&mut self, ty: &str, params: ParamSet) {
        let renderer = Renderer::new(ty, params);
        debug!("Ignoring Renderer \"{}\" ({} parameters)", renderer.ty, renderer.len());
    }

    pub fn world_begin(&mut self) {
        self.curr_transform = TransformSet::default();
        self.active_transform_bits = ALL_TRANSFORM_BITS;
        self.named_coordinate_system.insert("world".to_owned(), self.curr_transform);
    }

    pub fn world_end(&mut self) {
        if !self.object_stack.is_empty() {
            warn!("Missing end to ObjectBegin");
        }

        if !self.pushed_graphics_states.is_empty() {
            warn!("Missing end to AttributeBegin");
        }
    }

    // Attributes

    pub fn attribute_begin(&mut self) {
        self.pushed_graphics_states.push(self.graphics_state.clone());
        self.pushed_materials.push(self.current_material.clone());
        self.pushed_transforms.push(self.curr_transform);
    }

    pub fn attribute_end(&mut self, loc: &Loc) -> Result<()> {
        let unbalanced = || PbrtError::UnbalancedEnd { what: "AttributeEnd", loc: loc.clone() };

        self.graphics_state = self.pushed_graphics_states.pop().ok_or_else(unbalanced)?;
        self.current_material = self.pushed_materials.pop().ok_or_else(unbalanced)?;
        self.curr_transform = self.pushed_transforms.pop().ok_or_else(unbalanced)?;

        Ok(())
    }

    fn attributes_mut(&mut self) -> &mut Attributes {
        Arc::make_mut(&mut self.graphics_state)
    }

    pub fn reverse_orientation(&mut self) {
        let gs = self.attributes_mut();
        gs.reverse_orientation = !gs.reverse_orientation;
    }

    pub fn medium_interface(&mut self, inside: &str, outside: &str) {
        let gs = self.attributes_mut();
        gs.inside_medium = inside.to_owned();
        gs.outside_medium = outside.to_owned();
    }

    pub fn make_named_medium(&mut self, name: &str, params: ParamSet) -> Result<()> {
        let ty = implicit_type(&params, "MakeNamedMedium", name)?;
        let medium = Arc::new(Medium::new(&ty, params));

        let gs = self.attributes_mut();
        if Arc::make_mut(&mut gs.named_medium).insert(name.to_owned(), medium).is_some() {
            warn!("Named medium \"{}\" redefined", name);
        }

        Ok(())
    }

    pub fn texture(&mut self, name: &str, texel_type: &str, map_type: &str, params: ParamSet) {
        let texture = Texture::new(name, texel_type, map_type, params);

        let gs = self.attributes_mut();
        if Arc::make_mut(&mut gs.named_texture).insert(name.to_owned(), Arc::new(texture)).is_some() {
            debug!("Texture \"{}\" redefined", name);
        }
    }

    pub fn material(&mut self, ty: &str, params: ParamSet) {
        let material = Material::new(ty, params, String::new());
        self.current_material = Some(Arc::new(material));
    }

    pub fn make_named_material(&mut self, name: &str, params: ParamSet) -> Result<()> {
        let ty = implicit_type(&params, "MakeNamedMaterial", name)?;
        let material = Material::new(&ty, params, name.to_owned());

        let gs = self.attributes_mut();
        if Arc::make_mut(&mut gs.named_material).insert(name.to_owned(), Arc::new(material)).is_some() {
            warn!("Named material \"{}\" redefined", name);
        }

        Ok(())
    }

    pub fn named_material(&mut self, name: &str) {
        self.current_material = self.graphics_state.named_material.get(name).cloned();

        if self.current_material.is_none() {
            warn!("NamedMaterial \"{}\" unknown", name);
        }
    }

    // Scene contents

    pub fn light_source(&mut self, ty: &str, params: ParamSet) {
        let light = Arc::new(LightSource::new(ty, params, self.curr_transform));
        self.current_object().light_sources.push(light);
    }

    pub fn area_light_source(&mut self, ty: &str, params: ParamSet) {
        let light = Arc::new(AreaLightSource::new(ty, params));
        self.attributes_mut().area_light_sources.push(light);
    }

    pub fn shape(&mut self, ty: &str, params: ParamSet) {
        let shape = Shape::new(
            ty, params,
            self.current_material.clone(),
            self.graphics_state.clone(),
            self.curr_transform);

        self.current_object().shapes.push(Arc::new(shape));
    }

    pub fn volume(&mut self, ty: &str, params: ParamSet) {
        let volume = Arc::new(Volume::new(ty, params, self.curr_transform));
        self.current_object().volumes.push(volume);
    }

    // Instancing

    pub fn object_begin(&mut self, name: &str) {
        let id = self.find_named_object(name);

        if self.objects[id].defined {
            debug!("ObjectBegin \"{}\": adding to an existing object", name);
        }

        self.objects[id].defined = true;
        self.object_stack.push(id);
    }

    pub fn object_end(&mut self, loc: &Loc) -> Result<()> {
        self.object_stack.pop().ok_or_else(|| PbrtError::UnbalancedEnd {
            what: "ObjectEnd",
            loc: loc.clone()
        })?;

        Ok(())
    }

    pub fn object_instance(&mut self, name: &str) {
        let id = self.find_named_object(name);
        let xfm = self.curr_transform;

        self.current_object().instances.push((id, xfm));
    }

    /// Builds the final scene. Objects become shared nodes, so an object
    /// instanced from several places is one `Arc<Object>`.
    pub fn finish(mut self) -> Scene {
        let mut built: Vec<Option<Arc<Object>>> = vec![None; self.objects.len()];
        let mut visiting = vec![false; self.objects.len()];

        for o in self.objects.iter().skip(1) {
            if !o.defined {
                warn!("Object \"{}\" is instanced but never defined", o.name);
            }
        }

        if let Some(world) = build_object(&self.objects, WORLD, &mut built, &mut visiting) {
            self.scene.world = world;
        }

        self.scene
    }
}

fn implicit_type(params: &ParamSet, what: &'static str, name: &str) -> Result<String> {
    let missing = || PbrtError::MissingImplicitType { what, name: name.to_owned() };

    match params.get_param_string("type") {
        Ok(Some(ty)) => Ok(ty.to_owned()),
        _            => Err(missing())
    }
}

fn build_object(
    objects: &[ObjectBuilder], id: ObjectId,
    built: &mut Vec<Option<Arc<Object>>>, visiting: &mut Vec<bool>) -> Option<Arc<Object>> {
    if let Some(o) = &built[id] {
        return Some(o.clone());
    }

    if visiting[id] {
        warn!("Object \"{}\" instances itself; dropping the cyclic instance", objects[id].name);
        return None;
    }

    visiting[id] = true;

    let b = &objects[id];
    let instances = b.instances
        .iter()
        .filter_map(|(target, xfm)| {
            build_object(objects, *target, built, visiting)
                .map(|o| Arc::new(Instance::new(o, *xfm)))
        })
        .collect();

    let object = Arc::new(Object {
        name: b.name.clone(),
        shapes: b.shapes.clone(),
        volumes: b.volumes.clone(),
        light_sources: b.light_sources.clone(),
        instances
    });

    visiting[id] = false;
    built[id] = Some(object.clone());

    Some(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paramset::{Param, ParamType};
    use std::path::PathBuf;

    fn loc() -> Loc {
        Loc::new(Arc::new(PathBuf::from("test.pbrt")), 1, 1)
    }

    #[test]
    fn attribute_scope_restores_state() {
        let mut api = API::default();
        api.material("matte", ParamSet::new());
        let outer = api.current_material().cloned();

        api.attribute_begin();
        api.translate(&Vector3f::new(1.0, 0.0, 0.0));
        api.reverse_orientation();
        api.material("plastic", ParamSet::new());
        api.attribute_end(&loc()).unwrap();

        assert!(api.current_transform().start().is_identity());
        assert!(!api.graphics_state().reverse_orientation);
        assert!(Arc::ptr_eq(api.current_material().unwrap(), outer.as_ref().unwrap()));
        assert!(matches!(api.attribute_end(&loc()), Err(PbrtError::UnbalancedEnd { .. })));
    }

    #[test]
    fn shapes_keep_their_attribute_snapshot() {
        let mut api = API::default();
        api.attribute_begin();
        api.shape("sphere", ParamSet::new());
        api.reverse_orientation();
        api.shape("sphere", ParamSet::new());
        api.attribute_end(&loc()).unwrap();

        let scene = api.finish();
        let shapes = &scene.world.shapes;
        assert!(!shapes[0].attributes.reverse_orientation);
        assert!(shapes[1].attributes.reverse_orientation);
    }

    #[test]
    fn active_transform_limits_updates() {
        let mut api = API::default();
        api.active_transform_endtime();
        api.translate(&Vector3f::new(0.0, 0.0, 5.0));
        api.active_transform_all();

        let ts = api.current_transform();
        assert!(ts.start().is_identity());
        assert_eq!(ts.end().p, Vector3f::new(0.0, 0.0, 5.0));
        assert!(ts.is_animated());
    }

    #[test]
    fn named_material_requires_type() {
        let mut api = API::default();
        assert!(matches!(
            api.make_named_material("gold", ParamSet::new()),
            Err(PbrtError::MissingImplicitType { .. })));

        let mut params = ParamSet::new();
        let mut ty = Param::new(ParamType::String);
        ty.add("metal").unwrap();
        params.add("type", ty);
        api.make_named_material("gold", params).unwrap();
        api.named_material("gold");

        let m = api.current_material().unwrap();
        assert_eq!((m.ty.as_str(), m.name.as_str()), ("metal", "gold"));
    }

    #[test]
    fn cyclic_instances_are_dropped() {
        let mut api = API::default();
        api.object_begin("a");
        api.shape("sphere", ParamSet::new());
        api.object_instance("a");
        api.object_end(&loc()).unwrap();
        api.object_instance("a");

        let scene = api.finish();
        assert_eq!(scene.world.instances.len(), 1);
        assert!(scene.world.instances[0].object.instances.is_empty());
    }
}
