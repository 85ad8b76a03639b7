use log::{debug, info, warn};
use crate::core::api::API;
use crate::core::error::{PbrtError, Result};
use crate::core::fileutil::{directory_containing, resolve_filename};
use crate::core::geometry::vector::Vector3f;
use crate::core::paramset::{Param, ParamSet, ParamType};
use crate::core::pbrt::Float;
use crate::core::scene::{Scene, Texture};
use crate::core::transform::Transform;
use crate::pbrtparser::lexer::Lexer;
use crate::pbrtparser::tokens::{Token, TokenKind};
use anyhow::Context;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parses a `.pbrt` file and everything it includes. Relative file names
/// in the scene resolve against `base_path` if given, else against the
/// directory of `path`.
pub fn parse_file<P: AsRef<Path>>(path: P, base_path: Option<&Path>) -> anyhow::Result<Scene> {
    let path = path.as_ref();
    let root_dir = base_path
        .map(|p| p.to_owned())
        .unwrap_or_else(|| directory_containing(path));

    info!("Parsing {}", path.display());

    let lexer = Lexer::open(path)?;
    let mut parser = Parser::new(lexer, root_dir);
    parser.parse().with_context(|| format!("failed to parse \"{}\"", path.display()))?;

    Ok(parser.finish())
}

/// Parses scene text held in memory. `root_dir` plays the role of the
/// directory containing the root file.
pub fn parse_str<P: AsRef<Path>>(text: &str, root_dir: P) -> Result<Scene> {
    let lexer = Lexer::from_text("<string>", text);
    let mut parser = Parser::new(lexer, root_dir.as_ref().to_owned());
    parser.parse()?;

    Ok(parser.finish())
}

pub struct Parser {
    peek_queue  : VecDeque<Token>,
    tokenizers  : Vec<Lexer>,
    root_dir    : PathBuf,
    api         : API
}

impl Parser {
    pub fn new(lexer: Lexer, root_dir: PathBuf) -> Self {
        Self {
            peek_queue: VecDeque::new(),
            tokenizers: vec![lexer],
            api: API::new(root_dir.clone()),
            root_dir
        }
    }

    pub fn api(&self) -> &API {
        &self.api
    }

    pub fn finish(self) -> Scene {
        self.api.finish()
    }

    // Pulls one token from the innermost open file, following Include
    // statements and falling back to the including file at end of input.
    fn read_token(&mut self) -> Result<Option<Token>> {
        loop {
            let lexer = match self.tokenizers.last_mut() {
                Some(l) => l,
                None    => return Ok(None)
            };

            let token = match lexer.next_token()? {
                Some(t) => t,
                None => {
                    if let Some(l) = self.tokenizers.pop() {
                        debug!("Done with {}", l.file().display());
                    }
                    continue;
                }
            };

            if !token.is_literal("Include") {
                return Ok(Some(token));
            }

            let name = match lexer.next_token()? {
                Some(t) if t.is_string() => t,
                Some(t) => return Err(missing("an include file name", &t)),
                None    => return Err(PbrtError::UnexpectedEof)
            };

            let path = resolve_filename(&self.root_dir, &name.text);
            debug!("Including {} from {}", path.display(), name.loc);
            self.tokenizers.push(Lexer::open(&path)?);
        }
    }

    /// Looks `i` tokens ahead without consuming anything.
    pub fn peek(&mut self, i: usize) -> Result<Option<&Token>> {
        while self.peek_queue.len() <= i {
            match self.read_token()? {
                Some(t) => self.peek_queue.push_back(t),
                None    => return Ok(None)
            }
        }

        Ok(self.peek_queue.get(i))
    }

    pub fn next(&mut self) -> Result<Token> {
        self.peek(0)?;
        self.peek_queue.pop_front().ok_or(PbrtError::UnexpectedEof)
    }

    fn next_is_string(&mut self) -> Result<bool> {
        Ok(matches!(self.peek(0)?, Some(t) if t.kind == TokenKind::String))
    }

    fn expect_string(&mut self, expected: &'static str) -> Result<String> {
        let token = self.next()?;

        if token.is_string() {
            Ok(token.text)
        } else {
            Err(missing(expected, &token))
        }
    }

    fn expect_special(&mut self, special: &'static str) -> Result<()> {
        let token = self.next()?;

        if token.is_special(special) {
            Ok(())
        } else {
            Err(missing(special, &token))
        }
    }

    fn parse_float(&mut self) -> Result<Float> {
        let token = self.next()?;

        match token.kind {
            TokenKind::Literal => token.text.parse::<Float>().map_err(|_| missing("a number", &token)),
            _                  => Err(missing("a number", &token))
        }
    }

    fn parse_vec3(&mut self) -> Result<Vector3f> {
        let x = self.parse_float()?;
        let y = self.parse_float()?;
        let z = self.parse_float()?;

        Ok(Vector3f::new(x, y, z))
    }

    fn parse_matrix(&mut self) -> Result<Transform> {
        self.expect_special("[")?;

        let mut m = [0.0; 16];
        for v in m.iter_mut() {
            *v = self.parse_float()?;
        }

        self.expect_special("]")?;

        Ok(Transform::from_col_slice(&m))
    }

    fn parse_param(&mut self) -> Result<Option<(String, Param)>> {
        if !self.next_is_string()? {
            return Ok(None);
        }

        let header = self.next()?;
        let components: Vec<&str> = header.text.split_whitespace().collect();

        if components.len() != 2 {
            return Err(PbrtError::MalformedParamHeader {
                header: header.text.clone(),
                loc: header.loc.clone()
            });
        }

        let (ty, name) = (components[0], components[1].to_owned());
        let ty = ParamType::from_name(ty).ok_or_else(|| PbrtError::UnknownParamType {
            ty: ty.to_owned(),
            loc: header.loc.clone()
        })?;

        let mut values = Vec::new();
        let first = self.next()?;

        if first.is_special("[") {
            loop {
                let t = self.next()?;

                if t.is_special("]") { break; }
                if t.is_special(",") { continue; }
                if t.kind == TokenKind::Special { return Err(missing("a parameter value", &t)); }

                values.push(t);
            }
        } else if first.kind == TokenKind::Special {
            return Err(missing("a parameter value", &first));
        } else {
            values.push(first);
        }

        let param = match ty {
            ParamType::Texture => {
                let texture = match values.last() {
                    Some(v) => self.lookup_texture(&v.text),
                    None    => None
                };

                Param::texture(texture)
            }
            ParamType::Spectrum => {
                let mut p = Param::new(ty);

                for v in values.iter() {
                    if v.is_string() {
                        self.read_spectrum_file(&v.text, &mut p)?;
                    } else {
                        p.add(&v.text)?;
                    }
                }

                p
            }
            _ => {
                let mut p = Param::new(ty);
                for v in values.iter() {
                    p.add(&v.text)?;
                }

                p
            }
        };

        Ok(Some((name, param)))
    }

    fn lookup_texture(&self, name: &str) -> Option<Arc<Texture>> {
        let t = self.api.named_texture(name);

        if t.is_none() {
            warn!("could not find texture named '{}'", name);
        }

        t
    }

    // Spectrum values given as a string name a file of whitespace
    // separated numbers.
    fn read_spectrum_file(&self, filename: &str, param: &mut Param) -> Result<()> {
        let path = resolve_filename(&self.root_dir, filename);
        debug!("Reading spectrum values from {}", path.display());

        for token in Lexer::open(&path)? {
            param.add(&token?.text)?;
        }

        Ok(())
    }

    fn parse_params(&mut self) -> Result<ParamSet> {
        let mut params = ParamSet::new();

        while let Some((name, p)) = self.parse_param()? {
            params.add(&name, p);
        }

        Ok(params)
    }

    // `<type> params...` as taken by most scene statements.
    fn parse_typed(&mut self, what: &'static str) -> Result<(String, ParamSet)> {
        let ty = self.expect_string(what)?;
        let params = self.parse_params()?;

        Ok((ty, params))
    }

    /// Runs the grammar over the whole input.
    pub fn parse(&mut self) -> Result<()> {
        self.parse_scene()
    }

    fn parse_transform(&mut self, token: &Token) -> Result<bool> {
        match token.text.as_str() {
            "ActiveTransform" => {
                let which = self.next()?;

                match which.text.as_str() {
                    "All"       => self.api.active_transform_all(),
                    "StartTime" => self.api.active_transform_starttime(),
                    "EndTime"   => self.api.active_transform_endtime(),
                    _ => return Err(PbrtError::UnknownActiveTransform {
                        token: which.text.clone(),
                        loc: which.loc.clone()
                    })
                }
            }
            "TransformBegin"    => self.api.transform_begin(),
            "TransformEnd"      => self.api.transform_end(&token.loc)?,
            "Identity"          => self.api.identity(),
            "ReverseOrientation" => self.api.reverse_orientation(),
            "Translate"         => {
                let v = self.parse_vec3()?;
                self.api.translate(&v);
            }
            "Scale"             => {
                let v = self.parse_vec3()?;
                self.api.scale(&v);
            }
            "Rotate"            => {
                let angle = self.parse_float()?;
                let axis = self.parse_vec3()?;
                self.api.rotate(angle, &axis);
            }
            "LookAt"            => {
                let eye = self.parse_vec3()?;
                let look = self.parse_vec3()?;
                let up = self.parse_vec3()?;
                self.api.look_at(&eye, &look, &up);
            }
            "ConcatTransform"   => {
                let m = self.parse_matrix()?;
                self.api.concat_transform(&m);
            }
            "Transform"         => {
                let m = self.parse_affine()?;
                self.api.transform(&m);
            }
            "CoordinateSystem"  => {
                let name = self.expect_string("a coordinate system name")?;
                self.api.coordinate_system(&name);
            }
            "CoordSysTransform" => {
                let name = self.expect_string("a coordinate system name")?;
                self.api.coord_sys_transform(&name);
            }
            "TransformTimes"    => {
                let start = self.parse_float()?;
                let end = self.parse_float()?;
                self.api.transform_times(start, end);
            }
            _ => return Ok(false)
        }

        Ok(true)
    }

    // `[ vx 0 vy 0 vz 0 p 1 ]`: the homogeneous row is checked, not kept.
    fn parse_affine(&mut self) -> Result<Transform> {
        self.expect_special("[")?;

        let mut cols = [Vector3f::zeros(); 4];
        let mut w = [0.0; 4];

        for (c, w) in cols.iter_mut().zip(w.iter_mut()) {
            *c = self.parse_vec3()?;
            *w = self.parse_float()?;
        }

        self.expect_special("]")?;

        if w != [0.0, 0.0, 0.0, 1.0] {
            warn!("Transform: ignoring non-affine bottom row {:?}", w);
        }

        Ok(Transform::from_columns(&cols[0], &cols[1], &cols[2], &cols[3]))
    }

    // Statements legal both before and inside WorldBegin/WorldEnd.
    fn parse_common(&mut self, token: &Token) -> Result<bool> {
        match token.text.as_str() {
            "MakeNamedMedium" => {
                let name = self.expect_string("a medium name")?;
                let params = self.parse_params()?;
                self.api.make_named_medium(&name, params)?;
            }
            "MediumInterface" => {
                let inside = self.expect_string("a medium name")?;
                let outside = if self.next_is_string()? {
                    self.expect_string("a medium name")?
                } else {
                    inside.clone()
                };

                self.api.medium_interface(&inside, &outside);
            }
            _ => return Ok(false)
        }

        Ok(true)
    }

    fn parse_scene(&mut self) -> Result<()> {
        while self.peek(0)?.is_some() {
            let token = self.next()?;

            if token.kind != TokenKind::Literal {
                return Err(unexpected(&token));
            }

            if self.parse_transform(&token)? || self.parse_common(&token)? {
                continue;
            }

            match token.text.as_str() {
                "Camera" => {
                    let (ty, params) = self.parse_typed("a camera type")?;
                    self.api.camera(&ty, params);
                }
                "Sampler" => {
                    let (ty, params) = self.parse_typed("a sampler type")?;
                    self.api.sampler(&ty, params);
                }
                "Integrator" => {
                    let (ty, params) = self.parse_typed("an integrator type")?;
                    self.api.integrator(&ty, params);
                }
                "SurfaceIntegrator" => {
                    let (ty, params) = self.parse_typed("an integrator type")?;
                    self.api.surface_integrator(&ty, params);
                }
                "VolumeIntegrator" => {
                    let (ty, params) = self.parse_typed("an integrator type")?;
                    self.api.volume_integrator(&ty, params);
                }
                "PixelFilter" => {
                    let (ty, params) = self.parse_typed("a filter type")?;
                    self.api.pixel_filter(&ty, params);
                }
                "Film" => {
                    let (ty, params) = self.parse_typed("a film type")?;
                    self.api.film(&ty, params);
                }
                "Accelerator" => {
                    let (ty, params) = self.parse_typed("an accelerator type")?;
                    self.api.accelerator(&ty, params);
                }
                "Renderer" => {
                    let (ty, params) = self.parse_typed("a renderer type")?;
                    self.api.renderer(&ty, params);
                }
                "WorldBegin" => {
                    self.api.world_begin();
                    self.parse_world()?;
                }
                "Material" => return Err(PbrtError::MaterialOutsideWorld(token.loc)),
                _ => return Err(unexpected(&token))
            }
        }

        Ok(())
    }

    fn parse_world(&mut self) -> Result<()> {
        loop {
            let token = self.next()?;

            if token.kind != TokenKind::Literal {
                return Err(unexpected(&token));
            }

            if self.parse_transform(&token)? || self.parse_common(&token)? {
                continue;
            }

            match token.text.as_str() {
                "WorldEnd" => {
                    self.api.world_end();
                    return Ok(());
                }
                "AttributeBegin"     => self.api.attribute_begin(),
                "AttributeEnd"       => self.api.attribute_end(&token.loc)?,
                "LightSource" => {
                    let (ty, params) = self.parse_typed("a light type")?;
                    self.api.light_source(&ty, params);
                }
                "AreaLightSource" => {
                    let (ty, params) = self.parse_typed("a light type")?;
                    self.api.area_light_source(&ty, params);
                }
                "Material" => {
                    let (ty, params) = self.parse_typed("a material type")?;
                    self.api.material(&ty, params);
                }
                "MakeNamedMaterial" => {
                    let name = self.expect_string("a material name")?;
                    let params = self.parse_params()?;
                    self.api.make_named_material(&name, params)?;
                }
                "NamedMaterial" => {
                    let name = self.expect_string("a material name")?;
                    self.api.named_material(&name);
                }
                "Texture" => {
                    let name = self.expect_string("a texture name")?;
                    let texel_type = self.expect_string("a texel type")?;
                    let map_type = self.expect_string("a texture type")?;
                    let params = self.parse_params()?;
                    self.api.texture(&name, &texel_type, &map_type, params);
                }
                "Shape" => {
                    let (ty, params) = self.parse_typed("a shape type")?;
                    self.api.shape(&ty, params);
                }
                "Volume" => {
                    let (ty, params) = self.parse_typed("a volume type")?;
                    self.api.volume(&ty, params);
                }
                "ObjectBegin" => {
                    let name = self.expect_string("an object name")?;
                    self.api.object_begin(&name);
                }
                "ObjectEnd" => self.api.object_end(&token.loc)?,
                "ObjectInstance" => {
                    let name = self.expect_string("an object name")?;
                    self.api.object_instance(&name);
                }
                _ => return Err(unexpected(&token))
            }
        }
    }
}

fn unexpected(token: &Token) -> PbrtError {
    PbrtError::UnexpectedToken { token: token.text.clone(), loc: token.loc.clone() }
}

fn missing(expected: &'static str, token: &Token) -> PbrtError {
    PbrtError::MissingArgument { expected, token: token.text.clone(), loc: token.loc.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Scene> {
        parse_str(text, ".")
    }

    #[test]
    fn param_dispatch() {
        let scene = parse(r#"
            WorldBegin
            Shape "sphere" "float radius" [1.0] "integer n" 3 "bool b" ["true"]
                "string s" "abc" "point3 c" [ 1, 2, 3 ]
            WorldEnd"#).unwrap();

        let shape = &scene.world.shapes[0];
        assert_eq!(shape.get_param_1f("radius", 0.0).unwrap(), 1.0);
        assert_eq!(shape.get_param_1i("n", 0).unwrap(), 3);
        assert!(shape.get_param_bool("b", false).unwrap());
        assert_eq!(shape.get_param_string("s").unwrap(), Some("abc"));
        assert_eq!(shape.get_param_3f("c", Vector3f::zeros()).unwrap(), Vector3f::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn bad_bool_is_fatal() {
        let r = parse(r#"WorldBegin Shape "sphere" "bool b" ["maybe"] WorldEnd"#);
        assert!(matches!(r, Err(PbrtError::InvalidValue { ty: "bool", .. })));
    }

    #[test]
    fn malformed_headers() {
        assert!(matches!(
            parse(r#"WorldBegin Shape "sphere" "float" [1] WorldEnd"#),
            Err(PbrtError::MalformedParamHeader { .. })));
        assert!(matches!(
            parse(r#"WorldBegin Shape "sphere" "quaternion q" [1] WorldEnd"#),
            Err(PbrtError::UnknownParamType { .. })));
    }

    #[test]
    fn texture_lookup_is_soft() {
        let scene = parse(r#"
            WorldBegin
            Texture "checks" "spectrum" "checkerboard" "float uscale" 4
            Material "matte" "texture Kd" "checks" "texture bump" "nothing"
            Shape "sphere"
            WorldEnd"#).unwrap();

        let material = scene.world.shapes[0].material.clone().unwrap();
        let kd = material.get_param_texture("Kd").unwrap().unwrap();
        assert_eq!(kd.name, "checks");
        assert_eq!(kd.get_param_1f("uscale", 1.0).unwrap(), 4.0);
        assert!(material.get_param_texture("bump").unwrap().is_none());
    }

    #[test]
    fn material_outside_world() {
        let r = parse(r#"Material "matte""#);
        assert!(matches!(r, Err(PbrtError::MaterialOutsideWorld(_))));
    }

    #[test]
    fn unexpected_tokens() {
        assert!(matches!(parse("Shape \"sphere\""), Err(PbrtError::UnexpectedToken { .. })));
        assert!(matches!(parse("WorldBegin Bogus WorldEnd"), Err(PbrtError::UnexpectedToken { .. })));
        assert!(matches!(parse("WorldBegin"), Err(PbrtError::UnexpectedEof)));
    }

    #[test]
    fn extra_end_fails_at_the_pop() {
        let r = parse("WorldBegin AttributeBegin AttributeEnd AttributeEnd WorldEnd");
        match r {
            Err(PbrtError::UnbalancedEnd { what, loc }) => {
                assert_eq!(what, "AttributeEnd");
                assert_eq!(loc.col, 40);
            }
            other => panic!("unexpected result {:?}", other.map(|_| ()))
        }

        assert!(matches!(parse("TransformEnd"), Err(PbrtError::UnbalancedEnd { .. })));
        assert!(matches!(parse("WorldBegin ObjectEnd WorldEnd"), Err(PbrtError::UnbalancedEnd { .. })));
    }

    #[test]
    fn instancing() {
        let scene = parse(r#"
            WorldBegin
            ObjectBegin "A"
              Shape "sphere" "float radius" 2
            ObjectEnd
            AttributeBegin
              Translate 1 0 0
              ObjectInstance "A"
            AttributeEnd
            ObjectInstance "A"
            WorldEnd"#).unwrap();

        let instances = &scene.world.instances;
        assert_eq!(instances.len(), 2);
        assert!(Arc::ptr_eq(&instances[0].object, &instances[1].object));
        assert_eq!(instances[0].object.name, "A");
        assert_eq!(instances[0].transform.start().p, Vector3f::new(1.0, 0.0, 0.0));
        assert!(instances[1].transform.start().is_identity());
    }

    #[test]
    fn transform_replaces_ctm() {
        let scene = parse(r#"
            WorldBegin
            Translate 5 5 5
            Transform [ 2 0 0 0  0 2 0 0  0 0 2 0  1 2 3 1 ]
            Shape "sphere"
            WorldEnd"#).unwrap();

        let t = scene.world.shapes[0].transform.start();
        assert_eq!(t.p, Vector3f::new(1.0, 2.0, 3.0));
        assert_eq!(t.vx(), Vector3f::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn reverse_orientation_before_world() {
        let scene = parse(r#"
            ReverseOrientation
            WorldBegin
            Shape "sphere"
            AttributeBegin
            ReverseOrientation
            Shape "sphere"
            AttributeEnd
            WorldEnd"#).unwrap();

        let shapes = &scene.world.shapes;
        assert!(shapes[0].attributes.reverse_orientation);
        assert!(!shapes[1].attributes.reverse_orientation);
    }

    #[test]
    fn named_coordinate_systems() {
        let scene = parse(r#"
            Translate 0 0 -4
            Camera "perspective"
            WorldBegin
            Translate 1 0 0
            CoordinateSystem "moved"
            Identity
            CoordSysTransform "moved"
            Shape "sphere"
            CoordSysTransform "camera"
            Shape "sphere"
            WorldEnd"#).unwrap();

        let shapes = &scene.world.shapes;
        assert_eq!(shapes[0].transform.start().p, Vector3f::new(1.0, 0.0, 0.0));
        assert_eq!(shapes[1].transform.start().p, Vector3f::new(0.0, 0.0, 4.0));
        assert_eq!(scene.cameras.len(), 1);
    }

    #[test]
    fn scene_options_and_times() {
        let scene = parse(r#"
            TransformTimes 0.5 2
            Film "image" "integer xresolution" 640
            Sampler "halton"
            PixelFilter "gaussian"
            Integrator "path"
            Accelerator "bvh"
            WorldBegin WorldEnd"#).unwrap();

        assert_eq!(scene.transform_start_time, 0.5);
        assert_eq!(scene.transform_end_time, 2.0);
        assert_eq!(scene.film.unwrap().get_param_1i("xresolution", 0).unwrap(), 640);
        assert_eq!(scene.sampler.unwrap().ty, "halton");
        assert!(scene.pixel_filter.is_some());
        assert!(scene.integrator.is_some());
    }
}
