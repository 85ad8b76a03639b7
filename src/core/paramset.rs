use crate::core::pbrt::Float;
use crate::core::error::{PbrtError, Result};
use crate::core::geometry::vector::Vector3f;
use crate::core::scene::Texture;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fmt;
use std::sync::Arc;

/// Declared type of a parameter, as written in `"<type> <name>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Float,
    Integer,
    Bool,
    String,
    Texture,
    Rgb,
    Spectrum,
    Point,
    Point2,
    Point3,
    Normal,
    Color,
    Blackbody,
    Point4,
    Vector,
    Vector2,
    Vector3,
    Normal3,
    Xyz
}

/// How the values of a parameter are stored, independent of its declared
/// type (a `point3` and an `rgb` both hold floats).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Float,
    Integer,
    Bool,
    String,
    Texture
}

// (type, spelling, binary tag)
const PARAM_TYPES: [(ParamType, &str, u8); 19] = [
    (ParamType::Float,      "float",     10),
    (ParamType::Integer,    "integer",   11),
    (ParamType::Bool,       "bool",      12),
    (ParamType::String,     "string",    13),
    (ParamType::Texture,    "texture",   14),
    (ParamType::Rgb,        "rgb",       15),
    (ParamType::Spectrum,   "spectrum",  16),
    (ParamType::Point,      "point",     17),
    (ParamType::Point2,     "point2",    18),
    (ParamType::Point3,     "point3",    19),
    (ParamType::Normal,     "normal",    20),
    (ParamType::Color,      "color",     21),
    (ParamType::Blackbody,  "blackbody", 22),
    (ParamType::Point4,     "point4",    23),
    (ParamType::Vector,     "vector",    24),
    (ParamType::Vector2,    "vector2",   25),
    (ParamType::Vector3,    "vector3",   26),
    (ParamType::Normal3,    "normal3",   27),
    (ParamType::Xyz,        "xyz",       28)
];

impl ParamType {
    pub fn from_name(name: &str) -> Option<Self> {
        PARAM_TYPES.iter().find(|(_, s, _)| *s == name).map(|(t, _, _)| *t)
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        PARAM_TYPES.iter().find(|(_, _, g)| *g == tag).map(|(t, _, _)| *t)
    }

    pub fn name(self) -> &'static str {
        PARAM_TYPES.iter().find(|(t, _, _)| *t == self).map(|(_, s, _)| *s).unwrap_or("unknown")
    }

    pub fn tag(self) -> u8 {
        PARAM_TYPES.iter().find(|(t, _, _)| *t == self).map(|(_, _, g)| *g).unwrap_or(0)
    }

    pub fn kind(self) -> ValueKind {
        match self {
            ParamType::Integer  => ValueKind::Integer,
            ParamType::Bool     => ValueKind::Bool,
            ParamType::String   => ValueKind::String,
            ParamType::Texture  => ValueKind::Texture,
            _                   => ValueKind::Float
        }
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone)]
pub enum ParamValues {
    Float(Vec<Float>),
    Integer(Vec<i32>),
    Bool(Vec<bool>),
    String(Vec<String>),
    Texture(Option<Arc<Texture>>)
}

/// One named parameter: its declared type plus homogeneous values. A
/// texture parameter holds a single (possibly unresolved) texture
/// reference instead of a value list.
#[derive(Debug, Clone)]
pub struct Param {
    ty      : ParamType,
    values  : ParamValues
}

impl Param {
    pub fn new(ty: ParamType) -> Self {
        let values = match ty.kind() {
            ValueKind::Float    => ParamValues::Float(Vec::new()),
            ValueKind::Integer  => ParamValues::Integer(Vec::new()),
            ValueKind::Bool     => ParamValues::Bool(Vec::new()),
            ValueKind::String   => ParamValues::String(Vec::new()),
            ValueKind::Texture  => ParamValues::Texture(None)
        };

        Self { ty, values }
    }

    pub fn texture(texture: Option<Arc<Texture>>) -> Self {
        Self { ty: ParamType::Texture, values: ParamValues::Texture(texture) }
    }

    /// Builds a parameter from already-typed values. The storage has to
    /// match the declared type.
    pub fn with_values(ty: ParamType, values: ParamValues) -> Option<Self> {
        let ok = matches!(
            (ty.kind(), &values),
            (ValueKind::Float, ParamValues::Float(_)) |
            (ValueKind::Integer, ParamValues::Integer(_)) |
            (ValueKind::Bool, ParamValues::Bool(_)) |
            (ValueKind::String, ParamValues::String(_)) |
            (ValueKind::Texture, ParamValues::Texture(_)));

        if ok { Some(Self { ty, values }) } else { None }
    }

    pub fn ty(&self) -> ParamType {
        self.ty
    }

    pub fn values(&self) -> &ParamValues {
        &self.values
    }

    /// Converts one textual token and appends it.
    pub fn add(&mut self, text: &str) -> Result<()> {
        match &mut self.values {
            ParamValues::Float(v) => {
                let f = text.parse::<Float>().map_err(|_| invalid("float", text))?;
                v.push(f);
            }
            ParamValues::Integer(v) => {
                let i = text.parse::<i32>().map_err(|_| invalid("integer", text))?;
                v.push(i);
            }
            ParamValues::Bool(v) => match text {
                "true"  => v.push(true),
                "false" => v.push(false),
                _       => return Err(invalid("bool", text))
            },
            ParamValues::String(v) => v.push(text.to_owned()),
            ParamValues::Texture(_) => return Err(invalid("texture", text))
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        match &self.values {
            ParamValues::Float(v)   => v.len(),
            ParamValues::Integer(v) => v.len(),
            ParamValues::Bool(v)    => v.len(),
            ParamValues::String(v)  => v.len(),
            ParamValues::Texture(_) => 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn invalid(ty: &'static str, text: &str) -> PbrtError {
    PbrtError::InvalidValue { ty, value: text.to_owned() }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;

        match &self.values {
            ParamValues::Float(v)   => v.iter().try_for_each(|x| write!(f, " {}", x))?,
            ParamValues::Integer(v) => v.iter().try_for_each(|x| write!(f, " {}", x))?,
            ParamValues::Bool(v)    => v.iter().try_for_each(|x| write!(f, " \"{}\"", x))?,
            ParamValues::String(v)  => v.iter().try_for_each(|x| write!(f, " \"{}\"", x))?,
            ParamValues::Texture(t) => match t {
                Some(t) => write!(f, " \"{}\"", t.name)?,
                None    => write!(f, " <null>")?
            }
        }

        write!(f, " ]")
    }
}

macro_rules! typed_values {
    ($x:ident, $variant:ident, $t:ty, $expected:expr) => {
        /// All values of the named parameter, or `None` if it isn't set.
        pub fn $x(&self, name: &str) -> Result<Option<&[$t]>> {
            match self.params.get(name) {
                None => Ok(None),
                Some(p) => match &p.values {
                    ParamValues::$variant(v) => Ok(Some(v.as_slice())),
                    _ => Err(PbrtError::ParamType {
                        name: name.to_owned(),
                        expected: $expected,
                        found: p.ty.to_string()
                    })
                }
            }
        }
    }
}

macro_rules! find_one {
    ($x:ident, $values:ident, $t:ty) => {
        pub fn $x(&self, name: &str, fallback: $t) -> Result<$t> {
            match self.$values(name)? {
                None => Ok(fallback),
                Some(v) if v.len() == 1 => Ok(v[0].clone()),
                Some(v) => Err(arity(name, "1", v.len()))
            }
        }
    }
}

fn arity(name: &str, expected: &str, found: usize) -> PbrtError {
    PbrtError::ParamArity { name: name.to_owned(), expected: expected.to_owned(), found }
}

/// Named parameter bag carried by every scene graph node.
#[derive(Debug, Default, Clone)]
pub struct ParamSet {
    pub params: BTreeMap<String, Param>
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `param`, replacing an earlier parameter of the same name.
    pub fn add(&mut self, name: &str, param: Param) {
        self.params.insert(name.to_owned(), param);
    }

    pub fn find(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Param)> {
        self.params.iter()
    }

    typed_values!(get_floats, Float, Float, "a float array");
    typed_values!(get_ints, Integer, i32, "integer");
    typed_values!(get_bools, Bool, bool, "bool");
    typed_values!(get_strings, String, String, "string");

    find_one!(get_param_1f, get_floats, Float);
    find_one!(get_param_1i, get_ints, i32);
    find_one!(get_param_bool, get_bools, bool);

    pub fn has_param_1f(&self, name: &str) -> bool {
        matches!(self.get_floats(name), Ok(Some(v)) if v.len() == 1)
    }

    pub fn has_param_1i(&self, name: &str) -> bool {
        matches!(self.get_ints(name), Ok(Some(v)) if v.len() == 1)
    }

    pub fn has_param_bool(&self, name: &str) -> bool {
        matches!(self.get_bools(name), Ok(Some(v)) if v.len() == 1)
    }

    pub fn has_param_string(&self, name: &str) -> bool {
        matches!(self.get_strings(name), Ok(Some(v)) if v.len() == 1)
    }

    pub fn has_param_3f(&self, name: &str) -> bool {
        matches!(self.get_floats(name), Ok(Some(v)) if v.len() == 3)
    }

    pub fn has_param_texture(&self, name: &str) -> bool {
        matches!(self.params.get(name), Some(p) if p.ty == ParamType::Texture)
    }

    pub fn find_param_2f(&self, name: &str) -> Result<Option<[Float; 2]>> {
        match self.get_floats(name)? {
            None => Ok(None),
            Some(v) if v.len() == 2 => Ok(Some([v[0], v[1]])),
            Some(v) => Err(arity(name, "2", v.len()))
        }
    }

    pub fn get_param_2f(&self, name: &str, fallback: [Float; 2]) -> Result<[Float; 2]> {
        Ok(self.find_param_2f(name)?.unwrap_or(fallback))
    }

    pub fn find_param_3f(&self, name: &str) -> Result<Option<Vector3f>> {
        match self.get_floats(name)? {
            None => Ok(None),
            Some(v) if v.len() == 3 => Ok(Some(Vector3f::new(v[0], v[1], v[2]))),
            Some(v) => Err(arity(name, "3", v.len()))
        }
    }

    pub fn get_param_3f(&self, name: &str, fallback: Vector3f) -> Result<Vector3f> {
        Ok(self.find_param_3f(name)?.unwrap_or(fallback))
    }

    /// The single string value of `name`, `None` if the parameter is absent.
    pub fn get_param_string(&self, name: &str) -> Result<Option<&str>> {
        match self.get_strings(name)? {
            None => Ok(None),
            Some(v) if v.len() == 1 => Ok(Some(v[0].as_str())),
            Some(v) => Err(arity(name, "1", v.len()))
        }
    }

    /// The texture referenced by `name`. Absent parameters and texture
    /// names that couldn't be resolved while parsing both give `None`.
    pub fn get_param_texture(&self, name: &str) -> Result<Option<Arc<Texture>>> {
        match self.params.get(name) {
            None => Ok(None),
            Some(p) => match &p.values {
                ParamValues::Texture(t) => Ok(t.clone()),
                _ => Err(PbrtError::ParamType {
                    name: name.to_owned(),
                    expected: "texture",
                    found: p.ty.to_string()
                })
            }
        }
    }

    /// A float array read as consecutive pairs; the value count must be even.
    pub fn get_param_pair_nf(&self, name: &str) -> Result<Option<Vec<(Float, Float)>>> {
        match self.get_floats(name)? {
            None => Ok(None),
            Some(v) if v.len() % 2 == 0 => Ok(Some(v.chunks(2).map(|c| (c[0], c[1])).collect())),
            Some(v) => Err(arity(name, "an even number of", v.len()))
        }
    }
}

impl Display for ParamSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (name, p) in self.params.iter() {
            write!(f, " \"{} {}\" {}", p.ty, name, p)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(ty: ParamType, values: &[&str]) -> Param {
        let mut p = Param::new(ty);
        for v in values {
            p.add(v).unwrap();
        }

        p
    }

    #[test]
    fn typed_lookups() {
        let mut ps = ParamSet::new();
        ps.add("radius", param(ParamType::Float, &["2.5"]));
        ps.add("n", param(ParamType::Integer, &["3"]));
        ps.add("on", param(ParamType::Bool, &["true"]));
        ps.add("Kd", param(ParamType::Rgb, &["0.1", "0.2", "0.3"]));
        ps.add("filename", param(ParamType::String, &["a.ply"]));

        assert_eq!(ps.get_param_1f("radius", 1.0).unwrap(), 2.5);
        assert_eq!(ps.get_param_1f("missing", 1.0).unwrap(), 1.0);
        assert_eq!(ps.get_param_1i("n", 0).unwrap(), 3);
        assert!(ps.get_param_bool("on", false).unwrap());
        assert_eq!(ps.get_param_3f("Kd", Vector3f::zeros()).unwrap(), Vector3f::new(0.1, 0.2, 0.3));
        assert_eq!(ps.get_param_string("filename").unwrap(), Some("a.ply"));
        assert_eq!(ps.get_param_string("nothing").unwrap(), None);
        assert!(ps.has_param_3f("Kd"));
        assert!(!ps.has_param_1f("Kd"));
    }

    #[test]
    fn mismatches_fail_even_with_fallback() {
        let mut ps = ParamSet::new();
        ps.add("Kd", param(ParamType::Color, &["0.1", "0.2", "0.3"]));
        ps.add("n", param(ParamType::Integer, &["1", "2"]));

        assert!(matches!(ps.get_param_1f("Kd", 0.0), Err(PbrtError::ParamArity { .. })));
        assert!(matches!(ps.get_param_1f("n", 0.0), Err(PbrtError::ParamType { .. })));
        assert!(matches!(ps.get_param_1i("n", 0), Err(PbrtError::ParamArity { .. })));
        assert!(ps.get_param_texture("Kd").is_err());
    }

    #[test]
    fn bool_accepts_only_true_and_false() {
        let mut p = Param::new(ParamType::Bool);
        assert!(p.add("false").is_ok());
        assert!(matches!(p.add("maybe"), Err(PbrtError::InvalidValue { .. })));
        assert!(Param::new(ParamType::Integer).add("1.5").is_err());
    }

    #[test]
    fn pairs() {
        let mut ps = ParamSet::new();
        ps.add("uv", param(ParamType::Float, &["0", "1", "2", "3"]));
        ps.add("odd", param(ParamType::Float, &["0", "1", "2"]));

        assert_eq!(ps.get_param_pair_nf("uv").unwrap(), Some(vec![(0.0, 1.0), (2.0, 3.0)]));
        assert!(ps.get_param_pair_nf("odd").is_err());
    }

    #[test]
    fn type_table() {
        for name in &["float", "color", "blackbody", "rgb", "spectrum", "integer", "bool",
                      "texture", "normal", "point", "point2", "point3", "point4", "vector", "string"] {
            let ty = ParamType::from_name(name).unwrap();
            assert_eq!(ty.name(), *name);
            assert_eq!(ParamType::from_tag(ty.tag()), Some(ty));
        }

        assert_eq!(ParamType::from_name("quaternion"), None);
    }
}
