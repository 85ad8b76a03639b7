use crate::core::transform::Transform;
use crate::core::paramset::ParamSet;
use crate::core::geometry::vector::{Point3f, Vector3f, Vector3i};
use crate::core::error::{PbrtError, Result};
use crate::core::fileutil::resolve_filename;
use crate::shapes::triangle::TriangleMesh;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use ply_rs::{parser, ply};
use ply_rs::ply::Property;
use log::{info, warn};

/// Flattened triangle soup read from a PLY file. `normals` is empty when
/// the file has none.
#[derive(Debug, Default, Clone)]
pub struct PlyMesh {
    pub positions   : Vec<Point3f>,
    pub normals     : Vec<Vector3f>,
    pub indices     : Vec<Vector3i>
}

pub fn parse_ply<P: AsRef<Path>>(path: P) -> Result<PlyMesh> {
    let path = path.as_ref();
    let ply_error = |msg: String| PbrtError::Ply { path: path.to_owned(), msg };

    let f = File::open(path).map_err(|source| PbrtError::Open { path: path.to_owned(), source })?;
    let mut reader = BufReader::new(f);

    let vertex_parser = parser::Parser::<Vertex>::new();
    let face_parser = parser::Parser::<Face>::new();
    let skip_parser = parser::Parser::<ply::DefaultElement>::new();

    let header = vertex_parser
        .read_header(&mut reader)
        .map_err(|e| ply_error(e.to_string()))?;

    let mut has_positions = false;
    let mut has_normals = false;
    let mut vertices = None;
    let mut faces = None;

    for (_, elem) in &header.elements {
        match elem.name.as_str() {
            "vertex" => {
                has_positions = ["x", "y", "z"].iter().all(|k| elem.properties.contains_key(*k));
                has_normals = ["nx", "ny", "nz"].iter().all(|k| elem.properties.contains_key(*k));

                vertices = Some(vertex_parser
                    .read_payload_for_element(&mut reader, elem, &header)
                    .map_err(|e| ply_error(e.to_string()))?);
            }
            "face" => {
                faces = Some(face_parser
                    .read_payload_for_element(&mut reader, elem, &header)
                    .map_err(|e| ply_error(e.to_string()))?);
            }
            _ => {
                skip_parser
                    .read_payload_for_element(&mut reader, elem, &header)
                    .map_err(|e| ply_error(e.to_string()))?;
            }
        }
    }

    let vertices = vertices
        .filter(|_| has_positions)
        .ok_or_else(|| ply_error("missing positions in ply".to_owned()))?;
    let faces = faces.ok_or_else(|| ply_error("missing faces in ply".to_owned()))?;

    let mut mesh = PlyMesh {
        positions: vertices.iter().map(|v| v.p).collect(),
        normals: if has_normals { vertices.iter().map(|v| v.n).collect() } else { Vec::new() },
        indices: Vec::with_capacity(faces.len())
    };

    let mut skipped = 0;

    for f in faces.iter() {
        if f.indices.len() < 3 {
            skipped += 1;
            continue;
        }

        for i in 1..f.indices.len() - 1 {
            mesh.indices.push(Vector3i::new(f.indices[0], f.indices[i], f.indices[i + 1]));
        }
    }

    if skipped > 0 {
        warn!("{}: ignored {} faces with fewer than 3 vertices", path.display(), skipped);
    }

    info!(
        "Loaded PLY file {} with {} vertices and {} triangles",
        path.display(), mesh.positions.len(), mesh.indices.len());

    Ok(mesh)
}

pub fn create_plymesh(
    o2w: Transform, reverse_orientation: bool,
    params: &ParamSet, base_path: &Path) -> Result<TriangleMesh> {
    let filename = params.get_param_string("filename")?.unwrap_or("");
    let mesh = parse_ply(resolve_filename(base_path, filename))?;

    Ok(TriangleMesh::new(o2w, reverse_orientation, mesh.positions, mesh.normals, mesh.indices))
}

struct Vertex {
    p   : Point3f,
    n   : Vector3f
}

fn scalar(p: &Property) -> Option<f32> {
    match *p {
        Property::Float(v)  => Some(v),
        Property::Double(v) => Some(v as f32),
        _                   => None
    }
}

impl ply::PropertyAccess for Vertex {
    fn new() -> Self {
        Vertex { p: Point3f::zeros(), n: Vector3f::zeros() }
    }

    fn set_property(&mut self, name: String, property: Property) {
        let v = match scalar(&property) {
            Some(v) => v,
            None    => return
        };

        match name.as_str() {
            "x"     => self.p.x = v,
            "y"     => self.p.y = v,
            "z"     => self.p.z = v,
            "nx"    => self.n.x = v,
            "ny"    => self.n.y = v,
            "nz"    => self.n.z = v,
            _       => {}
        }
    }
}

#[derive(Default)]
struct Face {
    indices: Vec<i32>
}

impl ply::PropertyAccess for Face {
    fn new() -> Self {
        Face::default()
    }

    fn set_property(&mut self, name: String, property: Property) {
        if name != "vertex_indices" && name != "vertex_index" {
            return;
        }

        self.indices = match property {
            Property::ListChar(v)   => v.iter().map(|x| *x as i32).collect(),
            Property::ListUChar(v)  => v.iter().map(|x| *x as i32).collect(),
            Property::ListShort(v)  => v.iter().map(|x| *x as i32).collect(),
            Property::ListUShort(v) => v.iter().map(|x| *x as i32).collect(),
            Property::ListInt(v)    => v,
            Property::ListUInt(v)   => v.iter().map(|x| *x as i32).collect(),
            p => {
                warn!("Face: unexpected property type {:?} for {}", p, name);
                return;
            }
        }
    }
}
