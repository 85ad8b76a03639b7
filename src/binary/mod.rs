//! Binary scene files (`.pbf`): a header followed by one block per unique
//! scene graph node, dependencies first, the scene itself last.

pub mod entity;
pub mod writer;
pub mod reader;

use crate::core::error::Result;
use crate::core::scene::Scene;
use self::reader::BinaryReader;
use self::writer::BinaryWriter;
use anyhow::Context;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use log::info;

pub const FORMAT_MAJOR: i32 = 1;
pub const FORMAT_MINOR: i32 = 0;
pub const FORMAT_TAG: i32 = (FORMAT_MAJOR << 16) + FORMAT_MINOR;

/// Writes `scene` to `out` and returns the number of bytes written.
pub fn write_scene<W: Write>(scene: &Scene, out: W) -> Result<usize> {
    let mut writer = BinaryWriter::new(out)?;
    writer.serialize(Some(&Arc::new(scene.clone())))?;
    writer.flush()?;

    Ok(writer.bytes_written())
}

pub fn read_scene<R: Read>(input: R) -> Result<Scene> {
    BinaryReader::new(input).read_scene()
}

pub fn write_binary<P: AsRef<Path>>(scene: &Scene, path: P) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("could not create \"{}\"", path.display()))?;
    let n = write_scene(scene, BufWriter::new(f))
        .with_context(|| format!("failed to write \"{}\"", path.display()))?;

    info!("Wrote {} bytes to {}", n, path.display());

    Ok(n)
}

pub fn read_binary<P: AsRef<Path>>(path: P) -> anyhow::Result<Scene> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("could not open \"{}\"", path.display()))?;
    let scene = read_scene(BufReader::new(f))
        .with_context(|| format!("failed to read \"{}\"", path.display()))?;

    info!("Read binary scene {}", path.display());

    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::PbrtError;
    use crate::pbrtparser::pbrtparser::parse_str;
    use byteorder::{NativeEndian, WriteBytesExt};
    use std::cell::Cell;
    use std::sync::Once;

    const SHARED: &str = r#"
        WorldBegin
        Texture "checks" "spectrum" "checkerboard"
        Material "matte" "texture Kd" "checks"
        Shape "sphere" "float radius" 1
        Shape "sphere" "float radius" 2
        WorldEnd"#;

    #[test]
    fn shared_nodes_are_written_once() {
        let scene = parse_str(SHARED, ".").unwrap();
        let mut writer = BinaryWriter::new(Vec::new()).unwrap();
        writer.serialize(Some(&Arc::new(scene))).unwrap();

        // texture, material, attributes shared by the shapes, 2 shapes,
        // world, scene
        assert_eq!(writer.num_entities(), 7);
    }

    // `n` named materials, each with its own texture, declared in descending
    // name order so no map is ever written in declaration order.
    fn many_named(n: usize) -> String {
        let mut text = String::from("WorldBegin\n");
        for i in (0..n).rev() {
            text.push_str(&format!("Texture \"t{:06}\" \"float\" \"constant\" \"float value\" {}\n", i, i));
            text.push_str(&format!(
                "MakeNamedMaterial \"m{:06}\" \"string type\" \"matte\" \"texture sigma\" \"t{:06}\"\n", i, i));
        }
        text.push_str("NamedMaterial \"m000000\"\nShape \"sphere\"\nWorldEnd\n");
        text
    }

    #[test]
    fn block_count_is_linear_in_named_entities() {
        for &n in [10, 100, 1000].iter() {
            let scene = parse_str(&many_named(n), ".").unwrap();
            let mut writer = BinaryWriter::new(Vec::new()).unwrap();
            writer.serialize(Some(&Arc::new(scene))).unwrap();

            // one block per texture and material, then attributes, shape,
            // world, scene
            assert_eq!(writer.num_entities(), 2 * n + 4);
        }
    }

    #[test]
    fn descending_named_materials_round_trip() {
        let n = 5000;
        let scene = parse_str(&many_named(n), ".").unwrap();

        let mut small = Vec::new();
        write_scene(&parse_str(&many_named(n / 2), ".").unwrap(), &mut small).unwrap();
        let mut buf = Vec::new();
        write_scene(&scene, &mut buf).unwrap();
        assert!(buf.len() < 3 * small.len());

        let back = read_scene(buf.as_slice()).unwrap();
        let shape = &back.world.shapes[0];
        assert_eq!(shape.attributes.named_material.len(), n);
        assert_eq!(shape.attributes.named_texture.len(), n);
        assert_eq!(shape.material.as_ref().unwrap().name, "m000000");

        let m = &shape.attributes.named_material["m004999"];
        let t = m.get_param_texture("sigma").unwrap().unwrap();
        assert!(Arc::ptr_eq(&t, &shape.attributes.named_texture["t004999"]));
        assert_eq!(t.get_param_1f("value", 0.0).unwrap(), 4999.0);
    }

    #[test]
    fn round_trip_keeps_sharing() {
        let scene = parse_str(SHARED, ".").unwrap();
        let mut buf = Vec::new();
        let n = write_scene(&scene, &mut buf).unwrap();
        assert_eq!(n, buf.len());

        let back = read_scene(buf.as_slice()).unwrap();
        let shapes = &back.world.shapes;
        assert_eq!(shapes.len(), 2);

        let m0 = shapes[0].material.clone().unwrap();
        let m1 = shapes[1].material.clone().unwrap();
        assert!(Arc::ptr_eq(&m0, &m1));
        assert!(Arc::ptr_eq(&shapes[0].attributes, &shapes[1].attributes));
        assert_eq!(m0.get_param_texture("Kd").unwrap().unwrap().name, "checks");
        assert_eq!(shapes[1].get_param_1f("radius", 0.0).unwrap(), 2.0);
    }

    fn block(buf: &mut Vec<u8>, tag: i32, payload: &[u8]) {
        buf.write_u64::<NativeEndian>(payload.len() as u64).unwrap();
        buf.write_i32::<NativeEndian>(tag).unwrap();
        buf.extend_from_slice(payload);
    }

    // An empty world at handle `world`, then the scene.
    fn minimal_scene(buf: &mut Vec<u8>, world: i32) {
        let mut object = Vec::new();
        object.write_i32::<NativeEndian>(4).unwrap();
        object.extend_from_slice(b"root");
        for _ in 0..4 {
            object.write_u64::<NativeEndian>(0).unwrap();
        }
        block(buf, entity::tags::OBJECT, &object);

        let mut scene = Vec::new();
        scene.write_u64::<NativeEndian>(0).unwrap();
        for _ in 0..6 {
            scene.write_i32::<NativeEndian>(-1).unwrap();
        }
        scene.write_i32::<NativeEndian>(world).unwrap();
        scene.write_i32::<NativeEndian>(0).unwrap();
        scene.write_f32::<NativeEndian>(0.0).unwrap();
        scene.write_f32::<NativeEndian>(1.0).unwrap();
        block(buf, entity::tags::SCENE, &scene);
    }

    #[test]
    fn unknown_blocks_become_placeholders() {
        let mut buf = Vec::new();
        buf.write_i32::<NativeEndian>(FORMAT_TAG).unwrap();
        block(&mut buf, 9999, &[1, 2, 3]);
        minimal_scene(&mut buf, 1);

        let scene = read_scene(buf.as_slice()).unwrap();
        assert_eq!(scene.world.name, "root");
        assert_eq!(scene.transform_end_time, 1.0);

        // a reference to the placeholder itself can't be a required object
        let mut buf = Vec::new();
        buf.write_i32::<NativeEndian>(FORMAT_TAG).unwrap();
        block(&mut buf, 9999, &[]);
        minimal_scene(&mut buf, 0);
        assert!(matches!(read_scene(buf.as_slice()), Err(PbrtError::EntityType { id: 0, .. })));
    }

    #[test]
    fn wrong_entity_type_is_an_error() {
        let mut buf = Vec::new();
        buf.write_i32::<NativeEndian>(FORMAT_TAG).unwrap();
        minimal_scene(&mut buf, 0);
        // the second scene's world points at the first scene block
        minimal_scene(&mut buf, 1);

        assert!(matches!(
            read_scene(buf.as_slice()),
            Err(PbrtError::EntityType { id: 1, expected: "Object" })));
    }

    // Counts the format version warnings logged on the current thread.
    struct VersionWarnings;

    thread_local!(static VERSION_WARNINGS: Cell<usize> = Cell::new(0));

    impl log::Log for VersionWarnings {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record) {
            if record.level() == log::Level::Warn && record.args().to_string().contains("format version") {
                VERSION_WARNINGS.with(|n| n.set(n.get() + 1));
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: VersionWarnings = VersionWarnings;
    static INIT_LOGGER: Once = Once::new();

    fn version_warnings(buf: &[u8]) -> usize {
        INIT_LOGGER.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(log::LevelFilter::Warn);
        });

        VERSION_WARNINGS.with(|n| n.set(0));
        assert!(read_scene(buf).is_ok());
        VERSION_WARNINGS.with(|n| n.get())
    }

    #[test]
    fn version_mismatch_is_tolerated() {
        let mut buf = Vec::new();
        write_scene(&Scene::default(), &mut buf).unwrap();
        assert_eq!(version_warnings(&buf), 0);

        for &(tag, warnings) in [(FORMAT_TAG + 3, 1), ((FORMAT_MAJOR + 1) << 16, 2)].iter() {
            let mut other = buf.clone();
            other[..4].copy_from_slice(&tag.to_ne_bytes());
            assert_eq!(version_warnings(&other), warnings);
        }
    }

    #[test]
    fn bad_handles() {
        let mut buf = Vec::new();
        buf.write_i32::<NativeEndian>(FORMAT_TAG).unwrap();
        minimal_scene(&mut buf, 7);

        assert!(matches!(read_scene(buf.as_slice()), Err(PbrtError::InvalidHandle { id: 7, .. })));
    }

    #[test]
    fn empty_stream_has_no_scene() {
        let mut buf = Vec::new();
        buf.write_i32::<NativeEndian>(FORMAT_TAG).unwrap();

        assert!(matches!(read_scene(buf.as_slice()), Err(PbrtError::NoScene)));
        assert!(matches!(read_scene(&buf[..2]), Err(PbrtError::TruncatedFile)));
    }

    #[test]
    fn truncated_block() {
        let mut buf = Vec::new();
        write_scene(&Scene::default(), &mut buf).unwrap();
        buf.pop();

        assert!(matches!(read_scene(buf.as_slice()), Err(PbrtError::TruncatedFile)));
    }
}
