#[cfg(test)]
mod binary {
    use pbrt_parser::core::scene::Scene;
    use pbrt_parser::pbrtparser::pbrtparser::parse_file;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn scenes_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("scenes")
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pbrt-parser-{}-{}", std::process::id(), name))
    }

    #[test]
    fn save_and_load() {
        let scene = parse_file(scenes_dir().join("root.pbrt"), None).unwrap();
        let out = temp_file("root.pbf");

        let n = scene.save(&out).unwrap();
        assert_eq!(std::fs::metadata(&out).unwrap().len() as usize, n);

        let loaded = Scene::load(&out, None).unwrap();
        std::fs::remove_file(&out).unwrap();

        assert_eq!(loaded.base_path, scene.base_path);
        assert_eq!(loaded.cameras.len(), 1);
        assert_eq!(loaded.cameras[0].transform, scene.cameras[0].transform);
        assert_eq!(loaded.world.shapes.len(), scene.world.shapes.len());
        assert_eq!(loaded.world.light_sources.len(), 1);

        let kd = loaded.world.shapes[0].material.as_ref().unwrap().get_floats("Kd").unwrap();
        assert_eq!(kd.map(|v| v.len()), Some(8));

        // both instances still point at the same object
        let instances = &loaded.world.instances;
        assert_eq!(instances.len(), 2);
        assert!(Arc::ptr_eq(&instances[0].object, &instances[1].object));
        assert_eq!(instances[0].transform, scene.world.instances[0].transform);
    }

    #[test]
    fn load_truncated_file() {
        let scene = parse_file(scenes_dir().join("root.pbrt"), None).unwrap();
        let out = temp_file("truncated.pbf");
        let n = scene.save(&out).unwrap();

        let bytes = std::fs::read(&out).unwrap();
        std::fs::write(&out, &bytes[..n - 3]).unwrap();

        let res = Scene::load(&out, None);
        std::fs::remove_file(&out).unwrap();

        assert!(res.is_err());
    }
}
