#[cfg(test)]
mod parser {
    use pbrt_parser::pbrtparser::pbrtparser::{parse_file, parse_str};
    use pbrt_parser::core::error::PbrtError;
    use pbrt_parser::core::geometry::vector::Point3f;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    fn scenes_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("scenes")
    }

    #[test]
    fn includes_resolve_against_root_dir() {
        let scene = parse_file(scenes_dir().join("root.pbrt"), None).unwrap();

        // sub/nested.pbrt includes frag.pbrt, which lives next to root.pbrt
        assert_eq!(scene.world.light_sources.len(), 1);
        assert_eq!(scene.world.light_sources[0].ty, "point");

        let sphere = &scene.world.shapes[0];
        assert_eq!(sphere.ty, "sphere");
        assert_eq!(sphere.get_param_1f("radius", 0.0).unwrap(), 1.0);
        assert_eq!(sphere.transform.start().p, Point3f::new(1.0, 2.0, 3.0));
        assert_eq!(scene.base_path, scenes_dir());
    }

    #[test]
    fn spectrum_values_from_file() {
        let scene = parse_file(scenes_dir().join("root.pbrt"), None).unwrap();
        let material = scene.world.shapes[0].material.as_ref().unwrap();

        assert_eq!(material.ty, "matte");
        assert_eq!(
            material.get_floats("Kd").unwrap(),
            Some(&[400.0, 0.5, 500.0, 0.5, 600.0, 0.5, 700.0, 0.5][..]));
    }

    #[test]
    fn base_path_overrides_root_dir() {
        let res = parse_file(scenes_dir().join("root.pbrt"), Some(&scenes_dir().join("sub")));
        assert!(res.is_err());
    }

    #[test]
    fn missing_include() {
        let res = parse_str("WorldBegin\nInclude \"does-not-exist.pbrt\"\nWorldEnd", scenes_dir());
        assert!(matches!(res, Err(PbrtError::Open { .. })));
    }

    #[test]
    fn transforms_compose_right_to_left() {
        let scene = parse_str(r#"
            WorldBegin
            Translate 1 2 3
            Rotate 90 0 0 1
            Scale 2 1 1
            Shape "sphere"
            WorldEnd"#, ".").unwrap();

        let p = scene.world.shapes[0].transform.start().transform_point(&Point3f::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 4.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn unbalanced_scopes() {
        for text in &[
            "WorldBegin AttributeEnd WorldEnd",
            "WorldBegin TransformEnd WorldEnd",
            "WorldBegin ObjectEnd WorldEnd"] {
            let res = parse_str(text, ".");
            assert!(matches!(res, Err(PbrtError::UnbalancedEnd { .. })), "{}", text);
        }

        assert!(parse_str("WorldBegin AttributeBegin WorldEnd", ".").is_ok());
    }

    #[test]
    fn camera_and_options() {
        let scene = parse_file(scenes_dir().join("root.pbrt"), None).unwrap();

        assert_eq!(scene.cameras.len(), 1);
        assert_eq!(scene.cameras[0].get_param_1f("fov", 90.0).unwrap(), 45.0);
        assert_eq!(scene.film.as_ref().unwrap().get_param_1i("xresolution", 0).unwrap(), 64);
        assert_eq!(scene.sampler.as_ref().unwrap().ty, "halton");
        assert!(scene.integrator.is_none());
    }
}
