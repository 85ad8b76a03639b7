#[cfg(test)]
mod fileutil {
    use pbrt_parser::core::fileutil::{has_extension, with_extension, resolve_filename, directory_containing};
    use std::path::{Path, PathBuf};

    #[test]
    fn has_extention() {
        assert!(has_extension("foo.pbrt", "pbrt"));
        assert!(has_extension("foo.PBF", "pbf"));
        assert!(has_extension("dir.d/foo.ply", "ply"));
        assert!(!has_extension("foo.pbrt.gz", "pbrt"));
        assert!(!has_extension("pbrt", "pbrt"));
    }

    #[test]
    fn with_extention() {
        assert_eq!(with_extension("out", "pbf"), PathBuf::from("out.pbf"));
        assert_eq!(with_extension("out.pbf", "pbf"), PathBuf::from("out.pbf"));
        assert_eq!(with_extension("out.pbrt", "pbf"), PathBuf::from("out.pbrt.pbf"));
    }

    #[test]
    fn resolve() {
        assert_eq!(resolve_filename("scenes", "geometry/a.ply"), PathBuf::from("scenes/geometry/a.ply"));
        assert_eq!(resolve_filename("scenes", "/abs/a.ply"), PathBuf::from("/abs/a.ply"));
        assert_eq!(directory_containing("scenes/a.pbrt"), PathBuf::from("scenes"));
        assert_eq!(directory_containing("a.pbrt"), Path::new(""));
    }
}
