use std::path::{Path, PathBuf};
use log::debug;

/// Directory of `path`, without touching the file system. A bare file
/// name lives in the current directory.
pub fn directory_containing<P: AsRef<Path>>(path: P) -> PathBuf {
    path.as_ref()
        .parent()
        .map(|p| p.to_owned())
        .unwrap_or_default()
}

/// Resolves a file name found inside a scene against the root scene
/// directory. Absolute names are kept as they are.
pub fn resolve_filename<P: AsRef<Path>>(root: P, filename: &str) -> PathBuf {
    let p = Path::new(filename);

    if filename.is_empty() || p.is_absolute() {
        return p.to_owned();
    }

    let resolved = root.as_ref().join(p);
    debug!("Resolved \"{}\" to {}", filename, resolved.display());

    resolved
}

pub fn has_extension<P: AsRef<Path>>(name: P, ext: &str) -> bool {
    name
        .as_ref()
        .extension()
        .map(|x| x.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// `name` with `ext` appended unless it already carries it.
pub fn with_extension<P: AsRef<Path>>(name: P, ext: &str) -> PathBuf {
    let name = name.as_ref();

    if has_extension(name, ext) {
        name.to_owned()
    } else {
        let mut s = name.as_os_str().to_owned();
        s.push(".");
        s.push(ext);
        PathBuf::from(s)
    }
}
