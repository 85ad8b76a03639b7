use std::path::PathBuf;

pub type Float = f32;

pub const PI: Float = 3.14159265358979323846;

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub base_path       : Option<PathBuf>,
    pub lint            : bool,
    pub single_level    : bool,
    pub outfile         : Option<PathBuf>,
    pub nthreads        : usize
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }
}

#[inline(always)]
pub fn radians(deg: Float) -> Float {
    (PI / 180.0) as Float * deg
}

pub fn clamp<T>(val: T, low: T, high: T) -> T
where T: PartialOrd
{
    if val < low {
        low
    } else if val > high {
        high
    } else {
        val
    }
}

/// Formats large counts the way scene statistics are usually read,
/// e.g. `12.3M` or `4.56K`.
pub fn pretty_number(n: usize) -> String {
    let f = n as f64;

    if f >= 1e9 {
        format!("{:.2}G", f / 1e9)
    } else if f >= 1e6 {
        format!("{:.2}M", f / 1e6)
    } else if f >= 1e3 {
        format!("{:.2}K", f / 1e3)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_numbers() {
        assert_eq!(pretty_number(12), "12");
        assert_eq!(pretty_number(1500), "1.50K");
        assert_eq!(pretty_number(2_340_000), "2.34M");
    }
}
