// lints
#![allow(non_snake_case)]

// clippy
#![cfg_attr(
    feature = "cargo-clippy",
    allow(
        clippy::upper_case_acronyms,
        clippy::module_inception,
        clippy::float_cmp
    )
)]

pub mod core;
pub mod pbrtparser;
pub mod binary;
pub mod shapes;
