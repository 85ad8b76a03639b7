pub mod geometry;
pub mod pbrt;
pub mod error;
pub mod transform;
pub mod paramset;
pub mod fileutil;
pub mod scene;
pub mod api;
pub mod shape;
pub mod stats;
