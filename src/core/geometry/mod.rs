pub mod vector;
pub mod bounds;
