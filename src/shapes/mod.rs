pub mod sphere;
pub mod disk;
pub mod triangle;
pub mod plymesh;
