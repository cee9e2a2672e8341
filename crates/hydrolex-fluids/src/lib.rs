pub mod body;
pub mod error;
pub mod grid;
pub mod hash;
pub mod lattice;
pub mod particle;
pub mod scene;
pub mod sph;

pub use error::SphError;
