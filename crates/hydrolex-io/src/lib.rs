use std::io::Write;

use encode::{EncodingError, FluidFrameEncoder};
use hydrolex_fluids::{body::RigidBodies, scene::Scene};

pub mod as_bytes;
pub mod decode;
pub mod encode;

/// Magic bytes opening every recording's metadata file.
pub const MAGIC: [u8; 4] = *b"HLX1";

pub trait EncodeFluid {
    fn encode_state<W: Write>(&self, encoder: &mut FluidFrameEncoder<W>) -> Result<(), EncodingError>;
}

/// A scene together with the bodies holding its fluid particles' state.
pub struct SceneFrame<'a, B> {
    pub scene: &'a Scene,
    pub bodies: &'a B,
}

impl<B: RigidBodies> EncodeFluid for SceneFrame<'_, B> {
    fn encode_state<W: Write>(&self, encoder: &mut FluidFrameEncoder<W>) -> Result<(), EncodingError> {
        let fluid = self.scene.fluid();

        encoder.encode_section(fluid.len(), fluid.iter().map(|e| self.bodies.position(e.body)))?;
        encoder.encode_section(fluid.len(), fluid.iter().map(|e| self.bodies.velocity(e.body)))?;

        Ok(())
    }
}
