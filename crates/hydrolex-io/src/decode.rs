use std::{fs::File, io::{BufReader, Read}, path::PathBuf};

use glam::Vec3;
use thiserror::Error;

use crate::{as_bytes::AsBytes, encode::frame_path, MAGIC};

pub struct FluidDataDecoder {
    /// The path to the directory in which the fluid data resides.
    path: PathBuf,
    num_frames: u64,
    current_frame: u64,
}

impl FluidDataDecoder {
    pub fn new(path: PathBuf) -> FluidDataDecoder {
        Self {
            path,
            num_frames: 0,
            current_frame: 0,
        }
    }

    fn read_value<const N: usize, T: AsBytes<N>, R: Read>(reader: &mut R) -> Result<T, DecodingError> {
        let mut bytes = [0; N];
        reader.read_exact(&mut bytes)?;

        Ok(T::from_bytes(bytes))
    }

    fn read_section<R: Read>(reader: &mut R) -> Result<Vec<Vec3>, DecodingError> {
        let len = Self::read_value::<8, u64, _>(reader)?;
        let mut bytes = Vec::new();
        Read::take(&mut *reader, len.saturating_mul(12)).read_to_end(&mut bytes)?;

        if (bytes.len() as u64) < len.saturating_mul(12) {
            return Err(DecodingError::Truncated);
        }

        Ok(bytes.chunks_exact(12).map(|b| {
            let mut v = [0; 12];
            v.copy_from_slice(b);
            Vec3::from_bytes(v)
        }).collect())
    }

    pub fn decode_metadata(&mut self) -> Result<FluidMetadata, DecodingError> {
        let mut reader = BufReader::new(File::open(self.path.join("_meta"))?);

        let mut magic = [0; 4];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(DecodingError::BadMagic(magic));
        }

        let fps = Self::read_value::<4, u32, _>(&mut reader)?;
        let num_frames = Self::read_value::<8, u64, _>(&mut reader)?;
        let kernel_radius_rate = Self::read_value::<4, f32, _>(&mut reader)?;
        let gravity = Self::read_value::<12, Vec3, _>(&mut reader)?;

        self.num_frames = num_frames;

        Ok(FluidMetadata {
            fps,
            num_frames,
            kernel_radius_rate,
            gravity,
        })
    }

    /// Reads the next frame, or `None` past the last one.
    pub fn decode_frame(&mut self) -> Result<Option<FluidFrameData>, DecodingError> {
        if self.current_frame >= self.num_frames {
            return Ok(None)
        }

        let path = frame_path(&self.path, self.num_frames, self.current_frame);
        let mut reader = BufReader::new(File::open(path)?);

        let positions = Self::read_section(&mut reader)?;
        let velocities = Self::read_section(&mut reader)?;

        self.current_frame += 1;

        Ok(Some(FluidFrameData {
            positions,
            velocities,
        }))
    }

    pub fn reset(&mut self) {
        self.current_frame = 0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluidMetadata {
    pub fps: u32,
    pub num_frames: u64,
    pub kernel_radius_rate: f32,
    pub gravity: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FluidFrameData {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
}

#[derive(Debug, Error)]
pub enum DecodingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not a fluid recording (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("frame section ends early")]
    Truncated,
}
