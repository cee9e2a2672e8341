use std::{fs::File, io::{BufWriter, Write}, path::{Path, PathBuf}};

use thiserror::Error;

use hydrolex_fluids::scene::Scene;

use crate::{EncodeFluid, MAGIC};

use super::as_bytes::AsBytes;

pub struct FluidDataEncoder {
    /// The path to the directory into which the fluid data will be placed.
    path: PathBuf,
    num_frames: u64,
    fps: u32,
    current_frame: u64,
}

impl FluidDataEncoder {
    pub fn new(path: PathBuf, num_frames: u64, fps: u32) -> Result<FluidDataEncoder, EncodingError> {
        std::fs::create_dir_all(&path)?;

        Ok(Self {
            path,
            num_frames,
            fps,
            current_frame: 0,
        })
    }

    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encode_metadata(&mut self, scene: &Scene) -> Result<(), EncodingError> {
        let params = scene.params();
        let mut writer = BufWriter::new(File::create(self.path.join("_meta"))?);

        writer.write_all(&MAGIC)?;
        writer.write_all(&self.fps.to_bytes())?;
        writer.write_all(&self.num_frames.to_bytes())?;
        writer.write_all(&params.kernel_radius_rate.to_bytes())?;
        writer.write_all(&params.gravity.to_bytes())?;
        writer.flush()?;

        Ok(())
    }

    pub fn encode_frame<F: EncodeFluid>(&mut self, fluid: &F) -> Result<(), EncodingError> {
        if self.current_frame >= self.num_frames {
            return Err(EncodingError::TooManyFrames(self.num_frames));
        }

        let path = frame_path(&self.path, self.num_frames, self.current_frame);
        let mut encoder = FluidFrameEncoder { writer: BufWriter::new(File::create(path)?) };

        fluid.encode_state(&mut encoder)?;
        encoder.writer.flush()?;

        self.current_frame += 1;

        Ok(())
    }
}

/// Frame file name, zero-padded to the width of the last frame number.
pub(crate) fn frame_path(dir: &Path, num_frames: u64, frame: u64) -> PathBuf {
    let max_digits = num_frames.saturating_sub(1).checked_ilog10().unwrap_or(0) + 1;
    let digits = frame.checked_ilog10().unwrap_or(0) + 1;
    let zeros = max_digits.saturating_sub(digits);

    dir.join(format!("{}{frame}.dat", "0".repeat(zeros as usize)))
}

pub struct FluidFrameEncoder<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FluidFrameEncoder<W> {
    pub fn encode_section<const N: usize, T, I>(&mut self, len: usize, values: I) -> Result<(), EncodingError>
    where
        I: Iterator<Item = T>,
        T: AsBytes<N>,
    {
        self.writer.write_all(&(len as u64).to_bytes())?;

        let bytes: Vec<_> = values.flat_map(|v| v.to_bytes()).collect();
        self.writer.write_all(&bytes)?;

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("recording only holds {0} frames")]
    TooManyFrames(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_padded() {
        let dir = Path::new("out");
        assert_eq!(frame_path(dir, 120, 7), dir.join("007.dat"));
        assert_eq!(frame_path(dir, 120, 119), dir.join("119.dat"));
        assert_eq!(frame_path(dir, 1, 0), dir.join("0.dat"));
        assert_eq!(frame_path(dir, 0, 0), dir.join("0.dat"));
    }
}
