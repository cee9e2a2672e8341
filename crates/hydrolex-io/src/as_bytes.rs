use glam::Vec3;

/// Fixed-size little-endian encoding of recorded values.
pub trait AsBytes<const N: usize> {
    fn from_bytes(b: [u8; N]) -> Self;

    fn to_bytes(self) -> [u8; N];
}

impl AsBytes<4> for u32 {
    fn from_bytes(b: [u8; 4]) -> Self {
        u32::from_le_bytes(b)
    }

    fn to_bytes(self) -> [u8; 4] {
        self.to_le_bytes()
    }
}

impl AsBytes<8> for u64 {
    fn from_bytes(b: [u8; 8]) -> Self {
        u64::from_le_bytes(b)
    }

    fn to_bytes(self) -> [u8; 8] {
        self.to_le_bytes()
    }
}

impl AsBytes<4> for f32 {
    fn from_bytes(b: [u8; 4]) -> Self {
        f32::from_le_bytes(b)
    }

    fn to_bytes(self) -> [u8; 4] {
        self.to_le_bytes()
    }
}

impl AsBytes<12> for Vec3 {
    fn from_bytes(b: [u8; 12]) -> Self {
        let mut axes = [0.0; 3];
        for (axis, chunk) in axes.iter_mut().zip(b.chunks_exact(4)) {
            *axis = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        Vec3::from_array(axes)
    }

    fn to_bytes(self) -> [u8; 12] {
        let mut b = [0; 12];
        for (chunk, axis) in b.chunks_exact_mut(4).zip(self.to_array()) {
            chunk.copy_from_slice(&axis.to_bytes());
        }

        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_layout_is_xyz_little_endian() {
        let b = Vec3::new(1.0, -2.0, 0.5).to_bytes();
        assert_eq!(&b[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&b[4..8], &(-2.0f32).to_le_bytes());
        assert_eq!(&b[8..12], &0.5f32.to_le_bytes());
        assert_eq!(Vec3::from_bytes(b), Vec3::new(1.0, -2.0, 0.5));
    }
}
