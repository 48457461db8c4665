/// Absolute block position, as carried by the packed `Position` wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

const XZ_BITS: u32 = 26;
const Y_BITS: u32 = 12;
const XZ_MASK: i64 = (1 << XZ_BITS) - 1;
const Y_MASK: i64 = (1 << Y_BITS) - 1;

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Pack into one big-endian long: x in the top 26 bits, then 12 bits of
    /// y, then z in the low 26 bits.
    pub const fn pack(&self) -> i64 {
        ((self.x as i64 & XZ_MASK) << (XZ_BITS + Y_BITS))
            | ((self.y as i64 & Y_MASK) << XZ_BITS)
            | (self.z as i64 & XZ_MASK)
    }

    /// Inverse of [`pack`](Self::pack). Every field is sign-extended.
    pub const fn unpack(packed: i64) -> Self {
        let x = packed >> (XZ_BITS + Y_BITS);
        let y = (packed << XZ_BITS) >> (64 - Y_BITS);
        let z = (packed << (64 - XZ_BITS)) >> (64 - XZ_BITS);
        Self {
            x: x as i32,
            y: y as i32,
            z: z as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_layout() {
        let pos = BlockPos::new(1, 2, 3);
        assert_eq!(pos.pack(), (1 << 38) | (2 << 26) | 3);
    }

    #[test]
    fn negative_coordinates_sign_extend() {
        for pos in [
            BlockPos::new(-1, -1, -1),
            BlockPos::new(-33_554_432, -2048, 33_554_431),
            BlockPos::new(18_357_644, 831, -20_882_616),
            BlockPos::new(0, 64, 0),
        ] {
            assert_eq!(BlockPos::unpack(pos.pack()), pos);
        }
    }
}
