//! CRC validation for Ogg pages.
//!
//! Ogg uses a non-reflected CRC-32 with polynomial `0x04C11DB7`, a zero
//! initial value and no final xor. The checksum covers the whole page with
//! the CRC field itself set to zero.

/// CRC algorithm specification with polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-32 algorithm used by the Ogg page header.
pub const CRC_OGG_PAGE_ALG: Algorithm<u32> = Algorithm {
    poly: 0x04c1_1db7,
    init: 0x0000_0000,
};

/// Byte offset of the CRC field inside a page header.
pub const CRC_FIELD_OFFSET: usize = 22;

/// Computes CRC-32 of a single byte value shifted into the top of the register.
#[inline(always)]
pub const fn crc32(poly: u32, value: u8) -> u32 {
    let mut crc = (value as u32) << 24;

    let mut i = 0;
    while i < 8 {
        crc = (crc << 1) ^ (((crc >> 31) & 1) * poly);
        i += 1;
    }

    crc
}

#[inline(always)]
const fn crc32_table(poly: u32) -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc32(poly, i as u8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc32 {
    pub poly: u32,
    pub init: u32,
    table: [u32; 256],
}

impl Crc32 {
    pub const fn new(algorithm: &Algorithm<u32>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc32_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u32) -> u32 {
        self.table[(index & 0xFF) as usize]
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u32, bytes: &[u8]) -> u32 {
        let mut i = 0;

        while i < bytes.len() {
            crc = (crc << 8) ^ self.table_entry((crc >> 24) ^ bytes[i] as u32);
            i += 1;
        }

        crc
    }

    /// Checksum of a serialized page, treating the CRC field as zero.
    pub fn page_checksum(&self, header: &[u8], body: &[u8]) -> u32 {
        let crc = self.update(self.init, &header[..CRC_FIELD_OFFSET]);
        let crc = self.update(crc, &[0; 4]);
        let crc = self.update(crc, &header[CRC_FIELD_OFFSET + 4..]);

        self.update(crc, body)
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new(&CRC_OGG_PAGE_ALG)
    }
}

#[test]
fn crc32_reference_values() {
    let crc = Crc32::default();

    assert_eq!(crc.table[1], 0x04c1_1db7);
    assert_eq!(crc.update(crc.init, &[]), 0);
    // CRC-32/MPEG-2 shares the polynomial but starts from all ones.
    assert_eq!(crc.update(0xFFFF_FFFF, b"123456789"), 0x0376_e6e7);
}
