use std::fmt;

use rangemap::RangeInclusiveMap;
use thiserror::Error;

/// Size of the modelled address window.
pub const ADDRESS_SPACE_SIZE: usize = 0x1_0000;

const ADDRESS_MASK: u32 = 0xFFFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("image of {0} bytes does not fit in the {1}-byte address space")]
    ImageTooLarge(usize, usize),
}

pub type Result<T> = std::result::Result<T, MemoryError>;

/// Byte-addressed big-endian storage.
///
/// Addresses wider than 16 bits are truncated, one byte at a time, so a
/// multi-byte access that runs off the end of the window wraps to 0x0000.
pub trait Memory {
    fn read(&self, address: u32, length: usize) -> Vec<u8>;
    fn write(&mut self, address: u32, bytes: &[u8]);

    fn read_u8(&self, address: u32) -> u8 {
        self.read(address, 1)[0]
    }

    fn read_u16(&self, address: u32) -> u16 {
        let bytes = self.read(address, 2);
        u16::from_be_bytes([bytes[0], bytes[1]])
    }

    fn read_u32(&self, address: u32) -> u32 {
        let bytes = self.read(address, 4);
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn write_u8(&mut self, address: u32, value: u8) {
        self.write(address, &[value]);
    }

    fn write_u16(&mut self, address: u32, value: u16) {
        self.write(address, &value.to_be_bytes());
    }

    fn write_u32(&mut self, address: u32, value: u32) {
        self.write(address, &value.to_be_bytes());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    Rom,
    Mmio,
    Ram,
    Unmapped,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Region::Rom => "ROM",
            Region::Mmio => "MMIO",
            Region::Ram => "RAM",
            Region::Unmapped => "unmapped",
        })
    }
}

/// The documented layout of the low 64K window. Nothing enforces it; it only
/// labels addresses for diagnostics.
#[derive(Clone, Debug)]
pub struct MemoryMap {
    regions: RangeInclusiveMap<u16, Region>,
}

impl Default for MemoryMap {
    fn default() -> Self {
        let mut regions = RangeInclusiveMap::new();
        regions.insert(0x0000..=0xBFFF, Region::Rom);
        regions.insert(0xF020..=0xF0FF, Region::Mmio);
        regions.insert(0xF780..=0xFF7F, Region::Ram);
        regions.insert(0xFF80..=0xFFFF, Region::Mmio);
        Self { regions }
    }
}

impl MemoryMap {
    pub fn region(&self, address: u32) -> Region {
        let address = (address & ADDRESS_MASK) as u16;
        self.regions
            .get(&address)
            .copied()
            .unwrap_or(Region::Unmapped)
    }
}

/// Flat 64 KiB store backing ROM, RAM and device registers alike.
#[derive(Clone)]
pub struct AddressSpace {
    buffer: Vec<u8>,
    map: MemoryMap,
}

impl fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("size", &self.buffer.len())
            .finish()
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for AddressSpace {
    fn read(&self, address: u32, length: usize) -> Vec<u8> {
        (0..length)
            .map(|offset| self.buffer[Self::index(address, offset)])
            .collect()
    }

    fn write(&mut self, address: u32, bytes: &[u8]) {
        tracing::trace!("write {} bytes at 0x{:04X}", bytes.len(), address & ADDRESS_MASK);
        for (offset, byte) in bytes.iter().enumerate() {
            self.buffer[Self::index(address, offset)] = *byte;
        }
    }
}

impl AddressSpace {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; ADDRESS_SPACE_SIZE],
            map: MemoryMap::default(),
        }
    }

    fn index(address: u32, offset: usize) -> usize {
        (address.wrapping_add(offset as u32) & ADDRESS_MASK) as usize
    }

    /// Clears the window and copies `image` to address 0.
    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        if image.len() > ADDRESS_SPACE_SIZE {
            return Err(MemoryError::ImageTooLarge(image.len(), ADDRESS_SPACE_SIZE));
        }
        self.buffer.fill(0);
        self.buffer[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn region(&self, address: u32) -> Region {
        self.map.region(address)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn multi_byte_access_is_big_endian() {
        let mut memory = AddressSpace::new();
        memory.write_u32(0x1000, 0x1234_5678);
        assert_eq!(memory.read(0x1000, 4), vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(memory.read_u16(0x1000), 0x1234);
        assert_eq!(memory.read_u16(0x1002), 0x5678);
        assert_eq!(memory.read_u8(0x1003), 0x78);

        memory.write_u16(0x2001, 0xBEEF);
        assert_eq!(memory.read_u8(0x2001), 0xBE);
        assert_eq!(memory.read_u8(0x2002), 0xEF);
    }

    #[test]
    fn wide_addresses_are_truncated() {
        let mut memory = AddressSpace::new();
        memory.write_u8(0x00FF_FF12, 0xAA);
        assert_eq!(memory.read_u8(0xFF12), 0xAA);
        assert_eq!(memory.read_u8(0xDEAD_FF12), 0xAA);

        memory.write_u16(0x00FF_8000, 0x0102);
        assert_eq!(memory.read_u16(0x8000), 0x0102);
    }

    #[test]
    fn access_wraps_at_end_of_window() {
        let mut memory = AddressSpace::new();
        memory.write_u32(0xFFFE, 0xA1B2_C3D4);
        assert_eq!(memory.read_u8(0xFFFE), 0xA1);
        assert_eq!(memory.read_u8(0xFFFF), 0xB2);
        assert_eq!(memory.read_u8(0x0000), 0xC3);
        assert_eq!(memory.read_u8(0x0001), 0xD4);
        assert_eq!(memory.read_u32(0xFFFE), 0xA1B2_C3D4);
    }

    #[test]
    fn random_round_trips() {
        let mut rng = rand::thread_rng();
        let mut memory = AddressSpace::new();
        for _ in 0..256 {
            let address: u32 = rng.gen();
            let value: u32 = rng.gen();
            memory.write_u32(address, value);
            assert_eq!(memory.read_u32(address), value);
            assert_eq!(memory.read_u16(address), (value >> 16) as u16);
            assert_eq!(memory.read_u8(address.wrapping_add(3)), value as u8);
        }
    }

    #[test]
    fn load_copies_image_and_clears_the_rest() {
        let mut memory = AddressSpace::new();
        memory.write_u8(0x4000, 0x55);
        memory.load(&[0x01, 0x02, 0x03]).unwrap();
        assert_eq!(memory.read(0, 4), vec![0x01, 0x02, 0x03, 0x00]);
        assert_eq!(memory.read_u8(0x4000), 0x00);

        let full = vec![0xFF; ADDRESS_SPACE_SIZE];
        assert!(memory.load(&full).is_ok());
        assert_eq!(memory.read_u8(0xFFFF), 0xFF);
    }

    #[test]
    fn load_rejects_oversized_image() {
        let mut memory = AddressSpace::new();
        let image = vec![0; ADDRESS_SPACE_SIZE + 1];
        assert_eq!(
            memory.load(&image),
            Err(MemoryError::ImageTooLarge(
                ADDRESS_SPACE_SIZE + 1,
                ADDRESS_SPACE_SIZE
            ))
        );
    }

    #[test]
    fn regions_follow_memory_map() {
        let memory = AddressSpace::new();
        assert_eq!(memory.region(0x0000), Region::Rom);
        assert_eq!(memory.region(0xBFFF), Region::Rom);
        assert_eq!(memory.region(0xC000), Region::Unmapped);
        assert_eq!(memory.region(0xF020), Region::Mmio);
        assert_eq!(memory.region(0xF0FF), Region::Mmio);
        assert_eq!(memory.region(0xF100), Region::Unmapped);
        assert_eq!(memory.region(0xF780), Region::Ram);
        assert_eq!(memory.region(0xFF7F), Region::Ram);
        assert_eq!(memory.region(0xFF80), Region::Mmio);
        assert_eq!(memory.region(0x00FF_FFFF), Region::Mmio);
    }

    #[test]
    fn unmapped_regions_are_still_writable() {
        let mut memory = AddressSpace::new();
        memory.write_u8(0xC000, 0x42);
        assert_eq!(memory.read_u8(0xC000), 0x42);
        assert_eq!(memory.region(0xC000).to_string(), "unmapped");
    }
}
