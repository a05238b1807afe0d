// Copyright (c) 2026 MIPS-Memview Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{OutOfRangeAddress, ViewError};

/// Start of the cached, unmapped segment RDRAM is viewed through.
pub const KSEG0: u32 = 0x8000_0000;
/// Virtual addresses are reduced to a physical offset with this mask.
pub const PHYSICAL_MASK: u32 = 0x0FFF_FFFF;

/// Access to the target's address space. All multi-byte reads are
/// big-endian. Writes are byte-sized and refused unless the backing allows
/// them.
pub trait Memory {
    /// Fill `buf` from `address`. Fails without partial reads.
    fn read_into(&self, address: u32, buf: &mut [u8]) -> Result<(), OutOfRangeAddress>;

    fn is_readable(&self, address: u32, width: u32) -> bool;

    fn read8(&self, address: u32) -> Result<u8, OutOfRangeAddress> {
        let mut b = [0u8; 1];
        self.read_into(address, &mut b)?;
        Ok(b[0])
    }

    fn read16(&self, address: u32) -> Result<u16, OutOfRangeAddress> {
        let mut b = [0u8; 2];
        self.read_into(address, &mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    fn read32(&self, address: u32) -> Result<u32, OutOfRangeAddress> {
        let mut b = [0u8; 4];
        self.read_into(address, &mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    fn read64(&self, address: u32) -> Result<u64, OutOfRangeAddress> {
        let mut b = [0u8; 8];
        self.read_into(address, &mut b)?;
        Ok(u64::from_be_bytes(b))
    }

    fn read_buffer(&self, address: u32, len: u32) -> Result<Vec<u8>, OutOfRangeAddress> {
        let mut buf = vec![0u8; len as usize];
        self.read_into(address, &mut buf)?;
        Ok(buf)
    }

    fn write8(&mut self, address: u32, _value: u8) -> Result<(), ViewError> {
        Err(ViewError::ReadOnly { address })
    }
}

/// A named physical range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub name: String,
    pub start: u32,
    pub size: u32,
}

impl MemoryRegion {
    pub fn new(name: impl Into<String>, start: u32, size: u32) -> Self {
        Self {
            name: name.into(),
            start,
            size,
        }
    }

    pub fn end(&self) -> u64 {
        self.start as u64 + self.size as u64
    }

    /// True when all of `[addr, addr + width)` lies inside the region.
    pub fn contains(&self, addr: u32, width: u32) -> bool {
        addr >= self.start && addr as u64 + width as u64 <= self.end()
    }
}

enum Backing {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Owned(v) => v,
            Backing::Mapped(m) => m,
        }
    }
}

/// An RDRAM snapshot, addressed through KSEG0 (`0x80000000 + offset`).
pub struct RamImage {
    backing: Backing,
    region: MemoryRegion,
}

impl RamImage {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let size = bytes.len().min(PHYSICAL_MASK as usize + 1) as u32;
        Self {
            backing: Backing::Owned(bytes),
            region: MemoryRegion::new("rdram", 0, size),
        }
    }

    /// Read a dump into memory so it can be edited. Edits are not written
    /// back to the file.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        log::debug!("loaded {} ({} bytes)", path.as_ref().display(), bytes.len());
        Ok(Self::from_bytes(bytes))
    }

    /// Map a raw big-endian dump from disk. The mapping is read-only.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path.as_ref())?;
        // SAFETY: the mapping is read-only and the image is not expected to
        // change underneath us while it is being viewed.
        let map = unsafe { Mmap::map(&file)? };
        let size = map.len().min(PHYSICAL_MASK as usize + 1) as u32;
        log::debug!(
            "mapped {} ({} bytes)",
            path.as_ref().display(),
            map.len()
        );
        Ok(Self {
            backing: Backing::Mapped(map),
            region: MemoryRegion::new("rdram", 0, size),
        })
    }

    pub fn region(&self) -> &MemoryRegion {
        &self.region
    }

    pub fn size(&self) -> u32 {
        self.region.size
    }

    /// Physical offset of `[address, address + width)`, if it is backed.
    fn translate(&self, address: u32, width: u32) -> Option<usize> {
        if address < KSEG0 {
            return None;
        }
        let phys = address & PHYSICAL_MASK;
        self.region
            .contains(phys, width)
            .then_some(phys as usize)
    }
}

impl Memory for RamImage {
    fn read_into(&self, address: u32, buf: &mut [u8]) -> Result<(), OutOfRangeAddress> {
        let width = buf.len() as u32;
        let offset = self
            .translate(address, width)
            .ok_or(OutOfRangeAddress { address, width })?;
        buf.copy_from_slice(&self.backing.bytes()[offset..offset + buf.len()]);
        Ok(())
    }

    fn is_readable(&self, address: u32, width: u32) -> bool {
        self.translate(address, width).is_some()
    }

    fn write8(&mut self, address: u32, value: u8) -> Result<(), ViewError> {
        let offset = self
            .translate(address, 1)
            .ok_or(OutOfRangeAddress { address, width: 1 })?;
        match &mut self.backing {
            Backing::Owned(bytes) => {
                bytes[offset] = value;
                Ok(())
            }
            Backing::Mapped(_) => Err(ViewError::ReadOnly { address }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> RamImage {
        let mut bytes = vec![0u8; 0x100];
        bytes[0..8].copy_from_slice(&[0x10, 0x44, 0x00, 0x03, 0xFF, 0xFE, 0x80, 0x01]);
        RamImage::from_bytes(bytes)
    }

    #[test]
    fn big_endian_reads() {
        let m = image();
        assert_eq!(m.read32(0x8000_0000).unwrap(), 0x1044_0003);
        assert_eq!(m.read16(0x8000_0004).unwrap(), 0xFFFE);
        assert_eq!(m.read8(0x8000_0006).unwrap(), 0x80);
        assert_eq!(m.read64(0x8000_0000).unwrap(), 0x1044_0003_FFFE_8001);
        assert_eq!(m.read_buffer(0x8000_0001, 2).unwrap(), vec![0x44, 0x00]);
    }

    #[test]
    fn uncached_segment_mirrors_kseg0() {
        let m = image();
        assert_eq!(m.read32(0xA000_0000).unwrap(), 0x1044_0003);
    }

    #[test]
    fn out_of_range_reports_address_and_width() {
        let m = image();
        let err = m.read32(0x8000_00FE).unwrap_err();
        assert_eq!(
            err,
            OutOfRangeAddress {
                address: 0x8000_00FE,
                width: 4
            }
        );
        assert!(m.read8(0x8000_00FF).is_ok());
        assert!(m.read8(0x7FFF_FFFF).is_err());
        assert!(!m.is_readable(0x8000_0100, 1));
        assert!(m.is_readable(0x8000_00FC, 4));
    }

    #[test]
    fn owned_image_accepts_writes() {
        let mut m = image();
        m.write8(0xA000_0001, 0x5A).unwrap();
        assert_eq!(m.read32(0x8000_0000).unwrap(), 0x105A_0003);
        assert_eq!(
            m.write8(0x8000_0100, 0),
            Err(ViewError::OutOfRange(OutOfRangeAddress {
                address: 0x8000_0100,
                width: 1
            }))
        );
        assert_eq!(m.region().name, "rdram");
    }

    #[test]
    fn mapped_image_is_read_only() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4]).unwrap();
        file.flush().unwrap();

        let mut mapped = RamImage::open(file.path()).unwrap();
        assert_eq!(
            mapped.write8(0x8000_0000, 9),
            Err(ViewError::ReadOnly {
                address: 0x8000_0000
            })
        );

        let mut loaded = RamImage::load(file.path()).unwrap();
        loaded.write8(0x8000_0000, 9).unwrap();
        assert_eq!(loaded.read32(0x8000_0000).unwrap(), 0x0902_0304);
    }
}
