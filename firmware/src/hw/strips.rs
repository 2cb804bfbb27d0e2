//! Flash-resident strip library.
//!
//! A region of upper flash holds the pre-rasterized comic strips the device
//! rotates through: a header of `magic | count | crc32`, a table of offsets
//! from the region base, then the raster blobs. Each blob starts with a row
//! count word followed by 48-byte rows (384 dots at one bit per dot).
//! The table checksum is verified once per cycle at mount.

use core::ptr;

use alarm_core::store::StorageMedium;

use crate::status::{self, CyclePhase};

/// First byte of the strip region. The release image places the table in
/// the final 32 KiB sector, above the firmware itself.
const STRIP_REGION_BASE: u32 = 0x0803_8000;

/// `b"STRP"` read as a little-endian word.
const STRIP_MAGIC: u32 = 0x5052_5453;

/// Sanity bound; the region cannot hold more than this many strips.
const MAX_STRIPS: u32 = 64;

/// Bytes per raster row.
pub const STRIP_ROW_BYTES: usize = 48;

/// Why the region was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, defmt::Format)]
pub enum StripError {
    BadMagic,
    BadChecksum,
    BadCount,
    NotMounted,
    BadIndex,
}

/// Handle to the memory-mapped strip region.
///
/// Copyable on purpose: the printer needs the raster data while the medium
/// adapter answers mount and count queries, and flash is read-only to both.
#[derive(Copy, Clone)]
pub struct StripRegion {
    base: u32,
}

/// One strip's raster, borrowed straight out of flash.
pub struct StripRaster {
    pub rows: u32,
    pub data: &'static [u8],
}

impl StripRegion {
    /// The region the release image flashes.
    #[must_use]
    pub const fn default_region() -> Self {
        Self {
            base: STRIP_REGION_BASE,
        }
    }

    fn word(self, offset: u32) -> u32 {
        // SAFETY: the region lies inside the device's memory-mapped flash;
        // reads are always valid, at worst returning erased 0xFFFF_FFFF.
        unsafe { ptr::read_volatile((self.base + offset) as *const u32) }
    }

    /// Validates the header and returns the strip count.
    pub fn validate(self) -> Result<u32, StripError> {
        if self.word(0) != STRIP_MAGIC {
            return Err(StripError::BadMagic);
        }
        let count = self.word(4);
        if count == 0 || count > MAX_STRIPS {
            return Err(StripError::BadCount);
        }
        let mut crc = Crc32::new();
        for index in 0..count {
            crc.update_word(self.word(12 + index * 4));
        }
        if crc.finish() != self.word(8) {
            return Err(StripError::BadChecksum);
        }
        Ok(count)
    }

    /// Returns the raster for one strip without re-walking the table.
    pub fn raster(self, index: u32) -> Result<StripRaster, StripError> {
        let count = self.validate()?;
        if index >= count {
            return Err(StripError::BadIndex);
        }
        let offset = self.word(12 + index * 4);
        let rows = self.word(offset);
        let data_base = self.base + offset + 4;
        // SAFETY: rows came from the validated table and the data lies in
        // mapped flash behind it.
        let data = unsafe {
            core::slice::from_raw_parts(data_base as *const u8, rows as usize * STRIP_ROW_BYTES)
        };
        Ok(StripRaster { rows, data })
    }
}

/// [`StorageMedium`] facade over the flash region.
pub struct StripMedium {
    region: StripRegion,
    count: Option<u32>,
}

impl StripMedium {
    pub fn new(region: StripRegion) -> Self {
        Self {
            region,
            count: None,
        }
    }
}

impl StorageMedium for StripMedium {
    type Error = StripError;

    fn mount(&mut self) -> Result<(), StripError> {
        status::record_phase(CyclePhase::Storage);
        match self.region.validate() {
            Ok(count) => {
                self.count = Some(count);
                Ok(())
            }
            Err(error) => {
                defmt::warn!("strip region rejected: {}", error);
                self.count = None;
                Err(error)
            }
        }
    }

    fn strip_count(&mut self) -> Result<u32, StripError> {
        self.count.ok_or(StripError::NotMounted)
    }
}

/// Reflected CRC-32 (the usual 0xEDB88320 polynomial), bitwise to keep the
/// table out of flash.
struct Crc32 {
    state: u32,
}

impl Crc32 {
    fn new() -> Self {
        Self { state: u32::MAX }
    }

    fn update_word(&mut self, word: u32) {
        for byte in word.to_le_bytes() {
            self.state ^= u32::from(byte);
            for _ in 0..8 {
                let mask = (self.state & 1).wrapping_neg();
                self.state = (self.state >> 1) ^ (0xEDB8_8320 & mask);
            }
        }
    }

    fn finish(self) -> u32 {
        !self.state
    }
}
