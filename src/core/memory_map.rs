//! Address ↔ file offset ↔ relative address translation.
//!
//! A `RegionMap` describes how the loader placed file content in virtual
//! memory. Regions may be only partially file backed (e.g. `.bss` tails);
//! addresses past `file_size` inside a region have no offset.

use serde::{Deserialize, Serialize};

/// Translation between the three coordinate spaces of an image.
///
/// Unresolvable conversions return `None`.
pub trait MemoryMap {
    fn address_to_offset(&self, address: u64) -> Option<u64>;
    fn offset_to_address(&self, offset: u64) -> Option<u64>;
    fn address_to_rel_address(&self, address: u64) -> Option<u64>;
    fn rel_address_to_address(&self, rel_address: u64) -> Option<u64>;

    /// True if every byte of `[address, address + size)` is file backed and the
    /// backing offsets are contiguous.
    ///
    /// The default only compares the endpoint offsets, so it cannot see an
    /// unmapped hole whose file gap matches its address gap. Maps that know
    /// their region boundaries override it.
    fn is_solid_address_range(&self, address: u64, size: u64) -> bool {
        if size == 0 {
            return false;
        }
        let Some(last) = address.checked_add(size - 1) else {
            return false;
        };
        match (self.address_to_offset(address), self.address_to_offset(last)) {
            (Some(first_off), Some(last_off)) => last_off.checked_sub(first_off) == Some(size - 1),
            _ => false,
        }
    }
}

/// One loaded region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    /// Virtual start address
    pub address: u64,
    /// Virtual size
    pub size: u64,
    /// File offset of the first byte, if the region is file backed
    pub file_offset: Option<u64>,
    /// Number of leading bytes backed by the file
    pub file_size: u64,
}

impl MemoryRegion {
    /// Region fully backed by file bytes starting at `file_offset`.
    pub fn mapped(address: u64, size: u64, file_offset: u64) -> Self {
        Self {
            address,
            size,
            file_offset: Some(file_offset),
            file_size: size,
        }
    }

    /// Region with no file backing.
    pub fn virtual_only(address: u64, size: u64) -> Self {
        Self {
            address,
            size,
            file_offset: None,
            file_size: 0,
        }
    }

    fn contains(&self, address: u64) -> bool {
        address >= self.address && address < self.address.saturating_add(self.size)
    }
}

/// Region-list memory map with an image base for relative addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMap {
    image_base: u64,
    regions: Vec<MemoryRegion>,
}

impl RegionMap {
    pub fn new(image_base: u64, mut regions: Vec<MemoryRegion>) -> Self {
        regions.sort_by_key(|r| r.address);
        Self {
            image_base,
            regions,
        }
    }

    /// Flat image: file offset N is loaded at `image_base + N`.
    pub fn flat(image_base: u64, file_size: u64) -> Self {
        Self::new(
            image_base,
            vec![MemoryRegion::mapped(image_base, file_size, 0)],
        )
    }

    pub fn image_base(&self) -> u64 {
        self.image_base
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    fn region_of(&self, address: u64) -> Option<&MemoryRegion> {
        let idx = self.regions.partition_point(|r| r.address <= address);
        idx.checked_sub(1)
            .map(|i| &self.regions[i])
            .filter(|r| r.contains(address))
    }
}

impl MemoryMap for RegionMap {
    fn address_to_offset(&self, address: u64) -> Option<u64> {
        let region = self.region_of(address)?;
        let delta = address - region.address;
        if delta >= region.file_size {
            return None;
        }
        region.file_offset?.checked_add(delta)
    }

    fn offset_to_address(&self, offset: u64) -> Option<u64> {
        self.regions.iter().find_map(|region| {
            let start = region.file_offset?;
            if offset >= start && offset - start < region.file_size {
                region.address.checked_add(offset - start)
            } else {
                None
            }
        })
    }

    fn address_to_rel_address(&self, address: u64) -> Option<u64> {
        self.region_of(address)?;
        address.checked_sub(self.image_base)
    }

    fn rel_address_to_address(&self, rel_address: u64) -> Option<u64> {
        let address = self.image_base.checked_add(rel_address)?;
        self.region_of(address).map(|_| address)
    }

    /// Solid only if the whole span lies in the file-backed part of one region.
    fn is_solid_address_range(&self, address: u64, size: u64) -> bool {
        if size == 0 {
            return false;
        }
        let Some(region) = self.region_of(address) else {
            return false;
        };
        if region.file_offset.is_none() {
            return false;
        }
        let backed = region.file_size.min(region.size);
        (address - region.address)
            .checked_add(size)
            .is_some_and(|end| end <= backed)
    }
}
