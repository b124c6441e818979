use std::fmt;

use log::{debug, trace};

use crate::config::Geometry;
use crate::constants::ROOT_FRAME;
use crate::error::VmError;
use crate::fault::{Fault, PagingStats, resolve_fault};
use crate::memory::{BackingStore, PhysicalMemory};

/// Table index for 1-based `level` of `va`. Level 1 is the root field.
pub fn field_at(geometry: &Geometry, va: u64, level: u32) -> u64 {
    let root_width = geometry.root_field_width();
    let shift_base = geometry.virtual_address_width() - root_width;
    if level == 1 {
        return (va >> shift_base) & (geometry.root_entries() as u64 - 1);
    }
    let shift = shift_base - geometry.offset_width() * (level - 1);
    (va >> shift) & (geometry.page_size() as u64 - 1)
}

#[inline]
pub fn offset_of(geometry: &Geometry, va: u64) -> u64 {
    va & (geometry.page_size() as u64 - 1)
}

#[inline]
pub fn page_index_of(geometry: &Geometry, va: u64) -> u64 {
    va >> geometry.offset_width()
}

/// Append one level's field to a page index accumulated while descending.
#[inline]
pub fn compose_page_index(
    geometry: &Geometry,
    accumulated: u64,
    field: u64,
    is_root: bool,
) -> u64 {
    let width = if is_root {
        geometry.root_field_width()
    } else {
        geometry.offset_width()
    };
    (accumulated << width) | field
}

/// A virtual address split into its per-level fields and offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: u64,
    pub fields: Vec<u64>,
    pub offset: u64,
    pub page: u64,
}

impl VirtualAddress {
    /// Decompose a raw VA into its components
    pub fn decompose(geometry: &Geometry, va: u64) -> Self {
        let fields = (1..=geometry.tables_depth())
            .map(|level| field_at(geometry, va, level))
            .collect();
        VirtualAddress {
            va,
            fields,
            offset: offset_of(geometry, va),
            page: page_index_of(geometry, va),
        }
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA({}) = (", self.va)?;
        for (i, field) in self.fields.iter().enumerate() {
            write!(f, "p{}={}, ", i + 1, field)?;
        }
        write!(f, "w={}, page={})", self.offset, self.page)
    }
}

/// Walk the table fields from the root, resolving a fault at every unlinked
/// entry, and return the physical address of `va`.
///
/// Addresses outside the virtual space are rejected before anything is
/// touched.
pub fn translate<S: BackingStore + ?Sized>(
    geometry: &Geometry,
    pm: &mut PhysicalMemory,
    store: &mut S,
    stats: &mut PagingStats,
    va: u64,
) -> Result<usize, VmError> {
    let limit = geometry.virtual_memory_size();
    if va >= limit {
        debug!(
            "address {} rejected: outside virtual space of {}",
            va, limit
        );
        return Err(VmError::AddressOutOfRange { address: va, limit });
    }

    let mut frame = ROOT_FRAME;
    for level in 1..=geometry.tables_depth() {
        let field = field_at(geometry, va, level) as usize;
        let parent = frame;
        frame = pm.entry(parent, field);
        trace!("level {}: frame {} [{}] -> {}", level, parent, field, frame);

        if frame == 0 {
            let fault = Fault {
                address: va,
                parent,
                offset: field,
                level,
            };
            let resolution = resolve_fault(geometry, pm, store, &fault)?;
            stats.record(&resolution);
            frame = resolution.frame;
        }
    }

    Ok(pm.cell_address(frame, offset_of(geometry, va) as usize))
}
