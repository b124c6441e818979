//! Page-fault resolution.
//!
//! A fault is an unlinked entry met while translating. The resolver picks a
//! frame to link there, in priority order:
//!
//! 1. an existing table frame with no children (unlinked from its old parent),
//! 2. the first frame index above every frame in use,
//! 3. the resident page farthest (cyclically) from the faulting page, which
//!    is written to the backing store before its frame is reused.
//!
//! The chosen frame is then linked into the faulting table and either zeroed
//! (it becomes a table) or filled from the backing store (it becomes the data
//! page of the faulting address).

use log::debug;

use crate::config::Geometry;
use crate::error::VmError;
use crate::memory::{BackingStore, PhysicalMemory};
use crate::translation::page_index_of;
use crate::walker::{Candidate, ScanOutcome, Slot, scan};

/// An unlinked entry met at `level` of the walk for `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub address: u64,
    /// Table frame holding the missing entry; excluded from reuse.
    pub parent: usize,
    pub offset: usize,
    pub level: u32,
}

/// How a frame was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ReuseEmpty(Slot),
    AllocateUnused,
    EvictUsed(Candidate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub frame: usize,
    pub strategy: Strategy,
    /// The frame now holds the faulting page's data rather than a table.
    pub data_page: bool,
}

/// Counters accumulated over the lifetime of a virtual memory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagingStats {
    pub faults: u64,
    pub reused_empty: u64,
    pub allocated: u64,
    pub evictions: u64,
    pub restores: u64,
}

impl PagingStats {
    pub fn record(&mut self, resolution: &Resolution) {
        self.faults += 1;
        match resolution.strategy {
            Strategy::ReuseEmpty(_) => self.reused_empty += 1,
            Strategy::AllocateUnused => self.allocated += 1,
            Strategy::EvictUsed(_) => self.evictions += 1,
        }
        if resolution.data_page {
            self.restores += 1;
        }
    }
}

/// Decide where the frame for a fault comes from.
pub fn choose(geometry: &Geometry, outcome: ScanOutcome) -> Result<(usize, Strategy), VmError> {
    match outcome {
        ScanOutcome::FoundEmpty(slot) => Ok((slot.frame, Strategy::ReuseEmpty(slot))),
        ScanOutcome::Scanned { max_frame, .. } if max_frame + 1 < geometry.num_frames() => {
            Ok((max_frame + 1, Strategy::AllocateUnused))
        }
        ScanOutcome::Scanned {
            victim: Some(victim),
            ..
        } => Ok((victim.slot.frame, Strategy::EvictUsed(victim))),
        ScanOutcome::Scanned { victim: None, .. } => Err(VmError::FramesExhausted),
    }
}

/// Resolve `fault`, leaving the tree consistent, and return the linked frame.
pub fn resolve_fault<S: BackingStore + ?Sized>(
    geometry: &Geometry,
    pm: &mut PhysicalMemory,
    store: &mut S,
    fault: &Fault,
) -> Result<Resolution, VmError> {
    let outcome = scan(geometry, pm, fault.address, fault.parent);
    let (frame, strategy) = choose(geometry, outcome)?;

    match strategy {
        Strategy::ReuseEmpty(slot) => {
            pm.clear_entry(slot.parent, slot.offset);
            debug!(
                "fault at level {}: reusing empty table frame {} (was {}[{}])",
                fault.level, frame, slot.parent, slot.offset
            );
        }
        Strategy::AllocateUnused => {
            debug!(
                "fault at level {}: allocating unused frame {}",
                fault.level, frame
            );
        }
        Strategy::EvictUsed(victim) => {
            pm.clear_entry(victim.slot.parent, victim.slot.offset);
            store.evict(victim.page, pm.frame(frame));
            debug!(
                "fault at level {}: evicting page {} from frame {} (distance {})",
                fault.level, victim.page, frame, victim.distance
            );
        }
    }

    pm.set_entry(fault.parent, fault.offset, frame);

    let data_page = fault.level == geometry.tables_depth();
    if data_page {
        store.restore(page_index_of(geometry, fault.address), pm.frame_mut(frame));
    } else {
        pm.zero_frame(frame);
    }

    Ok(Resolution {
        frame,
        strategy,
        data_page,
    })
}
