use log::{debug, info};

use crate::config::Geometry;
use crate::constants::{INVALID_ADDRESS, ROOT_FRAME, Word};
use crate::error::VmError;
use crate::fault::PagingStats;
use crate::memory::{BackingStore, PhysicalMemory, SwapStore};
use crate::translation::translate;
use crate::walker::max_linked_frame;

/// A virtual address space backed by a fixed physical memory and a
/// backing store for evicted pages.
///
/// Not synchronized: callers sharing one instance across threads must wrap
/// whole `read`/`write` calls in their own lock.
pub struct VirtualMemory<S: BackingStore = SwapStore> {
    geometry: Geometry,
    pm: PhysicalMemory,
    store: S,
    stats: PagingStats,
}

impl VirtualMemory<SwapStore> {
    pub fn new(geometry: Geometry) -> Self {
        Self::with_store(geometry, SwapStore::new())
    }
}

impl<S: BackingStore> VirtualMemory<S> {
    /// Build a virtual memory over `store`. The page-table tree starts empty.
    pub fn with_store(geometry: Geometry, store: S) -> Self {
        let mut vm = VirtualMemory {
            pm: PhysicalMemory::new(&geometry),
            geometry,
            store,
            stats: PagingStats::default(),
        };
        vm.initialize();
        vm
    }

    /// Clear the root table, dropping every mapping, and reset the counters.
    ///
    /// The backing store is left untouched.
    pub fn initialize(&mut self) {
        self.pm.zero_frame(ROOT_FRAME);
        self.stats = PagingStats::default();
        info!(
            "initialized: {} frames of {} words, {} virtual pages, depth {}",
            self.geometry.num_frames(),
            self.geometry.page_size(),
            self.geometry.num_pages(),
            self.geometry.tables_depth()
        );
    }

    pub fn read(&mut self, va: u64) -> Result<Word, VmError> {
        let pa = self.translate(va)?;
        Ok(self.pm.read(pa))
    }

    /// Out-parameter form of [`read`](Self::read). Nothing is translated when
    /// the destination is missing or the address is out of range.
    pub fn read_into(&mut self, va: u64, value: Option<&mut Word>) -> Result<(), VmError> {
        let Some(value) = value else {
            debug!("read of {} rejected: no destination", va);
            return Err(VmError::MissingOutput);
        };
        *value = self.read(va)?;
        Ok(())
    }

    pub fn write(&mut self, va: u64, value: Word) -> Result<(), VmError> {
        let pa = self.translate(va)?;
        self.pm.write(pa, value);
        Ok(())
    }

    /// Translate each address, faulting pages in as needed. Out-of-range
    /// addresses yield `INVALID_ADDRESS`.
    pub fn translate_batch(&mut self, vas: &[u64]) -> Vec<i64> {
        vas.iter()
            .map(|&va| {
                self.translate(va).map_or(INVALID_ADDRESS, |pa| pa as i64)
            })
            .collect()
    }

    fn translate(&mut self, va: u64) -> Result<usize, VmError> {
        translate(
            &self.geometry,
            &mut self.pm,
            &mut self.store,
            &mut self.stats,
            va,
        )
    }

    /// Number of frame indices currently in use: the highest linked frame plus one.
    pub fn frames_in_use(&self) -> usize {
        max_linked_frame(&self.geometry, &self.pm) + 1
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn stats(&self) -> PagingStats {
        self.stats
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn physical_memory(&self) -> &PhysicalMemory {
        &self.pm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let mut vm = VirtualMemory::new(Geometry::default());
        vm.write(13, 3).unwrap();
        assert_eq!(vm.read(13), Ok(3));
        vm.write(6, 7).unwrap();
        assert_eq!(vm.read(6), Ok(7));
        vm.write(31, 1).unwrap();
        assert_eq!(vm.read(31), Ok(1));
        assert_eq!(vm.read(13), Ok(3));
    }

    #[test]
    fn test_unwritten_reads_zero() {
        let mut vm = VirtualMemory::new(Geometry::default());
        assert_eq!(vm.read(4242), Ok(0));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut vm = VirtualMemory::new(Geometry::default());
        let limit = 1 << 20;
        assert_eq!(
            vm.write(limit, 1),
            Err(VmError::AddressOutOfRange {
                address: limit,
                limit
            })
        );
        assert!(vm.read(u64::MAX).is_err());
        assert_eq!(vm.stats(), PagingStats::default());
        let root = vm.physical_memory().frame(ROOT_FRAME);
        assert!(root.iter().all(|&w| w == 0));
    }

    #[test]
    fn test_read_into() {
        let mut vm = VirtualMemory::new(Geometry::default());
        vm.write(100, 55).unwrap();

        let mut value = 0;
        assert_eq!(vm.read_into(100, Some(&mut value)), Ok(()));
        assert_eq!(value, 55);

        assert_eq!(vm.read_into(100, None), Err(VmError::MissingOutput));

        let mut untouched = -1;
        assert!(vm.read_into(1 << 20, Some(&mut untouched)).is_err());
        assert_eq!(untouched, -1);
    }

    #[test]
    fn test_missing_output_performs_no_translation() {
        let mut vm = VirtualMemory::new(Geometry::default());
        assert!(vm.read_into(0, None).is_err());
        assert_eq!(vm.stats().faults, 0);
    }

    #[test]
    fn test_translate_batch() {
        let mut vm = VirtualMemory::new(Geometry::default());
        let results = vm.translate_batch(&[0x12345, 0x12340, 1 << 20]);
        assert_eq!(results, vec![4 * 16 + 5, 4 * 16, -1]);
    }

    #[test]
    fn test_initialize_drops_mappings() {
        let mut vm = VirtualMemory::new(Geometry::default());
        vm.write(0, 9).unwrap();
        assert_eq!(vm.frames_in_use(), 5);

        vm.initialize();
        assert_eq!(vm.stats(), PagingStats::default());
        assert_eq!(vm.frames_in_use(), 1);
        // the old frame is not reachable any more; the page comes back zeroed
        assert_eq!(vm.read(0), Ok(0));
    }
}
