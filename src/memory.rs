use std::collections::HashMap;

use crate::config::Geometry;
use crate::constants::{UNLINKED, Word};

/// Flat RAM: `num_frames` frames of `page_size` words each.
pub struct PhysicalMemory {
    data: Box<[Word]>,
    page_size: usize,
}

impl PhysicalMemory {
    /// Create a new physical memory initialized to all zeros
    pub fn new(geometry: &Geometry) -> Self {
        PhysicalMemory {
            data: vec![0; geometry.ram_size()].into_boxed_slice(),
            page_size: geometry.page_size(),
        }
    }

    /// Read a word from physical memory
    #[inline]
    pub fn read(&self, address: usize) -> Word {
        self.data[address]
    }

    /// Write a word to physical memory
    #[inline]
    pub fn write(&mut self, address: usize, value: Word) {
        self.data[address] = value;
    }

    /// Absolute index of cell `offset` inside `frame`.
    #[inline]
    pub fn cell_address(&self, frame: usize, offset: usize) -> usize {
        frame * self.page_size + offset
    }

    /// Read a table entry: the frame linked at `offset` of table `frame`.
    #[inline]
    pub fn entry(&self, frame: usize, offset: usize) -> usize {
        self.read(self.cell_address(frame, offset)) as usize
    }

    /// Link `child` at `offset` of table `frame`.
    pub fn set_entry(&mut self, frame: usize, offset: usize, child: usize) {
        let address = self.cell_address(frame, offset);
        self.write(address, child as Word);
    }

    /// Zero the entry at `offset` of table `frame`.
    pub fn clear_entry(&mut self, frame: usize, offset: usize) {
        let address = self.cell_address(frame, offset);
        self.write(address, UNLINKED);
    }

    pub fn frame(&self, frame: usize) -> &[Word] {
        let start = self.cell_address(frame, 0);
        &self.data[start..start + self.page_size]
    }

    pub fn frame_mut(&mut self, frame: usize) -> &mut [Word] {
        let start = self.cell_address(frame, 0);
        &mut self.data[start..start + self.page_size]
    }

    pub fn zero_frame(&mut self, frame: usize) {
        self.frame_mut(frame).fill(0);
    }

    /// Total number of words.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Secondary storage that keeps pages evicted from physical memory.
pub trait BackingStore {
    /// Persist the contents of `frame` as virtual page `page`.
    fn evict(&mut self, page: u64, frame: &[Word]);

    /// Fill `frame` with whatever was last stored for `page`, zeros if nothing was.
    fn restore(&mut self, page: u64, frame: &mut [Word]);
}

/// In-memory swap area keyed by page index.
#[derive(Debug, Default)]
pub struct SwapStore {
    pages: HashMap<u64, Box<[Word]>>,
}

impl SwapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pages currently swapped out.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Saved contents of a swapped-out page.
    pub fn page(&self, page: u64) -> Option<&[Word]> {
        self.pages.get(&page).map(|p| &p[..])
    }
}

impl BackingStore for SwapStore {
    fn evict(&mut self, page: u64, frame: &[Word]) {
        self.pages.insert(page, frame.into());
    }

    fn restore(&mut self, page: u64, frame: &mut [Word]) {
        // the page becomes resident again and is saved afresh on its next eviction
        match self.pages.remove(&page) {
            Some(saved) => frame.copy_from_slice(&saved),
            None => frame.fill(0),
        }
    }
}
