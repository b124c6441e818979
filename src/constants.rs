//! Default machine geometry used when no overrides are given.

/// A single physical memory cell.
pub type Word = i32;

pub const OFFSET_WIDTH: u32 = 4;
pub const PAGE_SIZE: usize = 1 << OFFSET_WIDTH;

pub const PHYSICAL_ADDRESS_WIDTH: u32 = 10;
pub const RAM_SIZE: usize = 1 << PHYSICAL_ADDRESS_WIDTH;

pub const VIRTUAL_ADDRESS_WIDTH: u32 = 20;

pub const NUM_FRAMES: usize = RAM_SIZE / PAGE_SIZE;

// ceil((VIRTUAL_ADDRESS_WIDTH - OFFSET_WIDTH) / OFFSET_WIDTH)
pub const TABLES_DEPTH: u32 = (VIRTUAL_ADDRESS_WIDTH - OFFSET_WIDTH).div_ceil(OFFSET_WIDTH);

/// Frame 0 always holds the root page table.
pub const ROOT_FRAME: usize = 0;

/// Table cell value meaning "no child linked here".
pub const UNLINKED: Word = 0;

/// Output value for a failed translation in batch mode.
pub const INVALID_ADDRESS: i64 = -1;
