//! Machine geometry.
//!
//! Every component receives a `Geometry` by reference instead of reading
//! global constants, so differently shaped machines can coexist in one
//! process (tests rely on this).

use crate::constants::{
    NUM_FRAMES, OFFSET_WIDTH, PHYSICAL_ADDRESS_WIDTH, ROOT_FRAME, TABLES_DEPTH,
    VIRTUAL_ADDRESS_WIDTH, Word,
};
use crate::error::ConfigError;

const MAX_OFFSET_WIDTH: u32 = 30;
const MAX_PHYSICAL_WIDTH: u32 = 40;
const MAX_VIRTUAL_WIDTH: u32 = 63;

/// Immutable description of the simulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    offset_width: u32,
    physical_address_width: u32,
    virtual_address_width: u32,
    tables_depth: u32,
    num_frames: usize,
}

impl Geometry {
    /// Build a geometry whose frame count fills the physical address space.
    pub fn new(
        offset_width: u32,
        physical_address_width: u32,
        virtual_address_width: u32,
        tables_depth: u32,
    ) -> Result<Self, ConfigError> {
        if offset_width == 0 || offset_width > MAX_OFFSET_WIDTH {
            return Err(ConfigError::OffsetWidth(offset_width));
        }
        if physical_address_width < offset_width || physical_address_width > MAX_PHYSICAL_WIDTH {
            return Err(ConfigError::PhysicalWidth {
                physical: physical_address_width,
                offset: offset_width,
            });
        }
        if virtual_address_width <= offset_width || virtual_address_width > MAX_VIRTUAL_WIDTH {
            return Err(ConfigError::VirtualWidth {
                virtual_width: virtual_address_width,
                offset: offset_width,
            });
        }

        let root_width = i64::from(virtual_address_width)
            - i64::from(offset_width)
            - i64::from(offset_width) * (i64::from(tables_depth) - 1);
        if tables_depth == 0 || root_width < 1 || root_width > i64::from(offset_width) {
            return Err(ConfigError::TablesDepth {
                depth: tables_depth,
                root_width,
            });
        }

        let geometry = Geometry {
            offset_width,
            physical_address_width,
            virtual_address_width,
            tables_depth,
            num_frames: 0,
        };
        geometry.with_num_frames(geometry.frame_capacity())
    }

    /// Same geometry with a different frame count.
    pub fn with_num_frames(mut self, num_frames: usize) -> Result<Self, ConfigError> {
        let required = self.tables_depth as usize + 1;
        if num_frames < required {
            return Err(ConfigError::TooFewFrames {
                frames: num_frames,
                required,
            });
        }
        let capacity = self.frame_capacity();
        if num_frames > capacity {
            return Err(ConfigError::TooManyFrames {
                frames: num_frames,
                capacity,
            });
        }
        self.num_frames = num_frames;
        Ok(self)
    }

    // Frame indices are stored in table cells, so they must fit in a Word.
    fn frame_capacity(&self) -> usize {
        let physical = 1usize << (self.physical_address_width - self.offset_width);
        physical.min(Word::MAX as usize + 1)
    }

    pub fn offset_width(&self) -> u32 {
        self.offset_width
    }

    pub fn physical_address_width(&self) -> u32 {
        self.physical_address_width
    }

    pub fn virtual_address_width(&self) -> u32 {
        self.virtual_address_width
    }

    pub fn tables_depth(&self) -> u32 {
        self.tables_depth
    }

    pub fn num_frames(&self) -> usize {
        self.num_frames
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        1 << self.offset_width
    }

    /// Number of words backing the physical memory array.
    pub fn ram_size(&self) -> usize {
        self.num_frames * self.page_size()
    }

    pub fn virtual_memory_size(&self) -> u64 {
        1 << self.virtual_address_width
    }

    /// Total number of virtual pages, the modulus of the cyclic distance.
    pub fn num_pages(&self) -> u64 {
        1 << (self.virtual_address_width - self.offset_width)
    }

    /// Width of the level-1 field: whatever the deeper levels leave over.
    #[inline]
    pub fn root_field_width(&self) -> u32 {
        self.virtual_address_width - self.offset_width - self.offset_width * (self.tables_depth - 1)
    }

    pub fn root_entries(&self) -> usize {
        1 << self.root_field_width()
    }

    /// Number of live table entries in `frame`.
    #[inline]
    pub fn entries_in(&self, frame: usize) -> usize {
        if frame == ROOT_FRAME {
            self.root_entries()
        } else {
            self.page_size()
        }
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            offset_width: OFFSET_WIDTH,
            physical_address_width: PHYSICAL_ADDRESS_WIDTH,
            virtual_address_width: VIRTUAL_ADDRESS_WIDTH,
            tables_depth: TABLES_DEPTH,
            num_frames: NUM_FRAMES,
        }
    }
}
