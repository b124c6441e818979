use std::fmt;

/// Failures surfaced by the read/write API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// The virtual address lies outside the configured virtual space.
    AddressOutOfRange { address: u64, limit: u64 },
    /// A read was requested without a destination for the value.
    MissingOutput,
    /// No empty table, unused frame, or evictable page was found.
    FramesExhausted,
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::AddressOutOfRange { address, limit } => write!(
                f,
                "virtual address {} is outside the virtual space (size {})",
                address, limit
            ),
            VmError::MissingOutput => write!(f, "no output destination for read"),
            VmError::FramesExhausted => write!(f, "no frame available to resolve page fault"),
        }
    }
}

impl std::error::Error for VmError {}

/// Rejected geometry combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    OffsetWidth(u32),
    PhysicalWidth { physical: u32, offset: u32 },
    VirtualWidth { virtual_width: u32, offset: u32 },
    /// The depth leaves the root level with no bits or more bits than a page holds.
    TablesDepth { depth: u32, root_width: i64 },
    TooFewFrames { frames: usize, required: usize },
    TooManyFrames { frames: usize, capacity: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::OffsetWidth(w) => {
                write!(f, "offset width {} is not in 1..=30", w)
            }
            ConfigError::PhysicalWidth { physical, offset } => write!(
                f,
                "physical address width {} is smaller than offset width {} or too large",
                physical, offset
            ),
            ConfigError::VirtualWidth {
                virtual_width,
                offset,
            } => write!(
                f,
                "virtual address width {} must exceed offset width {} and be at most 63",
                virtual_width, offset
            ),
            ConfigError::TablesDepth { depth, root_width } => write!(
                f,
                "table depth {} gives a root field width of {} bits",
                depth, root_width
            ),
            ConfigError::TooFewFrames { frames, required } => write!(
                f,
                "{} frames cannot hold a full translation path ({} required)",
                frames, required
            ),
            ConfigError::TooManyFrames { frames, capacity } => write!(
                f,
                "{} frames exceed the physical capacity of {} frames",
                frames, capacity
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
