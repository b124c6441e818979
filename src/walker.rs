//! Depth-first scan of the page-table tree stored in physical memory.
//!
//! The scan is read-only. It reports either a table frame with no children
//! (which wins outright and stops the traversal), or the highest frame index
//! in use together with the resident page farthest from the faulting page.

use crate::config::Geometry;
use crate::constants::ROOT_FRAME;
use crate::memory::PhysicalMemory;
use crate::translation::{compose_page_index, page_index_of};

/// Position of a frame in the tree: the frame itself and the table entry linking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub frame: usize,
    pub parent: usize,
    pub offset: usize,
}

/// A resident data page considered for eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub slot: Slot,
    pub page: u64,
    pub distance: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// An unlinked-children table frame other than the root or the ignore frame.
    FoundEmpty(Slot),
    Scanned {
        max_frame: usize,
        victim: Option<Candidate>,
    },
}

impl ScanOutcome {
    /// Fold a child's outcome into its parent's.
    ///
    /// Found-empty dominates everything. Otherwise the larger frame index is
    /// kept and the victim is replaced only by a strictly farther one, so the
    /// first maximum in depth-first order survives ties.
    pub fn merge(self, child: ScanOutcome) -> ScanOutcome {
        match (self, child) {
            (ScanOutcome::FoundEmpty(_), _) => self,
            (_, ScanOutcome::FoundEmpty(_)) => child,
            (
                ScanOutcome::Scanned { max_frame, victim },
                ScanOutcome::Scanned {
                    max_frame: child_max,
                    victim: child_victim,
                },
            ) => ScanOutcome::Scanned {
                max_frame: max_frame.max(child_max),
                victim: farther(victim, child_victim),
            },
        }
    }

    pub fn is_found_empty(&self) -> bool {
        matches!(self, ScanOutcome::FoundEmpty(_))
    }
}

fn farther(current: Option<Candidate>, challenger: Option<Candidate>) -> Option<Candidate> {
    match (current, challenger) {
        (Some(c), Some(n)) if n.distance > c.distance => Some(n),
        (None, n) => n,
        (c, _) => c,
    }
}

/// Wraparound distance between two page indices over the whole page space.
pub fn cyclic_distance(geometry: &Geometry, a: u64, b: u64) -> u64 {
    let direct = a.abs_diff(b);
    direct.min(geometry.num_pages() - direct)
}

/// Scan the whole tree on behalf of a fault on `va`.
///
/// `ignore` is the table frame the fault is about to link into; it is never
/// reported as empty even when it has no children yet.
pub fn scan(geometry: &Geometry, pm: &PhysicalMemory, va: u64, ignore: usize) -> ScanOutcome {
    let walker = Walker {
        geometry,
        pm,
        target_page: page_index_of(geometry, va),
        ignore,
    };
    let root = Slot {
        frame: ROOT_FRAME,
        parent: ROOT_FRAME,
        offset: 0,
    };
    walker.visit(root, 0, 0)
}

/// Highest frame index reachable from the root, found without short-circuiting.
pub fn max_linked_frame(geometry: &Geometry, pm: &PhysicalMemory) -> usize {
    fn visit(geometry: &Geometry, pm: &PhysicalMemory, frame: usize, depth: u32) -> usize {
        if depth == geometry.tables_depth() {
            return frame;
        }
        (0..geometry.entries_in(frame))
            .map(|offset| pm.entry(frame, offset))
            .filter(|&child| child != 0)
            .map(|child| visit(geometry, pm, child, depth + 1))
            .fold(frame, usize::max)
    }
    visit(geometry, pm, ROOT_FRAME, 0)
}

struct Walker<'a> {
    geometry: &'a Geometry,
    pm: &'a PhysicalMemory,
    target_page: u64,
    ignore: usize,
}

impl Walker<'_> {
    fn visit(&self, slot: Slot, page: u64, depth: u32) -> ScanOutcome {
        if depth == self.geometry.tables_depth() {
            return ScanOutcome::Scanned {
                max_frame: slot.frame,
                victim: Some(Candidate {
                    slot,
                    page,
                    distance: cyclic_distance(self.geometry, page, self.target_page),
                }),
            };
        }

        let mut outcome = ScanOutcome::Scanned {
            max_frame: slot.frame,
            victim: None,
        };
        let mut has_children = false;
        for offset in 0..self.geometry.entries_in(slot.frame) {
            let child = self.pm.entry(slot.frame, offset);
            if child == 0 {
                continue;
            }
            has_children = true;

            let child_slot = Slot {
                frame: child,
                parent: slot.frame,
                offset,
            };
            let child_page =
                compose_page_index(self.geometry, page, offset as u64, slot.frame == ROOT_FRAME);
            outcome = outcome.merge(self.visit(child_slot, child_page, depth + 1));
            if outcome.is_found_empty() {
                return outcome;
            }
        }

        if !has_children && slot.frame != self.ignore && slot.frame != ROOT_FRAME {
            return ScanOutcome::FoundEmpty(slot);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 6-bit VA, 4-word pages, depth 2 (2-bit root), 8 frames, 16 pages
    fn tiny() -> Geometry {
        Geometry::new(2, 5, 6, 2).unwrap()
    }

    fn va_of_page(page: u64) -> u64 {
        page << 2
    }

    fn slot(frame: usize, parent: usize, offset: usize) -> Slot {
        Slot {
            frame,
            parent,
            offset,
        }
    }

    fn candidate(slot: Slot, page: u64, distance: u64) -> Candidate {
        Candidate {
            slot,
            page,
            distance,
        }
    }

    fn scanned(max_frame: usize, victim: Option<Candidate>) -> ScanOutcome {
        ScanOutcome::Scanned { max_frame, victim }
    }

    #[test]
    fn test_cyclic_distance_wraps() {
        let geo = tiny();
        assert_eq!(cyclic_distance(&geo, 0, 6), 6);
        assert_eq!(cyclic_distance(&geo, 0, 10), 6);
        assert_eq!(cyclic_distance(&geo, 15, 0), 1);
        assert_eq!(cyclic_distance(&geo, 3, 3), 0);
        assert_eq!(cyclic_distance(&geo, 0, 8), 8);
    }

    #[test]
    fn test_empty_tree() {
        let geo = tiny();
        let pm = PhysicalMemory::new(&geo);
        assert_eq!(scan(&geo, &pm, 0, 0), scanned(0, None));
    }

    #[test]
    fn test_root_is_never_reported_empty() {
        let geo = tiny();
        let pm = PhysicalMemory::new(&geo);
        // even when the fault links into some other frame
        assert!(!scan(&geo, &pm, 0, 5).is_found_empty());
    }

    #[test]
    fn test_farthest_leaf_is_victim() {
        let geo = tiny();
        let mut pm = PhysicalMemory::new(&geo);
        pm.set_entry(0, 1, 1);
        pm.set_entry(1, 2, 2); // page 0b01_10 = 6
        pm.set_entry(1, 3, 3); // page 0b01_11 = 7

        let outcome = scan(&geo, &pm, va_of_page(0), 0);
        assert_eq!(outcome, scanned(3, Some(candidate(slot(3, 1, 3), 7, 7))));
    }

    #[test]
    fn test_ties_keep_first_in_dfs_order() {
        let geo = tiny();
        let mut pm = PhysicalMemory::new(&geo);
        pm.set_entry(0, 1, 1);
        pm.set_entry(1, 0, 2); // page 4
        pm.set_entry(0, 3, 3);
        pm.set_entry(3, 0, 4); // page 12

        // both are 4 pages away from page 0
        let outcome = scan(&geo, &pm, va_of_page(0), 0);
        assert_eq!(outcome, scanned(4, Some(candidate(slot(2, 1, 0), 4, 4))));
    }

    #[test]
    fn test_empty_table_wins() {
        let geo = tiny();
        let mut pm = PhysicalMemory::new(&geo);
        pm.set_entry(0, 1, 1);
        pm.set_entry(1, 2, 2);
        pm.set_entry(0, 3, 4); // table with no children

        let outcome = scan(&geo, &pm, va_of_page(0), 0);
        assert_eq!(outcome, ScanOutcome::FoundEmpty(slot(4, 0, 3)));
    }

    #[test]
    fn test_first_empty_table_short_circuits() {
        let geo = tiny();
        let mut pm = PhysicalMemory::new(&geo);
        pm.set_entry(0, 0, 3); // empty, visited first
        pm.set_entry(0, 2, 5); // also empty
        pm.set_entry(0, 3, 1);
        pm.set_entry(1, 0, 7);

        let outcome = scan(&geo, &pm, va_of_page(9), 0);
        assert_eq!(outcome, ScanOutcome::FoundEmpty(slot(3, 0, 0)));
    }

    #[test]
    fn test_ignore_frame_not_reported_empty() {
        let geo = tiny();
        let mut pm = PhysicalMemory::new(&geo);
        pm.set_entry(0, 2, 1); // freshly linked table the fault is filling
        pm.set_entry(0, 3, 2);
        pm.set_entry(2, 1, 3); // page 13

        let outcome = scan(&geo, &pm, va_of_page(8), 1);
        assert_eq!(outcome, scanned(3, Some(candidate(slot(3, 2, 1), 13, 5))));
    }

    #[test]
    fn test_max_linked_frame_sees_past_empty_tables() {
        let geo = tiny();
        let mut pm = PhysicalMemory::new(&geo);
        assert_eq!(max_linked_frame(&geo, &pm), 0);

        pm.set_entry(0, 0, 2); // empty table
        pm.set_entry(0, 3, 5);
        pm.set_entry(5, 1, 6);
        assert!(scan(&geo, &pm, 0, 0).is_found_empty());
        assert_eq!(max_linked_frame(&geo, &pm), 6);
    }

    #[test]
    fn test_merge_priorities() {
        let empty = ScanOutcome::FoundEmpty(slot(2, 0, 1));
        let near = scanned(6, Some(candidate(slot(6, 1, 0), 1, 1)));
        let far = scanned(3, Some(candidate(slot(3, 1, 1), 5, 5)));
        let bare = scanned(0, None);

        assert_eq!(bare.merge(empty), empty);
        assert_eq!(empty.merge(far), empty);
        assert_eq!(bare.merge(near), near);
        assert_eq!(
            near.merge(far),
            scanned(6, Some(candidate(slot(3, 1, 1), 5, 5)))
        );
        // equal distance does not displace the incumbent
        let twin = scanned(7, Some(candidate(slot(7, 4, 2), 9, 5)));
        assert_eq!(
            far.merge(twin),
            scanned(7, Some(candidate(slot(3, 1, 1), 5, 5)))
        );
    }
}
