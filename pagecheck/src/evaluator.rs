//! Segment alignment evaluator.
//!
//! A `PT_LOAD` segment passes when either
//! - `p_align >= page_size`, or
//! - both `p_offset` and `p_vaddr` fall on a page boundary.
//!
//! Every other segment type is ignored.

use serde::{Deserialize, Serialize};

use crate::config::PageSize;
use crate::elf::ProgramHeaderEntry;

/// A `PT_LOAD` segment that fails the page-size check.
///
/// Field values are copied verbatim from the program header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlignmentIssue {
    pub p_align: u64,
    pub p_offset: u64,
    pub p_vaddr: u64,
}

/// Judge one program header entry against `page_size`.
///
/// `p_align` comes from an untrusted binary and is not assumed to be a power
/// of two.
pub fn evaluate(entry: &ProgramHeaderEntry, page_size: PageSize) -> Option<AlignmentIssue> {
    if !entry.is_load() {
        return None;
    }

    let align_ok = entry.p_align >= page_size.get();
    let placement_ok = page_size.is_aligned(entry.p_offset) && page_size.is_aligned(entry.p_vaddr);

    if align_ok || placement_ok {
        return None;
    }

    Some(AlignmentIssue {
        p_align: entry.p_align,
        p_offset: entry.p_offset,
        p_vaddr: entry.p_vaddr,
    })
}

/// Evaluate a sequence of program headers, keeping issues in input order.
pub fn evaluate_all<I>(entries: I, page_size: PageSize) -> Vec<AlignmentIssue>
where
    I: IntoIterator<Item = ProgramHeaderEntry>,
{
    entries
        .into_iter()
        .filter_map(|entry| evaluate(&entry, page_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elf::{PT_DYNAMIC, PT_LOAD};

    fn load(p_align: u64, p_offset: u64, p_vaddr: u64) -> ProgramHeaderEntry {
        ProgramHeaderEntry {
            p_type: PT_LOAD,
            p_offset,
            p_vaddr,
            p_align,
        }
    }

    #[test]
    fn test_large_alignment_passes() {
        assert_eq!(evaluate(&load(16384, 0, 0), PageSize::SIZE_16K), None);
        assert_eq!(evaluate(&load(65536, 123, 456), PageSize::SIZE_16K), None);
    }

    #[test]
    fn test_page_placed_segment_passes_with_small_alignment() {
        assert_eq!(evaluate(&load(4096, 16384, 32768), PageSize::SIZE_16K), None);
    }

    #[test]
    fn test_4k_library_fails() {
        assert_eq!(
            evaluate(&load(4096, 4096, 8192), PageSize::SIZE_16K),
            Some(AlignmentIssue {
                p_align: 4096,
                p_offset: 4096,
                p_vaddr: 8192,
            })
        );
    }

    #[test]
    fn test_only_offset_aligned_fails() {
        assert!(evaluate(&load(4096, 16384, 4096), PageSize::SIZE_16K).is_some());
    }

    #[test]
    fn test_non_power_of_two_alignment() {
        assert_eq!(evaluate(&load(20000, 1, 1), PageSize::SIZE_16K), None);
        assert!(evaluate(&load(12345, 1, 1), PageSize::SIZE_16K).is_some());
    }

    #[test]
    fn test_non_load_ignored() {
        let dynamic = ProgramHeaderEntry {
            p_type: PT_DYNAMIC,
            p_offset: 1,
            p_vaddr: 3,
            p_align: 8,
        };
        assert_eq!(evaluate(&dynamic, PageSize::SIZE_16K), None);
    }

    #[test]
    fn test_other_page_size() {
        let page = PageSize::new(4096).unwrap();
        assert_eq!(evaluate(&load(4096, 4096, 8192), page), None);
    }

    #[test]
    fn test_evaluate_all_preserves_order() {
        let issues = evaluate_all(
            vec![load(4096, 1, 1), load(16384, 0, 0), load(8, 2, 2)],
            PageSize::SIZE_16K,
        );
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].p_offset, 1);
        assert_eq!(issues[1].p_offset, 2);
    }
}
