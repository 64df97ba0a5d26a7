use crate::kmer::KmerScanner;
use crate::rank::{KmerRank, KmerRankTable};

/// One minimizer window: the rank of the smallest-rank k-mer found in the
/// window's k-mer run and the offset of that k-mer's first base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub minimizer: KmerRank,
    pub offset: usize,
}

/// Partition a sequence into non-overlapping windows of `w` bases and emit
/// the rank minimizer of each window.
///
/// The window id of a k-mer starting at position i is i / w. Ties within a
/// window go to the earliest offset. A window whose k-mer run is empty
/// (e.g. covered by Ns) emits nothing, as does a sequence shorter than k.
pub fn get_windows(sequence: &[u8], w: usize, table: &KmerRankTable) -> Vec<Window> {
    debug_assert!(w >= 1);

    let mut windows = Vec::new();

    let mut current_id = None;
    let mut current = Window {
        minimizer: 0,
        offset: 0,
    };

    for (kmer, offset) in KmerScanner::new(sequence, table.k) {
        let rank = table.rank(kmer);
        let id = offset / w;

        match current_id {
            Some(open_id) if open_id == id => {
                if rank < current.minimizer {
                    current = Window {
                        minimizer: rank,
                        offset,
                    };
                }
            }
            _ => {
                // first k-mer of a new window: emit the previous one
                if current_id.is_some() {
                    windows.push(current);
                }
                current_id = Some(id);
                current = Window {
                    minimizer: rank,
                    offset,
                };
            }
        }
    }

    if current_id.is_some() {
        windows.push(current);
    }

    windows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
