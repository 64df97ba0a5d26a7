use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::matcher::lcs::lcs_length;
use crate::matcher::MatchConfig;
use crate::pattern::Location;
use crate::window::get_windows;

/// A validated placement of one read against one pattern.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Index of the pattern in the catalog.
    pub index: usize,
    /// Offset of the pattern's matching substring.
    pub offset: usize,
    /// Length of the read that produced this candidate.
    pub length: usize,
    /// LCS length between the read and the aligned pattern substring;
    /// zero denotes an unmatched mate in single-read mode.
    pub matching_bases: usize,
}

/// Candidates of one read, keyed by pattern index.
pub type CandidateMap = BTreeMap<usize, Vec<Candidate>>;

/// Minimum number of matching bases for a sequence of the given length.
pub fn min_matches(length: usize, min_bases: f64) -> usize {
    ((min_bases / 100.0) * length as f64).ceil() as usize
}

/// Extract minimizers from a sequence, look them up in the pattern index,
/// and emit the implied (pattern, alignment offset) locations, sorted by
/// (index, offset). `None` as the eligibility set admits all patterns.
fn get_locations(
    sequence: &[u8],
    config: &MatchConfig,
    eligible: Option<&HashSet<usize>>,
) -> Vec<Location> {
    let mut locations = Vec::new();

    for window in get_windows(sequence, config.w, config.rank_table) {
        if window.minimizer >= config.max_minimizer {
            continue; // ignore common minimizer
        }

        let Some(bucket) = config.pattern_map.get(&window.minimizer) else {
            continue; // minimizer is not in the index
        };

        for location in bucket {
            if let Some(eligible) = eligible {
                if !eligible.contains(&location.index) {
                    continue;
                }
            }

            // starting offset of the pattern's matching substring; the
            // minimizer may sit at a non-zero offset of the read
            locations.push(Location {
                index: location.index,
                offset: location.offset.saturating_sub(window.offset),
            });
        }
    }

    locations.sort_by_key(|location| (location.index, location.offset));
    locations
}

/// Identify candidate matches of one read: runs of at least `min_mins`
/// identical locations gate an LCS comparison of the read against the
/// aligned pattern substring, which must reach the matching-base threshold.
pub fn find_candidates(
    sequence: &[u8],
    config: &MatchConfig,
    eligible: Option<&HashSet<usize>>,
) -> CandidateMap {
    let locations = get_locations(sequence, config, eligible);

    let length = sequence.len();
    let threshold = min_matches(length, config.min_bases);

    let mut cmap = CandidateMap::new();

    let mut i = 0;
    while i < locations.len() {
        let location = locations[i];

        let mut count = 1;
        i += 1;
        while i < locations.len() && locations[i] == location {
            count += 1;
            i += 1;
        }

        if count < config.min_mins {
            continue; // not enough matching minimizers
        }

        let pattern_sequence = config.patterns[location.index].sequence.as_bytes();
        let compare_len = length.min(pattern_sequence.len() - location.offset);

        let matching_bases = lcs_length(
            sequence,
            &pattern_sequence[location.offset..location.offset + compare_len],
        );

        if matching_bases < threshold {
            continue; // not enough matching bases
        }

        cmap.entry(location.index).or_default().push(Candidate {
            index: location.index,
            offset: location.offset,
            length,
            matching_bases,
        });
    }

    cmap
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
