pub mod candidate;
pub mod lcs;

use std::collections::HashSet;

pub use candidate::{find_candidates, min_matches, Candidate, CandidateMap};
pub use lcs::lcs_length;

use crate::pattern::{Pattern, PatternMap};
use crate::rank::{KmerRank, KmerRankTable};

/// Run configuration captured by reference in the matcher and the workers.
/// Immutable for the lifetime of a run.
pub struct MatchConfig<'a> {
    pub patterns: &'a [Pattern],
    pub pattern_map: &'a PatternMap,
    pub rank_table: &'a KmerRankTable,
    pub w: usize,
    pub max_minimizer: KmerRank,
    pub min_bases: f64,
    pub min_mins: usize,
    pub max_insert: usize,
    pub max_trim: i64,
    pub min_overlap: usize,
    pub best_overall: bool,
    pub find_single: bool,
}

/// A pair of candidates on the same pattern: c1 for the forward first read,
/// c2 for the reverse complement of the second read. In single-read mode one
/// side is a synthetic unmatched mate with zero matching bases.
#[derive(Debug, Clone)]
pub struct Match {
    pub c1: Candidate,
    pub c2: Candidate,
}

impl Match {
    /// Total matching bases of the pair.
    pub fn matching_bases(&self) -> usize {
        self.c1.matching_bases + self.c2.matching_bases
    }

    /// Maximum possible number of matching bases.
    pub fn possible(&self) -> usize {
        if self.c1.matching_bases == 0 {
            self.c2.length
        } else if self.c2.matching_bases == 0 {
            self.c1.length
        } else {
            self.c1.length + self.c2.length
        }
    }

    /// Insert size of the pair aligned to the pattern.
    pub fn insert_size(&self) -> usize {
        if self.c1.matching_bases == 0 {
            self.c2.length
        } else if self.c2.matching_bases == 0 {
            self.c1.length
        } else if self.c1.offset <= self.c2.offset {
            self.c1.length.max(self.c2.offset - self.c1.offset + self.c2.length)
        } else {
            self.c2.length.max(self.c1.offset - self.c2.offset + self.c1.length)
        }
    }
}

/// Find the best read-pair match per pattern, or the best overall match
/// across patterns when `best_overall` is set. Pairs violating the insert
/// size or the trim constraint are rejected.
fn get_best_pair(cmap1: &CandidateMap, cmap2: &CandidateMap, config: &MatchConfig) -> Vec<Match> {
    let mut matches: Vec<Match> = Vec::new();
    let mut best = 0;

    for (index, candidates1) in cmap1 {
        let Some(candidates2) = cmap2.get(index) else {
            continue;
        };

        for c1 in candidates1 {
            for c2 in candidates2 {
                let m = Match {
                    c1: c1.clone(),
                    c2: c2.clone(),
                };

                // the second read may not sit more than max_trim bases
                // ahead of the first
                if m.insert_size() > config.max_insert
                    || c1.offset as i64 - c2.offset as i64 > config.max_trim
                {
                    continue;
                }

                if best == matches.len() {
                    matches.push(m);
                } else if m.matching_bases() > matches[best].matching_bases()
                    || (m.matching_bases() == matches[best].matching_bases()
                        && m.insert_size() < matches[best].insert_size())
                {
                    matches[best] = m;
                }
            }
        }

        if !config.best_overall && best < matches.len() {
            best += 1; // advance for the next pattern
        }
    }

    matches
}

/// Find the best single-read match per pattern (or overall), synthesizing an
/// unmatched mate of the other read's length on the opposite side.
fn get_best_single(
    cmap: &CandidateMap,
    best_overall: bool,
    first_read: bool,
    mate_length: usize,
    matches: &mut Vec<Match>,
) {
    let mut best = if best_overall { 0 } else { matches.len() };

    for candidates in cmap.values() {
        for c in candidates {
            if best == matches.len() || c.matching_bases > matches[best].matching_bases() {
                let mate = Candidate {
                    index: c.index,
                    offset: c.offset,
                    length: mate_length,
                    matching_bases: 0,
                };

                let m = if first_read {
                    Match { c1: c.clone(), c2: mate }
                } else {
                    Match { c1: mate, c2: c.clone() }
                };

                if best == matches.len() {
                    matches.push(m);
                } else {
                    matches[best] = m;
                }
            }
        }

        if !best_overall && best < matches.len() {
            best += 1; // advance for the next pattern
        }
    }
}

/// Find pattern matches for a read pair. `revcomp2` is the second mate
/// already reverse-complemented. When `find_single` is set, single-read
/// matches are sought if the pair search comes up empty; otherwise the
/// second read is only searched in patterns the first read hit. The result
/// is sorted by descending matching bases, then ascending insert size, then
/// ascending pattern index.
pub fn get_matches(sequence1: &[u8], revcomp2: &[u8], config: &MatchConfig) -> Vec<Match> {
    let cmap1 = find_candidates(sequence1, config, None);

    if cmap1.is_empty() && !config.find_single {
        return Vec::new();
    }

    let cmap2 = if config.find_single {
        find_candidates(revcomp2, config, None)
    } else {
        let eligible: HashSet<usize> = cmap1.keys().copied().collect();
        find_candidates(revcomp2, config, Some(&eligible))
    };

    let mut matches = if !cmap1.is_empty() && !cmap2.is_empty() {
        get_best_pair(&cmap1, &cmap2, config)
    } else {
        Vec::new()
    };

    if matches.is_empty() && config.find_single {
        get_best_single(&cmap1, config.best_overall, true, revcomp2.len(), &mut matches);
        get_best_single(&cmap2, config.best_overall, false, sequence1.len(), &mut matches);
    }

    matches.sort_by(|a, b| {
        b.matching_bases()
            .cmp(&a.matching_bases())
            .then(a.insert_size().cmp(&b.insert_size()))
            .then(a.c1.index.cmp(&b.c1.index))
    });

    matches
}

/// Overlap-region measurements of one mate against the pattern's left and
/// right sides, computed at validation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct MateOverlap {
    pub left_overlap: usize,
    pub left_matching: usize,
    pub right_overlap: usize,
    pub right_matching: usize,
    pub junction_spanning: bool,
}

/// Measure one mate's overlap with both sides of the pattern. A side fully
/// containing the aligned footprint inherits the candidate's whole-read LCS
/// score instead of re-running the DP.
fn measure_overlaps(sequence: &[u8], pattern: &Pattern, c: &Candidate, config: &MatchConfig) -> MateOverlap {
    if c.matching_bases == 0 {
        return MateOverlap::default(); // unmatched mate
    }

    let pattern_sequence = pattern.sequence.as_bytes();
    let pattern_len = pattern_sequence.len();
    let footprint = sequence.len().min(pattern_len - c.offset);

    let left_overlap = footprint.min(pattern.left_bases.saturating_sub(c.offset));

    let left_matching = if left_overlap == 0 {
        0
    } else if left_overlap == footprint {
        c.matching_bases
    } else {
        lcs_length(
            &sequence[..left_overlap],
            &pattern_sequence[c.offset..c.offset + left_overlap],
        )
    };

    let right_start = pattern_len - pattern.right_bases;
    let right_overlap = footprint.saturating_sub(right_start.saturating_sub(c.offset));

    let right_matching = if right_overlap == 0 {
        0
    } else if right_overlap == footprint {
        c.matching_bases
    } else {
        lcs_length(
            &sequence[sequence.len() - right_overlap..],
            &pattern_sequence[c.offset + footprint - right_overlap..c.offset + footprint],
        )
    };

    let junction_spanning = left_overlap >= config.min_overlap
        && right_overlap >= config.min_overlap
        && left_matching >= min_matches(left_overlap, config.min_bases)
        && right_matching >= min_matches(right_overlap, config.min_bases);

    MateOverlap {
        left_overlap,
        left_matching,
        right_overlap,
        right_matching,
        junction_spanning,
    }
}

/// Validate a match's junction-side overlaps. Returns the per-mate overlap
/// measurements when the match is kept, `None` when it is dropped.
///
/// A match is valid iff some mate covers each side by at least
/// `min_overlap`, each side's combined LCS reaches the matching-base
/// threshold on the combined overlap, and (for ITD patterns) at least one
/// mate spans the junction on its own.
pub fn validate_overlaps(
    sequence1: &[u8],
    revcomp2: &[u8],
    m: &Match,
    config: &MatchConfig,
) -> Option<(MateOverlap, MateOverlap)> {
    let pattern = &config.patterns[m.c1.index];

    let ov1 = measure_overlaps(sequence1, pattern, &m.c1, config);
    let ov2 = measure_overlaps(revcomp2, pattern, &m.c2, config);

    if ov1.left_overlap.max(ov2.left_overlap) < config.min_overlap
        || ov1.right_overlap.max(ov2.right_overlap) < config.min_overlap
    {
        return None;
    }

    if ov1.left_matching + ov2.left_matching
        < min_matches(ov1.left_overlap + ov2.left_overlap, config.min_bases)
        || ov1.right_matching + ov2.right_matching
            < min_matches(ov1.right_overlap + ov2.right_overlap, config.min_bases)
    {
        return None;
    }

    if pattern.has_braces && !ov1.junction_spanning && !ov2.junction_spanning {
        return None; // an ITD needs a junction-spanning mate
    }

    Some((ov1, ov2))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
