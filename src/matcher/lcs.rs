/// Length of a longest common subsequence of two byte strings; a measure of
/// similarity that tolerates mismatches and indels.
///
/// Row-compressed dynamic programming: O(|a|·|b|) time, O(min(|a|,|b|))
/// space. No traceback.
pub fn lcs_length(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // keep the DP rows over the shorter string
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut previous = vec![0usize; short.len() + 1];
    let mut current = vec![0usize; short.len() + 1];

    for &ch in long {
        for (j, &other) in short.iter().enumerate() {
            current[j + 1] = if ch == other {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[short.len()]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
