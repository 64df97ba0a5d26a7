use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Error;
use crate::rank::{KmerRank, KmerRankTable};
use crate::window::get_windows;

/// A junction pattern: a nucleotide sequence with an embedded junction
/// marker. Brackets `]...[` mark a fusion boundary; braces `}...{` mark an
/// internal tandem duplication span.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    /// Sequence with its two delimiter characters.
    pub display_sequence: String,
    /// Sequence with the delimiters stripped.
    pub sequence: String,
    /// true = braces (ITD), false = brackets (fusion)
    pub has_braces: bool,
    /// Bases before the first delimiter.
    pub left_bases: usize,
    /// Bases between the delimiters.
    pub middle_bases: usize,
    /// Bases after the second delimiter.
    pub right_bases: usize,
    /// Offset of the second delimiter in `display_sequence`.
    pub delim2: usize,
    pub annotations: Vec<String>,
}

impl Pattern {
    /// Parse a pattern from its name and delimited display sequence.
    pub fn new(name: &str, display_sequence: &str) -> Result<Self, Error> {
        if name.is_empty() || name.contains(' ') {
            return Err(Error::Pattern(format!("invalid pattern name '{}'", name)));
        }

        let (delim1, delim2, has_braces) = find_delimiters(display_sequence)
            .ok_or_else(|| Error::Pattern(format!("invalid pattern {}", display_sequence)))?;

        if delim1 == 0 || delim2 == display_sequence.len() - 1 || delim1 > delim2 {
            return Err(Error::Pattern(format!("invalid pattern {}", display_sequence)));
        }

        let left_bases = delim1;
        let middle_bases = delim2 - delim1 - 1;
        let right_bases = display_sequence.len() - 1 - delim2;

        let mut sequence = String::with_capacity(display_sequence.len() - 2);
        sequence.push_str(&display_sequence[..delim1]);
        sequence.push_str(&display_sequence[delim1 + 1..delim2]);
        sequence.push_str(&display_sequence[delim2 + 1..]);

        Ok(Self {
            name: name.to_string(),
            display_sequence: display_sequence.to_string(),
            sequence,
            has_braces,
            left_bases,
            middle_bases,
            right_bases,
            delim2,
            annotations: Vec::new(),
        })
    }
}

/// Locate the delimiter pair of a display sequence: exactly one `]` and one
/// `[`, or exactly one `}` and one `{`.
fn find_delimiters(display: &str) -> Option<(usize, usize, bool)> {
    let count = |ch: char| display.matches(ch).count();

    if count(']') == 1 && count('[') == 1 && count('}') == 0 && count('{') == 0 {
        Some((display.find(']')?, display.find('[')?, false))
    } else if count('}') == 1 && count('{') == 1 && count(']') == 0 && count('[') == 0 {
        Some((display.find('}')?, display.find('{')?, true))
    } else {
        None
    }
}

/// Read the pattern catalog: tab-separated, first line a header whose first
/// two columns are `pattern` and `sequence`; further columns are annotation
/// headings kept verbatim. Returns the patterns and the annotation headings.
pub fn read_patterns(path: &Path) -> Result<(Vec<Pattern>, Vec<String>), Error> {
    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    let reader = BufReader::new(file);

    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line.map_err(|e| Error::io(e, path))?,
        None => return Err(Error::Pattern(format!("{} is empty", path.display()))),
    };

    let heading: Vec<&str> = header.split('\t').collect();
    if heading.len() < 2 || heading[0] != "pattern" || heading[1] != "sequence" {
        return Err(Error::Pattern(format!(
            "unexpected heading line in {}",
            path.display()
        )));
    }

    let annotation_headings: Vec<String> =
        heading[2..].iter().map(|s| s.to_string()).collect();

    let mut patterns = Vec::new();

    for (line_num, line) in lines.enumerate() {
        let line = line.map_err(|e| Error::io(e, path))?;
        if line.is_empty() {
            continue;
        }

        let column: Vec<&str> = line.split('\t').collect();
        if column.len() != heading.len() {
            return Err(Error::Pattern(format!(
                "unexpected #columns at {}:{}",
                path.display(),
                line_num + 2
            )));
        }

        let mut pattern = Pattern::new(column[0], column[1])?;
        pattern.annotations = column[2..].iter().map(|s| s.to_string()).collect();
        patterns.push(pattern);
    }

    Ok((patterns, annotation_headings))
}

/// A location of a minimizer within a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Index of the pattern in the catalog.
    pub index: usize,
    /// Offset within the pattern's delimiter-stripped sequence.
    pub offset: usize,
}

/// Index from uncommon minimizer to the locations of that minimizer in the
/// patterns. Built once at startup, immutable thereafter; bucket order is
/// pattern-insertion order.
pub type PatternMap = HashMap<KmerRank, Vec<Location>>;

/// Build the minimizer index over all patterns, ignoring minimizers at or
/// above the rank cutoff.
pub fn create_pattern_map(
    patterns: &[Pattern],
    w: usize,
    table: &KmerRankTable,
    max_minimizer: KmerRank,
) -> PatternMap {
    let mut map = PatternMap::new();

    for (index, pattern) in patterns.iter().enumerate() {
        for window in get_windows(pattern.sequence.as_bytes(), w, table) {
            if window.minimizer >= max_minimizer {
                continue; // common minimizer stays out of the map
            }

            map.entry(window.minimizer).or_default().push(Location {
                index,
                offset: window.offset,
            });
        }
    }

    map
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
