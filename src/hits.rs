/// Reading and writing hits: the textual wire format shared with every
/// downstream tool.
///
/// A hit is three consecutive lines: one `pattern ` line and two `read `
/// lines. A hit stream starts with a `fuzzion2 ` heading line and ends with
/// a `read-pairs ` trailer; concatenated streams repeat both.
use std::io::{BufRead, Write};

use crate::error::Error;
use crate::matcher::{Match, MateOverlap};
use crate::pattern::Pattern;

pub const FUZZION2: &str = "fuzzion2 ";
pub const PATTERN: &str = "pattern ";
pub const READ: &str = "read ";
pub const READ_PAIRS: &str = "read-pairs ";

/// Default minimum overlap for a strong match.
pub const DEFAULT_MIN_STRONG: usize = 15;

const MAX_HITS: usize = u32::MAX as usize;

// fixed column headings
const SEQUENCE: &str = "sequence";
const MBASES: &str = "matching bases";
const POSSIBLE: &str = "possible";
const PERCENT: &str = "% match";
const SPANNING: &str = "junction spanning";
const LEFT_OVERLAP: &str = "left overlap";
const RIGHT_OVERLAP: &str = "right overlap";
const ISIZE: &str = "insert size";

const SEQUENCE_COL: usize = 1;
const MBASES_COL: usize = 2;
const POSSIBLE_COL: usize = 3;
const PERCENT_COL: usize = 4;
const SPANNING_COL: usize = 5;
const LEFT_COL: usize = 6;
const RIGHT_COL: usize = 7;
const ISIZE_COL: usize = 8;
const MIN_HEADING_COLS: usize = 9;
const READ_COLS: usize = 8;

/// The pattern side of a hit.
#[derive(Debug, Clone)]
pub struct HitPattern {
    pub name: String,
    /// Display sequence windowed to the match footprint, delimiters included.
    pub display_sequence: String,
    /// Bases before the first delimiter of the windowed display.
    pub left_bases: usize,
    /// Bases after the second delimiter of the windowed display.
    pub right_bases: usize,
    pub matching_bases: usize,
    pub possible: usize,
    pub spanning_count: usize,
    pub insert_size: usize,
    pub annotations: Vec<String>,
}

impl HitPattern {
    pub fn percent_match(&self) -> f64 {
        100.0 * self.matching_bases as f64 / self.possible as f64
    }
}

/// One read of a hit.
#[derive(Debug, Clone)]
pub struct HitRead {
    pub name: String,
    /// Blanks preceding the read sequence in the display.
    pub leading_blanks: usize,
    pub sequence: String,
    /// Zero for an unmatched mate.
    pub matching_bases: usize,
    pub is_spanning: bool,
    pub left_overlap: usize,
    pub right_overlap: usize,
}

impl HitRead {
    pub fn possible(&self) -> usize {
        self.sequence.len()
    }

    /// Percent match column; an unmatched mate has no percentage.
    pub fn percent_column(&self) -> String {
        if self.matching_bases == 0 {
            "N/A".to_string()
        } else {
            format!(
                "{:.1}",
                100.0 * self.matching_bases as f64 / self.possible() as f64
            )
        }
    }
}

/// An externalized, overlap-validated match.
#[derive(Debug, Clone)]
pub struct Hit {
    pub pattern: HitPattern,
    pub read1: HitRead,
    pub read2: HitRead,
}

/// Strength label of a stored hit (duplicates are labeled separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strength {
    Weak,
    StrongMinus,
    StrongPlus,
}

impl std::fmt::Display for Strength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weak => write!(f, "weak"),
            Self::StrongMinus => write!(f, "strong-"),
            Self::StrongPlus => write!(f, "strong+"),
        }
    }
}

impl Hit {
    /// Two hits are duplicates if they agree on the pattern name and the
    /// windowed left/right widths.
    pub fn same_as(&self, other: &Hit) -> bool {
        self.pattern.name == other.pattern.name
            && self.pattern.left_bases == other.pattern.left_bases
            && self.pattern.right_bases == other.pattern.right_bases
    }

    /// `strong+` needs a strong overlap on each side and a spanning mate;
    /// `strong-` is strong on both sides without one; `weak` otherwise.
    pub fn strength(&self, min_strong: usize) -> Strength {
        let left = self.read1.left_overlap.max(self.read2.left_overlap);
        let right = self.read1.right_overlap.max(self.read2.right_overlap);
        let strong = left >= min_strong && right >= min_strong;
        let spanning = self.read1.is_spanning || self.read2.is_spanning;

        match (strong, spanning) {
            (true, true) => Strength::StrongPlus,
            (true, false) => Strength::StrongMinus,
            _ => Strength::Weak,
        }
    }

    pub fn write(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let pattern = &self.pattern;
        write!(
            out,
            "{}{}\t{}\t{}\t{}\t{:.1}\t{}\t\t\t{}",
            PATTERN,
            pattern.name,
            pattern.display_sequence,
            pattern.matching_bases,
            pattern.possible,
            pattern.percent_match(),
            pattern.spanning_count,
            pattern.insert_size,
        )?;
        for annotation in &pattern.annotations {
            write!(out, "\t{}", annotation)?;
        }
        writeln!(out)?;

        for read in [&self.read1, &self.read2] {
            writeln!(
                out,
                "{}{}\t{}{}\t{}\t{}\t{}\t{}\t{}\t{}",
                READ,
                read.name,
                " ".repeat(read.leading_blanks),
                read.sequence,
                read.matching_bases,
                read.possible(),
                read.percent_column(),
                u8::from(read.is_spanning),
                read.left_overlap,
                read.right_overlap,
            )?;
        }

        Ok(())
    }
}

/// Build the externalized form of a validated match. `revcomp2` is the
/// second mate in aligned (reverse-complemented) orientation, as displayed.
pub fn build_hit(
    name1: &str,
    sequence1: &[u8],
    name2: &str,
    revcomp2: &[u8],
    pattern: &Pattern,
    m: &Match,
    ov1: &MateOverlap,
    ov2: &MateOverlap,
) -> Hit {
    let pattern_len = pattern.sequence.len();

    let len1 = sequence1.len().min(pattern_len - m.c1.offset);
    let len2 = revcomp2.len().min(pattern_len - m.c2.offset);

    let min_offset = m.c1.offset.min(m.c2.offset);
    let max_end = (m.c1.offset + len1).max(m.c2.offset + len2);

    // two extra display characters for the junction delimiters
    let display_len = max_end - min_offset + 2;
    let display_end = (min_offset + display_len).min(pattern.display_sequence.len());
    let display_sequence = pattern.display_sequence[min_offset..display_end].to_string();

    // offset of a base in the display grows by one per delimiter before it
    let bias = |offset: usize| {
        usize::from(offset >= pattern.left_bases)
            + usize::from(offset >= pattern.left_bases + pattern.middle_bases)
    };

    let (left_bases, right_bases) = display_bounds(&display_sequence).unwrap_or((0, 0));

    let spanning_count =
        usize::from(ov1.junction_spanning) + usize::from(ov2.junction_spanning);

    Hit {
        pattern: HitPattern {
            name: pattern.name.clone(),
            display_sequence,
            left_bases,
            right_bases,
            matching_bases: m.matching_bases(),
            possible: m.possible(),
            spanning_count,
            insert_size: m.insert_size(),
            annotations: pattern.annotations.clone(),
        },
        read1: HitRead {
            name: name1.to_string(),
            leading_blanks: m.c1.offset - min_offset + bias(m.c1.offset),
            sequence: String::from_utf8_lossy(sequence1).into_owned(),
            matching_bases: m.c1.matching_bases,
            is_spanning: ov1.junction_spanning,
            left_overlap: ov1.left_overlap,
            right_overlap: ov1.right_overlap,
        },
        read2: HitRead {
            name: name2.to_string(),
            leading_blanks: m.c2.offset - min_offset + bias(m.c2.offset),
            sequence: String::from_utf8_lossy(revcomp2).into_owned(),
            matching_bases: m.c2.matching_bases,
            is_spanning: ov2.junction_spanning,
            left_overlap: ov2.left_overlap,
            right_overlap: ov2.right_overlap,
        },
    }
}

/// Delimiter-derived (left, right) widths of a windowed display sequence.
fn display_bounds(display: &str) -> Option<(usize, usize)> {
    let delim1 = display.find([']', '}'])?;
    let delim2 = display.rfind(['[', '{'])?;
    if delim2 <= delim1 {
        return None;
    }
    Some((delim1, display.len() - 1 - delim2))
}

/// Write the heading line shared by every hit stream of one run.
pub fn write_heading_line(
    out: &mut dyn Write,
    version: &str,
    annotation_headings: &[String],
) -> std::io::Result<()> {
    write!(
        out,
        "{}{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        FUZZION2, version, SEQUENCE, MBASES, POSSIBLE, PERCENT, SPANNING, LEFT_OVERLAP,
        RIGHT_OVERLAP, ISIZE,
    )?;
    for heading in annotation_headings {
        write!(out, "\t{}", heading)?;
    }
    writeln!(out)
}

/// Write the trailer showing the total number of read pairs processed.
pub fn write_read_pairs_line(out: &mut dyn Write, num_read_pairs: u64) -> std::io::Result<()> {
    writeln!(out, "{}{}", READ_PAIRS, num_read_pairs)
}

/// A parsed hit stream.
#[derive(Debug)]
pub struct HitFile {
    pub version: String,
    pub annotation_headings: Vec<String>,
    pub hits: Vec<Hit>,
    /// Sum of all `read-pairs` trailer lines.
    pub read_pairs: u64,
}

fn parse_count(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_heading(line: &str) -> Option<(String, Vec<String>)> {
    let columns: Vec<&str> = line.split('\t').collect();

    if !line.starts_with(FUZZION2)
        || columns.len() < MIN_HEADING_COLS
        || columns[SEQUENCE_COL] != SEQUENCE
        || columns[MBASES_COL] != MBASES
        || columns[POSSIBLE_COL] != POSSIBLE
        || columns[PERCENT_COL] != PERCENT
        || columns[SPANNING_COL] != SPANNING
        || columns[LEFT_COL] != LEFT_OVERLAP
        || columns[RIGHT_COL] != RIGHT_OVERLAP
        || columns[ISIZE_COL] != ISIZE
    {
        return None;
    }

    let mut first = columns[0].split(' ');
    let (Some(_), Some(version), None) = (first.next(), first.next(), first.next()) else {
        return None;
    };
    if version.is_empty() {
        return None;
    }

    Some((
        version.to_string(),
        columns[MIN_HEADING_COLS..]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    ))
}

fn parse_pattern_line(line: &str) -> Option<HitPattern> {
    if !line.starts_with(PATTERN) {
        return None;
    }

    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < MIN_HEADING_COLS {
        return None;
    }

    let mut first = columns[0].split(' ');
    let (Some(_), Some(name), None) = (first.next(), first.next(), first.next()) else {
        return None;
    };
    if name.is_empty() {
        return None;
    }

    let matching_bases = parse_count(columns[MBASES_COL])?;
    let possible = parse_count(columns[POSSIBLE_COL])?;
    let spanning_count = parse_count(columns[SPANNING_COL])?;
    let insert_size = parse_count(columns[ISIZE_COL])?;

    if matching_bases == 0 || possible == 0 || spanning_count > 2 || insert_size == 0 {
        return None;
    }

    let display_sequence = columns[SEQUENCE_COL].to_string();
    let (left_bases, right_bases) = display_bounds(&display_sequence)?;

    Some(HitPattern {
        name: name.to_string(),
        display_sequence,
        left_bases,
        right_bases,
        matching_bases,
        possible,
        spanning_count,
        insert_size,
        annotations: columns[MIN_HEADING_COLS..]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

fn parse_read_line(line: &str) -> Option<HitRead> {
    if !line.starts_with(READ) {
        return None;
    }

    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() != READ_COLS {
        return None;
    }

    let mut first = columns[0].split(' ');
    let (Some(_), Some(name), None) = (first.next(), first.next(), first.next()) else {
        return None;
    };
    if name.is_empty() {
        return None;
    }

    let displayed = columns[SEQUENCE_COL];
    let leading_blanks = displayed.bytes().take_while(|&b| b == b' ').count();
    let sequence = &displayed[leading_blanks..];

    let matching_bases = parse_count(columns[MBASES_COL])?;
    let possible = parse_count(columns[POSSIBLE_COL])?;
    if sequence.is_empty() || sequence.len() != possible {
        return None;
    }

    let is_spanning = match columns[SPANNING_COL] {
        "0" => false,
        "1" => true,
        _ => return None,
    };

    let left_overlap = parse_count(columns[LEFT_COL])?;
    let right_overlap = parse_count(columns[RIGHT_COL])?;

    Some(HitRead {
        name: name.to_string(),
        leading_blanks,
        sequence: sequence.to_string(),
        matching_bases,
        is_spanning,
        left_overlap,
        right_overlap,
    })
}

fn next_hit_read<R: BufRead>(lines: &mut std::io::Lines<R>) -> Result<HitRead, Error> {
    let line = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::HitFormat("truncated hit".into())),
    };
    parse_read_line(&line)
        .ok_or_else(|| Error::HitFormat(format!("unexpected hit format: {}", line)))
}

/// Read a hit stream, possibly a concatenation of several: repeated
/// identical heading lines are accepted, differing ones are an error, and
/// `read-pairs` trailers sum. Hits are returned in stored sort order.
pub fn read_hits<R: BufRead>(reader: R) -> Result<HitFile, Error> {
    let mut lines = reader.lines();

    let heading_line = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::HitFormat("no input".into())),
    };

    let (version, annotation_headings) = parse_heading(&heading_line)
        .ok_or_else(|| Error::HitFormat("unexpected heading line".into()))?;

    let mut hits: Vec<Hit> = Vec::new();
    let mut read_pairs: u64 = 0;

    while let Some(line) = lines.next() {
        let line = line?;

        if line.starts_with(FUZZION2) {
            if line != heading_line {
                return Err(Error::HitFormat("inconsistent heading lines".into()));
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix(READ_PAIRS) {
            let count: u64 = rest
                .parse()
                .map_err(|_| Error::HitFormat(format!("unexpected input line: {}", line)))?;
            read_pairs += count;
            continue;
        }

        let pattern = parse_pattern_line(&line)
            .ok_or_else(|| Error::HitFormat(format!("unexpected hit format: {}", line)))?;

        let read1 = next_hit_read(&mut lines)?;
        let read2 = next_hit_read(&mut lines)?;

        if hits.len() >= MAX_HITS {
            return Err(Error::Capacity);
        }

        hits.push(Hit {
            pattern,
            read1,
            read2,
        });
    }

    sort_hits(&mut hits);

    Ok(HitFile {
        version,
        annotation_headings,
        hits,
        read_pairs,
    })
}

/// Stored sort order: ascending pattern name, then left width, then right
/// width, then descending spanning count, then first-read name. Duplicates
/// end up adjacent.
pub fn sort_hits(hits: &mut [Hit]) {
    hits.sort_by(|a, b| {
        a.pattern
            .name
            .cmp(&b.pattern.name)
            .then(a.pattern.left_bases.cmp(&b.pattern.left_bases))
            .then(a.pattern.right_bases.cmp(&b.pattern.right_bases))
            .then(b.pattern.spanning_count.cmp(&a.pattern.spanning_count))
            .then(a.read1.name.cmp(&b.read1.name))
    });
}

/// Flag every hit that duplicates the preceding one in sorted order; the
/// first of each run stays distinct.
pub fn duplicate_flags(hits: &[Hit]) -> Vec<bool> {
    let mut flags = vec![false; hits.len()];
    for i in 1..hits.len() {
        flags[i] = hits[i].same_as(&hits[i - 1]);
    }
    flags
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_hit(pattern_name: &str, read_name: &str, spanning: bool) -> Hit {
        Hit {
            pattern: HitPattern {
                name: pattern_name.to_string(),
                display_sequence: "AAAACCCC]GGGGTTTT[TTTT".to_string(),
                left_bases: 8,
                right_bases: 4,
                matching_bases: 24,
                possible: 24,
                spanning_count: usize::from(spanning),
                insert_size: 20,
                annotations: vec!["X-Y".to_string()],
            },
            read1: HitRead {
                name: format!("{}.1", read_name),
                leading_blanks: 0,
                sequence: "AAAACCCCGGGG".to_string(),
                matching_bases: 12,
                is_spanning: spanning,
                left_overlap: 8,
                right_overlap: 0,
            },
            read2: HitRead {
                name: format!("{}.2", read_name),
                leading_blanks: 9,
                sequence: "GGGGTTTTTTTT".to_string(),
                matching_bases: 12,
                is_spanning: false,
                left_overlap: 0,
                right_overlap: 4,
            },
        }
    }

    fn render(hits: &[Hit], read_pairs: u64) -> String {
        let mut buffer = Vec::new();
        write_heading_line(&mut buffer, "v1.2.0", &["genes".to_string()]).unwrap();
        for hit in hits {
            hit.write(&mut buffer).unwrap();
        }
        write_read_pairs_line(&mut buffer, read_pairs).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn writes_expected_lines() {
        let text = render(&[sample_hit("PA", "frag.a", false)], 7);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);

        assert_eq!(
            lines[0],
            "fuzzion2 v1.2.0\tsequence\tmatching bases\tpossible\t% match\t\
             junction spanning\tleft overlap\tright overlap\tinsert size\tgenes"
        );
        assert_eq!(
            lines[1],
            "pattern PA\tAAAACCCC]GGGGTTTT[TTTT\t24\t24\t100.0\t0\t\t\t20\tX-Y"
        );
        assert_eq!(
            lines[2],
            "read frag.a.1\tAAAACCCCGGGG\t12\t12\t100.0\t0\t8\t0"
        );
        assert_eq!(
            lines[3],
            "read frag.a.2\t         GGGGTTTTTTTT\t12\t12\t100.0\t0\t0\t4"
        );
        assert_eq!(lines[4], "read-pairs 7");
    }

    #[test]
    fn unmatched_mate_prints_na() {
        let mut hit = sample_hit("PA", "frag.a", false);
        hit.read2.matching_bases = 0;
        assert_eq!(hit.read2.percent_column(), "N/A");
    }

    #[test]
    fn round_trip_is_a_fixpoint() {
        let text = render(
            &[
                sample_hit("PB", "frag.b", true),
                sample_hit("PA", "frag.a", false),
            ],
            3,
        );

        let parsed = read_hits(Cursor::new(text)).unwrap();
        assert_eq!(parsed.version, "v1.2.0");
        assert_eq!(parsed.annotation_headings, vec!["genes"]);
        assert_eq!(parsed.read_pairs, 3);
        assert_eq!(parsed.hits.len(), 2);
        // sorted: PA before PB
        assert_eq!(parsed.hits[0].pattern.name, "PA");
        assert_eq!(parsed.hits[1].pattern.name, "PB");
        assert_eq!(parsed.hits[0].pattern.left_bases, 8);
        assert_eq!(parsed.hits[0].pattern.right_bases, 4);
        assert_eq!(parsed.hits[0].read2.leading_blanks, 9);

        // writing the parsed hits again reproduces the text (the sample
        // hits were given in reverse order)
        let rewritten = render(&parsed.hits, parsed.read_pairs);
        let reparsed = read_hits(Cursor::new(rewritten.clone())).unwrap();
        assert_eq!(render(&reparsed.hits, reparsed.read_pairs), rewritten);
    }

    #[test]
    fn accepts_concatenated_streams() {
        let part = render(&[sample_hit("PA", "frag.a", false)], 2);
        let concatenated = format!("{}{}", part, part);

        let parsed = read_hits(Cursor::new(concatenated)).unwrap();
        assert_eq!(parsed.hits.len(), 2);
        assert_eq!(parsed.read_pairs, 4);
    }

    #[test]
    fn rejects_inconsistent_headings() {
        let part1 = render(&[], 1);
        let part2 = part1.replace("v1.2.0", "v9.9.9");

        let err = read_hits(Cursor::new(format!("{}{}", part1, part2))).unwrap_err();
        assert!(err.to_string().contains("inconsistent heading lines"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(read_hits(Cursor::new("")).is_err());
        assert!(read_hits(Cursor::new("nonsense\n")).is_err());

        let mut text = render(&[sample_hit("PA", "frag.a", false)], 1);
        text = text.replace("read frag.a.2", "tead frag.a.2");
        assert!(read_hits(Cursor::new(text)).is_err());
    }

    #[test]
    fn sort_and_duplicate_flags() {
        let mut hits = vec![
            sample_hit("PA", "frag.b", false),
            sample_hit("PA", "frag.a", true),
            sample_hit("PB", "frag.c", false),
        ];
        sort_hits(&mut hits);

        // spanning hit first within PA
        assert_eq!(hits[0].read1.name, "frag.a.1");
        assert_eq!(hits[1].read1.name, "frag.b.1");
        assert_eq!(hits[2].pattern.name, "PB");

        let flags = duplicate_flags(&hits);
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn strength_labels() {
        let hit = sample_hit("PA", "frag.a", false);
        // max left overlap 8, max right overlap 4
        assert_eq!(hit.strength(4), Strength::StrongMinus);
        assert_eq!(hit.strength(5), Strength::Weak);

        let spanning = sample_hit("PA", "frag.a", true);
        assert_eq!(spanning.strength(4), Strength::StrongPlus);
        assert_eq!(spanning.strength(DEFAULT_MIN_STRONG), Strength::Weak);
    }
}
