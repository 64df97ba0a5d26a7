/// Polymorphic read-pair sources and automatic input classification.
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::io::bam::{probe_paired_bam, UbamPairReader};
use crate::io::fastq::{FastqPairReader, FastqReader, InterleavedFastqPairReader};
use crate::params::Parameters;

/// One read pair: names and base sequences of the two mates, as read from
/// the input (the second mate is not yet reverse-complemented).
#[derive(Debug, Clone)]
pub struct ReadPair {
    pub name1: String,
    pub sequence1: Vec<u8>,
    pub name2: String,
    pub sequence2: Vec<u8>,
}

/// Source of read pairs. Implementations are not required to be
/// thread-safe; the engine serializes access behind its input mutex.
pub trait PairReader {
    fn next_pair(&mut self) -> Result<Option<ReadPair>, Error>;
}

/// Two names match as mates if they are equal, or if they have equal length
/// and differ only in that one ends in `1` where the other ends in `2`.
pub fn names_match(name1: &str, name2: &str) -> bool {
    let bytes1 = name1.as_bytes();
    let bytes2 = name2.as_bytes();

    if bytes1.len() != bytes2.len() {
        return false;
    }

    if let (Some(&last1), Some(&last2)) = (bytes1.last(), bytes2.last()) {
        if bytes1.len() > 1
            && ((last1 == b'1' && last2 == b'2') || (last1 == b'2' && last2 == b'1'))
        {
            return bytes1[..bytes1.len() - 1] == bytes2[..bytes2.len() - 1];
        }
    }

    name1 == name2
}

/// Runs its child readers sequentially, advancing to the next child at end
/// of the current one.
pub struct CompositePairReader {
    readers: Vec<Box<dyn PairReader + Send>>,
    current: usize,
}

impl std::fmt::Debug for CompositePairReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositePairReader")
            .field("readers", &self.readers.len())
            .field("current", &self.current)
            .finish()
    }
}

impl CompositePairReader {
    pub fn new(readers: Vec<Box<dyn PairReader + Send>>) -> Self {
        Self {
            readers,
            current: 0,
        }
    }
}

impl PairReader for CompositePairReader {
    fn next_pair(&mut self) -> Result<Option<ReadPair>, Error> {
        while self.current < self.readers.len() {
            if let Some(pair) = self.readers[self.current].next_pair()? {
                return Ok(Some(pair));
            }
            self.current += 1;
        }
        Ok(None)
    }
}

/// How one positional input file was classified.
enum InputKind {
    /// BAM whose records are sequential mate pairs.
    PairedBam,
    /// FASTQ whose first two read names match as mates.
    InterleavedFastq,
    /// FASTQ that needs a partner file; holds its first two read names.
    HalfFastq { name1: String, name2: String },
}

fn classify(path: &Path) -> Result<InputKind, Error> {
    if probe_paired_bam(path)? {
        return Ok(InputKind::PairedBam);
    }

    let mut reader = FastqReader::open(path)?;

    let Some(read1) = reader.next_read()? else {
        return Err(Error::Consistency(format!(
            "{} contains no reads",
            path.display()
        )));
    };
    let Some(read2) = reader.next_read()? else {
        return Err(Error::Consistency(format!(
            "unable to pair read file {}",
            path.display()
        )));
    };

    if names_match(&read1.name, &read2.name) {
        Ok(InputKind::InterleavedFastq)
    } else {
        Ok(InputKind::HalfFastq {
            name1: read1.name,
            name2: read2.name,
        })
    }
}

/// Classify an unordered list of input files and compose a reader over all
/// of them: paired BAMs and interleaved FASTQs stand alone; the remaining
/// FASTQ files are paired up by their first and second read names. Any file
/// that cannot be placed is an error.
pub fn open_auto(files: &[PathBuf]) -> Result<CompositePairReader, Error> {
    struct Half {
        path: PathBuf,
        name1: String,
        name2: String,
        taken: bool,
    }

    let mut readers: Vec<Box<dyn PairReader + Send>> = Vec::new();
    let mut halves: Vec<Half> = Vec::new();

    for path in files {
        match classify(path)? {
            InputKind::PairedBam => {
                readers.push(Box::new(UbamPairReader::open(vec![path.clone()])?));
            }
            InputKind::InterleavedFastq => {
                readers.push(Box::new(InterleavedFastqPairReader::open(path)?));
            }
            InputKind::HalfFastq { name1, name2 } => {
                halves.push(Half {
                    path: path.clone(),
                    name1,
                    name2,
                    taken: false,
                });
            }
        }
    }

    for i in 0..halves.len() {
        if halves[i].taken {
            continue;
        }

        let mut partner = None;
        for j in i + 1..halves.len() {
            if !halves[j].taken
                && names_match(&halves[i].name1, &halves[j].name1)
                && names_match(&halves[i].name2, &halves[j].name2)
            {
                partner = Some(j);
                break;
            }
        }

        let Some(j) = partner else {
            return Err(Error::Consistency(format!(
                "unable to pair read file {}",
                halves[i].path.display()
            )));
        };

        halves[j].taken = true;

        // the file whose first read name ends in '1' is read 1; identical
        // names keep the command-line order
        let (first, second) = if halves[i].name1.ends_with('2') && halves[j].name1.ends_with('1')
        {
            (j, i)
        } else {
            (i, j)
        };

        readers.push(Box::new(FastqPairReader::open(
            &halves[first].path,
            &halves[second].path,
        )?));
    }

    Ok(CompositePairReader::new(readers))
}

/// Open the pair source selected by the command line: positional files are
/// auto-classified; otherwise `--ifastq` or the `--fastq1`/`--fastq2` pair.
pub fn open_pair_reader(params: &Parameters) -> Result<Box<dyn PairReader + Send>, Error> {
    if !params.read_files.is_empty() {
        Ok(Box::new(open_auto(&params.read_files)?))
    } else if let Some(path) = &params.ifastq_file {
        Ok(Box::new(InterleavedFastqPairReader::open(path)?))
    } else {
        match (&params.fastq_file1, &params.fastq_file2) {
            (Some(path1), Some(path2)) => Ok(Box::new(FastqPairReader::open(path1, path2)?)),
            _ => Err(Error::Parameter("no read input specified".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
