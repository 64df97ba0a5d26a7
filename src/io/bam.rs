/// Unaligned BAM pair reader.
use std::fs::File;
use std::path::{Path, PathBuf};

use noodles::bam;
use noodles::sam;
use noodles::sam::alignment::record_buf::RecordBuf;

use crate::error::Error;
use crate::io::pairs::{names_match, PairReader, ReadPair};

struct OpenBam {
    reader: bam::io::Reader<noodles::bgzf::Reader<File>>,
    header: sam::Header,
    path: PathBuf,
}

fn open_bam(path: &Path) -> Result<OpenBam, Error> {
    let file = File::open(path).map_err(|e| Error::io(e, path))?;
    let mut reader = bam::io::Reader::new(file);
    let header = reader
        .read_header()
        .map_err(|e| Error::Bam(format!("{} is not a BAM file: {}", path.display(), e)))?;

    Ok(OpenBam {
        reader,
        header,
        path: path.to_path_buf(),
    })
}

fn decode(record: &RecordBuf, path: &Path) -> Result<(String, Vec<u8>), Error> {
    let name = record
        .name()
        .map(|name| String::from_utf8_lossy(name.as_ref()).into_owned())
        .ok_or_else(|| Error::Bam(format!("record without a name in {}", path.display())))?;

    let sequence = record.sequence().as_ref().to_vec();

    Ok((name, sequence))
}

/// Pair source over sequential record pairs of one or more unaligned BAM
/// files; advances to the next file at end of the current one.
pub struct UbamPairReader {
    filenames: Vec<PathBuf>,
    current: usize,
    open: Option<OpenBam>,
}

impl UbamPairReader {
    pub fn open(filenames: Vec<PathBuf>) -> Result<Self, Error> {
        if filenames.is_empty() {
            return Err(Error::Bam("no file names specified".into()));
        }

        let open = open_bam(&filenames[0])?;

        Ok(Self {
            filenames,
            current: 0,
            open: Some(open),
        })
    }

    /// Next record of the currently open file, without advancing the list.
    fn read_current(&mut self) -> Result<Option<RecordBuf>, Error> {
        let Some(open) = self.open.as_mut() else {
            return Ok(None);
        };

        let mut record = RecordBuf::default();
        let bytes = open
            .reader
            .read_record_buf(&open.header, &mut record)
            .map_err(|e| Error::Bam(format!("error reading {}: {}", open.path.display(), e)))?;

        Ok((bytes > 0).then_some(record))
    }

    /// Next record across the file list, or `None` after the last file.
    fn next_record(&mut self) -> Result<Option<RecordBuf>, Error> {
        loop {
            if let Some(record) = self.read_current()? {
                return Ok(Some(record));
            }

            if self.open.is_none() {
                return Ok(None);
            }

            // end of the current file; open the next one
            self.current += 1;
            self.open = if self.current < self.filenames.len() {
                Some(open_bam(&self.filenames[self.current])?)
            } else {
                None
            };
        }
    }
}

impl PairReader for UbamPairReader {
    fn next_pair(&mut self) -> Result<Option<ReadPair>, Error> {
        let Some(record1) = self.next_record()? else {
            return Ok(None);
        };

        // the mate must come from the same file
        let Some(record2) = self.read_current()? else {
            return Err(Error::Consistency("mismatched number of reads".into()));
        };

        let path = self.filenames[self.current.min(self.filenames.len() - 1)].clone();
        let (name1, sequence1) = decode(&record1, &path)?;
        let (name2, sequence2) = decode(&record2, &path)?;

        if !names_match(&name1, &name2) {
            return Err(Error::Consistency(format!(
                "mismatched read names {} and {}",
                name1, name2
            )));
        }

        Ok(Some(ReadPair {
            name1,
            sequence1,
            name2,
            sequence2,
        }))
    }
}

/// Probe a file for the auto-composed input list: `Ok(true)` if it parses
/// as a BAM whose first two records are mates, `Ok(false)` if it is not a
/// BAM at all, and an error for a BAM this reader cannot consume.
pub fn probe_paired_bam(path: &Path) -> Result<bool, Error> {
    let Ok(mut open) = open_bam(path) else {
        return Ok(false);
    };

    let mut read_one = |open: &mut OpenBam| -> Result<Option<RecordBuf>, Error> {
        let mut record = RecordBuf::default();
        let bytes = open
            .reader
            .read_record_buf(&open.header, &mut record)
            .map_err(|e| Error::Bam(format!("error reading {}: {}", path.display(), e)))?;
        Ok((bytes > 0).then_some(record))
    };

    let Some(record1) = read_one(&mut open)? else {
        return Err(Error::Bam(format!("{} contains no reads", path.display())));
    };
    let Some(record2) = read_one(&mut open)? else {
        return Err(Error::Bam(format!(
            "{} does not contain paired reads",
            path.display()
        )));
    };

    let (name1, _) = decode(&record1, path)?;
    let (name2, _) = decode(&record2, path)?;

    if !record1.flags().is_segmented() || !names_match(&name1, &name2) {
        return Err(Error::Bam(format!(
            "{} does not contain paired reads",
            path.display()
        )));
    }

    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
