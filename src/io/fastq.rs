/// FASTQ readers with decompression support.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use noodles::fastq;

use crate::error::Error;
use crate::io::pairs::{names_match, PairReader, ReadPair};

/// A read from a FASTQ file: its name (up to the first whitespace) and its
/// base sequence. Quality scores are not kept.
#[derive(Debug, Clone)]
pub struct FastqRead {
    pub name: String,
    pub sequence: Vec<u8>,
}

/// Reader over one FASTQ file, plain or gzip compressed by file extension.
pub struct FastqReader {
    inner: fastq::Reader<Box<dyn BufRead + Send>>,
    path: PathBuf,
}

impl FastqReader {
    /// Open a FASTQ file (`.gz`/`.gzip` names are uncompressed on the fly).
    pub fn open(path: &Path) -> Result<Self, Error> {
        let path_str = path.to_string_lossy();
        let is_gzipped = path_str.ends_with(".gz") || path_str.ends_with(".gzip");

        let file = File::open(path).map_err(|e| Error::io(e, path))?;

        let reader: Box<dyn BufRead + Send> = if is_gzipped {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self {
            inner: fastq::Reader::new(reader),
            path: path.to_path_buf(),
        })
    }

    /// Get the next read, or `None` at end of file.
    pub fn next_read(&mut self) -> Result<Option<FastqRead>, Error> {
        match self.inner.records().next() {
            Some(Ok(record)) => {
                let name_bytes: &[u8] = record.name().as_ref();
                let name = std::str::from_utf8(name_bytes)
                    .map_err(|_| {
                        Error::Fastq(format!(
                            "invalid UTF-8 in read name in {}",
                            self.path.display()
                        ))
                    })?
                    .to_string();

                Ok(Some(FastqRead {
                    name,
                    sequence: record.sequence().to_vec(),
                }))
            }
            Some(Err(e)) => Err(Error::Fastq(format!(
                "unexpected format in {}: {}",
                self.path.display(),
                e
            ))),
            None => Ok(None),
        }
    }
}

/// Pair source over two FASTQ files read in lockstep.
pub struct FastqPairReader {
    reader1: FastqReader,
    reader2: FastqReader,
}

impl FastqPairReader {
    pub fn open(path1: &Path, path2: &Path) -> Result<Self, Error> {
        Ok(Self {
            reader1: FastqReader::open(path1)?,
            reader2: FastqReader::open(path2)?,
        })
    }
}

impl PairReader for FastqPairReader {
    fn next_pair(&mut self) -> Result<Option<ReadPair>, Error> {
        let read1 = self.reader1.next_read()?;
        let read2 = self.reader2.next_read()?;

        match (read1, read2) {
            (None, None) => Ok(None),
            (Some(read1), Some(read2)) => {
                if !names_match(&read1.name, &read2.name) {
                    return Err(Error::Consistency(format!(
                        "mismatched read names {} and {}",
                        read1.name, read2.name
                    )));
                }
                Ok(Some(ReadPair {
                    name1: read1.name,
                    sequence1: read1.sequence,
                    name2: read2.name,
                    sequence2: read2.sequence,
                }))
            }
            _ => Err(Error::Consistency("mismatched number of reads".into())),
        }
    }
}

/// Pair source over one FASTQ file yielding consecutive mates.
pub struct InterleavedFastqPairReader {
    reader: FastqReader,
}

impl InterleavedFastqPairReader {
    pub fn open(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            reader: FastqReader::open(path)?,
        })
    }
}

impl PairReader for InterleavedFastqPairReader {
    fn next_pair(&mut self) -> Result<Option<ReadPair>, Error> {
        let Some(read1) = self.reader.next_read()? else {
            return Ok(None);
        };

        let Some(read2) = self.reader.next_read()? else {
            return Err(Error::Consistency("mismatched number of reads".into()));
        };

        if !names_match(&read1.name, &read2.name) {
            return Err(Error::Consistency(format!(
                "mismatched read names {} and {}",
                read1.name, read2.name
            )));
        }

        Ok(Some(ReadPair {
            name1: read1.name,
            sequence1: read1.sequence,
            name2: read2.name,
            sequence2: read2.sequence,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fastq(reads: &[(&str, &str)]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for (name, sequence) in reads {
            writeln!(file, "@{}", name).unwrap();
            writeln!(file, "{}", sequence).unwrap();
            writeln!(file, "+").unwrap();
            writeln!(file, "{}", "I".repeat(sequence.len())).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_plain_fastq() {
        let file = write_fastq(&[("read1", "ACGTN"), ("read2", "TGCA")]);
        let mut reader = FastqReader::open(file.path()).unwrap();

        let read1 = reader.next_read().unwrap().unwrap();
        assert_eq!(read1.name, "read1");
        assert_eq!(read1.sequence, b"ACGTN");

        let read2 = reader.next_read().unwrap().unwrap();
        assert_eq!(read2.name, "read2");
        assert_eq!(read2.sequence, b"TGCA");

        assert!(reader.next_read().unwrap().is_none());
    }

    #[test]
    fn reads_gzipped_fastq() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let tmpfile = tempfile::Builder::new()
            .suffix(".fastq.gz")
            .tempfile()
            .unwrap();
        let mut encoder = GzEncoder::new(tmpfile.as_file(), Compression::default());
        writeln!(encoder, "@read1").unwrap();
        writeln!(encoder, "ACGT").unwrap();
        writeln!(encoder, "+").unwrap();
        writeln!(encoder, "IIII").unwrap();
        encoder.finish().unwrap();

        let mut reader = FastqReader::open(tmpfile.path()).unwrap();
        let read1 = reader.next_read().unwrap().unwrap();
        assert_eq!(read1.name, "read1");
        assert_eq!(read1.sequence, b"ACGT");
    }

    #[test]
    fn name_stops_at_whitespace() {
        let file = write_fastq(&[("frag.1 extra description", "ACGT")]);
        let mut reader = FastqReader::open(file.path()).unwrap();
        let read = reader.next_read().unwrap().unwrap();
        assert_eq!(read.name, "frag.1");
    }

    #[test]
    fn paired_reader_joins_mates() {
        let file1 = write_fastq(&[("frag.a.1", "AAAA"), ("frag.b.1", "CCCC")]);
        let file2 = write_fastq(&[("frag.a.2", "GGGG"), ("frag.b.2", "TTTT")]);

        let mut reader = FastqPairReader::open(file1.path(), file2.path()).unwrap();

        let pair = reader.next_pair().unwrap().unwrap();
        assert_eq!(pair.name1, "frag.a.1");
        assert_eq!(pair.name2, "frag.a.2");
        assert_eq!(pair.sequence1, b"AAAA");
        assert_eq!(pair.sequence2, b"GGGG");

        let pair = reader.next_pair().unwrap().unwrap();
        assert_eq!(pair.name1, "frag.b.1");

        assert!(reader.next_pair().unwrap().is_none());
    }

    #[test]
    fn paired_reader_rejects_mismatched_names() {
        let file1 = write_fastq(&[("frag.a.1", "AAAA")]);
        let file2 = write_fastq(&[("frag.z.2", "GGGG")]);

        let mut reader = FastqPairReader::open(file1.path(), file2.path()).unwrap();
        let err = reader.next_pair().unwrap_err();
        assert!(err.to_string().contains("mismatched read names"));
    }

    #[test]
    fn paired_reader_rejects_mismatched_counts() {
        let file1 = write_fastq(&[("frag.a.1", "AAAA"), ("frag.b.1", "CCCC")]);
        let file2 = write_fastq(&[("frag.a.2", "GGGG")]);

        let mut reader = FastqPairReader::open(file1.path(), file2.path()).unwrap();
        reader.next_pair().unwrap();
        let err = reader.next_pair().unwrap_err();
        assert!(err.to_string().contains("mismatched number of reads"));
    }

    #[test]
    fn interleaved_reader_yields_consecutive_mates() {
        let file = write_fastq(&[
            ("frag.a.1", "AAAA"),
            ("frag.a.2", "GGGG"),
            ("frag.b.1", "CCCC"),
            ("frag.b.2", "TTTT"),
        ]);

        let mut reader = InterleavedFastqPairReader::open(file.path()).unwrap();

        let pair = reader.next_pair().unwrap().unwrap();
        assert_eq!(pair.name1, "frag.a.1");
        assert_eq!(pair.name2, "frag.a.2");

        let pair = reader.next_pair().unwrap().unwrap();
        assert_eq!(pair.name1, "frag.b.1");

        assert!(reader.next_pair().unwrap().is_none());
    }

    #[test]
    fn interleaved_reader_rejects_odd_read_count() {
        let file = write_fastq(&[
            ("frag.a.1", "AAAA"),
            ("frag.a.2", "GGGG"),
            ("frag.b.1", "CCCC"),
        ]);

        let mut reader = InterleavedFastqPairReader::open(file.path()).unwrap();
        reader.next_pair().unwrap();
        let err = reader.next_pair().unwrap_err();
        assert!(err.to_string().contains("mismatched number of reads"));
    }
}
