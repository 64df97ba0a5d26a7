use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Error;
use crate::kmer::{self, Kmer, KmerScanner, MAX_KMER_LENGTH};

/// Rank of a k-mer: low ranks mark k-mers that are rare in the reference.
pub type KmerRank = u32;

const MIN_KMER_LENGTH: u8 = 4;

/// File sentinel in native byte order, and its mirror form indicating that
/// every rank in the file must be byte-swapped.
const RANK_FILE_SIGNATURE: u32 = 0x17D2_6E39;
const RANK_FILE_SIGNATURE_SWAP: u32 = 0x396E_D217;

/// A lookup table holding a rank for each k-mer of length k.
///
/// The table is a bijection: each rank in [0, 4^k) appears exactly once.
/// It is read-only after construction and safe to share across threads.
#[derive(Debug)]
pub struct KmerRankTable {
    pub k: u8,
    rank: Vec<KmerRank>,
}

impl KmerRankTable {
    /// Rank of the given k-mer. O(1).
    #[inline]
    pub fn rank(&self, kmer: Kmer) -> KmerRank {
        self.rank[kmer as usize]
    }

    /// Rank cutoff for the given percentile: ranks at or above
    /// `(percent / 100) * 4^k` are deemed common minimizers.
    pub fn max_minimizer(&self, percent: f64) -> KmerRank {
        ((percent / 100.0) * f64::from(kmer::num_kmers(self.k))) as KmerRank
    }

    /// Read a rank table from its binary file (see `write` for the layout).
    /// The sentinel determines byte order; any trailing byte is an error.
    pub fn read(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|e| Error::io(e, path))?;
        let mut reader = BufReader::new(file);

        let signature = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::Rank(format!("{} is not a k-mer rank file", path.display())))?;

        let swap = match signature {
            RANK_FILE_SIGNATURE => false,
            RANK_FILE_SIGNATURE_SWAP => true,
            _ => {
                return Err(Error::Rank(format!(
                    "{} is not a k-mer rank file",
                    path.display()
                )));
            }
        };

        let k = reader
            .read_u8()
            .map_err(|_| Error::Rank(format!("truncated k-mer rank file {}", path.display())))?;

        if !(MIN_KMER_LENGTH..=MAX_KMER_LENGTH).contains(&k) {
            return Err(Error::Rank(format!(
                "unsupported k-mer length {} in {}",
                k,
                path.display()
            )));
        }

        let n = kmer::num_kmers(k) as usize;
        let mut rank = vec![0 as KmerRank; n];

        reader
            .read_u32_into::<LittleEndian>(&mut rank)
            .map_err(|_| Error::Rank(format!("truncated k-mer rank file {}", path.display())))?;

        if swap {
            for r in &mut rank {
                *r = r.swap_bytes();
            }
        }

        // the table must end exactly at the last rank
        let mut extra = [0u8; 1];
        if reader.read(&mut extra).map_err(|e| Error::io(e, path))? != 0 {
            return Err(Error::Rank(format!(
                "invalid k-mer rank file {}",
                path.display()
            )));
        }

        Ok(Self { k, rank })
    }

    /// Write the table as a binary file: a 32-bit sentinel, one byte of k,
    /// then 4^k little-endian 32-bit ranks in k-mer order.
    pub fn write(&self, path: &Path) -> Result<(), Error> {
        let file = File::create(path).map_err(|e| Error::io(e, path))?;
        let mut writer = BufWriter::new(file);

        writer
            .write_u32::<LittleEndian>(RANK_FILE_SIGNATURE)
            .map_err(|e| Error::io(e, path))?;
        writer.write_u8(self.k).map_err(|e| Error::io(e, path))?;

        for &rank in &self.rank {
            writer
                .write_u32::<LittleEndian>(rank)
                .map_err(|e| Error::io(e, path))?;
        }

        writer.flush().map_err(|e| Error::io(e, path))
    }

    /// Build a table from reference sequences: count every k-mer occurrence
    /// on both strands (saturating), then rank k-mers by ascending count,
    /// ties by ascending numeric k-mer.
    pub fn build<'a>(k: u8, sequences: impl IntoIterator<Item = &'a [u8]>) -> Result<Self, Error> {
        if !(MIN_KMER_LENGTH..=MAX_KMER_LENGTH).contains(&k) {
            return Err(Error::Rank(format!("unsupported k-mer length {}", k)));
        }

        let n = kmer::num_kmers(k) as usize;
        let mut count = vec![0u32; n];

        for sequence in sequences {
            for (kmer, _) in KmerScanner::new(sequence, k) {
                let revcomp = kmer::kmer_reverse_complement(k, kmer);
                count[kmer as usize] = count[kmer as usize].saturating_add(1);
                count[revcomp as usize] = count[revcomp as usize].saturating_add(1);
            }
        }

        let mut order: Vec<u32> = (0..n as u32).collect();
        order.sort_by_key(|&kmer| (count[kmer as usize], kmer));

        let mut rank = vec![0 as KmerRank; n];
        for (r, &kmer) in order.iter().enumerate() {
            rank[kmer as usize] = r as KmerRank;
        }

        Ok(Self { k, rank })
    }

    /// Table whose rank of each k-mer is the k-mer itself. Used in tests and
    /// wherever a deterministic full-admission table is needed.
    pub fn identity(k: u8) -> Self {
        let n = kmer::num_kmers(k);
        Self {
            k,
            rank: (0..n).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as IoWrite;
    use tempfile::NamedTempFile;

    #[test]
    fn build_is_a_permutation() {
        let table = KmerRankTable::build(4, [b"ACGTACGTTTGGCCAA".as_slice()]).unwrap();

        let mut seen = vec![false; kmer::num_kmers(4) as usize];
        for kmer in 0..kmer::num_kmers(4) {
            let rank = table.rank(kmer) as usize;
            assert!(!seen[rank], "rank {} assigned twice", rank);
            seen[rank] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn build_ranks_frequent_kmers_higher() {
        // AAAA occurs many times (and TTTT via the reverse strand); the
        // never-seen k-mers get the lowest ranks, ties broken numerically.
        let table = KmerRankTable::build(4, [b"AAAAAAAAAAAA".as_slice()]).unwrap();
        let aaaa = table.rank(0);
        let tttt = table.rank(0b11111111);
        assert!(aaaa >= kmer::num_kmers(4) - 2);
        assert!(tttt >= kmer::num_kmers(4) - 2);
        // AAAC never occurs: ranked among the zero-count k-mers
        assert!(table.rank(1) < aaaa);
    }

    #[test]
    fn binary_round_trip() {
        let table = KmerRankTable::build(5, [b"ACGTACGTAGGGCATTTACA".as_slice()]).unwrap();

        let file = NamedTempFile::new().unwrap();
        table.write(file.path()).unwrap();

        let loaded = KmerRankTable::read(file.path()).unwrap();
        assert_eq!(loaded.k, 5);
        for kmer in 0..kmer::num_kmers(5) {
            assert_eq!(loaded.rank(kmer), table.rank(kmer));
        }
    }

    #[test]
    fn read_byte_swapped_table() {
        // write a k=4 table by hand with the mirrored sentinel and
        // big-endian ranks
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&RANK_FILE_SIGNATURE_SWAP.to_le_bytes()).unwrap();
        file.write_all(&[4u8]).unwrap();
        for kmer in 0..kmer::num_kmers(4) {
            file.write_all(&kmer.to_be_bytes()).unwrap();
        }
        file.flush().unwrap();

        let table = KmerRankTable::read(file.path()).unwrap();
        for kmer in 0..kmer::num_kmers(4) {
            assert_eq!(table.rank(kmer), kmer);
        }
    }

    #[test]
    fn read_rejects_bad_signature() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not a rank file at all").unwrap();
        file.flush().unwrap();

        let err = KmerRankTable::read(file.path()).unwrap_err();
        assert!(err.to_string().contains("not a k-mer rank file"));
    }

    #[test]
    fn read_rejects_trailing_bytes() {
        let table = KmerRankTable::identity(4);
        let file = NamedTempFile::new().unwrap();
        table.write(file.path()).unwrap();

        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .open(file.path())
            .unwrap();
        f.write_all(&[0u8]).unwrap();
        drop(f);

        let err = KmerRankTable::read(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid k-mer rank file"));
    }

    #[test]
    fn read_rejects_truncation() {
        let table = KmerRankTable::identity(4);
        let file = NamedTempFile::new().unwrap();
        table.write(file.path()).unwrap();

        let data = std::fs::read(file.path()).unwrap();
        std::fs::write(file.path(), &data[..data.len() - 2]).unwrap();

        let err = KmerRankTable::read(file.path()).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn read_rejects_unsupported_k() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&RANK_FILE_SIGNATURE.to_le_bytes()).unwrap();
        file.write_all(&[3u8]).unwrap();
        file.flush().unwrap();

        let err = KmerRankTable::read(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported k-mer length"));
    }

    #[test]
    fn max_minimizer_cutoff() {
        let table = KmerRankTable::identity(4);
        assert_eq!(table.max_minimizer(100.0), 256);
        assert_eq!(table.max_minimizer(95.0), 243);
        assert_eq!(table.max_minimizer(50.0), 128);
    }
}
