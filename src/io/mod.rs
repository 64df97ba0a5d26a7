pub mod bam;
pub mod fastq;
pub mod pairs;

pub use pairs::{names_match, open_pair_reader, PairReader, ReadPair};
