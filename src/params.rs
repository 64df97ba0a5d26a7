use std::path::PathBuf;

use clap::Parser;

/// rufuzzion command-line parameters, matching fuzzion2's option names.
///
/// fuzzion2 spells its options `-name=value`; here they are ordinary clap
/// long options (`--name value`). Read files given without an option are
/// classified automatically (BAM, interleaved FASTQ, or FASTQ pairs).
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rufuzzion",
    about = "Fuzzy fusion finder (Rust reimplementation of fuzzion2)",
    version
)]
pub struct Parameters {
    /// Name of pattern input file
    #[arg(long = "pattern")]
    pub pattern_file: PathBuf,

    /// Name of binary input file containing the k-mer rank table
    #[arg(long = "rank")]
    pub rank_file: PathBuf,

    /// Name of FASTQ Read 1 input file
    #[arg(long = "fastq1")]
    pub fastq_file1: Option<PathBuf>,

    /// Name of FASTQ Read 2 input file
    #[arg(long = "fastq2")]
    pub fastq_file2: Option<PathBuf>,

    /// Name of interleaved FASTQ input file (may be /dev/stdin)
    #[arg(long = "ifastq")]
    pub ifastq_file: Option<PathBuf>,

    /// Read files classified automatically: unaligned BAM, interleaved
    /// FASTQ, or FASTQ files paired by read name
    pub read_files: Vec<PathBuf>,

    /// Maximum insert size in bases
    #[arg(long = "maxins", default_value_t = 500)]
    pub max_insert: usize,

    /// Maximum rank percentile of minimizers
    #[arg(long = "maxrank", default_value_t = 95.0)]
    pub max_rank: f64,

    /// Maximum number of bases the second read may sit ahead of the first
    #[arg(long = "maxtrim", default_value_t = 5)]
    pub max_trim: i64,

    /// Minimum percentile of matching bases
    #[arg(long = "minbases", default_value_t = 90.0)]
    pub min_bases: f64,

    /// Minimum number of matching minimizers
    #[arg(long = "minmins", default_value_t = 3)]
    pub min_mins: usize,

    /// Minimum overlap in number of bases
    #[arg(long = "minov", default_value_t = 5)]
    pub min_overlap: usize,

    /// Show best only (1) or all patterns (0) matching a read pair
    #[arg(long = "show", default_value_t = 1)]
    pub show: u8,

    /// Report single-read matches (1) when a pair has none (0 = never)
    #[arg(long = "single", default_value_t = 0)]
    pub single: u8,

    /// Number of threads
    #[arg(long = "threads", default_value_t = 8)]
    pub threads: usize,

    /// Window length in number of bases
    #[arg(short = 'w', long = "w", default_value_t = 5)]
    pub window_length: usize,
}

impl Parameters {
    /// True when the best overall match is kept instead of one per pattern.
    pub fn best_overall(&self) -> bool {
        self.show == 1
    }

    /// True when single-read fallback matches are sought.
    pub fn find_single(&self) -> bool {
        self.single == 1
    }

    /// Validate parameter combinations that clap alone cannot enforce.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        use crate::error::Error;

        if !self.read_files.is_empty() {
            if self.fastq_file1.is_some()
                || self.fastq_file2.is_some()
                || self.ifastq_file.is_some()
            {
                return Err(Error::Parameter(
                    "read files given as arguments cannot be combined with \
                     --fastq1/--fastq2/--ifastq"
                        .into(),
                ));
            }
        } else if self.ifastq_file.is_some() {
            if self.fastq_file1.is_some() || self.fastq_file2.is_some() {
                return Err(Error::Parameter(
                    "--ifastq cannot be combined with --fastq1/--fastq2".into(),
                ));
            }
        } else if self.fastq_file1.is_none() || self.fastq_file2.is_none() {
            return Err(Error::Parameter(
                "specify read files, or --ifastq, or both --fastq1 and --fastq2".into(),
            ));
        }

        if !(self.max_rank > 0.0 && self.max_rank <= 100.0) {
            return Err(Error::Parameter(
                "--maxrank must be greater than 0 and at most 100".into(),
            ));
        }

        if !(self.min_bases > 0.0 && self.min_bases <= 100.0) {
            return Err(Error::Parameter(
                "--minbases must be greater than 0 and at most 100".into(),
            ));
        }

        if self.max_insert < 100 {
            return Err(Error::Parameter("--maxins must be at least 100".into()));
        }

        if self.max_trim < 0 {
            return Err(Error::Parameter("--maxtrim must be non-negative".into()));
        }

        if self.min_mins == 0 {
            return Err(Error::Parameter("--minmins must be at least 1".into()));
        }

        if self.min_overlap == 0 {
            return Err(Error::Parameter("--minov must be at least 1".into()));
        }

        if self.show > 1 {
            return Err(Error::Parameter("--show must be 0 or 1".into()));
        }

        if self.single > 1 {
            return Err(Error::Parameter("--single must be 0 or 1".into()));
        }

        if self.threads == 0 || self.threads > crate::engine::MAX_THREADS {
            return Err(Error::Parameter(format!(
                "--threads must be between 1 and {}",
                crate::engine::MAX_THREADS
            )));
        }

        if self.window_length == 0 || self.window_length >= 256 {
            return Err(Error::Parameter(
                "-w must be between 1 and 255".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: parse a rufuzzion command line (without program name).
    fn parse(args: &[&str]) -> Parameters {
        let mut full = vec!["rufuzzion"];
        full.extend_from_slice(args);
        Parameters::parse_from(full)
    }

    #[test]
    fn defaults() {
        let p = parse(&[
            "--pattern", "patterns.txt", "--rank", "ranks.bin", "--ifastq", "reads.fq",
        ]);
        assert_eq!(p.pattern_file, PathBuf::from("patterns.txt"));
        assert_eq!(p.rank_file, PathBuf::from("ranks.bin"));
        assert_eq!(p.ifastq_file, Some(PathBuf::from("reads.fq")));
        assert_eq!(p.max_insert, 500);
        assert!((p.max_rank - 95.0).abs() < f64::EPSILON);
        assert_eq!(p.max_trim, 5);
        assert!((p.min_bases - 90.0).abs() < f64::EPSILON);
        assert_eq!(p.min_mins, 3);
        assert_eq!(p.min_overlap, 5);
        assert_eq!(p.show, 1);
        assert_eq!(p.single, 0);
        assert_eq!(p.threads, 8);
        assert_eq!(p.window_length, 5);
        assert!(p.best_overall());
        assert!(!p.find_single());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn paired_fastq_command() {
        let p = parse(&[
            "--pattern", "p.txt", "--rank", "r.bin",
            "--fastq1", "R1.fastq.gz", "--fastq2", "R2.fastq.gz",
            "--threads", "16", "--show", "0", "--single", "1",
            "--maxins", "800", "--maxtrim", "0", "-w", "10",
        ]);
        assert_eq!(p.fastq_file1, Some(PathBuf::from("R1.fastq.gz")));
        assert_eq!(p.fastq_file2, Some(PathBuf::from("R2.fastq.gz")));
        assert_eq!(p.threads, 16);
        assert!(!p.best_overall());
        assert!(p.find_single());
        assert_eq!(p.max_insert, 800);
        assert_eq!(p.max_trim, 0);
        assert_eq!(p.window_length, 10);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn positional_read_files() {
        let p = parse(&["--pattern", "p.txt", "--rank", "r.bin", "a.bam", "b.bam"]);
        assert_eq!(
            p.read_files,
            vec![PathBuf::from("a.bam"), PathBuf::from("b.bam")]
        );
        assert!(p.validate().is_ok());
    }

    #[test]
    fn validate_requires_input() {
        let p = parse(&["--pattern", "p.txt", "--rank", "r.bin"]);
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("read files"));
    }

    #[test]
    fn validate_rejects_mixed_inputs() {
        let p = parse(&[
            "--pattern", "p.txt", "--rank", "r.bin", "--ifastq", "i.fq", "x.bam",
        ]);
        assert!(p.validate().is_err());

        let p = parse(&[
            "--pattern", "p.txt", "--rank", "r.bin", "--ifastq", "i.fq",
            "--fastq1", "R1.fq",
        ]);
        assert!(p.validate().is_err());

        let p = parse(&["--pattern", "p.txt", "--rank", "r.bin", "--fastq1", "R1.fq"]);
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_numeric_ranges() {
        let base = ["--pattern", "p.txt", "--rank", "r.bin", "--ifastq", "i.fq"];

        let mut args = base.to_vec();
        args.extend_from_slice(&["--maxrank", "0"]);
        assert!(parse(&args).validate().is_err());

        let mut args = base.to_vec();
        args.extend_from_slice(&["--minbases", "101"]);
        assert!(parse(&args).validate().is_err());

        let mut args = base.to_vec();
        args.extend_from_slice(&["--maxins", "99"]);
        assert!(parse(&args).validate().is_err());

        let mut args = base.to_vec();
        args.extend_from_slice(&["--minmins", "0"]);
        assert!(parse(&args).validate().is_err());

        let mut args = base.to_vec();
        args.extend_from_slice(&["--threads", "65"]);
        assert!(parse(&args).validate().is_err());

        let mut args = base.to_vec();
        args.extend_from_slice(&["-w", "256"]);
        assert!(parse(&args).validate().is_err());

        let mut args = base.to_vec();
        args.extend_from_slice(&["--show", "2"]);
        assert!(parse(&args).validate().is_err());
    }
}
