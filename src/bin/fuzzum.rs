//! Reads fuzzion2 hits from stdin and writes a per-pattern summary for one
//! sample to stdout: read pairs, distinct read pairs, and distinct read
//! pairs that are strong matches.

use std::collections::BTreeMap;
use std::io::{BufWriter, Write};

use clap::Parser;

use rufuzzion::error::Error;
use rufuzzion::hits::{self, Strength, DEFAULT_MIN_STRONG};

#[derive(Debug, Parser)]
#[command(
    name = "fuzzum",
    about = "Summarize fuzzion2 hits per pattern (reads stdin, writes stdout)",
    version
)]
struct Options {
    /// Identifies the sample
    #[arg(long = "id")]
    id: String,

    /// Minimum overlap for a strong match
    #[arg(long = "minstrong", default_value_t = DEFAULT_MIN_STRONG)]
    min_strong: usize,
}

#[derive(Default)]
struct Summary {
    read_pairs: u64,
    distinct: u64,
    strong: u64,
    annotations: Vec<String>,
}

fn run(options: &Options) -> Result<(), Error> {
    let stdin = std::io::stdin();
    let hit_file = hits::read_hits(stdin.lock())?;

    let duplicates = hits::duplicate_flags(&hit_file.hits);

    let mut summaries: BTreeMap<String, Summary> = BTreeMap::new();

    for (hit, &duplicate) in hit_file.hits.iter().zip(&duplicates) {
        let summary = summaries
            .entry(hit.pattern.name.clone())
            .or_insert_with(|| Summary {
                annotations: hit.pattern.annotations.clone(),
                ..Summary::default()
            });

        summary.read_pairs += 1;
        if !duplicate {
            summary.distinct += 1;
            if hit.strength(options.min_strong) != Strength::Weak {
                summary.strong += 1;
            }
        }
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    write!(
        out,
        "fuzzum v{}\tread pairs\tdistinct\tstrong\tpattern",
        env!("CARGO_PKG_VERSION")
    )?;
    for heading in &hit_file.annotation_headings {
        write!(out, "\t{}", heading)?;
    }
    writeln!(out)?;

    for (name, summary) in &summaries {
        write!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            options.id, summary.read_pairs, summary.distinct, summary.strong, name
        )?;
        for annotation in &summary.annotations {
            write!(out, "\t{}", annotation)?;
        }
        writeln!(out)?;
    }

    out.flush().map_err(Error::from)
}

fn main() {
    let options = match Options::try_parse() {
        Ok(options) => options,
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    if let Err(err) = run(&options) {
        eprintln!("fuzzum: {err}");
        std::process::exit(1);
    }
}
