//! Reads fuzzion2 hits from stdin, sorts them, and writes them to stdout.

use std::io::{BufWriter, Write};

use clap::Parser;

use rufuzzion::error::Error;
use rufuzzion::hits;

#[derive(Debug, Parser)]
#[command(
    name = "fuzzort",
    about = "Sort fuzzion2 hits (reads stdin, writes stdout)",
    version
)]
struct Options {}

fn run() -> Result<(), Error> {
    let stdin = std::io::stdin();
    let hit_file = hits::read_hits(stdin.lock())?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    hits::write_heading_line(&mut out, &hit_file.version, &hit_file.annotation_headings)?;
    for hit in &hit_file.hits {
        hit.write(&mut out)?;
    }
    hits::write_read_pairs_line(&mut out, hit_file.read_pairs)?;

    out.flush().map_err(Error::from)
}

fn main() {
    if let Err(e) = Options::try_parse() {
        let _ = e.print();
        std::process::exit(1);
    }

    if let Err(err) = run() {
        eprintln!("fuzzort: {err}");
        std::process::exit(1);
    }
}
