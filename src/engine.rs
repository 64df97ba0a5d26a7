/// The matching engine: a fixed pool of worker threads pulling batches of
/// read pairs from a shared source and writing hits through a shared sink.
use std::io::Write;
use std::sync::Mutex;
use std::thread;

use log::info;

use crate::error::Error;
use crate::hits::{self, build_hit};
use crate::io::pairs::{open_pair_reader, PairReader, ReadPair};
use crate::kmer::reverse_complement;
use crate::matcher::{get_matches, validate_overlaps, MatchConfig};
use crate::params::Parameters;
use crate::pattern::{create_pattern_map, read_patterns};
use crate::rank::KmerRankTable;

/// Number of read pairs in a full batch.
pub const BATCH_SIZE: usize = 100_000;

/// Upper bound on the worker pool size.
pub const MAX_THREADS: usize = 64;

/// State behind the input mutex: the pair source, the shared end-of-input
/// flag, and the aggregate read-pair counter.
struct SharedInput {
    reader: Box<dyn PairReader + Send>,
    end_of_input: bool,
    num_read_pairs: u64,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // a poisoned mutex means a sibling worker panicked; the state itself
    // is still usable and the panic surfaces at join
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Pull up to one full batch under the input mutex. A short batch marks end
/// of input; a read error is recorded the same way so peers drain quickly.
fn next_batch(input: &Mutex<SharedInput>) -> Result<Vec<ReadPair>, Error> {
    let mut input = lock(input);

    if input.end_of_input {
        return Ok(Vec::new());
    }

    let mut batch = Vec::new();

    while batch.len() < BATCH_SIZE {
        match input.reader.next_pair() {
            Ok(Some(pair)) => batch.push(pair),
            Ok(None) => {
                input.end_of_input = true;
                break;
            }
            Err(e) => {
                input.end_of_input = true;
                return Err(e);
            }
        }
    }

    input.num_read_pairs += batch.len() as u64;
    Ok(batch)
}

/// Match one read pair in one orientation and append the validated hits to
/// the batch output buffer.
fn process_orientation(
    name1: &str,
    sequence1: &[u8],
    name2: &str,
    sequence2: &[u8],
    config: &MatchConfig,
    buffer: &mut Vec<u8>,
) -> Result<(), Error> {
    let revcomp2 = reverse_complement(sequence2);

    for m in get_matches(sequence1, &revcomp2, config) {
        if let Some((ov1, ov2)) = validate_overlaps(sequence1, &revcomp2, &m, config) {
            let hit = build_hit(
                name1,
                sequence1,
                name2,
                &revcomp2,
                &config.patterns[m.c1.index],
                &m,
                &ov1,
                &ov2,
            );
            hit.write(buffer)?;
        }
    }

    Ok(())
}

/// Worker loop: pull a batch, match every pair in both orientations, then
/// flush the batch's hits in one critical section on the output mutex.
fn worker(
    input: &Mutex<SharedInput>,
    output: &Mutex<&mut (dyn Write + Send)>,
    config: &MatchConfig,
) -> Result<(), Error> {
    loop {
        let batch = next_batch(input)?;
        if batch.is_empty() {
            return Ok(());
        }

        let mut buffer = Vec::new();

        for pair in &batch {
            let result = process_orientation(
                &pair.name1,
                &pair.sequence1,
                &pair.name2,
                &pair.sequence2,
                config,
                &mut buffer,
            )
            .and_then(|_| {
                process_orientation(
                    &pair.name2,
                    &pair.sequence2,
                    &pair.name1,
                    &pair.sequence1,
                    config,
                    &mut buffer,
                )
            });

            if let Err(e) = result {
                lock(input).end_of_input = true;
                return Err(e);
            }
        }

        if let Err(e) = lock(output).write_all(&buffer) {
            lock(input).end_of_input = true;
            return Err(e.into());
        }

        if batch.len() < BATCH_SIZE {
            return Ok(()); // short batch: end of input
        }
    }
}

/// Run the engine against the pair source selected by the command line,
/// writing hits to standard output.
pub fn run(params: &Parameters) -> Result<(), Error> {
    let reader = open_pair_reader(params)?;
    let mut out = std::io::stdout();

    run_with(params, reader, &mut out).map(|_| ())
}

/// Run the engine against an arbitrary pair source and sink. Returns the
/// total number of read pairs processed.
pub fn run_with(
    params: &Parameters,
    reader: Box<dyn PairReader + Send>,
    out: &mut (dyn Write + Send),
) -> Result<u64, Error> {
    let rank_table = KmerRankTable::read(&params.rank_file)?;
    let max_minimizer = rank_table.max_minimizer(params.max_rank);
    info!(
        "loaded k-mer rank table: k={}, minimizer cutoff {}",
        rank_table.k, max_minimizer
    );

    let (patterns, annotation_headings) = read_patterns(&params.pattern_file)?;
    if patterns.is_empty() {
        return Err(Error::Pattern(format!(
            "no patterns in {}",
            params.pattern_file.display()
        )));
    }
    info!("read {} patterns", patterns.len());

    let pattern_map = create_pattern_map(
        &patterns,
        params.window_length,
        &rank_table,
        max_minimizer,
    );
    info!("pattern index holds {} distinct minimizers", pattern_map.len());

    let version = format!("v{}", env!("CARGO_PKG_VERSION"));
    hits::write_heading_line(out, &version, &annotation_headings)?;

    let config = MatchConfig {
        patterns: &patterns,
        pattern_map: &pattern_map,
        rank_table: &rank_table,
        w: params.window_length,
        max_minimizer,
        min_bases: params.min_bases,
        min_mins: params.min_mins,
        max_insert: params.max_insert,
        max_trim: params.max_trim,
        min_overlap: params.min_overlap,
        best_overall: params.best_overall(),
        find_single: params.find_single(),
    };

    let input = Mutex::new(SharedInput {
        reader,
        end_of_input: false,
        num_read_pairs: 0,
    });
    let output = Mutex::new(out);

    info!("matching with {} threads", params.threads);

    let results: Vec<Result<(), Error>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..params.threads)
            .map(|_| scope.spawn(|| worker(&input, &output, &config)))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(Error::Consistency("worker thread panicked".into())))
            })
            .collect()
    });

    // surface the first worker error
    for result in results {
        result?;
    }

    let num_read_pairs = lock(&input).num_read_pairs;
    let out = output.into_inner().unwrap_or_else(|e| e.into_inner());
    hits::write_read_pairs_line(out, num_read_pairs)?;

    info!("processed {} read pairs", num_read_pairs);
    Ok(num_read_pairs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
