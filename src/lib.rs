pub mod error;
pub mod params;

pub mod engine;
pub mod hits;
pub mod io;
pub mod kmer;
pub mod matcher;
pub mod pattern;
pub mod rank;
pub mod window;

use log::info;

use crate::error::Error;
use crate::params::Parameters;

/// Top-level entry point. Called from `main()` after CLI parsing.
pub fn run(params: &Parameters) -> Result<(), Error> {
    params.validate()?;

    info!("rufuzzion v{}", env!("CARGO_PKG_VERSION"));
    info!("pattern: {}", params.pattern_file.display());
    info!("rank: {}", params.rank_file.display());

    engine::run(params)
}
