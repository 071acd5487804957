use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    config::Config,
    error::{SimError, SimResult},
    replace::random::RandomDomain,
    sim,
    stats::CacheStats,
    trace::{Trace, TraceSource},
};

/// Must exist in the working directory before a run starts.
pub const PRECONDITION_FILE: &str = "files.txt";

/// Runs `[flags] <capacityKB> <assoc> <blockSize> <policy>` against the trace.
///
/// Relative paths, including the precondition file, resolve against `cwd`. The
/// result line is written to `out` only once the whole trace has been simulated.
pub fn run(mut args: pico_args::Arguments, cwd: &Path, out: &mut impl Write) -> SimResult<()> {
    let heartbeat_int: u64 = args.opt_value_from_str("-h")?.unwrap_or(0);
    let seed: Option<u64> = args.opt_value_from_str("--seed")?;
    let skip_last = args.contains("--random-skip-last");
    let trace_path: Option<PathBuf> = args.opt_value_from_str("-t")?;
    let stats_path: Option<PathBuf> = args.opt_value_from_str("--json")?;
    let access_per_block: usize = args
        .opt_value_from_str("--buffer-size")?
        .unwrap_or(1024 * 16);
    let blocks_per_queue: usize = args.opt_value_from_str("--queue-size")?.unwrap_or(32);

    let positional: Vec<String> = args
        .finish()
        .into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let [capacity_kb, assoc, block_size, policy] = positional.as_slice() else {
        return Err(SimError::Usage(positional.len()));
    };

    let mut config = Config::from_positional(capacity_kb, assoc, block_size, policy)?;
    config.seed = seed;
    if skip_last {
        config.random_domain = RandomDomain::SkipLast;
    }
    debug!("Config: {config:?}");
    let mut cache = config.to_cache()?;

    let precondition = cwd.join(PRECONDITION_FILE);
    fs::File::open(&precondition).map_err(|source| SimError::MissingPrecondition {
        path: precondition.clone(),
        source,
    })?;

    let source = match trace_path {
        Some(path) => TraceSource::File(cwd.join(path)),
        None => TraceSource::Stdin,
    };
    let trace = Trace::read(source, access_per_block, blocks_per_queue)?;
    sim::run(cache.as_mut(), &trace, heartbeat_int)?;

    writeln!(out, "{}", cache.stats().report())?;

    if let Some(stats_path) = stats_path {
        let stats = CacheStats::new(&config, cache.geometry(), cache.stats());
        let stats_file = fs::File::create(cwd.join(stats_path))?;
        serde_json::to_writer_pretty(stats_file, &stats)?;
    }
    Ok(())
}
