use log::info;

use crate::{
    cache::IsCache,
    error::TraceError,
    replace::AccessResult,
    trace::{Access, Trace},
};

/// Applies `accesses` to the cache strictly in order.
pub fn operate(cache: &mut dyn IsCache, accesses: &[Access]) -> Vec<AccessResult> {
    accesses.iter().map(|access| cache.simulate(access)).collect()
}

/// Drains the trace into the cache. Stops at the first trace error.
///
/// Returns the number of accesses simulated.
pub fn run(cache: &mut dyn IsCache, trace: &Trace, heartbeat_int: u64) -> Result<u64, TraceError> {
    let mut n_access = 0;
    let mut next_heartbeat = heartbeat_int;

    for block in trace.rec.iter() {
        let block = block?;
        for access in &block {
            cache.simulate(access);
        }
        n_access += block.len() as u64;

        if heartbeat_int != 0 && n_access >= next_heartbeat {
            info!("Accesses: {}", n_access);
            while next_heartbeat <= n_access {
                next_heartbeat += heartbeat_int;
            }
        }
    }
    info!("Simulated {} accesses", n_access);
    Ok(n_access)
}
