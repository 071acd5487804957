use std::fmt;

use serde::Serialize;

use crate::{cache::Geometry, config::Config, trace::AccessKind};

const SIG_DIGITS: i32 = 6;

/// Raw access counters, updated once per simulated access.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub read_access: u64,
    pub read_hit: u64,
    pub write_access: u64,
    pub write_hit: u64,
}

impl Stats {
    pub fn access(&mut self, kind: AccessKind) {
        match kind {
            AccessKind::Read => self.read_access += 1,
            AccessKind::Write => self.write_access += 1,
        }
    }

    pub fn hit(&mut self, kind: AccessKind) {
        match kind {
            AccessKind::Read => self.read_hit += 1,
            AccessKind::Write => self.write_hit += 1,
        }
    }

    pub fn report(&self) -> Report {
        let read_miss = self.read_access - self.read_hit;
        let write_miss = self.write_access - self.write_hit;
        let total_miss = read_miss + write_miss;

        Report {
            total_miss,
            total_miss_pct: percent(total_miss, self.read_access + self.write_access),
            read_miss,
            read_miss_pct: percent(read_miss, self.read_access),
            write_miss,
            write_miss_pct: percent(write_miss, self.write_access),
        }
    }
}

/// NaN when nothing was accessed.
fn percent(part: u64, whole: u64) -> f64 {
    part as f64 / whole as f64 * 100.0
}

/// Miss counts and percentages derived at the end of a run.
///
/// Displays as the single result line:
/// `totalMiss totalMissPct readMiss readMissPct writeMiss writeMissPct`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Report {
    pub total_miss: u64,
    pub total_miss_pct: f64,
    pub read_miss: u64,
    pub read_miss_pct: f64,
    pub write_miss: u64,
    pub write_miss_pct: f64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.total_miss,
            Pct(self.total_miss_pct),
            self.read_miss,
            Pct(self.read_miss_pct),
            self.write_miss,
            Pct(self.write_miss_pct)
        )
    }
}

/// `%g` with six significant digits: `50`, `33.3333`, `5e-05`, `nan`.
struct Pct(f64);

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value.is_nan() {
            return f.write_str("nan");
        }
        if value.is_infinite() {
            return f.write_str(if value > 0.0 { "inf" } else { "-inf" });
        }
        if value == 0.0 {
            return f.write_str("0");
        }

        // The exponent after rounding to SIG_DIGITS decides the notation.
        let sci = format!("{:.*e}", (SIG_DIGITS - 1) as usize, value);
        let (mantissa, exp) = sci.split_once('e').ok_or(fmt::Error)?;
        let exp: i32 = exp.parse().map_err(|_| fmt::Error)?;

        if exp < -4 || exp >= SIG_DIGITS {
            let sign = if exp < 0 { '-' } else { '+' };
            write!(f, "{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
        } else {
            let decimals = (SIG_DIGITS - 1 - exp) as usize;
            f.write_str(trim_zeros(&format!("{value:.decimals$}")))
        }
    }
}

fn trim_zeros(num: &str) -> &str {
    if num.contains('.') {
        num.trim_end_matches('0').trim_end_matches('.')
    } else {
        num
    }
}

/// Everything written by `--json`.
#[derive(Debug, Serialize)]
pub struct CacheStats<'a> {
    pub config: &'a Config,
    pub geometry: &'a Geometry,
    pub accesses: u64,
    pub counters: &'a Stats,
    pub report: Report,
}

impl<'a> CacheStats<'a> {
    pub fn new(config: &'a Config, geometry: &'a Geometry, counters: &'a Stats) -> Self {
        CacheStats {
            config,
            geometry,
            accesses: counters.read_access + counters.write_access,
            counters,
            report: counters.report(),
        }
    }
}
