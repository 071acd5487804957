use serde::Serialize;

use crate::cache::Block;

use super::Replace;

/// Which ways a random eviction may pick from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RandomDomain {
    /// Any way in the set.
    #[default]
    Full,
    /// Never the highest way, unless the cache is direct mapped.
    SkipLast,
}

/// Uniform random replacement. The generator is seeded once per cache.
#[derive(Debug)]
pub struct Random {
    rng: fastrand::Rng,
    domain: RandomDomain,
}

impl Random {
    pub fn new(domain: RandomDomain) -> Self {
        Random {
            rng: fastrand::Rng::new(),
            domain,
        }
    }

    pub fn with_seed(seed: u64, domain: RandomDomain) -> Self {
        Random {
            rng: fastrand::Rng::with_seed(seed),
            domain,
        }
    }
}

impl Replace<(), ()> for Random {
    fn touch(&mut self, _set: &mut (), _way: usize, _block: &mut Block<()>) {}

    fn fill(&mut self, _set: &mut (), _way: usize, _block: &mut Block<()>) {}

    fn victim(&mut self, _set: &mut (), blocks: &[Block<()>]) -> usize {
        let n_ways = blocks.len();
        let n_candidates = match self.domain {
            RandomDomain::SkipLast if n_ways > 1 => n_ways - 1,
            _ => n_ways,
        };
        self.rng.usize(0..n_candidates)
    }
}
