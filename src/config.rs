use log::debug;
use serde::Serialize;

use crate::{
    cache::{Cache, Geometry, IsCache},
    error::ConfigError,
    replace::{
        lru::Lru,
        random::{Random, RandomDomain},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    Lru,
    Random,
}

impl Policy {
    /// `l` selects LRU; any other character, or none, selects random.
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with('l') {
            Policy::Lru
        } else {
            Policy::Random
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub capacity_kb: usize,
    pub assoc: usize,
    pub block_size: usize,
    pub policy: Policy,
    pub random_domain: RandomDomain,
    pub seed: Option<u64>,
}

impl Config {
    pub fn new(capacity_kb: usize, assoc: usize, block_size: usize, policy: Policy) -> Self {
        Config {
            capacity_kb,
            assoc,
            block_size,
            policy,
            random_domain: RandomDomain::default(),
            seed: None,
        }
    }

    /// Builds a config from `<capacityKB> <assoc> <blockSize> <policy>`.
    pub fn from_positional(
        capacity_kb: &str,
        assoc: &str,
        block_size: &str,
        policy: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Config::new(
            parse_num("capacity", capacity_kb)?,
            parse_num("associativity", assoc)?,
            parse_num("block size", block_size)?,
            Policy::from_arg(policy),
        ))
    }

    pub fn geometry(&self) -> Result<Geometry, ConfigError> {
        Geometry::new(self.capacity_kb, self.assoc, self.block_size)
    }

    pub fn to_cache(&self) -> Result<Box<dyn IsCache>, ConfigError> {
        let geometry = self.geometry()?;
        debug!("Building {:?} cache", self.policy);
        let cache = match self.policy {
            Policy::Lru => Box::new(Cache::new(geometry, Lru::new())) as Box<dyn IsCache>,
            Policy::Random => {
                let repl = match self.seed {
                    Some(seed) => Random::with_seed(seed, self.random_domain),
                    None => Random::new(self.random_domain),
                };
                Box::new(Cache::new(geometry, repl)) as Box<dyn IsCache>
            }
        };
        Ok(cache)
    }
}

fn parse_num(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: value.to_owned(),
    })
}
