use crate::cache::{Block, Cache};

use super::{MakeS, Replace};

/// True least-recently-used replacement.
///
/// Every hit or fill stamps the block with its set's next sequence number, so
/// the victim is the valid way with the smallest stamp.
#[derive(Debug, Default)]
pub struct Lru {}

impl Lru {
    pub fn new() -> Self {
        Lru {}
    }
}

impl Replace<LruSetData, LruBlockData> for Lru {
    fn touch(&mut self, set: &mut LruSetData, _way: usize, block: &mut Block<LruBlockData>) {
        block.repl_block.last_used = set.tick();
    }

    fn fill(&mut self, set: &mut LruSetData, _way: usize, block: &mut Block<LruBlockData>) {
        block.repl_block.last_used = set.tick();
    }

    fn victim(&mut self, _set: &mut LruSetData, blocks: &[Block<LruBlockData>]) -> usize {
        blocks
            .iter()
            .enumerate()
            .min_by_key(|(_way, b)| b.repl_block.last_used)
            .map(|(way, _b)| way)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct LruSetData {
    clock: u64,
}

impl LruSetData {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

impl MakeS for LruSetData {
    fn new(_n_ways: usize) -> Self {
        LruSetData { clock: 0 }
    }
}

#[derive(Debug, Default)]
pub struct LruBlockData {
    last_used: u64,
}

impl Cache<LruSetData, LruBlockData, Lru> {
    /// Occupied ways of `set`, least recently used first.
    pub fn recency_order(&self, set: usize) -> Vec<usize> {
        let mut ways: Vec<(u64, usize)> = self.blocks[self.get_set(set)]
            .iter()
            .enumerate()
            .filter(|(_way, b)| b.valid)
            .map(|(way, b)| (b.repl_block.last_used, way))
            .collect();
        ways.sort_unstable();
        ways.into_iter().map(|(_stamp, way)| way).collect()
    }
}
