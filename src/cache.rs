use std::{iter, ops::Range};

use log::{debug, trace};
use serde::Serialize;

use crate::{
    error::ConfigError,
    replace::{AccessResult, MakeS, Replace},
    stats::Stats,
    trace::Access,
};

const ADDR_BITS: u32 = u64::BITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Addr {
    pub offset: u64,
    pub set: usize,
    pub tag: u64,
}

/// Widths of the tag, index and offset fields, derived once from the cache shape.
///
/// `tag_bits + index_bits + offset_bits` is always 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub n_sets: usize,
    pub n_ways: usize,
    pub block_size: usize,
    pub tag_bits: u32,
    pub index_bits: u32,
    pub offset_bits: u32,
}

impl Geometry {
    pub fn new(capacity_kb: usize, n_ways: usize, block_size: usize) -> Result<Self, ConfigError> {
        if capacity_kb == 0 {
            return Err(ConfigError::Zero("capacity"));
        }
        if n_ways == 0 {
            return Err(ConfigError::Zero("associativity"));
        }
        if block_size == 0 {
            return Err(ConfigError::Zero("block size"));
        }
        if !block_size.is_power_of_two() {
            return Err(ConfigError::BlockSize(block_size));
        }

        let capacity = capacity_kb.checked_mul(1024).ok_or(ConfigError::Overflow)?;
        let set_size = n_ways
            .checked_mul(block_size)
            .ok_or(ConfigError::Overflow)?;
        let n_sets = capacity / set_size;
        if !n_sets.is_power_of_two() {
            return Err(ConfigError::SetCount {
                capacity_kb,
                assoc: n_ways,
                block_size,
                n_sets,
            });
        }

        let offset_bits = block_size.ilog2();
        let index_bits = n_sets.ilog2();
        if offset_bits + index_bits > ADDR_BITS {
            return Err(ConfigError::Overflow);
        }

        let geometry = Geometry {
            n_sets,
            n_ways,
            block_size,
            tag_bits: ADDR_BITS - index_bits - offset_bits,
            index_bits,
            offset_bits,
        };
        debug!("Derived geometry: {geometry:?}");
        Ok(geometry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSection {
    shift: u32,
    mask: u64,
}

impl BitSection {
    pub fn new(shift: u32, width: u32) -> Self {
        let mask = if width >= ADDR_BITS {
            u64::MAX
        } else {
            (1 << width) - 1
        };
        BitSection { shift, mask }
    }

    pub fn apply(&self, num: u64) -> u64 {
        num.checked_shr(self.shift).unwrap_or(0) & self.mask
    }
}

/// Splits raw addresses into tag, set index and block offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrDecoder {
    offset_sec: BitSection,
    set_sec: BitSection,
    tag_sec: BitSection,
}

impl AddrDecoder {
    pub fn new(geometry: &Geometry) -> Self {
        let set_shift = geometry.offset_bits;
        let tag_shift = geometry.index_bits + set_shift;
        AddrDecoder {
            offset_sec: BitSection::new(0, geometry.offset_bits),
            set_sec: BitSection::new(set_shift, geometry.index_bits),
            tag_sec: BitSection::new(tag_shift, geometry.tag_bits),
        }
    }

    pub fn split(&self, addr: u64) -> Addr {
        let offset = self.offset_sec.apply(addr);
        let set = self.set_sec.apply(addr) as usize;
        let tag = self.tag_sec.apply(addr);
        Addr { offset, set, tag }
    }
}

#[derive(Debug)]
pub struct Cache<S: MakeS, B: Default, R: Replace<S, B>> {
    pub blocks: Vec<Block<B>>,
    pub set_data: Vec<S>,
    pub geometry: Geometry,
    decoder: AddrDecoder,
    pub repl: R,
    stats: Stats,
}

impl<S: MakeS, B: Default, R: Replace<S, B>> Cache<S, B, R> {
    pub fn new(geometry: Geometry, repl: R) -> Self {
        debug!(
            "Allocating {} sets x {} ways of {}B blocks",
            geometry.n_sets, geometry.n_ways, geometry.block_size
        );
        Cache {
            blocks: iter::repeat_with(Block::default)
                .take(geometry.n_sets * geometry.n_ways)
                .collect(),
            set_data: iter::repeat_with(|| S::new(geometry.n_ways))
                .take(geometry.n_sets)
                .collect(),
            decoder: AddrDecoder::new(&geometry),
            geometry,
            repl,
            stats: Stats::default(),
        }
    }

    pub fn get_set(&self, set: usize) -> Range<usize> {
        set * self.geometry.n_ways..(set + 1) * self.geometry.n_ways
    }

    /// Looks for `addr.tag` among the valid blocks of its set, refreshing the
    /// replacement state of the matching way on a hit.
    pub fn lookup(&mut self, addr: &Addr) -> AccessResult {
        let set_range = self.get_set(addr.set);
        let set_slice = &mut self.blocks[set_range];
        let hit = set_slice
            .iter_mut()
            .enumerate()
            .find(|(_way, b)| b.valid && b.tag == addr.tag);

        match hit {
            Some((way, block)) => {
                self.repl.touch(&mut self.set_data[addr.set], way, block);
                AccessResult::Hit
            }
            None => AccessResult::Miss,
        }
    }

    /// Places `addr.tag` into its set. Must only follow a miss on the same tag.
    pub fn insert(&mut self, addr: &Addr) {
        let set_range = self.get_set(addr.set);
        let set_slice = &mut self.blocks[set_range];
        let set_data = &mut self.set_data[addr.set];

        let way = match set_slice.iter().position(|b| !b.valid) {
            Some(vacant_way) => vacant_way,
            None => {
                let victim_way = self.repl.victim(set_data, set_slice);
                trace!(
                    "Set {}: evicting way {} (tag {:#x}) for tag {:#x}",
                    addr.set,
                    victim_way,
                    set_slice[victim_way].tag,
                    addr.tag
                );
                victim_way
            }
        };

        let block = &mut set_slice[way];
        block.apply(addr);
        self.repl.fill(set_data, way, block);
    }
}

pub trait IsCache {
    /// Runs one access through the cache and records it in the counters.
    fn simulate(&mut self, access: &Access) -> AccessResult;
    fn split_addr(&self, addr: u64) -> Addr;
    fn geometry(&self) -> &Geometry;
    fn stats(&self) -> &Stats;
}

impl<S: MakeS, B: Default, R: Replace<S, B>> IsCache for Cache<S, B, R> {
    fn simulate(&mut self, access: &Access) -> AccessResult {
        self.stats.access(access.kind);
        let addr = self.split_addr(access.addr);
        let result = self.lookup(&addr);
        match result {
            AccessResult::Hit => self.stats.hit(access.kind),
            AccessResult::Miss => self.insert(&addr),
        }
        result
    }

    fn split_addr(&self, addr: u64) -> Addr {
        self.decoder.split(addr)
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

#[derive(Debug, Default)]
pub struct Block<B: Default> {
    pub valid: bool,
    pub tag: u64,

    // Replace Data
    pub repl_block: B,
}

impl<B: Default> Block<B> {
    pub fn apply(&mut self, addr: &Addr) {
        self.valid = true;
        self.tag = addr.tag;
    }
}
