pub mod lru;
pub mod random;

use crate::cache::Block;

pub trait MakeS {
    fn new(n_ways: usize) -> Self;
}

impl MakeS for () {
    fn new(_n_ways: usize) -> Self {}
}

/// Victim selection and the bookkeeping it needs.
///
/// The cache owns hit detection and vacant-way filling; a policy only sees the
/// set it is asked about.
pub trait Replace<S: MakeS, B: Default> {
    /// A valid block in `way` was hit.
    fn touch(&mut self, set: &mut S, way: usize, block: &mut Block<B>);

    /// `way` now holds a newly inserted tag, either in a vacant way or over a victim.
    fn fill(&mut self, set: &mut S, way: usize, block: &mut Block<B>);

    /// Chooses the way to evict from a set whose blocks are all valid.
    fn victim(&mut self, set: &mut S, blocks: &[Block<B>]) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Hit,
    Miss,
}
