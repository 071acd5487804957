use std::io::Cursor;

use cache_sim::{
    cache::{AddrDecoder, Geometry, IsCache},
    config::{Config, Policy},
    error::TraceError,
    replace::{random::RandomDomain, AccessResult},
    sim,
    trace::{parse_line, Access, AccessKind, Trace},
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn parse_trace(text: &str) -> Vec<Access> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| parse_line(idx as u64 + 1, line.as_bytes()).unwrap())
        .collect()
}

fn replay(config: &Config, accesses: &[Access]) -> (Vec<AccessResult>, Box<dyn IsCache>) {
    let mut cache = config.to_cache().unwrap();
    let results = sim::operate(cache.as_mut(), accesses);
    (results, cache)
}

/// Straightforward LRU: each set is a list of tags, oldest first.
fn reference_lru(geometry: &Geometry, accesses: &[Access]) -> Vec<AccessResult> {
    let decoder = AddrDecoder::new(geometry);
    let mut sets: Vec<Vec<u64>> = vec![Vec::new(); geometry.n_sets];
    accesses
        .iter()
        .map(|access| {
            let addr = decoder.split(access.addr);
            let set = &mut sets[addr.set];
            match set.iter().position(|&tag| tag == addr.tag) {
                Some(pos) => {
                    let tag = set.remove(pos);
                    set.push(tag);
                    AccessResult::Hit
                }
                None => {
                    if set.len() == geometry.n_ways {
                        set.remove(0);
                    }
                    set.push(addr.tag);
                    AccessResult::Miss
                }
            }
        })
        .collect()
}

fn access_strategy(max_addr: u64) -> impl Strategy<Value = Access> {
    (any::<bool>(), 0..max_addr).prop_map(|(is_read, addr)| Access {
        kind: if is_read {
            AccessKind::Read
        } else {
            AccessKind::Write
        },
        addr,
    })
}

fn geometry_strategy() -> impl Strategy<Value = (usize, usize, usize)> {
    (0u32..8, 0u32..6, 0u32..8)
        .prop_map(|(cap, ways, block)| (1usize << cap, 1usize << ways, 1usize << block))
}

#[test]
fn small_direct_mapped_scenario() {
    init_logging();
    let config = Config::from_positional("1", "1", "16", "l").unwrap();
    let accesses = parse_trace("r 0x0\nr 0x0\nw 0x10\nr 0x0");
    let (results, cache) = replay(&config, &accesses);

    // 0x10 lands in set 1, so the last read still finds 0x0 in set 0.
    assert_eq!(
        results,
        vec![
            AccessResult::Miss,
            AccessResult::Hit,
            AccessResult::Miss,
            AccessResult::Hit
        ]
    );
    assert_eq!(cache.stats().report().to_string(), "2 50 1 33.3333 1 100");
}

#[test]
fn conflicting_write_evicts_direct_mapped_block() {
    init_logging();
    let config = Config::new(1, 1, 16, Policy::Lru);
    // 0x400 has the same set index as 0x0 but tag 1.
    let accesses = parse_trace("r 0x0\nr 0x0\nw 0x400\nr 0x0");
    let (results, cache) = replay(&config, &accesses);

    assert_eq!(
        results,
        vec![
            AccessResult::Miss,
            AccessResult::Hit,
            AccessResult::Miss,
            AccessResult::Miss
        ]
    );
    assert_eq!(cache.stats().report().to_string(), "3 75 2 66.6667 1 100");
}

#[test]
fn reads_only_trace_reports_nan_write_percentage() {
    let (_, cache) = replay(
        &Config::new(1, 2, 16, Policy::Lru),
        &parse_trace("r 0x0\nr 0x4"),
    );
    assert_eq!(cache.stats().report().to_string(), "1 50 1 50 0 nan");
}

#[test]
fn runs_trace_through_reader_thread() {
    init_logging();
    let text = "r 0x0\nw 0x20\nr 0x0\nw 0x1000\nr 0x20\n";
    let trace = Trace::from_reader(Cursor::new(text), 2, 1);
    let mut cache = Config::new(1, 2, 32, Policy::Lru).to_cache().unwrap();

    let n_access = sim::run(cache.as_mut(), &trace, 1).unwrap();
    assert_eq!(n_access, 5);
    let stats = cache.stats();
    assert_eq!((stats.read_access, stats.read_hit), (3, 2));
    assert_eq!((stats.write_access, stats.write_hit), (2, 0));
}

#[test]
fn malformed_line_aborts_run() {
    let trace = Trace::from_reader(Cursor::new("r 0x0\nbogus\nr 0x0\n"), 1, 1);
    let mut cache = Config::new(1, 1, 16, Policy::Lru).to_cache().unwrap();

    match sim::run(cache.as_mut(), &trace, 0) {
        Err(TraceError::Malformed { line_no, line }) => {
            assert_eq!(line_no, 2);
            assert_eq!(line, "bogus");
        }
        other => panic!("expected malformed line error, got {other:?}"),
    }
    assert_eq!(cache.stats().read_access, 1);
}

proptest! {
    #[test]
    fn split_reassembles_address(addr in any::<u64>(), (cap, ways, block) in geometry_strategy()) {
        let geometry = Geometry::new(cap, ways, block);
        prop_assume!(geometry.is_ok());
        let geometry = geometry.unwrap();
        prop_assert_eq!(geometry.tag_bits + geometry.index_bits + geometry.offset_bits, 64);

        let split = AddrDecoder::new(&geometry).split(addr);
        let tag_shift = geometry.index_bits + geometry.offset_bits;
        let rebuilt = split.tag.checked_shl(tag_shift).unwrap_or(0)
            | ((split.set as u64) << geometry.offset_bits)
            | split.offset;
        prop_assert_eq!(rebuilt, addr);
    }

    #[test]
    fn hits_and_misses_add_up(
        accesses in prop::collection::vec(access_strategy(1 << 14), 0..400),
        lru in any::<bool>(),
    ) {
        let policy = if lru { Policy::Lru } else { Policy::Random };
        let (results, cache) = replay(&Config::new(1, 4, 16, policy), &accesses);
        let stats = cache.stats();
        let report = stats.report();

        prop_assert_eq!(stats.read_hit + report.read_miss, stats.read_access);
        prop_assert_eq!(stats.write_hit + report.write_miss, stats.write_access);
        let misses = results.iter().filter(|&&r| r == AccessResult::Miss).count() as u64;
        prop_assert_eq!(misses, report.total_miss);
    }

    #[test]
    fn lru_matches_reference_model(
        accesses in prop::collection::vec(access_strategy(1 << 12), 0..400),
        (cap, ways, block) in geometry_strategy(),
    ) {
        let config = Config::new(cap, ways, block, Policy::Lru);
        let geometry = config.geometry();
        prop_assume!(geometry.is_ok());
        let (results, _) = replay(&config, &accesses);
        prop_assert_eq!(results, reference_lru(&geometry.unwrap(), &accesses));
    }

    #[test]
    fn direct_mapped_policies_agree(
        accesses in prop::collection::vec(access_strategy(1 << 13), 0..400),
        seed in any::<u64>(),
        skip_last in any::<bool>(),
    ) {
        let mut random = Config::new(1, 1, 16, Policy::Random);
        random.seed = Some(seed);
        if skip_last {
            random.random_domain = RandomDomain::SkipLast;
        }
        let (lru_results, lru_cache) = replay(&Config::new(1, 1, 16, Policy::Lru), &accesses);
        let (random_results, random_cache) = replay(&random, &accesses);

        prop_assert_eq!(lru_results, random_results);
        prop_assert_eq!(lru_cache.stats(), random_cache.stats());
    }

    #[test]
    fn replay_is_repeatable(
        accesses in prop::collection::vec(access_strategy(1 << 14), 0..400),
        seed in any::<u64>(),
    ) {
        let lru = Config::new(1, 4, 16, Policy::Lru);
        prop_assert_eq!(replay(&lru, &accesses).0, replay(&lru, &accesses).0);

        let mut random = Config::new(1, 4, 16, Policy::Random);
        random.seed = Some(seed);
        let (first, first_cache) = replay(&random, &accesses);
        let (second, second_cache) = replay(&random, &accesses);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_cache.stats(), second_cache.stats());
    }
}
