#![allow(missing_docs)]

#[path = "../common/mod.rs"]
mod common;

use std::collections::VecDeque;

use common::*;
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sombra_flst::primitives::pager::BufferPool;
use sombra_flst::storage::flst::FileAddr;
use sombra_flst::types::Result;

const PAGES: u32 = 3;

#[derive(Debug, Clone)]
enum Op {
    PushBack(u16),
    PushFront(u16),
    InsertAfter { at: usize, node: u16 },
    InsertBefore { at: usize, node: u16 },
    Remove { at: usize },
}

/// Maps a candidate index onto a node slot; page 0 also holds the base node.
fn candidate(idx: u16) -> FileAddr {
    slot(u32::from(idx) % PAGES, idx / PAGES as u16 % SLOTS)
}

fn arb_op() -> impl Strategy<Value = Op> {
    let node = 0u16..(PAGES as u16 * SLOTS);
    prop_oneof![
        node.clone().prop_map(Op::PushBack),
        node.clone().prop_map(Op::PushFront),
        (any::<usize>(), node.clone()).prop_map(|(at, node)| Op::InsertAfter { at, node }),
        (any::<usize>(), node).prop_map(|(at, node)| Op::InsertBefore { at, node }),
        any::<usize>().prop_map(|at| Op::Remove { at }),
        any::<usize>().prop_map(|at| Op::Remove { at }),
    ]
}

/// Applies `op` to both the stored list and the model. Ops that would
/// insert an existing member or touch an empty list are skipped.
fn apply(pool: &BufferPool, model: &mut VecDeque<FileAddr>, op: &Op) -> Result<()> {
    let fresh = |node: u16| {
        let addr = candidate(node);
        (!model.contains(&addr)).then_some(addr)
    };
    match *op {
        Op::PushBack(node) => {
            if let Some(addr) = fresh(node) {
                append(pool, addr)?;
                model.push_back(addr);
            }
        }
        Op::PushFront(node) => {
            if let Some(addr) = fresh(node) {
                prepend(pool, addr)?;
                model.push_front(addr);
            }
        }
        Op::InsertAfter { at, node } => {
            if let (false, Some(addr)) = (model.is_empty(), fresh(node)) {
                let pos = at % model.len();
                insert_after(pool, model[pos], addr)?;
                model.insert(pos + 1, addr);
            }
        }
        Op::InsertBefore { at, node } => {
            if let (false, Some(addr)) = (model.is_empty(), fresh(node)) {
                let pos = at % model.len();
                insert_before(pool, model[pos], addr)?;
                model.insert(pos, addr);
            }
        }
        Op::Remove { at } => {
            if !model.is_empty() {
                let pos = at % model.len();
                remove(pool, model[pos])?;
                model.remove(pos);
            }
        }
    }
    Ok(())
}

fn assert_matches(pool: &BufferPool, model: &VecDeque<FileAddr>) -> Result<()> {
    let fwd: Vec<_> = model.iter().copied().collect();
    let bwd: Vec<_> = model.iter().rev().copied().collect();
    assert_eq!(forward(pool)?, fwd);
    assert_eq!(backward(pool)?, bwd);
    let report = validate(pool)?;
    assert_eq!(report.len as usize, model.len());
    let (len, first, last) = base_fields(pool)?;
    assert_eq!(len as usize, model.len());
    assert_eq!(first, model.front().copied().unwrap_or(FileAddr::NULL));
    assert_eq!(last, model.back().copied().unwrap_or(FileAddr::NULL));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_list_matches_model(ops in prop::collection::vec(arb_op(), 1..80)) {
        let pool = list_pool(PAGES).unwrap();
        let mut model = VecDeque::new();
        for op in &ops {
            apply(&pool, &mut model, op).unwrap();
        }
        assert_matches(&pool, &model).unwrap();
    }

    #[test]
    fn prop_commits_replayed_twice_match_live_pages(ops in prop::collection::vec(arb_op(), 1..40)) {
        let pool = list_pool(PAGES).unwrap();
        let start = snapshot(&pool, PAGES).unwrap();
        let lsn = pool.latest_lsn();
        let mut model = VecDeque::new();
        for op in &ops {
            apply(&pool, &mut model, op).unwrap();
        }
        let done = snapshot(&pool, PAGES).unwrap();
        restore(&pool, &start).unwrap();
        for (_, records) in pool.commits_since(lsn) {
            pool.apply_redo(&records).unwrap();
            pool.apply_redo(&records).unwrap();
        }
        prop_assert_eq!(snapshot(&pool, PAGES).unwrap(), done);
    }
}

#[test]
fn seeded_stress_matches_model() -> Result<()> {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed_f157);
    let pool = list_pool(PAGES)?;
    let mut model = VecDeque::new();
    let limit = PAGES as u16 * SLOTS;
    for step in 0..2_000 {
        let op = match rng.gen_range(0..5) {
            0 => Op::PushBack(rng.gen_range(0..limit)),
            1 => Op::PushFront(rng.gen_range(0..limit)),
            2 => Op::InsertAfter {
                at: rng.gen(),
                node: rng.gen_range(0..limit),
            },
            3 => Op::InsertBefore {
                at: rng.gen(),
                node: rng.gen_range(0..limit),
            },
            _ => Op::Remove { at: rng.gen() },
        };
        apply(&pool, &mut model, &op)?;
        if step % 100 == 0 {
            assert_matches(&pool, &model)?;
        }
    }
    assert_matches(&pool, &model)
}
