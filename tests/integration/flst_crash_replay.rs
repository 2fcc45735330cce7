#![allow(missing_docs)]

#[path = "../common/mod.rs"]
mod common;

use common::*;
use sombra_flst::primitives::concurrency::WriteLatch;
use sombra_flst::primitives::mtr::Mtr;
use sombra_flst::primitives::pager::BufferPool;
use sombra_flst::storage::flst::{self, FileAddr, ListBase};
use sombra_flst::types::{Lsn, Result};

const PAGES: u32 = 4;

struct Step {
    lsn: Lsn,
    order: Vec<FileAddr>,
    images: Vec<Vec<u8>>,
}

/// Runs a fixed workload, one mini-transaction per list operation.
fn workload(pool: &BufferPool) -> Result<Vec<Step>> {
    let (a, b, c, d, e) = (slot(1, 0), slot(2, 0), slot(3, 0), slot(0, 1), slot(1, 1));
    let mut steps = Vec::new();
    let mut record = |pool: &BufferPool, order: Vec<FileAddr>| -> Result<()> {
        steps.push(Step {
            lsn: pool.latest_lsn(),
            order,
            images: snapshot(pool, PAGES)?,
        });
        Ok(())
    };
    append(pool, a)?;
    record(pool, vec![a])?;
    append(pool, b)?;
    record(pool, vec![a, b])?;
    prepend(pool, c)?;
    record(pool, vec![c, a, b])?;
    insert_after(pool, a, d)?;
    record(pool, vec![c, a, d, b])?;
    remove(pool, a)?;
    record(pool, vec![c, d, b])?;
    insert_before(pool, c, e)?;
    record(pool, vec![e, c, d, b])?;
    remove(pool, b)?;
    record(pool, vec![e, c, d])?;
    Ok(steps)
}

#[test]
fn each_commit_replayed_twice_reproduces_pages() -> Result<()> {
    let pool = list_pool(PAGES)?;
    let start = snapshot(&pool, PAGES)?;
    let start_lsn = pool.latest_lsn();
    let steps = workload(&pool)?;
    let commits = pool.commits_since(start_lsn);
    assert_eq!(commits.len(), steps.len());

    restore(&pool, &start)?;
    for ((lsn, records), step) in commits.iter().zip(&steps) {
        assert_eq!(*lsn, step.lsn);
        pool.apply_redo(records)?;
        pool.apply_redo(records)?;
        assert_eq!(snapshot(&pool, PAGES)?, step.images, "after commit {lsn:?}");
    }
    assert_eq!(validate(&pool)?.len, 3);
    Ok(())
}

#[test]
fn every_record_applied_twice_in_a_row_is_harmless() -> Result<()> {
    let pool = list_pool(PAGES)?;
    let start = snapshot(&pool, PAGES)?;
    let start_lsn = pool.latest_lsn();
    let steps = workload(&pool)?;
    let records = pool.redo_since(start_lsn);

    restore(&pool, &start)?;
    for record in &records {
        pool.apply_redo(&[record.clone(), record.clone()])?;
    }
    let last = steps.last().expect("workload has steps");
    assert_eq!(snapshot(&pool, PAGES)?, last.images);
    Ok(())
}

#[test]
fn every_committed_prefix_is_a_valid_list() -> Result<()> {
    let pool = list_pool(PAGES)?;
    let start = snapshot(&pool, PAGES)?;
    let start_lsn = pool.latest_lsn();
    let steps = workload(&pool)?;
    let commits = pool.commits_since(start_lsn);

    restore(&pool, &start)?;
    for ((_, records), step) in commits.iter().zip(&steps) {
        pool.apply_redo(records)?;
        assert_eq!(forward(&pool)?, step.order);
        let reversed: Vec<_> = step.order.iter().rev().copied().collect();
        assert_eq!(backward(&pool)?, reversed);
        assert_eq!(validate(&pool)?.len as usize, step.order.len());
    }
    Ok(())
}

#[test]
fn partially_applied_commit_is_completed_by_replay() -> Result<()> {
    let pool = list_pool(PAGES)?;
    let start = snapshot(&pool, PAGES)?;
    let start_lsn = pool.latest_lsn();
    let steps = workload(&pool)?;
    let commits = pool.commits_since(start_lsn);

    let mut before = start;
    for ((lsn, records), step) in commits.iter().zip(&steps) {
        // A crash may flush any prefix of the commit's changes before
        // recovery re-applies the whole commit.
        for cut in 0..=records.len() {
            restore(&pool, &before)?;
            pool.apply_redo(&records[..cut])?;
            pool.apply_redo(records)?;
            assert_eq!(snapshot(&pool, PAGES)?, step.images, "commit {lsn:?} cut {cut}");
        }
        before = step.images.clone();
    }
    Ok(())
}

#[test]
fn init_replays_over_garbage() -> Result<()> {
    let pool = list_pool(1)?;
    {
        let mut mtr = Mtr::start(&pool);
        let block = mtr.get_page(BASE_PAGE, WriteLatch::Exclusive)?;
        mtr.memset(block, BASE_OFF as usize, flst::FLST_BASE_NODE_SIZE, 0xa5);
        mtr.commit();
    }
    let dirty = snapshot(&pool, 1)?;
    let lsn = pool.latest_lsn();
    {
        let mut mtr = Mtr::start(&pool);
        let block = mtr.get_page(BASE_PAGE, WriteLatch::Exclusive)?;
        flst::init(&mut mtr, ListBase::new(block, BASE_OFF));
        mtr.commit();
    }
    let clean = snapshot(&pool, 1)?;
    let records = pool.redo_since(lsn);
    restore(&pool, &dirty)?;
    pool.apply_redo(&records)?;
    pool.apply_redo(&records)?;
    assert_eq!(snapshot(&pool, 1)?, clean);
    assert_eq!(base_fields(&pool)?, (0, FileAddr::NULL, FileAddr::NULL));
    Ok(())
}
