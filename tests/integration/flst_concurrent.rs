#![allow(missing_docs)]

#[path = "../common/mod.rs"]
mod common;

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use common::*;
use sombra_flst::primitives::pager::PageCache;
use sombra_flst::types::Result;

const NUM_THREADS: u32 = 6;
const NODES_PER_THREAD: u16 = SLOTS;

#[test]
fn concurrent_appends_keep_list_consistent() -> Result<()> {
    let pool = Arc::new(list_pool(NUM_THREADS + 1)?);
    let barrier = Arc::new(Barrier::new(NUM_THREADS as usize));
    let mut handles = Vec::new();

    for thread_id in 0..NUM_THREADS {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || -> Result<()> {
            barrier.wait();
            let cache: &dyn PageCache = &*pool;
            for n in 0..NODES_PER_THREAD {
                let addr = slot(thread_id + 1, n);
                if n % 2 == 0 {
                    append(cache, addr)?;
                } else {
                    prepend(cache, addr)?;
                }
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().expect("writer thread panicked")?;
    }

    let report = validate(&*pool)?;
    let expected = NUM_THREADS * NODES_PER_THREAD as u32;
    assert_eq!(report.len, expected);
    let members = forward(&pool)?;
    let unique: HashSet<_> = members.iter().copied().collect();
    assert_eq!(unique.len(), expected as usize);
    Ok(())
}

#[test]
fn validators_run_alongside_writers() -> Result<()> {
    let pool = Arc::new(list_pool(NUM_THREADS + 1)?);
    let writers = NUM_THREADS - 2;
    let barrier = Arc::new(Barrier::new(NUM_THREADS as usize));
    let mut handles = Vec::new();

    for thread_id in 0..writers {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || -> Result<()> {
            barrier.wait();
            let cache: &dyn PageCache = &*pool;
            let page = thread_id + 1;
            for n in 0..NODES_PER_THREAD {
                append(cache, slot(page, n))?;
            }
            // Drop every other node again.
            for n in (0..NODES_PER_THREAD).step_by(2) {
                remove(cache, slot(page, n))?;
            }
            Ok(())
        }));
    }
    for _ in writers..NUM_THREADS {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || -> Result<()> {
            barrier.wait();
            for _ in 0..50 {
                let report = validate(&*pool)?;
                assert_eq!(report.forward_hops, report.len);
                assert_eq!(report.backward_hops, report.len);
            }
            Ok(())
        }));
    }
    for handle in handles {
        handle.join().expect("worker thread panicked")?;
    }

    let report = validate(&*pool)?;
    assert_eq!(report.len, writers * (NODES_PER_THREAD as u32 / 2));
    let serialized = serde_json::to_value(&report).expect("report serializes");
    assert_eq!(serialized["len"], report.len);
    Ok(())
}
