use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use lutradb::common::types::{PageId, TransactionId};
use lutradb::storage::buffer::BufferPool;
use lutradb::transaction::concurrency::LockMode;
use lutradb::tuple::Value;

mod common;
use common::{
    create_test_pool, create_test_pool_with_timeout, sample_row, scan_all, seed_rows,
    sorted_ids, TEST_TABLE_ID,
};

fn pid(page_no: u32) -> PageId {
    PageId::new(TEST_TABLE_ID, page_no)
}

#[test]
fn test_committed_insert_is_visible() -> Result<()> {
    let (pool, catalog, _dir) = create_test_pool(10)?;

    let t1 = TransactionId::new();
    let mut tuple = sample_row(1);
    pool.insert_tuple(t1, TEST_TABLE_ID, &mut tuple)?;
    pool.transaction_complete(t1, true)?;

    let rows = scan_all(&pool, &catalog)?;
    assert_eq!(sorted_ids(&rows), vec![1]);
    Ok(())
}

#[test]
fn test_aborted_insert_is_invisible() -> Result<()> {
    let (pool, catalog, _dir) = create_test_pool(10)?;
    seed_rows(&pool, 3)?;

    let t1 = TransactionId::new();
    let mut tuple = sample_row(99);
    pool.insert_tuple(t1, TEST_TABLE_ID, &mut tuple)?;
    pool.transaction_complete(t1, false)?;

    let rows = scan_all(&pool, &catalog)?;
    assert_eq!(sorted_ids(&rows), vec![0, 1, 2]);
    assert_eq!(pool.dirty_page_count(), 0);
    Ok(())
}

#[test]
fn test_abort_is_idempotent() -> Result<()> {
    let (pool, _catalog, _dir) = create_test_pool(10)?;

    let t1 = TransactionId::new();
    let mut tuple = sample_row(5);
    pool.insert_tuple(t1, TEST_TABLE_ID, &mut tuple)?;
    pool.transaction_complete(t1, false)?;
    pool.transaction_complete(t1, false)?;
    Ok(())
}

// S1: a dirty page survives concurrent eviction pressure.
#[test]
fn test_dirty_page_survives_eviction_pressure() -> Result<()> {
    let (pool, catalog, _dir) = create_test_pool(10)?;
    seed_rows(&pool, 300)?;
    let rows = scan_all(&pool, &catalog)?;

    // Restart with a two-frame pool
    let pool = Arc::new(BufferPool::new(2, catalog.clone()));

    // T1 deletes a row on page 0, dirtying it
    let t1 = TransactionId::new();
    let victim_row = rows
        .iter()
        .find(|t| t.record_id().map(|r| r.page_id) == Some(pid(0)))
        .expect("page 0 should hold a row");
    let deleted_id = match victim_row.value(0) {
        Some(Value::Integer(i)) => *i,
        other => panic!("unexpected id field: {:?}", other),
    };
    pool.delete_tuple(t1, victim_row)?;

    // T2 reads page 1 (clean); T3 then demands page 2, forcing an eviction
    // that must spare the dirty page.
    let t2 = TransactionId::new();
    pool.get_page(t2, pid(1), LockMode::Shared)?;
    let t3 = TransactionId::new();
    pool.get_page(t3, pid(2), LockMode::Shared)?;
    assert!(pool.contains_page(pid(0)), "dirty page was evicted");

    pool.transaction_complete(t2, true)?;
    pool.transaction_complete(t3, true)?;
    pool.transaction_complete(t1, true)?;

    // After T1 commits, a fresh scan reflects the delete
    let rows_after = scan_all(&pool, &catalog)?;
    assert_eq!(rows_after.len(), rows.len() - 1);
    assert!(!sorted_ids(&rows_after).contains(&deleted_id));
    Ok(())
}

// S2: a lock cycle is broken by timing out one participant.
#[test]
fn test_deadlock_resolved_by_timeout() -> Result<()> {
    let (pool, _catalog, _dir) =
        create_test_pool_with_timeout(10, Duration::from_millis(150))?;
    seed_rows(&pool, 300)?;

    let barrier = Arc::new(Barrier::new(2));
    let aborted = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();

    for i in 0..2u32 {
        let pool = pool.clone();
        let barrier = barrier.clone();
        let aborted = aborted.clone();
        handles.push(thread::spawn(move || {
            let tid = TransactionId::new();
            let mine = pid(i);
            let other = pid(1 - i);

            pool.get_page(tid, mine, LockMode::Exclusive).unwrap();
            barrier.wait();
            // Stagger the second request so one side reliably times out
            // first and unblocks the other.
            thread::sleep(Duration::from_millis(60 * i as u64));

            match pool.get_page(tid, other, LockMode::Shared) {
                Ok(_) => pool.transaction_complete(tid, true).unwrap(),
                Err(e) => {
                    assert!(e.is_aborted(), "unexpected failure: {}", e);
                    aborted.fetch_add(1, Ordering::SeqCst);
                    pool.transaction_complete(tid, false).unwrap();
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let aborted = aborted.load(Ordering::SeqCst);
    assert!(aborted >= 1, "no participant was timed out");

    // Whatever happened, both pages are free again afterwards
    let tid = TransactionId::new();
    pool.get_page(tid, pid(0), LockMode::Exclusive)?;
    pool.get_page(tid, pid(1), LockMode::Exclusive)?;
    pool.transaction_complete(tid, true)?;
    Ok(())
}

// S3: a sole shared holder upgrades in place.
#[test]
fn test_lock_upgrade_in_place() -> Result<()> {
    let (pool, _catalog, _dir) = create_test_pool(10)?;
    seed_rows(&pool, 5)?;

    let t1 = TransactionId::new();
    pool.get_page(t1, pid(0), LockMode::Shared)?;
    assert_eq!(pool.lock_manager().holds(t1, pid(0)), Some(LockMode::Shared));

    pool.get_page(t1, pid(0), LockMode::Exclusive)?;
    assert_eq!(
        pool.lock_manager().holds(t1, pid(0)),
        Some(LockMode::Exclusive)
    );
    assert!(pool.holds_lock(t1, pid(0)));

    pool.transaction_complete(t1, true)?;
    Ok(())
}

// Boundary: the upgrade succeeds only with no other holder present.
#[test]
fn test_lock_upgrade_blocked_by_second_reader() -> Result<()> {
    let (pool, _catalog, _dir) =
        create_test_pool_with_timeout(10, Duration::from_millis(100))?;
    seed_rows(&pool, 5)?;

    let t1 = TransactionId::new();
    let t2 = TransactionId::new();
    pool.get_page(t1, pid(0), LockMode::Shared)?;
    pool.get_page(t2, pid(0), LockMode::Shared)?;

    let err = pool.get_page(t1, pid(0), LockMode::Exclusive).unwrap_err();
    assert!(err.is_aborted());
    pool.transaction_complete(t1, false)?;

    // With t1 gone, t2 is the sole holder and may upgrade
    pool.get_page(t2, pid(0), LockMode::Exclusive)?;
    pool.transaction_complete(t2, true)?;
    Ok(())
}

// S4: aborting rolls every dirtied page back to its before-image.
#[test]
fn test_abort_rolls_back_multi_page_insert() -> Result<()> {
    let (pool, catalog, _dir) = create_test_pool(10)?;
    seed_rows(&pool, 10)?;
    let before = scan_all(&pool, &catalog)?;

    let t1 = TransactionId::new();
    for id in 100..200 {
        let mut tuple = sample_row(id);
        pool.insert_tuple(t1, TEST_TABLE_ID, &mut tuple)?;
    }
    assert!(pool.dirty_page_count() > 1, "insert should span pages");
    pool.transaction_complete(t1, false)?;

    assert_eq!(pool.dirty_page_count(), 0);
    let after = scan_all(&pool, &catalog)?;
    assert_eq!(sorted_ids(&after), sorted_ids(&before));
    Ok(())
}

// S5: readers share; a writer waits for all of them.
#[test]
fn test_concurrent_readers_single_writer() -> Result<()> {
    let (pool, _catalog, _dir) =
        create_test_pool_with_timeout(10, Duration::from_secs(10))?;
    seed_rows(&pool, 5)?;

    const READERS: usize = 10;
    let holding = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));
    // Readers + writer line up so the writer requests while all locks are held
    let barrier = Arc::new(Barrier::new(READERS + 1));
    let mut handles = Vec::new();

    for _ in 0..READERS {
        let pool = pool.clone();
        let holding = holding.clone();
        let peak = peak.clone();
        let done = done.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            let tid = TransactionId::new();
            pool.get_page(tid, pid(0), LockMode::Shared).unwrap();
            let now = holding.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            barrier.wait();

            thread::sleep(Duration::from_millis(50));
            holding.fetch_sub(1, Ordering::SeqCst);
            done.fetch_add(1, Ordering::SeqCst);
            pool.transaction_complete(tid, true).unwrap();
        }));
    }

    let writer = {
        let pool = pool.clone();
        let done = done.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            let tid = TransactionId::new();
            barrier.wait();
            pool.get_page(tid, pid(0), LockMode::Exclusive).unwrap();
            // Granted only once every reader released
            assert_eq!(done.load(Ordering::SeqCst), READERS);
            pool.transaction_complete(tid, true).unwrap();
        })
    };

    for handle in handles {
        handle.join().unwrap();
    }
    writer.join().unwrap();

    // All ten readers really were in at the same time
    assert_eq!(peak.load(Ordering::SeqCst), READERS);
    Ok(())
}

// S6: FORCE makes commits durable with no recovery step.
#[test]
fn test_commit_is_durable_across_restart() -> Result<()> {
    let (pool, catalog, dir) = create_test_pool(10)?;

    let t1 = TransactionId::new();
    for id in 0..20 {
        let mut tuple = sample_row(id);
        pool.insert_tuple(t1, TEST_TABLE_ID, &mut tuple)?;
    }
    pool.transaction_complete(t1, true)?;
    drop(pool);
    drop(catalog);

    // "Restart": reopen the table file under a brand-new catalog and pool
    // with an empty cache.
    let catalog = Arc::new(lutradb::catalog::Catalog::new());
    let file = lutradb::storage::disk::HeapFile::new(
        dir.path().join("test_table.tbl"),
        TEST_TABLE_ID,
        common::test_tuple_desc(),
    )?;
    catalog.add_table(Arc::new(file), "test_table");
    let pool = Arc::new(BufferPool::new(10, catalog.clone()));

    let rows = scan_all(&pool, &catalog)?;
    assert_eq!(sorted_ids(&rows), (0..20).collect::<Vec<i64>>());
    Ok(())
}

// A failed acquisition leaves earlier locks in place; abort cleans them up.
#[test]
fn test_timeout_then_abort_releases_everything() -> Result<()> {
    let (pool, _catalog, _dir) =
        create_test_pool_with_timeout(10, Duration::from_millis(100))?;
    seed_rows(&pool, 300)?;

    let t1 = TransactionId::new();
    let t2 = TransactionId::new();
    pool.get_page(t1, pid(0), LockMode::Exclusive)?;
    pool.get_page(t2, pid(1), LockMode::Exclusive)?;

    let err = pool.get_page(t2, pid(0), LockMode::Shared).unwrap_err();
    assert!(err.is_aborted());
    // t2 still holds its earlier lock until it aborts
    assert!(pool.holds_lock(t2, pid(1)));

    pool.transaction_complete(t2, false)?;
    assert!(!pool.holds_lock(t2, pid(1)));
    assert!(pool.lock_manager().pages_held_by(t2).is_empty());

    // t1 is unaffected
    assert!(pool.holds_lock(t1, pid(0)));
    pool.transaction_complete(t1, true)?;
    Ok(())
}
