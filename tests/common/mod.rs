use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use lutradb::catalog::Catalog;
use lutradb::common::types::{TableId, TransactionId};
use lutradb::execution::operators::{Operator, SeqScan};
use lutradb::storage::buffer::BufferPool;
use lutradb::storage::disk::HeapFile;
use lutradb::tuple::{Column, DataType, Tuple, TupleDesc, Value};

pub const TEST_TABLE_ID: TableId = 1;

#[allow(dead_code)]
pub fn test_tuple_desc() -> TupleDesc {
    TupleDesc::new(vec![
        Column::new("id", DataType::Integer),
        Column::new("name", DataType::Text),
        Column::new("value", DataType::Float),
        Column::new("active", DataType::Boolean),
    ])
}

#[allow(dead_code)]
pub fn sample_row(id: i64) -> Tuple {
    Tuple::new(vec![
        Value::Integer(id),
        Value::Text(format!("item_{}", id)),
        Value::Float(id as f64 * 1.5),
        Value::Boolean(id % 2 == 0),
    ])
}

/// Catalog with one registered test table backed by a scratch directory.
#[allow(dead_code)]
pub fn create_test_catalog() -> Result<(Arc<Catalog>, TempDir)> {
    let dir = TempDir::new()?;
    let catalog = Arc::new(Catalog::new());
    let file = HeapFile::new(
        dir.path().join("test_table.tbl"),
        TEST_TABLE_ID,
        test_tuple_desc(),
    )?;
    catalog.add_table(Arc::new(file), "test_table");
    Ok((catalog, dir))
}

/// Register an extra table in an existing test catalog.
#[allow(dead_code)]
pub fn add_test_table(
    catalog: &Catalog,
    dir: &TempDir,
    table_id: TableId,
    name: &str,
    desc: TupleDesc,
) -> Result<()> {
    let file = HeapFile::new(dir.path().join(format!("{}.tbl", name)), table_id, desc)?;
    catalog.add_table(Arc::new(file), name);
    Ok(())
}

#[allow(dead_code)]
pub fn create_test_pool(capacity: usize) -> Result<(Arc<BufferPool>, Arc<Catalog>, TempDir)> {
    let (catalog, dir) = create_test_catalog()?;
    let pool = Arc::new(BufferPool::new(capacity, catalog.clone()));
    Ok((pool, catalog, dir))
}

#[allow(dead_code)]
pub fn create_test_pool_with_timeout(
    capacity: usize,
    timeout: Duration,
) -> Result<(Arc<BufferPool>, Arc<Catalog>, TempDir)> {
    let (catalog, dir) = create_test_catalog()?;
    let pool = Arc::new(BufferPool::new_with_lock_timeout(
        capacity,
        catalog.clone(),
        timeout,
    ));
    Ok((pool, catalog, dir))
}

/// Insert `count` sample rows with ids `0..count` in one committed
/// transaction.
#[allow(dead_code)]
pub fn seed_rows(pool: &BufferPool, count: i64) -> Result<()> {
    let tid = TransactionId::new();
    for id in 0..count {
        let mut tuple = sample_row(id);
        pool.insert_tuple(tid, TEST_TABLE_ID, &mut tuple)?;
    }
    pool.transaction_complete(tid, true)?;
    Ok(())
}

/// Scan the whole test table in a fresh transaction and return its rows.
#[allow(dead_code)]
pub fn scan_all(pool: &Arc<BufferPool>, catalog: &Catalog) -> Result<Vec<Tuple>> {
    scan_table(pool, catalog, TEST_TABLE_ID)
}

#[allow(dead_code)]
pub fn scan_table(
    pool: &Arc<BufferPool>,
    catalog: &Catalog,
    table_id: TableId,
) -> Result<Vec<Tuple>> {
    let tid = TransactionId::new();
    let mut scan = SeqScan::new(pool.clone(), catalog, tid, table_id)?;
    scan.open()?;

    let mut rows = Vec::new();
    while let Some(tuple) = scan.next()? {
        rows.push(tuple);
    }
    scan.close()?;
    pool.transaction_complete(tid, true)?;

    Ok(rows)
}

/// The `id` fields of a set of rows, sorted.
#[allow(dead_code)]
pub fn sorted_ids(rows: &[Tuple]) -> Vec<i64> {
    let mut ids: Vec<i64> = rows
        .iter()
        .filter_map(|t| match t.value(0) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids
}
