use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::cd::{CompactionDriver, DriverOptions};
use crate::config::{Backend, CompactConfig, HeapCommand};
use crate::error::{CompactError, ConfigurationError};
use crate::hm::hm_table::Rid;
use crate::hm::{HeapSnapshot, HeapTable};
use crate::sm::{HeapPrimary, HeapReplica, ReplicaSession};

const PAGE_SIZE: usize = 1024;

// 100 字节一条，每页放 9 条
fn record(i: usize) -> Vec<u8> {
    format!("{:0100}", i).into_bytes()
}

// 建表并删掉前 30 页上的所有记录，只留下尾部 4 页上的 30 条
fn churned_table(dir: &Path) -> (PathBuf, HeapTable, Vec<Rid>) {
    let path = dir.join("events.heap");
    let mut table = HeapTable::create(&path, "events", PAGE_SIZE).unwrap();
    let rids: Vec<Rid> = (0..300).map(|i| table.insert(&record(i)).unwrap()).collect();
    assert_eq!(table.page_count(), 34);
    assert_eq!(table.delete_pages_before(30).unwrap(), 270);
    let stats = table.vacuum().unwrap();
    assert_eq!(stats.pruned, 270);
    // 尾部仍有存活记录，文件无法截短
    assert_eq!(stats.truncated_pages, 0);
    (path, table, rids)
}

fn opts() -> DriverOptions {
    let mut opts = DriverOptions::new("events", "");
    opts.batch_pages = 10;
    opts.page_size = PAGE_SIZE;
    opts
}

fn contents(table: &mut HeapTable) -> BTreeSet<Vec<u8>> {
    let mut rows = BTreeSet::new();
    for page in 0..table.page_count() {
        for slot in table.live_slots(page).unwrap().iter() {
            rows.insert(table.get((page, slot)).unwrap());
        }
    }
    rows
}

#[test]
fn heap_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.heap");
    let rid = {
        let mut table = HeapTable::create(&path, "t", PAGE_SIZE).unwrap();
        let rid = table.insert(b"hello").unwrap();
        table.flush().unwrap();
        rid
    };
    let mut table = HeapTable::open(&path).unwrap();
    assert_eq!(table.relname(), "t");
    assert_eq!(table.page_count(), 1);
    assert_eq!(table.get(rid).unwrap(), b"hello");

    let snapshot = HeapSnapshot::open(&path).unwrap();
    assert_eq!(snapshot.page_count(), 1);
    assert_eq!(snapshot.live_slots(0).unwrap().len(), 1);
    assert!(snapshot.page(1).is_err());
}

#[test]
fn compaction_then_vacuum_shrinks_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let (path, mut table, _) = churned_table(dir.path());
    let before = contents(&mut table);
    assert_eq!(before.len(), 30);

    let mut replica = HeapReplica::open(&path).unwrap();
    let mut primary = HeapPrimary::from_table(table);
    let report = CompactionDriver::new(&mut replica, &mut primary, opts())
        .run()
        .unwrap();

    assert_eq!(report.page_count, 34);
    assert_eq!(report.batches, 4);
    assert_eq!(report.pages_emptied, report.pages_visited);
    assert_eq!(report.pages_stalled + report.pages_exhausted, 0);

    let mut table = primary.into_table();
    // 尾部 4 页已经清空，等待存储引擎回收
    for page in 30..34 {
        assert!(table.live_slots(page).unwrap().is_empty());
    }
    let stats = table.vacuum().unwrap();
    assert!(stats.truncated_pages > 0);
    assert!(table.page_count() <= 8);
    assert_eq!(contents(&mut table), before);
}

#[test]
fn locked_row_keeps_its_page_until_a_later_run() {
    let dir = tempfile::tempdir().unwrap();
    let (path, table, rids) = churned_table(dir.path());
    let last = *rids.last().unwrap();
    assert_eq!(last, (33, 3));

    let mut replica = HeapReplica::open(&path).unwrap();
    let mut primary = HeapPrimary::from_table(table);
    primary.table().lock(last);
    let report = CompactionDriver::new(&mut replica, &mut primary, opts())
        .run()
        .unwrap();
    assert_eq!(report.pages_stalled, 1);

    // 被锁的记录仍在最后一页，清理无法截掉它
    let stats = primary.table().vacuum().unwrap();
    assert_eq!(primary.table().page_count(), 34);
    assert!(stats.pruned > 0);

    primary.table().unlock(last);
    let again = CompactionDriver::new(&mut replica, &mut primary, opts())
        .run()
        .unwrap();
    assert_eq!(again.pages_stalled, 0);
    primary.table().vacuum().unwrap();
    assert!(primary.table().page_count() < 34);
    assert_eq!(primary.table().live_rows().unwrap(), 30);
}

#[test]
fn replica_only_knows_its_own_table() {
    let dir = tempfile::tempdir().unwrap();
    let (path, table, _) = churned_table(dir.path());
    drop(table);

    let mut replica = HeapReplica::open(&path).unwrap();
    assert_eq!(replica.relpages("events").unwrap(), vec![34]);
    assert!(replica.relpages("other").unwrap().is_empty());

    let mut primary = HeapPrimary::from_table(HeapTable::open(&path).unwrap());
    let mut o = opts();
    o.table = "other".into();
    let err = CompactionDriver::new(&mut replica, &mut primary, o)
        .run()
        .unwrap_err();
    assert!(matches!(
        err,
        CompactError::Configuration(ConfigurationError::TableNotFound { .. })
    ));
}

// 第 0 页放满 9 条，文件不能再扩展
fn full_single_page(dir: &Path) -> (PathBuf, HeapTable) {
    let path = dir.join("full.heap");
    let mut table = HeapTable::create(&path, "full", PAGE_SIZE).unwrap();
    for i in 0..9 {
        table.insert(&record(i)).unwrap();
    }
    assert_eq!(table.page_count(), 1);
    table.set_page_limit(Some(1));
    table.flush().unwrap();
    (path, table)
}

#[test]
fn failed_relocation_keeps_the_old_version() {
    let dir = tempfile::tempdir().unwrap();
    let (_, mut table) = full_single_page(dir.path());

    // 新版本无处可写，旧版本必须仍然存活
    assert!(table.relocate((0, 1)).is_err());
    assert_eq!(table.live_rows().unwrap(), 9);
    assert_eq!(table.get((0, 1)).unwrap(), record(0));

    table.set_page_limit(None);
    assert_eq!(table.relocate((0, 1)).unwrap(), Some((1, 1)));
    assert_eq!(table.live_rows().unwrap(), 9);
    assert!(!table.live_slots(0).unwrap().contains(1));
    assert_eq!(table.get((1, 1)).unwrap(), record(0));
}

#[test]
fn storage_error_during_compaction_loses_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let (path, table) = full_single_page(dir.path());

    let mut replica = HeapReplica::open(&path).unwrap();
    let mut primary = HeapPrimary::from_table(table);
    let mut o = opts();
    o.table = "full".into();
    let err = CompactionDriver::new(&mut replica, &mut primary, o)
        .run()
        .unwrap_err();
    assert!(matches!(err, CompactError::Heap(_)));

    let mut table = primary.into_table();
    assert_eq!(table.live_rows().unwrap(), 9);
    assert_eq!(table.live_slots(0).unwrap().len(), 9);
}

fn heap(path: &Path, command: HeapCommand) -> Backend {
    Backend::Heap {
        path: path.to_path_buf(),
        command,
        max_pages: None,
    }
}

#[test]
fn sizes_use_the_page_size_recorded_in_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.heap");
    let table = HeapTable::create(&path, "events", PAGE_SIZE).unwrap();
    let config = CompactConfig::new("events", heap(&path, HeapCommand::Compact));
    assert_eq!(config.page_size, 8192);

    let opts = crate::heap_driver_options(&config, &table);
    assert_eq!(opts.page_size, PAGE_SIZE);
    assert_eq!(opts.field, "");
}

#[test]
fn offline_rehearsal_load_delete_compact_vacuum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.heap");
    let source = dir.path().join("rows.txt");
    let lines: String = (0..300).map(|i| format!("{:0100}\n", i)).collect();
    std::fs::write(&source, lines).unwrap();

    let mut config = CompactConfig::new(
        "events",
        heap(&path, HeapCommand::Load {
            source: source.clone(),
        }),
    );
    config.page_size = PAGE_SIZE;
    config.batch_pages = 10;
    assert_eq!(crate::run(&config).unwrap(), "loaded=300 pages=34");

    config.backend = heap(&path, HeapCommand::Delete { before: 30 });
    assert_eq!(crate::run(&config).unwrap(), "deleted=270 pages=34");

    config.backend = heap(&path, HeapCommand::Vacuum);
    assert_eq!(crate::run(&config).unwrap(), "pruned=270 truncated_pages=0");

    config.backend = heap(&path, HeapCommand::Compact);
    crate::run(&config).unwrap();

    config.backend = heap(&path, HeapCommand::Vacuum);
    crate::run(&config).unwrap();

    let mut table = HeapTable::open(&path).unwrap();
    assert!(table.page_count() <= 8);
    assert_eq!(table.live_rows().unwrap(), 30);

    // 堆文件里存放的是别的表
    let mut other = CompactConfig::new("other", heap(&path, HeapCommand::Vacuum));
    other.page_size = PAGE_SIZE;
    assert!(matches!(
        crate::run(&other),
        Err(CompactError::Configuration(ConfigurationError::TableNotFound { .. }))
    ));
}
