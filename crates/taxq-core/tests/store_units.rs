use std::collections::HashSet;

use proptest::prelude::*;
use rusqlite::Connection;
use taxq_core::QueueError;
use taxq_core::config::StoreConfig;
use taxq_core::db::{self, accounts, query, workqueue};
use taxq_core::db::workqueue::WriteOptions;
use taxq_core::lookup::LookupCache;
use taxq_core::model::{NewWorkItem, WorkItem, WorkItemPatch};

const EXTENDED: i64 = 4;
const STATUSES: [i64; 6] = [1, 2, 3, 4, 5, 10];
const IDENTIFIERS: [&str; 5] = ["AB12", "CD34", "EF56", "GH78", "IJ90"];

struct Store {
    conn: Connection,
    cache: LookupCache,
    options: WriteOptions,
    account: i64,
}

impl Store {
    fn new() -> Self {
        let conn = db::open_in_memory().expect("store");
        let account = accounts::create_account(&conn, "acme", "Acme").expect("account").id;
        Self {
            conn,
            cache: LookupCache::new(),
            options: WriteOptions::default(),
            account,
        }
    }

    fn items(&self) -> Vec<WorkItem> {
        query::account_items_in_rank_order(&self.conn, self.account).expect("items")
    }

    fn assert_invariants(&mut self) {
        let check = workqueue::verify_account(&self.conn, &mut self.cache, self.account)
            .expect("known statuses");
        assert_eq!(check, Ok(()));

        let items = self.items();
        let keys: HashSet<(i32, String)> =
            items.iter().map(|i| (i.return_year, i.identifier.clone())).collect();
        assert_eq!(keys.len(), items.len(), "identifier reused within a return year");
        for item in &items {
            assert_eq!(item.extension_date_id.is_some(), item.status_id == EXTENDED);
        }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Create { ident: usize, year: i32, status: i64, at: Option<u32> },
    SetStatus { pick: usize, status: i64 },
    Delete { pick: usize },
    Move { pick: usize, to: u32 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    let status = prop::sample::select(STATUSES.to_vec());
    prop_oneof![
        3 => (0..IDENTIFIERS.len(), 2023_i32..2025, status.clone(), prop::option::of(1_u32..8))
            .prop_map(|(ident, year, status, at)| Op::Create { ident, year, status, at }),
        2 => (any::<usize>(), status).prop_map(|(pick, status)| Op::SetStatus { pick, status }),
        1 => any::<usize>().prop_map(|pick| Op::Delete { pick }),
        2 => (any::<usize>(), 1_u32..8).prop_map(|(pick, to)| Op::Move { pick, to }),
    ]
}

fn apply(store: &mut Store, op: &Op) -> Result<(), QueueError> {
    let Store { conn, cache, options, account } = store;
    let items = query::account_items_in_rank_order(conn, *account)?;
    let target = |pick: usize| (!items.is_empty()).then(|| items[pick % items.len()].clone());

    match *op {
        Op::Create { ident, year, status, at } => {
            let mut new = NewWorkItem::new(IDENTIFIERS[ident], year);
            new.status_id = Some(status);
            new.extension_date_id = (status == EXTENDED).then_some(1);
            new.insert_at = at.filter(|_| status != 10);
            workqueue::create_item(conn, cache, options, *account, &new, Some("prop")).map(|_| ())
        }
        Op::SetStatus { pick, status } => {
            let Some(item) = target(pick) else { return Ok(()) };
            let patch = WorkItemPatch {
                status_id: Some(status),
                extension_date_id: (status == EXTENDED).then_some(Some(2)),
                ..WorkItemPatch::default()
            };
            workqueue::update_item(conn, cache, options, *account, item.id, &patch, None).map(|_| ())
        }
        Op::Delete { pick } => {
            let Some(item) = target(pick) else { return Ok(()) };
            workqueue::delete_item(conn, cache, options, *account, item.id).map(|_| ())
        }
        Op::Move { pick, to } => {
            let Some(item) = target(pick) else { return Ok(()) };
            if item.position.is_none() {
                return Ok(());
            }
            workqueue::move_item(conn, cache, options, *account, item.id, to).map(|_| ())
        }
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn every_unit_leaves_the_queue_consistent(ops in prop::collection::vec(arb_op(), 1..30)) {
        let mut store = Store::new();
        for op in &ops {
            let before = store.items();
            match apply(&mut store, op) {
                Ok(()) => {}
                Err(QueueError::IdentifierInUse { .. }) => {
                    prop_assert_eq!(store.items(), before);
                }
                Err(err) => prop_assert!(false, "unexpected error for {:?}: {}", op, err),
            }
            store.assert_invariants();
        }
    }
}

#[test]
fn conflicting_identifier_scenario() {
    let mut store = Store::new();
    let new = NewWorkItem::new("AB12", 2024);
    workqueue::create_item(&mut store.conn, &mut store.cache, &store.options, store.account, &new, None)
        .expect("first");
    let err = workqueue::create_item(
        &mut store.conn,
        &mut store.cache,
        &store.options,
        store.account,
        &new,
        None,
    )
    .expect_err("second");
    assert_eq!(err.code().code(), "E4001");
    assert_eq!(store.items().len(), 1);
}

#[test]
fn extended_without_date_scenario() {
    let mut store = Store::new();
    let mut new = NewWorkItem::new("AB12", 2024);
    new.status_id = Some(EXTENDED);
    let err = workqueue::create_item(&mut store.conn, &mut store.cache, &store.options, store.account, &new, None)
        .expect_err("extension required");
    assert!(matches!(err, QueueError::ExtensionRequired { .. }));
    assert!(store.items().is_empty());
}

#[test]
fn accounts_are_ranked_independently() {
    let mut store = Store::new();
    let other = accounts::create_account(&store.conn, "beta", "Beta").expect("account").id;
    for (account, ident) in [(store.account, "AB12"), (other, "AB12"), (other, "CD34")] {
        workqueue::create_item(
            &mut store.conn,
            &mut store.cache,
            &store.options,
            account,
            &NewWorkItem::new(ident, 2024),
            None,
        )
        .expect("same identifier is fine in another account");
    }

    assert_eq!(query::max_position(&store.conn, store.account).expect("max"), 1);
    assert_eq!(query::max_position(&store.conn, other).expect("max"), 2);
    assert_eq!(query::max_external_position(&store.conn, other).expect("max"), 2);
    assert!(
        query::is_identifier_available(&store.conn, store.account, 2024, "CD34", None)
            .expect("check")
    );
}

#[test]
fn busy_store_surfaces_transient_error_then_recovers() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(".taxq").join("taxq.db");
    let config = StoreConfig {
        busy_timeout_ms: 10,
        retry_attempts: 2,
        retry_backoff_ms: 1,
    };

    let holder = db::open_store(&path, &config).expect("open holder");
    accounts::create_account(&holder, "acme", "Acme").expect("account");

    let mut writer = db::open_store(&path, &config).expect("open writer");
    let mut cache = LookupCache::new();
    let options = WriteOptions {
        retry: config.retry_policy(),
        ..WriteOptions::default()
    };
    cache.catalog(&writer, 1).expect("warm cache");

    holder.execute_batch("BEGIN IMMEDIATE").expect("hold write lock");
    let err = workqueue::create_item(&mut writer, &mut cache, &options, 1, &NewWorkItem::new("AB12", 2024), None)
        .expect_err("store is locked");
    assert!(err.is_retryable(), "expected transient error, got {err}");
    holder.execute_batch("COMMIT").expect("release");

    let item = workqueue::create_item(&mut writer, &mut cache, &options, 1, &NewWorkItem::new("AB12", 2024), None)
        .expect("succeeds once the lock is gone");
    assert_eq!(item.ranks(), (Some(1), Some(1)));
}
