// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Patch application against an in-memory transactional store.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex}
};

use patchset_core::{
    Config, DbType, Error, ErrorKind, FieldDescriptor, Mutation, MutationValue, PatchSet,
    PatchType, QuerySet, ReadTransaction, Resource, ResourceName, Result, Scalar, Statement,
    TransactionOps, Transactional, Value, WriteTransaction, async_trait, process_event, user_event
};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq)]
struct Account {
    id:      i64,
    name:    String,
    balance: i64
}

impl Resource for Account {
    fn resource_name() -> ResourceName {
        ResourceName::from_static("Accounts")
    }

    fn default_config() -> Config {
        Config::new(DbType::Spanner)
            .with_change_tracking_table("DataChangeEvents")
            .with_track_changes(true)
    }

    fn fields() -> &'static [FieldDescriptor] {
        const FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::new("id", Some("Id")),
            FieldDescriptor::new("name", Some("Name")),
            FieldDescriptor::new("balance", Some("Balance"))
        ];
        FIELDS
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "balance" => Some(self.balance.into()),
            _ => None
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("store is read-only")]
struct ReadOnly;

#[derive(Default)]
struct Inner {
    rows:      Mutex<BTreeMap<i64, Account>>,
    committed: Mutex<Vec<Mutation>>,
    rollbacks: Mutex<usize>,
    read_only: bool
}

#[derive(Clone, Default)]
struct Store(Arc<Inner>);

impl Store {
    fn with_rows(rows: impl IntoIterator<Item = Account>) -> Self {
        let store = Self::default();
        store
            .0
            .rows
            .lock()
            .unwrap()
            .extend(rows.into_iter().map(|row| (row.id, row)));
        store
    }

    fn read_only() -> Self {
        Self(Arc::new(Inner {
            read_only: true,
            ..Inner::default()
        }))
    }

    fn committed(&self) -> Vec<Mutation> {
        self.0.committed.lock().unwrap().clone()
    }

    fn rollbacks(&self) -> usize {
        *self.0.rollbacks.lock().unwrap()
    }
}

struct MemoryTxn {
    store:    Store,
    buffered: Vec<Mutation>
}

impl Transactional for Store {
    type Transaction = MemoryTxn;
    type Error = ReadOnly;

    async fn begin(&self) -> Result<MemoryTxn, ReadOnly> {
        Ok(MemoryTxn {
            store:    self.clone(),
            buffered: Vec::new()
        })
    }
}

impl TransactionOps for MemoryTxn {
    type Error = ReadOnly;

    async fn commit(self) -> Result<(), ReadOnly> {
        if self.store.0.read_only {
            return Err(ReadOnly);
        }
        self.store.0.committed.lock().unwrap().extend(self.buffered);
        Ok(())
    }

    async fn rollback(self) -> Result<(), ReadOnly> {
        *self.store.0.rollbacks.lock().unwrap() += 1;
        Ok(())
    }
}

#[async_trait]
impl ReadTransaction<Account> for MemoryTxn {
    async fn query_one(&mut self, stmt: &Statement) -> Result<Option<Account>> {
        let Some(Value::Scalar(Scalar::I64(id))) = stmt.params.get("id") else {
            return Ok(None);
        };
        Ok(self.store.0.rows.lock().unwrap().get(id).cloned())
    }

    async fn query_all(&mut self, _stmt: &Statement) -> Result<Vec<Account>> {
        Ok(self.store.0.rows.lock().unwrap().values().cloned().collect())
    }
}

#[async_trait]
impl WriteTransaction<Account> for MemoryTxn {
    async fn buffer_write(&mut self, mutations: Vec<Mutation>) -> Result<()> {
        self.buffered.extend(mutations);
        Ok(())
    }
}

fn jane() -> String {
    user_event("jane", "u1")
}

fn stored() -> Account {
    Account {
        id:      1,
        name:    "a".into(),
        balance: 10
    }
}

fn patch(patch_type: PatchType) -> PatchSet<Account> {
    let mut patch = PatchSet::new();
    patch.set_patch_type(patch_type).set_key("id", 1_i64);
    patch
}

fn change_set(mutation: &Mutation) -> serde_json::Value {
    let row = match mutation {
        Mutation::Insert {
            row, ..
        }
        | Mutation::InsertOrUpdate {
            row, ..
        } => row,
        other => panic!("unexpected audit mutation {other:?}")
    };
    match row.get("ChangeSet") {
        Some(MutationValue::Json(json)) => json.clone(),
        other => panic!("unexpected change set {other:?}")
    }
}

#[tokio::test]
async fn create_writes_row_and_audit_record() {
    let store = Store::default();
    let mut create = patch(PatchType::Create);
    create.set("name", "a").set("balance", 10_i64);

    create.apply(&store, Some(&jane())).await.unwrap();

    let committed = store.committed();
    assert_eq!(committed.len(), 2);
    let Mutation::Insert {
        table,
        row
    } = &committed[0]
    else {
        panic!("expected insert, got {:?}", committed[0]);
    };
    assert_eq!(table, "Accounts");
    assert_eq!(row.columns().collect::<Vec<_>>(), ["Name", "Balance", "Id"]);

    assert_eq!(committed[1].table(), "DataChangeEvents");
    assert_eq!(
        change_set(&committed[1]),
        json!({"balance": {"New": 10}, "name": {"New": "a"}})
    );
}

#[tokio::test]
async fn update_records_old_and_new_values() {
    let store = Store::with_rows([stored()]);
    let mut update = patch(PatchType::Update);
    update.set("name", "b").set("balance", 10_i64);

    update.apply(&store, Some(&process_event("rename"))).await.unwrap();

    let committed = store.committed();
    assert!(matches!(committed[0], Mutation::Update { .. }));
    assert_eq!(
        change_set(&committed[1]),
        json!({"name": {"Old": "a", "New": "b"}})
    );
}

#[tokio::test]
async fn update_without_changes_rolls_back() {
    let store = Store::with_rows([stored()]);
    let mut update = patch(PatchType::Update);
    update.set("name", "a");

    let err = update.apply(&store, Some(&jane())).await.unwrap_err();

    assert!(matches!(err, Error::NoChanges { .. }));
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert!(store.committed().is_empty());
    assert_eq!(store.rollbacks(), 1);
}

#[tokio::test]
async fn delete_of_missing_row_buffers_nothing() {
    let store = Store::default();
    let err = patch(PatchType::Delete)
        .apply(&store, Some(&jane()))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Accounts (id: 1) not found");
    assert!(store.committed().is_empty());
}

#[tokio::test]
async fn delete_records_removed_values() {
    let store = Store::with_rows([stored()]);
    patch(PatchType::Delete)
        .apply(&store, Some(&jane()))
        .await
        .unwrap();

    let committed = store.committed();
    assert!(matches!(committed[0], Mutation::Delete { .. }));
    assert_eq!(
        change_set(&committed[1]),
        json!({"id": {"Old": 1}, "name": {"Old": "a"}, "balance": {"Old": 10}})
    );
}

#[tokio::test]
async fn insert_or_update_falls_back_to_create_diff() {
    let store = Store::default();
    let mut upsert = patch(PatchType::Update);
    upsert.set("balance", 3_i64);

    upsert.insert_or_update(&store, Some(&jane())).await.unwrap();

    let committed = store.committed();
    assert!(matches!(committed[0], Mutation::InsertOrUpdate { .. }));
    assert!(matches!(committed[1], Mutation::InsertOrUpdate { .. }));
    assert_eq!(change_set(&committed[1]), json!({"balance": {"New": 3}}));
}

#[tokio::test]
async fn tracked_patch_requires_event_source() {
    let store = Store::with_rows([stored()]);
    let mut update = patch(PatchType::Update);
    update.set("name", "b");

    let err = update.apply(&store, None).await.unwrap_err();
    assert!(matches!(err, Error::MissingEventSource(_)));
    assert_eq!(store.rollbacks(), 1);
}

#[tokio::test]
async fn commit_failure_is_a_database_error() {
    let store = Store::read_only();
    let mut create = patch(PatchType::Create);
    create.set("name", "a");

    let err = create.apply(&store, Some(&jane())).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Database);
    assert!(err.to_string().contains("failed to commit transaction: store is read-only"));
}

#[tokio::test]
async fn query_set_reads_by_key() {
    let store = Store::with_rows([stored()]);
    let mut txn = store.begin().await.unwrap();

    let mut query = QuerySet::<Account>::new();
    query.add_field("name");
    query.set_key("id", 1_i64);
    assert_eq!(query.read(&mut txn).await.unwrap(), stored());

    query.set_key("id", 2_i64);
    assert!(query.read(&mut txn).await.unwrap_err().is_not_found());
    assert_eq!(query.list(&mut txn).await.unwrap().len(), 1);
}
