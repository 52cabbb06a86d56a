#![allow(dead_code)]

use std::sync::Mutex;

use serde_json::Value as JsonValue;
use sqlbench_client::{
    BoxFuture, HistoryAppend, HistoryRecord, MemoryRecordStore, MemorySettings, PersistedSettings,
    QueryError, QueryPayload, QueryService, RecordStore, ShortcutRecord, StoreError, StoreResult,
    Workbench,
};

type Reply = Result<QueryPayload, QueryError>;

/// A query service answering from a script of prefix rules.
///
/// The first rule whose prefix starts the statement answers it; statements
/// no rule matches get an empty row set. Every statement is logged.
#[derive(Default)]
pub struct ScriptedService {
    rules: Mutex<Vec<(String, Reply)>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(self, prefix: &str, rows: JsonValue) -> Self {
        let payload = QueryPayload::from_json(rows).expect("scripted rows are objects");
        self.reply(prefix, Ok(payload))
    }

    pub fn reject(self, prefix: &str, message: &str) -> Self {
        self.reply(prefix, Err(QueryError::Rejected(message.into())))
    }

    pub fn unreachable(self, prefix: &str) -> Self {
        self.reply(prefix, Err(QueryError::Transport("connection refused".into())))
    }

    pub fn reply(self, prefix: &str, reply: Reply) -> Self {
        self.rules.lock().unwrap().push((prefix.into(), reply));
        self
    }

    /// Replaces the rules, keeping the log.
    pub fn rescript(&self, prefix: &str, reply: Reply) {
        let mut rules = self.rules.lock().unwrap();
        rules.retain(|(p, _)| p != prefix);
        rules.insert(0, (prefix.into(), reply));
    }

    pub fn executed(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.executed()
            .iter()
            .filter(|sql| sql.starts_with(prefix))
            .count()
    }
}

impl QueryService for ScriptedService {
    fn execute<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, Reply> {
        Box::pin(async move {
            self.log.lock().unwrap().push(sql.to_string());
            self.rules
                .lock()
                .unwrap()
                .iter()
                .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
                .map_or_else(|| Ok(QueryPayload::Rows(Default::default())), |(_, r)| r.clone())
        })
    }
}

/// A record store whose bulk reorder always fails.
#[derive(Default)]
pub struct BrokenReorderStore {
    inner: MemoryRecordStore,
    pub attempts: Mutex<Vec<Vec<i64>>>,
}

impl RecordStore for BrokenReorderStore {
    fn list_history(&self) -> BoxFuture<'_, StoreResult<Vec<HistoryRecord>>> {
        self.inner.list_history()
    }

    fn add_history<'a>(&'a self, sql: &'a str) -> BoxFuture<'a, StoreResult<HistoryAppend>> {
        self.inner.add_history(sql)
    }

    fn delete_history(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        self.inner.delete_history(id)
    }

    fn list_shortcuts(&self) -> BoxFuture<'_, StoreResult<Vec<ShortcutRecord>>> {
        self.inner.list_shortcuts()
    }

    fn create_shortcut<'a>(
        &'a self,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<ShortcutRecord>> {
        self.inner.create_shortcut(name, sql)
    }

    fn update_shortcut<'a>(
        &'a self,
        id: i64,
        name: &'a str,
        sql: &'a str,
    ) -> BoxFuture<'a, StoreResult<()>> {
        self.inner.update_shortcut(id, name, sql)
    }

    fn delete_shortcut(&self, id: i64) -> BoxFuture<'_, StoreResult<()>> {
        self.inner.delete_shortcut(id)
    }

    fn reorder_shortcuts<'a>(&'a self, ids: &'a [i64]) -> BoxFuture<'a, StoreResult<()>> {
        self.attempts.lock().unwrap().push(ids.to_vec());
        Box::pin(async { Err(StoreError::Invalid("storage offline".into())) })
    }
}

pub fn settings() -> PersistedSettings {
    PersistedSettings::open(MemorySettings::default()).unwrap()
}

pub fn bench(service: ScriptedService) -> Workbench<ScriptedService, MemoryRecordStore> {
    Workbench::new(service, MemoryRecordStore::new(), settings())
}

/// A service that knows an editable `orders` table.
pub fn orders_service() -> ScriptedService {
    ScriptedService::new().rows(
        "SELECT * FROM orders",
        serde_json::json!([
            {"id": 1, "qty": 5, "note": null, "created_at": "2024-01-01 10:00:00"},
            {"id": 2, "qty": 9, "note": "rush", "created_at": "2024-01-02 10:00:00"}
        ]),
    )
}

pub fn yes(_: &str) -> bool {
    true
}

pub fn no(_: &str) -> bool {
    false
}
