//! One-way reconciliation of local reminders with remote tasks.
//!
//! Each pass resolves the target list, snapshots its active tasks, then walks
//! the local reminders one at a time:
//!
//! | Local link      | Remote                  | Action                         |
//! |-----------------|-------------------------|--------------------------------|
//! | none            | -                       | create, write link             |
//! | id, same sum    | active                  | skip                           |
//! | id, new sum     | active                  | update, rewrite checksum       |
//! | id              | 404                     | recreate                       |
//! | id              | completed               | mark done locally              |
//! | id              | anything else           | recreate                       |
//!
//! A failing item is logged and counted; it never stops the pass.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::TaskService;
use crate::checksum::{checksum, item_checksum};
use crate::error::{Error, Result};
use crate::metadata::{self, MetadataParse};
use crate::model::{ItemLocation, LinkMetadata, ReminderItem, RemoteTask, TaskPayload, TaskStatus};

/// Source of reminders and the documents that hold them.
pub trait ReminderStore: Send + Sync {
    /// All reminders currently present in the collection.
    fn reminders(&self) -> Result<Vec<ReminderItem>>;

    fn read_document(&self, document: &str) -> Result<String>;

    fn write_document(&self, document: &str, contents: &str) -> Result<()>;

    /// Returns `line` with its reminder marked as done.
    fn mark_completed(&self, line: &str) -> String;
}

/// Receives short user-facing status messages. Delivery is fire-and-forget.
pub trait StatusSink: Send + Sync {
    fn notify(&self, message: &str);
}

/// Sink that only writes to the log.
pub struct LogSink;

impl StatusSink for LogSink {
    fn notify(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// Counts of what a pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub created: usize,
    pub updated: usize,
    pub recreated: usize,
    pub completed_locally: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl SyncOutcome {
    pub fn changed(&self) -> usize {
        self.created + self.updated + self.recreated + self.completed_locally
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for (count, label) in [
            (self.created, "created"),
            (self.updated, "updated"),
            (self.recreated, "recreated"),
            (self.completed_locally, "completed locally"),
            (self.errored, "failed"),
            (self.skipped, "skipped"),
        ] {
            if count > 0 {
                parts.push(format!("{} {}", count, label));
            }
        }
        if self.changed() == 0 && self.errored == 0 {
            match self.skipped {
                0 => "Reminders already up to date".to_string(),
                n => format!("Reminders already up to date ({} skipped)", n),
            }
        } else {
            format!("Reminders synced: {}", parts.join(", "))
        }
    }

    fn record(&mut self, action: ItemAction) {
        match action {
            ItemAction::Created => self.created += 1,
            ItemAction::Updated => self.updated += 1,
            ItemAction::Recreated => self.recreated += 1,
            ItemAction::CompletedLocally => self.completed_locally += 1,
            ItemAction::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemAction {
    Created,
    Updated,
    Recreated,
    CompletedLocally,
    Skipped,
}

pub struct ReconcileEngine<S, R> {
    service: S,
    store: R,
    list_name: String,
    sink: Arc<dyn StatusSink>,
}

impl<S: TaskService, R: ReminderStore> ReconcileEngine<S, R> {
    pub fn new(service: S, store: R, list_name: impl Into<String>) -> Self {
        Self {
            service,
            store,
            list_name: list_name.into(),
            sink: Arc::new(LogSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn store(&self) -> &R {
        &self.store
    }

    /// Runs one full pass.
    ///
    /// Fails only when the pass cannot start (list lookup, snapshot, reading
    /// the reminder collection); item failures are counted in the outcome.
    pub async fn run_pass(&self) -> Result<SyncOutcome> {
        match self.prepare().await {
            Ok((list_id, snapshot, items)) => {
                let outcome = self.reconcile_items(&list_id, &snapshot, &items).await;
                self.sink.notify(&outcome.summary());
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("Sync pass aborted: {}", e);
                self.sink.notify(&format!("Reminder sync failed: {}", e));
                Err(e)
            }
        }
    }

    async fn prepare(&self) -> Result<(String, HashMap<String, RemoteTask>, Vec<ReminderItem>)> {
        let list_id = self.service.find_or_create_list(&self.list_name).await?;
        let snapshot = self
            .service
            .list_active_tasks(&list_id)
            .await?
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect();
        let items = self.store.reminders()?;
        Ok((list_id, snapshot, items))
    }

    async fn reconcile_items(
        &self,
        list_id: &str,
        snapshot: &HashMap<String, RemoteTask>,
        items: &[ReminderItem],
    ) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();
        for item in items {
            match self.reconcile_item(list_id, snapshot, item).await {
                Ok(action) => {
                    tracing::debug!("{} '{}': {:?}", item.location, item.title, action);
                    outcome.record(action);
                }
                Err(e) => {
                    tracing::warn!("Failed to sync {} '{}': {}", item.location, item.title, e);
                    outcome.errored += 1;
                }
            }
        }
        tracing::info!(
            created = outcome.created,
            updated = outcome.updated,
            recreated = outcome.recreated,
            completed_locally = outcome.completed_locally,
            skipped = outcome.skipped,
            errored = outcome.errored,
            "Sync pass finished"
        );
        outcome
    }

    async fn reconcile_item(
        &self,
        list_id: &str,
        snapshot: &HashMap<String, RemoteTask>,
        item: &ReminderItem,
    ) -> Result<ItemAction> {
        let line = self.line_at(&item.location)?;
        let link = match metadata::parse(&line) {
            MetadataParse::Present(link) => Some(link),
            MetadataParse::Absent => None,
            MetadataParse::Malformed(reason) => {
                tracing::warn!(
                    "Ignoring malformed link at {}: {}",
                    item.location,
                    reason
                );
                None
            }
        };
        let current = item_checksum(item);

        let Some(link) = link else {
            if item.completed {
                return Ok(ItemAction::Skipped);
            }
            self.create(list_id, item, &current).await?;
            return Ok(ItemAction::Created);
        };

        if snapshot.contains_key(&link.id) {
            if link.checksum == current {
                return Ok(ItemAction::Skipped);
            }
            self.service
                .update_task(list_id, &link.id, &TaskPayload::from_item(item))
                .await?;
            self.write_link(&item.location, &link.id, &current)?;
            return Ok(ItemAction::Updated);
        }

        // Completion already mirrored on both sides
        if item.completed && link.checksum == current {
            return Ok(ItemAction::Skipped);
        }

        match self.service.get_task(list_id, &link.id).await {
            Err(Error::NotFound(_)) => {
                tracing::info!("Remote task {} is gone; recreating", link.id);
                self.recreate(list_id, item, &current).await?;
                Ok(ItemAction::Recreated)
            }
            Ok(task) if task.status == TaskStatus::Completed && !task.deleted => {
                self.complete_locally(item)?;
                Ok(ItemAction::CompletedLocally)
            }
            Ok(task) => {
                tracing::warn!(
                    "Remote task {} is in an unexpected state (status {:?}, deleted {}, hidden {}); recreating",
                    task.id,
                    task.status,
                    task.deleted,
                    task.hidden
                );
                self.recreate(list_id, item, &current).await?;
                Ok(ItemAction::Recreated)
            }
            Err(e) => Err(e),
        }
    }

    async fn create(&self, list_id: &str, item: &ReminderItem, sum: &str) -> Result<()> {
        let task = self
            .service
            .create_task(list_id, &TaskPayload::from_item(item))
            .await?;
        self.write_link(&item.location, &task.id, sum)
    }

    async fn recreate(&self, list_id: &str, item: &ReminderItem, sum: &str) -> Result<()> {
        if let Err(e) = self.edit_line(&item.location, |line| metadata::encode(line, None)) {
            tracing::warn!("Could not strip stale link at {}: {}", item.location, e);
        }
        self.create(list_id, item, sum).await
    }

    fn complete_locally(&self, item: &ReminderItem) -> Result<()> {
        let sum = checksum(&item.title, item.due.as_ref(), true);
        self.edit_line(&item.location, |line| {
            let done = self.store.mark_completed(line);
            match metadata::decode(line) {
                Some(link) => metadata::encode(
                    &done,
                    Some(&LinkMetadata {
                        id: link.id,
                        checksum: sum,
                    }),
                ),
                None => done,
            }
        })?;
        tracing::info!("Marked {} '{}' done (completed remotely)", item.location, item.title);
        Ok(())
    }

    fn write_link(&self, location: &ItemLocation, id: &str, sum: &str) -> Result<()> {
        let link = LinkMetadata {
            id: id.to_string(),
            checksum: sum.to_string(),
        };
        self.edit_line(location, |line| metadata::encode(line, Some(&link)))
    }

    fn line_at(&self, location: &ItemLocation) -> Result<String> {
        let contents = self.store.read_document(&location.document)?;
        contents
            .split('\n')
            .nth(location.line)
            .map(|line| line.trim_end_matches('\r').to_string())
            .ok_or_else(|| line_missing(location))
    }

    /// Rewrites one line in place, keeping the document's line endings.
    fn edit_line<F>(&self, location: &ItemLocation, edit: F) -> Result<()>
    where
        F: FnOnce(&str) -> String,
    {
        let contents = self.store.read_document(&location.document)?;
        let mut lines: Vec<String> = contents.split('\n').map(str::to_string).collect();
        let target = lines
            .get_mut(location.line)
            .ok_or_else(|| line_missing(location))?;

        let (body, ending) = match target.strip_suffix('\r') {
            Some(body) => (body, "\r"),
            None => (target.as_str(), ""),
        };
        let edited = format!("{}{}", edit(body), ending);
        if edited == *target {
            return Ok(());
        }
        *target = edited;
        self.store
            .write_document(&location.document, &lines.join("\n"))
    }
}

fn line_missing(location: &ItemLocation) -> Error {
    Error::io(
        &location.document,
        format!("line {} no longer exists", location.line + 1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist;
    use crate::model::{Due, TaskList};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Remote service kept in memory. Every call is recorded by name.
    #[derive(Default)]
    struct FakeTasks {
        tasks: Mutex<BTreeMap<String, RemoteTask>>,
        calls: Mutex<Vec<String>>,
        next_id: Mutex<usize>,
        fail_titles: Mutex<Vec<String>>,
        fail_setup: bool,
    }

    impl FakeTasks {
        fn calls(&self, name: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.as_str() == name)
                .count()
        }

        fn record(&self, name: &str) {
            self.calls.lock().unwrap().push(name.to_string());
        }

        fn set_remote(&self, task: RemoteTask) {
            self.tasks.lock().unwrap().insert(task.id.clone(), task);
        }

        fn remove_remote(&self, id: &str) {
            self.tasks.lock().unwrap().remove(id);
        }

        fn task(&self, id: &str) -> RemoteTask {
            self.tasks.lock().unwrap()[id].clone()
        }

        fn apply(id: &str, payload: &TaskPayload) -> RemoteTask {
            RemoteTask {
                id: id.to_string(),
                title: payload.title.clone(),
                notes: payload.notes.clone(),
                due: payload.due.clone(),
                status: payload.status,
                deleted: false,
                hidden: false,
            }
        }
    }

    impl TaskService for FakeTasks {
        async fn find_or_create_list(&self, _title: &str) -> Result<String> {
            self.record("find_or_create_list");
            if self.fail_setup {
                return Err(Error::Http("connection refused".to_string()));
            }
            Ok("L1".to_string())
        }

        async fn list_active_tasks(&self, _list_id: &str) -> Result<Vec<RemoteTask>> {
            self.record("list_active_tasks");
            Ok(self
                .tasks
                .lock()
                .unwrap()
                .values()
                .filter(|t| t.is_active())
                .cloned()
                .collect())
        }

        async fn get_task(&self, _list_id: &str, task_id: &str) -> Result<RemoteTask> {
            self.record("get_task");
            self.tasks
                .lock()
                .unwrap()
                .get(task_id)
                .cloned()
                .ok_or_else(|| Error::NotFound("Task not found".to_string()))
        }

        async fn create_task(&self, _list_id: &str, payload: &TaskPayload) -> Result<RemoteTask> {
            self.record("create_task");
            if self.fail_titles.lock().unwrap().contains(&payload.title) {
                return Err(Error::Api {
                    status: 400,
                    reason: "Bad Request".to_string(),
                    message: "Invalid task".to_string(),
                });
            }
            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                format!("T{}", *next)
            };
            let task = Self::apply(&id, payload);
            self.set_remote(task.clone());
            Ok(task)
        }

        async fn update_task(
            &self,
            _list_id: &str,
            task_id: &str,
            payload: &TaskPayload,
        ) -> Result<RemoteTask> {
            self.record("update_task");
            // Merge like PATCH: fields missing from the body stay as they were
            let body = serde_json::to_value(payload).unwrap();
            let mut tasks = self.tasks.lock().unwrap();
            let task = tasks
                .get_mut(task_id)
                .ok_or_else(|| Error::NotFound("Task not found".to_string()))?;
            if let Some(title) = body.get("title").and_then(|v| v.as_str()) {
                task.title = title.to_string();
            }
            if let Some(notes) = body.get("notes") {
                task.notes = notes.as_str().map(str::to_string);
            }
            if let Some(due) = body.get("due") {
                task.due = due.as_str().map(str::to_string);
            }
            if let Some(status) = body.get("status") {
                task.status = serde_json::from_value(status.clone()).unwrap();
            }
            Ok(task.clone())
        }

        async fn task_lists(&self) -> Result<Vec<TaskList>> {
            Ok(vec![TaskList {
                id: "L1".to_string(),
                title: "Reminders".to_string(),
            }])
        }
    }

    /// Documents kept in memory, reminders parsed as Markdown checklists.
    #[derive(Default)]
    struct MemoryStore {
        docs: Mutex<BTreeMap<String, String>>,
        fail_reads: bool,
    }

    impl MemoryStore {
        fn with_doc(name: &str, contents: &str) -> Self {
            let store = Self::default();
            store.set(name, contents);
            store
        }

        fn set(&self, name: &str, contents: &str) {
            self.docs
                .lock()
                .unwrap()
                .insert(name.to_string(), contents.to_string());
        }

        fn get(&self, name: &str) -> String {
            self.docs.lock().unwrap()[name].clone()
        }
    }

    impl ReminderStore for MemoryStore {
        fn reminders(&self) -> Result<Vec<ReminderItem>> {
            if self.fail_reads {
                return Err(Error::io("notes", "permission denied"));
            }
            let docs = self.docs.lock().unwrap();
            let mut items = Vec::new();
            for (name, contents) in docs.iter() {
                for (index, line) in contents.split('\n').enumerate() {
                    if let Some(parsed) = checklist::parse_line(line.trim_end_matches('\r')) {
                        items.push(ReminderItem {
                            title: parsed.title,
                            due: parsed.due,
                            completed: parsed.completed,
                            location: ItemLocation::new(name.clone(), index),
                        });
                    }
                }
            }
            Ok(items)
        }

        fn read_document(&self, document: &str) -> Result<String> {
            self.docs
                .lock()
                .unwrap()
                .get(document)
                .cloned()
                .ok_or_else(|| Error::io(document, "not found"))
        }

        fn write_document(&self, document: &str, contents: &str) -> Result<()> {
            self.set(document, contents);
            Ok(())
        }

        fn mark_completed(&self, line: &str) -> String {
            checklist::set_completed(line, true)
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<String>>);

    impl StatusSink for RecordingSink {
        fn notify(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn engine(service: FakeTasks, store: MemoryStore) -> ReconcileEngine<FakeTasks, MemoryStore> {
        ReconcileEngine::new(service, store, "Reminders")
    }

    fn link_of(engine: &ReconcileEngine<FakeTasks, MemoryStore>, doc: &str, line: usize) -> LinkMetadata {
        let contents = engine.store.get(doc);
        let line = contents.split('\n').nth(line).unwrap();
        metadata::decode(line).unwrap()
    }

    #[tokio::test]
    async fn test_buy_milk_create_skip_update() {
        let engine = engine(
            FakeTasks::default(),
            MemoryStore::with_doc("inbox.md", "# Inbox\n- [ ] Buy milk due:2024-01-01\n"),
        );

        let first = engine.run_pass().await.unwrap();
        assert_eq!(first.created, 1);
        let link = link_of(&engine, "inbox.md", 1);
        assert_eq!(link.id, "T1");
        assert_eq!(
            engine.service.task("T1").due.as_deref(),
            Some("2024-01-01T00:00:00.000Z")
        );

        let second = engine.run_pass().await.unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.changed(), 0);
        assert_eq!(engine.service.calls("create_task"), 1);
        assert_eq!(engine.service.calls("update_task"), 0);

        // Change the due date, keeping the link
        let edited = engine
            .store
            .get("inbox.md")
            .replace("due:2024-01-01", "due:2024-01-02");
        engine.store.set("inbox.md", &edited);

        let third = engine.run_pass().await.unwrap();
        assert_eq!(third.updated, 1);
        assert_eq!(engine.service.calls("update_task"), 1);
        assert_eq!(
            engine.service.task("T1").due.as_deref(),
            Some("2024-01-02T00:00:00.000Z")
        );
        let relinked = link_of(&engine, "inbox.md", 1);
        assert_eq!(relinked.id, "T1");
        assert_ne!(relinked.checksum, link.checksum);
    }

    #[tokio::test]
    async fn test_consecutive_passes_are_idempotent() {
        let engine = engine(
            FakeTasks::default(),
            MemoryStore::with_doc("a.md", "- [ ] One\r\n- [ ] Two due:2024-05-01\r\nplain text\r\n"),
        );
        engine.run_pass().await.unwrap();
        let after_first = engine.store.get("a.md");
        assert!(after_first.contains("\r\n"));

        let second = engine.run_pass().await.unwrap();
        assert_eq!(second.skipped, 2);
        assert_eq!(second.changed(), 0);
        assert_eq!(engine.store.get("a.md"), after_first);
        assert_eq!(engine.service.calls("create_task"), 2);
    }

    #[tokio::test]
    async fn test_deleted_remote_task_is_recreated() {
        let engine = engine(FakeTasks::default(), MemoryStore::with_doc("a.md", "- [ ] Call mom"));
        engine.run_pass().await.unwrap();
        engine.service.remove_remote("T1");

        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.recreated, 1);
        assert_eq!(link_of(&engine, "a.md", 0).id, "T2");
        assert_eq!(engine.store.get("a.md").matches("tasklink:").count(), 1);
    }

    #[tokio::test]
    async fn test_failed_recreate_leaves_no_stale_link() {
        let engine = engine(FakeTasks::default(), MemoryStore::with_doc("a.md", "- [ ] Broken"));
        engine.run_pass().await.unwrap();
        assert_eq!(link_of(&engine, "a.md", 0).id, "T1");

        engine.service.remove_remote("T1");
        engine
            .service
            .fail_titles
            .lock()
            .unwrap()
            .push("Broken".to_string());

        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.errored, 1);
        assert_eq!(outcome.recreated, 0);
        assert_eq!(engine.store.get("a.md"), "- [ ] Broken");
    }

    #[tokio::test]
    async fn test_removed_due_date_is_cleared_remotely() {
        let engine = engine(
            FakeTasks::default(),
            MemoryStore::with_doc("a.md", "- [ ] Buy milk due:2024-01-01"),
        );
        engine.run_pass().await.unwrap();
        assert!(engine.service.task("T1").due.is_some());

        let undated = engine.store.get("a.md").replace(" due:2024-01-01", "");
        engine.store.set("a.md", &undated);

        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(engine.service.task("T1").due, None);
        assert_eq!(engine.service.task("T1").title, "Buy milk");

        let again = engine.run_pass().await.unwrap();
        assert_eq!(again.skipped, 1);
        assert_eq!(again.changed(), 0);
    }

    #[tokio::test]
    async fn test_remote_completion_marks_item_done() {
        let engine = engine(FakeTasks::default(), MemoryStore::with_doc("a.md", "- [ ] Pay rent"));
        engine.run_pass().await.unwrap();

        let mut done = engine.service.task("T1");
        done.status = TaskStatus::Completed;
        engine.service.set_remote(done);

        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.completed_locally, 1);
        assert_eq!(engine.service.calls("create_task"), 1);
        assert!(engine.store.get("a.md").starts_with("- [x] Pay rent"));
        assert_eq!(
            link_of(&engine, "a.md", 0).checksum,
            checksum("Pay rent", None, true)
        );

        // Nothing left to do afterwards
        let again = engine.run_pass().await.unwrap();
        assert_eq!(again.changed(), 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(engine.service.calls("get_task"), 1);
    }

    #[tokio::test]
    async fn test_unexpected_remote_state_recreates() {
        let engine = engine(FakeTasks::default(), MemoryStore::with_doc("a.md", "- [ ] Water plants"));
        engine.run_pass().await.unwrap();

        let mut hidden = engine.service.task("T1");
        hidden.deleted = true;
        engine.service.set_remote(hidden);

        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.recreated, 1);
        assert_eq!(link_of(&engine, "a.md", 0).id, "T2");
    }

    #[tokio::test]
    async fn test_local_completion_updates_remote() {
        let engine = engine(FakeTasks::default(), MemoryStore::with_doc("a.md", "- [ ] Book flights"));
        engine.run_pass().await.unwrap();

        let checked = checklist::set_completed(&engine.store.get("a.md"), true);
        engine.store.set("a.md", &checked);

        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(engine.service.task("T1").status, TaskStatus::Completed);

        // Completed remote task drops out of the snapshot but is not re-fetched
        let again = engine.run_pass().await.unwrap();
        assert_eq!(again.skipped, 1);
        assert_eq!(engine.service.calls("get_task"), 0);
    }

    #[tokio::test]
    async fn test_completed_item_without_link_is_skipped() {
        let engine = engine(FakeTasks::default(), MemoryStore::with_doc("a.md", "- [x] Old chore"));
        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(engine.service.calls("create_task"), 0);
    }

    #[tokio::test]
    async fn test_malformed_link_is_treated_as_absent() {
        let engine = engine(
            FakeTasks::default(),
            MemoryStore::with_doc("a.md", "- [ ] Renew passport <!-- tasklink:{oops} -->"),
        );
        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(link_of(&engine, "a.md", 0).id, "T1");
    }

    #[tokio::test]
    async fn test_item_failure_is_counted_and_pass_continues() {
        let service = FakeTasks {
            fail_titles: Mutex::new(vec!["Broken".to_string()]),
            ..Default::default()
        };
        let sink = Arc::new(RecordingSink::default());
        let engine = engine(service, MemoryStore::with_doc("a.md", "- [ ] Broken\n- [ ] Fine"))
            .with_sink(sink.clone());

        let outcome = engine.run_pass().await.unwrap();
        assert_eq!(outcome.errored, 1);
        assert_eq!(outcome.created, 1);
        assert!(metadata::decode(engine.store.get("a.md").split('\n').next().unwrap()).is_none());
        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            ["Reminders synced: 1 created, 1 failed".to_string()]
        );
    }

    #[tokio::test]
    async fn test_setup_failure_aborts_pass() {
        let service = FakeTasks {
            fail_setup: true,
            ..Default::default()
        };
        let sink = Arc::new(RecordingSink::default());
        let engine = engine(service, MemoryStore::with_doc("a.md", "- [ ] Anything"))
            .with_sink(sink.clone());

        let err = engine.run_pass().await.unwrap_err();
        assert_eq!(err, Error::Http("connection refused".to_string()));
        assert_eq!(engine.service.calls("create_task"), 0);
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_collection_aborts_pass() {
        let store = MemoryStore {
            fail_reads: true,
            ..Default::default()
        };
        let engine = engine(FakeTasks::default(), store);
        assert!(matches!(engine.run_pass().await, Err(Error::Io { .. })));
    }

    #[test]
    fn test_summary_lists_nonzero_counts() {
        let outcome = SyncOutcome {
            created: 2,
            completed_locally: 1,
            skipped: 4,
            ..Default::default()
        };
        assert_eq!(
            outcome.summary(),
            "Reminders synced: 2 created, 1 completed locally, 4 skipped"
        );
        assert_eq!(SyncOutcome::default().summary(), "Reminders already up to date");

        let idle = SyncOutcome {
            skipped: 3,
            ..Default::default()
        };
        assert_eq!(idle.summary(), "Reminders already up to date (3 skipped)");
    }

    #[test]
    fn test_due_dates_feed_the_checksum() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let item = ReminderItem {
            title: "Buy milk".to_string(),
            due: Some(Due::Date(date)),
            completed: false,
            location: ItemLocation::new("a.md", 0),
        };
        assert_ne!(item_checksum(&item), checksum("Buy milk", None, false));
    }
}
