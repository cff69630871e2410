use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::association::AssociationKind;
use crate::clone::error::CloneError;
use crate::clone::store::{AssociationStore, AssociationTx, EventCatalog};
use crate::clone::CloneOperation;
use crate::domain::{AssociationLink, Event, NewAssociationLink, NewEvent, Task};
use crate::types::DbId;

#[derive(Debug, Clone, Default)]
struct Tables {
    links: BTreeMap<AssociationKind, Vec<AssociationLink>>,
    tasks: BTreeMap<DbId, Task>,
}

#[derive(Debug, Default)]
struct State {
    next_id: DbId,
    events: BTreeMap<DbId, Event>,
    tables: Tables,
    failing_inserts: HashSet<AssociationKind>,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn links(&self, kind: AssociationKind, event_id: DbId) -> Vec<AssociationLink> {
        self.tables
            .links
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .filter(|l| l.event_id == event_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn insert_link(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
        target_id: DbId,
        created_by: Option<DbId>,
    ) -> Result<AssociationLink, CloneError> {
        if self.failing_inserts.contains(&kind) {
            return Err(CloneError::Store(format!(
                "insert into {} rejected",
                kind.join_table()
            )));
        }
        let exists = self
            .links(kind, event_id)
            .iter()
            .any(|l| l.target_id == target_id);
        if exists {
            return Err(CloneError::Store(format!(
                "duplicate key in {}: ({event_id}, {target_id})",
                kind.join_table()
            )));
        }

        let now = Utc::now();
        let link = AssociationLink {
            id: self.next_id(),
            event_id,
            target_id,
            created_by,
            created_at: now,
            updated_at: now,
        };
        self.tables.links.entry(kind).or_default().push(link.clone());
        Ok(link)
    }
}

/// Store backed by a mutex-guarded map.
///
/// Transactions take the mutex for their whole lifetime, so they run one
/// at a time and see a consistent state. Uncommitted writes are undone
/// from a snapshot on rollback or drop.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an idle event.
    pub async fn insert_event(&self, company_id: DbId, name: &str) -> Event {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let event = Event {
            id: state.next_id(),
            company_id,
            name: name.to_string(),
            cloning_in_progress: false,
            importing_in_progress: false,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(event.id, event.clone());
        event
    }

    /// Remove an event with its links and tasks.
    pub async fn delete_event(&self, event_id: DbId) {
        let mut state = self.state.lock().await;
        state.events.remove(&event_id);
        for rows in state.tables.links.values_mut() {
            rows.retain(|l| l.event_id != event_id);
        }
        state.tables.tasks.retain(|_, t| t.event_id != event_id);
    }

    /// Commit a join row directly, outside any transaction.
    ///
    /// # Panics
    ///
    /// If the pair already exists or inserts for `kind` are set to fail.
    pub async fn link(&self, kind: AssociationKind, event_id: DbId, target_id: DbId) -> AssociationLink {
        self.state
            .lock()
            .await
            .insert_link(kind, event_id, target_id, None)
            .expect("seed link must be insertable")
    }

    /// Committed join rows of `kind` for the event, ordered by id.
    pub async fn links(&self, kind: AssociationKind, event_id: DbId) -> Vec<AssociationLink> {
        self.state.lock().await.links(kind, event_id)
    }

    pub async fn insert_task(
        &self,
        event_id: DbId,
        name: &str,
        department_id: Option<DbId>,
        incident_division_id: Option<DbId>,
    ) -> Task {
        let mut state = self.state.lock().await;
        let task = Task {
            id: state.next_id(),
            event_id,
            name: name.to_string(),
            department_id,
            incident_division_id,
        };
        state.tables.tasks.insert(task.id, task.clone());
        task
    }

    pub async fn task(&self, id: DbId) -> Option<Task> {
        self.state.lock().await.tables.tasks.get(&id).cloned()
    }

    /// Make every subsequent insert of `kind` fail with a store error.
    pub async fn fail_inserts_for(&self, kind: AssociationKind) {
        self.state.lock().await.failing_inserts.insert(kind);
    }
}

#[async_trait]
impl EventCatalog for MemoryStore {
    async fn find_event(&self, id: DbId) -> Result<Option<Event>, CloneError> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn list_event_names(
        &self,
        company_id: DbId,
        base_name: &str,
    ) -> Result<Vec<String>, CloneError> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .values()
            .filter(|e| e.company_id == company_id && e.name.contains(base_name))
            .map(|e| e.name.clone())
            .collect())
    }

    async fn create_event(&self, input: &NewEvent) -> Result<Event, CloneError> {
        Ok(self.insert_event(input.company_id, &input.name).await)
    }

    async fn remove_event(&self, id: DbId) -> Result<(), CloneError> {
        self.delete_event(id).await;
        Ok(())
    }

    async fn try_acquire_guard(
        &self,
        event_id: DbId,
        operation: CloneOperation,
    ) -> Result<bool, CloneError> {
        let mut state = self.state.lock().await;
        let event = state
            .events
            .get_mut(&event_id)
            .ok_or(CloneError::NotFound { entity: "Event", id: event_id })?;
        if event.is_busy() {
            return Ok(false);
        }
        match operation {
            CloneOperation::Clone => event.cloning_in_progress = true,
            CloneOperation::Import => event.importing_in_progress = true,
        }
        event.updated_at = Utc::now();
        Ok(true)
    }

    async fn release_guard(
        &self,
        event_id: DbId,
        operation: CloneOperation,
    ) -> Result<(), CloneError> {
        let mut state = self.state.lock().await;
        if let Some(event) = state.events.get_mut(&event_id) {
            match operation {
                CloneOperation::Clone => event.cloning_in_progress = false,
                CloneOperation::Import => event.importing_in_progress = false,
            }
            event.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn release_stale_guards(&self, held_event_ids: &[DbId]) -> Result<u64, CloneError> {
        let mut state = self.state.lock().await;
        let mut released = 0;
        for event in state.events.values_mut() {
            if event.is_busy() && !held_event_ids.contains(&event.id) {
                event.cloning_in_progress = false;
                event.importing_in_progress = false;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn health_check(&self) -> Result<(), CloneError> {
        Ok(())
    }
}

#[async_trait]
impl AssociationStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, CloneError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.tables.clone();
        Ok(MemoryTx {
            state: guard,
            snapshot: Some(snapshot),
        })
    }
}

/// An open [`MemoryStore`] transaction.
pub struct MemoryTx {
    state: OwnedMutexGuard<State>,
    /// Tables as they were at `begin`; `None` once committed.
    snapshot: Option<Tables>,
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.state.tables = snapshot;
        }
    }
}

#[async_trait]
impl AssociationTx for MemoryTx {
    async fn list_links(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
    ) -> Result<Vec<AssociationLink>, CloneError> {
        Ok(self.state.links(kind, event_id))
    }

    async fn insert_link(
        &mut self,
        kind: AssociationKind,
        link: &NewAssociationLink,
    ) -> Result<AssociationLink, CloneError> {
        self.state
            .insert_link(kind, link.event_id, link.target_id, link.created_by)
    }

    async fn delete_links(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
    ) -> Result<Vec<DbId>, CloneError> {
        let rows = self.state.tables.links.entry(kind).or_default();
        let removed = rows
            .iter()
            .filter(|l| l.event_id == event_id)
            .map(|l| l.target_id)
            .collect();
        rows.retain(|l| l.event_id != event_id);
        Ok(removed)
    }

    async fn detach_tasks(
        &mut self,
        kind: AssociationKind,
        event_id: DbId,
        target_ids: &[DbId],
    ) -> Result<u64, CloneError> {
        let mut detached = 0;
        for task in self.state.tables.tasks.values_mut() {
            if task.event_id != event_id {
                continue;
            }
            let column = match kind {
                AssociationKind::Department => &mut task.department_id,
                AssociationKind::IncidentDivision => &mut task.incident_division_id,
                AssociationKind::IncidentType => continue,
            };
            if column.is_some_and(|id| target_ids.contains(&id)) {
                *column = None;
                detached += 1;
            }
        }
        Ok(detached)
    }

    async fn commit(mut self) -> Result<(), CloneError> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self) -> Result<(), CloneError> {
        // Drop restores the snapshot.
        Ok(())
    }
}
