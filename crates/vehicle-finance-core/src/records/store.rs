use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::loan::{normalize_email, LoanRecord, LoanRecordInput, LoanRecordUpdate};
use crate::amortization::credit_score::{compute_credit_profile, AggregateCreditProfile};
use crate::error::VehicleFinanceError;
use crate::VehicleFinanceResult;

const LOG_TARGET: &str = "vehicle_finance.store";

/// Change notification published after every successful mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecordEvent {
    Created { record: LoanRecord },
    Updated { record: LoanRecord },
    Deleted { id: String },
}

impl RecordEvent {
    pub fn record_id(&self) -> &str {
        match self {
            RecordEvent::Created { record } | RecordEvent::Updated { record } => &record.id,
            RecordEvent::Deleted { id } => id,
        }
    }
}

/// CRUD plus change notification over loan records keyed by an opaque id.
pub trait RecordStore {
    fn create(&self, input: LoanRecordInput) -> VehicleFinanceResult<LoanRecord>;
    fn update(&self, id: &str, update: LoanRecordUpdate) -> VehicleFinanceResult<LoanRecord>;
    fn delete(&self, id: &str) -> VehicleFinanceResult<LoanRecord>;
    fn get_all(&self) -> VehicleFinanceResult<Vec<LoanRecord>>;
    fn get_by_id(&self, id: &str) -> VehicleFinanceResult<LoanRecord>;
    fn get_by_owner(&self, email: &str) -> VehicleFinanceResult<Vec<LoanRecord>>;
    /// Flip one installment to paid as a single atomic read-modify-write.
    fn mark_installment_paid(&self, id: &str, index: usize) -> VehicleFinanceResult<LoanRecord>;
    /// Events for every record in the collection.
    fn subscribe(&self) -> Receiver<RecordEvent>;
    /// Events for one record id only.
    fn subscribe_record(&self, id: &str) -> Receiver<RecordEvent>;
}

/// Credit profile over every record owned by `email`.
pub fn credit_profile_for_owner<S: RecordStore + ?Sized>(
    store: &S,
    email: &str,
) -> VehicleFinanceResult<AggregateCreditProfile> {
    let records = store.get_by_owner(email)?;
    Ok(compute_credit_profile(&records))
}

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// JSON snapshot file. `None` keeps records in memory only.
    pub path: Option<PathBuf>,
    /// Allow at most one record per owner email.
    pub unique_owner_email: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    records: HashMap<String, LoanRecord>,
}

struct Subscriber {
    record_id: Option<String>,
    sender: Sender<RecordEvent>,
}

/// Record store held in memory behind a single lock, optionally mirrored to
/// a JSON file after every mutation.
///
/// With a file, every mutation holds an exclusive lock on a `<file>.lock`
/// sidecar and reloads the snapshot before applying itself, so separate
/// handles and separate processes sharing one file never overwrite each
/// other's changes. Reads serve the snapshot as of this handle's last load
/// or mutation.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    state: Arc<RwLock<StoreState>>,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    path: Option<PathBuf>,
    unique_owner_email: bool,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        let path = config.path.clone();
        let state = Self::load_state(path.as_deref());

        Self {
            state: Arc::new(RwLock::new(state)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            path,
            unique_owner_email: config.unique_owner_email,
        }
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load_state(path: Option<&Path>) -> StoreState {
        let Some(path) = path else {
            return StoreState::default();
        };

        let raw = match std::fs::read_to_string(path) {
            Ok(value) => value,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return StoreState::default();
            }
            Err(error) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    path = %path.display(),
                    error = %error,
                    "failed to read record store; starting empty",
                );
                return StoreState::default();
            }
        };

        match serde_json::from_str::<StoreState>(&raw) {
            Ok(state) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    path = %path.display(),
                    records = state.records.len(),
                    "loaded record store",
                );
                state
            }
            Err(error) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    path = %path.display(),
                    error = %error,
                    "failed to parse record store; starting empty",
                );
                StoreState::default()
            }
        }
    }

    fn ensure_parent_dir(path: &Path) -> VehicleFinanceResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| {
                VehicleFinanceError::Persistence(format!(
                    "failed to prepare record store directory: {error}"
                ))
            })?;
        }
        Ok(())
    }

    /// Sidecar lock file; the snapshot itself is replaced by rename, so it
    /// cannot carry the lock.
    fn open_file_lock(&self) -> VehicleFinanceResult<Option<fd_lock::RwLock<File>>> {
        let Some(path) = self.path.as_ref() else {
            return Ok(None);
        };
        Self::ensure_parent_dir(path)?;

        let mut lock_path = OsString::from(path.as_os_str());
        lock_path.push(".lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(PathBuf::from(lock_path))
            .map_err(|error| {
                VehicleFinanceError::Persistence(format!("failed to open record store lock: {error}"))
            })?;
        Ok(Some(fd_lock::RwLock::new(file)))
    }

    fn persist_state(&self, snapshot: &StoreState) -> VehicleFinanceResult<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        Self::ensure_parent_dir(path)?;

        let payload = serde_json::to_vec_pretty(snapshot)?;
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        std::fs::write(&temp_path, payload).map_err(|error| {
            VehicleFinanceError::Persistence(format!("failed to write record store: {error}"))
        })?;
        std::fs::rename(&temp_path, path).map_err(|error| {
            VehicleFinanceError::Persistence(format!("failed to finalize record store: {error}"))
        })?;

        Ok(())
    }

    /// Run `operation` under the write lock, persist, then notify subscribers.
    ///
    /// Snapshot writes and events both happen before the lock is released,
    /// so files and subscribers see mutations in the order they were applied.
    /// A failed write rolls the in-memory state back. A poisoned lock is
    /// recovered: operations validate before they touch a record.
    fn mutate<T, F>(&self, operation: F) -> VehicleFinanceResult<T>
    where
        F: FnOnce(&mut StoreState) -> VehicleFinanceResult<(T, Option<RecordEvent>)>,
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let mut file_lock = self.open_file_lock()?;
        let _file_guard = match file_lock.as_mut() {
            Some(lock) => Some(lock.write().map_err(|error| {
                VehicleFinanceError::Persistence(format!("failed to lock record store: {error}"))
            })?),
            None => None,
        };
        if let Some(path) = self.path.as_deref() {
            // another handle or process may have written since our last load
            *state = Self::load_state(Some(path));
        }

        let previous = self.path.as_ref().map(|_| state.clone());
        let (result, event) = operation(&mut state)?;

        if let Some(event) = event {
            if let Err(error) = self.persist_state(&state) {
                if let Some(previous) = previous {
                    *state = previous;
                }
                return Err(error);
            }
            self.publish(event);
        }
        Ok(result)
    }

    fn read<T, F>(&self, operation: F) -> VehicleFinanceResult<T>
    where
        F: FnOnce(&StoreState) -> VehicleFinanceResult<T>,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        operation(&state)
    }

    fn publish(&self, event: RecordEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Dropped receivers are pruned on send failure.
        subscribers.retain(|sub| match &sub.record_id {
            Some(id) if id != event.record_id() => true,
            _ => sub.sender.send(event.clone()).is_ok(),
        });
    }

    fn add_subscriber(&self, record_id: Option<String>) -> Receiver<RecordEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { record_id, sender });
        receiver
    }

    fn ensure_email_free(&self, state: &StoreState, email: &str, except_id: Option<&str>) -> VehicleFinanceResult<()> {
        if !self.unique_owner_email {
            return Ok(());
        }
        let taken = state
            .records
            .values()
            .any(|r| r.email == email && Some(r.id.as_str()) != except_id);
        if taken {
            return Err(VehicleFinanceError::DuplicateEmail(email.to_string()));
        }
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn create(&self, input: LoanRecordInput) -> VehicleFinanceResult<LoanRecord> {
        self.mutate(|state| {
            let id = format!("loan_{}", Uuid::new_v4().simple());
            let record = LoanRecord::new(id.clone(), input, Utc::now())?;
            self.ensure_email_free(state, &record.email, None)?;

            state.records.insert(id.clone(), record.clone());
            tracing::info!(
                target: LOG_TARGET,
                id = %id,
                term_months = record.term_months,
                monthly_installment = %record.monthly_installment,
                "created loan record",
            );
            Ok((record.clone(), Some(RecordEvent::Created { record })))
        })
    }

    fn update(&self, id: &str, update: LoanRecordUpdate) -> VehicleFinanceResult<LoanRecord> {
        self.mutate(|state| {
            if let Some(email) = update.email.as_deref() {
                let email = normalize_email(email)?;
                self.ensure_email_free(state, &email, Some(id))?;
            }

            let record = state
                .records
                .get_mut(id)
                .ok_or_else(|| VehicleFinanceError::NotFound(id.to_string()))?;
            record.apply_update(update, Utc::now())?;

            tracing::debug!(
                target: LOG_TARGET,
                id = %id,
                version = record.version,
                monthly_installment = %record.monthly_installment,
                "updated loan record",
            );
            let snapshot = record.clone();
            Ok((snapshot.clone(), Some(RecordEvent::Updated { record: snapshot })))
        })
    }

    fn delete(&self, id: &str) -> VehicleFinanceResult<LoanRecord> {
        self.mutate(|state| {
            let record = state
                .records
                .remove(id)
                .ok_or_else(|| VehicleFinanceError::NotFound(id.to_string()))?;
            tracing::info!(target: LOG_TARGET, id = %id, "deleted loan record");
            Ok((record, Some(RecordEvent::Deleted { id: id.to_string() })))
        })
    }

    fn get_all(&self) -> VehicleFinanceResult<Vec<LoanRecord>> {
        self.read(|state| {
            let mut records: Vec<LoanRecord> = state.records.values().cloned().collect();
            records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            Ok(records)
        })
    }

    fn get_by_id(&self, id: &str) -> VehicleFinanceResult<LoanRecord> {
        self.read(|state| {
            state
                .records
                .get(id)
                .cloned()
                .ok_or_else(|| VehicleFinanceError::NotFound(id.to_string()))
        })
    }

    fn get_by_owner(&self, email: &str) -> VehicleFinanceResult<Vec<LoanRecord>> {
        let email = normalize_email(email)?;
        Ok(self
            .get_all()?
            .into_iter()
            .filter(|r| r.email == email)
            .collect())
    }

    fn mark_installment_paid(&self, id: &str, index: usize) -> VehicleFinanceResult<LoanRecord> {
        self.mutate(|state| {
            let record = state
                .records
                .get_mut(id)
                .ok_or_else(|| VehicleFinanceError::NotFound(id.to_string()))?;
            let changed = record.mark_installment_paid(index, Utc::now())?;
            let snapshot = record.clone();

            if !changed {
                tracing::debug!(
                    target: LOG_TARGET,
                    id = %id,
                    installment = index + 1,
                    "installment already paid",
                );
                return Ok((snapshot, None));
            }

            tracing::info!(
                target: LOG_TARGET,
                id = %id,
                installment = index + 1,
                version = snapshot.version,
                "marked installment paid",
            );
            Ok((snapshot.clone(), Some(RecordEvent::Updated { record: snapshot })))
        })
    }

    fn subscribe(&self) -> Receiver<RecordEvent> {
        self.add_subscriber(None)
    }

    fn subscribe_record(&self, id: &str) -> Receiver<RecordEvent> {
        self.add_subscriber(Some(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(email: &str) -> LoanRecordInput {
        LoanRecordInput {
            name: "Ravi Menon".into(),
            vehicle_name: "Scooter 125".into(),
            email: email.into(),
            image_url: None,
            principal: dec!(90000),
            annual_interest_rate_percent: dec!(9),
            term_months: 12,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = InMemoryRecordStore::new();
        let created = store.create(input("ravi@example.com")).unwrap();
        assert!(created.id.starts_with("loan_"));
        assert_eq!(store.get_by_id(&created.id).unwrap(), created);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_missing_record() {
        let store = InMemoryRecordStore::new();
        assert!(matches!(store.get_by_id("nope"), Err(VehicleFinanceError::NotFound(_))));
        assert!(store.delete("nope").is_err());
        assert!(store.mark_installment_paid("nope", 0).is_err());
    }

    #[test]
    fn test_unique_email_enforced_when_configured() {
        let store = InMemoryRecordStore::from_config(&StoreConfig {
            path: None,
            unique_owner_email: true,
        });
        store.create(input("ravi@example.com")).unwrap();
        let err = store.create(input("RAVI@example.com")).unwrap_err();
        assert!(matches!(err, VehicleFinanceError::DuplicateEmail(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_multiple_loans_per_owner_by_default() {
        let store = InMemoryRecordStore::new();
        store.create(input("ravi@example.com")).unwrap();
        store.create(input("ravi@example.com")).unwrap();
        store.create(input("other@example.com")).unwrap();
        assert_eq!(store.get_by_owner("Ravi@Example.com").unwrap().len(), 2);
    }

    #[test]
    fn test_mark_paid_already_paid_publishes_nothing() {
        let store = InMemoryRecordStore::new();
        let rec = store.create(input("ravi@example.com")).unwrap();
        let rx = store.subscribe_record(&rec.id);

        store.mark_installment_paid(&rec.id, 3).unwrap();
        let again = store.mark_installment_paid(&rec.id, 3).unwrap();
        assert_eq!(again.version, 2);

        assert!(matches!(rx.try_recv(), Ok(RecordEvent::Updated { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_record_subscription_filters_other_ids() {
        let store = InMemoryRecordStore::new();
        let a = store.create(input("a@example.com")).unwrap();
        let b = store.create(input("b@example.com")).unwrap();
        let rx = store.subscribe_record(&a.id);

        store.mark_installment_paid(&b.id, 0).unwrap();
        store.delete(&a.id).unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event, RecordEvent::Deleted { id: a.id.clone() });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_store_usable_after_panicking_writer() {
        let store = InMemoryRecordStore::new();
        let kept = store.create(input("a@example.com")).unwrap();

        let poisoner = store.clone();
        let joined = std::thread::spawn(move || {
            let _guard = poisoner.state.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(joined.is_err());
        assert!(store.state.is_poisoned());

        let created = store.create(input("b@example.com")).unwrap();
        assert_eq!(store.get_by_id(&kept.id).unwrap(), kept);
        assert_eq!(store.get_by_id(&created.id).unwrap(), created);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_events_arrive_in_version_order() {
        let store = InMemoryRecordStore::new();
        let rec = store.create(input("ravi@example.com")).unwrap();
        let rx = store.subscribe_record(&rec.id);

        let handles: Vec<_> = (0..12)
            .map(|i| {
                let store = store.clone();
                let id = rec.id.clone();
                std::thread::spawn(move || store.mark_installment_paid(&id, i).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let versions: Vec<u64> = rx
            .try_iter()
            .map(|event| match event {
                RecordEvent::Updated { record } => record.version,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(versions, (2..=13).collect::<Vec<u64>>());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let store = InMemoryRecordStore::new();
        drop(store.subscribe());
        store.create(input("a@example.com")).unwrap();
        assert!(store.subscribers.lock().unwrap().is_empty());
    }
}
