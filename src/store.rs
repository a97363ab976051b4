use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock};

use crate::query::{QuerySource, QuerySpec, compare_display};
use crate::record::Record;

pub trait Store<T>: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn add(&self, record: &T) -> Result<(), Self::Error>;

    fn commit(&self) -> Result<(), Self::Error>;

    fn rollback(&self);

    fn refresh(&self, record: &T) -> Result<T, Self::Error>;

    fn delete(&self, record: &T) -> Result<(), Self::Error>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MemoryStoreError {
    Rejected,
    Unknown,
}

impl Display for MemoryStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryStoreError::Rejected => f.write_str("commit rejected"),
            MemoryStoreError::Unknown => f.write_str("record is not tracked by the store"),
        }
    }
}

impl std::error::Error for MemoryStoreError {}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StoreCounts {
    pub adds: u32,
    pub commits: u32,
    pub rollbacks: u32,
}

enum Staged<T> {
    Insert(T),
    Remove(u64),
}

struct MemoryState<T> {
    committed: BTreeMap<u64, T>,
    staged: Vec<Staged<T>>,
    next_id: u64,
    last_inserted: Option<u64>,
    rejections: u32,
    counts: StoreCounts,
}

pub struct MemoryStore<T> {
    get_id: fn(&T) -> Option<u64>,
    set_id: fn(&mut T, u64),
    state: Arc<RwLock<MemoryState<T>>>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            get_id: self.get_id,
            set_id: self.set_id,
            state: self.state.clone(),
        }
    }
}

impl<T> MemoryStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(get_id: fn(&T) -> Option<u64>, set_id: fn(&mut T, u64)) -> Self {
        Self {
            get_id,
            set_id,
            state: Arc::new(RwLock::new(MemoryState {
                committed: BTreeMap::new(),
                staged: Vec::new(),
                next_id: 1,
                last_inserted: None,
                rejections: 0,
                counts: StoreCounts::default(),
            })),
        }
    }

    pub fn seed(&self, record: T) -> u64 {
        let mut state = self.write();
        let id = (self.get_id)(&record).unwrap_or(state.next_id);
        state.next_id = state.next_id.max(id + 1);
        let mut record = record;
        (self.set_id)(&mut record, id);
        state.committed.insert(id, record);
        id
    }

    pub fn reject_next_commit(&self) {
        self.write().rejections += 1;
    }

    pub fn counts(&self) -> StoreCounts {
        self.read().counts
    }

    pub fn committed(&self) -> Vec<T> {
        self.read().committed.values().cloned().collect()
    }

    pub fn committed_by_id(&self, id: u64) -> Option<T> {
        self.read().committed.get(&id).cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryState<T>> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState<T>> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Store<T> for MemoryStore<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Error = MemoryStoreError;

    fn add(&self, record: &T) -> Result<(), Self::Error> {
        let mut state = self.write();
        state.counts.adds += 1;
        let already_staged = state
            .staged
            .iter()
            .any(|staged| matches!(staged, Staged::Insert(tracked) if tracked == record));
        if !already_staged {
            state.staged.push(Staged::Insert(record.clone()));
        }
        Ok(())
    }

    fn commit(&self) -> Result<(), Self::Error> {
        let mut state = self.write();
        state.counts.commits += 1;
        if state.rejections > 0 {
            state.rejections -= 1;
            return Err(MemoryStoreError::Rejected);
        }
        for staged in std::mem::take(&mut state.staged) {
            match staged {
                Staged::Insert(mut record) => {
                    let id = (self.get_id)(&record).unwrap_or_else(|| {
                        let id = state.next_id;
                        state.next_id += 1;
                        id
                    });
                    (self.set_id)(&mut record, id);
                    state.committed.insert(id, record);
                    state.last_inserted = Some(id);
                }
                Staged::Remove(id) => {
                    state.committed.remove(&id);
                }
            }
        }
        Ok(())
    }

    fn rollback(&self) {
        let mut state = self.write();
        state.counts.rollbacks += 1;
        state.staged.clear();
    }

    fn refresh(&self, record: &T) -> Result<T, Self::Error> {
        let state = self.read();
        let id = (self.get_id)(record).or(state.last_inserted);
        id.and_then(|id| state.committed.get(&id).cloned())
            .ok_or(MemoryStoreError::Unknown)
    }

    fn delete(&self, record: &T) -> Result<(), Self::Error> {
        let id = (self.get_id)(record).ok_or(MemoryStoreError::Unknown)?;
        self.write().staged.push(Staged::Remove(id));
        Ok(())
    }
}

impl<T> QuerySource<T> for MemoryStore<T>
where
    T: Record + PartialEq,
{
    type Error = MemoryStoreError;

    fn search(&self, spec: &QuerySpec) -> Result<Vec<T>, Self::Error> {
        let state = self.read();
        let mut rows: Vec<T> = state
            .committed
            .values()
            .filter(|record| {
                spec.filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(*record))
            })
            .cloned()
            .collect();
        if let Some((attr, order)) = spec.sort {
            rows.sort_by(|left, right| {
                let ordering = compare_display(
                    left.attr_display(attr).unwrap_or_default(),
                    right.attr_display(attr).unwrap_or_default(),
                );
                order.apply(ordering)
            });
        }
        if let Some(limit) = spec.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row {
        id: Option<u64>,
        label: String,
    }

    fn store() -> MemoryStore<Row> {
        MemoryStore::new(|row| row.id, |row, id| row.id = Some(id))
    }

    fn row(label: &str) -> Row {
        Row {
            id: None,
            label: label.to_owned(),
        }
    }

    #[test]
    fn repeated_add_stages_a_single_insert() {
        let store = store();
        let record = row("a");
        store.add(&record).expect("add");
        store.add(&record).expect("repeated add");
        store.commit().expect("commit");
        assert_eq!(store.committed().len(), 1);
        assert_eq!(store.counts().adds, 2);
    }

    #[test]
    fn rollback_discards_staged_work() {
        let store = store();
        store.add(&row("a")).expect("add");
        store.rollback();
        store.commit().expect("commit");
        assert!(store.committed().is_empty());
        assert_eq!(store.counts().rollbacks, 1);
    }

    #[test]
    fn rejected_commit_keeps_staged_work_until_rollback() {
        let store = store();
        store.add(&row("a")).expect("add");
        store.reject_next_commit();
        assert_eq!(store.commit(), Err(MemoryStoreError::Rejected));
        store.commit().expect("second commit passes");
        assert_eq!(store.committed().len(), 1);
    }

    #[test]
    fn refresh_resolves_identity_less_record_to_last_insert() {
        let store = store();
        let record = row("fresh");
        store.add(&record).expect("add");
        store.commit().expect("commit");
        let fetched = store.refresh(&record).expect("refresh");
        assert_eq!(fetched.id, Some(1));
        assert_eq!(fetched.label, "fresh");
    }

    #[test]
    fn refresh_of_untracked_record_fails() {
        let store = store();
        assert_eq!(store.refresh(&row("ghost")), Err(MemoryStoreError::Unknown));
    }

    #[test]
    fn delete_then_commit_removes_the_record() {
        let store = store();
        let id = store.seed(row("doomed"));
        let record = store.committed_by_id(id).expect("seeded");
        store.delete(&record).expect("delete");
        store.commit().expect("commit");
        assert!(store.committed_by_id(id).is_none());
    }
}
