use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use crate::binder::{FieldBinding, ValidationState};
use crate::convert::ConversionError;
use crate::record::{AttrKey, Record};
use crate::registry::{BinderRegistry, UiRoot, validate_binders};
use crate::store::Store;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    Add,
    Edit,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Add => f.write_str("add"),
            Mode::Edit => f.write_str("edit"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormStatus {
    Clean,
    PendingChanges,
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormEvent {
    ValidationFailed(Vec<AttrKey>),
    CommitFailed(String),
    Deleted,
    StatusChanged(FormStatus),
}

pub type EventObserver = Arc<dyn Fn(&FormEvent) + Send + Sync>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    BindersNotFound,
    ValidationFailed(Vec<AttrKey>),
    CommitFailed(String),
    RefreshFailed(String),
    InvalidOperation { action: &'static str, mode: Mode },
    Conversion { attr: AttrKey, error: ConversionError },
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::BindersNotFound => {
                f.write_str("no binder could be resolved, the form is not backed by any attribute")
            }
            FormError::ValidationFailed(attrs) => {
                write!(f, "some fields are not valid:")?;
                for attr in attrs {
                    write!(f, " {attr}")?;
                }
                Ok(())
            }
            FormError::CommitFailed(error) => {
                write!(f, "store rejected the transaction: {error}")
            }
            FormError::RefreshFailed(error) => {
                write!(f, "store could not refresh the record: {error}")
            }
            FormError::InvalidOperation { action, mode } => {
                write!(f, "{action} is not available in {mode} mode")
            }
            FormError::Conversion { attr, error } => write!(f, "attribute {attr}: {error}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<V> = Result<V, FormError>;

pub(crate) fn read_lock<'a, V>(
    lock: &'a RwLock<V>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, V>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(crate) fn write_lock<'a, V>(
    lock: &'a RwLock<V>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, V>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}

#[derive(Clone, Copy, Debug)]
pub struct CoordinatorOptions {
    pub autoconnect: bool,
    pub autosave: bool,
    pub disabled_message: &'static str,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            autoconnect: true,
            autosave: false,
            disabled_message: "auto-generated",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ActionState {
    pub save: bool,
    pub refresh: bool,
    pub delete: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct BinderMeta {
    state: ValidationState,
    enabled: bool,
}

struct CoordState<T> {
    model: T,
    mode: Mode,
    status: FormStatus,
    validate_attempted: bool,
    meta: BTreeMap<AttrKey, BinderMeta>,
}

pub struct FormCoordinator<T, S>
where
    T: Record,
    S: Store<T>,
{
    options: CoordinatorOptions,
    state: Arc<RwLock<CoordState<T>>>,
    binders: Arc<BTreeMap<AttrKey, Box<dyn FieldBinding<T>>>>,
    store: Arc<S>,
    observers: Arc<RwLock<Vec<EventObserver>>>,
}

impl<T, S> Clone for FormCoordinator<T, S>
where
    T: Record,
    S: Store<T>,
{
    fn clone(&self) -> Self {
        Self {
            options: self.options,
            state: self.state.clone(),
            binders: self.binders.clone(),
            store: self.store.clone(),
            observers: self.observers.clone(),
        }
    }
}

struct WeakCoordinator<T, S>
where
    T: Record,
    S: Store<T>,
{
    options: CoordinatorOptions,
    state: Weak<RwLock<CoordState<T>>>,
    binders: Weak<BTreeMap<AttrKey, Box<dyn FieldBinding<T>>>>,
    store: Weak<S>,
    observers: Weak<RwLock<Vec<EventObserver>>>,
}

impl<T, S> WeakCoordinator<T, S>
where
    T: Record,
    S: Store<T>,
{
    fn upgrade(&self) -> Option<FormCoordinator<T, S>> {
        Some(FormCoordinator {
            options: self.options,
            state: self.state.upgrade()?,
            binders: self.binders.upgrade()?,
            store: self.store.upgrade()?,
            observers: self.observers.upgrade()?,
        })
    }
}

impl<T, S> FormCoordinator<T, S>
where
    T: Record,
    S: Store<T>,
{
    pub fn new(
        record: T,
        store: S,
        registry: BinderRegistry<T>,
        ui_root: &UiRoot,
        options: CoordinatorOptions,
    ) -> FormResult<Self> {
        let binders = registry.resolve(ui_root);
        if binders.is_empty() {
            return Err(FormError::BindersNotFound);
        }

        let mode = if record.has_identity() {
            Mode::Edit
        } else {
            Mode::Add
        };
        let meta = binders
            .iter()
            .map(|(attr, binding)| {
                let enabled = binding.editable() && T::identity_attr() != Some(*attr);
                (
                    *attr,
                    BinderMeta {
                        state: ValidationState::Unvalidated,
                        enabled,
                    },
                )
            })
            .collect();

        let coordinator = Self {
            options,
            state: Arc::new(RwLock::new(CoordState {
                model: record,
                mode,
                status: FormStatus::Clean,
                validate_attempted: false,
                meta,
            })),
            binders: Arc::new(binders),
            store: Arc::new(store),
            observers: Arc::new(RwLock::new(Vec::new())),
        };
        coordinator.disable_fixed_fields()?;
        coordinator.wire_autoconnect()?;
        coordinator.fill(true)?;
        tracing::debug!(%mode, "form bound");
        Ok(coordinator)
    }

    pub fn create(
        store: S,
        registry: BinderRegistry<T>,
        ui_root: &UiRoot,
        options: CoordinatorOptions,
    ) -> FormResult<Self>
    where
        T: Default,
    {
        Self::new(T::default(), store, registry, ui_root, options)
    }

    pub fn mode(&self) -> FormResult<Mode> {
        Ok(read_lock(&self.state, "reading the form mode")?.mode)
    }

    pub fn status(&self) -> FormResult<FormStatus> {
        Ok(read_lock(&self.state, "reading the form status")?.status)
    }

    pub fn record(&self) -> FormResult<T> {
        Ok(read_lock(&self.state, "reading the bound record")?
            .model
            .clone())
    }

    pub fn validation_state(&self, attr: AttrKey) -> FormResult<Option<ValidationState>> {
        Ok(read_lock(&self.state, "reading a binder state")?
            .meta
            .get(&attr)
            .map(|meta| meta.state))
    }

    pub fn bound_attrs(&self) -> Vec<AttrKey> {
        self.binders.keys().copied().collect()
    }

    pub fn actions(&self) -> FormResult<ActionState> {
        let mode = self.mode()?;
        Ok(ActionState {
            save: true,
            refresh: mode == Mode::Edit,
            delete: mode == Mode::Edit,
        })
    }

    pub fn subscribe(&self, observer: impl Fn(&FormEvent) + Send + Sync + 'static) -> FormResult<()> {
        write_lock(&self.observers, "registering a form observer")?.push(Arc::new(observer));
        Ok(())
    }

    pub fn binders_valid(&self) -> FormResult<bool> {
        let state = read_lock(&self.state, "checking aggregate validity")?;
        Ok(validate_binders(
            state
                .meta
                .values()
                .filter(|meta| meta.enabled)
                .map(|meta| meta.state),
        ))
    }

    pub fn validate(&self) -> FormResult<bool> {
        Ok(self.validate_all()?.is_empty())
    }

    pub fn mark_not_validated(&self, attr: AttrKey) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "forcing a binder back to unvalidated")?;
            if let Some(meta) = state.meta.get_mut(&attr) {
                meta.state = ValidationState::Unvalidated;
            }
        }
        self.update_status().map(drop)
    }

    pub fn set_binder_enabled(&self, attr: AttrKey, enabled: bool) -> FormResult<()> {
        let Some(binding) = self.binders.get(&attr) else {
            return Ok(());
        };
        if !binding.editable() || T::identity_attr() == Some(attr) {
            return Ok(());
        }
        {
            let mut state = write_lock(&self.state, "toggling a binder")?;
            if let Some(meta) = state.meta.get_mut(&attr) {
                meta.enabled = enabled;
            }
        }
        binding.ui().set_enabled(enabled, None);
        Ok(())
    }

    pub fn update_to_ui(&self, suppress_revalidation_reset: bool) -> FormResult<()> {
        self.fill(suppress_revalidation_reset)
    }

    pub fn update_from_ui(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "applying field values to the record")?;
        for (attr, binding) in self.binders.iter() {
            let enabled = state.meta.get(attr).is_some_and(|meta| meta.enabled);
            if !enabled {
                continue;
            }
            binding
                .apply_to_record(&mut state.model)
                .map_err(|error| FormError::Conversion { attr: *attr, error })?;
        }
        Ok(())
    }

    pub fn save(&self) -> FormResult<()> {
        let invalid = self.validate_all()?;
        if !invalid.is_empty() {
            tracing::debug!(attrs = ?invalid, "validation failed, save aborted");
            self.emit(FormEvent::ValidationFailed(invalid.clone()))?;
            return Err(FormError::ValidationFailed(invalid));
        }

        self.update_from_ui()?;
        let model = self.record()?;

        tracing::debug!("committing record");
        let committed = self
            .store
            .add(&model)
            .and_then(|()| self.store.commit());
        if let Err(error) = committed {
            self.store.rollback();
            let message = error.to_string();
            tracing::warn!(error = %message, "commit failed, rolled back");
            self.emit(FormEvent::CommitFailed(message.clone()))?;
            return Err(FormError::CommitFailed(message));
        }

        // The commit stands even if the read-back fails, so the mode flips
        // before the refresh result is inspected.
        let refreshed = self.store.refresh(&model);
        {
            let mut state = write_lock(&self.state, "installing the committed record")?;
            state.mode = Mode::Edit;
            state.validate_attempted = false;
            if let Ok(fresh) = &refreshed {
                state.model = fresh.clone();
            }
        }
        refreshed.map_err(|error| FormError::RefreshFailed(error.to_string()))?;

        self.fill(true)?;
        self.set_status(FormStatus::Clean)?;
        tracing::debug!("record committed");
        Ok(())
    }

    pub fn refresh(&self) -> FormResult<()> {
        self.require_edit("refresh")?;
        let model = self.record()?;
        let fresh = self
            .store
            .refresh(&model)
            .map_err(|error| FormError::RefreshFailed(error.to_string()))?;
        {
            let mut state = write_lock(&self.state, "installing the refreshed record")?;
            state.model = fresh;
            state.validate_attempted = false;
        }
        self.fill(true)?;
        self.set_status(FormStatus::Clean)?;
        tracing::debug!("record refreshed from the store");
        Ok(())
    }

    pub fn delete(&self) -> FormResult<()> {
        self.require_edit("delete")?;
        let model = self.record()?;
        let removed = self
            .store
            .delete(&model)
            .and_then(|()| self.store.commit());
        match removed {
            Ok(()) => {
                tracing::debug!("record deleted");
                self.emit(FormEvent::Deleted)?;
                Ok(())
            }
            Err(error) => {
                self.store.rollback();
                let message = error.to_string();
                tracing::warn!(error = %message, "delete failed, rolled back");
                self.emit(FormEvent::CommitFailed(message.clone()))?;
                Err(FormError::CommitFailed(message))
            }
        }
    }

    pub fn update_status(&self) -> FormResult<FormStatus> {
        let (status, changed) = {
            let mut state = write_lock(&self.state, "recomputing the form status")?;
            let mut any_invalid = false;
            let mut any_pending = false;
            for meta in state.meta.values().filter(|meta| meta.enabled) {
                match meta.state {
                    ValidationState::Invalid => any_invalid = true,
                    ValidationState::Unvalidated => any_pending = true,
                    ValidationState::Valid => {}
                }
            }
            let status = if any_invalid && state.validate_attempted {
                FormStatus::Error
            } else if any_invalid || any_pending {
                FormStatus::PendingChanges
            } else {
                FormStatus::Clean
            };
            let changed = state.status != status;
            state.status = status;
            (status, changed)
        };
        if changed {
            self.emit(FormEvent::StatusChanged(status))?;
        }
        Ok(status)
    }

    fn validate_all(&self) -> FormResult<Vec<AttrKey>> {
        let mut invalid = Vec::new();
        {
            let mut state = write_lock(&self.state, "running a validate-all pass")?;
            state.validate_attempted = true;
            for (attr, binding) in self.binders.iter() {
                let Some(meta) = state.meta.get_mut(attr) else {
                    continue;
                };
                if !meta.enabled {
                    continue;
                }
                match binding.check_ui() {
                    Ok(()) => meta.state = ValidationState::Valid,
                    Err(_) => {
                        meta.state = ValidationState::Invalid;
                        invalid.push(*attr);
                    }
                }
            }
        }
        self.update_status()?;
        Ok(invalid)
    }

    fn fill(&self, suppress: bool) -> FormResult<()> {
        let model = self.record()?;
        for binding in self.binders.values() {
            binding.fill_from_record(&model);
        }
        {
            let mut state = write_lock(&self.state, "resetting binder states after a refill")?;
            for meta in state.meta.values_mut() {
                meta.state = ValidationState::Unvalidated;
            }
        }
        if !suppress {
            self.update_status()?;
        }
        Ok(())
    }

    fn set_status(&self, status: FormStatus) -> FormResult<()> {
        let changed = {
            let mut state = write_lock(&self.state, "assigning the form status")?;
            let changed = state.status != status;
            state.status = status;
            changed
        };
        if changed {
            self.emit(FormEvent::StatusChanged(status))?;
        }
        Ok(())
    }

    fn require_edit(&self, action: &'static str) -> FormResult<()> {
        let mode = self.mode()?;
        if mode != Mode::Edit {
            return Err(FormError::InvalidOperation { action, mode });
        }
        Ok(())
    }

    fn disable_fixed_fields(&self) -> FormResult<()> {
        let state = read_lock(&self.state, "disabling fixed fields")?;
        for (attr, binding) in self.binders.iter() {
            let enabled = state.meta.get(attr).is_some_and(|meta| meta.enabled);
            if !enabled {
                binding
                    .ui()
                    .set_enabled(false, Some(self.options.disabled_message));
            }
        }
        Ok(())
    }

    fn wire_autoconnect(&self) -> FormResult<()> {
        let state = read_lock(&self.state, "wiring change notifications")?;
        for (attr, binding) in self.binders.iter() {
            let enabled = state.meta.get(attr).is_some_and(|meta| meta.enabled);
            let wire = self.options.autoconnect && binding.autoconnect() && enabled;
            if !wire {
                continue;
            }
            let save_on_change = self.options.autosave || binding.autosave();
            let weak = self.downgrade();
            let attr = *attr;
            binding.ui().on_change(Arc::new(move || {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.field_changed(attr, save_on_change);
                }
            }));
        }
        Ok(())
    }

    fn field_changed(&self, attr: AttrKey, save_on_change: bool) {
        let marked = {
            let Ok(mut state) = write_lock(&self.state, "handling a field change") else {
                return;
            };
            match state.meta.get_mut(&attr) {
                Some(meta) if meta.enabled => {
                    meta.state = ValidationState::Unvalidated;
                    true
                }
                _ => false,
            }
        };
        if !marked {
            return;
        }
        let _ = self.update_status();
        if save_on_change
            && let Err(error) = self.save()
        {
            tracing::debug!(%error, "autosave attempt failed");
        }
    }

    fn emit(&self, event: FormEvent) -> FormResult<()> {
        let observers = read_lock(&self.observers, "notifying form observers")?.clone();
        for observer in observers {
            observer(&event);
        }
        Ok(())
    }

    fn downgrade(&self) -> WeakCoordinator<T, S> {
        WeakCoordinator {
            options: self.options,
            state: Arc::downgrade(&self.state),
            binders: Arc::downgrade(&self.binders),
            store: Arc::downgrade(&self.store),
            observers: Arc::downgrade(&self.observers),
        }
    }
}
