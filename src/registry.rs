use std::collections::BTreeMap;
use std::sync::Arc;

use crate::binder::{FieldBinding, ValidationState};
use crate::contracts::UiField;
use crate::record::{AttrKey, Record};

#[derive(Clone, Default)]
pub struct UiRoot {
    fields: BTreeMap<String, Arc<dyn UiField>>,
}

impl UiRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, field: Arc<dyn UiField>) -> Self {
        self.register(name, field);
        self
    }

    pub fn register(&mut self, name: impl Into<String>, field: Arc<dyn UiField>) {
        self.fields.insert(name.into(), field);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn UiField>> {
        self.fields.get(name)
    }

    // Convention lookup: a component bound to `birthdate` is expected to be
    // registered as `birthdateDateEdit` (attribute name + field-kind suffix).
    pub fn lookup(&self, attr: AttrKey) -> Option<&Arc<dyn UiField>> {
        self.fields.iter().find_map(|(name, field)| {
            let conventional = format!("{attr}{}", field.kind().suffix());
            (*name == conventional).then_some(field)
        })
    }
}

pub struct BinderRegistry<T>
where
    T: Record,
{
    explicit: BTreeMap<AttrKey, Box<dyn FieldBinding<T>>>,
}

impl<T> BinderRegistry<T>
where
    T: Record,
{
    pub fn new() -> Self {
        Self {
            explicit: BTreeMap::new(),
        }
    }

    pub fn supply(mut self, binding: Box<dyn FieldBinding<T>>) -> Self {
        self.explicit.insert(binding.attr(), binding);
        self
    }

    pub fn resolve(mut self, ui_root: &UiRoot) -> BTreeMap<AttrKey, Box<dyn FieldBinding<T>>> {
        let mut resolved = BTreeMap::new();
        for &attr in T::attr_keys() {
            if let Some(binding) = self.explicit.remove(&attr) {
                resolved.insert(attr, binding);
                continue;
            }
            if let Some(ui) = ui_root.lookup(attr)
                && let Some(binding) = T::default_binding(attr, ui)
            {
                resolved.insert(attr, binding);
            }
        }
        resolved
    }
}

impl<T> Default for BinderRegistry<T>
where
    T: Record,
{
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_binders<I>(states: I) -> bool
where
    I: IntoIterator<Item = ValidationState>,
{
    states
        .into_iter()
        .all(|state| state == ValidationState::Valid)
}
