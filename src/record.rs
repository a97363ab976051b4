use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::binder::FieldBinding;
use crate::contracts::UiField;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct AttrKey(&'static str);

impl AttrKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for AttrKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

pub trait AttrLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> AttrKey;
    fn get<'a>(self, record: &'a T) -> &'a Self::Value;
    fn set(self, record: &mut T, value: Self::Value);
}

pub trait Record: Clone + Send + Sync + 'static {
    type Fields: Copy;

    fn fields() -> Self::Fields;

    fn attr_keys() -> &'static [AttrKey];

    fn identity_attr() -> Option<AttrKey>;

    fn has_identity(&self) -> bool;

    fn attr_display(&self, attr: AttrKey) -> Option<String>;

    fn default_binding(attr: AttrKey, ui: &Arc<dyn UiField>) -> Option<Box<dyn FieldBinding<Self>>>;
}
