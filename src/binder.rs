use std::marker::PhantomData;
use std::sync::Arc;

use crate::contracts::UiField;
use crate::convert::{BindableValue, ConversionError, ValueCodec};
use crate::record::{AttrKey, AttrLens};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationState {
    Unvalidated,
    Valid,
    Invalid,
}

pub trait FieldBinding<T>: Send + Sync {
    fn attr(&self) -> AttrKey;

    fn editable(&self) -> bool;

    fn required(&self) -> bool;

    fn autoconnect(&self) -> bool;

    fn autosave(&self) -> bool;

    fn ui(&self) -> &Arc<dyn UiField>;

    fn check_ui(&self) -> Result<(), ConversionError>;

    fn apply_to_record(&self, record: &mut T) -> Result<(), ConversionError>;

    fn fill_from_record(&self, record: &T);
}

pub struct FieldBinder<T, L>
where
    L: AttrLens<T>,
{
    lens: L,
    ui: Arc<dyn UiField>,
    codec: Box<dyn ValueCodec<Value = L::Value>>,
    editable: bool,
    required: bool,
    autoconnect: bool,
    autosave: bool,
    _record: PhantomData<fn(&T)>,
}

impl<T, L> FieldBinder<T, L>
where
    T: Send + Sync + 'static,
    L: AttrLens<T>,
{
    pub fn with_codec(
        lens: L,
        ui: Arc<dyn UiField>,
        codec: Box<dyn ValueCodec<Value = L::Value>>,
    ) -> Self {
        Self {
            lens,
            ui,
            codec,
            editable: true,
            required: false,
            autoconnect: true,
            autosave: false,
            _record: PhantomData,
        }
    }

    pub fn editable(mut self, value: bool) -> Self {
        self.editable = value;
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    pub fn autoconnect(mut self, value: bool) -> Self {
        self.autoconnect = value;
        self
    }

    pub fn autosave(mut self, value: bool) -> Self {
        self.autosave = value;
        self
    }

    pub fn boxed(self) -> Box<dyn FieldBinding<T>> {
        Box::new(self)
    }
}

impl<T, L> FieldBinder<T, L>
where
    T: Send + Sync + 'static,
    L: AttrLens<T>,
    L::Value: BindableValue,
{
    pub fn auto(lens: L, ui: Arc<dyn UiField>) -> Option<Self> {
        let codec = L::Value::default_codec(ui.kind())?;
        Some(Self::with_codec(lens, ui, codec))
    }
}

impl<T, L> FieldBinding<T> for FieldBinder<T, L>
where
    T: Send + Sync + 'static,
    L: AttrLens<T>,
{
    fn attr(&self) -> AttrKey {
        self.lens.key()
    }

    fn editable(&self) -> bool {
        self.editable
    }

    fn required(&self) -> bool {
        self.required
    }

    fn autoconnect(&self) -> bool {
        self.autoconnect
    }

    fn autosave(&self) -> bool {
        self.autosave
    }

    fn ui(&self) -> &Arc<dyn UiField> {
        &self.ui
    }

    fn check_ui(&self) -> Result<(), ConversionError> {
        let value = self.ui.value();
        if self.required && value.is_empty() {
            return Err(ConversionError::required());
        }
        self.codec.from_ui(&value).map(drop)
    }

    fn apply_to_record(&self, record: &mut T) -> Result<(), ConversionError> {
        let value = self.codec.from_ui(&self.ui.value())?;
        self.lens.set(record, value);
        Ok(())
    }

    fn fill_from_record(&self, record: &T) {
        let value = self.codec.to_ui(self.lens.get(record), !self.editable);
        self.ui.set_value(value);
    }
}

pub fn auto_binding<T, L>(
    lens: L,
    ui: &Arc<dyn UiField>,
    identity: bool,
) -> Option<Box<dyn FieldBinding<T>>>
where
    T: Send + Sync + 'static,
    L: AttrLens<T>,
    L::Value: BindableValue,
{
    Some(
        FieldBinder::auto(lens, ui.clone())?
            .editable(!identity)
            .boxed(),
    )
}
