use std::fmt::{Display, Formatter};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use rust_decimal::Decimal;

pub type ChangeHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum FieldKind {
    Text,
    Date,
    Number,
    Flag,
}

impl FieldKind {
    pub const fn suffix(self) -> &'static str {
        match self {
            FieldKind::Text => "LineEdit",
            FieldKind::Date => "DateEdit",
            FieldKind::Number => "SpinBox",
            FieldKind::Flag => "CheckBox",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UiValue {
    Empty,
    Text(String),
    Date(NaiveDate),
    Number(Decimal),
    Flag(bool),
}

impl UiValue {
    pub fn is_empty(&self) -> bool {
        match self {
            UiValue::Empty => true,
            UiValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl Display for UiValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UiValue::Empty => Ok(()),
            UiValue::Text(text) => f.write_str(text),
            UiValue::Date(date) => write!(f, "{}", date.format(crate::convert::DATE_FORMAT)),
            UiValue::Number(number) => write!(f, "{number}"),
            UiValue::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

pub trait UiField: Send + Sync {
    fn kind(&self) -> FieldKind;

    fn value(&self) -> UiValue;

    fn set_value(&self, value: UiValue);

    fn set_enabled(&self, enabled: bool, message: Option<&str>);

    fn on_change(&self, handler: ChangeHandler);
}

struct MemoryFieldState {
    value: UiValue,
    enabled: bool,
    message: Option<String>,
    handlers: Vec<ChangeHandler>,
}

pub struct MemoryField {
    kind: FieldKind,
    state: RwLock<MemoryFieldState>,
}

impl MemoryField {
    pub fn new(kind: FieldKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            state: RwLock::new(MemoryFieldState {
                value: UiValue::Empty,
                enabled: true,
                message: None,
                handlers: Vec::new(),
            }),
        })
    }

    pub fn text(initial: impl Into<String>) -> Arc<Self> {
        let field = Self::new(FieldKind::Text);
        field.set_value(UiValue::Text(initial.into()));
        field
    }

    // Simulates a user edit: writes the value and fires change handlers.
    // set_value is the programmatic (silent) path.
    pub fn edit(&self, value: UiValue) {
        let handlers = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.value = value;
            state.handlers.clone()
        };
        for handler in handlers {
            handler();
        }
    }

    pub fn enabled(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .enabled
    }

    pub fn message(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .message
            .clone()
    }
}

impl UiField for MemoryField {
    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn value(&self) -> UiValue {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .value
            .clone()
    }

    fn set_value(&self, value: UiValue) {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .value = value;
    }

    fn set_enabled(&self, enabled: bool, message: Option<&str>) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.enabled = enabled;
        state.message = message.map(str::to_owned);
    }

    fn on_change(&self, handler: ChangeHandler) {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .handlers
            .push(handler);
    }
}
