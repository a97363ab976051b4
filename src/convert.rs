use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::contracts::{FieldKind, UiValue};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DISABLED_PLACEHOLDER: &str = "<<<Auto>>>";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConversionError {
    pub expected: &'static str,
    pub value: String,
}

impl ConversionError {
    pub fn new(expected: &'static str, value: &UiValue) -> Self {
        Self {
            expected,
            value: value.to_string(),
        }
    }

    pub fn required() -> Self {
        Self {
            expected: "a non-empty value",
            value: String::new(),
        }
    }
}

impl Display for ConversionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot interpret {:?} as {}", self.value, self.expected)
    }
}

impl std::error::Error for ConversionError {}

pub trait ValueCodec: Send + Sync {
    type Value;

    fn to_ui(&self, value: &Self::Value, disabled: bool) -> UiValue;

    fn from_ui(&self, value: &UiValue) -> Result<Self::Value, ConversionError>;
}

pub trait BindableValue: Clone + PartialEq + Send + Sync + 'static {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>>;

    fn display(&self) -> String;
}

pub struct TextCodec;

impl ValueCodec for TextCodec {
    type Value = String;

    fn to_ui(&self, value: &String, _disabled: bool) -> UiValue {
        UiValue::Text(value.clone())
    }

    fn from_ui(&self, value: &UiValue) -> Result<String, ConversionError> {
        match value {
            UiValue::Empty => Ok(String::new()),
            UiValue::Text(text) => Ok(text.clone()),
            other => Err(ConversionError::new("text", other)),
        }
    }
}

pub struct OptionalTextCodec;

impl ValueCodec for OptionalTextCodec {
    type Value = Option<String>;

    fn to_ui(&self, value: &Option<String>, disabled: bool) -> UiValue {
        match value {
            Some(text) => UiValue::Text(text.clone()),
            None if disabled => UiValue::Text(DISABLED_PLACEHOLDER.to_owned()),
            None => UiValue::Empty,
        }
    }

    fn from_ui(&self, value: &UiValue) -> Result<Option<String>, ConversionError> {
        match value {
            UiValue::Empty => Ok(None),
            UiValue::Text(text) if text.is_empty() || text == DISABLED_PLACEHOLDER => Ok(None),
            UiValue::Text(text) => Ok(Some(text.clone())),
            other => Err(ConversionError::new("optional text", other)),
        }
    }
}

fn parse_date(text: &str, value: &UiValue) -> Result<NaiveDate, ConversionError> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| ConversionError::new("a calendar date", value))
}

pub struct DateCodec;

impl ValueCodec for DateCodec {
    type Value = NaiveDate;

    fn to_ui(&self, value: &NaiveDate, _disabled: bool) -> UiValue {
        UiValue::Date(*value)
    }

    fn from_ui(&self, value: &UiValue) -> Result<NaiveDate, ConversionError> {
        match value {
            UiValue::Date(date) => Ok(*date),
            UiValue::Text(text) => parse_date(text, value),
            other => Err(ConversionError::new("a calendar date", other)),
        }
    }
}

pub struct OptionalDateCodec;

impl ValueCodec for OptionalDateCodec {
    type Value = Option<NaiveDate>;

    fn to_ui(&self, value: &Option<NaiveDate>, _disabled: bool) -> UiValue {
        match value {
            Some(date) => UiValue::Date(*date),
            None => UiValue::Empty,
        }
    }

    fn from_ui(&self, value: &UiValue) -> Result<Option<NaiveDate>, ConversionError> {
        match value {
            UiValue::Empty => Ok(None),
            UiValue::Date(date) => Ok(Some(*date)),
            UiValue::Text(text) if text.is_empty() => Ok(None),
            UiValue::Text(text) => parse_date(text, value).map(Some),
            other => Err(ConversionError::new("an optional calendar date", other)),
        }
    }
}

fn parse_decimal(text: &str, value: &UiValue) -> Result<Decimal, ConversionError> {
    Decimal::from_str(text.trim()).map_err(|_| ConversionError::new("a decimal number", value))
}

pub struct DecimalCodec;

impl ValueCodec for DecimalCodec {
    type Value = Decimal;

    fn to_ui(&self, value: &Decimal, _disabled: bool) -> UiValue {
        UiValue::Number(*value)
    }

    fn from_ui(&self, value: &UiValue) -> Result<Decimal, ConversionError> {
        match value {
            UiValue::Number(number) => Ok(*number),
            UiValue::Text(text) => parse_decimal(text, value),
            other => Err(ConversionError::new("a decimal number", other)),
        }
    }
}

pub struct OptionalDecimalCodec;

impl ValueCodec for OptionalDecimalCodec {
    type Value = Option<Decimal>;

    fn to_ui(&self, value: &Option<Decimal>, _disabled: bool) -> UiValue {
        match value {
            Some(number) => UiValue::Number(*number),
            None => UiValue::Empty,
        }
    }

    fn from_ui(&self, value: &UiValue) -> Result<Option<Decimal>, ConversionError> {
        match value {
            UiValue::Empty => Ok(None),
            UiValue::Number(number) => Ok(Some(*number)),
            UiValue::Text(text) if text.is_empty() => Ok(None),
            UiValue::Text(text) => parse_decimal(text, value).map(Some),
            other => Err(ConversionError::new("an optional decimal number", other)),
        }
    }
}

pub struct FlagCodec;

impl ValueCodec for FlagCodec {
    type Value = bool;

    fn to_ui(&self, value: &bool, _disabled: bool) -> UiValue {
        UiValue::Flag(*value)
    }

    fn from_ui(&self, value: &UiValue) -> Result<bool, ConversionError> {
        match value {
            UiValue::Flag(flag) => Ok(*flag),
            UiValue::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ConversionError::new("a yes/no flag", value)),
            other => Err(ConversionError::new("a yes/no flag", other)),
        }
    }
}

impl BindableValue for String {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>> {
        matches!(kind, FieldKind::Text).then(|| Box::new(TextCodec) as _)
    }

    fn display(&self) -> String {
        self.clone()
    }
}

impl BindableValue for Option<String> {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>> {
        matches!(kind, FieldKind::Text).then(|| Box::new(OptionalTextCodec) as _)
    }

    fn display(&self) -> String {
        self.clone().unwrap_or_default()
    }
}

impl BindableValue for NaiveDate {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>> {
        matches!(kind, FieldKind::Date).then(|| Box::new(DateCodec) as _)
    }

    fn display(&self) -> String {
        self.format(DATE_FORMAT).to_string()
    }
}

impl BindableValue for Option<NaiveDate> {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>> {
        matches!(kind, FieldKind::Date).then(|| Box::new(OptionalDateCodec) as _)
    }

    fn display(&self) -> String {
        self.map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }
}

impl BindableValue for Decimal {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>> {
        matches!(kind, FieldKind::Number).then(|| Box::new(DecimalCodec) as _)
    }

    fn display(&self) -> String {
        self.to_string()
    }
}

impl BindableValue for Option<Decimal> {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>> {
        matches!(kind, FieldKind::Number).then(|| Box::new(OptionalDecimalCodec) as _)
    }

    fn display(&self) -> String {
        self.map(|number| number.to_string()).unwrap_or_default()
    }
}

impl BindableValue for Option<u64> {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>> {
        matches!(kind, FieldKind::Text | FieldKind::Number).then(|| Box::new(IdentityCodec) as _)
    }

    fn display(&self) -> String {
        self.map(|id| id.to_string()).unwrap_or_default()
    }
}

pub struct IdentityCodec;

impl ValueCodec for IdentityCodec {
    type Value = Option<u64>;

    fn to_ui(&self, value: &Option<u64>, disabled: bool) -> UiValue {
        match value {
            Some(id) => UiValue::Text(id.to_string()),
            None if disabled => UiValue::Text(DISABLED_PLACEHOLDER.to_owned()),
            None => UiValue::Empty,
        }
    }

    fn from_ui(&self, value: &UiValue) -> Result<Option<u64>, ConversionError> {
        match value {
            UiValue::Empty => Ok(None),
            UiValue::Text(text) if text.is_empty() || text == DISABLED_PLACEHOLDER => Ok(None),
            UiValue::Text(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConversionError::new("a record identity", value)),
            UiValue::Number(number) => number
                .to_u64()
                .map(Some)
                .ok_or_else(|| ConversionError::new("a record identity", value)),
            other => Err(ConversionError::new("a record identity", other)),
        }
    }
}

impl BindableValue for bool {
    fn default_codec(kind: FieldKind) -> Option<Box<dyn ValueCodec<Value = Self>>> {
        matches!(kind, FieldKind::Flag).then(|| Box::new(FlagCodec) as _)
    }

    fn display(&self) -> String {
        self.to_string()
    }
}
