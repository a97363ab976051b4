use std::cmp::Ordering;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::record::{AttrKey, Record};

pub const DEFAULT_LIMIT: usize = 250;

const LIKE_ESCAPE: char = '/';

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryOp {
    Like,
    ILike,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl QueryOp {
    pub const ALL: [QueryOp; 12] = [
        QueryOp::Like,
        QueryOp::ILike,
        QueryOp::Eq,
        QueryOp::Ne,
        QueryOp::Gt,
        QueryOp::Ge,
        QueryOp::Lt,
        QueryOp::Le,
        QueryOp::In,
        QueryOp::NotIn,
        QueryOp::IsNull,
        QueryOp::IsNotNull,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            QueryOp::Like => "~=",
            QueryOp::ILike => "~= (Aa)",
            QueryOp::Eq => "==",
            QueryOp::Ne => "!=",
            QueryOp::Gt => ">",
            QueryOp::Ge => ">=",
            QueryOp::Lt => "<",
            QueryOp::Le => "<=",
            QueryOp::In => "c",
            QueryOp::NotIn => "nc",
            QueryOp::IsNull => "=0",
            QueryOp::IsNotNull => "!=0",
        }
    }

    pub const fn is_unary(self) -> bool {
        matches!(self, QueryOp::IsNull | QueryOp::IsNotNull)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

// Displayed attribute values compare numerically when both sides parse as
// decimals, lexicographically otherwise.
pub fn compare_display(left: impl AsRef<str>, right: impl AsRef<str>) -> Ordering {
    let left = left.as_ref();
    let right = right.as_ref();
    match (Decimal::from_str(left.trim()), Decimal::from_str(right.trim())) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => left.cmp(right),
    }
}

pub fn like_pattern(needle: &str) -> String {
    if needle.contains('%') {
        needle.to_owned()
    } else {
        format!("%{needle}%")
    }
}

enum LikeToken {
    Any,
    One,
    Literal(char),
}

fn like_tokens(pattern: &str, case_insensitive: bool) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(current) = chars.next() {
        let token = match current {
            LIKE_ESCAPE => match chars.next() {
                Some(escaped) => LikeToken::Literal(escaped),
                None => break,
            },
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            literal => LikeToken::Literal(literal),
        };
        let token = match token {
            LikeToken::Literal(literal) if case_insensitive => {
                LikeToken::Literal(literal.to_ascii_lowercase())
            }
            other => other,
        };
        tokens.push(token);
    }
    tokens
}

pub fn like_match(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    let tokens = like_tokens(pattern, case_insensitive);
    let text: Vec<char> = if case_insensitive {
        text.chars().map(|c| c.to_ascii_lowercase()).collect()
    } else {
        text.chars().collect()
    };

    let mut text_at = 0;
    let mut token_at = 0;
    let mut resume: Option<(usize, usize)> = None;
    while text_at < text.len() {
        let consumed = match tokens.get(token_at) {
            Some(LikeToken::One) => true,
            Some(LikeToken::Literal(literal)) => *literal == text[text_at],
            _ => false,
        };
        if consumed {
            text_at += 1;
            token_at += 1;
        } else if let Some(LikeToken::Any) = tokens.get(token_at) {
            resume = Some((token_at, text_at));
            token_at += 1;
        } else if let Some((any_at, matched_to)) = resume {
            token_at = any_at + 1;
            resume = Some((any_at, matched_to + 1));
            text_at = matched_to + 1;
        } else {
            return false;
        }
    }
    while let Some(LikeToken::Any) = tokens.get(token_at) {
        token_at += 1;
    }
    token_at == tokens.len()
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Filter {
    pub attr: AttrKey,
    pub op: QueryOp,
    pub value: Option<String>,
}

impl Filter {
    pub fn new(attr: AttrKey, op: QueryOp, value: impl Into<String>) -> Self {
        Self {
            attr,
            op,
            value: Some(value.into()),
        }
    }

    pub fn unary(attr: AttrKey, op: QueryOp) -> Self {
        Self {
            attr,
            op,
            value: None,
        }
    }

    pub fn matches<T>(&self, record: &T) -> bool
    where
        T: Record,
    {
        let Some(display) = record.attr_display(self.attr) else {
            return false;
        };
        let needle = self.value.as_deref().unwrap_or_default();
        match self.op {
            QueryOp::Like => like_match(&like_pattern(needle), &display, false),
            QueryOp::ILike => like_match(&like_pattern(needle), &display, true),
            QueryOp::Eq => compare_display(&display, needle) == Ordering::Equal,
            QueryOp::Ne => compare_display(&display, needle) != Ordering::Equal,
            QueryOp::Gt => compare_display(&display, needle) == Ordering::Greater,
            QueryOp::Ge => compare_display(&display, needle) != Ordering::Less,
            QueryOp::Lt => compare_display(&display, needle) == Ordering::Less,
            QueryOp::Le => compare_display(&display, needle) != Ordering::Greater,
            QueryOp::In => needle
                .split(',')
                .any(|item| compare_display(&display, item.trim()) == Ordering::Equal),
            QueryOp::NotIn => !needle
                .split(',')
                .any(|item| compare_display(&display, item.trim()) == Ordering::Equal),
            QueryOp::IsNull => display.is_empty(),
            QueryOp::IsNotNull => !display.is_empty(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuerySpec {
    pub columns: Vec<AttrKey>,
    pub filter: Option<Filter>,
    pub sort: Option<(AttrKey, SortOrder)>,
    pub limit: Option<usize>,
}

impl QuerySpec {
    pub fn all<T>() -> Self
    where
        T: Record,
    {
        Self {
            columns: T::attr_keys().to_vec(),
            filter: None,
            sort: T::attr_keys()
                .first()
                .map(|&attr| (attr, SortOrder::Ascending)),
            limit: Some(DEFAULT_LIMIT),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn sort(mut self, attr: AttrKey, order: SortOrder) -> Self {
        self.sort = Some((attr, order));
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

pub trait QuerySource<T>: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn search(&self, spec: &QuerySpec) -> Result<Vec<T>, Self::Error>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RefreshOutcome {
    Loaded(usize),
    Failed(String),
}

pub struct ResultsModel<T> {
    spec: QuerySpec,
    rows: Vec<T>,
    observer: Option<Box<dyn Fn(&RefreshOutcome) + Send + Sync>>,
}

impl<T> ResultsModel<T>
where
    T: Record,
{
    pub fn new() -> Self {
        Self::with_spec(QuerySpec::all::<T>())
    }

    pub fn with_spec(spec: QuerySpec) -> Self {
        Self {
            spec,
            rows: Vec::new(),
            observer: None,
        }
    }

    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    pub fn set_filter(&mut self, filter: Option<Filter>) {
        self.spec.filter = filter;
    }

    pub fn on_refresh(&mut self, observer: impl Fn(&RefreshOutcome) + Send + Sync + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn refresh<S>(&mut self, source: &S) -> Result<usize, S::Error>
    where
        S: QuerySource<T>,
    {
        match source.search(&self.spec) {
            Ok(rows) => {
                let loaded = rows.len();
                self.rows = rows;
                self.notify(&RefreshOutcome::Loaded(loaded));
                Ok(loaded)
            }
            Err(error) => {
                self.notify(&RefreshOutcome::Failed(error.to_string()));
                Err(error)
            }
        }
    }

    pub fn sort_by<S>(&mut self, attr: AttrKey, order: SortOrder, source: &S) -> Result<usize, S::Error>
    where
        S: QuerySource<T>,
    {
        self.spec.sort = Some((attr, order));
        self.refresh(source)
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.spec.columns.iter().map(|attr| attr.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.spec.columns.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<String> {
        let attr = *self.spec.columns.get(column)?;
        self.rows.get(row)?.attr_display(attr)
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    fn notify(&self, outcome: &RefreshOutcome) {
        if let Some(observer) = &self.observer {
            observer(outcome);
        }
    }
}

impl<T> Default for ResultsModel<T>
where
    T: Record,
{
    fn default() -> Self {
        Self::new()
    }
}
