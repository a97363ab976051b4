pub mod binder;
pub mod connect;
pub mod contracts;
pub mod convert;
pub mod coordinator;
pub mod query;
pub mod record;
pub mod registry;
pub mod store;

#[cfg(test)]
mod tests;

pub use formbind_record_derive::Record;

pub use binder::{FieldBinder, FieldBinding, ValidationState, auto_binding};
pub use connect::{ConnectError, ConnectionProfile, StoreConnector};
pub use contracts::{ChangeHandler, FieldKind, MemoryField, UiField, UiValue};
pub use convert::{
    BindableValue, ConversionError, DISABLED_PLACEHOLDER, DateCodec, DecimalCodec, FlagCodec,
    IdentityCodec, OptionalDateCodec, OptionalDecimalCodec, OptionalTextCodec, TextCodec,
    ValueCodec,
};
pub use coordinator::{
    ActionState, CoordinatorOptions, EventObserver, FormCoordinator, FormError, FormEvent,
    FormResult, FormStatus, Mode,
};
pub use query::{
    DEFAULT_LIMIT, Filter, QueryOp, QuerySource, QuerySpec, RefreshOutcome, ResultsModel,
    SortOrder,
};
pub use record::{AttrKey, AttrLens, Record};
pub use registry::{BinderRegistry, UiRoot, validate_binders};
pub use store::{MemoryStore, MemoryStoreError, Store, StoreCounts};
