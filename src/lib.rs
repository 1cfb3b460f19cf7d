//! SeaORM-centric nested set implementation.
//!
//! Every node stores a `(left, right)` interval that strictly contains the
//! intervals of its descendants, so ancestry and subtree queries are range
//! comparisons. This crate maintains those intervals when nodes are inserted,
//! moved to a new parent, or removed, each change running as one atomic unit.
//! PostgreSQL and SQLite are supported.

pub mod children;
pub mod config;
pub mod error;
pub mod hooks;
pub mod interval;
pub mod lock;
pub mod placement;
pub mod repository;
pub mod store;
pub mod traits;

pub mod prelude {
    //! Convenient re-exports for consumers.
    pub use crate::config::{
        AdvisoryLockStrategy, Collation, InsertPolicy, NestedSetConfig, NestedSetOptions,
        OrderComparator,
    };
    pub use crate::hooks::NestedSetHooks;
    pub use crate::interval::Interval;
    pub use crate::repository::NestedSetRepository;
    pub use crate::traits::NestedSetModel;
}

#[doc(hidden)]
pub mod __private {
    pub use once_cell;
}

pub use config::{
    AdvisoryLockKey, AdvisoryLockStrategy, Collation, InsertPolicy, NestedSetConfig,
    NestedSetOptions, OrderComparator,
};
pub use error::NestedSetError;
pub use hooks::NestedSetHooks;
pub use interval::{Interval, Relocation, Shift, Side, TargetInterval, Threshold};
pub use nested_set_macros::NestedSetModel as NestedSetModelDerive;
#[doc(hidden)]
pub use nested_set_macros::NestedSetModel;
pub use repository::NestedSetRepository;
pub use traits::NestedSetModel;
