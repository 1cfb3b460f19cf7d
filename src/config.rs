use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::NestedSetError;

/// Static configuration describing how a SeaORM model maintains its
/// nested-set intervals.
#[derive(Clone, Debug)]
pub struct NestedSetConfig {
    entity_name: String,
    insert_policy: InsertPolicy,
    order_comparator: OrderComparator,
    advisory_lock_strategy: AdvisoryLockStrategy,
}

impl NestedSetConfig {
    /// Create a new configuration for the named entity.
    pub fn new(entity_name: impl Into<String>) -> Self {
        let entity_name = entity_name.into();
        let default_lock =
            AdvisoryLockStrategy::Namespaced(AdvisoryLockKey::derived_from(&entity_name));

        Self {
            entity_name,
            insert_policy: InsertPolicy::default(),
            order_comparator: OrderComparator::default(),
            advisory_lock_strategy: default_lock,
        }
    }

    /// Merge options produced by [`NestedSetOptions`].
    pub(crate) fn apply_options(mut self, options: NestedSetOptions) -> Self {
        if let Some(policy) = options.insert_policy {
            self.insert_policy = policy;
        }
        if let Some(comparator) = options.order_comparator {
            self.order_comparator = comparator;
        }
        if let Some(collation) = options.collation {
            self.order_comparator = collation.into();
        }
        if let Some(strategy) = options.advisory_lock_strategy {
            self.advisory_lock_strategy = strategy;
        }
        if options.advisory_lock == Some(false) {
            self.advisory_lock_strategy = AdvisoryLockStrategy::Disabled;
        }
        self
    }

    /// Human-readable Rust struct name for the entity.
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Where new nodes land among their siblings.
    pub fn insert_policy(&self) -> InsertPolicy {
        self.insert_policy
    }

    /// Comparator used by [`InsertPolicy::Alphabetical`].
    pub fn order_comparator(&self) -> &OrderComparator {
        &self.order_comparator
    }

    /// Advisory lock strategy (PostgreSQL only).
    pub fn advisory_lock_strategy(&self) -> &AdvisoryLockStrategy {
        &self.advisory_lock_strategy
    }
}

/// Builder-style options consumed by the derive macro, also loadable from JSON.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NestedSetOptions {
    insert_policy: Option<InsertPolicy>,
    collation: Option<Collation>,
    advisory_lock: Option<bool>,
    #[serde(skip)]
    order_comparator: Option<OrderComparator>,
    #[serde(skip)]
    advisory_lock_strategy: Option<AdvisoryLockStrategy>,
}

impl NestedSetOptions {
    /// Parse options such as `{"insert_policy": "last", "collation": "case_insensitive"}`.
    pub fn from_json(raw: &str) -> Result<Self, NestedSetError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn insert_policy(mut self, policy: InsertPolicy) -> Self {
        self.insert_policy = Some(policy);
        self
    }

    pub fn order_comparator(mut self, comparator: OrderComparator) -> Self {
        self.order_comparator = Some(comparator);
        self
    }

    pub fn advisory_lock_strategy(mut self, strategy: AdvisoryLockStrategy) -> Self {
        self.advisory_lock_strategy = Some(strategy);
        self
    }

    pub fn apply(self, base: NestedSetConfig) -> NestedSetConfig {
        base.apply_options(self)
    }
}

/// Position given to a new node among its siblings.
///
/// The policy bound to a model should never change once rows exist: switching
/// it does not re-sort existing siblings, it only affects later insertions.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum InsertPolicy {
    First,
    Last,
    #[default]
    Alphabetical,
}

impl InsertPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertPolicy::First => "first",
            InsertPolicy::Last => "last",
            InsertPolicy::Alphabetical => "alphabetical",
        }
    }
}

impl FromStr for InsertPolicy {
    type Err = NestedSetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "alphabetical" | "alphabetically" => Ok(Self::Alphabetical),
            other => Err(NestedSetError::InvalidPolicy(other.to_owned())),
        }
    }
}

impl TryFrom<String> for InsertPolicy {
    type Error = NestedSetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InsertPolicy> for String {
    fn from(policy: InsertPolicy) -> Self {
        policy.as_str().to_owned()
    }
}

impl fmt::Display for InsertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in comparators selectable from configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collation {
    Binary,
    CaseInsensitive,
}

impl From<Collation> for OrderComparator {
    fn from(collation: Collation) -> Self {
        match collation {
            Collation::Binary => OrderComparator::Lexicographic,
            Collation::CaseInsensitive => OrderComparator::CaseInsensitive,
        }
    }
}

type CompareFn = dyn Fn(&str, &str) -> Ordering + Send + Sync;

/// Total order over sibling order keys.
#[derive(Clone, Default)]
pub enum OrderComparator {
    /// Byte-wise comparison.
    #[default]
    Lexicographic,
    /// Unicode lowercase comparison, falling back to byte-wise on ties.
    CaseInsensitive,
    Custom(Arc<CompareFn>),
}

impl OrderComparator {
    pub fn custom<F>(compare: F) -> Self
    where
        F: Fn(&str, &str) -> Ordering + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(compare))
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            OrderComparator::Lexicographic => a.cmp(b),
            OrderComparator::CaseInsensitive => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            OrderComparator::Custom(compare) => compare(a, b),
        }
    }
}

impl fmt::Debug for OrderComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderComparator::Lexicographic => f.write_str("Lexicographic"),
            OrderComparator::CaseInsensitive => f.write_str("CaseInsensitive"),
            OrderComparator::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Key used for PostgreSQL advisory locks.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct AdvisoryLockKey(String);

impl AdvisoryLockKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn derived_from(entity: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(entity.as_bytes());
        let crc = hasher.finalize();
        Self(format!("nested-set::{entity}::{crc:x}"))
    }
}

/// Configuration describing how tree mutations are serialised.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AdvisoryLockStrategy {
    Disabled,
    Namespaced(AdvisoryLockKey),
}

impl AdvisoryLockStrategy {
    pub fn key(&self) -> Option<&AdvisoryLockKey> {
        match self {
            AdvisoryLockStrategy::Disabled => None,
            AdvisoryLockStrategy::Namespaced(key) => Some(key),
        }
    }
}
