use std::collections::HashMap;
use std::marker::PhantomData;

use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseTransaction, TransactionTrait};
use tracing::{debug, info, warn};

use crate::children;
use crate::config::{InsertPolicy, NestedSetConfig, NestedSetOptions};
use crate::error::NestedSetError;
use crate::interval::{check_forest, Interval, Relocation, Shift, TargetInterval, Threshold};
use crate::lock::AtomicUnit;
use crate::placement::{compute_placement, root_placement};
use crate::store::{ensure_single_key, ensure_supported, IntervalStore};
use crate::traits::NestedSetModel;

/// Repository exposing the nested-set operations for a given model.
///
/// Every mutating operation runs as one [`AtomicUnit`]. Pass a
/// `DatabaseConnection` to have the operation commit on its own, or a
/// `DatabaseTransaction` to compose it into a larger unit that the caller
/// commits.
///
/// [`insert`](Self::insert), [`move_branch`](Self::move_branch) and
/// [`delete_descendants`](Self::delete_descendants) leave the tree in an
/// intermediate state until the host has written its own row, so they only
/// accept the host's transaction. The host commits after its write, or rolls
/// back to undo both.
pub struct NestedSetRepository<M>
where
    M: NestedSetModel,
{
    config: NestedSetConfig,
    _marker: PhantomData<M>,
}

impl<M> Default for NestedSetRepository<M>
where
    M: NestedSetModel,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for NestedSetRepository<M>
where
    M: NestedSetModel,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NestedSetRepository")
            .field("config", &self.config)
            .finish()
    }
}

impl<M> NestedSetRepository<M>
where
    M: NestedSetModel,
{
    pub fn new() -> Self {
        Self::with_config(M::nested_set_config().clone())
    }

    /// Overlay `options` on the model's static configuration.
    pub fn with_options(options: NestedSetOptions) -> Self {
        Self::with_config(options.apply(M::nested_set_config().clone()))
    }

    pub fn with_config(config: NestedSetConfig) -> Self {
        Self {
            config,
            _marker: PhantomData,
        }
    }

    pub fn config(&self) -> &NestedSetConfig {
        &self.config
    }

    async fn begin<C>(&self, conn: &C) -> Result<AtomicUnit, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        ensure_supported(conn)?;
        AtomicUnit::begin(self.config.advisory_lock_strategy(), conn).await
    }

    /// Number a candidate before its first persistence.
    ///
    /// Makes room in the table and writes the new interval into `candidate`.
    /// The host inserts the row in `txn` afterwards. Returns `None` without
    /// touching the table when the candidate already carries a usable
    /// interval. On failure the candidate stays unnumbered.
    pub async fn insert(
        &self,
        txn: &DatabaseTransaction,
        candidate: &mut M::ActiveModel,
    ) -> Result<Option<Interval>, NestedSetError> {
        if Self::is_numbered(candidate) {
            debug!(entity = self.config.entity_name(), "candidate already numbered");
            return Ok(None);
        }

        let unit = self.begin(txn).await?;
        let result = self.make_room(unit.connection(), candidate).await;
        let interval = unit.finish(result).await?;
        M::set_interval(candidate, interval);
        Ok(Some(interval))
    }

    /// Number `candidate` and insert its row in the same atomic unit.
    pub async fn create<C>(&self, conn: &C, candidate: M::ActiveModel) -> Result<M, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let unit = self.begin(conn).await?;
        let result = self.create_on(unit.connection(), candidate).await;
        unit.finish(result).await
    }

    async fn create_on<C>(&self, conn: &C, mut candidate: M::ActiveModel) -> Result<M, NestedSetError>
    where
        C: ConnectionTrait,
    {
        if !Self::is_numbered(&candidate) {
            let interval = self.make_room(conn, &candidate).await?;
            M::set_interval(&mut candidate, interval);
        }
        let model = candidate.insert(conn).await?;
        Ok(model)
    }

    fn is_numbered(candidate: &M::ActiveModel) -> bool {
        M::draft_interval(candidate).is_some_and(|interval| interval.is_well_formed())
    }

    async fn make_room<C>(
        &self,
        conn: &C,
        candidate: &M::ActiveModel,
    ) -> Result<Interval, NestedSetError>
    where
        C: ConnectionTrait,
    {
        let store = IntervalStore::<M, C>::new(conn);
        let target = match M::draft_parent_id(candidate) {
            Some(parent_id) => {
                let parent = store
                    .find_by_id(&parent_id)
                    .await?
                    .ok_or_else(|| NestedSetError::InvalidParent(format!("{parent_id:?}")))?;
                self.placement_under(conn, &parent, candidate).await?
            }
            None => root_placement(store.max_right().await?),
        };

        for shift in target.shifts() {
            store.shift(&shift).await?;
        }

        let interval = target.interval();
        debug!(
            entity = self.config.entity_name(),
            policy = %self.config.insert_policy(),
            threshold = ?target.threshold,
            interval = %interval,
            "numbered new node"
        );
        Ok(interval)
    }

    async fn placement_under<C>(
        &self,
        conn: &C,
        parent: &M,
        candidate: &M::ActiveModel,
    ) -> Result<TargetInterval, NestedSetError>
    where
        C: ConnectionTrait,
    {
        let policy = self.config.insert_policy();
        let siblings = match policy {
            InsertPolicy::Alphabetical => self.children_on(conn, parent, false).await?,
            InsertPolicy::First | InsertPolicy::Last => Vec::new(),
        };
        let keyed: Vec<(Interval, &str)> = siblings
            .iter()
            .map(|sibling| (sibling.interval(), sibling.order_key()))
            .collect();
        let key = M::draft_order_key(candidate).unwrap_or_default();

        Ok(compute_placement(
            parent.interval(),
            policy,
            &keyed,
            &key,
            self.config.order_comparator(),
        ))
    }

    /// Delete every descendant of `node` and close the gap they leave.
    ///
    /// The node's own row is left for the host to delete in `txn`. Returns the
    /// number of descendant rows deleted.
    pub async fn delete_descendants(
        &self,
        txn: &DatabaseTransaction,
        node: &M,
    ) -> Result<u64, NestedSetError> {
        let unit = self.begin(txn).await?;
        let result = self.delete_on(unit.connection(), node, false).await;
        unit.finish(result).await
    }

    /// Delete `node` together with its subtree.
    pub async fn remove<C>(&self, conn: &C, node: &M) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let unit = self.begin(conn).await?;
        let result = self.delete_on(unit.connection(), node, true).await;
        unit.finish(result).await
    }

    async fn delete_on<C>(&self, conn: &C, node: &M, include_self: bool) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait,
    {
        let store = IntervalStore::<M, C>::new(conn);
        let current = store.require(&node.id()).await?.interval();

        let removed = store.delete_inside(current).await?;
        let expected = i64::from(current.descendant_count());
        if removed as i64 != expected {
            warn!(
                entity = self.config.entity_name(),
                interval = %current,
                removed,
                expected,
                "descendant count mismatch"
            );
            return Err(NestedSetError::corruption(format!(
                "deleting inside {current} removed {removed} rows, expected {expected}"
            )));
        }

        if include_self {
            store.delete_node(&node.id()).await?;
        }
        for shift in Shift::pair(Threshold::Above(current.right), -current.width()) {
            store.shift(&shift).await?;
        }

        debug!(
            entity = self.config.entity_name(),
            interval = %current,
            removed,
            "closed subtree gap"
        );
        Ok(removed)
    }

    /// Re-splice `node` after its parent reference changed from
    /// `previous_parent` to `node.parent_id()`.
    ///
    /// The host has already saved the new parent reference in `txn`. The
    /// subtree becomes the last child of the new parent, or the last root when
    /// the new parent is `None`. Returns the number of rows updated.
    pub async fn move_branch(
        &self,
        txn: &DatabaseTransaction,
        node: &M,
        previous_parent: Option<M::Id>,
    ) -> Result<u64, NestedSetError> {
        let new_parent = node.parent_id();
        if new_parent == previous_parent {
            return Ok(0);
        }

        let unit = self.begin(txn).await?;
        let result = async {
            let store = IntervalStore::<M, _>::new(unit.connection());
            let current = store.require(&node.id()).await?;
            self.relocate_on(unit.connection(), &current, new_parent.as_ref())
                .await
        }
        .await;
        unit.finish(result).await
    }

    /// Point `node` at `new_parent` and relocate its subtree in one unit.
    pub async fn move_to<C>(
        &self,
        conn: &C,
        node: &M,
        new_parent: Option<M::Id>,
    ) -> Result<M, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let unit = self.begin(conn).await?;
        let result = self.move_to_on(unit.connection(), node, new_parent).await;
        unit.finish(result).await
    }

    async fn move_to_on<C>(
        &self,
        conn: &C,
        node: &M,
        new_parent: Option<M::Id>,
    ) -> Result<M, NestedSetError>
    where
        C: ConnectionTrait,
    {
        let store = IntervalStore::<M, C>::new(conn);
        let current = store.require(&node.id()).await?;
        if current.parent_id() != new_parent {
            self.relocate_on(conn, &current, new_parent.as_ref()).await?;
            store.set_parent(&current.id(), new_parent.as_ref()).await?;
        }
        store.require(&current.id()).await
    }

    async fn relocate_on<C>(
        &self,
        conn: &C,
        current: &M,
        new_parent: Option<&M::Id>,
    ) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait,
    {
        let store = IntervalStore::<M, C>::new(conn);
        let new_right = match new_parent {
            Some(parent_id) => {
                store
                    .find_by_id(parent_id)
                    .await?
                    .ok_or_else(|| NestedSetError::InvalidParent(format!("{parent_id:?}")))?
                    .interval()
                    .right
            }
            None => store.max_right().await? + 1,
        };

        let plan = Relocation::plan(current.interval(), new_right)?;
        store.relocate(&plan).await
    }

    pub async fn find<C>(&self, conn: &C, id: &M::Id) -> Result<Option<M>, NestedSetError>
    where
        C: ConnectionTrait,
    {
        ensure_supported(conn)?;
        IntervalStore::<M, C>::new(conn).find_by_id(id).await
    }

    /// Direct children of `node` ordered by left value, optionally preceded by
    /// the node itself. Always reads the current table state.
    pub async fn direct_children<C>(
        &self,
        conn: &C,
        node: &M,
        include_self: bool,
    ) -> Result<Vec<M>, NestedSetError>
    where
        C: ConnectionTrait,
    {
        ensure_supported(conn)?;
        self.children_on(conn, node, include_self).await
    }

    async fn children_on<C>(
        &self,
        conn: &C,
        node: &M,
        include_self: bool,
    ) -> Result<Vec<M>, NestedSetError>
    where
        C: ConnectionTrait,
    {
        ensure_single_key::<M>()?;
        let store = IntervalStore::<M, C>::new(conn);
        let current = store.require(&node.id()).await?.interval();
        let rows = store.within(current).await?;
        Ok(children::direct_children(rows, include_self, |row| row.interval()))
    }

    /// Innermost enclosing node, or `None` for a root.
    pub async fn parent<C>(&self, conn: &C, node: &M) -> Result<Option<M>, NestedSetError>
    where
        C: ConnectionTrait,
    {
        let mut ancestors = self.ancestors(conn, node).await?;
        Ok(ancestors.pop())
    }

    /// Enclosing nodes from the root down to the direct parent.
    pub async fn ancestors<C>(&self, conn: &C, node: &M) -> Result<Vec<M>, NestedSetError>
    where
        C: ConnectionTrait,
    {
        ensure_supported(conn)?;
        let store = IntervalStore::<M, C>::new(conn);
        let current = store.require(&node.id()).await?.interval();
        store.containing(current).await
    }

    /// The subtree below `node` in left order, `node` excluded.
    pub async fn descendants<C>(&self, conn: &C, node: &M) -> Result<Vec<M>, NestedSetError>
    where
        C: ConnectionTrait,
    {
        ensure_supported(conn)?;
        let store = IntervalStore::<M, C>::new(conn);
        let current = store.require(&node.id()).await?.interval();
        store.inside(current).await
    }

    /// The whole subtree in left order, `node` first.
    pub async fn self_and_descendants<C>(
        &self,
        conn: &C,
        node: &M,
    ) -> Result<Vec<M>, NestedSetError>
    where
        C: ConnectionTrait,
    {
        ensure_supported(conn)?;
        let store = IntervalStore::<M, C>::new(conn);
        let current = store.require(&node.id()).await?.interval();
        store.within(current).await
    }

    /// Nodes not enclosed by any other node, in left order.
    pub async fn roots<C>(&self, conn: &C) -> Result<Vec<M>, NestedSetError>
    where
        C: ConnectionTrait,
    {
        ensure_supported(conn)?;
        let rows = IntervalStore::<M, C>::new(conn).all().await?;
        let mut boundary = i32::MIN;
        let mut roots = Vec::new();
        for row in rows {
            let interval = row.interval();
            if interval.left > boundary {
                boundary = interval.right;
                roots.push(row);
            }
        }
        Ok(roots)
    }

    /// Check every stored interval for the nested-set invariants.
    pub async fn verify<C>(&self, conn: &C) -> Result<(), NestedSetError>
    where
        C: ConnectionTrait,
    {
        ensure_supported(conn)?;
        let rows = IntervalStore::<M, C>::new(conn).all().await?;
        let intervals: Vec<Interval> = rows.iter().map(|row| row.interval()).collect();
        check_forest(&intervals)
    }

    /// Renumber the whole table from parent references.
    ///
    /// Siblings keep their current left order, except under
    /// [`InsertPolicy::Alphabetical`] where they are sorted by order key.
    /// Returns the number of rows whose interval changed.
    pub async fn rebuild<C>(&self, conn: &C) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let unit = self.begin(conn).await?;
        let result = self.rebuild_on(unit.connection()).await;
        unit.finish(result).await
    }

    async fn rebuild_on<C>(&self, conn: &C) -> Result<u64, NestedSetError>
    where
        C: ConnectionTrait,
    {
        let store = IntervalStore::<M, C>::new(conn);
        let rows = store.all().await?;
        let numbered = self.renumber(&rows)?;

        let mut changed = 0;
        for (row, interval) in rows.iter().zip(numbered) {
            if row.interval() != interval {
                store.assign(&row.id(), interval).await?;
                changed += 1;
            }
        }

        info!(
            entity = self.config.entity_name(),
            rows = rows.len(),
            changed,
            "rebuilt nested-set intervals"
        );
        Ok(changed)
    }

    fn renumber(&self, rows: &[M]) -> Result<Vec<Interval>, NestedSetError> {
        let index: HashMap<M::Id, usize> = rows
            .iter()
            .enumerate()
            .map(|(position, row)| (row.id(), position))
            .collect();

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
        let mut roots = Vec::new();
        for (position, row) in rows.iter().enumerate() {
            match row.parent_id().and_then(|parent| index.get(&parent).copied()) {
                Some(parent) => children[parent].push(position),
                None => roots.push(position),
            }
        }

        if self.config.insert_policy() == InsertPolicy::Alphabetical {
            let comparator = self.config.order_comparator();
            for siblings in &mut children {
                siblings.sort_by(|a, b| {
                    comparator.compare(rows[*a].order_key(), rows[*b].order_key())
                });
            }
        }

        let mut next = 1;
        let mut lefts = vec![0; rows.len()];
        let mut numbered: Vec<Option<Interval>> = vec![None; rows.len()];
        for root in roots {
            let mut stack = vec![(root, false)];
            while let Some((position, closing)) = stack.pop() {
                if closing {
                    numbered[position] = Some(Interval::new(lefts[position], next));
                    next += 1;
                    continue;
                }
                lefts[position] = next;
                next += 1;
                stack.push((position, true));
                for child in children[position].iter().rev() {
                    stack.push((*child, false));
                }
            }
        }

        numbered
            .into_iter()
            .zip(rows)
            .map(|(interval, row)| {
                interval.ok_or_else(|| {
                    NestedSetError::corruption(format!(
                        "node {:?} is not reachable from any root (parent cycle)",
                        row.id()
                    ))
                })
            })
            .collect()
    }
}
