use async_trait::async_trait;
use sea_orm::DatabaseTransaction;

use crate::error::NestedSetError;
use crate::interval::Interval;
use crate::repository::NestedSetRepository;
use crate::traits::NestedSetModel;

/// The three points in a record's lifecycle where the tree must be updated.
///
/// Hosts call these explicitly around their own persistence, inside the
/// transaction that also writes the row. The tree is only consistent again
/// once that row write has happened, so the host commits afterwards. An `Err`
/// means the host must not persist or remove the row and should roll back.
#[async_trait]
pub trait NestedSetHooks<M: NestedSetModel>: Send + Sync {
    /// Before the first insert of `candidate`.
    async fn on_before_persist(
        &self,
        txn: &DatabaseTransaction,
        candidate: &mut M::ActiveModel,
    ) -> Result<Option<Interval>, NestedSetError>;

    /// After `node`'s parent reference was changed from `previous_parent`.
    async fn on_after_parent_changed(
        &self,
        txn: &DatabaseTransaction,
        node: &M,
        previous_parent: Option<M::Id>,
    ) -> Result<u64, NestedSetError>;

    /// Before `node`'s own row is deleted.
    async fn on_before_remove(
        &self,
        txn: &DatabaseTransaction,
        node: &M,
    ) -> Result<u64, NestedSetError>;
}

#[async_trait]
impl<M> NestedSetHooks<M> for NestedSetRepository<M>
where
    M: NestedSetModel,
{
    async fn on_before_persist(
        &self,
        txn: &DatabaseTransaction,
        candidate: &mut M::ActiveModel,
    ) -> Result<Option<Interval>, NestedSetError> {
        self.insert(txn, candidate).await
    }

    async fn on_after_parent_changed(
        &self,
        txn: &DatabaseTransaction,
        node: &M,
        previous_parent: Option<M::Id>,
    ) -> Result<u64, NestedSetError> {
        self.move_branch(txn, node, previous_parent).await
    }

    async fn on_before_remove(
        &self,
        txn: &DatabaseTransaction,
        node: &M,
    ) -> Result<u64, NestedSetError> {
        self.delete_descendants(txn, node).await
    }
}
