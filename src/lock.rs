use sea_orm::{
    ConnectionTrait, DatabaseTransaction, DbBackend, Statement, TransactionTrait, Value,
};
use tracing::{debug, warn};

use crate::config::AdvisoryLockStrategy;
use crate::error::NestedSetError;

/// One atomic unit of tree mutation.
///
/// Opened with `begin()` on whatever connection the caller hands in. On a
/// plain connection that starts a transaction; on a caller-owned
/// [`DatabaseTransaction`] it opens a savepoint, so committing the unit never
/// commits the caller's transaction.
pub struct AtomicUnit {
    txn: DatabaseTransaction,
}

impl AtomicUnit {
    pub async fn begin<C>(strategy: &AdvisoryLockStrategy, conn: &C) -> Result<Self, NestedSetError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = conn.begin().await?;

        if let Some(key) = strategy.key() {
            if txn.get_database_backend() == DbBackend::Postgres {
                if let Err(err) = acquire_lock(&txn, key.as_str()).await {
                    let _ = txn.rollback().await;
                    return Err(err);
                }
            }
        }

        Ok(Self { txn })
    }

    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    pub async fn commit(self) -> Result<(), NestedSetError> {
        self.txn.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), NestedSetError> {
        self.txn.rollback().await?;
        Ok(())
    }

    /// Commit when `result` is `Ok`, roll back otherwise.
    pub async fn finish<T>(self, result: Result<T, NestedSetError>) -> Result<T, NestedSetError> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "rolling back nested-set mutation");
                if let Err(rollback_err) = self.rollback().await {
                    debug!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

// Transaction-scoped: released by the outermost commit or rollback.
async fn acquire_lock(txn: &DatabaseTransaction, key: &str) -> Result<(), NestedSetError> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1))",
        vec![Value::from(key)],
    ))
    .await?;
    Ok(())
}
