//! SeaORM-backed interval store.
//!
//! Translates [`Shift`] and [`Relocation`] plans into single bulk statements.
//! PostgreSQL and SQLite evaluate every `SET` expression and the `WHERE`
//! clause against the pre-update row, which the relocation update relies on.

use std::marker::PhantomData;

use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbBackend, EntityTrait, Iterable, QueryFilter,
    QueryOrder,
};
use tracing::debug;

use crate::error::NestedSetError;
use crate::interval::{Interval, Relocation, Shift, Side, Threshold};
use crate::traits::NestedSetModel;

/// Reject backends whose `UPDATE` semantics the engine cannot rely on.
pub fn ensure_supported(conn: &impl ConnectionTrait) -> Result<(), NestedSetError> {
    match conn.get_database_backend() {
        DbBackend::Postgres | DbBackend::Sqlite => Ok(()),
        other => Err(NestedSetError::UnsupportedBackend(other)),
    }
}

/// The engine needs a single-column primary key to address rows.
pub fn ensure_single_key<M: NestedSetModel>() -> Result<(), NestedSetError> {
    let keys = <<M::Entity as EntityTrait>::PrimaryKey as Iterable>::iter().count();
    if keys == 1 {
        Ok(())
    } else {
        Err(NestedSetError::UnsupportedKeySchema(keys))
    }
}

/// Table access for one nested-set model over one connection.
pub struct IntervalStore<'c, M, C> {
    conn: &'c C,
    _marker: PhantomData<M>,
}

impl<'c, M, C> IntervalStore<'c, M, C>
where
    M: NestedSetModel,
    C: ConnectionTrait,
{
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            _marker: PhantomData,
        }
    }

    fn column(side: Side) -> <M::Entity as EntityTrait>::Column {
        match side {
            Side::Left => M::left_column(),
            Side::Right => M::right_column(),
        }
    }

    pub async fn find_by_id(&self, id: &M::Id) -> Result<Option<M>, NestedSetError> {
        let model = M::Entity::find()
            .filter(M::id_column().eq(M::id_to_value(id)))
            .one(self.conn)
            .await?;
        Ok(model)
    }

    /// Like [`find_by_id`](Self::find_by_id) but a missing row is an error.
    pub async fn require(&self, id: &M::Id) -> Result<M, NestedSetError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| NestedSetError::NodeNotFound(format!("{id:?}")))
    }

    pub async fn shift(&self, shift: &Shift) -> Result<u64, NestedSetError> {
        let column = Self::column(shift.side);
        let predicate = match shift.threshold {
            Threshold::Above(pivot) => column.gt(pivot),
            Threshold::AtLeast(pivot) => column.gte(pivot),
        };

        let result = M::Entity::update_many()
            .col_expr(column, Expr::col(column).add(shift.delta))
            .filter(predicate)
            .exec(self.conn)
            .await?;

        debug!(
            side = ?shift.side,
            threshold = ?shift.threshold,
            delta = shift.delta,
            rows = result.rows_affected,
            "shifted intervals"
        );
        Ok(result.rows_affected)
    }

    // Descendants of `interval`: left strictly between its bounds.
    fn strictly_inside(interval: Interval) -> Condition {
        Condition::all()
            .add(M::left_column().gt(interval.left))
            .add(M::left_column().lt(interval.right))
    }

    /// Delete every row whose left value lies strictly inside `interval`.
    pub async fn delete_inside(&self, interval: Interval) -> Result<u64, NestedSetError> {
        let result = M::Entity::delete_many()
            .filter(Self::strictly_inside(interval))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete_node(&self, id: &M::Id) -> Result<u64, NestedSetError> {
        let result = M::Entity::delete_many()
            .filter(M::id_column().eq(M::id_to_value(id)))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    fn offset_expr(plan: &Relocation, side: Side) -> SimpleExpr {
        let column = Self::column(side);
        let (low, high) = plan.displaced;
        let offset = Expr::case(
            Expr::col(column).between(plan.moving.left, plan.moving.right),
            plan.moving_offset,
        )
        .case(Expr::col(column).between(low, high), plan.displaced_offset)
        .finally(0);

        Expr::col(column).add(offset)
    }

    /// Apply a relocation as one `UPDATE` over both interval columns.
    pub async fn relocate(&self, plan: &Relocation) -> Result<u64, NestedSetError> {
        let (low, high) = plan.window;
        let result = M::Entity::update_many()
            .col_expr(M::left_column(), Self::offset_expr(plan, Side::Left))
            .col_expr(M::right_column(), Self::offset_expr(plan, Side::Right))
            .filter(
                M::left_column()
                    .between(low, high)
                    .or(M::right_column().between(low, high)),
            )
            .exec(self.conn)
            .await?;

        debug!(
            moving = %plan.moving,
            destination = %plan.destination(),
            rows = result.rows_affected,
            "relocated subtree"
        );
        Ok(result.rows_affected)
    }

    pub async fn set_parent(
        &self,
        id: &M::Id,
        parent: Option<&M::Id>,
    ) -> Result<u64, NestedSetError> {
        let result = M::Entity::update_many()
            .col_expr(M::parent_column(), Expr::value(M::parent_to_value(parent)))
            .filter(M::id_column().eq(M::id_to_value(id)))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn assign(&self, id: &M::Id, interval: Interval) -> Result<u64, NestedSetError> {
        let result = M::Entity::update_many()
            .col_expr(M::left_column(), Expr::value(interval.left))
            .col_expr(M::right_column(), Expr::value(interval.right))
            .filter(M::id_column().eq(M::id_to_value(id)))
            .exec(self.conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Rows whose left value lies within `interval` (bounds included),
    /// ordered by left.
    pub async fn within(&self, interval: Interval) -> Result<Vec<M>, NestedSetError> {
        let rows = M::Entity::find()
            .filter(M::left_column().between(interval.left, interval.right))
            .order_by_asc(M::left_column())
            .all(self.conn)
            .await?;
        Ok(rows)
    }

    /// Rows strictly inside `interval`, ordered by left.
    pub async fn inside(&self, interval: Interval) -> Result<Vec<M>, NestedSetError> {
        let rows = M::Entity::find()
            .filter(Self::strictly_inside(interval))
            .order_by_asc(M::left_column())
            .all(self.conn)
            .await?;
        Ok(rows)
    }

    /// Rows whose interval strictly contains `interval`, outermost first.
    pub async fn containing(&self, interval: Interval) -> Result<Vec<M>, NestedSetError> {
        let rows = M::Entity::find()
            .filter(M::left_column().lt(interval.left))
            .filter(M::right_column().gt(interval.right))
            .order_by_asc(M::left_column())
            .all(self.conn)
            .await?;
        Ok(rows)
    }

    pub async fn all(&self) -> Result<Vec<M>, NestedSetError> {
        let rows = M::Entity::find()
            .order_by_asc(M::left_column())
            .all(self.conn)
            .await?;
        Ok(rows)
    }

    /// Largest right value in the table, `0` when it is empty.
    pub async fn max_right(&self) -> Result<i32, NestedSetError> {
        let last = M::Entity::find()
            .order_by_desc(M::right_column())
            .one(self.conn)
            .await?;
        Ok(last.map(|model| model.interval().right).unwrap_or(0))
    }
}
