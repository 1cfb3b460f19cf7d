use std::fmt::Debug;
use std::hash::Hash;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, EntityTrait, FromQueryResult, IntoActiveModel, Value,
};

use crate::config::NestedSetConfig;
use crate::interval::Interval;

/// Trait implemented by SeaORM `Model` types that are stored as a nested set.
///
/// Implementations are normally provided by the `#[derive(NestedSetModel)]` macro.
/// The `draft_*` accessors read a candidate [`ActiveModel`](Self::ActiveModel)
/// that has not been persisted yet.
pub trait NestedSetModel:
    Clone + Send + Sync + 'static + IntoActiveModel<Self::ActiveModel> + FromQueryResult
{
    type Entity: EntityTrait<Model = Self>;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity> + ActiveModelBehavior + Send + Sync;
    type Id: Clone + Debug + Eq + Hash + Send + Sync + 'static;

    fn nested_set_config() -> &'static NestedSetConfig;

    fn id(&self) -> Self::Id;
    fn parent_id(&self) -> Option<Self::Id>;
    fn interval(&self) -> Interval;
    fn order_key(&self) -> &str;

    fn id_to_value(id: &Self::Id) -> Value;
    fn parent_to_value(parent: Option<&Self::Id>) -> Value;

    fn draft_parent_id(active: &Self::ActiveModel) -> Option<Self::Id>;
    fn draft_interval(active: &Self::ActiveModel) -> Option<Interval>;
    fn draft_order_key(active: &Self::ActiveModel) -> Option<String>;
    fn set_interval(active: &mut Self::ActiveModel, interval: Interval);

    fn id_column() -> <Self::Entity as EntityTrait>::Column;
    fn parent_column() -> <Self::Entity as EntityTrait>::Column;
    fn left_column() -> <Self::Entity as EntityTrait>::Column;
    fn right_column() -> <Self::Entity as EntityTrait>::Column;
}
