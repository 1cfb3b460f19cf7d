#![allow(dead_code)]

use nested_set::NestedSetModel;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbBackend, QueryOrder, Statement};

pub mod entity {
    /// Siblings kept in order-key order.
    pub mod category {
        use nested_set::NestedSetModelDerive as NestedSetModel;
        use sea_orm::entity::prelude::*;
        use sea_orm::Set;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
        #[sea_orm(table_name = "nodes")]
        #[nested_set(insert_policy = "alphabetical")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub parent_id: Option<i32>,
            pub name: String,
            pub lft: i32,
            pub rgt: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}

        pub fn draft(name: &str, parent: Option<i32>) -> ActiveModel {
            ActiveModel {
                name: Set(name.to_owned()),
                parent_id: Set(parent),
                ..Default::default()
            }
        }
    }

    /// New children are appended.
    pub mod menu_item {
        use nested_set::NestedSetModelDerive as NestedSetModel;
        use sea_orm::entity::prelude::*;
        use sea_orm::Set;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
        #[sea_orm(table_name = "nodes")]
        #[nested_set(insert_policy = "last", entity_name = "MenuItem")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub parent_id: Option<i32>,
            pub name: String,
            pub lft: i32,
            pub rgt: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}

        pub fn draft(name: &str, parent: Option<i32>) -> ActiveModel {
            ActiveModel {
                name: Set(name.to_owned()),
                parent_id: Set(parent),
                ..Default::default()
            }
        }
    }

    /// New children are prepended.
    pub mod stack_entry {
        use nested_set::NestedSetModelDerive as NestedSetModel;
        use sea_orm::entity::prelude::*;
        use sea_orm::Set;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
        #[sea_orm(table_name = "nodes")]
        #[nested_set(insert_policy = "first")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub parent_id: Option<i32>,
            pub name: String,
            pub lft: i32,
            pub rgt: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}

        pub fn draft(name: &str, parent: Option<i32>) -> ActiveModel {
            ActiveModel {
                name: Set(name.to_owned()),
                parent_id: Set(parent),
                ..Default::default()
            }
        }
    }

    /// Composite primary key; the engine refuses to enumerate it.
    pub mod tagged_node {
        use nested_set::NestedSetModelDerive as NestedSetModel;
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel, NestedSetModel)]
        #[sea_orm(table_name = "tagged_nodes")]
        #[nested_set(left_field = "left_no", right_field = "right_no", order_field = "label")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub tree_id: i32,
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: i32,
            pub parent_id: Option<i32>,
            pub label: String,
            pub left_no: i32,
            pub right_no: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::{category, menu_item, stack_entry};

/// Models sharing the `nodes` table, one per insert policy.
pub trait TestNode: NestedSetModel<Id = i32> {
    fn draft(name: &str, parent: Option<i32>) -> Self::ActiveModel;
}

impl TestNode for category::Model {
    fn draft(name: &str, parent: Option<i32>) -> category::ActiveModel {
        category::draft(name, parent)
    }
}

impl TestNode for menu_item::Model {
    fn draft(name: &str, parent: Option<i32>) -> menu_item::ActiveModel {
        menu_item::draft(name, parent)
    }
}

impl TestNode for stack_entry::Model {
    fn draft(name: &str, parent: Option<i32>) -> stack_entry::ActiveModel {
        stack_entry::draft(name, parent)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Fresh in-memory SQLite database with the `nodes` table.
pub async fn setup_database() -> Result<DatabaseConnection, DbErr> {
    init_tracing();

    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options).await?;

    db.execute(Statement::from_string(
        DbBackend::Sqlite,
        r#"
        CREATE TABLE nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER,
            name TEXT NOT NULL,
            lft INTEGER NOT NULL,
            rgt INTEGER NOT NULL
        );
        "#,
    ))
    .await?;

    Ok(db)
}

/// Every row as `(name, lft, rgt)`, ordered by `lft`.
pub async fn intervals(db: &DatabaseConnection) -> Result<Vec<(String, i32, i32)>, DbErr> {
    let rows = category::Entity::find()
        .order_by_asc(category::Column::Lft)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| (row.name, row.lft, row.rgt))
        .collect())
}

/// Every row, ordered by id.
pub async fn snapshot(db: &DatabaseConnection) -> Result<Vec<category::Model>, DbErr> {
    category::Entity::find()
        .order_by_asc(category::Column::Id)
        .all(db)
        .await
}

pub async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(DbBackend::Sqlite, sql.to_owned()))
        .await?;
    Ok(())
}

pub fn names<M>(rows: &[M], name: impl Fn(&M) -> &str) -> Vec<String> {
    rows.iter().map(|row| name(row).to_owned()).collect()
}
