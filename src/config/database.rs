//! Database configuration module for `DailyBook`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! It provides functions for establishing database connections and creating all necessary
//! tables based on the entity definitions. The module uses `SeaORM`'s
//! `Schema::create_table_from_entity` method to generate SQL statements from the entity
//! models, ensuring the database schema matches the Rust struct definitions without
//! requiring manual SQL. The one piece of schema the entities cannot express is the
//! unique `(person_id, date)` index on collections, created separately below.

use crate::entities::{Collection, Cycle, Person, Setting, Withdrawal, collection};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityName, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/dailybook.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL`
/// environment variable, falling back to a default local `SQLite` file.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from
/// entity definitions, plus the unique index enforcing at most one collection
/// row per `(person_id, date)`.
///
/// Safe to call on every startup: all statements are `IF NOT EXISTS`.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut person_table = schema.create_table_from_entity(Person);
    let mut cycle_table = schema.create_table_from_entity(Cycle);
    let mut collection_table = schema.create_table_from_entity(Collection);
    let mut withdrawal_table = schema.create_table_from_entity(Withdrawal);
    let mut setting_table = schema.create_table_from_entity(Setting);

    db.execute(builder.build(person_table.if_not_exists())).await?;
    db.execute(builder.build(cycle_table.if_not_exists())).await?;
    db.execute(builder.build(collection_table.if_not_exists())).await?;
    db.execute(builder.build(withdrawal_table.if_not_exists())).await?;
    db.execute(builder.build(setting_table.if_not_exists())).await?;

    // One row per person per calendar day; upserts rely on this.
    let person_date_index = Index::create()
        .name("idx_collections_person_date")
        .table(Collection.table_ref())
        .col(collection::Column::PersonId)
        .col(collection::Column::Date)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&person_date_index)).await?;

    Ok(())
}
