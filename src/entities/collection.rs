//! Collection entity - One calendar day's recorded outcome for a person.
//!
//! A row is either a collected amount or a skip; "pending" is a derived view
//! value and is never stored. At most one row exists per `(person_id, date)`;
//! re-recording the same date replaces the prior row (upsert semantics).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored status of a collected day
pub const STATUS_COLLECTED: &str = "collected";
/// Stored status of a skipped day
pub const STATUS_SKIPPED: &str = "skipped";

/// Collection database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "collections")]
pub struct Model {
    /// Unique identifier for the collection record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the person this record belongs to
    pub person_id: i64,
    /// ID of the cycle this record accrues into
    pub cycle_id: i64,
    /// Calendar day this record covers; unique per person
    pub date: Date,
    /// Collected amount; None for skipped days
    pub amount: Option<f64>,
    /// `"collected"` or `"skipped"` - never `"pending"`
    pub status: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// When the record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Collection and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each collection belongs to one person
    #[sea_orm(
        belongs_to = "super::person::Entity",
        from = "Column::PersonId",
        to = "super::person::Column::Id"
    )]
    Person,
    /// Each collection belongs to one cycle
    #[sea_orm(
        belongs_to = "super::cycle::Entity",
        from = "Column::CycleId",
        to = "super::cycle::Column::Id"
    )]
    Cycle,
}

impl Related<super::person::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Person.def()
    }
}

impl Related<super::cycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cycle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
