//! Cycle entity - The accounting period for one person between withdrawals.
//!
//! A cycle carries the running total of collected-but-not-withdrawn funds.
//! At most one cycle per person may be active at a time; closed cycles are
//! terminal and kept for history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cycle database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cycles")]
pub struct Model {
    /// Unique identifier for the cycle
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the person this cycle belongs to
    pub person_id: i64,
    /// Date the cycle opened
    pub start_date: Date,
    /// Date the cycle closed, None while active
    pub end_date: Option<Date>,
    /// Running balance of collected, not yet withdrawn funds. Never negative;
    /// mutated only by collection, undo, and withdrawal operations.
    pub total_amount: f64,
    /// Whether this is the person's current open cycle
    pub is_active: bool,
    /// Timestamp of the full withdrawal that closed this cycle, if any
    pub withdrawal_date: Option<DateTimeUtc>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Defines relationships between Cycle and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each cycle belongs to one person
    #[sea_orm(
        belongs_to = "super::person::Entity",
        from = "Column::PersonId",
        to = "super::person::Column::Id"
    )]
    Person,
    /// One cycle owns many collection records
    #[sea_orm(has_many = "super::collection::Entity")]
    Collections,
    /// One cycle owns many withdrawal records
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawals,
}

impl Related<super::person::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Person.def()
    }
}

impl Related<super::collection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Collections.def()
    }
}

impl Related<super::withdrawal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
