//! Person entity - Represents a payer profile.
//!
//! Each person has identity and contact details, an expected periodic payment
//! amount, and an advisory collection frequency. People are soft-deleted via
//! the `is_active` flag so historical cycles and collections stay reportable.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Person database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "people")]
pub struct Model {
    /// Unique identifier for the person
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name of the person
    pub name: String,
    /// Contact phone number, if known
    pub phone: Option<String>,
    /// Free-form location / address, if known
    pub location: Option<String>,
    /// Path to a stored profile photo, if any
    pub photo_path: Option<String>,
    /// Expected payment amount per collection visit
    pub default_amount: f64,
    /// Advisory collection frequency: `"daily"`, `"weekly"`, or `"custom"`.
    /// Never enforced by the ledger engine.
    pub frequency: String,
    /// Free-form notes
    pub notes: Option<String>,
    /// Soft delete flag - if false, person is hidden but history is preserved
    pub is_active: bool,
    /// When the person was registered
    pub created_at: DateTimeUtc,
    /// When the person record was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Person and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One person has many cycles (one active at a time)
    #[sea_orm(has_many = "super::cycle::Entity")]
    Cycles,
    /// One person has many daily collection records
    #[sea_orm(has_many = "super::collection::Entity")]
    Collections,
    /// One person has many withdrawal records
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawals,
}

impl Related<super::cycle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cycles.def()
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
