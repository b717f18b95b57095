//! Withdrawal entity - An immutable settlement record.
//!
//! Created when funds are removed from a cycle's running total, either the
//! full balance (which closes the cycle) or a partial amount (which leaves
//! the cycle open). Withdrawal rows are append-only: never mutated or
//! deleted by ledger operations.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Withdrawal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    /// Unique identifier for the withdrawal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the person the funds were collected from
    pub person_id: i64,
    /// ID of the cycle the funds were withdrawn from
    pub cycle_id: i64,
    /// Amount withdrawn
    pub amount: f64,
    /// Date of the withdrawal
    pub date: Date,
    /// Free-form notes (e.g. the settled date range for partial withdrawals)
    pub notes: Option<String>,
}

/// Defines relationships between Withdrawal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each withdrawal belongs to one person
    #[sea_orm(
        belongs_to = "super::person::Entity",
        from = "Column::PersonId",
        to = "super::person::Column::Id"
    )]
    Person,
    /// Each withdrawal belongs to one cycle
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
