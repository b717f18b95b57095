//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod collection;
pub mod cycle;
pub mod person;
pub mod setting;
pub mod withdrawal;

// Re-export specific types to avoid conflicts
pub use collection::{Column as CollectionColumn, Entity as Collection, Model as CollectionModel};
pub use cycle::{Column as CycleColumn, Entity as Cycle, Model as CycleModel};
pub use person::{Column as PersonColumn, Entity as Person, Model as PersonModel};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
pub use withdrawal::{Column as WithdrawalColumn, Entity as Withdrawal, Model as WithdrawalModel};
