//! Backup export and destructive restore.
//!
//! The backup file is a JSON dump of every person with their nested cycles,
//! collections and withdrawals. Restore is all-or-nothing: the whole payload
//! is parsed and validated before the first destructive delete, and the
//! replace-all runs inside one database transaction. Identifiers are
//! reassigned on restore and foreign keys re-threaded.

use crate::{
    core::cycle as cycle_ops,
    entities::{
        Collection, Cycle, Person, Setting, Withdrawal, collection,
        collection::{STATUS_COLLECTED, STATUS_SKIPPED},
        cycle, person, setting, withdrawal,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

const LAST_BACKUP_EXPORT_KEY: &str = "last_backup_export";

/// One person's slice of the backup: profile plus full ledger history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonBackup {
    /// The person's profile fields
    #[serde(flatten)]
    pub person: person::Model,
    /// The open cycle at export time, if any
    pub active_cycle: Option<cycle::Model>,
    /// Every cycle, open and closed
    pub cycles: Vec<cycle::Model>,
    /// Every withdrawal record
    pub withdrawals: Vec<withdrawal::Model>,
    /// Full collection history across all cycles
    pub collections: Vec<collection::Model>,
}

/// The complete backup payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFile {
    /// When the export was taken
    pub export_date: DateTime<Utc>,
    /// Version of the app that wrote the file
    pub app_version: String,
    /// Every person, including soft-deleted ones
    pub people: Vec<PersonBackup>,
}

/// Row counts written by a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    /// People re-inserted
    pub people: usize,
    /// Cycles re-inserted
    pub cycles: usize,
    /// Collections re-inserted
    pub collections: usize,
    /// Withdrawals re-inserted
    pub withdrawals: usize,
}

/// Dumps the entire entity store, soft-deleted people included, and records
/// the export timestamp in settings.
pub async fn export_backup(db: &DatabaseConnection) -> Result<BackupFile> {
    let people = Person::find()
        .order_by_asc(person::Column::Id)
        .all(db)
        .await?;

    let mut entries = Vec::with_capacity(people.len());
    for p in people {
        let cycles = cycle_ops::get_cycles_for_person(db, p.id).await?;
        let active_cycle = cycles.iter().find(|c| c.is_active).cloned();
        let collections =
            crate::core::collection::get_collections_for_person(db, p.id).await?;
        let withdrawals =
            crate::core::withdrawal::get_withdrawals_for_person(db, p.id).await?;

        entries.push(PersonBackup {
            person: p,
            active_cycle,
            cycles,
            withdrawals,
            collections,
        });
    }

    let export_date = Utc::now();
    set_last_export_date(db, export_date).await?;

    info!(people = entries.len(), "backup exported");
    Ok(BackupFile {
        export_date,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        people: entries,
    })
}

/// Serializes a backup to pretty-printed JSON.
pub async fn export_backup_json(db: &DatabaseConnection) -> Result<String> {
    let backup = export_backup(db).await?;
    serde_json::to_string_pretty(&backup).map_err(Into::into)
}

/// Parses a JSON payload and restores it. Shape errors surface as
/// [`Error::ImportFormat`] before anything is touched.
pub async fn restore_backup_json(db: &DatabaseConnection, json: &str) -> Result<RestoreSummary> {
    let backup: BackupFile = serde_json::from_str(json).map_err(|e| Error::ImportFormat {
        message: e.to_string(),
    })?;
    restore_backup(db, &backup).await
}

/// Destructively replaces the entire entity store with the backup contents.
///
/// Validates the full payload first (see [`validate_backup`]); only then
/// deletes all collections, withdrawals, cycles and people and re-inserts
/// everything with fresh identifiers, re-threading the cycle and person
/// foreign keys. Runs in one transaction, so a failure partway leaves the
/// pre-restore data untouched.
pub async fn restore_backup(
    db: &DatabaseConnection,
    backup: &BackupFile,
) -> Result<RestoreSummary> {
    validate_backup(backup)?;

    let txn = db.begin().await?;

    // Children first
    Collection::delete_many().exec(&txn).await?;
    Withdrawal::delete_many().exec(&txn).await?;
    Cycle::delete_many().exec(&txn).await?;
    Person::delete_many().exec(&txn).await?;

    let mut summary = RestoreSummary {
        people: 0,
        cycles: 0,
        collections: 0,
        withdrawals: 0,
    };

    for entry in &backup.people {
        let new_person = person::ActiveModel {
            name: Set(entry.person.name.clone()),
            phone: Set(entry.person.phone.clone()),
            location: Set(entry.person.location.clone()),
            photo_path: Set(entry.person.photo_path.clone()),
            default_amount: Set(entry.person.default_amount),
            frequency: Set(entry.person.frequency.clone()),
            notes: Set(entry.person.notes.clone()),
            is_active: Set(entry.person.is_active),
            created_at: Set(entry.person.created_at),
            updated_at: Set(entry.person.updated_at),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        summary.people += 1;

        let mut cycle_ids: HashMap<i64, i64> = HashMap::new();
        for old_cycle in &entry.cycles {
            let new_cycle = cycle::ActiveModel {
                person_id: Set(new_person.id),
                start_date: Set(old_cycle.start_date),
                end_date: Set(old_cycle.end_date),
                total_amount: Set(old_cycle.total_amount),
                is_active: Set(old_cycle.is_active),
                withdrawal_date: Set(old_cycle.withdrawal_date),
                notes: Set(old_cycle.notes.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            cycle_ids.insert(old_cycle.id, new_cycle.id);
            summary.cycles += 1;
        }

        for old_row in &entry.collections {
            // Validation guarantees the cycle id resolves
            let new_cycle_id =
                cycle_ids
                    .get(&old_row.cycle_id)
                    .copied()
                    .ok_or_else(|| Error::ImportFormat {
                        message: format!(
                            "collection for '{}' references unknown cycle {}",
                            entry.person.name, old_row.cycle_id
                        ),
                    })?;
            collection::ActiveModel {
                person_id: Set(new_person.id),
                cycle_id: Set(new_cycle_id),
                date: Set(old_row.date),
                amount: Set(old_row.amount),
                status: Set(old_row.status.clone()),
                notes: Set(old_row.notes.clone()),
                created_at: Set(old_row.created_at),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            summary.collections += 1;
        }

        for old_row in &entry.withdrawals {
            let new_cycle_id =
                cycle_ids
                    .get(&old_row.cycle_id)
                    .copied()
                    .ok_or_else(|| Error::ImportFormat {
                        message: format!(
                            "withdrawal for '{}' references unknown cycle {}",
                            entry.person.name, old_row.cycle_id
                        ),
                    })?;
            withdrawal::ActiveModel {
                person_id: Set(new_person.id),
                cycle_id: Set(new_cycle_id),
                amount: Set(old_row.amount),
                date: Set(old_row.date),
                notes: Set(old_row.notes.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            summary.withdrawals += 1;
        }
    }

    txn.commit().await?;

    info!(
        people = summary.people,
        cycles = summary.cycles,
        collections = summary.collections,
        withdrawals = summary.withdrawals,
        "restore completed"
    );
    Ok(summary)
}

/// Checks the semantic shape of a backup before any destructive write.
///
/// Rejects: empty person names, non-finite or negative amounts, more than
/// one active cycle per person, unknown collection statuses, collected rows
/// without amounts, duplicate `(person, date)` rows, and collections or
/// withdrawals referencing cycles absent from the person's cycle list.
pub fn validate_backup(backup: &BackupFile) -> Result<()> {
    for entry in &backup.people {
        let name = entry.person.name.trim();
        if name.is_empty() {
            return Err(Error::ImportFormat {
                message: "person with empty name".to_string(),
            });
        }
        if !entry.person.default_amount.is_finite() || entry.person.default_amount < 0.0 {
            return Err(Error::ImportFormat {
                message: format!("'{name}' has invalid default amount"),
            });
        }

        let active_count = entry.cycles.iter().filter(|c| c.is_active).count();
        if active_count > 1 {
            return Err(Error::ImportFormat {
                message: format!("'{name}' has {active_count} active cycles"),
            });
        }

        let cycle_ids: HashSet<i64> = entry.cycles.iter().map(|c| c.id).collect();
        for c in &entry.cycles {
            if !c.total_amount.is_finite() || c.total_amount < 0.0 {
                return Err(Error::ImportFormat {
                    message: format!("'{name}' has cycle {} with invalid total", c.id),
                });
            }
        }

        let mut seen_dates: HashSet<_> = HashSet::new();
        for row in &entry.collections {
            if !cycle_ids.contains(&row.cycle_id) {
                return Err(Error::ImportFormat {
                    message: format!(
                        "'{name}' has collection on {} referencing unknown cycle {}",
                        row.date, row.cycle_id
                    ),
                });
            }
            if !seen_dates.insert(row.date) {
                return Err(Error::ImportFormat {
                    message: format!("'{name}' has duplicate collection for {}", row.date),
                });
            }
            match row.status.as_str() {
                STATUS_COLLECTED => {
                    let Some(amount) = row.amount else {
                        return Err(Error::ImportFormat {
                            message: format!(
                                "'{name}' has collected row on {} without an amount",
                                row.date
                            ),
                        });
                    };
                    if !amount.is_finite() || amount < 0.0 {
                        return Err(Error::ImportFormat {
                            message: format!(
                                "'{name}' has invalid amount on {}",
                                row.date
                            ),
                        });
                    }
                }
                STATUS_SKIPPED => {
                    if row.amount.is_some() {
                        warn!(
                            person = name,
                            date = %row.date,
                            "skipped row carries an amount, it will be ignored"
                        );
                    }
                }
                other => {
                    return Err(Error::ImportFormat {
                        message: format!("'{name}' has unknown status '{other}'"),
                    });
                }
            }
        }

        for row in &entry.withdrawals {
            if !cycle_ids.contains(&row.cycle_id) {
                return Err(Error::ImportFormat {
                    message: format!(
                        "'{name}' has withdrawal referencing unknown cycle {}",
                        row.cycle_id
                    ),
                });
            }
            if !row.amount.is_finite() || row.amount < 0.0 {
                return Err(Error::ImportFormat {
                    message: format!("'{name}' has withdrawal with invalid amount"),
                });
            }
        }
    }

    Ok(())
}

/// Records when the last export was taken in the settings key-value store.
async fn set_last_export_date(db: &DatabaseConnection, date: DateTime<Utc>) -> Result<()> {
    let now = Utc::now().naive_utc();
    let value = date.to_rfc3339();

    let existing = Setting::find()
        .filter(setting::Column::Key.eq(LAST_BACKUP_EXPORT_KEY))
        .one(db)
        .await?;

    if let Some(state) = existing {
        let mut active_model: setting::ActiveModel = state.into();
        active_model.value = Set(value);
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        setting::ActiveModel {
            key: Set(LAST_BACKUP_EXPORT_KEY.to_string()),
            value: Set(value),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(())
}

/// Reads the timestamp of the last export, if one was ever taken.
pub async fn get_last_export_date(
    db: &DatabaseConnection,
) -> Result<Option<DateTime<Utc>>> {
    let state = Setting::find()
        .filter(setting::Column::Key.eq(LAST_BACKUP_EXPORT_KEY))
        .one(db)
        .await?;

    match state {
        Some(s) => DateTime::parse_from_rfc3339(&s.value)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| Error::Config {
                message: format!("Failed to parse last export date: {e}"),
            }),
        None => Ok(None),
    }
}
