//! The relational store: a SQLite file that is destroyed and rebuilt on every run.

use chrono::NaiveDate;
use rusqlite::types::{Type, ValueRef};
use rusqlite::{params, Connection, Row};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub mod load;
pub mod schema;

use crate::config::ReferencePolicy;
use crate::domain::{Claim, EntityKind, FoodListing, Provider, Receiver};
use crate::error::{EtlError, Result};
use crate::pipeline::processing::normalize::NormalizedTables;
use crate::pipeline::processing::validate::Violation;

/// Handle to a built store. Owns its single connection, with foreign key
/// enforcement on.
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

/// Remove a previous store and the journal files SQLite may have left beside it
pub fn remove_existing(path: &Path) -> Result<()> {
    let mut targets = vec![path.to_path_buf()];
    for suffix in ["-wal", "-shm", "-journal"] {
        let mut side: OsString = path.as_os_str().to_owned();
        side.push(suffix);
        targets.push(PathBuf::from(side));
    }

    for target in targets {
        match fs::remove_file(&target) {
            Ok(()) => debug!("Removed {}", target.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(EtlError::StoreReplace {
                    path: target,
                    source,
                })
            }
        }
    }
    Ok(())
}

fn absent_identities<I>(table: EntityKind, ids: I) -> impl Iterator<Item = Violation>
where
    I: Iterator<Item = Option<i64>>,
{
    ids.enumerate()
        .filter(|(_, id)| id.is_none())
        .map(move |(i, _)| Violation::MissingPrimaryKey { table, row: i + 1 })
}

/// SQLite assigns a rowid to a NULL `INTEGER PRIMARY KEY`, so every row must
/// arrive with its identity.
fn require_identities(tables: &NormalizedTables) -> Result<()> {
    let missing: Vec<Violation> = absent_identities(
        EntityKind::Provider,
        tables.providers.iter().map(|p| p.provider_id),
    )
    .chain(absent_identities(
        EntityKind::Receiver,
        tables.receivers.iter().map(|r| r.receiver_id),
    ))
    .chain(absent_identities(
        EntityKind::FoodListing,
        tables.food_listings.iter().map(|f| f.food_id),
    ))
    .chain(absent_identities(
        EntityKind::Claim,
        tables.claims.iter().map(|c| c.claim_id),
    ))
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EtlError::Validation(missing))
    }
}

/// Destroy any store at `path`, declare the schema and bulk-load `tables`.
///
/// Enforcement is switched off for the load and back on afterwards; the
/// restored constraints are then checked with `PRAGMA foreign_key_check`.
/// Under [`ReferencePolicy::Strict`] any reported row fails the rebuild.
/// A row without identity fails it before the previous store is touched.
#[instrument(skip(tables), fields(path = %path.display()))]
pub fn rebuild(path: &Path, tables: &NormalizedTables, policy: ReferencePolicy) -> Result<Store> {
    let started = Instant::now();

    require_identities(tables)?;
    remove_existing(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| EtlError::StoreReplace {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let mut conn = Connection::open(path)?;
    schema::create_schema(&conn)?;
    info!("Schema created");

    schema::set_foreign_keys(&conn, false)?;
    let tx = conn.transaction()?;
    let loaded = load::bulk_insert(&tx, tables)?;
    tx.commit()?;
    schema::set_foreign_keys(&conn, true)?;

    let problems = schema::foreign_key_check(&conn)?;
    if !problems.is_empty() {
        match policy {
            ReferencePolicy::Strict => return Err(EtlError::ConstraintViolation(problems)),
            ReferencePolicy::Permissive => {
                warn!("{} row(s) hold references to missing rows", problems.len());
            }
        }
    }

    for (kind, count) in &loaded {
        info!(table = %kind, rows = count, "Loaded table");
    }
    metrics::histogram!("etl_store_rebuild_duration_seconds").record(started.elapsed().as_secs_f64());

    Ok(Store {
        conn,
        path: path.to_path_buf(),
    })
}

fn get_date(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

impl Store {
    /// Open an existing store for reading or row-level mutation
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::set_foreign_keys(&conn, true)?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn row_count(&self, kind: EntityKind) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn row_counts(&self) -> Result<Vec<(EntityKind, usize)>> {
        EntityKind::LOAD_ORDER
            .iter()
            .map(|kind| Ok((*kind, self.row_count(*kind)?)))
            .collect()
    }

    pub fn providers(&self) -> Result<Vec<Provider>> {
        let mut stmt = self.conn.prepare(
            "SELECT Provider_ID, Name, Type, Address, City, Contact FROM providers ORDER BY Provider_ID",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Provider {
                provider_id: row.get(0)?,
                name: row.get(1)?,
                provider_type: row.get(2)?,
                address: row.get(3)?,
                city: row.get(4)?,
                contact: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn receivers(&self) -> Result<Vec<Receiver>> {
        let mut stmt = self
            .conn
            .prepare("SELECT Receiver_ID, Name, Type, City, Contact FROM receivers ORDER BY Receiver_ID")?;
        let rows = stmt.query_map([], |row| {
            Ok(Receiver {
                receiver_id: row.get(0)?,
                name: row.get(1)?,
                receiver_type: row.get(2)?,
                city: row.get(3)?,
                contact: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn food_listings(&self) -> Result<Vec<FoodListing>> {
        let mut stmt = self.conn.prepare(
            "SELECT Food_ID, Food_Name, Quantity, Expiry_Date, Provider_ID, Provider_Type, Location, Food_Type, Meal_Type \
             FROM food_listings ORDER BY Food_ID",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FoodListing {
                food_id: row.get(0)?,
                food_name: row.get(1)?,
                quantity: row.get(2)?,
                expiry_date: get_date(row, 3)?,
                provider_id: row.get(4)?,
                provider_type: row.get(5)?,
                location: row.get(6)?,
                food_type: row.get(7)?,
                meal_type: row.get(8)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn claims(&self) -> Result<Vec<Claim>> {
        let mut stmt = self.conn.prepare(
            "SELECT Claim_ID, Food_ID, Receiver_ID, Status, Timestamp FROM claims ORDER BY Claim_ID",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Claim {
                claim_id: row.get(0)?,
                food_id: row.get(1)?,
                receiver_id: row.get(2)?,
                status: row.get(3)?,
                timestamp: get_date(row, 4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete one row by identity. Cascade and set-null rules apply.
    pub fn delete(&self, kind: EntityKind, id: i64) -> Result<usize> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1", kind.table(), kind.id_column());
        let affected = self.conn.execute(&sql, params![id])?;
        debug!(table = %kind, id, affected, "Deleted row");
        Ok(affected)
    }

    /// SHA-256 over every row of every table in identity order, hex encoded.
    /// Two stores with identical rows produce identical digests.
    pub fn content_digest(&self) -> Result<String> {
        let mut hasher = Sha256::new();

        for kind in EntityKind::LOAD_ORDER {
            hasher.update(kind.table().as_bytes());
            let sql = format!("SELECT * FROM {} ORDER BY {}", kind.table(), kind.id_column());
            let mut stmt = self.conn.prepare(&sql)?;
            let columns = stmt.column_count();
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                for idx in 0..columns {
                    match row.get_ref(idx)? {
                        ValueRef::Null => hasher.update(b"N"),
                        ValueRef::Integer(i) => {
                            hasher.update(b"I");
                            hasher.update(i.to_le_bytes());
                        }
                        ValueRef::Real(f) => {
                            hasher.update(b"R");
                            hasher.update(f.to_bits().to_le_bytes());
                        }
                        ValueRef::Text(t) | ValueRef::Blob(t) => {
                            hasher.update(b"T");
                            hasher.update((t.len() as u64).to_le_bytes());
                            hasher.update(t);
                        }
                    }
                }
                hasher.update(b"\n");
            }
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn provider(id: i64) -> Provider {
        Provider {
            provider_id: Some(id),
            name: format!("Provider {}", id),
            provider_type: "Restaurant".to_string(),
            address: String::new(),
            city: "Springfield".to_string(),
            contact: Some("5550100".to_string()),
        }
    }

    #[test]
    fn test_rebuild_replaces_previous_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("food.db");

        let first = NormalizedTables {
            providers: vec![provider(1), provider(2)],
            ..Default::default()
        };
        let store = rebuild(&path, &first, ReferencePolicy::Strict).unwrap();
        assert_eq!(store.row_count(EntityKind::Provider).unwrap(), 2);
        drop(store);

        let second = NormalizedTables {
            providers: vec![provider(3)],
            ..Default::default()
        };
        let store = rebuild(&path, &second, ReferencePolicy::Strict).unwrap();
        assert_eq!(store.providers().unwrap(), vec![provider(3)]);
    }

    #[test]
    fn test_rebuild_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("food.db");

        let store = rebuild(&path, &NormalizedTables::default(), ReferencePolicy::Strict).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
        assert!(store.row_counts().unwrap().iter().all(|(_, n)| *n == 0));
    }

    #[test]
    fn test_duplicate_identity_aborts_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("food.db");

        let tables = NormalizedTables {
            providers: vec![provider(1), provider(1)],
            ..Default::default()
        };
        let err = rebuild(&path, &tables, ReferencePolicy::Strict).err().unwrap();
        assert!(matches!(err, EtlError::Sqlite(_)));
    }

    #[test]
    fn test_absent_identity_aborts_before_replacing_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("food.db");
        let previous = NormalizedTables {
            providers: vec![provider(1)],
            ..Default::default()
        };
        rebuild(&path, &previous, ReferencePolicy::Permissive).unwrap();

        let mut nameless = provider(2);
        nameless.provider_id = None;
        let tables = NormalizedTables {
            providers: vec![provider(3), nameless],
            ..Default::default()
        };
        let err = rebuild(&path, &tables, ReferencePolicy::Permissive).err().unwrap();
        match err {
            EtlError::Validation(violations) => assert_eq!(
                violations,
                vec![Violation::MissingPrimaryKey {
                    table: EntityKind::Provider,
                    row: 2,
                }]
            ),
            other => panic!("expected validation failure, got {}", other),
        }

        let store = Store::open(&path).unwrap();
        assert_eq!(store.providers().unwrap(), vec![provider(1)]);
    }

    #[test]
    fn test_remove_existing_ignores_missing_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.db");
        remove_existing(&path).unwrap();

        fs::write(&path, b"stale").unwrap();
        fs::write(dir.path().join("absent.db-wal"), b"stale").unwrap();
        remove_existing(&path).unwrap();
        assert!(!path.exists());
        assert!(!dir.path().join("absent.db-wal").exists());
    }
}
