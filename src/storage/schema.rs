use rusqlite::Connection;

use crate::error::Result;

/// The fixed four-table schema. Column names match the source files so
/// dashboard queries written against them keep working.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE providers (
    Provider_ID INTEGER PRIMARY KEY,
    Name        TEXT NOT NULL,
    Type        TEXT,
    Address     TEXT,
    City        TEXT,
    Contact     TEXT
);
CREATE TABLE receivers (
    Receiver_ID INTEGER PRIMARY KEY,
    Name        TEXT NOT NULL,
    Type        TEXT,
    City        TEXT,
    Contact     TEXT
);
CREATE TABLE food_listings (
    Food_ID       INTEGER PRIMARY KEY,
    Food_Name     TEXT,
    Quantity      INTEGER,
    Expiry_Date   DATE,
    Provider_ID   INTEGER,
    Provider_Type TEXT,
    Location      TEXT,
    Food_Type     TEXT,
    Meal_Type     TEXT,
    FOREIGN KEY(Provider_ID) REFERENCES providers(Provider_ID) ON DELETE SET NULL
);
CREATE TABLE claims (
    Claim_ID    INTEGER PRIMARY KEY,
    Food_ID     INTEGER,
    Receiver_ID INTEGER,
    Status      TEXT,
    Timestamp   DATETIME,
    FOREIGN KEY(Food_ID) REFERENCES food_listings(Food_ID) ON DELETE CASCADE,
    FOREIGN KEY(Receiver_ID) REFERENCES receivers(Receiver_ID) ON DELETE SET NULL
);
"#;

pub const INSERT_PROVIDER: &str =
    "INSERT INTO providers (Provider_ID, Name, Type, Address, City, Contact) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

pub const INSERT_RECEIVER: &str =
    "INSERT INTO receivers (Receiver_ID, Name, Type, City, Contact) VALUES (?1, ?2, ?3, ?4, ?5)";

pub const INSERT_FOOD_LISTING: &str = "INSERT INTO food_listings \
    (Food_ID, Food_Name, Quantity, Expiry_Date, Provider_ID, Provider_Type, Location, Food_Type, Meal_Type) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

pub const INSERT_CLAIM: &str =
    "INSERT INTO claims (Claim_ID, Food_ID, Receiver_ID, Status, Timestamp) VALUES (?1, ?2, ?3, ?4, ?5)";

pub fn set_foreign_keys(conn: &Connection, enabled: bool) -> Result<()> {
    let mode = if enabled { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {};", mode))?;
    Ok(())
}

/// Declare the schema on a fresh connection with constraint enforcement enabled
pub fn create_schema(conn: &Connection) -> Result<()> {
    set_foreign_keys(conn, true)?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Rows reported by `PRAGMA foreign_key_check`, rendered for error messages
pub fn foreign_key_check(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let mut rows = stmt.query([])?;
    let mut problems = Vec::new();
    while let Some(row) = rows.next()? {
        let table: String = row.get(0)?;
        let rowid: Option<i64> = row.get(1)?;
        let parent: String = row.get(2)?;
        problems.push(format!(
            "{} row {} references a missing {} row",
            table,
            rowid.map(|r| r.to_string()).unwrap_or_else(|| "?".to_string()),
            parent
        ));
    }
    Ok(problems)
}
