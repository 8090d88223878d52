use chrono::NaiveDate;
use rusqlite::{params, Transaction};
use tracing::debug;

use super::schema::{INSERT_CLAIM, INSERT_FOOD_LISTING, INSERT_PROVIDER, INSERT_RECEIVER};
use crate::domain::{Claim, EntityKind, FoodListing, Provider, Receiver};
use crate::error::Result;
use crate::pipeline::processing::normalize::NormalizedTables;

fn iso(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn insert_providers(tx: &Transaction<'_>, rows: &[Provider]) -> Result<usize> {
    let mut stmt = tx.prepare(INSERT_PROVIDER)?;
    for p in rows {
        stmt.execute(params![p.provider_id, p.name, p.provider_type, p.address, p.city, p.contact])?;
    }
    Ok(rows.len())
}

fn insert_receivers(tx: &Transaction<'_>, rows: &[Receiver]) -> Result<usize> {
    let mut stmt = tx.prepare(INSERT_RECEIVER)?;
    for r in rows {
        stmt.execute(params![r.receiver_id, r.name, r.receiver_type, r.city, r.contact])?;
    }
    Ok(rows.len())
}

fn insert_food_listings(tx: &Transaction<'_>, rows: &[FoodListing]) -> Result<usize> {
    let mut stmt = tx.prepare(INSERT_FOOD_LISTING)?;
    for f in rows {
        stmt.execute(params![
            f.food_id,
            f.food_name,
            f.quantity,
            iso(f.expiry_date),
            f.provider_id,
            f.provider_type,
            f.location,
            f.food_type,
            f.meal_type
        ])?;
    }
    Ok(rows.len())
}

fn insert_claims(tx: &Transaction<'_>, rows: &[Claim]) -> Result<usize> {
    let mut stmt = tx.prepare(INSERT_CLAIM)?;
    for c in rows {
        stmt.execute(params![c.claim_id, c.food_id, c.receiver_id, c.status, iso(c.timestamp)])?;
    }
    Ok(rows.len())
}

/// Insert all four tables in dependency order inside the given transaction.
/// Returns the number of rows written per table.
pub fn bulk_insert(tx: &Transaction<'_>, tables: &NormalizedTables) -> Result<Vec<(EntityKind, usize)>> {
    let mut loaded = Vec::with_capacity(4);
    for kind in EntityKind::LOAD_ORDER {
        let count = match kind {
            EntityKind::Provider => insert_providers(tx, &tables.providers)?,
            EntityKind::Receiver => insert_receivers(tx, &tables.receivers)?,
            EntityKind::FoodListing => insert_food_listings(tx, &tables.food_listings)?,
            EntityKind::Claim => insert_claims(tx, &tables.claims)?,
        };
        debug!("Inserted {} row(s) into {}", count, kind);
        metrics::counter!("etl_rows_loaded_total", "table" => kind.table()).increment(count as u64);
        loaded.push((kind, count));
    }
    Ok(loaded)
}
