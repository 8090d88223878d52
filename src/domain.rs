use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{CLAIMS_TABLE, FOOD_LISTINGS_TABLE, PROVIDERS_TABLE, RECEIVERS_TABLE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: Option<i64>,
    pub name: String,
    pub provider_type: String,
    pub address: String,
    pub city: String,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub receiver_id: Option<i64>,
    pub name: String,
    pub receiver_type: String,
    pub city: String,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodListing {
    pub food_id: Option<i64>,
    pub food_name: String,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    /// Nullable: the listing outlives its provider
    pub provider_id: Option<i64>,
    pub provider_type: String,
    pub location: String,
    pub food_type: String,
    pub meal_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: Option<i64>,
    pub food_id: Option<i64>,
    pub receiver_id: Option<i64>,
    pub status: String,
    pub timestamp: Option<NaiveDate>,
}

/// The four entities the pipeline materializes, in load order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Provider,
    Receiver,
    FoodListing,
    Claim,
}

impl EntityKind {
    pub const LOAD_ORDER: [EntityKind; 4] = [
        EntityKind::Provider,
        EntityKind::Receiver,
        EntityKind::FoodListing,
        EntityKind::Claim,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Provider => PROVIDERS_TABLE,
            EntityKind::Receiver => RECEIVERS_TABLE,
            EntityKind::FoodListing => FOOD_LISTINGS_TABLE,
            EntityKind::Claim => CLAIMS_TABLE,
        }
    }

    /// Identity column as named in the store
    pub fn id_column(&self) -> &'static str {
        match self {
            EntityKind::Provider => "Provider_ID",
            EntityKind::Receiver => "Receiver_ID",
            EntityKind::FoodListing => "Food_ID",
            EntityKind::Claim => "Claim_ID",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}
