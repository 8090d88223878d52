/// Source file and table name constants shared by ingestion, storage and the CLI

// Default input file names, looked up inside the configured data directory
pub const PROVIDERS_FILE: &str = "providers_data.csv";
pub const RECEIVERS_FILE: &str = "receivers_data.csv";
pub const FOOD_LISTINGS_FILE: &str = "food_listings_data.csv";
pub const CLAIMS_FILE: &str = "claims_data.csv";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_STORE_PATH: &str = "local_food_wastage.db";
pub const DEFAULT_CONFIG_PATH: &str = "etl.toml";
pub const DEFAULT_LOG_DIR: &str = "logs";

// Store table names
pub const PROVIDERS_TABLE: &str = "providers";
pub const RECEIVERS_TABLE: &str = "receivers";
pub const FOOD_LISTINGS_TABLE: &str = "food_listings";
pub const CLAIMS_TABLE: &str = "claims";

// Claim status labels understood by the dashboard
pub const STATUS_PENDING: &str = "Pending";
pub const STATUS_COMPLETED: &str = "Completed";
pub const STATUS_CANCELLED: &str = "Cancelled";

pub fn known_statuses() -> [&'static str; 3] {
    [STATUS_PENDING, STATUS_COMPLETED, STATUS_CANCELLED]
}

/// Normalized (lower snake case) source column keys, as produced by header normalization
pub mod columns {
    pub const PROVIDER_ID: &str = "provider_id";
    pub const RECEIVER_ID: &str = "receiver_id";
    pub const FOOD_ID: &str = "food_id";
    pub const CLAIM_ID: &str = "claim_id";
    pub const NAME: &str = "name";
    pub const TYPE: &str = "type";
    pub const ADDRESS: &str = "address";
    pub const CITY: &str = "city";
    pub const CONTACT: &str = "contact";
    pub const FOOD_NAME: &str = "food_name";
    pub const QUANTITY: &str = "quantity";
    pub const EXPIRY_DATE: &str = "expiry_date";
    pub const PROVIDER_TYPE: &str = "provider_type";
    pub const LOCATION: &str = "location";
    pub const FOOD_TYPE: &str = "food_type";
    pub const MEAL_TYPE: &str = "meal_type";
    pub const STATUS: &str = "status";
    pub const TIMESTAMP: &str = "timestamp";
}
