// Base trait for entity normalizers
pub mod base;

// One normalizer per source file
pub mod claim;
pub mod food_listing;
pub mod provider;
pub mod receiver;

// Re-export the main components
pub use base::EntityNormalizer;
pub use claim::ClaimNormalizer;
pub use food_listing::FoodListingNormalizer;
pub use provider::ProviderNormalizer;
pub use receiver::ReceiverNormalizer;
