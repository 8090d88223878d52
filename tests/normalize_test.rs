use food_waste_etl::domain::{Claim, FoodListing};
use food_waste_etl::pipeline::ingestion::RawRow;
use food_waste_etl::pipeline::processing::normalize::fields::{clean_phone, parse_date};
use food_waste_etl::pipeline::processing::normalize::{
    ClaimNormalizer, EntityNormalizer, FoodListingNormalizer,
};

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn listing_to_row(listing: &FoodListing) -> RawRow {
    RawRow::from_pairs(
        1,
        [
            ("Food_ID", opt(&listing.food_id)),
            ("Food_Name", listing.food_name.clone()),
            ("Quantity", listing.quantity.to_string()),
            ("Expiry_Date", opt(&listing.expiry_date)),
            ("Provider_ID", opt(&listing.provider_id)),
            ("Provider_Type", listing.provider_type.clone()),
            ("Location", listing.location.clone()),
            ("Food_Type", listing.food_type.clone()),
            ("Meal_Type", listing.meal_type.clone()),
        ],
    )
}

fn claim_to_row(claim: &Claim) -> RawRow {
    RawRow::from_pairs(
        1,
        [
            ("Claim_ID", opt(&claim.claim_id)),
            ("Food_ID", opt(&claim.food_id)),
            ("Receiver_ID", opt(&claim.receiver_id)),
            ("Status", claim.status.clone()),
            ("Timestamp", opt(&claim.timestamp)),
        ],
    )
}

#[test]
fn test_food_listing_normalization_is_idempotent() {
    let inputs = [
        ("12.7", "01-02-2024", "7"),
        ("-1", "garbage", ""),
        ("", "2024/12/31", "x"),
        ("1e2", "March 15, 2024", "3.0"),
    ];

    for (quantity, expiry, provider) in inputs {
        let raw = RawRow::from_pairs(
            1,
            [
                ("Food_ID", "5"),
                ("Food_Name", "  Pasta "),
                ("Quantity", quantity),
                ("Expiry_Date", expiry),
                ("Provider_ID", provider),
                ("Provider_Type", " Restaurant"),
                ("Location", "Lake Amy "),
                ("Food_Type", "Vegan"),
                ("Meal_Type", "Dinner"),
            ],
        );
        let once = FoodListingNormalizer.normalize(&raw).record;
        assert!(once.quantity >= 0);

        let twice = FoodListingNormalizer.normalize(&listing_to_row(&once));
        assert_eq!(twice.record, once, "input quantity={} expiry={}", quantity, expiry);
        assert!(twice.issues.is_empty());
    }
}

#[test]
fn test_claim_normalization_is_idempotent() {
    let raw = RawRow::from_pairs(
        9,
        [
            ("Claim_ID", "40"),
            ("Food_ID", "5"),
            ("Receiver_ID", ""),
            ("Status", ""),
            ("Timestamp", "2025-03-05 05:26:00"),
        ],
    );
    let once = ClaimNormalizer.normalize(&raw).record;
    assert_eq!(once.status, "Pending");

    let twice = ClaimNormalizer.normalize(&claim_to_row(&once));
    assert_eq!(twice.record, once);
}

#[test]
fn test_contact_is_digits_or_absent() {
    let samples = ["N/A", "", "---", "+91 (0) 22-1234", "555.0100", "ext. 42", "٣٤٥"];
    for sample in samples {
        match clean_phone(Some(sample)) {
            Some(digits) => {
                assert!(!digits.is_empty());
                assert!(digits.bytes().all(|b| b.is_ascii_digit()), "{:?}", digits);
            }
            None => assert!(!sample.bytes().any(|b| b.is_ascii_digit()), "{:?}", sample),
        }
    }
}

#[test]
fn test_day_month_slash_wins_over_month_day() {
    // Both slash patterns could read 05/04/2024; the day-first one is tried earlier
    assert_eq!(parse_date(Some("05/04/2024")).map(|d| d.to_string()), Some("2024-04-05".to_string()));
    assert_eq!(parse_date(Some("15/03/2024")).map(|d| d.to_string()), Some("2024-03-15".to_string()));
}
