//! Churchwardens' accounts example.
//!
//! Totals a year of unnormalized account entries, then builds the funeral
//! share and primary category ranking for two parishes.

use chrono::NaiveDate;
use parish_records::aggregation::summary::{category_share, primary_category_ranking};
use parish_records::core::money::Lsd;
use parish_records::core::record::{Disbursement, DisbursementSet, RawAmount};

fn entry(parish: &str, ymd: (i32, u32, u32), category: &str, primary: &str, lsd: (i64, i64, i64)) -> Disbursement {
    let date = NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap_or_default();
    Disbursement::new(parish, date, category, primary, RawAmount::new(lsd.0, lsd.1, lsd.2))
}

fn main() {
    println!("╔═════════════════════════════════════════════╗");
    println!("║  parish-records: Churchwardens' Accounts    ║");
    println!("╚═════════════════════════════════════════════╝\n");

    // --- Scenario 1: Adding up a page of the account book ---
    println!("━━━ Scenario 1: Summing £sd ━━━\n");

    let page = ["0,0,17", "0,19,11", "1,2,6", "0,13,0"];
    let values: Vec<Lsd> = page.iter().filter_map(|s| s.parse().ok()).collect();
    for value in &values {
        println!("  {:>14}  ({} pence)", value.to_string(), value.to_base_units());
    }
    match Lsd::sum(&values) {
        Ok(total) => println!("  Total:         {}\n", total),
        Err(e) => println!("  Could not total the page: {}\n", e),
    }

    // --- Scenario 2: Summaries over two parishes ---
    println!("━━━ Scenario 2: Disbursement summaries ━━━\n");

    let set: DisbursementSet = vec![
        entry("St Mary", (1752, 2, 3), "Funeral", "Poor relief", (0, 7, 6)),
        entry("St Mary", (1752, 5, 14), "Perambulation", "Parish business", (0, 12, 0)),
        entry("St Mary", (1752, 9, 1), "Bell ropes", "Fabric", (1, 4, 0)),
        entry("St Mary", (1752, 11, 30), "Clothing", "Poor relief", (0, 9, 18)),
        entry("All Saints", (1752, 4, 2), "Funeral", "Poor relief", (0, 5, 0)),
        entry("All Saints", (1752, 8, 19), "Glazing", "Fabric", (0, 15, 0)),
    ]
    .into_iter()
    .collect();

    match category_share(&set, "Funeral") {
        Ok(table) => println!("{}", table),
        Err(e) => println!("Funeral share unavailable: {}", e),
    }
    println!("{}", primary_category_ranking(&set));
}
