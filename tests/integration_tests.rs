use approx::assert_relative_eq;
use parish_records::aggregation::engine::{AggregationEngine, RankBy};
use parish_records::aggregation::summary::SummaryReport;
use parish_records::config::PipelineConfig;
use parish_records::core::money::Lsd;
use parish_records::core::ratio::Ratio;
use parish_records::core::record::{DisbursementSet, GroupKey, KeyField, KeyValue};
use parish_records::demography::marriage::{MarriageRecord, MarriageRegister};
use parish_records::demography::tax::{RatePayerRecord, RateRolls};
use parish_records::location::cache::LocationCache;
use parish_records::location::export::ExportFileLookup;
use parish_records::location::matching::MatchMode;
use parish_records::location::resolver::{
    LocationLookup, LookupError, LookupHit, LookupSession, Resolver,
};
use rust_decimal_macros::dec;
use std::fs;
use tempfile::tempdir;

const DISBURSEMENTS: &str = r#"{
  "disbursements": [
    { "parish": "Holy Trinity", "date": "1745-04-02", "category": "Funeral", "primary_category": "Poor relief", "pounds": 0, "shillings": 6, "pence": 8 },
    { "parish": "Holy Trinity", "date": "1745-06-11", "category": "Glazing", "primary_category": "Fabric", "pounds": 1, "shillings": 3, "pence": 4 },
    { "parish": "Holy Trinity", "date": "1745-05-20", "category": "Perambulation", "primary_category": "Parish business", "pounds": 0, "shillings": 10, "pence": 0 },
    { "parish": "Holy Trinity", "date": "1746-03-01", "category": "Glazing", "primary_category": "Fabric", "pounds": 0, "shillings": 19, "pence": 14 },
    { "parish": "St Giles", "date": "1745-09-29", "category": "Clothing", "primary_category": "Poor relief", "pounds": 0, "shillings": 4, "pence": 0 },
    { "parish": "St Giles", "date": "1745-10-05", "category": "Funeral", "primary_category": "Poor relief", "pounds": 0, "shillings": 0, "pence": 0 },
    { "parish": "St Giles", "date": "1746-01-12", "category": "Funeral", "primary_category": "Poor relief", "pounds": 0, "shillings": -2, "pence": 0 }
  ]
}"#;

const EXPORT: &str = "\"Title\",\"Grid Reference\",\"Latitude\",\"Longitude\"
\"Ripon, North Yorkshire\",\"SE3171\",\"54.138\",\"-1.524\"
\"Otley, West Yorkshire\",\"SE2045\",\"53.905\",\"-1.693\"
\"Paris\",\"Not in UK\",\"48.857\",\"2.352\"
";

/// Full pipeline test: JSON records → aggregation → shares → ranked summaries.
#[test]
fn full_disbursement_pipeline() {
    let set: DisbursementSet = serde_json::from_str(DISBURSEMENTS).unwrap();
    assert_eq!(set.len(), 7);
    assert_eq!(set.parishes(), vec!["Holy Trinity", "St Giles"]);

    // Totals per parish per year, normalized
    let fields = [KeyField::Parish, KeyField::Year];
    let agg = AggregationEngine::aggregate(set.disbursements(), &fields);
    assert_eq!(agg.rejected().len(), 1);
    assert_eq!(agg.rejected()[0].index, 6);

    let trinity_1745 = GroupKey::new([KeyValue::from("Holy Trinity"), KeyValue::Year(1745)]);
    let group = agg.get(&trinity_1745).unwrap();
    assert_eq!(group.total(), Lsd::new(2, 0, 0).unwrap());
    assert_eq!(group.record_count(), 3);

    let trinity_1746 = GroupKey::new([KeyValue::from("Holy Trinity"), KeyValue::Year(1746)]);
    assert_eq!(agg.get(&trinity_1746).unwrap().total(), Lsd::new(1, 0, 2).unwrap());

    // Funeral share: 6s 8d of £2 is a sixth
    let funerals = AggregationEngine::aggregate(set.in_category("Funeral"), &fields);
    let shares = AggregationEngine::ratio(&funerals, &agg, 2).unwrap();
    assert_eq!(shares[&trinity_1745].value().unwrap().round_dp(2), dec!(16.67));

    // St Giles 1745: a zero-cost funeral over 4s is 0%, not undefined
    let giles_1745 = GroupKey::new([KeyValue::from("St Giles"), KeyValue::Year(1745)]);
    assert_eq!(shares[&giles_1745], Ratio::Defined(dec!(0)));

    // Ranking by primary category, largest first within each parish
    let by_primary = AggregationEngine::aggregate(
        set.disbursements(),
        &[KeyField::Parish, KeyField::PrimaryCategory],
    )
    .into_groups();
    let ranked = AggregationEngine::rank_within_group(&by_primary, 1, RankBy::Total, true);
    let order: Vec<String> = ranked.iter().map(|g| g.key().to_string()).collect();
    assert_eq!(
        order,
        vec![
            "(Holy Trinity, Fabric)",
            "(Holy Trinity, Parish business)",
            "(Holy Trinity, Poor relief)",
            "(St Giles, Poor relief)",
        ]
    );

    // The full report
    let report = SummaryReport::build(&set, &PipelineConfig::default()).unwrap();
    assert_eq!(report.rejected, vec![6]);
    let names: Vec<&str> = report.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["funeral_costs", "primary_categories", "total_expenditure", "perambulation"]
    );
    let text = report.to_string();
    assert!(text.contains("Funeral expenditure as a percentage of total expenditure"));
    assert!(text.contains("Rejected records: [6]"));
}

/// Location pipeline: marriages → resolve against an export → persisted cache → edges.
#[test]
fn marriage_locations_pipeline() {
    let dir = tempdir().unwrap();
    let export_path = dir.path().join("gridrefs.csv");
    fs::write(&export_path, EXPORT).unwrap();
    let cache_path = dir.path().join("output").join("parish_locations.csv");

    let register = MarriageRegister::new(vec![
        MarriageRecord::new("Ripon", "Otley"),
        MarriageRecord::new("Ripon ", "Otley"),
        MarriageRecord::new("Paris", "Ripon"),
        MarriageRecord::new("Otley", "Atlantis"),
    ]);
    let batch = register.parishes();
    assert_eq!(batch.len(), 4);

    // First run: everything is looked up in one pass
    let mut cache = LocationCache::open(&cache_path).unwrap();
    let mut resolver = Resolver::with_policy(
        ExportFileLookup::new(&export_path, MatchMode::Substring),
        MatchMode::Substring,
    );
    let report = resolver.resolve(&mut cache, &batch).unwrap();
    assert!(report.lookup_failure.is_none());
    assert_eq!(report.found, vec!["Otley", "Paris", "Ripon"]);
    assert_eq!(report.unresolved, vec!["Atlantis"]);
    assert_eq!(cache.len(), 4);

    // Second run against the reloaded cache needs no lookup at all
    let mut cache = LocationCache::open(&cache_path).unwrap();
    assert_eq!(
        cache.titles().collect::<Vec<_>>(),
        vec!["Atlantis", "Otley, West Yorkshire", "Paris", "Ripon, North Yorkshire"]
    );
    let report = resolver.resolve(&mut cache, &batch).unwrap();
    assert!(!report.lookup_performed());
    assert_eq!(report.already_cached.len(), 4);

    // Only in-region, located parishes make it onto the network
    let edges = register.network_edges(&cache, &MatchMode::Substring, "Not in UK");
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].groom_parish, "Ripon");
    assert_eq!(edges[0].bride_parish, "Otley");
    assert_eq!(edges[0].count, 2);
    assert_relative_eq!(edges[0].bride_location.latitude, 53.905);
}

struct UnreachableLookup;

struct NeverSession;

impl LocationLookup for UnreachableLookup {
    type Session = NeverSession;

    fn connect(&mut self) -> Result<NeverSession, LookupError> {
        Err(LookupError::Connect("service unavailable".into()))
    }
}

impl LookupSession for NeverSession {
    fn resolve_batch(&mut self, _names: &[String]) -> Result<Vec<LookupHit>, LookupError> {
        Ok(Vec::new())
    }
}

#[test]
fn unreachable_lookup_records_placeholders() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("locations.csv");
    let mut cache = LocationCache::open(&cache_path).unwrap();
    let mut resolver = Resolver::new(UnreachableLookup);

    let report = resolver.resolve(&mut cache, ["Ely", "York"]).unwrap();

    assert!(matches!(report.lookup_failure, Some(LookupError::Connect(_))));
    assert_eq!(report.unresolved, vec!["Ely", "York"]);

    // Placeholders were persisted and count as covered next time
    let mut reloaded = LocationCache::open(&cache_path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.entries().all(|e| !e.is_resolved()));
    let report = resolver.resolve(&mut reloaded, ["York"]).unwrap();
    assert!(!report.lookup_performed());
}

#[test]
fn config_drives_summary_categories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "funeral_category": "Clothing", "perambulation_category": "Glazing" }"#)
        .unwrap();
    let config = PipelineConfig::load(&path).unwrap();
    assert_eq!(config.out_of_region_marker, "Not in UK");

    let set: DisbursementSet = serde_json::from_str(DISBURSEMENTS).unwrap();
    let report = SummaryReport::build(&set, &config).unwrap();
    assert_eq!(report.tables[0].name, "clothing_costs");
    assert_eq!(report.tables[3].name, "glazing");
    assert_eq!(report.tables[3].len(), 2);
}

#[derive(serde::Deserialize)]
struct RatePayersFile {
    rate_payers: Vec<RatePayerRecord>,
}

#[test]
fn rate_payer_retention_from_json() {
    let file: RatePayersFile = serde_json::from_str(
        r#"{ "rate_payers": [
            { "year": 1801, "name": "Thos Wood" },
            { "year": 1801, "name": "Jas Kay" },
            { "year": 1801, "name": "Thos Wood" },
            { "year": 1802, "name": "Thos Wood" },
            { "year": 1803, "name": "" },
            { "year": 1804, "name": "Jas Kay" }
        ] }"#,
    )
    .unwrap();
    let rolls = RateRolls::from_records(&file.rate_payers);
    assert_eq!(rolls.years().collect::<Vec<_>>(), vec![1801, 1802, 1803, 1804]);

    let table = rolls.retention();
    assert_eq!(table.get(1801, 1802), Some(Ratio::Defined(dec!(50))));
    assert_eq!(table.get(1801, 1804), Some(Ratio::Defined(dec!(0))));
    assert_eq!(table.get(1803, 1804), Some(Ratio::Undefined));
    assert_eq!(table.get(1804, 1801), None);

    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["years"][0], 1801);
    assert_eq!(json["cells"][2][2]["status"], "undefined");
    assert!(json["cells"][3][0].is_null());
}
