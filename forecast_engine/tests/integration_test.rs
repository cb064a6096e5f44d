use forecast_engine::batch::{
    evaluate_locations, forecast_locations, forecast_rows_to_dataframe, rank_top_locations,
    read_forecast_rows,
};
use forecast_engine::config::EngineConfig;
use forecast_engine::data::DataLoader;
use forecast_engine::utils::write_csv;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const CONFIG: &str = r#"{
    "boosting": { "n_estimators": 30, "max_depth": 3 },
    "horizons": [
        { "label": "1_week", "days": 7 },
        { "label": "30_days", "days": 30 }
    ],
    "top_n": 1
}"#;

/// Three cities over two provinces, 120 days each, plus one short city
fn history_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,province,city,Renewable_Score,TAVG").unwrap();

    let cities = [("ON", "Ottawa", 0.6), ("ON", "Toronto", 0.4), ("BC", "Victoria", 0.5)];
    for (province, city, level) in cities {
        for i in 0..120 {
            let date = chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                + chrono::Duration::days(i);
            let score = level + 0.1 * (i as f64 / 9.0).sin();
            let tavg = -5.0 + i as f64 * 0.2;
            writeln!(file, "{},{},{},{:.4},{:.2}", date, province, city, score, tavg).unwrap();
        }
    }
    for i in 1..=5 {
        writeln!(file, "2023-01-0{},BC,Tofino,0.7,4.0", i).unwrap();
    }

    file
}

#[test]
fn test_forecast_rank_round_trip() {
    let config = EngineConfig::from_json_str(CONFIG).unwrap();
    let input = history_csv();

    let locations = DataLoader::from_csv(input.path(), &config.target_column).unwrap();
    assert_eq!(locations.len(), 4);

    let rows = forecast_locations(&locations, &config);
    // Tofino is below min_history; the other three get 7 + 30 rows each
    assert_eq!(rows.len(), 3 * 37);
    assert!(rows.iter().all(|r| r.city != "Tofino"));
    assert!(rows.iter().all(|r| r.forecast.is_finite()));

    // Location order follows the loader, horizons follow the config
    assert_eq!(rows[0].city, "Victoria");
    assert_eq!(rows[0].period, "1_week");
    assert_eq!(rows[7].period, "30_days");

    let dir = tempdir().unwrap();
    let path = dir.path().join("forecast_results.csv");
    let mut df = forecast_rows_to_dataframe(&rows).unwrap();
    write_csv(&mut df, &path).unwrap();

    let reloaded = read_forecast_rows(&path).unwrap();
    assert_eq!(reloaded.len(), rows.len());
    assert_eq!(reloaded[0].date, rows[0].date);
    assert_eq!(reloaded[0].province, "BC");

    let ranked = rank_top_locations(&reloaded, config.top_n);
    let groups: Vec<(&str, &str)> = ranked
        .iter()
        .map(|r| (r.province.as_str(), r.period.as_str()))
        .collect();
    assert_eq!(
        groups,
        vec![
            ("BC", "1_week"),
            ("BC", "30_days"),
            ("ON", "1_week"),
            ("ON", "30_days"),
        ]
    );
}

#[test]
fn test_batch_is_deterministic() {
    let config = EngineConfig::from_json_str(CONFIG).unwrap();
    let input = history_csv();
    let locations = DataLoader::from_csv(input.path(), &config.target_column).unwrap();

    let first = forecast_locations(&locations, &config);
    let second = forecast_locations(&locations, &config);
    assert_eq!(first, second);
}

#[test]
fn test_evaluate_locations_skips_short_history() {
    let config = EngineConfig::from_json_str(CONFIG).unwrap();
    let input = history_csv();
    let locations = DataLoader::from_csv(input.path(), &config.target_column).unwrap();

    let evaluations = evaluate_locations(&locations, &config);
    assert_eq!(evaluations.len(), 3);
    for evaluation in &evaluations {
        assert_eq!(evaluation.report.scores.len(), 3);
    }
}
