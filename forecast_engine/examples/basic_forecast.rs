use chrono::{Duration, NaiveDate};
use forecast_engine::data::{HistoricalSeries, Observation};
use forecast_engine::models::autoregressive::importance_to_dataframe;
use forecast_engine::models::ensemble::EnsembleForecaster;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Forecast Engine: Basic Forecasting Example");
    println!("==========================================\n");

    println!("Creating sample data...");
    let history = create_sample_history(2 * 365)?;
    println!("Sample data created: {} daily observations\n", history.len());

    println!("Evaluating on the last 30 days...");
    let ensemble = EnsembleForecaster::default();
    let report = ensemble.evaluate(&history, 30)?;
    println!("{}", report);

    println!("Training on the full history...");
    let mut ensemble = EnsembleForecaster::default();
    ensemble.train(&history)?;
    println!(
        "Validation RMSE: {:.4}\n",
        ensemble.autoregressive().validation_rmse()?
    );

    let importances = ensemble.autoregressive().get_feature_importance()?;
    println!("Feature importance:\n{}\n", importance_to_dataframe(&importances)?);

    let fixed = ensemble.predict(&history, 14)?;
    println!("Static weights (14 days):\n{}\n", fixed.to_dataframe()?);

    let adaptive = ensemble.adaptive_predict(&history, 14)?;
    println!("Adaptive weights (14 days):\n{}", adaptive.to_dataframe()?);

    Ok(())
}

/// Seasonal score with a weekly wobble and temperature covariates
fn create_sample_history(days: i64) -> Result<HistoricalSeries, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).ok_or("invalid start date")?;

    let observations = (0..days)
        .map(|i| {
            let t = i as f64;
            let season = (2.0 * std::f64::consts::PI * t / 365.25).sin();
            let wobble = 0.04 * (t * 0.9).sin();
            let tavg = 8.0 + 12.0 * season;

            Observation::new(start + Duration::days(i), 0.5 + 0.3 * season + wobble)
                .with_covariate("TAVG", tavg)
                .with_covariate("TMAX", tavg + 5.0)
                .with_covariate("TMIN", tavg - 5.0)
                .with_covariate("PRCP", 2.0 + (t * 0.37).cos())
        })
        .collect();

    Ok(HistoricalSeries::new(observations)?)
}
