//! `daycast predict`: forecast locally or through the server

use anyhow::{Context, Result};
use forecast_lib::{ModelRegistry, ModelStore, PredictionPipeline, RawInput};
use std::sync::Arc;
use tabled::Tabled;

use crate::client::{ApiClient, PredictResponse};
use crate::output::{print_info, print_json, print_table, OutputFormat};
use crate::PredictArgs;

/// Row for the forecast table
#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Day")]
    day: usize,
    #[tabled(rename = "Value")]
    value: f64,
    #[tabled(rename = "Source")]
    source: &'static str,
}

/// Build the request body, leaving omitted days absent
pub fn build_input(args: &PredictArgs) -> RawInput {
    let mut input = RawInput::default();
    for (idx, value) in args.days().iter().enumerate() {
        if let Some(value) = value {
            input.set_day(idx + 1, serde_json::Value::from(*value));
        }
    }
    input
}

fn predict_local(args: &PredictArgs, input: &RawInput) -> Result<PredictResponse> {
    let store = ModelStore::new(&args.model_dir);
    let registry = ModelRegistry::load(&store)
        .with_context(|| format!("Failed to load models from {}", args.model_dir.display()))?;
    let pipeline = PredictionPipeline::new(Arc::new(registry));

    let forecast = pipeline.predict_raw(Some(input))?;
    Ok(PredictResponse {
        predictions: forecast.timeline,
        days_used: forecast.days_used,
    })
}

/// Run a prediction and print the timeline
pub async fn run_prediction(args: &PredictArgs, format: OutputFormat) -> Result<()> {
    let input = build_input(args);

    let response = if args.local {
        predict_local(args, &input)?
    } else {
        let client = ApiClient::new(&args.api_url)?;
        client.predict(&input).await?
    };

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            let rows: Vec<DayRow> = response
                .predictions
                .iter()
                .enumerate()
                .map(|(idx, value)| DayRow {
                    day: idx + 1,
                    value: *value,
                    source: if idx < response.days_used {
                        "observed"
                    } else {
                        "forecast"
                    },
                })
                .collect();
            print_table(rows);
            print_info(&format!("Forecast from {} observed day(s)", response.days_used));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(days: [Option<f64>; 7]) -> PredictArgs {
        PredictArgs {
            day1: days[0],
            day2: days[1],
            day3: days[2],
            day4: days[3],
            day5: days[4],
            day6: days[5],
            day7: days[6],
            local: true,
            model_dir: PathBuf::from("model"),
            api_url: "http://localhost:5000".to_string(),
        }
    }

    #[test]
    fn test_build_input_keeps_gaps() {
        let input = build_input(&args([Some(5.0), Some(3.0), None, Some(9.0), None, None, None]));
        assert!(input.day(1).is_some());
        assert!(input.day(3).is_none());
        assert!(input.day(4).is_some());
    }

    #[test]
    fn test_local_prediction_without_models() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut a = args([Some(1.0), None, None, None, None, None, None]);
        a.model_dir = dir.path().to_path_buf();

        let err = predict_local(&a, &build_input(&a)).unwrap_err();
        assert_eq!(err.to_string(), "no model for 1 days");
    }

    #[test]
    fn test_local_prediction_requires_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut a = args([None; 7]);
        a.model_dir = dir.path().to_path_buf();

        let err = predict_local(&a, &build_input(&a)).unwrap_err();
        assert_eq!(err.to_string(), "no data provided");
    }
}
