use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

use villa_invest_core::project::{self, ProjectEvaluation, ProjectInput};
use villa_invest_core::scenarios::{self, MAX_CHART_VILLAS, MIN_CHART_VILLAS};

use super::ProjectArgs;

/// Arguments for exporting a CSV workbook
#[derive(Args)]
pub struct ExportArgs {
    /// Directory to write the workbook files into (created if missing)
    #[arg(long)]
    pub dir: String,

    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Flatten a serializable record into `(field, value)` rows.
fn field_rows(value: &Value, prefix: &str, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                field_rows(val, &name, rows);
            }
        }
        Value::String(s) => rows.push((prefix.to_string(), s.clone())),
        Value::Null => rows.push((prefix.to_string(), "N/A".to_string())),
        other => rows.push((prefix.to_string(), other.to_string())),
    }
}

fn write_field_sheet(path: &Path, header: [&str; 2], value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    let mut rows = Vec::new();
    field_rows(value, "", &mut rows);
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(header)?;
    for (field, val) in rows {
        wtr.write_record([field, val])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_schedule_sheet(path: &Path, evaluation: &ProjectEvaluation) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["period", "principal", "interest", "payment", "remaining_balance"])?;
    for payment in evaluation.loan_schedule.iter().map(|p| p.rounded()) {
        wtr.write_record([
            payment.period.to_string(),
            payment.principal.to_string(),
            payment.interest.to_string(),
            payment.payment.to_string(),
            payment.remaining_balance.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_chart_sheet(
    path: &Path,
    evaluation: &ProjectEvaluation,
    input: &ProjectInput,
) -> Result<(), Box<dyn std::error::Error>> {
    let roi = scenarios::roi_by_villa_count(
        &input.parameters,
        &input.config,
        MIN_CHART_VILLAS,
        MAX_CHART_VILLAS,
    )?
    .result;

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["series", "x", "min_subsidy", "max_subsidy"])?;
    for point in &evaluation.discounted_profit {
        wtr.write_record([
            "discounted_profit".to_string(),
            point.year.to_string(),
            point.discounted_profit_min.round_dp(2).to_string(),
            point.discounted_profit_max.round_dp(2).to_string(),
        ])?;
    }
    for row in &evaluation.cash_flows {
        wtr.write_record([
            "cash_flow".to_string(),
            row.year.to_string(),
            row.flow_min_subsidy.round_dp(2).to_string(),
            row.flow_max_subsidy.round_dp(2).to_string(),
        ])?;
    }
    let pct = |v: Option<Decimal>| v.map(|d| d.round_dp(4).to_string()).unwrap_or_default();
    for row in &roi {
        wtr.write_record([
            "roi_pct_by_villa_count".to_string(),
            row.villa_count.to_string(),
            pct(row.roi_min_pct),
            pct(row.roi_max_pct),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_workbook(
    dir: &Path,
    input: &ProjectInput,
    evaluation: &ProjectEvaluation,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    fs::create_dir_all(dir)?;

    let parameters = dir.join("parameters.csv");
    let inputs = json!({
        "parameters": input.parameters,
        "config": input.config,
    });
    write_field_sheet(&parameters, ["parameter", "value"], &inputs)?;

    let metrics = dir.join("metrics.csv");
    write_field_sheet(&metrics, ["metric", "value"], &serde_json::to_value(&evaluation.metrics)?)?;

    let schedule = dir.join("loan_schedule.csv");
    write_schedule_sheet(&schedule, evaluation)?;

    let chart = dir.join("chart_data.csv");
    write_chart_sheet(&chart, evaluation, input)?;

    Ok(vec![parameters, metrics, schedule, chart])
}

pub fn run_export(args: ExportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = args.project.resolve()?;
    let result = project::evaluate_project(&input)?;

    let dir = Path::new(&args.dir);
    let files = write_workbook(dir, &input, &result.result)
        .map_err(|e| format!("export to '{}' failed: {e}", dir.display()))?;
    log::info!("wrote {} workbook files to {}", files.len(), dir.display());

    Ok(json!({
        "result": {
            "directory": dir.display().to_string(),
            "files": files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
            "npv_min": result.result.metrics.npv_min,
            "roi_min_pct": result.result.metrics.roi_min_pct,
        },
        "methodology": "CSV Workbook Export",
        "warnings": result.warnings,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use villa_invest_core::project::EngineConfig;

    #[test]
    fn test_field_rows_flatten_nested() {
        let mut rows = Vec::new();
        field_rows(&json!({"a": {"b": "1", "c": null}, "d": true}), "", &mut rows);
        assert_eq!(
            rows,
            vec![
                ("a.b".to_string(), "1".to_string()),
                ("a.c".to_string(), "N/A".to_string()),
                ("d".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_workbook_files_written() {
        let dir = std::env::temp_dir().join(format!("villa-export-{}", std::process::id()));
        let input = ProjectInput {
            config: EngineConfig {
                valuation_date: NaiveDate::from_ymd_opt(2025, 1, 1),
                ..Default::default()
            },
            ..Default::default()
        };
        let evaluation = project::evaluate_project(&input).unwrap().result;
        let files = write_workbook(&dir, &input, &evaluation).unwrap();
        assert_eq!(files.len(), 4);

        let schedule = fs::read_to_string(dir.join("loan_schedule.csv")).unwrap();
        // Header plus 180 monthly rows
        assert_eq!(schedule.lines().count(), 181);
        let metrics = fs::read_to_string(dir.join("metrics.csv")).unwrap();
        assert!(metrics.contains("total_construction_cost,37750000"));

        fs::remove_dir_all(&dir).unwrap();
    }
}
