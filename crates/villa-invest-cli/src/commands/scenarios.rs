use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use villa_invest_core::scenarios::{
    self, ComparisonInput, MetricKind, NamedScenario, ParameterField, SensitivityInput,
    MAX_CHART_VILLAS, MIN_CHART_VILLAS,
};
use villa_invest_core::types::SensitivityVariable;

use super::ProjectArgs;
use crate::input;

/// Parse `name:min:max:step` into a sweep variable.
fn parse_sens_var(text: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            text
        )
        .into());
    }
    Ok(SensitivityVariable {
        name: parts[0].to_string(),
        min: parts[1].parse()?,
        max: parts[2].parse()?,
        step: parts[3].parse()?,
    })
}

/// Arguments for a one-parameter sweep
#[derive(Args)]
pub struct SweepArgs {
    /// Parameter to vary (e.g. price_per_night, occupancy_rate, villa_count)
    #[arg(long)]
    pub field: ParameterField,

    /// Explicit values, comma-separated (fractions for rates)
    #[arg(long, value_delimiter = ',', conflicts_with = "range")]
    pub values: Option<Vec<Decimal>>,

    /// Range as min:max:step
    #[arg(long)]
    pub range: Option<String>,

    /// Report a single metric per point instead of the full metrics
    #[arg(long)]
    pub metric: Option<MetricKind>,

    #[command(flatten)]
    pub project: ProjectArgs,
}

pub fn run_sweep(args: SweepArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project = args.project.resolve()?;

    let values = match (args.values, args.range) {
        (Some(values), _) => values,
        (None, Some(range)) => {
            let var = parse_sens_var(&format!("{}:{range}", args.field))?;
            scenarios::sensitivity::generate_sweep_values(&var)?
        }
        (None, None) => return Err("--values or --range is required".into()),
    };

    let result = scenarios::sweep_parameter(&project.parameters, &project.config, args.field, &values)?;

    let Some(metric) = args.metric else {
        return Ok(serde_json::to_value(result)?);
    };

    let rows: Vec<Value> = result
        .result
        .points
        .iter()
        .map(|p| {
            json!({
                args.field.as_str(): p.value,
                metric.as_str(): p.metrics.as_ref().and_then(|m| metric.extract(m)),
                "error": p.error,
            })
        })
        .collect();
    Ok(json!({
        "result": rows,
        "methodology": result.methodology,
        "assumptions": result.assumptions,
        "warnings": result.warnings,
        "metadata": result.metadata,
    }))
}

/// Arguments for the ROI-by-villa-count chart data
#[derive(Args)]
pub struct RoiChartArgs {
    /// Smallest villa count
    #[arg(long, default_value_t = MIN_CHART_VILLAS)]
    pub min_villas: u32,

    /// Largest villa count
    #[arg(long, default_value_t = MAX_CHART_VILLAS)]
    pub max_villas: u32,

    #[command(flatten)]
    pub project: ProjectArgs,
}

pub fn run_roi_chart(args: RoiChartArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project = args.project.resolve()?;
    let result = scenarios::roi_by_villa_count(
        &project.parameters,
        &project.config,
        args.min_villas,
        args.max_villas,
    )?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for 2-way sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Row variable as name:min:max:step (e.g. "prime_rate:0.02:0.06:0.01")
    #[arg(long)]
    pub var1: String,

    /// Column variable as name:min:max:step
    #[arg(long)]
    pub var2: String,

    /// Metric shown in each cell
    #[arg(long, default_value = "npv_min")]
    pub metric: MetricKind,

    #[command(flatten)]
    pub project: ProjectArgs,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let project = args.project.resolve()?;
    let input = SensitivityInput {
        parameters: project.parameters,
        config: project.config,
        variable_1: parse_sens_var(&args.var1)?,
        variable_2: parse_sens_var(&args.var2)?,
        output_metric: args.metric,
    };
    let result = scenarios::evaluate_sensitivity(&input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for side-by-side scenario comparison
#[derive(Args)]
pub struct CompareArgs {
    /// JSON or YAML file with `first`, `second` and optional `config`
    #[arg(long)]
    pub scenarios: Option<String>,

    /// Villa count of the first scenario
    #[arg(long, default_value_t = 10)]
    pub first_villas: u32,

    /// Villa count of the second scenario
    #[arg(long, default_value_t = 20)]
    pub second_villas: u32,

    #[command(flatten)]
    pub project: ProjectArgs,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let comparison: ComparisonInput = if let Some(ref path) = args.scenarios {
        serde_json::from_value(input::file::read_value(path)?)?
    } else {
        let project = args.project.resolve()?;
        let scenario = |name: &str, villas: u32| NamedScenario {
            name: name.into(),
            parameters: villa_invest_core::project::ProjectParameters {
                villa_count: villas,
                ..project.parameters.clone()
            },
        };
        ComparisonInput {
            first: scenario("Scenario 1", args.first_villas),
            second: scenario("Scenario 2", args.second_villas),
            config: project.config.clone(),
        }
    };

    let result = scenarios::compare_scenarios(&comparison)?;
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_sens_var() {
        let var = parse_sens_var("prime_rate:0.02:0.06:0.01").unwrap();
        assert_eq!(var.name, "prime_rate");
        assert_eq!(var.min, dec!(0.02));
        assert_eq!(var.step, dec!(0.01));
        assert!(parse_sens_var("prime_rate:0.02").is_err());
    }
}
