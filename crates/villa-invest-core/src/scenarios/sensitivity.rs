use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::VillaInvestError;
use crate::project::{evaluate, EngineConfig, FinancialMetrics, ProjectParameters};
use crate::scenarios::sweep::{pinned_config, ParameterField, MAX_SWEEP_POINTS};
use crate::types::*;
use crate::VillaInvestResult;

/// Metric read out of each evaluated scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    NpvMin,
    NpvMax,
    IrrMin,
    IrrMax,
    RoiMin,
    RoiMax,
    AnnualizedRoiMin,
    AnnualizedRoiMax,
    PaybackMin,
    PaybackMax,
    NetProfitMin,
    NetProfitMax,
    GrossProfit,
    OperatingProfit,
    ConstructionCost,
}

impl MetricKind {
    pub const ALL: [MetricKind; 15] = [
        MetricKind::NpvMin,
        MetricKind::NpvMax,
        MetricKind::IrrMin,
        MetricKind::IrrMax,
        MetricKind::RoiMin,
        MetricKind::RoiMax,
        MetricKind::AnnualizedRoiMin,
        MetricKind::AnnualizedRoiMax,
        MetricKind::PaybackMin,
        MetricKind::PaybackMax,
        MetricKind::NetProfitMin,
        MetricKind::NetProfitMax,
        MetricKind::GrossProfit,
        MetricKind::OperatingProfit,
        MetricKind::ConstructionCost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::NpvMin => "npv_min",
            MetricKind::NpvMax => "npv_max",
            MetricKind::IrrMin => "irr_min",
            MetricKind::IrrMax => "irr_max",
            MetricKind::RoiMin => "roi_min",
            MetricKind::RoiMax => "roi_max",
            MetricKind::AnnualizedRoiMin => "annualized_roi_min",
            MetricKind::AnnualizedRoiMax => "annualized_roi_max",
            MetricKind::PaybackMin => "payback_min",
            MetricKind::PaybackMax => "payback_max",
            MetricKind::NetProfitMin => "net_profit_min",
            MetricKind::NetProfitMax => "net_profit_max",
            MetricKind::GrossProfit => "gross_profit",
            MetricKind::OperatingProfit => "operating_profit",
            MetricKind::ConstructionCost => "construction_cost",
        }
    }

    /// Value of this metric, `None` when undefined for the scenario.
    pub fn extract(&self, m: &FinancialMetrics) -> Option<Decimal> {
        match self {
            MetricKind::NpvMin => Some(m.npv_min),
            MetricKind::NpvMax => Some(m.npv_max),
            MetricKind::IrrMin => m.irr_min,
            MetricKind::IrrMax => m.irr_max,
            MetricKind::RoiMin => m.roi_min_pct,
            MetricKind::RoiMax => m.roi_max_pct,
            MetricKind::AnnualizedRoiMin => m.annualized_roi_min,
            MetricKind::AnnualizedRoiMax => m.annualized_roi_max,
            MetricKind::PaybackMin => m.payback_years_min,
            MetricKind::PaybackMax => m.payback_years_max,
            MetricKind::NetProfitMin => Some(m.net_annual_profit_with_subsidy_min),
            MetricKind::NetProfitMax => Some(m.net_annual_profit_with_subsidy_max),
            MetricKind::GrossProfit => Some(m.gross_annual_profit),
            MetricKind::OperatingProfit => Some(m.operating_profit),
            MetricKind::ConstructionCost => Some(m.total_construction_cost),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = VillaInvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_lowercase().replace('-', "_");
        MetricKind::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == key)
            .ok_or_else(|| VillaInvestError::InvalidInput {
                field: "metric".into(),
                reason: format!("Unknown metric '{s}'"),
            })
    }
}

/// Input for 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    #[serde(default)]
    pub parameters: ProjectParameters,
    #[serde(default)]
    pub config: EngineConfig,
    /// Row variable; `name` must be a sweepable parameter
    pub variable_1: SensitivityVariable,
    /// Column variable
    pub variable_2: SensitivityVariable,
    pub output_metric: MetricKind,
}

/// Output of 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: MetricKind,
    /// Matrix[i][j] = metric when variable_1 = variable_1_values[i], variable_2 = variable_2_values[j]
    pub matrix: Vec<Vec<Option<Decimal>>>,
    pub base_case_value: Option<Decimal>,
    /// Position of the base case in the matrix (row, col)
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
pub fn generate_sweep_values(var: &SensitivityVariable) -> VillaInvestResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(VillaInvestError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(VillaInvestError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let points = (var.max - var.min)
        .checked_div(var.step)
        .map(|n| n.floor())
        // Up to two values beyond the whole steps: min itself and a closing max
        .filter(|n| *n + dec!(2) <= Decimal::from(MAX_SWEEP_POINTS as u64));
    if points.is_none() {
        return Err(VillaInvestError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: format!("Range and step give more than {MAX_SWEEP_POINTS} values"),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Close the range when the step overshoots max
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Index of the value nearest to `target`.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Evaluate a 2-way grid of one metric over two swept parameters.
///
/// Rows are evaluated in parallel. Cells that fail validation, or whose
/// metric is undefined, are `None`.
pub fn evaluate_sensitivity(
    input: &SensitivityInput,
) -> VillaInvestResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let field_1: ParameterField = input.variable_1.name.parse()?;
    let field_2: ParameterField = input.variable_2.name.parse()?;
    if field_1 == field_2 {
        return Err(VillaInvestError::InvalidInput {
            field: "variable_2".into(),
            reason: "Sensitivity variables must differ".into(),
        });
    }
    input.config.validate()?;
    let config = pinned_config(&input.config);

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = generate_sweep_values(&input.variable_2)?;

    let rows: Vec<(Vec<Option<Decimal>>, Vec<String>)> = v1_values
        .par_iter()
        .map(|&v1| {
            let mut row = Vec::with_capacity(v2_values.len());
            let mut failures = Vec::new();
            for &v2 in &v2_values {
                let cell = field_1
                    .apply(&input.parameters, v1)
                    .and_then(|p| field_2.apply(&p, v2))
                    .and_then(|p| evaluate(&p, &config, None));
                match cell {
                    Ok(metrics) => row.push(input.output_metric.extract(&metrics)),
                    Err(e) => {
                        failures.push(format!("Evaluation failed at ({v1}, {v2}): {e}"));
                        row.push(None);
                    }
                }
            }
            (row, failures)
        })
        .collect();

    let mut matrix = Vec::with_capacity(rows.len());
    for (row, failures) in rows {
        warnings.extend(failures);
        matrix.push(row);
    }

    let mid1 = (input.variable_1.min + input.variable_1.max) / dec!(2);
    let mid2 = (input.variable_2.min + input.variable_2.max) / dec!(2);
    let base_row = closest_index(&v1_values, mid1);
    let base_col = closest_index(&v2_values, mid2);
    let base_case_value = matrix[base_row][base_col];

    let output = SensitivityOutput {
        variable_1_name: field_1.as_str().into(),
        variable_2_name: field_2.as_str().into(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: input.output_metric,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity Analysis",
        &serde_json::json!({
            "variable_1": field_1.as_str(),
            "variable_2": field_2.as_str(),
            "output_metric": input.output_metric.as_str(),
            "rate_method": config.rate_method.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> SensitivityInput {
        SensitivityInput {
            parameters: ProjectParameters::default(),
            config: EngineConfig {
                financing_aware: false,
                ..Default::default()
            },
            variable_1: SensitivityVariable {
                name: "price_per_night".into(),
                min: dec!(3000),
                max: dec!(4000),
                step: dec!(250),
            },
            variable_2: SensitivityVariable {
                name: "occupancy_rate".into(),
                min: dec!(0.3),
                max: dec!(0.5),
                step: dec!(0.1),
            },
            output_metric: MetricKind::NpvMin,
        }
    }

    #[test]
    fn test_grid_dimensions_and_base_case() {
        let result = evaluate_sensitivity(&sample_input()).unwrap();
        let out = &result.result;
        assert_eq!(out.variable_1_values.len(), 5);
        assert_eq!(out.variable_2_values.len(), 3);
        assert_eq!(out.matrix.len(), 5);
        assert_eq!(out.matrix[0].len(), 3);
        // Midpoints 3500 / 0.4 land on the default scenario
        assert_eq!(out.base_case_position, (2, 1));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_npv_increases_with_price_and_occupancy() {
        let out = evaluate_sensitivity(&sample_input()).unwrap().result;
        for i in 0..out.matrix.len() - 1 {
            assert!(out.matrix[i + 1][0].unwrap() > out.matrix[i][0].unwrap());
        }
        for j in 0..out.matrix[0].len() - 1 {
            assert!(out.matrix[0][j + 1].unwrap() > out.matrix[0][j].unwrap());
        }
    }

    #[test]
    fn test_invalid_cells_are_none() {
        let mut input = sample_input();
        input.variable_2 = SensitivityVariable {
            name: "occupancy_rate".into(),
            min: dec!(0.9),
            max: dec!(1.1),
            step: dec!(0.1),
        };
        let result = evaluate_sensitivity(&input).unwrap();
        assert!(result.result.matrix.iter().all(|row| row[2].is_none()));
        assert_eq!(result.warnings.len(), 5);
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let mut input = sample_input();
        input.variable_1.name = "weather".into();
        assert!(evaluate_sensitivity(&input).is_err());
    }

    #[test]
    fn test_same_variable_rejected() {
        let mut input = sample_input();
        input.variable_2.name = "price_per_night".into();
        assert!(evaluate_sensitivity(&input).is_err());
    }

    #[test]
    fn test_sweep_with_non_exact_step() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(0),
            max: dec!(1),
            step: dec!(0.3),
        };
        let vals = generate_sweep_values(&var).unwrap();
        assert_eq!(vals.len(), 5);
        assert_eq!(*vals.last().unwrap(), dec!(1));
    }

    #[test]
    fn test_invalid_step() {
        let var = SensitivityVariable {
            name: "bad".into(),
            min: dec!(0),
            max: dec!(1),
            step: dec!(0),
        };
        assert!(generate_sweep_values(&var).is_err());
    }

    #[test]
    fn test_tiny_step_rejected() {
        let var = SensitivityVariable {
            name: "price_per_night".into(),
            min: dec!(3000),
            max: dec!(4000),
            step: dec!(0.0000001),
        };
        assert!(matches!(
            generate_sweep_values(&var),
            Err(VillaInvestError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_metric_names() {
        for metric in MetricKind::ALL {
            assert_eq!(metric.as_str().parse::<MetricKind>().unwrap(), metric);
        }
    }
}
