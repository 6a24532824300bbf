use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::project::{evaluate_with_warnings, EngineConfig, FinancialMetrics, ProjectParameters};
use crate::scenarios::sensitivity::MetricKind;
use crate::scenarios::sweep::pinned_config;
use crate::types::*;
use crate::VillaInvestResult;

/// Metrics listed in a side-by-side comparison, in display order
pub const COMPARISON_METRICS: [MetricKind; 9] = [
    MetricKind::NpvMin,
    MetricKind::NpvMax,
    MetricKind::RoiMin,
    MetricKind::RoiMax,
    MetricKind::IrrMin,
    MetricKind::IrrMax,
    MetricKind::PaybackMin,
    MetricKind::PaybackMax,
    MetricKind::GrossProfit,
];

/// A labelled parameter set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedScenario {
    pub name: String,
    #[serde(default)]
    pub parameters: ProjectParameters,
}

/// Input for comparing two scenarios under one engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonInput {
    pub first: NamedScenario,
    pub second: NamedScenario,
    #[serde(default)]
    pub config: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub metrics: FinancialMetrics,
    /// NPV and IRR verdict at the minimum subsidy
    pub profitable: bool,
    pub verdict: String,
}

/// One metric across both scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub metric: MetricKind,
    pub first: Option<Decimal>,
    pub second: Option<Decimal>,
    /// second − first
    pub difference: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub first: ScenarioSummary,
    pub second: ScenarioSummary,
    pub rows: Vec<ComparisonRow>,
}

fn summarize(
    scenario: &NamedScenario,
    config: &EngineConfig,
    warnings: &mut Vec<String>,
) -> VillaInvestResult<ScenarioSummary> {
    let (metrics, scenario_warnings) = evaluate_with_warnings(&scenario.parameters, config, None)?;
    warnings.extend(
        scenario_warnings
            .into_iter()
            .map(|w| format!("{}: {w}", scenario.name)),
    );

    let profitable = metrics.assessment.profitable_min;
    let verdict = if profitable {
        format!("{} is profitable and offers a positive return on investment", scenario.name)
    } else {
        format!(
            "{} may be less profitable; review the parameters and assess the risks",
            scenario.name
        )
    };

    Ok(ScenarioSummary {
        name: scenario.name.clone(),
        metrics,
        profitable,
        verdict,
    })
}

/// Evaluate two scenarios and line up their headline metrics.
pub fn compare_scenarios(
    input: &ComparisonInput,
) -> VillaInvestResult<ComputationOutput<ScenarioComparison>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    input.config.validate()?;
    let config = pinned_config(&input.config);

    let first = summarize(&input.first, &config, &mut warnings)?;
    let second = summarize(&input.second, &config, &mut warnings)?;

    let rows = COMPARISON_METRICS
        .iter()
        .map(|&metric| {
            let a = metric.extract(&first.metrics);
            let b = metric.extract(&second.metrics);
            ComparisonRow {
                metric,
                first: a,
                second: b,
                difference: a.zip(b).map(|(a, b)| b - a),
            }
        })
        .collect();

    let output = ScenarioComparison { first, second, rows };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Side-by-Side Scenario Comparison",
        &serde_json::json!({
            "first": input.first.name,
            "second": input.second.name,
            "financing_aware": config.financing_aware,
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
    use rust_decimal_macros::dec;

    fn scenario(name: &str, villas: u32) -> NamedScenario {
        NamedScenario {
            name: name.into(),
            parameters: ProjectParameters {
                villa_count: villas,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_compare_ten_and_twenty_villas() {
        let input = ComparisonInput {
            first: scenario("Scenario 1", 10),
            second: scenario("Scenario 2", 20),
            config: EngineConfig {
                financing_aware: false,
                ..Default::default()
            },
        };
        let result = compare_scenarios(&input).unwrap();
        let out = &result.result;
        assert_eq!(out.rows.len(), COMPARISON_METRICS.len());

        let gross = out
            .rows
            .iter()
            .find(|r| r.metric == MetricKind::GrossProfit)
            .unwrap();
        assert_eq!(gross.first, Some(dec!(5110000)));
        assert_eq!(gross.second, Some(dec!(10220000)));
        assert_eq!(gross.difference, Some(dec!(5110000)));
        assert!(out.first.verdict.starts_with("Scenario 1"));
    }

    #[test]
    fn test_invalid_scenario_fails() {
        let input = ComparisonInput {
            first: scenario("ok", 10),
            second: scenario("empty", 0),
            config: EngineConfig::default(),
        };
        assert!(compare_scenarios(&input).is_err());
    }
}
