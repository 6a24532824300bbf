use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use villa_invest_core::project::{evaluate, EngineConfig, ProjectParameters};
use villa_invest_core::scenarios::{
    compare_scenarios, evaluate_sensitivity, roi_by_villa_count, sweep_parameter, ComparisonInput,
    MetricKind, NamedScenario, ParameterField, SensitivityInput, MAX_CHART_VILLAS, MIN_CHART_VILLAS,
};
use villa_invest_core::types::SensitivityVariable;

fn operating_only() -> EngineConfig {
    EngineConfig {
        financing_aware: false,
        ..Default::default()
    }
}

#[test]
fn test_sweep_matches_direct_evaluation() {
    let base = ProjectParameters::default();
    let config = operating_only();
    let values = [dec!(0.06), dec!(0.08), dec!(0.10), dec!(0.12)];
    let sweep = sweep_parameter(&base, &config, ParameterField::DiscountRate, &values).unwrap();

    for point in &sweep.result.points {
        let params = ProjectParameters {
            discount_rate: point.value,
            ..base.clone()
        };
        let direct = evaluate(&params, &config, None).unwrap();
        assert_eq!(point.metrics.as_ref().unwrap(), &direct);
    }
}

#[test]
fn test_sweep_npv_falls_with_discount_rate() {
    let values: Vec<Decimal> = (1..=12).map(|p| Decimal::from(p) / dec!(100)).collect();
    let sweep = sweep_parameter(
        &ProjectParameters::default(),
        &operating_only(),
        ParameterField::DiscountRate,
        &values,
    )
    .unwrap();
    let npvs: Vec<Decimal> = sweep
        .result
        .points
        .iter()
        .map(|p| p.metrics.as_ref().unwrap().npv_max)
        .collect();
    for w in npvs.windows(2) {
        assert!(w[1] < w[0]);
    }
}

#[test]
fn test_sweep_leaves_base_untouched() {
    let base = ProjectParameters::default();
    let before = base.clone();
    let _ = sweep_parameter(
        &base,
        &EngineConfig::default(),
        ParameterField::VillaCount,
        &[dec!(5), dec!(40)],
    )
    .unwrap();
    assert_eq!(base, before);
}

#[test]
fn test_roi_by_villa_count_matches_default_point() {
    let base = ProjectParameters::default();
    let config = EngineConfig::default();
    let chart = roi_by_villa_count(&base, &config, MIN_CHART_VILLAS, MAX_CHART_VILLAS).unwrap();
    let ten = chart.result.iter().find(|r| r.villa_count == 10).unwrap();
    let direct = evaluate(&base, &config, None).unwrap();
    assert_eq!(ten.roi_min_pct, direct.roi_min_pct);
    assert_eq!(ten.roi_max_pct, direct.roi_max_pct);
}

#[test]
fn test_roi_by_villa_count_rejects_empty_range() {
    let base = ProjectParameters::default();
    assert!(roi_by_villa_count(&base, &operating_only(), 12, 8).is_err());
    assert!(roi_by_villa_count(&base, &operating_only(), 0, 8).is_err());
}

#[test]
fn test_sensitivity_roi_grid() {
    let input = SensitivityInput {
        parameters: ProjectParameters::default(),
        config: EngineConfig::default(),
        variable_1: SensitivityVariable {
            name: "prime_rate".into(),
            min: dec!(0.02),
            max: dec!(0.06),
            step: dec!(0.01),
        },
        variable_2: SensitivityVariable {
            name: "villa_count".into(),
            min: dec!(8),
            max: dec!(12),
            step: dec!(2),
        },
        output_metric: MetricKind::RoiMin,
    };
    let result = evaluate_sensitivity(&input).unwrap();
    let out = &result.result;
    assert_eq!(out.variable_1_values.len(), 5);
    assert_eq!(out.variable_2_values, vec![dec!(8), dec!(10), dec!(12)]);
    assert_eq!(out.base_case_position, (2, 1));

    // Higher prime ⇒ more interest ⇒ lower ROI
    for j in 0..3 {
        for i in 0..4 {
            assert!(out.matrix[i + 1][j].unwrap() < out.matrix[i][j].unwrap());
        }
    }
}

#[test]
fn test_sensitivity_base_case_matches_evaluate() {
    let input = SensitivityInput {
        parameters: ProjectParameters::default(),
        config: operating_only(),
        variable_1: SensitivityVariable {
            name: "price_per_night".into(),
            min: dec!(3000),
            max: dec!(4000),
            step: dec!(500),
        },
        variable_2: SensitivityVariable {
            name: "tax_rate".into(),
            min: dec!(0.05),
            max: dec!(0.10),
            step: dec!(0.025),
        },
        output_metric: MetricKind::PaybackMin,
    };
    let out = evaluate_sensitivity(&input).unwrap().result;
    let direct = evaluate(&ProjectParameters::default(), &operating_only(), None).unwrap();
    assert_eq!(out.base_case_value, direct.payback_years_min);
}

#[test]
fn test_compare_scenarios_verdicts() {
    let strong = NamedScenario {
        name: "Premium".into(),
        parameters: ProjectParameters {
            price_per_night: dec!(7000),
            occupancy_rate: dec!(0.6),
            ..Default::default()
        },
    };
    let weak = NamedScenario {
        name: "Reference".into(),
        parameters: ProjectParameters::default(),
    };
    let input = ComparisonInput {
        first: weak,
        second: strong,
        config: EngineConfig::default(),
    };
    let out = compare_scenarios(&input).unwrap().result;
    assert!(!out.first.profitable);
    assert!(out.second.profitable);

    let npv = out.rows.iter().find(|r| r.metric == MetricKind::NpvMin).unwrap();
    assert!(npv.difference.unwrap() > Decimal::ZERO);
    assert_eq!(out.rows[0].metric, MetricKind::NpvMin);
    assert_eq!(out.rows[8].metric, MetricKind::GrossProfit);
}

#[test]
fn test_comparison_input_from_json() {
    let input: ComparisonInput = serde_json::from_str(
        r#"{
            "first": {"name": "Scenario 1", "parameters": {"villa_count": 10}},
            "second": {"name": "Scenario 2", "parameters": {"villa_count": 20}},
            "config": {"financing_aware": false}
        }"#,
    )
    .unwrap();
    assert_eq!(input.second.parameters.villa_count, 20);
    assert!(!input.config.financing_aware);
    let out = compare_scenarios(&input).unwrap().result;
    assert_eq!(out.second.metrics.annual_revenue, dec!(10220000));
}
