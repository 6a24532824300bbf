pub mod comparison;
pub mod sensitivity;
pub mod sweep;

pub use comparison::{compare_scenarios, ComparisonInput, NamedScenario, ScenarioComparison};
pub use sensitivity::{evaluate_sensitivity, MetricKind, SensitivityInput, SensitivityOutput};
pub use sweep::{
    roi_by_villa_count, sweep_parameter, ParameterField, SweepOutput, SweepPoint, VillaCountRoi,
    MAX_CHART_VILLAS, MAX_SWEEP_POINTS, MIN_CHART_VILLAS,
};
