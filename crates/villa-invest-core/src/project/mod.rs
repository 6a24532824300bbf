pub mod cash_flows;
pub mod config;
pub mod metrics;
pub mod params;

pub use cash_flows::{CashFlowRow, DiscountedProfitPoint};
pub use config::{
    EngineConfig, RateMethod, SubsidyRange, DEFAULT_TERMINAL_VALUE_MULTIPLE,
    MAX_TERMINAL_VALUE_MULTIPLE,
};
pub use metrics::{
    annual_revenue, evaluate, evaluate_project, evaluate_with_warnings, fixed_operating_cost,
    total_construction_cost, variable_operating_cost, FinancialMetrics, ProfitabilityAssessment,
    ProjectEvaluation, ProjectInput,
};
pub use params::{ProjectParameters, MAX_VILLA_COUNT};
