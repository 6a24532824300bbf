use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use villa_invest_core::financing::{self, LoanInput};
use villa_invest_core::project::{self, EngineConfig, ProjectInput, ProjectParameters};
use villa_invest_core::scenarios::{
    self, ComparisonInput, ParameterField, SensitivityInput, MAX_CHART_VILLAS, MIN_CHART_VILLAS,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct SweepRequest {
    #[serde(default)]
    parameters: ProjectParameters,
    #[serde(default)]
    config: EngineConfig,
    field: ParameterField,
    values: Vec<Decimal>,
}

fn default_min_villas() -> u32 {
    MIN_CHART_VILLAS
}

fn default_max_villas() -> u32 {
    MAX_CHART_VILLAS
}

#[derive(Deserialize)]
struct RoiChartRequest {
    #[serde(default)]
    parameters: ProjectParameters,
    #[serde(default)]
    config: EngineConfig,
    #[serde(default = "default_min_villas")]
    min_villas: u32,
    #[serde(default = "default_max_villas")]
    max_villas: u32,
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_project(input_json: String) -> NapiResult<String> {
    let input: ProjectInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = project::evaluate_project(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

#[napi]
pub fn loan_schedule(input_json: String) -> NapiResult<String> {
    let input: LoanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = financing::build_loan_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn sweep_parameter(input_json: String) -> NapiResult<String> {
    let req: SweepRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scenarios::sweep_parameter(&req.parameters, &req.config, req.field, &req.values)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn roi_by_villa_count(input_json: String) -> NapiResult<String> {
    let req: RoiChartRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        scenarios::roi_by_villa_count(&req.parameters, &req.config, req.min_villas, req.max_villas)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    let input: SensitivityInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scenarios::evaluate_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_scenarios(input_json: String) -> NapiResult<String> {
    let input: ComparisonInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scenarios::compare_scenarios(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
