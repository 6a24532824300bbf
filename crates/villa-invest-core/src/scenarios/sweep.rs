use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use crate::error::VillaInvestError;
use crate::financing::RepaymentScheme;
use crate::project::{evaluate, EngineConfig, FinancialMetrics, ProjectParameters};
use crate::types::*;
use crate::VillaInvestResult;

/// Villa counts charted by default in the ROI-by-size view
pub const MIN_CHART_VILLAS: u32 = 5;
pub const MAX_CHART_VILLAS: u32 = 40;

/// Most values a single sweep (or one axis of a grid) may take.
pub const MAX_SWEEP_POINTS: usize = 500;

/// Numeric project parameter that can be swept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterField {
    VillaCount,
    VillaSizeSqm,
    PricePerNight,
    OccupancyRate,
    LandCostPerVilla,
    ConstructionCostPerSqm,
    MonthlyOperatingCostPerVilla,
    AnnualMarketingCost,
    CleaningCostPerNight,
    AccessoriesCostPerNight,
    AnnualInsurancePerVilla,
    DiscountRate,
    PrimeRate,
    AdditionalRateSpread,
    EquityAmount,
    LoanTermYears,
    TaxRate,
}

impl ParameterField {
    pub const ALL: [ParameterField; 17] = [
        ParameterField::VillaCount,
        ParameterField::VillaSizeSqm,
        ParameterField::PricePerNight,
        ParameterField::OccupancyRate,
        ParameterField::LandCostPerVilla,
        ParameterField::ConstructionCostPerSqm,
        ParameterField::MonthlyOperatingCostPerVilla,
        ParameterField::AnnualMarketingCost,
        ParameterField::CleaningCostPerNight,
        ParameterField::AccessoriesCostPerNight,
        ParameterField::AnnualInsurancePerVilla,
        ParameterField::DiscountRate,
        ParameterField::PrimeRate,
        ParameterField::AdditionalRateSpread,
        ParameterField::EquityAmount,
        ParameterField::LoanTermYears,
        ParameterField::TaxRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterField::VillaCount => "villa_count",
            ParameterField::VillaSizeSqm => "villa_size_sqm",
            ParameterField::PricePerNight => "price_per_night",
            ParameterField::OccupancyRate => "occupancy_rate",
            ParameterField::LandCostPerVilla => "land_cost_per_villa",
            ParameterField::ConstructionCostPerSqm => "construction_cost_per_sqm",
            ParameterField::MonthlyOperatingCostPerVilla => "monthly_operating_cost_per_villa",
            ParameterField::AnnualMarketingCost => "annual_marketing_cost",
            ParameterField::CleaningCostPerNight => "cleaning_cost_per_night",
            ParameterField::AccessoriesCostPerNight => "accessories_cost_per_night",
            ParameterField::AnnualInsurancePerVilla => "annual_insurance_per_villa",
            ParameterField::DiscountRate => "discount_rate",
            ParameterField::PrimeRate => "prime_rate",
            ParameterField::AdditionalRateSpread => "additional_rate_spread",
            ParameterField::EquityAmount => "equity_amount",
            ParameterField::LoanTermYears => "loan_term_years",
            ParameterField::TaxRate => "tax_rate",
        }
    }

    /// Current value of this field in `params`.
    pub fn get(&self, params: &ProjectParameters) -> Decimal {
        match self {
            ParameterField::VillaCount => Decimal::from(params.villa_count),
            ParameterField::VillaSizeSqm => params.villa_size_sqm,
            ParameterField::PricePerNight => params.price_per_night,
            ParameterField::OccupancyRate => params.occupancy_rate,
            ParameterField::LandCostPerVilla => params.land_cost_per_villa,
            ParameterField::ConstructionCostPerSqm => params.construction_cost_per_sqm,
            ParameterField::MonthlyOperatingCostPerVilla => params.monthly_operating_cost_per_villa,
            ParameterField::AnnualMarketingCost => params.annual_marketing_cost,
            ParameterField::CleaningCostPerNight => params.cleaning_cost_per_night,
            ParameterField::AccessoriesCostPerNight => params.accessories_cost_per_night,
            ParameterField::AnnualInsurancePerVilla => params.annual_insurance_per_villa,
            ParameterField::DiscountRate => params.discount_rate,
            ParameterField::PrimeRate => params.prime_rate,
            ParameterField::AdditionalRateSpread => params.additional_rate_spread,
            ParameterField::EquityAmount => params.equity_amount,
            ParameterField::LoanTermYears => Decimal::from(params.loan_term_years),
            ParameterField::TaxRate => params.tax_rate,
        }
    }

    /// Copy of `base` with this field set to `value`. `base` is left untouched.
    pub fn apply(&self, base: &ProjectParameters, value: Decimal) -> VillaInvestResult<ProjectParameters> {
        let mut params = base.clone();
        match self {
            ParameterField::VillaCount => params.villa_count = self.whole_number(value)?,
            ParameterField::LoanTermYears => params.loan_term_years = self.whole_number(value)?,
            ParameterField::VillaSizeSqm => params.villa_size_sqm = value,
            ParameterField::PricePerNight => params.price_per_night = value,
            ParameterField::OccupancyRate => params.occupancy_rate = value,
            ParameterField::LandCostPerVilla => params.land_cost_per_villa = value,
            ParameterField::ConstructionCostPerSqm => params.construction_cost_per_sqm = value,
            ParameterField::MonthlyOperatingCostPerVilla => params.monthly_operating_cost_per_villa = value,
            ParameterField::AnnualMarketingCost => params.annual_marketing_cost = value,
            ParameterField::CleaningCostPerNight => params.cleaning_cost_per_night = value,
            ParameterField::AccessoriesCostPerNight => params.accessories_cost_per_night = value,
            ParameterField::AnnualInsurancePerVilla => params.annual_insurance_per_villa = value,
            ParameterField::DiscountRate => params.discount_rate = value,
            ParameterField::PrimeRate => params.prime_rate = value,
            ParameterField::AdditionalRateSpread => params.additional_rate_spread = value,
            ParameterField::EquityAmount => params.equity_amount = value,
            ParameterField::TaxRate => params.tax_rate = value,
        }
        Ok(params)
    }

    fn whole_number(&self, value: Decimal) -> VillaInvestResult<u32> {
        if !value.fract().is_zero() {
            return Err(VillaInvestError::InvalidInput {
                field: self.as_str().into(),
                reason: format!("Must be a whole number, got {value}"),
            });
        }
        value.to_u32().ok_or_else(|| VillaInvestError::InvalidInput {
            field: self.as_str().into(),
            reason: format!("Out of range: {value}"),
        })
    }
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterField {
    type Err = VillaInvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.to_lowercase().replace('-', "_");
        ParameterField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| VillaInvestError::InvalidInput {
                field: "parameter".into(),
                reason: format!("'{s}' is not a sweepable parameter"),
            })
    }
}

/// One evaluated point of a sweep; exactly one of `metrics`/`error` is set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<FinancialMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepOutput {
    pub field: ParameterField,
    pub repayment_scheme: RepaymentScheme,
    pub points: Vec<SweepPoint>,
}

/// ROI for one villa count (ROI-by-size chart)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VillaCountRoi {
    pub villa_count: u32,
    pub roi_min_pct: Option<Decimal>,
    pub roi_max_pct: Option<Decimal>,
}

/// Pin the valuation date so every point of a sweep shares it.
pub(crate) fn pinned_config(config: &EngineConfig) -> EngineConfig {
    EngineConfig {
        valuation_date: Some(config.valuation_date()),
        ..config.clone()
    }
}

/// Evaluate `base` with `field` replaced by each of `values`, in parallel.
///
/// Points keep the order of `values`. A point that fails validation carries
/// the error message instead of metrics.
pub fn sweep_parameter(
    base: &ProjectParameters,
    config: &EngineConfig,
    field: ParameterField,
    values: &[Decimal],
) -> VillaInvestResult<ComputationOutput<SweepOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if values.is_empty() {
        return Err(VillaInvestError::InsufficientData(
            "Sweep requires at least one value".into(),
        ));
    }
    if values.len() > MAX_SWEEP_POINTS {
        return Err(VillaInvestError::InvalidInput {
            field: "values".into(),
            reason: format!("At most {MAX_SWEEP_POINTS} sweep values are supported, got {}", values.len()),
        });
    }
    config.validate()?;
    let config = pinned_config(config);

    let points: Vec<SweepPoint> = values
        .par_iter()
        .map(|&value| {
            match field.apply(base, value).and_then(|p| evaluate(&p, &config, None)) {
                Ok(metrics) => SweepPoint {
                    value,
                    metrics: Some(metrics),
                    error: None,
                },
                Err(e) => SweepPoint {
                    value,
                    metrics: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();

    let failed = points.iter().filter(|p| p.error.is_some()).count();
    if failed > 0 {
        warnings.push(format!("{failed} of {} sweep points could not be evaluated", points.len()));
    }
    log::debug!("swept {} over {} values ({failed} failed)", field, values.len());

    let output = SweepOutput {
        field,
        repayment_scheme: base.repayment_scheme,
        points,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-Way Parameter Sweep",
        &serde_json::json!({
            "field": field.as_str(),
            "base_value": field.get(base).to_string(),
            "points": values.len(),
            "rate_method": config.rate_method.to_string(),
            "financing_aware": config.financing_aware,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// ROI (min and max subsidy) for each villa count in `min_villas..=max_villas`.
pub fn roi_by_villa_count(
    base: &ProjectParameters,
    config: &EngineConfig,
    min_villas: u32,
    max_villas: u32,
) -> VillaInvestResult<ComputationOutput<Vec<VillaCountRoi>>> {
    if min_villas == 0 || min_villas > max_villas {
        return Err(VillaInvestError::InvalidInput {
            field: "villa_range".into(),
            reason: format!("Invalid villa range {min_villas}..={max_villas}"),
        });
    }
    if (max_villas - min_villas) as usize >= MAX_SWEEP_POINTS {
        return Err(VillaInvestError::InvalidInput {
            field: "villa_range".into(),
            reason: format!("At most {MAX_SWEEP_POINTS} villa counts per chart"),
        });
    }

    let values: Vec<Decimal> = (min_villas..=max_villas).map(Decimal::from).collect();
    let sweep = sweep_parameter(base, config, ParameterField::VillaCount, &values)?;

    let rows = sweep
        .result
        .points
        .iter()
        .zip(min_villas..=max_villas)
        .map(|(point, villa_count)| VillaCountRoi {
            villa_count,
            roi_min_pct: point.metrics.as_ref().and_then(|m| m.roi_min_pct),
            roi_max_pct: point.metrics.as_ref().and_then(|m| m.roi_max_pct),
        })
        .collect();

    Ok(ComputationOutput {
        result: rows,
        methodology: "ROI by Villa Count".into(),
        assumptions: sweep.assumptions,
        warnings: sweep.warnings,
        metadata: sweep.metadata,
    })
}
