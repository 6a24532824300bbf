use clap::Args;
use serde_json::Value;

use villa_invest_core::project;

use super::ProjectArgs;

/// Arguments for a full project evaluation
#[derive(Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Print only the metrics, without the loan schedule and chart series
    #[arg(long)]
    pub metrics_only: bool,
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let input = args.project.resolve()?;
    let result = project::evaluate_project(&input)?;
    let mut value = serde_json::to_value(result)?;

    if args.metrics_only {
        if let Some(envelope) = value.as_object_mut() {
            let metrics = envelope
                .get_mut("result")
                .and_then(|r| r.get_mut("metrics"))
                .map(Value::take)
                .unwrap_or(Value::Null);
            envelope.insert("result".into(), metrics);
        }
    }
    Ok(value)
}
