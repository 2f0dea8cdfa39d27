//! Body-mass-index calculator. Pure computation, no cache and no network.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{Args, ParamDef, Tool, ToolArgs, ToolSpec};
use crate::envelope::Envelope;

#[derive(Debug)]
pub struct BmiCalculator {
    spec: ToolSpec,
}

impl Default for BmiCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl BmiCalculator {
    pub fn new() -> Self {
        let spec = ToolSpec::new("calculate_bmi", "Calculate Body Mass Index (BMI)")
            .param(ParamDef::number("height_meters", "Height in meters").required())
            .param(ParamDef::number("weight_kg", "Weight in kilograms").required());
        Self { spec }
    }

    /// Weight over height squared, rounded to two decimals. Absent or zero
    /// inputs count as missing.
    pub fn calculate(&self, height_meters: Option<f64>, weight_kg: Option<f64>) -> Envelope {
        let (Some(height), Some(weight)) = (height_meters, weight_kg) else {
            return Envelope::error("Height and weight are required");
        };
        if height <= 0.0 || weight <= 0.0 {
            return Envelope::error("Height and weight must be positive numbers");
        }
        let bmi = (weight / (height * height) * 100.0).round() / 100.0;
        Envelope::success(json!({ "bmi": bmi }))
            .unwrap_or_else(|e| Envelope::error(format!("Error calculating BMI: {e}")))
    }
}

#[async_trait]
impl Tool for BmiCalculator {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArgs) -> Arc<Envelope> {
        let args = Args::new(args);
        Arc::new(self.calculate(
            args.positive_number("height_meters"),
            args.positive_number("weight_kg"),
        ))
    }
}
