use mswyw_core::{calc_mswyw, CoefficientSet, MetricRecord, OverrideSet};

use crate::traits::FormulaProvider;

/// The stock linear cost/value ratio from `mswyw_core::formula`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearFormula;

impl LinearFormula {
    pub const NAME: &'static str = "formula";
}

impl FormulaProvider for LinearFormula {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn calc_mswyw(
        &self,
        records: &[MetricRecord],
        coefficients: &CoefficientSet,
        overrides: &OverrideSet,
        default_for_missing: f64,
    ) -> f64 {
        calc_mswyw(records, coefficients, overrides, default_for_missing)
    }
}
