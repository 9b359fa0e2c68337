use serde::Serialize;

use crate::coefficients::CoefficientSet;
use crate::overrides::OverrideSet;
use crate::record::{Metric, MetricRecord};

/// Stand-in for a metric neither measured nor overridden. Large and negative
/// so a gap shows up in the score instead of reading as zero.
pub const DEFAULT_VALUE_FOR_MISSING_METRIC: f64 = -1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScoreBreakdown {
    pub total_cost: f64,
    pub total_value: f64,
    pub score: f64,
}

pub fn metric_value(
    record: &MetricRecord,
    overrides: &OverrideSet,
    metric: Metric,
    default_for_missing: f64,
) -> f64 {
    overrides
        .get(metric)
        .or_else(|| record.metric(metric))
        .unwrap_or(default_for_missing)
}

pub fn evaluate(
    records: &[MetricRecord],
    coefficients: &CoefficientSet,
    overrides: &OverrideSet,
    default_for_missing: f64,
) -> ScoreBreakdown {
    let weighted = |record: &MetricRecord, metrics: [Metric; 3]| -> f64 {
        metrics
            .into_iter()
            .map(|m| coefficients.weight(m) * metric_value(record, overrides, m, default_for_missing))
            .sum()
    };

    let mut total_cost = 0.0;
    let mut total_value = 0.0;
    for record in records {
        total_cost += weighted(record, Metric::COST);
        total_value += weighted(record, Metric::VALUE);
    }

    let score = if total_cost.is_nan() || total_cost <= 0.0 {
        0.0
    } else {
        coefficients.total * (total_value / total_cost)
    };

    ScoreBreakdown {
        total_cost,
        total_value,
        score,
    }
}

/// The mswyw score: value delivered per unit of resource cost, scaled by
/// `coefficients.total`. Zero when there is no positive cost to divide by.
pub fn calc_mswyw(
    records: &[MetricRecord],
    coefficients: &CoefficientSet,
    overrides: &OverrideSet,
    default_for_missing: f64,
) -> f64 {
    evaluate(records, coefficients, overrides, default_for_missing).score
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scenario_coefficients() -> CoefficientSet {
        CoefficientSet {
            total: 1000.0,
            apdex: 1000.0,
            rpm: 1000.0,
            endpoints: 100.0,
            mem: 1.0,
            cpu: 1000.0,
            epm: 100.0,
        }
    }

    fn instance(mem: f64, cpu: f64, epm: f64, apdex: f64, rpm: f64, endpoints: f64) -> MetricRecord {
        MetricRecord::new()
            .with_metric(Metric::Mem, mem)
            .with_metric(Metric::Cpu, cpu)
            .with_metric(Metric::Epm, epm)
            .with_metric(Metric::Apdex, apdex)
            .with_metric(Metric::Rpm, rpm)
            .with_metric(Metric::Endpoints, endpoints)
    }

    #[test]
    fn single_instance_ratio() {
        let records = vec![instance(100.0, 10.0, 1.0, 0.9, 50.0, 5.0)];
        let out = evaluate(
            &records,
            &scenario_coefficients(),
            &OverrideSet::new(),
            DEFAULT_VALUE_FOR_MISSING_METRIC,
        );
        assert!((out.total_cost - 10_200.0).abs() < 1e-9);
        assert!((out.total_value - 51_400.0).abs() < 1e-9);
        assert!((out.score - 1000.0 * 51_400.0 / 10_200.0).abs() < 1e-9);
        assert!((out.score - 5039.2).abs() < 0.01);
    }

    #[test]
    fn no_records_scores_zero() {
        let score = calc_mswyw(
            &[],
            &scenario_coefficients(),
            &OverrideSet::new(),
            DEFAULT_VALUE_FOR_MISSING_METRIC,
        );
        assert_eq!(score.to_bits(), 0.0_f64.to_bits());
    }

    #[test]
    fn negative_cost_scores_zero() {
        let records = vec![MetricRecord::new().with_metric(Metric::Rpm, 10.0)];
        let out = evaluate(
            &records,
            &scenario_coefficients(),
            &OverrideSet::new(),
            DEFAULT_VALUE_FOR_MISSING_METRIC,
        );
        assert!(out.total_cost < 0.0);
        assert_eq!(out.score, 0.0);
    }

    #[test]
    fn nan_cost_scores_zero() {
        let records = vec![instance(f64::NAN, 1.0, 1.0, 1.0, 1.0, 1.0)];
        let score = calc_mswyw(
            &records,
            &scenario_coefficients(),
            &OverrideSet::new(),
            DEFAULT_VALUE_FOR_MISSING_METRIC,
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn missing_metric_uses_sentinel() {
        let coefficients = scenario_coefficients();
        let with_zero = vec![instance(100.0, 10.0, 0.0, 0.9, 50.0, 5.0)];
        let without_epm = vec![MetricRecord::new()
            .with_metric(Metric::Mem, 100.0)
            .with_metric(Metric::Cpu, 10.0)
            .with_metric(Metric::Apdex, 0.9)
            .with_metric(Metric::Rpm, 50.0)
            .with_metric(Metric::Endpoints, 5.0)];

        let a = evaluate(&with_zero, &coefficients, &OverrideSet::new(), -1000.0);
        let b = evaluate(&without_epm, &coefficients, &OverrideSet::new(), -1000.0);
        assert!((b.total_cost - a.total_cost - coefficients.epm * -1000.0).abs() < 1e-9);
    }

    #[test]
    fn override_masks_every_record() {
        let coefficients = scenario_coefficients();
        let overrides = OverrideSet::new().with(Metric::Apdex, 1.0);
        let a = vec![
            instance(100.0, 10.0, 1.0, 0.2, 50.0, 5.0),
            instance(80.0, 5.0, 0.0, 0.4, 20.0, 3.0),
        ];
        let b = vec![
            instance(100.0, 10.0, 1.0, 0.95, 50.0, 5.0),
            MetricRecord::new()
                .with_metric(Metric::Mem, 80.0)
                .with_metric(Metric::Cpu, 5.0)
                .with_metric(Metric::Epm, 0.0)
                .with_metric(Metric::Rpm, 20.0)
                .with_metric(Metric::Endpoints, 3.0),
        ];
        let sa = calc_mswyw(&a, &coefficients, &overrides, -1000.0);
        let sb = calc_mswyw(&b, &coefficients, &overrides, -1000.0);
        assert_eq!(sa.to_bits(), sb.to_bits());
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let records = vec![
            instance(512.0, 33.3, 0.7, 0.81, 1234.5, 17.0),
            instance(256.0, 12.1, 0.1, 0.99, 99.9, 4.0),
        ];
        let overrides = OverrideSet::new().with(Metric::Endpoints, 9.0);
        let first = calc_mswyw(&records, &scenario_coefficients(), &overrides, -1000.0);
        let second = calc_mswyw(&records, &scenario_coefficients(), &overrides, -1000.0);
        assert_eq!(first.to_bits(), second.to_bits());
    }

    proptest! {
        #[test]
        fn non_positive_cost_is_exactly_zero(
            mem in -1.0e6f64..=0.0,
            cpu in -1.0e3f64..=0.0,
            epm in -1.0e3f64..=0.0,
            rpm in 0.0f64..1.0e6,
        ) {
            let records = vec![instance(mem, cpu, epm, 0.5, rpm, 3.0)];
            let score = calc_mswyw(&records, &scenario_coefficients(), &OverrideSet::new(), -1000.0);
            prop_assert_eq!(score.to_bits(), 0.0_f64.to_bits());
        }
    }
}
