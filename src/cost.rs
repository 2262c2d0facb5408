use std::time::Duration;

use crate::error::{HearscribeError, Result};

/// Estimates above this amount get an extra warning at the gate.
pub const HIGH_COST_WARNING_USD: f64 = 10.0;

/// Projected spend for a run. Recomputed every time, displayed, never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CostEstimate {
    pub total_minutes: f64,
    pub rate_per_minute: f64,
    pub total_cost: f64,
}

impl CostEstimate {
    pub fn total_hours(&self) -> f64 {
        self.total_minutes / 60.0
    }

    pub fn is_high(&self) -> bool {
        self.total_cost > HIGH_COST_WARNING_USD
    }
}

/// Sum the durations and price them at the per-minute rate. No rounding
/// happens here; callers round for display only.
pub fn estimate(durations: &[Duration], rate_per_minute: f64) -> Result<CostEstimate> {
    if rate_per_minute < 0.0 {
        return Err(HearscribeError::Config(format!(
            "Billing rate cannot be negative: {rate_per_minute}"
        )));
    }

    let total_minutes: f64 = durations.iter().map(|d| d.as_secs_f64()).sum::<f64>() / 60.0;

    Ok(CostEstimate {
        total_minutes,
        rate_per_minute,
        total_cost: total_minutes * rate_per_minute,
    })
}
