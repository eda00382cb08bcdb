use crate::models::StrategyPreference;

/// Hourly rate above which SMART_HYBRID resolves to selling 10 days.
pub const SMART_HYBRID_RATE_THRESHOLD: f64 = 180.0;

/// A strategy preference made concrete for one employee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStrategy {
    pub periods: Vec<i64>, // durations in days
    pub sell_days: i64,
}

impl ResolvedStrategy {
    /// Vacation entitlement consumed: scheduled periods plus sold days.
    pub fn total_days(&self) -> i64 {
        self.periods.iter().sum::<i64>() + self.sell_days
    }

    /// Allocation type label for the period at `index`.
    pub fn period_type(&self, index: usize) -> String {
        if self.sell_days > 0 {
            format!("STANDARD_{}", index + 1)
        } else if self.periods.len() > 1 {
            format!("SPLIT_{}", index + 1)
        } else {
            "STANDARD".to_string()
        }
    }

    /// Period list rendered as a breakdown string, e.g. "14+8+8".
    pub fn breakdown(&self) -> String {
        self.periods
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Expand a strategy preference into concrete period durations.
///
/// Explicit preset periods override the preference entirely. SMART_HYBRID
/// resolves per employee from the hourly rate.
pub fn expand(
    preference: StrategyPreference,
    hourly_rate: f64,
    preset_periods: Option<&[i64]>,
) -> ResolvedStrategy {
    if let Some(periods) = preset_periods {
        if !periods.is_empty() {
            return ResolvedStrategy {
                periods: periods.to_vec(),
                sell_days: 0,
            };
        }
    }

    match preference {
        StrategyPreference::Standard30 => ResolvedStrategy {
            periods: vec![30],
            sell_days: 0,
        },
        StrategyPreference::Sell10 => ResolvedStrategy {
            periods: vec![20],
            sell_days: 10,
        },
        StrategyPreference::Split2Periods => ResolvedStrategy {
            periods: vec![15, 15],
            sell_days: 0,
        },
        StrategyPreference::Split3Periods => ResolvedStrategy {
            periods: vec![14, 8, 8],
            sell_days: 0,
        },
        StrategyPreference::SmartHybrid => {
            let resolved = if hourly_rate > SMART_HYBRID_RATE_THRESHOLD {
                StrategyPreference::Sell10
            } else {
                StrategyPreference::Standard30
            };
            expand(resolved, hourly_rate, None)
        }
    }
}
