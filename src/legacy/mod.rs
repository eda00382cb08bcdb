use chrono::{Datelike, Duration, NaiveDate, Weekday};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::engine::{self, PlacedPeriod, Prepared};
use crate::models::Allocation;

/// Baseline outcome for one employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyRow {
    pub employee_id: i64,
    pub employee_name: String,
    pub hourly_rate: f64,
    pub allocations: Vec<Allocation>,
    pub realized_impact: f64,
    pub worst_case_impact: f64, // rate * 8 * full entitlement
    pub savings: f64,
    pub savings_percent: f64,
    pub breakdown: String, // period durations, e.g. "14+8+8"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyResult {
    pub rows: Vec<LegacyRow>,
    pub total_realized_impact: f64,
    pub total_worst_case_impact: f64,
    pub total_savings: f64,
    pub savings_percent: f64,
}

/// Median-Monday baseline scheduler.
///
/// Same constraint machinery as the greedy heuristic with two deliberate
/// differences: candidates are restricted to Mondays, and among feasible
/// candidates the one at the median cost rank is taken instead of the
/// cheapest. This simulates a scheduler picking a "typical" Monday and
/// yields a realistic savings baseline for the optimizers.
pub(crate) fn compare(prepared: &Prepared) -> LegacyResult {
    let mut ledger = prepared.ledger();
    let mut placed: Vec<PlacedPeriod> = Vec::new();

    for (staff_idx, member) in prepared.staff.iter().enumerate() {
        let holidays = prepared.holidays_for(member.region);
        let closed = prepared.closed_for(member.region);
        let rate = member.employee.hourly_rate;
        let mut cursor = prepared.horizon_start;

        for (period_idx, &duration) in member.strategy.periods.iter().enumerate() {
            // Every feasible Monday as (cost, hours, start)
            let mut feasible: Vec<(f64, f64, NaiveDate)> = Vec::new();

            let mut day = cursor;
            while day <= prepared.horizon_end {
                let candidate = day;
                day = day.succ_opt().unwrap();

                let end = candidate + Duration::days(duration - 1);
                if end > prepared.horizon_end {
                    // The whole period must fit the planning horizon
                    break;
                }
                if candidate.weekday() != Weekday::Mon {
                    continue;
                }
                if prepared.blackouts.contains(&candidate) {
                    continue;
                }
                if !calendar::is_valid_start(
                    candidate,
                    holidays,
                    prepared.allow_start_before_holiday,
                ) {
                    continue;
                }
                if !ledger.fits(candidate, end, &member.employee.client) {
                    continue;
                }

                let hours = calendar::business_hours_with(closed, candidate, end);
                feasible.push((rate * hours, hours, candidate));
            }

            if feasible.is_empty() {
                warn!(
                    "no feasible Monday for employee {} period {}",
                    member.employee.id, period_idx
                );
                continue;
            }

            feasible.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.2.cmp(&b.2)));
            // Upper median for even counts
            let (cost, hours, start) = feasible[feasible.len() / 2];
            let end = start + Duration::days(duration - 1);

            ledger.commit(start, end, &member.employee.client);
            debug!(
                "employee {} period {} placed at median Monday {} (cost {:.2})",
                member.employee.id, period_idx, start, cost
            );
            placed.push(PlacedPeriod {
                staff_idx,
                period_idx,
                start,
                end,
                cost,
                hours,
            });
            cursor = end + Duration::days(30);
        }
    }

    let abonos = engine::grant_abonos(prepared, &placed);

    let mut rows = Vec::with_capacity(prepared.staff.len());
    for (staff_idx, member) in prepared.staff.iter().enumerate() {
        let mut allocations: Vec<Allocation> = placed
            .iter()
            .filter(|period| period.staff_idx == staff_idx)
            .map(|period| engine::allocation_from_period(prepared, period))
            .collect();
        allocations.extend(
            abonos
                .iter()
                .filter(|grant| grant.staff_idx == staff_idx)
                .map(|grant| engine::allocation_from_abono(prepared, grant)),
        );
        allocations.sort_by(|a, b| a.start_date.cmp(&b.start_date));

        let realized_impact: f64 = allocations.iter().map(|a| a.cost_impact).sum();
        let worst_case_impact = member.employee.hourly_rate
            * calendar::HOURS_PER_DAY
            * member.strategy.total_days() as f64;
        let savings = (worst_case_impact - realized_impact).max(0.0);
        let savings_percent = if worst_case_impact > 0.0 {
            savings / worst_case_impact * 100.0
        } else {
            0.0
        };

        rows.push(LegacyRow {
            employee_id: member.employee.id,
            employee_name: member.employee.name.clone(),
            hourly_rate: member.employee.hourly_rate,
            allocations,
            realized_impact,
            worst_case_impact,
            savings,
            savings_percent,
            breakdown: member.strategy.breakdown(),
        });
    }

    let total_realized_impact: f64 = rows.iter().map(|row| row.realized_impact).sum();
    let total_worst_case_impact: f64 = rows.iter().map(|row| row.worst_case_impact).sum();
    let total_savings: f64 = rows.iter().map(|row| row.savings).sum();
    let savings_percent = if total_worst_case_impact > 0.0 {
        total_savings / total_worst_case_impact * 100.0
    } else {
        0.0
    };

    LegacyResult {
        rows,
        total_realized_impact,
        total_worst_case_impact,
        total_savings,
        savings_percent,
    }
}
