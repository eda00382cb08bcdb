use chrono::{Datelike, Duration, NaiveDate};
use log::{debug, warn};

use crate::calendar;
use crate::engine::{PlacedPeriod, Prepared, ScheduleOutcome};

/// Greedy scheduler: employees in descending hourly-rate order, each period
/// placed at its cheapest feasible start.
///
/// High-rate employees go first while the occupancy ledger is least
/// constrained, since their feasible windows are the expensive ones to
/// waste. Within one employee, each committed period pushes the search
/// cursor 30 days past its end to keep the legally required separation.
pub(crate) fn schedule(prepared: &Prepared) -> ScheduleOutcome {
    let mut ledger = prepared.ledger();
    let mut placed = Vec::new();
    let mut holiday_conflicts_avoided = 0i64;

    for (staff_idx, member) in prepared.staff.iter().enumerate() {
        let holidays = prepared.holidays_for(member.region);
        let closed = prepared.closed_for(member.region);
        let rate = member.employee.hourly_rate;
        let mut cursor = prepared.horizon_start;

        for (period_idx, &duration) in member.strategy.periods.iter().enumerate() {
            // (cost, hours, start) of the cheapest feasible candidate so far
            let mut best: Option<(f64, f64, NaiveDate)> = None;

            let mut day = cursor;
            while day <= prepared.horizon_end {
                let candidate = day;
                day = day.succ_opt().unwrap();

                let end = candidate + Duration::days(duration - 1);
                if end > prepared.horizon_end {
                    // The whole period must fit the planning horizon
                    break;
                }
                if candidate.weekday().num_days_from_monday() != prepared.preferred_weekday {
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
                    holiday_conflicts_avoided += 1;
                    continue;
                }

                if !ledger.fits(candidate, end, &member.employee.client) {
                    continue;
                }

                let hours = calendar::business_hours_with(closed, candidate, end);
                let cost = rate * hours;
                // Strict comparison keeps the earliest date among cost ties
                if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                    best = Some((cost, hours, candidate));
                }
            }

            match best {
                Some((cost, hours, start)) => {
                    let end = start + Duration::days(duration - 1);
                    ledger.commit(start, end, &member.employee.client);
                    debug!(
                        "employee {} period {} placed {} .. {} at cost {:.2}",
                        member.employee.id, period_idx, start, end, cost
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
                None => {
                    // Cursor stays put so later periods still search from here
                    warn!(
                        "no feasible start for employee {} period {} ({} days)",
                        member.employee.id, period_idx, duration
                    );
                }
            }
        }
    }

    ScheduleOutcome {
        placed,
        holiday_conflicts_avoided,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use crate::models::{Employee, OptimizationRequest, StrategyPreference, VacationRules};

    fn employee(id: i64, rate: f64, client: &str) -> Employee {
        Employee {
            id,
            name: format!("employee-{}", id),
            admission_date: "2021-01-04".to_string(),
            hourly_rate: rate,
            client: client.to_string(),
            locality: "São Paulo".to_string(),
        }
    }

    fn request(strategy: StrategyPreference) -> OptimizationRequest {
        OptimizationRequest {
            year: Some(2025),
            rules: VacationRules::default(),
            strategy_preference: strategy,
            project_context: None,
            windows: Vec::new(),
            use_advanced_solver: false,
            solver_timeout: 120.0,
            date_range_start: None,
            date_range_end: None,
            preset_periods: None,
        }
    }

    #[test]
    fn test_cursor_enforces_thirty_day_separation() {
        let staff = [employee(1, 100.0, "acme")];
        let prepared = engine::prepare(&staff, &request(StrategyPreference::Split2Periods)).unwrap();
        let outcome = schedule(&prepared);

        assert_eq!(outcome.placed.len(), 2);
        let first = &outcome.placed[0];
        let second = &outcome.placed[1];
        assert_eq!(first.period_idx, 0);
        assert!((second.start - first.end).num_days() >= 30);
    }

    #[test]
    fn test_higher_rate_gets_the_cheaper_slot() {
        // Same region and durations: the rate-descending pass must leave the
        // expensive employee with no more vacation hours than the cheap one
        let staff = [employee(1, 90.0, "acme"), employee(2, 300.0, "acme")];
        let prepared = engine::prepare(&staff, &request(StrategyPreference::Standard30)).unwrap();
        let outcome = schedule(&prepared);

        assert_eq!(outcome.placed.len(), 2);
        // staff is rate-descending, so staff_idx 0 is the rate-300 employee
        let expensive = outcome.placed.iter().find(|p| p.staff_idx == 0).unwrap();
        let cheap = outcome.placed.iter().find(|p| p.staff_idx == 1).unwrap();
        assert!(expensive.hours <= cheap.hours + 1e-9);
    }

    #[test]
    fn test_unplaceable_period_yields_partial_outcome() {
        let staff = [employee(1, 100.0, "acme")];
        let mut req = request(StrategyPreference::Standard30);
        req.year = None;
        req.date_range_start = Some("2025-01-06".to_string());
        req.date_range_end = Some("2025-01-10".to_string());
        let prepared = engine::prepare(&staff, &req).unwrap();

        let outcome = schedule(&prepared);
        assert!(outcome.placed.is_empty());
    }

    #[test]
    fn test_conflict_counter_increments_on_holiday_mondays() {
        let staff = [employee(1, 100.0, "acme")];
        let prepared = engine::prepare(&staff, &request(StrategyPreference::Standard30)).unwrap();
        let outcome = schedule(&prepared);

        // 2025 holds at least Tiradentes (a Monday) and the Monday whose
        // D+1 is Carnaval
        assert!(outcome.holiday_conflicts_avoided >= 2);
    }

    #[test]
    fn test_committed_periods_never_overlap_under_cap_one() {
        let staff = [
            employee(1, 100.0, "acme"),
            employee(2, 110.0, "acme"),
            employee(3, 120.0, "acme"),
        ];
        let prepared = engine::prepare(&staff, &request(StrategyPreference::Split2Periods)).unwrap();
        assert_eq!(prepared.max_simultaneous, 1);

        let outcome = schedule(&prepared);
        for (i, a) in outcome.placed.iter().enumerate() {
            for b in outcome.placed.iter().skip(i + 1) {
                let overlap = (a.end.min(b.end) - a.start.max(b.start)).num_days() + 1;
                assert!(overlap <= 0, "{} overlaps {}", a.start, b.start);
            }
        }
    }
}
