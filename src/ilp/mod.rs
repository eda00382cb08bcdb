use chrono::{Datelike, Duration, NaiveDate};
use log::{debug, warn};
use std::time::Duration as StdDuration;

use crate::calendar;
use crate::engine::{PlacedPeriod, Prepared, ScheduleOutcome};

mod solver;

/// One binary decision: "period `group` starts on `start`".
pub(crate) struct IlpVar {
    pub group: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cost: f64,
    pub hours: f64,
}

/// All candidate placements of one (employee, period index) pair.
///
/// Exactly one variable of each group is selected in a solution.
pub(crate) struct IlpGroup {
    pub staff_idx: usize,
    pub period_idx: usize,
    pub duration: i64,
    pub vars: Vec<usize>, // indices into the model's vars, ascending by cost
}

/// The 0-1 model handed to the branch-and-bound solver.
///
/// Calendar days are indexed as offsets from `day0` so occupancy can be
/// tracked in flat arrays instead of scanning variables per day.
pub(crate) struct IlpModel<'a> {
    pub prepared: &'a Prepared,
    pub vars: Vec<IlpVar>,
    pub groups: Vec<IlpGroup>,
    pub day0: NaiveDate,
    pub day_count: usize,
    pub window_day: Vec<bool>,     // by day offset
    pub client_of_staff: Vec<usize>,
    pub client_caps: Vec<u32>,     // by client index
}

impl IlpModel<'_> {
    pub fn day_offset(&self, date: NaiveDate) -> usize {
        (date - self.day0).num_days() as usize
    }
}

/// Build and solve the ILP. `None` means infeasible or optimality unproven
/// within the wall-clock budget; the caller falls back to the heuristic.
pub(crate) fn schedule(prepared: &Prepared, timeout: StdDuration) -> Option<ScheduleOutcome> {
    if prepared.staff.is_empty() {
        return Some(ScheduleOutcome {
            placed: Vec::new(),
            holiday_conflicts_avoided: 0,
        });
    }

    let (candidates, holiday_conflicts_avoided) = candidate_starts(prepared);
    if candidates.is_empty() {
        warn!("no candidate start dates in the horizon, ILP model is empty");
        return None;
    }

    let model = build_model(prepared, &candidates)?;
    debug!(
        "ILP model: {} groups, {} variables, {} days",
        model.groups.len(),
        model.vars.len(),
        model.day_count
    );

    let chosen = solver::branch_and_bound(&model, timeout)?;

    let placed = chosen
        .iter()
        .enumerate()
        .map(|(group_idx, &var_idx)| {
            let group = &model.groups[group_idx];
            let var = &model.vars[var_idx];
            PlacedPeriod {
                staff_idx: group.staff_idx,
                period_idx: group.period_idx,
                start: var.start,
                end: var.end,
                cost: var.cost,
                hours: var.hours,
            }
        })
        .collect();

    Some(ScheduleOutcome {
        placed,
        holiday_conflicts_avoided,
    })
}

/// Candidate starts shared by every employee, filtered against the union of
/// the pool's regional holiday sets so the model stays symmetric.
fn candidate_starts(prepared: &Prepared) -> (Vec<NaiveDate>, i64) {
    let mut candidates = Vec::new();
    let mut holiday_conflicts_avoided = 0i64;

    let mut day = prepared.horizon_start;
    while day <= prepared.horizon_end {
        let candidate = day;
        day = day.succ_opt().unwrap();

        if candidate.weekday().num_days_from_monday() != prepared.preferred_weekday {
            continue;
        }
        if prepared.blackouts.contains(&candidate) {
            continue;
        }
        if !calendar::is_valid_start(
            candidate,
            &prepared.union_holidays,
            prepared.allow_start_before_holiday,
        ) {
            holiday_conflicts_avoided += 1;
            continue;
        }
        candidates.push(candidate);
    }

    (candidates, holiday_conflicts_avoided)
}

fn build_model<'a>(prepared: &'a Prepared, candidates: &[NaiveDate]) -> Option<IlpModel<'a>> {
    let mut client_names: Vec<String> = Vec::new();
    let mut client_of_staff = Vec::with_capacity(prepared.staff.len());
    for member in &prepared.staff {
        let idx = match client_names
            .iter()
            .position(|name| name == &member.employee.client)
        {
            Some(idx) => idx,
            None => {
                client_names.push(member.employee.client.clone());
                client_names.len() - 1
            }
        };
        client_of_staff.push(idx);
    }
    let client_caps: Vec<u32> = client_names
        .iter()
        .map(|name| prepared.client_caps.get(name).copied().unwrap_or(1))
        .collect();

    let mut vars: Vec<IlpVar> = Vec::new();
    let mut groups: Vec<IlpGroup> = Vec::new();
    let mut max_end = prepared.horizon_end;

    for (staff_idx, member) in prepared.staff.iter().enumerate() {
        let closed = prepared.closed_for(member.region);
        let rate = member.employee.hourly_rate;

        for (period_idx, &duration) in member.strategy.periods.iter().enumerate() {
            let group_idx = groups.len();
            let mut group_vars = Vec::with_capacity(candidates.len());

            for &start in candidates {
                let end = start + Duration::days(duration - 1);
                if end > prepared.horizon_end {
                    // Candidates ascend, so nothing later fits either
                    break;
                }
                let hours = calendar::business_hours_with(closed, start, end);
                group_vars.push(vars.len());
                vars.push(IlpVar {
                    group: group_idx,
                    start,
                    end,
                    cost: rate * hours,
                    hours,
                });
                max_end = max_end.max(end);
            }

            if group_vars.is_empty() {
                warn!(
                    "employee {} period {} has no candidate start, model infeasible",
                    member.employee.id, period_idx
                );
                return None;
            }
            group_vars.sort_by(|&a, &b| {
                vars[a]
                    .cost
                    .total_cmp(&vars[b].cost)
                    .then_with(|| vars[a].start.cmp(&vars[b].start))
            });

            groups.push(IlpGroup {
                staff_idx,
                period_idx,
                duration,
                vars: group_vars,
            });
        }
    }

    let day0 = prepared.horizon_start;
    let day_count = (max_end - day0).num_days() as usize + 1;

    let mut window_day = vec![false; day_count];
    for window in &prepared.windows {
        let start = window.start.max(day0);
        let end = window.end.min(max_end);
        let mut day = start;
        while day <= end {
            window_day[(day - day0).num_days() as usize] = true;
            day = day.succ_opt().unwrap();
        }
    }

    Some(IlpModel {
        prepared,
        vars,
        groups,
        day0,
        day_count,
        window_day,
        client_of_staff,
        client_caps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use crate::models::{Employee, OptimizationRequest, StrategyPreference, VacationRules};

    fn employee(id: i64, rate: f64) -> Employee {
        Employee {
            id,
            name: format!("employee-{}", id),
            admission_date: "2019-07-01".to_string(),
            hourly_rate: rate,
            client: "acme".to_string(),
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
            use_advanced_solver: true,
            solver_timeout: 120.0,
            date_range_start: None,
            date_range_end: None,
            preset_periods: None,
        }
    }

    fn prepared_for(
        employees: &[Employee],
        request: &OptimizationRequest,
    ) -> crate::engine::Prepared {
        engine::prepare(employees, request).unwrap()
    }

    #[test]
    fn test_empty_pool_solves_trivially() {
        let prepared = prepared_for(&[], &request(StrategyPreference::Standard30));
        let outcome = schedule(&prepared, StdDuration::from_secs(5)).unwrap();
        assert!(outcome.placed.is_empty());
    }

    #[test]
    fn test_candidates_share_the_preferred_weekday() {
        let prepared = prepared_for(&[employee(1, 100.0)], &request(StrategyPreference::Standard30));
        let (candidates, conflicts) = candidate_starts(&prepared);
        assert!(!candidates.is_empty());
        assert!(candidates
            .iter()
            .all(|d| d.weekday().num_days_from_monday() == 0));
        // 2025 Mondays collide with Carnaval and Tiradentes at least
        assert!(conflicts > 0);
    }

    #[test]
    fn test_group_vars_ascend_by_cost() {
        let prepared = prepared_for(&[employee(1, 100.0)], &request(StrategyPreference::Standard30));
        let (candidates, _) = candidate_starts(&prepared);
        let model = build_model(&prepared, &candidates).unwrap();

        assert_eq!(model.groups.len(), 1);
        for group in &model.groups {
            for pair in group.vars.windows(2) {
                assert!(model.vars[pair[0]].cost <= model.vars[pair[1]].cost + 1e-9);
            }
        }
    }

    #[test]
    fn test_infeasible_when_no_period_fits_the_horizon() {
        let mut req = request(StrategyPreference::Standard30);
        req.year = None;
        req.date_range_start = Some("2025-01-06".to_string());
        req.date_range_end = Some("2025-01-17".to_string()); // 12-day horizon
        let prepared = prepared_for(&[employee(1, 100.0)], &req);

        assert!(schedule(&prepared, StdDuration::from_secs(5)).is_none());
    }

    #[test]
    fn test_zero_budget_means_unproven() {
        let prepared = prepared_for(&[employee(1, 100.0)], &request(StrategyPreference::Standard30));
        assert!(schedule(&prepared, StdDuration::from_secs(0)).is_none());
    }

    #[test]
    fn test_split_solution_keeps_separation_and_order() {
        let prepared = prepared_for(&[employee(1, 100.0)], &request(StrategyPreference::Split2Periods));
        let outcome = schedule(&prepared, StdDuration::from_secs(30)).unwrap();

        assert_eq!(outcome.placed.len(), 2);
        let mut starts: Vec<NaiveDate> = outcome.placed.iter().map(|p| p.start).collect();
        starts.sort();
        assert!((starts[1] - starts[0]).num_days() >= 30);

        // Equal durations are placed in lexicographic start order
        assert!(outcome.placed[0].start < outcome.placed[1].start);
    }
}
