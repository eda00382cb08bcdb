use chrono::{Datelike, Duration, NaiveDate};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::calendar::{self, Region};
use crate::error::EngineError;
use crate::heuristic;
use crate::ilp;
use crate::ledger::{self, OccupancyLedger, WindowSpan};
use crate::legacy::{self, LegacyResult};
use crate::models::{
    Allocation, Employee, OptimizationRequest, OptimizationResult, SolverMethod,
};
use crate::strategy::{self, ResolvedStrategy};

/// Monthly cash-flow keys, Portuguese 3-letter abbreviations.
const MONTH_KEYS: [&str; 12] = [
    "JAN", "FEV", "MAR", "ABR", "MAI", "JUN", "JUL", "AGO", "SET", "OUT", "NOV", "DEZ",
];

/// One employee with the per-run data the schedulers need.
pub(crate) struct StaffMember {
    pub employee: Employee,
    pub region: Option<Region>,
    pub strategy: ResolvedStrategy,
}

/// A validated request with dates parsed and calendars precomputed.
///
/// Staff are kept in descending hourly-rate order, which is the processing
/// order of the greedy schedulers and the branching order of the ILP.
pub(crate) struct Prepared {
    pub horizon_start: NaiveDate,
    pub horizon_end: NaiveDate,
    pub preferred_weekday: u32,
    pub budget: f64,
    pub windows: Vec<WindowSpan>,
    pub blackouts: HashSet<NaiveDate>,
    pub allow_start_before_holiday: bool,
    pub staff: Vec<StaffMember>,
    pub max_simultaneous: u32,
    pub client_caps: HashMap<String, u32>,
    pub union_holidays: HashSet<NaiveDate>,
    holidays_by_region: HashMap<Option<Region>, HashSet<NaiveDate>>,
    closed_by_region: HashMap<Option<Region>, HashSet<NaiveDate>>,
}

impl Prepared {
    /// Holiday set (no bridges) used by the valid-start predicate.
    pub fn holidays_for(&self, region: Option<Region>) -> &HashSet<NaiveDate> {
        &self.holidays_by_region[&region]
    }

    /// Non-working set (holidays plus bridges) used for billable hours.
    pub fn closed_for(&self, region: Option<Region>) -> &HashSet<NaiveDate> {
        &self.closed_by_region[&region]
    }

    /// Billable hours of [start, end] for an employee of `region`.
    pub fn hours(&self, region: Option<Region>, start: NaiveDate, end: NaiveDate) -> f64 {
        calendar::business_hours_with(self.closed_for(region), start, end)
    }

    /// Fresh occupancy ledger sized for this request.
    pub fn ledger(&self) -> OccupancyLedger {
        OccupancyLedger::new(self.max_simultaneous, self.client_caps.clone(), &self.windows)
    }
}

/// A scheduled vacation period before result assembly.
#[derive(Debug, Clone)]
pub(crate) struct PlacedPeriod {
    pub staff_idx: usize,
    pub period_idx: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub cost: f64,
    pub hours: f64,
}

/// Sold vacation days converted to cash (abono pecuniário).
#[derive(Debug, Clone)]
pub(crate) struct AbonoGrant {
    pub staff_idx: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub savings: f64,
}

/// What a scheduler hands back for assembly.
pub(crate) struct ScheduleOutcome {
    pub placed: Vec<PlacedPeriod>,
    pub holiday_conflicts_avoided: i64,
}

// ============================================================================
// Entry points
// ============================================================================

/// Run the full optimization pipeline: ILP when requested, heuristic as the
/// guaranteed fallback.
pub fn run_optimization(
    employees: &[Employee],
    request: &OptimizationRequest,
) -> Result<OptimizationResult, EngineError> {
    let started = Instant::now();
    validate_request(employees, request)?;
    let prepared = prepare(employees, request)?;

    if request.use_advanced_solver {
        let timeout = std::time::Duration::from_secs_f64(request.solver_timeout.max(0.0));
        match ilp::schedule(&prepared, timeout) {
            Some(outcome) => {
                info!("ILP schedule accepted after {:.3}s", started.elapsed().as_secs_f64());
                return Ok(assemble(&prepared, outcome, SolverMethod::Ilp, started));
            }
            None => {
                info!("ILP produced no proven-optimal schedule, falling back to heuristic")
            }
        }
    }

    let outcome = heuristic::schedule(&prepared);
    Ok(assemble(&prepared, outcome, SolverMethod::Heuristic, started))
}

/// Run only the ILP path. `None` means infeasible or optimality unproven
/// within the timeout; callers are expected to fall back.
pub fn run_optimization_ilp(
    employees: &[Employee],
    request: &OptimizationRequest,
) -> Result<Option<OptimizationResult>, EngineError> {
    let started = Instant::now();
    validate_request(employees, request)?;
    let prepared = prepare(employees, request)?;

    let timeout = std::time::Duration::from_secs_f64(request.solver_timeout.max(0.0));
    Ok(ilp::schedule(&prepared, timeout)
        .map(|outcome| assemble(&prepared, outcome, SolverMethod::Ilp, started)))
}

/// Run only the greedy heuristic. Always produces a result; employees whose
/// periods found no feasible start simply carry fewer allocations.
pub fn run_optimization_heuristic(
    employees: &[Employee],
    request: &OptimizationRequest,
) -> Result<OptimizationResult, EngineError> {
    let started = Instant::now();
    validate_request(employees, request)?;
    let prepared = prepare(employees, request)?;

    let outcome = heuristic::schedule(&prepared);
    Ok(assemble(&prepared, outcome, SolverMethod::Heuristic, started))
}

/// Run the legacy comparator, the median-Monday baseline used to quantify
/// savings against a human-style schedule.
pub fn run_legacy_comparison(
    employees: &[Employee],
    request: &OptimizationRequest,
) -> Result<LegacyResult, EngineError> {
    validate_request(employees, request)?;
    let prepared = prepare(employees, request)?;
    Ok(legacy::compare(&prepared))
}

// ============================================================================
// Validation
// ============================================================================

pub(crate) fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|source| EngineError::InvalidDate { field, source })
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidRequest(message.into())
}

/// Check the request before any scheduling work; the schedulers themselves
/// assume validated input.
pub fn validate_request(
    employees: &[Employee],
    request: &OptimizationRequest,
) -> Result<(), EngineError> {
    match (&request.date_range_start, &request.date_range_end) {
        (Some(start), Some(end)) => {
            let start = parse_date("date_range_start", start)?;
            let end = parse_date("date_range_end", end)?;
            if start > end {
                return Err(invalid("date_range_start must not be after date_range_end"));
            }
        }
        (None, None) => {
            if request.year.is_none() {
                return Err(invalid("year is required when no date range is given"));
            }
        }
        _ => {
            return Err(invalid(
                "date_range_start and date_range_end must be provided together",
            ))
        }
    }

    if let Some(context) = &request.project_context {
        if !(1.0..=100.0).contains(&context.max_concurrency_percent) {
            return Err(invalid("max_concurrency_percent must be within 1..=100"));
        }
        if context.preferred_start_weekday > 6 {
            return Err(invalid("preferred_start_weekday must be within 0..=6"));
        }
    }

    let rules = &request.rules;
    if rules.standard_days <= 0 {
        return Err(invalid("standard_days must be positive"));
    }
    if rules.min_main_period <= 0 || rules.min_other_period <= 0 {
        return Err(invalid("minimum period lengths must be positive"));
    }
    if rules.sell_days_limit < 0 {
        return Err(invalid("sell_days_limit must not be negative"));
    }
    for blackout in &rules.blackout_dates {
        parse_date("blackout", blackout)?;
    }

    let mut window_ids = HashSet::new();
    for window in &request.windows {
        let start = parse_date("window_start", &window.start_date)?;
        let end = parse_date("window_end", &window.end_date)?;
        if start > end {
            return Err(invalid(format!(
                "window {} starts after it ends",
                window.id
            )));
        }
        if !window_ids.insert(window.id) {
            return Err(invalid(format!("duplicate window id {}", window.id)));
        }
    }

    if let Some(periods) = &request.preset_periods {
        if periods.iter().any(|&d| d <= 0) {
            return Err(invalid("preset periods must all be positive"));
        }
    }

    for employee in employees {
        if employee.hourly_rate < 0.0 {
            return Err(invalid(format!(
                "employee {} has a negative hourly rate",
                employee.id
            )));
        }
        parse_date("admission_date", &employee.admission_date)?;

        let resolved = strategy::expand(
            request.strategy_preference,
            employee.hourly_rate,
            request.preset_periods.as_deref(),
        );
        if resolved.total_days() > rules.standard_days {
            return Err(invalid(format!(
                "employee {} would consume {} days, over the {}-day entitlement",
                employee.id,
                resolved.total_days(),
                rules.standard_days
            )));
        }
        if resolved.sell_days > rules.sell_days_limit {
            return Err(invalid(format!(
                "employee {} would sell {} days, over the limit of {}",
                employee.id, resolved.sell_days, rules.sell_days_limit
            )));
        }
        if !rules.allow_split && resolved.periods.len() > 1 {
            return Err(invalid("split periods are disabled by the vacation rules"));
        }
        if resolved.periods.len() > 1 {
            let main = resolved.periods.iter().max().copied().unwrap_or(0);
            if main < rules.min_main_period {
                return Err(invalid(format!(
                    "main period of {} days is under the minimum of {}",
                    main, rules.min_main_period
                )));
            }
            if resolved
                .periods
                .iter()
                .any(|&d| d != main && d < rules.min_other_period)
            {
                return Err(invalid(format!(
                    "secondary periods must be at least {} days",
                    rules.min_other_period
                )));
            }
        }
    }

    Ok(())
}

// ============================================================================
// Preparation
// ============================================================================

pub(crate) fn prepare(
    employees: &[Employee],
    request: &OptimizationRequest,
) -> Result<Prepared, EngineError> {
    let (horizon_start, horizon_end) = match (&request.date_range_start, &request.date_range_end) {
        (Some(start), Some(end)) => (
            parse_date("date_range_start", start)?,
            parse_date("date_range_end", end)?,
        ),
        _ => {
            let year = request
                .year
                .ok_or_else(|| invalid("year is required when no date range is given"))?;
            let start = NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| invalid(format!("invalid year {}", year)))?;
            let end = NaiveDate::from_ymd_opt(year, 12, 31).unwrap();
            (start, end)
        }
    };

    let context = request.project_context.clone().unwrap_or_default();

    let mut windows = Vec::with_capacity(request.windows.len());
    for window in &request.windows {
        windows.push(WindowSpan {
            id: window.id,
            label: window.label.clone(),
            start: parse_date("window_start", &window.start_date)?,
            end: parse_date("window_end", &window.end_date)?,
        });
    }

    let mut blackouts = HashSet::new();
    for blackout in &request.rules.blackout_dates {
        blackouts.insert(parse_date("blackout", blackout)?);
    }

    let mut staff: Vec<StaffMember> = employees
        .iter()
        .map(|employee| StaffMember {
            region: calendar::region_of(&employee.locality),
            strategy: strategy::expand(
                request.strategy_preference,
                employee.hourly_rate,
                request.preset_periods.as_deref(),
            ),
            employee: employee.clone(),
        })
        .collect();
    staff.sort_by(|a, b| b.employee.hourly_rate.total_cmp(&a.employee.hourly_rate));

    let mut client_sizes: HashMap<String, usize> = HashMap::new();
    for employee in employees {
        *client_sizes.entry(employee.client.clone()).or_insert(0) += 1;
    }
    let client_caps = client_sizes
        .into_iter()
        .map(|(client, size)| (client, ledger::client_cap(size)))
        .collect();

    // Calendars cover the horizon plus the longest period overhang
    let longest_period = staff
        .iter()
        .flat_map(|member| member.strategy.periods.iter().copied())
        .max()
        .unwrap_or(30);
    let calendar_end = horizon_end + Duration::days(longest_period.max(30) + 2);

    let mut regions: HashSet<Option<Region>> = staff.iter().map(|member| member.region).collect();
    regions.insert(None);

    let mut holidays_by_region = HashMap::new();
    let mut closed_by_region = HashMap::new();
    for &region in &regions {
        let mut holiday_set = HashSet::new();
        for year in horizon_start.year()..=calendar_end.year() {
            holiday_set.extend(calendar::holidays(year, region));
        }
        closed_by_region.insert(
            region,
            calendar::non_working_days(horizon_start, calendar_end, region),
        );
        holidays_by_region.insert(region, holiday_set);
    }

    let staff_regions: HashSet<Option<Region>> =
        staff.iter().map(|member| member.region).collect();
    let mut union_holidays: HashSet<NaiveDate> = HashSet::new();
    if staff_regions.is_empty() {
        union_holidays.extend(holidays_by_region[&None].iter().copied());
    } else {
        for region in &staff_regions {
            union_holidays.extend(holidays_by_region[region].iter().copied());
        }
    }

    Ok(Prepared {
        horizon_start,
        horizon_end,
        preferred_weekday: context.preferred_start_weekday,
        budget: context.budget,
        windows,
        blackouts,
        allow_start_before_holiday: request.rules.allow_start_before_holiday,
        max_simultaneous: ledger::max_simultaneous(
            employees.len(),
            context.max_concurrency_percent,
        ),
        staff,
        client_caps,
        union_holidays,
        holidays_by_region,
        closed_by_region,
    })
}

// ============================================================================
// Result assembly
// ============================================================================

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn month_key(start_date: &str) -> String {
    let month: usize = start_date[5..7].parse().unwrap_or(1);
    MONTH_KEYS[month - 1].to_string()
}

/// Derive abono pecuniário grants for staff whose strategy sells days.
///
/// The sold block is positioned to end immediately before the 30-day
/// separation cursor that follows the employee's last scheduled period.
pub(crate) fn grant_abonos(prepared: &Prepared, placed: &[PlacedPeriod]) -> Vec<AbonoGrant> {
    let mut grants = Vec::new();
    for (staff_idx, member) in prepared.staff.iter().enumerate() {
        let sell_days = member.strategy.sell_days;
        if sell_days == 0 {
            continue;
        }
        let last_end = placed
            .iter()
            .filter(|period| period.staff_idx == staff_idx)
            .map(|period| period.end)
            .max();
        let Some(last_end) = last_end else {
            warn!(
                "employee {} sells {} days but has no scheduled period, skipping abono",
                member.employee.id, sell_days
            );
            continue;
        };
        let cursor = last_end + Duration::days(30);
        grants.push(AbonoGrant {
            staff_idx,
            start: cursor - Duration::days(sell_days),
            end: cursor - Duration::days(1),
            savings: member.employee.hourly_rate * calendar::HOURS_PER_DAY * sell_days as f64,
        });
    }
    grants
}

fn window_breakdown(
    prepared: &Prepared,
    member: &StaffMember,
    start: NaiveDate,
    end: NaiveDate,
) -> (HashMap<String, f64>, HashMap<String, f64>) {
    let mut costs = HashMap::new();
    let mut hours_map = HashMap::new();
    for window in &prepared.windows {
        if let Some((overlap_start, overlap_end)) = window.intersect(start, end) {
            let hours = prepared.hours(member.region, overlap_start, overlap_end);
            costs.insert(window.label.clone(), hours * member.employee.hourly_rate);
            hours_map.insert(window.label.clone(), hours);
        }
    }
    (costs, hours_map)
}

pub(crate) fn allocation_from_period(prepared: &Prepared, period: &PlacedPeriod) -> Allocation {
    let member = &prepared.staff[period.staff_idx];
    let (window_costs, window_hours) = window_breakdown(prepared, member, period.start, period.end);
    Allocation {
        employee_id: member.employee.id,
        employee_name: member.employee.name.clone(),
        start_date: iso(period.start),
        end_date: iso(period.end),
        duration_days: (period.end - period.start).num_days() + 1,
        cost_impact: period.cost,
        billable_hours: period.hours,
        allocation_type: member.strategy.period_type(period.period_idx),
        window_costs,
        window_hours,
    }
}

pub(crate) fn allocation_from_abono(prepared: &Prepared, grant: &AbonoGrant) -> Allocation {
    let member = &prepared.staff[grant.staff_idx];
    let sell_days = member.strategy.sell_days;
    Allocation {
        employee_id: member.employee.id,
        employee_name: member.employee.name.clone(),
        start_date: iso(grant.start),
        end_date: iso(grant.end),
        duration_days: sell_days,
        cost_impact: 0.0, // sold days are worked, not absent
        billable_hours: sell_days as f64 * calendar::HOURS_PER_DAY,
        allocation_type: "ABONO_PECUNIARIO".to_string(),
        window_costs: HashMap::new(),
        window_hours: HashMap::new(),
    }
}

pub(crate) fn assemble(
    prepared: &Prepared,
    outcome: ScheduleOutcome,
    solver_method: SolverMethod,
    started: Instant,
) -> OptimizationResult {
    let abonos = grant_abonos(prepared, &outcome.placed);

    let mut allocations: Vec<Allocation> = outcome
        .placed
        .iter()
        .map(|period| allocation_from_period(prepared, period))
        .collect();
    allocations.extend(
        abonos
            .iter()
            .map(|grant| allocation_from_abono(prepared, grant)),
    );
    allocations.sort_by(|a, b| {
        a.start_date
            .cmp(&b.start_date)
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });

    let total_impact: f64 = allocations.iter().map(|a| a.cost_impact).sum();
    let financial_savings: f64 = abonos.iter().map(|grant| grant.savings).sum();

    let mut monthly_cash_flow: HashMap<String, f64> = HashMap::new();
    for allocation in &allocations {
        *monthly_cash_flow
            .entry(month_key(&allocation.start_date))
            .or_insert(0.0) += allocation.cost_impact;
    }

    let clt_compliance_check = prepared.staff.iter().enumerate().all(|(idx, member)| {
        outcome
            .placed
            .iter()
            .filter(|period| period.staff_idx == idx)
            .count()
            == member.strategy.periods.len()
    });

    OptimizationResult {
        total_impact,
        financial_savings,
        allocations,
        clt_compliance_check,
        holiday_conflicts_avoided: outcome.holiday_conflicts_avoided,
        monthly_revenue_target: prepared.budget / 12.0,
        monthly_cash_flow,
        solver_method,
        optimization_time_seconds: started.elapsed().as_secs_f64(),
    }
}
