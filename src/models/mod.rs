use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub admission_date: String, // ISO 8601 date
    pub hourly_rate: f64,
    pub client: String,
    pub locality: String, // free-form, feeds regional holiday inference
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContext {
    pub id: i64,
    pub budget: f64,
    pub currency: String,
    pub preferred_start_weekday: u32, // 0 = Monday
    pub max_concurrency_percent: f64, // 1..=100
    pub country: String,
}

impl Default for ProjectContext {
    fn default() -> Self {
        Self {
            id: 0,
            budget: 0.0,
            currency: "BRL".to_string(),
            preferred_start_weekday: 0,
            max_concurrency_percent: 10.0,
            country: "BR".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementWindow {
    pub id: i64,
    pub start_date: String,
    pub end_date: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VacationRules {
    pub standard_days: i64,
    pub allow_split: bool,
    pub min_main_period: i64,
    pub min_other_period: i64,
    pub sell_days_limit: i64,
    pub allow_start_before_holiday: bool,
    pub blackout_dates: Vec<String>,
}

impl Default for VacationRules {
    fn default() -> Self {
        Self {
            standard_days: 30,
            allow_split: true,
            min_main_period: 14,
            min_other_period: 5,
            sell_days_limit: 10,
            allow_start_before_holiday: false,
            blackout_dates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyPreference {
    #[serde(rename = "STANDARD_30")]
    Standard30,
    #[serde(rename = "SELL_10")]
    Sell10,
    #[serde(rename = "SPLIT_2_PERIODS")]
    Split2Periods,
    #[serde(rename = "SPLIT_3_PERIODS")]
    Split3Periods,
    #[serde(rename = "SMART_HYBRID")]
    SmartHybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverMethod {
    Ilp,
    Heuristic,
    Ai, // stamped by external AI-assisted callers only
}

// ============================================================================
// Request
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub year: Option<i32>, // required unless a date range is given
    #[serde(default)]
    pub rules: VacationRules,
    pub strategy_preference: StrategyPreference,
    #[serde(default)]
    pub project_context: Option<ProjectContext>,
    #[serde(default)]
    pub windows: Vec<MeasurementWindow>,
    #[serde(default)]
    pub use_advanced_solver: bool,
    #[serde(default = "default_solver_timeout")]
    pub solver_timeout: f64, // seconds
    #[serde(default)]
    pub date_range_start: Option<String>,
    #[serde(default)]
    pub date_range_end: Option<String>,
    #[serde(default)]
    pub preset_periods: Option<Vec<i64>>, // overrides strategy expansion
}

fn default_solver_timeout() -> f64 {
    120.0
}

// ============================================================================
// Result
// ============================================================================

/// Allocation type strings: STANDARD, STANDARD_k (alongside sold days),
/// SPLIT_k, ABONO_PECUNIARIO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub employee_id: i64,
    pub employee_name: String,
    pub start_date: String,
    pub end_date: String, // start + duration - 1
    pub duration_days: i64,
    pub cost_impact: f64, // hourly_rate * billable_hours
    pub billable_hours: f64,
    pub allocation_type: String,
    #[serde(default)]
    pub window_costs: HashMap<String, f64>, // keyed by window label
    #[serde(default)]
    pub window_hours: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub total_impact: f64,
    pub financial_savings: f64,
    pub allocations: Vec<Allocation>,
    pub clt_compliance_check: bool,
    pub holiday_conflicts_avoided: i64,
    pub monthly_revenue_target: f64,
    pub monthly_cash_flow: HashMap<String, f64>, // keyed by 3-letter month
    pub solver_method: SolverMethod,
    pub optimization_time_seconds: f64,
}

impl OptimizationResult {
    pub fn empty(solver_method: SolverMethod) -> Self {
        Self {
            total_impact: 0.0,
            financial_savings: 0.0,
            allocations: Vec::new(),
            clt_compliance_check: true,
            holiday_conflicts_avoided: 0,
            monthly_revenue_target: 0.0,
            monthly_cash_flow: HashMap::new(),
            solver_method,
            optimization_time_seconds: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_preference_wire_names() {
        let json = serde_json::to_string(&StrategyPreference::Split2Periods).unwrap();
        assert_eq!(json, "\"SPLIT_2_PERIODS\"");

        let parsed: StrategyPreference = serde_json::from_str("\"SMART_HYBRID\"").unwrap();
        assert_eq!(parsed, StrategyPreference::SmartHybrid);
    }

    #[test]
    fn test_solver_method_wire_names() {
        assert_eq!(serde_json::to_string(&SolverMethod::Ilp).unwrap(), "\"ILP\"");
        assert_eq!(
            serde_json::to_string(&SolverMethod::Heuristic).unwrap(),
            "\"HEURISTIC\""
        );
        assert_eq!(serde_json::to_string(&SolverMethod::Ai).unwrap(), "\"AI\"");
    }

    #[test]
    fn test_request_defaults_from_minimal_json() {
        let request: OptimizationRequest =
            serde_json::from_str(r#"{"year": 2025, "strategy_preference": "STANDARD_30"}"#)
                .unwrap();

        assert_eq!(request.year, Some(2025));
        assert_eq!(request.rules.standard_days, 30);
        assert!((request.solver_timeout - 120.0).abs() < 1e-9);
        assert!(!request.use_advanced_solver);
        assert!(request.windows.is_empty());
        assert!(request.project_context.is_none());
    }

    #[test]
    fn test_project_context_defaults() {
        let context = ProjectContext::default();
        assert!((context.max_concurrency_percent - 10.0).abs() < 1e-9);
        assert_eq!(context.preferred_start_weekday, 0);
    }

    #[test]
    fn test_empty_result_is_compliant_with_zero_totals() {
        let result = OptimizationResult::empty(SolverMethod::Heuristic);
        assert!(result.clt_compliance_check);
        assert!((result.total_impact - 0.0).abs() < 1e-9);
        assert!(result.allocations.is_empty());
    }
}
