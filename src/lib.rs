pub mod calendar;
pub mod engine;
pub mod error;
pub mod heuristic;
pub mod ilp;
pub mod ledger;
pub mod legacy;
pub mod logger;
pub mod models;
pub mod strategy;

pub use engine::{
    run_legacy_comparison, run_optimization, run_optimization_heuristic, run_optimization_ilp,
    validate_request,
};
pub use error::EngineError;
pub use legacy::{LegacyResult, LegacyRow};
pub use models::{
    Allocation, Employee, MeasurementWindow, OptimizationRequest, OptimizationResult,
    ProjectContext, SolverMethod, StrategyPreference, VacationRules,
};
