use thiserror::Error;

/// Errors surfaced at the engine boundary.
///
/// The schedulers themselves never fail: an unplaceable period produces a
/// partial result and an unprovable ILP model produces a fallback, both
/// non-fatal. Errors exist only for malformed requests.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid {field} date: {source}")]
    InvalidDate {
        field: &'static str,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
