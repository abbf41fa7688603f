//! Counters describing how a generation went.
//!
//! [`GenerationDiagnostics`] is attached to every
//! [`FinalResult`](crate::types::FinalResult). It records how much of the
//! stream was seen, how often partial decoding succeeded, and whether the
//! fixer or transport retries were involved.

use serde::Serialize;

/// Records what happened while streaming and validating one generation.
///
/// # Example
///
/// ```
/// use kitchencraft_stream::diagnostics::GenerationDiagnostics;
///
/// let diag = GenerationDiagnostics::default();
/// assert!(!diag.fixer_invoked);
/// assert_eq!(diag.partial_hit_rate(), 0.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationDiagnostics {
    /// Chunks received across all passes.
    pub chunks: usize,

    /// Partial decode attempts (one per non-empty chunk).
    pub partial_attempts: usize,

    /// Partial decode attempts that produced a valid partial value.
    pub partial_hits: usize,

    /// Length of the primary pass's accumulated text.
    pub primary_raw_len: usize,

    /// Whether the fixer pass ran.
    pub fixer_invoked: bool,

    /// Transport retries spent opening streams.
    pub transport_retries: u32,
}

impl GenerationDiagnostics {
    /// Fraction of partial decode attempts that succeeded.
    pub fn partial_hit_rate(&self) -> f64 {
        if self.partial_attempts == 0 {
            return 0.0;
        }
        self.partial_hits as f64 / self.partial_attempts as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate() {
        let d = GenerationDiagnostics {
            partial_attempts: 4,
            partial_hits: 3,
            ..Default::default()
        };
        assert!((d.partial_hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
