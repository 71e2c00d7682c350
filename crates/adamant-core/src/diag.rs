//! Rate-limited warning emission.
//!
//! When the debug information is systematically off, dynamic-type
//! resolution fails the same way once per field; an evaluation-scoped
//! budget keeps that from flooding the log. The budget object is passed by
//! reference into resolution calls, never stored globally.

use tracing::warn;

/// Per-evaluation warning budget.
///
/// At most `limit` warnings are forwarded to the `tracing` subscriber per
/// top-level evaluation; the rest are only counted. Call
/// [`WarnBudget::reset`] at the start of each evaluation.
#[derive(Debug, Clone)]
pub struct WarnBudget
{
    limit: u32,
    emitted: u32,
    suppressed: u32,
}

impl Default for WarnBudget
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl WarnBudget
{
    /// Warning cap applied per top-level evaluation.
    pub const DEFAULT_LIMIT: u32 = 2;

    #[must_use]
    pub fn new() -> Self
    {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    #[must_use]
    pub fn with_limit(limit: u32) -> Self
    {
        Self {
            limit,
            emitted: 0,
            suppressed: 0,
        }
    }

    /// Forget previous emissions; the next warnings flow again.
    pub fn reset(&mut self)
    {
        self.emitted = 0;
        self.suppressed = 0;
    }

    /// Emit one warning, unless the budget for this evaluation is spent.
    pub fn warn(&mut self, message: &str)
    {
        if self.emitted < self.limit {
            self.emitted += 1;
            warn!("{message}");
        } else {
            self.suppressed += 1;
        }
    }

    /// Number of warnings forwarded since the last reset.
    #[must_use]
    pub fn emitted(&self) -> u32
    {
        self.emitted
    }

    /// Number of warnings swallowed since the last reset.
    #[must_use]
    pub fn suppressed(&self) -> u32
    {
        self.suppressed
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_budget_limits_emission()
    {
        let mut budget = WarnBudget::with_limit(2);
        budget.warn("one");
        budget.warn("two");
        budget.warn("three");
        assert_eq!(budget.emitted(), 2);
        assert_eq!(budget.suppressed(), 1);
    }

    #[test]
    fn test_reset_restores_budget()
    {
        let mut budget = WarnBudget::with_limit(1);
        budget.warn("one");
        budget.warn("two");
        budget.reset();
        assert_eq!(budget.emitted(), 0);
        assert_eq!(budget.suppressed(), 0);
        budget.warn("three");
        assert_eq!(budget.emitted(), 1);
    }
}
