use std::error::Error as StdError;
use std::sync::atomic::{AtomicUsize, Ordering};

use lifecycle_core::stager::{StageHandler, StageSummary, StageTarget};

/// Prints every staging outcome to standard output.
#[derive(Debug, Default)]
pub struct ReportingHandler {
    failures: AtomicUsize,
}

impl ReportingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failures reported across every stage this handler has seen
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl StageHandler for ReportingHandler {
    fn on_success(&self, target: StageTarget<'_>) {
        println!("  ok    {}", target);
    }

    fn on_error(&self, target: StageTarget<'_>, cause: &(dyn StdError + 'static)) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        println!("  FAIL  {}: {}", target, cause);
    }
}

/// One line per stage, printed after its pass
pub fn print_summary(stage: &str, summary: &StageSummary) {
    if summary.already_staged {
        println!("Stage '{}': already staged", stage);
    } else {
        println!(
            "Stage '{}': {} attempted, {} succeeded, {} failed",
            stage,
            summary.attempted,
            summary.succeeded(),
            summary.failed
        );
    }
}
