mod json;
mod terminal;

pub use json::JsonLinesSink;
pub use terminal::TerminalDashboard;

use crate::session::SessionSnapshot;
use anyhow::Result;

/// Trait for presentation destinations
pub trait DashboardSink {
    /// Render the current session state
    fn present(&mut self, snapshot: &SessionSnapshot) -> Result<()>;
}

/// Qualitative band for a sleep score (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Critical,
    Caution,
    Good,
    Optimal,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score <= 30.0 {
            ScoreBand::Critical
        } else if score <= 60.0 {
            ScoreBand::Caution
        } else if score <= 85.0 {
            ScoreBand::Good
        } else {
            ScoreBand::Optimal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Critical => "CRITICAL",
            ScoreBand::Caution => "CAUTION",
            ScoreBand::Good => "GOOD",
            ScoreBand::Optimal => "OPTIMAL",
        }
    }
}
