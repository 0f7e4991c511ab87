//! Report rendering port.

use crate::domain::batch::BatchReport;
use crate::domain::preset::Preset;
use crate::domain::scenario::Scenario;
use crate::domain::scorer::ScoredSecurity;
use crate::domain::stress::ScenarioResult;

/// Renders core outputs as text. The run summary is always part of the
/// output so partial success is never presented as full success.
pub trait ReportPort {
    fn render_screen(
        &self,
        title: &str,
        preset: &Preset,
        ranked: &[ScoredSecurity],
        disqualified: &[ScoredSecurity],
        batch: &BatchReport,
    ) -> String;

    fn render_stress(&self, scenario: &Scenario, result: &ScenarioResult, batch: &BatchReport) -> String;
}
