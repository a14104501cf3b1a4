//! Composite document assembly.
//!
//! The template copy gets the aggregated KPI values first, then the two
//! analysis results are attached at the top level, replacing any template
//! fields with the same names.

use crate::analysis::{KpiRegistry, KpiSnapshot};
use crate::models::{Composite, Template, CUSTOMER_INSIGHTS_KEY, NEWS_ANALYSIS_KEY};
use serde_json::Value;
use tracing::debug;

/// Results of the two external analysis scripts.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResults {
    pub news_analysis: Value,
    pub customer_insights: Value,
}

/// Merge KPI values and analysis results into the template.
pub fn merge(
    mut template: Template,
    registry: &KpiRegistry,
    snapshot: &KpiSnapshot,
    analyses: AnalysisResults,
) -> Composite {
    let written = registry.apply(&mut template, snapshot);
    debug!(
        "Wrote {} KPI values, skipped {}",
        written,
        registry.warnings().len()
    );

    template.set_field(NEWS_ANALYSIS_KEY, analyses.news_analysis);
    template.set_field(CUSTOMER_INSIGHTS_KEY, analyses.customer_insights);

    Composite(template.into_value())
}
