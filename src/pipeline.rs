//! Per-request dashboard build.
//!
//! Two groups run concurrently: the template plus both datasets, and the two
//! analysis scripts. The first failure in either group fails the build and
//! drops everything still in flight. Aggregation and merging run only once
//! every input is complete.

use crate::analysis::{InvokeError, KpiRegistry, KpiSnapshot, KpiWarning, ScriptInvoker};
use crate::config::Config;
use crate::models::Composite;
use crate::report::{self, AnalysisResults};
use crate::store::{StoreError, TemplateStore};
use crate::tabular::{self, TabularError};
use futures::TryFutureExt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Any failure that prevents a composite document from being built.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Tabular(#[from] TabularError),

    #[error(transparent)]
    Analysis(#[from] InvokeError),
}

/// A built composite document plus the recoverable warnings raised on the way.
#[derive(Debug)]
pub struct PipelineOutput {
    pub composite: Composite,
    pub warnings: Vec<KpiWarning>,
}

/// Everything needed to build the dashboard document.
#[derive(Debug)]
pub struct Pipeline {
    store: TemplateStore,
    shipments: PathBuf,
    customers: PathBuf,
    invoker: ScriptInvoker,
    news_script: PathBuf,
    customer_script: PathBuf,
}

impl Pipeline {
    /// Build a pipeline from the data and analysis settings.
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: TemplateStore::new(config.data.template.clone()),
            shipments: config.data.shipments.clone(),
            customers: config.data.customers.clone(),
            invoker: ScriptInvoker::from_config(&config.analysis),
            news_script: config.analysis.news_script.clone(),
            customer_script: config.analysis.customer_script.clone(),
        }
    }

    /// The template store used for reads and writes.
    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    /// Recompute the composite document from scratch.
    pub async fn build(&self) -> Result<PipelineOutput, PipelineError> {
        let inputs = async {
            futures::try_join!(
                self.store.load().err_into::<PipelineError>(),
                tabular::load_rows(&self.shipments).err_into::<PipelineError>(),
                tabular::load_rows(&self.customers).err_into::<PipelineError>(),
            )
        };

        let analyses = async {
            info!("Running analysis scripts...");
            let (news_analysis, customer_insights) = futures::try_join!(
                self.invoker.run(&self.news_script),
                self.invoker.run(&self.customer_script),
            )?;
            info!("Analysis scripts finished.");
            Ok::<_, PipelineError>(AnalysisResults {
                news_analysis,
                customer_insights,
            })
        };

        let ((template, shipments, customers), analyses) = futures::try_join!(inputs, analyses)?;

        let registry = KpiRegistry::build(&template);
        let snapshot = KpiSnapshot::compute(&shipments, &customers);
        debug!(
            "Aggregated {} shipments (freight {:.2}) and {} customers (acquisition {:.2})",
            snapshot.shipment_count,
            snapshot.total_freight_cost,
            snapshot.customer_count,
            snapshot.total_acquisition_cost
        );
        let warnings = registry.warnings().to_vec();
        let composite = report::merge(template, &registry, &snapshot, analyses);

        Ok(PipelineOutput {
            composite,
            warnings,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{read_pid, wait_for_exit, Fixture};
    use serde_json::json;
    use std::path::Path;

    #[tokio::test]
    async fn test_build_full_document() {
        let fixture = Fixture::new();
        let output = fixture.pipeline().build().await.unwrap();
        let doc = output.composite.as_value();

        assert!(output.warnings.is_empty());
        assert_eq!(doc["company_profile"]["name"], "Acme Exports");
        assert_eq!(doc["kpis"]["Financial KPIs"]["Revenue Growth"]["value"], json!(3.0));
        assert_eq!(doc["kpis"]["Financial KPIs"]["Revenue Growth"]["unit"], "M USD");
        assert_eq!(doc["kpis"]["Financial KPIs"]["Cost Per Shipment"]["value"], json!(400.0));
        assert_eq!(doc["kpis"]["Financial KPIs"]["ROI"]["value"], json!(200.0));
        assert_eq!(doc["kpis"]["Operational KPIs"]["On-Time Delivery Rate"]["value"], json!(66.7));
        assert_eq!(doc["kpis"]["Operational KPIs"]["Avg. Customs Clearance"]["value"], json!(2.3));
        assert_eq!(
            doc["kpis"]["Strategic KPIs"]["Customer Satisfaction Score"]["value"],
            json!(4.5)
        );
        assert_eq!(doc["news_analysis"], json!([{"title": "Tariff cut"}]));
        assert_eq!(doc["customer_insights"], json!({"customer_segmentation": []}));
    }

    #[tokio::test]
    async fn test_empty_shipments_build_cleanly() {
        let fixture = Fixture::new();
        fixture.write(
            "shipment.csv",
            "shipment_id,delivery_status,freight_cost,customs_clearance_time_days\n",
        );

        let output = fixture.pipeline().build().await.unwrap();
        let ops = &output.composite.as_value()["kpis"]["Operational KPIs"];
        assert_eq!(ops["On-Time Delivery Rate"]["value"], json!(0.0));
        assert_eq!(
            output.composite.as_value()["kpis"]["Financial KPIs"]["Cost Per Shipment"]["value"],
            json!(0.0)
        );
    }

    #[tokio::test]
    async fn test_missing_kpi_path_is_a_warning() {
        let fixture = Fixture::new();
        fixture.write(
            "template.json",
            r#"{"company_profile": {"name": "Acme"}, "kpis": {"Financial KPIs": {}}}"#,
        );

        let output = fixture.pipeline().build().await.unwrap();
        assert_eq!(output.warnings.len(), 6);
        assert_eq!(output.composite.as_value()["kpis"], json!({"Financial KPIs": {}}));
        assert_eq!(output.composite.as_value()["company_profile"]["name"], "Acme");
    }

    async fn assert_analysis_failure(script: &str, body: &str) {
        let fixture = Fixture::new();
        fixture.write(script, body);

        let err = fixture.pipeline().build().await.unwrap_err();
        assert!(
            matches!(err, PipelineError::Analysis(_)),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_either_invoker_failure_fails_build() {
        for script in ["news.sh", "customers.sh"] {
            assert_analysis_failure(script, "echo 'crashed' >&2\nexit 1\n").await;
            assert_analysis_failure(script, "echo 'no data file' >&2\n").await;
            assert_analysis_failure(script, "echo 'not json'\n").await;
        }
    }

    #[tokio::test]
    async fn test_missing_template_fails_build() {
        let fixture = Fixture::new();
        std::fs::remove_file(fixture.path("template.json")).unwrap();

        let err = fixture.pipeline().build().await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::Read { .. })));
    }

    #[tokio::test]
    async fn test_short_dataset_rows_still_build() {
        let fixture = Fixture::new();
        fixture.write(
            "shipment.csv",
            "shipment_id,delivery_status,freight_cost,customs_clearance_time_days\n\
             S1,On-Time,300,1\nS2,Delayed,600\n",
        );

        let output = fixture.pipeline().build().await.unwrap();
        let kpis = &output.composite.as_value()["kpis"];
        assert_eq!(kpis["Operational KPIs"]["On-Time Delivery Rate"]["value"], json!(50.0));
        assert_eq!(kpis["Operational KPIs"]["Avg. Customs Clearance"]["value"], json!(0.5));
        assert_eq!(kpis["Financial KPIs"]["Cost Per Shipment"]["value"], json!(450.0));
    }

    #[tokio::test]
    async fn test_failing_sibling_kills_running_script() {
        let fixture = Fixture::new();
        let pid_file = fixture.path("news.pid");
        fixture.write(
            "news.sh",
            &format!("echo $$ > {}\nexec sleep 30\n", pid_file.display()),
        );
        fixture.write(
            "customers.sh",
            &format!(
                "while [ ! -s {} ]; do sleep 0.05; done\necho 'crashed' >&2\nexit 1\n",
                pid_file.display()
            ),
        );

        let err = fixture.pipeline().build().await.unwrap_err();
        assert!(matches!(err, PipelineError::Analysis(InvokeError::Failed { .. })));

        let pid = read_pid(&pid_file).await;
        assert!(wait_for_exit(pid).await, "news script {pid} still running");
    }

    #[tokio::test]
    async fn test_saved_template_is_used_on_next_build() {
        let fixture = Fixture::new();
        let pipeline = fixture.pipeline();

        let document = json!({"company_profile": {"name": "Globex Freight"}, "kpis": {}});
        pipeline.store().save(&document).await.unwrap();

        let output = pipeline.build().await.unwrap();
        assert_eq!(
            output.composite.as_value()["company_profile"],
            document["company_profile"]
        );
        assert!(Path::new(&fixture.config.data.template).exists());
    }
}
