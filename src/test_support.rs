//! Shared on-disk fixtures for tests.

use crate::config::Config;
use crate::pipeline::Pipeline;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub const TEMPLATE: &str = r#"{
  "company_profile": {"name": "Acme Exports", "sector": "Spices"},
  "kpis": {
    "Financial KPIs": {
      "Revenue Growth": {"value": 0, "unit": "", "target": 5, "trend": "up"},
      "Cost Per Shipment": {"value": 0, "unit": "", "target": 400, "trend": "down"},
      "ROI": {"value": 0, "unit": "", "target": 150, "trend": "up"}
    },
    "Operational KPIs": {
      "On-Time Delivery Rate": {"value": 0, "unit": "", "target": 95, "trend": "up"},
      "Avg. Customs Clearance": {"value": 0, "unit": "", "target": 2, "trend": "down"}
    },
    "Strategic KPIs": {
      "Customer Satisfaction Score": {"value": 0, "unit": "", "target": 4.5, "trend": "up"}
    }
  },
  "crisis_management": {"levels": []},
  "predictive_insights": {}
}"#;

/// A temp directory holding a template, both datasets and two `sh`
/// analysis scripts, with a config pointing at all of them.
pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.server.static_dir = dir.path().join("public");
        config.data.template = dir.path().join("template.json");
        config.data.shipments = dir.path().join("shipment.csv");
        config.data.customers = dir.path().join("customer.csv");
        config.analysis.interpreter = "sh".to_string();
        config.analysis.news_script = dir.path().join("news.sh");
        config.analysis.customer_script = dir.path().join("customers.sh");
        config.analysis.timeout_seconds = 10;

        let fixture = Self { dir, config };
        fixture.write("template.json", TEMPLATE);
        fixture.write(
            "shipment.csv",
            "shipment_id,delivery_status,freight_cost,customs_clearance_time_days\n\
             S1,On-Time,300,1\nS2,Delayed,600,4\nS3,On-Time,300,2\n",
        );
        fixture.write(
            "customer.csv",
            "customer_id,order_value_usd,acquisition_cost_usd,satisfaction_score\n\
             C1,1500000,500000,4\nC2,1500000,500000,5\n",
        );
        fixture.write("news.sh", "echo '[{\"title\": \"Tariff cut\"}]'\n");
        fixture.write("customers.sh", "echo '{\"customer_segmentation\": []}'\n");
        fixture
    }

    pub fn write(&self, name: &str, content: &str) {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_config(&self.config)
    }
}

/// Wait for a script to write its pid to `path`.
pub async fn read_pid(path: &Path) -> u32 {
    for _ in 0..200 {
        if let Ok(pid) = std::fs::read_to_string(path).unwrap_or_default().trim().parse() {
            return pid;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("no pid written to {}", path.display());
}

/// Whether `pid` is a live process. Zombies awaiting reaping count as gone.
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    let signalled = std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false);
    if !signalled {
        return false;
    }

    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !stat
            .rsplit(')')
            .next()
            .is_some_and(|rest| rest.trim_start().starts_with('Z')),
        Err(_) => true,
    }
}

/// Poll until `pid` has exited, giving up after five seconds.
#[cfg(unix)]
pub async fn wait_for_exit(pid: u32) -> bool {
    for _ in 0..100 {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
