//! KPI aggregation over the shipment and customer datasets.
//!
//! [`KpiSnapshot`] holds the raw metrics. [`KpiRegistry`] resolves the fixed
//! set of [`KpiTarget`]s against a loaded template once, so writes never
//! create new paths and missing targets surface as [`KpiWarning`]s.

use crate::models::Template;
use crate::tabular::Row;
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Dataset field names read by the aggregator.
pub mod fields {
    pub const ORDER_VALUE: &str = "order_value_usd";
    pub const ACQUISITION_COST: &str = "acquisition_cost_usd";
    pub const SATISFACTION: &str = "satisfaction_score";
    pub const DELIVERY_STATUS: &str = "delivery_status";
    pub const FREIGHT_COST: &str = "freight_cost";
    pub const CLEARANCE_DAYS: &str = "customs_clearance_time_days";
}

/// Delivery status counted as on time.
pub const ON_TIME: &str = "On-Time";

/// Metrics derived from one pair of datasets. Values are unrounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KpiSnapshot {
    pub shipment_count: usize,
    pub customer_count: usize,
    pub total_revenue: f64,
    pub on_time_rate: f64,
    pub total_freight_cost: f64,
    pub cost_per_shipment: f64,
    pub avg_clearance_time: f64,
    pub total_acquisition_cost: f64,
    pub customer_roi: f64,
    pub avg_satisfaction: f64,
}

impl KpiSnapshot {
    /// Compute all metrics. Means and ratios over an empty dataset are 0.
    pub fn compute(shipments: &[Row], customers: &[Row]) -> Self {
        let shipment_count = shipments.len();
        let customer_count = customers.len();

        let on_time = shipments
            .iter()
            .filter(|s| s.get(fields::DELIVERY_STATUS) == Some(ON_TIME))
            .count();
        let total_freight_cost = sum(shipments, fields::FREIGHT_COST);
        let total_clearance = sum(shipments, fields::CLEARANCE_DAYS);

        let total_revenue = sum(customers, fields::ORDER_VALUE);
        let total_acquisition_cost = sum(customers, fields::ACQUISITION_COST);
        let total_satisfaction = sum(customers, fields::SATISFACTION);

        Self {
            shipment_count,
            customer_count,
            total_revenue,
            on_time_rate: ratio(on_time as f64, shipment_count) * 100.0,
            total_freight_cost,
            cost_per_shipment: ratio(total_freight_cost, shipment_count),
            avg_clearance_time: ratio(total_clearance, shipment_count),
            total_acquisition_cost,
            customer_roi: roi(total_revenue, total_acquisition_cost),
            avg_satisfaction: ratio(total_satisfaction, customer_count),
        }
    }
}

fn sum(rows: &[Row], field: &str) -> f64 {
    rows.iter().map(|r| r.number(field)).sum()
}

fn ratio(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Return on acquisition spend, in percent. Zero when nothing was spent.
pub fn roi(revenue: f64, acquisition_cost: f64) -> f64 {
    if acquisition_cost > 0.0 {
        (revenue - acquisition_cost) / acquisition_cost * 100.0
    } else {
        0.0
    }
}

/// Round to `places` decimals, deciding on the exact binary value.
///
/// `4.35` is stored just below 4.35 and rounds to 4.3. Values that sit
/// exactly on a decimal tie (odd multiples of `2^-(places + 1)`, such as
/// 0.25 or 0.125) round away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let halves = value * 2f64.powi(places + 1);
    if halves.fract() == 0.0 && halves % 2.0 != 0.0 {
        let factor = 10f64.powi(places);
        return (value * factor).round() / factor;
    }

    let digits = usize::try_from(places).unwrap_or(0);
    format!("{value:.digits$}").parse().unwrap_or(value)
}

/// A KPI entry in the template that the aggregator writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KpiTarget {
    RevenueGrowth,
    CostPerShipment,
    Roi,
    OnTimeDeliveryRate,
    AvgCustomsClearance,
    CustomerSatisfaction,
}

impl KpiTarget {
    /// Every target, in write order.
    pub const ALL: [KpiTarget; 6] = [
        KpiTarget::RevenueGrowth,
        KpiTarget::CostPerShipment,
        KpiTarget::Roi,
        KpiTarget::OnTimeDeliveryRate,
        KpiTarget::AvgCustomsClearance,
        KpiTarget::CustomerSatisfaction,
    ];

    /// Category key under `kpis`.
    pub fn category(&self) -> &'static str {
        match self {
            KpiTarget::RevenueGrowth | KpiTarget::CostPerShipment | KpiTarget::Roi => {
                "Financial KPIs"
            }
            KpiTarget::OnTimeDeliveryRate | KpiTarget::AvgCustomsClearance => "Operational KPIs",
            KpiTarget::CustomerSatisfaction => "Strategic KPIs",
        }
    }

    /// Metric key under the category.
    pub fn metric(&self) -> &'static str {
        match self {
            KpiTarget::RevenueGrowth => "Revenue Growth",
            KpiTarget::CostPerShipment => "Cost Per Shipment",
            KpiTarget::Roi => "ROI",
            KpiTarget::OnTimeDeliveryRate => "On-Time Delivery Rate",
            KpiTarget::AvgCustomsClearance => "Avg. Customs Clearance",
            KpiTarget::CustomerSatisfaction => "Customer Satisfaction Score",
        }
    }

    /// Unit written alongside the value.
    pub fn unit(&self) -> &'static str {
        match self {
            KpiTarget::RevenueGrowth => "M USD",
            KpiTarget::CostPerShipment => "USD",
            KpiTarget::Roi | KpiTarget::OnTimeDeliveryRate => "%",
            KpiTarget::AvgCustomsClearance => "days",
            KpiTarget::CustomerSatisfaction => "/ 5",
        }
    }

    /// Rounded value written for this target.
    pub fn value(&self, snapshot: &KpiSnapshot) -> f64 {
        match self {
            KpiTarget::RevenueGrowth => round_to(snapshot.total_revenue / 1_000_000.0, 1),
            KpiTarget::CostPerShipment => round_to(snapshot.cost_per_shipment, 2),
            KpiTarget::Roi => round_to(snapshot.customer_roi, 1),
            KpiTarget::OnTimeDeliveryRate => round_to(snapshot.on_time_rate, 1),
            KpiTarget::AvgCustomsClearance => round_to(snapshot.avg_clearance_time, 1),
            KpiTarget::CustomerSatisfaction => round_to(snapshot.avg_satisfaction, 1),
        }
    }
}

/// Recoverable problems found while resolving targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KpiWarning {
    MissingPath {
        category: &'static str,
        metric: &'static str,
    },
}

impl fmt::Display for KpiWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiWarning::MissingPath { category, metric } => {
                write!(f, "KPI path not found - {} -> {}", category, metric)
            }
        }
    }
}

/// Targets that exist in a particular template.
#[derive(Debug, Clone, Default)]
pub struct KpiRegistry {
    resolved: Vec<KpiTarget>,
    warnings: Vec<KpiWarning>,
}

impl KpiRegistry {
    /// Resolve every target against `template`.
    pub fn build(template: &Template) -> Self {
        let mut registry = Self::default();

        for target in KpiTarget::ALL {
            if template.kpi(target.category(), target.metric()).is_some() {
                registry.resolved.push(target);
            } else {
                let warning = KpiWarning::MissingPath {
                    category: target.category(),
                    metric: target.metric(),
                };
                warn!("Warning: {}", warning);
                registry.warnings.push(warning);
            }
        }

        registry
    }

    /// Targets present in the template.
    #[cfg(test)]
    pub fn resolved(&self) -> &[KpiTarget] {
        &self.resolved
    }

    /// Targets that were skipped.
    pub fn warnings(&self) -> &[KpiWarning] {
        &self.warnings
    }

    /// Write the snapshot into every resolved target.
    ///
    /// Returns the number of entries written.
    pub fn apply(&self, template: &mut Template, snapshot: &KpiSnapshot) -> usize {
        let mut written = 0;

        for target in &self.resolved {
            if let Some(entry) = template.kpi_mut(target.category(), target.metric()) {
                entry.insert("value".to_string(), Value::from(target.value(snapshot)));
                entry.insert("unit".to_string(), Value::from(target.unit()));
                written += 1;
            }
        }

        written
    }
}
