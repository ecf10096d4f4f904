//! Spreadsheet layout
//!
//! Builds the logical workbook: sheets of literal values and Excel formulas,
//! column formats, and chart definitions. Totals are left to formulas so the
//! reader can change a price or a count in the spreadsheet and see the
//! comparison update. Nothing here talks to AWS or touches the filesystem;
//! `crate::xlsx` renders the result.

use crate::gather::ClusterSnapshot;
use crate::pricing::PriceBook;
use serde::Serialize;
use std::ops::RangeInclusive;

pub const EC2_SHEET: &str = "EC2 Usage";
pub const FARGATE_SHEET: &str = "Fargate Usage";
pub const COMPARISON_SHEET: &str = "Comparison";
pub const CPU_CHART_SHEET: &str = "CPU Usage";
pub const MEMORY_CHART_SHEET: &str = "Memory Usage";

const EC2_HEADERS: [&str; 13] = [
    "Cluster",
    "Instance Type",
    "Instance Count",
    "Instance $/Hr",
    "Total $/Hr",
    "Used CPU",
    "Unused CPU",
    "Total CPU",
    "Used Memory",
    "Unused Memory",
    "Total Memory",
    "Wasted CPU",
    "Wasted Memory",
];

const FARGATE_HEADERS: [&str; 12] = [
    "Cluster",
    "Service",
    "Tasks running",
    "CPU shares",
    "MB Memory",
    "vCPU",
    "GB Mem",
    "vCPU $/Hr",
    "Total vCPU $/Hr",
    "GB $/Hr",
    "Total GB $/Hr",
    "Total Cost $/Hr",
];

const COMPARISON_HEADERS: [&str; 4] = ["Cluster", "Fargate Cost", "EC2 Cost", "Winner"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Excel formula, including the leading `=`
    Formula(String),
    Blank,
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn count(value: u64) -> Self {
        Cell::Number(value as f64)
    }

    /// A number that may be unknown (unpriced, not fittable)
    fn maybe(value: Option<f64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Blank)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnFormat {
    Currency,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    /// Row 0 is the header
    pub rows: Vec<Vec<Cell>>,
    /// Zero-based column ranges and their number format
    pub column_formats: Vec<(RangeInclusive<u16>, ColumnFormat)>,
}

impl Sheet {
    fn new(name: &str, headers: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            rows: vec![headers.iter().map(|h| Cell::text(*h)).collect()],
            column_formats: Vec::new(),
        }
    }

    /// 1-based number of the row the next push will land on
    fn next_row_number(&self) -> usize {
        self.rows.len() + 1
    }

    /// 1-based number of the last row (the header when there is no data)
    pub fn last_row_number(&self) -> usize {
        self.rows.len()
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        &self.rows[1..]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub categories: String,
    pub values: String,
}

/// A stacked column chart on its own chartsheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub sheet_name: String,
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub sheets: Vec<Sheet>,
    pub charts: Vec<Chart>,
}

impl Report {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}

/// `"EC2 Usage"` -> `"'EC2 Usage'"`, left alone when no quoting is needed
fn sheet_ref(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

/// Build the EC2 sheet: one row per cluster with container instances
pub fn ec2_sheet(snapshots: &[ClusterSnapshot], prices: &PriceBook) -> Sheet {
    let mut sheet = Sheet::new(EC2_SHEET, &EC2_HEADERS);
    for snapshot in snapshots {
        let Some(usage) = &snapshot.usage else {
            continue;
        };
        let r = sheet.next_row_number();
        sheet.rows.push(vec![
            Cell::text(&snapshot.name),
            Cell::text(&usage.instance_type),
            Cell::count(usage.instance_count),
            Cell::maybe(prices.instance(&usage.instance_type)),
            Cell::Formula(format!("=C{0}*D{0}", r)),
            Cell::Formula(format!("=H{0}-G{0}", r)),
            Cell::count(usage.remaining_cpu),
            Cell::count(usage.total_cpu),
            Cell::Formula(format!("=K{0}-J{0}", r)),
            Cell::count(usage.remaining_memory),
            Cell::count(usage.total_memory),
            Cell::Formula(format!("=G{0}/H{0}", r)),
            Cell::Formula(format!("=J{0}/K{0}", r)),
        ]);
    }
    sheet.column_formats = vec![(3..=4, ColumnFormat::Currency), (11..=12, ColumnFormat::Percent)];
    sheet
}

/// Build the Fargate sheet: one row per running service
pub fn fargate_sheet(snapshots: &[ClusterSnapshot], prices: &PriceBook) -> Sheet {
    let mut sheet = Sheet::new(FARGATE_SHEET, &FARGATE_HEADERS);
    for snapshot in snapshots {
        for service in &snapshot.services {
            let r = sheet.next_row_number();
            sheet.rows.push(vec![
                Cell::text(&snapshot.name),
                Cell::text(&service.name),
                Cell::count(service.running_task_count),
                Cell::count(service.requested_cpu_units),
                Cell::count(service.requested_memory_mb),
                Cell::maybe(service.normalized_vcpu()),
                Cell::maybe(service.normalized_memory_gb()),
                Cell::maybe(prices.fargate_vcpu_hourly),
                Cell::Formula(format!("=C{0}*F{0}*H{0}", r)),
                Cell::maybe(prices.fargate_gb_hourly),
                Cell::Formula(format!("=C{0}*G{0}*J{0}", r)),
                Cell::Formula(format!("=I{0}+K{0}", r)),
            ]);
        }
    }
    sheet.column_formats = vec![(7..=11, ColumnFormat::Currency)];
    sheet
}

/// Build the comparison sheet from the other two sheets' row counts
pub fn comparison_sheet(
    snapshots: &[ClusterSnapshot],
    ec2_last_row: usize,
    fargate_last_row: usize,
) -> Sheet {
    let mut sheet = Sheet::new(COMPARISON_SHEET, &COMPARISON_HEADERS);
    let fargate = sheet_ref(FARGATE_SHEET);
    let ec2 = sheet_ref(EC2_SHEET);
    let this = sheet_ref(COMPARISON_SHEET);

    for snapshot in snapshots.iter().filter(|s| s.usage.is_some()) {
        let r = sheet.next_row_number();
        sheet.rows.push(vec![
            Cell::text(&snapshot.name),
            Cell::Formula(format!(
                "=SUMIF({fargate}!A2:A{f},{this}!A{r},{fargate}!L2:L{f})",
                f = fargate_last_row,
            )),
            Cell::Formula(format!("=VLOOKUP(A{r},{ec2}!A2:E{e},5)", e = ec2_last_row)),
            Cell::Formula(format!("=IF(B{0}<C{0},\"Fargate\", \"EC2\")", r)),
        ]);
    }
    sheet.column_formats = vec![(1..=2, ColumnFormat::Currency)];
    sheet
}

fn usage_chart(
    sheet_name: &str,
    title: &str,
    y_axis: &str,
    columns: [char; 2],
    ec2_last_row: usize,
) -> Chart {
    let ec2 = sheet_ref(EC2_SHEET);
    let series = columns
        .iter()
        .map(|col| ChartSeries {
            name: format!("={ec2}!${col}$1"),
            categories: format!("={ec2}!$A$2:$A${ec2_last_row}"),
            values: format!("={ec2}!${col}$2:${col}${ec2_last_row}"),
        })
        .collect();
    Chart {
        sheet_name: sheet_name.to_string(),
        title: title.to_string(),
        x_axis: "Cluster".to_string(),
        y_axis: y_axis.to_string(),
        series,
    }
}

/// Lay out the whole workbook
///
/// The charts are dropped when no cluster has container instances, since
/// they would have no data to plot.
pub fn build_report(snapshots: &[ClusterSnapshot], prices: &PriceBook) -> Report {
    let ec2 = ec2_sheet(snapshots, prices);
    let fargate = fargate_sheet(snapshots, prices);
    let comparison = comparison_sheet(snapshots, ec2.last_row_number(), fargate.last_row_number());

    let charts = if ec2.data_rows().is_empty() {
        Vec::new()
    } else {
        let last = ec2.last_row_number();
        vec![
            usage_chart(CPU_CHART_SHEET, "CPU Usage", "CPU Units", ['F', 'G'], last),
            usage_chart(MEMORY_CHART_SHEET, "Memory Usage", "MB", ['I', 'J'], last),
        ]
    };

    Report {
        sheets: vec![ec2, fargate, comparison],
        charts,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HostingModel {
    Ec2,
    Fargate,
}

impl std::fmt::Display for HostingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostingModel::Ec2 => f.write_str("EC2"),
            HostingModel::Fargate => f.write_str("Fargate"),
        }
    }
}

/// What the Comparison sheet works out for one cluster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterCost {
    pub cluster: String,
    pub ec2_hourly: Option<f64>,
    pub fargate_hourly: Option<f64>,
    /// `None` when either side could not be priced
    pub cheaper: Option<HostingModel>,
}

/// Compute the comparison outside the spreadsheet, for terminal output
///
/// Unlike Excel, which treats blank cells as zero, a cost that depends on a
/// missing price or an unfittable service is reported as unknown.
pub fn cost_summary(snapshots: &[ClusterSnapshot], prices: &PriceBook) -> Vec<ClusterCost> {
    snapshots
        .iter()
        .filter_map(|snapshot| {
            let usage = snapshot.usage.as_ref()?;
            let ec2_hourly = prices
                .instance(&usage.instance_type)
                .map(|price| price * usage.instance_count as f64);

            let fargate_hourly = snapshot.services.iter().try_fold(0.0, |acc, service| {
                let size = service.size?;
                let per_task = size.vcpu * prices.fargate_vcpu_hourly?
                    + size.memory_gb * prices.fargate_gb_hourly?;
                Some(acc + per_task * service.running_task_count as f64)
            });

            let cheaper = match (fargate_hourly, ec2_hourly) {
                (Some(f), Some(e)) if f < e => Some(HostingModel::Fargate),
                (Some(_), Some(_)) => Some(HostingModel::Ec2),
                _ => None,
            };

            Some(ClusterCost {
                cluster: snapshot.name.clone(),
                ec2_hourly,
                fargate_hourly,
                cheaper,
            })
        })
        .collect()
}
