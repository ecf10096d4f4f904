//! Terminal output after a run

use crate::compare::Comparison;
use crate::error::Result;
use crate::report::{ClusterCost, HostingModel};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, Table};
use console::style;
use serde::Serialize;

fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("${:.2}", v))
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn cost_table(costs: &[ClusterCost]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Cluster", "EC2 $/hr", "Fargate $/hr", "Cheaper"]);

    for cost in costs {
        let cheaper = match cost.cheaper {
            Some(HostingModel::Fargate) => Cell::new("Fargate").fg(Color::Green),
            Some(HostingModel::Ec2) => Cell::new("EC2").fg(Color::Yellow),
            None => Cell::new("unknown"),
        };
        table.add_row(vec![
            Cell::new(&cost.cluster),
            Cell::new(money(cost.ec2_hourly)),
            Cell::new(money(cost.fargate_hourly)),
            cheaper,
        ]);
    }
    table
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    comparison: &'a Comparison,
}

pub fn render_json(comparison: &Comparison, generated_at: DateTime<Utc>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonSummary {
        generated_at,
        comparison,
    })?)
}

pub fn print_summary(comparison: &Comparison, output_format: &str) -> Result<()> {
    if output_format == "json" {
        println!("{}", render_json(comparison, Utc::now())?);
        return Ok(());
    }

    println!(
        "{} {}",
        style("Wrote").green().bold(),
        comparison.output.display()
    );
    if comparison.costs.is_empty() {
        println!("No clusters with container instances in {}", comparison.region);
        return Ok(());
    }
    println!("{}", cost_table(&comparison.costs));

    let unfitted: usize = comparison
        .clusters
        .iter()
        .flat_map(|c| &c.services)
        .filter(|s| s.size.is_none())
        .count();
    if unfitted > 0 {
        println!(
            "{} {} service(s) too large for any Fargate size were left out of the Fargate totals",
            style("Note:").yellow(),
            unfitted
        );
    }
    Ok(())
}
