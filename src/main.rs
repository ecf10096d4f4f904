use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use fargate_compare::config::{self, CliOverrides, Config, Environment};
use fargate_compare::exit_codes::exit_code_for_anyhow;
use fargate_compare::{compare, sizing, summary, Region, RunSettings};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fargate-compare")]
#[command(
    about = "Compare ECS on EC2 costs against Fargate",
    long_about = "fargate-compare reads every ECS cluster in a region, works out what its EC2\ncontainer instances cost, sizes each running service to the nearest Fargate\ntask size, and writes the comparison to an Excel workbook.\n\nCredentials come from the standard AWS chain (AWS_PROFILE, env vars, SSO, ...)."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output workbook (default: <AWS_PROFILE>-ECS.xlsx)
    #[arg(short, long, global = true)]
    filename: Option<String>,

    /// AWS region (default: AWS_REGION, then AWS_DEFAULT_REGION)
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Percent of slack allowed on CPU when sizing services
    #[arg(short = 'c', long, global = true)]
    cpu_fudge: Option<f64>,

    /// Discount off EC2 list price, in percent
    #[arg(short = 'A', long, global = true)]
    aws_discount: Option<f64>,

    /// Discount off Fargate list price, in percent
    #[arg(short = 'F', long, global = true)]
    fargate_discount: Option<f64>,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    output: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the comparison workbook (default)
    Compare,
    /// List supported regions
    Regions,
    /// Show the Fargate size a task reservation normalizes to
    Size {
        /// Task CPU units (1024 = 1 vCPU)
        cpu_units: u64,
        /// Task memory in MB
        memory_mb: u64,
    },
    /// Write a starter configuration file
    Init {
        /// Where to write the config file
        #[arg(short, long, default_value = ".fargate-compare.toml")]
        path: PathBuf,
    },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            filename: self.filename.clone(),
            region: self.region.clone(),
            cpu_fudge: self.cpu_fudge,
            aws_discount: self.aws_discount,
            fargate_discount: self.fargate_discount,
        }
    }
}

fn print_regions(output_format: &str) -> Result<()> {
    if output_format == "json" {
        let regions: Vec<_> = Region::ALL
            .iter()
            .map(|r| serde_json::json!({ "code": r.code(), "name": r.display_name() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&regions)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Region", "Location"]);
    for region in Region::ALL {
        table.add_row(vec![region.code(), region.display_name()]);
    }
    println!("{}", table);
    Ok(())
}

fn print_size(cpu_units: u64, memory_mb: u64, fudge_percent: f64, output_format: &str) -> Result<()> {
    let fudge_percent = config::validate_percent("cpu_fudge", fudge_percent)?;
    let tier = sizing::normalize(
        cpu_units,
        memory_mb,
        sizing::fudge_factor_from_percent(fudge_percent),
    );

    if output_format == "json" {
        println!("{}", serde_json::to_string_pretty(&tier)?);
        return Ok(());
    }
    match tier {
        Some(t) => println!("{} vCPU, {} GB", t.vcpu, t.memory_gb),
        None => println!("No Fargate size fits {} CPU units / {} MB", cpu_units, memory_mb),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // Load config
    let file_config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Regions) => print_regions(&cli.output)?,
        Some(Commands::Size {
            cpu_units,
            memory_mb,
        }) => {
            let fudge = cli
                .cpu_fudge
                .or(file_config.cpu_fudge)
                .unwrap_or(config::DEFAULT_CPU_FUDGE_PERCENT);
            print_size(cpu_units, memory_mb, fudge, &cli.output)?;
        }
        Some(Commands::Init { ref path }) => {
            config::init_config(path)?;
        }
        Some(Commands::Compare) | None => {
            let settings =
                RunSettings::resolve(cli.overrides(), &file_config, &Environment::from_process())?;
            debug!("Resolved settings: {:?}", settings);

            let comparison = compare::compare(&settings, &cli.output)
                .await
                .with_context(|| format!("ECS comparison for {} failed", settings.region))?;
            summary::print_summary(&comparison, &cli.output)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Warnings only unless --verbose; RUST_LOG still wins when set
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code_for_anyhow(&e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_init_uses_default_path() {
        let cli = Cli::try_parse_from(["fargate-compare", "init"]).unwrap();
        match cli.command {
            Some(Commands::Init { path }) => {
                assert_eq!(path, PathBuf::from(".fargate-compare.toml"))
            }
            _ => panic!("expected init"),
        }
        assert_eq!(cli.output, "text");
    }

    #[test]
    fn test_init_path_and_output_format_are_independent() {
        let cli = Cli::try_parse_from([
            "fargate-compare",
            "init",
            "--path",
            "team.toml",
            "--output",
            "json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Init { path }) => assert_eq!(path, PathBuf::from("team.toml")),
            _ => panic!("expected init"),
        }
        assert_eq!(cli.output, "json");

        let cli = Cli::try_parse_from(["fargate-compare", "init", "-p", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Init { .. })));
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from(["fargate-compare", "regions", "--output", "json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Regions)));
        assert_eq!(cli.output, "json");

        let cli =
            Cli::try_parse_from(["fargate-compare", "size", "512", "1024", "-c", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Size {
                cpu_units: 512,
                memory_mb: 1024
            })
        ));
        assert_eq!(cli.cpu_fudge, Some(5.0));

        let cli = Cli::try_parse_from(["fargate-compare", "compare", "-A", "30"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Compare)));
        assert_eq!(cli.aws_discount, Some(30.0));
    }

    #[test]
    fn test_no_subcommand_runs_compare() {
        let cli =
            Cli::try_parse_from(["fargate-compare", "-r", "eu-west-1", "-f", "prod"]).unwrap();
        assert!(cli.command.is_none());
        let overrides = cli.overrides();
        assert_eq!(overrides.region.as_deref(), Some("eu-west-1"));
        assert_eq!(overrides.filename.as_deref(), Some("prod"));
    }
}
