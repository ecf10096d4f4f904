//! The `compare` command
//!
//! Gathers every cluster, prices what was found, then writes the workbook.
//! `run_comparison` takes the directory and catalog as traits so the whole
//! pipeline can be driven without AWS.

use crate::aws::{self, AwsPricingCatalog, EcsDirectory};
use crate::config::RunSettings;
use crate::error::Result;
use crate::gather::{self, ClusterDirectory, ClusterSnapshot};
use crate::pricing::{PriceBook, PriceCache, PriceKey, PriceKind, PricingCatalog};
use crate::region::Region;
use crate::report::{self, ClusterCost};
use crate::xlsx;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub region: Region,
    pub output: PathBuf,
    pub clusters: Vec<ClusterSnapshot>,
    pub prices: PriceBook,
    pub costs: Vec<ClusterCost>,
}

/// Look up every price the report needs
///
/// Instance prices are fetched for clusters that have container instances,
/// Fargate rates only when at least one service is running somewhere.
pub async fn collect_prices<C: PricingCatalog>(
    snapshots: &[ClusterSnapshot],
    region: Region,
    cache: &mut PriceCache<C>,
) -> Result<PriceBook> {
    let mut book = PriceBook::default();

    for usage in snapshots.iter().filter_map(|s| s.usage.as_ref()) {
        if book.instance_hourly.contains_key(&usage.instance_type) {
            continue;
        }
        let key = PriceKey::new(PriceKind::Instance(usage.instance_type.clone()), region);
        let price = cache.price_for(&key).await?;
        book.instance_hourly.insert(usage.instance_type.clone(), price);
    }

    if snapshots.iter().any(|s| !s.services.is_empty()) {
        book.fargate_vcpu_hourly = cache
            .price_for(&PriceKey::new(PriceKind::FargateVcpu, region))
            .await?;
        book.fargate_gb_hourly = cache
            .price_for(&PriceKey::new(PriceKind::FargateMemory, region))
            .await?;
    }

    Ok(book)
}

/// Run the full pipeline against the given directory and catalog
pub async fn run_comparison<D, C>(
    directory: &D,
    catalog: C,
    settings: &RunSettings,
    progress: Option<&ProgressBar>,
) -> Result<Comparison>
where
    D: ClusterDirectory + ?Sized,
    C: PricingCatalog,
{
    let clusters = gather::gather_all(directory, settings.fudge_factor, progress).await?;

    if let Some(pb) = progress {
        pb.set_message("Looking up prices...");
    }
    let mut cache = PriceCache::new(catalog, settings.discounts);
    let prices = collect_prices(&clusters, settings.region, &mut cache).await?;
    info!("Resolved {} distinct prices", cache.len());

    if let Some(pb) = progress {
        pb.set_message(format!("Writing {}", settings.output.display()));
    }
    let workbook = report::build_report(&clusters, &prices);
    xlsx::write_report(&workbook, &settings.output)?;

    let costs = report::cost_summary(&clusters, &prices);
    Ok(Comparison {
        region: settings.region,
        output: settings.output.clone(),
        clusters,
        prices,
        costs,
    })
}

/// Compare against live AWS in `settings.region`
pub async fn compare(settings: &RunSettings, output_format: &str) -> Result<Comparison> {
    let sdk_config = aws::load_sdk_config(settings.region).await;
    let account = aws::verify_credentials(&sdk_config).await?;
    info!("Using account {} in {}", account, settings.region);

    let directory = EcsDirectory::new(&sdk_config);
    let catalog = AwsPricingCatalog::new(&sdk_config);

    let pb = if output_format != "json" {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Progress bar template should be valid"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb.set_message("Listing ECS clusters...");
        Some(pb)
    } else {
        None
    };

    let result = run_comparison(&directory, catalog, settings, pb.as_ref()).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    result
}
