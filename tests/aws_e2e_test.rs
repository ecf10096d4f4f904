//! End-to-end tests against a real AWS account
//!
//! These tests require AWS credentials and read (never modify) ECS and the
//! Price List API.
//! Run with: FARGATE_COMPARE_E2E=1 cargo test --test aws_e2e_test --features e2e -- --ignored

#![cfg(feature = "e2e")]

use fargate_compare::aws::{self, AwsPricingCatalog, EcsDirectory};
use fargate_compare::compare::run_comparison;
use fargate_compare::config::{CliOverrides, Config, Environment, RunSettings};
use fargate_compare::gather::ClusterDirectory;
use fargate_compare::pricing::{Discounts, PriceCache, PriceKey, PriceKind};
use fargate_compare::region::Region;
use std::env;
use tempfile::TempDir;

/// Check if E2E tests should run (require explicit opt-in)
fn should_run_e2e() -> bool {
    env::var("FARGATE_COMPARE_E2E").is_ok()
}

fn region() -> Region {
    env::var("AWS_REGION")
        .ok()
        .and_then(|r| r.parse().ok())
        .unwrap_or(Region::UsEast1)
}

#[tokio::test]
#[ignore] // Requires AWS credentials and explicit opt-in
async fn test_price_list_has_fargate_and_m5_prices() {
    if !should_run_e2e() {
        eprintln!("Skipping E2E test. Set FARGATE_COMPARE_E2E=1 to run");
        return;
    }

    let sdk_config = aws::load_sdk_config(Region::UsEast1).await;
    let mut cache = PriceCache::new(AwsPricingCatalog::new(&sdk_config), Discounts::default());

    for kind in [
        PriceKind::Instance("m5.large".to_string()),
        PriceKind::FargateVcpu,
        PriceKind::FargateMemory,
    ] {
        let price = cache
            .price_for(&PriceKey::new(kind.clone(), Region::UsEast1))
            .await
            .expect("Price list request failed");
        let price = price.unwrap_or_else(|| panic!("No price for {:?}", kind));
        assert!(price > 0.0 && price < 10.0, "{:?} priced at {}", kind, price);
    }
}

#[tokio::test]
#[ignore] // Requires AWS credentials and explicit opt-in
async fn test_compare_live_account() {
    if !should_run_e2e() {
        eprintln!("Skipping E2E test. Set FARGATE_COMPARE_E2E=1 to run");
        return;
    }

    let region = region();
    let sdk_config = aws::load_sdk_config(region).await;
    aws::verify_credentials(&sdk_config)
        .await
        .expect("AWS credentials required");

    let directory = EcsDirectory::new(&sdk_config);
    let cluster_count = directory
        .list_clusters()
        .await
        .expect("Failed to list ECS clusters")
        .len();

    let temp_dir = TempDir::new().unwrap();
    let cli = CliOverrides {
        filename: Some(temp_dir.path().join("live").to_string_lossy().into_owned()),
        region: Some(region.code().to_string()),
        ..Default::default()
    };
    let settings = RunSettings::resolve(cli, &Config::default(), &Environment::default()).unwrap();

    let comparison = run_comparison(
        &directory,
        AwsPricingCatalog::new(&sdk_config),
        &settings,
        None,
    )
    .await
    .expect("Comparison failed");

    assert_eq!(comparison.clusters.len(), cluster_count);
    assert!(settings.output.exists());
}
