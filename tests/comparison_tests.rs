//! End-to-end comparison runs against mocked ECS and Price List collaborators
//!
//! Drives `run_comparison` the way the CLI does, but with `mockall` standing
//! in for AWS and a temp dir for the workbook.

use async_trait::async_trait;
use fargate_compare::compare::run_comparison;
use fargate_compare::config::{CliOverrides, Config, Environment, RunSettings};
use fargate_compare::error::{CompareError, Result};
use fargate_compare::gather::{ClusterDirectory, ServiceDescription};
use fargate_compare::pricing::{PricingCatalog, TermFilter};
use fargate_compare::report::{
    build_report, Cell, HostingModel, COMPARISON_SHEET, EC2_SHEET, FARGATE_SHEET,
};
use fargate_compare::sizing::SizeTier;
use fargate_compare::usage::{ContainerReservation, InstanceInfo};
use mockall::mock;
use mockall::predicate::eq;
use tempfile::TempDir;

mock! {
    pub Directory {}

    #[async_trait]
    impl ClusterDirectory for Directory {
        async fn list_clusters(&self) -> Result<Vec<String>>;
        async fn container_instances(&self, cluster: &str) -> Result<Vec<InstanceInfo>>;
        async fn replica_services(&self, cluster: &str) -> Result<Vec<String>>;
        async fn describe_services(
            &self,
            cluster: &str,
            services: &[String],
        ) -> Result<Vec<ServiceDescription>>;
        async fn task_containers(&self, task_definition: &str) -> Result<Vec<ContainerReservation>>;
    }
}

mock! {
    pub Catalog {}

    #[async_trait]
    impl PricingCatalog for Catalog {
        async fn get_products(&self, service_code: &str, filters: &[TermFilter]) -> Result<Vec<String>>;
    }
}

const DEMO_CLUSTER: &str = "arn:aws:ecs:us-east-1:123456789012:cluster/demo";
const DEMO_SERVICE: &str = "arn:aws:ecs:us-east-1:123456789012:service/demo/web";
const DEMO_TASK: &str = "arn:aws:ecs:us-east-1:123456789012:task-definition/web:7";

fn price_document(usage_type: &str, usd: &str) -> String {
    serde_json::json!({
        "product": { "attributes": { "usagetype": usage_type } },
        "terms": { "OnDemand": { "T": { "priceDimensions": {
            "T.R": { "pricePerUnit": { "USD": usd } }
        } } } }
    })
    .to_string()
}

fn has_filter(filters: &[TermFilter], field: &str, value: &str) -> bool {
    filters.contains(&TermFilter::new(field, value))
}

fn demo_instance() -> InstanceInfo {
    InstanceInfo {
        instance_type: Some("m5.xlarge".to_string()),
        remaining_cpu: 2048,
        total_cpu: 4096,
        remaining_memory: 4096,
        total_memory: 8192,
    }
}

/// One cluster, two m5.xlarge instances, one service running 3 tasks of 512 CPU / 1024 MB
fn demo_directory() -> MockDirectory {
    let mut directory = MockDirectory::new();
    directory
        .expect_list_clusters()
        .returning(|| Ok(vec![DEMO_CLUSTER.to_string()]));
    directory
        .expect_container_instances()
        .with(eq(DEMO_CLUSTER))
        .returning(|_| Ok(vec![demo_instance(), demo_instance()]));
    directory
        .expect_replica_services()
        .returning(|_| Ok(vec![DEMO_SERVICE.to_string()]));
    directory.expect_describe_services().returning(|_, _| {
        Ok(vec![ServiceDescription {
            arn: DEMO_SERVICE.to_string(),
            task_definition: Some(DEMO_TASK.to_string()),
            running_count: 3,
        }])
    });
    directory
        .expect_task_containers()
        .with(eq(DEMO_TASK))
        .times(1)
        .returning(|_| {
            Ok(vec![ContainerReservation {
                cpu: Some(512),
                memory: Some(1024),
                memory_reservation: None,
            }])
        });
    directory
}

fn demo_catalog(instance_usd: &'static str) -> MockCatalog {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_get_products()
        .withf(|code, filters| code == "AmazonEC2" && has_filter(filters, "instanceType", "m5.xlarge"))
        .times(1)
        .returning(move |_, _| {
            Ok(vec![
                price_document("Reservation:m5.xlarge", "0.0"),
                price_document("UnusedBox:m5.xlarge", instance_usd),
            ])
        });
    catalog
        .expect_get_products()
        .withf(|code, filters| code == "AmazonECS" && has_filter(filters, "cputype", "perCPU"))
        .times(1)
        .returning(|_, _| Ok(vec![price_document("USE1-Fargate-vCPU-Hours:perCPU", "0.04")]));
    catalog
        .expect_get_products()
        .withf(|code, filters| code == "AmazonECS" && has_filter(filters, "memorytype", "perGB"))
        .times(1)
        .returning(|_, _| Ok(vec![price_document("USE1-Fargate-GB-Hours", "0.005")]));
    catalog
}

fn settings(dir: &TempDir, aws_discount: f64, fargate_discount: f64) -> RunSettings {
    let cli = CliOverrides {
        filename: Some(dir.path().join("demo").to_string_lossy().into_owned()),
        region: Some("us-east-1".to_string()),
        cpu_fudge: Some(0.0),
        aws_discount: Some(aws_discount),
        fargate_discount: Some(fargate_discount),
    };
    RunSettings::resolve(cli, &Config::default(), &Environment::default()).unwrap()
}

#[tokio::test]
async fn test_demo_cluster_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(&temp_dir, 0.0, 0.0);

    let comparison = run_comparison(&demo_directory(), demo_catalog("0.192"), &settings, None)
        .await
        .unwrap();

    assert_eq!(settings.output, temp_dir.path().join("demo.xlsx"));
    assert!(settings.output.exists());

    assert_eq!(comparison.clusters.len(), 1);
    let cluster = &comparison.clusters[0];
    assert_eq!(cluster.name, "demo");

    let usage = cluster.usage.as_ref().unwrap();
    assert_eq!(usage.instance_count, 2);
    assert_eq!(usage.total_cpu, 8192);
    assert_eq!(usage.used_cpu(), 4096);
    assert_eq!(usage.total_memory, 16384);
    assert_eq!(usage.used_memory(), 8192);

    let service = &cluster.services[0];
    assert_eq!(service.name, "web");
    assert_eq!(service.requested_cpu_units, 512);
    assert_eq!(service.requested_memory_mb, 1024);
    assert_eq!(
        service.size,
        Some(SizeTier {
            vcpu: 1.0,
            memory_gb: 2.0
        })
    );

    let cost = &comparison.costs[0];
    // 2 x 0.192
    assert!((cost.ec2_hourly.unwrap() - 0.384).abs() < 1e-9);
    // 3 x (1 x 0.04 + 2 x 0.005)
    assert!((cost.fargate_hourly.unwrap() - 0.15).abs() < 1e-9);
    assert_eq!(cost.cheaper, Some(HostingModel::Fargate));
}

#[tokio::test]
async fn test_discounts_apply_to_prices() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(&temp_dir, 25.0, 50.0);

    let comparison = run_comparison(&demo_directory(), demo_catalog("0.2"), &settings, None)
        .await
        .unwrap();

    assert!((comparison.prices.instance("m5.xlarge").unwrap() - 0.15).abs() < 1e-9);
    assert!((comparison.prices.fargate_vcpu_hourly.unwrap() - 0.02).abs() < 1e-9);
    assert!((comparison.prices.fargate_gb_hourly.unwrap() - 0.0025).abs() < 1e-9);
}

#[tokio::test]
async fn test_unpriced_instance_leaves_blank_cell() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(&temp_dir, 0.0, 0.0);

    let mut catalog = MockCatalog::new();
    catalog
        .expect_get_products()
        .withf(|code, _| code == "AmazonEC2")
        .returning(|_, _| Ok(Vec::new()));
    catalog
        .expect_get_products()
        .withf(|code, _| code == "AmazonECS")
        .returning(|_, _| Ok(vec![price_document("Fargate", "0.04")]));

    let comparison = run_comparison(&demo_directory(), catalog, &settings, None)
        .await
        .unwrap();

    assert_eq!(comparison.prices.instance("m5.xlarge"), None);
    assert_eq!(comparison.costs[0].ec2_hourly, None);
    assert_eq!(comparison.costs[0].cheaper, None);

    let report = build_report(&comparison.clusters, &comparison.prices);
    let ec2 = report.sheet(EC2_SHEET).unwrap();
    assert_eq!(ec2.data_rows()[0][3], Cell::Blank);
    assert_eq!(ec2.data_rows()[0][4], Cell::Formula("=C2*D2".to_string()));
    assert!(settings.output.exists());
}

#[tokio::test]
async fn test_empty_account_writes_header_only_workbook() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(&temp_dir, 0.0, 0.0);

    let mut directory = MockDirectory::new();
    directory.expect_list_clusters().returning(|| Ok(Vec::new()));
    let mut catalog = MockCatalog::new();
    catalog.expect_get_products().times(0);

    let comparison = run_comparison(&directory, catalog, &settings, None)
        .await
        .unwrap();

    assert!(comparison.clusters.is_empty());
    assert!(comparison.costs.is_empty());
    assert!(settings.output.exists());

    let report = build_report(&comparison.clusters, &comparison.prices);
    for name in [EC2_SHEET, FARGATE_SHEET, COMPARISON_SHEET] {
        assert!(report.sheet(name).unwrap().data_rows().is_empty());
    }
    assert!(report.charts.is_empty());
}

#[tokio::test]
async fn test_idle_and_definitionless_services_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(&temp_dir, 0.0, 0.0);

    let mut directory = MockDirectory::new();
    directory
        .expect_list_clusters()
        .returning(|| Ok(vec![DEMO_CLUSTER.to_string()]));
    directory
        .expect_container_instances()
        .returning(|_| Ok(Vec::new()));
    directory
        .expect_replica_services()
        .returning(|_| Ok(vec!["svc/idle".to_string(), "svc/orphan".to_string()]));
    directory.expect_describe_services().returning(|_, _| {
        Ok(vec![
            ServiceDescription {
                arn: "svc/idle".to_string(),
                task_definition: Some(DEMO_TASK.to_string()),
                running_count: 0,
            },
            ServiceDescription {
                arn: "svc/orphan".to_string(),
                task_definition: None,
                running_count: 2,
            },
        ])
    });
    directory.expect_task_containers().times(0);

    let mut catalog = MockCatalog::new();
    catalog.expect_get_products().times(0);

    let comparison = run_comparison(&directory, catalog, &settings, None)
        .await
        .unwrap();

    let cluster = &comparison.clusters[0];
    assert!(cluster.usage.is_none());
    assert!(cluster.services.is_empty());
}

#[tokio::test]
async fn test_directory_failure_aborts_without_output() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings(&temp_dir, 0.0, 0.0);

    let mut directory = MockDirectory::new();
    directory
        .expect_list_clusters()
        .returning(|| Err(CompareError::Aws("AccessDenied".to_string())));
    let catalog = MockCatalog::new();

    let err = run_comparison(&directory, catalog, &settings, None)
        .await
        .unwrap_err();

    assert!(matches!(err, CompareError::Aws(_)));
    assert!(!settings.output.exists());
}
