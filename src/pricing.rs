//! On-demand price lookup and per-run price cache
//!
//! Prices come from the AWS Price List API, which answers with one JSON
//! document per matching product. The interesting part of each document is
//!
//! ```text
//! { "product": { "attributes": { "usagetype": "...", ... } },
//!   "terms": { "OnDemand": { "<offer>": { "priceDimensions": {
//!       "<rate>": { "pricePerUnit": { "USD": "0.1920000000" } } } } } } }
//! ```
//!
//! `PriceCache` asks the catalog at most once per key for the lifetime of
//! the run, discount already applied. A key the catalog has no entry for is
//! cached as unpriced (`None`) and rendered as a blank cell.

use crate::error::{CompareError, Result};
use crate::region::Region;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

pub const EC2_SERVICE_CODE: &str = "AmazonEC2";
pub const ECS_SERVICE_CODE: &str = "AmazonECS";

/// A TERM_MATCH filter on a product attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFilter {
    pub field: String,
    pub value: String,
}

impl TermFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Source of raw price-list documents
#[async_trait]
pub trait PricingCatalog: Send + Sync {
    /// Every price-list document matching all `filters`, across all pages
    async fn get_products(&self, service_code: &str, filters: &[TermFilter])
        -> Result<Vec<String>>;
}

/// What is being priced
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriceKind {
    /// Hourly price of an EC2 instance type (Linux, no pre-installed software)
    Instance(String),
    /// Fargate price per vCPU-hour
    FargateVcpu,
    /// Fargate price per GB-hour
    FargateMemory,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub kind: PriceKind,
    pub region: Region,
}

impl PriceKey {
    pub fn new(kind: PriceKind, region: Region) -> Self {
        Self { kind, region }
    }

    fn service_code(&self) -> &'static str {
        match self.kind {
            PriceKind::Instance(_) => EC2_SERVICE_CODE,
            PriceKind::FargateVcpu | PriceKind::FargateMemory => ECS_SERVICE_CODE,
        }
    }

    fn filters(&self) -> Vec<TermFilter> {
        let location = TermFilter::new("location", self.region.display_name());
        match &self.kind {
            PriceKind::Instance(instance_type) => vec![
                TermFilter::new("instanceType", instance_type.as_str()),
                TermFilter::new("operatingSystem", "Linux"),
                location,
                TermFilter::new("preInstalledSw", "NA"),
            ],
            PriceKind::FargateVcpu => vec![
                TermFilter::new("cputype", "perCPU"),
                TermFilter::new("tenancy", "Shared"),
                location,
            ],
            PriceKind::FargateMemory => vec![
                TermFilter::new("memorytype", "perGB"),
                TermFilter::new("tenancy", "Shared"),
                location,
            ],
        }
    }
}

/// Discount fractions (0.23 = 23% off list price)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Discounts {
    pub ec2: f64,
    pub fargate: f64,
}

impl Discounts {
    fn for_kind(&self, kind: &PriceKind) -> f64 {
        match kind {
            PriceKind::Instance(_) => self.ec2,
            PriceKind::FargateVcpu | PriceKind::FargateMemory => self.fargate,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PriceListEntry {
    #[serde(default)]
    product: Product,
    #[serde(default)]
    terms: Terms,
}

#[derive(Debug, Default, Deserialize)]
struct Product {
    #[serde(default)]
    attributes: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct Terms {
    #[serde(rename = "OnDemand", default)]
    on_demand: BTreeMap<String, OfferTerm>,
}

#[derive(Debug, Default, Deserialize)]
struct OfferTerm {
    #[serde(rename = "priceDimensions", default)]
    price_dimensions: BTreeMap<String, PriceDimension>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceDimension {
    #[serde(rename = "pricePerUnit", default)]
    price_per_unit: HashMap<String, String>,
}

impl PriceListEntry {
    fn parse(document: &str) -> Result<Self> {
        serde_json::from_str(document)
            .map_err(|e| CompareError::PriceList(format!("Malformed price list entry: {}", e)))
    }

    fn usage_type(&self) -> Option<&str> {
        self.product.attributes.get("usagetype").map(String::as_str)
    }

    /// USD price of the sole on-demand term's sole dimension
    fn on_demand_usd(&self) -> Option<f64> {
        let term = self.terms.on_demand.values().next()?;
        let dimension = term.price_dimensions.values().next()?;
        let usd = dimension.price_per_unit.get("USD")?;
        match usd.trim().parse::<f64>() {
            Ok(price) if price >= 0.0 => Some(price),
            _ => {
                warn!("Ignoring unparseable USD price {:?}", usd);
                None
            }
        }
    }
}

/// Pick the list price for `kind` out of the catalog's answer
///
/// EC2 answers contain one entry per capacity-reservation usage type; the
/// plain on-demand box is the one whose usage type ends in
/// `UnusedBox:<instance type>`. Fargate answers are used as-is.
fn select_list_price(kind: &PriceKind, documents: &[String]) -> Result<Option<f64>> {
    match kind {
        PriceKind::Instance(instance_type) => {
            let suffix = format!("UnusedBox:{}", instance_type);
            for document in documents {
                let entry = PriceListEntry::parse(document)?;
                if entry
                    .usage_type()
                    .map(|u| u.ends_with(&suffix))
                    .unwrap_or(false)
                {
                    if let Some(price) = entry.on_demand_usd() {
                        return Ok(Some(price));
                    }
                }
            }
            Ok(None)
        }
        PriceKind::FargateVcpu | PriceKind::FargateMemory => match documents.first() {
            Some(document) => Ok(PriceListEntry::parse(document)?.on_demand_usd()),
            None => Ok(None),
        },
    }
}

/// Memoizing front for a `PricingCatalog`
pub struct PriceCache<C> {
    catalog: C,
    discounts: Discounts,
    entries: HashMap<PriceKey, Option<f64>>,
}

impl<C: PricingCatalog> PriceCache<C> {
    pub fn new(catalog: C, discounts: Discounts) -> Self {
        Self {
            catalog,
            discounts,
            entries: HashMap::new(),
        }
    }

    /// Discounted hourly price for `key`, or `None` if the catalog has none
    ///
    /// Only the first call for a key reaches the catalog.
    pub async fn price_for(&mut self, key: &PriceKey) -> Result<Option<f64>> {
        if let Some(cached) = self.entries.get(key) {
            debug!("Price cache hit for {:?}", key);
            return Ok(*cached);
        }

        let documents = self
            .catalog
            .get_products(key.service_code(), &key.filters())
            .await?;
        let discount = self.discounts.for_kind(&key.kind);
        let price = select_list_price(&key.kind, &documents)?.map(|list| list * (1.0 - discount));

        match price {
            Some(p) => info!("Priced {:?} in {} at ${:.4}/hr", key.kind, key.region, p),
            None => warn!("No on-demand price for {:?} in {}", key.kind, key.region),
        }
        self.entries.insert(key.clone(), price);
        Ok(price)
    }

    /// Number of keys looked up so far
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Prices needed to fill in the report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceBook {
    pub instance_hourly: BTreeMap<String, Option<f64>>,
    pub fargate_vcpu_hourly: Option<f64>,
    pub fargate_gb_hourly: Option<f64>,
}

impl PriceBook {
    pub fn instance(&self, instance_type: &str) -> Option<f64> {
        self.instance_hourly.get(instance_type).copied().flatten()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub Catalog {}
        #[async_trait]
        impl PricingCatalog for Catalog {
            async fn get_products(&self, service_code: &str, filters: &[TermFilter]) -> Result<Vec<String>>;
        }
    }
}
