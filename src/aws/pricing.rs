//! Price List-backed `PricingCatalog`

use super::sdk_error;
use crate::error::{CompareError, Result};
use crate::pricing::{PricingCatalog, TermFilter};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_pricing::types::{Filter, FilterType};
use aws_sdk_pricing::Client as PricingClient;
use tracing::debug;

/// The Price List API is only served from a few regions; us-east-1 has all of it
const PRICING_ENDPOINT_REGION: &str = "us-east-1";

pub struct AwsPricingCatalog {
    client: PricingClient,
}

impl AwsPricingCatalog {
    /// Build a client that reuses `sdk_config`'s credentials but talks to us-east-1
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let config = aws_sdk_pricing::config::Builder::from(sdk_config)
            .region(aws_sdk_pricing::config::Region::new(PRICING_ENDPOINT_REGION))
            .build();
        Self {
            client: PricingClient::from_conf(config),
        }
    }
}

fn to_sdk_filters(filters: &[TermFilter]) -> Result<Vec<Filter>> {
    filters
        .iter()
        .map(|f| {
            Filter::builder()
                .r#type(FilterType::TermMatch)
                .field(&f.field)
                .value(&f.value)
                .build()
                .map_err(|e| CompareError::Aws(format!("Invalid pricing filter {}: {}", f.field, e)))
        })
        .collect()
}

#[async_trait]
impl PricingCatalog for AwsPricingCatalog {
    async fn get_products(
        &self,
        service_code: &str,
        filters: &[TermFilter],
    ) -> Result<Vec<String>> {
        let sdk_filters = to_sdk_filters(filters)?;

        let price_list = ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                let mut pages = self
                    .client
                    .get_products()
                    .service_code(service_code)
                    .format_version("aws_v1")
                    .set_filters(Some(sdk_filters.clone()))
                    .into_paginator()
                    .send();

                let mut documents = Vec::new();
                while let Some(page) = pages.next().await {
                    let page = page.map_err(|e| {
                        sdk_error(
                            format!("Failed to get {} products from the price list", service_code),
                            e,
                        )
                    })?;
                    documents.extend(page.price_list().iter().cloned());
                }
                Ok(documents)
            })
            .await?;

        debug!(
            "Price list returned {} {} products for {:?}",
            price_list.len(),
            service_code,
            filters
        );
        Ok(price_list)
    }
}
