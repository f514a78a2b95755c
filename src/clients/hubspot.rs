use crate::clients::types::*;
use crate::clients::REQUEST_TIMEOUT;
use crate::error::{ReportError, Result};
use crate::schema::{DealFilter, PageRequest, RawDeal, StageFilter};
use crate::traits::DealSource;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;

const HUBSPOT_BASE_URL: &str = "https://api.hubapi.com";
const SOURCE_NAME: &str = "hubspot";

/// HubSpot CRM v3 deal search.
#[derive(Clone)]
pub struct HubSpotClient {
    client: Client,
    access_token: String,
    base_url: String,
    properties: Vec<String>,
}

impl HubSpotClient {
    pub fn new(access_token: String, properties: Vec<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            access_token,
            base_url: HUBSPOT_BASE_URL.to_string(),
            properties,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub(crate) fn search_request(&self, filter: &DealFilter, page: PageRequest) -> DealSearchRequest {
        let (limit, after) = match page {
            PageRequest::Limit(n) => (n, None),
            PageRequest::After { offset, limit } => (limit, Some(offset.to_string())),
        };

        DealSearchRequest {
            limit,
            after,
            properties: self.properties.clone(),
            filter_groups: vec![FilterGroup {
                filters: build_filters(filter),
            }],
        }
    }
}

fn build_filters(filter: &DealFilter) -> Vec<SearchFilter> {
    let mut filters = Vec::new();

    if let Some(pipeline) = &filter.pipeline {
        filters.push(SearchFilter {
            property_name: "pipeline".to_string(),
            operator: "EQ",
            value: Some(pipeline.clone()),
            high_value: None,
            values: None,
        });
    }

    if let Some((start, end)) = filter.close_date {
        filters.push(SearchFilter {
            property_name: "closedate".to_string(),
            operator: "BETWEEN",
            value: Some(start.format("%Y-%m-%d").to_string()),
            high_value: Some(end.format("%Y-%m-%d").to_string()),
            values: None,
        });
    }

    let (operator, stages) = match &filter.stages {
        StageFilter::In(stages) => ("IN", stages),
        StageFilter::NotIn(stages) => ("NOT_IN", stages),
    };
    // An empty NOT_IN excludes nothing; HubSpot rejects it, so leave it out
    if !stages.is_empty() || operator == "IN" {
        filters.push(SearchFilter {
            property_name: "dealstage".to_string(),
            operator,
            value: None,
            high_value: None,
            values: Some(stages.clone()),
        });
    }

    filters
}

#[async_trait]
impl DealSource for HubSpotClient {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn search(&self, filter: &DealFilter, page: PageRequest) -> Result<Vec<RawDeal>> {
        let url = format!("{}/crm/v3/objects/deals/search", self.base_url);
        let payload = self.search_request(filter, page);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            warn!("Request failed: {} {}", status, err_text);
            return Err(ReportError::transient(
                SOURCE_NAME,
                format!("status {}: {}", status, err_text),
            ));
        }

        let body: DealSearchResponse = res
            .json()
            .await
            .map_err(|e| ReportError::transient(SOURCE_NAME, format!("bad response body: {}", e)))?;

        debug!("{:?} returned {} deals", page, body.results.len());
        Ok(body.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ReportPeriod, StageCategory};
    use chrono::NaiveDate;

    fn client() -> HubSpotClient {
        HubSpotClient::new(
            "token".to_string(),
            vec!["net_revenue".to_string(), "amount".to_string()],
        )
    }

    #[test]
    fn test_period_search_body() {
        let period = ReportPeriod::new(
            "Q1",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );
        let category = StageCategory {
            name: "sales".to_string(),
            stages: vec!["123633772".to_string()],
        };
        let filter = DealFilter::for_period(&period, &category);

        let body =
            serde_json::to_value(client().search_request(&filter, PageRequest::Limit(100))).unwrap();
        assert_eq!(body["limit"], 100);
        assert!(body.get("after").is_none());

        let filters = body["filterGroups"][0]["filters"].as_array().unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0]["propertyName"], "closedate");
        assert_eq!(filters[0]["operator"], "BETWEEN");
        assert_eq!(filters[0]["value"], "2024-01-01");
        assert_eq!(filters[0]["highValue"], "2024-03-31");
        assert_eq!(filters[1]["operator"], "IN");
        assert_eq!(filters[1]["values"][0], "123633772");
    }

    #[test]
    fn test_pipeline_search_body() {
        let filter = DealFilter {
            close_date: None,
            stages: StageFilter::NotIn(vec!["closedlost".to_string()]),
            pipeline: Some("af6b8780".to_string()),
        };
        let page = PageRequest::After {
            offset: 200,
            limit: 100,
        };
        let body = serde_json::to_value(client().search_request(&filter, page)).unwrap();
        assert_eq!(body["limit"], 100);
        assert_eq!(body["after"], "200");

        let filters = body["filterGroups"][0]["filters"].as_array().unwrap();
        assert_eq!(filters[0]["propertyName"], "pipeline");
        assert_eq!(filters[0]["operator"], "EQ");
        assert_eq!(filters[1]["operator"], "NOT_IN");
    }

    #[test]
    fn test_empty_exclusion_is_dropped() {
        let filter = DealFilter {
            close_date: None,
            stages: StageFilter::NotIn(vec![]),
            pipeline: Some("af6b8780".to_string()),
        };
        assert_eq!(build_filters(&filter).len(), 1);
    }
}
