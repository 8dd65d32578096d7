use anyhow::{anyhow, Error};
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use slog::{debug, Logger};
use std::time::Duration;

use crate::Observation;

/// One page of the paginated super-observations endpoint.
#[derive(Debug, Deserialize)]
pub struct ObservationsPage {
    pub observations: Vec<Observation>,
    pub has_next_page: bool,
    #[serde(default)]
    pub next_page: Option<String>,
}

pub struct JsonFetcher {
    logger: Logger,
    client_id: String,
    api_key: String,
}

impl JsonFetcher {
    pub fn new(logger: Logger, client_id: String, api_key: String) -> JsonFetcher {
        Self {
            logger,
            client_id,
            api_key,
        }
    }

    /// Performs one authenticated GET for a page of observations. A
    /// non-success status is an error; retry on transient failures is
    /// handled by the middleware, not by the caller.
    pub async fn fetch_page(&self, url: &str) -> Result<ObservationsPage, Error> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = ClientBuilder::new(Client::builder().build()?)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        debug!(self.logger, "requesting: {}", url);
        let response = client
            .get(url)
            .basic_auth(&self.client_id, Some(&self.api_key))
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .map_err(|e| anyhow!("error sending request: {}", e))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "error response from upstream: {}",
                response.status()
            ));
        }

        response
            .json::<ObservationsPage>()
            .await
            .map_err(|e| anyhow!("error parsing body of request: {}", e))
    }
}

/// Continuation urls returned by the api drop the query parameters this run
/// depends on, so the time-range filter has to be re-appended to every page
/// after the first.
pub fn with_time_range(url: &str, starttime: i64, endtime: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}min_time={}&max_time={}&include_mission_name=true",
        url, separator, starttime, endtime
    )
}
