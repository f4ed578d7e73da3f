//! Best-effort carrier ("operator") lookup over HTTP

use crate::logging::Logger;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;

/// Connect and overall timeout for a lookup request
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches a short description of the network operator
#[async_trait]
pub trait OperatorLookup: Send + Sync {
    /// Body of a successful response, `None` on any failure
    async fn lookup(&self) -> Option<String>;
}

/// GET against a configured URL; only an HTTP 200 body counts
pub struct HttpOperatorLookup {
    url: String,
    client: Option<Client>,
    logger: Logger,
}

impl HttpOperatorLookup {
    pub fn new(url: impl Into<String>, logger: Logger) -> Self {
        let client = Client::builder()
            .connect_timeout(LOOKUP_TIMEOUT)
            .timeout(LOOKUP_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build();

        let client = match client {
            Ok(client) => Some(client),
            Err(e) => {
                logger
                    .debug("Operator lookup client unavailable")
                    .field("error", e.to_string())
                    .log();
                None
            }
        };

        Self {
            url: url.into(),
            client,
            logger,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn skip(&self, reason: &str, detail: String) -> Option<String> {
        self.logger
            .debug(reason)
            .field("url", &self.url)
            .field("detail", detail)
            .log();
        None
    }
}

#[async_trait]
impl OperatorLookup for HttpOperatorLookup {
    async fn lookup(&self) -> Option<String> {
        let client = self.client.as_ref()?;

        let url = match Url::parse(&self.url) {
            Ok(url) => url,
            Err(e) => return self.skip("Operator URL is malformed", e.to_string()),
        };

        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return self.skip("Operator lookup failed", e.to_string()),
        };

        let status = response.status();
        if status != StatusCode::OK {
            // dropping the response releases the connection
            drop(response);
            return self.skip("Operator lookup returned non-OK status", status.to_string());
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => self.skip("Operator response body unreadable", e.to_string()),
        }
    }
}
