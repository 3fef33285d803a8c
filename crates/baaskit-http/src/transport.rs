//! HTTP transport over a shared reqwest client

use crate::timeout::{TimeoutConfig, TimeoutManager};
use async_trait::async_trait;
use baaskit_core::{CoreError, CoreResult, Request, RequestBody, Response, Transport, TransportError};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// One exchange per call; pooling and TLS are reqwest's business
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeouts: TimeoutManager,
}

impl HttpTransport {
    pub fn new(config: TimeoutConfig) -> CoreResult<Self> {
        let timeouts = TimeoutManager::new(config);
        timeouts.validate()?;

        let builder = timeouts
            .apply_to_client_builder(Client::builder())
            .user_agent(concat!("baaskit/", env!("CARGO_PKG_VERSION")));
        let client = builder
            .build()
            .map_err(|e| CoreError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeouts })
    }

    pub fn timeouts(&self) -> &TimeoutConfig {
        self.timeouts.config()
    }

    fn build(&self, request: Request) -> Result<reqwest::Request, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .timeout(self.timeouts.request_timeout());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Some(RequestBody::Json(value)) => builder.json(&value),
            Some(RequestBody::Form(fields)) => builder.form(&fields),
            None => builder,
        };

        builder.build().map_err(|e| TransportError::InvalidRequest(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let method = request.method.clone();
        let path = request.path();
        let start = Instant::now();

        let http_request = self.build(request)?;
        let response = self.timeouts.execute_with_timeout(self.client.execute(http_request)).await?;

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_lowercase(), value.to_string());
            }
        }
        let body = self.timeouts.execute_with_timeout(response.bytes()).await?;

        debug!(
            %method,
            path = %path,
            status,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "exchange complete"
        );

        Ok(Response { status, headers, body: body.to_vec() })
    }
}
