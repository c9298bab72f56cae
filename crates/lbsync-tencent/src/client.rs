//! Tencent Cloud API 3.0 client
//!
//! Signs and sends JSON actions and unwraps the `Response` envelope.

use crate::error::{Result, TencentError};
use crate::sign::{self, CONTENT_TYPE, Credentials};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

const API_DOMAIN: &str = "tencentcloudapi.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A Tencent Cloud product endpoint
#[derive(Debug, Clone, Copy)]
pub struct Product {
    pub service: &'static str,
    pub version: &'static str,
}

pub const CVM: Product = Product {
    service: "cvm",
    version: "2017-03-12",
};

pub const CLB: Product = Product {
    service: "clb",
    version: "2018-03-17",
};

pub const TKE: Product = Product {
    service: "tke",
    version: "2018-05-25",
};

/// Low level API client shared by all products
pub struct ApiClient {
    http: reqwest::Client,
    credentials: Credentials,
    region: String,
    domain: String,
}

impl ApiClient {
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            credentials,
            region: region.into(),
            domain: API_DOMAIN.to_string(),
        })
    }

    /// Use another API domain, e.g. `internal.tencentcloudapi.com` from inside the VPC
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn host(&self, product: Product) -> String {
        format!("{}.{}", product.service, self.domain)
    }

    /// Call one API action and decode the `Response` body
    pub async fn call<Req, Resp>(&self, product: Product, action: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_string(request)?;
        let host = self.host(product);
        let timestamp = chrono::Utc::now().timestamp();
        let authorization = sign::authorization(
            &self.credentials,
            product.service,
            &host,
            action,
            &payload,
            timestamp,
        )?;

        tracing::debug!(service = product.service, action, "calling Tencent Cloud API");

        let response = self
            .http
            .post(format!("https://{host}/"))
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", &host)
            .header("X-TC-Action", action)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Version", product.version)
            .header("X-TC-Region", &self.region)
            .body(payload)
            .send()
            .await?;

        let envelope: serde_json::Value = response.json().await?;
        decode_response(envelope)
    }
}

/// Unwrap `{"Response": {...}}`, turning an embedded `Error` into [`TencentError::Api`]
pub(crate) fn decode_response<Resp: DeserializeOwned>(envelope: serde_json::Value) -> Result<Resp> {
    let mut envelope = envelope;
    let body = envelope
        .get_mut("Response")
        .map(serde_json::Value::take)
        .ok_or_else(|| TencentError::InvalidResponse("missing Response field".to_string()))?;

    if let Some(error) = body.get("Error") {
        let field = |name: &str| {
            error
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        let request_id = body
            .get("RequestId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        return Err(TencentError::Api {
            code: field("Code"),
            message: field("Message"),
            request_id,
        });
    }

    Ok(serde_json::from_value(body)?)
}
