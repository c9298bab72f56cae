//! Tencent Cloud backend for lbsync
//!
//! Implements the [`lbsync_cloud`] service traits on top of the Tencent Cloud
//! API 3.0 (TC3-HMAC-SHA256 signed JSON over HTTPS).
//!
//! - CVM: [`ComputeApi`](lbsync_cloud::ComputeApi)
//! - CLB: [`LoadBalancerApi`](lbsync_cloud::LoadBalancerApi)
//! - TKE cluster routes: [`ClusterRouteApi`](lbsync_cloud::ClusterRouteApi)
//!
//! # Example
//!
//! ```ignore
//! use lbsync_tencent::{Credentials, TencentCloud};
//! use lbsync_cloud::ComputeApi;
//!
//! let cloud = TencentCloud::new(Credentials::new("AKID...", "secret"), "ap-shanghai")?;
//! let instances = cloud
//!     .describe_instances_by_private_ips(&["10.0.0.5".to_string()])
//!     .await?;
//! ```

pub mod clb;
pub mod client;
pub mod cvm;
pub mod error;
pub mod sign;
pub mod tke;

pub use client::ApiClient;
pub use error::{Result, TencentError};
pub use sign::Credentials;

/// Page size used for list calls
pub(crate) const PAGE_LIMIT: u32 = 100;

/// All three Tencent Cloud services behind one signed client
pub struct TencentCloud {
    client: ApiClient,
}

impl TencentCloud {
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(credentials, region)?,
        })
    }

    pub fn with_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn region(&self) -> &str {
        self.client.region()
    }
}

/// `Name`/`Values` filter used by the describe calls
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct Filter<'a> {
    pub name: String,
    pub values: &'a [String],
}

impl<'a> Filter<'a> {
    pub fn new(name: impl Into<String>, values: &'a [String]) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Response body of mutating calls that only report their request id
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RequestIdOnly {
    pub request_id: String,
}
