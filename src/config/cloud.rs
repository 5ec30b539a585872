//! National cloud and API version tables
//!
//! Both sets are closed: every value maps to its endpoints through static
//! tables, so there is no runtime discovery of valid hosts or versions.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Microsoft Graph deployment a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NationalCloud {
    #[default]
    Global,
    UsGov,
    UsGovDod,
    China,
}

struct CloudEndpoints {
    cloud: NationalCloud,
    name: &'static str,
    graph_host: &'static str,
    login_host: &'static str,
}

static CLOUD_ENDPOINTS: [CloudEndpoints; 4] = [
    CloudEndpoints {
        cloud: NationalCloud::Global,
        name: "global",
        graph_host: "graph.microsoft.com",
        login_host: "login.microsoftonline.com",
    },
    CloudEndpoints {
        cloud: NationalCloud::UsGov,
        name: "us_gov",
        graph_host: "graph.microsoft.us",
        login_host: "login.microsoftonline.us",
    },
    CloudEndpoints {
        cloud: NationalCloud::UsGovDod,
        name: "us_gov_dod",
        graph_host: "dod-graph.microsoft.us",
        login_host: "login.microsoftonline.us",
    },
    CloudEndpoints {
        cloud: NationalCloud::China,
        name: "china",
        graph_host: "microsoftgraph.chinacloudapi.cn",
        login_host: "login.chinacloudapi.cn",
    },
];

impl NationalCloud {
    pub const ALL: [NationalCloud; 4] = [
        NationalCloud::Global,
        NationalCloud::UsGov,
        NationalCloud::UsGovDod,
        NationalCloud::China,
    ];

    fn endpoints(self) -> &'static CloudEndpoints {
        // The table is indexed in declaration order.
        &CLOUD_ENDPOINTS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.endpoints().name
    }

    pub fn graph_host(self) -> &'static str {
        self.endpoints().graph_host
    }

    pub fn login_host(self) -> &'static str {
        self.endpoints().login_host
    }

    pub fn authority_url(self) -> String {
        format!("https://{}", self.login_host())
    }

    /// Default token scope for this cloud's Graph endpoint.
    pub fn default_scope(self) -> String {
        format!("https://{}/.default", self.graph_host())
    }

    /// Resolve the cloud serving a given Graph host.
    pub fn from_graph_host(host: &str) -> Option<Self> {
        CLOUD_ENDPOINTS
            .iter()
            .find(|entry| entry.graph_host.eq_ignore_ascii_case(host))
            .map(|entry| entry.cloud)
    }
}

impl fmt::Display for NationalCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NationalCloud {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        CLOUD_ENDPOINTS
            .iter()
            .find(|entry| entry.name == normalized || entry.graph_host == normalized)
            .map(|entry| entry.cloud)
            .ok_or_else(|| GraphError::config(format!("Unknown national cloud: {s}")))
    }
}

/// Graph API version segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApiVersion {
    #[default]
    #[serde(rename = "v1.0")]
    V1,
    #[serde(rename = "beta")]
    Beta,
}

impl ApiVersion {
    pub const ALL: [ApiVersion; 2] = [ApiVersion::V1, ApiVersion::Beta];

    pub fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1.0",
            ApiVersion::Beta => "beta",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_matches('/');
        ApiVersion::ALL
            .into_iter()
            .find(|version| version.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| GraphError::config(format!("Unknown API version: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_variants() {
        for cloud in NationalCloud::ALL {
            assert_eq!(cloud.endpoints().cloud, cloud);
        }
    }

    #[test]
    fn test_cloud_lookup() {
        assert_eq!(
            NationalCloud::from_graph_host("GRAPH.microsoft.com"),
            Some(NationalCloud::Global)
        );
        assert_eq!(NationalCloud::from_graph_host("example.com"), None);
        assert_eq!("us-gov".parse::<NationalCloud>().unwrap(), NationalCloud::UsGov);
        assert_eq!(
            "microsoftgraph.chinacloudapi.cn".parse::<NationalCloud>().unwrap(),
            NationalCloud::China
        );
        assert!("mars".parse::<NationalCloud>().is_err());
        assert_eq!(
            NationalCloud::Global.default_scope(),
            "https://graph.microsoft.com/.default"
        );
    }

    #[test]
    fn test_api_version_parse() {
        assert_eq!("v1.0".parse::<ApiVersion>().unwrap(), ApiVersion::V1);
        assert_eq!("/beta/".parse::<ApiVersion>().unwrap(), ApiVersion::Beta);
        assert!("v2.0".parse::<ApiVersion>().is_err());
    }
}
