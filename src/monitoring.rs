// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cloud Monitoring check types.
//!
//! Check details are polymorphic on the wire: the `type` field of a check
//! decides the shape of its `details` object. Decoding goes through an
//! explicit dispatch on the type identifier, and unknown check types keep
//! their details as raw JSON so that new types do not break decoding.

use std::collections::HashMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::identifier::{ResourceId, ResourceKind};
use super::{Error, ErrorKind};

/// Marker for check IDs.
#[derive(Debug, Clone, Copy)]
pub enum CheckIdKind {}

impl ResourceKind for CheckIdKind {}

/// A server-assigned check ID.
pub type CheckId = ResourceId<CheckIdKind>;

/// Marker for check type identifiers, e.g. `remote.http`.
///
/// The service treats check types case-insensitively, so the identifiers do
/// too.
#[derive(Debug, Clone, Copy)]
pub enum CheckTypeKind {}

impl ResourceKind for CheckTypeKind {
    const CASE_INSENSITIVE: bool = true;
}

/// A check type identifier.
pub type CheckTypeId = ResourceId<CheckTypeKind>;

fn default_http_method() -> String {
    "GET".to_string()
}

/// Details of an HTTP check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCheckDetails {
    /// The URL to probe.
    pub url: Url,
    /// HTTP method to use.
    #[serde(default = "default_http_method")]
    pub method: String,
    /// Request body, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Extra request headers.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Whether to follow redirects.
    #[serde(default)]
    pub follow_redirects: bool,
}

/// Details of an ICMP ping check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PingCheckDetails {
    /// Number of pings per probe.
    #[serde(default = "default_ping_count")]
    pub count: u32,
}

fn default_ping_count() -> u32 {
    5
}

/// Details of a TCP connection check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpCheckDetails {
    /// The port to connect to.
    pub port: u16,
    /// Whether to negotiate TLS after connecting.
    #[serde(default)]
    pub ssl: bool,
    /// A regular expression the service banner must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner_match: Option<String>,
}

/// Typed details of a check.
///
/// The variant is picked by the check type, not by the shape of the JSON,
/// so decoding is driven by [from_value](#method.from_value) rather than a
/// `Deserialize` implementation.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CheckDetails {
    /// `remote.http` details.
    Http(HttpCheckDetails),
    /// `remote.ping` details.
    Ping(PingCheckDetails),
    /// `remote.tcp` details.
    Tcp(TcpCheckDetails),
    /// Details of a check type this crate has no structure for.
    Generic(Value),
}

impl CheckDetails {
    /// Decode details according to the check type.
    ///
    /// Types without a typed variant decode to `Generic`, keeping the raw
    /// JSON intact.
    pub fn from_value(check_type: &CheckTypeId, details: Value) -> Result<CheckDetails, Error> {
        Ok(match check_type.value().to_ascii_lowercase().as_str() {
            "remote.http" => CheckDetails::Http(serde_json::from_value(details)?),
            "remote.ping" => CheckDetails::Ping(serde_json::from_value(details)?),
            "remote.tcp" => CheckDetails::Tcp(serde_json::from_value(details)?),
            _ => CheckDetails::Generic(details),
        })
    }

    /// Whether these details can be used with the given check type.
    ///
    /// `Generic` details are compatible with any type; the caller is on
    /// their own regarding the actual shape.
    pub fn is_compatible(&self, check_type: &CheckTypeId) -> bool {
        let type_name = check_type.value();
        match self {
            CheckDetails::Http(..) => type_name.eq_ignore_ascii_case("remote.http"),
            CheckDetails::Ping(..) => type_name.eq_ignore_ascii_case("remote.ping"),
            CheckDetails::Tcp(..) => type_name.eq_ignore_ascii_case("remote.tcp"),
            CheckDetails::Generic(..) => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckConfigurationRepr {
    label: String,
    #[serde(rename = "type")]
    check_type: String,
    details: Value,
}

/// A validated check configuration.
///
/// The type and the details are guaranteed to be compatible, which is why
/// the fields are not public.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CheckConfigurationRepr")]
pub struct CheckConfiguration {
    label: String,
    #[serde(rename = "type")]
    check_type: CheckTypeId,
    details: CheckDetails,
}

impl CheckConfiguration {
    /// Create a configuration, validating type/details compatibility.
    ///
    /// Fails with `InvalidInput` if the details do not fit the type.
    pub fn new<S: Into<String>>(
        label: S,
        check_type: CheckTypeId,
        details: CheckDetails,
    ) -> Result<CheckConfiguration, Error> {
        if !details.is_compatible(&check_type) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Check details are not compatible with type {}", check_type),
            ));
        }
        Ok(CheckConfiguration {
            label: label.into(),
            check_type,
            details,
        })
    }

    /// Human-readable label of the check.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The check type.
    #[inline]
    pub fn check_type(&self) -> &CheckTypeId {
        &self.check_type
    }

    /// The typed details.
    #[inline]
    pub fn details(&self) -> &CheckDetails {
        &self.details
    }
}

impl TryFrom<CheckConfigurationRepr> for CheckConfiguration {
    type Error = Error;

    fn try_from(repr: CheckConfigurationRepr) -> Result<CheckConfiguration, Error> {
        let check_type = CheckTypeId::new(repr.check_type)?;
        let details = CheckDetails::from_value(&check_type, repr.details)?;
        CheckConfiguration::new(repr.label, check_type, details)
    }
}

/// A check as the server reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct Check {
    /// Server-assigned ID.
    pub id: CheckId,
    /// The caller-supplied configuration.
    #[serde(flatten)]
    pub configuration: CheckConfiguration,
}
