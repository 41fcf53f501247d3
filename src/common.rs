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

//! Reusable JSON structures shared by response envelopes.

use reqwest::Url;
use serde::de::{DeserializeOwned, Error as DeserError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A link to a resource.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Link {
    /// Resource URL.
    pub href: Url,
    /// Relationship between the referencing and the referenced object.
    pub rel: String,
}

/// A reference to a resource by ID and name.
///
/// Many envelopes embed related resources in this shortened form.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct IdAndName {
    /// Resource ID.
    pub id: String,
    /// Resource name.
    pub name: String,
}

/// Extract the `rel=next` continuation link from a link list, if any.
///
/// Collection endpoints that paginate by link include one in the response
/// envelope; marker-based endpoints do not.
pub fn next_link(links: &[Link]) -> Option<Url> {
    links
        .iter()
        .find(|link| link.rel == "next")
        .map(|link| link.href.clone())
}

/// Deserialize a value where empty string is replaced by `Default` value.
///
/// Several services return `""` for unset timestamps and versions.
pub fn empty_as_default<'de, D, T>(des: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(des)?;
    match value {
        Value::String(ref s) if s.is_empty() => Ok(T::default()),
        _ => serde_json::from_value(value).map_err(D::Error::custom),
    }
}

#[cfg(test)]
pub mod test {
    use reqwest::Url;
    use serde::Deserialize;

    use super::{empty_as_default, next_link, Link};

    fn link(rel: &str, href: &str) -> Link {
        Link {
            href: Url::parse(href).unwrap(),
            rel: rel.to_string(),
        }
    }

    #[test]
    fn test_next_link_present() {
        let links = vec![
            link("self", "https://example.org/v1/stacks"),
            link("next", "https://example.org/v1/stacks?marker=abcd"),
        ];
        let next = next_link(&links).unwrap();
        assert_eq!(next.as_str(), "https://example.org/v1/stacks?marker=abcd");
    }

    #[test]
    fn test_next_link_absent() {
        let links = vec![link("self", "https://example.org/v1/stacks")];
        assert!(next_link(&links).is_none());
        assert!(next_link(&[]).is_none());
    }

    #[derive(Debug, Deserialize)]
    struct EmptyAsDefault {
        #[serde(deserialize_with = "empty_as_default")]
        number: u8,
        #[serde(deserialize_with = "empty_as_default")]
        string: Option<String>,
    }

    #[test]
    fn test_empty_as_default_with_values() {
        let s = "{\"number\": 42, \"string\": \"value\"}";
        let r: EmptyAsDefault = serde_json::from_str(s).unwrap();
        assert_eq!(r.number, 42);
        assert_eq!(r.string.unwrap(), "value");
    }

    #[test]
    fn test_empty_as_default_with_empty_string() {
        let s = "{\"number\": \"\", \"string\": \"\"}";
        let r: EmptyAsDefault = serde_json::from_str(s).unwrap();
        assert_eq!(r.number, 0);
        assert!(r.string.is_none());
    }
}
