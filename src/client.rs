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

//! Low-level HTTP client for JSON APIs.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Error as HttpError;
use log::trace;
use reqwest::{Body, Method, RequestBuilder as HttpRequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::page::{Collection, Cursor, Pager, PaginatedResource};
use super::query::{Query, QueryItem};
use super::url;
use super::{Error, ErrorKind};

/// An HTTP client rooted at a service endpoint.
///
/// Uses `Arc` internally (through `reqwest::Client`) and should be reused by
/// cloning it. Authentication is out of scope of this crate: pre-authenticated
/// headers (such as `X-Auth-Token`) belong in the default headers of the
/// wrapped `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct Client {
    inner: reqwest::Client,
    endpoint: Url,
}

impl Client {
    /// Create a client for the given endpoint with a default HTTP backend.
    ///
    /// Fails with `InvalidInput` if the endpoint is not a valid base URL.
    pub fn new(endpoint: &str) -> Result<Client, Error> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err.to_string()))?;
        Client::new_with(endpoint, reqwest::Client::new())
    }

    /// Create a client for the given endpoint with a custom HTTP backend.
    pub fn new_with(endpoint: Url, inner: reqwest::Client) -> Result<Client, Error> {
        if endpoint.cannot_be_a_base() || !endpoint.has_host() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Invalid base URL {} for a service endpoint", endpoint),
            ));
        }
        Ok(Client { inner, endpoint })
    }

    /// The endpoint this client is rooted at.
    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get a reference to the inner `reqwest` client.
    #[inline]
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Start a request to a path under the endpoint.
    pub fn request<I>(&self, method: Method, path: I) -> RequestBuilder
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let url = url::extend(self.endpoint.clone(), path);
        self.request_url(method, url)
    }

    /// Start a request to an explicit URL.
    ///
    /// Used when the server hands out complete URLs, e.g. continuation links.
    pub fn request_url(&self, method: Method, url: Url) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.request(method, url),
            client: self.inner.clone(),
        }
    }
}

/// A request builder with error handling.
#[derive(Debug)]
#[must_use = "preparing a request is not enough to run it"]
pub struct RequestBuilder {
    inner: HttpRequestBuilder,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ServerMessage {
    message: Option<String>,
    faultstring: Option<String>,
    title: Option<String>,
    // Ironic legacy format: JSON inside JSON (sigh)
    error_message: Option<String>,
}

impl ServerMessage {
    fn into_message(self, recursive: bool) -> Option<String> {
        if let Some(value) = self.message.or(self.faultstring).or(self.title) {
            Some(value)
        } else if recursive {
            self.error_message.and_then(|json| {
                serde_json::from_str::<ServerMessage>(&json)
                    .ok()
                    .and_then(|msg| msg.into_message(false))
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorResponse {
    Map(HashMap<String, ServerMessage>),
    Message(ServerMessage),
}

fn extract_message(text: String) -> String {
    serde_json::from_str::<ErrorResponse>(&text)
        .ok()
        .and_then(|body| match body {
            ErrorResponse::Map(map) => map
                .into_iter()
                .next()
                .and_then(|(_k, v)| v.into_message(true)),
            ErrorResponse::Message(msg) => msg.into_message(true),
        })
        .unwrap_or(text)
}

/// Check for errors in the response.
///
/// On a 4xx or 5xx status, extracts the error message the way OpenStack
/// services format it and fails with a kind derived from the status code.
pub async fn check(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let message = extract_message(response.text().await?);
        trace!("HTTP request returned {}; error: {}", status, message);
        Err(Error::new(status.into(), message).with_status(status))
    } else {
        trace!(
            "HTTP request to {} returned {}",
            response.url(),
            response.status()
        );
        Ok(response)
    }
}

impl RequestBuilder {
    /// Add a body to the request.
    pub fn body<T: Into<Body>>(self, body: T) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.body(body),
            ..self
        }
    }

    /// Add a header to the request.
    pub fn header<K, V>(self, key: K, value: V) -> RequestBuilder
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<HttpError>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<HttpError>,
    {
        RequestBuilder {
            inner: self.inner.header(key, value),
            ..self
        }
    }

    /// Add headers to a request.
    pub fn headers(self, headers: HeaderMap) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.headers(headers),
            ..self
        }
    }

    /// Add a JSON body to the request.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.json(json),
            ..self
        }
    }

    /// Send a query with the request.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.query(query),
            ..self
        }
    }

    /// Override the timeout for the request.
    pub fn timeout(self, timeout: Duration) -> RequestBuilder {
        RequestBuilder {
            inner: self.inner.timeout(timeout),
            ..self
        }
    }

    /// Send the request and receive JSON in response.
    pub async fn fetch_json<T>(self) -> Result<T, Error>
    where
        T: DeserializeOwned + Send,
    {
        self.send().await?.json::<T>().await.map_err(Error::from)
    }

    /// Send the request and check for errors.
    pub async fn send(self) -> Result<Response, Error> {
        check(self.send_unchecked().await?).await
    }

    /// Send the request without checking for HTTP errors.
    pub async fn send_unchecked(self) -> Result<Response, Error> {
        let req = self.inner.build().map_err(Error::from)?;
        trace!("Sending HTTP {} request to {}", req.method(), req.url());
        self.client.execute(req).await.map_err(Error::from)
    }
}

/// A repeatable GET request against a collection endpoint.
///
/// Serves as the [Pager](trait.Pager.html) behind pages fetched from real
/// services: `Start` and `Marker` cursors re-issue the stored request with
/// `limit`/`marker` query parameters, while `Link` cursors follow the URL
/// the server returned verbatim.
#[derive(Debug, Clone)]
pub struct ListRequest {
    client: Client,
    url: Url,
    query: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
struct PageQuery<'a, I: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<&'a I>,
}

impl ListRequest {
    /// Create a list request for a path under the client's endpoint.
    pub fn new<I>(client: Client, path: I) -> ListRequest
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let url = url::extend(client.endpoint().clone(), path);
        ListRequest {
            client,
            url,
            query: Vec::new(),
        }
    }

    /// Add a single query parameter to the request.
    pub fn with_item<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> ListRequest {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add all items of a query to the request.
    pub fn with_query<T: QueryItem>(mut self, query: &Query<T>) -> Result<ListRequest, Error> {
        for item in query.iter() {
            let (key, value) = item.query_item()?;
            self.query.push((key.to_string(), value.into_owned()));
        }
        Ok(self)
    }
}

#[async_trait]
impl<T> Pager<T> for ListRequest
where
    T: PaginatedResource + 'static,
    T::Root: Into<Collection<T>>,
{
    async fn fetch_page(
        &self,
        cursor: &Cursor<T::Id>,
        limit: Option<usize>,
    ) -> Result<Collection<T>, Error> {
        let root: T::Root = match cursor {
            Cursor::Link(link) => {
                self.client
                    .request_url(Method::GET, link.clone())
                    .fetch_json()
                    .await?
            }
            Cursor::Start => {
                self.client
                    .request_url(Method::GET, self.url.clone())
                    .query(&self.query)
                    .query(&PageQuery::<T::Id> {
                        limit,
                        marker: None,
                    })
                    .fetch_json()
                    .await?
            }
            Cursor::Marker(marker) => {
                self.client
                    .request_url(Method::GET, self.url.clone())
                    .query(&self.query)
                    .query(&PageQuery {
                        limit,
                        marker: Some(marker),
                    })
                    .fetch_json()
                    .await?
            }
        };
        Ok(root.into())
    }
}

#[cfg(test)]
mod test_extract_message {
    use super::extract_message;

    #[test]
    fn test_plain() {
        let msg = "<html><body>I failed</body></html>";
        let result = extract_message(msg.to_string());
        assert_eq!(result, msg);
    }

    #[test]
    fn test_simple_message() {
        let msg = r#"{"message": "I failed"}"#;
        let result = extract_message(msg.to_string());
        assert_eq!(result, "I failed");
    }

    #[test]
    fn test_nested_message() {
        let msg = r#"{"SomethingFailed": {"message": "I failed"}}"#;
        let result = extract_message(msg.to_string());
        assert_eq!(result, "I failed");
    }

    #[test]
    fn test_ironic_message() {
        let msg = r#"{"error_message": {"faultstring": "I failed"}}"#;
        let result = extract_message(msg.to_string());
        assert_eq!(result, "I failed");
    }

    #[test]
    fn test_ironic_legacy() {
        let msg = r#"{"error_message": "{\"faultstring\": \"I failed\"}"}"#;
        let result = extract_message(msg.to_string());
        assert_eq!(result, "I failed");
    }
}

#[cfg(test)]
mod test_client {
    use reqwest::Method;

    use super::Client;
    use crate::ErrorKind;

    #[test]
    fn test_invalid_endpoint() {
        let err = Client::new("unix:/run/foo.socket").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_request_url() {
        let client = Client::new("https://example.org/v1").unwrap();
        assert_eq!(client.endpoint().as_str(), "https://example.org/v1");
        // Building a request must not panic on path extension.
        let _ = client.request(Method::GET, ["stacks", "teapot"]);
    }
}
