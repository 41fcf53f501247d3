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

//! Orchestration (Heat) API.
//!
//! A thin typed surface over the stacks endpoints, exercising the crate's
//! primitives: typed identifiers, an interned status enumeration, paged
//! listings and waiting for asynchronous stack operations.

use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::client::{Client, ListRequest};
use super::common::{empty_as_default, next_link, Link};
use super::extensible::{EnumKind, EnumRegistry, EnumValue};
use super::identifier::{ResourceId, ResourceKind};
use super::page::{Collection, Page, PaginatedResource};
use super::query::{Query, QueryItem};
use super::waiter::{HasStatus, WaitOutcome, Waiter};
use super::Error;

/// Marker for stack names.
#[derive(Debug, Clone, Copy)]
pub enum StackNameKind {}

impl ResourceKind for StackNameKind {}

/// A stack name, unique within a project.
pub type StackName = ResourceId<StackNameKind>;

/// Marker for server-assigned stack IDs.
#[derive(Debug, Clone, Copy)]
pub enum StackIdKind {}

impl ResourceKind for StackIdKind {}

/// A server-assigned stack ID.
pub type StackId = ResourceId<StackIdKind>;

/// Marker for stack statuses.
///
/// Pre-seeds the statuses the service documents; services are free to return
/// others, which are interned on first sight.
#[derive(Debug, Clone, Copy)]
pub enum StackStatusKind {}

impl EnumKind for StackStatusKind {
    fn known_names() -> &'static [&'static str] {
        &[
            "CREATE_IN_PROGRESS",
            "CREATE_COMPLETE",
            "CREATE_FAILED",
            "UPDATE_IN_PROGRESS",
            "UPDATE_COMPLETE",
            "UPDATE_FAILED",
            "DELETE_IN_PROGRESS",
            "DELETE_COMPLETE",
            "DELETE_FAILED",
        ]
    }
}

/// An interned stack status.
pub type StackStatus = EnumValue<StackStatusKind>;

/// Caller-supplied stack fields.
///
/// Shared between the creation request body and the server representation,
/// where it is embedded via flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackData {
    /// Name of the stack.
    pub stack_name: StackName,
    /// The template the stack is created from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Value>,
    /// Input parameters for the template.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, Value>,
    /// Creation timeout in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_mins: Option<u32>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl StackData {
    /// Stack data with only a name set.
    pub fn new(stack_name: StackName) -> StackData {
        StackData {
            stack_name,
            template: None,
            parameters: HashMap::new(),
            timeout_mins: None,
            tags: Vec::new(),
        }
    }
}

/// A stack as the server reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct Stack {
    /// Server-assigned ID.
    pub id: StackId,
    /// The caller-supplied fields.
    #[serde(flatten)]
    pub data: StackData,
    /// Current status, as a raw wire string.
    ///
    /// Use [status_value](#method.status_value) to intern it.
    pub stack_status: String,
    /// Human-readable explanation of the current status.
    #[serde(default)]
    pub stack_status_reason: Option<String>,
    /// When the stack was created.
    pub creation_time: DateTime<Utc>,
    /// When the stack was last updated (empty string until the first update).
    #[serde(default, deserialize_with = "empty_as_default")]
    pub updated_time: Option<DateTime<Utc>>,
    /// Links to this stack.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Stack {
    /// Resolve the wire status through a registry.
    pub fn status_value(
        &self,
        registry: &EnumRegistry<StackStatusKind>,
    ) -> Result<StackStatus, Error> {
        registry.from_name(&self.stack_status)
    }
}

impl HasStatus for Stack {
    fn status_name(&self) -> &str {
        &self.stack_status
    }
}

/// A stack as reported by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StackSummary {
    /// Server-assigned ID.
    pub id: StackId,
    /// Name of the stack.
    pub stack_name: StackName,
    /// Current status, as a raw wire string.
    pub stack_status: String,
    /// When the stack was created.
    pub creation_time: DateTime<Utc>,
    /// Links to this stack.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl HasStatus for StackSummary {
    fn status_name(&self) -> &str {
        &self.stack_status
    }
}

/// The listing envelope.
#[derive(Debug, Deserialize)]
pub struct StacksRoot {
    /// Stacks of the current page.
    pub stacks: Vec<StackSummary>,
    /// Collection-level links, including the continuation link.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl PaginatedResource for StackSummary {
    type Id = StackId;
    type Root = StacksRoot;

    fn resource_id(&self) -> StackId {
        self.id.clone()
    }
}

impl From<StacksRoot> for Collection<StackSummary> {
    fn from(root: StacksRoot) -> Collection<StackSummary> {
        let next = next_link(&root.links);
        Collection::with_next(root.stacks, next)
    }
}

/// Server-side filters for stack listings.
#[derive(Debug, Clone)]
pub enum StackFilter {
    /// Filter by exact name.
    Name(String),
    /// Filter by status string.
    Status(String),
    /// Include soft-deleted stacks.
    ShowDeleted(bool),
}

impl QueryItem for StackFilter {
    fn query_item(&self) -> Result<(&str, Cow<str>), Error> {
        Ok(match self {
            StackFilter::Name(s) => ("name", Cow::Borrowed(s)),
            StackFilter::Status(s) => ("status", Cow::Borrowed(s)),
            StackFilter::ShowDeleted(b) => ("show_deleted", b.to_string().into()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct StackRoot {
    stack: Stack,
}

/// The creation response: the server only returns the ID and links.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedStack {
    /// Server-assigned ID of the new stack.
    pub id: StackId,
    /// Links to the new stack.
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct CreatedRoot {
    stack: CreatedStack,
}

/// The orchestration service.
///
/// Owns the status registry, so statuses interned from one handle compare as
/// [same_instance](../struct.EnumValue.html#method.same_instance).
#[derive(Debug)]
pub struct Orchestration {
    client: Client,
    statuses: EnumRegistry<StackStatusKind>,
}

impl Orchestration {
    /// Create an orchestration handle over the given client.
    pub fn new(client: Client) -> Orchestration {
        Orchestration {
            client,
            statuses: EnumRegistry::new(),
        }
    }

    /// The registry of stack statuses seen by this handle.
    #[inline]
    pub fn statuses(&self) -> &EnumRegistry<StackStatusKind> {
        &self.statuses
    }

    /// List stacks, one page at a time.
    ///
    /// Heat paginates by marker, so the resulting page derives continuation
    /// markers from the last item of each page.
    pub async fn list_stacks(
        &self,
        filters: &Query<StackFilter>,
        limit: Option<usize>,
        starting_with: Option<StackId>,
    ) -> Result<Page<StackSummary>, Error> {
        let request =
            ListRequest::new(self.client.clone(), ["stacks"]).with_query(filters)?;
        Page::fetch_first(request, limit, starting_with).await
    }

    /// Get a stack by name.
    pub async fn get_stack(&self, name: &StackName) -> Result<Stack, Error> {
        let root: StackRoot = self
            .client
            .request(Method::GET, ["stacks", name.value()])
            .fetch_json()
            .await?;
        Ok(root.stack)
    }

    /// Create a stack.
    ///
    /// Creation is asynchronous: the returned stack only carries its ID and
    /// links, and the stack starts in `CREATE_IN_PROGRESS`. Use
    /// [wait_for_stack](#method.wait_for_stack) to await completion.
    pub async fn create_stack(&self, data: &StackData) -> Result<CreatedStack, Error> {
        let root: CreatedRoot = self
            .client
            .request(Method::POST, ["stacks"])
            .json(data)
            .fetch_json()
            .await?;
        Ok(root.stack)
    }

    /// Request deletion of a stack.
    ///
    /// Deletion is also asynchronous; the stack moves to
    /// `DELETE_IN_PROGRESS` and disappears once done.
    pub async fn delete_stack(&self, name: &StackName) -> Result<(), Error> {
        let _ = self
            .client
            .request(Method::DELETE, ["stacks", name.value()])
            .send()
            .await?;
        Ok(())
    }

    /// Poll a stack with the default backoff until its status is terminal.
    ///
    /// For a custom schedule or a progress observer, build a
    /// [Waiter](../struct.Waiter.html) over
    /// [get_stack](#method.get_stack) directly.
    pub async fn wait_for_stack(
        &self,
        name: &StackName,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome<Stack>, Error> {
        Waiter::new(move || self.get_stack(name)).wait(cancel).await
    }
}
