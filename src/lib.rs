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

//! Asynchronous OpenStack and Rackspace API primitives.
//!
//! This crate provides the building blocks a typed cloud SDK is made of,
//! without the per-service catalog:
//!
//! * [ResourceId](struct.ResourceId.html) — typed, non-empty resource
//!   identifiers that cannot be mixed up between resources.
//! * [EnumRegistry](struct.EnumRegistry.html) — extensible enumerations for
//!   server-defined strings such as statuses, interning each distinct name.
//! * [Page](struct.Page.html) — forward-only pagination over both
//!   `rel=next` link and marker/limit conventions, with optional lazy
//!   streams behind the `stream` feature.
//! * [Waiter](struct.Waiter.html) — polling for long-running server-side
//!   operations with backoff, progress reporting and cancellation.
//!
//! Two typed service modules, [orchestration](orchestration/index.html) and
//! [monitoring](monitoring/index.html), are built on these primitives.
//!
//! Authentication is out of scope: pass a `reqwest::Client` with the
//! required default headers to [Client](struct.Client.html).
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), oscloud::Error> {
//! use oscloud::orchestration::Orchestration;
//! use oscloud::{Client, Query};
//!
//! let heat = Orchestration::new(Client::new("https://heat.example.org/v1/project")?);
//! let mut page = Some(heat.list_stacks(&Query::default(), Some(50), None).await?);
//! while let Some(current) = page {
//!     for stack in current.items() {
//!         println!("{} is {}", stack.stack_name, stack.stack_status);
//!     }
//!     page = current.next_page().await?;
//! }
//! # Ok(()) }
//! # #[tokio::main]
//! # async fn main() { example().await.unwrap(); }
//! ```

#![crate_name = "oscloud"]
#![crate_type = "lib"]
// NOTE: we do not use generic deny(warnings) to avoid breakages with new
// versions of the compiler. Add more warnings here as you discover them.
// Taken from https://github.com/rust-unofficial/patterns/
#![deny(
    dead_code,
    improper_ctypes,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unsafe_code,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_doc_comments,
    unused_import_braces,
    unused_parens,
    unused_qualifications,
    unused_results,
    while_true
)]
#![allow(unused_extern_crates)]
#![allow(
    clippy::new_ret_no_self,
    clippy::should_implement_trait,
    clippy::wrong_self_convention
)]

mod client;
mod common;
mod error;
mod extensible;
mod identifier;
pub mod monitoring;
pub mod orchestration;
mod page;
mod query;
mod url;
mod waiter;

pub use crate::client::{check, Client, ListRequest, RequestBuilder};
pub use crate::common::{empty_as_default, next_link, IdAndName, Link};
pub use crate::error::{Error, ErrorKind};
pub use crate::extensible::{EnumKind, EnumRegistry, EnumValue};
pub use crate::identifier::{ResourceId, ResourceKind};
pub use crate::page::{Collection, Cursor, Page, PaginatedResource, Pager};
pub use crate::query::{Query, QueryItem};
pub use crate::waiter::{
    fixed_interval, is_in_progress, ExponentialBackoff, HasStatus, WaitOutcome, Waiter,
};
