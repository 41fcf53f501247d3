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

//! Forward-only pagination over collection endpoints.
//!
//! Different services paginate differently: some return an explicit
//! `rel=next` link in the response envelope, others expect the caller to pass
//! the identifier of the last seen item as a `marker` query parameter. A
//! [Page](struct.Page.html) hides the difference: it carries the items of one
//! response and, unless the listing is complete, knows how to fetch the next
//! page. There is no way to go back; restarting requires a fresh top-level
//! listing call.

use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "stream")]
use futures::pin_mut;
#[cfg(feature = "stream")]
use futures::stream::{Stream, TryStreamExt};
use log::trace;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Error;

/// A single resource in a paginated listing.
///
/// Implementations define the pagination marker and the response envelope of
/// the listing, e.g. for Compute servers:
///
/// ```rust
/// use oscloud::{Collection, PaginatedResource};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// pub struct Server {
///     pub id: String,
///     pub name: String,
/// }
///
/// #[derive(Debug, Deserialize)]
/// pub struct ServersRoot {
///     pub servers: Vec<Server>,
/// }
///
/// // This implementation defines the relationship between the root resource
/// // and its items.
/// impl PaginatedResource for Server {
///     type Id = String;
///     type Root = ServersRoot;
///     fn resource_id(&self) -> Self::Id {
///         self.id.clone()
///     }
/// }
///
/// // This is another required part of the pagination contract.
/// impl From<ServersRoot> for Collection<Server> {
///     fn from(value: ServersRoot) -> Collection<Server> {
///         Collection::new(value.servers)
///     }
/// }
/// ```
pub trait PaginatedResource {
    /// Type of an ID used as a pagination marker.
    type Id: Debug + Serialize + Send + Sync;

    /// Root type of the listing.
    type Root: DeserializeOwned + Send;

    /// Retrieve a copy of the ID.
    fn resource_id(&self) -> Self::Id;
}

/// A decoded collection envelope: the items of one page plus the server's
/// continuation link, if it provided one.
#[derive(Debug)]
pub struct Collection<T> {
    /// Items of this page.
    pub items: Vec<T>,
    /// The `rel=next` link from the envelope, if any.
    pub next: Option<Url>,
}

impl<T> Collection<T> {
    /// A collection without an explicit continuation link.
    pub fn new(items: Vec<T>) -> Collection<T> {
        Collection { items, next: None }
    }

    /// A collection with an explicit continuation link.
    pub fn with_next(items: Vec<T>, next: Option<Url>) -> Collection<T> {
        Collection { items, next }
    }
}

/// A position in a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor<Id> {
    /// The beginning of the listing.
    Start,
    /// Continue after the item with the given ID.
    Marker(Id),
    /// Continue by following a server-provided link.
    Link(Url),
}

/// Source of pages: issues one listing request per call.
///
/// [ListRequest](struct.ListRequest.html) is the implementation
/// backed by a real HTTP endpoint; tests substitute in-memory fakes.
#[async_trait]
pub trait Pager<T: PaginatedResource>: Send + Sync {
    /// Fetch the collection at the given cursor.
    async fn fetch_page(
        &self,
        cursor: &Cursor<T::Id>,
        limit: Option<usize>,
    ) -> Result<Collection<T>, Error>;
}

#[async_trait]
impl<T, P> Pager<T> for Arc<P>
where
    T: PaginatedResource,
    P: Pager<T> + ?Sized,
{
    async fn fetch_page(
        &self,
        cursor: &Cursor<T::Id>,
        limit: Option<usize>,
    ) -> Result<Collection<T>, Error> {
        (**self).fetch_page(cursor, limit).await
    }
}

struct NextPage<T: PaginatedResource + 'static> {
    pager: Arc<dyn Pager<T>>,
    cursor: Cursor<T::Id>,
    limit: Option<usize>,
}

/// One page of a listing, with an optional continuation.
///
/// The continuation cursor is derived when the page is constructed: an empty
/// page is terminal, a server-provided `rel=next` link wins if present, and
/// otherwise the identifier of the last item becomes the marker. Pages are
/// forward-only: [next_page](#method.next_page) consumes the page, and the
/// next page is only requested after the current one has been fully decoded.
pub struct Page<T: PaginatedResource + 'static> {
    items: Vec<T>,
    next: Option<NextPage<T>>,
}

async fn turn<T>(
    pager: Arc<dyn Pager<T>>,
    cursor: Cursor<T::Id>,
    limit: Option<usize>,
) -> Result<Page<T>, Error>
where
    T: PaginatedResource + 'static,
{
    let collection = pager.fetch_page(&cursor, limit).await?;
    let Collection { items, next: link } = collection;
    trace!(
        "Received {} item(s), explicit next link: {:?}",
        items.len(),
        link
    );

    let next_cursor = match (items.last(), link) {
        (None, _) => None,
        (Some(_), Some(url)) => Some(Cursor::Link(url)),
        (Some(last), None) => Some(Cursor::Marker(last.resource_id())),
    };

    Ok(Page {
        items,
        next: next_cursor.map(|cursor| NextPage {
            pager,
            cursor,
            limit,
        }),
    })
}

impl<T: PaginatedResource + 'static> Page<T> {
    /// Fetch the first page of a listing.
    ///
    /// The `limit` caps the size of each page; `starting_with` skips directly
    /// past the item with the given ID (marker-based services only).
    pub async fn fetch_first<P>(
        pager: P,
        limit: Option<usize>,
        starting_with: Option<T::Id>,
    ) -> Result<Page<T>, Error>
    where
        P: Pager<T> + 'static,
    {
        let cursor = match starting_with {
            Some(marker) => Cursor::Marker(marker),
            None => Cursor::Start,
        };
        turn(Arc::new(pager), cursor, limit).await
    }

    /// Items of this page.
    #[inline]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page, returning its items.
    #[inline]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Whether a continuation is available.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Fetch the next page, consuming this one.
    ///
    /// Returns `None` when the listing is complete. A fetch failure yields
    /// the underlying error and no partial page.
    pub async fn next_page(self) -> Result<Option<Page<T>>, Error> {
        match self.next {
            None => Ok(None),
            Some(NextPage {
                pager,
                cursor,
                limit,
            }) => turn(pager, cursor, limit).await.map(Some),
        }
    }

    /// Convert this page into a stream of non-empty page chunks.
    ///
    /// Note that the requests for further pages only happen on iteration over
    /// the results.
    #[cfg(feature = "stream")]
    pub fn into_chunks(self) -> impl Stream<Item = Result<Vec<T>, Error>> {
        async_stream::try_stream! {
            let mut current = self;
            loop {
                let Page { items, next } = current;
                if items.is_empty() {
                    break;
                }
                yield items;
                match next {
                    Some(NextPage { pager, cursor, limit }) => {
                        current = turn(pager, cursor, limit).await?;
                    }
                    None => break,
                }
            }
        }
    }

    /// Convert this page into a flattened stream of items.
    ///
    /// Note that the requests for further pages only happen on iteration over
    /// the results.
    #[cfg(feature = "stream")]
    pub fn into_stream(self) -> impl Stream<Item = Result<T, Error>> {
        async_stream::try_stream! {
            let chunks = self.into_chunks();
            pin_mut!(chunks);
            while let Some(chunk) = chunks.try_next().await? {
                for item in chunk {
                    yield item;
                }
            }
        }
    }
}

impl<T: PaginatedResource + 'static> Debug for Page<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Page")
            .field("items", &self.items)
            .field("has_next", &self.next.is_some())
            .finish()
    }
}

#[cfg(test)]
pub mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::Url;
    use serde::Deserialize;

    use super::{Collection, Cursor, Page, PaginatedResource, Pager};
    use crate::{Error, ErrorKind};

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct Ship {
        id: String,
    }

    #[derive(Debug, Deserialize)]
    struct ShipsRoot {
        ships: Vec<Ship>,
    }

    impl PaginatedResource for Ship {
        type Id = String;
        type Root = ShipsRoot;

        fn resource_id(&self) -> String {
            self.id.clone()
        }
    }

    impl From<ShipsRoot> for Collection<Ship> {
        fn from(value: ShipsRoot) -> Collection<Ship> {
            Collection::new(value.ships)
        }
    }

    fn ships(ids: &[&str]) -> Vec<Ship> {
        ids.iter().map(|id| Ship { id: id.to_string() }).collect()
    }

    // A pager scripted with one collection per request, recording cursors.
    struct ScriptedPager {
        script: Mutex<Vec<Collection<Ship>>>,
        cursors: Mutex<Vec<Cursor<String>>>,
    }

    impl ScriptedPager {
        fn new(script: Vec<Collection<Ship>>) -> ScriptedPager {
            ScriptedPager {
                script: Mutex::new(script),
                cursors: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Pager<Ship> for ScriptedPager {
        async fn fetch_page(
            &self,
            cursor: &Cursor<String>,
            _limit: Option<usize>,
        ) -> Result<Collection<Ship>, Error> {
            self.cursors.lock().unwrap().push(cursor.clone());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Err(Error::new(ErrorKind::InternalServerError, "out of script"))
            } else {
                Ok(script.remove(0))
            }
        }
    }

    fn next_url(marker: &str) -> Url {
        Url::parse(&format!("https://example.org/ships?marker={}", marker)).unwrap()
    }

    #[tokio::test]
    async fn test_linked_pages_terminate() {
        // Pages of sizes [3, 3, 0] with next links on the first two.
        let pager = ScriptedPager::new(vec![
            Collection::with_next(ships(&["a", "b", "c"]), Some(next_url("c"))),
            Collection::with_next(ships(&["d", "e", "f"]), Some(next_url("f"))),
            Collection::new(Vec::new()),
        ]);

        let first = Page::fetch_first(pager, None, None).await.unwrap();
        assert_eq!(first.items().len(), 3);
        assert!(first.has_next());

        let second = first.next_page().await.unwrap().unwrap();
        assert_eq!(second.items().len(), 3);
        assert!(second.has_next());

        let third = second.next_page().await.unwrap().unwrap();
        assert!(third.items().is_empty());
        assert!(!third.has_next());

        let end = third.next_page().await.unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_link_cursor_used_when_present() {
        let pager = ScriptedPager::new(vec![
            Collection::with_next(ships(&["a"]), Some(next_url("a"))),
            Collection::new(Vec::new()),
        ]);

        let first = Page::fetch_first(pager, None, None).await.unwrap();
        assert_eq!(
            first.next.as_ref().unwrap().cursor,
            Cursor::Link(next_url("a"))
        );
        let second = first.next_page().await.unwrap().unwrap();
        assert!(second.items().is_empty());
    }

    #[tokio::test]
    async fn test_marker_derived_from_last_item() {
        // No explicit links: continuation must carry the last item's ID.
        let pager = ScriptedPager::new(vec![
            Collection::new(ships(&["a", "b", "c"])),
            Collection::new(Vec::new()),
        ]);

        let first = Page::fetch_first(pager, None, None).await.unwrap();
        assert!(first.has_next());
        let second = first.next_page().await.unwrap().unwrap();
        assert!(!second.has_next());
        let end = second.next_page().await.unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_cursor_sequence() {
        let pager = ScriptedPager::new(vec![
            Collection::new(ships(&["a", "b", "c"])),
            Collection::new(Vec::new()),
        ]);
        // Keep a handle to inspect recorded cursors after the pages are gone.
        let pager = std::sync::Arc::new(pager);

        let first = Page::fetch_first(std::sync::Arc::clone(&pager), None, None)
            .await
            .unwrap();
        let _ = first.next_page().await.unwrap().unwrap();

        let cursors = pager.cursors.lock().unwrap();
        assert_eq!(
            *cursors,
            vec![Cursor::Start, Cursor::Marker("c".to_string())]
        );
    }

    #[tokio::test]
    async fn test_starting_with_marker() {
        let pager = std::sync::Arc::new(ScriptedPager::new(vec![Collection::new(Vec::new())]));
        let page = Page::fetch_first(std::sync::Arc::clone(&pager), Some(10), Some("x".to_string()))
            .await
            .unwrap();
        assert!(!page.has_next());
        assert_eq!(
            *pager.cursors.lock().unwrap(),
            vec![Cursor::Marker("x".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let pager = ScriptedPager::new(vec![Collection::new(ships(&["a"]))]);
        let first = Page::fetch_first(pager, None, None).await.unwrap();
        // The script is exhausted, so the continuation fails.
        let err = first.next_page().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
    }

    #[cfg(feature = "stream")]
    #[tokio::test]
    async fn test_into_stream() {
        use futures::pin_mut;
        use futures::stream::TryStreamExt;

        let pager = ScriptedPager::new(vec![
            Collection::new(ships(&["a", "b"])),
            Collection::new(ships(&["c"])),
            Collection::new(Vec::new()),
        ]);

        let first = Page::fetch_first(pager, None, None).await.unwrap();
        let stream = first.into_stream();
        pin_mut!(stream);

        let mut seen = Vec::new();
        while let Some(ship) = stream.try_next().await.unwrap() {
            seen.push(ship.id);
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
    }
}
