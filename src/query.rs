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

//! Sparse query strings for list operations.

use std::borrow::Cow;
use std::ops::{Deref, DerefMut};

use serde::ser::{Error as SerError, SerializeSeq};
use serde::{Serialize, Serializer};

/// An item in a query.
pub trait QueryItem {
    /// Represent the item for serialization into a query.
    ///
    /// The first item of the resulting tuple is a key, the second - its value.
    fn query_item(&self) -> Result<(&str, Cow<str>), crate::Error>;
}

/// A helper for queries.
///
/// The type `T` must implement [QueryItem](trait.QueryItem.html).
///
/// ```rust
/// use std::borrow::Cow;
/// use oscloud::{Error, Query, QueryItem};
///
/// #[derive(Debug)]
/// enum StackFilter {
///     Name(String),
///     Status(String),
///     ShowDeleted(bool),
/// }
///
/// impl QueryItem for StackFilter {
///     fn query_item(&self) -> Result<(&str, Cow<str>), Error> {
///         Ok(match self {
///             StackFilter::Name(s) => ("name", Cow::Borrowed(s)),
///             StackFilter::Status(s) => ("status", Cow::Borrowed(s)),
///             StackFilter::ShowDeleted(b) => ("show_deleted", Cow::Owned(b.to_string())),
///         })
///     }
/// }
///
/// let query = Query::default()
///     .with(StackFilter::Status("CREATE_COMPLETE".into()))
///     .with(StackFilter::ShowDeleted(false));
/// let query_string = serde_urlencoded::to_string(query).expect("invalid query");
/// assert_eq!(&query_string, "status=CREATE_COMPLETE&show_deleted=false");
/// ```
///
/// `Query` helps avoiding creating very large structures when only few query
/// items are normally used.
#[derive(Debug, Clone)]
pub struct Query<T>(pub Vec<T>);

impl<T> Default for Query<T> {
    fn default() -> Query<T> {
        Query(Vec::new())
    }
}

impl<T> Query<T> {
    /// Add a query item.
    #[inline]
    pub fn with(mut self, item: T) -> Self {
        self.0.push(item);
        self
    }
}

impl<T> Deref for Query<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> DerefMut for Query<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T> Serialize for Query<T>
where
    T: QueryItem,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for e in &self.0 {
            let item = e.query_item().map_err(SerError::custom)?;
            seq.serialize_element(&item)?;
        }
        seq.end()
    }
}

#[cfg(test)]
pub mod test {
    use std::borrow::Cow;

    use super::{Query, QueryItem};
    use crate::Error;

    #[derive(Debug)]
    enum MyQueryItem {
        Foo(String),
        Bar(bool),
    }

    impl QueryItem for MyQueryItem {
        fn query_item(&self) -> Result<(&str, Cow<str>), Error> {
            Ok(match self {
                MyQueryItem::Foo(s) => ("foo", Cow::Borrowed(s)),
                MyQueryItem::Bar(b) => ("bar", b.to_string().into()),
            })
        }
    }

    #[test]
    fn test_query() {
        let mut q = Query::default();
        q.push(MyQueryItem::Bar(true));
        q.push(MyQueryItem::Foo("foo1".into()));
        q.push(MyQueryItem::Foo("foo2".into()));
        let s = serde_urlencoded::to_string(q).unwrap();
        assert_eq!(&s, "bar=true&foo=foo1&foo=foo2");
    }

    #[test]
    fn test_query_empty() {
        let q: Query<MyQueryItem> = Query::default();
        let s = serde_urlencoded::to_string(q).unwrap();
        assert_eq!(&s, "");
    }
}
