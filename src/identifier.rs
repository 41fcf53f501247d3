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

//! Strongly typed resource identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;

use serde::de::{Error as DeserError, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{Error, ErrorKind};

/// A kind of a resource, used as a marker for [ResourceId](struct.ResourceId.html).
///
/// The only thing a kind defines is whether identifiers of this kind compare
/// case-insensitively. Kinds are normally uninhabited enumerations:
///
/// ```rust
/// use oscloud::{ResourceId, ResourceKind};
///
/// #[derive(Debug, Clone, Copy)]
/// enum ImageNameKind {}
///
/// impl ResourceKind for ImageNameKind {
///     const CASE_INSENSITIVE: bool = false;
/// }
///
/// type ImageName = ResourceId<ImageNameKind>;
///
/// let name = ImageName::new("cirros-0.6.2").unwrap();
/// assert_eq!(name.value(), "cirros-0.6.2");
/// ```
pub trait ResourceKind {
    /// Whether identifiers of this kind are compared ignoring ASCII case.
    const CASE_INSENSITIVE: bool = false;
}

/// An identifier of a resource of the kind `K`.
///
/// A thin wrapper around a non-empty string that prevents mixing up
/// identifiers of different resources. Equality and hashing follow the case
/// rule of the kind. The identifier is immutable once constructed.
pub struct ResourceId<K> {
    value: String,
    _kind: PhantomData<K>,
}

impl<K> ResourceId<K> {
    /// Create an identifier from a string.
    ///
    /// Fails with `InvalidInput` if the value is empty.
    pub fn new<S: Into<String>>(value: S) -> Result<ResourceId<K>, Error> {
        let value = value.into();
        if value.is_empty() {
            Err(Error::new(
                ErrorKind::InvalidInput,
                "Resource identifiers cannot be empty",
            ))
        } else {
            Ok(ResourceId {
                value,
                _kind: PhantomData,
            })
        }
    }

    /// The underlying string value.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consume the identifier, returning the underlying string.
    #[inline]
    pub fn into_value(self) -> String {
        self.value
    }
}

impl<K> Clone for ResourceId<K> {
    fn clone(&self) -> ResourceId<K> {
        ResourceId {
            value: self.value.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K> fmt::Debug for ResourceId<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("ResourceId").field(&self.value).finish()
    }
}

impl<K> fmt::Display for ResourceId<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<K> AsRef<str> for ResourceId<K> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<K: ResourceKind> PartialEq for ResourceId<K> {
    fn eq(&self, other: &ResourceId<K>) -> bool {
        if K::CASE_INSENSITIVE {
            self.value.eq_ignore_ascii_case(&other.value)
        } else {
            self.value == other.value
        }
    }
}

impl<K: ResourceKind> Eq for ResourceId<K> {}

impl<K: ResourceKind> Hash for ResourceId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if K::CASE_INSENSITIVE {
            self.value.to_ascii_lowercase().hash(state);
        } else {
            self.value.hash(state);
        }
    }
}

impl<K> FromStr for ResourceId<K> {
    type Err = Error;

    fn from_str(s: &str) -> Result<ResourceId<K>, Error> {
        ResourceId::new(s)
    }
}

impl<K> Serialize for ResourceId<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

struct ResourceIdVisitor<K> {
    _kind: PhantomData<K>,
}

impl<'de, K> Visitor<'de> for ResourceIdVisitor<K> {
    type Value = ResourceId<K>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a non-empty string")
    }

    fn visit_str<E>(self, value: &str) -> Result<ResourceId<K>, E>
    where
        E: DeserError,
    {
        ResourceId::new(value).map_err(DeserError::custom)
    }
}

impl<'de, K> Deserialize<'de> for ResourceId<K> {
    fn deserialize<D>(deserializer: D) -> Result<ResourceId<K>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(ResourceIdVisitor { _kind: PhantomData })
    }
}

#[cfg(test)]
pub mod test {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::{ResourceId, ResourceKind};
    use crate::ErrorKind;

    #[derive(Debug, Clone, Copy)]
    enum ExactKind {}

    impl ResourceKind for ExactKind {
        const CASE_INSENSITIVE: bool = false;
    }

    #[derive(Debug, Clone, Copy)]
    enum FoldedKind {}

    impl ResourceKind for FoldedKind {
        const CASE_INSENSITIVE: bool = true;
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_new_keeps_value() {
        let id = ResourceId::<ExactKind>::new("teapot-stack").unwrap();
        assert_eq!(id.value(), "teapot-stack");
        assert_eq!(id.to_string(), "teapot-stack");
        assert_eq!(id.into_value(), "teapot-stack");
    }

    #[test]
    fn test_new_empty_fails() {
        let err = ResourceId::<ExactKind>::new("").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_case_sensitive_equality() {
        let one = ResourceId::<ExactKind>::new("Stack").unwrap();
        let two = ResourceId::<ExactKind>::new("stack").unwrap();
        assert_ne!(one, two);
    }

    #[test]
    fn test_case_insensitive_equality() {
        let one = ResourceId::<FoldedKind>::new("Remote.HTTP").unwrap();
        let two = ResourceId::<FoldedKind>::new("remote.http").unwrap();
        assert_eq!(one, two);
        assert_eq!(hash_of(&one), hash_of(&two));
    }

    #[test]
    fn test_serde_round_trip() {
        let id = ResourceId::<ExactKind>::new("abcd-1234").unwrap();
        let ser = serde_json::to_string(&id).unwrap();
        assert_eq!(&ser, "\"abcd-1234\"");
        let de: ResourceId<ExactKind> = serde_json::from_str(&ser).unwrap();
        assert_eq!(de, id);
    }

    #[test]
    fn test_deserialize_empty_fails() {
        let result: Result<ResourceId<ExactKind>, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
