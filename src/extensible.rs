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

//! Extensible enumerations for server-defined string values.
//!
//! Cloud services routinely grow new status strings without a version bump,
//! so a closed Rust enumeration would break on the first unknown value.
//! [EnumRegistry](struct.EnumRegistry.html) interns every distinct name
//! (ignoring ASCII case) into a singleton [EnumValue](struct.EnumValue.html),
//! so that values can be compared cheaply while unknown names are still
//! accepted.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Serialize, Serializer};

use super::{Error, ErrorKind};

/// A kind of an extensible enumeration, used as a marker for
/// [EnumValue](struct.EnumValue.html).
///
/// Kinds may pre-seed the registry with well-known names, fixing their
/// canonical casing.
pub trait EnumKind: 'static {
    /// Well-known names of this kind.
    fn known_names() -> &'static [&'static str] {
        &[]
    }
}

/// A value of an extensible enumeration of the kind `K`.
///
/// Values are only created through an [EnumRegistry](struct.EnumRegistry.html)
/// and share the underlying name with every other value interned from the
/// same name (in any casing). Comparison ignores ASCII case.
pub struct EnumValue<K> {
    name: Arc<str>,
    _kind: PhantomData<K>,
}

impl<K> EnumValue<K> {
    /// The canonical name of the value.
    ///
    /// The canonical casing is the one the name was first interned with.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether two values are backed by the same interned name.
    ///
    /// This is always true for equal values obtained from the same registry.
    #[inline]
    pub fn same_instance(&self, other: &EnumValue<K>) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }
}

impl<K> Clone for EnumValue<K> {
    fn clone(&self) -> EnumValue<K> {
        EnumValue {
            name: Arc::clone(&self.name),
            _kind: PhantomData,
        }
    }
}

impl<K> fmt::Debug for EnumValue<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("EnumValue").field(&self.name).finish()
    }
}

impl<K> fmt::Display for EnumValue<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl<K> AsRef<str> for EnumValue<K> {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl<K> PartialEq for EnumValue<K> {
    fn eq(&self, other: &EnumValue<K>) -> bool {
        Arc::ptr_eq(&self.name, &other.name) || self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl<K> Eq for EnumValue<K> {}

impl<K> PartialEq<str> for EnumValue<K> {
    fn eq(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }
}

impl<K> Hash for EnumValue<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.to_ascii_lowercase().hash(state);
    }
}

impl<K> Serialize for EnumValue<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.name)
    }
}

/// A registry interning values of the extensible enumeration `K`.
///
/// The registry is the only source of [EnumValue](struct.EnumValue.html)
/// instances. It is normally owned by a service handle rather than shared
/// process-wide, so its growth is bounded by the lifetime of the handle.
/// Entries are added on first lookup and never removed.
#[derive(Debug)]
pub struct EnumRegistry<K> {
    entries: RwLock<HashMap<String, EnumValue<K>>>,
}

// A poisoned lock only means another thread panicked mid-insert; the map
// itself cannot be left in an inconsistent state by the code below.
fn read_entries<K>(
    entries: &RwLock<HashMap<String, EnumValue<K>>>,
) -> RwLockReadGuard<'_, HashMap<String, EnumValue<K>>> {
    match entries.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn write_entries<K>(
    entries: &RwLock<HashMap<String, EnumValue<K>>>,
) -> RwLockWriteGuard<'_, HashMap<String, EnumValue<K>>> {
    match entries.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<K: EnumKind> EnumRegistry<K> {
    /// Create a registry pre-seeded with the kind's well-known names.
    pub fn new() -> EnumRegistry<K> {
        let mut entries = HashMap::new();
        for name in K::known_names() {
            let value = EnumValue {
                name: Arc::from(*name),
                _kind: PhantomData,
            };
            let _ = entries.insert(name.to_lowercase(), value);
        }
        EnumRegistry {
            entries: RwLock::new(entries),
        }
    }

    /// Look up a value by name, interning it on first use.
    ///
    /// Look-up ignores ASCII case; all spellings of a name resolve to the
    /// same underlying instance. Fails with `InvalidInput` if the name is
    /// empty.
    pub fn from_name(&self, name: &str) -> Result<EnumValue<K>, Error> {
        if name.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Enumeration values cannot be empty",
            ));
        }

        let key = name.to_lowercase();
        if let Some(existing) = read_entries(&self.entries).get(&key) {
            return Ok(existing.clone());
        }

        let mut entries = write_entries(&self.entries);
        // Another thread may have interned the name while we were waiting for
        // the write lock.
        if let Some(existing) = entries.get(&key) {
            return Ok(existing.clone());
        }

        let value = EnumValue {
            name: Arc::from(name),
            _kind: PhantomData,
        };
        let _ = entries.insert(key, value.clone());
        Ok(value)
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        read_entries(&self.entries).len()
    }

    /// Whether the registry contains no names.
    pub fn is_empty(&self) -> bool {
        read_entries(&self.entries).is_empty()
    }
}

impl<K: EnumKind> Default for EnumRegistry<K> {
    fn default() -> EnumRegistry<K> {
        EnumRegistry::new()
    }
}
