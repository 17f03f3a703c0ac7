use std::{
    collections::HashMap,
    fmt::Debug,
    rc::{Rc, Weak},
};

/// A value stored in a [WeakMap], together with a weak reference to
/// the owner it is associated with.
struct Entry<K: ?Sized, V> {
    owner: Weak<K>,
    value: V,
}

impl<K: ?Sized, V> Entry<K, V> {
    fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

/// Side table which associates values with owner objects, without
/// the owner declaring any storage for them and without extending
/// the owner's lifetime.
///
/// Entries are keyed by the identity (allocation address) of an
/// [Rc]. The map only holds a [Weak] reference to the owner, so once
/// every strong reference to the owner has been dropped, lookups
/// report absence. The values of such dead entries remain in the map
/// until [WeakMap::prune()] removes them. Holding the [Weak] keeps the
/// owner's allocation reserved, so a new owner can never be confused
/// with a dead one that had the same address.
pub struct WeakMap<K: ?Sized, V> {
    entries: HashMap<usize, Entry<K, V>>,
}

fn identity<K: ?Sized>(owner: &Rc<K>) -> usize {
    Rc::as_ptr(owner) as *const () as usize
}

impl<K: ?Sized, V> WeakMap<K, V> {
    /// Create a new, empty [WeakMap].
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Get the value associated with `owner`, if there is one.
    pub fn get(&self, owner: &Rc<K>) -> Option<&V> {
        self.entries
            .get(&identity(owner))
            .filter(|entry| entry.is_alive())
            .map(|entry| &entry.value)
    }

    /// Get a mutable reference to the value associated with `owner`,
    /// if there is one.
    pub fn get_mut(&mut self, owner: &Rc<K>) -> Option<&mut V> {
        self.entries
            .get_mut(&identity(owner))
            .filter(|entry| entry.is_alive())
            .map(|entry| &mut entry.value)
    }

    /// Get the value associated with `owner`, computing and storing it
    /// with `default` if there is none yet. `default` is called at
    /// most once per owner.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, owner: &Rc<K>, default: F) -> &mut V {
        let entry = self
            .entries
            .entry(identity(owner))
            .or_insert_with(|| Entry {
                owner: Rc::downgrade(owner),
                value: default(),
            });
        &mut entry.value
    }

    /// Associate `value` with `owner`, returning the previously
    /// associated value (if any).
    pub fn insert(&mut self, owner: &Rc<K>, value: V) -> Option<V> {
        self.entries
            .insert(
                identity(owner),
                Entry {
                    owner: Rc::downgrade(owner),
                    value,
                },
            )
            .map(|entry| entry.value)
    }

    /// Remove the value associated with `owner`.
    pub fn remove(&mut self, owner: &Rc<K>) -> Option<V> {
        self.entries
            .remove(&identity(owner))
            .map(|entry| entry.value)
    }

    /// Remove every entry whose owner has been dropped, returning the
    /// removed values.
    ///
    /// The values are handed back rather than dropped in place, so that
    /// a caller holding this map behind a [RefCell](std::cell::RefCell)
    /// can release its borrow before running their destructors.
    pub fn prune(&mut self) -> Vec<V> {
        let dead: Vec<usize> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_alive())
            .map(|(key, _)| *key)
            .collect();

        dead.into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .map(|entry| entry.value)
            .collect()
    }

    /// The number of entries whose owner is still alive.
    pub fn len(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: ?Sized, V> Default for WeakMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized, V> Debug for WeakMap<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeakMap{{live: {}, total: {}}}", self.len(), self.entries.len())
    }
}
