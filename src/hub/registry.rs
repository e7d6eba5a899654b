//! Component registry keyed by `(dimension, name)`.
//!
//! A dimension groups components of one kind (e.g. `tool_manager`). Values
//! are stored type-erased; callers downcast with [`Registry::get`].

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::{FoundationError, Result};

/// Key for identifying a unique registry entry.
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct EntryKey {
    pub dimension: String,
    pub name: String,
}

impl EntryKey {
    pub fn new(dimension: &str, name: &str) -> Self {
        Self {
            dimension: dimension.to_string(),
            name: name.to_string(),
        }
    }
}

/// A registered component.
#[derive(Clone)]
pub struct RegistryEntry {
    pub name: String,
    pub dimension: String,
    pub value: Arc<dyn Any + Send + Sync>,
    pub metadata: BTreeMap<String, String>,
    pub aliases: Vec<String>,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .field("dimension", &self.dimension)
            .field("metadata", &self.metadata)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<EntryKey, RegistryEntry>,
    /// alias key -> canonical name
    aliases: HashMap<EntryKey, String>,
}

/// Registration request.
pub struct Registration<T> {
    pub name: String,
    pub dimension: String,
    pub value: T,
    pub metadata: BTreeMap<String, String>,
    pub aliases: Vec<String>,
    /// Overwrite an existing entry instead of failing
    pub replace: bool,
}

impl<T> Registration<T> {
    pub fn new(dimension: &str, name: &str, value: T) -> Self {
        Self {
            name: name.to_string(),
            dimension: dimension.to_string(),
            value,
            metadata: BTreeMap::new(),
            aliases: Vec::new(),
            replace: false,
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }
}

/// Thread-safe component registry.
#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component.
    ///
    /// Fails with [`FoundationError::AlreadyExists`] if the name or one of the
    /// aliases is taken in the dimension, unless `replace` is set. A replacing
    /// registration takes over names and aliases from their previous owners;
    /// an alias equal to another entry's name is always rejected.
    pub fn register<T: Any + Send + Sync>(&self, registration: Registration<T>) -> Result<()> {
        let Registration {
            name,
            dimension,
            value,
            metadata,
            aliases,
            replace,
        } = registration;

        if name.is_empty() {
            return Err(FoundationError::Validation(
                "component name cannot be empty".into(),
            ));
        }

        let mut inner = self.lock();
        let key = EntryKey::new(&dimension, &name);

        if !replace && (inner.entries.contains_key(&key) || inner.aliases.contains_key(&key)) {
            return Err(FoundationError::AlreadyExists(format!("{dimension}/{name}")));
        }
        for alias in &aliases {
            let alias_key = EntryKey::new(&dimension, alias);
            // Lookups resolve aliases first, so an alias may not reuse another entry's name.
            let names_other_entry = alias_key != key && inner.entries.contains_key(&alias_key);
            let owned_elsewhere = inner
                .aliases
                .get(&alias_key)
                .is_some_and(|owner| *owner != name);
            if names_other_entry || (!replace && owned_elsewhere) {
                return Err(FoundationError::AlreadyExists(format!(
                    "{dimension}/{alias} (alias)"
                )));
            }
        }

        if let Some(old) = inner.entries.remove(&key) {
            for alias in old.aliases {
                inner.aliases.remove(&EntryKey::new(&dimension, &alias));
            }
        }
        // Names and aliases taken over from other entries leave their alias lists.
        for taken in std::iter::once(&name).chain(aliases.iter()) {
            let taken_key = EntryKey::new(&dimension, taken);
            if let Some(owner) = inner.aliases.remove(&taken_key) {
                if let Some(entry) = inner.entries.get_mut(&EntryKey::new(&dimension, &owner)) {
                    entry.aliases.retain(|alias| alias != taken);
                }
            }
        }
        for alias in &aliases {
            inner
                .aliases
                .insert(EntryKey::new(&dimension, alias), name.clone());
        }

        tracing::debug!(dimension = %dimension, name = %name, "Registered component");
        inner.entries.insert(
            key,
            RegistryEntry {
                name,
                dimension,
                value: Arc::new(value),
                metadata,
                aliases,
            },
        );
        Ok(())
    }

    /// Look up an entry by name or alias.
    pub fn get_entry(&self, dimension: &str, name: &str) -> Option<RegistryEntry> {
        let inner = self.lock();
        let key = EntryKey::new(dimension, name);
        let key = match inner.aliases.get(&key) {
            Some(canonical) => EntryKey::new(dimension, canonical),
            None => key,
        };
        inner.entries.get(&key).cloned()
    }

    /// Look up a value by name or alias and downcast it to `T`.
    pub fn get<T: Any + Send + Sync>(&self, dimension: &str, name: &str) -> Option<Arc<T>> {
        self.get_entry(dimension, name)
            .and_then(|entry| entry.value.downcast::<T>().ok())
    }

    /// Sorted names registered in a dimension.
    pub fn list_dimension(&self, dimension: &str) -> Vec<String> {
        let inner = self.lock();
        let mut names: Vec<String> = inner
            .entries
            .keys()
            .filter(|key| key.dimension == dimension)
            .map(|key| key.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Remove an entry and its aliases. Returns true if it existed.
    pub fn remove(&self, dimension: &str, name: &str) -> bool {
        let mut inner = self.lock();
        match inner.entries.remove(&EntryKey::new(dimension, name)) {
            Some(entry) => {
                for alias in entry.aliases {
                    inner.aliases.remove(&EntryKey::new(dimension, &alias));
                }
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.aliases.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let registry = Registry::new();
        registry
            .register(Registration::new("command", "deploy", 42u32).with_metadata("group", "ops"))
            .unwrap();

        assert_eq!(*registry.get::<u32>("command", "deploy").unwrap(), 42);
        assert!(registry.get::<String>("command", "deploy").is_none());
        assert_eq!(
            registry.get_entry("command", "deploy").unwrap().metadata["group"],
            "ops"
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected_unless_replacing() {
        let registry = Registry::new();
        registry.register(Registration::new("d", "x", 1u8)).unwrap();
        assert!(matches!(
            registry.register(Registration::new("d", "x", 2u8)),
            Err(FoundationError::AlreadyExists(_))
        ));
        registry
            .register(Registration::new("d", "x", 3u8).replacing())
            .unwrap();
        assert_eq!(*registry.get::<u8>("d", "x").unwrap(), 3);
    }

    #[test]
    fn test_same_name_in_different_dimensions() {
        let registry = Registry::new();
        registry.register(Registration::new("a", "x", 1u8)).unwrap();
        registry.register(Registration::new("b", "x", 2u8)).unwrap();
        assert_eq!(registry.list_dimension("a"), vec!["x"]);
        assert_eq!(registry.list_dimension("b"), vec!["x"]);
    }

    #[test]
    fn test_aliases_resolve_and_are_removed() {
        let registry = Registry::new();
        registry
            .register(Registration::new("tool", "terraform", 1u8).with_aliases(["tf"]))
            .unwrap();
        assert_eq!(registry.get_entry("tool", "tf").unwrap().name, "terraform");

        // Alias collides with an existing alias
        assert!(registry
            .register(Registration::new("tool", "tofu", 2u8).with_aliases(["tf"]))
            .is_err());

        assert!(registry.remove("tool", "terraform"));
        assert!(registry.get_entry("tool", "tf").is_none());
        assert!(!registry.remove("tool", "terraform"));
    }

    #[test]
    fn test_replacing_moves_alias_between_entries() {
        let registry = Registry::new();
        registry
            .register(Registration::new("tool", "terraform", 1u8).with_aliases(["tf"]))
            .unwrap();
        registry
            .register(
                Registration::new("tool", "tofu", 2u8)
                    .with_aliases(["tf"])
                    .replacing(),
            )
            .unwrap();

        assert_eq!(registry.get_entry("tool", "tf").unwrap().name, "tofu");
        assert!(registry.get_entry("tool", "terraform").unwrap().aliases.is_empty());

        assert!(registry.remove("tool", "terraform"));
        assert_eq!(registry.get_entry("tool", "tf").unwrap().name, "tofu");
    }

    #[test]
    fn test_replacing_name_that_was_an_alias() {
        let registry = Registry::new();
        registry
            .register(Registration::new("tool", "terraform", 1u8).with_aliases(["tf"]))
            .unwrap();
        registry
            .register(Registration::new("tool", "tf", 2u8).replacing())
            .unwrap();

        assert_eq!(*registry.get::<u8>("tool", "tf").unwrap(), 2);
        assert!(registry.get_entry("tool", "terraform").unwrap().aliases.is_empty());
    }

    #[test]
    fn test_alias_cannot_shadow_entry_name() {
        let registry = Registry::new();
        registry.register(Registration::new("tool", "terraform", 1u8)).unwrap();
        assert!(matches!(
            registry.register(
                Registration::new("tool", "tofu", 2u8)
                    .with_aliases(["terraform"])
                    .replacing()
            ),
            Err(FoundationError::AlreadyExists(_))
        ));
        assert_eq!(registry.get_entry("tool", "terraform").unwrap().name, "terraform");
    }

    #[test]
    fn test_empty_name_rejected() {
        let registry = Registry::new();
        assert!(registry.register(Registration::new("d", "", 1u8)).is_err());
        assert!(registry.is_empty());
    }
}
