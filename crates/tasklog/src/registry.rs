//! Per-task contextual tags.
//!
//! A [`ContextRegistry`] maps each logical task to its own ordered list of
//! tags. The formatters hold a clone of the registry and render the tags
//! belonging to whichever task emits the record.

use dashmap::DashMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

/// Identity used to isolate tags between concurrently running work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskIdentity {
    /// A tokio task, stable across suspension and worker migration.
    Task(tokio::task::Id),
    /// An OS thread outside any tokio task.
    Thread(ThreadId),
}

impl TaskIdentity {
    /// Identity of the caller: the running tokio task if there is one,
    /// otherwise the current thread.
    #[must_use]
    pub fn current() -> Self {
        match tokio::task::try_id() {
            Some(id) => Self::Task(id),
            None => Self::Thread(std::thread::current().id()),
        }
    }
}

impl fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(id) => write!(f, "task-{id}"),
            Self::Thread(id) => write!(f, "{id:?}"),
        }
    }
}

/// A named value attached to a task's logging context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag name.
    pub name: String,
    /// Tag value. Empty values are kept but never rendered.
    pub value: String,
}

impl Tag {
    /// Whether the tag shows up in rendered output.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        !self.value.is_empty()
    }
}

/// Serializes the rendered tags as a map in insertion order.
#[derive(Debug, Clone, Copy)]
pub struct TagMap<'a>(pub &'a [Tag]);

impl Serialize for TagMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for tag in self.0.iter().filter(|t| t.is_rendered()) {
            map.serialize_entry(&tag.name, &tag.value)?;
        }
        map.end()
    }
}

/// Process-wide store of per-task tags.
///
/// Cloning is cheap and every clone shares the same store, so the handle
/// given to the formatter and the one used by application code agree.
///
/// Tags are never cleared automatically. A task that finishes without
/// calling [`clear`](Self::clear) leaves its entry behind, and work that
/// runs on a reused thread outside a tokio task (a blocking pool thread,
/// for example) sees whatever the previous job on that thread left.
/// Use [`scope`](Self::scope) to tie cleanup to a guard.
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    store: Arc<DashMap<TaskIdentity, Vec<Tag>>>,
}

impl ContextRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value` for the current task.
    ///
    /// An existing tag keeps its position and only has its value replaced.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let mut tags = self.store.entry(TaskIdentity::current()).or_default();

        match tags.iter().position(|t| t.name == name) {
            Some(index) => tags[index].value = value,
            None => tags.push(Tag { name, value }),
        }
    }

    /// All tags of the current task, in insertion order.
    #[must_use]
    pub fn tags(&self) -> Vec<Tag> {
        self.store
            .get(&TaskIdentity::current())
            .map(|tags| tags.value().clone())
            .unwrap_or_default()
    }

    /// Value of a single tag of the current task.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let tags = self.store.get(&TaskIdentity::current())?;
        tags.iter().find(|t| t.name == name).map(|t| t.value.clone())
    }

    /// Remove one tag from the current task, returning its value.
    pub fn remove(&self, name: &str) -> Option<String> {
        let identity = TaskIdentity::current();
        let removed = {
            let mut tags = self.store.get_mut(&identity)?;
            let index = tags.iter().position(|t| t.name == name)?;
            tags.remove(index).value
        };
        self.store.remove_if(&identity, |_, tags| tags.is_empty());
        Some(removed)
    }

    /// Drop every tag of the current task.
    pub fn clear(&self) {
        self.clear_identity(TaskIdentity::current());
    }

    /// Clear the current task's tags when the returned guard is dropped.
    ///
    /// The guard remembers the identity that created it, so dropping it
    /// from a different thread still clears the right entry.
    #[must_use = "tags are cleared as soon as the guard is dropped"]
    pub fn scope(&self) -> TagScope {
        TagScope {
            registry: self.clone(),
            identity: TaskIdentity::current(),
        }
    }

    /// Number of identities currently holding tags.
    #[must_use]
    pub fn identities(&self) -> usize {
        self.store.len()
    }

    /// Append ` [name value]` for each rendered tag of the current task.
    ///
    /// # Errors
    ///
    /// Only propagates errors from the underlying writer.
    pub fn render_plain<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        let Some(tags) = self.store.get(&TaskIdentity::current()) else {
            return Ok(());
        };
        for tag in tags.iter().filter(|t| t.is_rendered()) {
            write!(out, " [{} {}]", tag.name, tag.value)?;
        }
        Ok(())
    }

    fn clear_identity(&self, identity: TaskIdentity) {
        if self.store.remove(&identity).is_some() {
            tracing::trace!(%identity, "cleared context tags");
        }
    }
}

/// Guard returned by [`ContextRegistry::scope`].
#[derive(Debug)]
pub struct TagScope {
    registry: ContextRegistry,
    identity: TaskIdentity,
}

impl TagScope {
    /// Identity whose tags this guard clears.
    #[must_use]
    pub fn identity(&self) -> TaskIdentity {
        self.identity
    }
}

impl Drop for TagScope {
    fn drop(&mut self) {
        self.registry.clear_identity(self.identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn rendered(registry: &ContextRegistry) -> String {
        let mut out = String::new();
        registry.render_plain(&mut out).unwrap();
        out
    }

    #[test]
    fn test_untagged_identity_renders_nothing() {
        let registry = ContextRegistry::new();
        assert!(registry.tags().is_empty());
        assert_eq!(registry.get("missing"), None);
        assert_eq!(rendered(&registry), "");
        assert_eq!(registry.identities(), 0);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let registry = ContextRegistry::new();
        registry.set("a", "1");
        registry.set("b", "x");
        registry.set("a", "2");

        assert_eq!(rendered(&registry), " [a 2] [b x]");
        assert_eq!(registry.get("a").as_deref(), Some("2"));
        assert_eq!(registry.tags().len(), 2);
    }

    #[test]
    fn test_insertion_order() {
        let registry = ContextRegistry::new();
        registry.set("x", "1");
        registry.set("y", "2");
        assert_eq!(rendered(&registry), " [x 1] [y 2]");
    }

    #[test]
    fn test_empty_value_not_rendered() {
        let registry = ContextRegistry::new();
        registry.set("key_a", "value_a");
        registry.set("this_is_empty", "");
        assert_eq!(rendered(&registry), " [key_a value_a]");
        assert_eq!(registry.tags().len(), 2);
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = ContextRegistry::new();
        registry.set("a", "1");
        registry.set("b", "2");

        assert_eq!(registry.remove("a").as_deref(), Some("1"));
        assert_eq!(registry.remove("a"), None);
        assert_eq!(rendered(&registry), " [b 2]");

        assert_eq!(registry.remove("b").as_deref(), Some("2"));
        assert_eq!(registry.identities(), 0);

        registry.set("c", "3");
        registry.clear();
        assert!(registry.tags().is_empty());
        assert_eq!(registry.identities(), 0);
    }

    #[test]
    fn test_scope_clears_on_drop() {
        let registry = ContextRegistry::new();
        {
            let scope = registry.scope();
            assert_eq!(scope.identity(), TaskIdentity::current());
            registry.set("request", "abc");
            assert_eq!(rendered(&registry), " [request abc]");
        }
        assert_eq!(rendered(&registry), "");
        assert_eq!(registry.identities(), 0);
    }

    #[test]
    fn test_clones_share_store() {
        let registry = ContextRegistry::new();
        let formatter_handle = registry.clone();
        registry.set("shared", "yes");
        assert_eq!(rendered(&formatter_handle), " [shared yes]");
    }

    #[test]
    fn test_threads_are_isolated() {
        let registry = ContextRegistry::new();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["first", "second"]
            .into_iter()
            .map(|value| {
                let registry = registry.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    registry.set("func", value);
                    barrier.wait();
                    rendered(&registry)
                })
            })
            .collect();

        let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(outputs, vec![" [func first]", " [func second]"]);
        assert_eq!(registry.identities(), 2);
        assert_eq!(rendered(&registry), "");
    }

    #[test]
    fn test_clear_leaves_other_identities() {
        let registry = ContextRegistry::new();
        registry.set("main", "1");

        let other = registry.clone();
        std::thread::spawn(move || {
            other.set("worker", "2");
            other.clear();
        })
        .join()
        .unwrap();

        assert_eq!(rendered(&registry), " [main 1]");
        assert_eq!(registry.identities(), 1);
    }

    #[tokio::test]
    async fn test_tasks_are_isolated_from_their_thread() {
        let registry = ContextRegistry::new();
        registry.set("outer", "main");

        let inner = registry.clone();
        let seen = tokio::spawn(async move {
            inner.set("inner", "task");
            let mut out = String::new();
            inner.render_plain(&mut out).unwrap();
            out
        })
        .await
        .unwrap();

        assert_eq!(seen, " [inner task]");
        assert_eq!(rendered(&registry), " [outer main]");
    }

    #[test]
    fn test_tag_map_serialization() {
        let tags = vec![
            Tag {
                name: "zeta".to_string(),
                value: "1".to_string(),
            },
            Tag {
                name: "empty".to_string(),
                value: String::new(),
            },
            Tag {
                name: "alpha".to_string(),
                value: "2".to_string(),
            },
        ];
        let json = serde_json::to_string(&TagMap(&tags)).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
    }
}
