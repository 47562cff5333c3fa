//! Identity and environment passed through to behavior functions.
//!
//! The engine never inspects a scope beyond handing it to actions, guards,
//! effects and computed functions.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity/environment capability of one component instance.
///
/// Cloning is cheap; the root node handle is shared.
#[derive(Clone)]
pub struct Scope {
    id: String,
    ids: HashMap<String, String>,
    root: Option<Arc<dyn Any + Send + Sync>>,
}

impl Scope {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ids: HashMap::new(),
            root: None,
        }
    }

    /// A scope with a random instance id.
    pub fn generated() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Override the id of one part of the component.
    pub fn with_id(mut self, part: impl Into<String>, id: impl Into<String>) -> Self {
        self.ids.insert(part.into(), id.into());
        self
    }

    /// Attach the root node lookup handle.
    pub fn with_root_node<N: Any + Send + Sync>(mut self, node: N) -> Self {
        self.root = Some(Arc::new(node));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ids(&self) -> &HashMap<String, String> {
        &self.ids
    }

    /// Overridden id of a part, if any.
    pub fn id_for(&self, part: &str) -> Option<&str> {
        self.ids.get(part).map(String::as_str)
    }

    /// The root node handle, if one of type `N` was attached.
    pub fn root_node<N: Any>(&self) -> Option<&N> {
        self.root.as_deref().and_then(|node| node.downcast_ref::<N>())
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::generated()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("ids", &self.ids)
            .field("root", &self.root.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Document {
        title: &'static str,
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(Scope::generated().id(), Scope::generated().id());
    }

    #[test]
    fn part_ids_can_be_overridden() {
        let scope = Scope::new("tabs-1").with_id("trigger", "custom-trigger");
        assert_eq!(scope.id(), "tabs-1");
        assert_eq!(scope.id_for("trigger"), Some("custom-trigger"));
        assert_eq!(scope.id_for("content"), None);
    }

    #[test]
    fn root_node_downcasts_to_attached_type() {
        let scope = Scope::new("root").with_root_node(Document { title: "main" });
        assert_eq!(scope.root_node::<Document>(), Some(&Document { title: "main" }));
        assert!(scope.root_node::<String>().is_none());

        let shared = scope.clone();
        assert_eq!(shared.root_node::<Document>().map(|d| d.title), Some("main"));
    }
}
