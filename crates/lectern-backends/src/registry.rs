//! Backend registry for looking up renderers by name.

use crate::html5::Html5Backend;
use crate::revealjs::RevealJsBackend;
use crate::traits::{Backend, BackendError};

/// Name of the backend used when neither the document nor the project picks one.
pub const DEFAULT_BACKEND: &str = "revealjs";

/// A registry of rendering backends.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Box<dyn Backend>>,
}

impl BackendRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `revealjs` and `html5` backends.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RevealJsBackend::new()));
        registry.register(Box::new(Html5Backend::new()));
        registry
    }

    /// Add a backend. Later registrations shadow earlier ones with the same name.
    pub fn register(&mut self, backend: Box<dyn Backend>) {
        self.backends.insert(0, backend);
    }

    /// Look up a backend by name or alias, case-insensitively.
    pub fn get(&self, name: &str) -> Result<&dyn Backend, BackendError> {
        let wanted = name.trim().to_ascii_lowercase();

        self.backends
            .iter()
            .find(|b| b.name() == wanted || b.aliases().iter().any(|alias| *alias == wanted))
            .map(|b| b.as_ref())
            .ok_or_else(|| BackendError::Unknown {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    /// Canonical names of all registered backends, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.backends.iter().map(|b| b.name()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_doc::{AttributeSet, Deck};

    struct EchoBackend;

    impl Backend for EchoBackend {
        fn name(&self) -> &'static str {
            "revealjs"
        }

        fn default_attributes(&self) -> AttributeSet {
            AttributeSet::new()
        }

        fn render(&self, _deck: &Deck, _attributes: &AttributeSet) -> Result<String, BackendError> {
            Ok("echo".to_string())
        }
    }

    #[test]
    fn finds_backends_by_name_and_alias() {
        let registry = BackendRegistry::with_defaults();

        assert_eq!(registry.get("revealjs").unwrap().name(), "revealjs");
        assert_eq!(registry.get("Reveal.js").unwrap().name(), "revealjs");
        assert_eq!(registry.get("html").unwrap().name(), "html5");
        assert_eq!(registry.names(), vec!["html5", "revealjs"]);
    }

    #[test]
    fn unknown_backend_lists_available() {
        let registry = BackendRegistry::with_defaults();

        let err = match registry.get("pdf") {
            Err(e) => e.to_string(),
            Ok(_) => panic!("pdf backend should not exist"),
        };

        assert!(err.contains("pdf"));
        assert!(err.contains("html5, revealjs"));
    }

    #[test]
    fn later_registration_shadows() {
        let mut registry = BackendRegistry::with_defaults();
        registry.register(Box::new(EchoBackend));

        let backend = registry.get("revealjs").unwrap();
        let out = backend.render(&Deck::default(), &AttributeSet::new()).unwrap();

        assert_eq!(out, "echo");
        assert!(DEFAULT_BACKEND == "revealjs" && registry.contains(DEFAULT_BACKEND));
    }
}
