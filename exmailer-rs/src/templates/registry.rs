//! Named layout registry
//!
//! Keys are case-insensitive. The process-wide instance returned by
//! [`TemplateRegistry::global`] is created on first use with the built-in
//! layouts and lives until the process exits.

use crate::error::{ExMailerError, Result};
use crate::templates::builtin::{DEFAULT_LAYOUT, MINIMAL_LAYOUT, PERSIAN_LAYOUT};
use crate::templates::types::{
    is_plain_name, normalize_name, Layout, TemplateSelector, WellKnownTemplate,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::debug;

static GLOBAL: OnceLock<Arc<TemplateRegistry>> = OnceLock::new();

/// Maps lowercase names to layouts
#[derive(Debug)]
pub struct TemplateRegistry {
    layouts: Mutex<HashMap<String, Arc<Layout>>>,
}

impl TemplateRegistry {
    /// Registry without any layouts
    pub fn empty() -> Self {
        Self {
            layouts: Mutex::new(HashMap::new()),
        }
    }

    /// Registry holding the default, Persian and minimal layouts
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        {
            let mut layouts = registry.lock();
            for (known, html) in [
                (WellKnownTemplate::Default, DEFAULT_LAYOUT),
                (WellKnownTemplate::Persian, PERSIAN_LAYOUT),
                (WellKnownTemplate::Minimal, MINIMAL_LAYOUT),
            ] {
                let synonyms = known.synonyms();
                let layout = Arc::new(Layout::builtin(synonyms[0], html));
                for name in synonyms {
                    layouts.insert((*name).to_string(), Arc::clone(&layout));
                }
            }
        }
        registry
    }

    /// The process-wide registry
    pub fn global() -> Arc<TemplateRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_builtins())))
    }

    /// Insert or replace the layout stored under `name`
    pub fn register(&self, name: &str, html: impl Into<String>) -> Result<Arc<Layout>> {
        let key = normalize_name(name);
        if key.is_empty() || is_plain_name(&key) {
            return Err(ExMailerError::ReservedTemplateName(name.to_string()));
        }

        let layout = Arc::new(Layout::new(key.clone(), html)?);
        let replaced = self
            .lock()
            .insert(key.clone(), Arc::clone(&layout))
            .is_some();

        debug!("Registered template '{}' (replaced: {})", key, replaced);
        Ok(layout)
    }

    /// Layout for `selector`, `None` when the body should pass through unwrapped
    pub fn resolve(&self, selector: Option<&TemplateSelector>) -> Result<Option<Arc<Layout>>> {
        let Some(key) = selector.and_then(TemplateSelector::lookup_key) else {
            return Ok(None);
        };

        let layouts = self.lock();
        match layouts.get(&key) {
            Some(layout) => Ok(Some(Arc::clone(layout))),
            None => {
                let mut available: Vec<String> = layouts.keys().cloned().collect();
                available.sort();
                Err(ExMailerError::TemplateNotFound {
                    name: selector.map(ToString::to_string).unwrap_or(key),
                    available,
                })
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(&normalize_name(name))
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Layout>>> {
        self.layouts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Register a layout on the process-wide registry
///
/// The layout must contain exactly one `{body}` placeholder. Registering the
/// same name twice keeps the last layout.
pub fn register_custom_template(name: &str, html: impl Into<String>) -> Result<Arc<Layout>> {
    TemplateRegistry::global().register(name, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::types::BODY_MARKER;

    #[test]
    fn test_builtins_have_single_marker() {
        for html in [DEFAULT_LAYOUT, PERSIAN_LAYOUT, MINIMAL_LAYOUT] {
            assert_eq!(html.matches(BODY_MARKER).count(), 1);
        }
    }

    #[test]
    fn test_persian_synonyms_share_layout() {
        let registry = TemplateRegistry::with_builtins();
        let resolve = |name: &str| {
            registry
                .resolve(Some(&TemplateSelector::from(name)))
                .unwrap()
                .unwrap()
        };

        let persian = resolve("persian");
        assert!(Arc::ptr_eq(&persian, &resolve("farsi")));
        assert!(Arc::ptr_eq(&persian, &resolve("RTL")));
        assert!(Arc::ptr_eq(&persian, &resolve("fa")));
        assert!(persian.html().contains("dir=\"rtl\""));

        let default = registry
            .resolve(Some(&WellKnownTemplate::Default.into()))
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&default, &resolve("English")));
    }

    #[test]
    fn test_plain_resolves_to_nothing() {
        let registry = TemplateRegistry::with_builtins();

        assert!(registry.resolve(None).unwrap().is_none());
        assert!(registry
            .resolve(Some(&TemplateSelector::plain()))
            .unwrap()
            .is_none());
        assert!(registry
            .resolve(Some(&TemplateSelector::Named("None".to_string())))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_register_is_case_insensitive() {
        let registry = TemplateRegistry::empty();
        let registered = registry.register("x", "<p>{body}</p>").unwrap();

        let resolved = registry
            .resolve(Some(&TemplateSelector::from("X")))
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&registered, &resolved));
        assert!(registry.contains(" X "));
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = TemplateRegistry::empty();
        registry.register("Letter", "<p>{body}</p>").unwrap();
        registry.register("LETTER", "<div>{body}</div>").unwrap();

        let layout = registry
            .resolve(Some(&TemplateSelector::from("letter")))
            .unwrap()
            .unwrap();
        assert_eq!(layout.html(), "<div>{body}</div>");
        assert_eq!(registry.names(), vec!["letter"]);
    }

    #[test]
    fn test_register_rejects_bad_layouts() {
        let registry = TemplateRegistry::empty();

        let err = registry.register("broken", "<p>no marker</p>").unwrap_err();
        assert!(matches!(err, ExMailerError::InvalidLayout { markers: 0, .. }));
        assert!(!registry.contains("broken"));

        let err = registry
            .register("double", "{body}{body}")
            .unwrap_err();
        assert!(matches!(err, ExMailerError::InvalidLayout { markers: 2, .. }));
    }

    #[test]
    fn test_register_rejects_reserved_names() {
        let registry = TemplateRegistry::empty();

        for name in ["plain", "NONE", "  "] {
            let err = registry.register(name, "{body}").unwrap_err();
            assert!(matches!(err, ExMailerError::ReservedTemplateName(_)));
        }
    }

    #[test]
    fn test_unknown_template_names_available() {
        let registry = TemplateRegistry::with_builtins();

        let err = registry
            .resolve(Some(&TemplateSelector::from("Newsletter")))
            .unwrap_err();
        match err {
            ExMailerError::TemplateNotFound { name, available } => {
                assert_eq!(name, "Newsletter");
                assert!(available.contains(&"persian".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_global_registration_visible() {
        register_custom_template("registry_global_banner", "<main>{body}</main>").unwrap();

        assert!(TemplateRegistry::global().contains("Registry_Global_Banner"));
        assert!(TemplateRegistry::global().contains("persian"));
    }
}
