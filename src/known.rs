//! The injected dictionary of class names that already exist in the API.

use crate::value::{Key, Value};
use std::collections::BTreeSet;

/// Read-only set of known class names, consulted by the inference chain.
#[derive(Debug, Clone, Default)]
pub struct KnownClasses {
    names: BTreeSet<String>,
}

impl KnownClasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }

    /// Add a class list: one name per line, `#` starts a comment.
    pub fn extend_from_list(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if !line.is_empty() {
                self.insert(line);
            }
        }
    }

    /// Add every class declared in a description document (either shape).
    pub fn extend_from_document(&mut self, doc: &Value) {
        let Some(root) = doc.as_table() else {
            return;
        };
        let classes = match root.get("Classes").and_then(Value::as_table) {
            Some(classes) => classes,
            None => root,
        };
        for (key, value) in classes.iter() {
            if let (Key::Name(name), Value::Table(_)) = (key, value) {
                self.insert(name.clone());
            }
        }
    }
}

impl<S: Into<String>> FromIterator<S> for KnownClasses {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut known = KnownClasses::new();
        for name in iter {
            known.insert(name);
        }
        known
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Table;

    #[test]
    fn list_skips_comments_and_blanks() {
        let mut known = KnownClasses::new();
        known.extend_from_list("cPlayer\n# comment\n\n  cWorld  # trailing\n");
        assert_eq!(known.len(), 2);
        assert!(known.contains("cPlayer"));
        assert!(known.contains("cWorld"));
    }

    #[test]
    fn collects_classes_from_wrapped_document() {
        let mut classes = Table::new();
        classes.insert("cEntity", Table::new());
        let mut root = Table::new();
        root.insert("Classes", classes);
        root.insert("ExtraPages", Table::new());

        let mut known = KnownClasses::new();
        known.extend_from_document(&Value::Table(root));
        assert!(known.contains("cEntity"));
        assert!(!known.contains("ExtraPages"));
    }

    #[test]
    fn collects_classes_from_bare_mapping() {
        let mut root = Table::new();
        root.insert("cRoot", Table::new());
        root.insert("Note", "not a class");

        let mut known = KnownClasses::new();
        known.extend_from_document(&Value::Table(root));
        assert!(known.contains("cRoot"));
        assert!(!known.contains("Note"));
    }
}
