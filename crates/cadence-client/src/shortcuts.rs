use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutAction {
    ToggleHelp,
    Refresh,
    FocusSearch,
    CloseDialog,
    NewRule,
    NewWorkflow,
    NewAbTest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortcut {
    pub key: String,
    pub action: ShortcutAction,
    pub description: String,
}

/// Key binding table. The help modal lists it in registration order.
#[derive(Debug, Clone)]
pub struct ShortcutRegistry {
    bindings: Vec<Shortcut>,
}

impl Default for ShortcutRegistry {
    fn default() -> Self {
        let mut reg = Self::empty();
        reg.bind("?", ShortcutAction::ToggleHelp, "Show or hide keyboard shortcuts");
        reg.bind("r", ShortcutAction::Refresh, "Refresh the current view");
        reg.bind("/", ShortcutAction::FocusSearch, "Focus the search box");
        reg.bind("Escape", ShortcutAction::CloseDialog, "Close the open dialog");
        reg.bind("n", ShortcutAction::NewRule, "New automation rule");
        reg.bind("w", ShortcutAction::NewWorkflow, "New workflow");
        reg.bind("t", ShortcutAction::NewAbTest, "New A/B test");
        reg
    }
}

impl ShortcutRegistry {
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Bind `key`, replacing any earlier binding for the same key.
    pub fn bind(&mut self, key: &str, action: ShortcutAction, description: &str) {
        let shortcut = Shortcut {
            key: key.to_string(),
            action,
            description: description.to_string(),
        };
        match self.bindings.iter_mut().find(|b| b.key == key) {
            Some(existing) => *existing = shortcut,
            None => self.bindings.push(shortcut),
        }
    }

    pub fn unbind(&mut self, key: &str) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| b.key != key);
        self.bindings.len() != before
    }

    pub fn lookup(&self, key: &str) -> Option<ShortcutAction> {
        self.bindings.iter().find(|b| b.key == key).map(|b| b.action)
    }

    pub fn bindings(&self) -> &[Shortcut] {
        &self.bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_resolve() {
        let reg = ShortcutRegistry::default();
        assert_eq!(reg.lookup("?"), Some(ShortcutAction::ToggleHelp));
        assert_eq!(reg.lookup("x"), None);
        assert_eq!(reg.bindings()[0].key, "?");
    }

    #[test]
    fn rebinding_replaces_in_place() {
        let mut reg = ShortcutRegistry::default();
        let len = reg.bindings().len();
        reg.bind("r", ShortcutAction::NewRule, "New rule");
        assert_eq!(reg.bindings().len(), len);
        assert_eq!(reg.lookup("r"), Some(ShortcutAction::NewRule));
        assert!(reg.unbind("r"));
        assert!(!reg.unbind("r"));
    }
}
