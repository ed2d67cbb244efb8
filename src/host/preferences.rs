// Navigation preferences (sidebar state)

use crate::host::storage::KeyValueStore;
use std::sync::Arc;

pub const SIDEBAR_COLLAPSED_KEY: &str = "sidebarCollapsed";

#[derive(Clone)]
pub struct NavPreferences {
    store: Arc<dyn KeyValueStore>,
}

impl NavPreferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.store
            .get(SIDEBAR_COLLAPSED_KEY)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) -> anyhow::Result<()> {
        self.store
            .set(SIDEBAR_COLLAPSED_KEY, if collapsed { "true" } else { "false" })
    }

    /// Flip the flag and return the new value.
    pub fn toggle_sidebar(&self) -> anyhow::Result<bool> {
        let next = !self.sidebar_collapsed();
        self.set_sidebar_collapsed(next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::storage::MemoryStore;

    #[test]
    fn defaults_to_expanded_and_toggles() {
        let prefs = NavPreferences::new(Arc::new(MemoryStore::new()));
        assert!(!prefs.sidebar_collapsed());
        assert!(prefs.toggle_sidebar().expect("toggle"));
        assert!(prefs.sidebar_collapsed());
        assert!(!prefs.toggle_sidebar().expect("toggle"));
    }

    #[test]
    fn garbage_value_reads_as_expanded() {
        let store = Arc::new(MemoryStore::new());
        store.set(SIDEBAR_COLLAPSED_KEY, "maybe").expect("set");
        assert!(!NavPreferences::new(store).sidebar_collapsed());
    }
}
