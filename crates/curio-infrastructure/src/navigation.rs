//! Navigation state held in memory.

use curio_core::route::Navigation;
use std::sync::Mutex;

/// Navigation holder for front ends without a browser history.
///
/// Records every in-place replacement so callers can observe rewrites.
#[derive(Debug)]
pub struct MemoryNavigation {
    location: Mutex<String>,
    replacements: Mutex<Vec<String>>,
}

impl MemoryNavigation {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            replacements: Mutex::new(Vec::new()),
        }
    }

    /// Locations written through `replace_location`, oldest first.
    pub fn replacements(&self) -> Vec<String> {
        self.replacements
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl Navigation for MemoryNavigation {
    fn current_location(&self) -> String {
        self.location
            .lock()
            .map(|location| location.clone())
            .unwrap_or_default()
    }

    fn replace_location(&self, location: &str) {
        if let Ok(mut current) = self.location.lock() {
            *current = location.to_string();
        }
        if let Ok(mut history) = self.replacements.lock() {
            history.push(location.to_string());
        }
    }
}
