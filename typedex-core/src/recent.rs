//! Suppression of creatures shown moments ago.

use std::collections::VecDeque;

/// Default number of recently shown names remembered.
pub const DEFAULT_CAPACITY: usize = 3;

/// FIFO window of the last few distinct creature names shown.
///
/// Matching is by name, so two creatures sharing a name suppress each other.
#[derive(Debug, Clone)]
pub struct RecentLookups {
    window: VecDeque<String>,
    capacity: usize,
}

impl Default for RecentLookups {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RecentLookups {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Whether `name` should be shown. A shown name is recorded, evicting the
    /// oldest entry when the window is full; a suppressed one is not.
    pub fn should_show(&mut self, name: &str) -> bool {
        if self.window.iter().any(|n| n == name) {
            return false;
        }
        if self.capacity == 0 {
            return true;
        }
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(name.to_string());
        true
    }

    /// Names in the window, oldest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.window.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
