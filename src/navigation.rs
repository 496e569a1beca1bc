//! Navigation boundary.
//!
//! Routing itself belongs to the host. Flows only ask for a route change.

use std::sync::Mutex;

use tracing::info;

pub trait Navigator: Send + Sync {
    fn push(&self, route: &str);

    fn replace(&self, route: &str);

    fn back(&self);
}

/// A route change requested by a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Push(String),
    Replace(String),
    Back,
}

/// Navigator that records and logs every request. Used by the headless
/// binary and tests.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    history: Mutex<Vec<Navigation>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Navigation> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn record(&self, nav: Navigation) {
        info!(navigation = ?nav, "Navigation requested");
        match self.history.lock() {
            Ok(mut h) => h.push(nav),
            Err(poisoned) => poisoned.into_inner().push(nav),
        }
    }
}

impl Navigator for HistoryNavigator {
    fn push(&self, route: &str) {
        self.record(Navigation::Push(route.to_string()));
    }

    fn replace(&self, route: &str) {
        self.record(Navigation::Replace(route.to_string()));
    }

    fn back(&self) {
        self.record(Navigation::Back);
    }
}
