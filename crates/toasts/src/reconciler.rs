//! Content-load reconciliation of toast elements

use thiserror::Error;
use tracing::{debug, warn};

/// Selector matching toast elements
pub const TOAST_SELECTOR: &str = ".toast";

/// Class marking a dismissed toast
pub const HIDE_CLASS: &str = "hide";

/// Attribute set on toasts that have already been shown
pub const INITIALIZED_ATTR: &str = "data-toast-initialized";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToastError {
    #[error("Failed to remove toast: {0}")]
    Remove(String),

    #[error("Failed to show toast: {0}")]
    Show(String),

    #[error("Failed to mark toast: {0}")]
    Attribute(String),
}

/// The document the reconciler works on
pub trait ToastHost {
    type Element;

    /// Every element currently matching [`TOAST_SELECTOR`], in document order
    fn find_toasts(&self) -> Vec<Self::Element>;

    fn has_class(&self, element: &Self::Element, class: &str) -> bool;

    fn has_attribute(&self, element: &Self::Element, name: &str) -> bool;

    fn set_attribute(
        &mut self,
        element: &Self::Element,
        name: &str,
        value: &str,
    ) -> Result<(), ToastError>;

    /// Detach the element from the document
    fn remove(&mut self, element: &Self::Element) -> Result<(), ToastError>;

    /// Bind a toast widget to the element and show it
    fn show(&mut self, element: &Self::Element) -> Result<(), ToastError>;
}

/// When a visible toast is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShowPolicy {
    /// Show each toast on the first content load that finds it
    #[default]
    Once,

    /// Show every visible toast on every content load, even if it was shown
    /// before
    EveryLoad,
}

/// What one content load did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: usize,
    pub shown: usize,
    /// Already shown under [`ShowPolicy::Once`]
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToastReconciler {
    policy: ShowPolicy,
}

impl ToastReconciler {
    pub fn new(policy: ShowPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ShowPolicy {
        self.policy
    }

    /// Handle one content-load event. A failing element is logged and
    /// counted; the remaining elements are still processed.
    pub fn on_content_load<H: ToastHost>(&self, host: &mut H) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for element in host.find_toasts() {
            if host.has_class(&element, HIDE_CLASS) {
                match host.remove(&element) {
                    Ok(()) => report.removed += 1,
                    Err(e) => {
                        warn!("{}", e);
                        report.failed += 1;
                    }
                }
                continue;
            }

            if self.policy == ShowPolicy::Once && host.has_attribute(&element, INITIALIZED_ATTR) {
                report.skipped += 1;
                continue;
            }

            match self.show(host, &element) {
                Ok(()) => report.shown += 1,
                Err(e) => {
                    warn!("{}", e);
                    report.failed += 1;
                }
            }
        }

        debug!(
            "Toasts: {} removed, {} shown, {} skipped, {} failed",
            report.removed, report.shown, report.skipped, report.failed
        );
        report
    }

    fn show<H: ToastHost>(&self, host: &mut H, element: &H::Element) -> Result<(), ToastError> {
        host.show(element)?;
        // Mark only after a successful show so a failed toast is retried on
        // the next load. The toast is already on screen if marking fails.
        if self.policy == ShowPolicy::Once {
            if let Err(e) = host.set_attribute(element, INITIALIZED_ATTR, "true") {
                warn!("Toast shown but not marked, a later load may show it again: {}", e);
            }
        }
        Ok(())
    }
}
