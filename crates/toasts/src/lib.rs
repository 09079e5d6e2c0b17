//! Toast notification handling for pages updated by htmx
//!
//! After every content load the reconciler scans the document for toast
//! elements: dismissed toasts (carrying the `hide` class) are removed and
//! the rest are shown. Shown toasts are marked so a later content load does
//! not show them again.
//!
//! The document is reached through [`ToastHost`]; [`dom::Document`] is an
//! in-memory host, and the `web` feature provides one bound to the browser.

pub mod dom;
pub mod reconciler;

#[cfg(feature = "web")]
pub mod web;

pub use reconciler::{
    ReconcileReport, ShowPolicy, ToastError, ToastHost, ToastReconciler, HIDE_CLASS,
    INITIALIZED_ATTR, TOAST_SELECTOR,
};
