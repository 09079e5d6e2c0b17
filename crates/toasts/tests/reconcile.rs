use nomnom_toasts::dom::Document;
use nomnom_toasts::{ReconcileReport, ShowPolicy, ToastReconciler, INITIALIZED_ATTR};
use test_case::test_case;

#[test_case(0, 0)]
#[test_case(3, 0)]
#[test_case(0, 4)]
#[test_case(2, 5)]
fn hidden_toasts_are_removed_and_active_ones_shown(hidden: usize, active: usize) {
    let mut doc = Document::new();
    let unrelated = doc.insert(&["alert", "hide"]);
    let hidden_ids: Vec<_> = (0..hidden).map(|_| doc.insert_toast(true)).collect();
    let active_ids: Vec<_> = (0..active).map(|_| doc.insert_toast(false)).collect();

    let report = ToastReconciler::default().on_content_load(&mut doc);

    assert_eq!(
        report,
        ReconcileReport {
            removed: hidden,
            shown: active,
            skipped: 0,
            failed: 0
        }
    );
    assert!(hidden_ids.iter().all(|id| !doc.is_attached(*id)));
    assert!(active_ids.iter().all(|id| doc.show_calls(*id) == 1));
    assert!(doc.is_attached(unrelated));
    assert_eq!(doc.show_calls(unrelated), 0);
    assert_eq!(doc.attached_count(), 1 + active);
}

#[test]
fn once_policy_does_not_reshow_on_later_loads() {
    let mut doc = Document::new();
    let first = doc.insert_toast(false);
    let reconciler = ToastReconciler::new(ShowPolicy::Once);

    reconciler.on_content_load(&mut doc);
    assert_eq!(doc.attribute(first, INITIALIZED_ATTR), Some("true"));

    // A later swap adds a second toast
    let second = doc.insert_toast(false);
    let report = reconciler.on_content_load(&mut doc);

    assert_eq!(report.shown, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(doc.show_calls(first), 1);
    assert_eq!(doc.show_calls(second), 1);
}

#[test]
fn every_load_policy_reshows_visible_toasts() {
    let mut doc = Document::new();
    let toast = doc.insert_toast(false);
    let reconciler = ToastReconciler::new(ShowPolicy::EveryLoad);

    reconciler.on_content_load(&mut doc);
    reconciler.on_content_load(&mut doc);

    assert_eq!(doc.show_calls(toast), 2);
    assert_eq!(doc.attribute(toast, INITIALIZED_ATTR), None);
}

#[test]
fn dismissed_toast_is_removed_on_next_load() {
    let mut doc = Document::new();
    let toast = doc.insert_toast(false);
    let reconciler = ToastReconciler::default();
    reconciler.on_content_load(&mut doc);

    // Bootstrap adds `hide` once the toast is dismissed
    doc.add_class(toast, "hide");
    let report = reconciler.on_content_load(&mut doc);

    assert_eq!(report.removed, 1);
    assert!(!doc.is_attached(toast));
    assert_eq!(doc.show_calls(toast), 1);
}

#[test]
fn failing_toast_does_not_stop_the_scan() {
    let mut doc = Document::new();
    let broken = doc.insert_broken_toast();
    let good = doc.insert_toast(false);

    let report = ToastReconciler::default().on_content_load(&mut doc);

    assert_eq!(report.failed, 1);
    assert_eq!(report.shown, 1);
    assert_eq!(doc.show_calls(good), 1);
    // Not marked, so the next load tries again
    assert_eq!(doc.attribute(broken, INITIALIZED_ATTR), None);
}

#[test]
fn toast_that_cannot_be_marked_still_counts_as_shown() {
    let mut doc = Document::new();
    let toast = doc.insert_read_only_toast();

    let report = ToastReconciler::new(ShowPolicy::Once).on_content_load(&mut doc);

    assert_eq!(
        report,
        ReconcileReport {
            removed: 0,
            shown: 1,
            skipped: 0,
            failed: 0
        }
    );
    assert_eq!(doc.show_calls(toast), 1);
    assert_eq!(doc.attribute(toast, INITIALIZED_ATTR), None);
}
