use archiver_core::{update, FailedPost, MergeOutcome, PassReport, SyncEvent};
use pretty_assertions::assert_eq;

fn init_logging() {
    engine_logging::initialize_for_tests();
}

fn fold(events: Vec<SyncEvent>) -> PassReport {
    events.into_iter().fold(PassReport::default(), update)
}

#[test]
fn pass_started_resets_report_for_site() {
    init_logging();
    let report = fold(vec![
        SyncEvent::PostArchived {
            id: "stale".into(),
            title: "Stale".into(),
        },
        SyncEvent::PassStarted {
            site: "notebook".into(),
        },
    ]);
    assert_eq!(report, PassReport::new("notebook"));
}

#[test]
fn merge_events_are_counted_by_outcome() {
    init_logging();
    let report = fold(vec![
        SyncEvent::PassStarted { site: "s".into() },
        SyncEvent::AuthorMerged {
            id: "jane".into(),
            outcome: MergeOutcome::Created,
        },
        SyncEvent::AuthorMerged {
            id: "john".into(),
            outcome: MergeOutcome::Refreshed,
        },
        SyncEvent::CategoryMerged {
            id: "news".into(),
            outcome: MergeOutcome::Created,
        },
        SyncEvent::CategorySkipped {
            slug: "empty".into(),
        },
    ]);
    assert_eq!(report.authors_created, 1);
    assert_eq!(report.authors_refreshed, 1);
    assert_eq!(report.categories_created, 1);
    assert_eq!(report.categories_refreshed, 0);
    assert_eq!(report.categories_skipped, 1);
}

#[test]
fn unresolved_assets_and_failures_are_summarised() {
    init_logging();
    let report = fold(vec![
        SyncEvent::PassStarted { site: "s".into() },
        SyncEvent::AssetUnresolved {
            url: "https://example.com/a.jpg".into(),
        },
        SyncEvent::PostFailed {
            id: "orphan".into(),
            reason: "no author".into(),
        },
        SyncEvent::BatchPublished {
            number: 1,
            total: 2,
            files: 50,
            pushed: true,
        },
        SyncEvent::BatchPublished {
            number: 2,
            total: 2,
            files: 3,
            pushed: false,
        },
    ]);

    assert!(!report.is_clean());
    assert_eq!(
        report.failed_posts,
        vec![FailedPost {
            id: "orphan".into(),
            reason: "no author".into()
        }]
    );
    assert_eq!(report.batches_pushed, 1);
    assert_eq!(report.batches_failed, 1);

    let summary = report.summary_lines().join("\n");
    assert!(summary.contains("The following images could not be downloaded:"));
    assert!(summary.contains("  https://example.com/a.jpg"));
    assert!(summary.contains("  orphan: no author"));
    assert!(summary.contains("publish: 1 batches pushed, 1 failed"));
}

#[test]
fn clean_pass_has_no_diagnostics_section() {
    init_logging();
    let report = fold(vec![
        SyncEvent::PassStarted { site: "s".into() },
        SyncEvent::PostArchived {
            id: "p".into(),
            title: "P".into(),
        },
    ]);
    assert!(report.is_clean());
    assert_eq!(report.summary_lines().len(), 1);
}
