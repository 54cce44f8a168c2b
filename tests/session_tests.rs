//! Session and replay tests
//!
//! Runs the fetch and render tasks together over scripted sources, and
//! replays recorded event files.

mod fixtures;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use joblog::replay::{parse_recording, replay};
use joblog::transport::MockResponse;
use joblog::{
    CommandStatus, ConsoleView, Cursor, Event, EventsPage, FetchOutcome, FetcherConfig, JobLogSession, JobResult,
    MockEventSource, RenderConfig, TranscriptView,
};

fn fast_fetcher(max_consecutive_errors: u32) -> FetcherConfig {
    FetcherConfig {
        max_consecutive_errors,
        back_off_interval: Duration::from_millis(1000),
        regular_interval: Duration::from_millis(100),
    }
}

fn paged_source(events: Vec<Event>, page_size: usize) -> MockEventSource {
    fixtures::paginate(events, page_size)
        .into_iter()
        .fold(MockEventSource::new(), MockEventSource::with_page)
}

// =============================================================================
// Live sessions
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_session_renders_whole_job() {
    let source = Arc::new(paged_source(fixtures::small_job(), 2));
    let session = JobLogSession::start(source, TranscriptView::new(), fast_fetcher(3), RenderConfig::default());

    let (outcome, report) = session.wait().await.unwrap();

    assert_eq!(outcome, Some(FetchOutcome::Finished));
    assert_eq!(report.output.result(), Some(JobResult::Passed));
    assert_eq!(report.output.total_line_count(), 7);
    assert!(report.stats.errors.is_empty());

    let folds = report.view.folds();
    assert_eq!(folds.len(), 2);
    assert!(folds.iter().all(|f| f.status == CommandStatus::Passed && !f.open));
    assert_eq!(folds[1].lines.last().map(|l| l.text.as_str()), Some("ok 2 - renders"));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_keeps_rendered_lines() {
    let source = Arc::new(
        MockEventSource::new()
            .with_page(EventsPage::new(
                vec![Event::started("make", 1), Event::output("building\n", 2)],
                Some(Cursor::new("1")),
            ))
            .when_exhausted(MockResponse::Status(500)),
    );
    let session = JobLogSession::start(source.clone(), TranscriptView::new(), fast_fetcher(3), RenderConfig::default());

    let (outcome, report) = session.wait().await.unwrap();

    assert!(matches!(outcome, Some(FetchOutcome::Failed { .. })));
    assert_eq!(source.requests().len(), 4);

    let fold = &report.view.folds()[0];
    assert_eq!(fold.status, CommandStatus::Running);
    assert!(fold.open);
    assert_eq!(fold.lines[0].text, "building");
    assert_eq!(report.output.result(), None);
}

#[tokio::test(start_paused = true)]
async fn test_close_stops_fetching_and_finishes_render() {
    let source = Arc::new(
        MockEventSource::new()
            .with_page(EventsPage::new(vec![Event::started("tail -f log", 1)], Some(Cursor::new("1"))))
            .when_exhausted(MockResponse::Page(EventsPage::new(vec![], Some(Cursor::new("1"))))),
    );
    let session = JobLogSession::start(source, TranscriptView::new(), fast_fetcher(3), RenderConfig::default());

    tokio::time::sleep(Duration::from_secs(10)).await;
    session.close();
    let (outcome, report) = session.wait().await.unwrap();

    assert!(matches!(outcome, None | Some(FetchOutcome::Cancelled)));
    assert_eq!(report.view.folds().len(), 1);
    assert_eq!(report.view.folds()[0].status, CommandStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn test_stopping_queue_finishes_session_without_waiting_out_back_off() {
    let source = Arc::new(
        MockEventSource::new()
            .with_page(EventsPage::new(vec![Event::started("make", 1)], Some(Cursor::new("1"))))
            .when_exhausted(MockResponse::Page(EventsPage::new(vec![], Some(Cursor::new("1"))))),
    );
    let config = FetcherConfig {
        max_consecutive_errors: 3,
        back_off_interval: Duration::from_secs(5),
        regular_interval: Duration::from_secs(5),
    };
    let session = JobLogSession::start(source, TranscriptView::new(), config, RenderConfig::default());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let stopped_at = tokio::time::Instant::now();
    session.queue().stop();
    let (outcome, report) = session.wait().await.unwrap();

    assert!(stopped_at.elapsed() < Duration::from_millis(100), "took {:?}", stopped_at.elapsed());
    assert_eq!(outcome, Some(FetchOutcome::Cancelled));
    assert_eq!(report.view.folds().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_signals_resolve_separately() {
    let source = Arc::new(paged_source(fixtures::small_job(), 4));
    let session = JobLogSession::start(source, TranscriptView::new(), fast_fetcher(3), RenderConfig::default());

    let (fetch_finished, render_finished) = session.into_signals();

    assert_eq!(fetch_finished.wait().await.unwrap(), FetchOutcome::Finished);
    let report = render_finished.await.unwrap();
    assert_eq!(report.output.commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_console_session_streams_transcript() {
    let source = Arc::new(paged_source(fixtures::small_job(), 3));
    let view = ConsoleView::new(Vec::new());
    let session = JobLogSession::start(source, view, fast_fetcher(3), RenderConfig { batch_limit: Some(2) });

    let (_, report) = session.wait().await.unwrap();
    let text = String::from_utf8(report.view.into_inner()).unwrap();

    assert!(text.contains("Receiving objects: 100%\ndone.\n<<< passed in 00:04\n"));
    assert!(text.contains("ok 1 - parses\nok 2 - renders\n<<< passed in 01:06\n"));
    assert!(text.ends_with("=== job passed at 00:02:51 (7 lines)\n"));
    assert_eq!(text.matches(">>> ").count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_large_job_over_paged_session() {
    let source = Arc::new(paged_source(fixtures::large_job(), 1000));
    let session = JobLogSession::start(source, TranscriptView::new(), fast_fetcher(3), RenderConfig::default());

    let (outcome, report) = session.wait().await.unwrap();

    assert_eq!(outcome, Some(FetchOutcome::Finished));
    assert_eq!(report.output.total_line_count(), fixtures::LARGE_JOB_TOTAL_LINES);
}

// =============================================================================
// Replay
// =============================================================================

#[tokio::test]
async fn test_replay_recorded_failing_job() {
    let contents = fs::read_to_string(fixtures::recorded_job_path()).unwrap();
    let events = parse_recording(&contents).unwrap();
    assert_eq!(events.len(), 9);
    assert_eq!(events[4], Event::Unknown);

    let report = replay(events, TranscriptView::new(), RenderConfig::default()).await;

    assert_eq!(report.output.result(), Some(JobResult::Failed));
    assert_eq!(report.output.total_line_count(), 6);
    assert_eq!(report.stats.events_ignored, 2);

    assert_eq!(
        report.view.to_text(),
        "1 ▸ export CI=true  [passed, 00:00]\n\
         2 ▾ cargo test  [failed (101), 00:40]\n\
         3      Compiling joblog v0.1.0\n\
         4   test queue::tests::test_stop ... ok\n\
         5   test render::tests::test_tick ... FAILED\n\
         6   error: test failed\n"
    );
}
