//! Job output folding tests
//!
//! End-to-end folding through the public API: scenarios from streamed logs
//! and the large-job performance guard.

mod fixtures;

use std::time::{Duration, Instant};

use joblog::model::KILLED_EXIT_CODE;
use joblog::replay::replay;
use joblog::{CommandStatus, Event, JobOutput, JobResult, RenderConfig, TranscriptView};

/// Wall-clock budget for folding the large job, debug build included.
const LARGE_JOB_BUDGET: Duration = Duration::from_secs(5);

fn fold(events: &[Event]) -> JobOutput {
    let mut output = JobOutput::new();
    for event in events {
        output.apply(event).unwrap();
    }
    output
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_single_output_chunk_becomes_one_line() {
    let output = fold(&[
        Event::started("make test", 1),
        Event::output("Exporting env var", 2),
    ]);

    assert_eq!(output.commands().len(), 1);
    let command = &output.commands()[0];
    assert_eq!(command.number_of_lines(), 1);
    assert_eq!(command.lines()[0].output(), "Exporting env var");
    assert!(!command.lines()[0].is_complete());
}

#[test]
fn test_second_chunk_extends_incomplete_line() {
    let output = fold(&[
        Event::started("make", 1),
        Event::output("a\nb", 2),
        Event::output("c", 3),
    ]);

    let lines: Vec<(&str, bool)> = output.commands()[0]
        .lines()
        .iter()
        .map(|l| (l.output(), l.is_complete()))
        .collect();
    assert_eq!(lines, vec![("a", true), ("bc", false)]);
}

#[test]
fn test_line_numbers_run_across_commands() {
    let output = fold(&fixtures::small_job());
    let commands = output.commands();

    assert_eq!(commands[0].starting_line_number(), 1);
    let numbers: Vec<u64> = commands[0].lines().iter().map(|l| l.number()).collect();
    assert_eq!(numbers, vec![2, 3, 4]);

    assert_eq!(commands[1].starting_line_number(), 5);
    assert_eq!(commands[1].lines()[0].number(), 6);
    assert_eq!(output.total_line_count(), 7);
}

#[test]
fn test_progress_bar_collapses_to_last_frame() {
    let output = fold(&fixtures::small_job());
    let clone = &output.commands()[0];

    assert_eq!(clone.lines()[1].output(), "Receiving objects: 100%");
    assert_eq!(clone.lines()[2].output(), "done.");
}

#[test]
fn test_job_finished_kills_open_command() {
    let output = fold(&[
        Event::started("sleep 3600", 1),
        Event::output("zzz", 2),
        Event::job_finished(JobResult::Passed, 9),
    ]);

    let command = &output.commands()[0];
    assert_eq!(command.exit_code(), Some(KILLED_EXIT_CODE));
    assert_eq!(command.finished_at(), Some(9));
    assert_eq!(command.status(), CommandStatus::Failed);
    assert_eq!(output.result(), Some(JobResult::Passed));
}

#[test]
fn test_double_finish_keeps_first_exit() {
    let mut output = fold(&[Event::started("make", 1), Event::finished(2, 5)]);

    let err = output.apply(&Event::finished(0, 6)).unwrap_err();
    assert!(err.to_string().contains("make"));
    assert_eq!(output.commands()[0].exit_code(), Some(2));
    assert_eq!(output.commands()[0].finished_at(), Some(5));
}

#[test]
fn test_unknown_events_change_nothing() {
    let mut output = fold(&[Event::started("make", 1)]);
    let before = output.total_line_count();

    output.apply(&Event::Unknown).unwrap();

    assert_eq!(output.total_line_count(), before);
    assert_eq!(output.commands().len(), 1);
}

#[test]
fn test_raw_text_export() {
    let output = fold(&fixtures::small_job());

    assert_eq!(
        output.to_raw_text(),
        "git clone https://example.com/repo.git\n\
         Cloning into 'repo'...\n\
         Receiving objects: 100%\n\
         done.\n\
         make test\n\
         ok 1 - parses\n\
         ok 2 - renders\n"
    );
}

// =============================================================================
// Large job
// =============================================================================

#[test]
fn test_large_job_total_line_count_within_budget() {
    let events = fixtures::large_job();
    assert_eq!(events.len(), 40_000);

    let started = Instant::now();
    let output = fold(&events);
    let elapsed = started.elapsed();

    assert_eq!(output.total_line_count(), fixtures::LARGE_JOB_TOTAL_LINES);
    assert_eq!(output.total_line_count(), 20_000);
    assert_eq!(output.commands().len(), fixtures::LARGE_JOB_COMMANDS);
    assert!(
        output.commands().iter().all(|c| c.is_passed()),
        "every command should have passed"
    );
    assert!(
        elapsed < LARGE_JOB_BUDGET,
        "folding {} events took {:?}",
        events.len(),
        elapsed
    );
}

#[test]
fn test_large_job_lines_are_reassembled() {
    let output = fold(&fixtures::large_job());
    let first = &output.commands()[0];

    assert_eq!(first.number_of_lines(), fixtures::LARGE_JOB_OUTPUTS_PER_COMMAND / 2);
    assert_eq!(first.lines()[0].output(), "chunk 0 tail 1");
    assert!(first.lines().iter().all(|l| l.is_complete()));
}

#[tokio::test]
async fn test_large_job_through_render_loop_in_batches() {
    let started = Instant::now();
    let report = replay(
        fixtures::large_job(),
        TranscriptView::new(),
        RenderConfig { batch_limit: Some(500) },
    )
    .await;

    assert!(started.elapsed() < LARGE_JOB_BUDGET);
    assert_eq!(report.output.total_line_count(), fixtures::LARGE_JOB_TOTAL_LINES);
    assert_eq!(report.stats.ticks, 80);
    assert!(report.stats.errors.is_empty());
    assert_eq!(report.view.folds().len(), fixtures::LARGE_JOB_COMMANDS);
    assert_eq!(report.view.appends(), fixtures::LARGE_JOB_COMMANDS as u64);
}
