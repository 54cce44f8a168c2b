//! Shared fixtures for integration tests
//!
//! - a deterministic 40,000-event job used as a performance guard
//! - a small recorded job on disk, stored one JSON event per line

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use joblog::{Cursor, Event, EventsPage, JobResult};

/// Commands in the large job
pub const LARGE_JOB_COMMANDS: usize = 400;

/// Output events per command in the large job. Chunks alternate between an
/// unterminated fragment and the rest of the line, so every line is built
/// from two appends.
pub const LARGE_JOB_OUTPUTS_PER_COMMAND: usize = 98;

/// Events in the large job: start, outputs and finish for every command.
pub const LARGE_JOB_EVENTS: usize = LARGE_JOB_COMMANDS * (LARGE_JOB_OUTPUTS_PER_COMMAND + 2);

/// Expected total line count: each command has its directive line plus one
/// line per pair of output chunks.
pub const LARGE_JOB_TOTAL_LINES: u64 = (LARGE_JOB_COMMANDS * (1 + LARGE_JOB_OUTPUTS_PER_COMMAND / 2)) as u64;

/// Generate the large job's events in arrival order.
pub fn large_job() -> Vec<Event> {
    let mut events = Vec::with_capacity(LARGE_JOB_EVENTS);
    let mut clock = 1_700_000_000i64;

    for c in 0..LARGE_JOB_COMMANDS {
        events.push(Event::started(format!("step-{} --verbose", c), clock));
        for i in 0..LARGE_JOB_OUTPUTS_PER_COMMAND {
            let chunk = if i % 2 == 0 {
                format!("chunk {} ", i)
            } else {
                format!("tail {}\n", i)
            };
            events.push(Event::output(chunk, clock));
        }
        clock += 3;
        events.push(Event::finished(0, clock));
    }

    events
}

/// Split events into pages linked by sequential numeric cursors. The last
/// page has no next cursor.
pub fn paginate(events: Vec<Event>, page_size: usize) -> Vec<EventsPage> {
    let chunks: Vec<Vec<Event>> = events.chunks(page_size).map(<[Event]>::to_vec).collect();
    let count = chunks.len();

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let next = if i + 1 == count {
                None
            } else {
                Some(Cursor::new((i + 1).to_string()))
            };
            EventsPage::new(chunk, next)
        })
        .collect()
}

/// A short passing job with a progress bar drawn with carriage returns.
pub fn small_job() -> Vec<Event> {
    vec![
        Event::started("git clone https://example.com/repo.git", 100),
        Event::output("Cloning into 'repo'...\n", 101),
        Event::output("Receiving objects:  50%\rReceiving objects: 100%", 102),
        Event::output("\ndone.\n", 103),
        Event::finished(0, 104),
        Event::started("make test", 104),
        Event::output("ok 1 - parses\nok 2 - ren", 110),
        Event::output("ders\n", 111),
        Event::finished(0, 170),
        Event::job_finished(JobResult::Passed, 171),
    ]
}

/// Path to the recorded failing job
pub fn recorded_job_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/recorded_job.jsonl")
}
