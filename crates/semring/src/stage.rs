//! The three pipeline roles and the events they report.
//!
//! Each stage is a plain loop of `count` iterations over one or two
//! [`Channel`]s. Stages never stop early: the only way out of a loop is to
//! finish it, so every side of a channel must agree on `count`.

use crate::Channel;
use std::fmt;
use std::io::{self, Write};
use tracing::{trace, warn};

/// One of the three pipeline roles, each run on its own thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Producer,
    Transformer,
    Consumer,
}

impl Stage {
    /// Name given to the stage's OS thread.
    pub fn thread_name(self) -> &'static str {
        match self {
            Self::Producer => "semring-producer",
            Self::Transformer => "semring-transformer",
            Self::Consumer => "semring-consumer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Producer => "producer",
            Self::Transformer => "transformer",
            Self::Consumer => "consumer",
        })
    }
}

/// What happened to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The producer generated the item and is about to send it.
    Produced,
    /// The transformer received the item from the upstream channel.
    Fetched,
    /// The transformer computed the item and is about to send it downstream.
    Transformed,
    /// The consumer received the item.
    Consumed,
}

impl EventKind {
    /// The stage that reports this kind of event.
    pub fn stage(self) -> Stage {
        match self {
            Self::Produced => Stage::Producer,
            Self::Fetched | Self::Transformed => Stage::Transformer,
            Self::Consumed => Stage::Consumer,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Produced => "produce item",
            Self::Fetched => "transform get item",
            Self::Transformed => "transform put item",
            Self::Consumed => "consume item",
        }
    }
}

/// A progress event for a single item.
///
/// Formats as one output line, e.g. `produce item: a`.
#[derive(Clone, Copy)]
pub struct StageEvent<'a> {
    pub kind: EventKind,
    /// Iteration of the reporting stage, in `0..count`.
    pub index: usize,
    pub item: &'a dyn fmt::Display,
}

impl StageEvent<'_> {
    #[inline]
    pub fn stage(&self) -> Stage {
        self.kind.stage()
    }
}

impl fmt::Display for StageEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.item)
    }
}

impl fmt::Debug for StageEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageEvent")
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("item", &format_args!("{}", self.item))
            .finish()
    }
}

/// Receives progress events from all three stage threads.
pub trait Reporter: Send + Sync {
    fn report(&self, event: &StageEvent<'_>);
}

impl<F> Reporter for F
where
    F: Fn(&StageEvent<'_>) + Send + Sync,
{
    fn report(&self, event: &StageEvent<'_>) {
        self(event);
    }
}

/// Prints each event as a line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn report(&self, event: &StageEvent<'_>) {
        write_line(io::stdout().lock(), event);
    }
}

/// Writes `event` as one line. A failed write is logged, never raised: a
/// closed stdout must not take a stage thread down with it.
fn write_line(mut out: impl Write, event: &StageEvent<'_>) -> bool {
    match writeln!(out, "{event}") {
        Ok(()) => true,
        Err(err) => {
            warn!(stage = %event.stage(), %err, "failed to write event to stdout");
            false
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Reporter for Silent {
    fn report(&self, _event: &StageEvent<'_>) {}
}

fn emit(reporter: &dyn Reporter, kind: EventKind, index: usize, item: &dyn fmt::Display) {
    trace!(stage = %kind.stage(), ?kind, index, item = %item, "item event");
    reporter.report(&StageEvent { kind, index, item });
}

// =============================================================================
// STAGE LOOPS
// =============================================================================

/// Generates `count` items and sends them into `output`.
///
/// Each item is reported before it is sent, so its `Produced` event always
/// precedes the transformer's `Fetched` event for it.
pub fn produce<T, G>(output: &Channel<T>, count: usize, mut generate: G, reporter: &dyn Reporter)
where
    T: fmt::Display,
    G: FnMut(usize) -> T,
{
    for index in 0..count {
        let item = generate(index);
        emit(reporter, EventKind::Produced, index, &item);
        output.send(item);
    }
}

/// Moves `count` items from `input` to `output`, applying `map` to each.
///
/// The mapped item is reported before it is sent downstream.
pub fn transform<T, U, F>(
    input: &Channel<T>,
    output: &Channel<U>,
    count: usize,
    mut map: F,
    reporter: &dyn Reporter,
) where
    T: fmt::Display,
    U: fmt::Display,
    F: FnMut(T) -> U,
{
    for index in 0..count {
        let item = input.receive();
        emit(reporter, EventKind::Fetched, index, &item);

        let item = map(item);
        emit(reporter, EventKind::Transformed, index, &item);
        output.send(item);
    }
}

/// Receives `count` items from `input` and returns them in arrival order.
pub fn consume<T>(input: &Channel<T>, count: usize, reporter: &dyn Reporter) -> Vec<T>
where
    T: fmt::Display,
{
    let mut consumed = Vec::with_capacity(count);
    for index in 0..count {
        let item = input.receive();
        emit(reporter, EventKind::Consumed, index, &item);
        consumed.push(item);
    }
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    #[test]
    fn test_event_lines() {
        let item = 'a';
        let event = StageEvent {
            kind: EventKind::Produced,
            index: 0,
            item: &item,
        };
        assert_eq!(event.to_string(), "produce item: a");

        let item = 'A';
        let lines: Vec<_> = [EventKind::Fetched, EventKind::Transformed, EventKind::Consumed]
            .into_iter()
            .map(|kind| StageEvent { kind, index: 3, item: &item }.to_string())
            .collect();
        assert_eq!(
            lines,
            ["transform get item: A", "transform put item: A", "consume item: A"]
        );
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_line_reports_failure_without_panicking() {
        let item = 'c';
        let event = StageEvent {
            kind: EventKind::Consumed,
            index: 2,
            item: &item,
        };

        let mut out = Vec::new();
        assert!(write_line(&mut out, &event));
        assert_eq!(out, b"consume item: c\n");

        assert!(!write_line(ClosedPipe, &event));
    }

    #[test]
    fn test_event_kind_stage() {
        assert_eq!(EventKind::Produced.stage(), Stage::Producer);
        assert_eq!(EventKind::Fetched.stage(), Stage::Transformer);
        assert_eq!(EventKind::Transformed.stage(), Stage::Transformer);
        assert_eq!(EventKind::Consumed.stage(), Stage::Consumer);
    }

    #[test]
    fn test_stages_on_one_thread_within_capacity() {
        // Fits in the rings, so the stages can run back to back
        let a = Channel::new(4);
        let b = Channel::new(4);
        let log = Mutex::new(Vec::new());
        let reporter = |e: &StageEvent<'_>| log.lock().unwrap().push(e.to_string());

        produce(&a, 3, |i| (b'x' + i as u8) as char, &reporter);
        transform(&a, &b, 3, |c: char| c.to_ascii_uppercase(), &reporter);
        let out = consume(&b, 3, &reporter);

        assert_eq!(out, ['X', 'Y', 'Z']);
        let log = log.into_inner().unwrap();
        assert_eq!(log.len(), 12);
        assert_eq!(log[0], "produce item: x");
        assert_eq!(log[3], "transform get item: x");
        assert_eq!(log[4], "transform put item: X");
        assert_eq!(log[11], "consume item: Z");
    }

    #[test]
    fn test_stages_across_threads_with_backpressure() {
        const N: usize = 100;
        let a = Channel::new(2);
        let b = Channel::new(2);

        let producer = {
            let a = a.clone();
            thread::spawn(move || produce(&a, N, |i| i as u64, &Silent))
        };
        let transformer = {
            let (a, b) = (a.clone(), b.clone());
            thread::spawn(move || transform(&a, &b, N, |v: u64| v * 2, &Silent))
        };

        let out = consume(&b, N, &Silent);
        producer.join().unwrap();
        transformer.join().unwrap();

        let expected: Vec<u64> = (0..N as u64).map(|v| v * 2).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_zero_count_is_a_no_op() {
        let a = Channel::<u8>::new(2);
        produce(&a, 0, |_| unreachable!(), &Silent);
        assert!(consume(&a, 0, &Silent).is_empty());
    }
}
