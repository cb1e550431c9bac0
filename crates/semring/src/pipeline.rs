use crate::stage::{consume, produce, transform};
use crate::{Channel, Config, Metrics, PipelineError, Reporter, Stage};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// Two chained channels driven by a producer, a transformer and a consumer.
///
/// ```text
/// producer ──▶ upstream ──▶ transformer ──▶ downstream ──▶ consumer
/// ```
///
/// Every stage handles exactly `config.item_count` items, which keeps both
/// sides of each channel balanced.
pub struct Pipeline<T, U> {
    config: Config,
    upstream: Channel<T>,
    downstream: Channel<U>,
}

/// Result of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput<U> {
    /// Items in the order the consumer received them.
    pub consumed: Vec<U>,
    pub upstream: Metrics,
    pub downstream: Metrics,
    pub elapsed: Duration,
}

impl<T, U> Pipeline<T, U>
where
    T: fmt::Display + Send + 'static,
    U: fmt::Display + Send + 'static,
{
    /// Validates `config` and creates both channels.
    pub fn new(config: Config) -> Result<Self, PipelineError> {
        config.validate()?;

        Ok(Self {
            config,
            upstream: Channel::new(config.capacity),
            downstream: Channel::new(config.capacity),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handles to both channels, e.g. to watch occupancy while running.
    pub fn channels(&self) -> (Channel<T>, Channel<U>) {
        (self.upstream.clone(), self.downstream.clone())
    }

    /// Runs all three stages to completion and joins every thread.
    ///
    /// `generate` maps an iteration index to the produced item and `map` is
    /// applied by the transformer. Stages are joined in the order they exit.
    /// If one panics, [`PipelineError::StagePanicked`] is returned as soon as
    /// it exits; stages cannot be cancelled, so peers still blocked on a
    /// channel are left detached.
    pub fn run<G, F, R>(
        self,
        generate: G,
        map: F,
        reporter: R,
    ) -> Result<PipelineOutput<U>, PipelineError>
    where
        G: FnMut(usize) -> T + Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
        R: Reporter + 'static,
    {
        let Config {
            capacity,
            item_count,
        } = self.config;
        let reporter: Arc<dyn Reporter> = Arc::new(reporter);
        // One usable slot per stage, so an exiting stage never blocks here
        let exits = Channel::<Stage>::new(STAGE_COUNT + 1);
        let start = Instant::now();
        debug!(capacity, item_count, "starting pipeline");

        // Threads already running when a later spawn fails stay detached
        let mut producer = Some({
            let output = self.upstream.clone();
            let reporter = Arc::clone(&reporter);
            spawn_stage(Stage::Producer, &exits, move || {
                produce(&output, item_count, generate, &*reporter);
            })?
        });
        let mut transformer = Some({
            let input = self.upstream.clone();
            let output = self.downstream.clone();
            let reporter = Arc::clone(&reporter);
            spawn_stage(Stage::Transformer, &exits, move || {
                transform(&input, &output, item_count, map, &*reporter);
            })?
        });
        let mut consumer = Some({
            let input = self.downstream.clone();
            let reporter = Arc::clone(&reporter);
            spawn_stage(Stage::Consumer, &exits, move || {
                consume(&input, item_count, &*reporter)
            })?
        });

        let mut consumed = Vec::new();
        for _ in 0..STAGE_COUNT {
            match exits.receive() {
                Stage::Producer => {
                    if let Some(handle) = producer.take() {
                        join_stage(Stage::Producer, handle)?;
                    }
                }
                Stage::Transformer => {
                    if let Some(handle) = transformer.take() {
                        join_stage(Stage::Transformer, handle)?;
                    }
                }
                Stage::Consumer => {
                    if let Some(handle) = consumer.take() {
                        consumed = join_stage(Stage::Consumer, handle)?;
                    }
                }
            }
        }

        let output = PipelineOutput {
            consumed,
            upstream: self.upstream.metrics(),
            downstream: self.downstream.metrics(),
            elapsed: start.elapsed(),
        };
        debug!(elapsed = ?output.elapsed, "pipeline finished");
        Ok(output)
    }
}

const STAGE_COUNT: usize = 3;

/// Announces a stage's exit on drop, so it fires on unwind too.
struct ExitSignal {
    stage: Stage,
    exits: Channel<Stage>,
}

impl Drop for ExitSignal {
    fn drop(&mut self) {
        self.exits.send(self.stage);
    }
}

fn spawn_stage<R, B>(
    stage: Stage,
    exits: &Channel<Stage>,
    body: B,
) -> Result<JoinHandle<R>, PipelineError>
where
    R: Send + 'static,
    B: FnOnce() -> R + Send + 'static,
{
    let exits = exits.clone();
    thread::Builder::new()
        .name(stage.thread_name().to_owned())
        .spawn(move || {
            let _exit = ExitSignal { stage, exits };
            debug!(%stage, "stage started");
            let result = body();
            debug!(%stage, "stage finished");
            result
        })
        .map_err(|source| PipelineError::Spawn { stage, source })
}

fn join_stage<R>(stage: Stage, handle: JoinHandle<R>) -> Result<R, PipelineError> {
    handle.join().map_err(|_| {
        error!(%stage, "stage thread panicked");
        PipelineError::StagePanicked { stage }
    })
}

impl<T, U> fmt::Debug for Pipeline<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("upstream", &self.upstream)
            .field("downstream", &self.downstream)
            .finish()
    }
}

// =============================================================================
// DEMO PIPELINE
// =============================================================================

/// The `index`-th lowercase letter, wrapping after `z`.
pub fn alphabet(index: usize) -> char {
    char::from(b'a' + (index % 26) as u8)
}

/// Maps a lowercase ASCII letter to its uppercase form.
pub fn uppercase(item: char) -> char {
    item.to_ascii_uppercase()
}

/// Runs `config` over the alphabet with the uppercase transform.
pub fn run_letters<R>(config: Config, reporter: R) -> Result<PipelineOutput<char>, PipelineError>
where
    R: Reporter + 'static,
{
    Pipeline::new(config)?.run(alphabet, uppercase, reporter)
}
