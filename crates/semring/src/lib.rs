//! semring - Semaphore-Coordinated Ring Buffer Pipeline
//!
//! A bounded two-stage pipeline: a producer fills one ring buffer, a
//! transformer moves each item into a second ring buffer, and a consumer
//! drains it. Each ring is wrapped in a [`Channel`] synchronized by three
//! counting semaphores and nothing else.
//!
//! # Key Features
//!
//! - Counting semaphore on `Mutex` + `Condvar` with blocking acquire/release
//! - Ring buffer with a reserved slot (`capacity - 1` usable)
//! - Backpressure: senders block on a full channel, receivers on an empty one
//! - All three stage threads are joined before a run returns
//!
//! # Example
//!
//! ```
//! use semring::{run_letters, Config, Silent};
//!
//! let output = run_letters(Config::new(4, 8), Silent).unwrap();
//! assert_eq!(output.consumed, ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H']);
//! ```
//!
//! Channels can also be used on their own:
//!
//! ```
//! use semring::Channel;
//! use std::thread;
//!
//! let channel = Channel::<u64>::new(4);
//! let tx = channel.clone();
//! let sender = thread::spawn(move || (0..10).for_each(|i| tx.send(i)));
//!
//! let received: Vec<u64> = (0..10).map(|_| channel.receive()).collect();
//! sender.join().unwrap();
//! assert_eq!(received, (0..10).collect::<Vec<_>>());
//! ```

mod invariants;

mod channel;
mod config;
mod error;
mod metrics;
mod pipeline;
mod ring;
mod semaphore;
pub mod stage;

pub use channel::Channel;
pub use config::{Config, ConfigError, DEFAULT_CAPACITY, DEFAULT_ITEM_COUNT, DEMO_CONFIG};
pub use error::PipelineError;
pub use metrics::Metrics;
pub use pipeline::{alphabet, run_letters, uppercase, Pipeline, PipelineOutput};
pub use ring::RingBuffer;
pub use semaphore::{Permit, Semaphore};
pub use stage::{EventKind, Reporter, Silent, Stage, StageEvent, StdoutReporter};
