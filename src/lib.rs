//! Real-time audio looping engine.
//!
//! `eddy` records live input into a fixed bank of circular loop buffers while
//! playing back a mix of every loop that isn't recording. Each loop is toggled
//! between [`LoopState::Playing`] and [`LoopState::Recording`] from a control
//! thread while the audio thread keeps running.
//!
//! # Pieces
//!
//! - [`LoopBank`] owns the loops: buffers, cursors, gains and states.
//! - [`MixEngine`] runs one period of the mix/record algorithm on the audio thread.
//! - [`Controller`] changes loop state and takes display snapshots from any other thread.
//! - [`TriggerMap`] turns key press/release events into state requests.
//! - [`PeriodAdapter`] fits host callbacks of any length onto fixed periods.
//! - [`CpalDevice`] and [`DuplexStream`] (feature `cpal_backend`) run it all on real hardware.
//!
//! # Example
//!
//! ```
//! use eddy::{engine_pair, EngineConfig, TriggerEvent, TriggerMap};
//!
//! let config = EngineConfig::default()
//!     .with_loop_count(2)
//!     .with_loop_capacity(4)
//!     .with_period_size(1)
//!     .with_master_gain(1.0)
//!     .with_default_loop_gain(1.0)
//!     .with_loopback(false);
//! let (mut engine, controller) = engine_pair(&config).unwrap();
//! let keys = TriggerMap::identity();
//!
//! // Hold key 0 for four periods...
//! keys.apply(TriggerEvent::press(0), &controller);
//! for x in [1.0, 2.0, 3.0, 4.0] {
//!     engine.process(&[x]);
//! }
//! keys.apply(TriggerEvent::release(0), &controller);
//!
//! // ...and the loop plays it back.
//! let played: Vec<f32> = (0..4).map(|_| engine.process(&[0.0])[0]).collect();
//! assert_eq!(played, [1.0, 2.0, 3.0, 4.0]);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod loop_bank;
pub mod period;
pub mod trigger;

#[cfg(feature = "cpal_backend")]
pub mod device;
#[cfg(feature = "cpal_backend")]
pub mod stream;

pub use config::EngineConfig;
pub use engine::{engine_pair, Controller, MixEngine};
pub use error::{LooperError, LooperResult};
pub use loop_bank::{Loop, LoopBank, LoopState, Snapshot};
pub use period::PeriodAdapter;
pub use trigger::{TriggerEvent, TriggerKind, TriggerMap};

#[cfg(feature = "cpal_backend")]
pub use device::{CpalDevice, Direction};
#[cfg(feature = "cpal_backend")]
pub use stream::DuplexStream;
