//! The vitrine cache worker.
//!
//! A storefront-side worker that intercepts every request, answers from a
//! versioned cache or the network depending on what is being asked for, and
//! keeps the catalog usable offline:
//!
//! - [`Engine`]: one worker instance, driven through install, activate,
//!   fetch and message hooks
//! - [`Router`]: pure request classification
//! - [`Registration`]: active/waiting instances of one origin

pub mod engine;
pub mod lifecycle;
pub mod prefetch;
pub mod registration;
pub mod router;
pub mod strategy;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::{Engine, EngineStatus, GenerationStatus};
pub use lifecycle::{ActivateReport, WorkerState};
pub use prefetch::{PrefetchReport, WorkerMessage};
pub use registration::{RegisterOutcome, Registration, Served};
pub use router::{ResourceClass, Router};
pub use strategy::{FetchOutcome, ResponseSource};
