//! FleetView Deterministic Simulation Testing (DST) Harness
//!
//! This crate provides a controlled world in which the FleetView engine runs
//! against a simulated fleet, a scripted feed and an in-memory store.
//!
//! # Core Principle: One Seed, One Run
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advanced once per tick
//! - **Scheduling**: Single-threaded runtime, the engine settles after each tick
//! - **Randomness**: Physics and user actions derived from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │                                                             │
//! │  ┌──────────┐  FeedMessage   ┌─────────────────────────┐    │
//! │  │  Oracle  │──────────────►│        FleetEngine       │    │
//! │  │ (physics)│    SimFeed     │  ledger ◄──► VecSurface │    │
//! │  └──────────┘                └─────────────────────────┘    │
//! │       │ records, trips               ▲ lookups / saves      │
//! │       ▼                              │                      │
//! │  ┌──────────┐                        │                      │
//! │  │ SimStore │────────────────────────┘                      │
//! │  └──────────┘                                               │
//! │                                                             │
//! │  audit(): ledger vs surface after every tick                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use fleetview_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 10)
//!     .with_duration(5.0)
//!     .run(ScenarioId::ToggleStorm);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
mod feed;
mod oracle;
mod runner;
pub mod scenarios;
mod store;
mod view;
mod world;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{RenderedEntity, SimEvent, SimExport, SimFrame, VehiclePosition};
pub use feed::{sim_feed, SimFeed, SimFeedController};
pub use oracle::{vehicle_id, Oracle, SimVehicle};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use store::SimStore;
pub use view::SimView;
pub use world::{SimConfig, SimEngine, SimWorld};
