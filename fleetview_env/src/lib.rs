//! FleetView Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction allowing the FleetView
//! engine to run against a real map and backend in **Production** (tokio)
//! and against in-memory fakes in **Simulation**.
//!
//! # Core Concept: The Reactor Pattern
//!
//! The engine never performs I/O itself. Every outside effect goes through
//! one of the collaborator traits:
//! - Time and task spawning (`FleetViewContext`)
//! - Persistence (`EntityStore`)
//! - Live locations (`LocationFeed`)
//! - Rendering (`DisplaySurface`, `ViewControls`)
//!
//! # Example
//!
//! ```ignore
//! use fleetview_env::{FleetViewContext, LocationFeed};
//!
//! async fn pump<Ctx: FleetViewContext, Feed: LocationFeed>(ctx: &Ctx, feed: &Feed) {
//!     while let Some(msg) = feed.recv().await {
//!         handle(msg, ctx.epoch_millis());
//!     }
//! }
//! ```

mod context;
mod error;
mod feed;
mod store;
mod surface;
mod tokio_impl;
mod types;
mod view;

pub use context::FleetViewContext;
pub use error::EnvError;
pub use feed::LocationFeed;
pub use store::{EntityStore, RecordFilter};
pub use surface::{DisplaySurface, MapObject, Marker, MarkerStyle, PathStyle, Polyline, VecSurface};
pub use tokio_impl::TokioContext;
pub use types::{
    DriverId, DriverRecord, EntityId, EntityRecord, FeedMessage, GeoPoint, LocationPoint,
    RawLocation, TripId, TripRecord,
};
pub use view::{Panel, ViewControls};
