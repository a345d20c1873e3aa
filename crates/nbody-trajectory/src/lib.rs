//! Scenario catalog, loader and playback state for precomputed N-body trajectories.
//!
//! Trajectories are computed offline and served as one JSON file per scenario.
//! This crate fetches and validates those files and owns the playback state
//! machine that decides which scenario and time step a viewer shows.
//!
//! # Design principles
//!
//! - **Web-compatible**: Works on desktop and WASM via reqwest
//! - **Runtime-agnostic**: Returns `impl Future`, works with any executor
//! - **Last selection wins**: Loads are generation-tagged; stale results are dropped
//!
//! # Example
//!
//! ```ignore
//! use nbody_trajectory::{Catalog, Client, Playback};
//!
//! let catalog = Catalog::builtin();
//! let client = Client::new("http://127.0.0.1:8080");
//! let mut playback = Playback::new();
//!
//! let descriptor = catalog.first().unwrap();
//! let generation = playback.select(descriptor);
//! match client.fetch_scenario(descriptor).await {
//!     Ok(scenario) => playback.load_succeeded(generation, scenario),
//!     Err(e) => playback.load_failed(generation, &e),
//! };
//! playback.step();
//! ```

pub mod cache;
pub mod catalog;
mod client;
mod error;
pub mod playback;
pub mod types;

pub use cache::{MemoryCache, NoCache, ScenarioCache};
pub use catalog::Catalog;
pub use client::Client;
pub use error::{Error, Result};
pub use playback::{Frame, Generation, Playback, PlaybackState};
pub use types::{Scenario, ScenarioDescriptor};
