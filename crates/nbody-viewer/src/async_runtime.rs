//! Background execution of scenario fetches.
//!
//! [`LoadSpawner`] takes a selected descriptor and its generation, runs the
//! fetch off the main loop and sends the tagged result back over the loader's
//! channel. Native builds drive reqwest on the Tokio runtime owned by
//! `bevy_tokio_tasks`; in the browser reqwest uses `fetch` and the future runs
//! on the page thread through `AsyncComputeTaskPool::spawn_local`.

use std::sync::Arc;

use bevy::prelude::*;
use nbody_trajectory::{Client, Generation, MemoryCache, ScenarioDescriptor};

use crate::loader::{LoadResult, LoaderChannels, LoaderState};

/// Plugin that installs the executor scenario fetches run on.
pub struct AsyncRuntimePlugin;

impl Plugin for AsyncRuntimePlugin {
    fn build(&self, app: &mut App) {
        #[cfg(target_family = "wasm")]
        let _ = app;

        #[cfg(not(target_family = "wasm"))]
        app.add_plugins(bevy_tokio_tasks::TokioTasksPlugin::default());
    }
}

/// One scenario fetch, detached from the ECS.
struct LoadJob {
    client: Arc<Client<MemoryCache>>,
    descriptor: &'static ScenarioDescriptor,
    generation: Generation,
    results: async_channel::Sender<LoadResult>,
}

impl LoadJob {
    fn new(
        state: &LoaderState,
        channels: &LoaderChannels,
        descriptor: &'static ScenarioDescriptor,
        generation: Generation,
    ) -> Self {
        Self {
            client: Arc::clone(&state.client),
            descriptor,
            generation,
            results: channels.sender(),
        }
    }

    async fn run(self) {
        let result = self.client.fetch_scenario(self.descriptor).await;
        if self.results.send((self.generation, result)).await.is_err() {
            tracing::debug!(
                "Loader channel closed, dropping '{}' (generation {})",
                self.descriptor.id,
                self.generation.get()
            );
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use bevy::{ecs::system::SystemParam, prelude::*};
    use bevy_tokio_tasks::TokioTasksRuntime;
    use nbody_trajectory::{Generation, ScenarioDescriptor};

    use super::LoadJob;
    use crate::loader::{LoaderChannels, LoaderState};

    /// Starts scenario fetches on the Tokio runtime.
    #[derive(SystemParam)]
    pub struct LoadSpawner<'w> {
        runtime: Res<'w, TokioTasksRuntime>,
        state: Res<'w, LoaderState>,
        channels: Res<'w, LoaderChannels>,
    }

    impl LoadSpawner<'_> {
        /// Fetch `descriptor` in the background and report it as `generation`.
        pub fn spawn_load(&self, descriptor: &'static ScenarioDescriptor, generation: Generation) {
            let job = LoadJob::new(&self.state, &self.channels, descriptor, generation);
            self.runtime.spawn_background_task(move |_ctx| job.run());
        }
    }
}

#[cfg(target_family = "wasm")]
mod wasm {
    use bevy::{ecs::system::SystemParam, prelude::*, tasks::AsyncComputeTaskPool};
    use nbody_trajectory::{Generation, ScenarioDescriptor};

    use super::LoadJob;
    use crate::loader::{LoaderChannels, LoaderState};

    /// Starts scenario fetches on the page thread.
    ///
    /// Browser fetch futures are not `Send`, so they stay on the local executor.
    #[derive(SystemParam)]
    pub struct LoadSpawner<'w> {
        state: Res<'w, LoaderState>,
        channels: Res<'w, LoaderChannels>,
    }

    impl LoadSpawner<'_> {
        /// Fetch `descriptor` in the background and report it as `generation`.
        pub fn spawn_load(&self, descriptor: &'static ScenarioDescriptor, generation: Generation) {
            let job = LoadJob::new(&self.state, &self.channels, descriptor, generation);
            AsyncComputeTaskPool::get().spawn_local(job.run()).detach();
        }
    }
}

#[cfg(not(target_family = "wasm"))]
pub use native::LoadSpawner;
#[cfg(target_family = "wasm")]
pub use wasm::LoadSpawner;
