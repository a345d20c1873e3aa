//! Scenario selection and async trajectory loading.
//!
//! A [`SelectScenario`] message moves playback to `Loading` and starts one
//! fetch tagged with the new generation. Results come back over an
//! `async_channel` and are applied by [`Playback`], which drops anything that
//! is not from the latest selection.
//!
//! Fetches are started by `LoadSpawner` from the `async_runtime` module.

use std::sync::Arc;

use bevy::prelude::*;
use nbody_trajectory::{Catalog, Client, Generation, MemoryCache, Playback, Scenario};

use crate::async_runtime::LoadSpawner;
use crate::launch_params::LaunchParams;

/// Plugin for selecting and loading scenarios.
pub struct ScenarioLoaderPlugin;

impl Plugin for ScenarioLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScenarioCatalog>()
            .init_resource::<ActivePlayback>()
            .init_resource::<LoaderState>()
            .init_resource::<LoaderChannels>()
            .add_message::<SelectScenario>()
            .add_systems(Startup, select_initial_scenario)
            .add_systems(
                Update,
                (start_selected_loads, poll_scenario_loads)
                    .chain()
                    .in_set(LoaderSet),
            );
    }
}

/// Systems that change which scenario is active.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderSet;

/// Request to show a catalog scenario.
#[derive(Message, Debug, Clone)]
pub struct SelectScenario {
    /// Catalog id of the scenario.
    pub id: String,
}

impl SelectScenario {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// The scenarios offered by the selector.
#[derive(Resource, Default, Deref)]
pub struct ScenarioCatalog(pub Catalog);

/// The playback state machine shared by the loader, scene and UI.
#[derive(Resource, Default, Deref, DerefMut)]
pub struct ActivePlayback(pub Playback);

/// State for the scenario loader.
#[derive(Resource)]
pub struct LoaderState {
    /// The HTTP client for fetching trajectory files.
    pub client: Arc<Client<MemoryCache>>,
}

impl FromWorld for LoaderState {
    fn from_world(world: &mut World) -> Self {
        let origin = world
            .get_resource::<LaunchParams>()
            .map_or_else(|| LaunchParams::default().origin, |p| p.origin.clone());
        let client = Client::with_cache(&origin, MemoryCache::new());

        tracing::info!("Loading scenarios from {}", client.data_root());

        Self {
            client: Arc::new(client),
        }
    }
}

/// A finished fetch, tagged with the generation it was started for.
pub type LoadResult = (Generation, nbody_trajectory::Result<Arc<Scenario>>);

/// Channel for receiving finished loads from background tasks.
#[derive(Resource)]
pub struct LoaderChannels {
    result_rx: async_channel::Receiver<LoadResult>,
    result_tx: async_channel::Sender<LoadResult>,
}

impl LoaderChannels {
    /// A sender for reporting finished loads.
    pub fn sender(&self) -> async_channel::Sender<LoadResult> {
        self.result_tx.clone()
    }
}

impl Default for LoaderChannels {
    fn default() -> Self {
        let (result_tx, result_rx) = async_channel::unbounded();
        Self {
            result_rx,
            result_tx,
        }
    }
}

/// Select the launch scenario, or the first catalog entry.
#[allow(clippy::needless_pass_by_value)]
fn select_initial_scenario(
    catalog: Res<ScenarioCatalog>,
    params: Option<Res<LaunchParams>>,
    mut requests: MessageWriter<SelectScenario>,
) {
    let requested = params.and_then(|p| p.scenario.clone());
    let id = match requested {
        Some(id) if catalog.get(&id).is_some() => id,
        Some(id) => {
            tracing::warn!("Unknown scenario '{}', showing the first one instead", id);
            match catalog.first() {
                Some(first) => first.id.to_string(),
                None => return,
            }
        }
        None => match catalog.first() {
            Some(first) => first.id.to_string(),
            None => {
                tracing::warn!("Scenario catalog is empty");
                return;
            }
        },
    };

    requests.write(SelectScenario::new(id));
}

/// Move playback to `Loading` and start a fetch for each selection.
#[allow(clippy::needless_pass_by_value)]
fn start_selected_loads(
    mut requests: MessageReader<SelectScenario>,
    catalog: Res<ScenarioCatalog>,
    mut playback: ResMut<ActivePlayback>,
    spawner: LoadSpawner,
) {
    for request in requests.read() {
        let Some(descriptor) = catalog.get(&request.id) else {
            tracing::debug!("Ignoring selection of unknown scenario '{}'", request.id);
            continue;
        };

        let generation = playback.select(descriptor);
        spawner.spawn_load(descriptor, generation);

        tracing::info!(
            "Started loading '{}' (generation {})",
            descriptor.id,
            generation.get()
        );
    }
}

/// Apply finished loads to playback.
#[allow(clippy::needless_pass_by_value)]
fn poll_scenario_loads(mut playback: ResMut<ActivePlayback>, channels: Res<LoaderChannels>) {
    while let Ok((generation, result)) = channels.result_rx.try_recv() {
        match result {
            Ok(scenario) => {
                let name = scenario.name.clone();
                let bodies = scenario.body_count();
                let samples = scenario.sample_count();
                if playback.load_succeeded(generation, scenario) {
                    tracing::info!(
                        "Loaded scenario '{}': {} bodies, {} samples",
                        name,
                        bodies,
                        samples
                    );
                } else {
                    tracing::debug!(
                        "Discarded stale scenario '{}' (generation {})",
                        name,
                        generation.get()
                    );
                }
            }
            Err(e) => {
                if playback.load_failed(generation, &e) {
                    tracing::error!("Failed to load scenario: {}", e);
                } else {
                    tracing::debug!(
                        "Ignored failure for superseded generation {}: {}",
                        generation.get(),
                        e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<ScenarioCatalog>()
            .init_resource::<ActivePlayback>()
            .init_resource::<LoaderChannels>()
            .add_message::<SelectScenario>()
            .add_systems(Update, poll_scenario_loads);
        app
    }

    fn scenario(name: &str, x: f64) -> Arc<Scenario> {
        let json = format!(
            r#"{{
                "scenario": "{name}",
                "masses": [1, 1, 1],
                "ejectionTime": 0,
                "placeholder": true,
                "time": [0],
                "positions": [[[{x}, 0, 0], [1, 0, 0], [0, 1, 0]]]
            }}"#
        );
        Arc::new(Scenario::from_json(json.as_bytes()).unwrap())
    }

    /// App running the request-side systems with a real fetch runtime.
    ///
    /// Port 9 is never served, so spawned fetches fail in the background and
    /// their results sit unread in the channel.
    #[cfg(not(target_family = "wasm"))]
    fn request_app(scenario: Option<&str>) -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, bevy_tokio_tasks::TokioTasksPlugin::default()))
            .insert_resource(LaunchParams {
                origin: "http://127.0.0.1:9".to_string(),
                scenario: scenario.map(str::to_string),
            })
            .init_resource::<ScenarioCatalog>()
            .init_resource::<ActivePlayback>()
            .init_resource::<LoaderState>()
            .init_resource::<LoaderChannels>()
            .add_message::<SelectScenario>()
            .add_systems(Startup, select_initial_scenario)
            .add_systems(Update, start_selected_loads);
        app
    }

    #[cfg(not(target_family = "wasm"))]
    fn active_id(app: &App) -> Option<&'static str> {
        app.world()
            .resource::<ActivePlayback>()
            .active()
            .map(|d| d.id)
    }

    #[test]
    #[cfg(not(target_family = "wasm"))]
    fn test_startup_selects_first_scenario() {
        let mut app = request_app(None);
        app.update();

        let playback = app.world().resource::<ActivePlayback>();
        assert!(playback.is_loading());
        assert_eq!(playback.generation().get(), 1);
        assert_eq!(active_id(&app), Some("figure-eight"));
    }

    #[test]
    #[cfg(not(target_family = "wasm"))]
    fn test_launch_scenario_selected() {
        let mut app = request_app(Some("lagrange"));
        app.update();
        assert_eq!(active_id(&app), Some("lagrange"));
    }

    #[test]
    #[cfg(not(target_family = "wasm"))]
    fn test_unknown_launch_scenario_falls_back_to_first() {
        let mut app = request_app(Some("no-such-scenario"));
        app.update();

        assert_eq!(active_id(&app), Some("figure-eight"));
        assert_eq!(
            app.world().resource::<ActivePlayback>().generation().get(),
            1
        );
    }

    #[test]
    #[cfg(not(target_family = "wasm"))]
    fn test_unknown_selection_leaves_playback_unchanged() {
        let mut app = request_app(None);
        app.update();

        let generation = app.world().resource::<ActivePlayback>().generation();
        assert!(
            app.world_mut()
                .resource_mut::<ActivePlayback>()
                .load_succeeded(generation, scenario("shown", 1.0))
        );

        app.world_mut()
            .write_message(SelectScenario::new("no-such-scenario"));
        app.update();

        let playback = app.world().resource::<ActivePlayback>();
        assert_eq!(playback.generation(), generation);
        assert_eq!(playback.frame().unwrap().scenario.name, "shown");
        assert_eq!(active_id(&app), Some("figure-eight"));
    }

    #[test]
    #[cfg(not(target_family = "wasm"))]
    fn test_each_selection_starts_a_new_generation() {
        let mut app = request_app(None);
        app.update();

        app.world_mut().write_message(SelectScenario::new("pythagorean"));
        app.world_mut().write_message(SelectScenario::new("lagrange"));
        app.update();

        let playback = app.world().resource::<ActivePlayback>();
        assert!(playback.is_loading());
        assert_eq!(playback.generation().get(), 3);
        assert_eq!(active_id(&app), Some("lagrange"));
    }

    #[test]
    fn test_stale_failure_keeps_current_scenario() {
        let mut app = test_app();
        let catalog = Catalog::builtin();
        let a = catalog.get("figure-eight").unwrap();
        let b = catalog.get("lagrange").unwrap();

        let (gen_a, gen_b) = {
            let mut playback = app.world_mut().resource_mut::<ActivePlayback>();
            (playback.select(a), playback.select(b))
        };

        let tx = app.world().resource::<LoaderChannels>().sender();
        tx.try_send((gen_b, Ok(scenario("b", 2.0)))).unwrap();
        let error = nbody_trajectory::Error::HttpStatus {
            url: "http://127.0.0.1:8080/data/figure_eight.json".to_string(),
            status: 500,
        };
        tx.try_send((gen_a, Err(error))).unwrap();
        app.update();

        let playback = app.world().resource::<ActivePlayback>();
        assert_eq!(playback.frame().unwrap().scenario.name, "b");
    }

    #[test]
    fn test_results_out_of_order_keep_latest() {
        let mut app = test_app();
        let catalog = Catalog::builtin();
        let a = catalog.get("figure-eight").unwrap();
        let b = catalog.get("lagrange").unwrap();

        let (gen_a, gen_b) = {
            let mut playback = app.world_mut().resource_mut::<ActivePlayback>();
            (playback.select(a), playback.select(b))
        };

        let tx = app.world().resource::<LoaderChannels>().result_tx.clone();
        tx.try_send((gen_b, Ok(scenario("b", 2.0)))).unwrap();
        tx.try_send((gen_a, Ok(scenario("a", 1.0)))).unwrap();
        app.update();

        let playback = app.world().resource::<ActivePlayback>();
        let frame = playback.frame().unwrap();
        assert_eq!(frame.scenario.name, "b");
        assert_eq!(playback.active().unwrap().id, "lagrange");
    }

    #[test]
    fn test_failure_moves_to_failed() {
        let mut app = test_app();
        let descriptor = Catalog::builtin().first().unwrap();
        let generation = app
            .world_mut()
            .resource_mut::<ActivePlayback>()
            .select(descriptor);

        let tx = app.world().resource::<LoaderChannels>().result_tx.clone();
        let error = nbody_trajectory::Error::HttpStatus {
            url: "http://127.0.0.1:8080/data/figure_eight.json".to_string(),
            status: 404,
        };
        tx.try_send((generation, Err(error))).unwrap();
        app.update();

        let playback = app.world().resource::<ActivePlayback>();
        assert!(matches!(
            playback.state(),
            nbody_trajectory::PlaybackState::Failed { .. }
        ));
    }
}
