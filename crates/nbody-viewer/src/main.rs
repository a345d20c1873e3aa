//! Step-through 3D viewer for precomputed three-body trajectories.
//!
//! Pick a scenario, and the viewer fetches its trajectory from `/data/` on the
//! hosting origin and shows the bodies at one time step, advanced with the
//! "Next step" button or the right arrow key.

mod async_runtime;
mod launch_params;
mod loader;
mod scene;
mod ui;

use async_runtime::AsyncRuntimePlugin;
use bevy::prelude::*;
use loader::ScenarioLoaderPlugin;
use scene::SceneSyncPlugin;
use ui::ControlsUiPlugin;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((ScenarioLoaderPlugin, SceneSyncPlugin, ControlsUiPlugin));
    }
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    tracing::info!("Launch parameters: {:?}", params);

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "nbody-viewer".to_string(),
        resolution: (1280, 720).into(),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }));

    // Add async runtime (Tokio on native, no-op on WASM).
    app.add_plugins(AsyncRuntimePlugin);

    // Launch parameters must exist before the loader builds its client.
    app.insert_resource(params).add_plugins(AppPlugin).run();
}
