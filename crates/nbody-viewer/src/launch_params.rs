//! Launch parameters for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! In the browser the hosting page's origin is used and the first catalog
//! scenario is shown.

use bevy::prelude::*;

/// Origin served by `trunk serve` and the bundled dev setup.
const DEFAULT_ORIGIN: &str = "http://127.0.0.1:8080";

/// Launch parameters for the viewer.
#[derive(Resource, Debug, Clone)]
pub struct LaunchParams {
    /// Origin that serves `/data/<file>` trajectory files.
    pub origin: String,
    /// Scenario id to select at startup; the first catalog entry when `None`.
    pub scenario: Option<String>,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            scenario: None,
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::{DEFAULT_ORIGIN, LaunchParams};

    #[derive(Parser)]
    #[command(about = "Step through precomputed three-body trajectories")]
    struct CliArgs {
        /// Origin serving the `data/` directory.
        #[arg(long, default_value = DEFAULT_ORIGIN)]
        origin: String,

        /// Scenario id to show first.
        #[arg(long)]
        scenario: Option<String>,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            origin: args.origin,
            scenario: args.scenario,
        }
    }
}

#[cfg(target_family = "wasm")]
mod wasm {
    use wasm_bindgen::JsValue;

    use super::LaunchParams;

    /// Read `globalThis.location.origin`.
    fn page_origin() -> Option<String> {
        let location = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("location")).ok()?;
        js_sys::Reflect::get(&location, &JsValue::from_str("origin"))
            .ok()?
            .as_string()
    }

    pub fn parse() -> LaunchParams {
        let mut params = LaunchParams::default();
        match page_origin() {
            Some(origin) => params.origin = origin,
            None => tracing::warn!("could not read page origin, using {}", params.origin),
        }
        params
    }
}

/// Parse launch parameters from CLI args (native) or the hosting page (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        wasm::parse()
    }
}
