//! Scenario selector, summary panel and step control.
//!
//! The panel only reads playback and issues requests; scenario changes go
//! through [`SelectScenario`] and time steps through `Playback::step`.

use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::ecs::message::MessageWriter;
use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use nbody_trajectory::{Playback, PlaybackState};

use crate::loader::{ActivePlayback, ScenarioCatalog, SelectScenario};

/// Plugin for the selector and summary overlay.
pub struct ControlsUiPlugin;

impl Plugin for ControlsUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_plugins(FrameTimeDiagnosticsPlugin::default())
            .add_systems(Update, step_on_key)
            .add_systems(EguiPrimaryContextPass, controls_ui_system);
    }
}

/// Keys that advance one time step.
const STEP_KEYS: [KeyCode; 2] = [KeyCode::ArrowRight, KeyCode::KeyN];

/// Advance one time step from the keyboard.
#[allow(clippy::needless_pass_by_value)]
fn step_on_key(
    keys: Res<ButtonInput<KeyCode>>,
    mut contexts: EguiContexts,
    mut playback: ResMut<ActivePlayback>,
) {
    if !keys.any_just_pressed(STEP_KEYS) {
        return;
    }
    // Don't steal keys from a focused egui widget.
    if let Ok(ctx) = contexts.ctx_mut()
        && ctx.wants_keyboard_input()
    {
        return;
    }
    playback.step();
}

/// Render the selector and summary overlay.
#[allow(clippy::needless_pass_by_value)]
fn controls_ui_system(
    mut contexts: EguiContexts,
    diagnostics: Res<DiagnosticsStore>,
    catalog: Res<ScenarioCatalog>,
    mut playback: ResMut<ActivePlayback>,
    mut requests: MessageWriter<SelectScenario>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(bevy::diagnostic::Diagnostic::smoothed)
        .unwrap_or(0.0);

    let active_id = playback.active().map(|d| d.id);
    let selected_text = playback.active().map_or("Select a scenario", |d| d.name);

    egui::Window::new("Three-body scenarios")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            egui::ComboBox::from_id_salt("scenario")
                .selected_text(selected_text)
                .show_ui(ui, |ui| {
                    for descriptor in catalog.iter() {
                        let selected = active_id == Some(descriptor.id);
                        if ui.selectable_label(selected, descriptor.name).clicked() {
                            requests.write(SelectScenario::new(descriptor.id));
                        }
                    }
                });
            ui.separator();

            match playback.state() {
                PlaybackState::Loading => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading…");
                    });
                }
                PlaybackState::Failed { .. } => {
                    ui.colored_label(egui::Color32::LIGHT_RED, "Failed to load scenario.");
                }
                PlaybackState::Ready { .. } => {
                    summary(ui, &playback.0);
                    ui.separator();
                    if ui
                        .add_enabled(playback.can_step(), egui::Button::new("Next step ▶"))
                        .clicked()
                    {
                        playback.step();
                    }
                }
            }

            ui.separator();
            ui.label(format!("FPS: {fps:.0}"));
        });

    Ok(())
}

/// Scenario facts and the current step.
fn summary(ui: &mut egui::Ui, playback: &Playback) {
    let Some(frame) = playback.frame() else {
        return;
    };
    let scenario = frame.scenario;

    egui::Grid::new("summary").num_columns(2).show(ui, |ui| {
        ui.label("Scenario");
        ui.label(scenario.name.as_str());
        ui.end_row();

        ui.label("Bodies");
        ui.label(scenario.body_count().to_string());
        ui.end_row();

        ui.label("Masses");
        ui.label(format_masses(&scenario.masses));
        ui.end_row();

        ui.label("Ejection time");
        ui.label(format!("{:.3}", scenario.ejection_time));
        ui.end_row();

        if scenario.placeholder {
            ui.label("Data");
            ui.label("placeholder");
            ui.end_row();
        }

        ui.label("Step");
        ui.label(format!("{} / {}", frame.cursor + 1, scenario.sample_count()));
        ui.end_row();

        ui.label("Time");
        ui.label(frame.time().map_or_else(|| "-".to_string(), |t| format!("{t:.4}")));
        ui.end_row();
    });
}

fn format_masses(masses: &[f64]) -> String {
    masses
        .iter()
        .map(|m| format!("{m}"))
        .collect::<Vec<_>>()
        .join(", ")
}
