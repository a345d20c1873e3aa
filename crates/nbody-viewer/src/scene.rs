//! Scene synchronizer: binds the active scenario's bodies into the 3D scene.
//!
//! [`SceneBinding`] is the sole owner of the render resources for the shown
//! scenario: one camera, the lights, one sphere entity per body, and the mesh
//! and material assets they use. Resources go through three phases:
//!
//! - **Acquire** when playback exposes a frame whose generation is not bound
//! - **Update** every frame, copying the cursor's positions into the bodies
//! - **Release** when the scenario is replaced, playback leaves `Ready`, or the
//!   app exits
//!
//! At most one set of resources is alive at any time.

use bevy::camera::ClearColorConfig;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;
use bevy::window::RequestRedraw;
use glam::DVec3;
use nbody_trajectory::{Generation, Scenario};

use crate::loader::{ActivePlayback, LoaderSet};

/// Plugin for keeping the 3D scene in step with playback.
pub struct SceneSyncPlugin;

impl Plugin for SceneSyncPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneBinding>()
            .add_systems(Startup, spawn_overlay_camera)
            .add_systems(
                Update,
                (sync_scene_binding, update_body_transforms)
                    .chain()
                    .after(LoaderSet),
            )
            .add_systems(Last, release_on_exit);
    }
}

/// Background colour of the 3D view.
const BACKGROUND: Color = Color::srgb(0.01, 0.01, 0.03);

/// Body colours, cycled if a scenario has more bodies than entries.
const BODY_COLORS: [Color; 3] = [
    Color::srgb(1.0, 0.55, 0.2),
    Color::srgb(0.35, 0.65, 1.0),
    Color::srgb(0.6, 1.0, 0.45),
];

/// Body radius as a fraction of the trajectory's extent, for the heaviest body.
const BODY_RADIUS_FRACTION: f32 = 0.03;

/// Camera distance as a multiple of the trajectory's extent.
const CAMERA_DISTANCE_FACTOR: f32 = 1.6;

/// Clip planes as multiples of the trajectory's extent.
const NEAR_PLANE_FACTOR: f32 = 0.001;
const FAR_PLANE_FACTOR: f32 = 100.0;

/// Smallest extent used for framing, so a motionless single point still
/// gets a camera distance and body size.
const MIN_EXTENT: f32 = 1e-6;

/// Marker for the persistent camera that hosts the egui overlay.
///
/// It clears the window while no scenario is bound and draws over the scene
/// camera otherwise.
#[derive(Component)]
pub struct OverlayCamera;

/// Marker for every entity owned by a [`SceneBinding`].
#[derive(Component)]
pub struct SceneEntity;

/// The body index an entity renders.
#[derive(Component, Debug, Clone, Copy)]
pub struct BodyBinding {
    pub index: usize,
}

/// Exclusively-owned render resources for the bound scenario.
#[derive(Resource, Default)]
pub struct SceneBinding {
    bound: Option<BoundScene>,
}

struct BoundScene {
    generation: Generation,
    camera: Entity,
    lights: Vec<Entity>,
    bodies: Vec<Entity>,
    meshes: Vec<Handle<Mesh>>,
    materials: Vec<Handle<StandardMaterial>>,
}

impl SceneBinding {
    /// Generation of the bound scenario, if any.
    #[must_use]
    pub fn generation(&self) -> Option<Generation> {
        self.bound.as_ref().map(|b| b.generation)
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Spawn the camera, lights and one body per scenario body.
    fn acquire(
        &mut self,
        generation: Generation,
        scenario: &Scenario,
        commands: &mut Commands,
        meshes: &mut Assets<Mesh>,
        materials: &mut Assets<StandardMaterial>,
    ) {
        let (center, extent) = framing(scenario);
        let eye = center + Vec3::new(0.0, 0.45, 1.0).normalize() * extent * CAMERA_DISTANCE_FACTOR;

        let camera = commands
            .spawn((
                SceneEntity,
                Camera3d::default(),
                Camera {
                    order: 0,
                    clear_color: ClearColorConfig::Custom(BACKGROUND),
                    ..default()
                },
                Projection::Perspective(PerspectiveProjection {
                    near: extent * NEAR_PLANE_FACTOR,
                    far: extent * FAR_PLANE_FACTOR,
                    ..default()
                }),
                Transform::from_translation(eye).looking_at(center, Vec3::Y),
            ))
            .id();

        let lights = vec![
            commands
                .spawn((
                    SceneEntity,
                    DirectionalLight {
                        illuminance: 8_000.0,
                        ..default()
                    },
                    Transform::default().looking_to(Vec3::new(-0.4, -1.0, -0.6), Vec3::Y),
                ))
                .id(),
            commands
                .spawn((
                    SceneEntity,
                    PointLight {
                        intensity: 2_000_000.0 * extent * extent,
                        range: extent * 10.0,
                        shadows_enabled: false,
                        ..default()
                    },
                    Transform::from_translation(center + Vec3::new(0.0, extent, extent)),
                ))
                .id(),
        ];

        let radii = body_radii(&scenario.masses, extent);
        let mut bound_meshes = Vec::with_capacity(radii.len());
        let mut bound_materials = Vec::with_capacity(radii.len());
        let mut bodies = Vec::with_capacity(radii.len());

        let initial = scenario.positions_at(0).unwrap_or(&[]);
        for (index, radius) in radii.into_iter().enumerate() {
            let mesh = meshes.add(Sphere::new(radius).mesh().uv(32, 18));
            let material = materials.add(StandardMaterial {
                base_color: BODY_COLORS[index % BODY_COLORS.len()],
                emissive: BODY_COLORS[index % BODY_COLORS.len()].to_linear() * 0.4,
                ..default()
            });
            let translation = initial.get(index).map_or(Vec3::ZERO, |p| to_render(*p));

            let entity = commands
                .spawn((
                    SceneEntity,
                    BodyBinding { index },
                    Mesh3d(mesh.clone()),
                    MeshMaterial3d(material.clone()),
                    Transform::from_translation(translation),
                ))
                .id();

            bound_meshes.push(mesh);
            bound_materials.push(material);
            bodies.push(entity);
        }

        tracing::info!(
            "Acquired scene for '{}': {} bodies (generation {})",
            scenario.name,
            bodies.len(),
            generation.get()
        );

        self.bound = Some(BoundScene {
            generation,
            camera,
            lights,
            bodies,
            meshes: bound_meshes,
            materials: bound_materials,
        });
    }

    /// Despawn every owned entity and free owned assets. No-op when unbound.
    fn release(
        &mut self,
        commands: &mut Commands,
        meshes: &mut Assets<Mesh>,
        materials: &mut Assets<StandardMaterial>,
    ) {
        let Some(bound) = self.bound.take() else {
            return;
        };

        for entity in std::iter::once(bound.camera)
            .chain(bound.lights)
            .chain(bound.bodies)
        {
            commands.entity(entity).despawn();
        }
        for mesh in &bound.meshes {
            meshes.remove(mesh);
        }
        for material in &bound.materials {
            materials.remove(material);
        }

        tracing::debug!("Released scene (generation {})", bound.generation.get());
    }
}

/// Convert a trajectory position to a render translation.
#[allow(clippy::cast_possible_truncation)]
fn to_render(position: DVec3) -> Vec3 {
    position.as_vec3()
}

/// Centre and extent of the whole trajectory, for camera placement.
fn framing(scenario: &Scenario) -> (Vec3, f32) {
    let (min, max) = scenario.bounds();
    let center = to_render((min + max) * 0.5);
    #[allow(clippy::cast_possible_truncation)]
    let extent = ((max - min).length() as f32).max(MIN_EXTENT);
    (center, extent)
}

/// Sphere radius per body, scaled by the cube root of relative mass.
fn body_radii(masses: &[f64], extent: f32) -> Vec<f32> {
    let heaviest = masses.iter().copied().fold(0.0_f64, f64::max);
    let base = extent * BODY_RADIUS_FRACTION;
    masses
        .iter()
        .map(|&m| {
            if heaviest > 0.0 && m > 0.0 {
                #[allow(clippy::cast_possible_truncation)]
                let relative = (m / heaviest).cbrt() as f32;
                base * relative.max(0.25)
            } else {
                base * 0.25
            }
        })
        .collect()
}

/// Spawn the camera that hosts the egui overlay.
fn spawn_overlay_camera(mut commands: Commands) {
    commands.spawn((
        OverlayCamera,
        bevy_egui::PrimaryEguiContext,
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::Custom(BACKGROUND),
            ..default()
        },
    ));
}

/// Acquire or release render resources when the shown scenario changes.
#[allow(clippy::needless_pass_by_value)]
fn sync_scene_binding(
    mut commands: Commands,
    playback: Res<ActivePlayback>,
    mut binding: ResMut<SceneBinding>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut overlay: Query<&mut Camera, With<OverlayCamera>>,
) {
    let frame = playback.frame();
    let wanted = frame.map(|f| f.generation);
    if binding.generation() == wanted {
        return;
    }

    binding.release(&mut commands, &mut meshes, &mut materials);
    if let Some(frame) = frame {
        binding.acquire(
            frame.generation,
            frame.scenario,
            &mut commands,
            &mut meshes,
            &mut materials,
        );
    }

    // The overlay only clears the window when there is no scene beneath it.
    let clear_color = if binding.is_bound() {
        ClearColorConfig::None
    } else {
        ClearColorConfig::Custom(BACKGROUND)
    };
    for mut camera in &mut overlay {
        camera.clear_color = clear_color;
    }
}

/// Per-frame tick: move each body to its position at the cursor.
#[allow(clippy::needless_pass_by_value)]
fn update_body_transforms(
    playback: Res<ActivePlayback>,
    binding: Res<SceneBinding>,
    mut bodies: Query<(&BodyBinding, &mut Transform)>,
    mut redraw: MessageWriter<RequestRedraw>,
) {
    let Some(frame) = playback.frame() else {
        return;
    };
    if binding.generation() != Some(frame.generation) {
        return;
    }
    let Some(positions) = frame.positions() else {
        tracing::warn!(
            "Cursor {} out of range for '{}', skipping frame",
            frame.cursor,
            frame.scenario.name
        );
        return;
    };

    for (body, mut transform) in &mut bodies {
        let Some(position) = positions.get(body.index) else {
            tracing::warn!("No position for body {} at step {}", body.index, frame.cursor);
            continue;
        };
        let translation = to_render(*position);
        if transform.translation != translation {
            transform.translation = translation;
        }
    }

    redraw.write(RequestRedraw);
}

/// Release the bound scene when the app is shutting down.
#[allow(clippy::needless_pass_by_value)]
fn release_on_exit(
    mut exits: MessageReader<AppExit>,
    mut commands: Commands,
    mut binding: ResMut<SceneBinding>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if exits.read().next().is_none() {
        return;
    }
    binding.release(&mut commands, &mut meshes, &mut materials);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nbody_trajectory::{Catalog, Scenario};

    use super::*;

    const TWO_STEP_JSON: &str = r#"{
        "scenario": "two step",
        "masses": [1, 1, 1],
        "ejectionTime": 5,
        "placeholder": true,
        "time": [0, 1],
        "positions": [
            [[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            [[0.1, 0, 0], [1.1, 0, 0], [0, 1.1, 0]]
        ]
    }"#;

    fn two_step() -> Arc<Scenario> {
        Arc::new(Scenario::from_json(TWO_STEP_JSON.as_bytes()).unwrap())
    }

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .init_resource::<Assets<Mesh>>()
            .init_resource::<Assets<StandardMaterial>>()
            .init_resource::<ActivePlayback>()
            .init_resource::<SceneBinding>()
            .add_message::<RequestRedraw>()
            .add_systems(Update, (sync_scene_binding, update_body_transforms).chain());
        app
    }

    fn load(app: &mut App, id: &str, scenario: Arc<Scenario>) {
        let descriptor = Catalog::builtin().get(id).unwrap();
        let mut playback = app.world_mut().resource_mut::<ActivePlayback>();
        let generation = playback.select(descriptor);
        assert!(playback.load_succeeded(generation, scenario));
    }

    fn scene_entity_count(app: &mut App) -> usize {
        app.world_mut()
            .query_filtered::<Entity, With<SceneEntity>>()
            .iter(app.world())
            .count()
    }

    fn body_translation(app: &mut App, index: usize) -> Vec3 {
        app.world_mut()
            .query::<(&BodyBinding, &Transform)>()
            .iter(app.world())
            .find(|(body, _)| body.index == index)
            .map(|(_, transform)| transform.translation)
            .unwrap()
    }

    #[test]
    fn test_body_follows_cursor() {
        let mut app = test_app();
        load(&mut app, "figure-eight", two_step());
        app.update();

        let bodies = app
            .world_mut()
            .query::<&BodyBinding>()
            .iter(app.world())
            .count();
        assert_eq!(bodies, 3);
        assert_eq!(body_translation(&mut app, 0), Vec3::ZERO);

        app.world_mut().resource_mut::<ActivePlayback>().step();
        app.update();
        assert_eq!(body_translation(&mut app, 0), Vec3::new(0.1, 0.0, 0.0));

        // Saturated step leaves the scene where it was.
        app.world_mut().resource_mut::<ActivePlayback>().step();
        app.update();
        assert_eq!(body_translation(&mut app, 0), Vec3::new(0.1, 0.0, 0.0));
    }

    #[test]
    fn test_update_does_not_mutate_scenario() {
        let mut app = test_app();
        let scenario = two_step();
        let before = (*scenario).clone();
        load(&mut app, "figure-eight", Arc::clone(&scenario));

        for _ in 0..3 {
            app.update();
        }
        assert_eq!(*scenario, before);
    }

    #[test]
    fn test_switching_does_not_grow_resources() {
        let mut app = test_app();
        load(&mut app, "figure-eight", two_step());
        app.update();
        let per_scene = scene_entity_count(&mut app);
        assert_eq!(per_scene, 1 + 2 + 3);

        for i in 0..10 {
            let id = if i % 2 == 0 { "lagrange" } else { "pythagorean" };
            load(&mut app, id, two_step());
            app.update();

            assert_eq!(scene_entity_count(&mut app), per_scene);
            assert_eq!(app.world().resource::<Assets<Mesh>>().len(), 3);
            assert_eq!(app.world().resource::<Assets<StandardMaterial>>().len(), 3);
        }
    }

    #[test]
    fn test_loading_releases_scene() {
        let mut app = test_app();
        load(&mut app, "figure-eight", two_step());
        app.update();
        assert!(app.world().resource::<SceneBinding>().is_bound());

        let descriptor = Catalog::builtin().get("lagrange").unwrap();
        app.world_mut()
            .resource_mut::<ActivePlayback>()
            .select(descriptor);
        app.update();

        assert!(!app.world().resource::<SceneBinding>().is_bound());
        assert_eq!(scene_entity_count(&mut app), 0);
        assert!(app.world().resource::<Assets<Mesh>>().is_empty());
    }

    #[test]
    fn test_unknown_body_index_is_skipped() {
        let mut app = test_app();
        load(&mut app, "figure-eight", two_step());
        app.update();

        let stray = app
            .world_mut()
            .spawn((BodyBinding { index: 5 }, Transform::from_xyz(7.0, 7.0, 7.0)))
            .id();

        app.world_mut().resource_mut::<ActivePlayback>().step();
        app.update();

        assert_eq!(body_translation(&mut app, 0), Vec3::new(0.1, 0.0, 0.0));
        assert_eq!(body_translation(&mut app, 2), Vec3::new(0.0, 1.1, 0.0));
        let stray_translation = app.world().get::<Transform>(stray).unwrap().translation;
        assert_eq!(stray_translation, Vec3::splat(7.0));
    }

    #[test]
    fn test_camera_clip_planes_scale_with_extent() {
        let mut app = test_app();
        load(&mut app, "figure-eight", two_step());
        app.update();

        let (_, extent) = framing(&two_step());
        let projection = app
            .world_mut()
            .query_filtered::<&Projection, With<Camera3d>>()
            .single(app.world())
            .unwrap()
            .clone();
        let Projection::Perspective(perspective) = projection else {
            panic!("scene camera should use a perspective projection");
        };
        assert!((perspective.near - extent * NEAR_PLANE_FACTOR).abs() < 1e-6);
        assert!(perspective.far > extent * CAMERA_DISTANCE_FACTOR * 2.0);
    }

    #[test]
    fn test_framing_follows_small_orbits() {
        let json = r#"{
            "scenario": "tiny",
            "masses": [1, 1, 1],
            "ejectionTime": 0,
            "placeholder": true,
            "time": [0],
            "positions": [[[0, 0, 0], [0.001, 0, 0], [0, 0.001, 0]]]
        }"#;
        let scenario = Scenario::from_json(json.as_bytes()).unwrap();
        let (center, extent) = framing(&scenario);

        assert!((extent - 0.001_f32 * 2.0_f32.sqrt()).abs() < 1e-6);
        assert!((center - Vec3::new(0.0005, 0.0005, 0.0)).length() < 1e-6);
        assert!(body_radii(&scenario.masses, extent)[0] < 0.001);
    }

    #[test]
    fn test_body_radii_scale_with_mass() {
        let radii = body_radii(&[1.0, 8.0, 0.0], 10.0);
        assert!((radii[1] - 0.3).abs() < 1e-6);
        assert!((radii[0] - 0.15).abs() < 1e-6);
        assert!((radii[2] - 0.075).abs() < 1e-6);
    }

    #[test]
    fn test_framing_centres_on_bounds() {
        let (center, extent) = framing(&two_step());
        assert!((center - Vec3::new(0.55, 0.55, 0.0)).length() < 1e-6);
        assert!(extent >= 1.0);
    }
}
