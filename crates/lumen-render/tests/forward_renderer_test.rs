// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end tests driving the forward renderer against the headless device.
//!
//! Each test publishes scene events, runs `update`/`draw` frames and checks
//! the pools, the light buffer and the traffic recorded by the device.

use anyhow::{Context, Result};
use lumen_core::asset::{
    AssetId, AssetRegistry, Material, Mesh, ParameterBlock, ParameterValue, ShaderTemplate, Texture,
};
use lumen_core::event::EventBus;
use lumen_core::math::{LinearRgba, Mat4, Vec3};
use lumen_core::renderer::{HeadlessDevice, LightType, PointLight};
use lumen_core::scene::{
    Camera, CameraRef, Component, ComponentKind, EntityId, LightRef, MeshRenderer, SceneEvent,
    TransformRef,
};
use lumen_render::lights::PointLightRecord;
use lumen_render::renderer::FRAME_DETAILS_SIZE;
use lumen_render::{
    DrawReport, ErrorScope, ForwardRenderer, FrameReport, InstanceKey, PoolStats,
    RenderCoreError, RenderTargetConfig, RendererConfig,
};
use std::sync::Arc;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A renderer wired to a headless device, an in-memory registry and a scene event bus.
struct Harness {
    device: Arc<HeadlessDevice>,
    registry: Arc<AssetRegistry>,
    events: EventBus<SceneEvent>,
    renderer: ForwardRenderer,
    next_entity: u32,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(RendererConfig::default())
    }

    fn with_config(config: RendererConfig) -> Self {
        init_logger();
        let device = Arc::new(HeadlessDevice::new());
        let registry = Arc::new(AssetRegistry::new());
        let events = EventBus::new();
        let mut renderer = ForwardRenderer::new(device.clone(), registry.clone(), &events, config);
        renderer.initialize().expect("renderer should initialize");
        Self {
            device,
            registry,
            events,
            renderer,
            next_entity: 0,
        }
    }

    fn entity(&mut self) -> EntityId {
        let entity = EntityId::new(self.next_entity, 0);
        self.next_entity += 1;
        entity
    }

    fn mesh(&self) -> AssetId {
        self.registry.add_mesh(Mesh::quad("quad")).0
    }

    fn material(&self, label: &str, lit: bool) -> AssetId {
        let material = Material::new(label, ShaderTemplate::default())
            .with_block(
                ParameterBlock::new("surface")
                    .with("tint", ParameterValue::Color(LinearRgba::WHITE))
                    .with("roughness", ParameterValue::Float(0.5)),
            )
            .with_lighting(lit);
        self.registry.add_material(material).0
    }

    fn spawn_camera(&mut self) -> EntityId {
        let entity = self.entity();
        self.events.publish(SceneEvent::ComponentAdded {
            entity,
            component: Component::Camera(CameraRef::new(Camera::default())),
        });
        entity
    }

    fn spawn(&mut self, mesh: AssetId, material: AssetId) -> (EntityId, TransformRef) {
        let entity = self.entity();
        let transform = TransformRef::new(Mat4::from_translation(Vec3::new(
            entity.index as f32,
            0.0,
            0.0,
        )));
        self.events.publish(SceneEvent::ComponentAdded {
            entity,
            component: Component::MeshRenderer(MeshRenderer::new(mesh, material, transform.clone())),
        });
        (entity, transform)
    }

    fn spawn_point_light(&mut self) -> LightRef {
        let entity = self.entity();
        let light = LightRef::new(LightType::Point(PointLight::default()), TransformRef::default());
        self.events.publish(SceneEvent::ComponentAdded {
            entity,
            component: Component::Light(light.clone()),
        });
        light
    }

    fn frame(&mut self) -> FrameReport {
        self.renderer.update().expect("update should not be misused")
    }

    fn draw(&self) -> DrawReport {
        self.renderer.draw().expect("draw should not be misused")
    }

    fn stats(&self) -> PoolStats {
        self.renderer.manager().stats()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// End-to-end scenarios
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_single_entity_creates_and_destroys_its_draw_object() {
    let mut h = Harness::new();
    h.spawn_camera();
    let mesh = h.mesh();
    let material = h.material("flat", false);
    let (entity, transform) = h.spawn(mesh, material);

    let report = h.frame();
    assert!(report.is_clean(), "unexpected errors: {:?}", report.errors);
    assert_eq!(report.draw_objects, 1);
    assert_eq!(report.instances, 1);
    assert_eq!(report.shader_compilations, 1);
    let key = InstanceKey { mesh, material };
    assert_eq!(h.renderer.manager().instanced(key).map(|o| o.len()), Some(1));
    assert_eq!(h.draw().draw_calls, 1);

    let mut unassigned = MeshRenderer::new(mesh, material, transform);
    unassigned.material = None;
    h.events.publish(SceneEvent::ComponentChanged {
        entity,
        component: Component::MeshRenderer(unassigned),
    });
    let report = h.frame();
    assert!(report.is_clean());
    assert_eq!(report.draw_objects, 0);
    assert!(h.renderer.manager().instanced(key).is_none());
    assert_eq!(
        h.stats(),
        PoolStats::default(),
        "mesh, material and shader must be released with the last batch"
    );

    let device = h.device.stats();
    assert_eq!(device.live_programs(), 0);
    assert_eq!(device.live_buffers(), 1, "only the frame details buffer remains");
    assert_eq!(h.draw().draw_calls, 0);
}

#[test]
fn test_two_pairs_produce_two_instanced_draws() {
    let mut h = Harness::new();
    h.spawn_camera();
    let mesh = h.mesh();
    let a = h.material("a", false);
    let b = h.material("b", false);
    for _ in 0..10 {
        h.spawn(mesh, a);
    }
    h.spawn(mesh, b);

    let report = h.frame();
    assert!(report.is_clean());
    assert_eq!(report.draw_objects, 2);
    assert_eq!(report.instances, 11);
    assert_eq!(
        h.renderer.manager().meshes().ref_count(mesh),
        Some(2),
        "each draw object holds one reference to the shared mesh"
    );
    assert_eq!(
        h.stats().shaders,
        1,
        "structurally identical materials share one variant"
    );

    let draw = h.draw();
    assert_eq!(draw.draw_calls, 2);
    assert_eq!(draw.instances, 11);
    let mut counts: Vec<u32> = h.device.draws().iter().map(|d| d.instance_count).collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 10]);
}

#[test]
fn test_first_point_light_recompiles_only_lit_objects() {
    let mut h = Harness::new();
    h.spawn_camera();
    let mesh = h.mesh();
    let lit = h.material("lit", true);
    let unlit = h.material("unlit", false);
    h.spawn(mesh, lit);
    h.spawn(mesh, unlit);
    h.frame();

    let lit_key = InstanceKey { mesh, material: lit };
    let unlit_key = InstanceKey {
        mesh,
        material: unlit,
    };
    let manager = h.renderer.manager();
    let lit_shader = manager.instanced(lit_key).and_then(|o| o.shader());
    let unlit_shader = manager.instanced(unlit_key).and_then(|o| o.shader());
    let recreations = h.renderer.lights().recreations();

    h.spawn_point_light();
    let report = h.frame();
    assert!(report.is_clean());
    assert_eq!(h.renderer.lights().counts().point, 1);
    assert_eq!(h.renderer.lights().recreations(), recreations + 1);
    assert!(h.renderer.lights().buffer().is_some());
    assert_eq!(report.shader_compilations, 1, "only the lit object recompiles");

    let manager = h.renderer.manager();
    let new_lit = manager.instanced(lit_key).and_then(|o| o.shader());
    assert_ne!(new_lit, lit_shader);
    assert_eq!(manager.instanced(unlit_key).and_then(|o| o.shader()), unlit_shader);

    let program = new_lit
        .and_then(|id| manager.shaders().get(id))
        .map(|shader| shader.program())
        .expect("lit variant should be compiled");
    let (vertex, _) = h.device.program_source(program).expect("program source");
    assert!(vertex.contains("#define NUM_POINT_LIGHTS 1"));
    assert_eq!(
        manager.instanced(lit_key).and_then(|o| o.bindings().ok()).and_then(|b| b.lights),
        Some(1),
        "the light block follows the frame details"
    );

    let draw = h.draw();
    assert_eq!(draw.draw_calls, 2);
    let lit_draw = h
        .device
        .draws()
        .into_iter()
        .find(|d| d.program == program)
        .expect("lit draw recorded");
    assert_eq!(lit_draw.uniforms.len(), 3, "details, lights and one material block");
}

// ─────────────────────────────────────────────────────────────────────────────
// Light buffer
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_moving_a_light_patches_without_recreation() {
    let mut h = Harness::new();
    let light = h.spawn_point_light();
    h.frame();
    let recreations = h.renderer.lights().recreations();
    let patches = h.renderer.lights().patches();

    light
        .transform()
        .set_world_matrix(Mat4::from_translation(Vec3::new(0.0, 4.0, 0.0)));
    h.frame();
    light.transform().clear_changed();

    assert_eq!(h.renderer.lights().recreations(), recreations);
    assert_eq!(h.renderer.lights().patches(), patches + 1);

    h.frame();
    assert_eq!(
        h.renderer.lights().patches(),
        patches + 1,
        "an idle frame uploads nothing"
    );
}

#[test]
fn test_replacing_a_light_component_repacks_its_record() -> Result<()> {
    let mut h = Harness::new();
    let entity = h.entity();
    let point_at = |x: f32| {
        LightRef::new(
            LightType::Point(PointLight::default()),
            TransformRef::new(Mat4::from_translation(Vec3::new(x, 0.0, 0.0))),
        )
    };
    h.events.publish(SceneEvent::ComponentAdded {
        entity,
        component: Component::Light(point_at(1.0)),
    });
    h.frame();
    let recreations = h.renderer.lights().recreations();

    h.events.publish(SceneEvent::ComponentChanged {
        entity,
        component: Component::Light(point_at(9.0)),
    });
    h.frame();
    assert_eq!(h.renderer.lights().recreations(), recreations, "same counts, no relayout");

    let buffer = h.renderer.lights().buffer().context("light buffer exists")?;
    let data = h.device.buffer_data(buffer).context("light buffer is live")?;
    let record: PointLightRecord = bytemuck::pod_read_unaligned(&data[0..32]);
    assert_eq!(record.position_range[0], 9.0);
    Ok(())
}

#[test]
fn test_disabling_a_light_relays_the_buffer() {
    let mut h = Harness::new();
    let light = h.spawn_point_light();
    h.frame();
    let recreations = h.renderer.lights().recreations();

    light.set_enabled(false);
    h.frame();
    assert_eq!(h.renderer.lights().recreations(), recreations + 1);
    assert_eq!(h.renderer.lights().counts().total(), 0);
    assert!(h.renderer.lights().buffer().is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Instance buffers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_instance_buffer_grows_monotonically() {
    let mut h = Harness::with_config(RendererConfig {
        initial_instance_capacity: 2,
        ..Default::default()
    });
    h.spawn_camera();
    let mesh = h.mesh();
    let material = h.material("flat", false);
    let key = InstanceKey { mesh, material };

    let mut previous = 2;
    for (spawned, expected) in [(1, 2), (1, 2), (1, 4), (4, 8)] {
        for _ in 0..spawned {
            h.spawn(mesh, material);
        }
        let report = h.frame();
        assert!(report.is_clean(), "exact fit must not error: {:?}", report.errors);
        let object = h.renderer.manager().instanced(key).expect("draw object");
        assert!(object.capacity() >= previous, "capacity never shrinks");
        assert_eq!(object.capacity(), expected);
        assert_eq!(
            h.device.buffer_size(object.instance_buffer()),
            Some(expected as u64 * 64)
        );
        previous = object.capacity();
    }
    assert_eq!(h.draw().instances, 7);
}

#[test]
fn test_moved_transform_uploads_only_its_matrix() {
    let mut h = Harness::new();
    let mesh = h.mesh();
    let material = h.material("flat", false);
    let transforms: Vec<TransformRef> = (0..3).map(|_| h.spawn(mesh, material).1).collect();
    h.frame();

    let moved = Mat4::from_translation(Vec3::new(7.0, 7.0, 7.0));
    transforms[1].set_world_matrix(moved);
    let report = h.frame();
    transforms[1].clear_changed();

    assert_eq!(report.uploaded_bytes, FRAME_DETAILS_SIZE + 64);
    let object = h
        .renderer
        .manager()
        .instanced(InstanceKey { mesh, material })
        .expect("draw object");
    let data = h.device.buffer_data(object.instance_buffer()).expect("instance data");
    let second: Mat4 = bytemuck::pod_read_unaligned(&data[64..128]);
    assert_eq!(second, moved);
}

// ─────────────────────────────────────────────────────────────────────────────
// Materials and shaders
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_shader_compile_error_is_confined_to_its_draw_object() {
    let mut h = Harness::new();
    h.spawn_camera();
    let mesh = h.mesh();
    let good = h.material("good", false);
    let template = ShaderTemplate {
        fragment: "#error unsupported path\nvoid main() {}\n".to_string(),
        ..Default::default()
    };
    let bad = h.registry.add_material(Material::new("bad", template)).0;
    h.spawn(mesh, good);
    h.spawn(mesh, bad);

    let report = h.frame();
    assert_eq!(report.errors.len(), 1);
    let failure = &report.errors[0];
    assert_eq!(failure.scope, ErrorScope::Instanced(InstanceKey { mesh, material: bad }));
    match &failure.error {
        RenderCoreError::ShaderCompile { details, .. } => {
            assert!(details.contains("#error unsupported path"), "{details}");
        }
        other => panic!("expected a compile error, got {other:?}"),
    }

    let draw = h.draw();
    assert_eq!(draw.draw_calls, 1);
    assert_eq!(draw.skipped, 1);

    let report = h.frame();
    assert!(report.is_clean(), "a failed variant is not retried every frame");
    assert_eq!(report.shader_compilations, 0);
}

#[test]
fn test_parameter_edit_rewrites_the_block_in_place() -> Result<()> {
    let mut h = Harness::new();
    let mesh = h.mesh();
    let (material, handle) = h.registry.add_material(
        Material::new("tinted", ShaderTemplate::default())
            .with_block(ParameterBlock::new("surface").with("gain", ParameterValue::Float(1.0))),
    );
    h.spawn(mesh, material);
    h.frame();
    let buffers_created = h.device.stats().buffers_created;

    handle
        .write()
        .set_parameter("surface", "gain", ParameterValue::Float(2.0))?;
    let report = h.frame();
    assert!(report.is_clean());
    assert_eq!(report.shader_compilations, 0);
    assert_eq!(h.device.stats().buffers_created, buffers_created);
    assert!(!handle.read().params_dirty(), "the renderer clears the flag");

    let buffer = h
        .renderer
        .manager()
        .materials()
        .get(material)
        .and_then(|m| m.block_buffers().next())
        .context("material should own one block buffer")?;
    let data = h.device.buffer_data(buffer).context("block buffer is alive")?;
    let gain: f32 = bytemuck::pod_read_unaligned(&data[0..4]);
    assert_eq!(gain, 2.0);
    Ok(())
}

#[test]
fn test_texture_swap_releases_the_previous_texture() {
    let mut h = Harness::new();
    h.spawn_camera();
    let mesh = h.mesh();
    let red = h.registry.add_texture(Texture::solid("red", [255, 0, 0, 255])).0;
    let blue = h.registry.add_texture(Texture::solid("blue", [0, 0, 255, 255])).0;
    let (material, handle) = h.registry.add_material(
        Material::new("textured", ShaderTemplate::default()).with_texture_slot("albedo", Some(red)),
    );
    h.spawn(mesh, material);
    h.frame();
    assert!(h.renderer.manager().textures().contains(red));
    h.draw();
    let first = h.device.take_draws();
    assert_eq!(first[0].textures.len(), 1);

    handle
        .write()
        .set_texture("albedo", Some(blue))
        .expect("slot exists");
    let report = h.frame();
    assert!(report.is_clean());
    let textures = h.renderer.manager().textures();
    assert!(!textures.contains(red));
    assert!(textures.contains(blue));
    assert_eq!(h.device.stats().live_textures(), 1);

    h.draw();
    let second = h.device.take_draws();
    assert_eq!(second[0].textures.len(), 1);
    assert_ne!(second[0].textures[0].texture, first[0].textures[0].texture);
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution and batching
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unresolvable_material_is_reported_once() {
    let mut h = Harness::new();
    let mesh = h.mesh();
    let missing = AssetId::new();
    let (entity, _) = h.spawn(mesh, missing);

    let report = h.frame();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].scope, ErrorScope::Entity(entity));
    assert_eq!(report.draw_objects, 0);
    assert_eq!(h.stats(), PoolStats::default(), "failures are not cached");

    assert!(h.frame().is_clean());
}

#[test]
fn test_add_and_remove_in_one_frame_creates_nothing() {
    let mut h = Harness::new();
    let mesh = h.mesh();
    let material = h.material("flat", false);
    let (entity, _) = h.spawn(mesh, material);
    h.events.publish(SceneEvent::ComponentRemoved {
        entity,
        kind: ComponentKind::MeshRenderer,
    });

    let report = h.frame();
    assert!(report.is_clean());
    assert_eq!(report.draw_objects, 0);
    assert_eq!(h.device.stats().buffers_created, 1, "only the frame details buffer");
}

#[test]
fn test_moving_an_entity_between_materials() {
    let mut h = Harness::new();
    let mesh = h.mesh();
    let a = h.material("a", false);
    let b = h.material("b", false);
    let (entity, transform) = h.spawn(mesh, a);
    h.spawn(mesh, a);
    h.frame();

    h.events.publish(SceneEvent::ComponentChanged {
        entity,
        component: Component::MeshRenderer(MeshRenderer::new(mesh, b, transform)),
    });
    let report = h.frame();
    assert!(report.is_clean());
    let manager = h.renderer.manager();
    let a_object = manager.instanced(InstanceKey { mesh, material: a }).expect("a");
    let b_object = manager.instanced(InstanceKey { mesh, material: b }).expect("b");
    assert!(!a_object.contains(entity));
    assert!(b_object.contains(entity));
    assert_eq!(report.instances, 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_use_before_initialize_is_an_invariant_violation() -> Result<()> {
    init_logger();
    let device = Arc::new(HeadlessDevice::new());
    let registry = Arc::new(AssetRegistry::new());
    let events = EventBus::new();
    let mut renderer = ForwardRenderer::new(device, registry, &events, RendererConfig::default());

    assert!(matches!(
        renderer.update(),
        Err(RenderCoreError::InvariantViolation(_))
    ));
    assert!(matches!(
        renderer.draw(),
        Err(RenderCoreError::InvariantViolation(_))
    ));
    renderer.initialize()?;
    assert!(matches!(
        renderer.initialize(),
        Err(RenderCoreError::InvariantViolation(_))
    ));
    renderer.update()?;
    Ok(())
}

#[test]
fn test_no_active_camera_draws_nothing() {
    let mut h = Harness::new();
    let mesh = h.mesh();
    let material = h.material("flat", false);
    h.spawn(mesh, material);
    h.frame();

    let draw = h.draw();
    assert_eq!(draw.draw_calls, 0);
    assert!(h.device.draws().is_empty());
}

#[test]
fn test_render_target_receives_the_draws() {
    let mut h = Harness::with_config(RendererConfig {
        render_target: Some(RenderTargetConfig {
            width: 64,
            height: 64,
        }),
        ..Default::default()
    });
    h.spawn_camera();
    let mesh = h.mesh();
    let material = h.material("flat", false);
    h.spawn(mesh, material);
    h.frame();
    h.draw();

    let target = h.renderer.render_target();
    assert!(target.is_some());
    assert!(h.device.draws().iter().all(|d| d.target == target));
}

#[test]
fn test_shutdown_releases_everything() {
    let mut h = Harness::with_config(RendererConfig {
        render_target: Some(RenderTargetConfig {
            width: 8,
            height: 8,
        }),
        ..Default::default()
    });
    h.spawn_camera();
    h.spawn_point_light();
    let mesh = h.mesh();
    let texture = h.registry.add_texture(Texture::solid("white", [255; 4])).0;
    let (material, _) = h.registry.add_material(
        Material::new("textured", ShaderTemplate::default())
            .with_texture_slot("albedo", Some(texture))
            .with_lighting(true),
    );
    for _ in 0..4 {
        h.spawn(mesh, material);
    }
    assert!(h.frame().is_clean());

    h.renderer.shutdown();
    assert_eq!(h.stats(), PoolStats::default());
    let device = h.device.stats();
    assert_eq!(device.live_buffers(), 0);
    assert_eq!(device.live_programs(), 0);
    assert_eq!(device.live_textures(), 0);
    assert_eq!(device.frame_buffers_created, device.frame_buffers_destroyed);
}
