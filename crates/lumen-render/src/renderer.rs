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

//! The top-level driver: one [`ForwardRenderer::update`] then one
//! [`ForwardRenderer::draw`] per frame.

use crate::config::RendererConfig;
use crate::error::{DrawReport, ErrorScope, FrameReport, RenderCoreError, Result, ScopedError};
use crate::lights::LightAggregator;
use crate::manager::DeviceObjectManager;
use crate::tracking::{ChangeTracker, InstancingCoordinator, MaterialLoader, MeshBatcher};
use bytemuck::{Pod, Zeroable};
use lumen_core::asset::AssetResolver;
use lumen_core::event::EventBus;
use lumen_core::math::Mat4;
use lumen_core::renderer::{
    BufferDescriptor, BufferId, BufferUsage, FrameBufferDescriptor, FrameBufferId, GraphicsDevice,
    InstancedDrawCommand, LightCounts, TextureBinding, TextureFormat, UniformBinding,
};
use lumen_core::scene::{Camera, SceneEvent};
use std::sync::Arc;

/// The frame details uniform block, bound at slot 0 of every variant.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct FrameDetails {
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    camera_position: [f32; 4],
    light_counts: [u32; 4],
}

impl FrameDetails {
    fn new(camera: Option<Camera>, lights: LightCounts) -> Self {
        let camera = camera.unwrap_or_default();
        Self {
            view: camera.view,
            projection: camera.projection,
            view_projection: camera.projection * camera.view,
            camera_position: camera.position.extend(1.0),
            light_counts: [lights.directional, lights.point, lights.spot, 0],
        }
    }
}

/// Bytes of the frame details block.
pub const FRAME_DETAILS_SIZE: u64 = std::mem::size_of::<FrameDetails>() as u64;

/// Turns scene events into one instanced draw per (mesh, material) pair.
///
/// A frame runs the scene-to-batch pipeline, applies the batch deltas to the
/// instanced draw objects, refreshes the light and frame details buffers and
/// then every pooled device object. Failures are confined to the object they
/// happened on and listed in the returned [`FrameReport`].
#[derive(Debug)]
pub struct ForwardRenderer {
    device: Arc<dyn GraphicsDevice>,
    resolver: Arc<dyn AssetResolver>,
    manager: DeviceObjectManager,
    tracker: ChangeTracker,
    loader: MaterialLoader,
    batcher: MeshBatcher,
    coordinator: InstancingCoordinator,
    lights: LightAggregator,
    frame_details: Option<BufferId>,
    render_target: Option<FrameBufferId>,
    frame: u64,
}

impl ForwardRenderer {
    /// Creates a renderer listening to `events`.
    ///
    /// Nothing is allocated on the device until [`ForwardRenderer::initialize`].
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        resolver: Arc<dyn AssetResolver>,
        events: &EventBus<SceneEvent>,
        config: RendererConfig,
    ) -> Self {
        Self {
            manager: DeviceObjectManager::new(device.clone(), resolver.clone(), config),
            device,
            resolver,
            tracker: ChangeTracker::new(events.receiver().clone()),
            loader: MaterialLoader::new(),
            batcher: MeshBatcher::new(),
            coordinator: InstancingCoordinator::new(),
            lights: LightAggregator::new(),
            frame_details: None,
            render_target: None,
            frame: 0,
        }
    }

    /// Validates the configuration and allocates the frame details buffer and render target.
    pub fn initialize(&mut self) -> Result<()> {
        if self.frame_details.is_some() {
            return Err(RenderCoreError::InvariantViolation(
                "renderer initialized twice".to_string(),
            ));
        }
        let config = self.manager.config();
        config.validate()?;

        let details = FrameDetails::new(None, LightCounts::default());
        let buffer = self.device.create_buffer_with_data(
            &BufferDescriptor::new(
                format!("{}/frame_details", config.label),
                FRAME_DETAILS_SIZE,
                BufferUsage::UNIFORM,
            ),
            bytemuck::bytes_of(&details),
        )?;

        if let Some(target) = config.render_target {
            let created = self.device.create_frame_buffer(&FrameBufferDescriptor {
                label: Some(format!("{}/target", config.label).into()),
                width: target.width,
                height: target.height,
                color_format: TextureFormat::Rgba8UnormSrgb,
                depth_format: Some(TextureFormat::Depth32Float),
            });
            match created {
                Ok(frame_buffer) => self.render_target = Some(frame_buffer),
                Err(e) => {
                    if let Err(destroy) = self.device.destroy_buffer(buffer) {
                        log::warn!("Failed to destroy frame details buffer: {destroy}");
                    }
                    return Err(e.into());
                }
            }
        }
        self.frame_details = Some(buffer);
        log::info!("Forward renderer '{}' initialized", self.manager.config().label);
        Ok(())
    }

    fn frame_details_buffer(&self) -> Result<BufferId> {
        self.frame_details.ok_or_else(|| {
            RenderCoreError::InvariantViolation("renderer used before initialize".to_string())
        })
    }

    /// Applies this frame's scene changes and uploads every changed device object.
    ///
    /// Returns `Err` only when the renderer itself is misused; failures of
    /// individual objects are listed in the report.
    pub fn update(&mut self) -> Result<FrameReport> {
        let details = self.frame_details_buffer()?;
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        self.tracker.update();
        report
            .errors
            .extend(self.loader.update(&self.tracker, self.resolver.as_ref()));
        self.batcher.update(&self.loader);
        report
            .errors
            .extend(self.coordinator.update(&self.batcher, &mut self.manager));
        self.tracker.after_update();
        self.loader.after_update();
        self.batcher.after_update();

        let label = &self.manager.config().label;
        match self
            .lights
            .update(self.device.as_ref(), label, self.tracker.lights())
        {
            Ok(bytes) => report.uploaded_bytes += bytes,
            Err(e) => report.errors.push(ScopedError::new(ErrorScope::Lights, e)),
        }
        let camera = self.tracker.active_camera().map(|(_, camera)| camera.get());
        let data = FrameDetails::new(camera, self.lights.counts());
        match self
            .device
            .write_buffer(details, 0, bytemuck::bytes_of(&data))
        {
            Ok(()) => report.uploaded_bytes += FRAME_DETAILS_SIZE,
            Err(e) => report
                .errors
                .push(ScopedError::new(ErrorScope::Frame, e.into())),
        }

        let pools = self.manager.update(self.lights.counts());
        report.uploaded_bytes += pools.uploaded_bytes;
        report.shader_compilations = pools.shader_compilations;
        report.errors.extend(pools.errors);
        self.manager.after_update();
        self.lights.after_update(self.tracker.lights());

        report.draw_objects = self.manager.stats().instanced;
        report.instances = self.manager.instanced_objects().map(|o| o.len()).sum();
        log::trace!(
            "Frame {}: {} draw objects, {} instances, {} bytes uploaded",
            report.frame,
            report.draw_objects,
            report.instances,
            report.uploaded_bytes
        );
        Ok(report)
    }

    /// Issues one instanced draw per ready draw object, seen from the first active camera.
    pub fn draw(&self) -> Result<DrawReport> {
        let details = self.frame_details_buffer()?;
        let mut report = DrawReport::default();
        let Some((camera, _)) = self.tracker.active_camera() else {
            log::debug!("No active camera, nothing drawn");
            return Ok(report);
        };
        log::trace!("Drawing frame {} from camera {camera}", self.frame);

        let manager = &self.manager;
        for object in manager.instanced_objects() {
            if object.is_empty() {
                continue;
            }
            let key = object.key();
            let Some(draw) = object.draw_bindings() else {
                report.skipped += 1;
                continue;
            };
            let (Some(mesh), Some(material), Some(shader)) = (
                manager.meshes().get(key.mesh),
                manager.materials().get(key.material),
                manager.shaders().get(draw.shader),
            ) else {
                report.errors.push(ScopedError::new(
                    ErrorScope::Instanced(key),
                    RenderCoreError::InvariantViolation(format!(
                        "{key} is missing a pooled dependency at draw time"
                    )),
                ));
                continue;
            };

            let mut uniforms = vec![UniformBinding {
                slot: draw.bindings.frame_details,
                buffer: details,
            }];
            if let (Some(slot), Some(buffer)) = (draw.bindings.lights, self.lights.buffer()) {
                uniforms.push(UniformBinding { slot, buffer });
            }
            uniforms.extend(
                draw.bindings
                    .blocks
                    .iter()
                    .zip(material.block_buffers())
                    .map(|(&slot, buffer)| UniformBinding { slot, buffer }),
            );
            let textures: Vec<TextureBinding> = draw
                .bindings
                .textures
                .iter()
                .zip(material.bound_textures())
                .filter_map(|(slot, id)| {
                    let texture = manager.textures().get(id?)?.texture();
                    Some(TextureBinding {
                        slot: (*slot)?,
                        texture,
                    })
                })
                .collect();

            let label = format!("{}/draw/{key}", manager.config().label);
            let command = InstancedDrawCommand {
                label: &label,
                target: self.render_target,
                program: shader.program(),
                vertex_buffer: mesh.vertex_buffer(),
                vertex_layout: mesh.layout(),
                index_buffer: mesh.index_buffer(),
                element_count: mesh.element_count(),
                instance_buffer: draw.instance_buffer,
                instance_layout: draw.instance_layout,
                instance_count: draw.instance_count,
                uniforms: &uniforms,
                textures: &textures,
            };
            match self.device.draw_instanced(&command) {
                Ok(()) => {
                    report.draw_calls += 1;
                    report.instances += draw.instance_count as usize;
                }
                Err(e) => report
                    .errors
                    .push(ScopedError::new(ErrorScope::Instanced(key), e.into())),
            }
        }
        Ok(report)
    }

    /// Releases every device object and buffer the renderer owns.
    ///
    /// The renderer can be initialized again afterwards; it rebuilds its
    /// batches from the next scene events it receives.
    pub fn shutdown(&mut self) {
        self.manager.shutdown();
        self.lights.destroy(self.device.as_ref());
        if let Some(buffer) = self.frame_details.take() {
            if let Err(e) = self.device.destroy_buffer(buffer) {
                log::warn!("Failed to destroy frame details buffer: {e}");
            }
        }
        if let Some(target) = self.render_target.take() {
            if let Err(e) = self.device.destroy_frame_buffer(target) {
                log::warn!("Failed to destroy render target: {e}");
            }
        }
        self.tracker.clear();
        self.loader = MaterialLoader::new();
        self.batcher = MeshBatcher::new();
        log::info!("Forward renderer '{}' shut down", self.manager.config().label);
    }

    /// The device object manager.
    pub fn manager(&self) -> &DeviceObjectManager {
        &self.manager
    }

    /// The light aggregator.
    pub fn lights(&self) -> &LightAggregator {
        &self.lights
    }

    /// The change tracker.
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// The mesh batcher.
    pub fn batcher(&self) -> &MeshBatcher {
        &self.batcher
    }

    /// Frames updated so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The frame details buffer, once initialized.
    pub fn frame_details(&self) -> Option<BufferId> {
        self.frame_details
    }

    /// The off-screen target, when configured.
    pub fn render_target(&self) -> Option<FrameBufferId> {
        self.render_target
    }
}
