pub mod orientation;

use crate::app::timing::{FrameDriven, FrameTick};
use crate::scene::params::ParameterStore;
use crate::scene::{EmblemDefinition, EmblemId, SceneState};
use std::collections::HashMap;

/// Renderer-side object backing one emblem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u32);

/// Per-emblem draw data for one frame.
pub struct EmblemView<'a> {
    pub id: EmblemId,
    pub handle: RenderHandle,
    pub yaw: f32,
    pub pitch: f32,
    pub rotation: glam::Quat,
    pub params: &'a ParameterStore,
    pub cell: [f32; 4],
}

pub struct RenderFrame<'a> {
    pub time: TimeUniform,
    pub emblems: Vec<EmblemView<'a>>,
    pub overlay_primitives: usize,
}

impl<'a> RenderFrame<'a> {
    /// Collects every emblem that has a backing object. `cell_for` maps the
    /// emblem's mount slot to its screen rectangle.
    pub fn collect(
        time: TimeUniform,
        scene: &'a SceneState,
        cell_for: impl Fn(usize) -> [f32; 4],
        overlay_primitives: usize,
    ) -> Self {
        let emblems = scene
            .emblems()
            .iter()
            .enumerate()
            .filter_map(|(slot, emblem)| {
                let handle = emblem.backing()?;
                let state = emblem.orientation().state();
                Some(EmblemView {
                    id: emblem.id(),
                    handle,
                    yaw: state.current_yaw,
                    pitch: state.breathing_pitch,
                    rotation: emblem.orientation().rotation(),
                    params: emblem.store(),
                    cell: cell_for(slot),
                })
            })
            .collect();
        Self {
            time,
            emblems,
            overlay_primitives,
        }
    }
}

/// Elapsed seconds as handed to shaders, which only take f32.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeUniform {
    pub seconds: f32,
    pub frame: u64,
}

impl FrameDriven for TimeUniform {
    fn on_frame(&mut self, tick: &FrameTick) {
        self.seconds = tick.elapsed as f32;
        self.frame += 1;
    }
}

/// Base colour in 0..1 channels and opacity of one group, as a material
/// would take them. Opacity defaults to 1 for groups without one.
pub fn surface_tint(params: &ParameterStore, group: &str) -> Option<([f32; 3], f32)> {
    let color = params.get(group, "color")?.as_color()?;
    let opacity = params
        .get(group, "opacity")
        .and_then(|value| value.as_float())
        .unwrap_or(1.0);
    Some((color.to_unit_rgb(), opacity))
}

pub trait Renderer {
    /// Starts creating the object for an emblem. `None` means it is not
    /// ready yet; the host asks again on a later frame.
    fn acquire(&mut self, id: EmblemId, definition: &EmblemDefinition) -> Option<RenderHandle>;
    fn release(&mut self, handle: RenderHandle);
    fn draw(&mut self, frame: &RenderFrame<'_>);
}

/// Stand-in renderer: logs what it would draw and pretends each emblem's
/// assets take a few frames to load.
pub struct LoggingRenderer {
    load_frames: u32,
    pending: HashMap<EmblemId, u32>,
    live: HashMap<RenderHandle, EmblemId>,
    /// Store revision last uploaded per object.
    uploaded: HashMap<RenderHandle, u64>,
    next_handle: u32,
    frames_drawn: u64,
    material_uploads: u64,
}

impl LoggingRenderer {
    pub fn new(load_frames: u32) -> Self {
        Self {
            load_frames,
            pending: HashMap::new(),
            live: HashMap::new(),
            uploaded: HashMap::new(),
            next_handle: 1,
            frames_drawn: 0,
            material_uploads: 0,
        }
    }

    pub fn live_objects(&self) -> usize {
        self.live.len()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn material_uploads(&self) -> u64 {
        self.material_uploads
    }
}

impl Renderer for LoggingRenderer {
    fn acquire(&mut self, id: EmblemId, definition: &EmblemDefinition) -> Option<RenderHandle> {
        let waited = self.pending.entry(id).or_insert(0);
        if *waited < self.load_frames {
            if *waited == 0 {
                log::info!("Loading model for emblem {} '{}'", id, definition.name);
            }
            *waited += 1;
            return None;
        }
        self.pending.remove(&id);
        let handle = RenderHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle, id);
        log::info!("Model for emblem {} ready as {:?}", id, handle);
        Some(handle)
    }

    fn release(&mut self, handle: RenderHandle) {
        self.uploaded.remove(&handle);
        match self.live.remove(&handle) {
            Some(id) => log::info!("Released {:?} (emblem {})", handle, id),
            None => log::warn!("Release of unknown render handle {:?}", handle),
        }
    }

    fn draw(&mut self, frame: &RenderFrame<'_>) {
        self.frames_drawn += 1;
        for view in &frame.emblems {
            log::trace!(
                "emblem {} {:?}: yaw {:.3} pitch {:.3} rotation {:?} in {:?}",
                view.id,
                view.handle,
                view.yaw,
                view.pitch,
                view.rotation,
                view.cell
            );
            let revision = view.params.revision();
            if self.uploaded.insert(view.handle, revision) == Some(revision) {
                continue;
            }
            self.material_uploads += 1;
            log::debug!("Uploading materials for emblem {} (revision {})", view.id, revision);
            for group in view.params.groups() {
                if let Some((rgb, opacity)) = surface_tint(view.params, &group.name) {
                    log::trace!("  {}: rgb {:?} opacity {:.2}", group.name, rgb, opacity);
                }
            }
        }
        log::debug!(
            "Frame {} at {:.2}s: {} emblems, {} overlay primitives",
            frame.time.frame,
            frame.time.seconds,
            frame.emblems.len(),
            frame.overlay_primitives
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::orientation::OrientationSettings;
    use crate::scene::presets::{logo_four, logo_one};
    use crate::ui::tests::RecordingBackend;
    use crate::ui::PanelRegistry;

    #[test]
    fn handles_arrive_after_load_frames() {
        let mut renderer = LoggingRenderer::new(2);
        let definition = logo_one();
        assert_eq!(renderer.acquire(EmblemId(1), &definition), None);
        assert_eq!(renderer.acquire(EmblemId(1), &definition), None);
        let handle = renderer.acquire(EmblemId(1), &definition).unwrap();
        assert_eq!(renderer.live_objects(), 1);
        renderer.release(handle);
        renderer.release(handle);
        assert_eq!(renderer.live_objects(), 0);
    }

    #[test]
    fn surface_tint_reads_color_and_opacity() {
        let store = ParameterStore::new(logo_four().groups).unwrap();
        assert_eq!(
            surface_tint(&store, "sphere"),
            Some(([29.0 / 255.0, 248.0 / 255.0, 0.0], 1.0))
        );
        assert_eq!(surface_tint(&store, "missing"), None);
    }

    #[test]
    fn frame_only_carries_backed_emblems() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let first = scene.mount(&logo_one(), &mut panels).unwrap();
        scene.mount(&logo_four(), &mut panels).unwrap();
        scene
            .emblem_mut(first)
            .unwrap()
            .attach_backing(RenderHandle(9));

        let mut time = TimeUniform::default();
        time.on_frame(&FrameTick {
            elapsed: 2.5,
            delta: 0.016,
        });
        let frame = RenderFrame::collect(time, &scene, |slot| [slot as f32, 0.0, 1.0, 1.0], 12);
        assert_eq!(frame.emblems.len(), 1);
        assert_eq!(frame.emblems[0].id, first);
        assert_eq!(frame.emblems[0].cell, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(frame.time.seconds, 2.5);
        assert_eq!(frame.time.frame, 1);

        let mut renderer = LoggingRenderer::new(0);
        renderer.draw(&frame);
        renderer.draw(&frame);
        assert_eq!(renderer.frames_drawn(), 2);
        assert_eq!(renderer.material_uploads(), 1);
    }

    #[test]
    fn accepted_edits_trigger_one_upload() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let id = scene.mount(&logo_four(), &mut panels).unwrap();
        scene.emblem_mut(id).unwrap().attach_backing(RenderHandle(1));

        let mut renderer = LoggingRenderer::new(0);
        let time = TimeUniform::default();
        renderer.draw(&RenderFrame::collect(time, &scene, |_| [0.0; 4], 0));

        let store = scene.emblem_mut(id).unwrap().store_mut();
        assert!(store
            .set("cushion", "opacity", crate::scene::params::ParamValue::Float(7.0))
            .is_err());
        store
            .set("cushion", "opacity", crate::scene::params::ParamValue::Float(0.5))
            .unwrap();
        renderer.draw(&RenderFrame::collect(time, &scene, |_| [0.0; 4], 0));
        renderer.draw(&RenderFrame::collect(time, &scene, |_| [0.0; 4], 0));
        assert_eq!(renderer.material_uploads(), 2);
    }
}
