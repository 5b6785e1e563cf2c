mod egui_host;
pub mod input;
pub mod timing;

use crate::config::AppConfig;
use crate::render::{LoggingRenderer, RenderFrame, Renderer, TimeUniform};
use crate::scene::serialization::{self, Preset};
use crate::scene::{presets, EmblemCatalog, EmblemDefinition, EmblemId, SceneError, SceneState};
use crate::ui::{EguiPanelBackend, PanelBackend, PanelRegistry};
use egui_host::EguiHost;
use input::{EmblemLayout, HoverChange, HoverTracker};
use timing::{FrameDriven, FrameScheduler};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("failed to load emblem catalog: {0}")]
    Catalog(#[from] serialization::SerializationError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

enum PresetAction {
    Save(EmblemId),
    Load(EmblemId),
    ExportCatalog,
}

pub struct App {
    config: AppConfig,
    window: Option<Arc<Window>>,
    egui_context: egui::Context,
    egui: Option<EguiHost>,
    panels: PanelRegistry<EguiPanelBackend>,
    scene: SceneState,
    definitions: HashMap<EmblemId, EmblemDefinition>,
    renderer: LoggingRenderer,
    scheduler: FrameScheduler,
    time: TimeUniform,
    layout: EmblemLayout,
    hover: HoverTracker,
    cursor: Option<[f32; 2]>,
    pointer_over_ui: bool,
    preset_target: Option<EmblemId>,
    preset_status: Option<String>,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let catalog = match &config.catalog {
            Some(path) => {
                log::info!("Loading emblem catalog from {}", path.display());
                serialization::load_catalog_from_file(path)?
            }
            None => presets::builtin_catalog(),
        };

        let egui_context = egui::Context::default();
        let backend = EguiPanelBackend::new(egui_context.clone(), config.layout.panel_width);
        let mut panels = PanelRegistry::new(backend);
        let mut scene = SceneState::new(config.orientation);
        let definitions = mount_catalog(&catalog, &mut scene, &mut panels)?;

        // Panels occupy two staggered columns on the left; emblems go right of them.
        let panel_columns = 2.0 * (config.layout.panel_width + 20.0);
        let layout = EmblemLayout {
            columns: config.layout.columns,
            cell_size: config.layout.cell_size,
            origin: [panel_columns + 10.0, 10.0],
        };

        Ok(Self {
            window: None,
            egui_context,
            egui: None,
            panels,
            preset_target: scene.emblems().first().map(|emblem| emblem.id()),
            scene,
            definitions,
            renderer: LoggingRenderer::new(config.frame.model_load_frames),
            scheduler: FrameScheduler::new(config.window.title.clone(), config.frame.max_delta()),
            time: TimeUniform::default(),
            layout,
            hover: HoverTracker::default(),
            cursor: None,
            pointer_over_ui: false,
            preset_status: None,
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            config,
        })
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(configured) = self.config.frame.target_frame_duration() {
            target = configured;
        } else if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn acquire_backings(&mut self) {
        for emblem in self.scene.emblems_mut() {
            if emblem.backing().is_some() {
                continue;
            }
            let Some(definition) = self.definitions.get(&emblem.id()) else {
                continue;
            };
            if let Some(handle) = self.renderer.acquire(emblem.id(), definition) {
                emblem.attach_backing(handle);
            }
        }
    }

    fn update_hover(&mut self) {
        let under_pointer = if self.pointer_over_ui {
            None
        } else {
            self.cursor
                .and_then(|position| self.layout.slot_at(position, self.scene.emblems().len()))
                .and_then(|slot| self.scene.emblems().get(slot))
                .map(|emblem| emblem.id())
        };
        for change in self.hover.update(under_pointer) {
            match change {
                HoverChange::Enter(id) => {
                    log::debug!("Pointer entered emblem {}", id);
                    self.scene.pointer_enter(id);
                }
                HoverChange::Leave(id) => {
                    log::debug!("Pointer left emblem {}", id);
                    self.scene.pointer_leave(id);
                }
            }
        }
    }

    fn render(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let now = Instant::now();

        self.acquire_backings();
        {
            let mut subscribers: Vec<&mut dyn FrameDriven> =
                Vec::with_capacity(self.scene.emblems().len() + 1);
            subscribers.push(&mut self.time);
            for emblem in self.scene.emblems_mut() {
                subscribers.push(emblem);
            }
            self.scheduler.dispatch(now, &mut subscribers);
        }

        let Some(egui) = self.egui.as_mut() else {
            return;
        };
        let panels = &mut self.panels;
        let scene = &self.scene;
        let preset_target = &mut self.preset_target;
        let preset_status = self.preset_status.as_deref();
        let mut edits = Vec::new();
        let mut action = None;
        let output = egui.run_ui(&window, |ctx| {
            edits = panels.present_all();
            action = presets_window(ctx, scene, preset_target, preset_status);
        });

        for (owner, handle, edit) in edits {
            let Some(emblem) = self.scene.emblem_mut(owner) else {
                continue;
            };
            if let Err(err) = self.panels.commit(handle, edit, emblem) {
                log::warn!("Edit on panel {} not applied: {}", handle, err);
            }
        }
        match action {
            Some(PresetAction::Save(id)) => self.handle_save_preset_action(id),
            Some(PresetAction::Load(id)) => self.handle_load_preset_action(id),
            Some(PresetAction::ExportCatalog) => self.handle_export_catalog_action(),
            None => {}
        }

        let pointer_over_ui = output.wants_pointer_input || output.pointer_over_area;
        if pointer_over_ui != self.pointer_over_ui {
            self.pointer_over_ui = pointer_over_ui;
            self.update_hover();
        }

        let layout = self.layout;
        let frame = RenderFrame::collect(
            self.time,
            &self.scene,
            |slot| layout.cell_rect(slot),
            output.clipped_primitives.len(),
        );
        self.renderer.draw(&frame);
        self.scheduler.update_title(Some(&window), now);
    }

    fn handle_save_preset_action(&mut self, id: EmblemId) {
        let Some(emblem) = self.scene.emblem(id) else {
            return;
        };
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Preset", &["json"])
            .set_file_name(format!("{}.json", emblem.name()))
            .save_file()
        else {
            return;
        };
        let preset = Preset::capture(emblem);
        self.preset_status = Some(match serialization::save_preset_to_file(&preset, &path) {
            Ok(()) => {
                log::info!("Saved preset for '{}' to {:?}", emblem.name(), path);
                format!("Saved {}", path.display())
            }
            Err(err) => {
                log::warn!("Failed to save preset: {}", err);
                format!("Save failed: {}", err)
            }
        });
    }

    fn handle_load_preset_action(&mut self, id: EmblemId) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Preset", &["json"])
            .pick_file()
        else {
            return;
        };
        self.preset_status = Some(
            match load_preset_into(&path, id, &mut self.scene, &mut self.panels) {
                Ok(0) => format!("Loaded {}", path.display()),
                Ok(skipped) => format!("Loaded {} ({} values skipped)", path.display(), skipped),
                Err(err) => {
                    log::warn!("Failed to load preset: {}", err);
                    format!("Load failed: {}", err)
                }
            },
        );
    }

    fn handle_export_catalog_action(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Catalog", &["json"])
            .set_file_name("catalog.json")
            .save_file()
        else {
            return;
        };
        let catalog = self.scene.catalog();
        self.preset_status = Some(match serialization::save_catalog_to_file(&catalog, &path) {
            Ok(()) => {
                log::info!("Exported {} emblems to {:?}", catalog.emblems.len(), path);
                format!("Exported {}", path.display())
            }
            Err(err) => {
                log::warn!("Failed to export catalog: {}", err);
                format!("Export failed: {}", err)
            }
        });
    }

    fn shutdown(&mut self) {
        let ids: Vec<EmblemId> = self.scene.emblems().iter().map(|emblem| emblem.id()).collect();
        for id in ids {
            self.hover.forget(id);
            self.definitions.remove(&id);
            match self.scene.unmount(id, &mut self.panels) {
                Ok(Some(handle)) => self.renderer.release(handle),
                Ok(None) => {}
                Err(err) => log::warn!("Failed to unmount emblem {}: {}", id, err),
            }
        }
        log::info!(
            "Drew {} frames ({} material uploads); {} render objects and {} panels left",
            self.renderer.frames_drawn(),
            self.renderer.material_uploads(),
            self.renderer.live_objects(),
            self.panels.backend().live_windows()
        );
    }

    fn cursor_moved(&mut self, position: PhysicalPosition<f64>, scale_factor: f64) {
        let logical = position.to_logical::<f32>(scale_factor);
        self.cursor = Some([logical.x, logical.y]);
        self.update_hover();
    }
}

fn mount_catalog<B: PanelBackend>(
    catalog: &EmblemCatalog,
    scene: &mut SceneState,
    panels: &mut PanelRegistry<B>,
) -> Result<HashMap<EmblemId, EmblemDefinition>, SceneError> {
    let mut definitions = HashMap::new();
    for definition in &catalog.emblems {
        let id = scene.mount(definition, panels)?;
        definitions.insert(id, definition.clone());
    }
    Ok(definitions)
}

#[derive(Debug, thiserror::Error)]
enum PresetLoadError {
    #[error(transparent)]
    File(#[from] serialization::SerializationError),
    #[error("emblem {0} is no longer mounted")]
    Gone(EmblemId),
    #[error(transparent)]
    Panel(#[from] crate::ui::PanelError),
}

/// Loads a preset file into one emblem and refreshes its panel. Returns how
/// many values were rejected.
fn load_preset_into<B: PanelBackend>(
    path: &Path,
    id: EmblemId,
    scene: &mut SceneState,
    panels: &mut PanelRegistry<B>,
) -> Result<usize, PresetLoadError> {
    let preset = serialization::load_preset_from_file(path)?;
    let emblem = scene.emblem_mut(id).ok_or(PresetLoadError::Gone(id))?;
    if preset.emblem != emblem.name() {
        log::warn!(
            "Preset was saved from '{}', applying to '{}'",
            preset.emblem,
            emblem.name()
        );
    }
    let rejected = serialization::apply_preset(emblem.store_mut(), &preset);
    for err in &rejected {
        log::warn!("Preset value skipped: {}", err);
    }
    emblem.orientation_mut().set_base_facing(preset.base_facing);
    if let Some(handle) = emblem.panel() {
        panels.resync(handle, &*emblem)?;
    }
    Ok(rejected.len())
}

fn presets_window(
    ctx: &egui::Context,
    scene: &SceneState,
    target: &mut Option<EmblemId>,
    status: Option<&str>,
) -> Option<PresetAction> {
    let mut action = None;
    egui::Window::new("Presets")
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-10.0, -10.0))
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            let selected_title = target
                .and_then(|id| scene.emblem(id))
                .map_or("(none)", |emblem| emblem.title());
            egui::ComboBox::from_id_salt("preset_target")
                .selected_text(selected_title)
                .show_ui(ui, |ui| {
                    for emblem in scene.emblems() {
                        ui.selectable_value(target, Some(emblem.id()), emblem.title());
                    }
                });
            ui.horizontal(|ui| {
                let enabled = target.is_some();
                if ui.add_enabled(enabled, egui::Button::new("Save...")).clicked() {
                    action = target.map(PresetAction::Save);
                }
                if ui.add_enabled(enabled, egui::Button::new("Load...")).clicked() {
                    action = target.map(PresetAction::Load);
                }
            });
            let has_emblems = !scene.emblems().is_empty();
            if ui
                .add_enabled(has_emblems, egui::Button::new("Export catalog..."))
                .clicked()
            {
                action = Some(PresetAction::ExportCatalog);
            }
            if let Some(status) = status {
                ui.label(status);
            }
        });
    action
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window.title.as_str())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {}", err);
                event_loop.exit();
                return;
            }
        };

        self.egui = Some(EguiHost::new(self.egui_context.clone(), &window));
        self.update_target_frame_duration(&window);
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let (Some(egui), Some(window)) = (self.egui.as_mut(), self.window.as_ref()) {
            egui.on_window_event(window, &event);
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    log::info!("Escape pressed, shutting down...");
                    self.shutdown();
                    event_loop.exit();
                }
            }
            WindowEvent::Focused(false) => {
                self.cursor = None;
                self.update_hover();
            }
            WindowEvent::Moved(_) | WindowEvent::Resized(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale_factor = self
                    .window
                    .as_ref()
                    .map(|window| window.scale_factor())
                    .unwrap_or(1.0);
                self.cursor_moved(position, scale_factor);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.update_hover();
            }
            WindowEvent::RedrawRequested => {
                self.render();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config)?;
    log::info!(
        "{} emblems mounted, {} panels",
        app.scene.emblems().len(),
        app.panels.mounted_count()
    );
    event_loop.run_app(&mut app)?;
    Ok(())
}
