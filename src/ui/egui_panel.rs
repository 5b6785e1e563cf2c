use super::{BuiltPanel, ControlEdit, ControlSpec, ControlValue, PanelBackend, PanelHandle, Widget};
use crate::scene::params::ParamValue;
use std::collections::HashMap;

const PANEL_MARGIN: f32 = 10.0;
const PANEL_STAGGER: f32 = 36.0;

struct PanelWindow {
    id: egui::Id,
    default_pos: egui::Pos2,
}

/// Draws each mounted panel as its own egui window with one collapsing
/// section per folder.
pub struct EguiPanelBackend {
    context: egui::Context,
    width: f32,
    windows: HashMap<PanelHandle, PanelWindow>,
    mounted_total: usize,
}

impl EguiPanelBackend {
    pub fn new(context: egui::Context, width: f32) -> Self {
        Self {
            context,
            width,
            windows: HashMap::new(),
            mounted_total: 0,
        }
    }

    pub fn live_windows(&self) -> usize {
        self.windows.len()
    }
}

impl PanelBackend for EguiPanelBackend {
    fn mount(&mut self, panel: &BuiltPanel) {
        let slot = self.mounted_total;
        self.mounted_total += 1;
        let column = (slot % 2) as f32;
        let row = (slot / 2) as f32;
        self.windows.insert(
            panel.handle(),
            PanelWindow {
                id: egui::Id::new(("emblem_panel", panel.handle())),
                default_pos: egui::pos2(
                    PANEL_MARGIN + column * (self.width + PANEL_MARGIN * 2.0),
                    PANEL_MARGIN + row * PANEL_STAGGER,
                ),
            },
        );
    }

    fn unmount(&mut self, handle: PanelHandle) {
        if self.windows.remove(&handle).is_none() {
            log::debug!("No egui window for panel {}", handle);
        }
    }

    fn present(&mut self, panel: &mut BuiltPanel) -> Vec<ControlEdit> {
        let Some(window) = self.windows.get(&panel.handle()) else {
            return Vec::new();
        };
        let title = panel.title().to_string();
        let (schema, snapshot) = panel.parts_mut();
        let mut edits = Vec::new();

        egui::Window::new(title)
            .id(window.id)
            .default_pos(window.default_pos)
            .default_width(self.width)
            .resizable(false)
            .show(&self.context, |ui| {
                let mut index = 0;
                for (folder_index, folder) in schema.folders.iter().enumerate() {
                    egui::CollapsingHeader::new(folder.title.as_str())
                        .id_salt((window.id, folder_index))
                        .default_open(true)
                        .show(ui, |ui| {
                            for control in &folder.controls {
                                let slot = &mut snapshot[index];
                                let id = window.id.with(index);
                                if draw_control(ui, id, control, slot) {
                                    edits.push(ControlEdit {
                                        index,
                                        value: slot.clone(),
                                    });
                                }
                                index += 1;
                            }
                        });
                    // A collapsed folder skips its body; keep indices aligned.
                    let end: usize = schema.folders[..=folder_index]
                        .iter()
                        .map(|folder| folder.controls.len())
                        .sum();
                    index = end;
                }
            });
        edits
    }
}

fn draw_control(
    ui: &mut egui::Ui,
    id: egui::Id,
    control: &ControlSpec,
    value: &mut ControlValue,
) -> bool {
    let label = control.label.as_str();
    match (&control.widget, value) {
        (Widget::Toggle, ControlValue::Toggle(on)) => ui.checkbox(on, label).changed(),
        (Widget::ColorPicker, ControlValue::Param(ParamValue::Color(rgb))) => {
            ui.horizontal(|ui| {
                let changed = ui.color_edit_button_srgb(&mut rgb.0).changed();
                ui.label(label);
                changed
            })
            .inner
        }
        (Widget::Slider { min, max, step }, ControlValue::Param(ParamValue::Float(number))) => ui
            .add(
                egui::Slider::new(number, *min..=*max)
                    .step_by(*step as f64)
                    .text(label),
            )
            .changed(),
        (Widget::Dropdown { choices }, ControlValue::Param(ParamValue::Choice(current))) => {
            let before = current.clone();
            ui.horizontal(|ui| {
                egui::ComboBox::from_id_salt(id)
                    .selected_text(current.as_str())
                    .show_ui(ui, |ui| {
                        for choice in choices {
                            ui.selectable_value(current, choice.clone(), choice.as_str());
                        }
                    });
                ui.label(label);
            });
            *current != before
        }
        (widget, value) => {
            log::debug!("No widget for {:?} holding {:?}", widget, value);
            false
        }
    }
}
