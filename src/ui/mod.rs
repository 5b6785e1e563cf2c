//! Control binding layer.
//!
//! A panel is built once per mounted emblem from a `PanelSchema`: a
//! "Rotation" folder followed by one folder per parameter group. Every
//! control edits a local snapshot value owned by the panel; only a committed
//! edit reaches the emblem, and a rejected one puts the snapshot back.
//! Drawing is delegated to a `PanelBackend` so the toolkit can be swapped.

pub mod egui_panel;

use crate::scene::params::{ParamError, ParamKind, ParamValue, ParameterStore};
use crate::scene::EmblemId;

pub use egui_panel::EguiPanelBackend;

pub const ROTATION_FOLDER: &str = "Rotation";
pub const FACING_LABEL: &str = "Is Facing User";

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("emblem {0} already has a mounted panel")]
    AlreadyMounted(EmblemId),
    #[error("panel {0} is not mounted")]
    NotMounted(PanelHandle),
    #[error("panel {handle} has no control #{index}")]
    UnknownControl { handle: PanelHandle, index: usize },
    #[error("control '{label}' cannot hold this kind of value")]
    WrongValueKind { label: String },
    #[error("binding target is gone")]
    MissingTarget,
    #[error(transparent)]
    Rejected(#[from] ParamError),
}

/// What a control writes into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindingTarget {
    BaseFacing,
    Param { group: String, key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlValue {
    Toggle(bool),
    Param(ParamValue),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Toggle,
    ColorPicker,
    Slider { min: f32, max: f32, step: f32 },
    Dropdown { choices: Vec<String> },
}

impl Widget {
    fn accepts(&self, value: &ControlValue) -> bool {
        matches!(
            (self, value),
            (Widget::Toggle, ControlValue::Toggle(_))
                | (Widget::ColorPicker, ControlValue::Param(ParamValue::Color(_)))
                | (Widget::Slider { .. }, ControlValue::Param(ParamValue::Float(_)))
                | (Widget::Dropdown { .. }, ControlValue::Param(ParamValue::Choice(_)))
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub label: String,
    pub target: BindingTarget,
    pub widget: Widget,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderSpec {
    pub title: String,
    pub controls: Vec<ControlSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSchema {
    pub title: String,
    pub folders: Vec<FolderSpec>,
}

impl PanelSchema {
    pub fn for_emblem(title: &str, store: &ParameterStore) -> Self {
        let mut folders = vec![FolderSpec {
            title: ROTATION_FOLDER.to_string(),
            controls: vec![ControlSpec {
                label: FACING_LABEL.to_string(),
                target: BindingTarget::BaseFacing,
                widget: Widget::Toggle,
            }],
        }];
        for group in store.groups() {
            let controls = group
                .entries
                .iter()
                .map(|entry| {
                    let widget = match &entry.spec.kind {
                        ParamKind::Color => Widget::ColorPicker,
                        ParamKind::Enum { choices } => Widget::Dropdown {
                            choices: choices.clone(),
                        },
                        kind => {
                            let (min, max) = kind.range().unwrap_or((0.0, 1.0));
                            Widget::Slider {
                                min,
                                max,
                                step: entry.spec.step,
                            }
                        }
                    };
                    ControlSpec {
                        label: entry.spec.label.clone(),
                        target: BindingTarget::Param {
                            group: group.name.clone(),
                            key: entry.spec.key.clone(),
                        },
                        widget,
                    }
                })
                .collect();
            folders.push(FolderSpec {
                title: group.title.clone(),
                controls,
            });
        }
        Self {
            title: title.to_string(),
            folders,
        }
    }

    pub fn controls(&self) -> impl Iterator<Item = &ControlSpec> {
        self.folders.iter().flat_map(|folder| folder.controls.iter())
    }

    pub fn control_count(&self) -> usize {
        self.folders.iter().map(|folder| folder.controls.len()).sum()
    }
}

/// State a panel's controls read from and write through to.
pub trait Bindable {
    fn read(&self, target: &BindingTarget) -> Option<ControlValue>;
    fn write(&mut self, target: &BindingTarget, value: ControlValue) -> Result<(), PanelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelHandle(u64);

impl std::fmt::Display for PanelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One user edit reported by a backend; `index` is the control's position
/// in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlEdit {
    pub index: usize,
    pub value: ControlValue,
}

pub struct BuiltPanel {
    handle: PanelHandle,
    owner: EmblemId,
    schema: PanelSchema,
    snapshot: Vec<ControlValue>,
}

impl BuiltPanel {
    pub fn handle(&self) -> PanelHandle {
        self.handle
    }

    pub fn title(&self) -> &str {
        &self.schema.title
    }

    pub fn value(&self, index: usize) -> Option<&ControlValue> {
        self.snapshot.get(index)
    }

    /// Schema plus the editable snapshot, for backends drawing the controls.
    pub fn parts_mut(&mut self) -> (&PanelSchema, &mut [ControlValue]) {
        (&self.schema, &mut self.snapshot)
    }

    fn control(&self, index: usize) -> Option<&ControlSpec> {
        self.schema.controls().nth(index)
    }
}

/// Toolkit side of a panel. `mount` and `unmount` are called exactly once
/// per built panel.
pub trait PanelBackend {
    fn mount(&mut self, panel: &BuiltPanel);
    fn unmount(&mut self, handle: PanelHandle);
    /// Draws the panel, letting controls edit its snapshot, and returns
    /// the controls the user changed.
    fn present(&mut self, panel: &mut BuiltPanel) -> Vec<ControlEdit>;
}

pub struct PanelRegistry<B: PanelBackend> {
    backend: B,
    panels: Vec<BuiltPanel>,
    next_handle: u64,
    controls_created: usize,
}

impl<B: PanelBackend> PanelRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            panels: Vec::new(),
            next_handle: 1,
            controls_created: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Builds the panel for `owner`, capturing the current values of every
    /// bound target as the controls' starting snapshot.
    pub fn build(
        &mut self,
        owner: EmblemId,
        schema: PanelSchema,
        source: &dyn Bindable,
    ) -> Result<PanelHandle, PanelError> {
        if self.panels.iter().any(|panel| panel.owner == owner) {
            return Err(PanelError::AlreadyMounted(owner));
        }
        let snapshot = schema
            .controls()
            .map(|control| source.read(&control.target).ok_or(PanelError::MissingTarget))
            .collect::<Result<Vec<_>, _>>()?;

        let handle = PanelHandle(self.next_handle);
        self.next_handle += 1;
        self.controls_created += snapshot.len();
        let panel = BuiltPanel {
            handle,
            owner,
            schema,
            snapshot,
        };
        self.backend.mount(&panel);
        log::info!(
            "Built panel {} '{}' for emblem {} ({} controls)",
            handle,
            panel.title(),
            owner,
            panel.snapshot.len()
        );
        self.panels.push(panel);
        Ok(handle)
    }

    /// Tears a panel down. Returns false when it was already gone.
    pub fn dispose(&mut self, handle: PanelHandle) -> bool {
        let Some(position) = self.panels.iter().position(|panel| panel.handle == handle) else {
            log::debug!("Panel {} already disposed", handle);
            return false;
        };
        let panel = self.panels.remove(position);
        self.backend.unmount(handle);
        log::info!("Disposed panel {} '{}'", handle, panel.title());
        true
    }

    pub fn panel(&self, handle: PanelHandle) -> Option<&BuiltPanel> {
        self.panels.iter().find(|panel| panel.handle == handle)
    }

    pub fn handle_for(&self, owner: EmblemId) -> Option<PanelHandle> {
        self.panels
            .iter()
            .find(|panel| panel.owner == owner)
            .map(|panel| panel.handle)
    }

    pub fn mounted_count(&self) -> usize {
        self.panels.len()
    }

    /// Total controls ever constructed by this registry.
    pub fn controls_created(&self) -> usize {
        self.controls_created
    }

    /// Pushes one edit through to `target`. The snapshot takes the new value
    /// on success and falls back to the target's current value otherwise.
    pub fn commit(
        &mut self,
        handle: PanelHandle,
        edit: ControlEdit,
        target: &mut dyn Bindable,
    ) -> Result<(), PanelError> {
        let panel = self
            .panels
            .iter_mut()
            .find(|panel| panel.handle == handle)
            .ok_or(PanelError::NotMounted(handle))?;
        let control = panel
            .control(edit.index)
            .cloned()
            .ok_or(PanelError::UnknownControl {
                handle,
                index: edit.index,
            })?;

        let result = if control.widget.accepts(&edit.value) {
            target.write(&control.target, edit.value.clone())
        } else {
            Err(PanelError::WrongValueKind {
                label: control.label.clone(),
            })
        };
        match &result {
            Ok(()) => panel.snapshot[edit.index] = edit.value,
            Err(err) => {
                log::warn!("Rejected edit of '{}': {}", control.label, err);
                if let Some(current) = target.read(&control.target) {
                    panel.snapshot[edit.index] = current;
                }
            }
        }
        result
    }

    /// Refreshes the snapshot from `source` after an out-of-band change,
    /// leaving every control in place. Returns how many values moved.
    pub fn resync(&mut self, handle: PanelHandle, source: &dyn Bindable) -> Result<usize, PanelError> {
        let panel = self
            .panels
            .iter_mut()
            .find(|panel| panel.handle == handle)
            .ok_or(PanelError::NotMounted(handle))?;
        let (schema, snapshot) = panel.parts_mut();
        let mut changed = 0;
        for (control, slot) in schema.controls().zip(snapshot.iter_mut()) {
            if let Some(current) = source.read(&control.target) {
                if *slot != current {
                    *slot = current;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Draws every mounted panel and collects the edits made this frame.
    pub fn present_all(&mut self) -> Vec<(EmblemId, PanelHandle, ControlEdit)> {
        let mut edits = Vec::new();
        for panel in &mut self.panels {
            let owner = panel.owner;
            let handle = panel.handle;
            for edit in self.backend.present(panel) {
                edits.push((owner, handle, edit));
            }
        }
        edits
    }
}
