pub mod params;
pub mod presets;
pub mod serialization;

use crate::app::timing::{FrameDriven, FrameTick};
use crate::render::orientation::{OrientationController, OrientationSettings};
use crate::render::RenderHandle;
use crate::ui::{
    Bindable, BindingTarget, ControlValue, PanelBackend, PanelError, PanelHandle, PanelRegistry,
    PanelSchema,
};
use params::{ParamError, ParameterGroup, ParameterStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmblemId(pub u32);

impl std::fmt::Display for EmblemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializable description of one emblem - what the panel edits plus the
/// rest orientation it starts in.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmblemDefinition {
    pub name: String,
    /// Panel window title.
    pub title: String,
    #[serde(default = "default_base_facing")]
    pub base_facing: bool,
    pub groups: Vec<ParameterGroup>,
}

fn default_base_facing() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EmblemCatalog {
    pub emblems: Vec<EmblemDefinition>,
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("emblem '{name}' has invalid parameters: {source}")]
    InvalidDefinition {
        name: String,
        #[source]
        source: ParamError,
    },
    #[error("emblem {0} is not mounted")]
    NotMounted(EmblemId),
    #[error(transparent)]
    Panel(#[from] PanelError),
}

/// A mounted emblem: its parameters, its orientation and the handles tying
/// it to the renderer and to its control panel.
pub struct Emblem {
    id: EmblemId,
    name: String,
    title: String,
    store: ParameterStore,
    orientation: OrientationController,
    backing: Option<RenderHandle>,
    panel: Option<PanelHandle>,
}

impl Emblem {
    fn new(
        id: EmblemId,
        definition: &EmblemDefinition,
        settings: OrientationSettings,
    ) -> Result<Self, SceneError> {
        let store = ParameterStore::new(definition.groups.clone()).map_err(|source| {
            SceneError::InvalidDefinition {
                name: definition.name.clone(),
                source,
            }
        })?;
        Ok(Self {
            id,
            name: definition.name.clone(),
            title: definition.title.clone(),
            store,
            orientation: OrientationController::new(definition.base_facing, settings),
            backing: None,
            panel: None,
        })
    }

    pub fn id(&self) -> EmblemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ParameterStore {
        &mut self.store
    }

    pub fn orientation(&self) -> &OrientationController {
        &self.orientation
    }

    pub fn orientation_mut(&mut self) -> &mut OrientationController {
        &mut self.orientation
    }

    pub fn backing(&self) -> Option<RenderHandle> {
        self.backing
    }

    pub fn attach_backing(&mut self, handle: RenderHandle) {
        log::debug!("Emblem {} backed by {:?}", self.id, handle);
        self.backing = Some(handle);
    }

    /// The emblem as it stands now, with edited values and base facing.
    pub fn definition(&self) -> EmblemDefinition {
        EmblemDefinition {
            name: self.name.clone(),
            title: self.title.clone(),
            base_facing: self.orientation.state().base_facing,
            groups: self.store.groups().to_vec(),
        }
    }

    pub fn panel(&self) -> Option<PanelHandle> {
        self.panel
    }
}

impl FrameDriven for Emblem {
    fn on_frame(&mut self, tick: &FrameTick) {
        // Nothing to orient until the renderer has created the object.
        if self.backing.is_none() {
            return;
        }
        self.orientation.tick(tick.elapsed, tick.delta);
    }
}

impl Bindable for Emblem {
    fn read(&self, target: &BindingTarget) -> Option<ControlValue> {
        match target {
            BindingTarget::BaseFacing => {
                Some(ControlValue::Toggle(self.orientation.state().base_facing))
            }
            BindingTarget::Param { group, key } => {
                self.store.get(group, key).cloned().map(ControlValue::Param)
            }
        }
    }

    fn write(&mut self, target: &BindingTarget, value: ControlValue) -> Result<(), PanelError> {
        match (target, value) {
            (BindingTarget::BaseFacing, ControlValue::Toggle(base_facing)) => {
                self.orientation.set_base_facing(base_facing);
                Ok(())
            }
            (BindingTarget::Param { group, key }, ControlValue::Param(value)) => {
                self.store.set(group, key, value)?;
                Ok(())
            }
            (target, _) => Err(PanelError::WrongValueKind {
                label: format!("{:?}", target),
            }),
        }
    }
}

/// Every mounted emblem, in mount order.
pub struct SceneState {
    emblems: Vec<Emblem>,
    next_id: u32,
    settings: OrientationSettings,
}

impl SceneState {
    pub fn new(settings: OrientationSettings) -> Self {
        Self {
            emblems: Vec::new(),
            next_id: 1,
            settings,
        }
    }

    pub fn emblems(&self) -> &[Emblem] {
        &self.emblems
    }

    pub fn emblems_mut(&mut self) -> &mut [Emblem] {
        &mut self.emblems
    }

    pub fn emblem(&self, id: EmblemId) -> Option<&Emblem> {
        self.emblems.iter().find(|emblem| emblem.id == id)
    }

    pub fn emblem_mut(&mut self, id: EmblemId) -> Option<&mut Emblem> {
        self.emblems.iter_mut().find(|emblem| emblem.id == id)
    }

    /// Creates the emblem's store and orientation, then builds its panel.
    pub fn mount<B: PanelBackend>(
        &mut self,
        definition: &EmblemDefinition,
        panels: &mut PanelRegistry<B>,
    ) -> Result<EmblemId, SceneError> {
        let id = EmblemId(self.next_id);
        let mut emblem = Emblem::new(id, definition, self.settings)?;
        let schema = PanelSchema::for_emblem(&emblem.title, &emblem.store);
        let handle = panels.build(id, schema, &emblem)?;
        emblem.panel = Some(handle);
        self.next_id += 1;
        log::info!("Mounted emblem {} '{}'", id, emblem.name);
        self.emblems.push(emblem);
        Ok(id)
    }

    /// Removes the emblem and disposes its panel in the same step. The
    /// renderer handle, if any, is returned for release.
    pub fn unmount<B: PanelBackend>(
        &mut self,
        id: EmblemId,
        panels: &mut PanelRegistry<B>,
    ) -> Result<Option<RenderHandle>, SceneError> {
        let position = self
            .emblems
            .iter()
            .position(|emblem| emblem.id == id)
            .ok_or(SceneError::NotMounted(id))?;
        let emblem = self.emblems.remove(position);
        if let Some(handle) = emblem.panel {
            panels.dispose(handle);
        }
        log::info!("Unmounted emblem {} '{}'", id, emblem.name);
        Ok(emblem.backing)
    }

    pub fn catalog(&self) -> EmblemCatalog {
        EmblemCatalog {
            emblems: self.emblems.iter().map(Emblem::definition).collect(),
        }
    }

    pub fn pointer_enter(&mut self, id: EmblemId) {
        if let Some(emblem) = self.emblem_mut(id) {
            emblem.orientation.pointer_enter();
        }
    }

    pub fn pointer_leave(&mut self, id: EmblemId) {
        if let Some(emblem) = self.emblem_mut(id) {
            emblem.orientation.pointer_leave();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::timing::FrameTick;
    use crate::scene::params::{ParamSpec, ParamValue};
    use crate::ui::tests::RecordingBackend;
    use crate::ui::ControlEdit;
    use std::f32::consts::PI;

    fn definition() -> EmblemDefinition {
        EmblemDefinition {
            name: "logo-three".to_string(),
            title: "LEFT - SECOND FROM THE TOP".to_string(),
            base_facing: true,
            groups: vec![ParameterGroup::new("cushionCover", "Cushion Cover")
                .with(ParamSpec::unit("opacity", "Opacity"), ParamValue::Float(0.3))],
        }
    }

    fn tick(elapsed: f64, delta: f32) -> FrameTick {
        FrameTick { elapsed, delta }
    }

    #[test]
    fn mount_builds_one_panel_and_unmount_disposes_it() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let id = scene.mount(&definition(), &mut panels).unwrap();
        assert_eq!(panels.mounted_count(), 1);
        assert_eq!(scene.emblem(id).unwrap().panel(), panels.handle_for(id));

        scene.unmount(id, &mut panels).unwrap();
        assert_eq!(panels.mounted_count(), 0);
        assert_eq!(panels.backend().unmount_calls, 1);
        assert!(matches!(
            scene.unmount(id, &mut panels),
            Err(SceneError::NotMounted(_))
        ));
    }

    #[test]
    fn invalid_definition_is_not_mounted() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let mut broken = definition();
        broken.groups[0].entries[0].value = ParamValue::Float(3.0);
        assert!(matches!(
            scene.mount(&broken, &mut panels),
            Err(SceneError::InvalidDefinition { .. })
        ));
        assert_eq!(panels.mounted_count(), 0);
        assert!(scene.emblems().is_empty());
    }

    #[test]
    fn ticks_without_backing_are_ignored() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let id = scene.mount(&definition(), &mut panels).unwrap();
        scene.pointer_enter(id);

        let emblem = scene.emblem_mut(id).unwrap();
        emblem.on_frame(&tick(1.0, 0.5));
        assert_eq!(emblem.orientation().state().current_yaw, 0.0);
        assert_eq!(emblem.orientation().state().breathing_pitch, 0.0);

        emblem.attach_backing(RenderHandle(7));
        emblem.on_frame(&tick(1.016, 0.016));
        assert!(emblem.orientation().state().current_yaw > 0.0);
    }

    #[test]
    fn rotation_toggle_flows_through_panel() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let id = scene.mount(&definition(), &mut panels).unwrap();
        let handle = panels.handle_for(id).unwrap();

        let emblem = scene.emblem_mut(id).unwrap();
        panels
            .commit(
                handle,
                ControlEdit {
                    index: 0,
                    value: ControlValue::Toggle(false),
                },
                emblem,
            )
            .unwrap();
        assert_eq!(emblem.orientation().target_yaw(), PI);
        // No snap: the yaw is still at the old rest angle.
        assert_eq!(emblem.orientation().state().current_yaw, 0.0);
    }

    #[test]
    fn catalog_reflects_edits_and_remounts_the_same() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let id = scene.mount(&definition(), &mut panels).unwrap();
        let emblem = scene.emblem_mut(id).unwrap();
        emblem
            .store_mut()
            .set("cushionCover", "opacity", ParamValue::Float(0.8))
            .unwrap();
        emblem.orientation_mut().set_base_facing(false);

        let catalog = scene.catalog();
        assert_eq!(catalog.emblems.len(), 1);
        let exported = &catalog.emblems[0];
        assert!(!exported.base_facing);
        assert_eq!(exported.name, "logo-three");

        let mut other_panels = PanelRegistry::new(RecordingBackend::default());
        let mut other = SceneState::new(OrientationSettings::default());
        let remounted = other.mount(exported, &mut other_panels).unwrap();
        assert_eq!(
            other.emblem(remounted).unwrap().store().get("cushionCover", "opacity"),
            Some(&ParamValue::Float(0.8))
        );
    }

    #[test]
    fn hover_routing_ignores_unknown_ids() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let id = scene.mount(&definition(), &mut panels).unwrap();
        scene.pointer_enter(EmblemId(99));
        assert!(!scene.emblem(id).unwrap().orientation().state().hovered);
        scene.pointer_enter(id);
        scene.pointer_enter(id);
        assert!(scene.emblem(id).unwrap().orientation().state().hovered);
        scene.pointer_leave(id);
        assert!(!scene.emblem(id).unwrap().orientation().state().hovered);
    }
}
