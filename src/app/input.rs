use crate::scene::EmblemId;

/// Square emblem cells laid out left to right, top to bottom, to the right
/// of the panel column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmblemLayout {
    pub columns: usize,
    pub cell_size: f32,
    pub origin: [f32; 2],
}

impl EmblemLayout {
    pub fn cell_rect(&self, slot: usize) -> [f32; 4] {
        let columns = self.columns.max(1);
        let x = self.origin[0] + (slot % columns) as f32 * self.cell_size;
        let y = self.origin[1] + (slot / columns) as f32 * self.cell_size;
        [x, y, self.cell_size, self.cell_size]
    }

    pub fn slot_at(&self, position: [f32; 2], slots: usize) -> Option<usize> {
        let columns = self.columns.max(1);
        let local_x = position[0] - self.origin[0];
        let local_y = position[1] - self.origin[1];
        if local_x < 0.0 || local_y < 0.0 || self.cell_size <= 0.0 {
            return None;
        }
        let column = (local_x / self.cell_size) as usize;
        let row = (local_y / self.cell_size) as usize;
        if column >= columns {
            return None;
        }
        let slot = row * columns + column;
        (slot < slots).then_some(slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverChange {
    Enter(EmblemId),
    Leave(EmblemId),
}

/// Turns raw pointer positions into enter/leave pairs, one emblem at a time.
#[derive(Debug, Default)]
pub struct HoverTracker {
    hovered: Option<EmblemId>,
}

impl HoverTracker {
    #[cfg(test)]
    pub fn hovered(&self) -> Option<EmblemId> {
        self.hovered
    }

    /// `under_pointer` is the emblem under the cursor, or `None` when the
    /// cursor left the window or sits over a panel.
    pub fn update(&mut self, under_pointer: Option<EmblemId>) -> Vec<HoverChange> {
        if under_pointer == self.hovered {
            return Vec::new();
        }
        let mut changes = Vec::with_capacity(2);
        if let Some(previous) = self.hovered {
            changes.push(HoverChange::Leave(previous));
        }
        if let Some(next) = under_pointer {
            changes.push(HoverChange::Enter(next));
        }
        self.hovered = under_pointer;
        changes
    }

    /// Forgets an emblem that was unmounted while hovered.
    pub fn forget(&mut self, id: EmblemId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }
}
