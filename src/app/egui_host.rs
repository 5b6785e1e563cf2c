use egui_winit::winit::event::WindowEvent;
use winit::window::Window;

/// What one egui pass produced; the renderer consumes the primitives.
pub struct EguiFrameOutput {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub wants_pointer_input: bool,
    pub pointer_over_area: bool,
}

pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    /// `context` is the one the panel backend draws into.
    pub fn new(context: egui::Context, window: &Window) -> Self {
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            None,
            None,
            None,
        );
        Self {
            context,
            winit_state,
        }
    }

    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.winit_state.on_window_event(window, event).consumed
    }

    pub fn run_ui<F>(&mut self, window: &Window, run_ui: F) -> EguiFrameOutput
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output.clone());
        let pixels_per_point = self.context.pixels_per_point();
        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, pixels_per_point);

        EguiFrameOutput {
            clipped_primitives,
            wants_pointer_input: self.context.wants_pointer_input(),
            pointer_over_area: self.context.is_pointer_over_area(),
        }
    }
}
