pub mod panel_view;
pub mod tweak_panel;

pub use panel_view::{show_tweak_panel, PanelOutput};
pub use tweak_panel::{Control, ControlKind, Effect, Param, ParamValue, Trigger, TweakPanel};
