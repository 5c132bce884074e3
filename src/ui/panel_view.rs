use crate::config::SceneSettings;
use crate::ui::tweak_panel::{read, Control, ControlKind, Param, ParamValue, TweakPanel};
use crate::utils::math::Color;
use eframe::egui;

/// Interactions collected from one frame of the panel
#[derive(Debug, Default)]
pub struct PanelOutput {
    pub edits: Vec<(Param, ParamValue)>,
    pub finished: Vec<Param>,
    pub save_requested: bool,
}

/// Draw the tweak panel; values are read from `settings` and every change is
/// reported back instead of being written directly. `readout` supplies the
/// text of read-only lines.
pub fn show_tweak_panel(
    ui: &mut egui::Ui,
    panel: &TweakPanel,
    settings: &SceneSettings,
    readout: &dyn Fn(Param) -> String,
) -> PanelOutput {
    let mut output = PanelOutput::default();

    for control in panel.controls().iter().filter(|c| c.folder.is_none()) {
        if control.kind == ControlKind::Readout {
            ui.horizontal(|ui| {
                ui.label(control.label);
                ui.monospace(readout(control.param));
            });
            continue;
        }
        show_control(ui, control, settings, &mut output);
    }

    for folder in panel.folders() {
        egui::CollapsingHeader::new(folder)
            .default_open(folder != "Colours")
            .show(ui, |ui| {
                for control in panel.controls().iter().filter(|c| c.folder == Some(folder)) {
                    show_control(ui, control, settings, &mut output);
                }
            });
    }

    ui.separator();
    if ui.button("Save settings").clicked() {
        output.save_requested = true;
    }
    output
}

fn show_control(ui: &mut egui::Ui, control: &Control, settings: &SceneSettings, output: &mut PanelOutput) {
    match (control.kind, read(settings, control.param)) {
        (ControlKind::Slider { min, max, step }, Some(ParamValue::Number(mut value))) => {
            let response = ui.add(
                egui::Slider::new(&mut value, min..=max)
                    .step_by(step as f64)
                    .text(control.label),
            );
            if response.changed() {
                output.edits.push((control.param, ParamValue::Number(value)));
            }
            // Keyboard and click edits end immediately; drags end on release
            if response.drag_stopped() || (response.changed() && !response.dragged()) {
                output.finished.push(control.param);
            }
        }
        (ControlKind::Checkbox, Some(ParamValue::Toggle(mut value))) => {
            if ui.checkbox(&mut value, control.label).changed() {
                output.edits.push((control.param, ParamValue::Toggle(value)));
                output.finished.push(control.param);
            }
        }
        (ControlKind::ColorPicker, Some(ParamValue::Color(color))) => {
            let mut rgb = color.to_srgb8();
            ui.horizontal(|ui| {
                if ui.color_edit_button_srgb(&mut rgb).changed() {
                    output.edits.push((control.param, ParamValue::Color(Color::from_srgb8(rgb))));
                    output.finished.push(control.param);
                }
                ui.label(control.label);
            });
        }
        _ => {}
    }
}
