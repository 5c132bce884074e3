use crate::config::SceneSettings;
use crate::utils::math::Color;

/// Every value the panel can edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    WindX,
    WindZ,
    WindSpeed,
    RainEnabled,
    ShowHelpers,
    OrbitSpeed,
    /// Read-only camera readout
    Camera,
    LightningEnabled,
    WaterColor,
    WaterDistortion,
    WaterWaveSize,
    WaterAlpha,
    WaterTime,
    WaterTimeStep,
    VerticesPerEdge,
    Width,
    HeightScale,
    HeightBias,
    ColorLow,
    ColorMid,
    ColorHigh,
    ThresholdMid,
    ThresholdHigh,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Number(f32),
    Toggle(bool),
    Color(Color),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlKind {
    Slider { min: f32, max: f32, step: f32 },
    Checkbox,
    ColorPicker,
    /// Text supplied by the host every frame; never edited
    Readout,
}

/// Side effect requested by a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    RebuildTerrain,
    ToggleRain,
    ToggleHelpers,
    RecolorWater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The bound value is read directly; nothing is queued
    Live,
    /// Queue the effect on every change
    OnChange(Effect),
    /// Queue the effect only once the interaction ends
    OnFinishChange(Effect),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Control {
    pub param: Param,
    pub label: &'static str,
    pub folder: Option<&'static str>,
    pub kind: ControlKind,
    pub trigger: Trigger,
}

const fn slider(
    param: Param,
    label: &'static str,
    folder: Option<&'static str>,
    range: (f32, f32, f32),
    trigger: Trigger,
) -> Control {
    Control {
        param,
        label,
        folder,
        kind: ControlKind::Slider {
            min: range.0,
            max: range.1,
            step: range.2,
        },
        trigger,
    }
}

const fn checkbox(param: Param, label: &'static str, trigger: Trigger) -> Control {
    Control {
        param,
        label,
        folder: None,
        kind: ControlKind::Checkbox,
        trigger,
    }
}

const fn color(param: Param, label: &'static str, folder: &'static str, trigger: Trigger) -> Control {
    Control {
        param,
        label,
        folder: Some(folder),
        kind: ControlKind::ColorPicker,
        trigger,
    }
}

const fn readout(param: Param, label: &'static str) -> Control {
    Control {
        param,
        label,
        folder: None,
        kind: ControlKind::Readout,
        trigger: Trigger::Live,
    }
}

const WIND: Option<&str> = Some("Wind");
const WATER: Option<&str> = Some("Water");
const SHAPE: Option<&str> = Some("Shape");
const COLOURS: Option<&str> = Some("Colours");

const LAYOUT: &[Control] = &[
    slider(Param::WindX, "Wind X", WIND, (-1.0, 1.0, 0.01), Trigger::Live),
    slider(Param::WindZ, "Wind Z", WIND, (-1.0, 1.0, 0.01), Trigger::Live),
    slider(Param::WindSpeed, "Wind Speed", WIND, (0.0, 5.0, 0.1), Trigger::Live),
    checkbox(Param::RainEnabled, "Rain On/Off", Trigger::OnChange(Effect::ToggleRain)),
    checkbox(Param::ShowHelpers, "Toggle Helpers", Trigger::OnChange(Effect::ToggleHelpers)),
    slider(Param::OrbitSpeed, "Sun Orbit Speed", None, (0.00005, 0.001, 0.00001), Trigger::Live),
    readout(Param::Camera, "Camera"),
    checkbox(Param::LightningEnabled, "Lightning", Trigger::Live),
    color(Param::WaterColor, "Water Color", "Water", Trigger::OnChange(Effect::RecolorWater)),
    slider(Param::WaterDistortion, "Distortion", WATER, (0.0, 10.0, 0.1), Trigger::Live),
    slider(Param::WaterWaveSize, "Wave Size", WATER, (0.1, 10.0, 0.1), Trigger::Live),
    slider(Param::WaterAlpha, "Opacity", WATER, (0.0, 1.0, 0.01), Trigger::Live),
    slider(Param::WaterTime, "Time", WATER, (0.0, 1000.0, 0.01), Trigger::Live),
    slider(Param::WaterTimeStep, "Animation Speed", WATER, (0.0, 1.0, 0.01), Trigger::Live),
    slider(
        Param::VerticesPerEdge,
        "Verts/edge",
        SHAPE,
        (64.0, 1024.0, 64.0),
        Trigger::OnFinishChange(Effect::RebuildTerrain),
    ),
    slider(
        Param::Width,
        "Width",
        SHAPE,
        (100.0, 1024.0, 1.0),
        Trigger::OnFinishChange(Effect::RebuildTerrain),
    ),
    slider(Param::HeightScale, "Height scale", SHAPE, (0.0, 200.0, 1.0), Trigger::OnChange(Effect::RebuildTerrain)),
    slider(Param::HeightBias, "Height bias", SHAPE, (-150.0, 150.0, 1.0), Trigger::OnChange(Effect::RebuildTerrain)),
    color(Param::ColorLow, "Low", "Colours", Trigger::OnChange(Effect::RebuildTerrain)),
    color(Param::ColorMid, "Mid", "Colours", Trigger::OnChange(Effect::RebuildTerrain)),
    color(Param::ColorHigh, "High", "Colours", Trigger::OnChange(Effect::RebuildTerrain)),
    slider(
        Param::ThresholdMid,
        "Sand→Grass",
        COLOURS,
        (0.0, 1.0, 0.01),
        Trigger::OnChange(Effect::RebuildTerrain),
    ),
    slider(
        Param::ThresholdHigh,
        "Grass→Rock",
        COLOURS,
        (0.0, 1.0, 0.01),
        Trigger::OnChange(Effect::RebuildTerrain),
    ),
];

/// Control registry and queue of pending side effects
///
/// Edits write straight into the bound [`SceneSettings`]. Effects are
/// coalesced until drained, so a burst of edits within one frame asks for at
/// most one rebuild.
#[derive(Debug, Default)]
pub struct TweakPanel {
    pending: Vec<Effect>,
}

impl TweakPanel {
    pub fn new() -> Self {
        TweakPanel::default()
    }

    pub fn controls(&self) -> &'static [Control] {
        LAYOUT
    }

    pub fn control(&self, param: Param) -> Option<&'static Control> {
        LAYOUT.iter().find(|c| c.param == param)
    }

    /// Folder names in display order
    pub fn folders(&self) -> Vec<&'static str> {
        let mut folders: Vec<&'static str> = Vec::new();
        for folder in LAYOUT.iter().filter_map(|c| c.folder) {
            if !folders.contains(&folder) {
                folders.push(folder);
            }
        }
        folders
    }

    /// Apply an in-progress change. Numbers are snapped to the slider step and
    /// clamped to its range; values of the wrong kind are ignored.
    pub fn edit(&mut self, settings: &mut SceneSettings, param: Param, value: ParamValue) -> bool {
        let Some(control) = self.control(param) else {
            return false;
        };
        let value = match (control.kind, value) {
            (ControlKind::Slider { min, max, step }, ParamValue::Number(v)) => {
                ParamValue::Number(snap(v, min, max, step))
            }
            (ControlKind::Checkbox, ParamValue::Toggle(_)) | (ControlKind::ColorPicker, ParamValue::Color(_)) => value,
            _ => return false,
        };
        write(settings, param, value);
        if let Trigger::OnChange(effect) = control.trigger {
            self.queue(effect);
        }
        true
    }

    /// Signal that the interaction with `param` has ended
    pub fn finish(&mut self, param: Param) {
        if let Some(Trigger::OnFinishChange(effect)) = self.control(param).map(|c| c.trigger) {
            self.queue(effect);
        }
    }

    fn queue(&mut self, effect: Effect) {
        if !self.pending.contains(&effect) {
            self.pending.push(effect);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Pending effects in the order first requested
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.pending)
    }
}

fn snap(value: f32, min: f32, max: f32, step: f32) -> f32 {
    let snapped = if step > 0.0 {
        min + ((value - min) / step).round() * step
    } else {
        value
    };
    snapped.clamp(min, max)
}

/// Current value of `param` in `settings`; `None` for readouts
pub fn read(settings: &SceneSettings, param: Param) -> Option<ParamValue> {
    use ParamValue::{Color as C, Number as N, Toggle as T};
    let value = match param {
        Param::Camera => return None,
        Param::WindX => N(settings.wind.x),
        Param::WindZ => N(settings.wind.z),
        Param::WindSpeed => N(settings.wind.speed),
        Param::RainEnabled => T(settings.rain.enabled),
        Param::ShowHelpers => T(settings.panel.show_helpers),
        Param::OrbitSpeed => N(settings.panel.orbit_speed),
        Param::LightningEnabled => T(settings.lighting.lightning_enabled),
        Param::WaterColor => C(settings.water.color),
        Param::WaterDistortion => N(settings.water.distortion),
        Param::WaterWaveSize => N(settings.water.wave_size),
        Param::WaterAlpha => N(settings.water.alpha),
        Param::WaterTime => N(settings.water.time),
        Param::WaterTimeStep => N(settings.water.time_step),
        Param::VerticesPerEdge => N(settings.terrain.vertices_per_edge as f32),
        Param::Width => N(settings.terrain.width),
        Param::HeightScale => N(settings.terrain.height_scale),
        Param::HeightBias => N(settings.terrain.height_bias),
        Param::ColorLow => C(settings.terrain.color_low),
        Param::ColorMid => C(settings.terrain.color_mid),
        Param::ColorHigh => C(settings.terrain.color_high),
        Param::ThresholdMid => N(settings.terrain.threshold_mid),
        Param::ThresholdHigh => N(settings.terrain.threshold_high),
    };
    Some(value)
}

fn write(settings: &mut SceneSettings, param: Param, value: ParamValue) {
    match (param, value) {
        (Param::WindX, ParamValue::Number(v)) => settings.wind.x = v,
        (Param::WindZ, ParamValue::Number(v)) => settings.wind.z = v,
        (Param::WindSpeed, ParamValue::Number(v)) => settings.wind.speed = v,
        (Param::RainEnabled, ParamValue::Toggle(v)) => settings.rain.enabled = v,
        (Param::ShowHelpers, ParamValue::Toggle(v)) => settings.panel.show_helpers = v,
        (Param::OrbitSpeed, ParamValue::Number(v)) => settings.panel.orbit_speed = v,
        (Param::LightningEnabled, ParamValue::Toggle(v)) => settings.lighting.lightning_enabled = v,
        (Param::WaterColor, ParamValue::Color(c)) => settings.water.color = c,
        (Param::WaterDistortion, ParamValue::Number(v)) => settings.water.distortion = v,
        (Param::WaterWaveSize, ParamValue::Number(v)) => settings.water.wave_size = v,
        (Param::WaterAlpha, ParamValue::Number(v)) => settings.water.alpha = v,
        (Param::WaterTime, ParamValue::Number(v)) => settings.water.time = v,
        (Param::WaterTimeStep, ParamValue::Number(v)) => settings.water.time_step = v,
        (Param::VerticesPerEdge, ParamValue::Number(v)) => settings.terrain.vertices_per_edge = v.round() as u32,
        (Param::Width, ParamValue::Number(v)) => settings.terrain.width = v,
        (Param::HeightScale, ParamValue::Number(v)) => settings.terrain.height_scale = v,
        (Param::HeightBias, ParamValue::Number(v)) => settings.terrain.height_bias = v,
        (Param::ColorLow, ParamValue::Color(c)) => settings.terrain.color_low = c,
        (Param::ColorMid, ParamValue::Color(c)) => settings.terrain.color_mid = c,
        (Param::ColorHigh, ParamValue::Color(c)) => settings.terrain.color_high = c,
        (Param::ThresholdMid, ParamValue::Number(v)) => settings.terrain.threshold_mid = v,
        (Param::ThresholdHigh, ParamValue::Number(v)) => settings.terrain.threshold_high = v,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_param_has_one_control() {
        let panel = TweakPanel::new();
        for control in panel.controls() {
            let count = panel.controls().iter().filter(|c| c.param == control.param).count();
            assert_eq!(count, 1, "{:?}", control.param);
        }
        assert_eq!(panel.folders(), vec!["Wind", "Water", "Shape", "Colours"]);
    }

    #[test]
    fn test_shape_resolution_rebuilds_only_on_finish() {
        let mut panel = TweakPanel::new();
        let mut settings = SceneSettings::default();

        panel.edit(&mut settings, Param::VerticesPerEdge, ParamValue::Number(300.0));
        panel.edit(&mut settings, Param::VerticesPerEdge, ParamValue::Number(500.0));
        assert!(!panel.has_pending());
        // Snapped to a multiple of 64 above the minimum
        assert_eq!(settings.terrain.vertices_per_edge, 512);

        panel.finish(Param::VerticesPerEdge);
        assert_eq!(panel.drain_effects(), vec![Effect::RebuildTerrain]);
    }

    #[test]
    fn test_effects_are_coalesced() {
        let mut panel = TweakPanel::new();
        let mut settings = SceneSettings::default();
        panel.edit(&mut settings, Param::HeightScale, ParamValue::Number(80.0));
        panel.edit(&mut settings, Param::HeightBias, ParamValue::Number(-5.0));
        panel.edit(&mut settings, Param::RainEnabled, ParamValue::Toggle(true));
        panel.edit(&mut settings, Param::ColorMid, ParamValue::Color(Color::WHITE));

        assert_eq!(panel.drain_effects(), vec![Effect::RebuildTerrain, Effect::ToggleRain]);
        assert!(panel.drain_effects().is_empty());
    }

    #[test]
    fn test_live_edits_clamp_and_queue_nothing() {
        let mut panel = TweakPanel::new();
        let mut settings = SceneSettings::default();
        assert!(panel.edit(&mut settings, Param::WindSpeed, ParamValue::Number(9.0)));
        assert_eq!(settings.wind.speed, 5.0);
        assert!(!panel.has_pending());
        assert_eq!(read(&settings, Param::WindSpeed), Some(ParamValue::Number(5.0)));
    }

    #[test]
    fn test_wrong_value_kind_is_ignored() {
        let mut panel = TweakPanel::new();
        let mut settings = SceneSettings::default();
        assert!(!panel.edit(&mut settings, Param::RainEnabled, ParamValue::Number(1.0)));
        assert!(!settings.rain.enabled);
    }

    #[test]
    fn test_camera_readout_rejects_edits() {
        let mut panel = TweakPanel::new();
        let mut settings = SceneSettings::default();
        let control = panel.control(Param::Camera).unwrap();
        assert_eq!(control.kind, ControlKind::Readout);
        assert!(control.folder.is_none());
        assert!(!panel.edit(&mut settings, Param::Camera, ParamValue::Number(1.0)));
        assert_eq!(read(&settings, Param::Camera), None);
    }

    #[test]
    fn test_water_time_slider_writes_clock() {
        let mut panel = TweakPanel::new();
        let mut settings = SceneSettings::default();
        assert_eq!(panel.control(Param::WaterTime).unwrap().folder, Some("Water"));
        assert!(panel.edit(&mut settings, Param::WaterTime, ParamValue::Number(2000.0)));
        assert_eq!(settings.water.time, 1000.0);
        assert!(!panel.has_pending());
    }
}
