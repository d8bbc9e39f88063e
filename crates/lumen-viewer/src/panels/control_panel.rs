//! The "Window" control panel: camera mode, minimap, scene toggles, cube,
//! curve, shadow settings and the light list.

use glam::{Vec3, Vec4};
use lumen_render::{
    CameraMode, CameraRig, LightManager, MinimapAnchor, RendererConfig, SceneState, ShadowMode,
    NEW_LIGHT_COLOR, NEW_LIGHT_POSITION,
};

const SHADOW_RESOLUTIONS: [u32; 5] = [256, 512, 1024, 2048, 4096];

/// Everything the panel reads and edits for one frame
pub struct ControlPanelView<'a> {
    pub state: &'a mut SceneState,
    pub config: &'a mut RendererConfig,
    pub rig: &'a mut CameraRig,
    pub lights: &'a mut LightManager,
    pub frame_time: f64,
}

fn drag_vec3(ui: &mut egui::Ui, label: &str, value: &mut Vec3, speed: f64, range: std::ops::RangeInclusive<f32>) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        for component in [&mut value.x, &mut value.y, &mut value.z] {
            changed |= ui
                .add(
                    egui::DragValue::new(component)
                        .speed(speed)
                        .range(range.clone())
                        .clamp_existing_to_range(false),
                )
                .changed();
        }
        ui.label(label);
    });
    changed
}

/// Range limits apply only while dragging; values set elsewhere stay put
fn drag_f32(ui: &mut egui::Ui, label: &str, value: &mut f32, speed: f64, range: std::ops::RangeInclusive<f32>) -> bool {
    ui.horizontal(|ui| {
        let changed = ui
            .add(
                egui::DragValue::new(value)
                    .speed(speed)
                    .range(range)
                    .clamp_existing_to_range(false),
            )
            .changed();
        ui.label(label);
        changed
    })
    .inner
}

/// Draw the control panel into `ui`
pub fn control_panel(ui: &mut egui::Ui, view: ControlPanelView<'_>) {
    let ControlPanelView {
        state,
        config,
        rig,
        lights,
        frame_time,
    } = view;

    ui.monospace(format!("Frame: {:.1}ms", frame_time * 1000.0));
    ui.checkbox(&mut config.use_material, "Use material if no texture");

    egui::ComboBox::from_label("Camera Mode")
        .selected_text(state.camera_mode.label())
        .show_ui(ui, |ui| {
            for mode in CameraMode::ALL {
                ui.selectable_value(&mut state.camera_mode, mode, mode.label());
            }
        });
    if ui.button("Reset Fly Camera").clicked() {
        rig.reset_fly();
    }

    ui.collapsing("Fly Camera Info", |ui| {
        let pose = rig.fly;
        ui.label(format!(
            "Position: ({:.2}, {:.2}, {:.2})",
            pose.position.x, pose.position.y, pose.position.z
        ));
        ui.label(format!(
            "Forward: ({:.2}, {:.2}, {:.2})",
            pose.forward.x, pose.forward.y, pose.forward.z
        ));
        ui.label(format!("Up: ({:.2}, {:.2}, {:.2})", pose.up.x, pose.up.y, pose.up.z));
    });

    ui.collapsing("Third Person Camera", |ui| {
        let settings = &mut rig.third_person;
        drag_f32(ui, "Follow Distance", &mut settings.follow_distance, 0.1, 0.0..=20.0);
        drag_f32(ui, "Height Offset", &mut settings.height_offset, 0.1, 0.0..=20.0);
        drag_f32(ui, "Side Offset", &mut settings.side_offset, 0.1, -10.0..=10.0);
        drag_vec3(ui, "Character Offset", &mut state.character_offset, 0.1, -10.0..=10.0);
    });

    ui.separator();
    ui.collapsing("Minimap", |ui| {
        let minimap = &mut state.minimap;
        drag_f32(ui, "Ortho Height", &mut minimap.ortho_height, 0.1, 1.0..=80.0);
        ui.horizontal(|ui| {
            ui.radio_value(&mut minimap.anchor, MinimapAnchor::CameraRelative, "Camera");
            ui.radio_value(&mut minimap.anchor, MinimapAnchor::ScreenRelative, "Screen");
        });
        drag_vec3(ui, "Quad Origin", &mut minimap.origin, 0.01, -1.0..=1.8);
        drag_f32(ui, "Quad Height", &mut minimap.height, 0.01, 0.05..=2.0);
        drag_f32(ui, "Quad Aspect", &mut minimap.aspect, 0.01, 0.25..=4.0);
    });

    ui.collapsing("Scene Controls", |ui| {
        ui.checkbox(&mut state.show_minimap, "Show Minimap");
        ui.checkbox(&mut state.render_main_scene, "Render Main Scene");
        ui.checkbox(&mut state.draw_light_markers, "Draw Light Markers");
        ui.checkbox(&mut state.draw_cube, "Draw Cube");
        if state.draw_cube {
            ui.collapsing("Cube Settings", |ui| {
                let cube = &mut state.cube;
                ui.checkbox(&mut cube.reflect_mode, "Reflect Mode");
                drag_f32(ui, "Refraction Index", &mut cube.refraction_index, 0.01, 0.0..=2.0);
                drag_f32(ui, "Cube Rotation", &mut cube.rotation_per_tick, 0.1, 0.0..=10.0);
            });
        }

        ui.collapsing("Bezier Curve Settings", |ui| {
            ui.checkbox(&mut state.draw_curve, "Draw Bezier Curve");
            ui.checkbox(&mut state.bezier_light, "Attach Light");
            let labels = ["First", "Second", "Third", "Fourth"];
            for (point, label) in state.curve.control_points.iter_mut().zip(labels) {
                drag_vec3(ui, &format!("{} Control Point", label), point, 5.0, -100.0..=100.0);
            }
            if ui.button("Redraw Curve").clicked() {
                state.request_curve_redraw();
            }
        });

        ui.label("Shadow Mode");
        ui.horizontal(|ui| {
            for mode in ShadowMode::ALL {
                ui.radio_value(&mut config.shadow_mode, mode, mode.label());
            }
        });
        let mut samples = config.pcf_sample_count();
        ui.horizontal(|ui| {
            if ui
                .add(egui::DragValue::new(&mut samples).range(RendererConfig::PCF_SAMPLE_RANGE))
                .changed()
            {
                config.set_pcf_sample_count(samples);
            }
            ui.label("PCF Sample Count");
        });

        let mut resolution = lights.shadow_resolution();
        egui::ComboBox::from_label("Shadow Resolution")
            .selected_text(resolution.to_string())
            .show_ui(ui, |ui| {
                for option in SHADOW_RESOLUTIONS {
                    ui.selectable_value(&mut resolution, option, option.to_string());
                }
            });
        if resolution != lights.shadow_resolution() {
            log::info!("Shadow resolution set to {}", resolution);
            lights.set_shadow_resolution(resolution);
        }
    });

    ui.collapsing("Lights", |ui| {
        let selected = lights.selected();
        let mut clicked = None;
        egui::ScrollArea::vertical().max_height(80.0).show(ui, |ui| {
            for (i, light) in lights.lights().iter().enumerate() {
                if ui.selectable_label(i == selected, format!("{} {}", i, light.label())).clicked() {
                    clicked = Some(i);
                }
            }
        });
        if let Some(index) = clicked {
            lights.select(index);
        }

        ui.horizontal(|ui| {
            if ui.button("Add Light").clicked() {
                lights.add_light(NEW_LIGHT_POSITION, NEW_LIGHT_COLOR);
                log::info!("Added light {}", lights.selected());
            }
            if ui.button("Remove Light").clicked() && !lights.remove_selected() {
                log::debug!("Refused to remove the last light");
            }
        });

        let light = lights.selected_light_mut();
        let mut position = light.position();
        if drag_vec3(ui, "Position", &mut position, 0.1, -10.0..=10.0) {
            light.set_position(position);
        }
        let mut color = light.color.to_array();
        ui.horizontal(|ui| {
            if ui.color_edit_button_rgba_unmultiplied(&mut color).changed() {
                light.color = Vec4::from_array(color);
            }
            ui.label("Color");
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lay out one frame with no input and return what `add_contents` reports
    fn run_frame<R: Default>(mut add_contents: impl FnMut(&mut egui::Ui) -> R) -> R {
        let ctx = egui::Context::default();
        let mut result = R::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                result = add_contents(ui);
            });
        });
        result
    }

    #[test]
    fn drawing_keeps_out_of_range_vec3() {
        let mut position = Vec3::new(55.0, 35.0, -20.0);
        let changed = run_frame(|ui| drag_vec3(ui, "Position", &mut position, 0.1, -10.0..=10.0));
        assert!(!changed);
        assert_eq!(position, Vec3::new(55.0, 35.0, -20.0));
    }

    #[test]
    fn drawing_keeps_out_of_range_scalar() {
        let mut height = 120.0;
        let changed = run_frame(|ui| drag_f32(ui, "Ortho Height", &mut height, 0.1, 1.0..=80.0));
        assert!(!changed);
        assert_eq!(height, 120.0);
    }
}
