#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release
#![allow(rustdoc::missing_crate_level_docs)] // it's an example

use eframe::egui;
use std::path::PathBuf;
use ward_map_view::{
    Map,
    layers::ward::WardLayer,
    locate::LocationRequest,
    lookup::WardLookup,
    settings::Settings,
};

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1024.0, 768.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Find your ward",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(load_settings())))),
    )
}

// First argument, or the settings shipped next to this demo.
fn load_settings() -> Settings {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/ward_map.toml"));
    match Settings::load(&path) {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Using default settings, {}: {}", path.display(), e);
            Settings::default()
        }
    }
}

struct MyApp {
    map: Map,
    location: Option<LocationRequest>,
}

impl MyApp {
    fn new(settings: Settings) -> Self {
        let lookup = settings.load_lookup().unwrap_or_else(|e| {
            log::error!("Failed to load ward data: {}", e);
            WardLookup::default()
        });
        log::info!(
            "Loaded {} wards and {} candidates",
            lookup.wards().len(),
            lookup.roster().len()
        );

        let ward_bounds = lookup.wards().bounds();
        let mut layer = WardLayer::new(lookup);
        layer.local_zoom = settings.view.local_zoom;

        let mut map = Map::new(settings.map_config());
        map.add_layer("wards", layer);

        let location = settings.geolocator().map(|locator| locator.locate());
        if let (None, Some(bounds)) = (&location, ward_bounds) {
            map.fly_to(bounds.center(), settings.view.initial_zoom);
        }

        Self { map, location }
    }
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(result) = self.location.as_mut().and_then(|request| request.poll()) {
            self.location = None;
            match result {
                Ok(pos) => {
                    if let Some(layer) = self.map.layer_mut::<WardLayer>("wards") {
                        layer.drop_pin(pos);
                    }
                }
                Err(e) => log::error!("Could not find your location: {}", e),
            }
        } else if self.location.is_some() {
            ctx.request_repaint();
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                ui.add_sized(ui.available_size_before_wrap(), &mut self.map);
            });

        let mut fly_to = None;
        if let Some(layer) = self.map.layer_mut::<WardLayer>("wards") {
            let zoom = layer.local_zoom;
            fly_to = layer.take_fly_to().map(|pos| (pos, zoom));
            layer.show_info_panel(ctx);
        }
        if let Some((pos, zoom)) = fly_to {
            self.map.fly_to(pos, zoom);
        }
    }
}
