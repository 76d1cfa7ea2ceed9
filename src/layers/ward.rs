//! A layer drawing ward boundaries, highlighting the ward under the pin and turning clicks
//! into pin drops.
//!
//! # Example
//!
//! ```no_run
//! use eframe::egui;
//! use ward_map_view::{Map, config::OpenStreetMapConfig, layers::ward::WardLayer};
//! use ward_map_view::{lookup::WardLookup, roster::CandidateRoster, wards::{WardSchema, WardSet}};
//!
//! struct MyApp {
//!     map: Map,
//! }
//!
//! impl Default for MyApp {
//!     fn default() -> Self {
//!         let wards = WardSet::load("wards.geojson".as_ref(), &WardSchema::default())
//!             .unwrap_or_default();
//!         let mut map = Map::new(OpenStreetMapConfig::default());
//!         map.add_layer("wards", WardLayer::new(WardLookup::new(wards, CandidateRoster::default())));
//!         Self { map }
//!     }
//! }
//!
//! impl eframe::App for MyApp {
//!     fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
//!         egui::CentralPanel::default().show(ctx, |ui| {
//!             ui.add(&mut self.map);
//!         });
//!         if let Some(layer) = self.map.layer_mut::<WardLayer>("wards") {
//!             layer.show_info_panel(ctx);
//!         }
//!     }
//! }
//! ```

use egui::{Color32, Mesh, Painter, Pos2, Response, Shape, Stroke};
use log::warn;
use std::any::Any;

use crate::layers::Layer;
use crate::lookup::WardLookup;
use crate::projection::{GeoPos, MapProjection};
use crate::wards::Ward;

/// How wards and the pin are painted.
#[derive(Clone, Debug, PartialEq)]
pub struct WardStyle {
    /// Outline color of every ward.
    pub outline: Color32,

    /// Fill colors, picked by the last digit of the ward name.
    pub palette: [Color32; 10],

    /// Fill color for wards whose name does not end in a digit.
    pub fallback_fill: Color32,

    /// Outline width and fill opacity of wards that are not highlighted.
    pub normal: (f32, f32),

    /// Outline width and fill opacity of the highlighted ward.
    pub highlighted: (f32, f32),

    /// Color of the pin head.
    pub pin: Color32,
}

impl Default for WardStyle {
    fn default() -> Self {
        Self {
            outline: Color32::from_rgb(0x13, 0x4c, 0x77),
            palette: [
                Color32::from_rgb(0x8d, 0xd3, 0xc7),
                Color32::from_rgb(0xff, 0xff, 0xb3),
                Color32::from_rgb(0xbe, 0xba, 0xda),
                Color32::from_rgb(0xfb, 0x80, 0x72),
                Color32::from_rgb(0x80, 0xb1, 0xd3),
                Color32::from_rgb(0xfd, 0xb4, 0x62),
                Color32::from_rgb(0xb3, 0xde, 0x69),
                Color32::from_rgb(0xfc, 0xcd, 0xe5),
                Color32::from_rgb(0xd9, 0xd9, 0xd9),
                Color32::from_rgb(0xbc, 0x80, 0xbd),
            ],
            fallback_fill: Color32::from_rgb(0xcc, 0xeb, 0xc5),
            normal: (2.0, 0.3),
            highlighted: (3.0, 0.7),
            pin: Color32::from_rgb(0x2a, 0x81, 0xcb),
        }
    }
}

impl WardStyle {
    /// The fill color of `ward`.
    pub fn fill(&self, ward: &Ward, highlighted: bool) -> Color32 {
        let base = ward
            .name
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .map_or(self.fallback_fill, |d| self.palette[d as usize]);
        let (_, opacity) = self.weights(highlighted);
        Color32::from_rgba_unmultiplied(base.r(), base.g(), base.b(), (opacity * 255.0).round() as u8)
    }

    /// The outline stroke of a ward.
    pub fn stroke(&self, highlighted: bool) -> Stroke {
        let (width, _) = self.weights(highlighted);
        Stroke::new(width, self.outline)
    }

    fn weights(&self, highlighted: bool) -> (f32, f32) {
        if highlighted {
            self.highlighted
        } else {
            self.normal
        }
    }
}

/// Layer showing the wards of a [`WardLookup`].
pub struct WardLayer {
    lookup: WardLookup,

    /// Colors and weights.
    pub style: WardStyle,

    /// Zoom level to fly to after a pin drop.
    pub local_zoom: u8,

    /// Whether a click on the map drops the pin.
    pub click_to_pin: bool,

    fly_to: Option<GeoPos>,
}

impl WardLayer {
    /// Creates a layer that drops the pin on click.
    pub fn new(lookup: WardLookup) -> Self {
        Self {
            lookup,
            style: WardStyle::default(),
            local_zoom: 13,
            click_to_pin: true,
            fly_to: None,
        }
    }

    /// Drops the pin at `pos` and asks the map to fly there. See [`WardLookup::drop_pin`].
    pub fn drop_pin(&mut self, pos: GeoPos) -> Option<&Ward> {
        self.fly_to = Some(pos);
        self.lookup.drop_pin(pos)
    }

    /// Drops the pin at `pos` and asks the map to fly to the middle of the ward hit, or to
    /// `pos` when there is none.
    pub fn select_at(&mut self, pos: GeoPos) -> Option<&Ward> {
        let ward_center = self.lookup.drop_pin(pos).map(|ward| ward.bounds().center());
        self.fly_to = Some(ward_center.unwrap_or(pos));
        self.lookup.highlighted_ward()
    }

    /// Takes the pending fly-to target set by the last pin drop. Pass it to
    /// [`crate::Map::fly_to`] together with [`WardLayer::local_zoom`].
    pub fn take_fly_to(&mut self) -> Option<GeoPos> {
        self.fly_to.take()
    }

    /// The lookup state.
    pub fn lookup(&self) -> &WardLookup {
        &self.lookup
    }

    /// The lookup state, mutably.
    pub fn lookup_mut(&mut self) -> &mut WardLookup {
        &mut self.lookup
    }

    /// Draws the info panel for the current pin.
    pub fn show_info_panel(&mut self, ctx: &egui::Context) {
        self.lookup.panel_mut().show(ctx);
    }

    fn draw_ward(&self, painter: &Painter, projection: &MapProjection, ward: &Ward, highlighted: bool) {
        let fill = self.style.fill(ward, highlighted);
        let stroke = self.style.stroke(highlighted);

        for ring in ward.rings() {
            let mut screen_points: Vec<Pos2> = ring.iter().map(|p| projection.project(*p)).collect();
            if screen_points.len() > 3 && screen_points.first() == screen_points.last() {
                screen_points.pop();
            }

            let flat_points: Vec<f64> = screen_points
                .iter()
                .flat_map(|p| [p.x as f64, p.y as f64])
                .collect();
            match earcutr::earcut(&flat_points, &[], 2) {
                Ok(indices) => {
                    let mut mesh = Mesh::default();
                    mesh.vertices = screen_points
                        .iter()
                        .map(|p| egui::epaint::Vertex {
                            pos: *p,
                            uv: Default::default(),
                            color: fill,
                        })
                        .collect();
                    mesh.indices = indices.into_iter().map(|i| i as u32).collect();
                    painter.add(Shape::Mesh(mesh.into()));
                }
                Err(e) => warn!("Unable to triangulate ward {}: {:?}", ward.name, e),
            }

            painter.add(Shape::Path(egui::epaint::PathShape {
                points: screen_points,
                closed: true,
                fill: Color32::TRANSPARENT,
                stroke: stroke.into(),
            }));
        }
    }

    fn draw_pin(&self, painter: &Painter, pos: Pos2) {
        let head = pos - egui::vec2(0.0, 14.0);
        painter.line_segment([head, pos], Stroke::new(2.0, self.style.pin));
        painter.circle(head, 7.0, self.style.pin, Stroke::new(2.0, Color32::WHITE));
    }
}

impl Layer for WardLayer {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn handle_input(&mut self, response: &Response, projection: &MapProjection) -> bool {
        if self.click_to_pin && response.clicked() {
            if let Some(pointer_pos) = response.interact_pointer_pos() {
                self.select_at(projection.unproject(pointer_pos));
            }
        }
        // Dragging and zooming stay with the map.
        false
    }

    fn draw(&self, painter: &Painter, projection: &MapProjection) {
        let highlighted = self.lookup.highlighted();
        for (i, ward) in self.lookup.wards().iter().enumerate() {
            if Some(i) != highlighted {
                self.draw_ward(painter, projection, ward, false);
            }
        }
        // Last, so its thicker outline is not covered by neighbours.
        if let Some(ward) = self.lookup.highlighted_ward() {
            self.draw_ward(painter, projection, ward, true);
        }

        if let Some(pin) = self.lookup.pin() {
            self.draw_pin(painter, projection.project(pin));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{CandidateRoster, WardId};
    use crate::wards::WardSet;

    fn ward(name: &str) -> Ward {
        Ward::new(
            WardId::new(name),
            name,
            vec![vec![
                GeoPos { lon: 0.0, lat: 0.0 },
                GeoPos { lon: 1.0, lat: 0.0 },
                GeoPos { lon: 1.0, lat: 1.0 },
            ]],
        )
        .unwrap()
    }

    #[test]
    fn fill_follows_last_digit() {
        let style = WardStyle::default();
        let with_alpha = |c: Color32, a: u8| Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), a);

        let normal = style.fill(&ward("Scarborough Centre 21"), false);
        assert_eq!(normal, with_alpha(style.palette[1], 77));

        let highlighted = style.fill(&ward("Scarborough Centre 21"), true);
        assert!(highlighted.a() > normal.a());

        let fallback = style.fill(&ward("Beaches"), false);
        assert_eq!(fallback, with_alpha(style.fallback_fill, 77));
    }

    #[test]
    fn highlight_is_heavier() {
        let style = WardStyle::default();
        assert_eq!(style.stroke(false).width, 2.0);
        assert_eq!(style.stroke(true).width, 3.0);
        assert_eq!(style.stroke(true).color, Color32::from_rgb(0x13, 0x4c, 0x77));
    }

    #[test]
    fn drop_pin_queues_fly_to() {
        let lookup = WardLookup::new(WardSet::new(vec![ward("1")]), CandidateRoster::default());
        let mut layer = WardLayer::new(lookup);
        assert!(layer.take_fly_to().is_none());

        let pos = GeoPos { lon: 0.9, lat: 0.1 };
        assert_eq!(layer.drop_pin(pos).map(|w| w.name.clone()), Some("1".to_string()));
        assert_eq!(layer.take_fly_to(), Some(pos));
        assert!(layer.take_fly_to().is_none());
        assert_eq!(layer.lookup().highlighted(), Some(0));
    }

    #[test]
    fn clicked_ward_flies_to_its_middle() {
        let lookup = WardLookup::new(WardSet::new(vec![ward("1")]), CandidateRoster::default());
        let mut layer = WardLayer::new(lookup);

        let hit = layer.select_at(GeoPos { lon: 0.9, lat: 0.1 }).map(|w| w.name.clone());
        assert_eq!(hit, Some("1".to_string()));
        assert_eq!(layer.take_fly_to(), Some(GeoPos { lon: 0.5, lat: 0.5 }));
        assert_eq!(layer.lookup().pin(), Some(GeoPos { lon: 0.9, lat: 0.1 }));

        let outside = GeoPos { lon: 5.0, lat: 5.0 };
        assert!(layer.select_at(outside).is_none());
        assert_eq!(layer.take_fly_to(), Some(outside));
        assert!(layer.lookup().highlighted().is_none());
    }

    #[test]
    fn ward_layer_as_any() {
        let mut layer = WardLayer::new(WardLookup::default());
        assert!(layer.as_any().is::<WardLayer>());
        assert!(layer.as_any_mut().is::<WardLayer>());
        assert!(layer.click_to_pin);
        assert_eq!(layer.local_zoom, 13);
    }
}
