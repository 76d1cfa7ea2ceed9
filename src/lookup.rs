//! The pin, the highlighted ward and the info panel, kept in one place.

use log::{debug, info};

use crate::panel::InfoPanel;
use crate::projection::GeoPos;
use crate::roster::CandidateRoster;
use crate::wards::{Ward, WardSet};

/// Everything a pin drop reads and updates.
///
/// Built once from the loaded wards and roster and then driven by clicks and geolocation.
#[derive(Debug, Default)]
pub struct WardLookup {
    wards: WardSet,
    roster: CandidateRoster,
    pin: Option<GeoPos>,
    highlighted: Option<usize>,
    panel: InfoPanel,
}

impl WardLookup {
    /// Creates a lookup with no pin and nothing highlighted.
    pub fn new(wards: WardSet, roster: CandidateRoster) -> Self {
        Self {
            wards,
            roster,
            ..Default::default()
        }
    }

    /// Moves the pin to `point`, highlights the ward containing it and shows that ward's
    /// candidates. Returns the matched ward.
    ///
    /// When no ward contains the point nothing is highlighted and the panel says so.
    pub fn drop_pin(&mut self, point: GeoPos) -> Option<&Ward> {
        self.pin = Some(point);
        self.highlighted = self.wards.resolve(point);

        match self.highlighted.and_then(|i| self.wards.get(i)) {
            Some(ward) => {
                let candidates = self.roster.candidates(&ward.id).to_vec();
                info!(
                    "Pin at ({:.5}, {:.5}) is in ward {} with {} candidate(s)",
                    point.lat,
                    point.lon,
                    ward.name,
                    candidates.len()
                );
                self.panel
                    .update(format!("You're in Ward {}", ward.id), candidates);
                Some(ward)
            }
            None => {
                debug!("Pin at ({:.5}, {:.5}) is outside every ward", point.lat, point.lon);
                self.panel.update("No ward found here", Vec::new());
                None
            }
        }
    }

    /// The current pin, if one was dropped.
    pub fn pin(&self) -> Option<GeoPos> {
        self.pin
    }

    /// Index of the highlighted ward.
    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    /// The highlighted ward.
    pub fn highlighted_ward(&self) -> Option<&Ward> {
        self.highlighted.and_then(|i| self.wards.get(i))
    }

    /// The loaded wards.
    pub fn wards(&self) -> &WardSet {
        &self.wards
    }

    /// The loaded roster.
    pub fn roster(&self) -> &CandidateRoster {
        &self.roster
    }

    /// The info panel.
    pub fn panel(&self) -> &InfoPanel {
        &self.panel
    }

    /// The info panel, mutably, for drawing and click handling.
    pub fn panel_mut(&mut self) -> &mut InfoPanel {
        &mut self.panel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::PanelState;
    use crate::roster::{Candidate, WardId, WardIdNormalizer};

    fn square(min_lon: f64, min_lat: f64) -> Vec<GeoPos> {
        vec![
            GeoPos { lon: min_lon, lat: min_lat },
            GeoPos { lon: min_lon + 1.0, lat: min_lat },
            GeoPos { lon: min_lon + 1.0, lat: min_lat + 1.0 },
            GeoPos { lon: min_lon, lat: min_lat + 1.0 },
        ]
    }

    fn lookup() -> WardLookup {
        let wards = WardSet::new(vec![
            Ward::new(WardId::new("1"), "1", vec![square(0.0, 0.0)]).unwrap(),
            Ward::new(WardId::new("2"), "2", vec![square(1.0, 0.0)]).unwrap(),
        ]);
        let roster = CandidateRoster::index(
            vec![
                Candidate {
                    ward: "01".to_string(),
                    name: "Ada".to_string(),
                    ..Default::default()
                },
                Candidate {
                    ward: "1".to_string(),
                    name: "Bo".to_string(),
                    ..Default::default()
                },
            ],
            &WardIdNormalizer::default(),
        );
        WardLookup::new(wards, roster)
    }

    #[test]
    fn drop_pin_highlights_and_lists() {
        let mut lookup = lookup();
        let ward = lookup.drop_pin(GeoPos { lon: 0.5, lat: 0.5 }).unwrap();
        assert_eq!(ward.id.as_str(), "1");

        assert_eq!(lookup.highlighted(), Some(0));
        assert_eq!(lookup.pin(), Some(GeoPos { lon: 0.5, lat: 0.5 }));
        assert_eq!(lookup.panel().title(), Some("You're in Ward 1"));
        let names: Vec<_> = lookup.panel().candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Bo"]);
    }

    #[test]
    fn title_names_the_ward_number() {
        let wards = WardSet::new(vec![
            Ward::new(WardId::new("14"), "Parkdale-High Park (14)", vec![square(0.0, 0.0)]).unwrap(),
        ]);
        let mut lookup = WardLookup::new(wards, CandidateRoster::default());
        lookup.drop_pin(GeoPos { lon: 0.5, lat: 0.5 });
        assert_eq!(lookup.panel().title(), Some("You're in Ward 14"));
    }

    #[test]
    fn moving_the_pin_moves_the_highlight() {
        let mut lookup = lookup();
        lookup.drop_pin(GeoPos { lon: 0.5, lat: 0.5 });
        lookup.panel_mut().toggle();

        lookup.drop_pin(GeoPos { lon: 1.5, lat: 0.5 });
        assert_eq!(lookup.highlighted(), Some(1));
        assert_eq!(lookup.highlighted_ward().map(|w| w.name.as_str()), Some("2"));
        assert!(lookup.panel().candidates().is_empty());
        assert_eq!(lookup.panel().state(), PanelState::Collapsed);
    }

    #[test]
    fn pin_outside_every_ward_clears_highlight() {
        let mut lookup = lookup();
        lookup.drop_pin(GeoPos { lon: 0.5, lat: 0.5 });

        assert!(lookup.drop_pin(GeoPos { lon: 10.0, lat: 10.0 }).is_none());
        assert_eq!(lookup.highlighted(), None);
        assert!(lookup.highlighted_ward().is_none());
        assert_eq!(lookup.pin(), Some(GeoPos { lon: 10.0, lat: 10.0 }));
        assert_eq!(lookup.panel().title(), Some("No ward found here"));
        assert!(lookup.panel().candidates().is_empty());
    }

    #[test]
    fn empty_lookup_never_matches() {
        let mut lookup = WardLookup::default();
        assert!(lookup.drop_pin(GeoPos { lon: 0.5, lat: 0.5 }).is_none());
        assert!(lookup.wards().is_empty());
        assert!(lookup.roster().is_empty());
    }
}
