//! Time-of-day serving radius policy.

use crate::RadiusConfig;
use chrono::NaiveTime;

/// Maps a time of day to the radius restaurants are served within.
///
/// During peak windows the radius shrinks so that deliveries stay short when
/// the fleet is busiest.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusPolicy {
    config: RadiusConfig,
}

impl RadiusPolicy {
    pub fn new(config: RadiusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RadiusConfig {
        &self.config
    }

    /// Whether `time` falls strictly inside any peak window.
    pub fn is_peak(&self, time: NaiveTime) -> bool {
        self.config.peak_windows.iter().any(|w| w.contains(time))
    }

    /// Serving radius in kilometres at `time`.
    pub fn effective_radius_km(&self, time: NaiveTime) -> f64 {
        if self.is_peak(time) {
            self.config.peak_radius_km
        } else {
            self.config.normal_radius_km
        }
    }
}

impl Default for RadiusPolicy {
    fn default() -> Self {
        Self::new(RadiusConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PeakWindow;
    use chrono::Timelike;
    use proptest::prelude::*;

    fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_peak_windows_use_peak_radius() {
        let policy = RadiusPolicy::default();
        assert_eq!(policy.effective_radius_km(hms(9, 0, 0)), 3.0);
        assert_eq!(policy.effective_radius_km(hms(13, 30, 0)), 3.0);
        assert_eq!(policy.effective_radius_km(hms(20, 15, 0)), 3.0);
    }

    #[test]
    fn test_off_peak_uses_normal_radius() {
        let policy = RadiusPolicy::default();
        assert_eq!(policy.effective_radius_km(hms(7, 59, 59)), 5.0);
        assert_eq!(policy.effective_radius_km(hms(11, 0, 0)), 5.0);
        assert_eq!(policy.effective_radius_km(hms(16, 0, 0)), 5.0);
        assert_eq!(policy.effective_radius_km(hms(23, 0, 0)), 5.0);
    }

    #[test]
    fn test_window_boundaries_are_not_peak() {
        let policy = RadiusPolicy::default();
        for boundary in [
            hms(8, 0, 0),
            hms(10, 0, 0),
            hms(13, 0, 0),
            hms(14, 0, 0),
            hms(19, 0, 0),
            hms(21, 0, 0),
        ] {
            assert_eq!(policy.effective_radius_km(boundary), 5.0, "at {boundary}");
        }
    }

    #[test]
    fn test_windows_are_configurable() {
        let policy = RadiusPolicy::new(RadiusConfig {
            peak_radius_km: 1.5,
            normal_radius_km: 7.0,
            peak_windows: vec![PeakWindow::new(hms(11, 0, 0), hms(12, 0, 0))],
        });
        assert_eq!(policy.effective_radius_km(hms(11, 30, 0)), 1.5);
        assert_eq!(policy.effective_radius_km(hms(9, 0, 0)), 7.0);
    }

    proptest! {
        #[test]
        fn prop_radius_matches_window_membership(secs in 0u32..86_400) {
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap();
            let policy = RadiusPolicy::default();
            let h = time.hour();
            let on_hour = time.minute() == 0 && time.second() == 0;
            let inside = ((8..10).contains(&h) || h == 13 || (19..21).contains(&h))
                && !(on_hour && matches!(h, 8 | 13 | 19));
            let expected = if inside { 3.0 } else { 5.0 };
            prop_assert_eq!(policy.effective_radius_km(time), expected);
        }
    }
}
