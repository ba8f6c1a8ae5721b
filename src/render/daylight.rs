//! Time of day: ambient light level and shadow displacement.

/// Hours advanced per tick at speed 1.0.
const HOURS_PER_TICK: f64 = 0.1;

/// Ambient light keyframes `(hour, level)`, linearly interpolated.
const AMBIENT_CURVE: [(f64, f64); 5] = [(0.0, 0.15), (6.0, 0.5), (12.0, 1.0), (18.0, 0.5), (24.0, 0.15)];

/// Maximum horizontal shadow displacement, in cells.
const MAX_SHADOW_OFFSET: f64 = 10.0;

/// Lighting applied to one render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    /// 1.0 = full daylight; terrain is darkened by `1 - ambient_light`.
    pub ambient_light: f64,
    /// Horizontal displacement of the shaded terrain, in cells.
    pub shadow_offset_x: f64,
}

impl Lighting {
    pub fn noon() -> Self {
        Self {
            ambient_light: 1.0,
            shadow_offset_x: 0.0,
        }
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Self::noon()
    }
}

/// A 24-hour clock driven by ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DayClock {
    hour: f64,
    /// Multiplier on the per-tick advance; may be zero or negative.
    pub speed: f64,
}

impl Default for DayClock {
    fn default() -> Self {
        Self::new(12.0, 1.0)
    }
}

impl DayClock {
    pub fn new(hour: f64, speed: f64) -> Self {
        Self {
            hour: hour.rem_euclid(24.0),
            speed,
        }
    }

    pub fn hour(&self) -> f64 {
        self.hour
    }

    pub fn advance(&mut self) {
        self.hour = (self.hour + self.speed * HOURS_PER_TICK).rem_euclid(24.0);
    }

    pub fn ambient_light(&self) -> f64 {
        for pair in AMBIENT_CURVE.windows(2) {
            let (h0, l0) = pair[0];
            let (h1, l1) = pair[1];
            if self.hour <= h1 {
                let t = (self.hour - h0) / (h1 - h0);
                return l0 + (l1 - l0) * t;
            }
        }
        AMBIENT_CURVE[0].1
    }

    /// −10 at dawn, 0 at noon, +10 at dusk; held at the extremes overnight.
    pub fn shadow_offset_x(&self) -> f64 {
        ((self.hour - 12.0) / 6.0 * MAX_SHADOW_OFFSET).clamp(-MAX_SHADOW_OFFSET, MAX_SHADOW_OFFSET)
    }

    pub fn lighting(&self) -> Lighting {
        Lighting {
            ambient_light: self.ambient_light(),
            shadow_offset_x: self.shadow_offset_x(),
        }
    }

    /// "HH:MM".
    pub fn label(&self) -> String {
        let minutes = (self.hour * 60.0).round() as u32 % (24 * 60);
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: f64) -> DayClock {
        DayClock::new(hour, 1.0)
    }

    #[test]
    fn test_ambient_keyframes() {
        assert!((at(6.0).ambient_light() - 0.5).abs() < 1e-12);
        assert!((at(12.0).ambient_light() - 1.0).abs() < 1e-12);
        assert!((at(18.0).ambient_light() - 0.5).abs() < 1e-12);
        assert!((at(0.0).ambient_light() - 0.15).abs() < 1e-12);
        assert!((at(9.0).ambient_light() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_ambient_is_continuous_across_midnight() {
        let before = at(23.999).ambient_light();
        let after = at(0.001).ambient_light();
        assert!((before - after).abs() < 1e-3);
    }

    #[test]
    fn test_shadow_offset_swings_through_the_day() {
        assert_eq!(at(6.0).shadow_offset_x(), -10.0);
        assert_eq!(at(12.0).shadow_offset_x(), 0.0);
        assert_eq!(at(18.0).shadow_offset_x(), 10.0);
        assert_eq!(at(2.0).shadow_offset_x(), -10.0);
    }

    #[test]
    fn test_advance_wraps() {
        let mut clock = DayClock::new(23.95, 1.0);
        clock.advance();
        assert!((clock.hour() - 0.05).abs() < 1e-9);

        let mut backwards = DayClock::new(0.0, -2.0);
        backwards.advance();
        assert!((backwards.hour() - 23.8).abs() < 1e-9);
    }

    #[test]
    fn test_label() {
        assert_eq!(at(6.5).label(), "06:30");
        assert_eq!(DayClock::default().label(), "12:00");
    }
}
