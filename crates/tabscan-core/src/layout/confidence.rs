//! Confidence tiers and their thresholds.

use serde::{Deserialize, Serialize};

use crate::error::TabscanError;

/// Default lower bound of the high tier.
pub const DEFAULT_GREEN_THRESHOLD: f32 = 0.97;

/// Default lower bound of the medium tier.
pub const DEFAULT_YELLOW_THRESHOLD: f32 = 0.92;

/// Confidence band of a cell. Ordered from least to most confident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    /// Cell fill as `0xRRGGBB`.
    pub fn fill_rgb(&self) -> u32 {
        match self {
            Tier::High => 0x00FF00,
            Tier::Medium => 0xFFFF00,
            Tier::Low => 0xFF0000,
        }
    }

    /// Cell fill as RGB bytes.
    pub fn fill_bytes(&self) -> [u8; 3] {
        let rgb = self.fill_rgb();
        [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8]
    }

    /// Color name used in legends.
    pub fn color_name(&self) -> &'static str {
        match self {
            Tier::High => "green",
            Tier::Medium => "yellow",
            Tier::Low => "red",
        }
    }
}

/// Validated pair of tier thresholds with `green >= yellow`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    green: f32,
    yellow: f32,
    clamped_from: Option<f32>,
}

impl ConfidenceThresholds {
    /// Create thresholds from fractions in [0, 1].
    ///
    /// An inverted pair (`green < yellow`) is accepted and green is clamped
    /// down to yellow, leaving an empty medium band. Values that are not
    /// finite or fall outside [0, 1] are rejected.
    pub fn new(green: f32, yellow: f32) -> Result<Self, TabscanError> {
        check_fraction("green_threshold", green)?;
        check_fraction("yellow_threshold", yellow)?;

        if green < yellow {
            Ok(Self {
                green: yellow,
                yellow,
                clamped_from: Some(green),
            })
        } else {
            Ok(Self {
                green,
                yellow,
                clamped_from: None,
            })
        }
    }

    /// Create thresholds from integer percentages (e.g. 97 and 92).
    pub fn from_percent(green: u8, yellow: u8) -> Result<Self, TabscanError> {
        Self::new(green as f32 / 100.0, yellow as f32 / 100.0)
    }

    pub fn green(&self) -> f32 {
        self.green
    }

    pub fn yellow(&self) -> f32 {
        self.yellow
    }

    /// The caller's green value if it had to be clamped.
    pub fn clamped_from(&self) -> Option<f32> {
        self.clamped_from
    }

    /// Map a confidence to its tier.
    pub fn classify(&self, confidence: f32) -> Tier {
        if confidence >= self.green {
            Tier::High
        } else if confidence >= self.yellow {
            Tier::Medium
        } else {
            Tier::Low
        }
    }
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            green: DEFAULT_GREEN_THRESHOLD,
            yellow: DEFAULT_YELLOW_THRESHOLD,
            clamped_from: None,
        }
    }
}

fn check_fraction(name: &str, value: f32) -> Result<(), TabscanError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(TabscanError::Config(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands() {
        let t = ConfidenceThresholds::default();
        assert_eq!(t.classify(0.99), Tier::High);
        assert_eq!(t.classify(0.97), Tier::High);
        assert_eq!(t.classify(0.95), Tier::Medium);
        assert_eq!(t.classify(0.92), Tier::Medium);
        assert_eq!(t.classify(0.90), Tier::Low);
        assert_eq!(t.classify(0.0), Tier::Low);
    }

    #[test]
    fn test_inverted_pair_clamps_green_down() {
        let t = ConfidenceThresholds::new(0.90, 0.95).unwrap();
        assert_eq!(t.green(), 0.95);
        assert_eq!(t.yellow(), 0.95);
        assert_eq!(t.clamped_from(), Some(0.90));

        // Nothing below the medium lower bound can be high.
        assert_eq!(t.classify(0.93), Tier::Low);
        assert_eq!(t.classify(0.949), Tier::Low);
        assert_eq!(t.classify(0.95), Tier::High);
        for i in 0..=100 {
            let c = i as f32 / 100.0;
            if c < t.yellow() {
                assert_eq!(t.classify(c), Tier::Low);
            }
        }
    }

    #[test]
    fn test_tier_monotonic() {
        let pairs = [(0.97, 0.92), (0.5, 0.5), (1.0, 0.0), (0.8, 0.9)];
        for (green, yellow) in pairs {
            let t = ConfidenceThresholds::new(green, yellow).unwrap();
            let mut previous = Tier::Low;
            for i in 0..=1000 {
                let tier = t.classify(i as f32 / 1000.0);
                assert!(tier >= previous);
                previous = tier;
            }
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(ConfidenceThresholds::new(97.0, 0.92).is_err());
        assert!(ConfidenceThresholds::new(0.97, -0.1).is_err());
        assert!(ConfidenceThresholds::new(f32::NAN, 0.5).is_err());
    }

    #[test]
    fn test_from_percent() {
        let t = ConfidenceThresholds::from_percent(97, 92).unwrap();
        assert!((t.green() - 0.97).abs() < 1e-6);
        assert!((t.yellow() - 0.92).abs() < 1e-6);
        assert!(ConfidenceThresholds::from_percent(101, 92).is_err());
    }

    #[test]
    fn test_fill_colors() {
        assert_eq!(Tier::High.fill_bytes(), [0x00, 0xFF, 0x00]);
        assert_eq!(Tier::Medium.fill_bytes(), [0xFF, 0xFF, 0x00]);
        assert_eq!(Tier::Low.fill_bytes(), [0xFF, 0x00, 0x00]);
    }
}
