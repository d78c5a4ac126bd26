//! Volume control with logarithmic scaling
//!
//! The public level is a 0.0-1.0 slider position, mapped to -60 dB..0 dB
//! before it reaches the content source.

/// Volume controller with logarithmic scaling
///
/// 0.0 = silence, 1.0 = unity gain; everything in between follows a dB curve
/// so the slider feels linear.
#[derive(Debug, Clone)]
pub struct Volume {
    /// Slider level (0.0-1.0)
    level: f32,

    /// Mute state (preserves level)
    muted: bool,

    /// Cached linear gain multiplier
    linear_gain: f32,
}

impl Volume {
    /// Create a new volume controller, clamping `level` to 0.0-1.0
    pub fn new(level: f32) -> Self {
        let level = Self::clamp_level(level);

        Self {
            level,
            muted: false,
            linear_gain: Self::calculate_linear_gain(level),
        }
    }

    /// Set the slider level (clamped to 0.0-1.0, NaN treated as 0.0)
    pub fn set_level(&mut self, level: f32) {
        self.level = Self::clamp_level(level);
        self.linear_gain = Self::calculate_linear_gain(self.level);
    }

    /// Current slider level
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Toggle mute state, returning the new state
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.muted
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain to hand to the content source
    ///
    /// Returns 0.0 if muted, otherwise the logarithmic gain for the level
    pub fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.linear_gain
        }
    }

    fn clamp_level(level: f32) -> f32 {
        if level.is_nan() {
            0.0
        } else {
            level.clamp(0.0, 1.0)
        }
    }

    /// Convert slider level to linear gain
    ///
    /// Formula: gain = 10^((level - 1) * 60 / 20)
    /// - 0.0 → silence
    /// - 0.5 → -30 dB → 0.0316 gain
    /// - 1.0 →   0 dB → 1.0 gain
    fn calculate_linear_gain(level: f32) -> f32 {
        if level == 0.0 {
            return 0.0;
        }

        let db = (level - 1.0) * 60.0;
        10.0_f32.powf(db / 20.0)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}
