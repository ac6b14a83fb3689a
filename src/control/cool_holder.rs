use crate::models::curve::CoolHolderConfig;

/// Memory of the cool holder latch between two evaluations.
///
/// While released the latch follows the highest temperature seen since the
/// last release. Once engaged it follows the lowest temperature seen since
/// engaging.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatchState {
    pub peak: Option<f32>,
    pub trough: Option<f32>,
    /// Timestamp (ms) at which the latch engaged, `None` while released.
    pub engaged_at: Option<u64>,
}

impl LatchState {
    pub fn is_engaged(&self) -> bool {
        self.engaged_at.is_some()
    }

    /// Advances the latch with a new reading taken at `now` (ms).
    pub fn step(self, config: &CoolHolderConfig, temperature: f32, now: u64) -> LatchState {
        match self.engaged_at {
            Some(since) => {
                let trough = self.trough.map_or(temperature, |t| t.min(temperature));
                let held_long_enough = now.saturating_sub(since) >= config.holding_time;
                if held_long_enough && temperature - trough >= config.off_delta {
                    LatchState {
                        peak: Some(temperature),
                        trough: None,
                        engaged_at: None,
                    }
                } else {
                    LatchState {
                        trough: Some(trough),
                        ..self
                    }
                }
            }
            None => {
                let peak = self.peak.map_or(temperature, |p| p.max(temperature));
                // a steady temperature never engages, even with a zero on_delta
                let fall = peak - temperature;
                if fall > 0.0 && fall >= config.on_delta {
                    LatchState {
                        peak: Some(peak),
                        trough: Some(temperature),
                        engaged_at: Some(now),
                    }
                } else {
                    LatchState {
                        peak: Some(peak),
                        trough: None,
                        engaged_at: None,
                    }
                }
            }
        }
    }
}
