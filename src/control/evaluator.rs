use log::trace;

use crate::control::cool_holder::LatchState;
use crate::control::curve::Curve;
use crate::models::curve::{DeadArea, DeadAreaVariant};
use crate::models::plug::{PlugConfig, PlugState};
use crate::models::{PortValue, PERCENT_MAX};

/// Result of one evaluation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub output: f32,
    pub latch: LatchState,
}

impl Evaluation {
    /// Output rounded to the integer percent the device accepts.
    pub fn port_value(&self) -> PortValue {
        self.output.round().clamp(0.0, PERCENT_MAX) as PortValue
    }
}

/// Maps `temperature`, read at `now` (ms), to the channel output.
///
/// The curve value is overridden by the first dead area containing the
/// temperature, then by the cool holder latch when one is configured.
/// `previous_output` is the output of the preceding evaluation, `None` on the
/// very first one.
pub fn evaluate(
    config: &PlugConfig,
    temperature: f32,
    now: u64,
    previous_output: Option<f32>,
    latch: LatchState,
) -> Evaluation {
    let curve = Curve::new(&config.curve);
    let shaped = apply_dead_areas(&curve, &config.dead_areas, temperature, previous_output);

    let Some(cool_holder) = &config.cool_holder else {
        return Evaluation {
            output: shaped,
            latch: LatchState::default(),
        };
    };

    let latch = latch.step(cool_holder, temperature, now);
    let output = if latch.is_engaged() {
        curve.min_value()
    } else {
        shaped
    };
    trace!(
        "evaluate: temp {} curve {} output {} latch {:?}",
        temperature,
        shaped,
        output,
        latch
    );
    Evaluation { output, latch }
}

fn apply_dead_areas(
    curve: &Curve,
    dead_areas: &[DeadArea],
    temperature: f32,
    previous_output: Option<f32>,
) -> f32 {
    let Some(area) = dead_areas.iter().find(|area| area.contains(temperature)) else {
        return curve.value_at(temperature);
    };

    match area.variant {
        DeadAreaVariant::Min => curve.value_at(area.min_value),
        DeadAreaVariant::Max => curve.value_at(area.max_value),
        DeadAreaVariant::Center => {
            previous_output.unwrap_or_else(|| curve.value_at(temperature))
        }
    }
}

/// Carries the previous output and latch state across evaluations of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PlugController {
    config: PlugConfig,
    previous_output: Option<f32>,
    latch: LatchState,
    last_temp: Option<f32>,
}

impl PlugController {
    pub fn new(config: PlugConfig) -> Self {
        Self {
            config,
            previous_output: None,
            latch: LatchState::default(),
            last_temp: None,
        }
    }

    pub fn config(&self) -> &PlugConfig {
        &self.config
    }

    /// Replaces the control contract; evaluation memory starts over.
    pub fn set_config(&mut self, config: PlugConfig) {
        *self = Self::new(config);
    }

    pub fn update(&mut self, temperature: f32, now: u64) -> f32 {
        let evaluation = evaluate(
            &self.config,
            temperature,
            now,
            self.previous_output,
            self.latch,
        );
        self.previous_output = Some(evaluation.output);
        self.latch = evaluation.latch;
        self.last_temp = Some(temperature);
        evaluation.output
    }

    pub fn latch(&self) -> LatchState {
        self.latch
    }

    /// Telemetry snapshot, `None` before the first evaluation.
    pub fn state(&self) -> Option<PlugState> {
        let last_temp = self.last_temp?;
        let output = self.previous_output?;
        Some(PlugState {
            last_temp,
            plug_value: Evaluation {
                output,
                latch: self.latch,
            }
            .port_value(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::curve::{CoolHolderConfig, CurvePoint};

    fn linear_config() -> PlugConfig {
        PlugConfig {
            curve: vec![
                CurvePoint { temp: 0.0, value: 0.0 },
                CurvePoint { temp: 100.0, value: 100.0 },
            ],
            ..PlugConfig::default()
        }
    }

    #[test]
    fn test_curve_only() {
        let mut config = linear_config();
        config.curve.insert(1, CurvePoint { temp: 50.0, value: 50.0 });

        let at = |t| evaluate(&config, t, 0, None, LatchState::default()).output;
        assert_eq!(at(-10.0), 0.0);
        assert_eq!(at(150.0), 100.0);
        assert_eq!(at(25.0), 25.0);
    }

    #[test]
    fn test_dead_area_center_holds_previous_output() {
        let mut config = linear_config();
        config.dead_areas.push(DeadArea {
            min_value: 40.0,
            max_value: 60.0,
            variant: DeadAreaVariant::Center,
        });

        let mut controller = PlugController::new(config);
        let outputs: Vec<f32> = [30.0, 45.0, 55.0, 70.0]
            .iter()
            .enumerate()
            .map(|(i, t)| controller.update(*t, i as u64 * 100))
            .collect();
        assert_eq!(outputs, vec![30.0, 30.0, 30.0, 70.0]);
    }

    #[test]
    fn test_dead_area_center_without_history() {
        let mut config = linear_config();
        config.dead_areas.push(DeadArea {
            min_value: 40.0,
            max_value: 60.0,
            variant: DeadAreaVariant::Center,
        });
        let evaluation = evaluate(&config, 45.0, 0, None, LatchState::default());
        assert_eq!(evaluation.output, 45.0);
    }

    #[test]
    fn test_dead_area_min_and_max() {
        let mut config = linear_config();
        config.dead_areas.push(DeadArea {
            min_value: 40.0,
            max_value: 60.0,
            variant: DeadAreaVariant::Min,
        });
        config.dead_areas.push(DeadArea {
            min_value: 70.0,
            max_value: 80.0,
            variant: DeadAreaVariant::Max,
        });

        let at = |t| evaluate(&config, t, 0, Some(12.0), LatchState::default()).output;
        assert_eq!(at(50.0), 40.0);
        assert_eq!(at(75.0), 80.0);
        assert_eq!(at(65.0), 65.0);
    }

    #[test]
    fn test_first_matching_dead_area_wins() {
        let mut config = linear_config();
        config.dead_areas.push(DeadArea {
            min_value: 40.0,
            max_value: 60.0,
            variant: DeadAreaVariant::Max,
        });
        config.dead_areas.push(DeadArea {
            min_value: 50.0,
            max_value: 70.0,
            variant: DeadAreaVariant::Min,
        });
        let evaluation = evaluate(&config, 55.0, 0, None, LatchState::default());
        assert_eq!(evaluation.output, 60.0);
    }

    #[test]
    fn test_cool_holder_forces_minimum() {
        let mut config = linear_config();
        config.curve[0] = CurvePoint { temp: 0.0, value: 20.0 };
        config.cool_holder = Some(CoolHolderConfig {
            holding_time: 1000,
            on_delta: 5.0,
            off_delta: 5.0,
        });

        let mut controller = PlugController::new(config);
        assert_eq!(controller.update(50.0, 0), 60.0);

        // 6 degrees below the peak
        assert_eq!(controller.update(44.0, 100), 20.0);
        assert!(controller.latch().is_engaged());

        // re-rise smaller than off_delta inside the holding window
        assert_eq!(controller.update(47.0, 500), 20.0);
        // re-rise large enough but still inside the holding window
        assert_eq!(controller.update(52.0, 900), 20.0);

        // holding time elapsed and risen 8 degrees above the trough
        let released = controller.update(52.0, 1100);
        assert!(!controller.latch().is_engaged());
        assert!((released - 61.6).abs() < 1e-4);
    }

    #[test]
    fn test_no_cool_holder_resets_latch() {
        let config = linear_config();
        let latch = LatchState {
            peak: Some(80.0),
            trough: Some(20.0),
            engaged_at: Some(0),
        };
        let evaluation = evaluate(&config, 30.0, 10, None, latch);
        assert_eq!(evaluation.output, 30.0);
        assert_eq!(evaluation.latch, LatchState::default());
    }

    #[test]
    fn test_controller_state() {
        let mut controller = PlugController::new(linear_config());
        assert_eq!(controller.state(), None);

        controller.update(42.4, 0);
        assert_eq!(
            controller.state(),
            Some(PlugState {
                last_temp: 42.4,
                plug_value: 42
            })
        );
    }
}
