use crate::models::curve::CurvePoint;

/// Curve points sorted by temperature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    pub fn new(points: &[CurvePoint]) -> Self {
        let mut points = points.to_vec();
        points.sort_by(|a, b| a.temp.total_cmp(&b.temp));
        Self { points }
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Linear interpolation between the bracketing points, clamped to the
    /// first and last point outside the curve. An empty curve yields 0.
    pub fn value_at(&self, temp: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };

        if temp <= first.temp {
            return first.value;
        }
        if temp >= last.temp {
            return last.value;
        }

        for window in self.points.windows(2) {
            let (a, b) = (window[0], window[1]);
            if temp >= a.temp && temp <= b.temp {
                let span = b.temp - a.temp;
                if span <= f32::EPSILON {
                    return b.value;
                }
                let offset = f64::from(temp - a.temp) * f64::from(b.value - a.value);
                return (f64::from(a.value) + offset / f64::from(span)) as f32;
            }
        }

        last.value
    }

    /// Lowest output defined by any point, 0 for an empty curve.
    pub fn min_value(&self) -> f32 {
        self.points
            .iter()
            .map(|p| p.value)
            .reduce(f32::min)
            .unwrap_or(0.0)
    }
}
