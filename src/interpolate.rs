use crate::error::{ForecastError, Result};

/// Monotone piecewise cubic Hermite interpolant (Fritsch-Carlson slopes).
///
/// Between two knots the curve never leaves the range of their values, so
/// positive data stays positive. Outside the knot range the nearest knot
/// value is held.
#[derive(Debug, Clone)]
pub struct Pchip {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
}

impl Pchip {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self> {
        if xs.is_empty() || xs.len() != ys.len() {
            return Err(ForecastError::InsufficientData {
                stage: "interpolation",
                needed: 1,
                available: xs.len().min(ys.len()),
            });
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ForecastError::InvalidSeries(
                "interpolation knots must be strictly increasing".to_string(),
            ));
        }
        let slopes = pchip_slopes(&xs, &ys);
        Ok(Self { xs, ys, slopes })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 || x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        // First knot strictly greater than x, so xs[k] <= x < xs[k + 1].
        let k = self.xs.partition_point(|v| *v <= x) - 1;
        let h = self.xs[k + 1] - self.xs[k];
        let t = (x - self.xs[k]) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * self.ys[k]
            + h10 * h * self.slopes[k]
            + h01 * self.ys[k + 1]
            + h11 * h * self.slopes[k + 1]
    }
}

fn pchip_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    if n == 1 {
        return vec![0.0];
    }
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let delta: Vec<f64> = (0..n - 1).map(|k| (ys[k + 1] - ys[k]) / h[k]).collect();
    if n == 2 {
        return vec![delta[0], delta[0]];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        if delta[k - 1] * delta[k] <= 0.0 {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        d[k] = (w1 + w2) / (w1 / delta[k - 1] + w2 / delta[k]);
    }
    d[0] = edge_slope(h[0], h[1], delta[0], delta[1]);
    d[n - 1] = edge_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);
    d
}

/// One-sided three-point slope, clipped to preserve shape.
fn edge_slope(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if d.signum() != m0.signum() || m0 == 0.0 {
        0.0
    } else if m0.signum() != m1.signum() && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

/// Fills every `None` (or non-finite value) by PCHIP over the known points.
pub fn fill_missing(values: &[Option<f64>]) -> Result<Vec<f64>> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i as f64, x)))
        .unzip();
    let known = xs.len();
    if known == values.len() {
        return Ok(ys);
    }
    let interp = Pchip::new(xs, ys)?;
    tracing::debug!(missing = values.len() - known, "Interpolating missing points");
    Ok(values
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            Some(x) if x.is_finite() => *x,
            _ => interp.eval(i as f64),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reproduces_knots() {
        let p = Pchip::new(vec![0.0, 1.0, 3.0], vec![1.0, 2.0, 0.5]).unwrap();
        assert!((p.eval(0.0) - 1.0).abs() < 1e-12);
        assert!((p.eval(1.0) - 2.0).abs() < 1e-12);
        assert!((p.eval(3.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn linear_data_is_interpolated_exactly() {
        let p = Pchip::new(vec![0.0, 2.0, 4.0, 6.0], vec![0.0, 4.0, 8.0, 12.0]).unwrap();
        assert!((p.eval(1.0) - 2.0).abs() < 1e-12);
        assert!((p.eval(5.5) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn flat_neighbours_do_not_overshoot() {
        let p = Pchip::new(vec![0.0, 1.0, 2.0, 3.0], vec![1.0, 1.0, 5.0, 5.0]).unwrap();
        for i in 0..=30 {
            let v = p.eval(i as f64 / 10.0);
            assert!((1.0..=5.0).contains(&v), "overshoot at {}: {}", i, v);
        }
    }
}
