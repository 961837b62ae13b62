// src/ai/forecasting/seasonal.rs
//
// Additive model: y(t) = trend(t) + weekly(t) + yearly(t) + noise.
// The trend is piecewise linear with changepoints spread over the first 80%
// of history; seasonalities are Fourier series on the calendar day. All
// coefficients come from one ridge-regularised least-squares solve, where the
// changepoint penalty is set by `changepoint_prior_scale`.

use std::f64::consts::PI;

use chrono::{Datelike, Days, NaiveDate};
use thiserror::Error;

use super::{DailySeries, ForecastSettings, round2};
use crate::models::forecast::ForecastPoint;

const WEEKLY_PERIOD: f64 = 7.0;
const WEEKLY_ORDER: usize = 3;
const YEARLY_PERIOD: f64 = 365.25;
const YEARLY_ORDER: usize = 10;

// Seasonal terms are only fitted once history covers enough cycles to pin them down.
const MIN_DAYS_FOR_WEEKLY: usize = 14;
const MIN_DAYS_FOR_YEARLY: usize = 365;

const MAX_CHANGEPOINTS: usize = 25;
const CHANGEPOINT_RANGE: f64 = 0.8;
const SEASONALITY_PRIOR_SCALE: f64 = 10.0;
const BASE_PENALTY: f64 = 1e-6;

// Two-sided 80% normal interval
const Z_80: f64 = 1.281_551_565_544_600_4;

#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("cannot fit an empty series")]
    EmptySeries,
    #[error("normal equations are not positive definite")]
    Singular,
}

#[derive(Debug, Clone)]
pub struct SeasonalModel {
    start_ce_day: i64,
    last_date: NaiveDate,
    n: usize,
    time_span: f64,
    scale: f64,
    changepoints: Vec<f64>,
    weekly: bool,
    yearly: bool,
    coefficients: Vec<f64>,
    /// Residual standard deviation, in scaled units
    sigma: f64,
}

impl SeasonalModel {
    pub fn fit(series: &DailySeries, settings: &ForecastSettings) -> Result<Self, FitError> {
        if series.is_empty() {
            return Err(FitError::EmptySeries);
        }

        let n = series.len();
        let scale = series
            .values
            .iter()
            .fold(0.0_f64, |m, v| m.max(v.abs()));
        let scale = if scale > 0.0 { scale } else { 1.0 };

        let num_changepoints = MAX_CHANGEPOINTS.min(((n as f64 - 1.0) * CHANGEPOINT_RANGE).floor() as usize);
        let changepoints = (1..=num_changepoints)
            .map(|j| CHANGEPOINT_RANGE * j as f64 / num_changepoints as f64)
            .collect();

        let mut model = Self {
            start_ce_day: i64::from(series.start.num_days_from_ce()),
            last_date: series.last_date(),
            n,
            time_span: (n.saturating_sub(1)).max(1) as f64,
            scale,
            changepoints,
            weekly: settings.weekly_seasonality && n >= MIN_DAYS_FOR_WEEKLY,
            yearly: settings.yearly_seasonality && n >= MIN_DAYS_FOR_YEARLY,
            coefficients: Vec::new(),
            sigma: 0.0,
        };

        let penalties = model.penalties(settings.changepoint_prior_scale);
        let p = penalties.len();

        // Accumulate the normal equations (X'X + diag(penalties)) b = X'y
        let mut xtx = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];
        for (i, y) in series.values.iter().enumerate() {
            let x = model.features(i as i64);
            let y = y / scale;
            for r in 0..p {
                xty[r] += x[r] * y;
                for c in 0..=r {
                    xtx[r][c] += x[r] * x[c];
                }
            }
        }
        for r in 0..p {
            for c in 0..r {
                xtx[c][r] = xtx[r][c];
            }
            xtx[r][r] += penalties[r];
        }

        model.coefficients = solve_spd(xtx, xty)?;

        let ssr: f64 = series
            .values
            .iter()
            .enumerate()
            .map(|(i, y)| (y / scale - model.evaluate(i as i64)).powi(2))
            .sum();
        model.sigma = (ssr / n as f64).sqrt();

        Ok(model)
    }

    /// Daily points for the `horizon` days after the last observation, clamped at zero.
    pub fn predict(&self, horizon: u32) -> Vec<ForecastPoint> {
        (1..=u64::from(horizon))
            .map(|h| {
                let index = (self.n - 1) as i64 + h as i64;
                let yhat = self.evaluate(index) * self.scale;
                let half_width =
                    Z_80 * self.sigma * self.scale * (1.0 + h as f64 / self.n as f64).sqrt();

                ForecastPoint {
                    date: self.last_date + Days::new(h),
                    predicted_demand: round2(yhat.max(0.0)),
                    lower_bound: round2((yhat - half_width).max(0.0)),
                    upper_bound: round2((yhat + half_width).max(0.0)),
                }
            })
            .collect()
    }

    fn evaluate(&self, index: i64) -> f64 {
        self.features(index)
            .iter()
            .zip(&self.coefficients)
            .map(|(x, b)| x * b)
            .sum()
    }

    // Column order: intercept, slope, changepoints, weekly, yearly
    fn features(&self, index: i64) -> Vec<f64> {
        let t = index as f64 / self.time_span;
        let mut x = Vec::with_capacity(2 + self.changepoints.len() + 2 * (WEEKLY_ORDER + YEARLY_ORDER));
        x.push(1.0);
        x.push(t);
        x.extend(self.changepoints.iter().map(|&s| (t - s).max(0.0)));

        let ce_day = (self.start_ce_day + index) as f64;
        if self.weekly {
            push_fourier(&mut x, ce_day, WEEKLY_PERIOD, WEEKLY_ORDER);
        }
        if self.yearly {
            push_fourier(&mut x, ce_day, YEARLY_PERIOD, YEARLY_ORDER);
        }
        x
    }

    fn penalties(&self, changepoint_prior_scale: f64) -> Vec<f64> {
        let mut penalties = vec![BASE_PENALTY, BASE_PENALTY];
        penalties.extend(std::iter::repeat_n(
            1.0 / changepoint_prior_scale.max(f64::EPSILON),
            self.changepoints.len(),
        ));
        let seasonal_terms = 2 * (usize::from(self.weekly) * WEEKLY_ORDER + usize::from(self.yearly) * YEARLY_ORDER);
        penalties.extend(std::iter::repeat_n(1.0 / SEASONALITY_PRIOR_SCALE, seasonal_terms));
        penalties
    }
}

fn push_fourier(x: &mut Vec<f64>, day: f64, period: f64, order: usize) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * day / period;
        x.push(angle.sin());
        x.push(angle.cos());
    }
}

/// Solves `a x = b` for symmetric positive-definite `a` by Cholesky decomposition.
fn solve_spd(mut a: Vec<Vec<f64>>, b: Vec<f64>) -> Result<Vec<f64>, FitError> {
    let p = b.len();

    for j in 0..p {
        let mut diag = a[j][j];
        for k in 0..j {
            diag -= a[j][k] * a[j][k];
        }
        if !(diag > 0.0 && diag.is_finite()) {
            return Err(FitError::Singular);
        }
        let diag = diag.sqrt();
        a[j][j] = diag;
        for i in (j + 1)..p {
            let mut s = a[i][j];
            for k in 0..j {
                s -= a[i][k] * a[j][k];
            }
            a[i][j] = s / diag;
        }
    }

    // L z = b
    let mut z = vec![0.0; p];
    for i in 0..p {
        let mut s = b[i];
        for k in 0..i {
            s -= a[i][k] * z[k];
        }
        z[i] = s / a[i][i];
    }

    // L' x = z
    let mut x = vec![0.0; p];
    for i in (0..p).rev() {
        let mut s = z[i];
        for k in (i + 1)..p {
            s -= a[k][i] * x[k];
        }
        x[i] = s / a[i][i];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn series(values: Vec<f64>) -> DailySeries {
        DailySeries { start: monday(), values }
    }

    #[test]
    fn solves_small_spd_system() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let x = solve_spd(a, vec![2.0, 5.0]).unwrap();
        assert!((x[0] + 0.5).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_indefinite_system() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert_eq!(solve_spd(a, vec![1.0, 1.0]), Err(FitError::Singular));
    }

    #[test]
    fn empty_series_cannot_be_fitted() {
        let err = SeasonalModel::fit(&series(vec![]), &ForecastSettings::default()).unwrap_err();
        assert_eq!(err, FitError::EmptySeries);
    }

    #[test]
    fn constant_demand_is_projected_flat() {
        let model = SeasonalModel::fit(&series(vec![5.0; 42]), &ForecastSettings::default()).unwrap();
        let points = model.predict(7);
        assert_eq!(points.len(), 7);
        assert_eq!(points[0].date, monday() + Days::new(42));
        for p in points {
            assert!((p.predicted_demand - 5.0).abs() < 0.1, "got {}", p.predicted_demand);
            assert!(p.lower_bound <= p.predicted_demand && p.predicted_demand <= p.upper_bound);
        }
    }

    #[test]
    fn linear_growth_is_extrapolated() {
        let values: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let model = SeasonalModel::fit(&series(values), &ForecastSettings::default()).unwrap();
        let points = model.predict(3);
        for (h, p) in points.iter().enumerate() {
            let expected = 10.0 + (60 + h) as f64;
            assert!((p.predicted_demand - expected).abs() < 1.0, "day {h}: {} vs {expected}", p.predicted_demand);
        }
    }

    #[test]
    fn weekly_pattern_is_recovered() {
        // eight weeks of a Monday rush
        let values: Vec<f64> = (0..56).map(|i| if i % 7 == 0 { 10.0 } else { 2.0 }).collect();
        let model = SeasonalModel::fit(&series(values), &ForecastSettings::default()).unwrap();
        let points = model.predict(7);

        for p in &points {
            if p.date.weekday() == Weekday::Mon {
                assert!(p.predicted_demand > 7.0, "monday {}", p.predicted_demand);
            } else {
                assert!(p.predicted_demand < 4.0, "{} {}", p.date, p.predicted_demand);
            }
        }
    }

    #[test]
    fn weekly_terms_can_be_disabled() {
        let values: Vec<f64> = (0..56).map(|i| if i % 7 == 0 { 10.0 } else { 2.0 }).collect();
        let settings = ForecastSettings { weekly_seasonality: false, ..ForecastSettings::default() };
        let model = SeasonalModel::fit(&series(values), &settings).unwrap();
        let points = model.predict(7);
        let spread = points.iter().map(|p| p.predicted_demand).fold(f64::MIN, f64::max)
            - points.iter().map(|p| p.predicted_demand).fold(f64::MAX, f64::min);
        assert!(spread < 1.0, "spread {spread}");
    }

    #[test]
    fn declining_demand_is_clamped_at_zero() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 - 5.0 * i as f64).collect();
        let model = SeasonalModel::fit(&series(values), &ForecastSettings::default()).unwrap();
        for p in model.predict(30) {
            assert!(p.predicted_demand >= 0.0);
            assert!(p.lower_bound >= 0.0);
            assert!(p.upper_bound >= 0.0);
        }
        assert_eq!(model.predict(30).last().unwrap().predicted_demand, 0.0);
    }

    #[test]
    fn all_zero_history_forecasts_zero() {
        let model = SeasonalModel::fit(&series(vec![0.0; 30]), &ForecastSettings::default()).unwrap();
        assert!(model.predict(5).iter().all(|p| p.predicted_demand == 0.0 && p.upper_bound == 0.0));
    }

    #[test]
    fn interval_widens_with_distance() {
        // alternating days cannot be explained by trend or weekly terms
        let values: Vec<f64> = (0..60).map(|i| if i % 2 == 0 { 3.0 } else { 7.0 }).collect();
        let model = SeasonalModel::fit(&series(values), &ForecastSettings::default()).unwrap();
        let points = model.predict(30);
        let first = points[0].upper_bound - points[0].lower_bound;
        let last = points[29].upper_bound - points[29].lower_bound;
        assert!(last > first);
    }

    #[test]
    fn single_observation_fits() {
        let model = SeasonalModel::fit(&series(vec![4.0]), &ForecastSettings::default()).unwrap();
        let points = model.predict(2);
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.predicted_demand.is_finite()));
    }
}
