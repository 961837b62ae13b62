// src/ai/forecasting.rs
//
// Demand forecasting: history bucketing, the two estimators and the
// rule-based recommendations. Nothing here touches the database.

pub mod seasonal;

use chrono::{Days, NaiveDate};
use rand::Rng;

use crate::models::forecast::{
    DemandObservation, ForecastPoint, ModelType, Priority, Recommendation, RecommendationKind,
};
use seasonal::SeasonalModel;

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSettings {
    /// Below this many order lines the simple estimator is used
    pub min_history: usize,
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    /// Trend flexibility; smaller values mean a stiffer trend
    pub changepoint_prior_scale: f64,
    /// Adds Gaussian noise to the simple estimator's point estimates
    pub jitter: bool,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            min_history: 10,
            yearly_seasonality: true,
            weekly_seasonality: true,
            changepoint_prior_scale: 0.05,
            jitter: true,
        }
    }
}

/// Longest window, in days, the statistical model is fitted on.
pub const MAX_FIT_DAYS: u64 = 3 * 365;

/// Dense daily demand up to the last observed date, gaps filled with zero.
/// Observations older than [`MAX_FIT_DAYS`] before the last date are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    pub start: NaiveDate,
    pub values: Vec<f64>,
}

impl DailySeries {
    pub fn from_observations(observations: &[DemandObservation]) -> Option<Self> {
        let end = observations.iter().map(|o| o.date).max()?;
        let earliest = observations.iter().map(|o| o.date).min()?;
        let window_start = end.checked_sub_days(Days::new(MAX_FIT_DAYS - 1)).unwrap_or(earliest);
        let start = earliest.max(window_start);
        let len = (end - start).num_days() as usize + 1;

        let mut values = vec![0.0; len];
        for obs in observations.iter().filter(|o| o.date >= start) {
            let idx = (obs.date - start).num_days() as usize;
            values[idx] += obs.quantity as f64;
        }
        Some(Self { start, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_date(&self) -> NaiveDate {
        self.start + Days::new(self.values.len().saturating_sub(1) as u64)
    }
}

pub trait Jitter {
    fn sample(&mut self, std_dev: f64) -> f64;
}

/// Deterministic estimator output.
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&mut self, _std_dev: f64) -> f64 {
        0.0
    }
}

/// Zero-mean normal noise (Box-Muller).
pub struct GaussianJitter<R> {
    rng: R,
}

impl<R: Rng> GaussianJitter<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Jitter for GaussianJitter<R> {
    fn sample(&mut self, std_dev: f64) -> f64 {
        // u1 in (0, 1] keeps ln() finite
        let u1: f64 = 1.0 - self.rng.gen_range(0.0..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z * std_dev
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn select_model(history_records: usize, settings: &ForecastSettings) -> ModelType {
    if history_records < settings.min_history {
        ModelType::SimpleAverage
    } else {
        ModelType::SeasonalDecomposition
    }
}

/// Moving-average placeholder: mean = max(1, stock / 30), bounds fixed at ±20% of the mean.
///
/// The bounds ignore the jitter, so a jittered point can land outside them.
pub fn simple_forecast(
    current_quantity: i32,
    horizon: u32,
    today: NaiveDate,
    jitter: &mut impl Jitter,
) -> Vec<ForecastPoint> {
    let mean = (f64::from(current_quantity) / 30.0).max(1.0);

    (1..=u64::from(horizon))
        .map(|offset| ForecastPoint {
            date: today + Days::new(offset),
            predicted_demand: round2((mean + jitter.sample(mean * 0.1)).max(0.0)),
            lower_bound: round2(mean * 0.8),
            upper_bound: round2(mean * 1.2),
        })
        .collect()
}

/// Picks the estimator for the given history and produces `horizon` daily points.
///
/// A statistical fit that fails numerically degrades to the simple estimator.
pub fn run_forecast(
    history: &[DemandObservation],
    current_quantity: i32,
    horizon: u32,
    today: NaiveDate,
    settings: &ForecastSettings,
    jitter: &mut impl Jitter,
) -> (ModelType, Vec<ForecastPoint>) {
    if select_model(history.len(), settings) == ModelType::SeasonalDecomposition {
        if let Some(series) = DailySeries::from_observations(history) {
            match SeasonalModel::fit(&series, settings) {
                Ok(model) => return (ModelType::SeasonalDecomposition, model.predict(horizon)),
                Err(e) => tracing::warn!("Seasonal fit failed, using simple average: {}", e),
            }
        }
    }

    (
        ModelType::SimpleAverage,
        simple_forecast(current_quantity, horizon, today, jitter),
    )
}

pub fn recommendations(current_stock: i32, forecast: &[ForecastPoint]) -> Vec<Recommendation> {
    let stock = f64::from(current_stock);
    // Points carry two decimals; rounding the sum drops float noise so equality is exact.
    let total_demand = round2(forecast.iter().map(|p| p.predicted_demand).sum());

    let mut recs = Vec::new();

    if stock < total_demand {
        let shortage = total_demand - stock;
        recs.push(Recommendation {
            kind: RecommendationKind::Restock,
            priority: Priority::High,
            message: format!("Restock needed: {shortage:.0} units to meet forecasted demand"),
        });
    }

    if stock > total_demand * 2.0 {
        recs.push(Recommendation {
            kind: RecommendationKind::Overstock,
            priority: Priority::Medium,
            message: "Consider reducing inventory levels to optimize costs".to_string(),
        });
    }

    let peak = forecast
        .iter()
        .map(|p| p.predicted_demand)
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |m| m.max(d))));
    if let Some(peak) = peak {
        if peak > stock * 0.5 {
            recs.push(Recommendation {
                kind: RecommendationKind::DemandSpike,
                priority: Priority::High,
                message: format!("High demand spike expected: {peak:.0} units"),
            });
        }
    }

    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn flat(demand: f64, days: usize) -> Vec<ForecastPoint> {
        (0..days)
            .map(|i| ForecastPoint {
                date: day(2025, 3, 1) + Days::new(i as u64),
                predicted_demand: demand,
                lower_bound: demand * 0.8,
                upper_bound: demand * 1.2,
            })
            .collect()
    }

    fn kinds(recs: &[Recommendation]) -> Vec<RecommendationKind> {
        recs.iter().map(|r| r.kind).collect()
    }

    #[test]
    fn series_fills_gaps_and_sums_same_day() {
        let obs = [
            DemandObservation { date: day(2025, 1, 1), quantity: 4 },
            DemandObservation { date: day(2025, 1, 4), quantity: 2 },
            DemandObservation { date: day(2025, 1, 1), quantity: 3 },
        ];
        let series = DailySeries::from_observations(&obs).unwrap();
        assert_eq!(series.start, day(2025, 1, 1));
        assert_eq!(series.values, vec![7.0, 0.0, 0.0, 2.0]);
        assert_eq!(series.last_date(), day(2025, 1, 4));
        assert!(DailySeries::from_observations(&[]).is_none());
    }

    #[test]
    fn series_keeps_only_the_recent_window() {
        let mut obs: Vec<_> = (0..9)
            .map(|i| DemandObservation { date: day(2025, 1, 1) + Days::new(i), quantity: 5 })
            .collect();
        obs.push(DemandObservation { date: day(1, 1, 1), quantity: 100 });

        let series = DailySeries::from_observations(&obs).unwrap();
        assert_eq!(series.len(), MAX_FIT_DAYS as usize);
        assert_eq!(series.last_date(), day(2025, 1, 9));
        assert_eq!(series.values.iter().sum::<f64>(), 45.0);
    }

    #[test]
    fn model_choice_follows_history_size() {
        let settings = ForecastSettings::default();
        assert_eq!(select_model(0, &settings), ModelType::SimpleAverage);
        assert_eq!(select_model(9, &settings), ModelType::SimpleAverage);
        assert_eq!(select_model(10, &settings), ModelType::SeasonalDecomposition);
    }

    #[test]
    fn short_history_uses_simple_average() {
        let history: Vec<_> = (0..9)
            .map(|i| DemandObservation { date: day(2025, 1, 1) + Days::new(i), quantity: 5 })
            .collect();
        let (model, points) =
            run_forecast(&history, 60, 7, day(2025, 2, 1), &ForecastSettings::default(), &mut NoJitter);
        assert_eq!(model, ModelType::SimpleAverage);
        assert_eq!(points.len(), 7);
    }

    #[test]
    fn enough_history_uses_seasonal_model() {
        let history: Vec<_> = (0..30)
            .map(|i| DemandObservation { date: day(2025, 1, 1) + Days::new(i), quantity: 5 })
            .collect();
        let (model, points) =
            run_forecast(&history, 60, 5, day(2025, 2, 1), &ForecastSettings::default(), &mut NoJitter);
        assert_eq!(model, ModelType::SeasonalDecomposition);
        assert_eq!(points.len(), 5);
        // projected past the last observation, not from today
        assert_eq!(points[0].date, day(2025, 1, 31));
    }

    #[test]
    fn simple_forecast_mean_and_bounds() {
        let points = simple_forecast(90, 3, day(2025, 5, 10), &mut NoJitter);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, day(2025, 5, 11));
        assert_eq!(points[2].date, day(2025, 5, 13));
        for p in &points {
            assert_eq!(p.predicted_demand, 3.0);
            assert_eq!(p.lower_bound, 2.4);
            assert_eq!(p.upper_bound, 3.6);
        }
    }

    #[test]
    fn simple_forecast_floors_mean_at_one() {
        let points = simple_forecast(0, 2, day(2025, 5, 10), &mut NoJitter);
        assert!(points.iter().all(|p| p.predicted_demand == 1.0));
        assert!(points.iter().all(|p| p.lower_bound == 0.8 && p.upper_bound == 1.2));
    }

    #[test]
    fn jittered_simple_forecast_is_never_negative() {
        let mut jitter = GaussianJitter::new(StdRng::seed_from_u64(7));
        for quantity in [0, 1, 29, 300, 10_000] {
            for p in simple_forecast(quantity, 30, day(2025, 1, 1), &mut jitter) {
                assert!(p.predicted_demand >= 0.0);
                assert!(p.lower_bound >= 0.0);
                assert!(p.upper_bound >= 0.0);
            }
        }
    }

    #[test]
    fn gaussian_jitter_is_centred() {
        let mut jitter = GaussianJitter::new(StdRng::seed_from_u64(42));
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| jitter.sample(1.0)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean was {mean}");
        assert!((var - 1.0).abs() < 0.1, "variance was {var}");
    }

    #[test]
    fn restock_fires_below_total_demand() {
        // 7 days x 2 units = 14
        let recs = recommendations(3, &flat(2.0, 7));
        assert!(kinds(&recs).contains(&RecommendationKind::Restock));
        let restock = recs.iter().find(|r| r.kind == RecommendationKind::Restock).unwrap();
        assert_eq!(restock.priority, Priority::High);
        assert!(restock.message.starts_with("Restock needed: 11 units"));
    }

    #[test]
    fn restock_does_not_fire_at_equality() {
        let recs = recommendations(14, &flat(2.0, 7));
        assert!(!kinds(&recs).contains(&RecommendationKind::Restock));
    }

    #[test]
    fn restock_equality_survives_float_noise() {
        // 0.1 summed ten times is not exactly 1.0 in binary floating point
        let recs = recommendations(1, &flat(0.1, 10));
        assert!(!kinds(&recs).contains(&RecommendationKind::Restock));
    }

    #[test]
    fn overstock_fires_only_above_twice_demand() {
        assert!(!kinds(&recommendations(28, &flat(2.0, 7))).contains(&RecommendationKind::Overstock));
        let recs = recommendations(29, &flat(2.0, 7));
        assert_eq!(kinds(&recs), vec![RecommendationKind::Overstock]);
        assert_eq!(recs[0].priority, Priority::Medium);
    }

    #[test]
    fn demand_spike_compares_peak_day_with_half_stock() {
        let mut forecast = flat(1.0, 7);
        forecast[3].predicted_demand = 6.0;
        let recs = recommendations(11, &forecast);
        let spike = recs.iter().find(|r| r.kind == RecommendationKind::DemandSpike).unwrap();
        assert_eq!(spike.message, "High demand spike expected: 6 units");

        assert!(!kinds(&recommendations(12, &forecast)).contains(&RecommendationKind::DemandSpike));
    }

    #[test]
    fn several_recommendations_can_fire_together() {
        let recs = recommendations(3, &flat(2.0, 7));
        assert_eq!(
            kinds(&recs),
            vec![RecommendationKind::Restock, RecommendationKind::DemandSpike]
        );
    }

    #[test]
    fn empty_forecast_only_checks_overstock() {
        assert_eq!(kinds(&recommendations(5, &[])), vec![RecommendationKind::Overstock]);
        assert!(recommendations(0, &[]).is_empty());
    }
}
