//! Monthly rent prediction model
//!
//! A ridge-regularized least-squares regression trained once at startup
//! on synthetic data that follows NYC market patterns. The analyzer
//! treats this as a fixed oracle: features in, rent plus confidence
//! interval out.

use crate::error::AnalysisError;
use crate::pipeline::types::{
    ConfidenceLevel, LocationFeatures, PropertyRecord, PropertyType, RevenuePrediction,
};
use ndarray::{Array1, Array2};
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

/// Training targets and predictions are clamped to this realistic NYC
/// monthly-rent range.
pub const RENT_MIN: f64 = 1800.0;
pub const RENT_MAX: f64 = 25000.0;

/// Confidence-interval lower bound floor.
const CI_FLOOR: f64 = 1500.0;

/// Reference year for property-age computation.
const REFERENCE_YEAR: i32 = 2024;

const RIDGE_LAMBDA: f64 = 1.0;

/// Defaults substituted for optional location features.
const DEFAULT_CRIME: f64 = 75.0;
const DEFAULT_WALKABILITY: f64 = 75.0;
const DEFAULT_TRANSIT: f64 = 75.0;
const DEFAULT_AMENITY: f64 = 65.0;
const DEFAULT_SUBWAY_DISTANCE: f64 = 0.3;
const DEFAULT_MANHATTAN_DISTANCE: f64 = 5.0;

const NUM_FEATURES: usize = 18;

const NEIGHBORHOODS: &[&str] = &[
    "Upper West Side",
    "Upper East Side",
    "Midtown",
    "Chelsea",
    "SoHo",
    "East Village",
    "West Village",
    "Tribeca",
    "Financial District",
    "Williamsburg",
    "Park Slope",
    "Astoria",
    "Long Island City",
    "DUMBO",
    "Carroll Gardens",
    "Red Hook",
];

fn neighborhood_multiplier(neighborhood: &str) -> f64 {
    match neighborhood {
        "Tribeca" => 1.8,
        "SoHo" => 1.7,
        "West Village" => 1.6,
        "Chelsea" => 1.4,
        "Upper East Side" => 1.3,
        "Upper West Side" => 1.25,
        "Midtown" => 1.2,
        "East Village" => 1.1,
        "Financial District" => 1.05,
        "DUMBO" | "Williamsburg" => 1.0,
        "Park Slope" => 0.95,
        "Carroll Gardens" => 0.9,
        "Long Island City" => 0.85,
        "Astoria" => 0.8,
        "Red Hook" => 0.75,
        _ => 1.0,
    }
}

fn property_type_multiplier(property_type: PropertyType) -> f64 {
    match property_type {
        PropertyType::Condo => 1.1,
        PropertyType::CoOp => 0.95,
        PropertyType::Rental => 1.0,
    }
}

/// Input features for a single prediction. Required fields are plain
/// values; location signals are optional and fall back to documented
/// defaults.
#[derive(Debug, Clone)]
pub struct PropertyFeatures {
    pub bedrooms: u8,
    pub bathrooms: f64,
    pub sqft: u32,
    pub year_built: i32,
    pub last_sale_price: f64,
    pub property_type: PropertyType,
    pub neighborhood: String,
    pub crime_score: Option<f64>,
    pub walkability_score: Option<f64>,
    pub transit_score: Option<f64>,
    pub amenity_score: Option<f64>,
    pub distance_to_subway: Option<f64>,
    pub distance_to_manhattan: Option<f64>,
}

impl PropertyFeatures {
    /// Build the prediction input from resolved property and location
    /// data.
    pub fn from_analysis(property: &PropertyRecord, location: &LocationFeatures) -> Self {
        PropertyFeatures {
            bedrooms: property.bedrooms,
            bathrooms: property.bathrooms,
            sqft: property.sqft,
            year_built: property.year_built,
            last_sale_price: property.last_sale_price,
            property_type: property.property_type,
            neighborhood: location.neighborhood.clone(),
            crime_score: Some(location.crime_score),
            walkability_score: Some(location.walkability_score),
            transit_score: Some(location.transit_score),
            amenity_score: Some(location.amenity_score),
            distance_to_subway: Some(location.distance_to_subway),
            distance_to_manhattan: Some(location.distance_to_manhattan),
        }
    }
}

/// Reject features the model cannot meaningfully price. Required fields
/// must be present and positive; there is no fallback for these.
pub fn validate_features(features: &PropertyFeatures) -> Result<(), AnalysisError> {
    if features.bedrooms == 0 {
        return Err(AnalysisError::Prediction(
            "bedrooms must be at least 1".to_string(),
        ));
    }
    if features.sqft == 0 {
        return Err(AnalysisError::Prediction(
            "sqft must be positive".to_string(),
        ));
    }
    if features.last_sale_price <= 0.0 {
        return Err(AnalysisError::Prediction(
            "last_sale_price must be positive".to_string(),
        ));
    }
    if features.bathrooms < 1.0 {
        return Err(AnalysisError::Prediction(
            "bathrooms must be at least 1".to_string(),
        ));
    }

    if !(1800..=REFERENCE_YEAR).contains(&features.year_built) {
        warn!("Unusual year built: {}", features.year_built);
    }
    if features.sqft < 200 || features.sqft > 10_000 {
        warn!("Unusual square footage: {}", features.sqft);
    }

    Ok(())
}

fn feature_vector(features: &PropertyFeatures) -> [f64; NUM_FEATURES] {
    let crime = features.crime_score.unwrap_or(DEFAULT_CRIME);
    let walkability = features.walkability_score.unwrap_or(DEFAULT_WALKABILITY);
    let transit = features.transit_score.unwrap_or(DEFAULT_TRANSIT);
    let amenity = features.amenity_score.unwrap_or(DEFAULT_AMENITY);
    let subway = features
        .distance_to_subway
        .unwrap_or(DEFAULT_SUBWAY_DISTANCE);
    let manhattan = features
        .distance_to_manhattan
        .unwrap_or(DEFAULT_MANHATTAN_DISTANCE);

    let sqft = features.sqft as f64;
    let property_age = (REFERENCE_YEAR - features.year_built) as f64;
    let rooms_total = features.bedrooms as f64 + features.bathrooms;
    let location_score = (crime + walkability + transit + amenity) / 4.0;
    let transport_score =
        100.0 * (-subway / 0.5).exp() * 0.6 + 100.0 * (-manhattan / 10.0).exp() * 0.4;

    [
        features.bedrooms as f64,
        features.bathrooms,
        sqft,
        property_age,
        features.last_sale_price,
        features.last_sale_price / sqft,
        rooms_total,
        location_score,
        transport_score,
        sqft / rooms_total,
        crime,
        walkability,
        transit,
        amenity,
        subway,
        manhattan,
        property_type_multiplier(features.property_type),
        neighborhood_multiplier(&features.neighborhood),
    ]
}

/// Monthly rent implied by NYC market patterns for a synthetic sample.
fn market_rent(features: &PropertyFeatures, rng: &mut StdRng) -> f64 {
    let base = match features.bedrooms {
        1 => 3200.0,
        2 => 4500.0,
        3 => 6500.0,
        _ => 9000.0,
    };

    let mut rent = base;
    rent += (features.sqft as f64 - 900.0) * 2.5;

    let age = (REFERENCE_YEAR - features.year_built) as f64;
    rent *= 0.85 + 0.3 * (-age / 80.0).exp();

    rent *= property_type_multiplier(features.property_type);

    let location_score = (features.crime_score.unwrap_or(DEFAULT_CRIME)
        + features.walkability_score.unwrap_or(DEFAULT_WALKABILITY)
        + features.transit_score.unwrap_or(DEFAULT_TRANSIT)
        + features.amenity_score.unwrap_or(DEFAULT_AMENITY))
        / 400.0;
    rent *= 0.7 + 0.6 * location_score;

    let subway = features
        .distance_to_subway
        .unwrap_or(DEFAULT_SUBWAY_DISTANCE);
    let manhattan = features
        .distance_to_manhattan
        .unwrap_or(DEFAULT_MANHATTAN_DISTANCE);
    rent *= (-subway / 1.5).exp();
    rent *= (-manhattan / 15.0).exp();

    rent *= neighborhood_multiplier(&features.neighborhood);

    let price_factor = (features.last_sale_price / 1_000_000.0).ln().clamp(0.0, 2.0);
    rent *= 0.8 + 0.2 * price_factor;

    rent *= 1.0 + (features.bathrooms - features.bedrooms as f64) * 0.15;

    // Market noise
    rent *= sample_normal(rng, 1.0, 0.08);

    rent.round().clamp(RENT_MIN, RENT_MAX)
}

fn sample_normal(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen();
    mean + std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn sample_exponential(rng: &mut StdRng, mean: f64) -> f64 {
    let u: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    -mean * u.ln()
}

/// One synthetic training sample.
pub struct TrainingSample {
    pub features: PropertyFeatures,
    pub monthly_rent: f64,
}

/// Generate synthetic training data following NYC market distributions.
pub fn generate_training_data(n_samples: usize, rng: &mut StdRng) -> Vec<TrainingSample> {
    let bedroom_dist = WeightedIndex::new([0.3, 0.4, 0.2, 0.1]).expect("weights are positive");
    let bath_offset_dist = WeightedIndex::new([0.3, 0.4, 0.3]).expect("weights are positive");
    let type_dist = WeightedIndex::new([0.4, 0.3, 0.3]).expect("weights are positive");
    let types = [PropertyType::Condo, PropertyType::CoOp, PropertyType::Rental];
    let sqft_base = [650.0, 950.0, 1300.0, 1800.0];

    let mut samples = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let bedrooms = (bedroom_dist.sample(rng) + 1) as u8;
        let bathrooms = (bedrooms as f64 + [0.0, 0.5, 1.0][bath_offset_dist.sample(rng)])
            .clamp(1.0, 4.0);
        let sqft = (sqft_base[bedrooms as usize - 1] + sample_normal(rng, 0.0, 150.0))
            .clamp(400.0, 3000.0) as u32;
        let year_built = (sample_normal(rng, 1980.0, 20.0) as i32).clamp(1950, REFERENCE_YEAR);
        let last_sale_price =
            sample_normal(rng, 14.2, 0.5).exp().clamp(400_000.0, 8_000_000.0);

        let features = PropertyFeatures {
            bedrooms,
            bathrooms,
            sqft,
            year_built,
            last_sale_price,
            property_type: types[type_dist.sample(rng)],
            neighborhood: NEIGHBORHOODS
                .choose(rng)
                .expect("neighborhood list is non-empty")
                .to_string(),
            crime_score: Some(sample_normal(rng, 75.0, 15.0).clamp(30.0, 100.0)),
            walkability_score: Some(sample_normal(rng, 78.0, 18.0).clamp(40.0, 100.0)),
            transit_score: Some(sample_normal(rng, 80.0, 15.0).clamp(45.0, 100.0)),
            amenity_score: Some(sample_normal(rng, 65.0, 20.0).clamp(25.0, 100.0)),
            distance_to_subway: Some(sample_exponential(rng, 0.3).clamp(0.05, 2.0)),
            distance_to_manhattan: Some(sample_exponential(rng, 5.0).clamp(0.5, 25.0)),
        };
        let monthly_rent = market_rent(&features, rng);

        samples.push(TrainingSample {
            features,
            monthly_rent,
        });
    }

    info!("Generated {} synthetic property records", n_samples);
    samples
}

/// Held-out evaluation metrics of the trained model.
#[derive(Debug, Clone, Copy)]
pub struct ModelMetrics {
    pub r2: f64,
    pub rmse: f64,
    pub mae: f64,
}

/// Trained rent regression. Read-only after `train`; shared process-wide.
pub struct RevenuePredictor {
    weights: Array1<f64>,
    intercept: f64,
    feature_means: Array1<f64>,
    feature_stds: Array1<f64>,
    metrics: ModelMetrics,
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
fn solve_linear_system(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(col);
        if a[[pivot_row, col]].abs() < 1e-12 {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                let tmp = a[[col, k]];
                a[[col, k]] = a[[pivot_row, k]];
                a[[pivot_row, k]] = tmp;
            }
            b.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::zeros(n);
    for row in (0..n).rev() {
        let mut sum = b[row];
        for k in (row + 1)..n {
            sum -= a[[row, k]] * x[k];
        }
        x[row] = sum / a[[row, row]];
    }
    Some(x)
}

impl RevenuePredictor {
    /// Train once on synthetic data: standardize features, ridge-solve
    /// the normal equations, evaluate on a held-out 20% split.
    pub fn train(n_samples: usize, rng: &mut StdRng) -> Self {
        let samples = generate_training_data(n_samples, rng);

        let mut indices: Vec<usize> = (0..samples.len()).collect();
        indices.shuffle(rng);
        let test_size = samples.len() / 5;
        let (test_idx, train_idx) = indices.split_at(test_size);

        let matrix = |idx: &[usize]| -> (Array2<f64>, Array1<f64>) {
            let mut x = Array2::zeros((idx.len(), NUM_FEATURES));
            let mut y = Array1::zeros(idx.len());
            for (row, &i) in idx.iter().enumerate() {
                let v = feature_vector(&samples[i].features);
                for (col, value) in v.iter().enumerate() {
                    x[[row, col]] = *value;
                }
                y[row] = samples[i].monthly_rent;
            }
            (x, y)
        };

        let (x_train, y_train) = matrix(train_idx);
        let (x_test, y_test) = matrix(test_idx);

        let feature_means = x_train
            .mean_axis(ndarray::Axis(0))
            .expect("training set is non-empty");
        let feature_stds = x_train.std_axis(ndarray::Axis(0), 0.0).mapv(|s| s.max(1e-9));

        let standardize = |x: &Array2<f64>| {
            let mut z = x.clone();
            for mut row in z.rows_mut() {
                row -= &feature_means;
                row /= &feature_stds;
            }
            z
        };

        let z_train = standardize(&x_train);
        let y_mean = y_train.mean().unwrap_or(0.0);
        let y_centered = &y_train - y_mean;

        // Normal equations with ridge regularization
        let mut gram = z_train.t().dot(&z_train);
        for i in 0..NUM_FEATURES {
            gram[[i, i]] += RIDGE_LAMBDA;
        }
        let rhs = z_train.t().dot(&y_centered);
        let weights =
            solve_linear_system(gram, rhs).expect("ridge-regularized system is solvable");

        let predict_row = |z: &Array1<f64>| y_mean + z.dot(&weights);

        let z_test = standardize(&x_test);
        let predictions: Vec<f64> = z_test
            .rows()
            .into_iter()
            .map(|row| predict_row(&row.to_owned()))
            .collect();

        let n = y_test.len().max(1) as f64;
        let residual_ss: f64 = predictions
            .iter()
            .zip(y_test.iter())
            .map(|(p, y)| (p - y).powi(2))
            .sum();
        let test_mean = y_test.mean().unwrap_or(0.0);
        let total_ss: f64 = y_test.iter().map(|y| (y - test_mean).powi(2)).sum();
        let mae = predictions
            .iter()
            .zip(y_test.iter())
            .map(|(p, y)| (p - y).abs())
            .sum::<f64>()
            / n;

        let metrics = ModelMetrics {
            r2: if total_ss > 0.0 {
                1.0 - residual_ss / total_ss
            } else {
                0.0
            },
            rmse: (residual_ss / n).sqrt(),
            mae,
        };

        info!(
            "Rent model trained: R2 = {:.3}, RMSE = ${:.0}, MAE = ${:.0}",
            metrics.r2, metrics.rmse, metrics.mae
        );

        RevenuePredictor {
            weights,
            intercept: y_mean,
            feature_means,
            feature_stds,
            metrics,
        }
    }

    pub fn metrics(&self) -> ModelMetrics {
        self.metrics
    }

    /// Predict monthly rent for a property. Optional features fall back
    /// to documented defaults; invalid required features are a hard
    /// error.
    pub fn predict(&self, features: &PropertyFeatures) -> Result<RevenuePrediction, AnalysisError> {
        validate_features(features)?;

        if features.crime_score.is_none() || features.transit_score.is_none() {
            debug!("Optional location features missing; using defaults");
        }

        let raw = feature_vector(features);
        let mut z = Array1::from_iter(raw);
        z -= &self.feature_means;
        z /= &self.feature_stds;

        let prediction = (self.intercept + z.dot(&self.weights)).clamp(RENT_MIN, RENT_MAX);

        let rmse = self.metrics.rmse;
        let lower = (prediction - 1.96 * rmse).max(CI_FLOOR);
        let upper = prediction + 1.96 * rmse;

        let prediction_confidence = if rmse < prediction * 0.15 {
            ConfidenceLevel::High
        } else if rmse < prediction * 0.25 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };

        Ok(RevenuePrediction {
            predicted_monthly_rent: prediction.round(),
            confidence_interval: (lower.round(), upper.round()),
            annual_revenue: (prediction * 12.0).round(),
            annual_revenue_range: ((lower * 12.0).round(), (upper * 12.0).round()),
            model_r2: self.metrics.r2,
            model_rmse: self.metrics.rmse,
            prediction_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn mock_features() -> PropertyFeatures {
        PropertyFeatures {
            bedrooms: 2,
            bathrooms: 1.5,
            sqft: 1000,
            year_built: 1985,
            last_sale_price: 1_200_000.0,
            property_type: PropertyType::Condo,
            neighborhood: "Upper West Side".to_string(),
            crime_score: Some(82.0),
            walkability_score: Some(85.0),
            transit_score: Some(90.0),
            amenity_score: Some(70.0),
            distance_to_subway: Some(0.2),
            distance_to_manhattan: Some(2.5),
        }
    }

    #[test]
    fn test_training_data_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let samples = generate_training_data(300, &mut rng);
        assert_eq!(samples.len(), 300);
        for sample in &samples {
            assert!((RENT_MIN..=RENT_MAX).contains(&sample.monthly_rent));
            assert!(sample.features.bedrooms >= 1 && sample.features.bedrooms <= 4);
            assert!(sample.features.sqft >= 400 && sample.features.sqft <= 3000);
            assert!(sample.features.last_sale_price >= 400_000.0);
        }
    }

    #[test]
    fn test_train_and_predict() {
        let mut rng = StdRng::seed_from_u64(42);
        let model = RevenuePredictor::train(1000, &mut rng);

        let metrics = model.metrics();
        assert!(metrics.r2 > 0.3 && metrics.r2 <= 1.0, "r2 = {}", metrics.r2);
        assert!(metrics.rmse > 0.0);

        let prediction = model.predict(&mock_features()).unwrap();
        assert!((RENT_MIN..=RENT_MAX).contains(&prediction.predicted_monthly_rent));
        assert!(prediction.confidence_interval.0 <= prediction.predicted_monthly_rent);
        assert!(prediction.confidence_interval.1 >= prediction.predicted_monthly_rent);
        assert!(
            (prediction.annual_revenue - prediction.predicted_monthly_rent * 12.0).abs() < 1.0
        );
    }

    #[test]
    fn test_predict_with_missing_optional_features() {
        let mut rng = StdRng::seed_from_u64(42);
        let model = RevenuePredictor::train(500, &mut rng);

        let mut features = mock_features();
        features.crime_score = None;
        features.transit_score = None;
        features.distance_to_subway = None;

        let prediction = model.predict(&features).unwrap();
        assert!((RENT_MIN..=RENT_MAX).contains(&prediction.predicted_monthly_rent));
    }

    #[test]
    fn test_validate_features_rejects_invalid() {
        let mut features = mock_features();
        features.sqft = 0;
        assert!(validate_features(&features).is_err());

        let mut features = mock_features();
        features.bedrooms = 0;
        assert!(validate_features(&features).is_err());

        let mut features = mock_features();
        features.last_sale_price = 0.0;
        assert!(matches!(
            validate_features(&features),
            Err(AnalysisError::Prediction(_))
        ));
    }

    #[test]
    fn test_larger_units_rent_higher() {
        let mut rng = StdRng::seed_from_u64(42);
        let model = RevenuePredictor::train(1000, &mut rng);

        let small = mock_features();
        let mut large = mock_features();
        large.bedrooms = 4;
        large.bathrooms = 3.0;
        large.sqft = 2200;
        large.last_sale_price = 3_000_000.0;

        let small_rent = model.predict(&small).unwrap().predicted_monthly_rent;
        let large_rent = model.predict(&large).unwrap().predicted_monthly_rent;
        assert!(large_rent > small_rent);
    }

    #[test]
    fn test_solve_linear_system() {
        let a = Array2::from_shape_vec((2, 2), vec![2.0, 1.0, 1.0, 3.0]).unwrap();
        let b = Array1::from_vec(vec![5.0, 10.0]);
        let x = solve_linear_system(a, b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_solve_singular_system() {
        let a = Array2::from_shape_vec((2, 2), vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        let b = Array1::from_vec(vec![2.0, 2.0]);
        assert!(solve_linear_system(a, b).is_none());
    }

    #[test]
    fn test_sample_normal_moments() {
        let mut rng = StdRng::seed_from_u64(13);
        let samples: Vec<f64> = (0..5000).map(|_| sample_normal(&mut rng, 10.0, 2.0)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean - 10.0).abs() < 0.2, "mean = {mean}");
    }
}
