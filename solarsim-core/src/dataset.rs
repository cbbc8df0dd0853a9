//! Module containing the labeled-dataset generation loop.
//!
//! Each sample draws an environment and vehicle state from seeded
//! distributions, finds the optimal cruising speed for those conditions, and
//! records the outcome next to a randomly chosen "actual" speed so a model
//! can learn how much charge suboptimal driving costs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::environment::Environment;
use crate::imports::*;
use crate::optimize::{optimize, OptimizeParams, SpeedBounds};
use crate::params::*;
use crate::simulate::{simulate, TripSpec};
use crate::utils::{max, min};
use crate::vehicle::SolarVehicle;

/// Mean temperature rise per W/m^2 of irradiance in the sampling model
const TE_PER_W_PER_M2: f64 = 0.02;

fn default_num_samples() -> usize {
    50_000
}

fn default_seed() -> u64 {
    0
}

fn default_progress_every() -> usize {
    5_000
}

fn default_tod_start_h() -> f64 {
    6.0
}

fn default_tod_end_h() -> f64 {
    18.0
}

fn default_ghi_peak() -> f64 {
    800.0
}

fn default_ghi_noise() -> f64 {
    50.0
}

fn default_te_sigma() -> f64 {
    5.0
}

fn default_te_min() -> f64 {
    -5.0
}

fn default_te_max() -> f64 {
    45.0
}

fn default_wind_max() -> f64 {
    10.0
}

fn default_grade_min_deg() -> f64 {
    -5.0
}

fn default_grade_max_deg() -> f64 {
    10.0
}

fn default_soc_min() -> f64 {
    0.3
}

fn default_soc_max() -> f64 {
    1.0
}

/// Sampling strategy and size of a generated dataset.  Fully serializable so
/// a run is reproducible from its config file alone; there is no ambient
/// randomness anywhere in the pipeline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DatasetConfig {
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Master seed; sample `i` uses `seed + i`
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Trip distance for every sample \[m\]
    #[serde(default)]
    pub distance_m: Option<f64>,
    /// Nominal battery capacity for every sample \[Wh\]
    #[serde(default)]
    pub battery_capacity_wh: Option<f64>,
    #[serde(default)]
    pub speed_bounds: Option<SpeedBounds>,
    #[serde(default)]
    pub optimize: Option<OptimizeParams>,
    /// Daylight window sampled uniformly \[h\]
    #[serde(default = "default_tod_start_h")]
    pub tod_start_h: f64,
    #[serde(default = "default_tod_end_h")]
    pub tod_end_h: f64,
    /// Peak of the clear-sky irradiance half-sine \[W/m^2\]
    #[serde(default = "default_ghi_peak")]
    pub ghi_peak_w_per_m2: f64,
    /// Uniform noise half-width on each irradiance percentile \[W/m^2\]
    #[serde(default = "default_ghi_noise")]
    pub ghi_noise_w_per_m2: f64,
    /// Gaussian spread of ambient temperature around its irradiance-coupled mean \[°C\]
    #[serde(default = "default_te_sigma")]
    pub te_sigma_deg_c: f64,
    #[serde(default = "default_te_min")]
    pub te_min_deg_c: f64,
    #[serde(default = "default_te_max")]
    pub te_max_deg_c: f64,
    /// Headwind sampled uniformly from [0, wind_max_mps] \[m/s\]
    #[serde(default = "default_wind_max")]
    pub wind_max_mps: f64,
    /// Road grade sampled uniformly \[deg\]
    #[serde(default = "default_grade_min_deg")]
    pub grade_min_deg: f64,
    #[serde(default = "default_grade_max_deg")]
    pub grade_max_deg: f64,
    /// Initial state of charge sampled uniformly
    #[serde(default = "default_soc_min")]
    pub soc_min: f64,
    #[serde(default = "default_soc_max")]
    pub soc_max: f64,
    /// Emit a progress log line every this many samples
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            num_samples: default_num_samples(),
            seed: default_seed(),
            distance_m: None,
            battery_capacity_wh: None,
            speed_bounds: None,
            optimize: None,
            tod_start_h: default_tod_start_h(),
            tod_end_h: default_tod_end_h(),
            ghi_peak_w_per_m2: default_ghi_peak(),
            ghi_noise_w_per_m2: default_ghi_noise(),
            te_sigma_deg_c: default_te_sigma(),
            te_min_deg_c: default_te_min(),
            te_max_deg_c: default_te_max(),
            wind_max_mps: default_wind_max(),
            grade_min_deg: default_grade_min_deg(),
            grade_max_deg: default_grade_max_deg(),
            soc_min: default_soc_min(),
            soc_max: default_soc_max(),
            progress_every: default_progress_every(),
        }
    }
}

impl DatasetConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.num_samples > 0, "num_samples must be positive");
        ensure!(
            self.tod_start_h < self.tod_end_h,
            "daylight window must satisfy start < end"
        );
        ensure!(
            self.ghi_peak_w_per_m2 >= 0.0 && self.ghi_noise_w_per_m2 >= 0.0,
            "irradiance parameters must be non-negative"
        );
        ensure!(self.te_sigma_deg_c >= 0.0, "te_sigma_deg_c must be non-negative");
        ensure!(
            self.te_min_deg_c < self.te_max_deg_c,
            "temperature clamp must satisfy min < max"
        );
        ensure!(self.wind_max_mps >= 0.0, "wind_max_mps must be non-negative");
        ensure!(
            self.grade_min_deg < self.grade_max_deg,
            "grade range must satisfy min < max"
        );
        ensure!(
            self.soc_min < self.soc_max && self.soc_min >= 0.0 && self.soc_max <= 1.0,
            "SOC range must satisfy 0 <= min < max <= 1"
        );
        ensure!(self.progress_every > 0, "progress_every must be positive");
        if let Some(bounds) = &self.speed_bounds {
            bounds.validate()?;
        }
        if let Some(params) = &self.optimize {
            params.validate()?;
        }
        Ok(())
    }
}

impl SerdeAPI for DatasetConfig {}

/// One generated training example; serializes directly to a CSV row.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SampleRecord {
    pub time_of_day: f64,
    pub ghi10_w_per_m2: f64,
    pub ghi90_w_per_m2: f64,
    pub te_amb_deg_c: f64,
    pub wind_mps: f64,
    pub grade_deg: f64,
    pub battery_eff: f64,
    pub soc_init: f64,
    pub speed_opt_kph: f64,
    pub soc_opt: f64,
    pub speed_actual_kph: f64,
    pub soc_actual: f64,
    /// Charge given up by driving at the actual rather than optimal speed
    pub soc_loss_suboptimal: f64,
    pub speed_diff_kph: f64,
    pub ghi_uncertainty: f64,
    pub te_uncertainty: f64,
    pub soc_uncertainty: f64,
    pub opt_converged: bool,
    pub depleted: bool,
}

fn sample_one(
    i: usize,
    config: &DatasetConfig,
    veh: &SolarVehicle,
    props: &PhysicalProperties,
    bounds: &SpeedBounds,
    opt_params: &OptimizeParams,
    trip_template: &TripSpec,
) -> anyhow::Result<SampleRecord> {
    let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(i as u64));

    // environmental conditions
    let tod = rng.gen_range(config.tod_start_h..config.tod_end_h);
    let sun = ((tod - config.tod_start_h) / (config.tod_end_h - config.tod_start_h) * PI).sin();
    let ghi10 = max(
        0.0,
        config.ghi_peak_w_per_m2 * sun
            + rng.gen_range(-config.ghi_noise_w_per_m2..=config.ghi_noise_w_per_m2),
    );
    let ghi90 = max(
        0.0,
        config.ghi_peak_w_per_m2 * sun
            + rng.gen_range(-config.ghi_noise_w_per_m2..=config.ghi_noise_w_per_m2),
    );
    let te_mean = REF_TE_DEG_C + TE_PER_W_PER_M2 * 0.5 * (ghi10 + ghi90);
    let te_amb = min(
        config.te_max_deg_c,
        max(
            config.te_min_deg_c,
            Normal::new(te_mean, config.te_sigma_deg_c)?.sample(&mut rng),
        ),
    );
    let wind = rng.gen_range(0.0..=config.wind_max_mps);
    let grade_deg = rng.gen_range(config.grade_min_deg..config.grade_max_deg);

    let env = Environment {
        te_amb_deg_c: te_amb,
        grade: grade_deg.to_radians().tan(),
        wind_mps: wind,
        ghi10_w_per_m2: ghi10,
        ghi90_w_per_m2: ghi90,
        elevation_m: 0.0,
    };

    // vehicle state
    let soc_init = rng.gen_range(config.soc_min..config.soc_max);
    let trip = TripSpec {
        init_soc: soc_init,
        ..trip_template.clone()
    };

    // optimal speed for these conditions
    let opt = optimize(veh, &env, &trip, bounds, opt_params, props)?;

    // outcome at a randomly chosen actual speed, for comparison
    let speed_actual = rng.gen_range(bounds.min_mps..bounds.max_mps);
    let actual = simulate(speed_actual, veh, &env, &trip, props)?;

    // synthetic measurement uncertainty
    let ghi_mean = 0.5 * (ghi10 + ghi90);
    let ghi_uncertainty = Normal::new(0.0, 0.1 * ghi_mean)?.sample(&mut rng);
    let te_uncertainty = Normal::new(0.0, 0.05 * te_amb.abs())?.sample(&mut rng);
    let soc_uncertainty = Normal::new(0.0, 0.05 * actual.soc_final)?.sample(&mut rng);

    Ok(SampleRecord {
        time_of_day: tod,
        ghi10_w_per_m2: ghi10,
        ghi90_w_per_m2: ghi90,
        te_amb_deg_c: te_amb,
        wind_mps: wind,
        grade_deg,
        battery_eff: env.battery_eff(),
        soc_init,
        speed_opt_kph: opt.speed_opt_mps * KPH_PER_MPS,
        soc_opt: opt.sim.soc_final,
        speed_actual_kph: speed_actual * KPH_PER_MPS,
        soc_actual: actual.soc_final,
        soc_loss_suboptimal: opt.sim.soc_final - actual.soc_final,
        speed_diff_kph: (opt.speed_opt_mps - speed_actual).abs() * KPH_PER_MPS,
        ghi_uncertainty,
        te_uncertainty,
        soc_uncertainty,
        opt_converged: opt.converged,
        depleted: opt.sim.depleted || actual.depleted,
    })
}

/// Generates `config.num_samples` labeled examples for `veh`.  Samples are
/// independent and generated in parallel; record order and content depend
/// only on the config.
pub fn generate(
    config: &DatasetConfig,
    veh: &SolarVehicle,
    props: &PhysicalProperties,
) -> anyhow::Result<Vec<SampleRecord>> {
    config.validate()?;
    let bounds = config.speed_bounds.unwrap_or_default();
    let opt_params = config.optimize.unwrap_or_default();
    let trip_template = TripSpec {
        distance_m: config.distance_m.unwrap_or_else(|| TripSpec::default().distance_m),
        init_soc: 0.0, // overwritten per sample
        battery_capacity_wh: config
            .battery_capacity_wh
            .unwrap_or_else(|| TripSpec::default().battery_capacity_wh),
    };

    let done = AtomicUsize::new(0);
    let records: Vec<SampleRecord> = (0..config.num_samples)
        .into_par_iter()
        .map(|i| {
            let record = sample_one(i, config, veh, props, &bounds, &opt_params, &trip_template)?;
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if n % config.progress_every == 0 {
                log::info!("generated {} / {} samples", n, config.num_samples);
            }
            Ok(record)
        })
        .collect::<anyhow::Result<Vec<SampleRecord>>>()?;
    Ok(records)
}

/// Writes records as CSV with one header row, one row per sample.
pub fn write_csv<P: AsRef<Path>>(records: &[SampleRecord], filepath: P) -> anyhow::Result<()> {
    let filepath = filepath.as_ref();
    let mut wtr = csv::Writer::from_path(filepath)
        .with_context(|| format!("Could not create file: {filepath:?}"))?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Generates a dataset and writes it straight to `filepath` as CSV.
pub fn generate_to_csv<P: AsRef<Path>>(
    config: &DatasetConfig,
    veh: &SolarVehicle,
    props: &PhysicalProperties,
    filepath: P,
) -> anyhow::Result<()> {
    let records = generate(config, veh, props)?;
    write_csv(&records, &filepath)?;
    log::info!(
        "wrote {} samples to {:?}",
        records.len(),
        filepath.as_ref()
    );
    Ok(())
}
