//! Module containing the optimal-speed search.

use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::goldensectionsearch::GoldenSectionSearch;
use itertools::Itertools;

use crate::environment::Environment;
use crate::imports::*;
use crate::params::*;
use crate::simulate::{simulate, SimulationResult, TripSpec};
use crate::utils::argmax;
use crate::vehicle::SolarVehicle;

/// Closed speed interval searched by the optimizer \[m/s\]
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SpeedBounds {
    pub min_mps: f64,
    pub max_mps: f64,
}

impl SpeedBounds {
    pub fn new(min_mps: f64, max_mps: f64) -> anyhow::Result<Self> {
        let bounds = Self { min_mps, max_mps };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.min_mps.is_finite() && self.max_mps.is_finite(),
            "speed bounds must be finite"
        );
        ensure!(
            self.min_mps > 0.0,
            "min speed must be positive, got {}",
            self.min_mps
        );
        ensure!(
            self.min_mps < self.max_mps,
            "speed bounds must satisfy min < max, got [{}, {}]",
            self.min_mps,
            self.max_mps
        );
        Ok(())
    }
}

impl Default for SpeedBounds {
    fn default() -> Self {
        // search range of the reference vehicle, 10-60 km/h
        Self {
            min_mps: 10.0 / KPH_PER_MPS,
            max_mps: 60.0 / KPH_PER_MPS,
        }
    }
}

impl SerdeAPI for SpeedBounds {}

/// Search tuning knobs
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct OptimizeParams {
    /// Terminate golden-section refinement once the bracket is this narrow \[m/s\]
    #[serde(default = "default_tol_mps")]
    pub tol_mps: f64,
    /// Iteration cap for golden-section refinement
    #[serde(default = "default_max_iters")]
    pub max_iters: u64,
    /// Samples in the bracketing/unimodality scan
    #[serde(default = "default_coarse_samples")]
    pub coarse_samples: usize,
    /// Samples in the dense fallback scan for non-unimodal objectives
    #[serde(default = "default_fallback_samples")]
    pub fallback_samples: usize,
}

fn default_tol_mps() -> f64 {
    0.01
}

fn default_max_iters() -> u64 {
    64
}

fn default_coarse_samples() -> usize {
    33
}

fn default_fallback_samples() -> usize {
    2001
}

impl Default for OptimizeParams {
    fn default() -> Self {
        Self {
            tol_mps: default_tol_mps(),
            max_iters: default_max_iters(),
            coarse_samples: default_coarse_samples(),
            fallback_samples: default_fallback_samples(),
        }
    }
}

impl OptimizeParams {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.tol_mps.is_finite() && self.tol_mps > 0.0,
            "tol_mps must be positive"
        );
        ensure!(self.max_iters > 0, "max_iters must be positive");
        ensure!(
            self.coarse_samples >= 5,
            "coarse_samples must be at least 5"
        );
        ensure!(
            self.fallback_samples >= 2,
            "fallback_samples must be at least 2"
        );
        Ok(())
    }
}

impl SerdeAPI for OptimizeParams {}

/// Result of an optimal-speed search
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OptimizationResult {
    /// Speed maximizing end-of-trip state of charge \[m/s\]
    pub speed_opt_mps: f64,
    /// Simulation outcome at `speed_opt_mps`
    pub sim: SimulationResult,
    /// Number of objective evaluations spent in the search
    pub iterations: u64,
    /// False when the iteration cap was hit or the objective was not
    /// unimodal and the dense fallback scan was used
    pub converged: bool,
}

struct SocCost<'a> {
    veh: &'a SolarVehicle,
    env: &'a Environment,
    trip: &'a TripSpec,
    props: &'a PhysicalProperties,
}

impl CostFunction for SocCost<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, speed_mps: &Self::Param) -> Result<Self::Output, Error> {
        let res = simulate(*speed_mps, self.veh, self.env, self.trip, self.props)?;
        // the solver minimizes; highest SOC is the lowest cost
        Ok(-res.soc_final)
    }
}

/// Returns true if `ys` rises to a single maximum and falls after it.
/// Plateaus within `eps` are tolerated; a strict rise after any strict fall
/// disqualifies the sequence.
fn is_unimodal(ys: &[f64], eps: f64) -> bool {
    let mut descending = false;
    for (a, b) in ys.iter().tuple_windows() {
        if b - a > eps {
            if descending {
                return false;
            }
        } else if a - b > eps {
            descending = true;
        }
    }
    true
}

/// Finds the cruising speed in `bounds` that maximizes end-of-trip state of
/// charge, with the physics of [simulate] as the objective.
///
/// The speed domain is scanned coarsely to bracket the best sample and check
/// unimodality.  A unimodal objective is refined with golden-section search
/// inside the bracket; anything else falls back to a dense grid scan and is
/// reported with `converged = false` rather than failing.
pub fn optimize(
    veh: &SolarVehicle,
    env: &Environment,
    trip: &TripSpec,
    bounds: &SpeedBounds,
    params: &OptimizeParams,
    props: &PhysicalProperties,
) -> anyhow::Result<OptimizationResult> {
    bounds.validate()?;
    params.validate()?;

    // coarse bracketing scan
    let xs = Array::linspace(bounds.min_mps, bounds.max_mps, params.coarse_samples);
    let mut socs: Vec<f64> = Vec::with_capacity(params.coarse_samples);
    for &x in xs.iter() {
        socs.push(simulate(x, veh, env, trip, props)?.soc_final);
    }
    let mut evals = params.coarse_samples as u64;
    let i_best = argmax(&socs).with_context(|| "coarse scan produced no samples")?;

    let mut speed_opt: f64;
    let converged: bool;

    if is_unimodal(&socs, 1e-12) {
        let lo = xs[i_best.saturating_sub(1)];
        let hi = xs[(i_best + 1).min(xs.len() - 1)];
        if hi - lo <= params.tol_mps {
            speed_opt = xs[i_best];
            converged = true;
        } else {
            let cost = SocCost {
                veh,
                env,
                trip,
                props,
            };
            // the solver's tolerance is relative to the magnitudes of its
            // interior points; rescale the absolute tolerance accordingly
            let rel_tol = params.tol_mps / (2.0 * bounds.max_mps);
            let solver = GoldenSectionSearch::new(lo, hi)?.with_tolerance(rel_tol)?;
            let res = Executor::new(cost, solver)
                .configure(|state| state.param(0.5 * (lo + hi)).max_iters(params.max_iters))
                .run()?;
            let iters = res.state().get_iter();
            evals += iters;
            converged = iters < params.max_iters;
            speed_opt = *res
                .state()
                .get_best_param()
                .with_context(|| "golden-section search returned no best parameter")?;
            // keep the better of the refined point and the coarse best sample
            if socs[i_best] > -res.state().get_best_cost() {
                speed_opt = xs[i_best];
            }
        }
    } else {
        log::warn!(
            "objective is not unimodal over [{}, {}] m/s; falling back to dense grid scan",
            bounds.min_mps,
            bounds.max_mps
        );
        let dense = Array::linspace(bounds.min_mps, bounds.max_mps, params.fallback_samples);
        let mut best_x = bounds.min_mps;
        let mut best_soc = f64::NEG_INFINITY;
        for &x in dense.iter() {
            let soc = simulate(x, veh, env, trip, props)?.soc_final;
            if soc > best_soc {
                best_soc = soc;
                best_x = x;
            }
        }
        evals += params.fallback_samples as u64;
        speed_opt = best_x;
        converged = false;
    }

    let speed_opt = speed_opt.clamp(bounds.min_mps, bounds.max_mps);
    // re-simulate so the embedded result is exactly the objective at speed_opt
    let sim = simulate(speed_opt, veh, env, trip, props)?;
    evals += 1;

    Ok(OptimizationResult {
        speed_opt_mps: speed_opt,
        sim,
        iterations: evals,
        converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn night_setup() -> (SolarVehicle, Environment, TripSpec, PhysicalProperties) {
        (
            SolarVehicle::mock_vehicle(),
            Environment::default(),
            TripSpec::default(),
            PhysicalProperties::default(),
        )
    }

    #[test]
    fn test_optimum_within_bounds() {
        let (veh, env, trip, props) = night_setup();
        let bounds = SpeedBounds::default();
        let res = optimize(
            &veh,
            &env,
            &trip,
            &bounds,
            &OptimizeParams::default(),
            &props,
        )
        .unwrap();
        assert!(res.speed_opt_mps >= bounds.min_mps);
        assert!(res.speed_opt_mps <= bounds.max_mps);
        assert!(res.converged);
    }

    #[test]
    fn test_degenerate_bounds_rejected() {
        let (veh, env, trip, props) = night_setup();
        let bounds = SpeedBounds {
            min_mps: 10.0,
            max_mps: 10.0,
        };
        assert!(optimize(
            &veh,
            &env,
            &trip,
            &bounds,
            &OptimizeParams::default(),
            &props
        )
        .is_err());
        assert!(SpeedBounds::new(12.0, 10.0).is_err());
        assert!(SpeedBounds::new(-1.0, 10.0).is_err());
    }

    #[test]
    fn test_round_trip_result_matches_simulate() {
        let (veh, env, trip, props) = night_setup();
        let res = optimize(
            &veh,
            &env,
            &trip,
            &SpeedBounds::default(),
            &OptimizeParams::default(),
            &props,
        )
        .unwrap();
        let sim = simulate(res.speed_opt_mps, &veh, &env, &trip, &props).unwrap();
        assert_eq!(res.sim, sim);
    }

    #[test]
    fn test_more_drag_never_raises_optimal_speed() {
        let (mut veh, env, trip, props) = night_setup();
        veh.aux_kw = 1.0;
        veh.set_derived().unwrap();
        let bounds = SpeedBounds::default();
        let params = OptimizeParams::default();
        let low_drag = optimize(&veh, &env, &trip, &bounds, &params, &props).unwrap();
        veh.drag_coef = 0.3;
        veh.set_derived().unwrap();
        let high_drag = optimize(&veh, &env, &trip, &bounds, &params, &props).unwrap();
        assert!(high_drag.speed_opt_mps <= low_drag.speed_opt_mps + 2.0 * params.tol_mps);
    }

    #[test]
    fn test_reference_scenario_has_interior_optimum() {
        // 1200 kg vehicle, 50 km trip, full sun, flat 0.9 motor efficiency
        let mut veh = SolarVehicle {
            scenario_name: String::from("scenario"),
            mass_kg: 1200.0,
            frontal_area_m2: 2.2,
            drag_coef: 0.25,
            wheel_rr_coef: 0.01,
            drivetrain_eff: 1.0,
            aux_kw: 1.0,
            solar_panel_area_m2: 4.0,
            solar_panel_eff: 0.22,
            mc_speed_kph: array![0.0, 200.0],
            mc_eff_map: array![0.9, 0.9],
            mc_peak_eff_override: None,
        };
        veh.set_derived().unwrap();
        let env = Environment {
            ghi10_w_per_m2: 800.0,
            ghi90_w_per_m2: 800.0,
            ..Default::default()
        };
        let trip = TripSpec {
            distance_m: 50e3,
            init_soc: 0.9,
            battery_capacity_wh: 20e3,
        };
        let bounds = SpeedBounds {
            min_mps: 5.0,
            max_mps: 40.0,
        };
        let res = optimize(
            &veh,
            &env,
            &trip,
            &bounds,
            &OptimizeParams::default(),
            &props_default(),
        )
        .unwrap();
        assert!(res.speed_opt_mps > bounds.min_mps, "{}", res.speed_opt_mps);
        assert!(res.speed_opt_mps < bounds.max_mps, "{}", res.speed_opt_mps);
        assert!(res.sim.soc_final > 0.0);
        assert!(res.converged);
    }

    fn props_default() -> PhysicalProperties {
        PhysicalProperties::default()
    }

    #[test]
    fn test_wiggly_efficiency_curve_takes_fallback_path() {
        let mut veh = SolarVehicle::mock_vehicle();
        veh.mc_speed_kph = array![0.0, 10.0, 20.0, 30.0, 40.0, 60.0];
        veh.mc_eff_map = array![0.9, 0.15, 0.9, 0.15, 0.9, 0.15];
        veh.set_derived().unwrap();
        let (_, env, trip, props) = night_setup();
        let bounds = SpeedBounds {
            min_mps: 1.0,
            max_mps: 16.0,
        };
        let res = optimize(
            &veh,
            &env,
            &trip,
            &bounds,
            &OptimizeParams::default(),
            &props,
        )
        .unwrap();
        assert!(!res.converged);
        assert!(res.speed_opt_mps >= bounds.min_mps);
        assert!(res.speed_opt_mps <= bounds.max_mps);
    }

    #[test]
    fn test_is_unimodal() {
        assert!(is_unimodal(&[1.0, 2.0, 3.0], 1e-12)); // monotone rise
        assert!(is_unimodal(&[3.0, 2.0, 1.0], 1e-12)); // monotone fall
        assert!(is_unimodal(&[1.0, 3.0, 3.0, 2.0], 1e-12)); // plateaued peak
        assert!(!is_unimodal(&[1.0, 3.0, 2.0, 3.0], 1e-12)); // two peaks
    }
}
