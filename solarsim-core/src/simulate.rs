//! Module containing the steady-state trip physics model.

use crate::environment::Environment;
use crate::imports::*;
use crate::params::*;
use crate::vehicle::SolarVehicle;

/// Struct containing trip parameters
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TripSpec {
    /// Trip distance \[m\]
    pub distance_m: f64,
    /// State of charge at departure, fraction of usable capacity in [0, 1]
    pub init_soc: f64,
    /// Nominal battery capacity \[Wh\]
    pub battery_capacity_wh: f64,
}

impl Default for TripSpec {
    fn default() -> Self {
        Self {
            distance_m: 150e3,
            init_soc: 0.9,
            battery_capacity_wh: 4960.0,
        }
    }
}

impl TripSpec {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.distance_m.is_finite() && self.distance_m > 0.0,
            "distance_m must be positive and finite, got {}",
            self.distance_m
        );
        ensure!(
            (0.0..=1.0).contains(&self.init_soc),
            "init_soc must be in [0, 1], got {}",
            self.init_soc
        );
        ensure!(
            self.battery_capacity_wh.is_finite() && self.battery_capacity_wh > 0.0,
            "battery_capacity_wh must be positive and finite, got {}",
            self.battery_capacity_wh
        );
        Ok(())
    }
}

impl SerdeAPI for TripSpec {}

/// Result of a single steady-state trip simulation.  Derived data; produced
/// fresh per [simulate] call.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// Total electrical energy drawn from the battery: propulsion plus
    /// accessory load \[Wh\].  Negative on net-regenerating trips.
    pub energy_consumed_wh: f64,
    /// Energy harvested by the solar panel over the trip \[Wh\]
    pub solar_energy_wh: f64,
    /// Accessory-load share of `energy_consumed_wh` \[Wh\]
    pub aux_energy_wh: f64,
    /// State of charge at trip end, clamped to [0, 1]
    pub soc_final: f64,
    /// Trip duration \[s\]
    pub trip_time_s: f64,
    /// True if the battery would have gone below empty before trip end; in
    /// that case `soc_final` is reported as 0
    pub depleted: bool,
}

/// Simulates a trip at constant `speed_mps` and returns the energy balance.
///
/// Drag uses the relative airspeed with a signed square so that a tailwind
/// faster than the vehicle pushes rather than drags.  Net-negative tractive
/// power (descents) is recovered through the drivetrain at the same
/// efficiencies it is spent with, multiplied rather than divided.
///
/// Arguments:
/// ----------
/// speed_mps: candidate cruising speed \[m/s\], must be positive
/// veh: vehicle parameters, already passed through `set_derived`
/// env: environment parameters
/// trip: trip parameters
/// props: physical constants and policy knobs
pub fn simulate(
    speed_mps: f64,
    veh: &SolarVehicle,
    env: &Environment,
    trip: &TripSpec,
    props: &PhysicalProperties,
) -> anyhow::Result<SimulationResult> {
    ensure!(
        speed_mps.is_finite() && speed_mps > 0.0,
        "speed_mps must be positive and finite, got {}",
        speed_mps
    );
    env.validate()?;
    trip.validate()?;

    let trip_time_s = trip.distance_m / speed_mps;

    let rho = props
        .air_density_kg_per_m3
        .unwrap_or_else(|| env.air_density_kg_per_m3());
    let v_rel = speed_mps + env.wind_mps;
    let drag_force_n = 0.5 * rho * veh.drag_coef * veh.frontal_area_m2 * v_rel * v_rel.abs();
    let roll_force_n =
        veh.wheel_rr_coef * env.rr_temp_factor() * veh.mass_kg * props.a_grav_mps2;
    let grade_force_n = veh.mass_kg * props.a_grav_mps2 * env.grade.atan().sin();

    let trac_pwr_w = (drag_force_n + roll_force_n + grade_force_n) * speed_mps;
    let eta = veh.mc_eff_at_speed(speed_mps) * veh.drivetrain_eff;
    ensure!(eta > 0.0, "combined drivetrain efficiency must be positive");
    let prop_pwr_w = if trac_pwr_w >= 0.0 {
        trac_pwr_w / eta
    } else {
        trac_pwr_w * eta
    };
    let aux_pwr_w = veh.aux_kw * W_PER_KW;

    let solar_pwr_w = env.effective_irradiance_w_per_m2(props.floor_negative_solar)
        * veh.solar_panel_area_m2
        * veh.solar_panel_eff
        * env.solar_derate();

    let energy_consumed_wh = (prop_pwr_w + aux_pwr_w) * trip_time_s / S_PER_H;
    let solar_energy_wh = solar_pwr_w * trip_time_s / S_PER_H;
    let aux_energy_wh = aux_pwr_w * trip_time_s / S_PER_H;

    let usable_capacity_wh = trip.battery_capacity_wh * env.battery_eff();
    ensure!(
        usable_capacity_wh > 0.0,
        "usable battery capacity must be positive; check temperature derating"
    );

    let soc_raw = trip.init_soc - (energy_consumed_wh - solar_energy_wh) / usable_capacity_wh;
    let depleted = soc_raw < 0.0;
    let soc_final = soc_raw.clamp(0.0, 1.0);

    Ok(SimulationResult {
        energy_consumed_wh,
        solar_energy_wh,
        aux_energy_wh,
        soc_final,
        trip_time_s,
        depleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_trip() -> (SolarVehicle, Environment, TripSpec, PhysicalProperties) {
        (
            SolarVehicle::mock_vehicle(),
            Environment::default(),
            TripSpec::default(),
            PhysicalProperties::default(),
        )
    }

    #[test]
    fn test_simulate_is_deterministic() {
        let (veh, env, trip, props) = flat_trip();
        let a = simulate(10.0, &veh, &env, &trip, &props).unwrap();
        let b = simulate(10.0, &veh, &env, &trip, &props).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_nonpositive_speed_rejected() {
        let (veh, env, trip, props) = flat_trip();
        assert!(simulate(0.0, &veh, &env, &trip, &props).is_err());
        assert!(simulate(-5.0, &veh, &env, &trip, &props).is_err());
        assert!(simulate(f64::NAN, &veh, &env, &trip, &props).is_err());
    }

    #[test]
    fn test_invalid_trip_rejected() {
        let (veh, env, _, props) = flat_trip();
        let trip = TripSpec {
            distance_m: -1.0,
            ..Default::default()
        };
        assert!(simulate(10.0, &veh, &env, &trip, &props).is_err());
        let trip = TripSpec {
            init_soc: 1.5,
            ..Default::default()
        };
        assert!(simulate(10.0, &veh, &env, &trip, &props).is_err());
    }

    #[test]
    fn test_no_irradiance_means_no_solar_energy() {
        let (veh, env, trip, props) = flat_trip();
        let res = simulate(10.0, &veh, &env, &trip, &props).unwrap();
        assert_eq!(res.solar_energy_wh, 0.0);
        assert!(res.energy_consumed_wh > 0.0);
        assert_eq!(res.trip_time_s, trip.distance_m / 10.0);
    }

    #[test]
    fn test_faster_cruise_draws_more_power() {
        let (veh, env, trip, props) = flat_trip();
        let slow = simulate(10.0, &veh, &env, &trip, &props).unwrap();
        let fast = simulate(15.0, &veh, &env, &trip, &props).unwrap();
        let slow_pwr = slow.energy_consumed_wh / slow.trip_time_s;
        let fast_pwr = fast.energy_consumed_wh / fast.trip_time_s;
        assert!(fast_pwr > slow_pwr);
    }

    #[test]
    fn test_descent_consumes_less_than_flat() {
        let (veh, env, trip, props) = flat_trip();
        let flat = simulate(10.0, &veh, &env, &trip, &props).unwrap();
        let downhill_env = Environment {
            grade: -0.05,
            ..env
        };
        let downhill = simulate(10.0, &veh, &downhill_env, &trip, &props).unwrap();
        assert!(downhill.energy_consumed_wh < flat.energy_consumed_wh);
    }

    #[test]
    fn test_headwind_consumes_more_than_calm() {
        let (veh, env, trip, props) = flat_trip();
        let calm = simulate(10.0, &veh, &env, &trip, &props).unwrap();
        let windy_env = Environment {
            wind_mps: 8.0,
            ..env
        };
        let windy = simulate(10.0, &veh, &windy_env, &trip, &props).unwrap();
        assert!(windy.energy_consumed_wh > calm.energy_consumed_wh);
    }

    #[test]
    fn test_undersized_battery_reports_depletion() {
        let (veh, env, _, props) = flat_trip();
        let trip = TripSpec {
            battery_capacity_wh: 50.0,
            ..Default::default()
        };
        let res = simulate(10.0, &veh, &env, &trip, &props).unwrap();
        assert!(res.depleted);
        assert_eq!(res.soc_final, 0.0);
    }

    #[test]
    fn test_strong_sun_saturates_soc_at_one() {
        let (mut veh, mut env, mut trip, props) = flat_trip();
        veh.solar_panel_area_m2 = 10.0;
        veh.set_derived().unwrap();
        env.ghi10_w_per_m2 = 1000.0;
        env.ghi90_w_per_m2 = 1000.0;
        trip.battery_capacity_wh = 500.0;
        let res = simulate(3.0, &veh, &env, &trip, &props).unwrap();
        assert_eq!(res.soc_final, 1.0);
        assert!(!res.depleted);
    }

    #[test]
    fn test_fixed_density_override_matches_hand_calc() {
        let (veh, env, trip, props) = flat_trip();
        let props = PhysicalProperties {
            air_density_kg_per_m3: Some(1.225),
            ..props
        };
        let speed = 10.0;
        let res = simulate(speed, &veh, &env, &trip, &props).unwrap();
        let drag_n = 0.5 * 1.225 * veh.drag_coef * veh.frontal_area_m2 * speed * speed;
        let roll_n = veh.wheel_rr_coef * veh.mass_kg * props.a_grav_mps2;
        let eta = veh.mc_eff_at_speed(speed) * veh.drivetrain_eff;
        let expected_wh = ((drag_n + roll_n) * speed / eta + veh.aux_kw * W_PER_KW)
            * res.trip_time_s
            / S_PER_H;
        assert!((res.energy_consumed_wh - expected_wh).abs() < 1e-9);
    }
}
