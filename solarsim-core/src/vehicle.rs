//! Module containing vehicle struct and related functions.

// local
use crate::imports::*;
use crate::params::*;
use crate::utils::{arrmax, interpolate};

use itertools::Itertools;
use validator::Validate;

/// Motor efficiency curve of the reference vehicle, from dynamometer data at
/// steady cruising speeds.  Efficiencies below the slowest measured point are
/// clamped, not extrapolated.
pub const MC_SPEED_KPH_DEFAULT: [f64; 6] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0];
pub const MC_EFF_MAP_DEFAULT: [f64; 6] = [0.44, 0.64, 0.74, 0.81, 0.85, 0.90];

fn default_mc_speed_kph() -> Array1<f64> {
    Array1::from_vec(MC_SPEED_KPH_DEFAULT.to_vec())
}

fn default_mc_eff_map() -> Array1<f64> {
    Array1::from_vec(MC_EFF_MAP_DEFAULT.to_vec())
}

fn default_drivetrain_eff() -> f64 {
    0.97
}

fn default_aux_kw() -> f64 {
    0.05
}

/// Struct containing solar vehicle parameters.  Immutable per simulation run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Validate)]
pub struct SolarVehicle {
    /// Vehicle name
    #[serde(default)]
    pub scenario_name: String,
    /// Total vehicle mass including driver \[kg\]
    #[validate(range(min = 0))]
    pub mass_kg: f64,
    /// Frontal area \[m^2\]
    #[validate(range(min = 0))]
    pub frontal_area_m2: f64,
    /// Aerodynamic drag coefficient
    #[validate(range(min = 0))]
    pub drag_coef: f64,
    /// Rolling resistance coefficient at the reference temperature
    #[validate(range(min = 0))]
    pub wheel_rr_coef: f64,
    /// Fixed driveline efficiency between motor shaft and wheels
    #[validate(range(min = 0, max = 1))]
    #[serde(default = "default_drivetrain_eff")]
    pub drivetrain_eff: f64,
    /// Accessory/idle electrical load (telemetry, controllers, lights),
    /// drawn for the full trip duration \[kW\]
    #[validate(range(min = 0))]
    #[serde(default = "default_aux_kw")]
    pub aux_kw: f64,
    /// Solar panel aperture area \[m^2\]
    #[validate(range(min = 0))]
    pub solar_panel_area_m2: f64,
    /// Solar panel conversion efficiency at the reference temperature
    #[validate(range(min = 0, max = 1))]
    pub solar_panel_eff: f64,
    /// Speeds \[km/h\] at which motor efficiency was measured; strictly increasing
    #[serde(default = "default_mc_speed_kph")]
    pub mc_speed_kph: Array1<f64>,
    /// Motor efficiency at each speed in `mc_speed_kph`
    #[serde(default = "default_mc_eff_map")]
    pub mc_eff_map: Array1<f64>,
    /// If provided, `set_derived` rescales `mc_eff_map` so its peak equals
    /// this value, then clears the override.
    #[serde(default)]
    pub mc_peak_eff_override: Option<f64>,
}

impl SolarVehicle {
    /// Validates the vehicle and applies derived parameters.  Specifically
    /// - runs field-level validation
    /// - checks that the motor efficiency curve is well formed
    /// - applies `mc_peak_eff_override`
    pub fn set_derived(&mut self) -> anyhow::Result<()> {
        // Vehicle input validation
        match self.validate() {
            std::result::Result::Ok(_) => (),
            Err(e) => bail!(e),
        };
        ensure!(self.mass_kg > 0.0, "mass_kg must be positive");
        ensure!(self.frontal_area_m2 > 0.0, "frontal_area_m2 must be positive");
        ensure!(self.drivetrain_eff > 0.0, "drivetrain_eff must be positive");
        ensure!(
            self.mc_speed_kph.len() == self.mc_eff_map.len(),
            "motor efficiency curve arrays must have equal length: {} vs {}",
            self.mc_speed_kph.len(),
            self.mc_eff_map.len()
        );
        ensure!(
            self.mc_speed_kph.len() >= 2,
            "motor efficiency curve needs at least 2 points"
        );
        ensure!(
            self.mc_speed_kph.iter().tuple_windows().all(|(a, b)| b > a),
            "mc_speed_kph must be strictly increasing"
        );
        ensure!(
            self.mc_eff_map.iter().all(|&e| e > 0.0 && e <= 1.0),
            "mc_eff_map values must be in (0, 1]"
        );

        if let Some(new_peak) = self.mc_peak_eff_override {
            ensure!(
                new_peak > 0.0 && new_peak <= 1.0,
                "mc_peak_eff_override must be in (0, 1], got {}",
                new_peak
            );
            let mc_max_eff = arrmax(&self.mc_eff_map.to_vec());
            self.mc_eff_map *= new_peak / mc_max_eff;
            self.mc_peak_eff_override = None;
        }
        Ok(())
    }

    /// Returns motor efficiency at `speed_mps`, linearly interpolated on the
    /// efficiency curve and clamped beyond its endpoints.
    pub fn mc_eff_at_speed(&self, speed_mps: f64) -> f64 {
        interpolate(
            &(speed_mps * KPH_PER_MPS),
            &self.mc_speed_kph,
            &self.mc_eff_map,
            false,
        )
    }

    /// Peak value of the motor efficiency curve
    pub fn mc_peak_eff(&self) -> f64 {
        arrmax(&self.mc_eff_map.to_vec())
    }

    /// Returns the 300 kg reference solar cruiser used throughout tests and
    /// as the CLI default vehicle.
    pub fn mock_vehicle() -> Self {
        let mut veh = Self {
            scenario_name: String::from("Reference solar cruiser"),
            mass_kg: 300.0,
            frontal_area_m2: 1.1,
            drag_coef: 0.2,
            wheel_rr_coef: 0.015,
            drivetrain_eff: default_drivetrain_eff(),
            aux_kw: default_aux_kw(),
            solar_panel_area_m2: 3.51,
            solar_panel_eff: 0.18,
            mc_speed_kph: default_mc_speed_kph(),
            mc_eff_map: default_mc_eff_map(),
            mc_peak_eff_override: None,
        };
        veh.set_derived().unwrap();
        veh
    }
}

impl Default for SolarVehicle {
    fn default() -> Self {
        Self::mock_vehicle()
    }
}

impl SerdeAPI for SolarVehicle {
    fn init(&mut self) -> anyhow::Result<()> {
        self.set_derived()
    }
}
