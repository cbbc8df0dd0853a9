//! Module containing environment parameters and derived ambient quantities.

use crate::air;
use crate::imports::*;
use crate::params::*;
use crate::utils::max;

/// Struct containing environment parameters.  Immutable per simulation run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Environment {
    /// Ambient air temperature \[°C\]
    pub te_amb_deg_c: f64,
    /// Road grade as rise over run; positive is uphill
    pub grade: f64,
    /// Wind speed along the direction of travel \[m/s\]; positive is headwind
    pub wind_mps: f64,
    /// 10th-percentile global horizontal irradiance forecast \[W/m^2\]
    pub ghi10_w_per_m2: f64,
    /// 90th-percentile global horizontal irradiance forecast \[W/m^2\]
    pub ghi90_w_per_m2: f64,
    /// Elevation above sea level \[m\]
    pub elevation_m: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            te_amb_deg_c: REF_TE_DEG_C,
            grade: 0.0,
            wind_mps: 0.0,
            ghi10_w_per_m2: 0.0,
            ghi90_w_per_m2: 0.0,
            elevation_m: 0.0,
        }
    }
}

impl Environment {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.te_amb_deg_c.is_finite()
                && self.grade.is_finite()
                && self.wind_mps.is_finite()
                && self.ghi10_w_per_m2.is_finite()
                && self.ghi90_w_per_m2.is_finite()
                && self.elevation_m.is_finite(),
            "environment parameters must all be finite"
        );
        ensure!(
            self.te_amb_deg_c > -273.15,
            "te_amb_deg_c must be above absolute zero"
        );
        Ok(())
    }

    /// Ambient air density \[kg/m^3\] from temperature and elevation
    pub fn air_density_kg_per_m3(&self) -> f64 {
        air::get_rho(self.te_amb_deg_c, Some(self.elevation_m))
    }

    /// Plane-of-array irradiance estimate \[W/m^2\]: mean of the forecast
    /// percentiles, floored at zero when `floor_negative` is set.
    pub fn effective_irradiance_w_per_m2(&self, floor_negative: bool) -> f64 {
        let irr = 0.5 * (self.ghi10_w_per_m2 + self.ghi90_w_per_m2);
        if floor_negative {
            max(0.0, irr)
        } else {
            irr
        }
    }

    /// Multiplier on the rolling resistance coefficient; tire and asphalt
    /// losses grow with temperature above the reference.
    pub fn rr_temp_factor(&self) -> f64 {
        max(
            0.0,
            1.0 + RR_TEMP_COEF_PER_DEG_C * (self.te_amb_deg_c - REF_TE_DEG_C),
        )
    }

    /// Usable fraction of nominal battery capacity at ambient temperature
    pub fn battery_eff(&self) -> f64 {
        max(
            0.0,
            BATT_EFF_BASE - BATT_EFF_DERATE_PER_DEG_C * (self.te_amb_deg_c - REF_TE_DEG_C).abs(),
        )
    }

    /// Thermal derating multiplier on solar panel output
    pub fn solar_derate(&self) -> f64 {
        max(
            0.0,
            1.0 - SOLAR_DERATE_PER_DEG_C * (self.te_amb_deg_c - REF_TE_DEG_C).abs(),
        )
    }
}

impl SerdeAPI for Environment {}
