//! Module containing solarsim physical constants and properties.

use crate::imports::*;

/// Unit conversions that should NEVER change
pub const KPH_PER_MPS: f64 = 3.6;
pub const W_PER_KW: f64 = 1e3;
pub const S_PER_H: f64 = 3.6e3;

/// Reference temperature [°C] for rolling-resistance, battery, and solar derating
pub const REF_TE_DEG_C: f64 = 25.0;
/// Fractional increase of rolling-resistance coefficient per °C above reference
pub const RR_TEMP_COEF_PER_DEG_C: f64 = 0.01;
/// Fractional loss of solar panel output per °C away from reference
pub const SOLAR_DERATE_PER_DEG_C: f64 = 0.004;
/// Usable battery fraction at reference temperature
pub const BATT_EFF_BASE: f64 = 0.95;
/// Usable battery fraction lost per °C away from reference
pub const BATT_EFF_DERATE_PER_DEG_C: f64 = 0.001;

/// Struct containing physical constants and policy knobs that apply to every
/// simulation, as opposed to per-run vehicle or environment parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhysicalProperties {
    pub a_grav_mps2: f64, // = 9.81
    /// Fixed air density [kg/m^3].  `None` means density is derived from
    /// ambient temperature and elevation via [crate::air::get_rho].
    pub air_density_kg_per_m3: Option<f64>,
    /// When true, negative effective irradiance is floored at zero rather
    /// than drawing energy from the panel model.
    pub floor_negative_solar: bool,
}

impl Default for PhysicalProperties {
    fn default() -> Self {
        Self {
            a_grav_mps2: 9.81,
            air_density_kg_per_m3: None,
            floor_negative_solar: true,
        }
    }
}

impl SerdeAPI for PhysicalProperties {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_props_use_ambient_density() {
        let props = PhysicalProperties::default();
        assert_eq!(props.a_grav_mps2, 9.81);
        assert!(props.air_density_kg_per_m3.is_none());
        assert!(props.floor_negative_solar);
    }
}
