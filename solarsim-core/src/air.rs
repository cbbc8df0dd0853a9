//! Module containing models for ambient air properties.

pub const R_AIR: f64 = 287.0; // J/(kg*K)

/// Returns density [kg/m^3] of air
/// Source: https://www.grc.nasa.gov/WWW/K-12/rocket/atmosmet.html
/// T = 15.04 - .00649 * h
/// p = 101.29 * [(T + 273.1)/288.08]^5.256
/// Arguments:
/// ----------
/// te_air: f64
///     ambient temperature \[°C\] of air
/// h=0: Option<f64>
///     elevation \[m\] above sea level
pub fn get_rho(te_air: f64, h: Option<f64>) -> f64 {
    let h = h.unwrap_or(0.0);
    let te_standard = 15.04 - 0.00649 * h; // \[degC\]
    let p = 101.29e3 * ((te_standard + 273.1) / 288.08).powf(5.256); // \[Pa\]
    p / (R_AIR * (te_air + 273.15)) // [kg/m**3]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rho_at_standard_conditions() {
        // 15 °C at sea level should land near the textbook 1.225 kg/m^3
        let rho = get_rho(15.0, None);
        assert!((rho - 1.225).abs() < 0.01, "rho = {rho}");
    }

    #[test]
    fn test_rho_decreases_with_temperature_and_elevation() {
        assert!(get_rho(35.0, None) < get_rho(15.0, None));
        assert!(get_rho(15.0, Some(1500.0)) < get_rho(15.0, None));
    }
}
