use super::coordinates::DistanceModel;
use crate::common::CosmologyConfig;

pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
const SIMPSON_INTERVALS: usize = 512;

/// Flat matter + Lambda cosmology; distances in Mpc.
///
/// Radiation and massive neutrinos are neglected, which shifts distances by
/// well under a percent for the redshifts found in survey catalogs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatLambdaCdm {
    hubble_constant: f64,
    omega_matter: f64,
}

impl FlatLambdaCdm {
    pub fn new(hubble_constant: f64, omega_matter: f64) -> Self {
        Self {
            hubble_constant,
            omega_matter,
        }
    }

    pub fn planck15() -> Self {
        let defaults = CosmologyConfig::default();
        Self::new(defaults.hubble_constant, defaults.omega_matter)
    }

    pub fn hubble_distance(&self) -> f64 {
        SPEED_OF_LIGHT_KM_S / self.hubble_constant
    }

    fn inverse_efunc(&self, redshift: f64) -> f64 {
        let a = 1.0 + redshift;
        let e2 = self.omega_matter * a * a * a + (1.0 - self.omega_matter);
        1.0 / e2.sqrt()
    }
}

impl From<CosmologyConfig> for FlatLambdaCdm {
    fn from(config: CosmologyConfig) -> Self {
        Self::new(config.hubble_constant, config.omega_matter)
    }
}

impl DistanceModel for FlatLambdaCdm {
    fn comoving_distance(&self, redshift: f64) -> f64 {
        if redshift == 0.0 {
            return 0.0;
        }
        let h = redshift / SIMPSON_INTERVALS as f64;
        let mut sum = self.inverse_efunc(0.0) + self.inverse_efunc(redshift);
        for step in 1..SIMPSON_INTERVALS {
            let weight = if step % 2 == 0 { 2.0 } else { 4.0 };
            sum += weight * self.inverse_efunc(step as f64 * h);
        }
        self.hubble_distance() * sum * h / 3.0
    }
}
