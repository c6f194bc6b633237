use crate::domain::CartesianPositions;

/// Comoving distance as a function of redshift. Closures implement it directly.
pub trait DistanceModel {
    fn comoving_distance(&self, redshift: f64) -> f64;
}

impl<F> DistanceModel for F
where
    F: Fn(f64) -> f64,
{
    fn comoving_distance(&self, redshift: f64) -> f64 {
        self(redshift)
    }
}

/// Torus used to place flux coordinates in space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluxGeometry {
    /// Device centre to torus centre.
    pub tokamak_radius: f64,
    /// Torus centre to boundary.
    pub minor_radius: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("coordinate arrays differ in length: {first}={first_len}, {second}={second_len}")]
pub struct CoordinateLengthError {
    pub first: &'static str,
    pub first_len: usize,
    pub second: &'static str,
    pub second_len: usize,
}

pub fn sky_to_cartesian<D>(redshift: f64, ra_deg: f64, dec_deg: f64, distance: &D) -> [f64; 3]
where
    D: DistanceModel + ?Sized,
{
    let ra = ra_deg.to_radians();
    let dec = dec_deg.to_radians();
    let d = distance.comoving_distance(redshift);
    [
        ra.cos() * dec.cos() * d,
        ra.sin() * dec.cos() * d,
        dec.sin() * d,
    ]
}

/// Places flux coordinates on the reference torus.
///
/// `x` and `y` share one formula and `phi` is unused, matching the containers
/// produced so far.
pub fn flux_to_cartesian(s: f64, chi: f64, _phi: f64, geometry: FluxGeometry) -> [f64; 3] {
    let radial = geometry.tokamak_radius + s * chi.cos();
    [radial, radial, geometry.minor_radius * s * chi.sin()]
}

pub fn sky_to_cartesian_batch<D>(
    redshift: &[f64],
    ra_deg: &[f64],
    dec_deg: &[f64],
    distance: &D,
) -> Result<CartesianPositions, CoordinateLengthError>
where
    D: DistanceModel + ?Sized,
{
    ensure_same_len(("redshift", redshift), ("ra", ra_deg))?;
    ensure_same_len(("redshift", redshift), ("dec", dec_deg))?;
    Ok(redshift
        .iter()
        .zip(ra_deg)
        .zip(dec_deg)
        .map(|((z, ra), dec)| sky_to_cartesian(*z, *ra, *dec, distance))
        .collect())
}

pub fn flux_to_cartesian_batch(
    s: &[f64],
    chi: &[f64],
    phi: &[f64],
    geometry: FluxGeometry,
) -> Result<CartesianPositions, CoordinateLengthError> {
    ensure_same_len(("s", s), ("chi", chi))?;
    ensure_same_len(("s", s), ("phi", phi))?;
    Ok(s.iter()
        .zip(chi)
        .zip(phi)
        .map(|((s, chi), phi)| flux_to_cartesian(*s, *chi, *phi, geometry))
        .collect())
}

fn ensure_same_len(
    (first, a): (&'static str, &[f64]),
    (second, b): (&'static str, &[f64]),
) -> Result<(), CoordinateLengthError> {
    if a.len() == b.len() {
        return Ok(());
    }
    Err(CoordinateLengthError {
        first,
        first_len: a.len(),
        second,
        second_len: b.len(),
    })
}
