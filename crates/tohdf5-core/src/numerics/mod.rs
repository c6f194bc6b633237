pub mod coordinates;
pub mod cosmology;

pub use coordinates::{
    CoordinateLengthError, DistanceModel, FluxGeometry, flux_to_cartesian,
    flux_to_cartesian_batch, sky_to_cartesian, sky_to_cartesian_batch,
};
pub use cosmology::FlatLambdaCdm;
