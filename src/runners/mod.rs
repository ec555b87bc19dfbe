//! Concrete pipeline steps.
//!
//! Each runner pairs a task name and its dependency gates with one
//! collaborator trait that performs the actual science. The collaborators are
//! injected, so the enrichment stack stays testable without catalogs, survey
//! servers, or fitting codes.

pub mod aperture;
pub mod cutout;
pub mod host_match;
pub mod photometry;
pub mod redshift;
pub mod sed;

pub use aperture::{Aperture, ApertureBuilder, ApertureConstructionRunner};
pub use cutout::{CutoutDownloadRunner, CutoutFetcher, CutoutImage};
pub use host_match::{HostGalaxy, HostMatchRunner, HostMatcher};
pub use photometry::{AperturePhotometryRunner, Photometer, PhotometryPoint};
pub use redshift::{HostRedshift, RedshiftLookupRunner, RedshiftResolver};
pub use sed::{SedFitter, SedFittingRunner, SedPosterior};
