//! Band plan: which bands a job downloads per scene

use s2batch_algorithms::Band;
use serde::Serialize;

use crate::request::JobDescriptor;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandPlan {
    /// Requested bands first, then bands only needed as inputs
    pub bands: Vec<Band>,
    /// Inputs the caller did not ask for; removed after derivation
    pub implicit: Vec<Band>,
}

impl BandPlan {
    pub fn for_job(job: &JobDescriptor) -> Self {
        let mut bands = job.bands.clone();
        let mut implicit = Vec::new();

        let required = job
            .indices
            .iter()
            .flat_map(|i| i.bands().iter())
            .chain(job.composites.iter().flat_map(|c| c.bands().iter()));
        for &band in required {
            if !bands.contains(&band) {
                bands.push(band);
                implicit.push(band);
            }
        }

        BandPlan { bands, implicit }
    }
}

/// Files kept per processed scene: requested bands, indices and composites.
pub fn files_per_scene(job: &JobDescriptor) -> usize {
    job.bands.len() + job.indices.len() + job.composites.len()
}
