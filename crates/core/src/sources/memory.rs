use crate::models::observation::{PriceObservation, RawObservation};

use super::traits::{ObservationStream, SourceAdapter};

/// Adapter over observations that are already in memory.
///
/// Useful for embedding callers that scrape on their own and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    name: String,
    observations: Vec<RawObservation>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, observations: Vec<RawObservation>) -> Self {
        Self {
            name: name.into(),
            observations,
        }
    }

    /// Build from validated observations.
    pub fn from_observations(name: impl Into<String>, observations: &[PriceObservation]) -> Self {
        Self::new(name, observations.iter().map(RawObservation::from).collect())
    }

    pub fn push(&mut self, observation: RawObservation) {
        self.observations.push(observation);
    }
}

impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn observations(&mut self) -> ObservationStream<'_> {
        Box::new(self.observations.iter().cloned().map(Ok))
    }
}
