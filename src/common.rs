use crate::error::Error;

/// Merge candidate selection heuristic.
#[derive(Clone, PartialEq, Debug, Copy)]
pub enum Heuristic {
    /// Local Mutual Best Fitting: two regions merge only when each one is the cheapest neighbor
    /// of the other. Results do not depend on the scan order.
    LocalMutualBestFitting,
    /// Best Fitting: a region merges with its cheapest neighbor without asking for mutuality.
    ///
    /// Converges in fewer passes ("fast segmentation"), but the result depends on the scan order.
    /// Regions are scanned by increasing id and the first region to claim a neighbor wins it.
    BestFitting,
}

/// Changes between the parallelization schemas of the read-only phases of a pass.
///
/// Merge execution is always sequential. Both strategies produce identical graphs.
#[derive(Clone, PartialEq, Debug, Copy)]
pub enum ThreadingStrategy {
    /// No threading - useful for small images and for correctness checks.
    SingleThread,
    /// Cost refresh and best neighbor search are split over the `rayon` thread pool.
    Rayon,
}

/// Main config for the processing.
///
/// The homogeneity criterion carries its own parameters (see [`crate::criteria`]), this only
/// drives the merging loop.
#[derive(Clone, Debug)]
pub struct Config {
    /// Merge acceptance ceiling. A pair is merged only when its cost is lower or equal.
    ///
    /// Must be non-negative. The scale depends on the criterion, e.g. the Baatz & Schape
    /// criterion expects the square of its scale parameter.
    pub threshold: f32,
    /// Candidate selection heuristic.
    pub heuristic: Heuristic,
    /// Maximal number of passes. `None` runs until a pass performs no merge.
    pub max_iterations: Option<u32>,
    /// Threading strategy for cost refresh and candidate search.
    pub threading_strategy: ThreadingStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: 20f32,
            heuristic: Heuristic::LocalMutualBestFitting,
            max_iterations: None,
            threading_strategy: ThreadingStrategy::Rayon,
        }
    }
}

impl Config {
    /// Checks the configuration before any processing is done.
    pub fn validate(&self) -> Result<(), Error> {
        if self.threshold.is_nan() || self.threshold < 0.0 {
            return Err(Error::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Heuristic};
    use crate::error::Error;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.heuristic, Heuristic::LocalMutualBestFitting);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn negative_or_nan_threshold_is_rejected() {
        let config = Config {
            threshold: -0.5,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(Error::InvalidThreshold(-0.5)));
        let config = Config {
            threshold: f32::NAN,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidThreshold(t)) if t.is_nan()
        ));
        let config = Config {
            threshold: 0.0,
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }
}
