//! Configuration for measure aggregation and study runs.

use std::fmt;
use std::path::PathBuf;

/// Attribute that marks cohort membership
pub const DEFAULT_POPULATION_ATTRIBUTE: &str = "population";

/// Column holding the patient identifier in extracted files
pub const DEFAULT_ID_COLUMN: &str = "patient_id";

/// Configuration for the measure aggregator
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Record count from which counting is split across a rayon pool
    pub parallel_threshold: usize,
    /// Number of counting workers; `None` uses one per CPU
    pub workers: Option<usize>,
    /// Attribute written by cohort selection and used as the default denominator
    pub population_attribute: String,
    /// Log a warning when numerator flags are set outside the denominator
    pub warn_on_unmatched_numerator: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 100_000,
            workers: None,
            population_attribute: DEFAULT_POPULATION_ATTRIBUTE.to_string(),
            warn_on_unmatched_numerator: true,
        }
    }
}

impl AggregatorConfig {
    /// Sequential counting regardless of input size
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel_threshold: usize::MAX,
            ..Self::default()
        }
    }

    /// Effective worker count
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

impl fmt::Display for AggregatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Aggregator Configuration:")?;
        writeln!(f, "  Parallel Threshold: {}", self.parallel_threshold)?;
        writeln!(f, "  Workers: {}", self.worker_count())?;
        writeln!(f, "  Population Attribute: {}", self.population_attribute)?;
        writeln!(
            f,
            "  Warn On Unmatched Numerator: {}",
            self.warn_on_unmatched_numerator
        )
    }
}

/// Configuration for a full study run from files
#[derive(Debug, Clone)]
pub struct StudyConfig {
    /// Aggregation settings
    pub aggregator: AggregatorConfig,
    /// Name of the patient identifier column in the input
    pub id_column: String,
    /// Directory receiving one `measure_<id>.csv` per measure
    pub output_dir: PathBuf,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            aggregator: AggregatorConfig::default(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl fmt::Display for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.aggregator)?;
        writeln!(f, "  Id Column: {}", self.id_column)?;
        writeln!(f, "  Output Directory: {}", self.output_dir.display())
    }
}
