//! JSON study and measure definitions

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::algorithm::population::StudyDefinition;
use crate::error::Result;
use crate::models::{MeasureDefinition, validate_definitions};

/// Load a study definition from a JSON file
///
/// The definition is parsed only; validation happens when the study runs.
pub fn load_study_definition(path: &Path) -> Result<StudyDefinition> {
    let reader = BufReader::new(File::open(path)?);
    let study: StudyDefinition = serde_json::from_reader(reader)?;
    log::info!("Loaded study '{}' from {}", study.name, path.display());
    Ok(study)
}

/// Write a study definition as pretty-printed JSON
pub fn save_study_definition(study: &StudyDefinition, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, study)?;
    writer.flush()?;
    log::info!("Saved study '{}' to {}", study.name, path.display());
    Ok(())
}

/// Load and validate a JSON array of measure definitions
pub fn load_measure_definitions(path: &Path) -> Result<Vec<MeasureDefinition>> {
    let reader = BufReader::new(File::open(path)?);
    let definitions: Vec<MeasureDefinition> = serde_json::from_reader(reader)?;
    validate_definitions(&definitions)?;
    log::info!(
        "Loaded {} measure definitions from {}",
        definitions.len(),
        path.display()
    );
    Ok(definitions)
}
