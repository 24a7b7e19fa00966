//! Stratified measure aggregation
//!
//! For every declared measure the records are partitioned by the tuple of
//! group-by values, and each group gets a denominator count (records whose
//! denominator flag is set), a numerator count (records whose numerator and
//! denominator flags are both set) and the rate between them.
//!
//! The call is all-or-nothing: definitions are validated first, then every
//! record is checked for every referenced attribute, and only then is
//! anything counted.

use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::config::AggregatorConfig;
use crate::error::{Result, StudyError};
use crate::models::{
    Counts, GroupKey, MeasureDefinition, MeasureResult, PatientRecord, validate_definitions,
};

type GroupCounts = FxHashMap<GroupKey, Counts>;

/// Compute every measure over `records` with the default configuration
///
/// Results are ordered by group key (numbers numerically, strings lexically,
/// missing values last); rows with equal keys follow definition order.
pub fn compute(
    records: &[PatientRecord],
    definitions: &[MeasureDefinition],
) -> Result<Vec<MeasureResult>> {
    compute_with_config(records, definitions, &AggregatorConfig::default())
}

/// Compute every measure over `records`
pub fn compute_with_config(
    records: &[PatientRecord],
    definitions: &[MeasureDefinition],
    config: &AggregatorConfig,
) -> Result<Vec<MeasureResult>> {
    validate_definitions(definitions)?;
    check_attributes(records, definitions)?;

    let parallel = records.len() >= config.parallel_threshold && config.worker_count() > 1;
    let tallies: Vec<GroupCounts> = if parallel {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_count())
            .build()
            .map_err(|e| StudyError::ThreadPool(e.to_string()))?;
        debug!(
            "Counting {} records on {} workers",
            records.len(),
            config.worker_count()
        );
        pool.install(|| {
            definitions
                .iter()
                .map(|definition| count_groups_parallel(records, definition))
                .collect()
        })
    } else {
        definitions
            .iter()
            .map(|definition| count_groups(records, definition))
            .collect()
    };

    let mut rows = Vec::new();
    for (index, (definition, groups)) in definitions.iter().zip(tallies).enumerate() {
        let unmatched: u64 = groups.values().map(|c| c.unmatched_numerator).sum();
        if unmatched > 0 && config.warn_on_unmatched_numerator {
            warn!(
                "Measure {}: {unmatched} records have '{}' set but not '{}'; they are not counted",
                definition.id, definition.numerator, definition.denominator
            );
        }
        debug!("Measure {}: {} groups", definition.id, groups.len());
        rows.extend(
            groups
                .into_iter()
                .map(|(key, counts)| (index, MeasureResult::new(definition, key, counts))),
        );
    }

    info!(
        "Computed {} measures over {} records ({} result rows)",
        definitions.len(),
        records.len(),
        rows.len()
    );

    Ok(rows
        .into_iter()
        .sorted_by(|(ia, a), (ib, b)| a.group_key.cmp(&b.group_key).then(ia.cmp(ib)))
        .map(|(_, row)| row)
        .collect())
}

/// Fail on the first record lacking an attribute some definition references
///
/// Definitions are checked in declaration order, records in input order.
pub fn check_attributes(
    records: &[PatientRecord],
    definitions: &[MeasureDefinition],
) -> Result<()> {
    for definition in definitions {
        for record in records {
            if let Some(attribute) = definition
                .required_attributes()
                .find(|attribute| !record.has(attribute))
            {
                return Err(StudyError::missing_attribute(
                    &definition.id,
                    record.patient_id,
                    attribute,
                ));
            }
        }
    }
    Ok(())
}

fn group_key(record: &PatientRecord, definition: &MeasureDefinition) -> GroupKey {
    definition
        .group_by
        .iter()
        .map(|attribute| record.get(attribute).cloned().unwrap_or_default())
        .collect()
}

fn tally(groups: &mut GroupCounts, record: &PatientRecord, definition: &MeasureDefinition) {
    let counts = groups.entry(group_key(record, definition)).or_default();
    let eligible = record.flag(&definition.denominator);
    let hit = record.flag(&definition.numerator);
    match (eligible, hit) {
        (true, true) => {
            counts.denominator += 1;
            counts.numerator += 1;
        }
        (true, false) => counts.denominator += 1,
        (false, true) => counts.unmatched_numerator += 1,
        (false, false) => {}
    }
}

fn count_groups(records: &[PatientRecord], definition: &MeasureDefinition) -> GroupCounts {
    let mut groups = GroupCounts::default();
    for record in records {
        tally(&mut groups, record, definition);
    }
    groups
}

fn count_groups_parallel(records: &[PatientRecord], definition: &MeasureDefinition) -> GroupCounts {
    records
        .par_iter()
        .fold(GroupCounts::default, |mut groups, record| {
            tally(&mut groups, record, definition);
            groups
        })
        .reduce(GroupCounts::default, merge_group_counts)
}

/// Merge two partial tallies by adding counts group by group
fn merge_group_counts(a: GroupCounts, b: GroupCounts) -> GroupCounts {
    let (mut into, from) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    for (key, counts) in from {
        into.entry(key).or_default().merge(counts);
    }
    into
}
