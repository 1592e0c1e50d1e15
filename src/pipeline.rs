// This module is the top-level driver. Table construction walks the descriptor records in
// database order, drops the ones the configuration filters out, parses the encoding and operand
// halves of the rest, offers every expanded operand tuple to the variant selector and finally
// orders and links the survivors into an EncodingTable. A record that fails to parse is skipped
// and logged unless the configuration is strict, in which case the first failure aborts the
// build. Validation generates the test cases of a finished table and runs them through a pool.

//! Table-building and validation drivers.

use crate::core::config::{BuildConfig, ValidationConfig};
use crate::core::diagnostics::{Diagnostics, SkippedRecord};
use crate::core::error::{PoolResult, TableError, TableResult};
use crate::encoding::{expand_operands, EncodingDescriptor};
use crate::isa::record::{DescriptorDatabase, RawInstructionRecord};
use crate::table::{EncodingTable, VariantSelector};
use crate::validate::{generate_cases, Oracle, OracleResult, ValidationPool};
use log::{debug, info, trace, warn};

/// A built table together with what was dropped on the way.
#[derive(Debug, Clone)]
pub struct TableBuild {
    pub table: EncodingTable,
    pub diagnostics: Diagnostics,
}

/// Build a table from the JSON text of a descriptor database.
pub fn build_table_from_json(text: &str, config: &BuildConfig) -> TableResult<TableBuild> {
    let db = DescriptorDatabase::from_json(text)?;
    build_table(&db, config)
}

/// Build a table from a decoded descriptor database.
pub fn build_table(db: &DescriptorDatabase, config: &BuildConfig) -> TableResult<TableBuild> {
    let mut diagnostics = Diagnostics::new();
    let mut records = Vec::new();
    for record in db.records() {
        match record {
            Ok(record) => records.push(record),
            Err(skipped) => reject(skipped, config, &mut diagnostics)?,
        }
    }
    build_from_records(records, config, diagnostics)
}

/// Build a table from already split records, continuing `diagnostics`.
pub fn build_from_records(
    records: impl IntoIterator<Item = RawInstructionRecord>,
    config: &BuildConfig,
    mut diagnostics: Diagnostics,
) -> TableResult<TableBuild> {
    let mut selector = VariantSelector::new();

    for record in records {
        if record.deprecated && !config.include_deprecated {
            trace!("filtered deprecated '{}'", record.inst());
            diagnostics.filtered();
            continue;
        }
        if !config.target.accepts(record.arch.as_deref()) {
            trace!("filtered '{}' for {:?}", record.inst(), config.target);
            diagnostics.filtered();
            continue;
        }

        let parsed = EncodingDescriptor::parse(&record.encoding).and_then(|descriptor| {
            expand_operands(&record.operands, &mut diagnostics).map(|tuples| (descriptor, tuples))
        });
        match parsed {
            Ok((descriptor, tuples)) => {
                for operands in tuples {
                    selector.offer(&record.name, operands, &descriptor);
                }
            }
            Err(error) => {
                let skipped = SkippedRecord {
                    inst: record.inst(),
                    encoding: record.encoding.clone(),
                    error,
                };
                reject(skipped, config, &mut diagnostics)?;
            }
        }
    }

    debug!(
        "selected {} variants from {} candidates",
        selector.len(),
        selector.offered()
    );
    let table = EncodingTable::build(selector.finish())?;
    info!("built table with {} rows ({})", table.len(), diagnostics);
    Ok(TableBuild { table, diagnostics })
}

/// Skip a record that failed to parse, or abort when strict.
fn reject(
    skipped: SkippedRecord,
    config: &BuildConfig,
    diagnostics: &mut Diagnostics,
) -> TableResult<()> {
    if config.strict {
        return Err(TableError::Parse {
            record: skipped.inst,
            source: skipped.error,
        });
    }
    warn!("skipping '{}' [{}]: {}", skipped.inst, skipped.encoding, skipped.error);
    diagnostics.skip(skipped);
    Ok(())
}

/// Generate every test case of `table` and run them through `oracle`.
pub fn validate_table(
    table: &EncodingTable,
    config: &ValidationConfig,
    oracle: &dyn Oracle,
) -> PoolResult<Vec<OracleResult>> {
    let cases = generate_cases(table, config.dialect, config.max_cases_per_variant);
    debug!("generated {} test cases for {} rows", cases.len(), table.len());
    ValidationPool::new(oracle, config).run(&cases)
}
