//! enctab command line driver.
//!
//! ```text
//! enctab generate <input> <output> [--lookup P] [--records P] [--strict] [--include-deprecated]
//! enctab validate <input> <output> [--format line|call] [--dialect nasm|gas] [--workers N]
//!                 [--max-cases N] [--no-decode-check]
//! ```
//!
//! `RUST_LOG` controls log verbosity.

use clap::{Args, Parser, Subcommand};
use enctab::core::{AsmDialect, BuildConfig, TargetArch, ValidationConfig};
use enctab::emit;
use enctab::pipeline::{build_table_from_json, validate_table, TableBuild};
use enctab::validate::{write_corpus, CorpusFormat, ExternalAssembler};
use log::{info, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "enctab", version, about = "x86-64 instruction-encoding table compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the encoding table from a descriptor database.
    Generate {
        #[command(flatten)]
        build: BuildArgs,
        /// Table rows output file.
        output: PathBuf,
        /// Also write the secondary lookup table.
        #[arg(long)]
        lookup: Option<PathBuf>,
        /// Also write intermediate variant records as JSON.
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Validate the table against a reference assembler and write a corpus.
    Validate {
        #[command(flatten)]
        build: BuildArgs,
        /// Corpus output file.
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = CorpusFormat::Line)]
        format: CorpusFormat,
        #[arg(long, value_enum)]
        dialect: Option<AsmDialect>,
        /// Upper bound on worker threads.
        #[arg(long)]
        workers: Option<usize>,
        /// Test cases taken from each table row at most.
        #[arg(long)]
        max_cases: Option<usize>,
        /// Skip decoding the assembler output with iced-x86.
        #[arg(long)]
        no_decode_check: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Descriptor database (JSON).
    input: PathBuf,
    /// Abort on the first record that fails to parse.
    #[arg(long)]
    strict: bool,
    /// Keep records flagged as deprecated.
    #[arg(long)]
    include_deprecated: bool,
    #[arg(long, value_enum)]
    target: Option<TargetArch>,
}

impl BuildArgs {
    fn config(&self) -> BuildConfig {
        let mut config = BuildConfig::from_env();
        config.strict |= self.strict;
        config.include_deprecated |= self.include_deprecated;
        if let Some(target) = self.target {
            config.target = target;
        }
        config
    }

    fn build(&self) -> Result<TableBuild, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(&self.input)
            .map_err(|e| format!("cannot read {}: {}", self.input.display(), e))?;
        let build = build_table_from_json(&text, &self.config())?;
        if !build.diagnostics.is_clean() {
            warn!("{}", build.diagnostics);
        }
        Ok(build)
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, Box<dyn std::error::Error>> {
    let file = File::create(path).map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    Ok(BufWriter::new(file))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            build,
            output,
            lookup,
            records,
        } => {
            let TableBuild { table, .. } = build.build()?;

            let mut out = create(&output)?;
            emit::write_table(&table, &mut out)?;
            out.flush()?;

            if let Some(path) = lookup {
                let mut out = create(&path)?;
                emit::write_lookup(&table, &mut out)?;
                out.flush()?;
            }
            if let Some(path) = records {
                let mut out = create(&path)?;
                emit::write_records(&table, &mut out)?;
                out.flush()?;
            }
            info!("wrote {} rows to {}", table.len(), output.display());
        }
        Command::Validate {
            build,
            output,
            format,
            dialect,
            workers,
            max_cases,
            no_decode_check,
        } => {
            let TableBuild { table, .. } = build.build()?;

            let mut config = ValidationConfig::from_env();
            if let Some(dialect) = dialect {
                config.set_dialect(dialect);
            }
            if workers.is_some() {
                config.max_workers = workers;
            }
            config.max_cases_per_variant = max_cases;
            config.decode_check &= !no_decode_check;

            let oracle = ExternalAssembler::new(&config);
            if !oracle.is_available() {
                return Err(format!(
                    "reference assembler '{}' is not available",
                    config.assembler.steps.first().map_or("", |s| s.program.as_str())
                )
                .into());
            }

            let results = validate_table(&table, &config, &oracle)?;
            let mut out = create(&output)?;
            let summary = write_corpus(&results, format, &mut out)?;
            out.flush()?;
            info!("{} -> {}", summary, output.display());
            if summary.failed() > 0 {
                warn!("{} of {} tests failed", summary.failed(), results.len());
            }
        }
    }
    Ok(())
}
