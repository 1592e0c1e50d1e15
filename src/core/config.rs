//! Build and validation configuration.
//!
//! Both configurations have sensible defaults, can be seeded from `ENCTAB_*`
//! environment variables, and are finally overridden by command line flags.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Architecture the table is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TargetArch {
    X86,
    #[default]
    X64,
}

impl TargetArch {
    /// Whether a record carrying `tag` belongs to this target.
    ///
    /// Untagged records and `ANY` belong to every target.
    pub fn accepts(self, tag: Option<&str>) -> bool {
        let Some(tag) = tag else { return true };
        match tag.to_ascii_uppercase().as_str() {
            "" | "ANY" => true,
            "X86" => self == TargetArch::X86,
            "X64" | "X86_64" | "AMD64" => self == TargetArch::X64,
            _ => true,
        }
    }
}

impl FromStr for TargetArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86" => Ok(TargetArch::X86),
            "x64" | "x86_64" => Ok(TargetArch::X64),
            _ => Err(format!("unknown target architecture '{s}'")),
        }
    }
}

/// Configuration of the table-building driver.
#[derive(Debug, Clone, Default)]
pub struct BuildConfig {
    /// Abort on the first record that fails to parse instead of skipping it.
    pub strict: bool,
    /// Keep records flagged as deprecated.
    pub include_deprecated: bool,
    pub target: TargetArch,
}

impl BuildConfig {
    /// Defaults overridden by `ENCTAB_STRICT`, `ENCTAB_INCLUDE_DEPRECATED`
    /// and `ENCTAB_TARGET`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(strict) = env_flag("ENCTAB_STRICT") {
            config.strict = strict;
        }
        if let Some(deprecated) = env_flag("ENCTAB_INCLUDE_DEPRECATED") {
            config.include_deprecated = deprecated;
        }
        if let Some(target) = env_parse::<TargetArch>("ENCTAB_TARGET") {
            config.target = target;
        }
        config
    }
}

/// Syntax flavour used to render test instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AsmDialect {
    #[default]
    Nasm,
    Gas,
}

impl FromStr for AsmDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nasm" => Ok(AsmDialect::Nasm),
            "gas" | "as" => Ok(AsmDialect::Gas),
            _ => Err(format!("unknown assembler dialect '{s}'")),
        }
    }
}

/// One subprocess of the assembler pipeline.
///
/// Arguments may contain the placeholders `{src}`, `{obj}` and `{bin}`,
/// which are replaced by the worker's scratch paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandStep {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Command pipeline turning `{src}` into raw instruction bytes at `{bin}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerCommand {
    pub steps: Vec<CommandStep>,
}

impl AssemblerCommand {
    pub fn nasm() -> Self {
        Self {
            steps: vec![CommandStep::new("nasm", &["-f", "bin", "-o", "{bin}", "{src}"])],
        }
    }

    pub fn gas() -> Self {
        Self {
            steps: vec![
                CommandStep::new("as", &["--64", "-o", "{obj}", "{src}"]),
                CommandStep::new("objcopy", &["-O", "binary", "-j", ".text", "{obj}", "{bin}"]),
            ],
        }
    }

    pub fn for_dialect(dialect: AsmDialect) -> Self {
        match dialect {
            AsmDialect::Nasm => Self::nasm(),
            AsmDialect::Gas => Self::gas(),
        }
    }
}

/// Configuration of an oracle validation run.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub dialect: AsmDialect,
    pub assembler: AssemblerCommand,
    /// Upper bound on workers; `None` uses hardware parallelism minus one.
    pub max_workers: Option<usize>,
    /// Never start a worker for fewer tests than this.
    pub min_tests_per_worker: usize,
    /// Exit codes meaning "the assembler rejected the instruction".
    pub rejection_codes: Vec<i32>,
    /// Directory under which every worker creates its own scratch directory.
    pub scratch_root: PathBuf,
    /// Decode oracle bytes with iced-x86 and compare them to the table row.
    pub decode_check: bool,
    /// Take at most this many cases from each variant's combinations.
    pub max_cases_per_variant: Option<usize>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            dialect: AsmDialect::Nasm,
            assembler: AssemblerCommand::nasm(),
            max_workers: None,
            min_tests_per_worker: 1,
            rejection_codes: vec![1],
            scratch_root: env::temp_dir(),
            decode_check: true,
            max_cases_per_variant: None,
        }
    }
}

impl ValidationConfig {
    /// Defaults overridden by `ENCTAB_DIALECT`, `ENCTAB_WORKERS` and
    /// `ENCTAB_SCRATCH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dialect) = env_parse::<AsmDialect>("ENCTAB_DIALECT") {
            config.set_dialect(dialect);
        }
        if let Some(workers) = env_parse::<usize>("ENCTAB_WORKERS") {
            config.max_workers = Some(workers.max(1));
        }
        if let Ok(scratch) = env::var("ENCTAB_SCRATCH") {
            config.scratch_root = PathBuf::from(scratch);
        }
        config
    }

    /// Switch dialect together with the matching default assembler pipeline.
    pub fn set_dialect(&mut self, dialect: AsmDialect) {
        self.dialect = dialect;
        self.assembler = AssemblerCommand::for_dialect(dialect);
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        other => {
            log::warn!("ignoring {name}={other}: expected a boolean");
            None
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("ignoring unparsable {name}={value}");
            None
        }
    }
}
