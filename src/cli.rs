use crate::{
    constants::*,
    core::locus_shards::GrowthPolicy,
    io::writer::{OutputFormat, WriterOptions},
    utils::util::Result,
};
use chrono::Datelike;
use clap::{ArgAction, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// Full version string including the crate version and git description.
///
/// # Examples
/// * `0.1.0-1ba958a-dirty` - while on a dirty branch
/// * `0.1.0-1ba958a` - with a fresh commit
pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    let git_describe = env!("VERGEN_GIT_DESCRIBE");
    if git_describe.is_empty() {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        format!("{}-{}", env!("CARGO_PKG_VERSION"), git_describe)
    }
});

#[derive(Parser, Debug)]
#[command(name="vcfx",
          author="Tom Mokveld <tmokveld@pacificbiosciences.com>",
          version=&**FULL_VERSION,
          about="Variant record writer for VCF text and XML",
          long_about = None,
          after_help = format!("Copyright (C) 2004-{}     Pacific Biosciences of California, Inc.
          This program comes with ABSOLUTELY NO WARRANTY; it is intended for
          Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{author}{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Convert(ConvertArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Convert(_) => "convert",
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(arg_required_else_help(true))]
pub struct ConvertArgs {
    /// VCF or BCF file to read
    #[arg(
        short = 'i',
        long = "input",
        value_name = "VCF",
        value_parser = check_file_exists
    )]
    pub input: PathBuf,

    /// Write output to a file [default: standard output]
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        value_parser = check_prefix_path
    )]
    pub output: Option<PathBuf>,

    /// Output type: v|x, v: VCF text, x: XML [default: inferred from the output extension]
    #[arg(
        short = 'O',
        long = "output-type",
        value_name = "OUTPUT_TYPE",
        value_parser = validate_output_type
    )]
    pub output_type: Option<OutputFormat>,

    /// Write records whose INFO, FORMAT or FILTER keys are not declared in the header
    #[arg(long = "lenient", default_value_t = DEFAULT_LENIENT)]
    pub lenient: bool,

    /// Drop samples and genotype columns from the output
    #[arg(long = "sites-only", default_value_t = DEFAULT_SITES_ONLY)]
    pub sites_only: bool,

    /// Decode genotypes into calls and values instead of passing them through as text
    #[arg(long = "decode-genotypes", default_value_t = DEFAULT_DECODE_GENOTYPES)]
    pub decode_genotypes: bool,

    /// Initial number of loci per shard in the shard plan
    #[arg(
        long = "shard-size",
        value_name = "LOCI",
        default_value_t = DEFAULT_SHARD_SIZE,
        value_parser = shard_size_in_range,
        help_heading = "Advanced"
    )]
    pub shard_size: u64,

    /// Shard growth policy: linear|exponential
    #[arg(
        long = "shard-growth",
        value_name = "POLICY",
        default_value = "linear",
        value_parser = parse_growth_policy,
        help_heading = "Advanced"
    )]
    pub shard_growth: GrowthPolicy,
}

impl ConvertArgs {
    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions::new().with(|o| {
            o.sites_only = self.sites_only;
            o.allow_missing_fields_in_header = self.lenient;
        })
    }
}

/// Initializes the verbosity level for logging based on the command-line arguments.
///
/// Sets up the logger with a specific verbosity level that is determined
/// by the number of occurrences of the `-v` or `--verbose` flag in the command-line arguments.
pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.module_path().unwrap_or("unknown_module"),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

/// Checks if the provided file path exists.
fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(crate::vcfx_error!("File does not exist: {}", path.display()));
    }
    Ok(path.to_path_buf())
}

fn check_prefix_path(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(crate::vcfx_error!(
                "Path does not exist: {}",
                parent_dir.display()
            ));
        }
    }
    Ok(path.to_path_buf())
}

fn shard_size_in_range(s: &str) -> Result<u64> {
    let size: u64 = s
        .parse::<u64>()
        .map_err(|_| crate::vcfx_error!("`{}` is not a valid shard size", s))?;
    if size == 0 {
        return Err(crate::vcfx_error!("Shard size must be >= 1"));
    }
    Ok(size)
}

fn parse_growth_policy(s: &str) -> Result<GrowthPolicy> {
    s.parse()
}

fn validate_output_type(s: &str) -> Result<OutputFormat> {
    match s {
        "v" => Ok(OutputFormat::Vcf),
        "x" => Ok(OutputFormat::Xml),
        _ => Err(crate::vcfx_error!(
            "Invalid output type: {}. Must be one of v, x.",
            s
        )),
    }
}
