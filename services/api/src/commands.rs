use crate::infra::parse_alias;
use clap::{ArgGroup, Args, ValueEnum};
use region_digest::config::AppConfig;
use region_digest::digest::{
    CsvLayerFile, DigestError, DigestOutcome, DigestRequest, DigestService, FieldAliases,
    JsonLayerFile, SizeGuardFlags, SummarizerStrategy,
};
use region_digest::error::AppError;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Fixed-section plain-text report
    #[default]
    Text,
    /// Typed summary and report as JSON
    Json,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "csv"])))]
pub(crate) struct DigestArgs {
    /// JSON file holding a layer array, `{ "layers": [...] }` or a single layer
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// CSV file read as one layer, one record per row
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
    /// Analysis type used to pick the metric field (e.g. strategic-analysis)
    #[arg(long)]
    pub(crate) analysis_type: String,
    /// Explicit metric field; wins when the records carry it
    #[arg(long)]
    pub(crate) target_field: Option<String>,
    /// Field alias as canonical=attribute (repeatable)
    #[arg(long = "alias", value_parser = parse_alias)]
    pub(crate) aliases: Vec<(String, String)>,
    /// Keep only records with these identifiers (repeatable)
    #[arg(long = "record-id")]
    pub(crate) record_ids: Vec<String>,
    /// Summarizer strategy (optimized or naive); defaults to DIGEST_STRATEGY
    #[arg(long)]
    pub(crate) strategy: Option<SummarizerStrategy>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub(crate) format: OutputFormat,
    /// Leave parks, forests, military land and similar areas out of the sample
    #[arg(long)]
    pub(crate) exclude_non_business_areas: bool,
    /// Skip the raw record ceiling for local files
    #[arg(long)]
    pub(crate) no_size_guard: bool,
}

impl DigestArgs {
    pub(crate) fn request(&self) -> DigestRequest {
        DigestRequest {
            layers: Vec::new(),
            analysis_type: self.analysis_type.clone(),
            target_field: self.target_field.clone(),
            field_aliases: self.aliases.iter().cloned().collect::<FieldAliases>(),
            record_ids: (!self.record_ids.is_empty()).then(|| self.record_ids.clone()),
            size_guard: SizeGuardFlags {
                skip: self.no_size_guard,
            },
            strategy: self.strategy,
            exclude_non_business_areas: self.exclude_non_business_areas,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ValidateArgs {
    /// File with the generated text to check
    #[arg(long)]
    pub(crate) generated: PathBuf,
    /// File with the summary report the text was generated from
    #[arg(long)]
    pub(crate) summary: PathBuf,
}

pub(crate) async fn run_digest(args: DigestArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?.digest;
    // local files are trusted; the request flag still has to ask for it
    config.allow_guard_bypass = true;
    let service = DigestService::new(config);
    let request = args.request();

    let outcome = match (args.input, args.csv) {
        (Some(path), _) => {
            service
                .digest_from_source(JsonLayerFile::new(path), request)
                .await?
        }
        (None, Some(path)) => {
            service
                .digest_from_source(CsvLayerFile::new(path), request)
                .await?
        }
        (None, None) => {
            return Err(DigestError::Validation {
                reason: "either --input or --csv is required".to_string(),
            }
            .into())
        }
    };

    print_outcome(&outcome, args.format)
}

fn print_outcome(outcome: &DigestOutcome, format: OutputFormat) -> Result<(), AppError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => write!(out, "{}", outcome.report)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, outcome).map_err(std::io::Error::from)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub(crate) async fn run_validate(args: ValidateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?.digest;
    let generated = tokio::fs::read_to_string(&args.generated).await?;
    let summary = tokio::fs::read_to_string(&args.summary).await?;

    let report = DigestService::new(config).validate(&generated, &summary);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &report).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}
