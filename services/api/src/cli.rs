use crate::commands::{run_digest, run_validate, DigestArgs, ValidateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use region_digest::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "region-digest",
    about = "Summarize large geographic record layers into bounded, text-ready digests",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Digest a JSON or CSV layer file and print the summary
    Digest(DigestArgs),
    /// Check generated text against the summary it was produced from
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Digest(args) => run_digest(args).await,
        Command::Validate(args) => run_validate(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::OutputFormat;
    use region_digest::digest::SummarizerStrategy;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["region-digest"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn digest_arguments_parse() {
        let cli = Cli::try_parse_from([
            "region-digest",
            "digest",
            "--csv",
            "zips.csv",
            "--analysis-type",
            "strategic-analysis",
            "--alias",
            "strategic_analysis_score=sas",
            "--alias",
            "total_population=POP",
            "--strategy",
            "naive",
            "--format",
            "json",
            "--no-size-guard",
        ])
        .expect("parses");

        let Some(Command::Digest(args)) = cli.command else {
            panic!("expected digest command");
        };
        assert_eq!(args.aliases.len(), 2);
        assert_eq!(args.strategy, Some(SummarizerStrategy::Naive));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.no_size_guard);

        let request = args.request();
        assert_eq!(request.field_aliases.get("total_population"), Some("POP"));
        assert!(request.size_guard.skip);
    }

    #[test]
    fn digest_requires_exactly_one_input() {
        assert!(Cli::try_parse_from(["region-digest", "digest", "--analysis-type", "x"]).is_err());
        assert!(Cli::try_parse_from([
            "region-digest",
            "digest",
            "--input",
            "a.json",
            "--csv",
            "b.csv",
            "--analysis-type",
            "x",
        ])
        .is_err());
    }

    #[test]
    fn malformed_alias_is_rejected() {
        assert!(Cli::try_parse_from([
            "region-digest",
            "digest",
            "--input",
            "a.json",
            "--analysis-type",
            "x",
            "--alias",
            "missing-equals",
        ])
        .is_err());
    }
}
