use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use rowql::{logging, parse_options, Config, FileFormats};
use rowql_core::{Query, Vars, WarningPolicy};

const DEFAULT_TO: &str = "csv";

#[derive(Parser, Debug)]
#[command(name = "rowql", version)]
#[command(about = "Run a SQL-shaped QUERY over CSV, JSON lines or text data", long_about = None)]
#[command(after_help = "\
QUERY:
  [ IMPORT module [ AS identifier ] [, ...] ]
  SELECT [ DISTINCT | PARTIALS ]
      [ * | expression [ AS output_column_name ] [, ...] ]
      [ FROM csv | json | text | expression [ EXPLODE path ] ]
      [ WHERE expression ]
      [ GROUP BY output_column_number | expression [, ...] ]
      [ ORDER BY output_column_number | expression
          [ ASC | DESC ] [ NULLS { FIRST | LAST } ] [, ...] ]
      [ LIMIT row_count ]
      [ OFFSET num_rows_to_skip ]
      [ TO csv | json | pretty | sql | memory ]")]
struct Args {
    /// The query to run
    query: String,

    /// Input option as 'option=value' (e.g. -Idelimiter=';' -Iheader=False)
    #[arg(short = 'I', value_name = "OPTION=VALUE")]
    input_opt: Vec<String>,

    /// Output option as 'option=value' (e.g. -Oheader=False)
    #[arg(short = 'O', value_name = "OPTION=VALUE")]
    output_opt: Vec<String>,

    /// Turn warnings into errors, or let them pass (default)
    #[arg(short = 'W', long = "warning-flag", value_parser = ["default", "error"])]
    warning_flag: Option<String>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Flush output after every row
    #[arg(short, long)]
    unbuffered: bool,

    /// Write output to FILE instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Config file (defaults to <config dir>/rowql/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose, args.quiet);

    if let Err(e) = run(args) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::load_or_default(args.config.as_deref())?;

    let warnings = match args.warning_flag.as_deref() {
        Some(flag) => WarningPolicy::from_flag(flag).unwrap_or_default(),
        None => config.warning_policy()?.unwrap_or_default(),
    };
    let default_to = config.default_to.as_deref().unwrap_or(DEFAULT_TO);

    let mut input_options = config.input_options.clone();
    input_options.extend(parse_options(&args.input_opt).map_err(anyhow::Error::msg)?);
    let mut output_options = config.output_options.clone();
    output_options.extend(parse_options(&args.output_opt).map_err(anyhow::Error::msg)?);

    let query = Query::with_options(&args.query, default_to, warnings)?;
    tracing::debug!(parsed = ?query.parsed(), "parsed query");

    let formats = FileFormats {
        warnings,
        output_path: args.output,
        unbuffered: args.unbuffered,
    };
    let (output, stats) = query.run_formats(Vars::new(), &formats, &input_options, &output_options)?;

    // `TO memory` from the command line prints the collected rows as JSON lines.
    if let Some(output) = output {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for row in output.to_objects() {
            serde_json::to_writer(&mut out, &row)?;
            writeln!(out)?;
        }
        out.flush().context("could not write output")?;
    }

    tracing::info!(rows_in = stats.rows_in, rows_out = stats.rows_out, "done");
    Ok(())
}
