//! `shrinkkit-xlsx`: capture workbooks to JSON and rebuild them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use shrinkkit_io_xlsx::conf::{
    derive_default_batch_options, derive_default_capture_options, derive_default_rebuild_options,
};
use shrinkkit_io_xlsx::{
    EnumSheetNameConflictRule, SpecBatchOptions, SpecCaptureOptions, SpecDocument,
    SpecEncodeOptions, SpecRebuildOptions, batch_to_json, capture, decode_str, describe,
    json_to_excel, to_json,
};

#[derive(Parser)]
#[command(name = "shrinkkit-xlsx")]
#[command(version)]
#[command(about = "Capture xlsx structure to JSON and rebuild workbooks from it", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a workbook into wire JSON
    #[command(name = "to-json")]
    ToJson {
        /// Source workbook
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output JSON file (defaults to the input with a .json suffix)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,

        /// Skip row/column outline levels
        #[arg(long)]
        no_outline: bool,

        /// Skip cell styles
        #[arg(long)]
        no_styles: bool,

        /// Skip merged ranges
        #[arg(long)]
        no_merges: bool,
    },

    /// Rebuild a workbook from wire JSON
    #[command(name = "to-excel")]
    ToExcel {
        /// Wire JSON file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output workbook (defaults to the input with a .xlsx suffix)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Skip the grouping pass
        #[arg(long)]
        no_grouping: bool,

        /// Skip the formatting pass
        #[arg(long)]
        no_formatting: bool,

        /// How invalid or colliding sheet names are handled
        #[arg(long, value_enum, default_value = "fail")]
        sheet_name_conflict: SheetNameConflict,

        /// Excel number format for temporal cells
        #[arg(long, value_name = "FORMAT")]
        temporal_format: Option<String>,
    },

    /// Convert every matching workbook in a directory
    Batch {
        /// Source directory
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output directory
        #[arg(value_name = "DIR")]
        output: PathBuf,

        /// File name glob
        #[arg(long)]
        pattern: Option<String>,

        /// Maximum worker threads
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Write compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print a structure summary of a workbook or wire JSON file
    Inspect {
        /// Workbook or .json file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SheetNameConflict {
    /// Fail the offending sheet
    Fail,
    /// Sanitize and suffix the name
    Rename,
}

impl From<SheetNameConflict> for EnumSheetNameConflictRule {
    fn from(value: SheetNameConflict) -> Self {
        match value {
            SheetNameConflict::Fail => EnumSheetNameConflictRule::Fail,
            SheetNameConflict::Rename => EnumSheetNameConflictRule::Rename,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.to_string().to_lowercase()),
    )
    .format_timestamp(None)
    .init();
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::ToJson {
            input,
            output,
            compact,
            no_outline,
            no_styles,
            no_merges,
        } => {
            let path_out = output.unwrap_or_else(|| input.with_extension("json"));
            let spec_capture_options = SpecCaptureOptions {
                if_capture_outline: !no_outline,
                if_capture_styles: !no_styles,
                if_capture_merges: !no_merges,
            };
            let spec_encode_options = SpecEncodeOptions { if_pretty: !compact };
            let report = to_json(&input, &path_out, &spec_capture_options, &spec_encode_options)
                .map_err(|e| e.to_string())?;
            println!("{report}");
            Ok(())
        }
        Commands::ToExcel {
            input,
            output,
            no_grouping,
            no_formatting,
            sheet_name_conflict,
            temporal_format,
        } => {
            let path_out = output.unwrap_or_else(|| input.with_extension("xlsx"));
            let spec_default = derive_default_rebuild_options();
            let spec_rebuild_options = SpecRebuildOptions {
                if_apply_grouping: !no_grouping,
                if_apply_formatting: !no_formatting,
                rule_sheet_name_conflict: sheet_name_conflict.into(),
                temporal_num_format: temporal_format.unwrap_or(spec_default.temporal_num_format),
            };
            let report = json_to_excel(&input, &path_out, &spec_rebuild_options)
                .map_err(|e| e.to_string())?;
            println!("{report}");
            for failure in &report.sheets_failed {
                println!("  failed {failure}");
            }
            Ok(())
        }
        Commands::Batch {
            input,
            output,
            pattern,
            workers,
            compact,
        } => {
            let mut spec_batch_options = SpecBatchOptions {
                num_workers_max: workers,
                encode_options: SpecEncodeOptions { if_pretty: !compact },
                ..derive_default_batch_options()
            };
            if let Some(val) = pattern {
                spec_batch_options.pattern = val;
            }
            let report =
                batch_to_json(&input, &output, &spec_batch_options).map_err(|e| e.to_string())?;
            println!("{report}");
            for spec_error in &report.errors {
                println!("  error {}: {}", spec_error.path.display(), spec_error.exception);
            }
            if report.error_count() > 0 {
                return Err(format!("{} file(s) failed.", report.error_count()));
            }
            Ok(())
        }
        Commands::Inspect { input } => {
            let document = load_document(&input)?;
            let info = describe(&document);
            println!(
                "{} ({} sheet(s))",
                info.source_identifier, info.sheet_count
            );
            for sheet in &info.sheets {
                println!(
                    "  {:<31} {:>7} x {:<5} grouped={}r/{}c styled={} merged={}{}",
                    sheet.name,
                    sheet.n_rows,
                    sheet.n_cols,
                    sheet.n_rows_grouped,
                    sheet.n_cols_grouped,
                    sheet.n_cells_styled,
                    sheet.n_ranges_merged,
                    if sheet.is_visible { "" } else { " hidden" }
                );
            }
            Ok(())
        }
    }
}

/// Wire JSON is decoded; anything else is captured as a workbook.
fn load_document(path: &Path) -> Result<SpecDocument, String> {
    let if_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let (document, report) = if if_json {
        let c_text = std::fs::read_to_string(path)
            .map_err(|e| format!("I/O failed at {}: {e}", path.display()))?;
        decode_str(&c_text).map_err(|e| e.to_string())?
    } else {
        capture(path, &derive_default_capture_options()).map_err(|e| e.to_string())?
    };
    log::debug!("{report}");
    Ok(document)
}
