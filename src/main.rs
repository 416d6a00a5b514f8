use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use adl2gestalt::{convert_with, emit_with, load, Adl2GestaltError, ConvertOptions};
use clap::Parser;

/// Convert a MEDM ADL display into a Gestalt YAML layout
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// ADL file to convert
    input: PathBuf,

    /// Output file; defaults to the input with a `.yml` extension
    output: Option<PathBuf>,

    /// JSON file overriding the conversion options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the parsed widget tree as JSON instead of converting
    #[arg(long)]
    dump_tree: bool,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Convert(#[from] Adl2GestaltError),
    #[error("Could not read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Bad config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Could not write {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not serialize the tree: {0}")]
    Dump(#[from] serde_json::Error),
}

fn read_options(path: &Path) -> Result<ConvertOptions, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn run(args: Args) -> Result<(), CliError> {
    let options = match &args.config {
        Some(path) => read_options(path)?,
        None => ConvertOptions::default(),
    };

    log::info!("Loading {}", args.input.display());
    let tree = load(&args.input)?;
    if args.dump_tree {
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }

    let conversion = convert_with(&tree, &options)?;
    let output = emit_with(&conversion.forest, &conversion.colors, &options);

    let output_name = args
        .output
        .unwrap_or_else(|| args.input.with_extension("yml"));
    log::info!("Saving {}", output_name.display());
    std::fs::write(&output_name, output).map_err(|source| CliError::Write {
        path: output_name.clone(),
        source,
    })?;
    if conversion.diagnostics.is_empty() {
        log::info!("Converted {}", args.input.display());
    } else {
        log::info!(
            "Converted {} with {} warnings",
            args.input.display(),
            conversion.diagnostics.len()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbosity.into())
        .init();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
