use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use isb_core::{BatchOptions, BlockTable, Mode, decode_file, encode_file, process_directory, words};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "isb")]
#[command(about = "ISB resource container (de|en)coder – CLI tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every .isb file in a directory to text
    Decode {
        input_dir: PathBuf,
        output_dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Encode every .txt file in a directory to ISB
    Encode {
        input_dir: PathBuf,
        output_dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Decode a single ISB file to text
    DecodeFile {
        /// Path to the ISB container
        input: PathBuf,

        /// Path to write the text form
        output: PathBuf,
    },

    /// Encode a single text file to ISB
    EncodeFile {
        /// Path to the text form
        input: PathBuf,

        /// Path to write the ISB container
        output: PathBuf,
    },

    /// Show the block table of an ISB file
    Info {
        /// Path to the ISB container
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "isb=debug,isb_core=debug"
    } else {
        "isb=info,isb_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Decode {
            input_dir,
            output_dir,
            recursive,
        } => cmd_batch(Mode::Decode, input_dir, output_dir, recursive),
        Commands::Encode {
            input_dir,
            output_dir,
            recursive,
        } => cmd_batch(Mode::Encode, input_dir, output_dir, recursive),
        Commands::DecodeFile { input, output } => cmd_decode_file(&input, &output),
        Commands::EncodeFile { input, output } => cmd_encode_file(&input, &output),
        Commands::Info { input } => cmd_info(&input),
    }
}

fn cmd_decode_file(input: &Path, output: &Path) -> Result<()> {
    let decoded = decode_file(input, output)
        .with_context(|| format!("Failed to decode: {}", input.display()))?;

    println!(
        "[ok] {} -> {} ({} blocks, {} warnings)",
        input.display(),
        output.display(),
        decoded.blocks,
        decoded.warnings.len()
    );

    Ok(())
}

fn cmd_encode_file(input: &Path, output: &Path) -> Result<()> {
    let encoded = encode_file(input, output)
        .with_context(|| format!("Failed to encode: {}", input.display()))?;

    println!(
        "[ok] {} -> {} ({} blocks, {} bytes, {} warnings)",
        input.display(),
        output.display(),
        encoded.blocks,
        encoded.bytes.len(),
        encoded.warnings.len()
    );

    Ok(())
}

fn cmd_batch(mode: Mode, input_dir: PathBuf, output_dir: PathBuf, recursive: bool) -> Result<()> {
    let opts = BatchOptions {
        mode,
        input_dir,
        output_dir,
        recursive,
    };

    let summary = process_directory(&opts)
        .with_context(|| format!("Failed to process: {}", opts.input_dir.display()))?;

    println!("\n=== Summary ===");
    println!("Processed: {}", summary.processed);
    println!("Failed:    {}", summary.failed.len());
    println!("Output:    {}", opts.output_dir.display());

    if !summary.failed.is_empty() {
        println!("\nFailed files:");
        for (path, err) in &summary.failed {
            println!("  - {}: {}", path.display(), err);
        }
        bail!("{} of {} file(s) failed", summary.failed.len(), summary.total());
    }

    Ok(())
}

fn cmd_info(input: &Path) -> Result<()> {
    let data =
        fs::read(input).with_context(|| format!("Failed to read: {}", input.display()))?;
    let buffer = words::from_bytes(&data)?;
    let table = BlockTable::parse(&buffer)?;

    println!("[info] len={} bytes, {} words", data.len(), buffer.len());
    println!(
        "[info] blocks={}  table at 0x{:x}",
        table.len(),
        table.table_start() * 4
    );

    for (i, range) in table.ranges().enumerate() {
        println!(
            "  {:>4}: 0x{:06x}..0x{:06x}  {}",
            i,
            range.start,
            range.end,
            if range.fits(buffer.len()) { "OK" } else { "OUT OF BOUNDS" }
        );
    }

    Ok(())
}
