//! ChunkSeal 命令行入口
//!
//! 用法：
//!   chunkseal split <FILE> --chunk-size 3M [--out-dir DIR] [--scope whole-file|per-chunk]
//!   chunkseal join <CHUNK_DIR> [OUTPUT] [--scope whole-file|per-chunk]
//!
//! 口令默认通过无回显提示输入；所有实际逻辑都委托给库。

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use chunkseal::{
    ChainScope, JoinOptions, Progress, SplitOptions, default_destination, join_chunks,
    split_file,
};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{EnvFilter, fmt};
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "chunkseal")]
#[command(about = "Split a file into encrypted chunks and join them back")]
#[command(version)]
struct Cli {
    /// Verbose output (per-chunk debug logs)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Hide the progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into chunks and encrypt them
    #[command(alias = "s")]
    Split {
        /// File to split
        file: PathBuf,

        /// Chunk size in bytes, or with a K/M/G suffix (e.g. 3M)
        #[arg(long, short = 'c', value_parser = parse_size)]
        chunk_size: usize,

        /// Directory in which `<stem>_chunks` is created
        #[arg(long, short = 'o', default_value = ".")]
        out_dir: PathBuf,

        /// Cipher context scope
        #[arg(long, default_value = "whole-file", value_parser = parse_scope)]
        scope: ChainScope,

        /// Passphrase (prompted without echo when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Decrypt a chunk directory and join it into one file
    #[command(alias = "j")]
    Join {
        /// Directory produced by `split`
        chunk_dir: PathBuf,

        /// Output file (defaults to the directory name without `_chunks`)
        output: Option<PathBuf>,

        /// Cipher context scope; must match the one used for split
        #[arg(long, default_value = "whole-file", value_parser = parse_scope)]
        scope: ChainScope,

        /// Passphrase (prompted without echo when omitted)
        #[arg(long)]
        password: Option<String>,
    },
}

fn parse_scope(s: &str) -> Result<ChainScope, String> {
    s.parse()
}

/// 解析 `1048576` / `512K` / `3M` / `1GB` 形式的大小
fn parse_size(s: &str) -> Result<usize, String> {
    let lower = s.trim().to_ascii_lowercase();

    let (num, mult) = [
        ("kb", 1 << 10),
        ("k", 1 << 10),
        ("mb", 1 << 20),
        ("m", 1 << 20),
        ("gb", 1 << 30),
        ("g", 1 << 30),
    ]
    .into_iter()
    .find_map(|(suffix, mult)| lower.strip_suffix(suffix).map(|rest| (rest, mult)))
    .unwrap_or((lower.as_str(), 1usize));

    let n: usize = num
        .trim()
        .parse()
        .map_err(|_| format!("invalid size: {s}"))?;
    let size = n
        .checked_mul(mult)
        .ok_or_else(|| format!("size too large: {s}"))?;

    if size == 0 {
        return Err("chunk size must be greater than zero".to_string());
    }
    Ok(size)
}

fn read_passphrase(given: Option<String>, confirm: bool) -> Result<Zeroizing<String>> {
    if let Some(p) = given {
        return Ok(Zeroizing::new(p));
    }

    let first = Zeroizing::new(
        rpassword::prompt_password("Enter passphrase: ").context("failed to read passphrase")?,
    );

    if confirm {
        let second = Zeroizing::new(
            rpassword::prompt_password("Confirm passphrase: ")
                .context("failed to read passphrase")?,
        );
        if *first != *second {
            bail!("passphrases do not match");
        }
    }

    Ok(first)
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({percent}%) eta {eta} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}

fn report(pb: &ProgressBar) -> impl FnMut(&Progress) + '_ {
    move |p: &Progress| {
        pb.set_length(p.bytes_total.max(p.bytes_done));
        pb.set_position(p.bytes_done);
        pb.set_message(format!("chunk {}/{}", p.chunk_index + 1, p.chunk_count));
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Split {
            file,
            chunk_size,
            out_dir,
            scope,
            password,
        } => {
            let passphrase = read_passphrase(password, true)?;
            let pb = progress_bar(cli.quiet);

            let summary = split_file(
                &file,
                chunk_size,
                &out_dir,
                passphrase.as_bytes(),
                &SplitOptions { scope },
                report(&pb),
            )
            .with_context(|| format!("failed to split {}", file.display()))?;
            pb.finish_and_clear();

            println!(
                "Split {} bytes into {} encrypted chunks in {}",
                summary.total_bytes,
                summary.chunk_count,
                summary.chunk_dir.display()
            );
        }

        Commands::Join {
            chunk_dir,
            output,
            scope,
            password,
        } => {
            let output = match output {
                Some(path) => path,
                None => default_destination(&chunk_dir).ok_or_else(|| {
                    anyhow!(
                        "cannot infer output name from {}; pass OUTPUT explicitly",
                        chunk_dir.display()
                    )
                })?,
            };

            let passphrase = read_passphrase(password, false)?;
            let pb = progress_bar(cli.quiet);

            let summary = join_chunks(
                &chunk_dir,
                &output,
                passphrase.as_bytes(),
                &JoinOptions { scope },
                report(&pb),
            )
            .with_context(|| format!("failed to join {}", chunk_dir.display()))?;
            pb.finish_and_clear();

            println!(
                "Joined {} chunks into {} ({} bytes)",
                summary.chunk_count,
                output.display(),
                summary.total_bytes
            );
            if !summary.padding_valid {
                eprintln!(
                    "Warning: padding check failed; the passphrase or --scope is probably wrong and the output is likely corrupt"
                );
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chunkseal=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chunkseal=warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
