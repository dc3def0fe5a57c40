use clap::{Parser, Subcommand};
use squish::batch::{self, BatchEvent};
use squish::config::{self, CONFIG_FILE_NAME, Config};
use squish::imaging::RustBackend;
use squish::{CancelToken, compress_file, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Flags shared by commands that compress images. Each overrides the config file.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Size budget per image, in KiB
    #[arg(long)]
    target_kb: Option<u64>,

    /// Report what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Keep each original as <file>.bak (never overwrites an existing backup)
    #[arg(long)]
    backup: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(kb) = self.target_kb {
            config.target_kb = kb;
        }
        config.output.dry_run |= self.dry_run;
        config.output.backup |= self.backup;
    }
}

#[derive(Parser)]
#[command(name = "squish")]
#[command(about = "Shrink uploaded images to fit a byte budget")]
#[command(long_about = "\
Shrink uploaded images to fit a byte budget

Every image larger than the budget is re-encoded as JPEG: quality is lowered
first, then the image is downscaled until it fits or the configured floors
are reached. Files are replaced in place under their original names.

Supported inputs: .jpg .jpeg .png .webp (transparency is flattened onto white)

Run 'squish gen-config' to generate a documented squish.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./squish.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every search attempt to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress every supported image under a directory, recursively
    Compress {
        /// Directory to walk
        #[arg(default_value = "frontend/uploads")]
        dir: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Parallel workers (clamped to the number of CPU cores)
        #[arg(long)]
        jobs: Option<usize>,

        /// Write per-file results and totals as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Compress a single image
    File {
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Print a stock squish.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Compress {
            dir,
            run,
            jobs,
            report,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            run.apply(&mut config);
            if let Some(n) = jobs {
                config.processing.max_processes = Some(n);
            }
            config.validate()?;
            let request = config.to_request();
            let threads = config::effective_threads(&config.processing);

            let cancel = CancelToken::new();
            install_interrupt_handler(&cancel)?;

            let (tx, rx) = std::sync::mpsc::channel::<BatchEvent>();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::compress_tree(
                &RustBackend::new(),
                &dir,
                &request,
                threads,
                &cancel,
                Some(tx),
            );
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let batch = result?;

            output::print_summary(&batch.summary, request.dry_run);
            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&batch)?;
                std::fs::write(&path, json)?;
            }
        }
        Command::File { path, run } => {
            let mut config = load_config(cli.config.as_deref())?;
            run.apply(&mut config);
            config.validate()?;
            let request = config.to_request();

            let cancel = CancelToken::new();
            install_interrupt_handler(&cancel)?;

            let result = compress_file(&RustBackend::new(), &path, &request, &cancel)?;
            output::print_file_report(&batch::FileReport {
                path,
                result,
                error: None,
            });
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays the per-file report.
///
/// `RUST_LOG` wins when set; otherwise `warn`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "squish=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// An explicit `--config` must exist; the implicit `./squish.toml` may not.
fn load_config(explicit: Option<&Path>) -> Result<Config, config::ConfigError> {
    match explicit {
        Some(path) => config::load_config(path, true),
        None => config::load_config(Path::new(CONFIG_FILE_NAME), false),
    }
}

/// First Ctrl-C stops new work; files already past their search still commit.
fn install_interrupt_handler(cancel: &CancelToken) -> Result<(), ctrlc::Error> {
    let cancel = cancel.clone();
    ctrlc::set_handler(move || {
        if !cancel.is_cancelled() {
            eprintln!("Interrupted, finishing in-flight files...");
        }
        cancel.cancel();
    })
}
