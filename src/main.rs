use clap::{Parser, Subcommand};
use html_picture::process::Mode;
use html_picture::{config, imaging, output, picture, process};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "html-picture")]
#[command(about = "Rewrite <img> tags into <picture> elements with WebP sources")]
#[command(long_about = "\
Rewrite <img> tags into <picture> elements with WebP sources

Every <img> whose file can be found under public_dir is sniffed for its
real type. Unless that type is excluded, the element is replaced by

  <picture>
    <source srcset=\"{output_dir}/{dir}/{name}.webp\" type=\"image/webp\">
    <img src=\"{public_dir}/{dir}/{file}\" type=\"{mime}\">
  </picture>

and a WebP conversion is started in the background.

Project structure:

  src/
  ├── picture.toml            # Base config (optional)
  ├── index.html
  ├── gallery.html
  └── gallery.picture.toml    # Per-document override (optional)

Run 'html-picture gen-config' to generate a documented picture.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing HTML documents
    #[arg(long, default_value = "src", global = true)]
    source: PathBuf,

    /// Directory rewritten documents are written to
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Config file (default: <source>/picture.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log each image decision to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite a single document and print it to stdout
    Rewrite {
        /// HTML document to rewrite
        file: PathBuf,
    },
    /// Rewrite every document under --source into --output
    Build {
        /// Also write a JSON report of the batch
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Classify every image without converting or writing anything
    Check,
    /// Print a stock picture.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Rewrite { ref file } => {
            let site_config = load_site_config(&cli)?;
            let converter = imaging::detached_converter(
                site_config.converter.kind,
                &site_config.converter.cwebp_path,
            );
            let rewritten = picture::rewrite_file(file, &site_config.picture, converter.as_ref())?;
            print!("{}", rewritten.html);
            converter.wait_idle();
        }
        Command::Build { ref report } => {
            let site_config = load_site_config(&cli)?;
            init_thread_pool(&site_config.processing);
            let converter = imaging::detached_converter(
                site_config.converter.kind,
                &site_config.converter.cwebp_path,
            );

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_batch_event(&event);
                }
            });
            let result = process::build(
                &cli.source,
                &cli.output,
                &site_config.picture,
                converter.as_ref(),
                Some(tx),
            )?;
            printer.join().ok();

            output::print_batch_summary(&result, Mode::Rewrite);
            if let Some(path) = report {
                process::write_report(&result, path)?;
            }
            // Rewriting never waits on conversions; only the exit does.
            converter.wait_idle();
            exit_on_failures(&result);
        }
        Command::Check => {
            let site_config = load_site_config(&cli)?;
            init_thread_pool(&site_config.processing);

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_batch_event(&event);
                }
            });
            let result = process::check(&cli.source, &site_config.picture, Some(tx))?;
            printer.join().ok();

            output::print_batch_summary(&result, Mode::Check);
            exit_on_failures(&result);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr. `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "html_picture=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_site_config(cli: &Cli) -> Result<config::SiteConfig, config::ConfigError> {
    match &cli.config {
        Some(path) => config::load_config_file(path),
        None => config::load_config(&cli.source),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Failed documents were already reported; signal them through the exit code.
fn exit_on_failures(report: &process::BatchReport) {
    if !report.is_success() {
        let failed: Vec<&Path> = report.failures().map(|d| d.path.as_path()).collect();
        tracing::debug!(?failed, "batch finished with failures");
        std::process::exit(1);
    }
}
