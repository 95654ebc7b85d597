use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use dataset_zoo::app::{App, ConvertRequest, DownloadOptions, ProgressSinkKind};
use dataset_zoo::cifar::Split;
use dataset_zoo::config::{ConfigLoader, ResolvedConfig};
use dataset_zoo::convert::{ConversionReport, IndexOverflow};
use dataset_zoo::error::ZooError;
use dataset_zoo::output::{JsonOutput, OutputMode};
use dataset_zoo::remote::HttpRemoteClient;
use dataset_zoo::store::Store;
use dataset_zoo::tui::Tui;
use dataset_zoo::zoo::ZooRegistry;

#[derive(Parser)]
#[command(name = "dzoo")]
#[command(about = "Dataset zoo installer and CIFAR-100 image folder converter")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Manage prepackaged zoo datasets")]
    Zoo(ZooArgs),
    #[command(about = "Convert CIFAR-100 into a label-keyed image folder")]
    Convert(ConvertArgs),
}

#[derive(Args)]
struct ZooArgs {
    #[command(subcommand)]
    command: ZooCommand,
}

#[derive(Subcommand)]
enum ZooCommand {
    #[command(about = "List built-in datasets")]
    Available,
    #[command(about = "List downloaded datasets")]
    List,
    #[command(about = "Download and prepare a dataset")]
    Download(DownloadArgs),
    #[command(about = "Show info for a downloaded dataset")]
    Info(NameArgs),
    #[command(about = "Delete a downloaded dataset")]
    Delete(NameArgs),
}

#[derive(Args)]
struct DownloadArgs {
    name: String,

    #[arg(long)]
    force: bool,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct NameArgs {
    name: String,
}

#[derive(Args)]
struct ConvertArgs {
    /// Output data directory; must be empty or absent.
    #[arg(long)]
    out: PathBuf,

    /// Where the CIFAR-100 binary release is cached (defaults to the zoo directory).
    #[arg(long)]
    root: Option<PathBuf>,

    #[arg(long)]
    split: Option<Split>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    noise_rate: Option<f64>,

    #[arg(long)]
    index_overflow: Option<IndexOverflow>,

    #[arg(long)]
    jpeg_quality: Option<u8>,

    /// Also write fine/coarse label files next to the images.
    #[arg(long)]
    labels: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ZooError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ZooError) -> u8 {
    match error {
        ZooError::UnknownDataset(_)
        | ZooError::NotDownloaded(_)
        | ZooError::DirectoryNotEmpty(_)
        | ZooError::InvalidOption(_)
        | ZooError::ConfigRead(_)
        | ZooError::ConfigParse(_) => 2,
        ZooError::Download(_)
        | ZooError::DownloadStatus { .. }
        | ZooError::ChecksumMismatch { .. }
        | ZooError::Extraction(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    let store = match &resolved.zoo_dir {
        Some(dir) => Store::new_with_root(dir.clone()),
        None => Store::new()?,
    };
    let registry = ZooRegistry::builtin()?;
    let remote = HttpRemoteClient::new()?;
    let app = App::new(store, registry, remote);

    match cli.command {
        Commands::Zoo(args) => run_zoo(args.command, app, output_mode),
        Commands::Convert(args) => run_convert(args, &resolved, app, output_mode),
    }
}

fn run_zoo(
    command: ZooCommand,
    app: App<HttpRemoteClient>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    match command {
        ZooCommand::Available => {
            let result = app.available();
            match output_mode {
                OutputMode::NonInteractive => {
                    JsonOutput::print_available(&result).into_diagnostic()
                }
                OutputMode::Interactive => {
                    for entry in &result.datasets {
                        let mark = if entry.downloaded { "downloaded" } else { "-" };
                        println!("{:<20} {mark}", entry.name);
                    }
                    Ok(())
                }
            }
        }
        ZooCommand::List => match output_mode {
            OutputMode::NonInteractive => {
                let result = app.list(&JsonOutput)?;
                JsonOutput::print_list(&result).into_diagnostic()
            }
            OutputMode::Interactive => {
                let mut tui = Tui::new(ProgressSinkKind::List);
                let result = tui.run(move |sink| app.list(sink))?;
                if result.datasets.is_empty() {
                    println!("no datasets downloaded");
                }
                for info in &result.datasets {
                    println!(
                        "{:<20} {:>8} samples  {}",
                        info.name, info.num_samples, info.dataset_dir
                    );
                }
                Ok(())
            }
        },
        ZooCommand::Download(args) => {
            let options = DownloadOptions {
                force: args.force,
                dry_run: args.dry_run,
            };
            match output_mode {
                OutputMode::NonInteractive => {
                    let result = app.download(&args.name, options, &JsonOutput)?;
                    JsonOutput::print_download(&result).into_diagnostic()
                }
                OutputMode::Interactive => {
                    let mut tui = Tui::new(ProgressSinkKind::Download);
                    let name = args.name;
                    let result = tui.run(move |sink| app.download(&name, options, sink))?;
                    let green = "\x1b[32m";
                    let reset = "\x1b[0m";
                    println!(
                        "{green}{} {} -> {}{reset}",
                        result.action, result.name, result.dataset_dir
                    );
                    if let Some(descriptor) = &result.descriptor {
                        println!("   samples: {}", descriptor.num_samples);
                        if let Some(classes) = &descriptor.classes {
                            println!("   classes: {}", classes.join(", "));
                        }
                    }
                    Ok(())
                }
            }
        }
        ZooCommand::Info(args) => match output_mode {
            OutputMode::NonInteractive => {
                let result = app.info(&args.name, &JsonOutput)?;
                JsonOutput::print_info(&result).into_diagnostic()
            }
            OutputMode::Interactive => {
                let mut tui = Tui::new(ProgressSinkKind::Info);
                let name = args.name;
                let info = tui.run(move |sink| app.info(&name, sink))?;
                println!("name:          {}", info.name);
                println!("format:        {}", info.format);
                println!("samples:       {}", info.num_samples);
                println!("dataset dir:   {}", info.dataset_dir);
                println!("downloaded at: {}", info.downloaded_at);
                if let Some(classes) = &info.classes {
                    println!("classes:       {}", classes.join(", "));
                }
                Ok(())
            }
        },
        ZooCommand::Delete(args) => match output_mode {
            OutputMode::NonInteractive => {
                let result = app.delete(&args.name, &JsonOutput)?;
                JsonOutput::print_delete(&result).into_diagnostic()
            }
            OutputMode::Interactive => {
                let mut tui = Tui::new(ProgressSinkKind::Delete);
                let name = args.name;
                let result = tui.run(move |sink| app.delete(&name, sink))?;
                if result.deleted {
                    println!("deleted {}", result.name);
                } else {
                    println!("{} was not downloaded", result.name);
                }
                Ok(())
            }
        },
    }
}

fn run_convert(
    args: ConvertArgs,
    resolved: &ResolvedConfig,
    app: App<HttpRemoteClient>,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let mut options = resolved.convert.clone();
    if let Some(split) = args.split {
        options.split = split;
    }
    if let Some(seed) = args.seed {
        options.seed = Some(seed);
    }
    if let Some(noise_rate) = args.noise_rate {
        options.noise_rate = noise_rate;
    }
    if let Some(index_overflow) = args.index_overflow {
        options.index_overflow = index_overflow;
    }
    if let Some(jpeg_quality) = args.jpeg_quality {
        options.jpeg_quality = jpeg_quality;
    }
    if args.labels {
        options.write_label_files = true;
    }

    let root = args
        .root
        .unwrap_or_else(|| app.store().zoo_root().as_std_path().to_path_buf());
    let request = ConvertRequest {
        root,
        out: args.out,
        options,
    };

    match output_mode {
        OutputMode::NonInteractive => {
            let report = app.convert(request, &JsonOutput)?;
            JsonOutput::print_convert(&report).into_diagnostic()
        }
        OutputMode::Interactive => {
            let mut tui = Tui::new(ProgressSinkKind::Convert);
            let report = tui.run(move |sink| app.convert(request, sink))?;
            print_convert_summary(&report);
            Ok(())
        }
    }
}

fn print_convert_summary(report: &ConversionReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}DATASET-ZOO convert summary{reset}");
    println!(
        "{green}wrote {} of {} {} images to {}{reset}",
        report.written, report.samples, report.split, report.data_dir
    );
    println!("{yellow}resampled positions: {}{reset}", report.resampled.len());
    if report.clamped() > 0 {
        println!("{yellow}clamped draws: {}{reset}", report.clamped());
    }
    for path in &report.label_files {
        println!("   labels: {path}");
    }
}
