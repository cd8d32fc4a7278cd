use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueHint};
use serde_json::to_writer_pretty;
use synap_demo::codec::Codec;
use synap_demo::config::DemoConfig;
use synap_demo::error::DemoError;
use synap_demo::generator::demo_pipeline;
use synap_demo::model::{self, ModelCheck};
use synap_demo::observability::{MetricsCollector, log_snapshot};
use synap_demo::params::{ParamCollector, ParamRequest};
use synap_demo::presets::{PRESET_NAMES, generate_preset, preset_config};
use synap_demo::prompt::Prompter;
use synap_demo::runner::{GstLauncher, Interrupt, RunOutcome, SystemRunner};
use synap_demo::source::{Dimensions, SourceKind};
use synap_demo::validation::validate_config;
use synap_demo::validator::SourceProbe;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

#[cfg(feature = "otel")]
use opentelemetry::KeyValue;
#[cfg(feature = "otel")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "otel")]
use opentelemetry_sdk::{resource::Resource, trace as sdktrace};

fn main() -> Result<()> {
    let Cli {
        command,
        demo,
        otlp_endpoint,
    } = Cli::parse();

    configure_tracing(otlp_endpoint.as_deref())?;

    let command_result = match command {
        None => demo_command("demo", demo),
        Some(Commands::Camera(args)) => demo_command("camera", args),
        Some(Commands::Video(args)) => demo_command("video", args),
        Some(Commands::Rtsp(args)) => demo_command("rtsp", args),
        Some(Commands::Codecs) => {
            list_codecs();
            Ok(())
        }
        Some(Commands::ModelInfo { model, json }) => model_info(&model, json),
        Some(Commands::Config { action }) => config_command(action),
    };

    #[cfg(feature = "otel")]
    if otlp_endpoint.is_some() {
        opentelemetry::global::shutdown_tracer_provider();
    }

    command_result
}

fn configure_tracing(otlp_endpoint: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(feature = "otel")]
    {
        if let Some(endpoint) = otlp_endpoint {
            let tracer =
                opentelemetry_otlp::new_pipeline()
                    .tracing()
                    .with_trace_config(sdktrace::Config::default().with_resource(Resource::new(
                        vec![KeyValue::new("service.name", "synap-demo")],
                    )))
                    .with_exporter(
                        opentelemetry_otlp::new_exporter()
                            .tonic()
                            .with_endpoint(endpoint),
                    )
                    .install_simple()?;

            tracing_subscriber::registry()
                .with(filter.clone())
                .with(tracing_subscriber::fmt::layer())
                .with(tracing_opentelemetry::layer().with_tracer(tracer))
                .try_init()
                .map_err(|err| anyhow!(err.to_string()))?;
        } else {
            tracing_subscriber::registry()
                .with(filter.clone())
                .with(tracing_subscriber::fmt::layer())
                .try_init()
                .map_err(|err| anyhow!(err.to_string()))?;
        }
    }

    #[cfg(not(feature = "otel"))]
    {
        if let Some(endpoint) = otlp_endpoint {
            eprintln!(
                "warning: --otlp-endpoint '{}' requested but OpenTelemetry support is not enabled. Rebuild with --features otel.",
                endpoint
            );
        }

        tracing_subscriber::registry()
            .with(filter.clone())
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    }

    Ok(())
}

fn demo_command(preset: &str, args: DemoArgs) -> Result<()> {
    let started = Instant::now();
    let result = run_demo(preset, &args);
    MetricsCollector::global().record_total_duration(started.elapsed());
    write_metrics(args.print_metrics, args.metrics_json.as_deref())?;

    match result {
        Err(err) if matches!(err.downcast_ref::<DemoError>(), Some(DemoError::Interrupted)) => {
            println!("Exiting...");
            Ok(())
        }
        other => other,
    }
}

fn run_demo(preset: &str, args: &DemoArgs) -> Result<()> {
    let config = load_layers(preset, args.config.as_deref())?;
    let mut request = config.to_request()?;
    args.apply(&mut request);
    if preset == "video" {
        request.kind = Some(SourceKind::File);
    } else if preset == "rtsp" {
        request.kind = Some(SourceKind::Rtsp);
    }

    let interrupt = Interrupt::new();
    install_interrupt_handler(interrupt.clone())?;

    let runner = SystemRunner::new(interrupt, config.runner.shutdown_timeout());
    let env = config.launch_env();
    let launcher = GstLauncher::new(&runner, env.clone()).with_program(&config.runner.gst_launch);
    let probe = SourceProbe::new(&launcher).with_buffers(config.runner.probe_buffers);
    let model_check = ModelCheck::new(&runner, env).with_program(&config.runner.model_check);

    let mut prompter = Prompter::stdio();
    let params = ParamCollector::new(&mut prompter, &probe, &model_check)
        .skip_validation(args.skip_validation)
        .collect(request)?;
    let pipeline = demo_pipeline(&params)?;

    if args.dry_run {
        println!("{}", pipeline.pretty());
        return Ok(());
    }

    match launcher.run_pipeline(&pipeline, true)? {
        RunOutcome::Success => Ok(()),
        RunOutcome::Interrupted { .. } => Err(DemoError::Interrupted.into()),
        RunOutcome::Failed { code, .. } => match code {
            Some(code) => bail!("Pipeline exited with status {code}"),
            None => bail!("Pipeline terminated by a signal"),
        },
    }
}

/// Subcommand preset first, then the `--config` file on top.
fn load_layers(preset: &str, config_path: Option<&Path>) -> Result<DemoConfig> {
    let base = preset_config(preset)?;
    let Some(path) = config_path else {
        return Ok(base);
    };
    let file = DemoConfig::load(path)?;
    let report = validate_config(&file);
    for warning in &report.warnings {
        warn!(file = %path.display(), "{warning}");
    }
    if !report.is_ok() {
        for error_msg in &report.errors {
            error!(file = %path.display(), "{error_msg}");
        }
        bail!(
            "Config {} has {} error(s)",
            path.display(),
            report.errors.len()
        );
    }
    Ok(base.overlay(file))
}

fn install_interrupt_handler(interrupt: Interrupt) -> Result<()> {
    ctrlc::set_handler(move || {
        // A running child is shut down by its runner; otherwise leave now.
        if !interrupt.trigger() {
            println!("\nExiting...");
            std::process::exit(0);
        }
    })
    .context("Failed to install Ctrl-C handler")
}

fn write_metrics(print_metrics: bool, metrics_json: Option<&Path>) -> Result<()> {
    if !print_metrics && metrics_json.is_none() {
        return Ok(());
    }
    let snapshot = MetricsCollector::global().snapshot();
    if print_metrics {
        log_snapshot(&snapshot);
    }
    if let Some(path) = metrics_json {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create metrics directory: {}", parent.display())
            })?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create metrics file: {}", path.display()))?;
        to_writer_pretty(file, &snapshot)
            .with_context(|| format!("Failed to write metrics JSON: {}", path.display()))?;
        info!(metrics = %path.display(), "Metrics JSON written");
    }
    Ok(())
}

fn list_codecs() {
    println!("Supported codecs:");
    for codec in Codec::ALL {
        let (parser, decoder) = codec.elements();
        println!(
            "- {codec}: {parser} ! {decoder} (rtsp: {})",
            codec.depayloader()
        );
    }
}

fn model_info(path: &Path, json: bool) -> Result<()> {
    let info = model::inspect(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Model:  {}", info.path.display());
        println!("Input:  {} ({:?})", info.input_name, info.layout);
        println!("Size:   {}", info.dims());
        println!("SHA256: {}", info.sha256);
    }
    Ok(())
}

fn config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::New { preset, output } => {
            let destination =
                output.unwrap_or_else(|| PathBuf::from(format!("configs/{preset}.yaml")));
            let generated = generate_preset(&preset, &destination)?;
            info!(
                preset = %preset,
                path = %generated.display(),
                "Preset config generated"
            );
            Ok(())
        }
        ConfigCommands::Validate { files } => validate_configs(&files),
    }
}

fn validate_configs(files: &[PathBuf]) -> Result<()> {
    let mut failures = 0usize;
    for path in files {
        let config = match DemoConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                error!(file = %path.display(), "{err:#}");
                failures += 1;
                continue;
            }
        };
        let report = validate_config(&config);
        for warning in &report.warnings {
            warn!(file = %path.display(), "{warning}");
        }
        if report.is_ok() {
            info!(file = %path.display(), "Config validation passed");
        } else {
            for error_msg in &report.errors {
                error!(file = %path.display(), "{error_msg}");
            }
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("Config validation failed for {failures} file(s)");
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "synap-demo",
    version,
    about = "Launches SyNAP object detection demos through GStreamer",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    demo: DemoArgs,
    #[arg(long = "otlp-endpoint", global = true)]
    otlp_endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Demo with camera defaults (first working /dev/video device, 640x480)
    Camera(DemoArgs),
    /// Demo reading a local video file
    Video(DemoArgs),
    /// Demo reading an RTSP stream
    Rtsp(DemoArgs),
    /// List supported codecs and their GStreamer elements
    Codecs,
    /// Print the input size and digest of a .synap model
    ModelInfo {
        #[arg(value_hint = ValueHint::FilePath)]
        model: PathBuf,
        #[arg(long)]
        json: bool,
    },
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    New {
        #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(PRESET_NAMES))]
        preset: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct DemoArgs {
    /// Camera device, AUTO, video file or rtsp:// URL
    #[arg(short = 'i', long)]
    input: Option<String>,
    #[arg(short = 'd', long, alias = "input_dims", value_name = "WxH")]
    input_dims: Option<Dimensions>,
    #[arg(short = 'c', long, alias = "input_codec")]
    input_codec: Option<String>,
    #[arg(short = 'm', long, value_hint = ValueHint::FilePath)]
    model: Option<PathBuf>,
    #[arg(short = 's', long, alias = "inference_skip")]
    inference_skip: Option<u32>,
    #[arg(short = 'n', long, alias = "num_inferences")]
    num_inferences: Option<u32>,
    #[arg(short = 't', long, alias = "confidence_threshold")]
    confidence_threshold: Option<f64>,
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    fullscreen: Option<bool>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
    /// Print the pipeline instead of launching it
    #[arg(long)]
    dry_run: bool,
    /// Skip source probes and the model check
    #[arg(long)]
    skip_validation: bool,
    #[arg(long)]
    print_metrics: bool,
    #[arg(long = "metrics-json")]
    metrics_json: Option<PathBuf>,
}

impl DemoArgs {
    fn apply(&self, request: &mut ParamRequest) {
        fn pick<T: Clone>(target: &mut Option<T>, flag: &Option<T>) {
            if flag.is_some() {
                target.clone_from(flag);
            }
        }
        pick(&mut request.input, &self.input);
        pick(&mut request.dims, &self.input_dims);
        pick(&mut request.codec, &self.input_codec);
        pick(&mut request.model, &self.model);
        pick(&mut request.inference_skip, &self.inference_skip);
        pick(&mut request.max_results, &self.num_inferences);
        pick(&mut request.threshold, &self.confidence_threshold);
        pick(&mut request.fullscreen, &self.fullscreen);
    }
}
