use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bf_app::{AppResult, RunProgressEvent, RunRequest, RunStage, run_service};
use bf_kernel::BackendPreference;

#[derive(Parser)]
#[command(name = "boreflow")]
#[command(about = "BoreFlow CLI - borehole heat exchanger ground simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a run configuration without running it
    Validate {
        /// Path to the run configuration YAML file
        config_path: PathBuf,
    },
    /// Run a simulation
    Run {
        /// Path to the run configuration YAML file
        config_path: PathBuf,
        /// Override the configured transport backend
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
        /// Write the full results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write the per-step series as CSV
        #[arg(long)]
        series: Option<PathBuf>,
        /// Print transport kernel timing after the run
        #[arg(long)]
        timing: bool,
    },
    /// Report the GPU adapter found on this machine
    Devices,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Cpu,
    Gpu,
    Auto,
}

impl From<BackendArg> for BackendPreference {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Cpu => BackendPreference::Cpu,
            BackendArg::Gpu => BackendPreference::Gpu,
            BackendArg::Auto => BackendPreference::Auto,
        }
    }
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Run {
            config_path,
            backend,
            output,
            series,
            timing,
        } => {
            if timing {
                bf_core::timing::enable_timing();
            }
            cmd_run(
                &config_path,
                backend.map(Into::into),
                output.as_deref(),
                series.as_deref(),
            )
        }
        Commands::Devices => {
            cmd_devices();
            Ok(())
        }
    }
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating config: {}", config_path.display());
    let config = bf_app::load_config(config_path)?;
    bf_app::validate_config(&config)?;
    println!(
        "✓ Config is valid ({}x{}x{} grid, {} h)",
        config.grid.nr, config.grid.ntheta, config.grid.nz, config.simulation.duration_h
    );
    Ok(())
}

fn cmd_run(
    config_path: &Path,
    backend: Option<BackendPreference>,
    output: Option<&Path>,
    series: Option<&Path>,
) -> AppResult<()> {
    let started = Instant::now();
    render_cli_progress(&RunProgressEvent::stage(RunStage::LoadingConfig, 0.0, None));
    let mut request = RunRequest::from_path(config_path)?;
    request.backend = backend;
    println!("Running simulation: {}", request.config.name);

    let mut last_emit = Instant::now();
    let mut last_fraction = -1.0f64;
    let response = run_service::run_with_progress(
        &request,
        Some(&mut |event| {
            let fraction = event
                .step
                .as_ref()
                .map(|s| s.fraction_complete())
                .unwrap_or(-1.0);
            let emit_now = event.step.is_none()
                || (fraction - last_fraction).abs() >= 0.005
                || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                if fraction >= 0.0 {
                    last_fraction = fraction;
                }
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    match &response.failure {
        Some(reason) => println!("✗ Simulation failed: {}", reason),
        None if response.results.completed => {
            println!("✓ Simulation completed: {}", response.results.manifest.run_id)
        }
        None => println!("Simulation cancelled: {}", response.results.manifest.run_id),
    }
    println!("  Backend: {}", response.results.manifest.backend);
    println!("  Wall time: {:.3}s", started.elapsed().as_secs_f64());
    println!();
    print!("{}", response.results.summary.to_text());
    if let Some(timing) = bf_core::timing::kernel_timing::summary() {
        println!();
        print!("{}", timing);
    }

    if let Some(path) = output {
        let json = response.results.to_json()?;
        std::fs::write(path, json)?;
        println!("✓ Wrote results to {}", path.display());
    }
    if let Some(path) = series {
        let table = response.results.series_table();
        std::fs::write(path, table.to_csv())?;
        println!("✓ Exported {} steps to {}", table.rows.len(), path.display());
    }

    Ok(())
}

fn cmd_devices() {
    let report = run_service::device_report();
    if report.available {
        println!(
            "GPU adapter: {} ({})",
            report.name.as_deref().unwrap_or("unknown"),
            report.class.as_deref().unwrap_or("unknown")
        );
    } else {
        println!("No GPU adapter available; runs will use the CPU backend");
    }
    if let Some(note) = &report.note {
        println!("  {}", note);
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match &event.step {
        Some(s) => {
            let width = 28usize;
            let fraction = s.fraction_complete();
            let filled = ((fraction * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  t={:.1}/{:.1}h  step={}/{}  iters={}  Q={:.1}W  elapsed={:.1}s",
                bar,
                fraction * 100.0,
                s.time_s / 3600.0,
                s.duration_s / 3600.0,
                s.step,
                s.total_steps,
                s.iterations,
                s.heat_rate_w,
                event.elapsed_wall_s
            );
        }
        None => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}
