use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use glucose_core::normalize::parse_timestamp;
use glucose_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bgadvise")]
#[command(about = "Inpatient glucose advisory prototype", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override config file location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a form bundle and print alerts and recommendations
    Evaluate {
        /// JSON bundle with readings, meds, context and insulinMeds
        #[arg(long)]
        input: PathBuf,

        /// CSV of extra readings (timestamp,value[,id])
        #[arg(long)]
        readings: Option<PathBuf>,

        /// Evaluation time (YYYY-MM-DDTHH:MM), defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Calendar days considered for titration
        #[arg(long)]
        lookback_days: Option<usize>,
    },

    /// Evaluate the built-in demo patient
    Demo {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Evaluation time (YYYY-MM-DDTHH:MM), defaults to now
        #[arg(long)]
        now: Option<String>,
    },

    /// Show how a bundle was interpreted
    Check {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        readings: Option<PathBuf>,

        #[arg(long)]
        now: Option<String>,
    },

    /// List the insulin catalogue
    Catalogue,
}

fn main() -> Result<()> {
    // Initialize logging
    glucose_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Evaluate {
            input,
            readings,
            now,
            json,
            lookback_days,
        } => {
            let mut config = config;
            if let Some(days) = lookback_days {
                config.titration.lookback_days = days;
                config.validate()?;
            }
            cmd_evaluate(&input, readings.as_deref(), now.as_deref(), json, &config)
        }
        Commands::Demo { json, now } => cmd_demo(now.as_deref(), json, &config),
        Commands::Check {
            input,
            readings,
            now,
        } => cmd_check(&input, readings.as_deref(), now.as_deref(), &config),
        Commands::Catalogue => cmd_catalogue(),
    }
}

/// Resolve `--now`, falling back to local wall-clock time
fn resolve_now(now: Option<&str>) -> Result<NaiveDateTime> {
    match now {
        Some(raw) => Ok(parse_timestamp(raw)?),
        None => Ok(chrono::Local::now().naive_local()),
    }
}

/// Load a bundle and append any CSV readings to it
fn load_form(input: &Path, readings: Option<&Path>) -> Result<FormState> {
    let mut form = FormState::load(input)?;
    if let Some(csv_path) = readings {
        form.readings.extend(load_readings_csv(csv_path)?);
    }
    Ok(form)
}

fn cmd_evaluate(
    input: &Path,
    readings: Option<&Path>,
    now: Option<&str>,
    json: bool,
    config: &Config,
) -> Result<()> {
    let now = resolve_now(now)?;
    let form = load_form(input, readings)?;
    tracing::debug!("Evaluating {:?} at {}", input, now);
    let advice = form.evaluate(now, config);
    render(&advice, now, json)
}

fn cmd_demo(now: Option<&str>, json: bool, config: &Config) -> Result<()> {
    let now = resolve_now(now)?;
    let form = FormState::default().apply(Command::LoadDemo { now });
    let advice = form.evaluate(now, config);
    render(&advice, now, json)
}

fn cmd_check(input: &Path, readings: Option<&Path>, now: Option<&str>, config: &Config) -> Result<()> {
    let now = resolve_now(now)?;
    let form = load_form(input, readings)?;
    println!("{}", form.data_check(now, config).to_json_pretty()?);
    Ok(())
}

fn cmd_catalogue() -> Result<()> {
    let catalogue = insulin_catalogue();
    let errors = catalogue.validate();
    if !errors.is_empty() {
        eprintln!("Catalogue validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Catalogue("Invalid insulin catalogue".into()));
    }

    println!(
        "{:<12} {:<18} {:<22} {:<13} {:>6} {:>6} {:>6}",
        "ID", "BRAND", "GENERIC", "ACTING", "ONSET", "PEAK", "DUR"
    );
    for entry in catalogue.entries() {
        let peak = entry
            .peak_min
            .map(|p| format!("{}m", p))
            .unwrap_or_else(|| "flat".into());
        println!(
            "{:<12} {:<18} {:<22} {:<13} {:>6} {:>6} {:>6}",
            entry.id,
            entry.brand,
            entry.generic,
            format!("{:?}", entry.acting).to_lowercase(),
            format!("{}m", entry.onset_min),
            peak,
            format!("{}h", entry.duration_h),
        );
    }

    Ok(())
}

fn render(advice: &Advice, now: NaiveDateTime, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(advice)?);
        return Ok(());
    }

    display_summary(&advice.stats, now);
    display_alerts(&advice.alerts);
    display_recommendations(&advice.recs);
    Ok(())
}

fn mmol(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1} mmol/L", v))
        .unwrap_or_else(|| "—".into())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn display_summary(stats: &Stats, now: NaiveDateTime) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  24h SUMMARY at {}", now.format("%Y-%m-%d %H:%M"));
    println!("╰─────────────────────────────────────────╯");
    println!("  Readings (24h):        {}", stats.n24h);
    println!("  Mean (24h):            {}", mmol(stats.mean_24h));
    println!("  Any hypo (<4):         {}", yes_no(stats.any_hypo));
    println!("  Any severe (<3):       {}", yes_no(stats.any_severe));
    println!("  Overnight lows:        {}", stats.overnight_lows);
    println!("  PM mean (14-22h):      {}", mmol(stats.pm_mean));
    println!();
}

fn display_alerts(alerts: &[Alert]) {
    println!("Alerts");
    println!("─────────────────────────────────────────");
    if alerts.is_empty() {
        println!("  No alerts.");
    }
    for alert in alerts {
        let tag = match alert.severity {
            Severity::Stat => "STAT",
            Severity::Warn => "WARN",
        };
        println!("  [{}] {}", tag, alert.title);
        println!("    {}", alert.detail);
        if let Some(ref evidence) = alert.evidence {
            println!("    {}", evidence);
        }
    }
    println!();
}

fn display_recommendations(recs: &[Recommendation]) {
    println!("Recommendations");
    println!("─────────────────────────────────────────");
    if recs.is_empty() {
        println!("  No recommendations.");
    }
    for rec in recs {
        println!("  → {}", rec.title);
        println!("    {}", rec.body);
        if let Some(ref caveat) = rec.caveat {
            println!("    ℹ {}", caveat);
        }
    }
    println!();
}
