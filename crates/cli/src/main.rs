use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use myopia_core::constants::{RECORDS_PATH_ENV, SETTINGS_PATH_ENV};
use myopia_core::{
    derive_se, load_records, resolve_path, ClinicSettings, PatientReport, ProgressionService,
    ProgressionWindow, RecordStore, StaticSettingsStore,
};
use myopia_types::EyePair;

#[derive(Parser)]
#[command(name = "myopia")]
#[command(about = "Myopia progression engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a spherical equivalent
    Se {
        /// Sphere in dioptres
        #[arg(long, allow_hyphen_values = true)]
        sphere: f64,
        /// Cylinder in dioptres (treated as zero if omitted)
        #[arg(long, allow_hyphen_values = true)]
        cylinder: Option<f64>,
    },
    /// List patients in a records file
    Patients {
        /// Records YAML file (defaults to $MYOPIA_RECORDS)
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// Show a patient's progression report
    Report {
        /// Patient UUID
        patient_id: Uuid,
        /// Records YAML file (defaults to $MYOPIA_RECORDS)
        #[arg(long)]
        records: Option<PathBuf>,
        /// Clinic settings YAML file (defaults to $MYOPIA_SETTINGS, then built-in defaults)
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Visits the summary rate spans
        #[arg(long, value_enum, default_value_t = WindowArg::All)]
        window: WindowArg,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Validate a clinic settings file and print the effective settings
    CheckSettings {
        /// Clinic settings YAML file (defaults to $MYOPIA_SETTINGS)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WindowArg {
    /// First and last visit of the whole history
    All,
    /// The two most recent visits
    LastTwo,
}

impl From<WindowArg> for ProgressionWindow {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::All => ProgressionWindow::AllHistoryEndpoints,
            WindowArg::LastTwo => ProgressionWindow::LastTwo,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Paths resolved once at startup from flags and environment.
struct Paths {
    records: Option<PathBuf>,
    settings: Option<PathBuf>,
}

impl Paths {
    fn resolve(records: Option<PathBuf>, settings: Option<PathBuf>) -> Self {
        Self {
            records: resolve_path(records, std::env::var(RECORDS_PATH_ENV).ok()),
            settings: resolve_path(settings, std::env::var(SETTINGS_PATH_ENV).ok()),
        }
    }

    fn records(&self) -> anyhow::Result<&PathBuf> {
        match &self.records {
            Some(path) => Ok(path),
            None => bail!("no records file given; pass --records or set {RECORDS_PATH_ENV}"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("myopia_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Se { sphere, cylinder }) => {
            if let Some(se) = derive_se(Some(sphere), cylinder) {
                println!("{se:+.2} D");
            }
        }
        Some(Commands::Patients { records }) => {
            let paths = Paths::resolve(records, None);
            let store = load_records(paths.records()?)?;
            let patients = store.list_patients()?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {}, Born: {}, Chart: {}",
                        patient.id,
                        patient.name,
                        patient.birth_date,
                        patient.chart_number.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Some(Commands::Report {
            patient_id,
            records,
            settings,
            window,
            format,
        }) => {
            let paths = Paths::resolve(records, settings);
            let store = load_records(paths.records()?)?;
            let settings = ClinicSettings::load_or_default(paths.settings.as_deref())?;

            let service = ProgressionService::new(
                Arc::new(store),
                Arc::new(StaticSettingsStore::new(settings)),
            );
            let report = service
                .patient_report(patient_id, window.into())
                .with_context(|| format!("building report for patient {patient_id}"))?;

            match format {
                OutputFormat::Json => println!("{}", report.to_json_pretty()?),
                OutputFormat::Text => print_report(&report),
            }
        }
        Some(Commands::CheckSettings { settings }) => {
            let paths = Paths::resolve(None, settings);
            let Some(path) = paths.settings else {
                bail!("no settings file given; pass --settings or set {SETTINGS_PATH_ENV}");
            };
            let settings = ClinicSettings::load(&path)
                .with_context(|| format!("checking {}", path.display()))?;
            println!("Settings OK: {}", path.display());
            print!("{}", settings.to_yaml()?);
        }
        None => {
            println!("Use 'myopia --help' for commands");
        }
    }

    Ok(())
}

fn pair(values: &EyePair<Option<f64>>, unit: &str) -> String {
    let show = |v: &Option<f64>| match v {
        Some(v) => format!("{v:+.2} {unit}"),
        None => "-".to_string(),
    };
    format!("OD {}, OS {}", show(&values.od), show(&values.os))
}

fn print_report(report: &PatientReport) {
    let patient = &report.patient;
    println!(
        "Patient: {} ({}), born {}",
        patient.name, patient.id, patient.birth_date
    );

    println!();
    println!("Visits:");
    if report.history.is_empty() {
        println!("  none recorded");
    }
    for row in &report.history {
        println!(
            "  {}  SE {}  AL {}",
            row.date,
            pair(&row.se, "D"),
            pair(&row.axial_length, "mm")
        );
        if let Some(interval) = &row.interval {
            println!(
                "    since {}: SE {}  AL {}  [{}]",
                interval.previous_date,
                pair(&interval.rates.se, "D/yr"),
                pair(&interval.rates.al, "mm/yr"),
                interval.risk_level
            );
        }
    }

    let summary = &report.summary;
    println!();
    match (summary.years_elapsed, summary.reliability) {
        (Some(years), Some(reliability)) => {
            println!(
                "Summary: {} over {years:.2} years (reliability {})",
                summary.risk_level,
                reliability.as_str()
            );
            println!("  SE rate {}", pair(&summary.se_rate, "D/yr"));
            println!("  AL rate {}", pair(&summary.al_rate, "mm/yr"));
        }
        _ => println!("Summary: {} (not enough data for rates)", summary.risk_level),
    }

    if !report.segments.is_empty() {
        println!();
        println!("Treatment periods:");
        for segment in &report.segments {
            println!(
                "  age {:.2} to {:.2}  {}  {}{}",
                segment.start_age,
                segment.end_age,
                segment.treatment,
                segment.color,
                if segment.is_current { "  (current)" } else { "" }
            );
        }
    }

    if let Some(note) = &report.note {
        println!();
        println!("Note:");
        for line in note.lines() {
            println!("  {line}");
        }
    }
}
