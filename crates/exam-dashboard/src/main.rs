mod bootstrap;
mod report;

use anyhow::{Context, Result};
use results_core::settings::Settings;
use results_data::catalog::CohortCatalog;
use results_data::extractor::{BlockExtractor, ExtractorConfig};
use results_runtime::session::{DashboardSession, LoadState};

use crate::report::DashboardReport;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("Exam Results Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Metric: {}, Averaging: {}, Lookback: {}",
        settings.metric,
        settings.averaging,
        settings.lookback
    );

    let extractor = BlockExtractor::new(ExtractorConfig::with_lookback(settings.lookback as usize));
    let mut session = DashboardSession::new(extractor, settings.averaging_policy());
    session.set_metric(settings.metric());

    let cohorts = match &settings.file {
        Some(path) => {
            session.load_file(path);
            Vec::new()
        }
        None => {
            let data_dir = settings
                .data_dir
                .clone()
                .or_else(bootstrap::discover_data_dir)
                .context("no data directory found; pass --data-dir or --file")?;
            let catalog = CohortCatalog::discover(&data_dir)?;
            let cohort = settings
                .year
                .clone()
                .or_else(|| catalog.default_cohort())
                .with_context(|| {
                    format!("no cohort workbooks found in {}", data_dir.display())
                })?;

            tracing::info!("Loading data for Year {}...", cohort);
            session.load_cohort(&catalog, &cohort);
            catalog.cohorts()
        }
    };

    if let Some(subject) = &settings.subject {
        if !session.select_subject(subject) && *session.state() == LoadState::Loaded {
            tracing::warn!(subject = %subject, "subject not in dataset; showing first subject");
        }
    }

    let report = DashboardReport::from_session(&session, cohorts);
    if settings.wants_json() {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report);
    }

    Ok(())
}
