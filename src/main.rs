use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use tripscraper::{fetch, sink, Extractor, FetchSettings, RunEnv};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) read the run from the environment ───────────────────────
    let run = RunEnv::from_env()?;
    info!(
        start = ?run.start,
        end = ?run.end,
        taxi_types = ?run.vars.taxi_types,
        output = %run.output_dir.display(),
        "run configured"
    );

    // ─── 3) fetch, union, stamp ──────────────────────────────────────
    let settings = FetchSettings::default();
    let client = fetch::build_client(settings.timeout)?;
    let extractor = Extractor::new(client, settings);
    let batch = extractor.extract(run.start.as_deref(), run.end.as_deref(), &run.vars)?;
    info!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "extracted"
    );

    // ─── 4) append to the output table ───────────────────────────────
    match sink::append_parquet(&run.output_dir, &batch)? {
        Some(path) => info!("wrote {}", path.display()),
        None => info!("nothing to write"),
    }

    info!("all done");
    Ok(())
}
