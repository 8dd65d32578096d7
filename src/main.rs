use anyhow::anyhow;
use clap::Parser;
use slog::{info, warn, Logger};
use windborne_uasdc::{
    bucketize, create_folder, enrich_segment, save_segment, setup_logger, with_time_range, Cli,
    JsonFetcher, ObservationAccumulator,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let logger = setup_logger(&cli);

    let (starttime, endtime) = cli.time_range()?;
    let bucket_seconds = cli.bucket_seconds()?;

    info!(logger, "WindBorne UASDC converter starting...");
    info!(logger, "  Endpoint: {}", cli.base_url());
    info!(logger, "  Time range: {} - {}", starttime, endtime);
    info!(logger, "  Bucket width: {} hour(s)", cli.bucket_hours);

    convert_time_range(cli, logger, starttime, endtime, bucket_seconds).await
}

/// Drains every page of the requested range into the accumulator, then
/// bucketizes, enriches and writes each mission's observations. All pages
/// are fetched before any bucketizing starts: sorting and gap detection
/// need the complete set.
async fn convert_time_range(
    cli: Cli,
    logger: Logger,
    starttime: i64,
    endtime: i64,
    bucket_seconds: i64,
) -> Result<(), anyhow::Error> {
    let fetcher = JsonFetcher::new(logger.clone(), cli.client_id.clone(), cli.api_key.clone());
    let mut accumulator = ObservationAccumulator::new(logger.clone());

    let mut next_page = with_time_range(&cli.base_url(), starttime, endtime);
    loop {
        let page = fetcher.fetch_page(&next_page).await?;
        info!(
            logger,
            "fetched page with {} observation(s)",
            page.observations.len()
        );
        if page.observations.is_empty() {
            warn!(
                logger,
                "could not find any observations on this page for the input date range"
            );
        }
        accumulator.add_page(page.observations);

        if !page.has_next_page {
            break;
        }
        let url = page
            .next_page
            .ok_or_else(|| anyhow!("upstream reported another page but gave no next_page url"))?;
        next_page = with_time_range(&url, starttime, endtime);
    }

    if accumulator.is_empty() {
        info!(logger, "no observations found");
        return Ok(());
    }
    info!(logger, "accumulated {} observation(s)", accumulator.len());

    let data_dir = cli.data_dir();
    create_folder(&data_dir, &logger);

    for (mission_name, observations) in accumulator.finalize() {
        let segments = bucketize(observations, bucket_seconds, starttime, &logger);
        for segment in segments {
            info!(
                logger,
                "converting {} observation(s) for mission {} and saving as parquet",
                segment.observations.len(),
                mission_name
            );
            let rows = enrich_segment(&segment.observations);
            let path = save_segment(&rows, &mission_name, segment.start, &data_dir)?;
            info!(logger, "wrote {}", path);
        }
    }
    Ok(())
}
