//! Usage: `cargo run --example fetch_black_sea -- <beach_info.csv> <start YYYY-MM> <end YYYY-MM> <fetcher.json>`
use anyhow::Context;
use std::env;
use std::path::{Path, PathBuf};
use wave_reanalysis::{
    BatchConfig, BatchOrchestrator, FetcherConfig, HttpWindowFetcher, LocationRegistry, Month,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    configure_polars_display();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 4 {
        anyhow::bail!("usage: fetch_black_sea <beach_info.csv> <start YYYY-MM> <end YYYY-MM> <fetcher.json>");
    }

    let registry = LocationRegistry::from_csv(Path::new(&args[0]))?;
    let start: Month = args[1].parse().context("invalid start month")?;
    let end: Month = args[2].parse().context("invalid end month")?;
    let fetcher_config = FetcherConfig::from_json_file(Path::new(&args[3]))?;
    println!(
        "Fetching {} .. {} for {} locations from {}",
        start,
        end,
        registry.len(),
        fetcher_config.product_id
    );

    let mut batch = BatchOrchestrator::builder()
        .config(
            BatchConfig::builder()
                .start(start)
                .end(end)
                .output_dir(PathBuf::from("."))
                .build(),
        )
        .registry(registry)
        .fetcher(HttpWindowFetcher::new(fetcher_config).await?)
        .build();

    let (collection, path) = batch.run_and_write().await?;
    for location in batch.registry().locations() {
        if let (Some(point), Some(offset)) = (location.resolved(), location.offset_km()) {
            println!(
                "{:<24} -> ({:.4}, {:.4}) {:.2} km",
                location.name, point.lat_value, point.lon_value, offset
            );
        }
    }

    let df = collection.to_dataframe()?;
    println!("{}", df.tail(Some(5)));
    if let Some(path) = path {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn configure_polars_display() {
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
