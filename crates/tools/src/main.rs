use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use formats::GlbCodec;
use streaming::{FailoverFetcher, MapDataProvider, StaticProvider};
use tools::{PlateRequest, fetch_config_from_env, generate_plate, plate_config_from_env};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a 3D city plate (GLB) around a coordinate")]
struct Args {
    /// Center latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Center longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Capture area in km² (default: PLATE_DEFAULT_AREA_KM2 or 1)
    #[arg(long)]
    area: Option<f64>,

    /// Address label stored in the model metadata
    #[arg(long)]
    address: Option<String>,

    /// Output GLB path
    #[arg(long, default_value = "plate.glb")]
    out: PathBuf,

    /// Saved Overpass JSON response to use instead of the network
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print pipeline stats as JSON on stdout
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let plate_config = plate_config_from_env();
    let fetch_config = fetch_config_from_env();

    let fetcher = match &args.input {
        Some(path) => {
            let body = tokio::fs::read(path).await?;
            let provider = StaticProvider::with_body(path.display().to_string(), body);
            FailoverFetcher::new(vec![Arc::new(provider) as Arc<dyn MapDataProvider>])
        }
        None => {
            let client = reqwest::Client::builder()
                .user_agent(concat!("plate-tools/", env!("CARGO_PKG_VERSION")))
                .timeout(fetch_config.attempt_timeout)
                .build()?;
            FailoverFetcher::from_config(&fetch_config, client)
        }
    };

    let request = PlateRequest {
        lat: args.lat,
        lon: args.lon,
        area_km2: args.area,
        address: args.address,
    };

    let output = generate_plate(
        &request,
        &plate_config,
        fetch_config.server_timeout_secs,
        &fetcher,
        &GlbCodec::default(),
    )
    .await?;

    tokio::fs::write(&args.out, &output.bytes).await?;
    info!(path = %args.out.display(), bytes = output.byte_length, "wrote plate");

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&output.stats)?);
    }

    Ok(())
}
