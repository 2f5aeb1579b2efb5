use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use swimlane_core::{AggregationLayout, SortMode, SwimlaneConfig};
use swimlane_es::{crop_label, flatten_response_str};
use tracing::{debug, Level};

#[derive(Parser, Debug)]
#[command(
    name = "swimlane-cli",
    about = "Flatten a search aggregation response into carrier swimlanes."
)]
struct Args {
    /// Path to the aggregation response JSON.
    #[arg(short, long)]
    input: PathBuf,

    /// TOML file with swimlane options.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Metric aggregation id.
    #[arg(long, default_value = "1")]
    metric: String,

    /// Date histogram aggregation id.
    #[arg(long, default_value = "3")]
    time_split: String,

    /// Category aggregation id. Omit for a single lane.
    #[arg(long)]
    view_by: Option<String>,

    /// Lane order: none, asc or desc. Overrides the config file.
    #[arg(long)]
    sort: Option<SortMode>,

    /// Print the full snapshot as JSON.
    #[arg(long)]
    json: bool,

    /// Log debug records to stderr.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("could not read config {:?}", path))?;
            toml::from_str::<SwimlaneConfig>(&text)
                .with_context(|| format!("invalid config {:?}", path))?
        }
        None => SwimlaneConfig::default(),
    };
    if let Some(sort) = args.sort {
        config.sort_mode = sort;
    }
    debug!(?config, "loaded swimlane config");

    let layout = AggregationLayout {
        metric_id: Some(args.metric.clone()),
        time_split_id: Some(args.time_split.clone()),
        view_by_id: args.view_by.clone(),
        ..AggregationLayout::default()
    };

    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read file {:?}", args.input))?;
    let snapshot = flatten_response_str(&data, &layout, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    // Top lane first.
    for label in snapshot.lane_order.iter().rev() {
        let Some(lane) = snapshot.lane(label) else {
            continue;
        };
        println!(
            "{:<27}  docs={:<5} buckets={:<4} conflicts={}",
            crop_label(label, config.label_max_chars),
            lane.doc_count,
            lane.cells.len(),
            lane.conflicts.len()
        );
        for event in &lane.conflicts {
            println!(
                "    {} {} -> {}",
                event.time,
                event.key.flight_number.as_deref().unwrap_or("?"),
                config.status_labels.label(event.status).unwrap_or_default()
            );
        }
    }

    Ok(())
}
