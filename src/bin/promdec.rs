//! Decode inspector: reads a result envelope from a file or stdin, decodes
//! it, and prints what it found. Handy for poking at origin responses.

use anyhow::Context;
use chrono::{LocalResult, TimeZone, Utc};
use clap::Parser;
use promdelta::model::{decode_envelope, ResultValue};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "promdec", about = "Decode a time-series result envelope")]
struct Args {
    /// Envelope JSON file; reads stdin when omitted.
    file: Option<PathBuf>,

    /// Re-emit the decoded envelope as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let bytes = match &args.file {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };

    let envelope = decode_envelope(&bytes).context("decoding envelope")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    println!("status:      {}", envelope.status);
    println!("result type: {}", envelope.data.result_type);
    match &envelope.data.result {
        None => println!("result:      (none)"),
        Some(ResultValue::Scalar(pair)) => {
            println!("result:      {} @ {}", pair.value, fmt_ts(pair.timestamp))
        }
        Some(ResultValue::String(s)) => {
            println!("result:      {:?} @ {}", s.value, fmt_ts(s.timestamp))
        }
        Some(ResultValue::Vector(samples)) => {
            println!("result:      {} samples", samples.len())
        }
        Some(ResultValue::Matrix(series)) => {
            let samples: usize = series.iter().map(|s| s.values.len()).sum();
            println!("result:      {} series, {} samples", series.len(), samples)
        }
    }

    Ok(())
}

fn fmt_ts(seconds: f64) -> String {
    match Utc.timestamp_millis_opt((seconds * 1000.0) as i64) {
        LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => seconds.to_string(),
    }
}
