/*
 * CBF Inspection Tool
 *
 * Decodes a Pilatus miniCBF file and prints its dimensions and simple pixel
 * statistics. Useful when commissioning a new detector region: run it
 * against a freshly written file and compare the reported dimensions with
 * the region table before arming a scan.
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pilatus_cbf::{decode, RegionTable};

#[derive(Parser)]
#[command(
    name = "cbf_dump",
    about = "Decode a Pilatus CBF file and print dimensions and pixel statistics"
)]
struct Args {
    /// CBF file to inspect
    file: PathBuf,

    /// Detector-region keyword to validate the dimensions against
    /// (e.g. SAXS, WAXS1)
    #[arg(long)]
    region: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let data = decode::decode(&args.file)
        .with_context(|| format!("decoding {}", args.file.display()))?;

    let (rows, cols) = data.dim();
    println!("file:       {}", args.file.display());
    println!("dimensions: {rows} x {cols} ({} pixels)", rows * cols);

    let mut min = i32::MAX;
    let mut max = i32::MIN;
    let mut sum = 0i64;
    let mut masked = 0usize;
    for &px in &data {
        min = min.min(px);
        max = max.max(px);
        sum += i64::from(px);
        // Pilatus marks gaps and defective pixels with negative counts.
        if px < 0 {
            masked += 1;
        }
    }
    println!("min / max:  {min} / {max}");
    println!("total:      {sum}");
    println!("masked:     {masked} pixels");

    if let Some(region) = args.region {
        let expected = RegionTable::builtin().resolve(&region)?;
        if (rows, cols) == expected {
            println!("region:     {region} OK");
        } else {
            println!(
                "region:     {region} MISMATCH (expected {} x {})",
                expected.0, expected.1
            );
            std::process::exit(1);
        }
    }

    Ok(())
}
