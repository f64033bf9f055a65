use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use flate2::read::GzDecoder;
use inertial_trajectory_rs::units::{convert_inertial_units, kmh_to_ms};
use inertial_trajectory_rs::{FusionConfig, GnssTrack, InertialBatch, Pipeline, Reconstruction, Vec3};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "reconstruct")]
#[command(about = "Reconstruct a vehicle trajectory from an inertial recording", long_about = None)]
struct Args {
    /// Recording as JSON, optionally gzipped (.json.gz)
    input: PathBuf,

    /// Output CSV, `t;x;y;z` per row
    output: PathBuf,

    /// JSON file overriding pipeline parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input is in g, deg/s and km/h instead of m/s², rad/s and m/s
    #[arg(long, default_value_t = false)]
    raw_units: bool,

    /// Append attitude quaternion columns `w;i;j;k`
    #[arg(long, default_value_t = false)]
    attitude: bool,
}

#[derive(Deserialize)]
struct GnssData {
    times: Vec<f64>,
    /// Degrees
    latitude: Vec<f64>,
    /// Degrees
    longitude: Vec<f64>,
    #[serde(default)]
    altitude: Option<Vec<f64>>,
}

#[derive(Deserialize)]
struct Recording {
    times: Vec<f64>,
    accelerations: Vec<[f64; 3]>,
    angular_velocities: Vec<[f64; 3]>,
    #[serde(default)]
    speed: Option<Vec<f64>>,
    #[serde(default)]
    gnss: Option<GnssData>,
}

fn load_recording(path: &Path) -> Result<Recording> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let recording = if path.extension().map(|e| e == "gz").unwrap_or(false) {
        serde_json::from_reader(BufReader::new(GzDecoder::new(file)))
    } else {
        serde_json::from_reader(BufReader::new(file))
    };
    recording.with_context(|| format!("parsing {}", path.display()))
}

fn to_batch(recording: Recording, raw_units: bool) -> InertialBatch {
    let accel: Vec<Vec3> = recording.accelerations.into_iter().map(Vec3::from).collect();
    let gyro: Vec<Vec3> = recording.angular_velocities.into_iter().map(Vec3::from).collect();
    let (accelerations, angular_velocities, speed) = if raw_units {
        let (accel, gyro) = convert_inertial_units(&accel, &gyro);
        let speed = recording
            .speed
            .map(|s| s.into_iter().map(kmh_to_ms).collect());
        (accel, gyro, speed)
    } else {
        (accel, gyro, recording.speed)
    };

    let gnss = recording.gnss.map(|g| GnssTrack {
        altitude: g.altitude.unwrap_or_else(|| vec![0.0; g.times.len()]),
        latitude: g.latitude.iter().map(|d| d.to_radians()).collect(),
        longitude: g.longitude.iter().map(|d| d.to_radians()).collect(),
        times: g.times,
    });

    InertialBatch {
        times: recording.times,
        accelerations,
        angular_velocities,
        speed,
        gnss,
    }
}

fn write_csv(path: &Path, result: &Reconstruction, with_attitude: bool) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    if with_attitude {
        writeln!(out, "t;x;y;z;w;i;j;k")?;
    } else {
        writeln!(out, "t;x;y;z")?;
    }
    for (i, (t, p)) in result.times.iter().zip(result.positions.iter()).enumerate() {
        write!(out, "{t};{};{};{}", p.x, p.y, p.z)?;
        if with_attitude {
            let q = result.attitude[i].quaternion();
            write!(out, ";{};{};{};{}", q.w, q.i, q.j, q.k)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FusionConfig::from_json_file(path)?,
        None => FusionConfig::default(),
    };

    let recording = load_recording(&args.input)?;
    let batch = to_batch(recording, args.raw_units);
    log::info!("Loaded {} samples from {}", batch.len(), args.input.display());

    let result = Pipeline::new(config)
        .run(&batch)
        .with_context(|| format!("reconstructing {}", args.input.display()))?;

    let report = &result.report;
    log::info!(
        "Stationary intervals: {} (threshold {:.2} m/s), z re-alignments: {}, sign inverted: {}",
        report.stationary_intervals.len(),
        report.speed_threshold,
        report.z_realignments,
        report.sign_inverted
    );
    if let Some(correction) = report.heading_correction {
        log::info!("Heading correction: {:.2} deg", correction.to_degrees());
    }
    if let Some(distance) = report.gnss_distance {
        log::info!("GNSS track length: {:.1} m", distance);
    }

    write_csv(&args.output, &result, args.attitude)?;
    log::info!("Wrote {} rows to {}", result.times.len(), args.output.display());
    Ok(())
}
