use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::bail;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tokio::sync::{Notify, oneshot};

use waypath_logic::{
    Course, DatasetKind, Flock, FlockSettings, GeoPoint, NavigationSettings, Navigator,
    PathPoint, StateUpdateSender, SvgImportSettings, Vec2, geo, import_course, prelude::*,
};
use waypath_sensors::{ReplayOptions, ReplaySource, Track};

#[derive(Parser)]
#[command(name = "waypath", about = "Walk SVG drawings with a GPS compass")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum DatasetKindValue {
    Facilities,
    Crime,
    Trees,
}

impl From<DatasetKindValue> for DatasetKind {
    fn from(value: DatasetKindValue) -> Self {
        match value {
            DatasetKindValue::Facilities => DatasetKind::Facilities,
            DatasetKindValue::Crime => DatasetKind::Crime,
            DatasetKindValue::Trees => DatasetKind::Trees,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an SVG file into a GPS course anchored at a coordinate
    Import {
        /// The SVG file to convert
        svg: PathBuf,
        /// Latitude the drawing is centered on
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        /// Longitude the drawing is centered on
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
        /// Minimum spacing between waypoints in meters
        #[arg(long, default_value_t = 10.0)]
        min_distance: f64,
        /// Maximum spacing between waypoints in meters
        #[arg(long, default_value_t = 50.0)]
        max_distance: f64,
        /// Cap on the total number of waypoints
        #[arg(long, default_value_t = 200)]
        max_points: usize,
        /// Multiplier from SVG units to meters
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        /// Rotation of the drawing in degrees clockwise
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        rotation: f64,
        /// Write the course JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay a recorded track against a course and print live guidance
    Walk {
        /// Course JSON produced by import
        course: PathBuf,
        /// Track JSON to replay
        track: PathBuf,
        /// How often the walk re-evaluates completion, in milliseconds
        #[arg(long, default_value_t = 250)]
        interval_ms: u64,
        /// Distance at which a waypoint counts as reached, in meters
        #[arg(long, default_value_t = 15.0)]
        radius: f64,
        /// Playback speed multiplier
        #[arg(long, default_value_t = 1.0)]
        speedup: f64,
        /// Pretend the compass permission was denied
        #[arg(long)]
        no_compass: bool,
    },
    /// Run the flocking demo headless and print where the flock ends up
    Flock {
        #[arg(long, default_value_t = 800.0)]
        width: f64,
        #[arg(long, default_value_t = 600.0)]
        height: f64,
        /// How many boids to simulate
        #[arg(long, default_value_t = 100)]
        count: usize,
        /// How many ticks to run
        #[arg(long, default_value_t = 120)]
        ticks: u32,
        /// RNG seed, the same seed reproduces the same run
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Find the dataset entry nearest to a coordinate
    Nearest {
        /// Which dataset the fixture holds
        #[arg(value_enum)]
        dataset: DatasetKindValue,
        /// The dataset fixture file
        file: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        latitude: f64,
        #[arg(long, allow_negative_numbers = true)]
        longitude: f64,
    },
}

/// Wakes the printer loop whenever the navigator has something new to show
struct NotifySender(Arc<Notify>);

impl StateUpdateSender for NotifySender {
    fn send_update(&self) {
        self.0.notify_one();
    }
}

#[tokio::main]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            svg,
            latitude,
            longitude,
            min_distance,
            max_distance,
            max_points,
            scale,
            rotation,
            output,
        } => {
            let settings = SvgImportSettings {
                min_distance_meters: min_distance,
                max_distance_meters: max_distance,
                max_points,
                svg_scale: scale,
                svg_rotation_degrees: rotation,
            };
            run_import(&svg, GeoPoint::new(latitude, longitude), &settings, output)
        }
        Commands::Walk {
            course,
            track,
            interval_ms,
            radius,
            speedup,
            no_compass,
        } => run_walk(&course, &track, interval_ms, radius, speedup, no_compass).await,
        Commands::Flock {
            width,
            height,
            count,
            ticks,
            seed,
        } => run_flock(width, height, count, ticks, seed),
        Commands::Nearest {
            dataset,
            file,
            latitude,
            longitude,
        } => run_nearest(dataset.into(), &file, GeoPoint::new(latitude, longitude)),
    }
}

fn run_import(
    svg: &PathBuf,
    anchor: GeoPoint,
    settings: &SvgImportSettings,
    output: Option<PathBuf>,
) -> Result {
    let markup = std::fs::read_to_string(svg).context("Failed to read the SVG file")?;

    let points = import_course(&markup, anchor, settings);
    if points.is_empty() {
        bail!("No course could be imported from {}", svg.display());
    }

    let json = serde_json::to_string_pretty(&points).context("Failed to serialize the course")?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).context("Failed to write the course file")?;
            info!("Wrote {} waypoints to {}", points.len(), path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

async fn run_walk(
    course: &PathBuf,
    track: &PathBuf,
    interval_ms: u64,
    radius: f64,
    speedup: f64,
    no_compass: bool,
) -> Result {
    let course_json = std::fs::read_to_string(course).context("Failed to read the course file")?;
    let points: Vec<PathPoint> =
        serde_json::from_str(&course_json).context("Failed to parse the course file")?;
    if points.is_empty() {
        bail!("The course file has no waypoints");
    }

    let track_json = std::fs::read_to_string(track).context("Failed to read the track file")?;
    let track = Track::from_json(&track_json)?;

    let source = ReplaySource::new(
        track,
        ReplayOptions {
            speedup,
            deny_heading: no_compass,
            ..Default::default()
        },
    );

    let notify = Arc::new(Notify::new());
    let navigator = Arc::new(Navigator::new(
        Duration::from_millis(interval_ms),
        Course::new(points),
        NavigationSettings {
            completion_radius_meters: radius,
            ..Default::default()
        },
        source.clone(),
        source,
        NotifySender(notify.clone()),
    ));

    let (send, mut recv) = oneshot::channel();
    tokio::spawn({
        let navigator = navigator.clone();
        async move {
            send.send(navigator.main_loop().await).ok();
        }
    });

    let res = loop {
        tokio::select! {
            res = &mut recv => {
                break res.context("Walk task dropped its result")?;
            }

            _ = notify.notified() => {
                let ui = navigator.get_ui_state().await;
                if let Some(guidance) = ui.guidance {
                    info!(
                        "{}/{} reached, next waypoint {} is {:.0}m away at {:.0}°",
                        ui.completed_count,
                        ui.points.len(),
                        guidance.target.order,
                        guidance.distance_meters,
                        guidance.bearing_degrees,
                    );
                }
                if ui.heading_denied {
                    info!("Compass unavailable, bearings are absolute");
                }
            }
        }
    };

    match res? {
        Some(history) => {
            let seconds = (history.walk_ended - history.walk_started).num_seconds();
            info!(
                "Walk {} complete: {}/{} waypoints, {} fixes over {seconds}s",
                history.id,
                history.completed_points,
                history.total_points,
                history.locations.len(),
            );
        }
        None => info!("Walk ended before completing the course"),
    }

    Ok(())
}

fn run_flock(width: f64, height: f64, count: usize, ticks: u32, seed: u64) -> Result {
    let settings = FlockSettings {
        boid_count: count,
        ..Default::default()
    };
    let mut flock = Flock::new(width, height, settings, ChaCha20Rng::seed_from_u64(seed));

    for _ in 0..ticks {
        flock.step();
    }

    let total = flock.boids().len() as f64;
    let mean_position = flock
        .boids()
        .iter()
        .fold(Vec2::ZERO, |acc, boid| acc + boid.position)
        / total;
    let mean_speed = flock
        .boids()
        .iter()
        .map(|boid| boid.velocity.length())
        .sum::<f64>()
        / total;

    println!(
        "After {ticks} ticks, {count} boids average position ({:.1}, {:.1}) at speed {mean_speed:.2}",
        mean_position.x, mean_position.y,
    );

    Ok(())
}

fn run_nearest(kind: DatasetKind, file: &PathBuf, origin: GeoPoint) -> Result {
    let json = std::fs::read_to_string(file).context("Failed to read the dataset file")?;

    let places = kind.parse(&json);
    let Some(place) = geo::nearest(origin, &places) else {
        bail!("No usable records in the {} dataset", kind.name());
    };

    println!(
        "{} is {:.0}m away at {:.0}°",
        place.label,
        geo::distance_meters(origin, place.point),
        geo::bearing_degrees(origin, place.point),
    );

    Ok(())
}
