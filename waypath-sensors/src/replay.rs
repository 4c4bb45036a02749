use std::{
    f64::consts::TAU,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use log::debug;
use rand::{RngExt, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use waypath_logic::{
    Degrees, GeoPoint, PositionFix, SensorSource, SensorUpdate, geo, prelude::*,
};

use crate::track::Track;

type QueuePair<T> = (mpsc::Sender<T>, Mutex<mpsc::Receiver<T>>);
type Queue<T> = QueuePair<SensorUpdate<T>>;

#[derive(Debug, Clone)]
/// Positional noise applied to replayed fixes, seeded so runs are reproducible
pub struct JitterSettings {
    /// Largest offset applied to any fix, in meters
    pub max_meters: f64,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Playback speed multiplier, 2.0 replays twice as fast
    pub speedup: f64,
    pub jitter: Option<JitterSettings>,
    /// Simulate the user refusing the compass permission
    pub deny_heading: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            speedup: 1.0,
            jitter: None,
            deny_heading: false,
        }
    }
}

/// Replays a recorded [Track] as live sensor updates.
///
/// Implements both [SensorSource] flavors, hand the same [Arc] to a navigator
/// as its position and heading source. The replay job spawns on the first
/// `start` call and runs until the track ends or the source is stopped.
pub struct ReplaySource {
    track: Track,
    options: ReplayOptions,
    position: Queue<PositionFix>,
    heading: Queue<Degrees>,
    started: AtomicBool,
    cancel_token: CancellationToken,
}

impl ReplaySource {
    pub fn new(track: Track, options: ReplayOptions) -> Arc<Self> {
        let (position_tx, position_rx) = mpsc::channel(20);
        let (heading_tx, heading_rx) = mpsc::channel(20);

        Arc::new(Self {
            track,
            options,
            position: (position_tx, Mutex::new(position_rx)),
            heading: (heading_tx, Mutex::new(heading_rx)),
            started: AtomicBool::new(false),
            cancel_token: CancellationToken::new(),
        })
    }

    /// Spawn the replay job once, both trait `start`s funnel here
    fn ensure_started(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let track = self.track.clone();
        let options = self.options.clone();
        let position_tx = self.position.0.clone();
        let heading_tx = self.heading.0.clone();
        let cancel = self.cancel_token.clone();

        tokio::spawn(async move {
            Self::replay_loop(track, options, position_tx, heading_tx, cancel).await;
        });
    }

    async fn replay_loop(
        track: Track,
        options: ReplayOptions,
        position_tx: mpsc::Sender<SensorUpdate<PositionFix>>,
        heading_tx: mpsc::Sender<SensorUpdate<Degrees>>,
        cancel: CancellationToken,
    ) {
        if options.deny_heading {
            heading_tx.send(SensorUpdate::PermissionDenied).await.ok();
        }

        let mut rng = options
            .jitter
            .as_ref()
            .map(|jitter| ChaCha20Rng::seed_from_u64(jitter.seed));

        let mut last_offset = 0.0;

        for point in track.points() {
            let wait = ((point.offset_seconds - last_offset) / options.speedup).max(0.0);
            last_offset = point.offset_seconds;

            tokio::select! {
                _ = cancel.cancelled() => {
                    Self::send_ended(&position_tx, &heading_tx).await;
                    return;
                }
                _ = tokio::time::sleep(Duration::from_secs_f64(wait)) => {}
            }

            let mut fix = point.as_fix();
            if let (Some(rng), Some(jitter)) = (rng.as_mut(), options.jitter.as_ref()) {
                fix.point = jittered(fix.point, rng, jitter.max_meters);
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    Self::send_ended(&position_tx, &heading_tx).await;
                    return;
                }
                res = position_tx.send(SensorUpdate::Reading(fix)) => {
                    if res.is_err() {
                        return;
                    }
                }
            }

            if !options.deny_heading
                && let Some(heading) = point.heading
            {
                heading_tx.send(SensorUpdate::Reading(heading)).await.ok();
            }
        }

        debug!("Track replay finished after {} points", track.len());
        Self::send_ended(&position_tx, &heading_tx).await;
    }

    async fn send_ended(
        position_tx: &mpsc::Sender<SensorUpdate<PositionFix>>,
        heading_tx: &mpsc::Sender<SensorUpdate<Degrees>>,
    ) {
        position_tx.send(SensorUpdate::Ended).await.ok();
        heading_tx.send(SensorUpdate::Ended).await.ok();
    }
}

/// A uniformly distributed offset within `max_meters` of `point`
fn jittered(point: GeoPoint, rng: &mut ChaCha20Rng, max_meters: f64) -> GeoPoint {
    let angle = rng.random_range(0.0..TAU);
    let radius = max_meters * rng.random_range(0.0..1.0f64).sqrt();
    geo::offset_by_meters(point, angle.cos() * radius, angle.sin() * radius)
}

impl SensorSource<PositionFix> for ReplaySource {
    async fn start(&self) -> Result {
        self.ensure_started();
        Ok(())
    }

    async fn recv_updates(&self) -> impl Iterator<Item = SensorUpdate<PositionFix>> {
        let mut rx = self.position.1.lock().await;
        let mut buf = Vec::with_capacity(20);
        rx.recv_many(&mut buf, 20).await;
        buf.into_iter()
    }

    async fn stop(&self) {
        self.cancel_token.cancel();
    }
}

impl SensorSource<Degrees> for ReplaySource {
    async fn start(&self) -> Result {
        self.ensure_started();
        Ok(())
    }

    async fn recv_updates(&self) -> impl Iterator<Item = SensorUpdate<Degrees>> {
        let mut rx = self.heading.1.lock().await;
        let mut buf = Vec::with_capacity(20);
        rx.recv_many(&mut buf, 20).await;
        buf.into_iter()
    }

    async fn stop(&self) {
        self.cancel_token.cancel();
    }
}
