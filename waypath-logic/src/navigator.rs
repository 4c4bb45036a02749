use chrono::{DateTime, Utc};
use log::warn;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::{
    course::Course,
    location::{Degrees, PositionFix, SensorSource, SensorUpdate},
    nav_state::{NavigationState, NavigationUiState, WalkHistory},
    prelude::*,
    settings::NavigationSettings,
};

use anyhow::bail;

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

pub trait StateUpdateSender {
    fn send_update(&self);
}

/// Struct representing an ongoing walk. Consumes fixes from a [SensorSource]
/// of positions and headings, keeps guidance current, and provides high-level
/// methods for controlling the walk.
pub struct Navigator<P, H, S>
where
    P: SensorSource<PositionFix>,
    H: SensorSource<Degrees>,
    S: StateUpdateSender,
{
    state: RwLock<NavigationState>,
    position: Arc<P>,
    heading: Arc<H>,
    state_update_sender: S,
    interval: Duration,
    cancel: CancellationToken,
}

impl<P, H, S> Navigator<P, H, S>
where
    P: SensorSource<PositionFix>,
    H: SensorSource<Degrees>,
    S: StateUpdateSender,
{
    pub fn new(
        interval: Duration,
        course: Course,
        settings: NavigationSettings,
        position: Arc<P>,
        heading: Arc<H>,
        state_update_sender: S,
    ) -> Self {
        let state = NavigationState::new(course, settings);

        Self {
            state: RwLock::new(state),
            position,
            heading,
            state_update_sender,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    pub async fn get_ui_state(&self) -> NavigationUiState {
        self.state.read().await.as_ui_state()
    }

    pub async fn clone_settings(&self) -> NavigationSettings {
        self.state.read().await.clone_settings()
    }

    /// Consume one position update.
    /// Returns whether the walk loop should be broken.
    fn consume_position(
        &self,
        state: &mut NavigationState,
        update: SensorUpdate<PositionFix>,
    ) -> Result<bool> {
        match update {
            SensorUpdate::Reading(fix) => {
                if state.apply_fix(fix) > 0 {
                    self.state_update_sender.send_update();
                }
                Ok(false)
            }
            // A walk can't run without positions
            SensorUpdate::PermissionDenied => bail!("Location permission denied"),
            SensorUpdate::Ended => Ok(true),
            SensorUpdate::Error(why) => bail!("Position sensor error: {why}"),
        }
    }

    /// Consume one heading update. Heading failures never end the walk, the
    /// compass just loses relative bearings.
    fn consume_heading(&self, state: &mut NavigationState, update: SensorUpdate<Degrees>) {
        match update {
            SensorUpdate::Reading(heading) => {
                state.apply_heading(heading);
                self.state_update_sender.send_update();
            }
            SensorUpdate::PermissionDenied => {
                state.mark_heading_denied();
                self.state_update_sender.send_update();
            }
            SensorUpdate::Ended => {}
            SensorUpdate::Error(why) => {
                warn!("Heading sensor error: {why}");
                state.mark_heading_denied();
                self.state_update_sender.send_update();
            }
        }
    }

    /// Perform a tick, re-evaluating walk completion.
    /// Returns whether the walk loop should be broken.
    fn tick(&self, state: &mut NavigationState) -> bool {
        if state.check_walk_ended() {
            self.state_update_sender.send_update();
            return true;
        }

        false
    }

    pub async fn quit_walk(&self) {
        self.cancel.cancel();
    }

    /// Main loop of the walk, handles ticking and receiving sensor updates.
    /// Resolves with the walk's history once every waypoint is completed, or
    /// with [None] when the walk was quit early.
    pub async fn main_loop(&self) -> Result<Option<WalkHistory>> {
        self.position
            .start()
            .await
            .context("Failed to start the position sensor")?;

        if let Err(why) = self.heading.start().await {
            // Feature stays disabled, the walk continues on absolute bearings
            warn!("Failed to start the heading sensor: {why:?}");
            self.state.write().await.mark_heading_denied();
        }

        let mut interval = tokio::time::interval(self.interval);

        let res = 'walk: loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break 'walk Ok(None);
                }

                updates = self.position.recv_updates() => {
                    let mut state = self.state.write().await;
                    for update in updates {
                        match self.consume_position(&mut state, update) {
                            Ok(should_break) => {
                                if should_break {
                                    // The sensor ending right after the last
                                    // waypoint still counts as a finished walk
                                    if state.check_walk_ended() {
                                        self.state_update_sender.send_update();
                                        break 'walk Ok(Some(state.as_history()));
                                    }
                                    break 'walk Ok(None);
                                }
                            }
                            Err(why) => { break 'walk Err(why); }
                        }
                    }
                }

                updates = self.heading.recv_updates() => {
                    let mut state = self.state.write().await;
                    for update in updates {
                        self.consume_heading(&mut state, update);
                    }
                }

                _ = interval.tick() => {
                    let mut state = self.state.write().await;
                    if self.tick(&mut state) {
                        let history = state.as_history();
                        break 'walk Ok(Some(history));
                    }
                }
            }
        };

        self.position.stop().await;
        self.heading.stop().await;

        res
    }

    pub async fn lock_state(&self) -> RwLockWriteGuard<'_, NavigationState> {
        self.state.write().await
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        course::PathPoint,
        location::GeoPoint,
        tests::{DummySender, MockHeadingSource, MockPositionSource},
    };

    use super::*;
    use tokio::{sync::oneshot, task::yield_now, test};

    type TestNavigator = Navigator<MockPositionSource, MockHeadingSource, DummySender>;

    type EndRecv = oneshot::Receiver<Result<Option<WalkHistory>>>;

    struct MockWalk {
        navigator: Arc<TestNavigator>,
        position: Arc<MockPositionSource>,
        heading: Arc<MockHeadingSource>,
        waypoints: Vec<GeoPoint>,
    }

    const INTERVAL: Duration = Duration::from_secs(600000);

    impl MockWalk {
        pub fn new(num_points: u32) -> Self {
            tokio::time::pause();

            let waypoints = (0..num_points)
                .map(|i| GeoPoint::new(51.45 + i as f64 * 0.002, -2.59))
                .collect::<Vec<_>>();

            let course = Course::new(
                waypoints
                    .iter()
                    .enumerate()
                    .map(|(i, point)| PathPoint::new(i as u64, *point, i as u32))
                    .collect(),
            );

            let position = Arc::new(MockPositionSource::new());
            let heading = Arc::new(MockHeadingSource::new());

            let navigator = Arc::new(TestNavigator::new(
                INTERVAL,
                course,
                NavigationSettings::default(),
                position.clone(),
                heading.clone(),
                DummySender,
            ));

            Self {
                navigator,
                position,
                heading,
                waypoints,
            }
        }

        pub async fn start(&self) -> EndRecv {
            let navigator = self.navigator.clone();
            let (send, recv) = oneshot::channel();
            tokio::spawn(async move {
                let res = navigator.main_loop().await;
                send.send(res).expect("Failed to send");
            });
            yield_now().await;
            recv
        }

        pub async fn wait_for_sensors(&self) {
            self.position.wait_for_queue_empty().await;
            self.heading.wait_for_queue_empty().await;
            yield_now().await;
        }

        pub async fn tick(&self) {
            tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
            self.wait_for_sensors().await;
            yield_now().await;
        }

        pub async fn visit(&self, i: usize) {
            self.position
                .push(SensorUpdate::Reading(PositionFix::new(
                    self.waypoints[i],
                    5.0,
                )))
                .await;
            self.wait_for_sensors().await;
        }
    }

    #[test]
    async fn test_minimal_walk() {
        let walk = MockWalk::new(3);
        let recv = walk.start().await;

        for i in 0..3 {
            walk.visit(i).await;
        }

        let ui = walk.navigator.get_ui_state().await;
        assert_eq!(ui.completed_count, 3);

        // Tick to process walk end
        walk.tick().await;

        let res = recv.await.expect("Failed to recv");
        match res {
            Ok(Some(history)) => {
                assert_eq!(history.completed_points, 3);
                assert_eq!(history.locations.len(), 3);
            }
            Ok(None) => panic!("Walk exited without a history"),
            Err(why) => panic!("Walk encountered error: {why:?}"),
        }
    }

    #[test]
    async fn test_guidance_advances_with_fixes() {
        let walk = MockWalk::new(3);
        walk.start().await;

        walk.visit(0).await;

        let ui = walk.navigator.get_ui_state().await;
        let guidance = ui.guidance.expect("No guidance after a fix");
        assert_eq!(guidance.target.order, 1);
        assert!(
            guidance.bearing_degrees < 1.0 || guidance.bearing_degrees > 359.0,
            "bearing was {}",
            guidance.bearing_degrees
        );

        walk.visit(1).await;

        let ui = walk.navigator.get_ui_state().await;
        assert_eq!(ui.guidance.unwrap().target.order, 2);
    }

    #[test]
    async fn test_fix_redelivery_is_idempotent() {
        let walk = MockWalk::new(3);
        walk.start().await;

        walk.visit(0).await;
        walk.visit(0).await;

        let ui = walk.navigator.get_ui_state().await;
        assert_eq!(ui.completed_count, 1);
        assert_eq!(ui.guidance.unwrap().target.order, 1);
    }

    #[test]
    async fn test_heading_denied_keeps_walk_alive() {
        let walk = MockWalk::new(2);
        walk.start().await;

        walk.heading.push(SensorUpdate::PermissionDenied).await;
        walk.visit(0).await;

        let ui = walk.navigator.get_ui_state().await;
        assert!(ui.heading_denied);

        let guidance = ui.guidance.expect("Guidance gone after heading denial");
        assert!(guidance.relative_bearing_degrees.is_none());
    }

    #[test]
    async fn test_heading_reading_enables_relative_bearing() {
        let walk = MockWalk::new(2);
        walk.start().await;

        walk.visit(0).await;
        walk.heading.push(SensorUpdate::Reading(90.0)).await;
        walk.wait_for_sensors().await;

        let ui = walk.navigator.get_ui_state().await;
        let relative = ui
            .guidance
            .unwrap()
            .relative_bearing_degrees
            .expect("No relative bearing after a heading reading");
        // Target is due north, heading east, so the target is ~270 to the left
        assert!((relative - 270.0).abs() < 1.5, "relative was {relative}");
    }

    #[test]
    async fn test_quit_walk() {
        let walk = MockWalk::new(3);
        let recv = walk.start().await;

        walk.visit(0).await;
        walk.navigator.quit_walk().await;

        let res = recv.await.expect("Failed to recv");
        assert!(res.is_ok_and(|o| o.is_none()), "Walk did not quit cleanly");
    }

    #[test]
    async fn test_position_error_fails_walk() {
        let walk = MockWalk::new(3);
        let recv = walk.start().await;

        walk.position
            .push(SensorUpdate::Error("GPS gave up".to_string()))
            .await;
        walk.wait_for_sensors().await;

        let res = recv.await.expect("Failed to recv");
        assert!(res.is_err(), "Walk did not fail on a sensor error");
    }

    #[test]
    async fn test_position_permission_denied_fails_walk() {
        let walk = MockWalk::new(3);
        let recv = walk.start().await;

        walk.position.push(SensorUpdate::PermissionDenied).await;
        walk.wait_for_sensors().await;

        let res = recv.await.expect("Failed to recv");
        assert!(res.is_err(), "Walk survived a position permission denial");
    }

    #[test]
    async fn test_sensor_end_after_completion_still_finishes() {
        let walk = MockWalk::new(2);
        let recv = walk.start().await;

        walk.visit(0).await;
        walk.visit(1).await;
        walk.position.push(SensorUpdate::Ended).await;
        walk.wait_for_sensors().await;

        let res = recv.await.expect("Failed to recv");
        match res {
            Ok(Some(history)) => assert_eq!(history.completed_points, 2),
            other => panic!("Walk did not produce a history: {other:?}"),
        }
    }

    #[test]
    async fn test_position_ended_exits_without_history() {
        let walk = MockWalk::new(3);
        let recv = walk.start().await;

        walk.position.push(SensorUpdate::Ended).await;
        walk.wait_for_sensors().await;

        let res = recv.await.expect("Failed to recv");
        assert!(
            res.is_ok_and(|o| o.is_none()),
            "Walk did not exit cleanly on sensor end"
        );
    }
}
