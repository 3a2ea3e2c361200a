use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::devices::AudioSink;
use crate::error::DeviceError;
use crate::session::{LoopHealth, SessionEvent, SessionHub};

const ENABLE_LOGS: bool = true;

const UNSUPPORTED: &str = "volume control not supported on this system";

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamp {
    pub from: u8,
    pub to: u8,
    /// First clamp of this below-floor episode.
    pub notify: bool,
}

/// Decides when the output volume must be pushed back up to the floor.
#[derive(Debug, Clone)]
pub struct VolumeFloor {
    floor: u8,
    /// A raise already succeeded during the current below-floor episode.
    notified: bool,
}

impl VolumeFloor {
    pub fn new(floor: u8) -> Self {
        Self {
            floor: floor.min(100),
            notified: false,
        }
    }

    pub fn floor(&self) -> u8 {
        self.floor
    }

    pub fn check(&mut self, current: u8) -> Option<Clamp> {
        if current >= self.floor {
            self.notified = false;
            return None;
        }
        Some(Clamp {
            from: current,
            to: self.floor,
            notify: !self.notified,
        })
    }

    /// Records that a clamp took effect, silencing the rest of the episode.
    pub fn confirm_raised(&mut self) {
        self.notified = true;
    }
}

/// Keeps system volume at or above the floor until the session token is
/// cancelled. Gives up for the session when the sink has no volume control.
pub async fn volume_loop(
    mut floor: VolumeFloor,
    audio: Arc<dyn AudioSink>,
    hub: SessionHub,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) {
    let floor_value = floor.floor();

    if !audio.has_volume_control() {
        log_warn!(
            "volume control unavailable, floor of {} not enforced",
            floor_value
        );
        mark_unavailable(&hub, floor_value, UNSUPPORTED).await;
        return;
    }

    hub.update(|s| {
        s.volume.floor = Some(floor_value);
        s.volume.health = LoopHealth::Active;
    })
    .await;

    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let sink = audio.clone();
        let current = match tokio::task::spawn_blocking(move || sink.get_volume()).await {
            Ok(Ok(volume)) => volume,
            Ok(Err(DeviceError::Unsupported)) => {
                mark_unavailable(&hub, floor_value, UNSUPPORTED).await;
                return;
            }
            Ok(Err(err)) => {
                log_warn!("reading volume failed, retrying next poll: {err}");
                hub.update(|s| s.volume.health = LoopHealth::Degraded(err.to_string()))
                    .await;
                continue;
            }
            Err(join_err) => {
                hub.update(|s| s.volume.health = LoopHealth::Degraded(join_err.to_string()))
                    .await;
                continue;
            }
        };

        let Some(clamp) = floor.check(current) else {
            hub.update(|s| {
                s.volume.current = Some(current);
                s.volume.health = LoopHealth::Active;
            })
            .await;
            continue;
        };

        let sink = audio.clone();
        let raised = tokio::task::spawn_blocking(move || sink.set_volume(clamp.to)).await;
        match raised {
            Ok(Ok(())) => {
                floor.confirm_raised();
                hub.update(|s| {
                    s.volume.current = Some(clamp.to);
                    s.volume.health = LoopHealth::Active;
                })
                .await;
                if clamp.notify {
                    log_info!("volume raised from {} to {}", clamp.from, clamp.to);
                    hub.emit(SessionEvent::VolumeRaised {
                        from: clamp.from,
                        to: clamp.to,
                    });
                }
            }
            Ok(Err(err)) => {
                log_warn!("raising volume failed, retrying next poll: {err}");
                hub.update(|s| {
                    s.volume.current = Some(current);
                    s.volume.health = LoopHealth::Degraded(err.to_string());
                })
                .await;
            }
            Err(join_err) => {
                hub.update(|s| s.volume.health = LoopHealth::Degraded(join_err.to_string()))
                    .await;
            }
        }
    }

    hub.update(|s| s.volume.health = LoopHealth::Idle).await;
}

async fn mark_unavailable(hub: &SessionHub, floor: u8, reason: &str) {
    hub.update(|s| {
        s.volume.floor = Some(floor);
        s.volume.current = None;
        s.volume.health = LoopHealth::Unavailable(reason.to_string());
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_floor_is_clamped_and_notified_once_per_episode() {
        let mut floor = VolumeFloor::new(20);
        assert_eq!(
            floor.check(10),
            Some(Clamp {
                from: 10,
                to: 20,
                notify: true
            })
        );
        floor.confirm_raised();
        // The set did not stick; clamp again without a second notification.
        assert_eq!(
            floor.check(10),
            Some(Clamp {
                from: 10,
                to: 20,
                notify: false
            })
        );
        assert_eq!(floor.check(20), None);
        // A new episode notifies again.
        assert_eq!(
            floor.check(5),
            Some(Clamp {
                from: 5,
                to: 20,
                notify: true
            })
        );
    }

    #[test]
    fn failed_raise_keeps_the_notice_for_the_next_clamp() {
        let mut floor = VolumeFloor::new(20);
        assert!(floor.check(10).is_some_and(|clamp| clamp.notify));
        // No confirm_raised: the set failed.
        assert!(floor.check(10).is_some_and(|clamp| clamp.notify));
        floor.confirm_raised();
        assert!(floor.check(10).is_some_and(|clamp| !clamp.notify));
    }

    #[test]
    fn at_or_above_floor_is_left_alone() {
        let mut floor = VolumeFloor::new(20);
        assert_eq!(floor.check(20), None);
        assert_eq!(floor.check(100), None);
    }

    #[test]
    fn floor_is_capped_at_100() {
        assert_eq!(VolumeFloor::new(150).floor(), 100);
    }
}
