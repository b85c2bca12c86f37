//! The beacon controller decides what the light shows for each poll.

use thiserror::Error;

use crate::color::Rgb;
use crate::flash::{FlashExit, FlashLoop};
use crate::host::{LinkError, SharedLink};
use crate::severity::SeverityOption;

#[derive(Error, Debug)]
pub enum BeaconError {
    #[error(transparent)]
    Link(#[from] LinkError),
}

pub type BeaconResult<T> = Result<T, BeaconError>;

/// What the beacon was set to by [`BeaconController::apply_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeaconOutput {
    /// No problems, but not clear for long enough to switch off.
    Idle,
    /// Switched off with the hardware clear command.
    Cleared,
    /// A single severity color.
    Steady,
    /// Primary color sent and a flash loop started.
    Flashing,
}

/// Owns the beacon state between polls.
pub struct BeaconController {
    link: SharedLink,
    /// Shown while the clear streak is below `clear_after`.
    idle_color: Rgb,
    clear_after: u32,
    /// Consecutive polls without an active problem. Saturates at `clear_after`.
    clear_streak: u32,
    flash: Option<FlashLoop>,
}

impl BeaconController {
    /// `clear_after` is raised to 1 if given as 0.
    pub fn new(link: SharedLink, idle_color: Rgb, clear_after: u32) -> BeaconController {
        BeaconController {
            link,
            idle_color,
            clear_after: clear_after.max(1),
            clear_streak: 0,
            flash: None,
        }
    }

    pub fn clear_streak(&self) -> u32 {
        self.clear_streak
    }

    /// True while a flash loop is running.
    pub fn is_flashing(&self) -> bool {
        self.flash.as_ref().is_some_and(|flash| !flash.is_finished())
    }

    /// Show `option` on the beacon, or the all-clear state when `None`.
    ///
    /// Any running flash loop is stopped, and has exited, before anything
    /// else is written.
    pub async fn apply_state(&mut self, option: Option<&SeverityOption>) -> BeaconResult<BeaconOutput> {
        self.stop_flashing().await;

        let option = match option {
            Some(option) => option,
            None => return self.apply_clear().await,
        };

        self.clear_streak = 0;
        self.link.lock().await.send_frame(option.primary)?;

        match option.flash_pattern() {
            Some(pattern) => {
                self.flash = Some(FlashLoop::start(self.link.clone(), pattern));
                Ok(BeaconOutput::Flashing)
            }
            None => Ok(BeaconOutput::Steady),
        }
    }

    async fn apply_clear(&mut self) -> BeaconResult<BeaconOutput> {
        let mut link = self.link.lock().await;

        if self.clear_streak + 1 < self.clear_after {
            link.send_frame(self.idle_color)?;
            self.clear_streak += 1;
            return Ok(BeaconOutput::Idle);
        }

        link.send_clear_frame()?;
        self.clear_streak = self.clear_after;
        Ok(BeaconOutput::Cleared)
    }

    async fn stop_flashing(&mut self) {
        if let Some(flash) = self.flash.take() {
            match flash.stop().await {
                FlashExit::Cancelled => {}
                FlashExit::Failed(err) => {
                    tracing::warn!(error = %err, "Previous flash loop had stopped on a transport error");
                }
            }
        }
    }

    /// Stop flashing and close the port.
    pub async fn shutdown(mut self) {
        self.stop_flashing().await;
        self.link.lock().await.close();
    }
}
