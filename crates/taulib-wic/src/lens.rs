//! Lens/range switch state machine.
//!
//! Changing the active lens calibration or range mode takes the camera
//! through a multi-step device sequence that can run for minutes. While it
//! runs, the camera must not receive any other command. [`LensSwitch`]
//! tracks the `Idle -> InProgress -> Ready -> Idle` cycle in a
//! [`tokio::sync::watch`] channel; camera methods consult it before queueing
//! a command, and the switch itself runs as a cancellable task that talks
//! to the session directly.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use taulib_core::{CameraEvent, Error, RangeMode, ResponseStatus, Result};

use crate::calibration::{CalibrationEngine, RangeCalibration};
use crate::io::SessionHandle;
use crate::registry::{
    self, Argument, DO_FFC, GAIN_MODE, GainMode, LENS_RESPONSE, NO_OP, RADIOMETRY,
    RadiometricParameter, RadiometryCommand, Selector, WireValue,
};

/// A lens and range combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTarget {
    pub lens: String,
    pub range: RangeMode,
}

impl fmt::Display for SwitchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} range)", self.lens, self.range)
    }
}

/// How a finished switch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Completed,
    Failed {
        /// Device-facing status of the failure, when there is one.
        status: Option<ResponseStatus>,
        reason: String,
    },
    Cancelled,
}

impl SwitchOutcome {
    fn from_error(err: &Error) -> Self {
        SwitchOutcome::Failed {
            status: err.status(),
            reason: err.to_string(),
        }
    }

    fn into_result(self, target: &SwitchTarget) -> Result<()> {
        match self {
            SwitchOutcome::Completed => Ok(()),
            SwitchOutcome::Failed {
                status: Some(ResponseStatus::TimeoutError),
                ..
            } => Err(Error::Timeout),
            SwitchOutcome::Failed {
                status: Some(status),
                ..
            } => Err(Error::Device(status)),
            SwitchOutcome::Failed { status: None, reason } => Err(Error::Protocol(format!(
                "switch to {target} failed: {reason}"
            ))),
            SwitchOutcome::Cancelled => {
                Err(Error::Protocol(format!("switch to {target} was cancelled")))
            }
        }
    }
}

/// Observable state of the switch machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchState {
    Idle,
    InProgress { target: SwitchTarget },
    /// Finished but not yet acknowledged by a readiness poll.
    Ready {
        target: SwitchTarget,
        outcome: SwitchOutcome,
    },
}

impl SwitchState {
    pub fn is_busy(&self) -> bool {
        matches!(self, SwitchState::InProgress { .. })
    }
}

/// Gate shared by a camera and its running switch task.
#[derive(Debug)]
pub(crate) struct LensSwitch {
    state: watch::Sender<SwitchState>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl LensSwitch {
    pub fn new() -> Self {
        LensSwitch {
            state: watch::Sender::new(SwitchState::Idle),
            cancel: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SwitchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SwitchState> {
        self.state.subscribe()
    }

    /// Fail with [`Error::DeviceBusy`] while a switch is in progress.
    pub fn ensure_not_busy(&self) -> Result<()> {
        if self.state.borrow().is_busy() {
            Err(Error::DeviceBusy)
        } else {
            Ok(())
        }
    }

    /// Enter `InProgress`. An unacknowledged `Ready` is dropped.
    pub fn begin(&self, target: SwitchTarget) -> Result<CancellationToken> {
        let mut busy = false;
        self.state.send_if_modified(|state| {
            if state.is_busy() {
                busy = true;
                return false;
            }
            if let SwitchState::Ready { target: previous, outcome } = state {
                debug!(%previous, ?outcome, "dropping unacknowledged switch result");
            }
            *state = SwitchState::InProgress {
                target: target.clone(),
            };
            true
        });
        if busy {
            return Err(Error::DeviceBusy);
        }

        let token = CancellationToken::new();
        *self.cancel.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(token)
    }

    /// Leave `InProgress` with the given outcome.
    pub fn finish(&self, outcome: SwitchOutcome) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.state.send_if_modified(|state| match state {
            SwitchState::InProgress { target } => {
                *state = SwitchState::Ready {
                    target: target.clone(),
                    outcome,
                };
                true
            }
            _ => false,
        });
    }

    /// Non-blocking readiness poll.
    ///
    /// Returns `Ok(false)` while in progress and `Ok(true)` when idle or
    /// after a successful switch. Observing `Ready` acknowledges it; a
    /// failed switch is reported once as an error.
    pub fn poll_ready(&self) -> Result<bool> {
        let mut finished = None;
        self.state.send_if_modified(|state| match state {
            SwitchState::Ready { target, outcome } => {
                finished = Some((target.clone(), outcome.clone()));
                *state = SwitchState::Idle;
                true
            }
            _ => false,
        });
        match finished {
            Some((target, outcome)) => outcome.into_result(&target).map(|()| true),
            None => Ok(!self.state.borrow().is_busy()),
        }
    }

    /// Wait until no switch is in progress, then acknowledge the result.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut rx = self.state.subscribe();
        rx.wait_for(|state| !state.is_busy())
            .await
            .map_err(|_| Error::NotConnected)?;
        self.poll_ready().map(|_| ())
    }

    /// Request cancellation of the running switch, if any.
    ///
    /// Returns whether a switch was running. The command already sent to
    /// the camera is not interrupted.
    pub fn cancel(&self) -> bool {
        match self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

// ---------------------------------------------------------------
// Switch task
// ---------------------------------------------------------------

/// Everything the switch task needs from its camera.
pub(crate) struct SwitchContext {
    pub session: SessionHandle,
    pub gate: Arc<LensSwitch>,
    pub engine: Arc<Mutex<CalibrationEngine>>,
    pub active: Arc<Mutex<SwitchTarget>>,
    pub events: broadcast::Sender<CameraEvent>,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// Start a switch to `target`, failing with [`Error::DeviceBusy`] if one
/// is already running.
pub(crate) fn spawn_switch(
    ctx: SwitchContext,
    target: SwitchTarget,
    calibration: RangeCalibration,
) -> Result<JoinHandle<()>> {
    let cancel = ctx.gate.begin(target.clone())?;
    debug!(%target, bank = calibration.bank, "lens switch started");
    let _ = ctx.events.send(CameraEvent::SwitchStarted {
        lens: target.lens.clone(),
        range: target.range,
    });

    Ok(tokio::spawn(async move {
        let outcome = tokio::select! {
            biased;

            _ = cancel.cancelled() => SwitchOutcome::Cancelled,

            result = tokio::time::timeout(
                ctx.timeout,
                run_sequence(&ctx, &target, &calibration),
            ) => match result {
                Ok(Ok(())) => SwitchOutcome::Completed,
                Ok(Err(e)) => SwitchOutcome::from_error(&e),
                Err(_) => SwitchOutcome::from_error(&Error::Timeout),
            },
        };

        match &outcome {
            SwitchOutcome::Completed => {
                ctx.engine
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_calibration(target.range, calibration.curve);
                *ctx.active.lock().unwrap_or_else(PoisonError::into_inner) = target.clone();
                debug!(%target, "lens switch completed");
                let _ = ctx.events.send(CameraEvent::SwitchCompleted {
                    lens: target.lens.clone(),
                    range: target.range,
                });
            }
            SwitchOutcome::Failed { reason, .. } => {
                warn!(%target, %reason, "lens switch failed");
                let _ = ctx.events.send(CameraEvent::SwitchFailed {
                    lens: target.lens.clone(),
                    range: target.range,
                    reason: reason.clone(),
                });
            }
            SwitchOutcome::Cancelled => {
                warn!(%target, "lens switch cancelled");
                let _ = ctx.events.send(CameraEvent::SwitchFailed {
                    lens: target.lens.clone(),
                    range: target.range,
                    reason: "cancelled".into(),
                });
            }
        }
        ctx.gate.finish(outcome);
    }))
}

/// Gain mode that selects `range` on the detector.
fn gain_for(range: RangeMode) -> GainMode {
    match range {
        RangeMode::Low => GainMode::High,
        RangeMode::Middle | RangeMode::High => GainMode::Low,
    }
}

async fn run_sequence(
    ctx: &SwitchContext,
    target: &SwitchTarget,
    calibration: &RangeCalibration,
) -> Result<()> {
    let session = &ctx.session;

    let gain = gain_for(target.range);
    debug!(?gain, "switch: gain mode");
    session
        .command(registry::build_set(&GAIN_MODE, None, &gain.to_argument())?)
        .await?;

    let high_resolution = target.range == RangeMode::Low;
    debug!(high_resolution, "switch: radiometry resolution");
    let resolution = registry::build_set(
        &RADIOMETRY,
        Some(Selector::Radiometry(RadiometryCommand::Resolution)),
        &high_resolution.to_argument(),
    )?;
    match session.command(resolution).await {
        Ok(_) => {}
        Err(Error::Device(ResponseStatus::FeatureNotEnabled)) => {
            debug!("switch: camera has no radiometry resolution setting");
        }
        Err(e) => return Err(e),
    }

    debug!(bank = calibration.bank, "switch: calibration bank");
    session
        .command(registry::build_set(
            &LENS_RESPONSE,
            Some(Selector::Radiometric(RadiometricParameter::CalibrationBank)),
            &Argument::Int32(calibration.bank as i32),
        )?)
        .await?;

    debug!("switch: FFC");
    session.command(registry::build_action(&DO_FFC)?).await?;

    wait_for_device(session, ctx.poll_interval).await
}

/// Poll NO_OP until the camera answers again. The caller bounds the wait.
async fn wait_for_device(session: &SessionHandle, poll_interval: Duration) -> Result<()> {
    let mut polls = 0u32;
    loop {
        match session.command(registry::build_action(&NO_OP)?).await {
            Ok(_) => {
                debug!(polls, "switch: camera ready");
                return Ok(());
            }
            Err(Error::Timeout) => {
                polls += 1;
                tokio::time::sleep(poll_interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(lens: &str, range: RangeMode) -> SwitchTarget {
        SwitchTarget {
            lens: lens.into(),
            range,
        }
    }

    #[test]
    fn idle_is_ready() {
        let gate = LensSwitch::new();
        assert!(gate.ensure_not_busy().is_ok());
        assert!(gate.poll_ready().unwrap());
    }

    #[test]
    fn busy_while_in_progress() {
        let gate = LensSwitch::new();
        gate.begin(target("019mm", RangeMode::Low)).unwrap();

        assert!(matches!(gate.ensure_not_busy(), Err(Error::DeviceBusy)));
        assert!(!gate.poll_ready().unwrap());
        assert!(matches!(
            gate.begin(target("035mm", RangeMode::Low)),
            Err(Error::DeviceBusy)
        ));
    }

    #[test]
    fn ready_is_acknowledged_once() {
        let gate = LensSwitch::new();
        gate.begin(target("019mm", RangeMode::Middle)).unwrap();
        gate.finish(SwitchOutcome::Completed);

        assert!(matches!(gate.state(), SwitchState::Ready { .. }));
        assert!(gate.ensure_not_busy().is_ok());
        assert!(gate.poll_ready().unwrap());
        assert_eq!(gate.state(), SwitchState::Idle);
    }

    #[test]
    fn failure_surfaces_status() {
        let gate = LensSwitch::new();
        gate.begin(target("019mm", RangeMode::High)).unwrap();
        gate.finish(SwitchOutcome::from_error(&Error::Device(
            ResponseStatus::RangeError,
        )));

        assert!(matches!(
            gate.poll_ready(),
            Err(Error::Device(ResponseStatus::RangeError))
        ));
        // Reported once; the machine is idle afterwards.
        assert!(gate.poll_ready().unwrap());
    }

    #[test]
    fn timeout_failure_maps_to_timeout() {
        let gate = LensSwitch::new();
        gate.begin(target("019mm", RangeMode::Low)).unwrap();
        gate.finish(SwitchOutcome::from_error(&Error::Timeout));
        assert!(matches!(gate.poll_ready(), Err(Error::Timeout)));
    }

    #[test]
    fn cancel_signals_token() {
        let gate = LensSwitch::new();
        assert!(!gate.cancel());

        let token = gate.begin(target("019mm", RangeMode::Low)).unwrap();
        assert!(gate.cancel());
        assert!(token.is_cancelled());
        gate.finish(SwitchOutcome::Cancelled);
        assert!(gate.poll_ready().is_err());
    }

    #[test]
    fn begin_replaces_unacknowledged_ready() {
        let gate = LensSwitch::new();
        gate.begin(target("019mm", RangeMode::Low)).unwrap();
        gate.finish(SwitchOutcome::Cancelled);
        gate.begin(target("019mm", RangeMode::Middle)).unwrap();
        assert_eq!(
            gate.state(),
            SwitchState::InProgress {
                target: target("019mm", RangeMode::Middle)
            }
        );
    }

    #[tokio::test]
    async fn wait_ready_returns_after_finish() {
        let gate = Arc::new(LensSwitch::new());
        gate.begin(target("019mm", RangeMode::Low)).unwrap();

        let finisher = Arc::clone(&gate);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            finisher.finish(SwitchOutcome::Completed);
        });

        gate.wait_ready().await.unwrap();
        assert_eq!(gate.state(), SwitchState::Idle);
    }

    #[test]
    fn gain_follows_range() {
        assert_eq!(gain_for(RangeMode::Low), GainMode::High);
        assert_eq!(gain_for(RangeMode::Middle), GainMode::Low);
        assert_eq!(gain_for(RangeMode::High), GainMode::Low);
    }
}
