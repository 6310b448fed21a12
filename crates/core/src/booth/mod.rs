use std::collections::VecDeque;

use crate::{
    camera::Camera,
    record::{save_collage, CollageSink},
    render::{Collage, Compositor},
    sequencer::{transition, Effect, Event, Outcome, Rejection, RunId, SequencerState},
    timeline::TickTimer,
    AppConfig, BoothError, Result, ShotPlan,
};

/// Controller that owns the sequencer state and executes its effects.
///
/// The booth is the only caller of [`transition`]. Every public operation
/// funnels through `dispatch`, which runs the resulting effects to quiescence
/// before returning, so a capture request is answered within the same tick
/// that reached zero.
#[derive(Debug)]
pub struct Booth<C> {
    plan: ShotPlan,
    state: SequencerState,
    timer: TickTimer,
    camera: C,
    compositor: Compositor,
}

impl<C: Camera> Booth<C> {
    pub fn new(config: &AppConfig, camera: C) -> Result<Self> {
        let compositor = Compositor::new(config.collage.clone())?;
        Ok(Self::with_parts(config.plan.clone(), compositor, camera))
    }

    pub fn with_parts(plan: ShotPlan, compositor: Compositor, camera: C) -> Self {
        Self {
            plan,
            state: SequencerState::new(),
            timer: TickTimer::new(),
            camera,
            compositor,
        }
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn plan(&self) -> &ShotPlan {
        &self.plan
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }

    /// Begins a new run. Refused while a previous run is still in flight.
    pub fn start(&mut self) -> Result<RunId> {
        match self.dispatch(Event::Start) {
            Outcome::Applied => {
                tracing::info!(
                    run = %self.state.run(),
                    shots = self.plan.shot_count(),
                    "capture sequence started"
                );
                Ok(self.state.run())
            }
            Outcome::Rejected(reason) => {
                tracing::warn!(
                    ?reason,
                    phase = %self.state.phase(),
                    "InvalidStart: start rejected"
                );
                Err(BoothError::InvalidStart {
                    phase: self.state.phase().to_string(),
                })
            }
        }
    }

    /// Clears frames and countdown. Also aborts a run in flight.
    pub fn reset(&mut self) {
        let was_running = self.state.is_running();
        self.dispatch(Event::Reset);
        tracing::info!(aborted = was_running, "booth reset");
    }

    /// Advances the timer by one unit and delivers the tick that came due.
    /// Returns `None` when no timer was armed.
    pub fn tick(&mut self) -> Option<Outcome> {
        let due = self.timer.advance(1)?;
        tracing::trace!(run = %due.run, kind = ?due.kind, at = due.due, "tick due");
        Some(self.deliver(due.run))
    }

    /// Delivers a timer firing for `run` directly, as a host timer would.
    pub fn deliver(&mut self, run: RunId) -> Outcome {
        let outcome = self.dispatch(Event::Tick { run });
        if outcome == Outcome::Rejected(Rejection::StaleTick) {
            tracing::debug!(%run, current = %self.state.run(), "stale tick dropped");
        }
        outcome
    }

    /// Ticks until the run completes. Fails if the run stalls or needs more
    /// than `max_ticks`.
    pub fn run_to_completion(&mut self, max_ticks: u64) -> Result<u64> {
        let mut ticks = 0;
        while self.state.is_running() {
            if ticks >= max_ticks {
                return Err(BoothError::msg(format!(
                    "capture sequence did not complete within {max_ticks} ticks"
                )));
            }
            if self.tick().is_none() {
                return Err(BoothError::msg(format!(
                    "capture sequence stalled in {}",
                    self.state.phase()
                )));
            }
            ticks += 1;
        }
        Ok(ticks)
    }

    /// Whether every shot of the plan has been taken.
    pub fn collage_ready(&self) -> bool {
        self.state.is_complete() && self.state.frames().len() == self.plan.shot_count()
    }

    pub fn compose(&self) -> Result<Collage> {
        if !self.collage_ready() {
            return Err(BoothError::NotReady {
                taken: self.state.frames().len(),
                expected: self.plan.shot_count(),
            });
        }
        self.compositor.compose(self.state.frames())
    }

    /// Composes the collage and hands it to `sink`.
    pub fn download(&self, sink: &mut dyn CollageSink) -> Result<Collage> {
        let collage = self.compose()?;
        save_collage(sink, &collage);
        Ok(collage)
    }

    fn dispatch(&mut self, event: Event) -> Outcome {
        let mut queue = VecDeque::from([event]);
        let mut first = None;

        while let Some(event) = queue.pop_front() {
            let step = transition(&mut self.state, &self.plan, event);
            first.get_or_insert(step.outcome);

            for effect in step.effects {
                match effect {
                    Effect::CancelTimers => self.timer.cancel(),
                    Effect::ScheduleTick { run, kind } => self.timer.schedule(run, kind),
                    Effect::RequestCapture { run, shot } => {
                        let frame = self.camera.snapshot();
                        if frame.is_none() {
                            tracing::warn!(shot, "CaptureUnavailable: recording empty frame");
                        } else {
                            tracing::info!(shot, "frame captured");
                        }
                        queue.push_back(Event::FrameCaptured { run, frame });
                    }
                }
            }
        }

        first.unwrap_or(Outcome::Applied)
    }
}
