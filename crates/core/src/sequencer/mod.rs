//! Countdown and capture state machine.
//!
//! [`transition`] is the only code that mutates a [`SequencerState`]. It is a
//! pure function of the current state, the plan and one [`Event`]; everything
//! it wants the outside world to do (take a picture, arm a timer) comes back
//! as a list of [`Effect`]s for the caller to execute.
//!
//! Reaching zero and requesting the capture happen in the same transition.
//! The settle delay that follows only decides when the next countdown begins.

use std::fmt;

use crate::{camera::Frame, plan::ShotPlan};

/// Generation counter identifying one capture run. Timers and captures carry
/// the id of the run that armed them so late arrivals can be told apart.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(pub u64);

impl RunId {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CountingDown { shot: usize, ticks_left: u32 },
    /// Zero was reached; the capture for `shot` has been requested.
    Capturing { shot: usize },
    /// Frame taken, waiting one tick before the next countdown.
    AdvancingDelay { shot: usize },
    Complete,
}

impl Phase {
    /// Whether a run is in flight and `start` must be refused.
    pub fn is_running(&self) -> bool {
        !matches!(self, Phase::Idle | Phase::Complete)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::CountingDown { shot, ticks_left } => {
                write!(f, "counting down shot {shot} ({ticks_left} left)")
            }
            Phase::Capturing { shot } => write!(f, "capturing shot {shot}"),
            Phase::AdvancingDelay { shot } => write!(f, "settling after shot {shot}"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}

/// Which kind of wait a scheduled tick ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    Countdown,
    Settle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start,
    Reset,
    Tick { run: RunId },
    FrameCaptured { run: RunId, frame: Option<Frame> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the camera for a snapshot and feed it back as `FrameCaptured`.
    RequestCapture { run: RunId, shot: usize },
    /// Arm a timer that delivers `Tick { run }` one time unit from now.
    ScheduleTick { run: RunId, kind: TickKind },
    /// Drop every pending timer.
    CancelTimers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// `Start` while a run is in flight.
    AlreadyRunning,
    /// Tick or capture tagged with a run other than the current one.
    StaleTick,
    /// Event that has no meaning in the current phase.
    UnexpectedEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Rejected(Rejection),
}

/// Result of feeding one event to [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn applied(effects: Vec<Effect>) -> Self {
        Self {
            outcome: Outcome::Applied,
            effects,
        }
    }

    fn rejected(reason: Rejection) -> Self {
        Self {
            outcome: Outcome::Rejected(reason),
            effects: Vec::new(),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}

/// Everything the UI needs to render the booth: countdown, thumbnails and
/// which shot is next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerState {
    run: RunId,
    phase: Phase,
    current_shot: usize,
    countdown: Option<u32>,
    frames: Vec<Option<Frame>>,
}

impl Default for SequencerState {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencerState {
    pub fn new() -> Self {
        Self {
            run: RunId::default(),
            phase: Phase::Idle,
            current_shot: 0,
            countdown: None,
            frames: Vec::new(),
        }
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_shot(&self) -> usize {
        self.current_shot
    }

    /// Value to show on screen; `None` while idle or complete.
    pub fn countdown(&self) -> Option<u32> {
        self.countdown
    }

    pub fn frames(&self) -> &[Option<Frame>] {
        &self.frames
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    /// Caption for the capture button.
    pub fn status_label(&self) -> &'static str {
        if self.is_running() {
            "Capturing..."
        } else {
            "Capture Moment"
        }
    }

    fn begin_countdown(&mut self, shot: usize, ticks: u32) -> Vec<Effect> {
        self.current_shot = shot;
        self.phase = Phase::CountingDown {
            shot,
            ticks_left: ticks,
        };
        self.countdown = Some(ticks);
        vec![Effect::ScheduleTick {
            run: self.run,
            kind: TickKind::Countdown,
        }]
    }
}

/// Applies one event to `state`.
///
/// Rejected events leave `state` untouched and return no effects.
pub fn transition(state: &mut SequencerState, plan: &ShotPlan, event: Event) -> Transition {
    match event {
        Event::Start => start(state, plan),
        Event::Reset => reset(state),
        Event::Tick { run } => {
            if run != state.run {
                return Transition::rejected(Rejection::StaleTick);
            }
            tick(state, plan)
        }
        Event::FrameCaptured { run, frame } => {
            if run != state.run {
                return Transition::rejected(Rejection::StaleTick);
            }
            captured(state, plan, frame)
        }
    }
}

fn start(state: &mut SequencerState, plan: &ShotPlan) -> Transition {
    if state.is_running() {
        return Transition::rejected(Rejection::AlreadyRunning);
    }
    let Some(first) = plan.first_count(0) else {
        return Transition::rejected(Rejection::UnexpectedEvent);
    };

    state.run = state.run.next();
    state.frames.clear();

    let mut effects = vec![Effect::CancelTimers];
    effects.extend(state.begin_countdown(0, first));
    Transition::applied(effects)
}

fn reset(state: &mut SequencerState) -> Transition {
    state.run = state.run.next();
    state.phase = Phase::Idle;
    state.current_shot = 0;
    state.countdown = None;
    state.frames.clear();
    Transition::applied(vec![Effect::CancelTimers])
}

fn tick(state: &mut SequencerState, plan: &ShotPlan) -> Transition {
    match state.phase {
        Phase::CountingDown { shot, ticks_left } if ticks_left > 1 => {
            let ticks_left = ticks_left - 1;
            state.phase = Phase::CountingDown { shot, ticks_left };
            state.countdown = Some(ticks_left);
            Transition::applied(vec![Effect::ScheduleTick {
                run: state.run,
                kind: TickKind::Countdown,
            }])
        }
        Phase::CountingDown { shot, .. } => {
            state.phase = Phase::Capturing { shot };
            state.countdown = Some(0);
            Transition::applied(vec![Effect::RequestCapture {
                run: state.run,
                shot,
            }])
        }
        Phase::AdvancingDelay { shot } => match plan.first_count(shot + 1) {
            Some(first) => Transition::applied(state.begin_countdown(shot + 1, first)),
            None => Transition::rejected(Rejection::UnexpectedEvent),
        },
        Phase::Idle | Phase::Capturing { .. } | Phase::Complete => {
            Transition::rejected(Rejection::UnexpectedEvent)
        }
    }
}

fn captured(state: &mut SequencerState, plan: &ShotPlan, frame: Option<Frame>) -> Transition {
    let Phase::Capturing { shot } = state.phase else {
        return Transition::rejected(Rejection::UnexpectedEvent);
    };

    state.frames.push(frame);

    if shot < plan.last_shot_index() {
        state.phase = Phase::AdvancingDelay { shot };
        Transition::applied(vec![Effect::ScheduleTick {
            run: state.run,
            kind: TickKind::Settle,
        }])
    } else {
        state.phase = Phase::Complete;
        state.countdown = None;
        Transition::applied(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> Frame {
        Frame::from_bytes(vec![tag])
    }

    /// Feeds ticks and answers capture requests with tagged frames until the
    /// machine stops scheduling. Returns (ticks delivered, captures requested).
    fn drive(
        state: &mut SequencerState,
        plan: &ShotPlan,
        mut effects: Vec<Effect>,
    ) -> (usize, usize) {
        let mut ticks = 0;
        let mut captures = 0;
        while let Some(effect) = effects.pop() {
            match effect {
                Effect::ScheduleTick { run, .. } => {
                    ticks += 1;
                    effects.extend(transition(state, plan, Event::Tick { run }).effects);
                }
                Effect::RequestCapture { run, shot } => {
                    captures += 1;
                    let event = Event::FrameCaptured {
                        run,
                        frame: Some(frame(shot as u8)),
                    };
                    effects.extend(transition(state, plan, event).effects);
                }
                Effect::CancelTimers => {}
            }
        }
        (ticks, captures)
    }

    #[test]
    fn start_enters_first_countdown() {
        let plan = ShotPlan::default();
        let mut state = SequencerState::new();

        let t = transition(&mut state, &plan, Event::Start);

        assert!(t.is_applied());
        assert_eq!(
            state.phase(),
            Phase::CountingDown {
                shot: 0,
                ticks_left: 3
            }
        );
        assert_eq!(state.countdown(), Some(3));
        assert_eq!(state.status_label(), "Capturing...");
        assert!(t.effects.contains(&Effect::CancelTimers));
        assert!(t.effects.contains(&Effect::ScheduleTick {
            run: state.run(),
            kind: TickKind::Countdown,
        }));
    }

    #[test]
    fn full_run_takes_fifteen_ticks_and_three_captures() {
        let plan = ShotPlan::default();
        let mut state = SequencerState::new();
        let effects = transition(&mut state, &plan, Event::Start).effects;

        let (ticks, captures) = drive(&mut state, &plan, effects);

        assert_eq!(ticks, 15);
        assert_eq!(captures, 3);
        assert!(state.is_complete());
        assert_eq!(state.countdown(), None);
        assert_eq!(
            state.frames(),
            &[Some(frame(0)), Some(frame(1)), Some(frame(2))]
        );
    }

    #[test]
    fn capture_is_requested_on_the_tick_that_reaches_zero() {
        let plan = ShotPlan::new(vec![vec![2, 1], vec![1]]).unwrap();
        let mut state = SequencerState::new();
        transition(&mut state, &plan, Event::Start);
        let run = state.run();

        let t = transition(&mut state, &plan, Event::Tick { run });
        assert_eq!(
            t.effects,
            vec![Effect::ScheduleTick {
                run,
                kind: TickKind::Countdown
            }]
        );
        assert_eq!(state.countdown(), Some(1));

        let t = transition(&mut state, &plan, Event::Tick { run });
        assert_eq!(t.effects, vec![Effect::RequestCapture { run, shot: 0 }]);
        assert_eq!(state.phase(), Phase::Capturing { shot: 0 });
        assert_eq!(state.countdown(), Some(0));

        // No second capture while the first is outstanding.
        let t = transition(&mut state, &plan, Event::Tick { run });
        assert_eq!(t.outcome, Outcome::Rejected(Rejection::UnexpectedEvent));
    }

    #[test]
    fn settle_tick_starts_next_countdown() {
        let plan = ShotPlan::new(vec![vec![1], vec![2, 1]]).unwrap();
        let mut state = SequencerState::new();
        transition(&mut state, &plan, Event::Start);
        let run = state.run();

        transition(&mut state, &plan, Event::Tick { run });
        let t = transition(&mut state, &plan, Event::FrameCaptured { run, frame: None });
        assert_eq!(
            t.effects,
            vec![Effect::ScheduleTick {
                run,
                kind: TickKind::Settle
            }]
        );
        assert_eq!(state.phase(), Phase::AdvancingDelay { shot: 0 });

        transition(&mut state, &plan, Event::Tick { run });
        assert_eq!(
            state.phase(),
            Phase::CountingDown {
                shot: 1,
                ticks_left: 2
            }
        );
        assert_eq!(state.current_shot(), 1);
        assert_eq!(state.frames().len(), 1);
        assert!(state.frames()[0].is_none());
    }

    #[test]
    fn null_frames_do_not_stop_the_run() {
        let plan = ShotPlan::new(vec![vec![1], vec![1]]).unwrap();
        let mut state = SequencerState::new();
        transition(&mut state, &plan, Event::Start);
        let run = state.run();

        for _ in 0..2 {
            transition(&mut state, &plan, Event::Tick { run });
            transition(&mut state, &plan, Event::FrameCaptured { run, frame: None });
            transition(&mut state, &plan, Event::Tick { run });
        }

        assert!(state.is_complete());
        assert_eq!(state.frames().len(), 2);
        assert!(state.frames().iter().all(Option::is_none));
    }

    #[test]
    fn second_start_is_rejected_without_state_change() {
        let plan = ShotPlan::default();
        let mut state = SequencerState::new();
        transition(&mut state, &plan, Event::Start);
        let before = state.clone();

        let t = transition(&mut state, &plan, Event::Start);

        assert_eq!(t.outcome, Outcome::Rejected(Rejection::AlreadyRunning));
        assert!(t.effects.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn start_after_complete_clears_frames() {
        let plan = ShotPlan::new(vec![vec![1]]).unwrap();
        let mut state = SequencerState::new();
        let effects = transition(&mut state, &plan, Event::Start).effects;
        drive(&mut state, &plan, effects);
        assert_eq!(state.frames().len(), 1);

        let t = transition(&mut state, &plan, Event::Start);

        assert!(t.is_applied());
        assert!(state.frames().is_empty());
        assert_eq!(state.current_shot(), 0);
    }

    #[test]
    fn stale_ticks_after_reset_are_ignored() {
        let plan = ShotPlan::default();
        let mut state = SequencerState::new();
        transition(&mut state, &plan, Event::Start);
        let old_run = state.run();
        transition(&mut state, &plan, Event::Tick { run: old_run });

        let t = transition(&mut state, &plan, Event::Reset);
        assert_eq!(t.effects, vec![Effect::CancelTimers]);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.countdown(), None);

        transition(&mut state, &plan, Event::Start);
        let fresh = state.clone();

        let t = transition(&mut state, &plan, Event::Tick { run: old_run });
        assert_eq!(t.outcome, Outcome::Rejected(Rejection::StaleTick));
        let t = transition(
            &mut state,
            &plan,
            Event::FrameCaptured {
                run: old_run,
                frame: Some(frame(9)),
            },
        );
        assert_eq!(t.outcome, Outcome::Rejected(Rejection::StaleTick));
        assert_eq!(state, fresh);
    }

    #[test]
    fn ticks_while_idle_are_unexpected() {
        let plan = ShotPlan::default();
        let mut state = SequencerState::new();
        let run = state.run();

        let t = transition(&mut state, &plan, Event::Tick { run });
        assert_eq!(t.outcome, Outcome::Rejected(Rejection::UnexpectedEvent));
        assert_eq!(state.status_label(), "Capture Moment");
    }
}
