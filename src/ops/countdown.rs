//! The single active countdown.
//!
//! At most one countdown is registered at a time. Its owner is identified
//! by the [`TimerToken`] shared with the task and timer nodes; the owner
//! supplies hooks that keep the document in step with the countdown.
//! Time only moves when the event loop calls [`CountdownCoordinator::advance`].

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::doc::Document;
use crate::io::host::HostServices;
use crate::model::{TimerConfig, TimerToken};

use super::scheduler::Scheduler;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownPhase {
    Idle,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownState {
    pub seconds: u64,
    pub initial_seconds: u64,
    pub task_description: String,
    pub todo_position: usize,
    pub phase: CountdownPhase,
    pub completion_fired: bool,
}

impl CountdownState {
    /// A fresh running countdown
    pub fn new(initial_seconds: u64, task_description: impl Into<String>, todo_position: usize) -> Self {
        CountdownState {
            seconds: initial_seconds,
            initial_seconds,
            task_description: task_description.into(),
            todo_position,
            phase: CountdownPhase::Running,
            completion_fired: false,
        }
    }
}

/// What the hooks get to work with
pub struct CountdownContext<'a> {
    pub doc: &'a mut Document,
    pub host: &'a mut dyn HostServices,
}

/// Callbacks supplied by whoever owns the registration
pub trait CountdownHooks {
    fn on_pause(&mut self, _state: &CountdownState) {}
    fn on_resume(&mut self, _state: &CountdownState) {}
    fn on_reset(&mut self, _state: &CountdownState) {}
    /// Explicit cancel. Not called when another countdown takes over.
    fn on_cancel(&mut self, state: &CountdownState, ctx: &mut CountdownContext<'_>);
    /// The grace window after completion ran out
    fn on_expire(&mut self, state: &CountdownState, ctx: &mut CountdownContext<'_>);
    /// Reached zero. Returns whether the owning task was checked off.
    fn on_complete(&mut self, state: &CountdownState, ctx: &mut CountdownContext<'_>) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { owner: TimerToken, seconds: u64 },
    Completed { owner: TimerToken, auto_checked: bool },
    Expired { owner: TimerToken },
}

/// Hooks for a slot claimed through `try_set` by an owner that never
/// registered any
struct Detached;

impl CountdownHooks for Detached {
    fn on_cancel(&mut self, _state: &CountdownState, _ctx: &mut CountdownContext<'_>) {}
    fn on_expire(&mut self, _state: &CountdownState, _ctx: &mut CountdownContext<'_>) {}
    fn on_complete(&mut self, _state: &CountdownState, _ctx: &mut CountdownContext<'_>) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Tick,
    AutoHide,
}

struct Registration {
    owner: TimerToken,
    state: CountdownState,
    hooks: Box<dyn CountdownHooks>,
}

#[derive(Debug, Clone)]
pub struct CountdownSettings {
    pub grace: Duration,
    pub sound: String,
    pub notify: bool,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        CountdownSettings::from_config(&TimerConfig::default())
    }
}

impl CountdownSettings {
    pub fn from_config(config: &TimerConfig) -> Self {
        CountdownSettings {
            grace: Duration::from_secs(config.completed_grace_secs),
            sound: config.sound.clone(),
            notify: config.notify,
        }
    }
}

pub struct CountdownCoordinator {
    slot: Option<Registration>,
    jobs: Scheduler<Job>,
    settings: CountdownSettings,
}

impl Default for CountdownCoordinator {
    fn default() -> Self {
        CountdownCoordinator::new(CountdownSettings::default())
    }
}

impl CountdownCoordinator {
    pub fn new(settings: CountdownSettings) -> Self {
        CountdownCoordinator {
            slot: None,
            jobs: Scheduler::new(),
            settings,
        }
    }

    pub fn owner(&self) -> Option<TimerToken> {
        self.slot.as_ref().map(|r| r.owner)
    }

    pub fn is_owner(&self, token: TimerToken) -> bool {
        self.owner() == Some(token)
    }

    pub fn current(&self) -> Option<&CountdownState> {
        self.slot.as_ref().map(|r| &r.state)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.jobs.next_deadline()
    }

    /// Register a countdown, replacing any other one. The replaced owner's
    /// cancel hook is not called; taking over is not cancelling.
    pub fn start(
        &mut self,
        owner: TimerToken,
        state: CountdownState,
        hooks: Box<dyn CountdownHooks>,
        now: Instant,
    ) {
        if let Some(prev) = &self.slot {
            log::info!("event=countdown_takeover previous={} owner={}", prev.owner, owner);
        }
        self.jobs.cancel_all();
        let running = state.phase == CountdownPhase::Running;
        log::info!(
            "event=countdown_start owner={} seconds={} task=\"{}\"",
            owner,
            state.seconds,
            state.task_description
        );
        self.slot = Some(Registration {
            owner,
            state,
            hooks,
        });
        if running {
            self.jobs.schedule(Job::Tick, now + TICK);
        }
    }

    /// Replace the state of the registration. Allowed for its owner or
    /// when the slot is empty; an empty slot is claimed with hooks that do
    /// nothing.
    pub fn try_set(&mut self, owner: TimerToken, state: CountdownState, now: Instant) -> bool {
        self.try_register(owner, state, None, now)
    }

    /// Like [`try_set`](Self::try_set), also swapping in `hooks` when given.
    /// Never takes the slot from another owner.
    pub fn try_register(
        &mut self,
        owner: TimerToken,
        state: CountdownState,
        hooks: Option<Box<dyn CountdownHooks>>,
        now: Instant,
    ) -> bool {
        let phase = state.phase;
        match self.slot.as_mut() {
            Some(reg) if reg.owner != owner => {
                log::debug!(
                    "event=countdown_try_set status=rejected owner={} holder={}",
                    owner,
                    reg.owner
                );
                return false;
            }
            Some(reg) => {
                reg.state = state;
                if let Some(hooks) = hooks {
                    reg.hooks = hooks;
                }
            }
            None => {
                log::debug!("event=countdown_try_set status=claimed owner={}", owner);
                self.slot = Some(Registration {
                    owner,
                    state,
                    hooks: hooks.unwrap_or_else(|| Box::new(Detached)),
                });
            }
        }
        self.jobs.cancel_all();
        match phase {
            CountdownPhase::Running => self.jobs.schedule(Job::Tick, now + TICK),
            CountdownPhase::Completed => self.jobs.schedule(Job::AutoHide, now + self.settings.grace),
            CountdownPhase::Idle | CountdownPhase::Paused => {}
        }
        true
    }

    /// Drop the registration without calling any hook, if `owner` holds it.
    pub fn unregister(&mut self, owner: TimerToken) -> bool {
        if !self.is_owner(owner) {
            return false;
        }
        self.slot = None;
        self.jobs.cancel_all();
        log::debug!("event=countdown_unregister owner={}", owner);
        true
    }

    pub fn pause(&mut self) -> bool {
        let Some(reg) = self.slot.as_mut() else {
            return false;
        };
        if reg.state.phase != CountdownPhase::Running {
            return false;
        }
        reg.state.phase = CountdownPhase::Paused;
        reg.hooks.on_pause(&reg.state);
        self.jobs.cancel(&Job::Tick);
        true
    }

    /// Continue a paused or reset countdown
    pub fn resume(&mut self, now: Instant) -> bool {
        let Some(reg) = self.slot.as_mut() else {
            return false;
        };
        let resumable = matches!(reg.state.phase, CountdownPhase::Paused | CountdownPhase::Idle);
        if !resumable || reg.state.seconds == 0 {
            return false;
        }
        reg.state.phase = CountdownPhase::Running;
        reg.hooks.on_resume(&reg.state);
        self.jobs.schedule(Job::Tick, now + TICK);
        true
    }

    pub fn toggle(&mut self, now: Instant) -> bool {
        match self.current().map(|s| s.phase) {
            Some(CountdownPhase::Running) => self.pause(),
            Some(CountdownPhase::Paused | CountdownPhase::Idle) => self.resume(now),
            _ => false,
        }
    }

    /// Back to the initial duration, stopped
    pub fn reset(&mut self) -> bool {
        let Some(reg) = self.slot.as_mut() else {
            return false;
        };
        reg.state.seconds = reg.state.initial_seconds;
        reg.state.phase = CountdownPhase::Idle;
        reg.state.completion_fired = false;
        reg.hooks.on_reset(&reg.state);
        self.jobs.cancel_all();
        true
    }

    /// Stop and clear the countdown, letting its owner clean up.
    ///
    /// A completed countdown is not cancelled: it expires, as it would at
    /// the end of its grace window.
    pub fn cancel(&mut self, ctx: &mut CountdownContext<'_>) -> bool {
        match self.current().map(|s| s.phase) {
            None => false,
            Some(CountdownPhase::Completed) => self.expire(ctx).is_some(),
            Some(CountdownPhase::Running | CountdownPhase::Paused | CountdownPhase::Idle) => {
                let Some(mut reg) = self.slot.take() else {
                    return false;
                };
                self.jobs.cancel_all();
                log::info!("event=countdown_cancel owner={}", reg.owner);
                reg.hooks.on_cancel(&reg.state, ctx);
                true
            }
        }
    }

    /// Hide a completed countdown now instead of after the grace window
    pub fn dismiss(&mut self, ctx: &mut CountdownContext<'_>) -> Option<CountdownEvent> {
        if self.current().map(|s| s.phase) != Some(CountdownPhase::Completed) {
            return None;
        }
        self.expire(ctx)
    }

    /// Run everything due at `now`
    pub fn advance(&mut self, now: Instant, ctx: &mut CountdownContext<'_>) -> Vec<CountdownEvent> {
        let mut events = Vec::new();
        while let Some((job, deadline)) = self.jobs.pop_due(now) {
            match job {
                Job::Tick => events.extend(self.tick(deadline, ctx)),
                Job::AutoHide => events.extend(self.expire(ctx)),
            }
        }
        events
    }

    fn tick(&mut self, deadline: Instant, ctx: &mut CountdownContext<'_>) -> Vec<CountdownEvent> {
        let Some(reg) = self.slot.as_mut() else {
            return Vec::new();
        };
        if reg.state.phase != CountdownPhase::Running {
            return Vec::new();
        }
        reg.state.seconds = reg.state.seconds.saturating_sub(1);
        let mut events = vec![CountdownEvent::Tick {
            owner: reg.owner,
            seconds: reg.state.seconds,
        }];
        if reg.state.seconds > 0 {
            self.jobs.schedule(Job::Tick, deadline + TICK);
            return events;
        }

        reg.state.phase = CountdownPhase::Completed;
        if !reg.state.completion_fired {
            reg.state.completion_fired = true;
            fire_completion(&self.settings, &reg.state, ctx);
            let auto_checked = reg.hooks.on_complete(&reg.state, ctx);
            log::info!(
                "event=countdown_complete owner={} auto_checked={}",
                reg.owner,
                auto_checked
            );
            events.push(CountdownEvent::Completed {
                owner: reg.owner,
                auto_checked,
            });
        }
        self.jobs.schedule(Job::AutoHide, deadline + self.settings.grace);
        events
    }

    fn expire(&mut self, ctx: &mut CountdownContext<'_>) -> Option<CountdownEvent> {
        let mut reg = self.slot.take()?;
        self.jobs.cancel_all();
        log::debug!("event=countdown_expire owner={}", reg.owner);
        reg.hooks.on_expire(&reg.state, ctx);
        Some(CountdownEvent::Expired { owner: reg.owner })
    }

    /// Forget everything without calling hooks
    pub fn teardown(&mut self) {
        self.jobs.cancel_all();
        self.slot = None;
    }
}

fn fire_completion(settings: &CountdownSettings, state: &CountdownState, ctx: &mut CountdownContext<'_>) {
    if settings.notify
        && let Err(e) = ctx.host.notify("Timer finished", &state.task_description)
    {
        log::warn!("event=notify status=failed reason=\"{}\"", e);
    }
    if !settings.sound.is_empty()
        && let Err(e) = ctx.host.play_sound(&settings.sound)
    {
        log::warn!("event=sound status=failed reason=\"{}\"", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::host::HostError;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Host {
        notified: usize,
        sounds: usize,
    }

    impl HostServices for Host {
        fn notify(&mut self, _title: &str, _body: &str) -> Result<(), HostError> {
            self.notified += 1;
            Ok(())
        }
        fn play_sound(&mut self, _name: &str) -> Result<(), HostError> {
            self.sounds += 1;
            Err(HostError::Unavailable("test".into()))
        }
    }

    #[derive(Clone, Default)]
    struct Calls(Rc<RefCell<Vec<&'static str>>>);

    struct Recorder(Calls);

    impl CountdownHooks for Recorder {
        fn on_pause(&mut self, _state: &CountdownState) {
            self.0.0.borrow_mut().push("pause");
        }
        fn on_cancel(&mut self, _state: &CountdownState, _ctx: &mut CountdownContext<'_>) {
            self.0.0.borrow_mut().push("cancel");
        }
        fn on_expire(&mut self, _state: &CountdownState, _ctx: &mut CountdownContext<'_>) {
            self.0.0.borrow_mut().push("expire");
        }
        fn on_complete(&mut self, _state: &CountdownState, _ctx: &mut CountdownContext<'_>) -> bool {
            self.0.0.borrow_mut().push("complete");
            true
        }
    }

    fn setup() -> (CountdownCoordinator, Calls, TimerToken, Instant) {
        let mut c = CountdownCoordinator::default();
        let calls = Calls::default();
        let token = TimerToken::next();
        let t0 = Instant::now();
        c.start(token, CountdownState::new(3, "Walk dog", 7), Box::new(Recorder(calls.clone())), t0);
        (c, calls, token, t0)
    }

    #[test]
    fn test_ticks_to_completion_then_expires() {
        let (mut c, calls, token, t0) = setup();
        let mut doc = Document::default();
        let mut host = Host::default();
        let mut ctx = CountdownContext {
            doc: &mut doc,
            host: &mut host,
        };
        let events = c.advance(t0 + Duration::from_secs(2), &mut ctx);
        assert_eq!(events.len(), 2);
        assert_eq!(c.current().unwrap().seconds, 1);

        let events = c.advance(t0 + Duration::from_secs(3), &mut ctx);
        assert_eq!(
            events.last(),
            Some(&CountdownEvent::Completed {
                owner: token,
                auto_checked: true
            })
        );
        assert_eq!(c.current().unwrap().phase, CountdownPhase::Completed);

        // completion fires once even if more time passes
        assert!(c.advance(t0 + Duration::from_secs(12), &mut ctx).is_empty());
        let events = c.advance(t0 + Duration::from_secs(13), &mut ctx);
        assert_eq!(events, vec![CountdownEvent::Expired { owner: token }]);
        assert!(c.current().is_none());
        assert_eq!(*calls.0.borrow(), vec!["complete", "expire"]);
        drop(ctx);
        assert_eq!(host.notified, 1);
        assert_eq!(host.sounds, 1);
    }

    #[test]
    fn test_pause_resume_keep_seconds() {
        let (mut c, calls, _, t0) = setup();
        assert!(c.pause());
        assert!(!c.pause());
        assert_eq!(c.next_deadline(), None);
        assert_eq!(c.current().unwrap().seconds, 3);
        assert!(c.resume(t0));
        assert_eq!(c.current().unwrap().phase, CountdownPhase::Running);
        assert_eq!(*calls.0.borrow(), vec!["pause"]);
    }

    #[test]
    fn test_reset_stops_at_initial() {
        let (mut c, _, _, t0) = setup();
        let mut doc = Document::default();
        let mut host = Host::default();
        let mut ctx = CountdownContext {
            doc: &mut doc,
            host: &mut host,
        };
        c.advance(t0 + Duration::from_secs(2), &mut ctx);
        assert!(c.reset());
        let state = c.current().unwrap();
        assert_eq!((state.seconds, state.phase), (3, CountdownPhase::Idle));
        assert!(c.advance(t0 + Duration::from_secs(60), &mut ctx).is_empty());
        assert!(c.toggle(t0 + Duration::from_secs(60)));
        assert_eq!(c.current().unwrap().phase, CountdownPhase::Running);
    }

    #[test]
    fn test_takeover_skips_cancel_hook() {
        let (mut c, calls, first, t0) = setup();
        let second = TimerToken::next();
        c.start(second, CountdownState::new(60, "Email Bob", 20), Box::new(Recorder(Calls::default())), t0);
        assert_eq!(c.owner(), Some(second));
        assert!(calls.0.borrow().is_empty());
        assert!(!c.unregister(first));
        assert!(!c.try_set(first, CountdownState::new(5, "x", 0), t0));
    }

    #[test]
    fn test_cancel_calls_hook_and_clears() {
        let (mut c, calls, _, _) = setup();
        let mut doc = Document::default();
        let mut host = Host::default();
        let mut ctx = CountdownContext {
            doc: &mut doc,
            host: &mut host,
        };
        assert!(c.cancel(&mut ctx));
        assert!(!c.cancel(&mut ctx));
        assert!(c.current().is_none());
        assert_eq!(*calls.0.borrow(), vec!["cancel"]);
    }

    #[test]
    fn test_try_set_by_owner() {
        let (mut c, _, token, t0) = setup();
        let mut state = CountdownState::new(3, "Walk dog", 7);
        state.seconds = 1;
        state.phase = CountdownPhase::Paused;
        assert!(c.try_set(token, state, t0));
        assert_eq!(c.current().unwrap().seconds, 1);
        assert_eq!(c.next_deadline(), None);
        assert!(c.unregister(token));
        assert!(c.owner().is_none());
    }

    #[test]
    fn test_try_set_claims_empty_slot() {
        let mut c = CountdownCoordinator::default();
        let token = TimerToken::next();
        let t0 = Instant::now();
        assert!(c.try_set(token, CountdownState::new(5, "x", 0), t0));
        assert_eq!(c.owner(), Some(token));
        assert_eq!(c.next_deadline(), Some(t0 + TICK));

        // held now, so another owner is turned away
        assert!(!c.try_set(TimerToken::next(), CountdownState::new(9, "y", 0), t0));
        assert_eq!(c.current().unwrap().task_description, "x");
    }

    #[test]
    fn test_try_register_swaps_hooks_for_owner() {
        let (mut c, old_calls, token, t0) = setup();
        let new_calls = Calls::default();
        let hooks: Box<dyn CountdownHooks> = Box::new(Recorder(new_calls.clone()));
        assert!(c.try_register(token, CountdownState::new(3, "Walk dog", 7), Some(hooks), t0));
        assert!(c.pause());
        assert!(old_calls.0.borrow().is_empty());
        assert_eq!(*new_calls.0.borrow(), vec!["pause"]);
    }

    #[test]
    fn test_cancel_after_completion_expires() {
        let (mut c, calls, token, t0) = setup();
        let mut doc = Document::default();
        let mut host = Host::default();
        let mut ctx = CountdownContext {
            doc: &mut doc,
            host: &mut host,
        };
        c.advance(t0 + Duration::from_secs(3), &mut ctx);
        assert_eq!(c.current().unwrap().phase, CountdownPhase::Completed);
        assert!(c.cancel(&mut ctx));
        assert!(c.current().is_none());
        assert_eq!(c.next_deadline(), None);
        assert_eq!(*calls.0.borrow(), vec!["complete", "expire"]);
        assert!(c.owner() != Some(token));
    }
}
