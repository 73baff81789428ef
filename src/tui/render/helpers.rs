use ratatui::text::Span;

use crate::model::TimerAttrs;
use crate::ops::countdown::{CountdownCoordinator, CountdownPhase, CountdownState};
use crate::util::unicode;

/// Checkbox glyph for a task
pub(super) fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

/// Live state for a timer node, when the coordinator is counting it down
pub(super) fn live_state<'a>(
    attrs: &TimerAttrs,
    coordinator: &'a CountdownCoordinator,
) -> Option<&'a CountdownState> {
    let owner = coordinator.owner()?;
    let state = coordinator.current()?;
    let ours = match attrs.token {
        Some(token) => token == owner,
        None => state.task_description == attrs.task_description,
    };
    ours.then_some(state)
}

pub(super) fn phase_label(phase: CountdownPhase) -> &'static str {
    match phase {
        CountdownPhase::Running => "",
        CountdownPhase::Paused => " paused",
        CountdownPhase::Idle => " stopped",
        CountdownPhase::Completed => " done",
    }
}

/// Compute total display width of a slice of spans
pub(super) fn spans_width(spans: &[Span]) -> usize {
    spans
        .iter()
        .map(|s| unicode::display_width(&s.content))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimerToken;
    use crate::ops::countdown::{CountdownContext, CountdownHooks};
    use std::time::Instant;

    struct NoHooks;

    impl CountdownHooks for NoHooks {
        fn on_cancel(&mut self, _: &CountdownState, _: &mut CountdownContext<'_>) {}
        fn on_expire(&mut self, _: &CountdownState, _: &mut CountdownContext<'_>) {}
        fn on_complete(&mut self, _: &CountdownState, _: &mut CountdownContext<'_>) -> bool {
            false
        }
    }

    #[test]
    fn test_live_state_matches_token_then_text() {
        let mut coord = CountdownCoordinator::default();
        let token = TimerToken::next();
        coord.start(token, CountdownState::new(60, "Tea", 0), Box::new(NoHooks), Instant::now());

        let mine = TimerAttrs::new(60, "Tea", 0, Some(token));
        let other = TimerAttrs::new(60, "Tea", 0, Some(TimerToken::next()));
        let legacy = TimerAttrs::new(60, "Tea", 0, None);
        assert!(live_state(&mine, &coord).is_some());
        assert!(live_state(&other, &coord).is_none());
        assert!(live_state(&legacy, &coord).is_some());
    }
}
