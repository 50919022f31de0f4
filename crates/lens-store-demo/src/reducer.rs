use crate::actions::Action;
use crate::state::AppState;

/// Reducer - pure function that produces new state from current state + action
pub fn reduce(action: &Action, state: Option<&AppState>) -> Option<AppState> {
    let mut next = state.cloned().unwrap_or_default();
    match action {
        Action::Increment => next.value += 1,
        Action::Decrement => next.value -= 1,
        Action::Login(user) => next.user = user.clone(),
        Action::Reset => return None,
    }
    Some(next)
}
