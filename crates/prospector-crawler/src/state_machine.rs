//! Pure state machine for the capture workflow
//!
//! No async and no I/O: `transition(state, event) -> (state, actions)` is a
//! deterministic function. The engine performs the actions and feeds the
//! outcome back in as the next event.
//!
//! - Invalid transitions go to Failed (never panic)
//! - Queries are addressed by index into the run's query list

/// Workflow state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Nothing started yet
    Idle,
    /// Submitting credentials; `conceal` is set for headed runs
    Authenticating { total: usize, conceal: bool },
    /// Giving the operator time to complete a second factor
    AwaitingSecondFactor { total: usize, conceal: bool },
    /// Opening the results page of query `index`
    Iterating { index: usize, total: usize },
    /// Reading the cards of query `index`
    Capturing { index: usize, total: usize },
    /// Sending invitations for query `index`
    Connecting {
        index: usize,
        total: usize,
        captured: usize,
    },
    /// Every query processed
    Done { summary: String },
    /// Run aborted
    Failed { error: String },
}

/// Outcomes reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin a run over `total` queries
    Start { total: usize, headless: bool },
    AuthSucceeded,
    AuthFailed { reason: String },
    SecondFactorElapsed,
    /// The results container of the current query is visible
    SearchReady,
    CardsCaptured { count: usize },
    OutreachFinished { invites: usize },
    /// The current query could not be processed
    QueryFailed { reason: String },
}

/// Side effects for the engine to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Log { message: String },
    Authenticate,
    AwaitSecondFactor,
    /// Best effort; only requested for headed runs
    ConcealWindow,
    OpenSearch { index: usize },
    Capture { index: usize },
    Connect { index: usize },
    Finish,
}

fn log(message: impl Into<String>) -> Action {
    Action::Log {
        message: message.into(),
    }
}

/// Move to query `next`, or finish when the list is exhausted
fn advance(next: usize, total: usize) -> (State, Vec<Action>) {
    if next < total {
        (
            State::Iterating { index: next, total },
            vec![Action::OpenSearch { index: next }],
        )
    } else {
        (
            State::Done {
                summary: format!("Processed {} queries", total),
            },
            vec![log("All queries processed"), Action::Finish],
        )
    }
}

/// Pure state transition function
///
/// # Invalid Transitions
/// Any invalid transition results in a Failed state with a descriptive
/// error. This function never panics.
pub fn transition(state: State, event: Event) -> (State, Vec<Action>) {
    match (state, event) {
        // From Idle
        (State::Idle, Event::Start { total: 0, .. }) => (
            State::Done {
                summary: "No queries to run".to_string(),
            },
            vec![log("No queries to run"), Action::Finish],
        ),

        (State::Idle, Event::Start { total, headless }) => (
            State::Authenticating {
                total,
                conceal: !headless,
            },
            vec![
                log(format!("Starting run with {} queries", total)),
                Action::Authenticate,
            ],
        ),

        // From Authenticating
        (State::Authenticating { total, conceal }, Event::AuthSucceeded) => (
            State::AwaitingSecondFactor { total, conceal },
            vec![log("Login submitted"), Action::AwaitSecondFactor],
        ),

        (State::Authenticating { .. }, Event::AuthFailed { reason }) => (
            State::Failed {
                error: format!("Authentication failed: {}", reason),
            },
            vec![log(format!("Authentication failed: {}", reason))],
        ),

        // From AwaitingSecondFactor
        (State::AwaitingSecondFactor { total, conceal }, Event::SecondFactorElapsed) => {
            let mut actions = Vec::new();
            if conceal {
                actions.push(Action::ConcealWindow);
            }
            let (state, next) = advance(0, total);
            actions.extend(next);
            (state, actions)
        }

        // From Iterating
        (State::Iterating { index, total }, Event::SearchReady) => (
            State::Capturing { index, total },
            vec![Action::Capture { index }],
        ),

        // From Capturing
        (State::Capturing { index, total }, Event::CardsCaptured { count }) => (
            State::Connecting {
                index,
                total,
                captured: count,
            },
            vec![
                log(format!("Captured {} contacts", count)),
                Action::Connect { index },
            ],
        ),

        // From Connecting
        (State::Connecting { index, total, .. }, Event::OutreachFinished { invites }) => {
            let mut actions = vec![log(format!("Sent {} invitations", invites))];
            let (state, next) = advance(index + 1, total);
            actions.extend(next);
            (state, actions)
        }

        // A failing query never stops the run
        (State::Iterating { index, total }, Event::QueryFailed { reason })
        | (State::Capturing { index, total }, Event::QueryFailed { reason })
        | (State::Connecting { index, total, .. }, Event::QueryFailed { reason }) => {
            let mut actions = vec![log(format!("Query {} failed: {}", index + 1, reason))];
            let (state, next) = advance(index + 1, total);
            actions.extend(next);
            (state, actions)
        }

        // Terminal states - no valid transitions
        (State::Done { summary }, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from Done state (summary: {}) on event: {:?}",
                    summary, event
                ),
            },
            vec![],
        ),

        (State::Failed { error }, event) => (
            State::Failed {
                error: format!(
                    "Invalid transition from Failed state (error: {}) on event: {:?}",
                    error, event
                ),
            },
            vec![],
        ),

        // All other invalid transitions
        (state, event) => (
            State::Failed {
                error: format!(
                    "Invalid state transition: {:?} cannot handle event {:?}",
                    state, event
                ),
            },
            vec![],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_full_flow() {
        // Idle -> Authenticating
        let (state, actions) = transition(
            State::Idle,
            Event::Start {
                total: 2,
                headless: false,
            },
        );
        assert_eq!(
            state,
            State::Authenticating {
                total: 2,
                conceal: true
            }
        );
        assert_eq!(actions[1], Action::Authenticate);

        // Authenticating -> AwaitingSecondFactor
        let (state, actions) = transition(state, Event::AuthSucceeded);
        assert!(matches!(state, State::AwaitingSecondFactor { total: 2, .. }));
        assert!(actions.contains(&Action::AwaitSecondFactor));

        // AwaitingSecondFactor -> Iterating(0)
        let (state, actions) = transition(state, Event::SecondFactorElapsed);
        assert_eq!(state, State::Iterating { index: 0, total: 2 });
        assert_eq!(actions.last(), Some(&Action::OpenSearch { index: 0 }));

        // Iterating -> Capturing -> Connecting
        let (state, actions) = transition(state, Event::SearchReady);
        assert_eq!(actions, vec![Action::Capture { index: 0 }]);
        let (state, actions) = transition(state, Event::CardsCaptured { count: 4 });
        assert!(matches!(state, State::Connecting { captured: 4, .. }));
        assert_eq!(actions.last(), Some(&Action::Connect { index: 0 }));

        // Connecting -> Iterating(1)
        let (state, actions) = transition(state, Event::OutreachFinished { invites: 1 });
        assert_eq!(state, State::Iterating { index: 1, total: 2 });
        assert_eq!(actions.len(), 2);

        let (state, _) = transition(state, Event::SearchReady);
        let (state, _) = transition(state, Event::CardsCaptured { count: 0 });
        let (state, actions) = transition(state, Event::OutreachFinished { invites: 0 });
        assert!(matches!(state, State::Done { .. }));
        assert_eq!(actions.last(), Some(&Action::Finish));
    }

    #[test]
    fn test_headed_run_conceals_window() {
        let (state, _) = transition(
            State::Idle,
            Event::Start {
                total: 1,
                headless: false,
            },
        );
        let (state, _) = transition(state, Event::AuthSucceeded);
        let (_, actions) = transition(state, Event::SecondFactorElapsed);
        assert_eq!(actions[0], Action::ConcealWindow);
    }

    #[test]
    fn test_headless_run_skips_concealment() {
        let (state, _) = transition(
            State::Idle,
            Event::Start {
                total: 1,
                headless: true,
            },
        );
        let (state, _) = transition(state, Event::AuthSucceeded);
        let (_, actions) = transition(state, Event::SecondFactorElapsed);
        assert!(!actions.contains(&Action::ConcealWindow));
    }

    #[test]
    fn test_no_queries() {
        let (state, actions) = transition(
            State::Idle,
            Event::Start {
                total: 0,
                headless: true,
            },
        );
        assert!(matches!(state, State::Done { .. }));
        assert_eq!(actions.last(), Some(&Action::Finish));
    }

    #[test]
    fn test_auth_failure_is_terminal() {
        let (state, actions) = transition(
            State::Authenticating {
                total: 3,
                conceal: false,
            },
            Event::AuthFailed {
                reason: "still on login page".to_string(),
            },
        );
        assert!(matches!(state, State::Failed { .. }));
        if let State::Failed { error } = &state {
            assert!(error.contains("still on login page"));
        }
        assert_eq!(actions.len(), 1);

        let (state, actions) = transition(state, Event::SecondFactorElapsed);
        assert!(matches!(state, State::Failed { .. }));
        assert!(actions.is_empty());
    }

    #[test]
    fn test_query_failure_advances() {
        for state in [
            State::Iterating { index: 0, total: 3 },
            State::Capturing { index: 0, total: 3 },
            State::Connecting {
                index: 0,
                total: 3,
                captured: 2,
            },
        ] {
            let (next, actions) = transition(
                state,
                Event::QueryFailed {
                    reason: "timeout".to_string(),
                },
            );
            assert_eq!(next, State::Iterating { index: 1, total: 3 });
            assert!(matches!(&actions[0], Action::Log { message } if message.contains("timeout")));
        }
    }

    #[test]
    fn test_last_query_failure_finishes() {
        let (state, actions) = transition(
            State::Iterating { index: 2, total: 3 },
            Event::QueryFailed {
                reason: "navigation".to_string(),
            },
        );
        assert!(matches!(state, State::Done { .. }));
        assert_eq!(actions.last(), Some(&Action::Finish));
    }

    #[test]
    fn test_invalid_transition_never_panics() {
        let (state, _) = transition(State::Idle, Event::SearchReady);
        assert!(matches!(state, State::Failed { .. }));

        let (state, _) = transition(
            State::Capturing { index: 0, total: 1 },
            Event::AuthSucceeded,
        );
        assert!(matches!(state, State::Failed { .. }));

        let (state, _) = transition(
            State::AwaitingSecondFactor {
                total: 1,
                conceal: false,
            },
            Event::QueryFailed {
                reason: "x".to_string(),
            },
        );
        assert!(matches!(state, State::Failed { .. }));
    }

    #[test]
    fn test_terminal_states_reject_all_events() {
        let done = State::Done {
            summary: "Done".to_string(),
        };
        let (state, _) = transition(done, Event::SearchReady);
        assert!(matches!(state, State::Failed { .. }));

        let failed = State::Failed {
            error: "boom".to_string(),
        };
        let (state, _) = transition(failed, Event::AuthSucceeded);
        assert!(matches!(state, State::Failed { .. }));
    }
}
