//! # Booking Core
//!
//! Core traits and types shared across the booking payment lifecycle engine.
//!
//! The engine separates *pure* state-transition logic from the *imperative*
//! work of calling a payment service provider (PSP) or persisting to
//! `PostgreSQL`. This crate defines the seam between the two:
//!
//! - [`clock::Clock`]: injectable source of "now", so tests never depend on
//!   the wall clock.
//! - [`transition::Transition`]: a pure function `(State, Event) -> (State, Vec<Effect>)`
//!   used by the booking and payment state machines to decide what changed
//!   and what follow-up work (if any) is implied by that change.
//! - [`effect::Effect`]: a description of follow-up work a transition wants
//!   performed — never executed inline by the state machine itself.
//!
//! Workers and services in `booking-postgres` and the `booking` crate consume
//! these traits; this crate has no knowledge of `PostgreSQL`, HTTP, or any
//! particular PSP.

pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod event;

pub mod clock {
    use chrono::{DateTime, Utc};

    /// Abstracts "what time is it" so business logic can be driven by a
    /// fixed clock in tests and the system clock in production.
    pub trait Clock: Send + Sync {
        /// The current instant, in UTC.
        fn now(&self) -> DateTime<Utc>;
    }

    /// `Clock` backed by [`chrono::Utc::now`].
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

/// The `Transition` trait — the core abstraction for state-machine guards.
///
/// A transition is a pure function: it inspects the current state and an
/// incoming event, either rejects the event (returning an error) or produces
/// the next state, plus zero or more [`effect::Effect`]s describing follow-up
/// work. Transitions never perform I/O themselves.
pub mod transition {
    use super::effect::Effect;

    /// Pure guard-and-apply logic for a state machine.
    ///
    /// # Type Parameters
    ///
    /// - `State`: the aggregate state being transitioned (e.g. booking status).
    /// - `Event`: the incoming trigger (e.g. a payment-capture outcome).
    /// - `Error`: rejection returned when the event is not valid for the
    ///   current state.
    pub trait Transition {
        /// The state this transition operates on.
        type State;
        /// The event that triggers a transition attempt.
        type Event;
        /// The follow-up action type effects may carry.
        type Action;
        /// Rejection raised when `event` is invalid for the current `state`.
        type Error;

        /// Attempt to move `state` forward given `event`.
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` if `event` is not a legal transition from
        /// the current state. `state` is left unmodified on error.
        fn apply(
            &self,
            state: &mut Self::State,
            event: Self::Event,
        ) -> Result<Vec<Effect<Self::Action>>, Self::Error>;
    }
}

/// Side-effect descriptions produced by a [`transition::Transition`].
///
/// Effects are values, not execution: a worker reads the `Vec<Effect<_>>`
/// returned by a transition and decides how (and whether) to carry it out.
/// This keeps the transition itself synchronous, deterministic, and testable
/// without a database or PSP in the loop.
pub mod effect {
    use std::time::Duration;

    /// A follow-up action implied by a state transition.
    #[allow(missing_docs)]
    #[derive(Clone)]
    pub enum Effect<Action> {
        /// No follow-up work.
        None,

        /// Run the contained effects without ordering constraints.
        Parallel(Vec<Effect<Action>>),

        /// Run the contained effects in order.
        Sequential(Vec<Effect<Action>>),

        /// Re-enqueue `action` after `duration` has elapsed (used for the
        /// retry and warning schedules workers enforce).
        Delay {
            /// How long to wait before re-enqueueing.
            duration: Duration,
            /// The action to re-enqueue.
            action: Box<Action>,
        },
    }

    impl<Action: std::fmt::Debug> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                }
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                }
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run without ordering constraints.
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Combine effects to run in order.
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Transform the action type carried by this effect tree.
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            F: Fn(Action) -> B + Clone,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => {
                    Effect::Parallel(effects.into_iter().map(|e| e.map(f.clone())).collect())
                }
                Effect::Sequential(effects) => {
                    Effect::Sequential(effects.into_iter().map(|e| e.map(f.clone())).collect())
                }
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::effect::Effect;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        RetryAuthorization,
        RetryCapture,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum MappedAction {
        Wrapped(TestAction),
    }

    #[test]
    fn merge_produces_parallel() {
        let merged = Effect::merge(vec![Effect::<TestAction>::None, Effect::None]);
        match merged {
            Effect::Parallel(effects) => assert_eq!(effects.len(), 2),
            _ => panic!("expected Parallel"),
        }
    }

    #[test]
    fn chain_produces_sequential() {
        let chained = Effect::chain(vec![Effect::<TestAction>::None, Effect::None]);
        match chained {
            Effect::Sequential(effects) => assert_eq!(effects.len(), 2),
            _ => panic!("expected Sequential"),
        }
    }

    #[test]
    fn map_preserves_delay_duration() {
        let effect = Effect::Delay {
            duration: Duration::from_secs(3600),
            action: Box::new(TestAction::RetryAuthorization),
        };

        let mapped = effect.map(MappedAction::Wrapped);

        match mapped {
            Effect::Delay { duration, action } => {
                assert_eq!(duration, Duration::from_secs(3600));
                assert_eq!(*action, MappedAction::Wrapped(TestAction::RetryAuthorization));
            }
            _ => panic!("expected Delay"),
        }
    }

    #[test]
    fn map_recurses_through_parallel_and_sequential() {
        let effect = Effect::Parallel(vec![
            Effect::Sequential(vec![
                Effect::Delay {
                    duration: Duration::from_secs(1),
                    action: Box::new(TestAction::RetryCapture),
                },
                Effect::None,
            ]),
            Effect::None,
        ]);

        let mapped = effect.map(MappedAction::Wrapped);

        match mapped {
            Effect::Parallel(effects) => {
                assert_eq!(effects.len(), 2);
                match &effects[0] {
                    Effect::Sequential(inner) => assert_eq!(inner.len(), 2),
                    _ => panic!("expected Sequential nested in Parallel"),
                }
            }
            _ => panic!("expected Parallel"),
        }
    }
}
