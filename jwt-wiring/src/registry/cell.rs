//! A compute-once cell with retry on failure.
//!
//! The first caller builds the value outside the lock while later callers wait
//! on a condition variable. Waiters of one attempt all observe its outcome: the
//! value, or the same error. A failed attempt leaves the cell empty, so the
//! next caller starts a fresh one.
//!
//! # Invariants
//! - At most one build runs at a time per cell.
//! - Once a value is stored it is never replaced.
//! - A build that panics resets the cell to empty and wakes the waiters.

use std::sync::{Condvar, Mutex, MutexGuard};

use crate::error::RegistryError;

enum Phase<T> {
    Empty,
    Building(u64),
    Ready(T),
}

struct SlotState<T> {
    phase: Phase<T>,
    /// Number of builds started so far; identifies the current attempt.
    attempts: u64,
    last_failure: Option<(u64, RegistryError)>,
}

pub struct OnceSlot<T> {
    state: Mutex<SlotState<T>>,
    changed: Condvar,
}

impl<T: Clone> OnceSlot<T> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                phase: Phase::Empty,
                attempts: 0,
                last_failure: None,
            }),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SlotState<T>>, RegistryError> {
        self.state.lock().map_err(|_| RegistryError::LockPoisoned)
    }

    /// The stored value, if a build has succeeded.
    pub fn get(&self) -> Option<T> {
        let state = self.state.lock().ok()?;
        match &state.phase {
            Phase::Ready(value) => Some(value.clone()),
            Phase::Empty | Phase::Building(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    /// Number of builds started so far.
    pub fn attempts(&self) -> u64 {
        self.state.lock().map_or(0, |state| state.attempts)
    }

    /// Return the stored value, building it with `init` if the cell is empty.
    ///
    /// # Errors
    /// - The error returned by `init`, for the caller that ran it and every
    ///   caller that waited on the same attempt.
    /// - `RegistryError::LockPoisoned` if the cell's lock is poisoned.
    #[allow(clippy::significant_drop_tightening)] // the guard is handed to the condvar
    pub fn get_or_try_init<F>(&self, init: F) -> Result<T, RegistryError>
    where
        F: FnOnce() -> Result<T, RegistryError>,
    {
        let mut state = self.lock()?;
        loop {
            match &state.phase {
                Phase::Ready(value) => return Ok(value.clone()),
                Phase::Building(attempt) => {
                    let attempt = *attempt;
                    state = self.wait_for(state, attempt)?;
                    if let Some(outcome) = Self::outcome_of(&state, attempt) {
                        return outcome;
                    }
                }
                Phase::Empty => break,
            }
        }

        state.attempts += 1;
        let attempt = state.attempts;
        state.phase = Phase::Building(attempt);
        drop(state);

        let guard = BuildGuard {
            slot: self,
            attempt,
            armed: true,
        };
        let result = init();
        guard.finish(&result)?;
        result
    }

    /// Block while `attempt` is still building.
    fn wait_for<'a>(
        &'a self,
        mut state: MutexGuard<'a, SlotState<T>>,
        attempt: u64,
    ) -> Result<MutexGuard<'a, SlotState<T>>, RegistryError> {
        while matches!(state.phase, Phase::Building(current) if current == attempt) {
            state = self
                .changed
                .wait(state)
                .map_err(|_| RegistryError::LockPoisoned)?;
        }
        Ok(state)
    }

    /// What a waiter of `attempt` should observe, or `None` to start over.
    fn outcome_of(state: &SlotState<T>, attempt: u64) -> Option<Result<T, RegistryError>> {
        if let Phase::Ready(value) = &state.phase {
            return Some(Ok(value.clone()));
        }
        match &state.last_failure {
            Some((failed, error)) if *failed == attempt => Some(Err(error.clone())),
            _ => None,
        }
    }
}

impl<T: Clone> Default for OnceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes the outcome of one build; resets the cell if the build unwinds.
struct BuildGuard<'a, T: Clone> {
    slot: &'a OnceSlot<T>,
    attempt: u64,
    armed: bool,
}

impl<T: Clone> BuildGuard<'_, T> {
    fn finish(mut self, result: &Result<T, RegistryError>) -> Result<(), RegistryError> {
        self.armed = false;
        let mut state = self.slot.lock()?;
        match result {
            Ok(value) => state.phase = Phase::Ready(value.clone()),
            Err(error) => {
                state.phase = Phase::Empty;
                state.last_failure = Some((self.attempt, error.clone()));
            }
        }
        drop(state);
        self.slot.changed.notify_all();
        Ok(())
    }
}

impl<T: Clone> Drop for BuildGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut state) = self.slot.state.lock() {
            if matches!(state.phase, Phase::Building(current) if current == self.attempt) {
                state.phase = Phase::Empty;
            }
        }
        self.slot.changed.notify_all();
    }
}
