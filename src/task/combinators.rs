//! Task Combinators
//!
//! Composition over task collections. Combined tasks settle through the
//! same idempotent machinery as any other task, so "first failure wins"
//! falls out of settlement being single-shot.

use crate::core::sync::lock_recover;
use crate::task::core::Task;
use crate::task::error::{EmptyRaceError, FailureKind};
use std::sync::{Arc, Mutex};

/// Per-task outcome record produced by [`Task::all_settled`]
#[derive(Debug, Clone, PartialEq)]
pub enum SettledResult<T, E> {
    Resolved(T),
    Rejected(E),
    Aborted(E),
}

impl<T, E> SettledResult<T, E> {
    pub fn status(&self) -> &'static str {
        match self {
            SettledResult::Resolved(_) => "resolved",
            SettledResult::Rejected(_) => "rejected",
            SettledResult::Aborted(_) => "aborted",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, SettledResult::Resolved(_))
    }
}

struct Aggregate<V> {
    slots: Vec<Option<V>>,
    remaining: usize,
}

impl<V> Aggregate<V> {
    fn new(len: usize) -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            slots: (0..len).map(|_| None).collect(),
            remaining: len,
        }))
    }

    /// Store a slot value; true once every slot is filled
    fn fill(&mut self, index: usize, value: V) -> bool {
        if self.slots[index].is_none() {
            self.slots[index] = Some(value);
            self.remaining -= 1;
        }
        self.remaining == 0
    }

    fn take_all(&mut self) -> Vec<V> {
        self.slots.drain(..).flatten().collect()
    }
}

impl<T, E, P> Task<T, E, P>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    P: Clone + Send + 'static,
{
    /// Resolve with every result, in input order, once all inputs resolve
    ///
    /// The first rejection or abortion settles the combined task the same
    /// way; later settlements of the remaining inputs are ignored, and the
    /// inputs themselves are not cancelled. Empty input resolves
    /// immediately with an empty list.
    pub fn all(tasks: Vec<Task<T, E, P>>) -> Task<Vec<T>, E, P> {
        let combined: Task<Vec<T>, E, P> = Task::new();
        if tasks.is_empty() {
            combined.resolve(Vec::new());
            return combined;
        }

        let aggregate = Aggregate::new(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            let aggregate = aggregate.clone();
            let on_resolved = {
                let combined = combined.clone();
                move |value: T| {
                    let finished = {
                        let mut aggregate = lock_recover(&aggregate);
                        aggregate.fill(index, value)
                    };
                    if finished {
                        let values = lock_recover(&aggregate).take_all();
                        combined.resolve(values);
                    }
                }
            };
            let on_failed = {
                let combined = combined.clone();
                move |failure: crate::task::error::TaskFailure<E>| match failure.kind {
                    FailureKind::Reject => combined.reject(failure.reason),
                    FailureKind::Abort => combined.abort(failure.reason),
                }
            };
            task.wait(on_resolved, on_failed);
        }
        combined
    }

    /// Resolve with a per-task outcome record for every input, in input
    /// order; never fails itself
    pub fn all_settled(tasks: Vec<Task<T, E, P>>) -> Task<Vec<SettledResult<T, E>>, E, P> {
        let combined: Task<Vec<SettledResult<T, E>>, E, P> = Task::new();
        if tasks.is_empty() {
            combined.resolve(Vec::new());
            return combined;
        }

        let aggregate = Aggregate::new(tasks.len());
        for (index, task) in tasks.iter().enumerate() {
            let record = {
                let aggregate = aggregate.clone();
                let combined = combined.clone();
                move |outcome: SettledResult<T, E>| {
                    let finished = {
                        let mut aggregate = lock_recover(&aggregate);
                        aggregate.fill(index, outcome)
                    };
                    if finished {
                        let outcomes = lock_recover(&aggregate).take_all();
                        combined.resolve(outcomes);
                    }
                }
            };
            let record_failure = record.clone();
            task.wait(
                move |value| record(SettledResult::Resolved(value)),
                move |failure| {
                    let outcome = match failure.kind {
                        FailureKind::Reject => SettledResult::Rejected(failure.reason),
                        FailureKind::Abort => SettledResult::Aborted(failure.reason),
                    };
                    record_failure(outcome)
                },
            );
        }
        combined
    }

    /// Settle with whichever input settles first, success or failure
    ///
    /// Empty input has no winner and is reported synchronously.
    pub fn race(tasks: Vec<Task<T, E, P>>) -> Result<Task<T, E, P>, EmptyRaceError> {
        if tasks.is_empty() {
            return Err(EmptyRaceError);
        }

        let combined: Task<T, E, P> = Task::new();
        for task in &tasks {
            let winner = combined.clone();
            let loser = combined.clone();
            task.wait(
                move |value| winner.resolve(value),
                move |failure| match failure.kind {
                    FailureKind::Reject => loser.reject(failure.reason),
                    FailureKind::Abort => loser.abort(failure.reason),
                },
            );
        }
        Ok(combined)
    }

    /// `all` with a completion counter
    ///
    /// `on_progress` receives `(completed, total)` each time any input
    /// settles; failures count as completed.
    pub fn with_progress(
        tasks: Vec<Task<T, E, P>>,
        on_progress: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Task<Vec<T>, E, P> {
        let total = tasks.len();
        let completed = Arc::new(Mutex::new(0usize));
        let tick: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            let count = {
                let mut completed = lock_recover(&completed);
                *completed += 1;
                *completed
            };
            on_progress(count, total);
        });

        for task in &tasks {
            let on_resolved = tick.clone();
            let on_failed = tick.clone();
            task.wait(move |_| (*on_resolved)(), move |_| (*on_failed)());
        }

        Task::all(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::core::TaskState;

    fn pending_pair() -> (Task<i32, String>, Task<i32, String>) {
        (Task::new(), Task::new())
    }

    #[test]
    fn test_all_resolves_in_input_order() {
        let (first, second) = pending_pair();
        let combined = Task::all(vec![first.clone(), second.clone()]);

        // settle out of order; results stay in input order
        second.resolve(2);
        assert!(combined.is_pending());
        first.resolve(1);

        assert_eq!(combined.state(), TaskState::Resolved(vec![1, 2]));
    }

    #[test]
    fn test_all_fails_on_first_rejection() {
        let (first, second) = pending_pair();
        let combined = Task::all(vec![first.clone(), second.clone()]);

        second.reject("broken".to_string());
        assert_eq!(combined.state(), TaskState::Rejected("broken".to_string()));

        // late resolution of the sibling is ignored
        first.resolve(1);
        assert_eq!(combined.state(), TaskState::Rejected("broken".to_string()));
        // and the sibling itself was not cancelled
        assert_eq!(first.state(), TaskState::Resolved(1));
    }

    #[test]
    fn test_all_preserves_abort_kind() {
        let (first, second) = pending_pair();
        let combined = Task::all(vec![first, second.clone()]);

        second.abort("stop".to_string());
        assert_eq!(combined.state(), TaskState::Aborted("stop".to_string()));
    }

    #[test]
    fn test_all_empty_input_resolves_immediately() {
        let combined: Task<Vec<i32>, String> = Task::all(Vec::new());
        assert_eq!(combined.state(), TaskState::Resolved(Vec::new()));
    }

    #[test]
    fn test_all_settled_records_every_outcome() {
        let (first, second) = pending_pair();
        let combined = Task::all_settled(vec![first.clone(), second.clone()]);

        first.resolve(1);
        second.abort("stop".to_string());

        assert_eq!(
            combined.state(),
            TaskState::Resolved(vec![
                SettledResult::Resolved(1),
                SettledResult::Aborted("stop".to_string()),
            ])
        );
    }

    #[test]
    fn test_all_settled_never_fails() {
        let (first, second) = pending_pair();
        let combined = Task::all_settled(vec![first.clone(), second.clone()]);

        first.reject("one".to_string());
        second.reject("two".to_string());

        match combined.state() {
            TaskState::Resolved(outcomes) => {
                assert_eq!(outcomes.len(), 2);
                assert_eq!(outcomes[0].status(), "rejected");
                assert_eq!(outcomes[1].status(), "rejected");
            }
            other => panic!("expected resolution, got {:?}", other),
        }
    }

    #[test]
    fn test_all_settled_empty_input() {
        let combined: Task<Vec<SettledResult<i32, String>>, String> = Task::all_settled(Vec::new());
        assert_eq!(combined.state(), TaskState::Resolved(Vec::new()));
    }

    #[test]
    fn test_race_first_settlement_wins() {
        let (first, second) = pending_pair();
        let combined = Task::race(vec![first.clone(), second.clone()]).unwrap();

        second.reject("fast failure".to_string());
        assert_eq!(
            combined.state(),
            TaskState::Rejected("fast failure".to_string())
        );

        first.resolve(10);
        assert_eq!(
            combined.state(),
            TaskState::Rejected("fast failure".to_string())
        );
    }

    #[test]
    fn test_race_empty_input_is_an_error() {
        let result: Result<Task<i32, String>, _> = Task::race(Vec::new());
        assert_eq!(result.unwrap_err(), EmptyRaceError);
    }

    #[test]
    fn test_with_progress_counts_all_settlements() {
        let (first, second) = pending_pair();
        let third: Task<i32, String> = Task::new();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let sink = observed.clone();
        let combined = Task::with_progress(
            vec![first.clone(), second.clone(), third.clone()],
            move |completed, total| lock_recover(&sink).push((completed, total)),
        );

        first.resolve(1);
        second.reject("broken".to_string());
        third.resolve(3);

        assert_eq!(
            *lock_recover(&observed),
            vec![(1, 3), (2, 3), (3, 3)],
        );
        // the failure settled the aggregate
        assert_eq!(combined.state(), TaskState::Rejected("broken".to_string()));
    }
}
