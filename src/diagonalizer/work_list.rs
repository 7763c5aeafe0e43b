use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

/// A queue of jobs shared between one producer and a pool of workers.
///
/// The producer [`put`](WorkList::put)s jobs and may block in
/// [`wait_for_workers`](WorkList::wait_for_workers) until every job handed out so far has been
/// processed. Workers call [`get`](WorkList::get), which blocks (without consuming CPU time)
/// until a job is available, and returns `None` once the producer has declared
/// [`all_work_done`](WorkList::all_work_done) and the queue is drained.
///
/// A job counts as in progress until the [`Claim`] returned alongside it is dropped. If a worker
/// panics while holding a claim, the list is aborted: the producer is released from
/// `wait_for_workers` and the remaining workers stop.
pub struct WorkList<T> {
    state: Mutex<State<T>>,
    work_available: Condvar,
    workers_idle: Condvar,
}

struct State<T> {
    jobs: VecDeque<T>,
    busy_workers: usize,
    work_done: bool,
    aborted: bool,
}

impl<T> State<T> {
    fn is_idle(&self) -> bool {
        self.jobs.is_empty() && self.busy_workers == 0
    }
}

impl<T> Default for WorkList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkList<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                jobs: VecDeque::new(),
                busy_workers: 0,
                work_done: false,
                aborted: false,
            }),
            work_available: Condvar::new(),
            workers_idle: Condvar::new(),
        }
    }

    pub fn put(&self, job: T) {
        let mut state = self.state.lock();
        debug_assert!(!state.work_done, "job added after all work was declared done");
        state.jobs.push_back(job);
        self.work_available.notify_one();
    }

    /// Takes a job from the list, blocking until one is available. Returns `None` when no more
    /// jobs will arrive.
    pub fn get(&self) -> Option<(T, Claim<'_, T>)> {
        let mut state = self.state.lock();
        loop {
            if state.aborted {
                return None;
            }
            if let Some(job) = state.jobs.pop_front() {
                state.busy_workers += 1;
                return Some((job, Claim { list: self }));
            }
            if state.work_done {
                return None;
            }
            self.work_available.wait(&mut state);
        }
    }

    /// Blocks until the list is empty and no worker holds a claim. Returns `false` if the list
    /// was aborted by a panicking worker.
    pub fn wait_for_workers(&self) -> bool {
        let mut state = self.state.lock();
        while !state.is_idle() && !state.aborted {
            self.workers_idle.wait(&mut state);
        }
        !state.aborted
    }

    /// Declares that no more jobs will be added. Workers exit once the remaining jobs are taken.
    pub fn all_work_done(&self) {
        let mut state = self.state.lock();
        state.work_done = true;
        self.work_available.notify_all();
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.busy_workers -= 1;
        if state.is_idle() {
            self.workers_idle.notify_all();
        }
    }

    fn abort(&self) {
        let mut state = self.state.lock();
        state.aborted = true;
        self.work_available.notify_all();
        self.workers_idle.notify_all();
    }
}

/// Marks a job as in progress. The job is finished when the claim is dropped.
pub struct Claim<'a, T> {
    list: &'a WorkList<T>,
}

impl<T> Drop for Claim<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.list.abort();
        }
        self.list.release();
    }
}

/// Calls [`WorkList::all_work_done`] when dropped, so that workers are released even if the
/// producer unwinds.
pub struct ProducerGuard<'a, T>(pub &'a WorkList<T>);

impl<T> Drop for ProducerGuard<'_, T> {
    fn drop(&mut self) {
        self.0.all_work_done();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(8)]
    fn barrier_sees_every_job(#[case] num_workers: usize) {
        let list = WorkList::new();
        let processed = AtomicUsize::new(0);
        let exited = AtomicUsize::new(0);

        std::thread::scope(|s| {
            for _ in 0..num_workers {
                s.spawn(|| {
                    while let Some((n, _claim)) = list.get() {
                        std::thread::yield_now();
                        processed.fetch_add(n, Ordering::SeqCst);
                    }
                    exited.fetch_add(1, Ordering::SeqCst);
                });
            }

            let _guard = ProducerGuard(&list);
            let mut expected = 0;
            for round in 1..=20 {
                for _ in 0..round {
                    list.put(round);
                    expected += round;
                }
                assert!(list.wait_for_workers());
                assert_eq!(processed.load(Ordering::SeqCst), expected);
                assert_eq!(exited.load(Ordering::SeqCst), 0);
            }
        });

        assert_eq!(exited.load(Ordering::SeqCst), num_workers);
    }

    #[test]
    fn workers_drain_before_exiting() {
        let list = WorkList::new();
        for i in 0..100 {
            list.put(i);
        }
        list.all_work_done();

        let processed = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while let Some((_, _claim)) = list.get() {
                        processed.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });
        assert_eq!(processed.load(Ordering::SeqCst), 100);
        assert!(list.wait_for_workers());
    }

    #[test]
    #[should_panic]
    fn worker_panic_releases_producer() {
        let list = WorkList::new();
        std::thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| {
                    while let Some((n, _claim)) = list.get() {
                        assert_ne!(n, 3, "bad job");
                    }
                });
            }

            let _guard = ProducerGuard(&list);
            for n in 0..5 {
                list.put(n);
            }
            assert!(!list.wait_for_workers());
        });
    }
}
