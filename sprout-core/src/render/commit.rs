//! Commit queue.
//!
//! Work that must not run while the reconciler is walking the tree
//! (subscribing to atoms, flushing the store, releasing hook slots) is
//! queued here and executed in order by [`CommitQueue::drain`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::error::{Error, Result};

pub(crate) type Task = Box<dyn FnOnce() -> Result<()>>;

#[derive(Clone, Default)]
pub(crate) struct CommitQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl CommitQueue {
    pub(crate) fn defer<F>(&self, task: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Run queued tasks, including ones queued while draining, until the
    /// queue is empty. Fails once more than `limit` tasks have run; the
    /// first task error stops the drain and leaves the rest queued.
    pub(crate) fn drain(&self, limit: usize) -> Result<usize> {
        let mut ran = 0;
        loop {
            let task = self.tasks.borrow_mut().pop_front();
            let Some(task) = task else { break };
            if ran == limit {
                self.tasks.borrow_mut().push_front(task);
                return Err(Error::FlushLimit { limit });
            }
            ran += 1;
            task()?;
        }
        if ran > 0 {
            debug!(tasks = ran, "commit phase drained");
        }
        Ok(ran)
    }
}

impl fmt::Debug for CommitQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitQueue").field("pending", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_tasks_in_order() {
        let queue = CommitQueue::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let log = Rc::clone(&log);
            queue.defer(move || {
                log.borrow_mut().push(i);
                Ok(())
            });
        }
        assert_eq!(queue.drain(100).unwrap(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn tasks_queued_while_draining_run_in_the_same_drain() {
        let queue = CommitQueue::default();
        let inner = queue.clone();
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);
        queue.defer(move || {
            inner.defer(move || {
                *flag.borrow_mut() = true;
                Ok(())
            });
            Ok(())
        });
        assert_eq!(queue.drain(100).unwrap(), 2);
        assert!(*ran.borrow());
    }

    #[test]
    fn limit_stops_runaway_work() {
        fn requeue(queue: CommitQueue) {
            let next = queue.clone();
            queue.defer(move || {
                requeue(next);
                Ok(())
            });
        }
        let queue = CommitQueue::default();
        requeue(queue.clone());
        assert!(matches!(queue.drain(5), Err(Error::FlushLimit { limit: 5 })));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn errors_stop_the_drain() {
        let queue = CommitQueue::default();
        queue.defer(|| Err(Error::FlushLimit { limit: 0 }));
        queue.defer(|| Ok(()));
        assert!(queue.drain(10).is_err());
        assert_eq!(queue.len(), 1);
    }
}
