use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;

use murphy_model::TaskDescriptor;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("no pending request")]
    Empty,
    #[error("request queue is sealed")]
    Sealed,
}

/// Result of [`RequestQueue::claim_oldest`].
#[derive(Debug, PartialEq, Eq)]
pub enum ClaimError<E> {
    /// Nothing was pending.
    Empty,
    /// The head was refused by the caller and stays queued.
    Rejected(E),
}

/// FIFO of task descriptors awaiting a container.
///
/// Grants are matched strictly in enqueue order. That is only correct while all outstanding
/// requests ask for the same capability; see [`RequestQueue::claim_oldest`].
#[derive(Clone, Default)]
pub struct RequestQueue {
    inner: Arc<Mutex<QueueInner>>,
}

#[derive(Default)]
struct QueueInner {
    pending: VecDeque<TaskDescriptor>,
    sealed: bool,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a descriptor to the tail.
    pub fn enqueue(&self, task: TaskDescriptor) -> Result<(), QueueError> {
        let mut inner = self.lock();
        if inner.sealed {
            return Err(QueueError::Sealed);
        }
        inner.pending.push_back(task);
        Ok(())
    }

    /// Remove and return the head.
    pub fn dequeue_oldest(&self) -> Result<TaskDescriptor, QueueError> {
        self.lock().pending.pop_front().ok_or(QueueError::Empty)
    }

    /// Remove the head only if `accept` succeeds for it.
    ///
    /// `accept` runs while the queue lock is held, so whatever it records (the container
    /// mapping) becomes visible atomically with the removal. Lock order is queue first.
    pub fn claim_oldest<E, F>(&self, accept: F) -> Result<TaskDescriptor, ClaimError<E>>
    where
        F: FnOnce(&TaskDescriptor) -> Result<(), E>,
    {
        let mut inner = self.lock();
        let head = inner.pending.front().ok_or(ClaimError::Empty)?;
        accept(head).map_err(ClaimError::Rejected)?;
        inner.pending.pop_front().ok_or(ClaimError::Empty)
    }

    /// End the enqueue phase; later [`RequestQueue::enqueue`] calls fail.
    pub fn seal(&self) {
        self.lock().sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use murphy_model::Resource;

    use super::*;

    fn task(memory_mb: u32) -> TaskDescriptor {
        TaskDescriptor::new(
            Resource::new(memory_mb, 1).unwrap(),
            0,
            vec!["true".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn dequeue_follows_enqueue_order() {
        let queue = RequestQueue::new();
        queue.enqueue(task(100)).unwrap();
        queue.enqueue(task(200)).unwrap();

        assert_eq!(queue.dequeue_oldest().unwrap().required_memory_mb(), 100);
        assert_eq!(queue.dequeue_oldest().unwrap().required_memory_mb(), 200);
        assert_eq!(queue.dequeue_oldest(), Err(QueueError::Empty));
    }

    #[test]
    fn sealed_queue_refuses_growth() {
        let queue = RequestQueue::new();
        queue.enqueue(task(100)).unwrap();
        queue.seal();

        assert!(queue.is_sealed());
        assert_eq!(queue.enqueue(task(200)), Err(QueueError::Sealed));
        assert_eq!(queue.len(), 1);
        // draining still works after sealing
        assert!(queue.dequeue_oldest().is_ok());
    }

    #[test]
    fn rejected_claim_keeps_head() {
        let queue = RequestQueue::new();
        queue.enqueue(task(100)).unwrap();

        let res = queue.claim_oldest(|_| Err::<(), _>("duplicate"));
        assert_eq!(res, Err(ClaimError::Rejected("duplicate")));
        assert_eq!(queue.len(), 1);

        let claimed = queue.claim_oldest(|_| Ok::<(), ()>(())).unwrap();
        assert_eq!(claimed.required_memory_mb(), 100);
        assert!(queue.is_empty());
        assert_eq!(
            queue.claim_oldest(|_| Ok::<(), ()>(())),
            Err(ClaimError::Empty)
        );
    }

    #[test]
    fn concurrent_dequeue_hands_out_each_descriptor_once() {
        let queue = RequestQueue::new();
        for mb in 1..=400 {
            queue.enqueue(task(mb)).unwrap();
        }

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while let Ok(t) = queue.dequeue_oldest() {
                        seen.push(t.required_memory_mb());
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<u32> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (1..=400).collect::<Vec<_>>());
    }
}
