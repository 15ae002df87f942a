use std::{
    ops::Deref,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Bounded set of frame buffers owned by the sensor runtime.
///
/// Every acquired frame holds one slot until it is dropped. Frames that are
/// never released starve the pool and later references acquire nothing.
#[derive(Debug)]
pub struct FramePool {
    capacity: usize,
    outstanding: AtomicUsize,
}

impl FramePool {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            outstanding: AtomicUsize::new(0),
        })
    }

    #[cfg(test)]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    fn try_reserve(&self) -> bool {
        self.outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < self.capacity).then_some(current + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Reference to a frame carried by a frame-arrived event.
///
/// The frame can be acquired at most once. Acquisition fails when the frame
/// was already taken or when the pool has no free buffer.
#[derive(Debug)]
pub struct FrameReference<T> {
    frame: Mutex<Option<T>>,
    pool: Arc<FramePool>,
}

impl<T> FrameReference<T> {
    pub fn new(frame: T, pool: Arc<FramePool>) -> Self {
        Self {
            frame: Mutex::new(Some(frame)),
            pool,
        }
    }

    /// A reference whose frame expired before the handler got to it.
    pub fn expired(pool: Arc<FramePool>) -> Self {
        Self {
            frame: Mutex::new(None),
            pool,
        }
    }

    pub fn acquire_frame(&self) -> Option<AcquiredFrame<T>> {
        let mut slot = self.frame.lock().ok()?;
        if slot.is_none() || !self.pool.try_reserve() {
            return None;
        }
        let frame = slot.take()?;
        Some(AcquiredFrame {
            frame,
            pool: self.pool.clone(),
        })
    }
}

/// Frame checked out of the pool. Dropping it releases the buffer.
#[derive(Debug)]
pub struct AcquiredFrame<T> {
    frame: T,
    pool: Arc<FramePool>,
}

impl<T> Deref for AcquiredFrame<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.frame
    }
}

impl<T> Drop for AcquiredFrame<T> {
    fn drop(&mut self) {
        self.pool.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_released_on_drop() {
        let pool = FramePool::new(2);
        let reference = FrameReference::new(7u32, pool.clone());
        {
            let frame = reference.acquire_frame().unwrap();
            assert_eq!(*frame, 7);
            assert_eq!(pool.outstanding(), 1);
        }
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_frame_acquired_once() {
        let pool = FramePool::new(2);
        let reference = FrameReference::new("body", pool.clone());
        let first = reference.acquire_frame();
        assert!(first.is_some());
        assert!(reference.acquire_frame().is_none());
        drop(first);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_exhausted_pool_yields_nothing() {
        let pool = FramePool::new(1);
        let a = FrameReference::new(1u8, pool.clone());
        let b = FrameReference::new(2u8, pool.clone());

        let held = a.acquire_frame().unwrap();
        assert!(b.acquire_frame().is_none());
        drop(held);

        // The failed attempt left the frame in place.
        assert_eq!(*b.acquire_frame().unwrap(), 2);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_expired_reference() {
        let pool = FramePool::new(1);
        let reference = FrameReference::<u8>::expired(pool.clone());
        assert!(reference.acquire_frame().is_none());
        assert_eq!(pool.outstanding(), 0);
    }
}
