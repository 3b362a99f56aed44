use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Work scheduled by the coordinators, fired from `MapSession::tick`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerTask {
    /// Navigation lock expiry for the given lock generation
    NavigationUnlock { generation: u64 },
    /// Resize has settled: re-measure the canvas
    StabilizerSettle { generation: u64 },
    /// Replay the camera snapshot
    StabilizerReplay { generation: u64 },
}

/// Millisecond timers on a single-threaded loop. Ties fire in insertion order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<(u64, u64, TimerTask)>>,
    seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: u64, task: TimerTask) {
        self.seq += 1;
        self.heap.push(Reverse((due_ms, self.seq, task)));
    }

    /// Pop the earliest task due at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(u64, TimerTask)> {
        match self.heap.peek() {
            Some(Reverse((due, _, _))) if *due <= now_ms => {
                self.heap.pop().map(|Reverse((due, _, task))| (due, task))
            }
            _ => None,
        }
    }

    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse((due, _, _))| *due)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_deadline_then_insertion_order() {
        let mut q = TimerQueue::new();
        q.schedule(200, TimerTask::StabilizerReplay { generation: 1 });
        q.schedule(100, TimerTask::NavigationUnlock { generation: 9 });
        q.schedule(100, TimerTask::StabilizerSettle { generation: 1 });

        assert_eq!(q.pop_due(50), None);
        assert_eq!(q.pop_due(150), Some((100, TimerTask::NavigationUnlock { generation: 9 })));
        assert_eq!(q.pop_due(150), Some((100, TimerTask::StabilizerSettle { generation: 1 })));
        assert_eq!(q.pop_due(150), None);
        assert_eq!(q.next_due(), Some(200));
        assert_eq!(q.len(), 1);
    }
}
