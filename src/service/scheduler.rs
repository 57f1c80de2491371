use std::{collections::HashMap, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};

use crate::domain::timer::{Scheduler, TimerHandle, TimerToken};

/// Scheduler backed by `tokio::time::sleep` tasks.
///
/// An elapsed timer posts its token into the presence actor's timer queue,
/// so expiry is handled on the same task as every other registry operation.
/// Cancelling aborts the sleeping task; a token that was already queued is
/// rejected later by its generation check.
#[derive(Debug)]
pub struct TokioScheduler {
    timer_tx: mpsc::UnboundedSender<TimerToken>,
    next_id: u64,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(timer_tx: mpsc::UnboundedSender<TimerToken>) -> Self {
        Self {
            timer_tx,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn live_timers(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, token: TimerToken) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let timer_tx = self.timer_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The actor is gone if this fails; nothing left to expire.
            let _ = timer_tx.send(token);
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ids::ConversationId,
        timer::{TimerKind, TimerOwner},
    };

    fn token(generation: u64) -> TimerToken {
        TimerToken {
            owner: TimerOwner::Outgoing(ConversationId::parse("c1").expect("id should parse")),
            kind: TimerKind::Pause,
            generation,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_token_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        scheduler.schedule(Duration::from_secs(5), token(1));
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.try_recv().ok(), Some(token(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        let handle = scheduler.schedule(Duration::from_secs(5), token(1));
        scheduler.cancel(handle);
        scheduler.cancel(handle);
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(rx.try_recv().is_err());
        assert_eq!(scheduler.live_timers(), 0);
    }
}
