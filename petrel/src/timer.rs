// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant};

type TimerId = u64;

type Callback = Box<dyn Fn() + Send + 'static>;

/// Wake-up interval while no deadline is pending.
const IDLE_TICK: Duration = Duration::from_secs(3600);

enum TimerCmd {
    Start {
        timer_id: TimerId,
        deadline: Instant,
        callback: Callback,
    },
    Arm {
        timer_id: TimerId,
        deadline: Instant,
        generation: u64,
    },
    Disarm {
        timer_id: TimerId,
        generation: u64,
    },
    Exit {
        timer_id: TimerId,
    },
}

/// Handle onto the shared timer service for all one-shot timers.
///
/// One [`TimerDriver`] task serves every timer in the broker; there is no
/// thread or task per timer. `start` registers a callback and returns an
/// [`AlarmTimer`] handle controlling when it fires.
#[derive(Debug, Clone)]
pub struct TimerService {
    sender: UnboundedSender<TimerCmd>,
    next_timer_id: Arc<AtomicU64>,
}

impl TimerService {
    /// Create the service and the driver that must be spawned to run it.
    #[must_use]
    pub fn new() -> (Self, TimerDriver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let service = Self {
            sender,
            next_timer_id: Arc::new(AtomicU64::new(1)),
        };
        let driver = TimerDriver {
            receiver,
            timers: HashMap::new(),
            deadlines: BinaryHeap::new(),
        };
        (service, driver)
    }

    /// Register a one-shot timer due after `duration`.
    ///
    /// The callback runs on the driver task at most once per arming.
    pub fn start<F>(&self, duration: Duration, callback: F) -> AlarmTimer
    where
        F: Fn() + Send + 'static,
    {
        let timer_id = self.next_timer_id.fetch_add(1, Ordering::SeqCst);
        let _ret = self.sender.send(TimerCmd::Start {
            timer_id,
            deadline: Instant::now() + duration,
            callback: Box::new(callback),
        });
        AlarmTimer {
            timer_id,
            duration,
            generation: 0,
            sender: self.sender.clone(),
        }
    }
}

/// One registered one-shot timer.
///
/// `reset` replaces the deadline measured from now, `stop` suspends
/// firing, `resume` re-arms with the stored duration and `exit`
/// unregisters the timer; dropping the handle unregisters it too. A
/// generation counter makes deadlines from overwritten armings inert.
pub struct AlarmTimer {
    timer_id: TimerId,
    duration: Duration,
    generation: u64,
    sender: UnboundedSender<TimerCmd>,
}

impl AlarmTimer {
    /// Re-arm with a new duration, measured from now.
    pub fn reset(&mut self, duration: Duration) {
        self.duration = duration;
        self.generation += 1;
        let _ret = self.sender.send(TimerCmd::Arm {
            timer_id: self.timer_id,
            deadline: Instant::now() + duration,
            generation: self.generation,
        });
    }

    /// Suspend firing until `resume` or `reset`.
    pub fn stop(&mut self) {
        self.generation += 1;
        let _ret = self.sender.send(TimerCmd::Disarm {
            timer_id: self.timer_id,
            generation: self.generation,
        });
    }

    /// Re-arm with the stored duration.
    pub fn resume(&mut self) {
        self.generation += 1;
        let _ret = self.sender.send(TimerCmd::Arm {
            timer_id: self.timer_id,
            deadline: Instant::now() + self.duration,
            generation: self.generation,
        });
    }

    /// Unregister from the service. Further calls are no-ops.
    pub fn exit(&self) {
        let _ret = self.sender.send(TimerCmd::Exit {
            timer_id: self.timer_id,
        });
    }
}

impl Drop for AlarmTimer {
    fn drop(&mut self) {
        self.exit();
    }
}

struct TimerEntry {
    callback: Callback,
    generation: u64,
    armed: bool,
}

/// The timer wheel: one task owning every registered timer and a priority
/// queue of their deadlines.
///
/// Overwritten deadlines stay in the queue and are discarded on pop when
/// their generation no longer matches the timer's.
pub struct TimerDriver {
    receiver: UnboundedReceiver<TimerCmd>,
    timers: HashMap<TimerId, TimerEntry>,
    deadlines: BinaryHeap<Reverse<(Instant, TimerId, u64)>>,
}

impl TimerDriver {
    pub async fn run_loop(mut self) {
        loop {
            let deadline = self
                .deadlines
                .peek()
                .map_or_else(|| Instant::now() + IDLE_TICK, |Reverse((when, _, _))| *when);
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        break;
                    };
                    self.handle_cmd(cmd);
                }
                () = time::sleep_until(deadline) => self.fire_due(),
            }
        }
        log::info!("timer service: all handles gone, exiting");
    }

    fn handle_cmd(&mut self, cmd: TimerCmd) {
        match cmd {
            TimerCmd::Start {
                timer_id,
                deadline,
                callback,
            } => {
                let _old = self.timers.insert(
                    timer_id,
                    TimerEntry {
                        callback,
                        generation: 0,
                        armed: true,
                    },
                );
                self.deadlines.push(Reverse((deadline, timer_id, 0)));
            }
            TimerCmd::Arm {
                timer_id,
                deadline,
                generation,
            } => {
                if let Some(entry) = self.timers.get_mut(&timer_id) {
                    entry.generation = generation;
                    entry.armed = true;
                    self.deadlines.push(Reverse((deadline, timer_id, generation)));
                }
            }
            TimerCmd::Disarm {
                timer_id,
                generation,
            } => {
                if let Some(entry) = self.timers.get_mut(&timer_id) {
                    entry.generation = generation;
                    entry.armed = false;
                }
            }
            TimerCmd::Exit { timer_id } => {
                let _entry = self.timers.remove(&timer_id);
            }
        }
    }

    fn fire_due(&mut self) {
        let now = Instant::now();
        while let Some(Reverse((deadline, timer_id, generation))) =
            self.deadlines.peek().copied()
        {
            if deadline > now {
                break;
            }
            let _popped = self.deadlines.pop();
            if let Some(entry) = self.timers.get_mut(&timer_id) {
                if entry.armed && entry.generation == generation {
                    entry.armed = false;
                    (entry.callback)();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn spawn_service() -> TimerService {
        let (service, driver) = TimerService::new();
        tokio::spawn(driver.run_loop());
        service
    }

    fn counter_timer(service: &TimerService, duration: Duration) -> (AlarmTimer, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_cb = Arc::clone(&fired);
        let timer = service.start(duration, move || {
            fired_cb.fetch_add(1, Ordering::SeqCst);
        });
        (timer, fired)
    }

    #[test]
    fn test_fires_once_after_duration() {
        tokio_test::block_on(async {
            let service = spawn_service();
            let (_timer, fired) = counter_timer(&service, Duration::from_millis(20));
            time::sleep(Duration::from_millis(120)).await;
            assert_eq!(fired.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn test_reset_postpones_firing() {
        tokio_test::block_on(async {
            let service = spawn_service();
            let (mut timer, fired) = counter_timer(&service, Duration::from_millis(60));
            time::sleep(Duration::from_millis(30)).await;
            timer.reset(Duration::from_millis(60));
            time::sleep(Duration::from_millis(40)).await;
            // The original deadline has long passed, the new one has not.
            assert_eq!(fired.load(Ordering::SeqCst), 0);
            time::sleep(Duration::from_millis(60)).await;
            assert_eq!(fired.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn test_stop_suppresses_firing() {
        tokio_test::block_on(async {
            let service = spawn_service();
            let (mut timer, fired) = counter_timer(&service, Duration::from_millis(30));
            timer.stop();
            time::sleep(Duration::from_millis(80)).await;
            assert_eq!(fired.load(Ordering::SeqCst), 0);
        });
    }

    #[test]
    fn test_resume_rearms() {
        tokio_test::block_on(async {
            let service = spawn_service();
            let (mut timer, fired) = counter_timer(&service, Duration::from_millis(20));
            timer.stop();
            timer.resume();
            time::sleep(Duration::from_millis(80)).await;
            assert_eq!(fired.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn test_exit_unregisters() {
        tokio_test::block_on(async {
            let service = spawn_service();
            let (timer, fired) = counter_timer(&service, Duration::from_millis(20));
            timer.exit();
            time::sleep(Duration::from_millis(80)).await;
            assert_eq!(fired.load(Ordering::SeqCst), 0);
        });
    }

    #[test]
    fn test_dropped_handle_never_fires() {
        tokio_test::block_on(async {
            let service = spawn_service();
            let (timer, fired) = counter_timer(&service, Duration::from_millis(20));
            drop(timer);
            time::sleep(Duration::from_millis(80)).await;
            assert_eq!(fired.load(Ordering::SeqCst), 0);
        });
    }

    #[test]
    fn test_many_timers_share_one_driver() {
        tokio_test::block_on(async {
            let service = spawn_service();
            let (_quick, quick_fired) = counter_timer(&service, Duration::from_millis(10));
            let (_middle, middle_fired) = counter_timer(&service, Duration::from_millis(30));
            let (mut slow, slow_fired) = counter_timer(&service, Duration::from_millis(40));
            slow.stop();
            time::sleep(Duration::from_millis(120)).await;
            assert_eq!(quick_fired.load(Ordering::SeqCst), 1);
            assert_eq!(middle_fired.load(Ordering::SeqCst), 1);
            assert_eq!(slow_fired.load(Ordering::SeqCst), 0);
        });
    }
}
