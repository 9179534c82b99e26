use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::SystemTime;

use remtrace_core::Clock;

/// Local clock replaying a fixed sequence of times.
pub struct ScriptedClock {
    times: Mutex<VecDeque<SystemTime>>,
}

impl ScriptedClock {
    /// One `(sent, received)` pair per sampling round.
    pub fn from_rounds(rounds: &[(SystemTime, SystemTime)]) -> Self {
        let times = rounds
            .iter()
            .flat_map(|(sent, received)| [*sent, *received])
            .collect();

        Self {
            times: Mutex::new(times),
        }
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> SystemTime {
        self.times
            .lock()
            .unwrap()
            .pop_front()
            .expect("clock read more times than scripted")
    }
}
