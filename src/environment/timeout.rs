use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ndarray::Array1;

use crate::environment::Environment;
use crate::error::{FlagforgeError, Result};

enum Request {
    State,
    Apply(usize),
    Measure,
    Reset(Option<String>),
}

enum Reply {
    State(Result<Array1<f32>>),
    Done(Result<()>),
    Reward(Result<f32>),
}

/// Runs an environment on a worker thread and bounds each call by `timeout`.
///
/// A call that misses its deadline returns [`FlagforgeError::Timeout`]. The
/// worker keeps running it; its late reply carries a stale request id and is
/// dropped by the next call. Calls are serialized, so a slow request delays
/// the ones after it.
///
/// The worker is never joined. Dropping the wrapper closes the request
/// channel; a call still running on the worker finishes detached and its
/// reply is discarded, after which the thread exits.
pub struct TimeoutEnvironment {
    requests: Sender<(u64, Request)>,
    replies: Receiver<(u64, Reply)>,
    next_id: u64,
    timeout: Duration,
    _worker: JoinHandle<()>,
}

impl TimeoutEnvironment {
    pub fn spawn<E>(env: E, timeout: Duration) -> Result<Self>
    where
        E: Environment + Send + 'static,
    {
        if timeout.is_zero() {
            return Err(FlagforgeError::invalid_parameter("timeout", "Must be greater than 0"));
        }

        let (request_tx, request_rx) = mpsc::channel::<(u64, Request)>();
        let (reply_tx, reply_rx) = mpsc::channel::<(u64, Reply)>();

        let worker = thread::Builder::new()
            .name("flagforge-env".to_string())
            .spawn(move || {
                let mut env = env;
                for (id, request) in request_rx {
                    let reply = match request {
                        Request::State => Reply::State(env.state()),
                        Request::Apply(action) => Reply::Done(env.apply(action)),
                        Request::Measure => Reply::Reward(env.measure_terminal_reward()),
                        Request::Reset(program) => Reply::Done(env.reset(program.as_deref())),
                    };
                    if reply_tx.send((id, reply)).is_err() {
                        break;
                    }
                }
            })?;

        Ok(TimeoutEnvironment {
            requests: request_tx,
            replies: reply_rx,
            next_id: 0,
            timeout,
            _worker: worker,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn call(&mut self, request: Request, what: &str) -> Result<Reply> {
        let id = self.next_id;
        self.next_id += 1;

        self.requests
            .send((id, request))
            .map_err(|_| FlagforgeError::EnvironmentFailure("environment worker has stopped".to_string()))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.replies.recv_timeout(remaining) {
                Ok((reply_id, reply)) if reply_id == id => return Ok(reply),
                Ok((stale_id, _)) => {
                    log::debug!("dropping late reply to request {}", stale_id);
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!("{} did not finish within {:?}", what, self.timeout);
                    return Err(FlagforgeError::Timeout(format!("{} exceeded {:?}", what, self.timeout)));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(FlagforgeError::EnvironmentFailure(
                        "environment worker has stopped".to_string(),
                    ));
                }
            }
        }
    }
}

impl Drop for TimeoutEnvironment {
    fn drop(&mut self) {
        log::debug!(
            "detaching environment worker after {} requests; an in-flight call runs to completion",
            self.next_id
        );
    }
}

fn unexpected(what: &str) -> FlagforgeError {
    FlagforgeError::EnvironmentFailure(format!("unexpected reply to {}", what))
}

impl Environment for TimeoutEnvironment {
    fn state(&mut self) -> Result<Array1<f32>> {
        match self.call(Request::State, "state")? {
            Reply::State(state) => state,
            _ => Err(unexpected("state")),
        }
    }

    fn apply(&mut self, action: usize) -> Result<()> {
        match self.call(Request::Apply(action), "apply")? {
            Reply::Done(result) => result,
            _ => Err(unexpected("apply")),
        }
    }

    fn measure_terminal_reward(&mut self) -> Result<f32> {
        match self.call(Request::Measure, "measure_terminal_reward")? {
            Reply::Reward(reward) => reward,
            _ => Err(unexpected("measure_terminal_reward")),
        }
    }

    fn reset(&mut self, program: Option<&str>) -> Result<()> {
        match self.call(Request::Reset(program.map(str::to_string)), "reset")? {
            Reply::Done(result) => result,
            _ => Err(unexpected("reset")),
        }
    }
}
