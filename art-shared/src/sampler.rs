//! Poll a sampling function until its result satisfies a check or a timeout expires
//!
//! Every asynchronous engine operation (VM boot, snapshot creation, host
//! activation, network reconfiguration) is waited on through
//! [`TimeoutingSampler`]. The first sample is taken immediately; after each
//! unsatisfied sample the sampler sleeps for the interval and gives up once
//! the deadline has passed.

use crate::{ArtError, Result};
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

pub struct TimeoutingSampler {
    timeout: Duration,
    interval: Duration,
    what: String,
    tolerated: Option<fn(&ArtError) -> bool>,
}

impl TimeoutingSampler {
    pub fn new(timeout: Duration, interval: Duration, what: impl Into<String>) -> Self {
        Self {
            timeout,
            interval,
            what: what.into(),
            tolerated: None,
        }
    }

    /// Treat errors matching `filter` as an unsatisfied sample instead of failing
    pub fn tolerate(mut self, filter: fn(&ArtError) -> bool) -> Self {
        self.tolerated = Some(filter);
        self
    }

    /// Keep sampling through engine-busy and connection errors
    pub fn tolerate_transient(self) -> Self {
        self.tolerate(ArtError::is_transient)
    }

    /// Sample until `check` accepts the result; time out with [`ArtError::Timeout`]
    pub async fn wait_for<T, F, Fut, C>(&self, mut sample: F, check: C) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&T) -> bool,
        T: Debug,
    {
        debug!("Waiting for {} (timeout: {:?})", self.what, self.timeout);

        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut last_sample = None;

        loop {
            match sample().await {
                Ok(value) if check(&value) => {
                    debug!(
                        "Condition satisfied: {} after {:?}",
                        self.what,
                        started.elapsed()
                    );
                    return Ok(value);
                }
                Ok(value) => {
                    debug!("Sampled {}: {:?}", self.what, value);
                    last_sample = Some(format!("{value:?}"));
                }
                Err(e) if self.tolerated.is_some_and(|f| f(&e)) => {
                    debug!("Tolerated error while waiting for {}: {}", self.what, e);
                    last_sample = Some(e.to_string());
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                break;
            }
            sleep(self.interval).await;
            if Instant::now() > deadline {
                break;
            }
        }

        warn!("Timeout waiting for {} after {:?}", self.what, self.timeout);
        Err(ArtError::Timeout {
            what: self.what.clone(),
            timeout: self.timeout,
            last_sample,
        })
    }

    /// Sample until the result equals `expected`
    pub async fn wait_for_value<T, F, Fut>(&self, sample: F, expected: T) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        T: Debug + PartialEq,
    {
        self.wait_for(sample, |value| *value == expected).await
    }

    /// Like [`wait_for`](Self::wait_for), but a timeout yields `Ok(false)`
    pub async fn wait_for_func_status<T, F, Fut, C>(&self, sample: F, check: C) -> Result<bool>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&T) -> bool,
        T: Debug,
    {
        match self.wait_for(sample, check).await {
            Ok(_) => Ok(true),
            Err(ArtError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
