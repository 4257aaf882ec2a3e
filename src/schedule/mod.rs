//! Retry schedules and timeout errors.
//!
//! A [`Schedule`] is pure data: it describes how often and how long to wait
//! between attempts, and does nothing by itself. The
//! [`retry`](crate::effect::retry) combinators interpret it.
//!
//! - **Pure**: `delay_for_attempt` is a plain function of the attempt number
//! - **Inspectable**: schedules are `Clone`, `PartialEq` and `Debug`
//! - **Configurable**: with the `serde` feature they load from config files
//!
//! # Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use wellspring::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let schedule = Schedule::exponential(Duration::from_millis(1)).with_max_retries(3);
//!
//! let effect = retry(|| succeed::<_, String, ()>(42), schedule).unwrap();
//! assert_eq!(effect.execute(&()).await, Ok(42));
//! # });
//! ```
//!
//! # Strategies
//!
//! - **Immediate**: no wait at all (see [`Schedule::recurs`])
//!
//! Whatever the strategy, a schedule given to `retry` must cap the number of
//! retries with `max_retries`; `max_delay` alone only caps each wait.
//! - **Constant**: fixed delay between retries
//! - **Linear**: delay increases linearly (100ms, 200ms, 300ms, ...)
//! - **Exponential**: delay doubles each retry (100ms, 200ms, 400ms, ...)
//! - **Fibonacci**: delay follows the Fibonacci sequence
//!
//! # Jitter
//!
//! Jitter spreads retries of many callers apart. Real randomness needs the
//! `jitter` feature; without it the jitter settings are kept but ignored.
//!
//! ```toml
//! wellspring = { version = "...", features = ["jitter"] }
//! ```

mod error;
mod policy;

pub use error::{ScheduleError, TimeoutError};
pub use policy::{JitterStrategy, Schedule, ScheduleStrategy};
