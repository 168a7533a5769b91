//! Async client for the "PoolCopilot" API <https://poolcopilot.com/api/docs/>,
//! the cloud service behind PoolCop pool controllers.
//!
//! It is used by the `poolcopctrl` utility.
//!
//! ## Example
//!
//! ```no_run
//! # async fn run() -> poolcopapi::Result<()> {
//! let mut client = poolcopapi::PoolCopilot::new("my-api-key")?;
//!
//! // The session is released when `session` goes out of scope, even if a
//! // call fails.
//! let session = client.open()?;
//! let status = session.status().await?;
//! println!("{status:#}");
//! # Ok(())
//! # }
//! ```

pub(crate) mod api;
pub(crate) mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use client::{PoolCopilot, Session};
pub use config::{ApiKey, Authentication, Config, DEFAULT_BASE_URL};
pub use error::{PoolCopilotError, Result};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

pub use serde_json::Value;
