//! Kubernetes API access for clusterlint.
//!
//! This crate provides [`KubeFetcher`], the [`ObjectFetcher`] that reads a
//! snapshot from a live cluster:
//!
//! - Client construction from an explicit kubeconfig/context or the default
//!   inference chain
//! - One concurrent round of list calls per fetch, narrowed by the namespace
//!   filter's field selector where the API supports it
//! - An optional timeout over the whole fetch
//!
//! # Example
//!
//! ```no_run
//! use clusterlint_core::{ObjectFetcher, ObjectFilter};
//! use clusterlint_kube::{KubeConfig, KubeFetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = KubeFetcher::connect(&KubeConfig::from_env()).await?;
//! let objects = fetcher.fetch_objects(&ObjectFilter::all()).await?;
//! println!("{} objects", objects.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`ObjectFetcher`]: clusterlint_core::ObjectFetcher

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod fetcher;

pub use config::KubeConfig;
pub use error::{KubeError, Result};
pub use fetcher::KubeFetcher;
