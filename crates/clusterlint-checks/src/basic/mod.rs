//! Everyday hygiene checks.

mod cronjob;
mod dangling;
mod images;
mod namespace;
mod pods;

pub use cronjob::CronJobConcurrency;
pub use dangling::DanglingService;
pub use images::{FullyQualifiedImage, LatestTag};
pub use namespace::DefaultNamespace;
pub use pods::{BarePods, MissingProbes, NodeNamePodSelector, ResourceRequirements};
