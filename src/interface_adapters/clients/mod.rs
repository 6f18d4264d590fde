// Reqwest clients for external collaborators.

pub mod activity;

pub use activity::{MemoryActivityStore, SiteActivityClient};
