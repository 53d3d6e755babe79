//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: The crawl state machine (idle, running, and the terminal states)
//! - `CrawlBudget`: Depth/page limits and the shared fetched-page counter
//! - `LinkGraph`: Outbound links per fetched page and inbound link counts

mod budget;
mod crawl_state;
mod graph;

// Re-export main types
pub use budget::CrawlBudget;
pub use crawl_state::CrawlState;
pub use graph::LinkGraph;
