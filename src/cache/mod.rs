//! Tag cache.
//!
//! Holds three read-mostly views over the tag store, each fully replaced on
//! reload:
//!
//! - **new tags**: most recently created tags that are in use
//! - **icon tags**: valid tags with an icon, in randomized order
//! - **all tags**: every admitted tag, rendered and sorted by title
//!
//! ## Configuration
//!
//! ```toml
//! [tags]
//! new_tags_count = 10
//! icon_tag_bound = "legacy"
//! title_whitelist = ["hello world"]
//! max_title_length = 9
//! ```

mod config;
mod lock;
mod report;
mod scheduler;
mod snapshot;
mod tags;

pub(crate) use config::DEFAULT_NEW_TAGS_COUNT;
pub use config::{IconTagBound, TagCacheConfig};
pub use report::{LoadReport, LoadStage, MigrationError, TagCacheError};
pub use scheduler::ReloadScheduler;
pub use tags::TagCache;
