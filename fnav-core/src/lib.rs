pub mod error;

pub mod config;
pub use config::{Config, NavConfig, SearchOptions, SortKey, SortOptions};

pub mod cache {
    pub mod cache_manager;
    pub use cache_manager::{CacheManager, CacheStats, CacheStatsSnapshot};
}

pub mod fs {
    pub mod dir_scanner;
    pub mod object_info;
}

pub mod model {
    pub mod listing;
    pub use listing::Listing;

    pub mod marks;
    pub use marks::MarkSet;

    pub mod register;
    pub use register::{Register, RegisterState};

    pub mod nav_state;
    pub use nav_state::{NavEvent, Navigator, Preview};
}

pub mod search {
    pub mod matcher;
    pub use matcher::{CaseMode, Matcher, match_name};
}

pub mod tasks {
    pub mod dir_load_task;

    pub mod preview_task;

    pub mod file_ops_task;
    pub use file_ops_task::{FsTransfer, Transfer};
}

pub mod logging;
pub use logging::LoggerBuilder;

pub use error::AppError;

pub use fs::object_info::{FileEntry, LinkState};
