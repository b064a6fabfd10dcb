pub mod config;
pub mod metrics;
pub mod poller;
pub mod search;
pub mod snapshot;
pub mod state;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ListingConfig,
    ServerConfig, StateConfig,
};
pub use poller::{poll_once, Poller, PollerConfig};
pub use search::{
    FetchError, Fetcher, HttpPageSource, PageError, PageRequest, PageSource, Paging,
    RetryConfig, RetryPolicy, SearchConfig, SearchHit, SearchPage, SearchParams, Sleeper,
    TokioSleeper,
};
pub use snapshot::{
    SnapshotConfig, SnapshotError, SnapshotManager, SnapshotReport, SnapshotWriter,
};
pub use state::{
    QueryRecord, QueryState, QuerySummary, QueryView, RefreshStats, Registry, StateError,
};
