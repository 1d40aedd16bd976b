pub mod indexer;
pub mod monitor;

pub use indexer::{BlockIndexer, IndexerError, MAX_BLOCK_RANGE};
pub use monitor::{ContractsMonitor, MonitorError, MonitorStatus};
