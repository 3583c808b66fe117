pub mod stats;
pub mod tables;
pub mod selector;
pub mod timing;
pub mod fiat;
pub mod optimizer;
pub mod collector;
pub mod cache;
pub mod storage;

pub use optimizer::Optimizer;
pub use collector::SnapshotCollector;
pub use cache::SnapshotCache;
pub use storage::LocalStorage;
