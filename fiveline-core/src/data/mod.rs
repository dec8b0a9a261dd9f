//! History retrieval: providers, price adjustment and the TTL cache.

pub mod adjust;
pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod request;
pub mod yahoo;

pub use adjust::to_historical_bars;
pub use cache::{BarCache, CacheMeta, CachedProvider, DEFAULT_TTL};
pub use circuit_breaker::CircuitBreaker;
pub use csv_import::CsvProvider;
pub use provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
pub use request::{validate_symbol, Adjustment, HistoryRequest, DEFAULT_PADDING_DAYS};
pub use yahoo::YahooProvider;
