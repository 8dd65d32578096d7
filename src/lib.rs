mod bucketizer;
mod fetcher;
mod observations;
mod parquet_handler;
mod soundings;
mod utils;

pub use bucketizer::*;
pub use fetcher::*;
pub use observations::*;
pub use parquet_handler::*;
pub use soundings::*;
pub use utils::*;
