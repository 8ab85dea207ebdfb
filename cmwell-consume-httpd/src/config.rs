//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::state::ConsumeConfig;

/// Bulk Consume HTTP Server
#[derive(Parser, Debug)]
#[command(name = "cmwell-consume-httpd")]
#[command(about = "HTTP server for bulk consumption of an indexed corpus")]
pub struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:9000", env = "CMWELL_CONSUME_LISTEN")]
    pub listen: SocketAddr,

    /// Advertised host used by subject-producing formatters
    #[arg(long, default_value = "localhost:9000", env = "CMWELL_CONSUME_HOST")]
    pub host: String,

    /// Discovery budget for a single chunk's range search, in milliseconds
    #[arg(
        long,
        default_value = "8000",
        env = "CMWELL_CONSUME_BULK_BINARY_SEARCH_TIMEOUT_MS"
    )]
    pub bulk_binary_search_timeout_ms: u64,

    /// Chunk size target when the client supplies no length-hint
    #[arg(long, default_value = "100", env = "CMWELL_CONSUME_DEFAULT_LENGTH_HINT")]
    pub default_length_hint: u64,

    /// NDJSON file of records preloaded into the in-memory index
    #[arg(long, env = "CMWELL_CONSUME_DATA_FILE")]
    pub data_file: Option<PathBuf>,
}

impl Args {
    pub fn consume_config(&self) -> ConsumeConfig {
        ConsumeConfig {
            host: self.host.clone(),
            bulk_binary_search_timeout: Duration::from_millis(self.bulk_binary_search_timeout_ms),
            default_length_hint: self.default_length_hint,
        }
    }
}
