pub mod http_client;
pub mod middleware;
pub mod reporter;

/// Re-export commonly used types from adapters
pub use http_client::HttpClientAdapter;
pub use middleware::forward_middleware;
pub use reporter::{ChannelReporter, TracingReporter};
