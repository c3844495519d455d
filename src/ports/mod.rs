pub mod http_client;
pub mod reporter;
