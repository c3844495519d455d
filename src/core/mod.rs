pub mod engine;
pub mod error;
pub mod identity;
pub mod request;
pub mod response;
pub mod result;
pub mod rule;

pub use engine::{ForwardingEngine, ProxyOptions};
pub use error::{ForwardError, ForwardResult};
pub use identity::{CallerIdentity, Identity};
pub use request::{BufferedRequest, OutboundContent, OutboundRequest};
pub use response::{RelayedResponse, ResponseContext, UpstreamResponse};
pub use result::{ProxyResult, ProxyResultBuilder, ProxyStatus};
pub use rule::{ProxyRule, ProxyRuleBuilder, ResponseModifier};
