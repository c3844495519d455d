use crate::core::result::ProxyResult;

/// Sink receiving one finalized [`ProxyResult`] per completed request.
///
/// Called concurrently from every in-flight request, with no ordering
/// guarantee across requests.
pub trait Reporter: Send + Sync + 'static {
    fn report(&self, result: ProxyResult);
}

impl<F> Reporter for F
where
    F: Fn(ProxyResult) + Send + Sync + 'static,
{
    fn report(&self, result: ProxyResult) {
        self(result)
    }
}
