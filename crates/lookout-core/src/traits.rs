use futures::future::BoxFuture;

use crate::error::GatewayFailure;
use crate::types::{GatewayRequest, GatewayResponse};

/// The remote index, seen as an opaque request/response service.
///
/// Implementations must not block; the returned future is polled on the
/// session task alongside other in-flight searches.
pub trait SearchGateway: Send + Sync {
    fn search<'a>(
        &'a self,
        request: &'a GatewayRequest,
    ) -> BoxFuture<'a, Result<GatewayResponse, GatewayFailure>>;
}

impl<G: SearchGateway + ?Sized> SearchGateway for std::sync::Arc<G> {
    fn search<'a>(
        &'a self,
        request: &'a GatewayRequest,
    ) -> BoxFuture<'a, Result<GatewayResponse, GatewayFailure>> {
        (**self).search(request)
    }
}
