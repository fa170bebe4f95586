//! Message service router.
//!
//! Services are registered on a [MsgServiceRouterBuilder] at startup and the builder is then
//! sealed into an immutable [MsgServiceRouter]. The sealed router resolves a message to its
//! handler by type URL and runs every call through the [FeeGate] and the interceptor chain.

use msgfee_types::{AnyMsg, Msg, MsgResult, Tx, TypedMsg};
use std::{
    any::type_name,
    collections::{BTreeMap, BTreeSet},
    marker::PhantomData,
    sync::Arc,
    time::Instant,
};
use tracing::{debug, debug_span, info};

use crate::{
    context::EventManager,
    error::{DispatchError, FatalError, RegistrationError},
    fees::{FeeGate, MsgFeesKeeper, TxDecoder},
    registry::InterfaceRegistry,
    Context,
};

/// Handler with its request and response types erased.
trait ErasedHandler: Send + Sync {
    fn call(&self, ctx: &mut Context, msg: &dyn Msg) -> Result<AnyMsg, DispatchError>;
}

struct TypedHandler<M, R, F> {
    handler: F,
    _phantom: PhantomData<fn(&M) -> R>,
}

impl<M, R, F> ErasedHandler for TypedHandler<M, R, F>
where
    M: TypedMsg,
    R: TypedMsg,
    F: Fn(&mut Context, &M) -> anyhow::Result<R> + Send + Sync + 'static,
{
    fn call(&self, ctx: &mut Context, msg: &dyn Msg) -> Result<AnyMsg, DispatchError> {
        let request =
            msg.as_any()
                .downcast_ref::<M>()
                .ok_or_else(|| DispatchError::InvalidType {
                    expected: type_name::<M>(),
                    got: msg.type_name().to_string(),
                })?;
        let response = (self.handler)(ctx, request).map_err(|source| DispatchError::Handler {
            type_url: M::TYPE_URL,
            source,
        })?;
        Ok(response.to_any())
    }
}

/// Identity of a registered method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodInfo {
    pub service: &'static str,
    pub method: &'static str,
    pub type_url: &'static str,
}

impl MethodInfo {
    /// Fully qualified method name, `/<service>/<method>`.
    pub fn full_method(&self) -> String {
        format!("/{}/{}", self.service, self.method)
    }
}

/// One method of a service: the handler for a single request type.
pub struct MethodDesc {
    method_name: &'static str,
    type_url: &'static str,
    handler: Arc<dyn ErasedHandler>,
}

impl MethodDesc {
    /// Bind `handler` to requests of type `M`. The route's type URL is `M::TYPE_URL`.
    pub fn new<M, R, F>(method_name: &'static str, handler: F) -> Self
    where
        M: TypedMsg,
        R: TypedMsg,
        F: Fn(&mut Context, &M) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        Self {
            method_name,
            type_url: M::TYPE_URL,
            handler: Arc::new(TypedHandler {
                handler,
                _phantom: PhantomData,
            }),
        }
    }

    pub fn method_name(&self) -> &'static str {
        self.method_name
    }

    pub fn type_url(&self) -> &'static str {
        self.type_url
    }
}

/// A named group of methods registered together.
pub struct ServiceDesc {
    service_name: &'static str,
    methods: Vec<MethodDesc>,
}

impl ServiceDesc {
    pub fn new(service_name: &'static str) -> Self {
        Self {
            service_name,
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: MethodDesc) -> Self {
        self.methods.push(method);
        self
    }

    /// Shorthand for `with_method(MethodDesc::new(..))`.
    pub fn method<M, R, F>(self, method_name: &'static str, handler: F) -> Self
    where
        M: TypedMsg,
        R: TypedMsg,
        F: Fn(&mut Context, &M) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.with_method(MethodDesc::new::<M, R, F>(method_name, handler))
    }

    pub fn service_name(&self) -> &'static str {
        self.service_name
    }

    pub fn methods(&self) -> &[MethodDesc] {
        &self.methods
    }
}

/// Remainder of the interceptor chain, ending in the route's handler.
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    handler: &'a dyn ErasedHandler,
    info: &'a MethodInfo,
}

impl Next<'_> {
    pub fn run(self, ctx: &mut Context, msg: &dyn Msg) -> Result<AnyMsg, DispatchError> {
        match self.interceptors.split_first() {
            Some((first, rest)) => first.intercept(
                ctx,
                msg,
                self.info,
                Next {
                    interceptors: rest,
                    handler: self.handler,
                    info: self.info,
                },
            ),
            None => self.handler.call(ctx, msg),
        }
    }
}

/// Middleware wrapped around every handler invocation, outermost first.
///
/// Fees have already been charged when an interceptor runs; `ctx` is the message's own
/// context, so events emitted here belong to the message.
pub trait Interceptor: Send + Sync {
    fn intercept(
        &self,
        ctx: &mut Context,
        msg: &dyn Msg,
        info: &MethodInfo,
        next: Next<'_>,
    ) -> Result<AnyMsg, DispatchError>;
}

/// Logs every handler invocation and its outcome at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingInterceptor;

impl Interceptor for TracingInterceptor {
    fn intercept(
        &self,
        ctx: &mut Context,
        msg: &dyn Msg,
        info: &MethodInfo,
        next: Next<'_>,
    ) -> Result<AnyMsg, DispatchError> {
        let span = debug_span!(
            parent: ctx.logger(),
            "msg",
            type_url = info.type_url,
            method = info.method
        );
        let _guard = span.enter();
        let start = Instant::now();
        let result = next.run(ctx, msg);
        let elapsed = start.elapsed();
        match &result {
            Ok(_) => debug!(?elapsed, events = ctx.event_manager().events().len(), "handled message"),
            Err(err) => debug!(?elapsed, code = err.code(), error = %err, "message failed"),
        }
        result
    }
}

struct Route {
    info: MethodInfo,
    handler: Arc<dyn ErasedHandler>,
}

/// Route table open for registration.
pub struct MsgServiceRouterBuilder {
    registry: Arc<InterfaceRegistry>,
    gate: FeeGate,
    interceptors: Vec<Arc<dyn Interceptor>>,
    routes: BTreeMap<&'static str, Route>,
}

impl MsgServiceRouterBuilder {
    pub fn new(
        registry: Arc<InterfaceRegistry>,
        decoder: TxDecoder,
        keeper: Arc<dyn MsgFeesKeeper>,
    ) -> Self {
        Self {
            registry,
            gate: FeeGate::new(keeper, decoder),
            interceptors: Vec::new(),
            routes: BTreeMap::new(),
        }
    }

    /// Append an interceptor; the first one added runs outermost.
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Register every method of `service`. If any method is rejected, none are added.
    pub fn register_service(&mut self, service: ServiceDesc) -> Result<(), RegistrationError> {
        let mut seen = BTreeSet::new();
        for method in &service.methods {
            let full_method = format!("/{}/{}", service.service_name, method.method_name);
            if !self.registry.contains(method.type_url) {
                return Err(RegistrationError::UnregisteredType {
                    type_url: method.type_url.to_string(),
                    method: full_method,
                });
            }
            if self.routes.contains_key(method.type_url) || !seen.insert(method.type_url) {
                return Err(RegistrationError::DuplicateRoute {
                    type_url: method.type_url.to_string(),
                    method: full_method,
                });
            }
        }

        for method in service.methods {
            let info = MethodInfo {
                service: service.service_name,
                method: method.method_name,
                type_url: method.type_url,
            };
            info!(
                type_url = info.type_url,
                method = %info.full_method(),
                "registered msg service route"
            );
            self.routes.insert(
                method.type_url,
                Route {
                    info,
                    handler: method.handler,
                },
            );
        }
        Ok(())
    }

    pub fn is_registered(&self, type_url: &str) -> bool {
        self.routes.contains_key(type_url)
    }

    /// Freeze the route table.
    pub fn seal(self) -> MsgServiceRouter {
        info!(
            routes = self.routes.len(),
            interceptors = self.interceptors.len(),
            "sealed msg service router"
        );
        MsgServiceRouter {
            registry: self.registry,
            gate: self.gate,
            interceptors: self.interceptors,
            routes: self.routes,
        }
    }
}

/// Sealed, read-only route table. Cheap to share behind an [Arc] across worker threads.
pub struct MsgServiceRouter {
    registry: Arc<InterfaceRegistry>,
    gate: FeeGate,
    interceptors: Vec<Arc<dyn Interceptor>>,
    routes: BTreeMap<&'static str, Route>,
}

impl MsgServiceRouter {
    pub fn handler(&self, msg: &dyn Msg) -> Option<RouteHandler<'_>> {
        self.handler_by_type_url(msg.type_url())
    }

    pub fn handler_by_type_url(&self, type_url: &str) -> Option<RouteHandler<'_>> {
        self.routes
            .get(type_url)
            .map(|route| RouteHandler { router: self, route })
    }

    /// Registered type URLs, in order.
    pub fn routes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.keys().copied()
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }

    /// Decode raw transaction bytes with the router's decoder.
    pub fn decode_tx(&self, tx_bytes: &[u8]) -> Result<Box<dyn Tx>, FatalError> {
        self.gate.decode(tx_bytes)
    }

    /// Resolve and run the handler for `msg`.
    pub fn dispatch(&self, ctx: &Context, msg: &dyn Msg) -> Result<MsgResult, DispatchError> {
        let handler = self
            .handler(msg)
            .ok_or_else(|| DispatchError::Unroutable {
                type_url: msg.type_url().to_string(),
            })?;
        handler.call(ctx, msg)
    }
}

/// A resolved route.
#[derive(Clone, Copy)]
pub struct RouteHandler<'a> {
    router: &'a MsgServiceRouter,
    route: &'a Route,
}

impl<'a> RouteHandler<'a> {
    pub fn type_url(&self) -> &'static str {
        self.route.info.type_url
    }

    pub fn service(&self) -> &'static str {
        self.route.info.service
    }

    pub fn method(&self) -> &'static str {
        self.route.info.method
    }

    pub fn info(&self) -> &'a MethodInfo {
        &self.route.info
    }

    /// Charge the message's additional fee, then run the handler in a context of its own.
    ///
    /// The handler sees the same gas meter as `ctx` but a fresh event manager; its events are
    /// returned in the [MsgResult] and discarded on failure. A failed handler leaves no fee
    /// charged.
    pub fn call(&self, ctx: &Context, msg: &dyn Msg) -> Result<MsgResult, DispatchError> {
        let _guard = ctx.logger().enter();
        if msg.type_url() != self.route.info.type_url {
            return Err(DispatchError::InvalidType {
                expected: self.route.info.type_url,
                got: msg.type_url().to_string(),
            });
        }

        let snapshot = ctx.fee_snapshot();
        self.router.gate.charge(ctx, self.route.info.type_url)?;

        let mut msg_ctx = ctx.clone().with_event_manager(EventManager::new());
        let response = Next {
            interceptors: &self.router.interceptors,
            handler: self.route.handler.as_ref(),
            info: &self.route.info,
        }
        .run(&mut msg_ctx, msg);
        match response {
            Ok(response) => Ok(MsgResult::new(response, msg_ctx.into_events())),
            Err(err) => {
                ctx.restore_fees(snapshot);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{
        bank_service, stake_keeper, test_registry, MsgBurn, MsgBurnResponse, MsgSend,
        MsgSendResponse,
    };
    use msgfee_types::decode_tx;

    fn builder() -> MsgServiceRouterBuilder {
        MsgServiceRouterBuilder::new(
            Arc::new(test_registry()),
            Arc::new(decode_tx),
            Arc::new(stake_keeper()),
        )
    }

    #[test]
    fn sealed_router_resolves_routes() {
        let mut builder = builder();
        builder.register_service(bank_service()).unwrap();
        assert!(builder.is_registered(MsgSend::TYPE_URL));
        let router = builder.seal();

        let handler = router.handler(&MsgSend::new("a", "b", 1)).unwrap();
        assert_eq!(handler.type_url(), MsgSend::TYPE_URL);
        assert_eq!(handler.service(), "bank.v1.Msg");
        assert_eq!(handler.method(), "Send");
        assert_eq!(handler.info().full_method(), "/bank.v1.Msg/Send");
        assert!(router.handler_by_type_url(MsgBurn::TYPE_URL).is_some());
        assert!(router.handler_by_type_url("/bank.v1.MsgMint").is_none());

        let mut routes: Vec<_> = router.routes().collect();
        routes.sort();
        assert_eq!(routes, vec![MsgBurn::TYPE_URL, MsgSend::TYPE_URL]);
    }

    #[test]
    fn router_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MsgServiceRouter>();
    }

    #[test]
    fn method_desc_uses_request_type_url() {
        let method = MethodDesc::new::<MsgBurn, MsgBurnResponse, _>("Burn", |_, msg: &MsgBurn| {
            Ok(MsgBurnResponse {
                burned: msg.amount,
            })
        });
        assert_eq!(method.type_url(), MsgBurn::TYPE_URL);
        assert_eq!(method.method_name(), "Burn");

        let service = ServiceDesc::new("bank.v1.Msg")
            .with_method(method)
            .method::<MsgSend, MsgSendResponse, _>("Send", |_, _| Ok(MsgSendResponse));
        assert_eq!(service.service_name(), "bank.v1.Msg");
        assert_eq!(service.methods().len(), 2);
    }
}
