//! Application assembly.
//!
//! [`App::configure`] is the single entry point that turns registrations
//! into a servable application: it runs the caller's setup closure against
//! an [`AppBuilder`], constructs every registered controller through the
//! [`Resolver`], mounts the resulting routes on an [`axum::Router`], and
//! spawns the collected background tasks onto the current tokio runtime.
//!
//! All wiring errors — unresolved capabilities, duplicate routes, a second
//! `configure` — surface here, before the application can serve traffic.
//! On any error no application is returned; the half-built router and the
//! never-spawned tasks are simply dropped.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::Method;
use axum::routing::{on, MethodFilter};
use axum::Router;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::container::Container;
use crate::controller::{join_path, Controller, ControllerDescriptor};
use crate::errors::{Error, Result};
use crate::registry::Registry;
use crate::resolver::Resolver;

type MountFn = Box<dyn FnOnce(&Resolver<'_>) -> Result<(&'static str, ControllerDescriptor)>>;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects the inputs of one application: an optional scoped registry, an
/// optional dependency container, controllers, and background tasks.
pub struct AppBuilder {
    registry: Option<Arc<Registry>>,
    container: Option<Container>,
    mounts: Vec<MountFn>,
    background: Vec<BoxFuture<'static, ()>>,
}

impl AppBuilder {
    fn new() -> Self {
        Self {
            registry: None,
            container: None,
            mounts: Vec::new(),
            background: Vec::new(),
        }
    }

    /// Resolve against `registry` instead of [`Registry::global`].
    ///
    /// Tests use this to scope registrations per test run.
    pub fn with_registry(&mut self, registry: Arc<Registry>) -> &mut Self {
        self.registry = Some(registry);
        self
    }

    /// Attach an externally constructed dependency container.
    ///
    /// Calling this more than once merges the containers: providers defined
    /// by the later container replace the matching ones, providers it does
    /// not define survive.
    pub fn inject_dependency_container(&mut self, container: Container) -> &mut Self {
        match &mut self.container {
            Some(existing) => existing.merge(container),
            None => self.container = Some(container),
        }
        self
    }

    /// Register controller type `C`; it is constructed and mounted when
    /// assembly runs.
    pub fn register_controller<C: Controller>(&mut self) -> &mut Self {
        self.mounts.push(Box::new(|resolver| {
            let controller = Arc::new(C::assemble(resolver)?);
            Ok((std::any::type_name::<C>(), controller.describe()))
        }));
        self
    }

    /// Schedule a background task to run for the application's lifetime.
    ///
    /// Tasks accumulate: every registered task is spawned when assembly
    /// completes and all run concurrently with request handling on the
    /// shared runtime.
    pub fn inject_background_task<Fut>(&mut self, task: Fut) -> &mut Self
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.background.push(Box::pin(task));
        self
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// One HTTP-serving application.
///
/// Created unconfigured by [`App::new`]; [`App::configure`] assembles it.
/// Requests issued before `configure` are unsupported and answer `404`.
pub struct App {
    router: Router,
    background: Vec<JoinHandle<()>>,
    configured: bool,
}

impl App {
    /// Create an unconfigured application.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            background: Vec::new(),
            configured: false,
        }
    }

    /// Assemble the application.
    ///
    /// Runs `setup` against a fresh [`AppBuilder`], then, in order: builds a
    /// [`Resolver`] over the effective registry and merged container,
    /// constructs each controller (aborting on the first unresolved
    /// capability), validates and mounts every route, and spawns the
    /// background tasks. Must be called from within a tokio runtime.
    ///
    /// Fails with [`Error::AlreadyConfigured`] when called on an
    /// application that has already been configured.
    pub fn configure<F>(mut self, setup: F) -> Result<Self>
    where
        F: FnOnce(&mut AppBuilder),
    {
        if self.configured {
            return Err(Error::AlreadyConfigured(
                "configure called twice on the same application".to_string(),
            ));
        }

        let mut builder = AppBuilder::new();
        setup(&mut builder);
        let AppBuilder {
            registry,
            container,
            mounts,
            background,
        } = builder;

        let registry: &Registry = registry.as_deref().unwrap_or_else(|| Registry::global());
        let resolver = Resolver::new(registry, container.as_ref());

        let mut router = Router::new();
        let mut seen: HashSet<(Method, String)> = HashSet::new();
        let mut route_count = 0usize;
        let controller_count = mounts.len();

        for mount in mounts {
            let (controller, descriptor) = mount(&resolver)?;
            let (prefix, routes) = descriptor.into_parts();

            for route in routes {
                let full = join_path(&prefix, &route.path);
                if !seen.insert((route.verb.clone(), full.clone())) {
                    return Err(Error::DuplicateRoute {
                        verb: route.verb,
                        path: full,
                    });
                }
                let filter =
                    MethodFilter::try_from(route.verb.clone()).map_err(|_| Error::UnsupportedVerb {
                        verb: route.verb.clone(),
                        path: full.clone(),
                    })?;

                tracing::debug!(controller, verb = %route.verb, path = %full, "mounting route");

                let handler = route.handler.clone();
                router = router.route(
                    &full,
                    on(filter, move |req: Request| {
                        let handler = handler.clone();
                        async move { handler(req).await }
                    }),
                );
                route_count += 1;
            }
        }

        let router = router
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        // Wiring is complete; tasks start now, before any request arrives.
        let handles: Vec<JoinHandle<()>> = background.into_iter().map(tokio::spawn).collect();

        tracing::info!(
            controllers = controller_count,
            routes = route_count,
            background_tasks = handles.len(),
            "application assembled"
        );

        self.router = router;
        self.background = handles;
        self.configured = true;
        Ok(self)
    }

    /// A clone of the assembled router — the unit a tower test client or
    /// any axum-compatible harness drives.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve the application on `listener` until the server shuts down.
    pub async fn serve(self, listener: tokio::net::TcpListener) -> std::io::Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "serving application");
        axum::serve(listener, self.router.clone()).await
    }

    /// Number of background tasks spawned for this application.
    pub fn background_task_count(&self) -> usize {
        self.background.len()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Scope background tasks to the application's lifetime.
        for handle in &self.background {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::Json;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::registry::Lifetime;

    trait Greeter: Send + Sync {
        fn say_hello(&self) -> String;
    }

    /// Greets with a fresh id per call, so consecutive responses differ.
    struct NamedGreeter {
        name: String,
    }

    impl Greeter for NamedGreeter {
        fn say_hello(&self) -> String {
            format!("Hello {}:{}", self.name, Uuid::new_v4())
        }
    }

    struct GrumpyGreeter;
    impl Greeter for GrumpyGreeter {
        fn say_hello(&self) -> String {
            "I'm not OK!".to_string()
        }
    }

    struct SunnyGreeter;
    impl Greeter for SunnyGreeter {
        fn say_hello(&self) -> String {
            "All good here".to_string()
        }
    }

    struct GreetingController {
        greeter: Arc<dyn Greeter>,
        fallback: Arc<dyn Greeter>,
    }

    impl Controller for GreetingController {
        fn assemble(resolver: &Resolver<'_>) -> Result<Self> {
            Ok(Self {
                greeter: resolver.resolve::<dyn Greeter>()?,
                fallback: resolver.resolve_provider::<dyn Greeter>("fallback")?,
            })
        }

        fn describe(self: Arc<Self>) -> ControllerDescriptor {
            let run = self.clone();
            let run_another = self.clone();
            ControllerDescriptor::new("/test")
                .get("", move |_req| {
                    let c = run.clone();
                    async move { Json(c.greeter.say_hello()) }
                })
                .get("/another", move |_req| {
                    let c = run_another.clone();
                    async move { Json(c.fallback.say_hello()) }
                })
        }
    }

    struct CollidingController;

    impl Controller for CollidingController {
        fn assemble(_resolver: &Resolver<'_>) -> Result<Self> {
            Ok(Self)
        }

        fn describe(self: Arc<Self>) -> ControllerDescriptor {
            ControllerDescriptor::new("/dup")
                .get("", |_req| async { "first" })
                .get("", |_req| async { "second" })
        }
    }

    fn greeter_registry() -> Arc<Registry> {
        let registry = Arc::new(Registry::new());
        registry
            .register::<dyn Greeter, _>(Lifetime::PerCall, || {
                Arc::new(NamedGreeter {
                    name: "Sarah".to_string(),
                }) as Arc<dyn Greeter>
            })
            .unwrap();
        registry
    }

    fn fallback_container() -> Container {
        Container::new().factory::<dyn Greeter, _>("fallback", || {
            Arc::new(GrumpyGreeter) as Arc<dyn Greeter>
        })
    }

    fn get(uri: &str) -> HttpRequest<Body> {
        HttpRequest::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        json.as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn configure_builds_routes_and_resolves_dependencies() {
        let registry = greeter_registry();
        let container = fallback_container();

        let app = App::new()
            .configure(|b| {
                b.with_registry(registry.clone())
                    .inject_dependency_container(container)
                    .register_controller::<GreetingController>();
            })
            .unwrap();

        let router = app.router();

        let response = router.clone().oneshot(get("/test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let first = body_string(response).await;

        let response = router.clone().oneshot(get("/test")).await.unwrap();
        let second = body_string(response).await;

        let response = router.clone().oneshot(get("/test/another")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let another = body_string(response).await;

        assert!(first.starts_with("Hello Sarah"));
        assert_ne!(first, second);
        assert_eq!(another, "I'm not OK!");
    }

    #[tokio::test]
    async fn routes_are_unreachable_before_configure() {
        let app = App::new();
        let response = app.router().oneshot(get("/test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unresolved_dependency_aborts_configure() {
        let empty = Arc::new(Registry::new());

        let err = App::new()
            .configure(|b| {
                b.with_registry(empty.clone())
                    .inject_dependency_container(fallback_container())
                    .register_controller::<GreetingController>();
            })
            .err()
            .unwrap();

        assert!(matches!(err, Error::UnresolvedCapability { .. }));
        assert!(err.to_string().contains("Greeter"));
    }

    #[tokio::test]
    async fn duplicate_route_aborts_configure() {
        let err = App::new()
            .configure(|b| {
                b.register_controller::<CollidingController>();
            })
            .err()
            .unwrap();

        assert!(matches!(
            err,
            Error::DuplicateRoute { ref path, .. } if path.as_str() == "/dup"
        ));
    }

    #[tokio::test]
    async fn reconfiguring_an_application_fails() {
        let app = App::new().configure(|_b| {}).unwrap();
        let err = app.configure(|_b| {}).err().unwrap();
        assert!(matches!(err, Error::AlreadyConfigured(_)));
    }

    #[tokio::test]
    async fn background_task_runs_without_any_request() {
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();

        let app = App::new()
            .configure(|b| {
                b.inject_background_task(async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    flag.store(true, Ordering::SeqCst);
                });
            })
            .unwrap();

        // Scheduled but not yet past its pause.
        assert!(!done.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(done.load(Ordering::SeqCst));
        drop(app);
    }

    #[tokio::test]
    async fn looping_background_task_does_not_block_requests() {
        let registry = greeter_registry();

        let app = App::new()
            .configure(|b| {
                b.with_registry(registry.clone())
                    .inject_dependency_container(fallback_container())
                    .register_controller::<GreetingController>()
                    .inject_background_task(async {
                        loop {
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    });
            })
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let response = app.router().oneshot(get("/test")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn background_tasks_accumulate_and_all_run() {
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));
        let first_flag = first.clone();
        let second_flag = second.clone();

        let app = App::new()
            .configure(|b| {
                b.inject_background_task(async move {
                    first_flag.store(true, Ordering::SeqCst);
                })
                .inject_background_task(async move {
                    second_flag.store(true, Ordering::SeqCst);
                });
            })
            .unwrap();

        assert_eq!(app.background_task_count(), 2);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(first.load(Ordering::SeqCst));
        assert!(second.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn later_container_replaces_matching_providers() {
        let registry = greeter_registry();
        let replacement = Container::new().factory::<dyn Greeter, _>("fallback", || {
            Arc::new(SunnyGreeter) as Arc<dyn Greeter>
        });

        let app = App::new()
            .configure(|b| {
                b.with_registry(registry.clone())
                    .inject_dependency_container(fallback_container())
                    .inject_dependency_container(replacement)
                    .register_controller::<GreetingController>();
            })
            .unwrap();

        let response = app.router().oneshot(get("/test/another")).await.unwrap();
        assert_eq!(body_string(response).await, "All good here");
    }
}
