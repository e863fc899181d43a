//! Gantry demo server binary.
//!
//! Wires a sample greeting capability into the global registry, attaches a
//! small dependency container, and serves one controller over HTTP.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `RUST_LOG` — Tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! curl localhost:8080/greetings
//! curl localhost:8080/greetings/status
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use gantry::{App, Container, Controller, ControllerDescriptor, Lifetime, Registry, Resolver};

/// Produces one greeting per request.
trait Greeter: Send + Sync {
    fn greet(&self) -> Greeting;
}

/// Reports whether the service considers itself healthy.
trait StatusSource: Send + Sync {
    fn status(&self) -> &'static str;
}

#[derive(Serialize)]
struct Greeting {
    message: String,
    request_id: Uuid,
}

struct FriendlyGreeter {
    name: String,
}

impl Greeter for FriendlyGreeter {
    fn greet(&self) -> Greeting {
        Greeting {
            message: format!("Hello from {}", self.name),
            request_id: Uuid::new_v4(),
        }
    }
}

struct AlwaysUp;

impl StatusSource for AlwaysUp {
    fn status(&self) -> &'static str {
        "ok"
    }
}

struct GreetingController {
    greeter: Arc<dyn Greeter>,
    status: Arc<dyn StatusSource>,
}

impl Controller for GreetingController {
    fn assemble(resolver: &Resolver<'_>) -> gantry::Result<Self> {
        Ok(Self {
            greeter: resolver.resolve::<dyn Greeter>()?,
            status: resolver.resolve_provider::<dyn StatusSource>("status")?,
        })
    }

    fn describe(self: Arc<Self>) -> ControllerDescriptor {
        let greet = self.clone();
        let status = self.clone();
        ControllerDescriptor::new("/greetings")
            .get("", move |_req| {
                let c = greet.clone();
                async move { Json(c.greeter.greet()) }
            })
            .get("/status", move |_req| {
                let c = status.clone();
                async move { Json(c.status.status()) }
            })
    }
}

/// Periodic liveness log line, running for the server's lifetime.
async fn heartbeat() {
    loop {
        tracing::debug!("heartbeat");
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gantry=debug".into()),
        )
        .init();

    Registry::global().register::<dyn Greeter, _>(Lifetime::Singleton, || {
        Arc::new(FriendlyGreeter {
            name: "gantry".to_string(),
        }) as Arc<dyn Greeter>
    })?;

    let container = Container::new()
        .singleton::<dyn StatusSource, _>("status", || Arc::new(AlwaysUp) as Arc<dyn StatusSource>);

    let app = App::new().configure(|b| {
        b.inject_dependency_container(container)
            .register_controller::<GreetingController>()
            .inject_background_task(heartbeat());
    })?;

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    app.serve(listener).await?;
    Ok(())
}
