//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; one task per connection.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes::{self, FullBody};
use crate::services::Services;
use crate::store::RecordStore;
use crate::types::CivicError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Identity assertion verifier
    pub jwt: JwtValidator,
    pub services: Services,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn RecordStore>) -> Result<Self, CivicError> {
        let jwt = args.jwt_validator()?;
        let services = Services::new(store, args.page_limits());
        Ok(Self {
            args,
            jwt,
            services,
            started_at: Instant::now(),
        })
    }
}

/// Accept connections until the listener fails to bind
pub async fn run(state: Arc<AppState>) -> Result<(), CivicError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Townhall listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure JWT fallback secret may be in use");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<FullBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        (Method::GET, "/health") => routes::health_check(Arc::clone(&state)),
        (_, p) if p.starts_with("/api/") => routes::handle_api_request(req, Arc::clone(&state)).await,
        _ => routes::not_found_response(&path),
    };

    Ok(response)
}
