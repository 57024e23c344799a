use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::mcp::DocsService;
use crate::protocol::Reply;

/// Installs the global tracing subscriber. `RUST_LOG` overrides `level`.
/// Logs go to stderr so they never mix with stdio transport output.
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

/// HTTP routes. Both `/` and `/mcp` accept JSON-RPC messages via POST.
pub fn router(service: Arc<DocsService>) -> Router {
    Router::new()
        .route("/", any(handle_mcp))
        .route("/mcp", any(handle_mcp))
        .with_state(service)
}

async fn handle_mcp(
    State(service): State<Arc<DocsService>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "POST")]).into_response();
    }

    let reply = match std::str::from_utf8(&body) {
        Ok(body) => service.handle_message(body).await,
        Err(err) => {
            tracing::warn!("Rejecting body that is not UTF-8: {}", err);
            Reply::InvalidJson
        }
    };

    match reply {
        Reply::Response(response) => Json(response).into_response(),
        Reply::NoContent => StatusCode::NO_CONTENT.into_response(),
        Reply::InvalidJson => (StatusCode::BAD_REQUEST, "Invalid JSON").into_response(),
    }
}

// start http server
pub async fn start_http_server(addr: &str, service: Arc<DocsService>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", err);
            }
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

// start stdio server
pub async fn start_stdio_server(service: Arc<DocsService>) -> Result<()> {
    tracing::info!("Starting stdio server");
    serve_lines(&service, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Answers one JSON-RPC message per input line until the input ends.
/// Notifications and lines that are not JSON get no output.
pub async fn serve_lines<R, W>(service: &DocsService, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Reply::Response(response) = service.handle_message(line).await {
            let mut output = serde_json::to_string(&response)?;
            output.push('\n');
            writer.write_all(output.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("Input closed");
    Ok(())
}
