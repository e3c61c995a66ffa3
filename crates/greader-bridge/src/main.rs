//! greader-bridge - line-delimited JSON front end for greader-core.
//!
//! Reads one operation request per stdin line:
//!
//! ```text
//! {"id": 1, "operation": "list-unread-items", "arguments": {"feed": "42"}}
//! ```
//!
//! and writes one result record per stdout line, with the request `id`
//! echoed back. Requests run concurrently, so results may come back out of
//! order. Logs go to stderr.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use greader_core::auth::CredentialStore;
use greader_core::config::ENV_EMAIL;
use greader_core::{
    ApiError, Config, ErrorDescriptor, ErrorKind, Operation, OperationResult, Translator,
};

/// Directory under the platform config dir holding an optional `.env`
const CONFIG_DIR_NAME: &str = "greader-bridge";

/// Operations running at once; further input lines wait for a free slot
const MAX_IN_FLIGHT: usize = 16;

/// Result lines buffered ahead of the stdout writer
const OUTPUT_BUFFER: usize = 64;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Load `.env` from the working directory, then from the config dir.
/// Variables already set win.
fn load_env_files() {
    let _ = dotenvy::dotenv();
    if let Some(dir) = dirs::config_dir() {
        let _ = dotenvy::from_path(dir.join(CONFIG_DIR_NAME).join(".env"));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_files();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--list-operations" {
        for name in Operation::NAMES {
            println!("{}", name);
        }
        return Ok(());
    }
    if args.len() > 1 && args[1] == "--store-password" {
        return store_password();
    }
    if args.len() > 1 {
        bail!(
            "Unknown argument {:?} (expected --list-operations or --store-password)",
            args[1]
        );
    }

    init_tracing();
    info!("greader-bridge starting");

    let config = Config::from_env().context("Failed to load configuration")?;
    let translator = Translator::from_config(&config).context("Failed to build HTTP client")?;

    // Log in once at startup: bad credentials are fatal, anything else is
    // retried lazily by the first operation
    match translator.session().ensure_token().await {
        Ok(_) => info!(server = %config.base_url, "Logged in"),
        Err(e @ ApiError::Authentication(_)) => {
            return Err(anyhow::Error::new(e).context("Startup login failed"));
        }
        Err(e) => warn!(error = %e, "Startup login failed, continuing"),
    }

    let input = BufReader::new(tokio::io::stdin());
    serve(translator, input, tokio::io::stdout(), MAX_IN_FLIGHT).await?;

    info!("greader-bridge shutting down");
    Ok(())
}

/// Prompt for the reader password and store it in the OS keychain
fn store_password() -> Result<()> {
    let email = std::env::var(ENV_EMAIL)
        .ok()
        .filter(|e| !e.trim().is_empty())
        .with_context(|| format!("{} must be set to store a password", ENV_EMAIL))?;

    let password = rpassword::prompt_password(format!("Password for {}: ", email))
        .context("Failed to read password")?;
    if password.is_empty() {
        bail!("Password must not be empty");
    }

    CredentialStore::store(&email, &password).context("Failed to store password in keychain")?;
    eprintln!("Password stored in keychain for {}", email);
    Ok(())
}

// ============================================================================
// Request loop
// ============================================================================

#[derive(Debug, Deserialize)]
struct RequestLine {
    #[serde(default)]
    id: Option<Value>,
    operation: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ResponseLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(flatten)]
    result: OperationResult,
}

/// Decode one input line into its echo id and operation.
fn parse_line(line: &str) -> (Option<Value>, Result<Operation, String>) {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => return (None, Err(format!("Malformed request line: {}", e))),
    };
    let id = value.get("id").cloned().filter(|id| !id.is_null());

    let request: RequestLine = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => return (id, Err(format!("Malformed request: {}", e))),
    };
    let operation = Operation::decode(&request.operation, request.arguments).map_err(|e| {
        format!(
            "Invalid arguments for {:?}: {}",
            request.operation, e
        )
    });
    (request.id.or(id), operation)
}

/// Run every input line as an operation, at most `max_in_flight` at a
/// time, and write one result line per request. Returns the output once
/// input is exhausted and every operation has answered.
async fn serve<R, W>(
    translator: Translator,
    input: R,
    mut output: W,
    max_in_flight: usize,
) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<ResponseLine>(OUTPUT_BUFFER);

    // Single writer so result lines never interleave
    let writer = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            let mut line = serde_json::to_vec(&response)?;
            line.push(b'\n');
            output.write_all(&line).await?;
            output.flush().await?;
        }
        Ok::<_, anyhow::Error>(output)
    });

    let limit = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut lines = input.lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (id, operation) = parse_line(line);
        let operation = match operation {
            Ok(operation) => operation,
            Err(message) => {
                warn!(%message, "Rejected request line");
                let result =
                    OperationResult::err(ErrorDescriptor::new(ErrorKind::InvalidRequest, message));
                tx.send(ResponseLine { id, result })
                    .await
                    .context("Output writer stopped")?;
                continue;
            }
        };

        // Stop reading input while the limit is reached
        let permit = limit
            .clone()
            .acquire_owned()
            .await
            .context("Concurrency limit closed")?;

        debug!(operation = operation.name(), "Dispatching");
        let translator = translator.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            let result = translator.execute(operation).await;
            drop(permit);
            let _ = tx.send(ResponseLine { id, result }).await;
        });

        // Reap finished tasks so the set does not grow without bound
        while let Some(joined) = in_flight.try_join_next() {
            if let Err(e) = joined {
                warn!(error = %e, "Operation task failed");
            }
        }
    }

    debug!(pending = in_flight.len(), "Input closed, waiting for in-flight operations");
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Operation task failed");
        }
    }

    drop(tx);
    writer.await.context("Output writer panicked")?
}
