//! Newline-delimited JSON-RPC transport.
//!
//! One request per line in, one response per line out. Stdout carries
//! protocol traffic only; logs go to stderr.

use std::io;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::handlers::{dispatch, HandlerState};
use crate::rpc::{RpcRequest, RpcResponse};

const STDIN_QUEUE: usize = 16;

/// Serve requests from `reader` until end of input.
pub async fn serve<R, W>(state: Arc<HandlerState>, mut reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        respond(&state, &buf, &mut writer).await?;
    }

    tracing::info!("input closed");
    Ok(())
}

/// Serve raw lines delivered over a channel until every sender is gone.
pub async fn serve_channel<W>(
    state: Arc<HandlerState>,
    mut lines: mpsc::Receiver<Vec<u8>>,
    mut writer: W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        respond(&state, &line, &mut writer).await?;
    }

    tracing::info!("input closed");
    Ok(())
}

/// Serve on the process's stdin and stdout.
pub async fn serve_stdio(state: Arc<HandlerState>) -> io::Result<()> {
    let lines = spawn_stdin_reader()?;
    serve_channel(state, lines, tokio::io::stdout()).await
}

/// Read stdin on a plain thread. A read blocked there does not hold up
/// runtime shutdown the way a blocking-pool read does.
fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<Vec<u8>>> {
    use std::io::BufRead;

    let (tx, rx) = mpsc::channel(STDIN_QUEUE);
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let mut stdin = std::io::stdin().lock();
            loop {
                let mut line = Vec::new();
                match stdin.read_until(b'\n', &mut line) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

async fn respond<W>(state: &HandlerState, raw: &[u8], writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match handle_raw_line(state, raw).await {
        Some(response) => write_response(writer, &response).await,
        None => Ok(()),
    }
}

async fn handle_raw_line(state: &HandlerState, raw: &[u8]) -> Option<RpcResponse> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim(),
        Err(e) => {
            tracing::warn!(error = %e, "request line is not UTF-8");
            return Some(RpcResponse::parse_error());
        }
    };
    if line.is_empty() {
        return None;
    }
    handle_line(state, line).await
}

async fn handle_line(state: &HandlerState, line: &str) -> Option<RpcResponse> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "unparsable request line");
            return Some(RpcResponse::parse_error());
        }
    };

    let id = value.get("id").cloned();
    match serde_json::from_value::<RpcRequest>(value) {
        Ok(req) => dispatch(state, req).await,
        Err(e) => {
            tracing::warn!(error = %e, "malformed request");
            id.map(|id| RpcResponse::invalid_request(id, e.to_string()))
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &RpcResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut payload = serde_json::to_vec(response).map_err(io::Error::other)?;
    payload.push(b'\n');
    writer.write_all(&payload).await?;
    writer.flush().await
}
