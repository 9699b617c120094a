use std::{future::Future, pin::Pin};

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

use crate::Result;

pub type FeatureSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An in-flight connection attempt.
pub type PendingConnect = Pin<Box<dyn Future<Output = Result<FeatureSocket>> + Send>>;

/// Starts a connection attempt without awaiting it.
pub fn connect(endpoint: &str) -> PendingConnect {
    let endpoint = endpoint.to_owned();
    Box::pin(async move {
        tracing::debug!(%endpoint, "opening feature stream");
        let (socket, _response) = connect_async(endpoint).await?;
        Ok(socket)
    })
}

/// Resolves once the pending attempt finishes; never resolves when there is
/// none. The caller must clear `pending` after this returns.
pub async fn finish_connect(pending: &mut Option<PendingConnect>) -> Result<FeatureSocket> {
    match pending.as_mut() {
        Some(attempt) => attempt.await,
        None => std::future::pending().await,
    }
}

/// Next frame from the open socket, or `None` once it has closed. Never
/// resolves while there is no socket.
pub async fn next_message(
    socket: &mut Option<FeatureSocket>,
) -> Option<std::result::Result<Message, WsError>> {
    match socket.as_mut() {
        Some(socket) => socket.next().await,
        None => std::future::pending().await,
    }
}

/// Sleeps until `deadline`, or forever when there is none.
pub async fn wait_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
