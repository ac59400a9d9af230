use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::codec::{read_message, write_message};
use crate::error::{PushCallResult, PushError};
use crate::message::AlephMessage;

/// Ping the node listening on `addr` and return the round-trip time.
pub async fn ping(addr: &str, max_frame_size: usize) -> PushCallResult<Duration> {
    let stream = TcpStream::connect(addr)
        .await
        .map_err(|e| PushError::Transport(format!("connect {addr}: {e}")))?;
    ping_over(stream, max_frame_size).await
}

/// Ping over an already open stream.
///
/// Fails with a transport error unless the peer answers with a `Pong` echoing
/// our nonce.
pub async fn ping_over<S>(mut stream: S, max_frame_size: usize) -> PushCallResult<Duration>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let started = Instant::now();
    write_message(&mut stream, &AlephMessage::Ping { nonce }, max_frame_size).await?;

    match read_message(&mut stream, max_frame_size).await? {
        Some(AlephMessage::Pong { nonce: echoed }) if echoed == nonce => {
            let rtt = started.elapsed();
            tracing::debug!(?rtt, "pong");
            Ok(rtt)
        }
        Some(AlephMessage::Pong { nonce: echoed }) => Err(PushError::Transport(format!(
            "pong for nonce {echoed}, expected {nonce}"
        ))),
        Some(other) => Err(PushError::Transport(format!(
            "unexpected {} while waiting for pong",
            other.type_name()
        ))),
        None => Err(PushError::Transport(
            "connection closed while waiting for pong".into(),
        )),
    }
}
