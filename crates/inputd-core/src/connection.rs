//! Per-connection protocol state machine.
//!
//! AwaitingAuth → Authenticated → Dispatching → Closed, exactly one command
//! per connection; the stream always closes after one round trip. All I/O is
//! blocking from the worker's point of view, with no read timeout: a client
//! that stalls mid-frame parks its own worker and nothing else.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::protocol::{self, check_token_len};
use crate::registry::{self, Command};
use crate::server::ServerContext;

/// Drive one connection to completion. Protocol violations and auth
/// rejections return Ok after closing the stream; only I/O failures
/// surface as errors, and the caller just logs those.
pub async fn handle_client<S>(mut stream: S, ctx: Arc<ServerContext>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let claimed_len = stream.read_i32().await.context("reading token length")?;
    let token_len = match check_token_len(claimed_len) {
        Ok(len) => len,
        Err(e) => {
            // abort before reading a single payload byte, zero bytes written
            warn!("{}", e);
            return Ok(());
        }
    };

    let mut token = vec![0u8; token_len];
    stream
        .read_exact(&mut token)
        .await
        .context("reading token")?;

    if token != ctx.token() {
        // one fixed rejection code, nothing about the expected token leaks
        warn!("rejecting client: token mismatch");
        stream.write_i32(protocol::AUTH_REJECTED).await?;
        stream.flush().await?;
        return Ok(());
    }

    stream.write_i32(protocol::AUTH_OK).await?;
    stream.flush().await?;

    let cmd = stream.read_i32().await.context("reading command id")?;
    let Some(command) = registry::read_command(cmd, &mut stream)
        .await
        .context("reading command payload")?
    else {
        // deliberately no response bytes: the client sees the connection
        // close with nothing after the auth ack
        warn!("unknown command id {}", cmd);
        return Ok(());
    };

    let response = registry::dispatch(&ctx, command);
    stream
        .write_all(&response.encode())
        .await
        .context("writing response")?;
    stream.flush().await?;

    if matches!(command, Command::Destroy) {
        debug!("destroy acknowledged, stopping the server");
        ctx.begin_shutdown();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityResolver;
    use tokio::io::duplex;

    fn test_ctx() -> Arc<ServerContext> {
        ServerContext::new(b"secret".to_vec(), Arc::new(CapabilityResolver::unavailable()))
    }

    async fn exchange(request: Vec<u8>) -> Vec<u8> {
        let (mut client, server) = duplex(4096);
        let handler = tokio::spawn(handle_client(server, test_ctx()));

        client.write_all(&request).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        handler.await.unwrap().unwrap();
        response
    }

    fn auth_frame(token: &[u8]) -> Vec<u8> {
        let mut frame = (token.len() as i32).to_be_bytes().to_vec();
        frame.extend_from_slice(token);
        frame
    }

    #[tokio::test]
    async fn ping_round_trip() {
        let mut request = auth_frame(b"secret");
        request.extend_from_slice(&protocol::CMD_PING.to_be_bytes());
        let response = exchange(request).await;
        assert_eq!(response, [0, 0, 0, 1, 0, 0, 0, 2]);
    }

    #[tokio::test]
    async fn token_mismatch_writes_only_the_rejection() {
        let mut request = auth_frame(b"wrong");
        // further bytes on the stream must not be dispatched
        request.extend_from_slice(&protocol::CMD_PING.to_be_bytes());
        let response = exchange(request).await;
        assert_eq!(response, (-1i32).to_be_bytes());
    }

    #[tokio::test]
    async fn negative_token_length_closes_with_zero_bytes() {
        let response = exchange((-5i32).to_be_bytes().to_vec()).await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn oversized_token_length_closes_with_zero_bytes() {
        let response = exchange((4096i32).to_be_bytes().to_vec()).await;
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn unknown_command_gets_no_response_after_the_ack() {
        let mut request = auth_frame(b"secret");
        request.extend_from_slice(&42i32.to_be_bytes());
        let response = exchange(request).await;
        assert_eq!(response, [0, 0, 0, 1]);
    }
}
