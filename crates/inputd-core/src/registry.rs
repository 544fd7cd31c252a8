//! Fixed command dispatch table: decode payload, invoke the collaborator,
//! produce the declared response.

use anyhow::Result;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::capture;
use crate::protocol::{self, Response};
use crate::server::ServerContext;

/// A decoded command with its fixed-layout payload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    InjectTouch {
        display_id: i32,
        action: i32,
        x: i32,
        y: i32,
    },
    InjectKey {
        key_code: i32,
    },
    CaptureScreen {
        display_id: i32,
    },
    Destroy,
}

/// Read the payload for a command id off the stream. `Ok(None)` means the
/// id is not in the table; no payload bytes are consumed for it.
pub async fn read_command<R>(cmd: i32, stream: &mut R) -> Result<Option<Command>>
where
    R: AsyncRead + Unpin,
{
    let command = match cmd {
        protocol::CMD_PING => Command::Ping,
        protocol::CMD_INJECT_TOUCH => Command::InjectTouch {
            display_id: stream.read_i32().await?,
            action: stream.read_i32().await?,
            x: stream.read_i32().await?,
            y: stream.read_i32().await?,
        },
        protocol::CMD_INJECT_KEY => Command::InjectKey {
            key_code: stream.read_i32().await?,
        },
        protocol::CMD_CAPTURE_SCREEN => Command::CaptureScreen {
            display_id: stream.read_i32().await?,
        },
        protocol::CMD_DESTROY => Command::Destroy,
        _ => return Ok(None),
    };
    Ok(Some(command))
}

/// Execute one command against the shared server state.
///
/// DESTROY only produces its success response here; the connection handler
/// triggers shutdown after that response is flushed, so the acknowledgement
/// always reaches the controller first.
pub fn dispatch(ctx: &ServerContext, command: Command) -> Response {
    match command {
        Command::Ping => Response::Version(protocol::VERSION),
        Command::InjectTouch {
            display_id,
            action,
            x,
            y,
        } => Response::Flag(ctx.injector().inject_touch(display_id, action, x, y)),
        Command::InjectKey { key_code } => Response::Flag(ctx.injector().inject_key(key_code)),
        Command::CaptureScreen { display_id } => {
            let path = capture::capture_screen_to_file(display_id);
            Response::Text(
                path.map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        }
        Command::Destroy => {
            debug!("destroy command received");
            Response::Flag(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityResolver;
    use std::sync::Arc;

    fn test_ctx() -> Arc<ServerContext> {
        ServerContext::new(b"secret".to_vec(), Arc::new(CapabilityResolver::unavailable()))
    }

    fn be(fields: &[i32]) -> Vec<u8> {
        fields.iter().flat_map(|f| f.to_be_bytes()).collect()
    }

    #[tokio::test]
    async fn decodes_touch_payload() {
        let payload = be(&[0, 0, 100, 200]);
        let cmd = read_command(protocol::CMD_INJECT_TOUCH, &mut payload.as_slice())
            .await
            .unwrap();
        assert_eq!(
            cmd,
            Some(Command::InjectTouch {
                display_id: 0,
                action: 0,
                x: 100,
                y: 200
            })
        );
    }

    #[tokio::test]
    async fn decodes_key_payload() {
        let payload = be(&[4]);
        let cmd = read_command(protocol::CMD_INJECT_KEY, &mut payload.as_slice())
            .await
            .unwrap();
        assert_eq!(cmd, Some(Command::InjectKey { key_code: 4 }));
    }

    #[tokio::test]
    async fn unknown_id_is_not_in_the_table() {
        let mut empty: &[u8] = &[];
        let cmd = read_command(42, &mut empty).await.unwrap();
        assert_eq!(cmd, None);
    }

    #[tokio::test]
    async fn truncated_payload_is_an_error() {
        let payload = be(&[0, 0]);
        assert!(
            read_command(protocol::CMD_INJECT_TOUCH, &mut payload.as_slice())
                .await
                .is_err()
        );
    }

    #[test]
    fn ping_reports_the_protocol_version() {
        assert_eq!(
            dispatch(&test_ctx(), Command::Ping),
            Response::Version(protocol::VERSION)
        );
    }

    #[test]
    fn touch_without_capability_is_false() {
        let response = dispatch(
            &test_ctx(),
            Command::InjectTouch {
                display_id: 0,
                action: 0,
                x: 100,
                y: 200,
            },
        );
        assert_eq!(response, Response::Flag(false));
    }

    #[test]
    fn capture_is_always_the_empty_string() {
        let ctx = test_ctx();
        for display_id in [0, 1, 7] {
            assert_eq!(
                dispatch(&ctx, Command::CaptureScreen { display_id }),
                Response::Text(String::new())
            );
        }
    }

    #[test]
    fn destroy_acknowledges_success_without_stopping_here() {
        let ctx = test_ctx();
        assert_eq!(dispatch(&ctx, Command::Destroy), Response::Flag(true));
        // the connection handler, not the dispatch table, flips running
        assert!(ctx.is_running());
    }
}
