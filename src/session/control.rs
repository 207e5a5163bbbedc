//! Control channel for the anonymizing network
//!
//! `TorController` speaks the line-based control-port protocol: every
//! command is one CRLF-terminated line and every reply is one or more lines
//! of the form `CODE-text` (continuation) or `CODE text` (final).

use super::SessionError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Credential for the control channel
///
/// Acquired by the configuration layer; the controller only ever sees the
/// secret itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAuth {
    Password(String),
    Cookie(Vec<u8>),
    None,
}

/// Control channel of the anonymizing network
#[async_trait]
pub trait IdentityController: Send {
    /// Authenticates against the controller
    async fn authenticate(&mut self) -> Result<(), SessionError>;

    /// Asks the network to discard current circuits and build new ones
    async fn request_new_identity(&mut self) -> Result<(), SessionError>;
}

/// Control-port client over TCP
pub struct TorController {
    address: String,
    auth: ControlAuth,
    timeout: Duration,
    stream: Option<BufReader<TcpStream>>,
}

impl TorController {
    pub fn new(address: &str, auth: ControlAuth) -> Self {
        Self {
            address: address.to_string(),
            auth,
            timeout: Duration::from_secs(10),
            stream: None,
        }
    }

    /// Sets how long to wait for connect and for each reply
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn connect(&mut self) -> Result<&mut BufReader<TcpStream>, SessionError> {
        if self.stream.is_none() {
            let stream = tokio::time::timeout(self.timeout, TcpStream::connect(&self.address))
                .await
                .map_err(|_| SessionError::Timeout(self.timeout))?
                .map_err(|e| SessionError::ControllerUnavailable {
                    address: self.address.clone(),
                    reason: e.to_string(),
                })?;
            self.stream = Some(BufReader::new(stream));
        }

        self.stream
            .as_mut()
            .ok_or_else(|| SessionError::ControllerUnavailable {
                address: self.address.clone(),
                reason: "connection dropped".to_string(),
            })
    }

    /// Sends one command and reads its complete reply
    async fn command(&mut self, line: &str) -> Result<(u16, String), SessionError> {
        let timeout = self.timeout;
        let result = {
            let stream = self.connect().await?;
            tokio::time::timeout(timeout, exchange(stream, line))
                .await
                .map_err(|_| SessionError::Timeout(timeout))
        };

        // Any failure leaves the connection in an unknown state
        match result {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) | Err(e) => {
                self.stream = None;
                Err(e)
            }
        }
    }
}

async fn exchange(
    stream: &mut BufReader<TcpStream>,
    line: &str,
) -> Result<(u16, String), SessionError> {
    stream.get_mut().write_all(line.as_bytes()).await?;
    stream.get_mut().write_all(b"\r\n").await?;
    stream.get_mut().flush().await?;

    let mut text = Vec::new();
    loop {
        let mut reply = String::new();
        if stream.read_line(&mut reply).await? == 0 {
            return Err(SessionError::ControllerIo(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "control port closed the connection",
            )));
        }

        let reply = reply.trim_end();
        if reply.len() < 4 || !reply.is_char_boundary(3) {
            return Err(SessionError::Rejected(format!("malformed reply: {}", reply)));
        }

        let (code, rest) = reply.split_at(3);
        let code: u16 = code
            .parse()
            .map_err(|_| SessionError::Rejected(format!("malformed reply: {}", reply)))?;
        text.push(rest.get(1..).unwrap_or_default().to_string());

        if rest.starts_with(' ') {
            return Ok((code, text.join("\n")));
        }
    }
}

/// Quotes a password for the AUTHENTICATE command
fn quote_password(password: &str) -> String {
    let escaped = password.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

#[async_trait]
impl IdentityController for TorController {
    async fn authenticate(&mut self) -> Result<(), SessionError> {
        let line = match &self.auth {
            ControlAuth::Password(password) => {
                format!("AUTHENTICATE {}", quote_password(password))
            }
            ControlAuth::Cookie(cookie) => format!("AUTHENTICATE {}", hex::encode(cookie)),
            ControlAuth::None => "AUTHENTICATE".to_string(),
        };

        let (code, text) = self.command(&line).await?;
        if code != 250 {
            return Err(SessionError::Authentication(format!("{} {}", code, text)));
        }

        tracing::debug!("Authenticated to control port at {}", self.address);
        Ok(())
    }

    async fn request_new_identity(&mut self) -> Result<(), SessionError> {
        let (code, text) = self.command("SIGNAL NEWNYM").await?;
        if code != 250 {
            return Err(SessionError::Rejected(format!("{} {}", code, text)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Serves one connection, answering each received line from `replies`
    async fn scripted_port(replies: Vec<&'static str>) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut socket = BufReader::new(socket);
            let mut received = Vec::new();

            for reply in replies {
                let mut line = String::new();
                if socket.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                received.push(line.trim_end().to_string());
                socket.get_mut().write_all(reply.as_bytes()).await.unwrap();
            }
            received
        });

        (address, handle)
    }

    #[tokio::test]
    async fn test_password_auth_and_newnym() {
        let (address, handle) = scripted_port(vec!["250 OK\r\n", "250 OK\r\n"]).await;
        let mut controller = TorController::new(&address, ControlAuth::Password("s3\"cret".into()));

        controller.authenticate().await.unwrap();
        controller.request_new_identity().await.unwrap();

        let received = handle.await.unwrap();
        assert_eq!(received[0], r#"AUTHENTICATE "s3\"cret""#);
        assert_eq!(received[1], "SIGNAL NEWNYM");
    }

    #[tokio::test]
    async fn test_cookie_auth_is_hex() {
        let (address, handle) = scripted_port(vec!["250 OK\r\n"]).await;
        let mut controller = TorController::new(&address, ControlAuth::Cookie(vec![0xde, 0xad]));

        controller.authenticate().await.unwrap();
        assert_eq!(handle.await.unwrap()[0], "AUTHENTICATE dead");
    }

    #[tokio::test]
    async fn test_auth_failure() {
        let (address, _handle) =
            scripted_port(vec!["515 Authentication failed: Password did not match\r\n"]).await;
        let mut controller = TorController::new(&address, ControlAuth::Password("wrong".into()));

        let err = controller.authenticate().await.unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_multiline_reply() {
        let (address, _handle) =
            scripted_port(vec!["250-first\r\n250-second\r\n250 OK\r\n"]).await;
        let mut controller = TorController::new(&address, ControlAuth::None);

        controller.authenticate().await.unwrap();
    }

    #[tokio::test]
    async fn test_newnym_rejected() {
        let (address, _handle) =
            scripted_port(vec!["250 OK\r\n", "552 Unrecognized signal\r\n"]).await;
        let mut controller = TorController::new(&address, ControlAuth::None);

        controller.authenticate().await.unwrap();
        let err = controller.request_new_identity().await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_unreachable_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut controller = TorController::new(&address, ControlAuth::None)
            .with_timeout(Duration::from_secs(2));
        let err = controller.authenticate().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::ControllerUnavailable { .. } | SessionError::Timeout(_)
        ));
    }

    #[test]
    fn test_quote_password() {
        assert_eq!(quote_password(r#"a\b"c"#), r#""a\\b\"c""#);
    }
}
