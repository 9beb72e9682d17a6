// Accept loop module
// Runs until shutdown is notified, then waits for in-flight connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Accept connections until `shutdown` fires.
///
/// The listener is closed first; active connections then get
/// `shutdown_grace_period` seconds before the runtime drops them.
pub async fn serve(listener: TcpListener, state: Arc<AppState>, shutdown: Arc<Notify>) {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
            () = shutdown.notified() => break,
        }
    }

    drop(listener);
    let active = active_connections.load(Ordering::SeqCst);
    logger::log_shutdown(active);

    let grace = Duration::from_secs(state.config.performance.shutdown_grace_period);
    let deadline = Instant::now() + grace;
    while active_connections.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }

    let remaining = active_connections.load(Ordering::SeqCst);
    if remaining > 0 {
        logger::log_warning(&format!(
            "Grace period over, dropping {remaining} connection(s)"
        ));
    } else {
        logger::log_info("All connections closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_listener;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn state(base: &std::path::Path) -> Arc<AppState> {
        let mut config = Config::load_from("/nonexistent/filedrop-test-config").unwrap();
        config.storage.base_path = base.to_path_buf();
        config.logging.access_log = false;
        config.performance.shutdown_grace_period = 1;
        Arc::new(AppState::new(config))
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("hello.txt"), b"hi").unwrap();

        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(serve(listener, state(dir.path()), Arc::clone(&shutdown)));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /list HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with(r#"["hello.txt"]"#));

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_connection_cap_rejects_extra_clients() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from("/nonexistent/filedrop-test-config").unwrap();
        config.storage.base_path = dir.path().to_path_buf();
        config.logging.access_log = false;
        config.performance.max_connections = Some(0);
        config.performance.shutdown_grace_period = 0;

        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(serve(listener, Arc::new(AppState::new(config)), Arc::clone(&shutdown)));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let _ = stream
            .write_all(b"GET /list HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await;
        let mut response = Vec::new();
        let _ = stream.read_to_end(&mut response).await;
        assert!(response.is_empty());

        shutdown.notify_one();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_timed_out_upload_leaves_no_partial_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from("/nonexistent/filedrop-test-config").unwrap();
        config.storage.base_path = dir.path().to_path_buf();
        config.logging.access_log = false;
        config.performance.connection_timeout = Some(1);
        config.performance.shutdown_grace_period = 0;

        let listener = create_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(serve(listener, Arc::new(AppState::new(config)), Arc::clone(&shutdown)));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        let head = "POST /upload?path= HTTP/1.1\r\nHost: localhost\r\n\
            Content-Type: multipart/form-data; boundary=b\r\nContent-Length: 100000\r\n\r\n\
            --b\r\nContent-Disposition: form-data; name=\"myFile\"; filename=\"slow.bin\"\r\n\r\n\
            partial content";
        stream.write_all(head.as_bytes()).await.unwrap();

        let partial = dir.path().join("slow.bin");
        let deadline = Instant::now() + Duration::from_secs(5);
        while !partial.exists() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(partial.exists());

        // The client stalls; the connection timeout drops the upload
        let deadline = Instant::now() + Duration::from_secs(5);
        while partial.exists() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(!partial.exists());

        drop(stream);
        shutdown.notify_one();
        server.await.unwrap();
    }
}
