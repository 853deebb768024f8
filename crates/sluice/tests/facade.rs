//! Configuration to served response through the facade.

use sluice::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const CONFIG: &str = r#"
[server]
bind = "127.0.0.1:0"
root_path = "/svc"
max_body_size = 1024

[lifespan]
startup_timeout_secs = 5

[logging]
enabled = false
"#;

#[tokio::test]
async fn test_config_to_response() {
    let config = ConfigLoader::new()
        .with_string(CONFIG, "toml")
        .unwrap()
        .load()
        .unwrap();
    let server_config = init_from_config(&config).unwrap();
    assert_eq!(server_config.root_path(), "/svc");

    let app = SyncFn::new(|environ: &mut Environ, start: &mut StartResponse| {
        start.start("200 OK", [("content-type", "text/plain")])?;
        Ok(response_iter([format!(
            "{}{}",
            environ.script_name, environ.path_info
        )]))
    });
    let adapter = SyncAdapter::new(app, server_config.max_body_size());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let server = tokio::spawn(Server::new(server_config, adapter).serve(listener, shutdown.clone()));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /svc/users/7 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
    assert!(response.ends_with("/svc/users/7"), "{response}");

    shutdown.trigger();
    server.await.unwrap().unwrap();
}
