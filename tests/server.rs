use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use wicket::{AdminResource, Api, Params, Server};

async fn roundtrip(addr: std::net::SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8(buf).unwrap()
}

#[tokio::test]
async fn serves_over_tcp_and_shuts_down() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let api = Api::new()
        .resource("/ping", AdminResource)
        .get("/hello/:name", |p: Params| async move { (200, p.get("name").map(str::to_owned)) });

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        Server::from_listener(listener)
            .serve_with_shutdown(api, async {
                let _ = stopped.await;
            })
            .await
    });

    let res = roundtrip(addr, "GET /ping HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 200 OK\r\n"), "{res}");
    assert!(res.contains("content-type: application/json"), "{res}");
    assert!(res.ends_with("null"), "{res}");

    let res = roundtrip(addr, "GET /hello/wicket HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    assert!(res.ends_with("\"wicket\""), "{res}");

    let res = roundtrip(addr, "DELETE /nowhere HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"), "{res}");

    stop.send(()).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert!(result.is_ok());
}
