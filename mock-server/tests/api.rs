use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, ROBOTS_TXT};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- get / delete ---

#[tokio::test]
async fn get_echoes_query_args() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/get?test=something&other=else")
                .header("user-agent", "httpc/1.0")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.args["test"], "something");
    assert_eq!(echo.args["other"], "else");
    assert_eq!(echo.headers["user-agent"], "httpc/1.0");
    assert_eq!(echo.url, "/get?test=something&other=else");
    assert!(echo.data.is_none());
}

#[tokio::test]
async fn delete_echoes_args() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/delete?test=true")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.args["test"], "true");
}

#[tokio::test]
async fn wrong_method_is_405() {
    let resp = app()
        .oneshot(Request::builder().method("POST").uri("/get").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// --- post / put ---

#[tokio::test]
async fn post_echoes_json_body() {
    let resp = app()
        .oneshot(json_request("POST", "/post", r#"{"test":["something"]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.data.as_deref(), Some(r#"{"test":["something"]}"#));
    assert_eq!(echo.json, Some(serde_json::json!({"test": ["something"]})));
    assert_eq!(echo.headers["content-type"], "application/json");
}

#[tokio::test]
async fn put_with_text_body_has_no_json() {
    let resp = app().oneshot(json_request("PUT", "/put", "plain words")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.data.as_deref(), Some("plain words"));
    assert!(echo.json.is_none());
}

// --- headers / status / text ---

#[tokio::test]
async fn headers_are_reported() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/headers")
                .header("x-custom", "yes")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    let value: serde_json::Value = body_json(resp).await;
    assert_eq!(value["headers"]["x-custom"], "yes");
}

#[tokio::test]
async fn status_returns_requested_code_with_empty_body() {
    let resp = app()
        .oneshot(Request::builder().uri("/status/418").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn status_rejects_non_numeric_code() {
    let resp = app()
        .oneshot(Request::builder().uri("/status/teapot").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn robots_is_plain_text() {
    let resp = app()
        .oneshot(Request::builder().uri("/robots.txt").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, ROBOTS_TXT.as_bytes());
}

// --- datagram responder ---

#[tokio::test]
async fn datagram_request_gets_single_datagram_response() {
    let server = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(mock_server::run_datagram(server));

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client
        .send_to(b"GET /get?via=udp HTTP/1.1\r\nHost: localhost\r\n\r\n", addr)
        .await
        .unwrap();

    let mut buf = vec![0u8; mock_server::MAX_DATAGRAM];
    let (n, _) = client.recv_from(&mut buf).await.unwrap();
    let text = String::from_utf8_lossy(&buf[..n]).into_owned();

    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"), "{text}");
    let (_, body) = text.split_once("\r\n\r\n").unwrap();
    let echo: Echo = serde_json::from_str(body).unwrap();
    assert_eq!(echo.args["via"], "udp");
    assert_eq!(echo.headers["host"], "localhost");
}

#[tokio::test]
async fn undecodable_datagram_gets_400() {
    let server = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(mock_server::run_datagram(server));

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(b"not http at all", addr).await.unwrap();

    let mut buf = vec![0u8; 1024];
    let (n, _) = client.recv_from(&mut buf).await.unwrap();
    assert!(buf[..n].starts_with(b"HTTP/1.1 400 Bad Request\r\n"));
}
