use stagehand::http::response::{Body, Response, ResponseBuilder, StatusCode};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::OK.as_u16(), 200);
    assert_eq!(StatusCode::BAD_REQUEST.as_u16(), 400);
    assert_eq!(StatusCode::REQUEST_TIMEOUT.as_u16(), 408);
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), 500);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::OK.reason_phrase(), "OK");
    assert_eq!(StatusCode::BAD_REQUEST.reason_phrase(), "Bad Request");
    assert_eq!(StatusCode::REQUEST_TIMEOUT.reason_phrase(), "Request Timeout");
    assert_eq!(
        StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(StatusCode::from_u16(299).unwrap().reason_phrase(), "");
}

#[test]
fn test_status_code_from_u16() {
    assert_eq!(StatusCode::from_u16(418).map(|s| s.as_u16()), Some(418));
    assert_eq!(StatusCode::from_u16(99), None);
    assert_eq!(StatusCode::from_u16(1000), None);
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"This is the body".to_vec();
    let response = ResponseBuilder::new(StatusCode::OK).body(body.clone()).build();

    assert_eq!(
        response.headers.get("Content-Length"),
        Some(body.len().to_string().as_str())
    );
    assert_eq!(response.body.as_bytes(), &body[..]);
}

#[test]
fn test_response_builder_preserves_custom_content_length() {
    let response = ResponseBuilder::new(StatusCode::OK)
        .header("content-length", "999")
        .body("test")
        .build();

    assert_eq!(response.headers.len(), 1);
    assert_eq!(response.headers.get("Content-Length"), Some("999"));
}

#[test]
fn test_response_headers_are_case_insensitive() {
    let response = ResponseBuilder::new(StatusCode::OK)
        .header("Content-Type", "text/plain")
        .header("CONTENT-TYPE", "text/html")
        .build();

    assert_eq!(response.headers.get("content-type"), Some("text/html"));
    assert_eq!(response.headers.len(), 2); // Content-Type + Content-Length
}

#[test]
fn test_response_builder_empty_body() {
    let response = Response::empty(StatusCode::REQUEST_TIMEOUT);

    assert!(matches!(response.body, Body::Empty));
    assert_eq!(response.headers.get("Content-Length"), Some("0"));
}

#[test]
fn test_response_ok_helper() {
    let response = Response::ok("<h1>Hello World!</h1>");

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_bytes(), b"<h1>Hello World!</h1>");
}

#[test]
fn test_response_internal_error_helper() {
    let detailed = Response::internal_error(Some("boom"));
    let generic = Response::internal_error(None);

    assert_eq!(detailed.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(String::from_utf8_lossy(detailed.body.as_bytes()).contains("boom"));
    assert!(!String::from_utf8_lossy(generic.body.as_bytes()).contains("boom"));
}
