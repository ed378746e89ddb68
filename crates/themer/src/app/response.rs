//! Response helpers.

use http::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use http::{Response, StatusCode};

fn text(status: StatusCode, body: &'static str) -> Response<Vec<u8>> {
    let mut response = Response::new(body.as_bytes().to_vec());
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

pub fn not_found() -> Response<Vec<u8>> {
    text(StatusCode::NOT_FOUND, "Not Found")
}

pub fn method_not_allowed() -> Response<Vec<u8>> {
    text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

pub fn internal_error() -> Response<Vec<u8>> {
    text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// A 200 response carrying a file's bytes, typed by the file's extension.
pub fn file(filename: &str, bytes: Vec<u8>) -> Response<Vec<u8>> {
    let len = bytes.len() as u64;
    let mut response = Response::new(bytes);
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type(filename)));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    response
}

/// Guesses a MIME type from a file name's extension.
pub fn content_type(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("app.css"), "text/css; charset=utf-8");
        assert_eq!(content_type("img/LOGO.PNG"), "image/png");
        assert_eq!(content_type("static.txt"), "text/plain; charset=utf-8");
        assert_eq!(content_type("archive"), "application/octet-stream");
        assert_eq!(content_type("data.bin"), "application/octet-stream");
    }

    #[test]
    fn test_file_response() {
        let response = file("app.css", b"body {}".to_vec());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/css; charset=utf-8");
        assert_eq!(response.headers()[CONTENT_LENGTH], "7");
        assert_eq!(response.body(), b"body {}");
    }

    #[test]
    fn test_not_found_response() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
