use crate::core::errors::ProxyError;
use crate::core::render::RenderContext;
use crate::core::uploads::{StagedUpload, receive_uploads, remove_staged};
use crate::server::errors::AppError;
use crate::server::types::AppState;
use crate::server::views::{render_index, render_result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::BoxError;
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;

pub const INCOMPLETE_UPLOAD_MESSAGE: &str =
    "Upload incomplete: the user, style and color files are all required.";
pub const BACKEND_FAILURE_MESSAGE: &str = "Server error: the image backend call failed.";

// upload form
pub async fn index_handler() -> Result<Html<String>, AppError> {
    Ok(Html(render_index()?))
}

// backend liveness check
pub async fn ping_backend_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.backend.healthz().await {
        Ok((status, body)) => (StatusCode::OK, format!("ok {} {}", status, body)).into_response(),
        Err(e) => {
            let status = e
                .upstream_status()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            tracing::warn!(status = %status, error = %e, "backend health check failed");

            (
                StatusCode::BAD_GATEWAY,
                format!("fail {} {}", status, e.upstream_detail()),
            )
                .into_response()
        }
    }
}

// receive the three files, proxy them to the backend, render the result page
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let start_time = std::time::Instant::now();
    let mut multipart = multipart?;

    let staged = receive_uploads(&mut multipart, &state.config.upload_dir).await?;
    let staged_paths = staged.paths();

    let outcome = proxy_and_render(&state, staged).await;

    if state.config.cleanup_uploads {
        remove_staged(&staged_paths).await;
    }

    tracing::info!(elapsed = ?start_time.elapsed(), "upload handled");
    outcome
}

async fn proxy_and_render(state: &AppState, staged: StagedUpload) -> Result<Response, AppError> {
    let upload = match staged.require_all() {
        Ok(upload) => upload,
        Err(e) => return Ok(proxy_failure(e)),
    };

    let generated = match state.backend.generate(&upload).await {
        Ok(generated) => generated,
        Err(e) => return Ok(proxy_failure(e)),
    };

    let ctx = RenderContext::build(&upload, &generated).await?;
    Ok(Html(render_result(&ctx)?).into_response())
}

fn proxy_failure(err: ProxyError) -> Response {
    let message = match &err {
        ProxyError::IncompleteUpload { missing } => {
            tracing::warn!(missing = ?missing, "rejecting incomplete upload");
            INCOMPLETE_UPLOAD_MESSAGE
        }
        other => {
            tracing::error!(
                status = ?other.upstream_status(),
                body = %other.upstream_detail(),
                "backend call failed"
            );
            BACKEND_FAILURE_MESSAGE
        }
    };

    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
}

pub async fn not_found_handler() -> AppError {
    AppError::NotFound
}

// errors raised by tower middleware rather than by a handler
pub async fn handle_layer_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout
    } else {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{BACKEND_FAILURE_MESSAGE, INCOMPLETE_UPLOAD_MESSAGE};
    use crate::app;
    use crate::config::Config;
    use crate::server::types::AppState;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use axum_test::multipart::{MultipartForm, Part};
    use base64::{Engine as _, engine::general_purpose};
    use std::future::IntoFuture;
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATED_PNG: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, b'g', b'e', b'n', b'e', b'r', b'a', b't',
        b'e', b'd', 0x00, 0xff, 0x10,
    ];

    fn test_config(backend_url: &str, upload_dir: &TempDir) -> Config {
        let mut config = Config::with_backend(Url::parse(backend_url).unwrap());
        config.upload_dir = upload_dir.path().to_path_buf();
        config.generate_timeout = Duration::from_millis(500);
        config.healthz_timeout = Duration::from_millis(500);
        config
    }

    fn server_with(config: Config) -> TestServer {
        TestServer::new(app(AppState::new(config))).expect("Failed to create test server")
    }

    fn test_server(backend_url: &str, upload_dir: &TempDir, cleanup: bool) -> TestServer {
        let mut config = test_config(backend_url, upload_dir);
        config.cleanup_uploads = cleanup;
        server_with(config)
    }

    fn file_part(content: &str, file_name: &str) -> Part {
        Part::bytes(content.as_bytes().to_vec())
            .file_name(file_name)
            .mime_type("image/jpeg")
    }

    fn full_form(tag: &str) -> MultipartForm {
        MultipartForm::new()
            .add_part("user", file_part(&format!("{tag}-user"), "me.jpg"))
            .add_part("style", file_part(&format!("{tag}-style"), "monet.jpg"))
            .add_part("color", file_part(&format!("{tag}-color"), "sunset.jpg"))
    }

    /// Attribute values come out HTML-escaped; browsers undo `&#x2f;` before use.
    fn unescaped(page: &str) -> String {
        page.replace("&#x2f;", "/")
    }

    /// Decodes the base64 payload of the `<img id="...">` data URI.
    fn embedded(page: &str, id: &str) -> Vec<u8> {
        let page = unescaped(page);
        let start = page
            .find(&format!("id=\"{}\"", id))
            .unwrap_or_else(|| panic!("no image with id {id}"));
        let rest = &page[start..];
        let data = &rest[rest.find(";base64,").unwrap() + ";base64,".len()..];
        let end = data.find('"').unwrap();
        general_purpose::STANDARD.decode(&data[..end]).unwrap()
    }

    async fn mock_generate(backend: &MockServer, response: ResponseTemplate, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(response)
            .expect(expected_calls)
            .mount(backend)
            .await;
    }

    #[tokio::test]
    async fn test_upload_renders_all_four_images() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(body_string_contains("name=\"user\""))
            .and(body_string_contains("name=\"style\""))
            .and(body_string_contains("name=\"color\""))
            .and(body_string_contains("solo-style"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(GENERATED_PNG))
            .expect(1)
            .mount(&backend)
            .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let response = server.post("/upload").multipart(full_form("solo")).await;
        response.assert_status(StatusCode::OK);

        let page = response.text();
        assert!(unescaped(&page).contains("data:image/png;base64,"));
        assert_eq!(embedded(&page, "result"), GENERATED_PNG);
        assert_eq!(embedded(&page, "user"), b"solo-user");
        assert_eq!(embedded(&page, "style"), b"solo-style");
        assert_eq!(embedded(&page, "color"), b"solo-color");

        // staged files are left for the host's temp cleanup
        let staged: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(staged.len(), 3);
    }

    #[tokio::test]
    async fn test_cleanup_removes_staged_files() {
        let backend = MockServer::start().await;
        mock_generate(
            &backend,
            ResponseTemplate::new(200).set_body_bytes(GENERATED_PNG),
            1,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, true);

        let response = server.post("/upload").multipart(full_form("tidy")).await;
        response.assert_status(StatusCode::OK);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_files_never_reach_backend() {
        let backend = MockServer::start().await;
        mock_generate(
            &backend,
            ResponseTemplate::new(200).set_body_bytes(GENERATED_PNG),
            0,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let partial = MultipartForm::new()
            .add_part("user", file_part("u", "me.jpg"))
            .add_part("color", file_part("c", "sunset.jpg"));
        let response = server.post("/upload").multipart(partial).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), INCOMPLETE_UPLOAD_MESSAGE);

        let unrelated = MultipartForm::new().add_part("avatar", file_part("a", "a.jpg"));
        let response = server.post("/upload").multipart(unrelated).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), INCOMPLETE_UPLOAD_MESSAGE);
    }

    #[tokio::test]
    async fn test_backend_error_status_is_server_error() {
        let backend = MockServer::start().await;
        mock_generate(
            &backend,
            ResponseTemplate::new(503).set_body_json(serde_json::json!({"detail": "gpu busy"})),
            1,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let response = server.post("/upload").multipart(full_form("busy")).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), BACKEND_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_backend_timeout_is_server_error() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(GENERATED_PNG)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&backend)
            .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let response = server.post("/upload").multipart(full_form("slow")).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!response.text().contains("id=\"result\""));
    }

    #[tokio::test]
    async fn test_non_image_success_is_server_error() {
        let backend = MockServer::start().await;
        mock_generate(
            &backend,
            ResponseTemplate::new(200).set_body_string("<html>tunnel offline</html>"),
            1,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let response = server.post("/upload").multipart(full_form("html")).await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), BACKEND_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_stay_separate() {
        let backend = MockServer::start().await;
        mock_generate(
            &backend,
            ResponseTemplate::new(200)
                .set_body_bytes(GENERATED_PNG)
                .set_delay(Duration::from_millis(50)),
            2,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let (first, second) = tokio::join!(
            server.post("/upload").multipart(full_form("first")).into_future(),
            server.post("/upload").multipart(full_form("second")).into_future(),
        );
        first.assert_status(StatusCode::OK);
        second.assert_status(StatusCode::OK);

        for (response, tag) in [(first, "first"), (second, "second")] {
            let page = response.text();
            assert_eq!(embedded(&page, "user"), format!("{tag}-user").as_bytes());
            assert_eq!(embedded(&page, "style"), format!("{tag}-style").as_bytes());
            assert_eq!(embedded(&page, "color"), format!("{tag}-color").as_bytes());
        }

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 6);
    }

    #[tokio::test]
    async fn test_ping_healthy_backend() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&backend)
            .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let response = server.get("/ping-colab").await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.text(), "ok 200 ok");
    }

    #[tokio::test]
    async fn test_ping_unhealthy_backend() {
        let backend = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/healthz"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&backend)
            .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let response = server.get("/ping-colab").await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        assert_eq!(response.text(), "fail 500 model not loaded");
    }

    #[tokio::test]
    async fn test_ping_unreachable_backend() {
        let dir = TempDir::new().unwrap();
        let server = test_server("http://127.0.0.1:9", &dir, false);

        let response = server.get("/ping-colab").await;
        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(response.text().starts_with("fail"));
    }

    #[tokio::test]
    async fn test_unknown_route_and_index() {
        let dir = TempDir::new().unwrap();
        let server = test_server("http://127.0.0.1:9", &dir, false);

        let response = server.get("/does-not-exist").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert!(response.text().contains("<h2>404</h2>"));

        let response = server.get("/").await;
        response.assert_status(StatusCode::OK);
        assert!(response.text().contains("action=\"/upload\""));
    }

    #[tokio::test]
    async fn test_non_multipart_upload_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let server = test_server("http://127.0.0.1:9", &dir, false);

        let response = server.post("/upload").text("not a form").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_declared_content_type_cannot_inject_markup() {
        let backend = MockServer::start().await;
        mock_generate(
            &backend,
            ResponseTemplate::new(200).set_body_bytes(GENERATED_PNG),
            1,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let server = test_server(&backend.uri(), &dir, false);

        let hostile = Part::bytes(b"notanimage".to_vec())
            .file_name("me.png")
            .mime_type(r#"image/png;x="a><script>alert(1)</script>""#);
        let form = MultipartForm::new()
            .add_part("user", hostile)
            .add_part("style", file_part("s", "monet.jpg"))
            .add_part("color", file_part("c", "sunset.jpg"));

        let response = server.post("/upload").multipart(form).await;
        response.assert_status(StatusCode::OK);

        let page = response.text();
        assert!(!page.contains("<script>"));
        assert!(unescaped(&page).contains("src=\"data:image/png;base64,bm90YW5pbWFnZQ==\""));
        assert_eq!(embedded(&page, "user"), b"notanimage");
    }

    #[tokio::test]
    async fn test_oversized_upload_reports_size_limit() {
        let backend = MockServer::start().await;
        mock_generate(
            &backend,
            ResponseTemplate::new(200).set_body_bytes(GENERATED_PNG),
            0,
        )
        .await;

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&backend.uri(), &dir);
        config.body_limit = 64;
        let server = server_with(config);

        let big = "x".repeat(4 * 1024);
        let form = MultipartForm::new().add_part("user", file_part(&big, "me.jpg"));
        let response = server.post("/upload").multipart(form).await;
        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

        let page = response.text();
        assert!(page.contains("upload too large"));
        assert!(!page.contains("malformed multipart body"));
    }

    #[tokio::test]
    async fn test_request_timeout_renders_error_page() {
        let backend = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(GENERATED_PNG)
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&backend)
            .await;

        let dir = TempDir::new().unwrap();
        let mut config = test_config(&backend.uri(), &dir);
        config.generate_timeout = Duration::from_secs(10);
        config.request_timeout = Duration::from_millis(200);
        let server = server_with(config);

        let response = server.post("/upload").multipart(full_form("late")).await;
        response.assert_status(StatusCode::REQUEST_TIMEOUT);

        let page = response.text();
        assert!(page.contains("<h2>408</h2>"));
        assert!(page.contains("Request Timeout"));
    }
}
