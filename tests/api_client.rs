use pipeline_client_lib::api::GenerateExcelRequest;
use pipeline_client_lib::{ApiClient, ApiError, ClientConfig};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    let config = ClientConfig {
        base_url: format!("{}/api/", server.uri()),
        ..ClientConfig::default()
    };
    ApiClient::new(&config).unwrap()
}

#[tokio::test]
async fn generate_excel_posts_camel_case_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate-excel"))
        .and(body_json(json!({"records": 1000, "fileName": "students.xlsx"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Generation started",
            "data": "op-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .generate_excel(&GenerateExcelRequest {
            records: 1000,
            file_name: Some("students.xlsx".to_string()),
        })
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.data.as_deref(), Some("op-1"));
}

#[tokio::test]
async fn generate_excel_omits_missing_file_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate-excel"))
        .and(body_json(json!({"records": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Generation started",
            "data": "op-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .generate_excel(&GenerateExcelRequest {
            records: 5,
            file_name: None,
        })
        .await
        .unwrap();
    assert_eq!(response.data.as_deref(), Some("op-2"));
}

#[tokio::test]
async fn progress_decodes_record_and_encodes_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/generate-excel/progress/batch%2F7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Progress retrieved",
            "data": {
                "operationId": "batch/7",
                "currentRecords": 500,
                "totalRecords": 1000,
                "elapsedTimeMs": 5000,
                "message": "Generated 500 records",
                "completed": false,
                "status": "IN_PROGRESS"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client_for(&server)
        .generation_progress("batch/7")
        .await
        .unwrap();
    let data = response.data.unwrap();
    assert_eq!(data.current_records, 500);
    assert_eq!(data.total_records, 1000);
    assert_eq!(data.elapsed_time_ms, 5000);
    assert_eq!(data.status.as_deref(), Some("IN_PROGRESS"));
    assert!(!data.completed);
}

#[tokio::test]
async fn unknown_operation_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/generate-excel/progress/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .generation_progress("gone")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(id) if id == "gone"));
}

#[tokio::test]
async fn error_status_with_rejecting_envelope_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate-excel"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "message": "Number of records must be positive"
        })))
        .mount(&server)
        .await;

    let response = client_for(&server)
        .generate_excel(&GenerateExcelRequest {
            records: 3,
            file_name: None,
        })
        .await
        .unwrap();
    assert!(!response.success);
    assert_eq!(response.message, "Number of records must be positive");
    assert!(response.data.is_none());
}

#[tokio::test]
async fn error_status_without_envelope_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client_for(&server).health_check().await.unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status.as_u16(), 502);
            assert_eq!(body, "bad gateway");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let err = client_for(&server).health_check().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn health_check_reads_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Service is running"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.base_url(), format!("{}/api", server.uri()));
    let response = client.health_check().await.unwrap();
    assert!(response.success);
    assert_eq!(response.message, "Service is running");
}
