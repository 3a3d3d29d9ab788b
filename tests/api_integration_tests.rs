// API Integration Tests
//
// Drives the full router against the sample assets in saved_model/.
// Run with: cargo test --test api_integration_tests

#[cfg(feature = "api")]
mod api_tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use disease_risk_api::model::{Activation, LayerSpec, ModelSpec};
    use disease_risk_api::{create_router, AppState, EncodingTables, RiskModel, RiskScorer};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt; // for oneshot

    // Helper: create app against the sample assets shipped with the repo
    fn create_test_app() -> axum::Router {
        let model_dir =
            std::env::var("MODEL_DIR").unwrap_or_else(|_| "saved_model".to_string());
        let state = AppState::new(&model_dir).expect("sample assets under saved_model/");
        create_router(state)
    }

    // Helper: parse JSON response
    async fn json_response(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        serde_json::from_slice(&body).expect("Failed to parse JSON")
    }

    fn predict_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict/disease-risk")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn sample_payload(crop: &str, stage: &str) -> Value {
        serde_json::json!({
            "crop": crop,
            "stage": stage,
            "ndvi": 0.5,
            "ndwi": 0.3,
            "min_temp": 10,
            "max_temp": 22,
            "humidity": 60
        })
    }

    // =========================================================================
    // Section 1: Health Check
    // =========================================================================

    #[tokio::test]
    async fn test_health_check() {
        let app = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = json_response(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_loaded"], true);
        assert!(body["timestamp"].is_string());
    }

    // =========================================================================
    // Section 2: Prediction - Happy Path
    // =========================================================================

    #[tokio::test]
    async fn test_predict_returns_exactly_the_mapped_diseases() {
        let app = create_test_app();

        let response = app
            .oneshot(predict_request(&sample_payload("wheat", "seedling")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = json_response(response).await;
        assert_eq!(body["crop"], "wheat");
        assert_eq!(body["stage"], "seedling");

        // wheat/seedling maps to exactly [rust, blight]
        let risk = body["risk"].as_object().unwrap();
        let mut keys: Vec<&str> = risk.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["blight", "rust"]);

        for (_, entry) in risk {
            let pct = entry["percentage"].as_f64().unwrap();
            assert!((0.0..=100.0).contains(&pct), "percentage out of range: {}", pct);
            let level = entry["level"].as_str().unwrap();
            assert!(["low", "medium", "high"].contains(&level));
        }
    }

    #[tokio::test]
    async fn test_predict_orders_descending_by_percentage() {
        let app = create_test_app();

        // Three diseases mapped for this pair
        let response = app
            .oneshot(predict_request(&sample_payload("wheat", "vegetative")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = json_response(response).await;
        let risk = body["risk"].as_object().unwrap();
        assert_eq!(risk.len(), 3);

        // preserve_order keeps the ranked object order through the parse
        let percentages: Vec<f64> = risk
            .values()
            .map(|v| v["percentage"].as_f64().unwrap())
            .collect();
        for pair in percentages.windows(2) {
            assert!(pair[0] >= pair[1], "not descending: {:?}", percentages);
        }
    }

    #[tokio::test]
    async fn test_predict_levels_match_band_thresholds() {
        let app = create_test_app();

        let response = app
            .oneshot(predict_request(&sample_payload("rice", "vegetative")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = json_response(response).await;
        for (_, entry) in body["risk"].as_object().unwrap() {
            let pct = entry["percentage"].as_f64().unwrap();
            let expected = if pct < 20.0 {
                "low"
            } else if pct < 40.0 {
                "medium"
            } else {
                "high"
            };
            assert_eq!(entry["level"].as_str().unwrap(), expected);

            // rounded to exactly 2 decimals
            assert!(((pct * 100.0).round() / 100.0 - pct).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_predict_normalizes_but_echoes_raw_input() {
        let app = create_test_app();

        let response = app
            .oneshot(predict_request(&sample_payload("  Wheat ", "SEEDLING")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = json_response(response).await;
        assert_eq!(body["crop"], "  Wheat ");
        assert_eq!(body["stage"], "SEEDLING");
        assert!(body["risk"].as_object().unwrap().contains_key("rust"));
    }

    #[tokio::test]
    async fn test_predict_is_deterministic() {
        let app = create_test_app();
        let payload = sample_payload("wheat", "seedling");

        let body1: Value =
            json_response(app.clone().oneshot(predict_request(&payload)).await.unwrap()).await;
        let body2: Value =
            json_response(app.oneshot(predict_request(&payload)).await.unwrap()).await;

        assert_eq!(body1, body2, "Same inputs should produce identical risks");
    }

    // =========================================================================
    // Section 3: Prediction - Input Validation
    // =========================================================================

    #[tokio::test]
    async fn test_unknown_crop_is_rejected() {
        let app = create_test_app();

        let response = app
            .oneshot(predict_request(&sample_payload("dragonfruit", "seedling")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = json_response(response).await;
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("dragonfruit"), "error should name the crop: {}", error);
    }

    #[tokio::test]
    async fn test_unknown_stage_is_rejected() {
        let app = create_test_app();

        let response = app
            .oneshot(predict_request(&sample_payload("wheat", "flowering2")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = json_response(response).await;
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("flowering2"), "error should name the stage: {}", error);
    }

    #[tokio::test]
    async fn test_unmapped_pair_is_rejected() {
        let app = create_test_app();

        // sowing is an encoded stage but no crop maps diseases for it
        let response = app
            .oneshot(predict_request(&sample_payload("wheat", "sowing")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: Value = json_response(response).await;
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("wheat") && error.contains("sowing"), "error should name the pair: {}", error);
    }

    #[tokio::test]
    async fn test_empty_disease_list_is_rejected() {
        let app = create_test_app();

        // wheat/maturity exists in the map with an empty list
        let response = app
            .oneshot(predict_request(&sample_payload("wheat", "maturity")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_field_is_a_client_error() {
        let app = create_test_app();

        let payload = serde_json::json!({ "crop": "wheat", "stage": "seedling" });
        let response = app.oneshot(predict_request(&payload)).await.unwrap();

        assert!(
            response.status().is_client_error(),
            "incomplete body should be rejected, got {:?}",
            response.status()
        );
    }

    // =========================================================================
    // Section 4: Data Integrity
    // =========================================================================

    #[tokio::test]
    async fn test_unencoded_disease_surfaces_as_server_error() {
        // Broken asset: the map names a disease the encodings do not know.
        let tables = EncodingTables::from_json(
            r#"{"crop": {"wheat": 0}, "stage": {"seedling": 0}, "disease": {"rust": 0}}"#,
            r#"{"wheat": {"seedling": ["rust", "mystery_rot"]}}"#,
        )
        .unwrap();
        let model = RiskModel::from_spec(ModelSpec {
            input_dim: 8,
            layers: vec![LayerSpec {
                weights: vec![vec![0.0; 8]],
                biases: vec![0.0],
                activation: Activation::Sigmoid,
            }],
        })
        .unwrap();
        let state = AppState {
            scorer: Arc::new(RiskScorer::new(tables, model)),
        };
        let app = create_router(state);

        let response = app
            .oneshot(predict_request(&sample_payload("wheat", "seedling")))
            .await
            .unwrap();

        // Fail-fast: no partial result even though "rust" scored cleanly
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = json_response(response).await;
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("mystery_rot"), "error should name the disease: {}", error);
    }

    // =========================================================================
    // Section 5: Startup
    // =========================================================================

    #[tokio::test]
    async fn test_startup_fails_on_missing_assets() {
        assert!(AppState::new("no_such_dir").is_err());
    }
}
