use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use planet_backend::classifier::{ClassifierError, InferenceEngine, PlanetAnalytics};
use planet_backend::config::{ClassifierConfig, InputSize, Thresholds};
use planet_backend::routes::{configure_routes, MAX_UPLOAD_BYTES};
use std::io::Cursor;
use std::sync::Arc;

const BOUNDARY: &str = "planet-test-boundary";

struct StubEngine(Vec<f32>);

impl InferenceEngine for StubEngine {
    fn forward(&self, _input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.0.clone())
    }
}

fn analytics(classes: &[&str], scores: Vec<f32>) -> PlanetAnalytics {
    let config = ClassifierConfig {
        model_path: "unused.pt".into(),
        device: "cpu".into(),
        classes: classes.iter().map(|c| c.to_string()).collect(),
        input_size: InputSize { width: 16, height: 16 },
        thresholds: Thresholds::Uniform(0.5),
    };
    PlanetAnalytics::new(config, Arc::new(StubEngine(scores)))
}

fn sample_png() -> Vec<u8> {
    let img = RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 7) as u8, (y * 9) as u8, 128]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn multipart_body(field: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"file_99.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(uri: &str, field: &str, data: &[u8]) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(multipart_body(field, data))
}

#[actix_web::test]
async fn classes_returns_configured_list() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["a", "b", "c"], vec![0.0; 3])))
            .configure(configure_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/planet/classes").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, serde_json::json!({"classes": ["a", "b", "c"]}));
}

#[actix_web::test]
async fn predict_returns_thresholded_classes() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["rain", "clear"], vec![2.0, -2.0])))
            .configure(configure_routes),
    )
    .await;

    let resp = test::call_service(&app, upload("/planet/predict", "image", &sample_png()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body, serde_json::json!({"classes": ["rain"]}));
}

#[actix_web::test]
async fn predict_proba_returns_every_class_in_order() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["rain", "clear"], vec![2.0, -2.0])))
            .configure(configure_routes),
    )
    .await;

    let resp = test::call_service(&app, upload("/planet/predict_proba", "image", &sample_png()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let raw = test::read_body(resp).await;
    assert_eq!(&raw[..], br#"{"rain":0.8808,"clear":0.1192}"#);
}

#[actix_web::test]
async fn predict_proba_values_are_probabilities() {
    let classes = ["haze", "primary", "agriculture", "clear", "water"];
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&classes, vec![-9.0, 4.5, 0.0, 0.3, 30.0])))
            .configure(configure_routes),
    )
    .await;

    let resp = test::call_service(&app, upload("/planet/predict_proba", "image", &sample_png()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let map = body.as_object().unwrap();
    assert_eq!(map.len(), classes.len());
    for (planet, prob) in map {
        let prob = prob.as_f64().unwrap();
        assert!((0.0..=1.0).contains(&prob), "{} out of range: {}", planet, prob);
    }
}

#[actix_web::test]
async fn malformed_image_is_bad_request() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["rain", "clear"], vec![2.0, -2.0])))
            .configure(configure_routes),
    )
    .await;

    let resp = test::call_service(&app, upload("/planet/predict", "image", b"not an image").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "DECODE_ERROR");
}

#[actix_web::test]
async fn missing_image_field_is_bad_request() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["rain", "clear"], vec![2.0, -2.0])))
            .configure(configure_routes),
    )
    .await;

    let resp = test::call_service(&app, upload("/planet/predict", "photo", &sample_png()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[actix_web::test]
async fn empty_image_field_is_bad_request() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["rain", "clear"], vec![2.0, -2.0])))
            .configure(configure_routes),
    )
    .await;

    let resp = test::call_service(&app, upload("/planet/predict", "image", b"").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[actix_web::test]
async fn oversized_upload_is_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["rain", "clear"], vec![2.0, -2.0])))
            .configure(configure_routes),
    )
    .await;

    let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
    let resp = test::call_service(&app, upload("/planet/predict_proba", "image", &oversized).to_request()).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[actix_web::test]
async fn huge_dimensions_are_decode_errors() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["rain", "clear"], vec![2.0, -2.0])))
            .configure(configure_routes),
    )
    .await;

    let wide = RgbImage::new(20_000, 1);
    let mut buf = Cursor::new(Vec::new());
    wide.write_to(&mut buf, ImageFormat::Png).unwrap();

    let resp = test::call_service(&app, upload("/planet/predict", "image", &buf.into_inner()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "DECODE_ERROR");
}

#[actix_web::test]
async fn inference_failure_is_server_error() {
    struct Broken;
    impl InferenceEngine for Broken {
        fn forward(&self, _input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
            Err(ClassifierError::Inference("device lost".into()))
        }
    }

    let config = ClassifierConfig {
        model_path: "unused.pt".into(),
        device: "cpu".into(),
        classes: vec!["rain".into()],
        input_size: InputSize { width: 8, height: 8 },
        thresholds: Thresholds::Uniform(0.5),
    };
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(PlanetAnalytics::new(config, Arc::new(Broken))))
            .configure(configure_routes),
    )
    .await;

    let resp = test::call_service(&app, upload("/planet/predict_proba", "image", &sample_png()).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "INFERENCE_ERROR");
}

#[actix_web::test]
async fn root_serves_html() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(analytics(&["a"], vec![0.0])))
            .configure(configure_routes),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("/planet/classes"));
}
