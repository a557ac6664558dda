//! HTTP Delivery Tests
//!
//! Exercises `HttpDelivery` against a local wiremock server, both directly and
//! at the end of a full pipeline run.

mod common;

use std::sync::Arc;
use std::time::Duration;

use caption_relay::adapters::{Delivery, DeliveryError, DeliveryMeta, HttpDelivery};
use caption_relay::{JobError, JobPipeline};
use common::*;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> HttpDelivery {
    HttpDelivery::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_posts_plain_text_with_query_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(query_param("user_id", "user-7"))
        .and(query_param("lead_magnet_id", "lm-42"))
        .and(header("content-type", "text/plain"))
        .and(body_string("Hello world.\n\nGoodbye!"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = format!("{}/hook", server.uri());
    let meta = DeliveryMeta {
        user_id: "user-7",
        delivery_target: "lm-42",
        endpoint: &endpoint,
    };

    client()
        .deliver("Hello world.\n\nGoodbye!", meta)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_200_is_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let endpoint = format!("{}/hook", server.uri());
    let meta = DeliveryMeta {
        user_id: "u",
        delivery_target: "lm",
        endpoint: &endpoint,
    };

    let err = client().deliver("text", meta).await.unwrap_err();
    match err {
        DeliveryError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_other_success_codes_are_not_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let endpoint = format!("{}/hook", server.uri());
    let meta = DeliveryMeta {
        user_id: "u",
        delivery_target: "lm",
        endpoint: &endpoint,
    };

    let err = client().deliver("text", meta).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Status { status: 204, .. }));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let meta = DeliveryMeta {
        user_id: "u",
        delivery_target: "lm",
        endpoint: "http://127.0.0.1:1/hook",
    };

    let err = client().deliver("text", meta).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Transport(_)));
}

#[tokio::test]
async fn test_pipeline_delivers_normalized_text_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(query_param("user_id", "user-7"))
        .and(query_param("lead_magnet_id", "lm-e2e"))
        .and(body_string("Hello world.\n\nGoodbye!"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (temp, artifacts) = scratch();
    let downloader = Arc::new(FakeDownloader::writing(temp.path(), "vtt", SCENARIO_VTT));
    let pipeline = JobPipeline::new(downloader, Arc::new(client()), artifacts);

    let mut job = job("lm-e2e");
    job.endpoint = format!("{}/hook", server.uri());

    pipeline.run(&job).await.unwrap();
    assert!(remaining_files(temp.path()).is_empty());
}

#[tokio::test]
async fn test_pipeline_never_posts_empty_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (temp, artifacts) = scratch();
    let downloader = Arc::new(FakeDownloader::writing(temp.path(), "vtt", "WEBVTT\n"));
    let pipeline = JobPipeline::new(downloader, Arc::new(client()), artifacts);

    let mut job = job("lm-empty");
    job.endpoint = format!("{}/hook", server.uri());

    let err = pipeline.run(&job).await.unwrap_err();
    assert!(matches!(err, JobError::EmptyContent));
}
