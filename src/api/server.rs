use std::sync::Arc;

use actix_web::{error, web, App, HttpResponse, HttpServer, Responder};

use crate::domain::order::Order;
use crate::metrics::PipelineMetrics;
use crate::pipeline::{cancellation, CancellationHandle, Pipeline, StageOutcome};

use super::dto::{OrderRequest, OrderResponse};

/// Shared by every worker; nothing in here is mutated per request
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub metrics: Arc<PipelineMetrics>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/orders", web::post().to(submit_order))
        .route("/health", web::get().to(health_handler))
        .route("/metrics", web::get().to(metrics_handler));
}

/// Answer unreadable bodies with a 400 in the same shape as other order
/// responses, before the pipeline is involved.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        tracing::warn!(error = %message, "Rejected malformed order request");
        let response = HttpResponse::BadRequest().json(OrderResponse::malformed(message));
        error::InternalError::from_response(err, response).into()
    })
}

pub async fn start_server(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    tracing::info!("🌐 Starting order API on http://{}:{}", host, port);

    let state = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(json_config())
            .configure(configure)
    })
    .bind((host, port))?
    .run()
    .await
}

async fn submit_order(state: web::Data<AppState>, body: web::Json<OrderRequest>) -> HttpResponse {
    let order = Order::from(body.into_inner());
    let order_id = order.id;
    let pipeline = state.pipeline.clone();

    // actix drops this future when the client goes away; the guard then
    // stops the run before its next stage.
    let (handle, signal) = cancellation();
    let _disconnect = CancelOnDrop(handle);

    // A panicking stage is a defect; isolating the run on its own task turns
    // it into a 500 instead of taking the worker down.
    let result =
        tokio::spawn(async move { pipeline.run_with_cancellation(&order, &signal).await }).await;

    match result {
        Ok(StageOutcome::Success) => HttpResponse::Ok().json(OrderResponse::accepted(order_id)),
        Ok(StageOutcome::Failure(failure)) => {
            HttpResponse::UnprocessableEntity().json(OrderResponse::rejected(order_id, &failure))
        }
        Err(join_error) => {
            tracing::error!(
                order_id = %order_id,
                error = %join_error,
                "Pipeline run aborted by an internal fault"
            );
            HttpResponse::InternalServerError().json(OrderResponse::internal_error(order_id))
        }
    }
}

struct CancelOnDrop(CancellationHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

async fn health_handler(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "order-pipeline",
        "stages": state.pipeline.stage_names(),
        "checkedAt": chrono::Utc::now(),
    }))
}

async fn metrics_handler(state: web::Data<AppState>) -> impl Responder {
    match state.metrics.encode() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::handler::test_stages::CountingStage;
    use crate::pipeline::test_support::collaborators;
    use crate::pipeline::{build_pipeline, Next, OrderHandler, StageKind};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::{mpsc, Notify};

    struct Exploding;

    #[async_trait]
    impl OrderHandler for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        async fn process(&self, _order: &Order, _next: Next<'_>) -> StageOutcome {
            panic!("stage bug");
        }
    }

    /// Holds the order until released, then reports what the rest of the
    /// chain returned.
    struct Gate {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        forwarded: mpsc::UnboundedSender<StageOutcome>,
    }

    #[async_trait]
    impl OrderHandler for Gate {
        fn name(&self) -> &str {
            "gate"
        }

        async fn process(&self, order: &Order, next: Next<'_>) -> StageOutcome {
            self.entered.notify_one();
            self.release.notified().await;
            let outcome = next.run(order).await;
            let _ = self.forwarded.send(outcome.clone());
            outcome
        }
    }

    fn state() -> AppState {
        let metrics = Arc::new(PipelineMetrics::new().unwrap());
        let pipeline = build_pipeline(
            &StageKind::default_chain(),
            &collaborators(),
            Some(metrics.clone()),
        )
        .unwrap();
        AppState {
            pipeline: Arc::new(pipeline),
            metrics,
        }
    }

    fn order_body(items: serde_json::Value, total: serde_json::Value) -> serde_json::Value {
        json!({
            "customerId": "customer-42",
            "items": items,
            "totalAmount": total,
            "paymentMethod": "CreditCard",
            "shippingAddress": {
                "street": "1 Main St",
                "city": "Springfield",
                "state": "IL",
                "postalCode": "62701",
                "country": "US"
            }
        })
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(json_config())
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_valid_order_is_accepted() {
        let app = app!(state());
        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(order_body(
                json!([{ "productId": "item1", "quantity": 1, "unitPrice": 10 }]),
                json!(10),
            ))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: OrderResponse = test::read_body_json(resp).await;
        assert!(body.success);
        assert_eq!(body.error_message, None);
    }

    #[actix_web::test]
    async fn test_rejected_order_returns_reason() {
        let app = app!(state());
        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(order_body(json!([]), json!(0)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: OrderResponse = test::read_body_json(resp).await;
        assert!(!body.success);
        assert_eq!(
            body.error_message.as_deref(),
            Some("Order must contain at least one item")
        );
        assert_eq!(body.failed_stage.as_deref(), Some("validation"));
    }

    #[actix_web::test]
    async fn test_malformed_body_never_reaches_pipeline() {
        let state = state();
        let metrics = state.metrics.clone();
        let app = app!(state);
        let req = test::TestRequest::post()
            .uri("/orders")
            .insert_header(("content-type", "application/json"))
            .set_payload(r#"{"customerId": 42"#)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: OrderResponse = test::read_body_json(resp).await;
        assert!(!body.success);
        assert!(body.error_message.is_some());
        assert_eq!(metrics.stage_invocations("validation"), 0);
    }

    #[actix_web::test]
    async fn test_zero_quantity_is_bad_request() {
        let state = state();
        let metrics = state.metrics.clone();
        let app = app!(state);
        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(order_body(
                json!([{ "productId": "item1", "quantity": 0, "unitPrice": 10 }]),
                json!(10),
            ))
            .to_request();

        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(metrics.stage_invocations("validation"), 0);
    }

    #[actix_web::test]
    async fn test_panicking_stage_is_internal_error() {
        let metrics = Arc::new(PipelineMetrics::new().unwrap());
        let pipeline = Pipeline::builder().stage(Exploding).build().unwrap();
        let app = app!(AppState {
            pipeline: Arc::new(pipeline),
            metrics,
        });
        let req = test::TestRequest::post()
            .uri("/orders")
            .set_json(order_body(json!([]), json!(0)))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: OrderResponse = test::read_body_json(resp).await;
        assert_eq!(
            body.error_message.as_deref(),
            Some("Internal error processing order")
        );
    }

    #[actix_web::test]
    async fn test_client_disconnect_stops_remaining_stages() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let (forwarded, mut outcomes) = mpsc::unbounded_channel();
        let downstream = CountingStage::passing("shipping");
        let pipeline = Pipeline::builder()
            .stage(Gate {
                entered: entered.clone(),
                release: release.clone(),
                forwarded,
            })
            .stage_shared(downstream.clone())
            .build()
            .unwrap();
        let state = web::Data::new(AppState {
            pipeline: Arc::new(pipeline),
            metrics: Arc::new(PipelineMetrics::new().unwrap()),
        });
        let request: OrderRequest = serde_json::from_value(order_body(
            json!([{ "productId": "item1", "quantity": 1, "unitPrice": 10 }]),
            json!(10),
        ))
        .unwrap();

        // Dropping the handler future is what actix does when the client goes away
        tokio::select! {
            _ = submit_order(state, web::Json(request)) => panic!("handler finished while the gate was closed"),
            _ = entered.notified() => {}
        }
        release.notify_one();

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(
            outcome.reason(),
            Some("Order processing cancelled before stage shipping")
        );
        assert_eq!(outcome.failed_stage(), Some("shipping"));
        assert_eq!(downstream.calls(), 0);
    }

    #[actix_web::test]
    async fn test_health_lists_stages() {
        let app = app!(state());
        let req = test::TestRequest::get().uri("/health").to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(
            body["stages"],
            json!(["validation", "inventory", "payment", "shipping"])
        );
    }

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_runs() {
        let app = app!(state());
        let order = test::TestRequest::post()
            .uri("/orders")
            .set_json(order_body(json!([]), json!(0)))
            .to_request();
        test::call_service(&app, order).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains("pipeline_runs_total{outcome=\"failure\"} 1"));
        assert!(text.contains("pipeline_stage_failures_total{stage=\"validation\"} 1"));
    }
}
