use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

use lumiroom_api::models::Mode;
use lumiroom_server::app::create_app;
use lumiroom_server::configs::Simulation;
use lumiroom_server::services::bus::{BusClient, MemoryBus, QoS, Subscription};
use lumiroom_server::services::{ModeService, RoomService, TopologyService};

pub struct MockApp {
    pub bus: MemoryBus,
    pub topology: Arc<TopologyService>,
    pub modes: Arc<ModeService>,
    pub rooms: Arc<RoomService>,
    pub router: Router,
}

impl MockApp {
    pub fn new() -> Self {
        // One reading per room is enough, tests publish the rest themselves.
        Self::with_interval(Duration::from_secs(3600))
    }

    pub fn with_interval(interval: Duration) -> Self {
        let bus = MemoryBus::new();
        let topology = Arc::new(TopologyService::new());
        let modes = Arc::new(ModeService::new(Mode::Normal));
        let simulation = Simulation {
            sensor_interval_ms: interval.as_millis() as u64,
            global_mode: Mode::Normal,
            room_mode: Mode::Test,
        };
        let rooms = Arc::new(RoomService::new(&topology, &modes, Arc::new(bus.clone()), &simulation));
        let router = create_app(
            &topology,
            &modes,
            &rooms,
            concat!(env!("CARGO_MANIFEST_DIR"), "/static"),
        );

        Self {
            bus,
            topology,
            modes,
            rooms,
            router,
        }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post<T: Serialize>(&self, uri: &str, body: &T) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let res_body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // Extractor rejections come back as plain text.
        let value = if res_body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&res_body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&res_body).into_owned()))
        };

        (status, value)
    }

    pub async fn observe(&self, filter: &str) -> Subscription {
        self.bus
            .client("observer")
            .subscribe(filter, QoS::AtLeastOnce)
            .await
            .unwrap()
    }

    pub async fn publish(&self, topic: &str, payload: &Value) {
        self.bus
            .client("tester")
            .publish(topic, serde_json::to_vec(payload).unwrap(), QoS::AtLeastOnce)
            .await
            .unwrap();
    }
}

pub async fn next_json(subscription: &mut Subscription) -> Value {
    let delivery = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("no delivery within 5s")
        .expect("subscription closed");

    serde_json::from_slice(&delivery.payload).unwrap()
}
