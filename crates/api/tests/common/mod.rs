#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

use estate_api::app::dispatch::Dispatcher;
use estate_api::app::services::Services;
use estate_api::protocol::Response;
use estate_auth::{HashCost, ManualClock, PasswordHasher};
use estate_infra::store::InMemoryStore;

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub dispatcher: Arc<Dispatcher>,
}

impl Harness {
    pub fn new() -> Self {
        estate_observability::init_for_tests();

        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ));
        let hasher = PasswordHasher::new(HashCost::Fast).unwrap();
        let services = Services::new(store.clone(), hasher, clock.clone());
        Self {
            store,
            clock,
            dispatcher: Arc::new(Dispatcher::new(services)),
        }
    }

    pub async fn call(&self, function: u64, args: Value) -> Response {
        let frame = json!({ "function": function, "args": args }).to_string();
        self.dispatcher.dispatch_frame(frame.as_bytes()).await
    }

    pub async fn register(&self, login: &str, password: &str) {
        let res = self
            .call(
                1,
                json!({
                    "login": login,
                    "password": password,
                    "first_name": "Test",
                    "last_name": login,
                }),
            )
            .await;
        assert_eq!(res.code, 0, "register {login}");
    }

    pub async fn login(&self, login: &str, password: &str) -> String {
        let res = self.call(2, json!({ "login": login, "password": password })).await;
        assert_eq!(res.code, 0, "login {login}");
        res.data.unwrap()["token"].as_str().unwrap().to_string()
    }
}
