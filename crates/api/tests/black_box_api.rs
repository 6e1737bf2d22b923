//! Black-box HTTP tests against the same router production uses, bound to
//! an ephemeral port. Projections are fed asynchronously by the background
//! subscriber, so queries after a mutation poll until visible.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let services = Arc::new(fleetwise_api::app::services::build_services().await);
        let app = fleetwise_api::app::build_app_with(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn sign_in(client: &reqwest::Client, base_url: &str, email: &str) -> serde_json::Value {
    // Seeding is asynchronous: retry until the directory has the account.
    for _ in 0..50 {
        let resp = client
            .post(format!("{base_url}/auth/sign-in"))
            .json(&json!({ "email": email, "password": "password" }))
            .send()
            .await
            .expect("sign-in request failed");
        if resp.status() == StatusCode::OK {
            return resp.json().await.expect("sign-in body");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("sign-in for {email} never succeeded");
}

async fn token_for(client: &reqwest::Client, base_url: &str, email: &str) -> String {
    sign_in(client, base_url, email).await["token"]
        .as_str()
        .expect("token in sign-in response")
        .to_string()
}

async fn get_json_eventually(
    client: &reqwest::Client,
    url: &str,
    token: &str,
    ready: impl Fn(&serde_json::Value) -> bool,
) -> serde_json::Value {
    for _ in 0..50 {
        let resp = client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .expect("request failed");
        if resp.status() == StatusCode::OK {
            let body: serde_json::Value = resp.json().await.expect("json body");
            if ready(&body) {
                return body;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition never satisfied for {url}");
}

#[tokio::test]
async fn health_is_ungated() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/vehicles", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_credentials_are_rejected() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Wait for seeding via a successful admin sign-in first.
    let _ = token_for(&client, &server.base_url, "admin@fleetwise.example").await;

    let resp = client
        .post(format!("{}/auth/sign-in", server.base_url))
        .json(&json!({ "email": "admin@fleetwise.example", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_projects_capabilities_and_menu() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let body = sign_in(&client, &server.base_url, "mechanic@fleetwise.example").await;
    assert_eq!(body["actor"]["role"], "mechanic");
    assert_eq!(body["capabilities"]["can_maintain"], true);
    assert_eq!(body["capabilities"]["can_edit"], false);

    // Mechanic menu: dashboard + maintenance only.
    let menu = body["menu"].as_array().unwrap();
    assert_eq!(menu.len(), 2);
    assert_eq!(menu[0]["target_route"], "/");
    assert_eq!(menu[1]["target_route"], "/maintenance");
}

#[tokio::test]
async fn role_mismatch_is_forbidden_and_names_accepted_roles() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let driver = token_for(&client, &server.base_url, "driver@fleetwise.example").await;

    let resp = client
        .get(format!("{}/users", server.base_url))
        .bearer_auth(&driver)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: serde_json::Value = resp.json().await.unwrap();
    let required: Vec<&str> = body["required_roles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(required, vec!["admin", "manager"]);
}

#[tokio::test]
async fn admin_changes_a_role_and_the_directory_follows() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = token_for(&client, &server.base_url, "admin@fleetwise.example").await;

    // Create a driver, then elevate them to mechanic.
    let resp = client
        .post(format!("{}/users", server.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "email": "lea@fleetwise.example",
            "display_name": "Léa Fontaine",
            "role": "driver",
            "password": "password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user_id = resp.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // The directory is eventually consistent with the command side.
    get_json_eventually(
        &client,
        &format!("{}/users/{}", server.base_url, user_id),
        &admin,
        |body| body["user"]["role"] == "driver",
    )
    .await;

    let resp = client
        .post(format!("{}/users/{}/role", server.base_url, user_id))
        .bearer_auth(&admin)
        .json(&json!({ "role": "mechanic" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    get_json_eventually(
        &client,
        &format!("{}/users/{}", server.base_url, user_id),
        &admin,
        |body| body["user"]["role"] == "mechanic",
    )
    .await;

    // The elevated account signs in with mechanic capabilities.
    let body = sign_in(&client, &server.base_url, "lea@fleetwise.example").await;
    assert_eq!(body["capabilities"]["can_maintain"], true);
    assert_eq!(body["capabilities"]["can_edit"], false);
}

#[tokio::test]
async fn unknown_role_string_is_rejected_not_defaulted() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = token_for(&client, &server.base_url, "admin@fleetwise.example").await;

    let resp = client
        .post(format!("{}/users", server.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "email": "x@fleetwise.example",
            "display_name": "X",
            "role": "superuser",
            "password": "password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deactivated_user_loses_access_immediately() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let admin = token_for(&client, &server.base_url, "admin@fleetwise.example").await;

    let resp = client
        .post(format!("{}/users", server.base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "email": "temp@fleetwise.example",
            "display_name": "Temp Worker",
            "role": "driver",
            "password": "password",
        }))
        .send()
        .await
        .unwrap();
    let user_id = resp.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Sign them in while active, then deactivate.
    let temp = token_for(&client, &server.base_url, "temp@fleetwise.example").await;

    let resp = client
        .post(format!("{}/users/{}/deactivate", server.base_url, user_id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // The live token dies with the deactivation (polled: projection is
    // updated asynchronously), and a fresh sign-in is rejected too.
    for _ in 0..50 {
        let resp = client
            .get(format!("{}/vehicles", server.base_url))
            .bearer_auth(&temp)
            .send()
            .await
            .unwrap();
        if resp.status() == StatusCode::UNAUTHORIZED {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let resp = client
        .post(format!("{}/auth/sign-in", server.base_url))
        .json(&json!({ "email": "temp@fleetwise.example", "password": "password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn completed_maintenance_stamps_the_vehicle_and_notifies() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let manager = token_for(&client, &server.base_url, "manager@fleetwise.example").await;

    // Pick a seeded vehicle.
    let fleet = get_json_eventually(
        &client,
        &format!("{}/vehicles", server.base_url),
        &manager,
        |body| !body["vehicles"].as_array().unwrap().is_empty(),
    )
    .await;
    let vehicle = &fleet["vehicles"].as_array().unwrap()[0];
    let vehicle_id = vehicle["vehicle_id"].as_str().unwrap().to_string();
    assert!(vehicle["last_maintenance"].is_null());

    // Schedule, start, complete.
    let resp = client
        .post(format!("{}/maintenance", server.base_url))
        .bearer_auth(&manager)
        .json(&json!({
            "vehicle_id": vehicle_id,
            "kind": "preventive",
            "description": "Annual service",
            "scheduled_date": "2026-09-01T09:00:00Z",
            "estimated_cost": 18000,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order_id = resp.json::<serde_json::Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    for action in ["start", "complete"] {
        let resp = client
            .post(format!("{}/maintenance/{}/{}", server.base_url, order_id, action))
            .bearer_auth(&manager)
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT, "{action} failed");
    }

    // The completion reaction stamps the vehicle...
    get_json_eventually(
        &client,
        &format!("{}/vehicles/{}", server.base_url, vehicle_id),
        &manager,
        |body| !body["vehicle"]["last_maintenance"].is_null(),
    )
    .await;

    // ...and lands in the inbox.
    get_json_eventually(
        &client,
        &format!("{}/notifications?kind=maintenance", server.base_url),
        &manager,
        |body| {
            body["notifications"]
                .as_array()
                .unwrap()
                .iter()
                .any(|n| n["title"] == "Maintenance completed")
        },
    )
    .await;
}

#[tokio::test]
async fn driver_schedules_only_for_their_own_vehicle() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let driver_body = sign_in(&client, &server.base_url, "driver@fleetwise.example").await;
    let driver_id = driver_body["actor"]["id"].as_str().unwrap().to_string();
    let driver = driver_body["token"].as_str().unwrap().to_string();

    // Wait until the seeded driver assignment is visible too.
    let fleet = get_json_eventually(
        &client,
        &format!("{}/vehicles", server.base_url),
        &driver,
        |body| {
            let vehicles = body["vehicles"].as_array().unwrap();
            vehicles.len() >= 2
                && vehicles
                    .iter()
                    .any(|v| v["driver_id"] == serde_json::Value::String(driver_id.clone()))
        },
    )
    .await;
    let vehicles = fleet["vehicles"].as_array().unwrap();

    let own = vehicles
        .iter()
        .find(|v| v["driver_id"] == serde_json::Value::String(driver_id.clone()))
        .expect("seeded driver has a vehicle");
    let other = vehicles
        .iter()
        .find(|v| v["driver_id"].is_null())
        .expect("some vehicle without a driver");

    let schedule = |vehicle_id: String| {
        let client = client.clone();
        let url = format!("{}/maintenance", server.base_url);
        let driver = driver.clone();
        async move {
            client
                .post(url)
                .bearer_auth(&driver)
                .json(&json!({
                    "vehicle_id": vehicle_id,
                    "kind": "corrective",
                    "description": "Brakes feel soft",
                    "scheduled_date": "2026-09-10T09:00:00Z",
                }))
                .send()
                .await
                .unwrap()
        }
    };

    // Own vehicle: allowed (row-level rule).
    let resp = schedule(own["vehicle_id"].as_str().unwrap().to_string()).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Someone else's vehicle: forbidden.
    let resp = schedule(other["vehicle_id"].as_str().unwrap().to_string()).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn sign_out_is_idempotent_and_kills_the_session() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let token = token_for(&client, &server.base_url, "manager@fleetwise.example").await;

    for _ in 0..2 {
        let resp = client
            .post(format!("{}/auth/sign-out", server.base_url))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        // First call revokes; the middleware rejects the second before the
        // handler runs. Either way, no error state.
        assert!(
            resp.status() == StatusCode::NO_CONTENT || resp.status() == StatusCode::UNAUTHORIZED
        );
    }

    let resp = client
        .get(format!("{}/auth/me", server.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
