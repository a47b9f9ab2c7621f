use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use log::error;
use serde::{Deserialize, Serialize};

use crate::domain::{model::StartAppParams, port::SchedulerError, AppRunner, AppRunnerError};

#[derive(Debug, Serialize, Deserialize)]
pub struct ScaleRequest {
    pub instances: u32,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatus {
    pub name: String,
    pub exists: bool,
    pub running_instances: usize,
}

pub fn router(app_runner: AppRunner) -> Router {
    Router::new()
        .route("/apps", post(start_app))
        .route("/apps/:app_name", get(app_status).delete(remove_app))
        .route("/apps/:app_name/instances", put(scale_app))
        .with_state(Arc::new(app_runner))
}

fn failure(operation: &str, e: AppRunnerError) -> (StatusCode, String) {
    error!("Error during {} {:?}", operation, e);
    let status = match e {
        AppRunnerError::AlreadyExists(_) => StatusCode::CONFLICT,
        AppRunnerError::NotStarted(_) => StatusCode::NOT_FOUND,
        AppRunnerError::Scheduler(SchedulerError::Unauthorized) => StatusCode::UNAUTHORIZED,
        AppRunnerError::Scheduler(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

async fn start_app(
    State(app_runner): State<Arc<AppRunner>>,
    Json(payload): Json<StartAppParams>,
) -> Result<(StatusCode, &'static str), (StatusCode, String)> {
    if payload.name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "App name is required".to_string()));
    }
    app_runner
        .start_app(payload)
        .await
        .map(|_| (StatusCode::CREATED, "App started"))
        .map_err(|e| failure("start_app", e))
}

async fn scale_app(
    State(app_runner): State<Arc<AppRunner>>,
    Path(app_name): Path<String>,
    Json(payload): Json<ScaleRequest>,
) -> impl IntoResponse {
    app_runner
        .scale_app(&app_name, payload.instances)
        .await
        .map(|_| (StatusCode::OK, "App scaled"))
        .map_err(|e| failure("scale_app", e))
}

async fn remove_app(
    State(app_runner): State<Arc<AppRunner>>,
    Path(app_name): Path<String>,
) -> impl IntoResponse {
    app_runner
        .remove_app(&app_name)
        .await
        .map(|_| (StatusCode::OK, "App removed"))
        .map_err(|e| failure("remove_app", e))
}

async fn app_status(
    State(app_runner): State<Arc<AppRunner>>,
    Path(app_name): Path<String>,
) -> Result<Json<AppStatus>, (StatusCode, String)> {
    let exists = app_runner
        .app_exists(&app_name)
        .await
        .map_err(|e| failure("app_status", e))?;
    let running_instances = app_runner
        .count_running_instances(&app_name)
        .await
        .map_err(|e| failure("app_status", e))?;
    Ok(Json(AppStatus {
        name: app_name,
        exists,
        running_instances,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use reqwest::{Client, StatusCode};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::{router, AppStatus};
    use crate::domain::{
        fake::{Call, FakeSchedulerClient},
        model::ActualLrpState,
        port::SchedulerError,
        AppRunner, AppRunnerSettings,
    };

    async fn serve(fake: &Arc<FakeSchedulerClient>) -> String {
        let app_runner = AppRunner::new(
            Box::new(fake.clone()),
            AppRunnerSettings {
                domain: "mylattice.com".to_string(),
                health_probe_url: "http://files/spy.tgz".to_string(),
                health_probe_dir: "/tmp".to_string(),
            },
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(app_runner)).await.unwrap();
        });
        format!("http://{}", address)
    }

    fn start_body(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "start_command": "/start",
            "docker_image_path": "docker:///runtest/runner",
            "environment_variables": { "FOO": "bar" },
            "instances": 1,
            "memory_mb": 128,
            "disk_mb": 1024,
            "port": 8080
        })
    }

    #[tokio::test]
    async fn post_starts_an_app() {
        let fake = Arc::new(FakeSchedulerClient::default());
        let url = serve(&fake).await;

        let response = Client::new()
            .post(format!("{}/apps", url))
            .json(&start_body("americano-app"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let desired = fake.desired_named("americano-app");
        assert_eq!(desired.len(), 1);
        assert_eq!(desired[0].routes, vec!["americano-app.mylattice.com".to_string()]);
    }

    #[tokio::test]
    async fn post_conflicts_on_existing_app() {
        let fake = Arc::new(FakeSchedulerClient::with_desired(&["americano-app"]));
        let url = serve(&fake).await;

        let response = Client::new()
            .post(format!("{}/apps", url))
            .json(&start_body("americano-app"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn post_rejects_an_empty_name() {
        let fake = Arc::new(FakeSchedulerClient::default());
        let url = serve(&fake).await;

        let response = Client::new()
            .post(format!("{}/apps", url))
            .json(&start_body(""))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn put_scales_a_started_app() {
        let fake = Arc::new(FakeSchedulerClient::with_desired(&["americano-app"]));
        let url = serve(&fake).await;

        let response = Client::new()
            .put(format!("{}/apps/americano-app/instances", url))
            .json(&json!({ "instances": 4 }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(matches!(
            fake.calls().as_slice(),
            [Call::Update(name, update)] if name == "americano-app" && update.instances == Some(4)
        ));
    }

    #[tokio::test]
    async fn delete_of_unknown_app_is_not_found() {
        let fake = Arc::new(FakeSchedulerClient::default());
        let url = serve(&fake).await;

        let response = Client::new()
            .delete(format!("{}/apps/americano-app", url))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.text().await.unwrap(),
            "App americano-app not started"
        );
    }

    #[tokio::test]
    async fn get_reports_actual_state() {
        let fake = Arc::new(FakeSchedulerClient::default());
        fake.add_actual("americano-app", ActualLrpState::Running);
        fake.add_actual("americano-app", ActualLrpState::Crashed);
        let url = serve(&fake).await;

        let status: AppStatus = Client::new()
            .get(format!("{}/apps/americano-app", url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(
            status,
            AppStatus {
                name: "americano-app".to_string(),
                exists: true,
                running_instances: 1,
            }
        );
    }

    #[tokio::test]
    async fn scheduler_failures_map_to_gateway_errors() {
        let fake = Arc::new(FakeSchedulerClient::default());
        fake.fail_next_query(SchedulerError::InvalidResponse("truncated".to_string()));
        let url = serve(&fake).await;

        let response = Client::new()
            .get(format!("{}/apps/americano-app", url))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn unauthorized_scheduler_maps_to_unauthorized() {
        let fake = Arc::new(FakeSchedulerClient::with_desired(&["americano-app"]));
        fake.fail_next_query(SchedulerError::Unauthorized);
        let url = serve(&fake).await;

        let response = Client::new()
            .delete(format!("{}/apps/americano-app", url))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
