mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use common::{project_payload, TestApp};
use serde_json::json;

#[tokio::test]
async fn login_create_then_token_expires_after_seven_days() {
    let app = TestApp::new();
    app.register("admin", "admin@example.com").await;
    let token = app.login("admin").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/projects",
            Some(&token),
            Some(project_payload("Folio", "Completed")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["project"]["status"], "published");

    app.clock.advance(Duration::days(7) - Duration::seconds(1));
    let (status, _) = app
        .request(Method::POST, "/api/projects", Some(&token), Some(project_payload("Second", "Draft")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    app.clock.advance(Duration::seconds(1));
    let (status, body) = app
        .request(Method::POST, "/api/projects", Some(&token), Some(project_payload("Third", "Draft")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token is not valid");
}

#[tokio::test]
async fn short_title_yields_exactly_one_violation() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let (status, body) = app
        .request(Method::POST, "/api/projects", Some(&token), Some(json!({ "title": "ab" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["field"], "title");
}

#[tokio::test]
async fn unauthenticated_writes_are_rejected_before_validation() {
    let app = TestApp::new();

    let (status, body) = app
        .request(Method::POST, "/api/projects", None, Some(json!({ "title": "ab" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("errors").is_none());

    let (status, _) = app
        .request(Method::DELETE, "/api/projects/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn creation_requires_title_and_description() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/projects",
            Some(&token),
            Some(json!({ "technologies": ["rust"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title", "description"]);
}

#[tokio::test]
async fn invalid_links_are_all_reported() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    let mut payload = project_payload("Folio", "Completed");
    payload["githubUrl"] = json!("github.com/folio");
    payload["liveUrl"] = json!("not a url");
    payload["technologies"] = json!([]);

    let (status, body) = app
        .request(Method::POST, "/api/projects", Some(&token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn only_published_projects_are_public() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let published = app.create_project(&token, project_payload("Shipped", "Completed")).await;
    let draft = app.create_project(&token, project_payload("Underway", "In Progress")).await;

    let (status, body) = app.get("/api/projects").await;
    assert_eq!(status, StatusCode::OK);
    let projects = body["data"]["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["id"], published.as_str());
    assert_eq!(body["data"]["pagination"]["totalProjects"], 1);

    let (status, body) = app.get(&format!("/api/projects/{}", published)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["project"]["title"], "Shipped");
    assert_eq!(body["data"]["project"]["githubUrl"], "https://github.com/folio/example");

    let (status, _) = app.get(&format!("/api/projects/{}", draft)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/projects/not-a-uuid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Project not found");
}

#[tokio::test]
async fn listing_orders_filters_and_paginates() {
    let app = TestApp::new();
    let token = app.admin_token().await;

    for (title, order, featured) in [("Gamma", 3, false), ("Alpha", 1, true), ("Beta", 2, true)] {
        let mut payload = project_payload(title, "Published");
        payload["order"] = json!(order);
        payload["featured"] = json!(featured);
        app.create_project(&token, payload).await;
    }

    let (_, body) = app.get("/api/projects?limit=2&page=1").await;
    let titles: Vec<&str> = body["data"]["projects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Alpha", "Beta"]);
    let pagination = &body["data"]["pagination"];
    assert_eq!(pagination["currentPage"], 1);
    assert_eq!(pagination["totalPages"], 2);
    assert_eq!(pagination["hasNext"], true);
    assert_eq!(pagination["hasPrev"], false);

    let (_, body) = app.get("/api/projects?limit=2&page=2").await;
    assert_eq!(body["data"]["projects"][0]["title"], "Gamma");
    assert_eq!(body["data"]["pagination"]["hasPrev"], true);

    let (_, body) = app.get("/api/projects?featured=true").await;
    assert_eq!(body["data"]["pagination"]["totalProjects"], 2);
}

#[tokio::test]
async fn update_is_partial_and_404s_when_missing() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_project(&token, project_payload("Folio", "Completed")).await;

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/projects/{}", id),
            Some(&token),
            Some(json!({ "title": "Folio v2", "githubUrl": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let project = &body["data"]["project"];
    assert_eq!(project["title"], "Folio v2");
    assert_eq!(project["description"], "A project long enough to describe");
    assert_eq!(project["githubUrl"], "https://github.com/folio/example");
    assert_eq!(project["status"], "published");

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/projects/{}", id),
            Some(&token),
            Some(json!({ "title": "ab" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/projects/{}", missing),
            Some(&token),
            Some(json!({ "title": "Ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_then_404() {
    let app = TestApp::new();
    let token = app.admin_token().await;
    let id = app.create_project(&token, project_payload("Folio", "Completed")).await;
    let uri = format!("/api/projects/{}", id);

    let (status, body) = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, _) = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
