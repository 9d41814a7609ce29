pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::call::handlers as calls;
use crate::generation::handlers as generation;
use crate::pages::{guards, views};
use crate::session::handlers as auth;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let protected_pages = Router::new()
        .route("/", get(views::home))
        .route("/interview", get(views::generate))
        .route("/interview/:id", get(views::interview_detail))
        .route("/interview/:id/feedback", get(views::interview_feedback))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guards::require_user,
        ));

    let auth_pages = Router::new()
        .route("/sign-in", get(views::sign_in_page))
        .route("/sign-up", get(views::sign_up_page))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guards::redirect_signed_in,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        // Generation API
        .route(
            "/api/vapi/generate",
            get(generation::handle_generate_health).post(generation::handle_generate),
        )
        .route("/api/feedback", post(generation::handle_create_feedback))
        // Auth API
        .route("/api/auth/sign-up", post(auth::handle_sign_up))
        .route("/api/auth/sign-in", post(auth::handle_sign_in))
        .route("/api/auth/me", get(auth::handle_me))
        .route("/api/auth/sign-out", post(auth::handle_sign_out))
        // Call relay
        .route("/api/calls", post(calls::handle_start_call))
        .route("/api/calls/:id", get(calls::handle_get_call))
        .route("/api/calls/:id/events", post(calls::handle_call_event))
        .route("/api/calls/:id/stop", post(calls::handle_stop_call))
        .merge(protected_pages)
        .merge(auth_pages)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, HeaderMap, Request, StatusCode};
    use chrono::Utc;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::call::CallRegistry;
    use crate::config::{Config, StoreBackend};
    use crate::generation::feedback::fixtures::assessment_json;
    use crate::generation::feedback::GeneratorFeedbackSink;
    use crate::llm_client::testing::ScriptedGenerator;
    use crate::models::feedback::NewFeedback;
    use crate::models::interview::NewInterview;
    use crate::models::user::User;
    use crate::session::identity::{IdentityProvider, JwtIdentityProvider};
    use crate::session::{SessionStore, SESSION_COOKIE};
    use crate::store::{MemoryStore, Store};

    const ID_SECRET: &str = "id-token-secret";
    const SESSION_SECRET: &str = "session-secret";

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
        idp: Arc<JwtIdentityProvider>,
        llm: Arc<ScriptedGenerator>,
    }

    fn test_app(llm: ScriptedGenerator) -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let idp = Arc::new(JwtIdentityProvider::new(ID_SECRET, SESSION_SECRET));
        let llm = Arc::new(llm);
        let config = Config {
            store_backend: StoreBackend::Memory,
            database_url: None,
            anthropic_api_key: "test-key".to_string(),
            identity_token_secret: ID_SECRET.to_string(),
            session_secret: SESSION_SECRET.to_string(),
            voice_workflow_assistant_id: "wf-1".to_string(),
            production: false,
            port: 0,
            rust_log: "info".to_string(),
        };

        let state = AppState {
            store: store.clone(),
            llm: llm.clone(),
            sessions: SessionStore::new(idp.clone(), store.clone(), config.production),
            calls: CallRegistry::new(
                Arc::new(GeneratorFeedbackSink::new(store.clone(), llm.clone())),
                idp.clone(),
                config.voice_workflow_assistant_id.clone(),
            ),
        };

        TestApp {
            router: build_router(state),
            store,
            idp,
            llm,
        }
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    fn json_request(method: &str, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn generate_body() -> Value {
        json!({
            "interviewType": "technical",
            "jobRole": "backend engineer",
            "experienceLevel": "mid",
            "techStack": "Go,Postgres",
            "questionCount": 5,
            "userId": "someone-else"
        })
    }

    fn five_questions() -> &'static str {
        r#"["Why Go?", "What is a goroutine?", "Explain MVCC.", "How do indexes work?", "Describe a deploy."]"#
    }

    /// Creates the user record and returns a `Cookie` header value for it.
    async fn signed_in(app: &TestApp, uid: &str) -> String {
        app.store
            .insert_user(&User {
                id: uid.to_string(),
                name: "Ada".to_string(),
                email: format!("{uid}@example.com"),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let id_token = app.idp.issue_id_token(uid, &format!("{uid}@example.com"), 0);
        let (session, _) = app
            .idp
            .create_session(&id_token, chrono::Duration::days(7))
            .await
            .unwrap();
        format!("{SESSION_COOKIE}={session}")
    }

    async fn seed_interview(app: &TestApp, owner: &str) -> uuid::Uuid {
        app.store
            .insert_interview(NewInterview {
                user_id: owner.to_string(),
                interview_type: "technical".into(),
                job_role: "backend engineer".into(),
                experience_level: "mid".into(),
                tech_stack: vec!["Go".into()],
                question_count: 1,
                questions: vec!["Why Go?".into()],
                cover_image_url: "/covers/adobe.png".into(),
                finalized: true,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_health_checks_are_idempotent() {
        let app = test_app(ScriptedGenerator::default());

        let (status, _, first) = send(&app, get_request("/health")).await;
        let (_, _, second) = send(&app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first, second);
        assert_eq!(first["service"], "mockview-api");

        let (status, _, body) = send(&app, get_request("/api/vapi/generate")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Interview Generation API is operational!");

        let (_, _, again) = send(&app, get_request("/api/vapi/generate")).await;
        assert_eq!(again["message"], body["message"]);
        let first =
            chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).unwrap();
        let second =
            chrono::DateTime::parse_from_rfc3339(again["timestamp"].as_str().unwrap()).unwrap();
        assert!(second >= first);
        assert_eq!(app.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_stores_finalized_interview_for_token_owner() {
        let app = test_app(ScriptedGenerator::with_outputs([five_questions()]));
        let token = app.idp.issue_id_token("u1", "u1@example.com", 0);
        let body = generate_body();

        let request = json_request("POST", "/api/vapi/generate")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, response) = send(&app, request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response["success"], true);
        let id: uuid::Uuid = response["interviewId"].as_str().unwrap().parse().unwrap();

        let stored = app.store.interview_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, "u1");
        assert_eq!(stored.tech_stack, vec!["Go", "Postgres"]);
        assert_eq!(stored.questions.len(), 5);
        assert!(stored.finalized);
        assert!(stored.questions.iter().all(|q| !q.contains('/') && !q.contains('*')));
    }

    #[tokio::test]
    async fn test_generate_reports_missing_job_role() {
        let app = test_app(ScriptedGenerator::with_outputs([five_questions()]));
        let token = app.idp.issue_id_token("u1", "u1@example.com", 0);
        let mut body = generate_body();
        body.as_object_mut().unwrap().remove("jobRole");

        let request = json_request("POST", "/api/vapi/generate")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, response) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], false);
        assert_eq!(response["missingFields"], json!(["jobRole"]));
        assert_eq!(app.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_rejects_invalid_json() {
        let app = test_app(ScriptedGenerator::default());
        let token = app.idp.issue_id_token("u1", "u1@example.com", 0);

        let request = Request::builder()
            .method("POST")
            .uri("/api/vapi/generate")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, response) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "Invalid JSON in request body!");
    }

    #[tokio::test]
    async fn test_generate_requires_verified_credential() {
        let app = test_app(ScriptedGenerator::with_outputs([five_questions()]));
        let body = generate_body();

        let request = json_request("POST", "/api/vapi/generate")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let forged = JwtIdentityProvider::new("wrong-secret", SESSION_SECRET)
            .issue_id_token("u1", "u1@example.com", 0);
        let request = json_request("POST", "/api/vapi/generate")
            .header(header::AUTHORIZATION, format!("Bearer {forged}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, response) = send(&app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response["code"], "FORBIDDEN");
        assert_eq!(app.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_questions_are_422() {
        let app = test_app(ScriptedGenerator::with_outputs(["Here are some questions!"]));
        let token = app.idp.issue_id_token("u1", "u1@example.com", 0);
        let body = generate_body();

        let request = json_request("POST", "/api/vapi/generate")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, response) = send(&app, request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response["code"], "PARSE_ERROR");
        assert!(app.store.interviews_by_owner("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in_sets_session_cookie() {
        let app = test_app(ScriptedGenerator::default());
        let id_token = app.idp.issue_id_token("u9", "grace@example.com", 0);

        let body = json!({"idToken": id_token, "name": "Grace"});
        let request = json_request("POST", "/api/auth/sign-up")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);

        let body = json!({"email": "grace@example.com", "idToken": id_token});
        let request = json_request("POST", "/api/auth/sign-in")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, headers, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("session="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Max-Age=604800"));

        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let request = Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (_, _, me) = send(&app, request).await;
        assert_eq!(me["user"]["id"], "u9");
        assert_eq!(me["user"]["name"], "Grace");
    }

    #[tokio::test]
    async fn test_sign_in_with_unknown_email_is_not_found() {
        let app = test_app(ScriptedGenerator::default());
        let id_token = app.idp.issue_id_token("u9", "nobody@example.com", 0);
        let body = json!({"email": "nobody@example.com", "idToken": id_token});
        let request = json_request("POST", "/api/auth/sign-in")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, headers, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(headers.get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_sign_out_cascades_and_clears_cookie() {
        let app = test_app(ScriptedGenerator::default());
        let cookie = signed_in(&app, "u1").await;
        let interview_id = seed_interview(&app, "u1").await;
        app.store
            .upsert_feedback(NewFeedback {
                interview_id,
                user_id: "u1".into(),
                total_score: 70,
                categories: vec![],
                strengths: vec![],
                areas_for_improvement: vec![],
                final_assessment: "ok".into(),
            })
            .await
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/sign-out")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let (status, headers, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"]["interviewsDeleted"], 1);
        assert_eq!(body["deleted"]["feedbackDeleted"], 1);
        let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("session="));
        assert!(set_cookie.contains("Max-Age=0"));

        assert!(app.store.find_user("u1").await.unwrap().is_none());
        assert!(app.store.interview_by_id(interview_id).await.unwrap().is_none());

        // The old cookie still verifies, but the user is gone.
        let request = Request::builder()
            .uri("/api/auth/me")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let (_, _, me) = send(&app, request).await;
        assert_eq!(me["user"], Value::Null);
    }

    #[tokio::test]
    async fn test_page_guards_redirect_with_see_other() {
        let app = test_app(ScriptedGenerator::default());

        let (status, headers, _) = send(&app, get_request("/")).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/sign-in");

        let (status, _, body) = send(&app, get_request("/sign-in")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["form"], "sign-in");

        let cookie = signed_in(&app, "u1").await;
        let request = Request::builder()
            .uri("/sign-up")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers[header::LOCATION], "/");
    }

    #[tokio::test]
    async fn test_unknown_interview_page_redirects_home() {
        let app = test_app(ScriptedGenerator::default());
        let cookie = signed_in(&app, "u1").await;

        for uri in [
            format!("/interview/{}", uuid::Uuid::new_v4()),
            "/interview/not-a-uuid/feedback".to_string(),
        ] {
            let request = Request::builder()
                .uri(uri)
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap();
            let (status, headers, _) = send(&app, request).await;
            assert_eq!(status, StatusCode::SEE_OTHER);
            assert_eq!(headers[header::LOCATION], "/");
        }
    }

    #[tokio::test]
    async fn test_home_lists_own_and_other_interviews() {
        let app = test_app(ScriptedGenerator::default());
        let cookie = signed_in(&app, "u1").await;
        seed_interview(&app, "u1").await;
        seed_interview(&app, "u2").await;

        let request = Request::builder()
            .uri("/")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userInterviews"].as_array().unwrap().len(), 1);
        assert_eq!(body["userInterviews"][0]["isSelfGenerated"], true);
        assert_eq!(body["userInterviews"][0]["score"], "N/A");
        assert_eq!(body["latestInterviews"].as_array().unwrap().len(), 1);
        assert_eq!(body["latestInterviews"][0]["isSelfGenerated"], false);
    }

    #[tokio::test]
    async fn test_feedback_endpoint_scores_and_page_shows_verdict() {
        let app = test_app(ScriptedGenerator::with_outputs([assessment_json(
            85,
            [80, 90, 85, 82, 88],
        )]));
        let cookie = signed_in(&app, "u1").await;
        let interview_id = seed_interview(&app, "u1").await;

        let body = json!({
            "interviewId": interview_id,
            "transcript": [
                {"role": "assistant", "content": "Why Go?"},
                {"role": "user", "content": "Simple concurrency."}
            ]
        });
        let request = json_request("POST", "/api/feedback")
            .header(header::COOKIE, &cookie)
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, response) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response["success"], true);
        assert!(response["feedbackId"].is_string());

        let request = Request::builder()
            .uri(format!("/interview/{interview_id}/feedback"))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let (status, _, page) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["feedback"]["totalScore"], 85);
        assert_eq!(page["verdict"]["text"], "definitely recommended");
    }

    #[tokio::test]
    async fn test_empty_transcript_feedback_is_invalid_input() {
        let app = test_app(ScriptedGenerator::default());
        let cookie = signed_in(&app, "u1").await;
        let interview_id = seed_interview(&app, "u1").await;

        let body = json!({"interviewId": interview_id, "transcript": []});
        let request = json_request("POST", "/api/feedback")
            .header(header::COOKIE, &cookie)
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, response) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], false);
        assert_eq!(response["error"]["code"], "INVALID_INPUT");
        assert!(app.store.feedback_for(interview_id, "u1").await.unwrap().is_none());
        assert_eq!(app.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_feedback_without_interview_id_is_invalid_input() {
        let app = test_app(ScriptedGenerator::default());
        let cookie = signed_in(&app, "u1").await;

        for body in [
            json!({"transcript": [{"role": "user", "content": "Hi"}]}),
            json!({"interviewId": "not-a-uuid", "transcript": [{"role": "user", "content": "Hi"}]}),
        ] {
            let request = json_request("POST", "/api/feedback")
                .header(header::COOKIE, &cookie)
                .body(Body::from(body.to_string()))
                .unwrap();
            let (status, _, response) = send(&app, request).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["success"], false);
            assert_eq!(response["error"]["code"], "INVALID_INPUT");
        }
        assert_eq!(app.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_call_credential_creates_interview() {
        let app = test_app(ScriptedGenerator::with_outputs([five_questions()]));
        let cookie = signed_in(&app, "u1").await;

        let request = json_request("POST", "/api/calls")
            .header(header::COOKIE, &cookie)
            .body(Body::from(json!({"mode": "generate"}).to_string()))
            .unwrap();
        let (status, _, started) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        let token = started["assistant"]["variableValues"]["authToken"]
            .as_str()
            .unwrap()
            .to_string();

        // The workflow calls back with the call credential, not a cookie.
        let request = json_request("POST", "/api/vapi/generate")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(generate_body().to_string()))
            .unwrap();
        let (status, _, response) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);

        let id: uuid::Uuid = response["interviewId"].as_str().unwrap().parse().unwrap();
        let stored = app.store.interview_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.user_id, "u1");
    }

    #[tokio::test]
    async fn test_call_relay_round_trip() {
        let app = test_app(ScriptedGenerator::default());
        let cookie = signed_in(&app, "u1").await;

        let body = json!({"mode": "generate"});
        let request = json_request("POST", "/api/calls")
            .header(header::COOKIE, &cookie)
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, started) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(started["status"], "CONNECTING");
        assert_eq!(started["assistant"]["assistant"]["id"], "wf-1");
        assert_eq!(started["assistant"]["variableValues"]["userId"], "u1");
        let call_id = started["callId"].as_str().unwrap().to_string();

        let event = json!({"type": "call-start"});
        let request = json_request("POST", &format!("/api/calls/{call_id}/events"))
            .header(header::COOKIE, &cookie)
            .body(Body::from(event.to_string()))
            .unwrap();
        let (status, _, state) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["status"], "ACTIVE");

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/calls/{call_id}/stop"))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let (_, _, state) = send(&app, request).await;
        assert_eq!(state["status"], "FINISHED");
        assert_eq!(state["stopRequested"], true);
    }

    #[tokio::test]
    async fn test_api_routes_reject_anonymous_callers() {
        let app = test_app(ScriptedGenerator::default());
        let body = json!({"mode": "generate"});
        let request = json_request("POST", "/api/calls")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _, response) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(response["success"], false);
    }
}
