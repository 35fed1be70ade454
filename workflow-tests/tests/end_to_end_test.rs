//! Full client workflows against mock native, VMS and portal backends.

mod common;

use chrono::{Duration, Utc};
use common::{TestEnv, GUARD_EMAIL, GUARD_PASSWORD, PORTAL_PASSWORD, PORTAL_USER, VMS_TOKEN};
use gatehouse_client::models::{NewInvitation, NewPassageLog, NewVisitor};
use gatehouse_core::ErrorKind;
use serde_json::json;

#[tokio::test]
async fn password_login_then_visitor_registration() {
    let env = TestEnv::spawn().await;
    let app = env.client().await;

    // Nothing is readable before login
    let err = app.areas.all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    let guard = app
        .session()
        .login_with_password(GUARD_EMAIL, GUARD_PASSWORD)
        .await
        .unwrap();
    assert_eq!(guard.display_name, "Malee Srisuk");

    let visitor = app
        .visitors
        .create_visitor(&NewVisitor {
            first_name: "Somchai".to_string(),
            last_name: "Jaidee".to_string(),
            phone: Some("081-234-5678".to_string()),
            authorized_area: vec!["a1".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    let found = app.visitors.search("somchai", 1, 30).await.unwrap();
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].meta.id, visitor.meta.id);

    app.passages
        .record_passage(&NewPassageLog {
            visitor: visitor.meta.id.clone(),
            passage_type: "entry".to_string(),
            location_area: "a1".to_string(),
            verification_method: "manual".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let summary = app.dashboard().summary(Utc::now()).await.unwrap();
    assert_eq!(summary.areas, 2);
    assert_eq!(summary.visitors, 1);
    assert_eq!(summary.passages_today.entries, 1);
    assert_eq!(summary.visitors_inside, 1);

    // Every native request carried the raw session token
    assert!(env
        .native
        .requests()
        .iter()
        .filter(|r| r.path.contains("/records"))
        .skip(1)
        .all(|r| r.authorization.as_deref() == Some("native-tok")));
}

#[tokio::test]
async fn authorized_areas_of_logged_in_guard() {
    let env = TestEnv::spawn().await;
    env.native.seed("users", vec![json!({"id": "u1", "role": "guard", "authorized_area": ["a1"]})]);
    let app = env.client().await;
    app.session().login_with_password(GUARD_EMAIL, GUARD_PASSWORD).await.unwrap();

    let user = app.users.get("u1").await.unwrap();
    let areas = app.users.authorized_areas(&user).await.unwrap();

    assert_eq!(areas.len(), 1);
    assert_eq!(areas[0].name, "North gate");
}

#[tokio::test]
async fn federated_connect_routes_requests_to_vms() {
    let env = TestEnv::spawn().await;
    env.vms.seed("visitor", vec![json!({"id": "v9", "first_name": "Ann", "last_name": "Lee"})]);
    let app = env.client().await;

    let principal = app.federation().connect(PORTAL_USER, PORTAL_PASSWORD).await.unwrap();
    assert_eq!(principal.id, "external-P1");
    assert_eq!(principal.role, "guard");
    assert!(app.switcher().is_external());

    let visitors = app.visitors.list(1, 30).await.unwrap();
    assert_eq!(visitors.items.len(), 1);

    let request = env.vms.requests().pop().unwrap();
    assert_eq!(request.authorization.as_deref(), Some(VMS_TOKEN));
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    assert!(env.native.requests().is_empty());

    // Portal saw a bearer token on my-project
    let project_call = env
        .portal
        .requests()
        .into_iter()
        .find(|r| r.path == "/my-project")
        .unwrap();
    assert!(project_call.authorization.unwrap().starts_with("Bearer portal-"));

    app.switcher().switch_to_default().await;
    assert!(!app.switcher().is_external());
    assert!(app.switcher().identity().is_none());
}

#[tokio::test]
async fn failed_connect_stays_in_default_mode() {
    let env = TestEnv::spawn().await;
    let app = env.client().await;

    let err = app.federation().connect(PORTAL_USER, "wrong").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!app.switcher().is_external());
    assert!(env.vms.requests().is_empty());
}

#[tokio::test]
async fn external_session_survives_restart() {
    let env = TestEnv::spawn().await;
    {
        let app = env.client().await;
        app.federation().connect(PORTAL_USER, PORTAL_PASSWORD).await.unwrap();
    }

    let on_disk = std::fs::read_to_string(env.storage_path().join("session.json")).unwrap();
    assert!(!on_disk.contains(VMS_TOKEN));

    let restarted = env.client().await;
    assert!(restarted.switcher().is_external());
    assert_eq!(restarted.switcher().snapshot().base_url, env.vms.address);

    let start = Utc::now();
    let invitation = restarted
        .invitations
        .create(&NewInvitation {
            visitor_name: "Courier".to_string(),
            house: "h1".to_string(),
            issuer: None,
            authorized_area: vec![],
            start_time: start,
            end_time: start + Duration::hours(2),
            active: true,
            note: None,
        })
        .await
        .unwrap();
    assert_eq!(env.vms.records("invitation").len(), 1);

    let deactivated = restarted.invitations.deactivate(&invitation.meta.id).await.unwrap();
    assert!(!deactivated.active);
}

#[tokio::test]
async fn revoked_vms_token_resets_to_default() {
    let env = TestEnv::spawn().await;
    let app = env.client().await;
    app.federation().connect(PORTAL_USER, PORTAL_PASSWORD).await.unwrap();

    env.vms.revoke_token(VMS_TOKEN);
    let err = app.vehicles.all().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!app.switcher().is_external());

    // The reset is persisted too
    let restarted = env.client().await;
    assert!(!restarted.switcher().is_external());
}
