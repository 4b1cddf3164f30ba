use axum::http::{HeaderValue, StatusCode};
use tower::ServiceExt;

use crate::accounts::change_email::{EMAIL_IN_USE, SAME_DEVICE_REQUIRED};
use crate::accounts::{MailError, VerificationKind};
use crate::testing::{
    email, get, location, portal_state, post_form, read_body, seed_user, session_cookie,
    set_cookies, MemoryMailer, MemoryStore,
};
use crate::web::portal_router;

fn cookie_header(pairs: &[String]) -> HeaderValue {
    HeaderValue::from_str(&pairs.join("; ")).expect("cookie header")
}

#[tokio::test]
async fn change_email_requires_login() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();
    let router = portal_router(portal_state(&store, &mailer));

    let response = router
        .oneshot(get("/settings/profile/change-email", None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "/login?redirect_to=%2Fsettings%2Fprofile%2Fchange-email"
    );
}

#[tokio::test]
async fn unverified_users_are_sent_to_login() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();
    let user = seed_user(&store, "kelly@example.com", false);
    let cookie = session_cookie(&user);

    let response = portal_router(portal_state(&store, &mailer))
        .oneshot(post_form(
            "/settings/profile/change-email",
            "email=new%40example.com",
            Some(&cookie),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/login"));
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn change_email_renders_field_errors() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();
    let user = seed_user(&store, "kelly@example.com", true);
    seed_user(&store, "taken@example.com", true);
    let cookie = session_cookie(&user);

    let response = portal_router(portal_state(&store, &mailer))
        .oneshot(post_form(
            "/settings/profile/change-email",
            "email=taken%40example.com",
            Some(&cookie),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_body(response).await;
    assert!(body.contains("id=\"email-errors\""));
    assert!(body.contains(&crate::html::escape(EMAIL_IN_USE)));
    assert!(body.contains("value=\"taken@example.com\""));
}

#[tokio::test]
async fn change_email_transport_failure_is_server_error_with_message() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::failing(MailError::Transport("connection refused".to_string()));
    let user = seed_user(&store, "kelly@example.com", true);
    let cookie = session_cookie(&user);

    let response = portal_router(portal_state(&store, &mailer))
        .oneshot(post_form(
            "/settings/profile/change-email",
            "email=new%40example.com",
            Some(&cookie),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(&response).is_empty());
    let body = read_body(response).await;
    assert!(body.contains("connection refused"));
}

#[tokio::test]
async fn change_email_flow_updates_address() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();
    let user = seed_user(&store, "kelly@example.com", true);
    let session = session_cookie(&user);
    let router = portal_router(portal_state(&store, &mailer));

    let response = router
        .clone()
        .oneshot(post_form(
            "/settings/profile/change-email",
            "email=Kelly.New%40example.com",
            Some(&session),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        format!("/verify?type=change-email&target={}", user.id)
    );
    let pending = set_cookies(&response)
        .into_iter()
        .find(|cookie| cookie.starts_with("hs_verification="))
        .expect("pending email cookie");

    let code = mailer.last_code().expect("code mailed");
    assert_eq!(mailer.sent()[0].to, email("kelly.new@example.com"));

    let session_pair = session.to_str().expect("ascii").to_string();
    let cookies = cookie_header(&[session_pair, pending]);
    let response = router
        .oneshot(post_form(
            "/verify",
            &format!("type=change-email&target={}&code={code}", user.id),
            Some(&cookies),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/settings/profile");
    assert!(set_cookies(&response)
        .iter()
        .any(|cookie| cookie == "hs_verification="));
    assert_eq!(
        store.user(&user.id).expect("user").email,
        email("kelly.new@example.com")
    );
    assert_eq!(
        mailer.sent().last().expect("notice").to,
        email("kelly@example.com")
    );
}

#[tokio::test]
async fn change_email_code_from_another_device_is_rejected() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();
    let user = seed_user(&store, "kelly@example.com", true);
    let session = session_cookie(&user);
    let router = portal_router(portal_state(&store, &mailer));

    router
        .clone()
        .oneshot(post_form(
            "/settings/profile/change-email",
            "email=new%40example.com",
            Some(&session),
        ))
        .await
        .expect("route executes");
    let code = mailer.last_code().expect("code mailed");

    let response = router
        .oneshot(get(
            &format!("/verify?type=change-email&target={}&code={code}", user.id),
            Some(&session),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_body(response).await;
    assert!(body.contains(&crate::html::escape(SAME_DEVICE_REQUIRED)));
    assert_eq!(
        store.user(&user.id).expect("user").email,
        email("kelly@example.com")
    );
}

#[tokio::test]
async fn login_flow_sets_session_and_honours_redirect() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();
    seed_user(&store, "kelly@example.com", false);
    let router = portal_router(portal_state(&store, &mailer));

    let response = router
        .clone()
        .oneshot(post_form(
            "/login",
            "email=kelly%40example.com&redirect_to=%2Fsettings%2Fprofile",
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let verify_location = location(&response).to_string();
    assert!(verify_location.starts_with("/verify?type=login"));

    let form_page = router
        .clone()
        .oneshot(get(&verify_location, None))
        .await
        .expect("route executes");
    assert_eq!(form_page.status(), StatusCode::OK);
    let body = read_body(form_page).await;
    assert!(body.contains("name=\"redirect_to\" value=\"/settings/profile\""));

    let code = mailer.last_code().expect("code mailed");
    let response = router
        .clone()
        .oneshot(post_form(
            "/verify",
            &format!(
                "type=login&target=kelly%40example.com&code={code}&redirect_to=%2Fsettings%2Fprofile"
            ),
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/settings/profile");
    let session = set_cookies(&response)
        .into_iter()
        .find(|cookie| cookie.starts_with("hs_session="))
        .expect("session cookie");
    assert!(store
        .verification(VerificationKind::Login, "kelly@example.com")
        .is_none());

    let profile = router
        .oneshot(get("/settings/profile", Some(&cookie_header(&[session]))))
        .await
        .expect("route executes");
    assert_eq!(profile.status(), StatusCode::OK);
    assert!(read_body(profile).await.contains("kelly@example.com"));
}

#[tokio::test]
async fn login_with_unknown_email_rerenders_form() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();

    let response = portal_router(portal_state(&store, &mailer))
        .oneshot(post_form("/login", "email=ghost%40example.com", None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_body(response).await.contains("No account is registered"));
}

#[tokio::test]
async fn verify_rejects_unknown_types_and_bad_codes() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();
    seed_user(&store, "kelly@example.com", true);
    let router = portal_router(portal_state(&store, &mailer));

    let response = router
        .clone()
        .oneshot(post_form(
            "/verify",
            "type=reset-password&target=x&code=123456",
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_body(response)
        .await
        .contains("Unknown verification type"));

    let response = router
        .oneshot(post_form(
            "/verify",
            "type=login&target=kelly%40example.com&code=123456",
            None,
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_body(response).await.contains("Invalid code"));
}

#[tokio::test]
async fn logout_clears_session_cookie() {
    let store = MemoryStore::default();
    let mailer = MemoryMailer::default();

    let response = portal_router(portal_state(&store, &mailer))
        .oneshot(post_form("/logout", "", None))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(set_cookies(&response), ["hs_session=".to_string()]);
}
