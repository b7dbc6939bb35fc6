//! Login, the auth gate and user administration over HTTP.

mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use serde_json::json;

use common::{bearer, call, token_for, TestContext, PASSWORD};
use schoolbook_backend::create_app;

#[actix_web::test]
async fn login_issues_a_usable_bearer_token() {
    let ctx = TestContext::new();
    let (admin, _) = ctx.superuser().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (status, token) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/login/access-token")
            .set_form([("username", admin.email.as_str()), ("password", PASSWORD)])
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["token_type"], "bearer");

    let access_token = token["access_token"].as_str().unwrap();
    let (status, me) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/login/test-token")
            .insert_header(bearer(access_token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], admin.email);
    assert!(me.get("hashed_password").is_none());
}

#[actix_web::test]
async fn login_rejects_bad_credentials_and_inactive_users() {
    let ctx = TestContext::new();
    let (admin, _) = ctx.superuser().await;
    let (former, _) = ctx.inactive().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (status, body) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/login/access-token")
            .set_form([("username", admin.email.as_str()), ("password", "wrong-password")])
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Incorrect email or password");

    let (status, body) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/login/access-token")
            .set_form([("username", former.email.as_str()), ("password", PASSWORD)])
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Inactive user");
}

#[actix_web::test]
async fn requests_without_valid_credentials_are_refused() {
    let ctx = TestContext::new();
    let (_, inactive_token) = ctx.inactive().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (status, body) = call(&app, TestRequest::get().uri("/api/v1/students").to_request()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Not authenticated");

    let (status, body) = call(
        &app,
        TestRequest::get()
            .uri("/api/v1/students")
            .insert_header(bearer("not.a.jwt"))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Could not validate credentials");

    let (status, body) = call(
        &app,
        TestRequest::get()
            .uri("/api/v1/students")
            .insert_header(bearer(&inactive_token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Inactive user");
}

#[actix_web::test]
async fn superuser_manages_accounts() {
    let ctx = TestContext::new();
    let (_, token) = ctx.superuser().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let new_user = json!({
        "email": "bursar@school.com",
        "password": "ledger-2024",
        "full_name": "School Bursar",
        "is_accountant": true,
    });
    let (status, created) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/users")
            .insert_header(bearer(&token))
            .set_json(&new_user)
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["is_active"], true);
    assert_eq!(created["is_accountant"], true);

    let (status, _) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/users")
            .insert_header(bearer(&token))
            .set_json(&new_user)
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let user_uri = format!("/api/v1/users/{}", created["id"].as_str().unwrap());
    let (status, updated) = call(
        &app,
        TestRequest::patch()
            .uri(&user_uri)
            .insert_header(bearer(&token))
            .set_json(json!({"is_class_teacher": true}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_class_teacher"], true);
    assert_eq!(updated["full_name"], "School Bursar");

    let (status, listing) = call(
        &app,
        TestRequest::get()
            .uri("/api/v1/users")
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 2);

    let (status, body) = call(
        &app,
        TestRequest::delete()
            .uri(&user_uri)
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, body) = call(
        &app,
        TestRequest::get()
            .uri(&user_uri)
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");
}

#[actix_web::test]
async fn updating_unknown_user_is_not_found_before_email_conflict() {
    let ctx = TestContext::new();
    let (_, token) = ctx.superuser().await;
    let (staff, _) = ctx.staff().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (status, body) = call(
        &app,
        TestRequest::patch()
            .uri(&format!("/api/v1/users/{}", uuid::Uuid::new_v4()))
            .insert_header(bearer(&token))
            .set_json(json!({"email": staff.email}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "User not found");
}

#[actix_web::test]
async fn superuser_cannot_delete_themselves() {
    let ctx = TestContext::new();
    let (admin, token) = ctx.superuser().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (status, _) = call(
        &app,
        TestRequest::delete()
            .uri(&format!("/api/v1/users/{}", admin.id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn deleting_a_user_removes_their_students_and_revokes_access() {
    let ctx = TestContext::new();
    let (_, admin_token) = ctx.superuser().await;
    let (staff, staff_token) = ctx.staff().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (_, form) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/class-forms")
            .insert_header(bearer(&admin_token))
            .set_json(json!({"name": "Form 1"}))
            .to_request(),
    )
    .await;
    let (status, _) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/students")
            .insert_header(bearer(&staff_token))
            .set_json(json!({"first_name": "Kwame", "last_name": "Ofori", "form_id": form["id"]}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        TestRequest::delete()
            .uri(&format!("/api/v1/users/{}", staff.id))
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, students) = call(
        &app,
        TestRequest::get()
            .uri("/api/v1/students")
            .insert_header(bearer(&admin_token))
            .to_request(),
    )
    .await;
    assert_eq!(students["count"], 0);

    let (status, body) = call(
        &app,
        TestRequest::get()
            .uri("/api/v1/users/me")
            .insert_header(bearer(&staff_token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "User not found");
}

#[actix_web::test]
async fn regular_users_only_see_themselves() {
    let ctx = TestContext::new();
    let (admin, _) = ctx.superuser().await;
    let (staff, token) = ctx.staff().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (status, me) = call(
        &app,
        TestRequest::get()
            .uri(&format!("/api/v1/users/{}", staff.id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], staff.email);

    let (status, _) = call(
        &app,
        TestRequest::get()
            .uri(&format!("/api/v1/users/{}", admin.id))
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        TestRequest::get()
            .uri("/api/v1/users")
            .insert_header(bearer(&token))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn users_update_their_own_profile_and_password() {
    let ctx = TestContext::new();
    let (_, _) = ctx.superuser().await;
    let (staff, token) = ctx.staff().await;
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (status, me) = call(
        &app,
        TestRequest::patch()
            .uri("/api/v1/users/me")
            .insert_header(bearer(&token))
            .set_json(json!({"full_name": "Efua Staff"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["full_name"], "Efua Staff");
    assert_eq!(me["email"], staff.email);

    let (status, _) = call(
        &app,
        TestRequest::patch()
            .uri("/api/v1/users/me")
            .insert_header(bearer(&token))
            .set_json(json!({"email": "admin@school.com"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        TestRequest::patch()
            .uri("/api/v1/users/me/password")
            .insert_header(bearer(&token))
            .set_json(json!({"current_password": PASSWORD, "new_password": PASSWORD}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "New password cannot be the same as the current one");

    let (status, body) = call(
        &app,
        TestRequest::patch()
            .uri("/api/v1/users/me/password")
            .insert_header(bearer(&token))
            .set_json(json!({"current_password": PASSWORD, "new_password": "brand-new-secret"}))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated successfully");

    let (status, _) = call(
        &app,
        TestRequest::post()
            .uri("/api/v1/login/access-token")
            .set_form([("username", staff.email.as_str()), ("password", "brand-new-secret")])
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Tokens minted before the change stay valid until they expire
    let (status, _) = call(
        &app,
        TestRequest::get()
            .uri("/api/v1/users/me")
            .insert_header(bearer(&token_for(&staff)))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn health_check_is_public() {
    let ctx = TestContext::new();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    let (status, body) = call(&app, TestRequest::get().uri("/api/v1/utils/health-check").to_request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(true));
}

#[actix_web::test]
async fn credentials_are_checked_before_the_body() {
    let ctx = TestContext::new();
    let app = test::init_service(create_app(ctx.state.clone())).await;

    for uri in ["/api/v1/subjects", "/api/v1/students", "/api/v1/grades", "/api/v1/users"] {
        let (status, body) = call(
            &app,
            TestRequest::post()
                .uri(uri)
                .set_json(json!({"x": 1}))
                .to_request(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["detail"], "Not authenticated");
    }

    let (status, body) = call(
        &app,
        TestRequest::put()
            .uri(&format!("/api/v1/class-forms/{}", uuid::Uuid::new_v4()))
            .insert_header(bearer("not.a.jwt"))
            .set_payload("{ not json")
            .insert_header(("Content-Type", "application/json"))
            .to_request(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Could not validate credentials");
}
