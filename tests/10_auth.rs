mod common;

use anyhow::Result;
use axum::http::StatusCode;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

use notify_prefs::auth::AccessClaims;

fn current_user() -> serde_json::Value {
    json!({ "operation": "currentUser" })
}

#[tokio::test]
async fn missing_token_is_rejected() -> Result<()> {
    let (app, _) = common::test_app();

    let (status, body) = common::post_query(&app, None, current_user()).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "missing token" }));
    Ok(())
}

#[tokio::test]
async fn empty_bearer_is_missing_token() -> Result<()> {
    let (app, _) = common::test_app();

    let (status, body) = common::post_query(&app, Some(""), current_user()).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "missing token" }));
    Ok(())
}

#[tokio::test]
async fn foreign_signature_is_rejected() -> Result<()> {
    let (app, _) = common::test_app();
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        token_type: "access".to_string(),
        user_id: 1,
        admin: true,
        iss: None,
        jti: None,
        iat: Some(now),
        exp: now + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"somebody-elses-key"),
    )?;

    let (status, body) = common::post_query(&app, Some(&token), current_user()).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "invalid access token" }));
    Ok(())
}

#[tokio::test]
async fn other_algorithms_are_rejected() -> Result<()> {
    let (app, _) = common::test_app();
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        token_type: "access".to_string(),
        user_id: 1,
        admin: false,
        iss: None,
        jti: None,
        iat: Some(now),
        exp: now + 3600,
    };
    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(common::SIGN_KEY.as_bytes()),
    )?;

    let (status, _) = common::post_query(&app, Some(&token), current_user()).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn refresh_tokens_do_not_authenticate() -> Result<()> {
    let (app, _) = common::test_app();
    let now = chrono::Utc::now().timestamp();
    let claims = AccessClaims {
        token_type: "refresh".to_string(),
        user_id: 1,
        admin: false,
        iss: None,
        jti: None,
        iat: Some(now),
        exp: now + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(common::SIGN_KEY.as_bytes()),
    )?;

    let (status, body) = common::post_query(&app, Some(&token), current_user()).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "invalid access token" }));
    Ok(())
}

#[tokio::test]
async fn valid_token_reaches_resolver() -> Result<()> {
    let (app, _) = common::test_app();
    let token = common::mint_token(7, false);

    // Authenticated, but the user has no preferences yet.
    let (status, body) = common::post_query(&app, Some(&token), current_user()).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentUser"], serde_json::Value::Null);
    assert_eq!(body["errors"][0]["message"], "not found");
    Ok(())
}

#[tokio::test]
async fn admin_operations_require_admin_flag() -> Result<()> {
    let (app, _) = common::test_app();
    let query = json!({ "operation": "users" });

    let user = common::mint_token(1, false);
    let (status, body) = common::post_query(&app, Some(&user), query.clone()).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "forbidden" }));

    let admin = common::mint_token(2, true);
    let (status, body) = common::post_query(&app, Some(&admin), query).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": { "users": [] } }));
    Ok(())
}

#[tokio::test]
async fn malformed_body_is_bad_request() -> Result<()> {
    let (app, _) = common::test_app();
    let token = common::mint_token(1, false);

    let (status, body) =
        common::post_query(&app, Some(&token), json!({ "operation": "launchRockets" })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "invalid request" }));
    Ok(())
}
