mod common;

use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

use common::{id_of, TestServer, BOSTON, CAMBRIDGE};

#[tokio::test]
async fn register_login_and_me() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("Jo Learner", "user").await?;

    let (status, me) = server.call(Method::GET, "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["email"], json!("jo.learner@devcamper.test"));
    assert_eq!(me["data"]["role"], json!("user"));
    assert!(me["data"].get("password").is_none(), "password leaked: {}", me);

    let (status, body) = server
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "jo.learner@devcamper.test", "password": "123456"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, body) = server
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "jo.learner@devcamper.test", "password": "654321"})),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "message": "Invalid credentials"}));

    let (status, _) = server
        .call(Method::POST, "/auth/login", None, Some(json!({"email": "jo.learner@devcamper.test"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn account_self_service() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("Sam Student", "user").await?;

    let (status, body) = server
        .put("/auth/updatedetails", &token, json!({"name": "Samantha Student", "role": "admin"}))
        .await?;
    assert_eq!(status, StatusCode::OK, "details update failed: {}", body);
    assert_eq!(body["data"]["name"], json!("Samantha Student"));
    assert_eq!(body["data"]["email"], json!("sam.student@devcamper.test"));
    assert_eq!(body["data"]["role"], json!("user"));

    let (status, body) = server
        .put("/auth/updatepassword", &token, json!({"currentPassword": "nope!!", "newPassword": "abcdef"}))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "message": "Password is incorrect"}));

    let (status, body) = server
        .put("/auth/updatepassword", &token, json!({"currentPassword": "123456", "newPassword": "abcdef"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let fresh = body["token"].as_str().unwrap_or_default().to_string();
    assert!(!fresh.is_empty());

    let (status, _) = server
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "sam.student@devcamper.test", "password": "abcdef"})),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.call(Method::GET, "/auth/logout", Some(&fresh), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": {}}));

    let (status, _) = server.call(Method::GET, "/auth/logout", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn tokens_are_required_and_checked() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, body) = server.call(Method::GET, "/auth/me", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));

    let (status, _) = server.call(Method::GET, "/auth/me", Some("not.a.jwt"), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = server
        .call(Method::POST, "/bootcamps", None, Some(json!({"name": "Anonymous"})))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn registration_is_validated() -> Result<()> {
    let server = TestServer::spawn().await?;

    let (status, _) = server
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"name": "Mallory", "email": "mallory@devcamper.test", "password": "123456", "role": "admin"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    server.register("Twice", "user").await?;
    let (status, body) = server
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"name": "Twice Again", "email": "twice@devcamper.test", "password": "123456"})),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Duplicate field value entered"));

    let (status, _) = server
        .call(Method::POST, "/auth/register", None, Some(json!("not an object")))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn only_owners_and_admins_write() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.register("Owner Publisher", "publisher").await?;
    let rival = server.register("Rival Publisher", "publisher").await?;
    let learner = server.register("Plain Learner", "user").await?;
    let admin = server.admin("Site Admin").await?;

    let bootcamp = server.bootcamp(&owner, "Owned Camp", BOSTON).await?;
    let path = format!("/bootcamps/{}", bootcamp);

    let (status, _) = server.put(&path, &rival, json!({"phone": "555-1234"})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server.put(&path, &owner, json!({"name": "Renamed Camp"})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], json!("renamed-camp"));

    let (status, _) = server.put(&path, &admin, json!({"jobGuarantee": true})).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .post(
            "/bootcamps",
            &learner,
            json!({"name": "Learner Camp", "description": "d", "address": CAMBRIDGE, "careers": ["Other"]}),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .post(
            "/bootcamps",
            &owner,
            json!({"name": "Second Camp", "description": "d", "address": CAMBRIDGE, "careers": ["Other"]}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "second bootcamp allowed: {}", body);

    let (status, _) = server
        .post(&format!("/bootcamps/{}/courses", bootcamp), &rival, json!({"title": "x"}))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn user_administration_is_admin_only() -> Result<()> {
    let server = TestServer::spawn().await?;
    let learner = server.register("Curious Learner", "user").await?;
    let admin = server.admin("Root Admin").await?;

    let (status, _) = server.call(Method::GET, "/users", Some(&learner), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .post(
            "/users",
            &admin,
            json!({"name": "Made By Admin", "email": "made@devcamper.test", "password": "123456", "role": "publisher"}),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "user create failed: {}", body);
    assert!(body["data"].get("password").is_none());
    let user = id_of(&body["data"])?;

    let (status, listing) = server.call(Method::GET, "/users?sort=name", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], json!(3));

    let (status, _) = server.call(Method::GET, "/users?password=123456", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server.put(&format!("/users/{}", user), &admin, json!({"name": "Renamed"})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("Renamed"));

    let (status, _) = server.delete(&format!("/users/{}", user), &admin).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = server.call(Method::GET, &format!("/users/{}", user), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = server.call(Method::GET, "/users/12345", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Malformed identifier: 12345"));
    Ok(())
}
