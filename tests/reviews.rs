mod common;

use axum::http::StatusCode;
use serde_json::json;
use verdict::modules::taxonomy::models::Taxonomy;
use verdict_authz::Role;

use common::{field_of, TestApp};

/// An app holding one title; returns the admin token and the reviews URI.
async fn with_title(app: &TestApp) -> (String, String, i64) {
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;
    let id = app.title(&admin, "Solaris", 1972, &["drama"]).await;
    (admin, format!("/api/v1/titles/{id}/reviews/"), id)
}

async fn review(app: &TestApp, uri: &str, token: &str, score: i64) -> i64 {
    let (status, body) = app
        .post(uri, Some(token), json!({ "text": "Thoughtful", "score": score }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn one_review_per_author_and_title() {
    let app = TestApp::new().await;
    let (_, uri, _) = with_title(&app).await;
    let reader = app.token_for("reader", Role::User).await;

    let (status, body) = app
        .post(&uri, Some(&reader), json!({ "text": "Slow but great", "score": 9 }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["author"], "reader");
    assert_eq!(body["score"], 9);
    assert!(body["pub_date"].as_str().unwrap().contains('T'));

    let (status, body) = app
        .post(&uri, Some(&reader), json!({ "text": "Changed my mind", "score": 2 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "title");

    let (_, list) = app.get(&uri, None).await;
    assert_eq!(list["count"], 1);
}

#[tokio::test]
async fn rating_is_the_mean_score() {
    let app = TestApp::new().await;
    let (_, uri, id) = with_title(&app).await;
    let title_uri = format!("/api/v1/titles/{id}/");

    let (_, title) = app.get(&title_uri, None).await;
    assert!(title["rating"].is_null());

    for (name, score) in [("ann", 4), ("bob", 7)] {
        let token = app.token_for(name, Role::User).await;
        review(&app, &uri, &token, score).await;
    }

    let (_, title) = app.get(&title_uri, None).await;
    assert_eq!(title["rating"], json!(5.5));
    let (_, list) = app.get("/api/v1/titles/", None).await;
    assert_eq!(list["results"][0]["rating"], json!(5.5));
}

#[tokio::test]
async fn review_input_is_validated() {
    let app = TestApp::new().await;
    let (_, uri, _) = with_title(&app).await;
    let reader = app.token_for("reader", Role::User).await;

    for body in [
        json!({ "text": "Too much", "score": 11 }),
        json!({ "text": "Too little", "score": 0 }),
        json!({ "text": "", "score": 5 }),
        json!({ "text": "No score" }),
    ] {
        let (status, _) = app.post(&uri, Some(&reader), body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn anonymous_callers_read_but_cannot_write() {
    let app = TestApp::new().await;
    let (_, uri, _) = with_title(&app).await;

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post(&uri, None, json!({ "text": "Hi", "score": 5 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_author_or_staff_may_change_a_review() {
    let app = TestApp::new().await;
    let (admin, uri, _) = with_title(&app).await;
    let author = app.token_for("author", Role::User).await;
    let stranger = app.token_for("stranger", Role::User).await;
    let moderator = app.token_for("mod", Role::Moderator).await;

    let id = review(&app, &uri, &author, 6).await;
    let item = format!("{uri}{id}/");

    let (status, _) = app.patch(&item, Some(&stranger), json!({ "score": 1 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&item, Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.patch(&item, None, json!({ "score": 1 })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.patch(&item, Some(&author), json!({ "score": 8 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 8);
    assert_eq!(body["text"], "Thoughtful");

    let (status, body) = app.patch(&item, Some(&moderator), json!({ "text": "[edited]" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["author"], "author");

    assert_eq!(app.delete(&item, Some(&admin)).await.0, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&item, None).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn permission_is_decided_before_the_body_is_checked() {
    let app = TestApp::new().await;
    let (_, uri, _) = with_title(&app).await;
    let author = app.token_for("author", Role::User).await;
    let stranger = app.token_for("stranger", Role::User).await;

    let id = review(&app, &uri, &author, 6).await;
    let item = format!("{uri}{id}/");
    let out_of_range = json!({ "score": 42 });

    let (status, _) = app.patch(&item, Some(&stranger), out_of_range.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.patch(&item, None, out_of_range.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, body) = app.patch(&item, Some(&author), out_of_range).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "score");

    let comments = format!("{item}comments/");
    let (status, body) = app
        .post(&comments, Some(&author), json!({ "text": "Agreed" }))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let comment = format!("{comments}{}/", body["id"]);

    let (status, _) = app.patch(&comment, Some(&stranger), json!({ "text": "" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.patch(&comment, Some(&stranger), json!({ "text": 7 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_parents_are_not_found() {
    let app = TestApp::new().await;
    let (admin, uri, _) = with_title(&app).await;
    let reader = app.token_for("reader", Role::User).await;
    let id = review(&app, &uri, &reader, 5).await;

    let (status, _) = app.get("/api/v1/titles/999/reviews/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .post("/api/v1/titles/999/reviews/", Some(&reader), json!({ "text": "?", "score": 5 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A review is only reachable under its own title.
    let other = app.title(&admin, "Stalker", 1979, &["drama"]).await;
    let (status, _) = app
        .get(&format!("/api/v1/titles/{other}/reviews/{id}/"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .get(&format!("/api/v1/titles/{other}/reviews/{id}/comments/"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_thread_lifecycle() {
    let app = TestApp::new().await;
    let (_, uri, _) = with_title(&app).await;
    let author = app.token_for("author", Role::User).await;
    let commenter = app.token_for("commenter", Role::User).await;
    let moderator = app.token_for("mod", Role::Moderator).await;
    let review_id = review(&app, &uri, &author, 7).await;
    let comments = format!("{uri}{review_id}/comments/");

    let (status, _) = app.post(&comments, None, json!({ "text": "Agreed" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.post(&comments, Some(&commenter), json!({ "text": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, comment) = app.post(&comments, Some(&commenter), json!({ "text": "Agreed" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"], "commenter");
    let item = format!("{comments}{}/", comment["id"]);

    let (status, list) = app.get(&comments, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["text"], "Agreed");

    // The review's author does not own the comment.
    let (status, _) = app.patch(&item, Some(&author), json!({ "text": "No" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.patch(&item, Some(&commenter), json!({ "text": "Agreed!" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Agreed!");

    assert_eq!(app.delete(&item, Some(&moderator)).await.0, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&item, None).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_title_removes_its_reviews() {
    let app = TestApp::new().await;
    let (admin, uri, id) = with_title(&app).await;
    let reader = app.token_for("reader", Role::User).await;
    let review_id = review(&app, &uri, &reader, 3).await;
    app.post(&format!("{uri}{review_id}/comments/"), Some(&reader), json!({ "text": "Note" }))
        .await;

    app.delete(&format!("/api/v1/titles/{id}/"), Some(&admin)).await;

    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reviews")
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM comments")
        .fetch_one(&app.state.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn deleting_an_author_removes_their_reviews() {
    let app = TestApp::new().await;
    let (admin, uri, _) = with_title(&app).await;
    let reader = app.token_for("reader", Role::User).await;
    review(&app, &uri, &reader, 3).await;

    assert_eq!(
        app.delete("/api/v1/users/reader/", Some(&admin)).await.0,
        StatusCode::NO_CONTENT
    );
    let (_, list) = app.get(&uri, None).await;
    assert_eq!(list["count"], 0);
}
