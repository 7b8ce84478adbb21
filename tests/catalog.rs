mod common;

use axum::http::StatusCode;
use serde_json::json;
use verdict::modules::taxonomy::models::Taxonomy;
use verdict::utils::current_year;
use verdict_authz::Role;

use common::{field_of, TestApp};

#[tokio::test]
async fn categories_are_public_to_read_and_admin_to_write() {
    let app = TestApp::new().await;
    let user = app.token_for("reader", Role::User).await;
    let moderator = app.token_for("mod", Role::Moderator).await;
    let admin = app.token_for("boss", Role::Admin).await;
    let category = json!({ "name": "Films", "slug": "movie" });

    let (status, _) = app.post("/api/v1/categories/", None, category.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.post("/api/v1/categories/", Some(&user), category.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/api/v1/categories/", Some(&moderator), category.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post("/api/v1/categories/", Some(&admin), category.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, category);

    let (status, body) = app.get("/api/v1/categories/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0], category);
}

#[tokio::test]
async fn superuser_flag_counts_as_admin() {
    let app = TestApp::new().await;
    let (user, _) = app.user("root", Role::User).await;
    verdict::modules::users::repo::promote_to_superuser(&app.state.db, user.id)
        .await
        .unwrap();
    let token = app.state.tokens.issue(user.id);

    let (status, _) = app
        .post("/api/v1/genres/", Some(&token), json!({ "name": "Drama", "slug": "drama" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn duplicate_and_invalid_slugs_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;

    let genre = json!({ "name": "Drama", "slug": "drama" });
    let (status, _) = app.post("/api/v1/genres/", Some(&admin), genre.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/api/v1/genres/", Some(&admin), genre).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "slug");

    let (status, body) = app
        .post("/api/v1/genres/", Some(&admin), json!({ "name": "Bad", "slug": "no spaces" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "slug");
}

#[tokio::test]
async fn term_search_matches_whole_name() {
    let app = TestApp::new().await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;
    app.term(Taxonomy::Genres, "Melodrama", "melodrama").await;

    let (_, body) = app.get("/api/v1/genres/?search=drama", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["slug"], "drama");
}

#[tokio::test]
async fn deleting_terms_by_slug() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Categories, "Books", "book").await;

    let (status, _) = app.delete("/api/v1/categories/book/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.delete("/api/v1/categories/book/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.delete("/api/v1/categories/book/", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn title_reads_embed_classification_and_rating() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Categories, "Films", "movie").await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;
    app.term(Taxonomy::Genres, "Sci-Fi", "sci-fi").await;

    let (status, body) = app
        .post(
            "/api/v1/titles/",
            Some(&admin),
            json!({
                "name": "Solaris",
                "year": 1972,
                "description": "A planet that thinks",
                "genre": ["sci-fi", "drama"],
                "category": "movie"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["id"].as_i64().unwrap();

    let (status, title) = app.get(&format!("/api/v1/titles/{id}/"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(title["name"], "Solaris");
    assert_eq!(title["category"], json!({ "name": "Films", "slug": "movie" }));
    assert_eq!(
        title["genre"],
        json!([{ "name": "Drama", "slug": "drama" }, { "name": "Sci-Fi", "slug": "sci-fi" }])
    );
    assert!(title["rating"].is_null());
}

#[tokio::test]
async fn title_writes_are_validated() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;

    let future = current_year() + 1;
    let (status, body) = app
        .post("/api/v1/titles/", Some(&admin), json!({ "name": "Later", "year": future, "genre": ["drama"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "year");

    let (status, body) = app
        .post("/api/v1/titles/", Some(&admin), json!({ "name": "Odd", "year": 2000, "genre": ["nope"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "genre");

    let (status, body) = app
        .post(
            "/api/v1/titles/",
            Some(&admin),
            json!({ "name": "Odd", "year": 2000, "genre": ["drama"], "category": "nope" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "category");

    // Nothing was half-written.
    let (_, list) = app.get("/api/v1/titles/", None).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn titles_filter_by_category_genre_name_and_year() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Categories, "Films", "movie").await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;
    app.term(Taxonomy::Genres, "Comedy", "comedy").await;

    let solaris = app.title(&admin, "Solaris", 1972, &["drama"]).await;
    app.title(&admin, "Stalker", 1979, &["drama"]).await;
    app.title(&admin, "Playtime", 1967, &["comedy"]).await;
    app.patch(&format!("/api/v1/titles/{solaris}/"), Some(&admin), json!({ "category": "movie" }))
        .await;

    let count = |body: serde_json::Value| body["count"].as_i64().unwrap();
    assert_eq!(count(app.get("/api/v1/titles/", None).await.1), 3);
    assert_eq!(count(app.get("/api/v1/titles/?genre=drama", None).await.1), 2);
    assert_eq!(count(app.get("/api/v1/titles/?category=movie", None).await.1), 1);
    assert_eq!(count(app.get("/api/v1/titles/?name=sta", None).await.1), 1);
    assert_eq!(count(app.get("/api/v1/titles/?year=1967", None).await.1), 1);
    assert_eq!(count(app.get("/api/v1/titles/?genre=drama&year=1979", None).await.1), 1);

    let (status, _) = app.get("/api/v1/titles/?year=soon", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn title_update_and_delete() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;
    let user = app.token_for("reader", Role::User).await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;
    app.term(Taxonomy::Genres, "Comedy", "comedy").await;
    let id = app.title(&admin, "Solaris", 1972, &["drama"]).await;
    let uri = format!("/api/v1/titles/{id}/");

    let (status, _) = app.patch(&uri, Some(&user), json!({ "name": "Mine" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .patch(&uri, Some(&admin), json!({ "name": "Solyaris", "genre": ["comedy"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Solyaris");
    assert_eq!(body["year"], 1972);
    assert_eq!(body["genre"], json!([{ "name": "Comedy", "slug": "comedy" }]));

    assert_eq!(app.delete(&uri, Some(&admin)).await.0, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&uri, None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/v1/titles/not-a-number/", None).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_is_checked_before_the_body() {
    let app = TestApp::new().await;
    let user = app.token_for("reader", Role::User).await;
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;
    let id = app.title(&admin, "Solaris", 1972, &["drama"]).await;
    let invalid = json!({ "name": "", "slug": "bad slug" });

    let (status, _) = app.post("/api/v1/categories/", Some(&user), invalid.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.post("/api/v1/categories/", None, invalid.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.post("/api/v1/categories/", Some(&admin), invalid).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/api/v1/titles/", Some(&user), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let uri = format!("/api/v1/titles/{id}/");
    let (status, _) = app.patch(&uri, Some(&user), json!({ "year": "soon" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.patch(&uri, None, json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn name_limits_count_characters_not_bytes() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;

    let name = "Я".repeat(256);
    let (status, body) = app
        .post(
            "/api/v1/titles/",
            Some(&admin),
            json!({ "name": name, "year": 1972, "genre": ["drama"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["name"], name);

    let (status, body) = app
        .post(
            "/api/v1/titles/",
            Some(&admin),
            json!({ "name": "Я".repeat(257), "year": 1972, "genre": ["drama"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(field_of(&body), "name");

    let category = json!({ "name": "Фильмы", "slug": "films" });
    let (status, _) = app.post("/api/v1/categories/", Some(&admin), category).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn null_category_clears_it() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Categories, "Films", "movie").await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;
    let id = app.title(&admin, "Solaris", 1972, &["drama"]).await;
    let uri = format!("/api/v1/titles/{id}/");

    let (_, title) = app.patch(&uri, Some(&admin), json!({ "category": "movie" })).await;
    assert_eq!(title["category"]["slug"], "movie");

    let (_, title) = app.patch(&uri, Some(&admin), json!({ "name": "Solyaris" })).await;
    assert_eq!(title["category"]["slug"], "movie");

    let (status, title) = app.patch(&uri, Some(&admin), json!({ "category": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(title["category"].is_null());
    assert_eq!(title["name"], "Solyaris");
}

#[tokio::test]
async fn deleting_a_category_keeps_its_titles() {
    let app = TestApp::new().await;
    let admin = app.token_for("boss", Role::Admin).await;
    app.term(Taxonomy::Categories, "Films", "movie").await;
    app.term(Taxonomy::Genres, "Drama", "drama").await;
    let id = app.title(&admin, "Solaris", 1972, &["drama"]).await;
    let uri = format!("/api/v1/titles/{id}/");
    app.patch(&uri, Some(&admin), json!({ "category": "movie" })).await;

    app.delete("/api/v1/categories/movie/", Some(&admin)).await;
    let (status, title) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(title["category"].is_null());

    app.delete("/api/v1/genres/drama/", Some(&admin)).await;
    let (_, title) = app.get(&uri, None).await;
    assert_eq!(title["genre"], json!([]));
}

#[tokio::test]
async fn list_endpoints_are_paginated() {
    let app = TestApp::new().await;
    for n in 0..12 {
        app.term(Taxonomy::Genres, &format!("Genre {n:02}"), &format!("g{n:02}")).await;
    }

    let (status, first) = app.get("/api/v1/genres/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["count"], 12);
    assert_eq!(first["results"].as_array().unwrap().len(), 10);
    assert_eq!(first["next"], "/api/v1/genres/?page=2");
    assert!(first["previous"].is_null());

    let (_, second) = app.get("/api/v1/genres/?page=2", None).await;
    assert_eq!(second["results"].as_array().unwrap().len(), 2);
    assert_eq!(second["results"][0]["slug"], "g10");
    assert!(second["next"].is_null());
    assert_eq!(second["previous"], "/api/v1/genres/");

    let (status, _) = app.get("/api/v1/genres/?page=3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
