use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use pulse_config::{ListingConfig, ServerConfig};
use pulse_core::{Identity, PropertyForm, UserId};
use pulse_media::RecordingMediaHost;
use pulse_mongodb::MemoryStore;
use pulse_service::Service;
use pulse_web::{create_router, AppState, Claims, SessionVerifier};

const BOUNDARY: &str = "pulse-test-boundary";

struct App {
    router: Router,
    service: Service,
    sessions: SessionVerifier,
    media: Arc<RecordingMediaHost>,
}

fn app() -> App {
    let store = Arc::new(MemoryStore::new());
    let media = Arc::new(RecordingMediaHost::new("propertypulse"));
    let service = Service::new(store, media.clone(), ListingConfig::default());
    let sessions = SessionVerifier::new("test-secret", "pulse_session");
    let server = ServerConfig {
        public_url: "http://pulse.test/".into(),
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(service.clone(), sessions.clone(), &server));
    App {
        router: create_router(state),
        service,
        sessions,
        media,
    }
}

fn uid(c: char) -> String {
    c.to_string().repeat(24)
}

fn who(c: char) -> Identity {
    Identity::new(UserId::parse(&uid(c)).unwrap())
}

impl App {
    fn token(&self, c: char) -> String {
        let mut claims = Claims::new(uid(c));
        claims.name = Some(format!("User {c}"));
        claims.email = Some(format!("{c}@example.com"));
        self.sessions.sign(&claims).unwrap()
    }

    async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, user: Option<char>) -> (StatusCode, Value) {
        self.call(request(Method::GET, uri, user.map(|c| self.token(c)), None))
            .await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<char>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.call(request(method, uri, user.map(|c| self.token(c)), Some(body)))
            .await
    }

    async fn listed(&self, owner: char, name: &str) -> String {
        let mut form = PropertyForm::default();
        for (field, value) in [
            ("name", name),
            ("type", "Apartment"),
            ("location.city", "Boston"),
            ("beds", "2"),
            ("baths", "1"),
            ("square_feet", "700"),
            ("rates.monthly", "2100"),
        ] {
            form.set(field, value.to_string());
        }
        self.service
            .create_property(Some(&who(owner)), form, Vec::new())
            .await
            .unwrap()
            .id
            .to_string()
    }
}

fn request(method: Method, uri: &str, token: Option<String>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn multipart_body(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

const PROPERTY_FIELDS: &[(&str, &str)] = &[
    ("name", "Harbor Loft"),
    ("type", "Apartment"),
    ("description", "Bright loft by the water"),
    ("location.city", "Boston"),
    ("location.state", "MA"),
    ("beds", "2"),
    ("baths", "1.5"),
    ("square_feet", "900"),
    ("amenities", "Wifi"),
    ("amenities", "Dishwasher"),
    ("rates.monthly", "3200"),
    ("seller_info.email", "owner@example.com"),
];

fn multipart_request(token: Option<String>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/properties")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("pulse_session={token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn health_reports_store() {
    let app = app();
    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], true);
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn create_property_uploads_images_and_redirects() {
    let app = app();
    let body = multipart_body(PROPERTY_FIELDS, Some(("front.jpg", b"jpeg-bytes")));
    let response = app
        .router
        .clone()
        .oneshot(multipart_request(Some(app.token('a')), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let id = location
        .strip_prefix("http://pulse.test/properties/")
        .expect("redirect to the new listing");

    let (status, property) = app.get(&format!("/api/properties/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(property["name"], "Harbor Loft");
    assert_eq!(property["owner"], uid('a'));
    assert_eq!(property["amenities"], json!(["Wifi", "Dishwasher"]));
    assert_eq!(property["images"].as_array().unwrap().len(), 1);
    assert_eq!(app.media.uploaded().len(), 1);
}

#[tokio::test]
async fn create_property_requires_session_and_valid_form() {
    let app = app();
    let body = multipart_body(PROPERTY_FIELDS, Some(("front.jpg", b"jpeg-bytes")));
    let (status, body) = app.call(multipart_request(None, body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let missing_beds: Vec<_> = PROPERTY_FIELDS
        .iter()
        .copied()
        .filter(|(name, _)| *name != "beds")
        .collect();
    let body = multipart_body(&missing_beds, Some(("front.jpg", b"jpeg-bytes")));
    let (status, _) = app.call(multipart_request(Some(app.token('a')), body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.media.uploaded().is_empty());
}

#[tokio::test]
async fn review_lifecycle_over_http() {
    let app = app();
    let p = app.listed('a', "Loft").await;

    let review = json!({ "propertyId": p, "rating": 4, "text": "Lovely" });
    let (status, body) = app.send(Method::POST, "/api/reviews", None, review.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "You must be logged in to leave a review" }));

    let (status, body) = app.send(Method::POST, "/api/reviews", Some('b'), review.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Review added successfully");
    assert_eq!(body["review"]["rating"], 4);
    assert_eq!(body["review"]["user"]["_id"], uid('b'));
    let id = body["review"]["_id"].as_str().unwrap().to_string();

    let (status, body) = app.send(Method::POST, "/api/reviews", Some('b'), review).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You have already reviewed this property");

    let (status, body) = app.get(&format!("/api/reviews?propertyId={p}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let edit = json!({ "rating": 1 });
    let uri = format!("/api/reviews/{id}");
    let (status, body) = app.send(Method::PUT, &uri, Some('c'), edit.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, body) = app.send(Method::PUT, &uri, Some('b'), edit).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 1);
    assert_eq!(body["text"], "Lovely");

    let (status, body) = app
        .call(request(Method::DELETE, &uri, Some(app.token('b')), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Review deleted");

    let (status, body) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Review not found");
}

#[tokio::test]
async fn out_of_range_rating_is_rejected() {
    let app = app();
    let p = app.listed('a', "Loft").await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/reviews",
            Some('b'),
            json!({ "propertyId": p, "rating": 6, "text": "Too good" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Rating must be between 1 and 5");
}

#[tokio::test]
async fn ratings_and_views_endpoints() {
    let app = app();
    let p = app.listed('a', "Loft").await;

    let (status, body) = app.get(&format!("/api/properties/{p}/ratings"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "averageRating": 0.0, "reviewCount": 0 }));

    for (user, rating) in [('b', 3), ('c', 5), ('d', 4)] {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/reviews",
                Some(user),
                json!({ "propertyId": p, "rating": rating, "text": "ok" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, body) = app.get(&format!("/api/properties/{p}/ratings"), None).await;
    assert_eq!(body, json!({ "averageRating": 4.0, "reviewCount": 3 }));

    let uri = format!("/api/properties/{p}/increment-views");
    for expected in 1..=2 {
        let (status, body) = app.call(request(Method::POST, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "viewCount": expected }));
    }

    let missing = format!("/api/properties/{}/increment-views", "f".repeat(24));
    let (status, body) = app.call(request(Method::POST, &missing, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Property Not Found");

    let (status, _) = app
        .call(request(Method::POST, "/api/properties/nope/increment-views", None, None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bookmark_toggle_round_trip() {
    let app = app();
    let p = app.listed('a', "Loft").await;
    let body = json!({ "propertyId": p });

    let (status, resp) = app.send(Method::POST, "/api/bookmarks", None, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["error"], "Please login to bookmark this property.");

    let (_, resp) = app.send(Method::POST, "/api/bookmarks", Some('b'), body.clone()).await;
    assert_eq!(
        resp,
        json!({ "message": "Property added to bookmarks", "isBookmarked": true })
    );
    let (_, saved) = app.get("/api/bookmarks", Some('b')).await;
    assert_eq!(saved.as_array().unwrap().len(), 1);
    let (_, status_body) = app.get(&format!("/api/bookmarks/{p}"), Some('b')).await;
    assert_eq!(status_body, json!({ "isBookmarked": true }));

    let (_, resp) = app.send(Method::POST, "/api/bookmarks", Some('b'), body).await;
    assert_eq!(resp["isBookmarked"], false);
    let (_, saved) = app.get("/api/bookmarks", Some('b')).await;
    assert_eq!(saved, json!([]));
}

#[tokio::test]
async fn inquiry_and_reply_thread() {
    let app = app();
    let p = app.listed('a', "Loft").await;

    let inquiry = json!({
        "recipient": uid('a'),
        "property": p,
        "name": "Bea",
        "email": "bea@example.com",
        "body": "Is it available in May?"
    });
    let (status, body) = app.send(Method::POST, "/api/messages", Some('b'), inquiry).await;
    assert_eq!(status, StatusCode::CREATED);
    let original = body["data"]["_id"].as_str().unwrap().to_string();

    let (_, body) = app.get("/api/messages/unread-count", Some('a')).await;
    assert_eq!(body, json!({ "count": 1 }));

    let toggle = format!("/api/messages/{original}");
    let (status, _) = app.call(request(Method::PUT, &toggle, Some(app.token('b')), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reply_uri = format!("/api/messages/{original}/reply");
    let (status, body) = app
        .send(Method::POST, &reply_uri, Some('b'), json!({ "body": "me again" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot reply to yourself");

    let (status, body) = app
        .send(Method::POST, &reply_uri, Some('a'), json!({ "body": "Yes it is" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Reply sent successfully");
    assert_eq!(body["data"]["recipient"], uid('b'));
    assert_eq!(body["data"]["isReply"], true);
    assert_eq!(body["data"]["replyTo"], original);

    let (_, inbox) = app.get("/api/messages", Some('a')).await;
    assert_eq!(inbox[0]["hasReply"], true);
    assert_eq!(inbox[0]["read"], true);

    let (_, inbox) = app.get("/api/messages", Some('b')).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["body"], "Yes it is");
}

#[tokio::test]
async fn listing_pages_and_search() {
    let app = app();
    app.listed('a', "Harbor Loft").await;
    app.listed('a', "Garden Studio").await;

    let (status, body) = app.get("/api/properties?pageSize=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["properties"].as_array().unwrap().len(), 1);
    assert_eq!(body["properties"][0]["name"], "Garden Studio");

    let (_, body) = app.get("/api/properties/search?location=harbor", None).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["properties"][0]["name"], "Harbor Loft");

    let (_, body) = app.get(&format!("/api/properties/user/{}", uid('a')), None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn owner_only_property_edits() {
    let app = app();
    let p = app.listed('a', "Loft").await;
    let uri = format!("/api/properties/{p}");

    let (status, _) = app
        .send(Method::PUT, &uri, Some('b'), json!({ "name": "Mine now" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::PUT, &uri, Some('a'), json!({ "name": "Sunny Loft" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Sunny Loft");

    let (status, _) = app.call(request(Method::DELETE, &uri, Some(app.token('a')), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_json_and_bad_tokens() {
    let app = app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/reviews")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token('b')))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let req = Request::builder()
        .uri("/api/messages")
        .header(header::AUTHORIZATION, "Bearer forged.deadbeef")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.call(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User ID is required");
}
