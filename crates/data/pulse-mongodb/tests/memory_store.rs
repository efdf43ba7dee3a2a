use pulse_core::{
    Error, Identity, ListQuery, NewMessage, NewProperty, NewReview, Pagination, PropertyFilter,
    PropertyId, PropertyPatch, Rates, Rating, ReviewPatch, SortBy, User, UserId,
};
use pulse_mongodb::{MemoryStore, MessageStore, PropertyStore, ReviewStore, UserStore};
use serde_json::json;

fn user(c: char) -> UserId {
    UserId::parse(&c.to_string().repeat(24)).unwrap()
}

fn listing(owner: &UserId, name: &str) -> NewProperty {
    NewProperty {
        owner: owner.clone(),
        name: name.into(),
        property_type: "Apartment".into(),
        description: None,
        location: Default::default(),
        beds: 2,
        baths: 1.0,
        square_feet: 900,
        amenities: vec![],
        rates: Default::default(),
        seller_info: Default::default(),
        images: vec![],
        is_featured: false,
    }
}

fn review(user: &UserId, property: &PropertyId, rating: i64) -> NewReview {
    NewReview {
        user: user.clone(),
        property: property.clone(),
        rating: Rating::new(rating).unwrap(),
        text: "ok".into(),
    }
}

#[tokio::test]
async fn rating_summary_averages_reviews() {
    let store = MemoryStore::new();
    let p = store.insert_property(&listing(&user('a'), "Loft")).await.unwrap();
    for (u, r) in [('b', 3), ('c', 5), ('d', 4)] {
        store.insert_review(&review(&user(u), &p.id, r)).await.unwrap();
    }
    let s = store.rating_summary(&p.id).await.unwrap();
    assert_eq!(s.average_rating, 4.0);
    assert_eq!(s.review_count, 3);

    let missing = PropertyId::parse(&"f".repeat(24)).unwrap();
    let s = store.rating_summary(&missing).await.unwrap();
    assert_eq!((s.average_rating, s.review_count), (0.0, 0));
}

#[tokio::test]
async fn second_review_by_same_user_conflicts() {
    let store = MemoryStore::new();
    let p = store.insert_property(&listing(&user('a'), "Loft")).await.unwrap();
    store.insert_review(&review(&user('b'), &p.id, 4)).await.unwrap();
    let err = store
        .insert_review(&review(&user('b'), &p.id, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(store.list_reviews(Some(&p.id)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_views_restart_at_one() {
    let store = MemoryStore::new();
    let p = store.insert_property(&listing(&user('a'), "Loft")).await.unwrap();

    assert_eq!(store.increment_views(&p.id).await.unwrap(), Some(1));
    assert_eq!(store.increment_views(&p.id).await.unwrap(), Some(2));

    for raw in [None, Some(json!(null)), Some(json!("many")), Some(json!(-5))] {
        assert!(store.set_raw_views(&p.id, raw).await);
        assert_eq!(store.increment_views(&p.id).await.unwrap(), Some(1));
    }

    let gone = PropertyId::parse(&"e".repeat(24)).unwrap();
    assert_eq!(store.increment_views(&gone).await.unwrap(), None);
}

#[tokio::test]
async fn bookmark_toggle_is_its_own_inverse() {
    let store = MemoryStore::new();
    let owner = user('a');
    let p = store.insert_property(&listing(&owner, "Loft")).await.unwrap();
    let visitor = user('b');
    store.upsert_user(&User::new(visitor.clone(), "v@example.com")).await.unwrap();

    assert_eq!(store.toggle_bookmark(&visitor, &p.id).await.unwrap(), Some(true));
    assert!(store.is_bookmarked(&visitor, &p.id).await.unwrap());
    assert_eq!(store.toggle_bookmark(&visitor, &p.id).await.unwrap(), Some(false));
    assert!(!store.is_bookmarked(&visitor, &p.id).await.unwrap());

    assert_eq!(store.toggle_bookmark(&user('c'), &p.id).await.unwrap(), None);
}

#[tokio::test]
async fn upsert_keeps_bookmarks() {
    let store = MemoryStore::new();
    let p = store.insert_property(&listing(&user('a'), "Loft")).await.unwrap();
    let u = user('b');
    store.upsert_user(&User::new(u.clone(), "old@example.com")).await.unwrap();
    store.toggle_bookmark(&u, &p.id).await.unwrap();

    store
        .upsert_user(&User::new(u.clone(), "new@example.com").with_username("sam"))
        .await
        .unwrap();
    let found = store.find_user(&u).await.unwrap().unwrap();
    assert_eq!(found.email, "new@example.com");
    assert_eq!(found.username.as_deref(), Some("sam"));
    assert_eq!(found.bookmarks, vec![p.id]);
}

#[tokio::test]
async fn rating_sort_orders_by_average_then_newest() {
    let store = MemoryStore::new();
    let owner = user('a');
    let low = store.insert_property(&listing(&owner, "Low")).await.unwrap();
    let unrated = store.insert_property(&listing(&owner, "Unrated")).await.unwrap();
    let high = store.insert_property(&listing(&owner, "High")).await.unwrap();
    store.insert_review(&review(&user('b'), &low.id, 2)).await.unwrap();
    store.insert_review(&review(&user('b'), &high.id, 5)).await.unwrap();
    store.insert_review(&review(&user('c'), &high.id, 4)).await.unwrap();

    let page = store
        .list_properties(&ListQuery {
            sort: SortBy::RatingDesc,
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = page.properties.iter().map(|l| l.property.name.as_str()).collect();
    assert_eq!(names, ["High", "Low", "Unrated"]);
    assert_eq!(page.properties[0].average_rating, Some(4.5));
    assert_eq!(page.properties[0].review_count, Some(2));
    assert_eq!(page.properties[2].average_rating, Some(0.0));
    assert_eq!(unrated.name, "Unrated");
}

#[tokio::test]
async fn pagination_reports_full_total() {
    let store = MemoryStore::new();
    let owner = user('a');
    for i in 0..7 {
        store
            .insert_property(&listing(&owner, &format!("P{i}")))
            .await
            .unwrap();
    }
    let page = store
        .list_properties(&ListQuery {
            pagination: Some(Pagination::new(2, 3, 50)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 7);
    let names: Vec<_> = page.properties.iter().map(|l| l.property.name.as_str()).collect();
    assert_eq!(names, ["P3", "P2", "P1"]);
}

#[tokio::test]
async fn last_representable_page_is_empty() {
    let store = MemoryStore::new();
    store.insert_property(&listing(&user('a'), "P")).await.unwrap();
    for sort in [SortBy::Newest, SortBy::RatingDesc] {
        let page = store
            .list_properties(&ListQuery {
                sort,
                pagination: Some(Pagination::new(u64::MAX, 50, 50)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(page.properties.is_empty());
    }
}

#[tokio::test]
async fn price_sort_uses_monthly_first() {
    let store = MemoryStore::new();
    let owner = user('a');
    let mut cheap = listing(&owner, "Cheap");
    cheap.rates = Rates {
        monthly: Some(1000.0),
        ..Default::default()
    };
    let mut pricey = listing(&owner, "Pricey");
    pricey.rates = Rates {
        monthly: Some(3000.0),
        ..Default::default()
    };
    store.insert_property(&pricey).await.unwrap();
    store.insert_property(&cheap).await.unwrap();

    let page = store
        .list_properties(&ListQuery {
            sort: SortBy::PriceDesc,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.properties[0].property.name, "Pricey");
}

#[tokio::test]
async fn search_filter_is_case_insensitive() {
    let store = MemoryStore::new();
    let owner = user('a');
    let mut boston = listing(&owner, "Harbor view");
    boston.location.city = Some("Boston".into());
    store.insert_property(&boston).await.unwrap();
    store.insert_property(&listing(&owner, "Elsewhere")).await.unwrap();

    let page = store
        .list_properties(&ListQuery {
            filter: PropertyFilter::search(Some("boSTON".into()), Some("All".into())),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.properties[0].property.name, "Harbor view");
}

#[tokio::test]
async fn review_update_and_property_patch() {
    let store = MemoryStore::new();
    let p = store.insert_property(&listing(&user('a'), "Loft")).await.unwrap();
    let r = store.insert_review(&review(&user('b'), &p.id, 3)).await.unwrap();

    let updated = store
        .update_review(
            &r.id,
            &ReviewPatch {
                rating: Some(Rating::new(5).unwrap()),
                text: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.rating.get(), 5);
    assert_eq!(updated.text, "ok");

    let patched = store
        .update_property(
            &p.id,
            &PropertyPatch {
                name: Some("Penthouse".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patched.name, "Penthouse");
    assert_eq!(patched.beds, 2);
}

#[tokio::test]
async fn inbox_lists_unread_first() {
    let store = MemoryStore::new();
    let owner = user('a');
    let p = store.insert_property(&listing(&owner, "Loft")).await.unwrap();
    let inquiry = |body: &str| NewMessage {
        sender: user('b'),
        recipient: owner.clone(),
        property: p.id.clone(),
        name: "Renter".into(),
        email: "r@example.com".into(),
        phone: None,
        body: body.into(),
        is_reply: false,
        reply_to: None,
    };
    let first = store.insert_message(&inquiry("first")).await.unwrap();
    store.insert_message(&inquiry("second")).await.unwrap();
    assert_eq!(store.toggle_read(&first.id).await.unwrap(), Some(true));
    assert_eq!(store.unread_count(&owner).await.unwrap(), 1);

    let inbox = store.inbox(&owner).await.unwrap();
    let bodies: Vec<_> = inbox.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, ["second", "first"]);

    let replier = Identity::new(owner.clone());
    let reply = NewMessage::reply(&replier, &first, "thanks".into()).unwrap();
    store.insert_message(&reply).await.unwrap();
    assert!(store.mark_replied(&first.id).await.unwrap());
    let original = store.find_message(&first.id).await.unwrap().unwrap();
    assert!(original.has_reply && original.read);
    assert_eq!(store.unread_count(&user('b')).await.unwrap(), 1);
}
