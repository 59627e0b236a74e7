use blog::*;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap()
}

fn seeded(registry: &Registry) -> (Repository<'_, MemoryStorage>, Vec<Article>) {
    let repo = Repository::new(registry, MemoryStorage::with_clock(fixed_now), PaginationConfig::default());
    let articles = seed(&repo, 3, 4, 2).expect("Failed to seed");
    (repo, articles)
}

fn params(raw: &str) -> QueryParams {
    QueryParams::parse(raw).unwrap()
}

#[test]
fn has_relations_are_read_back_as_ids() {
    let registry = Registry::new();
    let (repo, articles) = seeded(&registry);
    assert_eq!(articles.len(), 12);

    let user: User = repo.get(1u64).unwrap();
    assert_eq!(user.handle, "user0");
    assert_eq!(user.articles.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert!(user.articles.iter().all(|a| a.title.is_empty()), "only ids are loaded");

    let article: Article = repo.get(1u64).unwrap();
    assert_eq!(article.author.id, 1);
    assert_eq!(article.comments.len(), 2);
    assert_eq!(article.created_at, fixed_now());
    assert_eq!(article.updated_at, fixed_now());
}

#[test]
fn offset_pages_are_zero_based() {
    let registry = Registry::new();
    let (repo, _) = seeded(&registry);
    let page: Vec<Article> = repo.list(&params("sort=id&page[number]=1&page[size]=5")).unwrap();
    assert_eq!(page.iter().map(|a| a.id).collect::<Vec<_>>(), vec![6, 7, 8, 9, 10]);
    let last: Vec<Article> = repo.list(&params("sort=id&page[number]=2&page[size]=5")).unwrap();
    assert_eq!(last.len(), 2);
    let default: Vec<Article> = repo.list(&QueryParams::default()).unwrap();
    assert_eq!(default.len(), 12);
}

#[test]
fn keyset_pages_follow_the_sort_order() {
    let registry = Registry::new();
    let (repo, _) = seeded(&registry);
    let everything: Vec<u64> = repo.list::<Article>(&params("sort=-stars,title")).unwrap().iter().map(|a| a.id).collect();

    let mut walked = Vec::new();
    let mut raw = "sort=-stars,title&page[size]=5".to_string();
    loop {
        let page: Vec<Article> = repo.list(&params(&raw)).unwrap();
        let Some(last) = page.last() else { break };
        raw = format!("sort=-stars,title&page[size]=5&page[after]={}", last.id);
        walked.extend(page.iter().map(|a| a.id));
    }
    assert_eq!(walked, everything);
}

#[test]
fn filters_combine_with_pagination() {
    let registry = Registry::new();
    let (repo, _) = seeded(&registry);
    let found: Vec<Article> = repo.list(&params("filter[title][like]=user1%25&filter[stars][gte]=2")).unwrap();
    assert_eq!(found.iter().map(|a| a.stars).collect::<Vec<_>>(), vec![2, 3]);

    let err = repo.list::<Article>(&params("filter[body]=x")).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    let err = repo.list::<Article>(&params("page[number]=1&page[after]=2")).unwrap_err();
    assert!(matches!(err, AppError::Query(QueryError::ConflictingPagination)));
    let err = repo.list::<Article>(&params("page[size]=1000")).unwrap_err();
    assert!(matches!(err, AppError::Query(QueryError::PageSizeExceeded { requested: 1000, max: 100 })));
}

#[test]
fn duplicate_handle_is_a_conflict() {
    let registry = Registry::new();
    let (repo, _) = seeded(&registry);
    let err = repo.insert(&user("user0")).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    assert_eq!(err.to_response().message, "Conflict: `handle` (column handle) must be unique");
}

#[test]
fn embargoed_articles_are_hidden() {
    let registry = Registry::new();
    let (repo, _) = seeded(&registry);
    let mut expired = article(1, "gone", 1);
    expired.embargo_ends = Some(fixed_now() - Duration::hours(1));
    let gone = repo.insert(&expired).unwrap();
    let err = repo.get::<Article>(gone.id).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND, "stored but no longer readable");

    let mut pending = article(1, "soon", 1);
    pending.embargo_ends = Some(fixed_now() + Duration::hours(1));
    let pending = repo.insert(&pending).unwrap();
    assert_eq!(repo.list::<Article>(&params("filter[title]=soon")).unwrap(), vec![pending]);
    assert!(repo.list::<Article>(&params("filter[title]=gone")).unwrap().is_empty());
    assert_eq!(repo.storage().row_count("blog_articles"), 14);
}

#[test]
fn documents_use_wire_names_and_sparse_fieldsets() {
    let registry = Registry::new();
    let (repo, _) = seeded(&registry);
    let doc = repo.get_document("articles", "1", &params("fields[articles]=title,author")).unwrap();
    assert_eq!(
        serde_json::to_value(doc).unwrap(),
        json!({
            "data": {
                "type": "articles",
                "id": "1",
                "attributes": { "title": "user0 #0" },
                "relationships": { "author": { "data": { "type": "users", "id": "1" } } }
            }
        })
    );

    let doc = repo.get_document("users", "2", &QueryParams::default()).unwrap();
    let json = serde_json::to_value(doc).unwrap();
    assert!(json["data"]["attributes"].get("display-name").is_none(), "omitempty");
    assert_eq!(json["data"]["relationships"]["articles"]["data"].as_array().map(Vec::len), Some(4));

    let err = repo.list_document("articles", &params("fields[nope]=title")).unwrap_err();
    assert!(matches!(err, AppError::Query(QueryError::UnknownType(_))));
    let err = repo.get_document("articles", "99", &QueryParams::default()).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
}

#[test]
fn created_documents_are_validated_first() {
    let registry = Registry::new();
    let (repo, _) = seeded(&registry);
    let body = r#"{"data": {"type": "articles", "attributes": {"body": "no title"},
        "relationships": {"author": {"data": {"type": "users", "id": "1"}}}}}"#;
    let err = repo.create_document("articles", body).unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.to_string(), "Validation failed: articles: `title` must not be null");

    let body = r#"{"data": {"type": "articles", "attributes": {"title": "fresh", "body": "b"},
        "relationships": {"author": {"data": {"type": "users", "id": "2"}}}}}"#;
    let created = serde_json::to_value(repo.create_document("articles", body).unwrap()).unwrap();
    assert_eq!(created["data"]["id"], "13");
    assert_eq!(created["data"]["attributes"]["stars"], 0);
    assert_eq!(created["data"]["attributes"]["created-at"], "2025-03-01T09:30:00+00:00");

    let bad_type = r#"{"data": {"type": "users", "attributes": {"handle": "x"}}}"#;
    assert_eq!(repo.create_document("articles", bad_type).unwrap_err().status_code(), StatusCode::BAD_REQUEST);
}

#[test]
fn updates_touch_only_writable_fields() {
    let registry = Registry::new();
    let (repo, _) = seeded(&registry);
    let mut article: Article = repo.get(3u64).unwrap();
    article.stars = 5;
    article.created_at = fixed_now() - Duration::days(10);
    let updated = repo.update(&article).unwrap();
    assert_eq!(updated.stars, 5);
    assert_eq!(updated.created_at, fixed_now());

    repo.delete::<Article>(3u64).unwrap();
    assert_eq!(repo.get::<Article>(3u64).unwrap_err().status_code(), StatusCode::NOT_FOUND);
}

#[test]
fn openapi_components_cover_every_schema() {
    let registry = Registry::new();
    registry.register::<Article>().unwrap();
    let components = openapi::components(&registry.schemas());
    let names: Vec<&String> = components.schemas.keys().collect();
    assert_eq!(
        names,
        vec!["ArticleWire", "ArticleWireJoin", "CommentWire", "CommentWireJoin", "UserWire", "UserWireJoin"]
    );
}
