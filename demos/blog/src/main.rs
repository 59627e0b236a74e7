use blog::*;

fn demo() -> Result<(), AppError> {
    let config = ResmapConfig::from_env()?;
    let registry = Registry::global();
    registry.register_all()?;
    let repo = Repository::new(registry, MemoryStorage::new(), config.pagination.clone());

    println!("Seeding users, articles and comments:");
    let articles = seed(&repo, 3, 4, 2)?;
    println!("{} articles stored", articles.len());

    println!("Top rated articles of user0:");
    let params = QueryParams::parse("filter[title][like]=user0%25&sort=-stars&page[size]=2&fields[articles]=title,stars")?;
    println!("{}", serde_json::to_string_pretty(&repo.list_document("articles", &params)?)?);

    println!("Next page after the last one shown:");
    let first: Vec<Article> = repo.list(&QueryParams::parse("filter[title][like]=user0%25&sort=-stars&page[size]=2")?)?;
    if let Some(last) = first.last() {
        let raw = format!("filter[title][like]=user0%25&sort=-stars&page[size]=2&page[after]={}", last.id);
        for article in repo.list::<Article>(&QueryParams::parse(&raw)?)? {
            println!("  {} ({} stars)", article.title, article.stars);
        }
    }

    println!("Creating a comment from a JSON:API document:");
    let body = format!(
        r#"{{"data": {{"type": "comments", "attributes": {{"text": "hello"}},
            "relationships": {{"article": {{"data": {{"type": "articles", "id": "{}"}}}}}}}}}}"#,
        articles[0].id
    );
    println!("{}", serde_json::to_string_pretty(&repo.create_document("comments", &body)?)?);

    println!("Rejected request:");
    if let Err(e) = repo.list_document("articles", &QueryParams::parse("sort=body")?) {
        println!("{}", serde_json::to_string_pretty(&e.to_response())?);
    }

    println!("OpenAPI components:");
    let components = openapi::components(&registry.schemas());
    println!("{}", serde_json::to_string_pretty(&components)?);
    Ok(())
}

fn main() {
    if let Err(e) = demo() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
