pub use resmap::*;

use chrono::{DateTime, Utc};

// every struct needs Default, relations are filled with id-only stubs when read back

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "users", table = "users")]
pub struct User {
    #[resource(id)]
    pub id: u64,
    #[resource(attr = "handle,unique")]
    pub handle: String,
    #[resource(attr = "display-name,column:display_name,omitempty")]
    pub display_name: Option<String>,
    #[resource(has = "articles,fk:author")]
    pub articles: Vec<Article>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "articles", table = "blog_articles")]
pub struct Article {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub title: String,
    #[resource(attr = "body,nosort,nofilter")]
    pub body: String,
    #[resource(attr = "stars,default:0")]
    pub stars: i32,
    #[resource(belongs_to = "author")]
    pub author: Box<User>,
    #[resource(has = "comments")]
    pub comments: Vec<Comment>,
    #[resource(created = "created-at")]
    pub created_at: DateTime<Utc>,
    #[resource(updated = "updated-at")]
    pub updated_at: DateTime<Utc>,
    #[resource(expires = "embargo-ends,omitempty")]
    pub embargo_ends: Option<DateTime<Utc>>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "comments", table = "comments")]
pub struct Comment {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub text: String,
    #[resource(belongs_to = "article")]
    pub article: Box<Article>,
    #[resource(belongs_to = "commenter")]
    pub commenter: Option<Box<User>>,
}

pub fn user(handle: &str) -> User {
    User { handle: handle.to_string(), ..Default::default() }
}

pub fn article(author: u64, title: &str, stars: i32) -> Article {
    Article {
        title: title.to_string(),
        body: format!("{title} body"),
        stars,
        author: Box::new(User { id: author, ..Default::default() }),
        ..Default::default()
    }
}

pub fn comment(article: u64, text: &str) -> Comment {
    Comment {
        text: text.to_string(),
        article: Box::new(Article { id: article, ..Default::default() }),
        ..Default::default()
    }
}

/// `users` authors, each with `per_user` articles carrying `comments` comments.
pub fn seed<S: Storage>(repo: &Repository<'_, S>, users: usize, per_user: usize, comments: usize) -> Result<Vec<Article>, AppError> {
    let mut articles = Vec::with_capacity(users * per_user);
    for u in 0..users {
        let author = repo.insert(&user(&format!("user{u}")))?;
        for a in 0..per_user {
            let stored = repo.insert(&article(author.id, &format!("{} #{a}", author.handle), (a % 5) as i32))?;
            for c in 0..comments {
                repo.insert(&comment(stored.id, &format!("comment {c}")))?;
            }
            articles.push(stored);
        }
    }
    Ok(articles)
}
