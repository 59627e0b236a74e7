use crate::Resource;
use chrono::{DateTime, Utc};

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "posts", table = "posts", alias = "p")]
pub struct Post {
    #[resource(id)]
    pub id: u64,
    #[resource(attr = "title,unique")]
    pub title: String,
    #[resource(attr = "views,default:0,nosort")]
    pub views: i64,
    #[resource(belongs_to = "author")]
    pub author: Box<Author>,
    #[resource(has = "comments")]
    pub comments: Vec<Comment>,
    #[resource(created = "created-at")]
    pub created_at: DateTime<Utc>,
    #[resource(expires = "expires-at,omitempty")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "authors", table = "authors")]
pub struct Author {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub name: String,
    #[resource(attr = "email,unique,column:email_address")]
    pub email: String,
    #[resource(has)]
    pub posts: Vec<Post>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "comments", table = "comments")]
pub struct Comment {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub body: String,
    #[resource(belongs_to)]
    pub post: Box<Post>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "categories", table = "categories")]
pub struct Category {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub name: String,
    #[resource(belongs_to = "parent")]
    pub parent: Option<Box<Category>>,
    #[resource(has = "children,fk:parent")]
    pub children: Vec<Category>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct Person {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub name: String,
    #[resource(has = "passport,fk:holder")]
    pub passport: Option<Box<Passport>>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct Passport {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub number: String,
    #[resource(belongs_to)]
    pub holder: Box<Person>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "athletes", table = "athletes", alias = "a")]
pub struct Athlete {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub name: String,
    #[resource(attr)]
    pub age: i64,
    #[resource(attr = "secret,nofilter")]
    pub secret: String,
    #[resource(belongs_to)]
    pub club: Option<Box<Club>>,
}

#[derive(Resource, Debug, Clone, Default, PartialEq)]
#[resource(name = "clubs", table = "clubs")]
pub struct Club {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub name: String,
}

#[derive(Resource, Debug, Default)]
pub struct NoId {
    #[resource(attr)]
    pub name: String,
}

#[derive(Resource, Debug, Default)]
pub struct TwoExpiring {
    #[resource(id)]
    pub id: u64,
    #[resource(expires)]
    pub ends_at: Option<DateTime<Utc>>,
    #[resource(expires)]
    pub purge_at: Option<DateTime<Utc>>,
}

#[derive(Resource, Debug, Default)]
#[resource(table = "bad", alias = "bad")]
pub struct BadAlias {
    #[resource(id)]
    pub id: u64,
}

#[derive(Resource, Debug, Default)]
pub struct BadOption {
    #[resource(id)]
    pub id: u64,
    #[resource(attr = "name,fk:owner")]
    pub name: String,
}

#[derive(Resource, Debug, Default)]
pub struct NamedAttr {
    #[resource(id)]
    pub id: u64,
    #[resource(attr)]
    pub tags: Vec<String>,
}

#[derive(Resource, Debug, Default)]
pub struct FloatId {
    #[resource(id)]
    pub id: f64,
}

#[derive(Resource, Debug, Default)]
pub struct DupWire {
    #[resource(id)]
    pub id: u64,
    #[resource(attr = "label")]
    pub first: String,
    #[resource(attr = "label")]
    pub second: String,
}

#[derive(Resource, Debug, Default)]
pub struct Tagged {
    #[resource(id)]
    pub id: u64,
    #[resource(many2many = "tags")]
    pub tags: Vec<Category>,
}

#[derive(Resource, Debug, Default)]
pub struct Orphan {
    #[resource(id)]
    pub id: u64,
    #[resource(has)]
    pub authors: Vec<Author>,
}

#[derive(Resource, Debug, Default)]
pub struct SharedColumn {
    #[resource(id)]
    pub id: u64,
    #[resource(attr = "a,column:shared")]
    pub a: String,
    #[resource(attr = "b,column:shared")]
    pub b: String,
}

#[derive(Resource, Debug, Default)]
pub struct ShadowedForeignKey {
    #[resource(id)]
    pub id: u64,
    #[resource(attr = "club-ref,column:club_id")]
    pub club_ref: u64,
    #[resource(belongs_to)]
    pub club: Box<Club>,
}

#[derive(Resource, Debug, Default)]
pub struct ShadowedRelation {
    #[resource(id)]
    pub id: u64,
    #[resource(attr = "club-name,column:club")]
    pub club_name: String,
    #[resource(belongs_to)]
    pub club: Box<Club>,
}

#[derive(Resource, Debug, Default)]
pub struct BoxedHasOne {
    #[resource(id)]
    pub id: u64,
    #[resource(has = "passport,fk:holder")]
    pub passport: Box<Passport>,
}
