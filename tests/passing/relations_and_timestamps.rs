use chrono::{DateTime, Utc};
use resmap::*;

#[derive(Resource, Debug, Default, PartialEq)]
#[resource(name = "shelves", table = "shelves")]
struct Shelf {
    #[resource(id)]
    id: u64,
    #[resource(attr)]
    name: String,
    #[resource(has = "books,fk:shelf")]
    books: Vec<Book>,
}

#[derive(Resource, Debug, Default, PartialEq)]
#[resource(name = "books", table = "books")]
struct Book {
    #[resource(id)]
    id: u64,
    #[resource(attr)]
    title: String,
    #[resource(attr = "pages,default:0,nosort")]
    pages: i32,
    #[resource(belongs_to)]
    shelf: Option<Box<Shelf>>,
    #[resource(created = "created-at")]
    created_at: DateTime<Utc>,
    #[resource(expires = "returned-at,omitempty")]
    returned_at: Option<DateTime<Utc>>,
}

fn main() {
    let registry = Registry::new();
    registry.register::<Shelf>().unwrap();
    let repo = Repository::new(&registry, MemoryStorage::new(), PaginationConfig::default());
    let shelf = repo.insert(&Shelf { name: "fiction".to_string(), ..Default::default() }).unwrap();
    let book = Book { title: "Dune".to_string(), shelf: Some(Box::new(Shelf { id: shelf.id, ..Default::default() })), ..Default::default() };
    let stored = repo.insert(&book).unwrap();
    let shelf: Shelf = repo.get(shelf.id).unwrap();
    assert_eq!(shelf.books.iter().map(|b| b.id).collect::<Vec<_>>(), vec![stored.id]);
}
