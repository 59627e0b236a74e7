//! Filter, sort and pagination builders. They consult only field descriptors
//! and emit into any `QueryTarget`.

pub mod expr;
pub mod filter;
pub mod page;
pub mod params;
pub mod sort;
pub mod statement;

pub use expr::{ColumnRef, CompareOp, Expr};
pub use filter::{FilterMap, FilterOp};
pub use page::Page;
pub use params::QueryParams;
pub use sort::{Direction, SortKey};
pub use statement::{QueryTarget, SelectQuery};
