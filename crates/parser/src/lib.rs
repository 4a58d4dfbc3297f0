pub mod links;
pub mod scope;

pub use links::extract_links;
pub use scope::ScopeFilter;
