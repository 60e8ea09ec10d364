//! Search query language.

mod builder;
mod criteria;

pub use builder::SearchQueryBuilder;
pub use criteria::SearchCriteria;
