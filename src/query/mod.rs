pub mod constructor;
pub mod errors;
pub mod parameters;
pub mod shape;
pub mod sparql;

pub use constructor::{
    build_count_query, build_items_query, ItemQueryConstructor, PageQueryConstructor,
};
pub use errors::QueryError;
pub use parameters::{QueryParameters, DEFAULT_MAX_PAGE_SIZE};
pub use shape::{check_query, get_query_projection, Projection, QueryShape};
