pub mod consistency;
pub mod errors;
pub mod reconstruct;
pub mod rows;
pub mod truthiness;
pub mod value;

pub use consistency::GroupingWarning;
pub use errors::MappingError;
pub use reconstruct::{reconstruct, reconstruct_with_report, Reconstruction};
pub use rows::RowTable;
pub use truthiness::is_truthy;
pub use value::{BindingValue, OutputObject, OutputValue};
