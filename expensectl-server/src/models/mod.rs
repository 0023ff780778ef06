//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod amount;
pub mod fields;
pub mod pagination;
pub mod username;
pub mod validation;

pub use amount::{validate_count, validate_money, validate_serving};
pub use fields::{ApiKeyName, CategoryName, Comment, Description, Product, TemplateDescription, TemplateName, Vendor};
pub use pagination::{PageResponse, Paginated, Pagination, PaginationParams};
pub use username::Username;
pub use validation::ValidationError;
