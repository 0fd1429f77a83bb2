mod catalog;
mod resolver;

pub use catalog::{CatalogError, LISTENING_SECTIONS, READING_SECTIONS, SectionCatalog, parse_table};
pub use resolver::{QuestionLayout, SectionResolver};
