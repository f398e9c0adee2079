pub mod document_writer;
pub mod failure_log;
pub mod latex_text;
pub mod markup_converter;
pub mod section_builder;
pub mod template;

pub use document_writer::{sanitize_filename, DocumentWriter};
pub use failure_log::{FailureLog, FailureStage};
pub use markup_converter::MarkupConverter;
pub use section_builder::SectionBuilder;
pub use template::DocumentTemplate;
