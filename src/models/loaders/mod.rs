pub mod csv_loader;

pub use csv_loader::{describe_layout, load_quiz_export, parse_quiz_export};
