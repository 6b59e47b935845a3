mod json_translator;

pub use json_translator::{DohJsonRecord, DohJsonResponse, JsonTranslator};
