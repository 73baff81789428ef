//! Markdown import and export of notes.

pub mod note_parser;
pub mod note_serializer;

pub use note_parser::parse_note;
pub use note_serializer::serialize_note;
