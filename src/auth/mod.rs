pub mod credentials;
pub(crate) mod extractor;
