mod extractor;

pub use extractor::FactExtractor;
