mod fact;

pub use fact::{Atom, Fact, INDEX_FIELD_NAME};
