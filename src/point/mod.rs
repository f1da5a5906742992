mod types;

pub use types::{Point, RawPosition};
