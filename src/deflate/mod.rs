pub mod inflate;
pub mod lz77;
pub mod tables;
pub mod tokens;

pub use inflate::{inflate, Inflater};
pub use lz77::{tokenize, MatchParams};
pub use tokens::Token;
