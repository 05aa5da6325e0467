pub mod builder;
pub mod layout;
pub mod loop_pair;
pub mod plan;

pub use builder::{generate_quine, Quine};
pub use layout::QuineLayout;
pub use loop_pair::{generate_quine_loop, QuineLoop};
pub use plan::{RepeatBlock, R4};
