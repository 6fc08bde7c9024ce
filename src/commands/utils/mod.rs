pub mod head_tail;

pub use head_tail::*;
