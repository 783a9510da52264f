//! A small directed graph, used to represent a committed [`GraphSpec`](chimera_protocol)
//! and to check it for cycles before it is accepted.

mod util;
pub use util::*;

mod graph;
pub use graph::*;

mod finalized;
pub use finalized::*;
