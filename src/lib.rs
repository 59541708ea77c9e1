//! Map a function over a slice with a small fixed pool of workers.
//!
//! The first chunk runs on the calling thread and at most two more run on
//! background workers, so a call never uses more than three execution
//! contexts by default. Results always come back in input order.
//!
//! ```
//! use chunkmap::map_parallel;
//!
//! let items: Vec<i64> = (1..=7).collect();
//! let squares = map_parallel(|x| x * x, &items);
//! assert_eq!(squares, vec![1, 4, 9, 16, 25, 36, 49]);
//! ```

pub mod chunking;
pub mod io;
pub mod ops;
pub mod parallel;

pub use chunking::ChunkPlan;
pub use parallel::{
    map_parallel, try_map_parallel, ChunkMapper, MapperConfig, DEFAULT_MAX_CONTEXTS,
};
