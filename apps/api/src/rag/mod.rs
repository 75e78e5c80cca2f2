// Retrieval over past evaluations: the on-disk index and the lessons it
// feeds back into the next generation prompt.

pub mod classify;
pub mod handlers;
pub mod indexer;
pub mod retriever;
