//! # Algorithms Module
//!
//! Pure, I/O-free pieces of the read pipeline: cursor encoding,
//! merge/dedup/paginate, reaction and thread reconciliation, blended time.

pub mod blend;
pub mod cursor;
pub mod merge;
pub mod reconcile;

pub use blend::blended_created_at;
pub use cursor::{decode_millis, decode_time, encode_millis, encode_time, resolve_window};
pub use merge::{dedup_first_seen, merge_page, sort_by_cursor_desc};
pub use reconcile::{concat_uniq, merge_reactions, merge_threads};
