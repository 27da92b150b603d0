//! bf-export: bulk export of an event's artifacts.
//!
//! [`RemoteFetcher`] downloads one stored artifact with strict validation
//! (status, content type, redirect bound, connect and total deadlines).
//! [`ArchiveStreamer`] fetches every artifact of an event on a bounded pool,
//! skips the ones that fail, and streams a ZIP as it goes.

pub mod archive;
pub mod fetcher;

pub use archive::{entry_name, ArchiveStream, ArchiveStreamer};
pub use fetcher::{Fetch, FetchError, FetchResult, RemoteFetcher};
