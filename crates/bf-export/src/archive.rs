//! Streamed ZIP export of an event's artifacts.
//!
//! Fetches run on a bounded pool and complete in list order. Each fetched
//! entry is handed to a ZIP writer on the blocking pool, which pushes
//! compressed chunks through a bounded channel to the response body. Nothing
//! is buffered beyond one pool's worth of entries and one output chunk.

use std::io::{self, Write};
use std::pin::Pin;
use std::sync::Arc;

use bf_core::config::ExportConfig;
use bf_core::{Artifact, Error, EventId, Result};
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::fetcher::Fetch;

/// Output chunk size pushed to the body.
const CHUNK_SIZE: usize = 64 * 1024;
/// Chunks buffered between the writer and the body.
const CHUNK_CHANNEL_CAPACITY: usize = 8;

/// Archive body: compressed chunks, or an I/O error that aborts the stream.
pub type ArchiveStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Entry name: `{position:03}_{kind}_{id8}.{ext}` with a 1-based position.
pub fn entry_name(position: usize, artifact: &Artifact) -> String {
    format!(
        "{position:03}_{}_{}.{}",
        artifact.kind,
        artifact.id.short(),
        artifact.extension()
    )
}

struct Entry {
    name: String,
    bytes: Bytes,
}

pub struct ArchiveStreamer {
    fetcher: Arc<dyn Fetch>,
    concurrency: usize,
    compression_level: i64,
}

impl ArchiveStreamer {
    pub fn new(fetcher: Arc<dyn Fetch>, config: &ExportConfig) -> Self {
        Self {
            fetcher,
            concurrency: config.concurrency.max(1),
            compression_level: i64::from(config.compression_level.clamp(0, 9)),
        }
    }

    /// Start streaming an archive of `artifacts` (already newest first).
    ///
    /// Returns [`Error::NothingToExport`] before any stream exists when the
    /// list is empty. After that, fetch failures only skip their entry.
    pub fn stream(&self, event_id: EventId, artifacts: Vec<Artifact>) -> Result<ArchiveStream> {
        if artifacts.is_empty() {
            return Err(Error::NothingToExport(event_id.to_string()));
        }

        let total = artifacts.len();
        let (entry_tx, entry_rx) = mpsc::channel::<Entry>(self.concurrency);
        let (chunk_tx, chunk_rx) = mpsc::channel::<io::Result<Bytes>>(CHUNK_CHANNEL_CAPACITY);

        let fetcher = Arc::clone(&self.fetcher);
        let concurrency = self.concurrency;
        tokio::spawn(async move {
            let mut fetches = stream::iter(artifacts.into_iter().enumerate())
                .map(|(i, artifact)| {
                    let fetcher = Arc::clone(&fetcher);
                    async move {
                        let result = fetcher.fetch(&artifact.public_url).await;
                        (i + 1, artifact, result)
                    }
                })
                .buffered(concurrency);

            let mut skipped = 0usize;
            while let Some((position, artifact, result)) = fetches.next().await {
                match result {
                    Ok(bytes) => {
                        let entry = Entry {
                            name: entry_name(position, &artifact),
                            bytes,
                        };
                        if entry_tx.send(entry).await.is_err() {
                            tracing::debug!(%event_id, "Archive writer stopped; abandoning fetches");
                            return;
                        }
                    }
                    Err(e) => {
                        skipped += 1;
                        tracing::warn!(
                            %event_id,
                            artifact_id = %artifact.id,
                            url = %artifact.public_url,
                            reason = %e,
                            "Skipping artifact in export"
                        );
                    }
                }
            }
            tracing::debug!(%event_id, total, skipped, "All export fetches attempted");
        });

        let level = self.compression_level;
        tokio::task::spawn_blocking(move || {
            let error_tx = chunk_tx.clone();
            match write_archive(entry_rx, ChannelWriter::new(chunk_tx), level) {
                Ok(written) => {
                    tracing::info!(%event_id, total, written, "Archive finalized");
                }
                Err(e) => {
                    tracing::warn!(%event_id, error = %e, "Archive stream aborted");
                    let _ = error_tx.blocking_send(Err(e));
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(chunk_rx)))
    }
}

/// Drain entries into a streaming ZIP; returns the number of entries written.
fn write_archive(
    mut entries: mpsc::Receiver<Entry>,
    sink: ChannelWriter,
    level: i64,
) -> io::Result<usize> {
    // Deflate accepts 1..=9; level 0 stores entries as-is.
    let options = if level == 0 {
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
    } else {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(level))
    };

    let mut zip = ZipWriter::new_stream(sink);
    let mut written = 0;
    while let Some(entry) = entries.blocking_recv() {
        zip.start_file(entry.name.as_str(), options)
            .map_err(io::Error::other)?;
        zip.write_all(&entry.bytes)?;
        written += 1;
    }
    let mut sink = zip.finish().map_err(io::Error::other)?.into_inner();
    sink.flush()?;
    Ok(written)
}

/// `Write` adapter that forwards fixed-size chunks into an async channel.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: Vec<u8>,
}

impl ChannelWriter {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE)));
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive receiver dropped"))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        // Accept at most one chunk's worth so no output chunk exceeds CHUNK_SIZE.
        let take = data.len().min(CHUNK_SIZE - self.buf.len());
        self.buf.extend_from_slice(&data[..take]);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(take)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchError, FetchResult};
    use async_trait::async_trait;
    use bf_core::{artifact, ArtifactId, ArtifactKind};
    use std::collections::HashMap;
    use std::io::{Cursor, Read};
    use std::time::Duration;

    /// Serves canned results keyed by URL, with an optional per-URL delay.
    struct FakeFetcher {
        results: HashMap<String, (Duration, std::result::Result<Vec<u8>, u16>)>,
    }

    #[async_trait]
    impl Fetch for FakeFetcher {
        async fn fetch(&self, url: &str) -> FetchResult {
            match self.results.get(url) {
                Some((delay, result)) => {
                    tokio::time::sleep(*delay).await;
                    match result {
                        Ok(bytes) => Ok(Bytes::from(bytes.clone())),
                        Err(status) => Err(FetchError::Status(*status)),
                    }
                }
                None => Err(FetchError::Transport("unknown url".into())),
            }
        }
    }

    fn make_artifact(event_id: EventId, kind: ArtifactKind) -> Artifact {
        let id = ArtifactId::new();
        let key = artifact::storage_key(event_id, kind, id);
        Artifact {
            id,
            event_id,
            session_id: None,
            kind,
            public_url: format!("http://media/{key}"),
            storage_key: key,
            thumbnail_url: None,
            created_at: chrono::Utc::now(),
        }
    }

    async fn collect(stream: ArchiveStream) -> Vec<u8> {
        let chunks: Vec<io::Result<Bytes>> = stream.collect().await;
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    fn read_entries(zip_bytes: Vec<u8>) -> Vec<(String, Vec<u8>)> {
        let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
        (0..archive.len())
            .map(|i| {
                let mut file = archive.by_index(i).unwrap();
                let mut data = Vec::new();
                file.read_to_end(&mut data).unwrap();
                (file.name().unwrap().to_string(), data)
            })
            .collect()
    }

    #[test]
    fn entry_names() {
        let event_id = EventId::new();
        let gif = make_artifact(event_id, ArtifactKind::Boomerang);
        let name = entry_name(7, &gif);
        assert_eq!(name, format!("007_boomerang_{}.gif", gif.id.short()));
        assert_eq!(name.len(), "007_boomerang_".len() + 8 + ".gif".len());

        let mut odd = make_artifact(event_id, ArtifactKind::Single);
        odd.storage_key = "legacy/photo.png".into();
        assert!(entry_name(12, &odd).ends_with(".png"));
        odd.storage_key = "legacy/photo".into();
        assert!(entry_name(12, &odd).ends_with(".jpg"));
    }

    #[tokio::test]
    async fn empty_list_is_nothing_to_export() {
        let streamer = ArchiveStreamer::new(
            Arc::new(FakeFetcher {
                results: HashMap::new(),
            }),
            &ExportConfig::default(),
        );
        let err = streamer.stream(EventId::new(), Vec::new()).err().unwrap();
        assert!(matches!(err, Error::NothingToExport(_)));
        assert_eq!(err.code(), "nothing_to_export");
    }

    #[tokio::test]
    async fn failed_fetches_are_skipped_in_order() {
        let event_id = EventId::new();
        let kinds = [
            ArtifactKind::Single,
            ArtifactKind::Strip,
            ArtifactKind::Gif,
            ArtifactKind::Ai,
            ArtifactKind::Filtered,
            ArtifactKind::Boomerang,
        ];
        let artifacts: Vec<Artifact> = kinds.iter().map(|k| make_artifact(event_id, *k)).collect();

        // Positions 2 and 5 fail; early entries finish last.
        let mut results = HashMap::new();
        for (i, a) in artifacts.iter().enumerate() {
            let delay = Duration::from_millis(((6 - i) * 10) as u64);
            let result = if i == 1 || i == 4 {
                Err(502)
            } else {
                Ok(format!("payload-{i}").into_bytes())
            };
            results.insert(a.public_url.clone(), (delay, result));
        }

        let streamer = ArchiveStreamer::new(
            Arc::new(FakeFetcher { results }),
            &ExportConfig {
                concurrency: 3,
                compression_level: 1,
            },
        );
        let zip_bytes = collect(streamer.stream(event_id, artifacts.clone()).unwrap()).await;
        let entries = read_entries(zip_bytes);

        assert_eq!(entries.len(), 4);
        let expected: Vec<String> = [0usize, 2, 3, 5]
            .iter()
            .map(|&i| entry_name(i + 1, &artifacts[i]))
            .collect();
        let names: Vec<String> = entries.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(names, expected);
        assert_eq!(entries[1].1, b"payload-2");
    }

    #[tokio::test]
    async fn all_failed_still_yields_valid_empty_archive() {
        let event_id = EventId::new();
        let artifacts = vec![make_artifact(event_id, ArtifactKind::Single)];
        let streamer = ArchiveStreamer::new(
            Arc::new(FakeFetcher {
                results: HashMap::new(),
            }),
            &ExportConfig::default(),
        );
        let zip_bytes = collect(streamer.stream(event_id, artifacts).unwrap()).await;
        assert!(read_entries(zip_bytes).is_empty());
    }

    #[tokio::test]
    async fn large_entries_span_many_chunks() {
        let event_id = EventId::new();
        let artifact = make_artifact(event_id, ArtifactKind::Single);
        let payload: Vec<u8> = (0..400_000u32).map(|i| (i % 251) as u8).collect();
        let mut results = HashMap::new();
        results.insert(artifact.public_url.clone(), (Duration::ZERO, Ok(payload.clone())));

        // Stored entries keep the archive larger than the payload.
        let streamer = ArchiveStreamer::new(
            Arc::new(FakeFetcher { results }),
            &ExportConfig {
                concurrency: 1,
                compression_level: 0,
            },
        );
        let stream = streamer.stream(event_id, vec![artifact]).unwrap();
        let chunks: Vec<io::Result<Bytes>> = stream.collect().await;
        assert!(chunks.len() > payload.len() / CHUNK_SIZE, "got {} chunks", chunks.len());
        assert!(chunks.iter().all(|c| c.as_ref().unwrap().len() <= CHUNK_SIZE));

        let zip_bytes: Vec<u8> = chunks.into_iter().flat_map(|c| c.unwrap().to_vec()).collect();
        assert!(zip_bytes.len() > payload.len());
        let entries = read_entries(zip_bytes);
        assert_eq!(entries[0].1, payload);
    }

    #[tokio::test]
    async fn stored_entries_round_trip_with_deflated_ones() {
        let event_id = EventId::new();
        let artifact = make_artifact(event_id, ArtifactKind::Gif);
        let mut results = HashMap::new();
        results.insert(artifact.public_url.clone(), (Duration::ZERO, Ok(b"GIF89a".to_vec())));

        for level in [0, 9] {
            let streamer = ArchiveStreamer::new(
                Arc::new(FakeFetcher {
                    results: results.clone(),
                }),
                &ExportConfig {
                    concurrency: 2,
                    compression_level: level,
                },
            );
            let zip_bytes = collect(streamer.stream(event_id, vec![artifact.clone()]).unwrap()).await;
            assert_eq!(read_entries(zip_bytes)[0].1, b"GIF89a");
        }
    }
}
