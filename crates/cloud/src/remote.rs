//! Blocking `Read + Seek` view of a remote file over HTTP Range requests.
//!
//! The TIFF decoder seeks around the header and tile index and then reads
//! individual tiles, so reads are served from fixed-size blocks kept in an
//! LRU cache. Each `RemoteFile` owns a current-thread Tokio runtime and
//! blocks on it.

use std::io::{self, Read, Seek, SeekFrom};

use tracing::debug;

use crate::cache::BlockCache;
use crate::error::{CloudError, Result};
use crate::http::HttpClient;

/// Options for [`RemoteFile`].
#[derive(Debug, Clone)]
pub struct RemoteFileOptions {
    /// Bytes per cached block (default 512 KiB).
    pub block_size: u64,
    /// Number of blocks kept in the LRU cache (default 32).
    pub cache_blocks: usize,
}

impl Default for RemoteFileOptions {
    fn default() -> Self {
        Self {
            block_size: 512 * 1024,
            cache_blocks: 32,
        }
    }
}

pub struct RemoteFile {
    url: String,
    len: u64,
    pos: u64,
    block_size: u64,
    blocks_per_read: u64,
    cache: BlockCache,
    client: HttpClient,
    rt: tokio::runtime::Runtime,
}

impl RemoteFile {
    /// Open a remote file, issuing a HEAD request for its length.
    pub fn open(url: &str, options: RemoteFileOptions) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))?;

        let client = HttpClient::new()?;
        let head = rt.block_on(client.head(url))?;
        let len = head.content_length.ok_or_else(|| CloudError::Network(format!(
            "{} did not report a content length",
            url
        )))?;
        if !head.accept_ranges {
            debug!(url, "server did not advertise Accept-Ranges; trying ranges anyway");
        }

        Ok(Self {
            url: url.to_string(),
            len,
            pos: 0,
            block_size: options.block_size.max(1),
            // Half the cache, so blocks loaded for one read cannot evict each other
            blocks_per_read: (options.cache_blocks / 2).max(1) as u64,
            cache: BlockCache::new(options.cache_blocks),
            client,
            rt,
        })
    }

    /// Make sure every block overlapping `[start, end)` is cached.
    fn load_blocks(&mut self, start: u64, end: u64) -> Result<()> {
        let first = start / self.block_size;
        let last = (end - 1) / self.block_size;

        let missing: Vec<u64> = (first..=last).filter(|b| !self.cache.contains(*b)).collect();
        if missing.is_empty() {
            return Ok(());
        }

        let ranges: Vec<(u64, u64)> = missing
            .iter()
            .map(|&b| {
                let offset = b * self.block_size;
                (offset, self.block_size.min(self.len - offset))
            })
            .collect();

        debug!(url = %self.url, blocks = missing.len(), "fetching blocks");
        let fetched = self.rt.block_on(self.client.fetch_ranges(&self.url, &ranges))?;
        for (block, data) in missing.into_iter().zip(fetched) {
            self.cache.insert(block, data);
        }
        Ok(())
    }
}

impl Read for RemoteFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.len {
            return Ok(0);
        }

        let span_end = (self.pos / self.block_size + self.blocks_per_read) * self.block_size;
        let end = (self.pos + buf.len() as u64).min(self.len).min(span_end);
        self.load_blocks(self.pos, end)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let mut written = 0usize;
        while self.pos < end {
            let block = self.pos / self.block_size;
            let within = (self.pos - block * self.block_size) as usize;
            let data = self.cache.get(block).ok_or_else(|| {
                io::Error::new(io::ErrorKind::Other, "block evicted before it was read")
            })?;
            if within >= data.len() {
                break;
            }
            let take = (data.len() - within).min((end - self.pos) as usize);
            buf[written..written + take].copy_from_slice(&data[within..within + take]);
            written += take;
            self.pos += take as u64;
        }

        Ok(written)
    }
}

impl Seek for RemoteFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p as i128,
            SeekFrom::End(off) => self.len as i128 + off as i128,
            SeekFrom::Current(off) => self.pos as i128 + off as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of file",
            ));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }
}
