use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use dashmap::DashMap;
use log::debug;

use crate::{
    config::{PageId, PAGE_SIZE},
    error::DiskError,
};

/// Byte-level page storage driven by the disk scheduler. Both calls may block
/// on the underlying media and are only ever issued from the scheduler worker.
pub trait PageStore: Send + Sync {
    fn write_page(&self, page_id: PageId, page_data: &[u8]) -> anyhow::Result<()>;

    fn read_page(&self, page_id: PageId, page_data: &mut [u8]) -> anyhow::Result<()>;
}

fn check_len(page_id: PageId, len: usize) -> Result<(), DiskError> {
    if len < PAGE_SIZE {
        return Err(DiskError::ShortBuffer {
            page_id,
            expected: PAGE_SIZE,
            actual: len,
        });
    }
    Ok(())
}

/// Single database file, page `p` stored at offset `p * PAGE_SIZE`.
pub struct FilePageStore {
    db_io: Mutex<File>,
    path: PathBuf,
}

impl FilePageStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(DiskError::from)?;
        }

        let db_io = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(DiskError::from)?;

        debug!("opened page file {}", path.display());
        Ok(Self {
            db_io: Mutex::new(db_io),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        let db_io = self.db_io.lock().unwrap();
        db_io.sync_data().map_err(DiskError::from)?;
        Ok(())
    }

    fn offset(page_id: PageId) -> u64 {
        page_id as u64 * PAGE_SIZE as u64
    }
}

impl PageStore for FilePageStore {
    fn write_page(&self, page_id: PageId, page_data: &[u8]) -> anyhow::Result<()> {
        check_len(page_id, page_data.len())?;

        let mut db_io = self.db_io.lock().unwrap();
        db_io
            .seek(SeekFrom::Start(Self::offset(page_id)))
            .map_err(DiskError::from)?;
        db_io
            .write_all(&page_data[..PAGE_SIZE])
            .map_err(DiskError::from)?;
        db_io.flush().map_err(DiskError::from)?;

        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut [u8]) -> anyhow::Result<()> {
        check_len(page_id, page_data.len())?;
        let page_data = &mut page_data[..PAGE_SIZE];

        let mut db_io = self.db_io.lock().unwrap();
        db_io
            .seek(SeekFrom::Start(Self::offset(page_id)))
            .map_err(DiskError::from)?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            match db_io.read(&mut page_data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(DiskError::from(err).into()),
            }
        }

        // Pages past the end of the file have never been written.
        if filled < PAGE_SIZE {
            debug!("page {} read past end of file, zero filling", page_id);
            page_data[filled..].fill(0);
        }

        Ok(())
    }
}

/// Page store kept entirely in memory. Unwritten pages read back as zeros.
#[derive(Default)]
pub struct MemoryPageStore {
    pages: DashMap<PageId, Box<[u8]>>,
    num_writes: AtomicU64,
    num_reads: AtomicU64,
}

impl MemoryPageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_writes(&self) -> u64 {
        self.num_writes.load(Ordering::SeqCst)
    }

    pub fn num_reads(&self) -> u64 {
        self.num_reads.load(Ordering::SeqCst)
    }

    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.contains_key(&page_id)
    }

    /// Copy of the stored page, if it was ever written.
    pub fn page(&self, page_id: PageId) -> Option<Box<[u8]>> {
        self.pages.get(&page_id).map(|page| page.value().clone())
    }
}

impl PageStore for MemoryPageStore {
    fn write_page(&self, page_id: PageId, page_data: &[u8]) -> anyhow::Result<()> {
        check_len(page_id, page_data.len())?;

        self.pages
            .insert(page_id, page_data[..PAGE_SIZE].to_vec().into_boxed_slice());
        self.num_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_page(&self, page_id: PageId, page_data: &mut [u8]) -> anyhow::Result<()> {
        check_len(page_id, page_data.len())?;

        match self.pages.get(&page_id) {
            Some(page) => page_data[..PAGE_SIZE].copy_from_slice(page.value()),
            None => page_data[..PAGE_SIZE].fill(0),
        }
        self.num_reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
