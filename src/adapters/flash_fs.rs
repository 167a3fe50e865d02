//! Flash filesystem adapter.
//!
//! Implements [`FileStorePort`] with `std::fs` under a base directory.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: the `storage` SPIFFS partition is
//!   registered with the VFS at the base path, after which `std::fs` works
//!   on it directly.  Capacity comes from `esp_spiffs_info`.
//! - **all other targets**: any host directory; `total` is the configured
//!   capacity and writes beyond it fail with [`FsError::Full`].
//!
//! A store that failed to mount is still a valid adapter: every call
//! returns [`FsError::NotMounted`] so the export path can fall back.

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{FileEntry, FileStorePort, FsError, FsUsage};

/// Partition label in `partitions.csv`.
#[cfg(target_os = "espidf")]
const PARTITION_LABEL: &core::ffi::CStr = c"storage";
#[cfg(target_os = "espidf")]
const MAX_OPEN_FILES: usize = 5;

pub struct FlashFileStore {
    base: Option<PathBuf>,
    #[cfg_attr(target_os = "espidf", allow(dead_code))]
    capacity: u64,
}

fn map_io(e: &std::io::Error) -> FsError {
    match e.kind() {
        ErrorKind::NotFound => FsError::NotFound,
        ErrorKind::AlreadyExists => FsError::AlreadyExists,
        ErrorKind::StorageFull => FsError::Full,
        _ => FsError::IoError,
    }
}

impl FlashFileStore {
    /// Mount the store at `base_path`.
    #[cfg(target_os = "espidf")]
    pub fn mount(base_path: &str, capacity_bytes: u64) -> crate::error::Result<Self> {
        use esp_idf_svc::sys::*;

        let base = std::ffi::CString::new(base_path)
            .map_err(|_| crate::error::Error::Config("fs base path contains NUL"))?;
        let conf = esp_vfs_spiffs_conf_t {
            base_path: base.as_ptr(),
            partition_label: PARTITION_LABEL.as_ptr(),
            max_files: MAX_OPEN_FILES,
            format_if_mount_failed: true,
        };
        // SAFETY: `conf` and the strings it points to outlive the call;
        // the VFS copies the base path.
        let ret = unsafe { esp_vfs_spiffs_register(&conf) };
        if ret != ESP_OK as esp_err_t {
            warn!("FlashFs: SPIFFS mount at {} failed ({})", base_path, ret);
            return Err(FsError::NotMounted.into());
        }
        info!("FlashFs: SPIFFS mounted at {}", base_path);
        Ok(Self {
            base: Some(PathBuf::from(base_path)),
            capacity: capacity_bytes,
        })
    }

    /// Use (and create if needed) a host directory as the store.
    #[cfg(not(target_os = "espidf"))]
    pub fn mount(base_path: impl AsRef<Path>, capacity_bytes: u64) -> crate::error::Result<Self> {
        let base = base_path.as_ref();
        fs::create_dir_all(base).map_err(|e| {
            warn!("FlashFs(sim): cannot create {}: {}", base.display(), e);
            FsError::NotMounted
        })?;
        info!(
            "FlashFs(sim): directory {} ({} bytes)",
            base.display(),
            capacity_bytes
        );
        Ok(Self {
            base: Some(base.to_path_buf()),
            capacity: capacity_bytes,
        })
    }

    /// A store that never mounted.
    pub fn unmounted() -> Self {
        Self {
            base: None,
            capacity: 0,
        }
    }

    pub fn base_path(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    fn base(&self) -> Result<&Path, FsError> {
        self.base.as_deref().ok_or(FsError::NotMounted)
    }

    /// Map a store-absolute name (`/x.txt`) to a host path.
    ///
    /// The store is flat: names must be a single non-empty component.
    fn resolve(&self, name: &str) -> Result<PathBuf, FsError> {
        let base = self.base()?;
        let leaf = name.strip_prefix('/').ok_or(FsError::InvalidName)?;
        if leaf.is_empty()
            || leaf == "."
            || leaf == ".."
            || leaf.contains(['/', '\\', '\0'])
        {
            return Err(FsError::InvalidName);
        }
        Ok(base.join(leaf))
    }

    #[cfg(not(target_os = "espidf"))]
    fn used_bytes(&self) -> Result<u64, FsError> {
        Ok(self.list()?.iter().map(|e| e.size).sum())
    }

    #[cfg(target_os = "espidf")]
    fn platform_usage(&self) -> Result<FsUsage, FsError> {
        use esp_idf_svc::sys::*;
        let mut total: usize = 0;
        let mut used: usize = 0;
        // SAFETY: out-pointers are valid locals.
        let ret = unsafe { esp_spiffs_info(PARTITION_LABEL.as_ptr(), &mut total, &mut used) };
        if ret != ESP_OK as esp_err_t {
            warn!("FlashFs: esp_spiffs_info failed ({})", ret);
            return Err(FsError::IoError);
        }
        Ok(FsUsage {
            used: used as u64,
            total: total as u64,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_usage(&self) -> Result<FsUsage, FsError> {
        Ok(FsUsage {
            used: self.used_bytes()?,
            total: self.capacity,
        })
    }
}

impl FileStorePort for FlashFileStore {
    fn is_ready(&self) -> bool {
        self.base.is_some()
    }

    fn create(&mut self, path: &str, parts: &[&[u8]]) -> Result<u64, FsError> {
        let target = self.resolve(path)?;
        let size: u64 = parts.iter().map(|p| p.len() as u64).sum();

        #[cfg(not(target_os = "espidf"))]
        if self.used_bytes()? + size > self.capacity {
            return Err(FsError::Full);
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .map_err(|e| map_io(&e))?;

        let written = parts
            .iter()
            .try_for_each(|part| file.write_all(part))
            .and_then(|()| file.flush());
        if let Err(e) = written {
            warn!("FlashFs: write to {} failed: {}", path, e);
            drop(file);
            let _ = fs::remove_file(&target);
            return Err(map_io(&e));
        }
        Ok(size)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|p| p.is_file())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        fs::read(self.resolve(path)?).map_err(|e| map_io(&e))
    }

    fn read_prefix(&self, path: &str, max: usize) -> Result<Vec<u8>, FsError> {
        let file = fs::File::open(self.resolve(path)?).map_err(|e| map_io(&e))?;
        let mut out = Vec::with_capacity(max);
        file.take(max as u64)
            .read_to_end(&mut out)
            .map_err(|e| map_io(&e))?;
        Ok(out)
    }

    fn delete(&mut self, path: &str) -> Result<(), FsError> {
        fs::remove_file(self.resolve(path)?).map_err(|e| map_io(&e))
    }

    fn list(&self) -> Result<Vec<FileEntry>, FsError> {
        let base = self.base()?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(base).map_err(|e| map_io(&e))? {
            let entry = entry.map_err(|e| map_io(&e))?;
            let meta = entry.metadata().map_err(|e| map_io(&e))?;
            if meta.is_dir() {
                continue;
            }
            entries.push(FileEntry {
                name: format!("/{}", entry.file_name().to_string_lossy()),
                size: meta.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn usage(&self) -> Result<FsUsage, FsError> {
        self.base()?;
        self.platform_usage()
    }
}
