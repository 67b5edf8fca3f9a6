use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use sysinfo::Disks;

use super::DiskSample;
use crate::error::{MonitorError, Result};

#[async_trait]
pub trait DiskProbe: Send + Sync {
    /// Mounted, ready volumes in enumeration order.
    async fn sample_disks(&self) -> Result<Vec<DiskSample>>;
}

pub struct SysinfoDiskProbe {
    disks: Arc<Mutex<Disks>>,
}

impl SysinfoDiskProbe {
    pub fn new() -> Self {
        Self {
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
        }
    }
}

impl Default for SysinfoDiskProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiskProbe for SysinfoDiskProbe {
    async fn sample_disks(&self) -> Result<Vec<DiskSample>> {
        let disks = Arc::clone(&self.disks);

        // statvfs on a hung network mount can block for a long time
        tokio::task::spawn_blocking(move || {
            let mut disks = disks.lock();
            disks.refresh(true);

            disks
                .iter()
                // a volume without capacity is not ready (empty optical drive, stale mount)
                .filter(|disk| disk.total_space() > 0)
                .map(|disk| DiskSample {
                    name: disk.mount_point().to_string_lossy().to_string(),
                    total_bytes: disk.total_space(),
                    available_bytes: disk.available_space(),
                })
                .collect()
        })
        .await
        .map_err(|e| MonitorError::probe("disk", format!("disk refresh task failed: {e}")))
    }
}
