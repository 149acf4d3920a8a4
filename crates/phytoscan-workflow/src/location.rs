//! Background location lookup whose result is merged only if already done.

use std::sync::Arc;

use futures::FutureExt;
use phytoscan_core::LocationData;
use phytoscan_sync::{LocationError, LocationProvider};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

enum Slot {
    Running(JoinHandle<Result<LocationData, LocationError>>),
    Resolved(Option<LocationData>),
}

/// A location lookup running beside the session. Never awaited by the
/// workflow; dropped tasks are aborted.
pub struct LocationTask {
    slot: Slot,
}

impl LocationTask {
    pub fn spawn(provider: Arc<dyn LocationProvider>) -> Self {
        let handle = tokio::spawn(async move { provider.locate().await });
        Self {
            slot: Slot::Running(handle),
        }
    }

    /// The fix, if the lookup has already finished successfully.
    pub fn poll_ready(&mut self) -> Option<&LocationData> {
        if let Slot::Running(handle) = &mut self.slot {
            let Some(joined) = handle.now_or_never() else {
                return None;
            };
            let fix = match joined {
                Ok(Ok(fix)) => {
                    debug!(latitude = fix.latitude, longitude = fix.longitude, source = %fix.source, "location resolved");
                    Some(fix)
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "location unavailable; continuing without it");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "location task did not complete");
                    None
                }
            };
            self.slot = Slot::Resolved(fix);
        }
        match &self.slot {
            Slot::Resolved(fix) => fix.as_ref(),
            Slot::Running(_) => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.slot, Slot::Running(_))
    }

    pub fn abort(&mut self) {
        if let Slot::Running(handle) = &self.slot {
            handle.abort();
            debug!("location task aborted");
        }
        self.slot = Slot::Resolved(None);
    }
}

impl Drop for LocationTask {
    fn drop(&mut self) {
        if let Slot::Running(handle) = &self.slot {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use phytoscan_core::LocationSource;
    use phytoscan_sync::FixedLocation;

    use super::*;

    struct SlowLocation(Duration);

    #[async_trait]
    impl LocationProvider for SlowLocation {
        async fn locate(&self) -> Result<LocationData, LocationError> {
            tokio::time::sleep(self.0).await;
            Ok(LocationData::new(1.0, 2.0, LocationSource::DeviceGps))
        }
    }

    struct DeniedLocation;

    #[async_trait]
    impl LocationProvider for DeniedLocation {
        async fn locate(&self) -> Result<LocationData, LocationError> {
            Err(LocationError::Denied)
        }
    }

    #[tokio::test]
    async fn finished_lookup_is_merged() {
        let fix = LocationData::new(14.6, 121.0, LocationSource::Exif);
        let mut task = LocationTask::spawn(Arc::new(FixedLocation(fix.clone())));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(task.poll_ready(), Some(&fix));
        // Stays resolved.
        assert!(!task.is_pending());
        assert_eq!(task.poll_ready(), Some(&fix));
    }

    #[tokio::test]
    async fn pending_lookup_does_not_block() {
        let mut task = LocationTask::spawn(Arc::new(SlowLocation(Duration::from_secs(60))));
        assert!(task.poll_ready().is_none());
        assert!(task.is_pending());
        task.abort();
        assert!(!task.is_pending());
        assert!(task.poll_ready().is_none());
    }

    #[tokio::test]
    async fn failed_lookup_resolves_to_nothing() {
        let mut task = LocationTask::spawn(Arc::new(DeniedLocation));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(task.poll_ready().is_none());
        assert!(!task.is_pending());
    }
}
