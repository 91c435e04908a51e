//! Linux fanotify source
//!
//! Unlike inotify, fanotify reports the pid behind every access, which is
//! what makes per-process attribution possible. The mark covers the whole
//! mount holding the root; the classifier drops everything outside the root.
//!
//! fd-based fanotify only reports content events, so this source contributes
//! writes. Creates, renames and deletes come from the notify source.
//!
//! Requires CAP_SYS_ADMIN.

use super::EventSource;
use crate::lookup::read_comm;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use fsaudit_core::{EventKind, RawEvent, SourceTag};
use nix::errno::Errno;
use nix::sys::fanotify::{EventFFlags, Fanotify, InitFlags, MarkFlags, MaskFlags};
use std::os::fd::AsRawFd;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sleep between reads when the queue is empty
const IDLE_POLL: Duration = Duration::from_millis(50);

/// fanotify reader thread feeding the pipeline
pub struct FanotifySource {
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl FanotifySource {
    /// Initialize fanotify, mark the mount holding `root` and start reading
    pub fn start(root: &Path, pipeline: Arc<Pipeline>) -> Result<Self> {
        let group = Fanotify::init(
            InitFlags::FAN_CLASS_NOTIF | InitFlags::FAN_CLOEXEC | InitFlags::FAN_NONBLOCK,
            EventFFlags::O_RDONLY | EventFFlags::O_LARGEFILE | EventFFlags::O_CLOEXEC,
        )
        .context("fanotify_init failed (CAP_SYS_ADMIN required)")?;

        group
            .mark(
                MarkFlags::FAN_MARK_ADD | MarkFlags::FAN_MARK_MOUNT,
                MaskFlags::FAN_MODIFY | MaskFlags::FAN_CLOSE_WRITE,
                None,
                Some(root),
            )
            .with_context(|| format!("fanotify_mark failed for {}", root.display()))?;

        let stop = Arc::new(AtomicBool::new(false));
        let reader = {
            let stop = Arc::clone(&stop);
            thread::Builder::new()
                .name("fanotify".to_string())
                .spawn(move || read_loop(group, pipeline, stop))
                .context("Failed to spawn fanotify reader")?
        };

        info!("Watching {} (fanotify)", root.display());

        Ok(Self {
            stop,
            reader: Some(reader),
        })
    }
}

impl EventSource for FanotifySource {
    fn name(&self) -> &'static str {
        "fanotify"
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("fanotify reader panicked");
            }
        }
    }
}

impl Drop for FanotifySource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop(group: Fanotify, pipeline: Arc<Pipeline>, stop: Arc<AtomicBool>) {
    let own_pid = std::process::id();

    while !stop.load(Ordering::Relaxed) {
        let events = match group.read_events() {
            Ok(events) => events,
            Err(Errno::EAGAIN) => {
                thread::sleep(IDLE_POLL);
                continue;
            }
            Err(Errno::EINTR) => continue,
            Err(e) => {
                warn!("fanotify read failed, source stopped: {}", e);
                return;
            }
        };

        for event in events {
            if !event.check_version() {
                continue;
            }
            if event.mask().contains(MaskFlags::FAN_Q_OVERFLOW) {
                warn!("fanotify queue overflow, events were lost");
                continue;
            }

            let Some(fd) = event.fd() else { continue };
            let Ok(pid) = u32::try_from(event.pid()) else { continue };
            if pid == own_pid {
                continue;
            }

            let path = match std::fs::read_link(format!("/proc/self/fd/{}", fd.as_raw_fd())) {
                Ok(path) => path,
                Err(e) => {
                    debug!("Failed to resolve fanotify fd for pid {}: {}", pid, e);
                    continue;
                }
            };

            // The name is read now, while the process is still alive; it may
            // be gone by the time the burst settles.
            let raw = RawEvent::new(EventKind::Write, pid, path.to_string_lossy(), SourceTag::Fanotify);
            pipeline.ingest_attributed(raw, |pid| read_comm(pid).ok());
        }
    }

    debug!("fanotify reader stopped");
}
