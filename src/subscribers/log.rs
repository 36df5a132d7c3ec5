//! # Logging subscriber.
//!
//! [`LogWriter`] renders runtime events through `tracing`, one line per event:
//! ```text
//! INFO  launching container container=httpd
//! INFO  container launched container=httpd pid=4242
//! INFO  stopping container container=httpd
//! INFO  container stopped container=httpd exit_code=Some(0) reason="-"
//! INFO  container stopped container=httpd exit_code=None reason="signal: 9 (SIGKILL)"
//! WARN  beacon loop failed container=httpd reason="beacon delivery failed: ..."
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that logs every event via `tracing`.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let container = e.container.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ContainerLaunching => info!(container, "launching container"),
            EventKind::ContainerLaunched => info!(container, pid = ?e.pid, "container launched"),
            EventKind::ContainerStopping => info!(container, "stopping container"),
            EventKind::ContainerStopped => {
                info!(container, exit_code = ?e.exit_code, reason, "container stopped")
            }
            EventKind::BeaconFailed => warn!(container, reason, "beacon loop failed"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = container, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = container, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    async fn render(ev: Event) -> String {
        let out = Capture::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        LogWriter.on_event(&ev).await;
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[tokio::test]
    async fn stopped_without_exit_code_logs_the_reason() {
        let line = render(
            Event::new(EventKind::ContainerStopped)
                .with_container(Arc::from("httpd"))
                .with_reason("No such file or directory (os error 2)"),
        )
        .await;
        assert!(line.contains("container stopped"));
        assert!(line.contains("container=\"httpd\"") || line.contains("container=httpd"));
        assert!(line.contains("No such file or directory (os error 2)"));
    }

    #[tokio::test]
    async fn stopped_with_exit_code_logs_it() {
        let line = render(
            Event::new(EventKind::ContainerStopped)
                .with_container(Arc::from("httpd"))
                .with_exit_code(1),
        )
        .await;
        assert!(line.contains("exit_code=Some(1)"));
    }
}
