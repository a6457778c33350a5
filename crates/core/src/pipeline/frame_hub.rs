use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::capture::domain::frame_source::FrameSource;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::shared::constants::{BROADCAST_CAPACITY, FRAME_CHANNEL_CAPACITY};
use crate::shared::frame::Frame;

pub struct HubConfig {
    /// Capture thread → pipeline thread handoff depth.
    pub frame_channel_capacity: usize,
    /// Encoded-chunk fanout depth per subscriber.
    pub broadcast_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            frame_channel_capacity: FRAME_CHANNEL_CAPACITY,
            broadcast_capacity: BROADCAST_CAPACITY,
        }
    }
}

/// Single owner of the capture device, fanning encoded chunks out to any
/// number of subscribers.
///
/// Layout: `capture thread → bounded channel → pipeline thread → broadcast`.
/// Capture and inference overlap, and a slow detection pass never blocks
/// the device grab loop. HTTP clients never touch the device: each
/// subscription is an independent, read-only sequence of encoded chunks.
///
/// When the source signals end-of-stream the pipeline thread drops the
/// last broadcast sender, which closes every subscriber's stream. A
/// subscriber that lags past `broadcast_capacity` skips to the newest
/// chunk; with multipart-replace delivery that is invisible to the viewer.
pub struct FrameHub {
    publisher: Arc<Mutex<Option<broadcast::Sender<Bytes>>>>,
    stop: Arc<AtomicBool>,
    frame_channel_capacity: usize,
    capture_handle: Mutex<Option<JoinHandle<()>>>,
    process_handle: Mutex<Option<JoinHandle<()>>>,
}

impl FrameHub {
    pub fn new(config: HubConfig) -> Self {
        let (tx, _) = broadcast::channel(config.broadcast_capacity);
        Self {
            publisher: Arc::new(Mutex::new(Some(tx))),
            stop: Arc::new(AtomicBool::new(false)),
            frame_channel_capacity: config.frame_channel_capacity,
            capture_handle: Mutex::new(None),
            process_handle: Mutex::new(None),
        }
    }

    /// A fresh subscription. Chunks published before this call are not
    /// replayed. Once the pipeline has terminated, the receiver reports
    /// closed immediately.
    pub fn subscribe(&self) -> broadcast::Receiver<Bytes> {
        match &*self.publisher.lock().unwrap() {
            Some(tx) => tx.subscribe(),
            None => closed_receiver(),
        }
    }

    /// Whether the pipeline is still publishing.
    pub fn is_live(&self) -> bool {
        self.publisher.lock().unwrap().is_some()
    }

    /// Spawns the capture and pipeline threads. Call once.
    pub fn start(&self, source: Box<dyn FrameSource>, processor: FrameProcessor) {
        let mut capture_handle = self.capture_handle.lock().unwrap();
        if capture_handle.is_some() {
            return;
        }

        let (frame_tx, frame_rx) = crossbeam_channel::bounded(self.frame_channel_capacity);
        *capture_handle = Some(spawn_capture(source, frame_tx, self.stop.clone()));
        *self.process_handle.lock().unwrap() = Some(spawn_process(
            processor,
            frame_rx,
            self.publisher.clone(),
            self.stop.clone(),
        ));
    }

    /// Signals both threads and waits for them to finish. Subscribers see
    /// their streams close.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        for handle in [&self.capture_handle, &self.process_handle] {
            if let Some(h) = handle.lock().unwrap().take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for FrameHub {
    fn drop(&mut self) {
        self.stop();
    }
}

fn closed_receiver() -> broadcast::Receiver<Bytes> {
    let (tx, rx) = broadcast::channel(1);
    drop(tx);
    rx
}

fn spawn_capture(
    mut source: Box<dyn FrameSource>,
    frame_tx: crossbeam_channel::Sender<Frame>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            let Some(frame) = source.read() else {
                log::info!("capture source ended");
                break;
            };
            if frame_tx.send(frame).is_err() {
                break;
            }
        }
        source.close();
    })
}

fn spawn_process(
    mut processor: FrameProcessor,
    frame_rx: crossbeam_channel::Receiver<Frame>,
    publisher: Arc<Mutex<Option<broadcast::Sender<Bytes>>>>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let Some(tx) = publisher.lock().unwrap().clone() else {
            return;
        };

        for frame in frame_rx {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let index = frame.index();
            match processor.process(frame) {
                // A send error only means no subscriber is connected right now
                Ok(chunk) => {
                    let _ = tx.send(chunk);
                }
                Err(e) => log::warn!("dropping frame {index}: {e}"),
            }
        }

        // Dropping the last sender closes every subscriber's stream
        publisher.lock().unwrap().take();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::infrastructure::test_pattern_source::TestPatternSource;
    use crate::detection::domain::face_scanner::FaceScanner;
    use crate::detection::domain::region_detector::RegionDetector;
    use crate::encode::jpeg_encoder::JpegEncoder;
    use crate::shared::region::Region;

    struct StubDetector(Vec<Region>);

    impl RegionDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    /// Fails on the given (0-based) invocation, succeeds otherwise.
    struct FailNthDetector {
        fail_on: usize,
        calls: usize,
    }

    impl RegionDetector for FailNthDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            let call = self.calls;
            self.calls += 1;
            if call == self.fail_on {
                Err("injected failure".into())
            } else {
                Ok(vec![])
            }
        }
    }

    fn stub_processor() -> FrameProcessor {
        let scanner = FaceScanner::new(
            Box::new(StubDetector(vec![Region::new(2, 2, 8, 8)])),
            Box::new(StubDetector(vec![])),
            1,
        )
        .unwrap();
        FrameProcessor::new(scanner, JpegEncoder::default())
    }

    async fn collect_until_closed(rx: &mut broadcast::Receiver<Bytes>) -> Vec<Bytes> {
        let mut chunks = Vec::new();
        loop {
            match rx.recv().await {
                Ok(chunk) => chunks.push(chunk),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return chunks,
            }
        }
    }

    #[tokio::test]
    async fn test_bounded_source_delivers_every_frame_then_closes() {
        let hub = FrameHub::new(HubConfig::default());
        let mut rx = hub.subscribe();
        hub.start(
            Box::new(TestPatternSource::with_frame_limit(32, 24, 3)),
            stub_processor(),
        );

        let chunks = collect_until_closed(&mut rx).await;
        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert_eq!(&chunk[..2], &[0xFF, 0xD8], "chunk is not a JPEG");
        }
    }

    #[tokio::test]
    async fn test_per_frame_error_drops_frame_but_stream_continues() {
        let scanner = FaceScanner::new(
            Box::new(FailNthDetector {
                fail_on: 1,
                calls: 0,
            }),
            Box::new(StubDetector(vec![])),
            1,
        )
        .unwrap();
        let processor = FrameProcessor::new(scanner, JpegEncoder::default());

        let hub = FrameHub::new(HubConfig::default());
        let mut rx = hub.subscribe();
        hub.start(
            Box::new(TestPatternSource::with_frame_limit(32, 24, 3)),
            processor,
        );

        let chunks = collect_until_closed(&mut rx).await;
        // Frame 1 failed detection and produced no chunk
        assert_eq!(chunks.len(), 2);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_get_all_chunks() {
        let hub = FrameHub::new(HubConfig::default());
        let mut rx_a = hub.subscribe();
        let mut rx_b = hub.subscribe();
        hub.start(
            Box::new(TestPatternSource::with_frame_limit(32, 24, 3)),
            stub_processor(),
        );

        assert_eq!(collect_until_closed(&mut rx_a).await.len(), 3);
        assert_eq!(collect_until_closed(&mut rx_b).await.len(), 3);
    }

    #[tokio::test]
    async fn test_subscribe_after_end_is_closed() {
        let hub = FrameHub::new(HubConfig::default());
        let mut rx = hub.subscribe();
        hub.start(
            Box::new(TestPatternSource::with_frame_limit(32, 24, 1)),
            stub_processor(),
        );
        let _ = collect_until_closed(&mut rx).await;

        assert!(!hub.is_live());
        let mut late = hub.subscribe();
        assert!(matches!(
            late.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_stop_terminates_unbounded_stream() {
        let hub = FrameHub::new(HubConfig::default());
        let mut rx = hub.subscribe();
        hub.start(Box::new(TestPatternSource::new(32, 24)), stub_processor());

        // At least one chunk arrives, proving the pipeline is running
        assert!(rx.recv().await.is_ok());
        hub.stop();
        let _ = collect_until_closed(&mut rx).await;
        assert!(!hub.is_live());
    }
}
