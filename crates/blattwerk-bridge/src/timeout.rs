// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded calls into blocking collaborators.
//
// The call runs on its own thread and the caller waits at most `timeout`.
// A call that overruns is abandoned: its thread finishes (or hangs) in the
// background and the result, if any, is dropped.

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;
use tracing::warn;

use crate::traits::{OrientationDetector, Recognition, Recognizer};

/// Run `call` on a helper thread, giving up after `timeout`.
pub fn call_with_timeout<T, F>(timeout: Duration, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("blattwerk-engine".into())
        .spawn(move || {
            // Receiver may be gone after a timeout.
            let _ = tx.send(call());
        })
        .map_err(|err| BlattwerkError::Recognition(format!("cannot spawn engine thread: {}", err)))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(BlattwerkError::Timeout(timeout.as_millis() as u64)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(BlattwerkError::Recognition(
            "engine thread exited without a result".into(),
        )),
    }
}

/// Recognizer wrapper that bounds every call.
pub struct TimedRecognizer {
    inner: Arc<dyn Recognizer>,
    timeout: Duration,
}

impl TimedRecognizer {
    pub fn new(inner: Arc<dyn Recognizer>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl Recognizer for TimedRecognizer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn recognize(&self, image: &DynamicImage, lang_hint: &str) -> Result<Recognition> {
        let inner = Arc::clone(&self.inner);
        let image = image.clone();
        let lang_hint = lang_hint.to_string();
        call_with_timeout(self.timeout, move || inner.recognize(&image, &lang_hint)).inspect_err(
            |err| {
                if let BlattwerkError::Timeout(ms) = err {
                    warn!(engine = self.inner.name(), timeout_ms = ms, "recognition call abandoned");
                }
            },
        )
    }
}

/// Orientation detector wrapper that bounds every call.
pub struct TimedOrientation {
    inner: Arc<dyn OrientationDetector>,
    timeout: Duration,
}

impl TimedOrientation {
    pub fn new(inner: Arc<dyn OrientationDetector>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

impl OrientationDetector for TimedOrientation {
    fn is_available(&self) -> bool {
        self.inner.is_available()
    }

    fn detect_orientation(&self, image: &DynamicImage) -> Result<u32> {
        let inner = Arc::clone(&self.inner);
        let image = image.clone();
        call_with_timeout(self.timeout, move || inner.detect_orientation(&image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::RecognizedToken;

    struct SlowEngine(Duration);

    impl Recognizer for SlowEngine {
        fn name(&self) -> &str {
            "slow"
        }

        fn recognize(&self, _image: &DynamicImage, _lang_hint: &str) -> Result<Recognition> {
            thread::sleep(self.0);
            Ok(Recognition {
                text: "done".into(),
                tokens: vec![RecognizedToken {
                    text: "done".into(),
                    confidence: Some(90.0),
                }],
            })
        }
    }

    struct PanickingEngine;

    impl Recognizer for PanickingEngine {
        fn name(&self) -> &str {
            "panicking"
        }

        fn recognize(&self, _image: &DynamicImage, _lang_hint: &str) -> Result<Recognition> {
            panic!("engine crashed");
        }
    }

    #[test]
    fn fast_call_returns_result() {
        let timed = TimedRecognizer::new(Arc::new(SlowEngine(Duration::ZERO)), Duration::from_secs(5));
        let result = timed.recognize(&DynamicImage::new_luma8(2, 2), "eng").unwrap();
        assert_eq!(result.text, "done");
        assert_eq!(result.mean_confidence(), Some(90.0));
    }

    #[test]
    fn slow_call_times_out() {
        let timed = TimedRecognizer::new(
            Arc::new(SlowEngine(Duration::from_millis(500))),
            Duration::from_millis(20),
        );
        let err = timed.recognize(&DynamicImage::new_luma8(2, 2), "eng").unwrap_err();
        assert!(matches!(err, BlattwerkError::Timeout(20)));
    }

    #[test]
    fn panicking_engine_degrades_to_error() {
        let timed = TimedRecognizer::new(Arc::new(PanickingEngine), Duration::from_secs(5));
        let err = timed.recognize(&DynamicImage::new_luma8(2, 2), "eng").unwrap_err();
        assert!(matches!(err, BlattwerkError::Recognition(_)));
    }
}
