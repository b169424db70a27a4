use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Decorator that runs detection at most every `interval` frames while a
/// face is being tracked, reusing the last boxes in between.
///
/// Landmarks are still regressed on every frame, so a stale box only needs
/// to roughly cover the face. While no face is cached (start-up, face lost,
/// or a failed detection) every frame is detected so the face is
/// reacquired without delay.
pub struct SkipFrameDetector {
    inner: Box<dyn FaceDetector>,
    interval: usize,
    since_detection: usize,
    cached: Vec<Region>,
}

impl SkipFrameDetector {
    pub fn new(inner: Box<dyn FaceDetector>, interval: usize) -> Result<Self, &'static str> {
        if interval == 0 {
            return Err("skip interval must be at least 1");
        }
        Ok(Self {
            inner,
            interval,
            since_detection: 0,
            cached: Vec::new(),
        })
    }

    fn due(&self) -> bool {
        self.cached.is_empty() || self.since_detection >= self.interval
    }
}

impl FaceDetector for SkipFrameDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
        if !self.due() {
            self.since_detection += 1;
            return Ok(self.cached.clone());
        }

        self.since_detection = 1;
        match self.inner.detect(frame) {
            Ok(regions) => {
                self.cached = regions.clone();
                Ok(regions)
            }
            Err(e) => {
                self.cached.clear();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted results and records which frames reached it.
    struct ScriptedDetector {
        script: VecDeque<Result<Vec<Region>, &'static str>>,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>> {
            self.seen.lock().unwrap().push(frame.index());
            match self.script.pop_front() {
                Some(Ok(regions)) => Ok(regions),
                Some(Err(msg)) => Err(msg.into()),
                None => Ok(vec![face(99)]),
            }
        }
    }

    fn face(x: i32) -> Region {
        Region::new(x, 20, 50, 50, 0.9)
    }

    fn skipping(
        interval: usize,
        script: Vec<Result<Vec<Region>, &'static str>>,
    ) -> (SkipFrameDetector, Arc<Mutex<Vec<usize>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = ScriptedDetector {
            script: script.into(),
            seen: seen.clone(),
        };
        (SkipFrameDetector::new(Box::new(inner), interval).unwrap(), seen)
    }

    fn run(detector: &mut SkipFrameDetector, frames: usize) -> Vec<Option<i32>> {
        (0..frames)
            .map(|i| {
                detector
                    .detect(&Frame::filled(8, 8, [0, 0, 0], i))
                    .ok()
                    .map(|r| r.first().map_or(-1, |f| f.x))
            })
            .collect()
    }

    #[test]
    fn test_interval_one_detects_every_frame() {
        let (mut detector, seen) = skipping(1, vec![Ok(vec![face(1)]), Ok(vec![face(2)])]);
        assert_eq!(run(&mut detector, 3), vec![Some(1), Some(2), Some(99)]);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_tracked_face_is_reused_between_detections() {
        let (mut detector, seen) = skipping(3, vec![Ok(vec![face(1)]), Ok(vec![face(2)])]);
        assert_eq!(
            run(&mut detector, 5),
            vec![Some(1), Some(1), Some(1), Some(2), Some(2)]
        );
        assert_eq!(*seen.lock().unwrap(), vec![0, 3]);
    }

    #[test]
    fn test_lost_face_is_searched_every_frame() {
        let script = vec![Ok(vec![face(1)]), Ok(vec![]), Ok(vec![]), Ok(vec![face(4)])];
        let (mut detector, seen) = skipping(2, script);
        assert_eq!(
            run(&mut detector, 6),
            vec![Some(1), Some(1), Some(-1), Some(-1), Some(4), Some(4)]
        );
        assert_eq!(*seen.lock().unwrap(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_failed_detection_retries_next_frame() {
        let (mut detector, seen) = skipping(4, vec![Err("inference failed"), Ok(vec![face(7)])]);
        assert_eq!(run(&mut detector, 3), vec![None, Some(7), Some(7)]);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let inner = ScriptedDetector {
            script: VecDeque::new(),
            seen: Arc::default(),
        };
        assert!(SkipFrameDetector::new(Box::new(inner), 0).is_err());
    }
}
