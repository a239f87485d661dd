//! Scoped acquisition of image capture sources.
//!
//! A capture stream is acquired when the user toggles capture on and every
//! one of its tracks is stopped when capture is toggled off or the session
//! tears down. Device plumbing lives behind [`FrameSource`]; the session only
//! ever sees base64-encoded image payloads.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::core::message::ImageAttachment;

#[derive(Debug)]
pub enum CaptureError {
    /// No capture source has been configured.
    NoSource,
    /// The source exists but could not be opened.
    Open { path: PathBuf, source: io::Error },
    /// Reading a frame from a live stream failed.
    Read(io::Error),
    /// A frame was requested after every track was stopped.
    Stopped,
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoSource => {
                write!(f, "no capture source configured (set capture-source)")
            }
            CaptureError::Open { path, source } => {
                write!(f, "could not open capture source {}: {}", path.display(), source)
            }
            CaptureError::Read(source) => write!(f, "could not read frame: {source}"),
            CaptureError::Stopped => write!(f, "capture stream has been stopped"),
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CaptureError::Open { source, .. } => Some(source),
            CaptureError::Read(source) => Some(source),
            _ => None,
        }
    }
}

/// Handle to one live track within a capture stream. Cloned handles observe
/// the same liveness flag, so a stopped track reads as stopped everywhere.
#[derive(Debug, Clone)]
pub struct Track {
    live: Arc<AtomicBool>,
}

impl Track {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::new()
    }
}

/// An open stream of frames with one or more live tracks.
pub trait CaptureStream: Send {
    /// Read and encode the next frame.
    fn capture_frame(&mut self) -> Result<Vec<u8>, CaptureError>;

    fn tracks(&self) -> &[Track];
}

/// A source capture streams can be opened from. Toggling capture on always
/// opens a fresh stream.
pub trait FrameSource: Send {
    fn open(&self) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// Live capture session. Stops every track when explicitly stopped or when
/// dropped, so teardown can never leak a running track.
pub struct CaptureSession {
    stream: Box<dyn CaptureStream>,
}

impl CaptureSession {
    pub fn acquire(source: &dyn FrameSource) -> Result<Self, CaptureError> {
        Ok(Self {
            stream: source.open()?,
        })
    }

    /// Capture one frame as a base64 payload suitable for the outbound
    /// message envelope.
    pub fn capture_attachment(&mut self) -> Result<ImageAttachment, CaptureError> {
        if self.stream.tracks().iter().all(|t| !t.is_live()) {
            return Err(CaptureError::Stopped);
        }
        let bytes = self.stream.capture_frame()?;
        Ok(ImageAttachment {
            base64: BASE64.encode(bytes),
        })
    }

    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        for track in self.stream.tracks() {
            track.stop();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Frame source backed by a file path. Whatever writes frames there (a
/// grabber, a screenshot hook) is an external collaborator; each capture
/// re-reads the file.
pub struct FileFrameSource {
    path: Option<PathBuf>,
}

impl FileFrameSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl FrameSource for FileFrameSource {
    fn open(&self) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let path = self.path.clone().ok_or(CaptureError::NoSource)?;
        // Verify the path is readable before handing out tracks.
        fs::metadata(&path).map_err(|source| CaptureError::Open {
            path: path.clone(),
            source,
        })?;
        Ok(Box::new(FileStream {
            path,
            tracks: vec![Track::new()],
        }))
    }
}

struct FileStream {
    path: PathBuf,
    tracks: Vec<Track>,
}

impl CaptureStream for FileStream {
    fn capture_frame(&mut self) -> Result<Vec<u8>, CaptureError> {
        fs::read(&self.path).map_err(CaptureError::Read)
    }

    fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::StubSource;
    use super::*;

    #[test]
    fn stopping_a_session_stops_every_track() {
        let source = StubSource::new(b"frame");
        let session = CaptureSession::acquire(&source).expect("acquire");
        assert!(source
            .opened_tracks
            .lock()
            .unwrap()
            .iter()
            .all(Track::is_live));

        session.stop();
        assert!(source
            .opened_tracks
            .lock()
            .unwrap()
            .iter()
            .all(|t| !t.is_live()));
    }

    #[test]
    fn dropping_a_session_stops_every_track() {
        let source = StubSource::new(b"frame");
        {
            let _session = CaptureSession::acquire(&source).expect("acquire");
        }
        assert!(source
            .opened_tracks
            .lock()
            .unwrap()
            .iter()
            .all(|t| !t.is_live()));
    }

    #[test]
    fn reacquiring_opens_a_fresh_stream() {
        let source = StubSource::new(b"frame");
        let first = CaptureSession::acquire(&source).expect("acquire");
        first.stop();
        let _second = CaptureSession::acquire(&source).expect("reacquire");
        assert_eq!(*source.open_count.lock().unwrap(), 2);
        // The second stream's track is live even though the first was stopped.
        let tracks = source.opened_tracks.lock().unwrap();
        assert!(!tracks[0].is_live());
        assert!(tracks[1].is_live());
    }

    #[test]
    fn capture_encodes_frame_as_base64() {
        let source = StubSource::new(b"hello");
        let mut session = CaptureSession::acquire(&source).expect("acquire");
        let attachment = session.capture_attachment().expect("capture");
        assert_eq!(attachment.base64, "aGVsbG8=");
    }

    #[test]
    fn capture_after_stop_is_an_error() {
        let source = StubSource::new(b"frame");
        let mut session = CaptureSession::acquire(&source).expect("acquire");
        for track in source.opened_tracks.lock().unwrap().iter() {
            track.stop();
        }
        assert!(matches!(
            session.capture_attachment(),
            Err(CaptureError::Stopped)
        ));
    }

    #[test]
    fn file_source_without_path_reports_no_source() {
        let source = FileFrameSource::new(None);
        assert!(matches!(source.open(), Err(CaptureError::NoSource)));
    }

    #[test]
    fn file_source_reads_frames_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.jpg");
        fs::write(&path, b"jpegbytes").expect("write frame");

        let source = FileFrameSource::new(Some(path));
        let mut session = CaptureSession::acquire(&source).expect("acquire");
        let attachment = session.capture_attachment().expect("capture");
        assert_eq!(attachment.base64, BASE64.encode(b"jpegbytes"));
    }
}
