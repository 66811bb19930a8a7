use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{surface::PixelCanvas, OrbError, Result};

/// Configuration options for the recording subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_dir: PathBuf,
    pub file_prefix: String,
    /// Keep one frame out of every `every` frames.
    pub every: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("frames"),
            file_prefix: "orb".to_string(),
            every: 1,
        }
    }
}

/// Writes rendered frames to numbered PNG files.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    settings: RecordingSettings,
    is_recording: bool,
    written: usize,
}

impl FrameRecorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            is_recording: false,
            written: 0,
        }
    }

    /// Creates the output directory and starts accepting frames.
    pub fn start(&mut self) -> Result<()> {
        if self.settings.every == 0 {
            return Err(OrbError::config("recording.every must be at least 1"));
        }
        std::fs::create_dir_all(&self.settings.output_dir)?;
        self.is_recording = true;
        tracing::debug!(dir = ?self.settings.output_dir, "frame recording started");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.is_recording {
            tracing::debug!(frames = self.written, "frame recording stopped");
        }
        self.is_recording = false;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    pub fn frames_written(&self) -> usize {
        self.written
    }

    pub fn path_for(&self, frame_index: u64) -> PathBuf {
        self.settings
            .output_dir
            .join(format!("{}_{frame_index:05}.png", self.settings.file_prefix))
    }

    /// Saves `canvas` if recording and `frame_index` falls on the sampling
    /// stride. Returns the written path, if any.
    pub fn capture(&mut self, canvas: &PixelCanvas, frame_index: u64) -> Result<Option<PathBuf>> {
        if !self.is_recording || frame_index % u64::from(self.settings.every) != 0 {
            return Ok(None);
        }
        if canvas.width() == 0 || canvas.height() == 0 {
            tracing::debug!(frame_index, "skipping capture of empty canvas");
            return Ok(None);
        }

        let path = self.path_for(frame_index);
        canvas.to_image().save(&path)?;
        self.written += 1;
        tracing::trace!(?path, "frame written");
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::Rgb;
    use crate::surface::{Canvas, Paint, Point};

    #[test]
    fn writes_sampled_frames() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = FrameRecorder::new(RecordingSettings {
            output_dir: dir.path().join("out"),
            file_prefix: "test".to_string(),
            every: 2,
        });

        let mut canvas = PixelCanvas::new(16, 16);
        canvas.fill_circle(
            Point::new(8.0, 8.0),
            6.0,
            &Paint::Solid(Rgb::new(0, 200, 255).with_alpha(1.0)),
        );

        assert!(recorder.capture(&canvas, 0).unwrap().is_none(), "not started");
        recorder.start().unwrap();
        let first = recorder.capture(&canvas, 0).unwrap().unwrap();
        assert!(recorder.capture(&canvas, 1).unwrap().is_none());
        assert!(recorder.capture(&canvas, 2).unwrap().is_some());
        recorder.stop().unwrap();

        assert_eq!(recorder.frames_written(), 2);
        assert!(first.ends_with("test_00000.png"));
        let decoded = image::open(&first).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 16));
        assert_eq!(decoded.get_pixel(8, 8).0, [0, 200, 255, 255]);
    }

    #[test]
    fn zero_stride_is_rejected() {
        let mut recorder = FrameRecorder::new(RecordingSettings {
            every: 0,
            ..Default::default()
        });
        assert!(recorder.start().is_err());
        assert!(!recorder.is_recording());
    }
}
