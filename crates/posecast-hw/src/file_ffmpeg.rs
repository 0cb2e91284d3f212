//! Video file source decoded with FFmpeg.

use crate::frame::{self, Frame};
use crate::source::{CaptureError, FrameSource, SourceKind};
use ffmpeg_next as ffmpeg;
use std::path::Path;

pub struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    sequence: u32,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let path_str = path.display().to_string();
        let open_err = |reason: String| CaptureError::Open {
            path: path_str.clone(),
            reason,
        };

        ffmpeg::init().map_err(|e| open_err(format!("initialize ffmpeg: {e}")))?;
        let input = ffmpeg::format::input(&path).map_err(|e| open_err(e.to_string()))?;
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| open_err("file has no video track".into()))?;
        let stream_index = stream.index();

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_err(format!("load decoder parameters: {e}")))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| open_err(format!("open video decoder: {e}")))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| open_err(format!("create scaler: {e}")))?;

        tracing::info!(
            path = %path_str,
            width = decoder.width(),
            height = decoder.height(),
            "opened video file"
        );

        Ok(Self {
            path: path_str,
            input,
            stream_index,
            decoder,
            scaler,
            sequence: 0,
            eof_sent: false,
        })
    }

    fn read_err(&self, reason: impl ToString) -> CaptureError {
        CaptureError::Read {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn to_frame(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame, CaptureError> {
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .map_err(|e| self.read_err(format!("scale frame to RGB: {e}")))?;

        let width = rgb.width();
        let height = rgb.height();
        let row_bytes = width as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data(0);

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            let line = data
                .get(start..start + row_bytes)
                .ok_or_else(|| self.read_err("frame row out of bounds"))?;
            pixels.extend_from_slice(line);
        }

        let image = frame::rgb_from_raw(pixels, width, height).map_err(|e| self.read_err(e))?;
        let frame = Frame::new(image, self.sequence);
        self.sequence += 1;
        Ok(frame)
    }
}

impl FrameSource for FfmpegFileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let mut decoded = ffmpeg::frame::Video::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.to_frame(&decoded);
            }
            if self.eof_sent {
                return Err(CaptureError::EndOfStream);
            }

            let stream_index = self.stream_index;
            let next = self
                .input
                .packets()
                .find(|(s, _)| s.index() == stream_index)
                .map(|(_, packet)| packet);

            match next {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .map_err(|e| self.read_err(format!("send packet: {e}")))?,
                None => {
                    // Drain frames buffered inside the decoder.
                    self.decoder
                        .send_eof()
                        .map_err(|e| self.read_err(format!("send eof: {e}")))?;
                    self.eof_sent = true;
                }
            }
        }
    }
}
