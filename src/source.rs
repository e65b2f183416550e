//! Opening and decoding the source video.
//!
//! [`VideoSource`] wraps an FFmpeg demuxer for one file, probes what the
//! planner needs ([`SourceInfo`]), and hands out a sequential decoder,
//! [`SourceFrames`], that implements [`FrameSource`].

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Packet, Rational, Stream,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::error::CutsceneError;
use crate::sampler::{FrameSource, NativeFrame};

/// What was learned about a source when it was opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Path the source was opened from.
    pub path: PathBuf,
    /// Native frame width in pixels; every tile inherits it.
    pub width: u32,
    /// Native frame height in pixels; every tile inherits it.
    pub height: u32,
    /// Native frame rate. Zero if the container does not declare one.
    pub frames_per_second: f64,
    /// Declared or estimated number of native frames. Zero if unknown.
    pub frame_count: u64,
    /// Stream duration, or the container duration as a fallback.
    pub duration: Duration,
    /// Decoder name, e.g. `"h264"`.
    pub codec: String,
    /// Whether the container also carries an audio stream.
    pub has_audio: bool,
}

/// An opened source video.
///
/// # Example
///
/// ```no_run
/// use cutscene::{FrameSampler, VideoSource};
///
/// let mut source = VideoSource::open("intro.mp4")?;
/// let info = source.info().clone();
/// let sampler = FrameSampler::for_rates(info.frames_per_second, 30, 120)?;
/// let outcome = sampler.sample(&mut source.frames()?)?;
/// println!("kept {} frames", outcome.samples.len());
/// # Ok::<(), cutscene::CutsceneError>(())
/// ```
pub struct VideoSource {
    input_context: Input,
    info: SourceInfo,
    video_stream_index: usize,
    consumed: bool,
}

impl VideoSource {
    /// Open `path` and probe its best video stream.
    ///
    /// # Errors
    ///
    /// - [`CutsceneError::SourceOpen`] if the file cannot be opened, or its
    ///   codec parameters cannot be read.
    /// - [`CutsceneError::NoVideoStream`] if there is no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CutsceneError> {
        let path = path.as_ref();
        crate::ffmpeg::initialize(path)?;

        let open_error = |reason: String| CutsceneError::SourceOpen {
            path: path.to_path_buf(),
            reason,
        };

        log::debug!("Opening video source {}", path.display());
        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(CutsceneError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let decoder = open_decoder(&stream)
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let frames_per_second = stream_frame_rate(&stream);
        let duration = stream_duration(&stream, &input_context);
        let frame_count = match stream.frames() {
            declared if declared > 0 => declared as u64,
            _ if frames_per_second > 0.0 => {
                (duration.as_secs_f64() * frames_per_second).round() as u64
            }
            _ => 0,
        };
        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let has_audio = input_context.streams().best(Type::Audio).is_some();

        let info = SourceInfo {
            path: path.to_path_buf(),
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec,
            has_audio,
        };

        log::debug!(
            "Source {}: {}x{} {} at {:.3} fps, ~{} frames, audio: {}",
            path.display(),
            info.width,
            info.height,
            info.codec,
            info.frames_per_second,
            info.frame_count,
            info.has_audio,
        );

        Ok(Self {
            input_context,
            info,
            video_stream_index,
            consumed: false,
        })
    }

    /// Probed properties of the source.
    pub fn info(&self) -> &SourceInfo {
        &self.info
    }

    /// Start a sequential decode from the first frame.
    ///
    /// The returned decoder borrows the source mutably; a second call
    /// rewinds the demuxer first.
    ///
    /// # Errors
    ///
    /// Returns [`CutsceneError::VideoDecode`] if the decoder cannot be
    /// created or the demuxer cannot rewind.
    pub fn frames(&mut self) -> Result<SourceFrames<'_>, CutsceneError> {
        if self.consumed {
            self.input_context
                .seek(0, ..)
                .map_err(|error| CutsceneError::VideoDecode(format!("Failed to rewind: {error}")))?;
        }
        self.consumed = true;

        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or(CutsceneError::NoVideoStream)?;
        let decoder = open_decoder(&stream).map_err(|error| {
            CutsceneError::VideoDecode(format!("Failed to create video decoder: {error}"))
        })?;

        Ok(SourceFrames {
            input_context: &mut self.input_context,
            decoder,
            scaler: None,
            video_stream_index: self.video_stream_index,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            frame_count_hint: (self.info.frame_count > 0).then_some(self.info.frame_count),
            eof_sent: false,
            done: false,
        })
    }
}

fn open_decoder(stream: &Stream<'_>) -> Result<VideoDecoder, ffmpeg_next::Error> {
    CodecContext::from_parameters(stream.parameters())?
        .decoder()
        .video()
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    (rate.numerator() > 0 && rate.denominator() > 0)
        .then(|| f64::from(rate.numerator()) / f64::from(rate.denominator()))
}

/// Average frame rate, falling back to the stream's base rate.
fn stream_frame_rate(stream: &Stream<'_>) -> f64 {
    rational_to_f64(stream.avg_frame_rate())
        .or_else(|| rational_to_f64(stream.rate()))
        .unwrap_or(0.0)
}

fn stream_duration(stream: &Stream<'_>, input_context: &Input) -> Duration {
    let time_base = stream.time_base();
    if stream.duration() > 0 && time_base.denominator() > 0 {
        let seconds = stream.duration() as f64 * f64::from(time_base.numerator())
            / f64::from(time_base.denominator());
        return Duration::from_secs_f64(seconds);
    }
    match input_context.duration() {
        micros if micros > 0 => Duration::from_micros(micros as u64),
        _ => Duration::ZERO,
    }
}

/// Sequential decoder over every native frame of a [`VideoSource`].
///
/// Frames are converted to RGB at native size only when the caller asks;
/// skipped frames are decoded and dropped.
pub struct SourceFrames<'a> {
    input_context: &'a mut Input,
    decoder: VideoDecoder,
    scaler: Option<ScalingContext>,
    video_stream_index: usize,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    frame_count_hint: Option<u64>,
    eof_sent: bool,
    done: bool,
}

impl SourceFrames<'_> {
    /// Pull the next decoded frame into `decoded_frame`.
    ///
    /// Returns `false` once the decoder is fully drained.
    fn decode_next(&mut self) -> Result<bool, CutsceneError> {
        loop {
            if self.receive_decoded()? {
                return Ok(true);
            }
            if self.eof_sent {
                return Ok(false);
            }
            self.feed_packet(true)?;
        }
    }

    /// One `receive_frame` call. A frame that fails to decode is an error,
    /// not a frame to skip.
    fn receive_decoded(&mut self) -> Result<bool, CutsceneError> {
        crate::ffmpeg::received(self.decoder.receive_frame(&mut self.decoded_frame)).map_err(
            |error| CutsceneError::VideoDecode(format!("Failed to decode frame: {error}")),
        )
    }

    /// Read one packet. Video packets are sent to the decoder when `send`
    /// is set. Returns whether the packet was a video packet.
    fn feed_packet(&mut self, send: bool) -> Result<bool, CutsceneError> {
        let mut packet = Packet::empty();
        match packet.read(self.input_context) {
            Ok(()) if packet.stream() == self.video_stream_index => {
                if send {
                    self.decoder.send_packet(&packet).map_err(|error| {
                        CutsceneError::VideoDecode(format!("Failed to decode packet: {error}"))
                    })?;
                }
                Ok(true)
            }
            Ok(()) => Ok(false),
            Err(ffmpeg_next::Error::Eof) => {
                self.decoder.send_eof().map_err(|error| {
                    CutsceneError::VideoDecode(format!("Failed to flush decoder: {error}"))
                })?;
                self.eof_sent = true;
                Ok(false)
            }
            Err(error) => Err(CutsceneError::VideoDecode(format!(
                "Failed to read packet: {error}"
            ))),
        }
    }

    /// Convert `decoded_frame` to a packed RGB image at its own size.
    fn convert_current(&mut self) -> Result<RgbImage, CutsceneError> {
        let format = self.decoded_frame.format();
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();

        let stale = self.scaler.as_ref().is_none_or(|scaler| {
            let input = scaler.input();
            input.format != format || input.width != width || input.height != height
        });
        if stale {
            let scaler = ScalingContext::get(
                format,
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|error| {
                CutsceneError::VideoDecode(format!("Failed to create RGB converter: {error}"))
            })?;
            self.scaler = Some(scaler);
        }

        let Some(scaler) = self.scaler.as_mut() else {
            return Err(CutsceneError::VideoDecode(
                "RGB converter unavailable".to_string(),
            ));
        };
        scaler
            .run(&self.decoded_frame, &mut self.rgb_frame)
            .map_err(|error| {
                CutsceneError::VideoDecode(format!("Failed to convert frame to RGB: {error}"))
            })?;

        let buffer = packed_rgb(&self.rgb_frame, width, height);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            CutsceneError::VideoDecode(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }
}

impl FrameSource for SourceFrames<'_> {
    fn next_frame(&mut self, capture: bool) -> Result<Option<NativeFrame>, CutsceneError> {
        if self.done {
            return Ok(None);
        }
        let decoded = self.decode_next().inspect_err(|_| self.done = true)?;
        if !decoded {
            self.done = true;
            return Ok(None);
        }
        if !capture {
            return Ok(Some(NativeFrame::Skipped));
        }
        let image = self.convert_current().inspect_err(|_| self.done = true)?;
        Ok(Some(NativeFrame::Captured(image)))
    }

    fn count_remaining(&mut self) -> Result<u64, CutsceneError> {
        if self.done {
            return Ok(0);
        }
        self.done = true;

        let mut remaining = 0;
        // Frames the decoder already holds.
        while self.receive_decoded()? {
            remaining += 1;
        }
        // Unread video packets, counted without decoding.
        while !self.eof_sent {
            if self.feed_packet(false)? {
                remaining += 1;
            }
        }
        // Frames still buffered behind packets sent earlier.
        while self.receive_decoded()? {
            remaining += 1;
        }
        Ok(remaining)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.frame_count_hint
    }
}

/// Copy an RGB24 plane into a tightly packed buffer, dropping row padding.
fn packed_rgb(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * height as usize].to_vec();
    }
    data.chunks(stride)
        .take(height as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}
