//! Audio track extraction to WAV.
//!
//! [`AudioExtractor`] opens its own demuxer on the source, decodes the best
//! audio stream, resamples it to packed signed 16-bit at the source rate and
//! channel layout, and muxes PCM S16LE into a WAV container. The file is
//! written to a staging path and renamed into place only when complete.

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    ChannelLayout, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    decoder::Audio as AudioDecoder,
    encoder::Audio as AudioEncoder,
    format::{Sample, context::Output, sample::Type as SampleType},
    frame::Audio as AudioFrame,
    media::Type,
    software::resampling::Context as ResamplingContext,
};

use crate::configuration::CutsceneOptions;
use crate::error::CutsceneError;
use crate::progress::OperationType;
use crate::staging::StagedFile;

const OUTPUT_SAMPLE_FORMAT: Sample = Sample::I16(SampleType::Packed);

/// A WAV file written by [`AudioExtractor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTrack {
    /// Where the WAV file was written.
    pub path: PathBuf,
    /// Sample rate in Hz, copied from the source.
    pub sample_rate: u32,
    /// Channel count, copied from the source.
    pub channels: u16,
    /// Samples per channel written.
    pub samples_written: u64,
}

/// Transcodes the audio stream of a video to PCM WAV.
#[derive(Debug, Clone, Copy, Default)]
pub struct AudioExtractor;

impl AudioExtractor {
    /// Extract the best audio stream of `source` into `destination`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::path::Path;
    ///
    /// use cutscene::AudioExtractor;
    ///
    /// let track = AudioExtractor::extract(
    ///     Path::new("../assets/videos/intro.mp4"),
    ///     Path::new("../assets/music/intro_audio.wav"),
    /// )?;
    /// println!("{} Hz, {} channels", track.sample_rate, track.channels);
    /// # Ok::<(), cutscene::CutsceneError>(())
    /// ```
    pub fn extract(source: &Path, destination: &Path) -> Result<AudioTrack, CutsceneError> {
        Self::extract_with_options(source, destination, &CutsceneOptions::default())
    }

    /// Extract with progress reporting and cancellation.
    ///
    /// # Errors
    ///
    /// - [`CutsceneError::Cancelled`] if the token fires between packets.
    /// - [`CutsceneError::AudioExtraction`] for everything else: no audio
    ///   stream, a demux, decode or encode failure, or a write failure.
    ///
    /// Nothing is left at `destination` when an error is returned.
    pub fn extract_with_options(
        source: &Path,
        destination: &Path,
        options: &CutsceneOptions,
    ) -> Result<AudioTrack, CutsceneError> {
        log::debug!(
            "Extracting audio from {} to {}",
            source.display(),
            destination.display()
        );
        let result = StagedFile::new(destination).and_then(|staged| {
            let (sample_rate, channels, samples_written) =
                transcode_to_wav(source, staged.path(), options)?;
            let path = staged.commit()?;
            Ok(AudioTrack {
                path,
                sample_rate,
                channels,
                samples_written,
            })
        });

        match result {
            Ok(track) => {
                log::info!(
                    "Wrote {} samples of {} Hz audio to {}",
                    track.samples_written,
                    track.sample_rate,
                    track.path.display()
                );
                Ok(track)
            }
            Err(error @ (CutsceneError::Cancelled | CutsceneError::AudioExtraction(_))) => {
                Err(error)
            }
            Err(error) => Err(CutsceneError::AudioExtraction(error.to_string())),
        }
    }
}

/// Decode → resample → encode → mux. Returns rate, channels, samples.
fn transcode_to_wav(
    source: &Path,
    output_path: &Path,
    options: &CutsceneOptions,
) -> Result<(u32, u16, u64), CutsceneError> {
    crate::ffmpeg::initialize(source)?;
    let mut input_context = ffmpeg_next::format::input(&source).map_err(|error| {
        CutsceneError::SourceOpen {
            path: source.to_path_buf(),
            reason: error.to_string(),
        }
    })?;

    let stream = input_context
        .streams()
        .best(Type::Audio)
        .ok_or_else(|| CutsceneError::AudioExtraction("No audio stream found in source".into()))?;
    let audio_stream_index = stream.index();
    let mut decoder = CodecContext::from_parameters(stream.parameters())?
        .decoder()
        .audio()?;

    let sample_rate = decoder.rate();
    let channels = decoder.channels();
    let channel_layout = decoder.channel_layout();

    let mut output_context = ffmpeg_next::format::output_as(&output_path, "wav")?;
    let (mut encoder, codec_time_base) = open_pcm_encoder(sample_rate, decoder.channel_layout())?;
    {
        let codec = ffmpeg_next::encoder::find(Id::PCM_S16LE)
            .ok_or_else(|| CutsceneError::AudioExtraction("PCM S16LE encoder unavailable".into()))?;
        let mut output_stream = output_context.add_stream(codec)?;
        output_stream.set_parameters(&encoder);
        output_stream.set_time_base(codec_time_base);
    }
    output_context.write_header()?;
    let stream_time_base = output_context
        .stream(0)
        .map_or(codec_time_base, |stream| stream.time_base());

    let mut resampler = ResamplingContext::get(
        decoder.format(),
        decoder.channel_layout(),
        sample_rate,
        OUTPUT_SAMPLE_FORMAT,
        channel_layout,
        sample_rate,
    )?;

    let mut pass = TranscodePass {
        resampler: &mut resampler,
        encoder: &mut encoder,
        output_context: &mut output_context,
        decoded_frame: AudioFrame::empty(),
        resampled_frame: AudioFrame::empty(),
        encoded_packet: Packet::empty(),
        samples_written: 0,
        codec_time_base,
        stream_time_base,
    };

    let mut tracker = options.tracker(OperationType::AudioExtraction, None);
    for (stream, packet) in input_context.packets() {
        if options.is_cancelled() {
            return Err(CutsceneError::Cancelled);
        }
        if stream.index() != audio_stream_index {
            continue;
        }
        decoder.send_packet(&packet).map_err(|error| {
            CutsceneError::AudioExtraction(format!("Failed to decode audio packet: {error}"))
        })?;
        pass.drain_decoder(&mut decoder)?;
        tracker.advance(None);
    }

    let _ = decoder.send_eof();
    pass.drain_decoder(&mut decoder)?;
    pass.flush_encoder()?;
    let samples_written = pass.samples_written;
    tracker.finish();

    output_context.write_trailer()?;
    Ok((sample_rate, channels, samples_written.max(0) as u64))
}

fn open_pcm_encoder(
    sample_rate: u32,
    channel_layout: ChannelLayout,
) -> Result<(AudioEncoder, Rational), CutsceneError> {
    let codec = ffmpeg_next::encoder::find(Id::PCM_S16LE)
        .ok_or_else(|| CutsceneError::AudioExtraction("PCM S16LE encoder unavailable".into()))?;

    let time_base = Rational(1, sample_rate as i32);
    let mut encoder_context = CodecContext::new().encoder().audio()?;
    encoder_context.set_rate(sample_rate as i32);
    encoder_context.set_channel_layout(channel_layout);
    encoder_context.set_format(OUTPUT_SAMPLE_FORMAT);
    encoder_context.set_time_base(time_base);

    Ok((encoder_context.open_as(codec)?, time_base))
}

/// Mutable state shared by the packet loop and the final flushes.
struct TranscodePass<'a> {
    resampler: &'a mut ResamplingContext,
    encoder: &'a mut AudioEncoder,
    output_context: &'a mut Output,
    decoded_frame: AudioFrame,
    resampled_frame: AudioFrame,
    encoded_packet: Packet,
    samples_written: i64,
    codec_time_base: Rational,
    stream_time_base: Rational,
}

impl TranscodePass<'_> {
    fn drain_decoder(&mut self, decoder: &mut AudioDecoder) -> Result<(), CutsceneError> {
        while crate::ffmpeg::received(decoder.receive_frame(&mut self.decoded_frame)).map_err(
            |error| CutsceneError::AudioExtraction(format!("Failed to decode audio: {error}")),
        )? {
            self.resampler
                .run(&self.decoded_frame, &mut self.resampled_frame)?;

            self.resampled_frame.set_pts(Some(self.samples_written));
            self.samples_written += self.resampled_frame.samples() as i64;

            self.encoder.send_frame(&self.resampled_frame).map_err(|error| {
                CutsceneError::AudioExtraction(format!("Failed to encode audio: {error}"))
            })?;
            self.write_packets()?;
        }
        Ok(())
    }

    fn flush_encoder(&mut self) -> Result<(), CutsceneError> {
        let _ = self.encoder.send_eof();
        self.write_packets()
    }

    fn write_packets(&mut self) -> Result<(), CutsceneError> {
        while crate::ffmpeg::received(self.encoder.receive_packet(&mut self.encoded_packet))
            .map_err(|error| {
                CutsceneError::AudioExtraction(format!("Failed to encode audio: {error}"))
            })?
        {
            self.encoded_packet.set_stream(0);
            self.encoded_packet
                .rescale_ts(self.codec_time_base, self.stream_time_base);
            self.encoded_packet
                .write_interleaved(self.output_context)
                .map_err(|error| {
                    CutsceneError::AudioExtraction(format!("Failed to write audio: {error}"))
                })?;
        }
        Ok(())
    }
}
