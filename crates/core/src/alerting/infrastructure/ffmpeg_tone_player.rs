use crate::alerting::domain::alert_sound::AlertSound;
use crate::alerting::domain::audio_segment::AudioSegment;
use crate::alerting::domain::tone::Tone;
use crate::shared::constants::ALERT_SAMPLE_RATE;

/// Plays tones through an ffmpeg audio output device (libavdevice).
///
/// Each tone is rendered to mono PCM, encoded as signed 16-bit little-endian
/// and written to a freshly opened device context. The call blocks until the
/// device has accepted the whole tone.
pub struct FfmpegTonePlayer {
    format: String,
    device: String,
    sample_rate: u32,
}

impl FfmpegTonePlayer {
    /// `format` is the libavdevice output name (`alsa`, `pulse`,
    /// `audiotoolbox`), `device` the device within it.
    pub fn new(format: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            device: device.into(),
            sample_rate: ALERT_SAMPLE_RATE,
        }
    }

    /// Sound outputs to try on this platform, most preferred first.
    ///
    /// Linux tries the PulseAudio server before raw ALSA.
    pub fn platform_outputs() -> Vec<Self> {
        #[cfg(target_os = "linux")]
        {
            vec![Self::new("pulse", "default"), Self::new("alsa", "default")]
        }
        #[cfg(target_os = "macos")]
        {
            vec![Self::new("audiotoolbox", "-")]
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            Vec::new()
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

impl AlertSound for FfmpegTonePlayer {
    fn play(&mut self, tone: &Tone) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();

        let audio = tone.render(self.sample_rate);

        let mut octx = ffmpeg_next::format::output_as(&self.device, &self.format)?;

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::PCM_S16LE)
            .ok_or("PCM encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;
        let stream_idx = ost.index();

        let mut encoder = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .audio()?;
        encoder.set_rate(audio.sample_rate() as i32);
        encoder.set_channel_layout(ffmpeg_next::ChannelLayout::MONO);
        encoder.set_format(ffmpeg_next::format::Sample::I16(
            ffmpeg_next::format::sample::Type::Packed,
        ));
        encoder.set_time_base((1, audio.sample_rate() as i32));

        let mut encoder = encoder.open_as(codec)?;
        ost.set_parameters(&encoder);
        let enc_time_base = encoder.time_base();

        octx.write_header()?;

        let ost_time_base = octx
            .stream(stream_idx)
            .ok_or("output stream missing after header")?
            .time_base();

        encode_pcm(
            &mut encoder,
            &audio,
            &mut octx,
            stream_idx,
            enc_time_base,
            ost_time_base,
        )?;

        octx.write_trailer()?;
        Ok(())
    }
}

/// PCM encoders report no fixed frame size.
const CHUNK_SAMPLES: usize = 1024;

fn encode_pcm(
    encoder: &mut ffmpeg_next::codec::encoder::audio::Encoder,
    audio: &AudioSegment,
    octx: &mut ffmpeg_next::format::context::Output,
    stream_idx: usize,
    enc_time_base: ffmpeg_next::Rational,
    ost_time_base: ffmpeg_next::Rational,
) -> Result<(), Box<dyn std::error::Error>> {
    let pcm = audio.to_i16();
    let mut pts: i64 = 0;

    for chunk in pcm.chunks(CHUNK_SAMPLES) {
        let mut frame = ffmpeg_next::util::frame::audio::Audio::new(
            ffmpeg_next::format::Sample::I16(ffmpeg_next::format::sample::Type::Packed),
            chunk.len(),
            ffmpeg_next::ChannelLayout::MONO,
        );
        frame.set_rate(audio.sample_rate());
        frame.set_pts(Some(pts));

        let bytes: &[u8] = bytemuck::cast_slice(chunk);
        frame.data_mut(0)[..bytes.len()].copy_from_slice(bytes);

        encoder.send_frame(&frame)?;
        write_packets(encoder, octx, stream_idx, enc_time_base, ost_time_base)?;

        pts += chunk.len() as i64;
    }

    encoder.send_eof()?;
    write_packets(encoder, octx, stream_idx, enc_time_base, ost_time_base)?;

    Ok(())
}

fn write_packets(
    encoder: &mut ffmpeg_next::codec::encoder::audio::Encoder,
    octx: &mut ffmpeg_next::format::context::Output,
    stream_idx: usize,
    enc_time_base: ffmpeg_next::Rational,
    ost_time_base: ffmpeg_next::Rational,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut encoded = ffmpeg_next::Packet::empty();
    while encoder.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(stream_idx);
        encoded.rescale_ts(enc_time_base, ost_time_base);
        encoded.write_interleaved(octx)?;
    }
    Ok(())
}
