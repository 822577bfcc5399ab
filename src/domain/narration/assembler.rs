use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use rubato::{FftFixedIn, Resampler};
use std::io::Cursor;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("no audio segments to assemble")]
    Empty,
    #[error("none of the {0} audio segments could be decoded")]
    Undecodable(usize),
    #[error("failed to decode audio segment: {0}")]
    Decode(String),
    #[error("failed to resample audio segment: {0}")]
    Resample(String),
    #[error("failed to encode wav: {0}")]
    Encode(#[from] hound::Error),
}

/// Decoded, interleaved 16-bit samples of one segment
#[derive(Debug, Clone, PartialEq)]
pub struct PcmSegment {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmSegment {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    fn same_format(&self, other: &PcmSegment) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }

    /// Convert to `channels` channels at `sample_rate`, keeping the duration.
    pub fn conform_to(
        self,
        sample_rate: u32,
        channels: u16,
    ) -> Result<PcmSegment, AssemblyError> {
        if self.sample_rate == sample_rate && self.channels == channels {
            return Ok(self);
        }

        let planes = remix(&self, channels);
        let planes = if self.sample_rate == sample_rate {
            planes
        } else {
            resample(&planes, self.sample_rate, sample_rate)?
        };

        Ok(PcmSegment {
            samples: interleave(&planes),
            sample_rate,
            channels,
        })
    }
}

fn to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Split interleaved samples into one plane per output channel.
/// Mono is duplicated, anything folded down to mono is averaged.
fn remix(segment: &PcmSegment, channels: u16) -> Vec<Vec<f32>> {
    let source_channels = segment.channels as usize;
    let frames = segment.frames();
    let mut planes = vec![Vec::with_capacity(frames); channels as usize];

    for frame in segment.samples.chunks_exact(source_channels) {
        if channels == 1 {
            let sum: f32 = frame.iter().copied().map(to_f32).sum();
            planes[0].push(sum / source_channels as f32);
        } else {
            for (channel, plane) in planes.iter_mut().enumerate() {
                plane.push(to_f32(frame[channel % source_channels]));
            }
        }
    }

    planes
}

fn interleave(planes: &[Vec<f32>]) -> Vec<i16> {
    let frames = planes.first().map(Vec::len).unwrap_or(0);
    let mut samples = Vec::with_capacity(frames * planes.len());

    for frame in 0..frames {
        for plane in planes {
            samples.push(to_i16(plane[frame]));
        }
    }

    samples
}

const RESAMPLE_CHUNK: usize = 1024;
const RESAMPLE_SUB_CHUNKS: usize = 2;

/// FFT resampling of every plane. The output is trimmed to exactly
/// `frames * to_rate / from_rate` frames after the resampler's delay.
fn resample(
    planes: &[Vec<f32>],
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<Vec<f32>>, AssemblyError> {
    let frames = planes.first().map(Vec::len).unwrap_or(0);
    let expected =
        ((frames as u64 * to_rate as u64 + from_rate as u64 / 2) / from_rate as u64) as usize;
    if expected == 0 {
        return Ok(vec![Vec::new(); planes.len()]);
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLE_CHUNK,
        RESAMPLE_SUB_CHUNKS,
        planes.len(),
    )
    .map_err(|e| AssemblyError::Resample(e.to_string()))?;

    let delay = resampler.output_delay();
    let wanted = delay + expected;
    let mut output = vec![Vec::with_capacity(wanted + RESAMPLE_CHUNK); planes.len()];
    let mut position = 0;

    // Input past the end is zero padding, which also flushes the delay line
    while output[0].len() < wanted {
        let needed = resampler.input_frames_next();
        let end = (position + needed).min(frames);
        let block: Vec<Vec<f32>> = planes
            .iter()
            .map(|plane| {
                let mut block = vec![0.0; needed];
                if position < end {
                    block[..end - position].copy_from_slice(&plane[position..end]);
                }
                block
            })
            .collect();

        let resampled = resampler
            .process(&block, None)
            .map_err(|e| AssemblyError::Resample(e.to_string()))?;
        if resampled.first().map_or(true, Vec::is_empty) {
            return Err(AssemblyError::Resample(
                "resampler produced no output".to_string(),
            ));
        }
        for (plane, chunk) in output.iter_mut().zip(resampled) {
            plane.extend_from_slice(&chunk);
        }

        position += needed;
    }

    Ok(output
        .into_iter()
        .map(|plane| plane[delay..wanted].to_vec())
        .collect())
}

/// The single WAV file produced for a download
#[derive(Debug, Clone)]
pub struct AssembledAudio {
    pub data: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
}

impl AssembledAudio {
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames as f64 / self.sample_rate as f64)
    }
}

/// Decode one encoded segment (MP3, WAV, ...) into PCM.
pub fn decode_segment(data: &[u8]) -> Result<PcmSegment, AssemblyError> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AssemblyError::Decode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AssemblyError::Decode("no decodable audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AssemblyError::Decode(e.to_string()))?;

    let mut samples = Vec::new();
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(AssemblyError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            // A corrupt frame is dropped, the rest of the segment still plays
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(error = %e, "Skipping undecodable audio frame");
            }
            Err(e) => return Err(AssemblyError::Decode(e.to_string())),
        }
    }

    if samples.is_empty() || sample_rate == 0 || channels == 0 {
        return Err(AssemblyError::Decode("segment contains no samples".to_string()));
    }

    Ok(PcmSegment {
        samples,
        sample_rate,
        channels,
    })
}

/// Decode every segment in order and re-encode the combined waveform as a
/// single 16-bit PCM WAV file.
///
/// The first decoded segment fixes the sample rate and channel count; later
/// segments in another format are resampled and remixed to match. Empty
/// segments are ignored and segments that fail to decode are logged and left
/// out.
pub fn assemble_segments(segments: &[Bytes]) -> Result<AssembledAudio, AssemblyError> {
    let non_empty: Vec<(usize, &Bytes)> = segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| !segment.is_empty())
        .collect();

    if non_empty.is_empty() {
        return Err(AssemblyError::Empty);
    }

    let mut combined: Option<PcmSegment> = None;

    for (index, segment) in &non_empty {
        let decoded = match decode_segment(segment) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(
                    chunk_index = index,
                    size = segment.len(),
                    error = %e,
                    "Skipping audio segment that failed to decode"
                );
                continue;
            }
        };

        match combined.as_mut() {
            None => combined = Some(decoded),
            Some(target) if target.same_format(&decoded) => {
                target.samples.extend_from_slice(&decoded.samples);
            }
            Some(target) => {
                tracing::debug!(
                    chunk_index = index,
                    target_rate = target.sample_rate,
                    target_channels = target.channels,
                    sample_rate = decoded.sample_rate,
                    channels = decoded.channels,
                    "Converting audio segment to the narration format"
                );
                let converted = decoded.conform_to(target.sample_rate, target.channels)?;
                target.samples.extend_from_slice(&converted.samples);
            }
        }
    }

    let combined = combined.ok_or(AssemblyError::Undecodable(non_empty.len()))?;
    let data = encode_wav(&combined)?;

    Ok(AssembledAudio {
        data,
        sample_rate: combined.sample_rate,
        channels: combined.channels,
        frames: combined.frames(),
    })
}

pub fn encode_wav(segment: &PcmSegment) -> Result<Bytes, AssemblyError> {
    let spec = hound::WavSpec {
        channels: segment.channels,
        sample_rate: segment.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in &segment.samples {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;
    }

    Ok(Bytes::from(cursor.into_inner()))
}

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("filename pattern is valid"));

static FILENAME_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Attachment name for a downloaded story, e.g. `The_Brave_Dragon_story_42.wav`
pub fn download_filename(theme: &str, story_id: i64) -> String {
    let stripped = UNSAFE_FILENAME_CHARS.replace_all(theme, "");
    let safe_theme = FILENAME_WHITESPACE.replace_all(stripped.trim(), "_");

    if safe_theme.is_empty() {
        format!("story_{}.wav", story_id)
    } else {
        format!("{}_story_{}.wav", safe_theme, story_id)
    }
}
