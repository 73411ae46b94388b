/// Sound engine: procedural sound effects via rodio.
///
/// Cues are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;
use crate::sim::session::LOW_TIME_SECONDS;
use crate::domain::target::TargetKind;

/// Every sound the game makes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Hit,
    Special,
    Bomb,
    Miss,
    LowTime,
    GameOver,
    NewRecord,
}

impl Cue {
    pub const ALL: [Cue; 7] = [
        Cue::Hit,
        Cue::Special,
        Cue::Bomb,
        Cue::Miss,
        Cue::LowTime,
        Cue::GameOver,
        Cue::NewRecord,
    ];

    #[cfg_attr(not(feature = "sound"), allow(dead_code))]
    fn index(self) -> usize {
        self as usize
    }
}

/// Which cue, if any, an engine event should trigger.
pub fn cue_for(event: &GameEvent) -> Option<Cue> {
    match event {
        GameEvent::TargetHit { kind, .. } => Some(match kind {
            TargetKind::Normal => Cue::Hit,
            TargetKind::Special => Cue::Special,
            TargetKind::Bomb => Cue::Bomb,
        }),
        GameEvent::MissedEmpty { .. } => Some(Cue::Miss),
        GameEvent::Tick { remaining } if *remaining <= LOW_TIME_SECONDS && *remaining > 0 => {
            Some(Cue::LowTime)
        }
        GameEvent::GameEnded { new_record: true, .. } => Some(Cue::NewRecord),
        GameEvent::GameEnded { .. } => Some(Cue::GameOver),
        _ => None,
    }
}

// ════════════════════════════════════════════════════════════
//  Waveform generators: all produce Vec<f32> mono samples
// ════════════════════════════════════════════════════════════

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
mod synth {
    use super::Cue;
    use std::f32::consts::TAU;

    pub const SAMPLE_RATE: u32 = 22050;

    fn len(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration).round() as usize
    }

    /// Exponential glide from `from` to `to` over `ramp` seconds, then hold.
    fn glide(from: f32, to: f32, ramp: f32, t: f32) -> f32 {
        if t >= ramp {
            to
        } else {
            from * (to / from).powf(t / ramp)
        }
    }

    /// Oscillator with a running phase so pitch sweeps stay click-free.
    fn sweep(duration: f32, volume: f32, freq_at: impl Fn(f32) -> f32, wave: fn(f32) -> f32) -> Vec<f32> {
        let n = len(duration);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                phase = (phase + freq_at(t) / SAMPLE_RATE as f32).fract();
                let env = 1.0 - (i as f32 / n as f32);
                wave(phase) * env * volume
            })
            .collect()
    }

    fn sine(phase: f32) -> f32 {
        (phase * TAU).sin()
    }

    fn saw(phase: f32) -> f32 {
        phase * 2.0 - 1.0
    }

    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        seq.iter()
            .flat_map(|&(freq, dur)| sweep(dur, volume, move |_| freq, sine))
            .collect()
    }

    pub fn generate(cue: Cue) -> Vec<f32> {
        match cue {
            // A4-ish blip
            Cue::Hit => sweep(0.1, 0.3, |_| 330.0, sine),
            // C5 gliding up to E5
            Cue::Special => sweep(0.2, 0.3, |t| glide(523.25, 659.25, 0.1, t), sine),
            // A2 falling to A1, buzzy
            Cue::Bomb => sweep(0.3, 0.25, |t| glide(110.0, 55.0, 0.3, t), saw),
            // Low E2 thud
            Cue::Miss => sweep(0.1, 0.3, |_| 82.41, sine),
            Cue::LowTime => sweep(0.04, 0.2, |_| 880.0, sine),
            // G4 → E4 → C4
            Cue::GameOver => notes(&[(392.0, 0.12), (329.63, 0.12), (261.63, 0.25)], 0.3),
            // C5 → E5 → G5 → C6
            Cue::NewRecord => notes(
                &[(523.25, 0.1), (659.25, 0.1), (783.99, 0.1), (1046.5, 0.3)],
                0.3,
            ),
        }
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::{synth, Cue};

    /// Pre-generated WAV buffers, indexed by `Cue`.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "no audio output, sound disabled");
                    return None;
                }
            };
            let buffers = Cue::ALL
                .iter()
                .map(|&cue| Arc::new(synth::make_wav(&synth::generate(cue))))
                .collect();
            Some(SoundEngine { _stream: stream, handle, buffers })
        }

        pub fn play(&self, cue: Cue) {
            let Some(buf) = self.buffers.get(cue.index()) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: Cue) {}
}

impl SoundEngine {
    /// Play whatever each event calls for.
    pub fn play_events(&self, events: &[GameEvent]) {
        for cue in events.iter().filter_map(cue_for) {
            self.play(cue);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_map_by_kind() {
        let hit = |kind| GameEvent::TargetHit { row: 0, col: 0, kind, score: 0 };
        assert_eq!(cue_for(&hit(TargetKind::Normal)), Some(Cue::Hit));
        assert_eq!(cue_for(&hit(TargetKind::Special)), Some(Cue::Special));
        assert_eq!(cue_for(&hit(TargetKind::Bomb)), Some(Cue::Bomb));
        assert_eq!(cue_for(&GameEvent::MissedEmpty { row: 1, col: 1 }), Some(Cue::Miss));
    }

    #[test]
    fn low_time_blip_only_in_last_seconds() {
        assert_eq!(cue_for(&GameEvent::Tick { remaining: 11 }), None);
        assert_eq!(cue_for(&GameEvent::Tick { remaining: 10 }), Some(Cue::LowTime));
        assert_eq!(cue_for(&GameEvent::Tick { remaining: 1 }), Some(Cue::LowTime));
    }

    #[test]
    fn game_end_jingles() {
        let end = |new_record| GameEvent::GameEnded { score: 10, high_score: 10, new_record };
        assert_eq!(cue_for(&end(true)), Some(Cue::NewRecord));
        assert_eq!(cue_for(&end(false)), Some(Cue::GameOver));
    }

    #[test]
    fn cue_lengths_match_durations() {
        let rate = synth::SAMPLE_RATE as usize;
        assert_eq!(synth::generate(Cue::Hit).len(), rate / 10);
        assert_eq!(synth::generate(Cue::Special).len(), rate / 5);
        assert!(Cue::ALL.iter().all(|&c| {
            synth::generate(c).iter().all(|s| s.abs() <= 1.0)
        }));
    }

    #[test]
    fn wav_header_is_well_formed() {
        let wav = synth::make_wav(&[0.0, 0.5, -0.5]);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 6);
    }
}
