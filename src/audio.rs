//! Audio boundary.
//!
//! The sim never touches an audio device. It queues `SoundCue`s and picks a
//! `MusicTrack`; the shell drains them into whatever `AudioSink` it has. The
//! headless binary uses `LogSink`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Shoot,
    Hit,
    Explosion,
    Dash,
    PowerUp,
    UiClick,
    BossTransition,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MusicTrack {
    Hub,
    Combat,
}

pub trait AudioSink {
    fn play(&mut self, cue: SoundCue);
    fn set_music(&mut self, track: Option<MusicTrack>);
}

/// Sink for headless runs: cues go to the log, nothing is synthesized.
#[derive(Debug, Default)]
pub struct LogSink {
    current: Option<MusicTrack>,
}

impl AudioSink for LogSink {
    fn play(&mut self, cue: SoundCue) {
        log::debug!("sound cue: {cue:?}");
    }

    fn set_music(&mut self, track: Option<MusicTrack>) {
        if track != self.current {
            log::info!("music: {track:?}");
            self.current = track;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sink_tracks_music_changes() {
        let mut sink = LogSink::default();
        sink.set_music(Some(MusicTrack::Hub));
        assert_eq!(sink.current, Some(MusicTrack::Hub));
        sink.set_music(None);
        assert_eq!(sink.current, None);
    }
}
