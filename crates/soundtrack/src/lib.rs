//! Background music playback for the demo.
//!
//! Wraps `rodio` with the three handles the demo needs: a [`Mixer`] owning the
//! output device stream, a decoded-but-idle [`Music`] asset, and a
//! [`Playback`] that keeps the sink alive while the track plays. Dropping any
//! of them releases the underlying resource; [`Playback::stop`] and
//! [`Mixer::close`] make the teardown order explicit at call sites.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("failed to open default audio output device: {0}")]
    Device(#[from] rodio::StreamError),
    #[error("failed to create audio sink: {0}")]
    Sink(#[from] rodio::PlayError),
    #[error("failed to open music file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode music file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
}

/// Playback options applied when a track starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    pub volume: f32,
    pub looping: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            volume: 0.25,
            looping: false,
        }
    }
}

/// The audio subsystem: an open stream on the default output device.
pub struct Mixer {
    // Must outlive every sink created from `handle`.
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl Mixer {
    pub fn open() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        info!("audio output stream opened");
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    pub fn load(&self, path: &Path) -> Result<Music, AudioError> {
        Music::load(path)
    }

    /// Starts playing `music` on a fresh sink.
    pub fn play(&self, music: Music, options: PlaybackOptions) -> Result<Playback, AudioError> {
        let sink = Sink::try_new(&self.handle)?;
        sink.set_volume(options.volume);
        let Music { path, decoder } = music;
        if options.looping {
            sink.append(decoder.repeat_infinite());
        } else {
            sink.append(decoder);
        }
        info!(
            path = %path.display(),
            volume = options.volume,
            looping = options.looping,
            "music playback started"
        );
        Ok(Playback { path, sink })
    }

    pub fn close(self) {
        drop(self);
        info!("audio output stream closed");
    }
}

/// A decoded music asset that has not started playing yet.
pub struct Music {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
}

impl Music {
    pub fn load(path: &Path) -> Result<Self, AudioError> {
        let file = File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|source| AudioError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            channels = decoder.channels(),
            sample_rate = decoder.sample_rate(),
            "music decoded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            decoder,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A track playing on the mixer's output thread.
pub struct Playback {
    path: PathBuf,
    sink: Sink,
}

impl Playback {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    /// Stops the track and releases the sink.
    pub fn stop(self) {
        self.sink.stop();
        info!(path = %self.path.display(), "music released");
    }
}
