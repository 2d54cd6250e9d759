// Copyright 2025 LiveKit, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use crate::{audio_track::RtcAudioTrack, engine::EngineMediaTrack, video_track::RtcVideoTrack};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RtcTrackState {
    Live,
    Ended,
}

/// Audio and video tracks are handled uniformly at this level; the engine
/// differentiates internally.
#[derive(Clone)]
pub enum MediaStreamTrack {
    Video(RtcVideoTrack),
    Audio(RtcAudioTrack),
}

impl MediaStreamTrack {
    pub fn id(&self) -> String {
        match self {
            Self::Video(track) => track.id(),
            Self::Audio(track) => track.id(),
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            Self::Video(track) => track.enabled(),
            Self::Audio(track) => track.enabled(),
        }
    }

    pub fn set_enabled(&self, enabled: bool) -> bool {
        match self {
            Self::Video(track) => track.set_enabled(enabled),
            Self::Audio(track) => track.set_enabled(enabled),
        }
    }

    pub fn state(&self) -> RtcTrackState {
        match self {
            Self::Video(track) => track.state(),
            Self::Audio(track) => track.state(),
        }
    }

    pub(crate) fn handle(&self) -> Arc<dyn EngineMediaTrack> {
        match self {
            Self::Video(track) => track.handle.clone(),
            Self::Audio(track) => track.handle.clone(),
        }
    }
}

macro_rules! media_stream_track {
    () => {
        pub fn id(&self) -> String {
            self.handle.id()
        }

        pub fn enabled(&self) -> bool {
            self.handle.enabled()
        }

        pub fn set_enabled(&self, enabled: bool) -> bool {
            self.handle.set_enabled(enabled)
        }

        pub fn state(&self) -> crate::media_stream_track::RtcTrackState {
            if self.handle.ended() {
                crate::media_stream_track::RtcTrackState::Ended
            } else {
                crate::media_stream_track::RtcTrackState::Live
            }
        }

        /// Attaches a sink receiving every frame delivered to this track.
        pub fn add_sink(&self, sink: std::sync::Arc<dyn crate::engine::FrameSink>) {
            self.handle.add_sink(sink);
        }
    };
}

pub(crate) use media_stream_track;

impl From<RtcAudioTrack> for MediaStreamTrack {
    fn from(track: RtcAudioTrack) -> Self {
        Self::Audio(track)
    }
}

impl From<RtcVideoTrack> for MediaStreamTrack {
    fn from(track: RtcVideoTrack) -> Self {
        Self::Video(track)
    }
}
