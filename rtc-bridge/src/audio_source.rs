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

use parking_lot::Mutex;

use crate::{
    audio_frame::AudioFrame,
    engine::{EngineMediaTrack, MediaFrame},
};

#[derive(Debug, Clone, Default)]
pub struct AudioSourceOptions {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

/// A caller-owned pcm source. Tracks created from this source receive every
/// captured frame.
#[derive(Clone, Default)]
pub struct NativeAudioSource {
    tracks: Arc<Mutex<Vec<Arc<dyn EngineMediaTrack>>>>,
    options: AudioSourceOptions,
}

impl NativeAudioSource {
    pub fn new(options: AudioSourceOptions) -> Self {
        Self { tracks: Default::default(), options }
    }

    pub fn options(&self) -> &AudioSourceOptions {
        &self.options
    }

    pub fn capture_frame(&self, frame: &AudioFrame) {
        let frame = MediaFrame::Audio(frame.clone());
        for track in self.tracks.lock().iter() {
            track.push_frame(&frame);
        }
    }

    pub(crate) fn attach(&self, track: Arc<dyn EngineMediaTrack>) {
        self.tracks.lock().push(track);
    }
}
