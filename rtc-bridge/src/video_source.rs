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
    engine::{EngineMediaTrack, MediaFrame},
    video_frame::VideoFrame,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

/// A caller-owned frame source. Tracks created from this source receive
/// every captured frame.
#[derive(Clone, Default)]
pub struct NativeVideoSource {
    tracks: Arc<Mutex<Vec<Arc<dyn EngineMediaTrack>>>>,
    resolution: VideoResolution,
}

impl NativeVideoSource {
    pub fn new(resolution: VideoResolution) -> Self {
        Self { tracks: Default::default(), resolution }
    }

    pub fn video_resolution(&self) -> VideoResolution {
        self.resolution
    }

    pub fn capture_frame(&self, frame: &VideoFrame) {
        let frame = MediaFrame::Video(frame.clone());
        for track in self.tracks.lock().iter() {
            track.push_frame(&frame);
        }
    }

    pub(crate) fn attach(&self, track: Arc<dyn EngineMediaTrack>) {
        self.tracks.lock().push(track);
    }
}
