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

use std::{fmt::Debug, sync::Arc};

use lazy_static::lazy_static;

use crate::{
    audio_source::NativeAudioSource,
    audio_track::RtcAudioTrack,
    engine::{local::LocalEngine, EngineConfig, SessionEngine},
    peer_connection::{PeerConnection, PeerObserver},
    video_source::NativeVideoSource,
    video_track::RtcVideoTrack,
    MediaType, RtcError,
};

#[derive(Debug, Clone)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BundlePolicy {
    Balanced,
    MaxCompat,
    MaxBundle,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IceTransportsType {
    /// No candidates are gathered.
    None,
    Relay,
    /// Public addresses only, host candidates are excluded.
    NoHost,
    All,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RtcpMuxPolicy {
    Negotiate,
    Require,
}

/// Static session policy. Policy fields left as `None` keep the engine
/// default; an explicit value always overrides it. The offset-by-one
/// "0 = unset" wire encoding exists only at the C boundary.
#[derive(Debug, Clone, Default)]
pub struct RtcConfiguration {
    pub ice_servers: Vec<IceServer>,
    pub bundle_policy: Option<BundlePolicy>,
    pub ice_transport_type: Option<IceTransportsType>,
    pub rtcp_mux_policy: Option<RtcpMuxPolicy>,
    pub ice_candidate_pool_size: u16,
}

impl From<RtcConfiguration> for EngineConfig {
    fn from(config: RtcConfiguration) -> Self {
        let defaults = EngineConfig::default();
        Self {
            ice_servers: config.ice_servers,
            bundle_policy: config.bundle_policy.unwrap_or(defaults.bundle_policy),
            ice_transport_type: config
                .ice_transport_type
                .unwrap_or(defaults.ice_transport_type),
            rtcp_mux_policy: config.rtcp_mux_policy.unwrap_or(defaults.rtcp_mux_policy),
            ice_candidate_pool_size: config.ice_candidate_pool_size,
            ..defaults
        }
    }
}

lazy_static! {
    static ref DEFAULT_ENGINE: Arc<LocalEngine> = Arc::new(LocalEngine::new());
}

/// Shared, reference-counted handle to the engine factory. One factory may
/// back several sessions.
#[derive(Clone)]
pub struct PeerConnectionFactory {
    engine: Arc<dyn SessionEngine>,
}

impl Default for PeerConnectionFactory {
    fn default() -> Self {
        Self::with_engine(DEFAULT_ENGINE.clone())
    }
}

impl PeerConnectionFactory {
    pub fn with_engine(engine: Arc<dyn SessionEngine>) -> Self {
        Self { engine }
    }

    /// On failure no session object exists; the engine handle and the event
    /// observer are never handed out partially constructed.
    pub fn create_peer_connection(
        &self,
        config: RtcConfiguration,
    ) -> Result<PeerConnection, RtcError> {
        let observer = Arc::new(PeerObserver::default());
        let session = self.engine.create_session(config.into(), observer.clone())?;
        Ok(PeerConnection::configure(session, observer))
    }

    pub fn create_audio_track(&self, label: &str, source: NativeAudioSource) -> RtcAudioTrack {
        let handle = self.engine.create_media_track(MediaType::Audio, label.to_string());
        source.attach(handle.clone());
        RtcAudioTrack { handle }
    }

    pub fn create_video_track(&self, label: &str, source: NativeVideoSource) -> RtcVideoTrack {
        let handle = self.engine.create_media_track(MediaType::Video, label.to_string());
        source.attach(handle.clone());
        RtcVideoTrack { handle }
    }
}

impl Debug for PeerConnectionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PeerConnectionFactory").finish()
    }
}
