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

//! The seam between this crate and the engine that performs the actual
//! signaling, ICE processing and media work.
//!
//! The engine runs its own threads and invokes every observer below from
//! threads the caller does not control. Implementations of these traits are
//! commands and notifications only; the engine is the sole authority on
//! state transitions, and this crate never validates them.

use std::sync::Arc;

use crate::{
    audio_frame::AudioFrame,
    data_channel::{DataChannelInit, DataChannelState},
    ice_candidate::IceCandidate,
    peer_connection::{
        AnswerOptions, IceConnectionState, IceGatheringState, OfferOptions, PeerConnectionState,
        SignalingState,
    },
    sdp_observer::{CreateSdpObserver, SetSdpObserver},
    session_description::SessionDescription,
    video_frame::VideoFrame,
    MediaType, RtcError,
};

pub mod local;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SdpSemantics {
    UnifiedPlan,
}

/// The fully-resolved session configuration handed to the engine. Building
/// one from an [`RtcConfiguration`](crate::peer_connection_factory::RtcConfiguration)
/// is total: absent fields become the defaults below.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sdp_semantics: SdpSemantics,
    pub dtls_srtp_required: bool,
    pub ice_servers: Vec<crate::peer_connection_factory::IceServer>,
    pub bundle_policy: crate::peer_connection_factory::BundlePolicy,
    pub ice_transport_type: crate::peer_connection_factory::IceTransportsType,
    pub rtcp_mux_policy: crate::peer_connection_factory::RtcpMuxPolicy,
    pub ice_candidate_pool_size: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sdp_semantics: SdpSemantics::UnifiedPlan,
            dtls_srtp_required: true,
            ice_servers: vec![],
            bundle_policy: crate::peer_connection_factory::BundlePolicy::Balanced,
            ice_transport_type: crate::peer_connection_factory::IceTransportsType::All,
            rtcp_mux_policy: crate::peer_connection_factory::RtcpMuxPolicy::Require,
            ice_candidate_pool_size: 0,
        }
    }
}

/// Factory capability of the engine: session creation plus the media-engine
/// surface (track creation from a caller-owned source).
pub trait SessionEngine: Send + Sync {
    fn create_session(
        &self,
        config: EngineConfig,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Arc<dyn EngineSession>, RtcError>;

    fn create_media_track(&self, kind: MediaType, id: String) -> Arc<dyn EngineMediaTrack>;
}

/// Per-connection commands. All description operations complete
/// asynchronously through the given observer and must not block.
pub trait EngineSession: Send + Sync {
    fn create_offer(&self, options: OfferOptions, observer: Arc<CreateSdpObserver>);
    fn create_answer(&self, options: AnswerOptions, observer: Arc<CreateSdpObserver>);
    fn set_local_description(&self, desc: SessionDescription, observer: Arc<SetSdpObserver>);
    fn set_remote_description(&self, desc: SessionDescription, observer: Arc<SetSdpObserver>);
    fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), RtcError>;
    fn add_track(
        &self,
        track: Arc<dyn EngineMediaTrack>,
        stream_ids: Vec<String>,
    ) -> Result<(), RtcError>;
    fn create_data_channel(
        &self,
        label: &str,
        init: DataChannelInit,
    ) -> Result<Arc<dyn EngineDataChannel>, RtcError>;
    fn close(&self);

    fn connection_state(&self) -> PeerConnectionState;
    fn ice_connection_state(&self) -> IceConnectionState;
    fn ice_gathering_state(&self) -> IceGatheringState;
    fn signaling_state(&self) -> SignalingState;
    fn current_local_description(&self) -> Option<SessionDescription>;
    fn current_remote_description(&self) -> Option<SessionDescription>;
}

/// The eight connection events, invoked by the engine from its own threads
/// for the whole lifetime of a session. Receivers must stay valid until the
/// engine releases its reference, which may be after the session closed.
pub trait SessionObserver: Send + Sync {
    fn on_signaling_change(&self, state: SignalingState);
    fn on_ice_gathering_change(&self, state: IceGatheringState);
    fn on_ice_connection_change(&self, state: IceConnectionState);
    fn on_connection_change(&self, state: PeerConnectionState);
    fn on_ice_candidate(&self, candidate: IceCandidate);
    fn on_data_channel(&self, channel: Arc<dyn EngineDataChannel>);
    fn on_track(&self, track: Arc<dyn EngineMediaTrack>, stream_ids: Vec<String>);
    fn on_renegotiation_needed(&self);
}

pub trait EngineDataChannel: Send + Sync {
    fn id(&self) -> i32;
    fn label(&self) -> String;
    fn state(&self) -> DataChannelState;
    fn buffered_amount(&self) -> u64;
    fn send(&self, data: &[u8], binary: bool) -> bool;
    fn close(&self);
    fn register_observer(&self, observer: Arc<dyn DataChannelEvents>);
    fn unregister_observer(&self);
}

pub trait DataChannelEvents: Send + Sync {
    fn on_state_change(&self, state: DataChannelState);
    fn on_message(&self, data: &[u8], binary: bool);
    fn on_buffered_amount_change(&self, amount: u64);
}

#[derive(Debug, Clone)]
pub enum MediaFrame {
    Audio(AudioFrame),
    Video(VideoFrame),
}

/// Receives the frames delivered to a track; the adapter handed out for
/// remote tracks implements this.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: &MediaFrame);
}

pub trait EngineMediaTrack: Send + Sync {
    fn id(&self) -> String;
    fn kind(&self) -> MediaType;
    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool) -> bool;
    fn ended(&self) -> bool;
    fn push_frame(&self, frame: &MediaFrame);
    fn add_sink(&self, sink: Arc<dyn FrameSink>);
}
