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

//! In-process engine.
//!
//! Runs the full signaling state machine and delivers every observer event
//! from a dedicated worker thread, so callers see the same threading
//! contract a native engine imposes. Two sessions created from the same
//! engine negotiate against each other: a description is matched back to
//! the session that produced it through its origin session id, and paired
//! sessions exchange data-channel messages and media frames directly.
//!
//! Events are dispatched in the order they were produced; state is always
//! updated before the corresponding event job is queued, and no lock is
//! held while an observer runs.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering},
        mpsc, Arc, Weak,
    },
    thread,
};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::{
    data_channel::{DataChannelInit, DataChannelState},
    engine::{
        DataChannelEvents, EngineConfig, EngineDataChannel, EngineMediaTrack, EngineSession,
        FrameSink, MediaFrame, SessionEngine, SessionObserver,
    },
    ice_candidate::IceCandidate,
    peer_connection::{
        AnswerOptions, IceConnectionState, IceGatheringState, OfferOptions, PeerConnectionState,
        SignalingState,
    },
    peer_connection_factory::IceTransportsType,
    sdp_observer::{CreateSdpObserver, SetSdpObserver},
    session_description::{SdpType, SessionDescription},
    MediaType, RtcError, RtcErrorType,
};

mod sdp;
use sdp::{ChannelDesc, TrackDesc};

type Job = Box<dyn FnOnce() + Send>;

/// Single event-dispatch thread shared by every session of an engine.
struct Worker {
    tx: Mutex<mpsc::Sender<Job>>,
}

impl Worker {
    fn spawn() -> Arc<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::spawn(move || {
            while let Ok(job) = rx.recv() {
                job();
            }
        });
        Arc::new(Self { tx: Mutex::new(tx) })
    }

    fn execute(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.tx.lock().send(Box::new(job));
    }
}

struct EngineShared {
    worker: Arc<Worker>,
    sessions: Mutex<HashMap<u64, Weak<LocalSession>>>,
    next_session_id: AtomicU64,
    next_channel_id: AtomicI32,
}

pub struct LocalEngine {
    shared: Arc<EngineShared>,
}

impl LocalEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(EngineShared {
                worker: Worker::spawn(),
                sessions: Mutex::new(HashMap::new()),
                next_session_id: AtomicU64::new(1),
                next_channel_id: AtomicI32::new(0),
            }),
        }
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEngine for LocalEngine {
    fn create_session(
        &self,
        config: EngineConfig,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Arc<dyn EngineSession>, RtcError> {
        let session_id = self.shared.next_session_id.fetch_add(1, Ordering::Relaxed);
        let credentials = Uuid::new_v4().simple().to_string();
        let session = Arc::new(LocalSession {
            session_id,
            ice_ufrag: credentials[..8].to_string(),
            ice_pwd: credentials,
            config,
            observer,
            shared: self.shared.clone(),
            state: Mutex::new(SessionState::new()),
        });
        self.shared.sessions.lock().insert(session_id, Arc::downgrade(&session));
        Ok(session)
    }

    fn create_media_track(&self, kind: MediaType, id: String) -> Arc<dyn EngineMediaTrack> {
        Arc::new(LocalMediaTrack::new(kind, id, self.shared.worker.clone()))
    }
}

struct SessionState {
    closed: bool,
    signaling: SignalingState,
    connection: PeerConnectionState,
    ice_connection: IceConnectionState,
    ice_gathering: IceGatheringState,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    /// Channels created by this session.
    channels: Vec<Arc<LocalDataChannel>>,
    /// Channels announced by the remote description.
    remote_channels: Vec<Arc<LocalDataChannel>>,
    tracks: Vec<(Arc<dyn EngineMediaTrack>, Vec<String>)>,
    remote_tracks: Vec<Arc<LocalMediaTrack>>,
    peer: Weak<LocalSession>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            closed: false,
            signaling: SignalingState::Stable,
            connection: PeerConnectionState::New,
            ice_connection: IceConnectionState::New,
            ice_gathering: IceGatheringState::New,
            local_description: None,
            remote_description: None,
            channels: vec![],
            remote_channels: vec![],
            tracks: vec![],
            remote_tracks: vec![],
            peer: Weak::new(),
        }
    }
}

struct LocalSession {
    session_id: u64,
    ice_ufrag: String,
    ice_pwd: String,
    config: EngineConfig,
    observer: Arc<dyn SessionObserver>,
    shared: Arc<EngineShared>,
    state: Mutex<SessionState>,
}

fn signaling_state_str(state: SignalingState) -> &'static str {
    match state {
        SignalingState::Stable => "kStable",
        SignalingState::HaveLocalOffer => "kHaveLocalOffer",
        SignalingState::HaveLocalPrAnswer => "kHaveLocalPrAnswer",
        SignalingState::HaveRemoteOffer => "kHaveRemoteOffer",
        SignalingState::HaveRemotePrAnswer => "kHaveRemotePrAnswer",
        SignalingState::Closed => "kClosed",
    }
}

fn candidate_is_well_formed(candidate: &str) -> bool {
    let mut fields = candidate.split_whitespace();
    candidate.starts_with("candidate:") && fields.nth(6) == Some("typ")
}

impl LocalSession {
    fn weak(&self) -> Weak<LocalSession> {
        self.shared
            .sessions
            .lock()
            .get(&self.session_id)
            .cloned()
            .unwrap_or_else(Weak::new)
    }

    fn build_description(&self, sdp_type: SdpType) -> Result<SessionDescription, RtcError> {
        let (channels, tracks) = {
            let st = self.state.lock();
            let channels = st
                .channels
                .iter()
                .chain(st.remote_channels.iter())
                .map(|c| ChannelDesc { label: c.label.clone() })
                .collect::<Vec<_>>();
            let tracks = st
                .tracks
                .iter()
                .map(|(track, stream_ids)| TrackDesc {
                    kind: track.kind(),
                    id: track.id(),
                    stream_ids: stream_ids.clone(),
                })
                .collect::<Vec<_>>();
            (channels, tracks)
        };
        let sdp = sdp::build(self.session_id, &self.ice_ufrag, &self.ice_pwd, &channels, &tracks);
        SessionDescription::parse(&sdp, sdp_type).map_err(|e| RtcError {
            error_type: RtcErrorType::InvalidSdp,
            message: e.to_string(),
        })
    }

    fn emit_signaling_change(&self, state: SignalingState) {
        let observer = self.observer.clone();
        self.shared.worker.execute(move || observer.on_signaling_change(state));
    }

    fn emit_renegotiation_needed(&self) {
        let observer = self.observer.clone();
        self.shared.worker.execute(move || observer.on_renegotiation_needed());
    }

    /// Applies a local or remote description. The signaling transition is
    /// the libwebrtc offer/answer table; anything outside it fails through
    /// the observer with the engine's wrong-state message.
    fn apply_description(
        &self,
        local: bool,
        desc: SessionDescription,
        observer: Arc<SetSdpObserver>,
    ) {
        let side = if local { "local" } else { "remote" };
        let rollback = desc.sdp_type() == SdpType::Rollback;

        let (next, start_gathering, reached_stable) = {
            let mut st = self.state.lock();
            if st.closed {
                drop(st);
                observer.reject(RtcError::closed());
                return;
            }

            let next = match (desc.sdp_type(), local, st.signaling) {
                (SdpType::Offer, true, SignalingState::Stable | SignalingState::HaveLocalOffer) => {
                    SignalingState::HaveLocalOffer
                }
                (
                    SdpType::Offer,
                    false,
                    SignalingState::Stable | SignalingState::HaveRemoteOffer,
                ) => SignalingState::HaveRemoteOffer,
                (
                    SdpType::Answer,
                    true,
                    SignalingState::HaveRemoteOffer | SignalingState::HaveLocalPrAnswer,
                ) => SignalingState::Stable,
                (
                    SdpType::Answer,
                    false,
                    SignalingState::HaveLocalOffer | SignalingState::HaveRemotePrAnswer,
                ) => SignalingState::Stable,
                (SdpType::PrAnswer, true, SignalingState::HaveRemoteOffer) => {
                    SignalingState::HaveLocalPrAnswer
                }
                (SdpType::PrAnswer, false, SignalingState::HaveLocalOffer) => {
                    SignalingState::HaveRemotePrAnswer
                }
                (
                    SdpType::Rollback,
                    _,
                    SignalingState::HaveLocalOffer
                    | SignalingState::HaveRemoteOffer
                    | SignalingState::HaveLocalPrAnswer
                    | SignalingState::HaveRemotePrAnswer,
                ) => SignalingState::Stable,
                (sdp_type, _, wrong) => {
                    drop(st);
                    observer.failure(format!(
                        "Failed to set {} {} sdp: Called in wrong state: {}",
                        side,
                        sdp_type,
                        signaling_state_str(wrong)
                    ));
                    return;
                }
            };

            if !rollback {
                if local {
                    st.local_description = Some(desc.clone());
                } else {
                    st.remote_description = Some(desc.clone());
                }
            }
            st.signaling = next;

            let start_gathering =
                local && !rollback && st.ice_gathering == IceGatheringState::New;
            let reached_stable = next == SignalingState::Stable
                && !rollback
                && st.local_description.is_some()
                && st.remote_description.is_some();
            (next, start_gathering, reached_stable)
        };

        self.emit_signaling_change(next);
        if !local && !rollback {
            self.absorb_remote_description(&desc);
        }
        if start_gathering {
            self.gather_candidates();
        }
        if reached_stable {
            self.establish();
        }
        observer.success();
    }

    /// Pairs this session with the one that produced the remote description
    /// and materializes the channels and tracks it announces.
    fn absorb_remote_description(&self, desc: &SessionDescription) {
        let info = sdp::inspect(desc.sdp());
        let peer = self.shared.sessions.lock().get(&info.session_id).and_then(Weak::upgrade);
        let Some(peer) = peer else {
            return;
        };
        if peer.session_id == self.session_id {
            return;
        }

        let me = self.weak();
        self.state.lock().peer = Arc::downgrade(&peer);
        peer.state.lock().peer = me;

        for announced in &info.channels {
            let source = peer
                .state
                .lock()
                .channels
                .iter()
                .find(|c| c.label == announced.label && c.peer.lock().upgrade().is_none())
                .cloned();
            let Some(source) = source else {
                continue;
            };

            let mirror = LocalDataChannel::new(
                source.id,
                announced.label.clone(),
                self.shared.worker.clone(),
            );
            *mirror.peer.lock() = Arc::downgrade(&source);
            *source.peer.lock() = Arc::downgrade(&mirror);
            self.state.lock().remote_channels.push(mirror.clone());

            let observer = self.observer.clone();
            let handle: Arc<dyn EngineDataChannel> = mirror.clone();
            self.shared.worker.execute(move || observer.on_data_channel(handle));

            // The transport is the worker queue itself, so the pair is
            // usable as soon as it is linked.
            source.open();
            mirror.open();
        }

        for announced in &info.tracks {
            if self.state.lock().remote_tracks.iter().any(|t| t.id == announced.id) {
                continue;
            }

            let mirror = Arc::new(LocalMediaTrack::new(
                announced.kind,
                announced.id.clone(),
                self.shared.worker.clone(),
            ));
            let source = peer
                .state
                .lock()
                .tracks
                .iter()
                .find(|(track, _)| track.id() == announced.id)
                .map(|(track, _)| track.clone());
            if let Some(source) = source {
                source.add_sink(Arc::new(TrackForward(mirror.clone())));
            }
            self.state.lock().remote_tracks.push(mirror.clone());

            let observer = self.observer.clone();
            let stream_ids = announced.stream_ids.clone();
            let handle: Arc<dyn EngineMediaTrack> = mirror;
            self.shared.worker.execute(move || observer.on_track(handle, stream_ids));
        }
    }

    fn gather_candidates(&self) {
        if self.config.ice_transport_type == IceTransportsType::None {
            return;
        }

        let me = self.weak();
        let candidate = IceCandidate::new(
            &format!(
                "candidate:{} 1 udp 2122260223 127.0.0.1 {} typ host",
                1_000_000_000u64 + self.session_id,
                50_000 + self.session_id % 10_000,
            ),
            Some("0"),
            0,
        );
        self.shared.worker.execute(move || {
            let Some(session) = me.upgrade() else {
                return;
            };
            {
                let mut st = session.state.lock();
                if st.closed || st.ice_gathering != IceGatheringState::New {
                    return;
                }
                st.ice_gathering = IceGatheringState::Gathering;
            }
            session.observer.on_ice_gathering_change(IceGatheringState::Gathering);
            session.observer.on_ice_candidate(candidate);
            {
                let mut st = session.state.lock();
                if st.closed {
                    return;
                }
                st.ice_gathering = IceGatheringState::Complete;
            }
            session.observer.on_ice_gathering_change(IceGatheringState::Complete);
        });
    }

    /// Walks the connection through checking/connecting to connected once
    /// the offer/answer exchange is complete.
    fn establish(&self) {
        let me = self.weak();
        self.shared.worker.execute(move || {
            let Some(session) = me.upgrade() else {
                return;
            };
            {
                let mut st = session.state.lock();
                if st.closed || st.connection == PeerConnectionState::Connected {
                    return;
                }
                st.ice_connection = IceConnectionState::Checking;
                st.connection = PeerConnectionState::Connecting;
            }
            session.observer.on_ice_connection_change(IceConnectionState::Checking);
            session.observer.on_connection_change(PeerConnectionState::Connecting);
            {
                let mut st = session.state.lock();
                if st.closed {
                    return;
                }
                st.ice_connection = IceConnectionState::Connected;
                st.connection = PeerConnectionState::Connected;
            }
            session.observer.on_ice_connection_change(IceConnectionState::Connected);
            session.observer.on_connection_change(PeerConnectionState::Connected);
        });
    }
}

impl EngineSession for LocalSession {
    fn create_offer(&self, _options: OfferOptions, observer: Arc<CreateSdpObserver>) {
        if self.state.lock().closed {
            observer.reject(RtcError::closed());
            return;
        }
        match self.build_description(SdpType::Offer) {
            Ok(desc) => observer.success(desc),
            Err(e) => observer.reject(e),
        }
    }

    fn create_answer(&self, _options: AnswerOptions, observer: Arc<CreateSdpObserver>) {
        {
            let st = self.state.lock();
            if st.closed {
                drop(st);
                observer.reject(RtcError::closed());
                return;
            }
            match st.signaling {
                SignalingState::HaveRemoteOffer | SignalingState::HaveLocalPrAnswer => {}
                _ => {
                    drop(st);
                    observer.failure(
                        "PeerConnection cannot create an answer in a state other than \
                         have-remote-offer or have-local-pranswer."
                            .to_owned(),
                    );
                    return;
                }
            }
        }
        match self.build_description(SdpType::Answer) {
            Ok(desc) => observer.success(desc),
            Err(e) => observer.reject(e),
        }
    }

    fn set_local_description(&self, desc: SessionDescription, observer: Arc<SetSdpObserver>) {
        self.apply_description(true, desc, observer);
    }

    fn set_remote_description(&self, desc: SessionDescription, observer: Arc<SetSdpObserver>) {
        self.apply_description(false, desc, observer);
    }

    fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), RtcError> {
        if self.state.lock().closed {
            return Err(RtcError::closed());
        }
        if candidate.is_end_of_candidates() {
            return Ok(());
        }
        if !candidate_is_well_formed(&candidate.candidate) {
            return Err(RtcError {
                error_type: RtcErrorType::IceRejected,
                message: format!(
                    "Failed to apply the received candidate: {}",
                    candidate.candidate
                ),
            });
        }
        Ok(())
    }

    fn add_track(
        &self,
        track: Arc<dyn EngineMediaTrack>,
        stream_ids: Vec<String>,
    ) -> Result<(), RtcError> {
        {
            let mut st = self.state.lock();
            if st.closed {
                return Err(RtcError::closed());
            }
            if st.tracks.iter().any(|(t, _)| t.id() == track.id()) {
                return Err(RtcError {
                    error_type: RtcErrorType::InvalidState,
                    message: format!("Sender already exists for track {}.", track.id()),
                });
            }
            st.tracks.push((track, stream_ids));
        }
        self.emit_renegotiation_needed();
        Ok(())
    }

    fn create_data_channel(
        &self,
        label: &str,
        init: DataChannelInit,
    ) -> Result<Arc<dyn EngineDataChannel>, RtcError> {
        if init.max_retransmit_time.is_some() && init.max_retransmits.is_some() {
            return Err(RtcError {
                error_type: RtcErrorType::InvalidState,
                message: "Cannot set both max retransmits and max retransmit time.".to_owned(),
            });
        }

        let channel = {
            let mut st = self.state.lock();
            if st.closed {
                return Err(RtcError::closed());
            }
            let id = if init.id >= 0 {
                init.id
            } else {
                self.shared.next_channel_id.fetch_add(1, Ordering::Relaxed)
            };
            let channel =
                LocalDataChannel::new(id, label.to_string(), self.shared.worker.clone());
            st.channels.push(channel.clone());
            channel
        };
        self.emit_renegotiation_needed();
        Ok(channel)
    }

    fn close(&self) {
        let (channels, remote_channels, remote_tracks) = {
            let mut st = self.state.lock();
            if st.closed {
                return;
            }
            st.closed = true;
            st.signaling = SignalingState::Closed;
            st.connection = PeerConnectionState::Closed;
            st.ice_connection = IceConnectionState::Closed;
            (
                std::mem::take(&mut st.channels),
                std::mem::take(&mut st.remote_channels),
                std::mem::take(&mut st.remote_tracks),
            )
        };
        self.shared.sessions.lock().remove(&self.session_id);
        for channel in channels.iter().chain(remote_channels.iter()) {
            EngineDataChannel::close(&**channel);
        }
        for track in remote_tracks {
            track.ended.store(true, Ordering::Release);
        }
    }

    fn connection_state(&self) -> PeerConnectionState {
        self.state.lock().connection
    }

    fn ice_connection_state(&self) -> IceConnectionState {
        self.state.lock().ice_connection
    }

    fn ice_gathering_state(&self) -> IceGatheringState {
        self.state.lock().ice_gathering
    }

    fn signaling_state(&self) -> SignalingState {
        self.state.lock().signaling
    }

    fn current_local_description(&self) -> Option<SessionDescription> {
        self.state.lock().local_description.clone()
    }

    fn current_remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().remote_description.clone()
    }
}

struct LocalDataChannel {
    id: i32,
    label: String,
    state: Mutex<DataChannelState>,
    buffered: AtomicU64,
    observer: Mutex<Option<Arc<dyn DataChannelEvents>>>,
    peer: Mutex<Weak<LocalDataChannel>>,
    me: Weak<LocalDataChannel>,
    worker: Arc<Worker>,
}

impl LocalDataChannel {
    fn new(id: i32, label: String, worker: Arc<Worker>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id,
            label,
            state: Mutex::new(DataChannelState::Connecting),
            buffered: AtomicU64::new(0),
            observer: Mutex::new(None),
            peer: Mutex::new(Weak::new()),
            me: me.clone(),
            worker,
        })
    }

    fn set_state(self: &Arc<Self>, state: DataChannelState) {
        {
            let mut current = self.state.lock();
            if *current == state || *current == DataChannelState::Closed {
                return;
            }
            *current = state;
        }
        let me = self.clone();
        self.worker.execute(move || {
            let observer = me.observer.lock().clone();
            if let Some(observer) = observer {
                observer.on_state_change(state);
            }
        });
    }

    fn open(self: &Arc<Self>) {
        if *self.state.lock() == DataChannelState::Connecting {
            self.set_state(DataChannelState::Open);
        }
    }
}

impl EngineDataChannel for LocalDataChannel {
    fn id(&self) -> i32 {
        self.id
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn state(&self) -> DataChannelState {
        *self.state.lock()
    }

    fn buffered_amount(&self) -> u64 {
        self.buffered.load(Ordering::Acquire)
    }

    fn send(&self, data: &[u8], binary: bool) -> bool {
        if !matches!(*self.state.lock(), DataChannelState::Open) {
            return false;
        }
        let Some(peer) = self.peer.lock().upgrade() else {
            return false;
        };

        let payload = data.to_vec();
        let len = payload.len() as u64;
        self.buffered.fetch_add(len, Ordering::AcqRel);

        let me = self.me.clone();
        self.worker.execute(move || {
            let observer = peer.observer.lock().clone();
            if let Some(observer) = observer {
                observer.on_message(&payload, binary);
            }
            if let Some(sender) = me.upgrade() {
                let remaining = sender.buffered.fetch_sub(len, Ordering::AcqRel) - len;
                let observer = sender.observer.lock().clone();
                if let Some(observer) = observer {
                    observer.on_buffered_amount_change(remaining);
                }
            }
        });
        true
    }

    fn close(&self) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let peer = self.peer.lock().upgrade();
        me.set_state(DataChannelState::Closing);
        me.set_state(DataChannelState::Closed);
        if let Some(peer) = peer {
            peer.set_state(DataChannelState::Closing);
            peer.set_state(DataChannelState::Closed);
        }
    }

    fn register_observer(&self, observer: Arc<dyn DataChannelEvents>) {
        *self.observer.lock() = Some(observer);
    }

    fn unregister_observer(&self) {
        *self.observer.lock() = None;
    }
}

pub(crate) struct LocalMediaTrack {
    id: String,
    kind: MediaType,
    enabled: AtomicBool,
    ended: AtomicBool,
    sinks: Mutex<Vec<Arc<dyn FrameSink>>>,
    worker: Arc<Worker>,
}

impl LocalMediaTrack {
    fn new(kind: MediaType, id: String, worker: Arc<Worker>) -> Self {
        Self {
            id,
            kind,
            enabled: AtomicBool::new(true),
            ended: AtomicBool::new(false),
            sinks: Mutex::new(vec![]),
            worker,
        }
    }
}

impl EngineMediaTrack for LocalMediaTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> MediaType {
        self.kind
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.store(enabled, Ordering::Release);
        true
    }

    fn ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    fn push_frame(&self, frame: &MediaFrame) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        let sinks = self.sinks.lock().clone();
        if sinks.is_empty() {
            return;
        }
        let frame = frame.clone();
        self.worker.execute(move || {
            for sink in &sinks {
                sink.on_frame(&frame);
            }
        });
    }

    fn add_sink(&self, sink: Arc<dyn FrameSink>) {
        self.sinks.lock().push(sink);
    }
}

/// Feeds the frames of a local track into its remote-side counterpart.
struct TrackForward(Arc<LocalMediaTrack>);

impl FrameSink for TrackForward {
    fn on_frame(&self, frame: &MediaFrame) {
        self.0.push_frame(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullObserver;

    impl SessionObserver for NullObserver {
        fn on_signaling_change(&self, _state: SignalingState) {}
        fn on_ice_gathering_change(&self, _state: IceGatheringState) {}
        fn on_ice_connection_change(&self, _state: IceConnectionState) {}
        fn on_connection_change(&self, _state: PeerConnectionState) {}
        fn on_ice_candidate(&self, _candidate: IceCandidate) {}
        fn on_data_channel(&self, _channel: Arc<dyn EngineDataChannel>) {}
        fn on_track(&self, _track: Arc<dyn EngineMediaTrack>, _stream_ids: Vec<String>) {}
        fn on_renegotiation_needed(&self) {}
    }

    fn session(engine: &LocalEngine) -> Arc<dyn EngineSession> {
        engine
            .create_session(EngineConfig::default(), Arc::new(NullObserver))
            .unwrap()
    }

    fn create_answer_result(session: &Arc<dyn EngineSession>) -> Result<SessionDescription, RtcError> {
        let slot = Arc::new(Mutex::new(None));
        let out = slot.clone();
        session.create_answer(
            AnswerOptions::default(),
            CreateSdpObserver::new(move |res| {
                *out.lock() = Some(res);
            }),
        );
        let result = slot.lock().take().unwrap();
        result
    }

    fn set_description(
        session: &Arc<dyn EngineSession>,
        local: bool,
        desc: SessionDescription,
    ) -> Result<(), RtcError> {
        let slot = Arc::new(Mutex::new(None));
        let out = slot.clone();
        let observer = SetSdpObserver::new(move |res| {
            *out.lock() = Some(res);
        });
        if local {
            session.set_local_description(desc, observer);
        } else {
            session.set_remote_description(desc, observer);
        }
        let result = slot.lock().take().unwrap();
        result
    }

    fn offer(session: &Arc<dyn EngineSession>) -> SessionDescription {
        let slot = Arc::new(Mutex::new(None));
        let out = slot.clone();
        session.create_offer(
            OfferOptions::default(),
            CreateSdpObserver::new(move |res| {
                *out.lock() = Some(res);
            }),
        );
        let result = slot.lock().take().unwrap();
        result.unwrap()
    }

    #[test]
    fn answer_without_remote_offer_is_rejected() {
        let engine = LocalEngine::new();
        let session = session(&engine);
        let err = create_answer_result(&session).unwrap_err();
        assert!(err.message.contains("cannot create an answer"));
    }

    #[test]
    fn answer_in_stable_state_reports_wrong_state() {
        let engine = LocalEngine::new();
        let session = session(&engine);
        let desc = offer(&session);
        let answer = SessionDescription::parse(desc.sdp(), SdpType::Answer).unwrap();
        let err = set_description(&session, true, answer).unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::Internal);
        assert!(err.message.contains("Called in wrong state: kStable"), "{}", err.message);
    }

    #[test]
    fn rollback_returns_to_stable() {
        let engine = LocalEngine::new();
        let session = session(&engine);
        let desc = offer(&session);
        set_description(&session, true, desc).unwrap();
        assert_eq!(session.signaling_state(), SignalingState::HaveLocalOffer);

        let rollback = SessionDescription::parse("v=0\r\ns=-\r\n", SdpType::Rollback).unwrap();
        set_description(&session, true, rollback).unwrap();
        assert_eq!(session.signaling_state(), SignalingState::Stable);
    }

    #[test]
    fn rollback_in_stable_state_fails() {
        let engine = LocalEngine::new();
        let session = session(&engine);
        let rollback = SessionDescription::parse("v=0\r\ns=-\r\n", SdpType::Rollback).unwrap();
        let err = set_description(&session, true, rollback).unwrap_err();
        assert!(err.message.contains("Called in wrong state"));
    }

    #[test]
    fn conflicting_retransmit_options_are_rejected() {
        let engine = LocalEngine::new();
        let session = session(&engine);
        let init = DataChannelInit {
            max_retransmit_time: Some(1000),
            max_retransmits: Some(3),
            ..Default::default()
        };
        let err = session.create_data_channel("dc", init).err().unwrap();
        assert_eq!(err.error_type, RtcErrorType::InvalidState);
    }

    #[test]
    fn negotiated_channel_keeps_its_id() {
        let engine = LocalEngine::new();
        let session = session(&engine);
        let init = DataChannelInit { negotiated: true, id: 42, ..Default::default() };
        let channel = session.create_data_channel("dc", init).unwrap();
        assert_eq!(channel.id(), 42);
    }

    #[test]
    fn offer_announces_pending_channels() {
        let engine = LocalEngine::new();
        let session = session(&engine);
        session.create_data_channel("chat", DataChannelInit::default()).unwrap();
        let desc = offer(&session);
        assert!(desc.sdp().contains("m=application"));
        assert!(desc.sdp().contains("a=dc-label:chat"));
    }

    #[test]
    fn candidate_syntax_check() {
        assert!(candidate_is_well_formed(
            "candidate:2395300328 1 udp 2122260223 192.168.1.7 54321 typ host"
        ));
        assert!(!candidate_is_well_formed("garbage"));
        assert!(!candidate_is_well_formed("candidate:1 1 udp"));
    }
}
