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

//! One peer-connection session.
//!
//! Negotiation calls never block: they hand a one-shot observer to the
//! engine and return. Completions and connection events are delivered from
//! engine threads; the registered handlers must be safe to invoke from any
//! thread, and no marshalling onto a particular thread is performed here.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::{
    audio_track::RtcAudioTrack,
    data_channel::{DataChannel, DataChannelInit},
    engine::{EngineDataChannel, EngineMediaTrack, EngineSession, SessionObserver},
    ice_candidate::IceCandidate,
    media_stream_track::MediaStreamTrack,
    sdp_observer::{CreateSdpObserver, SetSdpObserver},
    session_description::SessionDescription,
    video_track::RtcVideoTrack,
    MediaType, RtcError,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Disconnected,
    Closed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IceGatheringState {
    New,
    Gathering,
    Complete,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveLocalPrAnswer,
    HaveRemoteOffer,
    HaveRemotePrAnswer,
    Closed,
}

#[derive(Debug, Clone, Default)]
pub struct OfferOptions {
    pub ice_restart: bool,
    pub offer_to_receive_audio: bool,
    pub offer_to_receive_video: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnswerOptions {}

#[derive(Clone)]
pub struct TrackEvent {
    pub track: MediaStreamTrack,
    pub stream_ids: Vec<String>,
}

pub type OnConnectionChange = Box<dyn FnMut(PeerConnectionState) + Send + Sync>;
pub type OnDataChannel = Box<dyn FnMut(DataChannel) + Send + Sync>;
pub type OnIceCandidate = Box<dyn FnMut(IceCandidate) + Send + Sync>;
pub type OnIceConnectionChange = Box<dyn FnMut(IceConnectionState) + Send + Sync>;
pub type OnIceGatheringChange = Box<dyn FnMut(IceGatheringState) + Send + Sync>;
pub type OnRenegotiationNeeded = Box<dyn FnMut() + Send + Sync>;
pub type OnSignalingChange = Box<dyn FnMut(SignalingState) + Send + Sync>;
pub type OnTrack = Box<dyn FnMut(TrackEvent) + Send + Sync>;

#[derive(Clone)]
pub struct PeerConnection {
    handle: Arc<dyn EngineSession>,
    observer: Arc<PeerObserver>,
    closed: Arc<AtomicBool>,
}

impl PeerConnection {
    pub(crate) fn configure(handle: Arc<dyn EngineSession>, observer: Arc<PeerObserver>) -> Self {
        Self { handle, observer, closed: Arc::new(AtomicBool::new(false)) }
    }

    pub fn create_offer(
        &self,
        options: OfferOptions,
        callback: impl FnOnce(Result<SessionDescription, RtcError>) + Send + 'static,
    ) {
        let observer = CreateSdpObserver::new(callback);
        if self.closed.load(Ordering::Acquire) {
            observer.reject(RtcError::closed());
            return;
        }
        self.handle.create_offer(options, observer);
    }

    pub fn create_answer(
        &self,
        options: AnswerOptions,
        callback: impl FnOnce(Result<SessionDescription, RtcError>) + Send + 'static,
    ) {
        let observer = CreateSdpObserver::new(callback);
        if self.closed.load(Ordering::Acquire) {
            observer.reject(RtcError::closed());
            return;
        }
        self.handle.create_answer(options, observer);
    }

    /// Concurrent local/remote calls are allowed; the engine's signaling
    /// state machine decides legality, an out-of-order call surfaces as a
    /// failure callback.
    pub fn set_local_description(
        &self,
        desc: SessionDescription,
        callback: impl FnOnce(Result<(), RtcError>) + Send + 'static,
    ) {
        let observer = SetSdpObserver::new(callback);
        if self.closed.load(Ordering::Acquire) {
            observer.reject(RtcError::closed());
            return;
        }
        self.handle.set_local_description(desc, observer);
    }

    pub fn set_remote_description(
        &self,
        desc: SessionDescription,
        callback: impl FnOnce(Result<(), RtcError>) + Send + 'static,
    ) {
        let observer = SetSdpObserver::new(callback);
        if self.closed.load(Ordering::Acquire) {
            observer.reject(RtcError::closed());
            return;
        }
        self.handle.set_remote_description(desc, observer);
    }

    pub fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), RtcError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RtcError::closed());
        }
        self.handle.add_ice_candidate(candidate)
    }

    pub fn add_track<T: AsRef<str>>(
        &self,
        track: MediaStreamTrack,
        stream_ids: &[T],
    ) -> Result<(), RtcError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RtcError::closed());
        }
        let stream_ids = stream_ids.iter().map(|s| s.as_ref().to_owned()).collect();
        self.handle.add_track(track.handle(), stream_ids)
    }

    pub fn create_data_channel(
        &self,
        label: &str,
        init: DataChannelInit,
    ) -> Result<DataChannel, RtcError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RtcError::closed());
        }
        let handle = self.handle.create_data_channel(label, init)?;
        Ok(DataChannel::configure(handle))
    }

    /// Closes the engine handle and releases the event-handler bindings.
    /// Events already queued on an engine thread may still arrive and are
    /// silently dropped. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.handle.close();
            self.observer.clear();
        }
    }

    pub fn connection_state(&self) -> PeerConnectionState {
        self.handle.connection_state()
    }

    pub fn ice_connection_state(&self) -> IceConnectionState {
        self.handle.ice_connection_state()
    }

    pub fn ice_gathering_state(&self) -> IceGatheringState {
        self.handle.ice_gathering_state()
    }

    pub fn signaling_state(&self) -> SignalingState {
        self.handle.signaling_state()
    }

    pub fn current_local_description(&self) -> Option<SessionDescription> {
        self.handle.current_local_description()
    }

    pub fn current_remote_description(&self) -> Option<SessionDescription> {
        self.handle.current_remote_description()
    }

    pub fn on_connection_state_change(&self, f: Option<OnConnectionChange>) {
        *self.observer.connection_change_handler.lock() = f;
    }

    pub fn on_data_channel(&self, f: Option<OnDataChannel>) {
        *self.observer.data_channel_handler.lock() = f;
    }

    pub fn on_ice_candidate(&self, f: Option<OnIceCandidate>) {
        *self.observer.ice_candidate_handler.lock() = f;
    }

    pub fn on_ice_connection_state_change(&self, f: Option<OnIceConnectionChange>) {
        *self.observer.ice_connection_change_handler.lock() = f;
    }

    pub fn on_ice_gathering_state_change(&self, f: Option<OnIceGatheringChange>) {
        *self.observer.ice_gathering_change_handler.lock() = f;
    }

    pub fn on_renegotiation_needed(&self, f: Option<OnRenegotiationNeeded>) {
        *self.observer.renegotiation_needed_handler.lock() = f;
    }

    pub fn on_signaling_state_change(&self, f: Option<OnSignalingChange>) {
        *self.observer.signaling_change_handler.lock() = f;
    }

    pub fn on_track(&self, f: Option<OnTrack>) {
        *self.observer.track_handler.lock() = f;
    }
}

impl Debug for PeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerConnection")
            .field("state", &self.connection_state())
            .field("ice_state", &self.ice_connection_state())
            .finish()
    }
}

/// Long-lived event observer shared between the session and the engine. The
/// engine keeps its own reference for the connection's lifetime, so events
/// can arrive after `close`; an empty handler slot drops the event
/// silently — nothing may unwind back into the engine.
#[derive(Default)]
pub struct PeerObserver {
    pub(crate) connection_change_handler: Mutex<Option<OnConnectionChange>>,
    pub(crate) data_channel_handler: Mutex<Option<OnDataChannel>>,
    pub(crate) ice_candidate_handler: Mutex<Option<OnIceCandidate>>,
    pub(crate) ice_connection_change_handler: Mutex<Option<OnIceConnectionChange>>,
    pub(crate) ice_gathering_change_handler: Mutex<Option<OnIceGatheringChange>>,
    pub(crate) renegotiation_needed_handler: Mutex<Option<OnRenegotiationNeeded>>,
    pub(crate) signaling_change_handler: Mutex<Option<OnSignalingChange>>,
    pub(crate) track_handler: Mutex<Option<OnTrack>>,
}

impl PeerObserver {
    fn clear(&self) {
        *self.connection_change_handler.lock() = None;
        *self.data_channel_handler.lock() = None;
        *self.ice_candidate_handler.lock() = None;
        *self.ice_connection_change_handler.lock() = None;
        *self.ice_gathering_change_handler.lock() = None;
        *self.renegotiation_needed_handler.lock() = None;
        *self.signaling_change_handler.lock() = None;
        *self.track_handler.lock() = None;
    }
}

impl SessionObserver for PeerObserver {
    fn on_signaling_change(&self, state: SignalingState) {
        if let Some(f) = self.signaling_change_handler.lock().as_mut() {
            f(state);
        }
    }

    fn on_ice_gathering_change(&self, state: IceGatheringState) {
        if let Some(f) = self.ice_gathering_change_handler.lock().as_mut() {
            f(state);
        }
    }

    fn on_ice_connection_change(&self, state: IceConnectionState) {
        if let Some(f) = self.ice_connection_change_handler.lock().as_mut() {
            f(state);
        }
    }

    fn on_connection_change(&self, state: PeerConnectionState) {
        if let Some(f) = self.connection_change_handler.lock().as_mut() {
            f(state);
        }
    }

    fn on_ice_candidate(&self, candidate: IceCandidate) {
        if let Some(f) = self.ice_candidate_handler.lock().as_mut() {
            f(candidate);
        }
    }

    fn on_data_channel(&self, channel: Arc<dyn EngineDataChannel>) {
        if let Some(f) = self.data_channel_handler.lock().as_mut() {
            f(DataChannel::configure(channel));
        }
    }

    fn on_track(&self, track: Arc<dyn EngineMediaTrack>, stream_ids: Vec<String>) {
        if let Some(f) = self.track_handler.lock().as_mut() {
            let track = match track.kind() {
                MediaType::Audio => MediaStreamTrack::Audio(RtcAudioTrack { handle: track }),
                _ => MediaStreamTrack::Video(RtcVideoTrack { handle: track }),
            };
            f(TrackEvent { track, stream_ids });
        }
    }

    fn on_renegotiation_needed(&self) {
        if let Some(f) = self.renegotiation_needed_handler.lock().as_mut() {
            f();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use log::trace;
    use tokio::sync::{mpsc, oneshot};

    use crate::{
        engine::{EngineConfig, SessionEngine},
        peer_connection::*,
        peer_connection_factory::*,
        session_description::SdpType,
        RtcErrorType,
    };

    async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap()
    }

    fn create_offer(pc: &PeerConnection) -> oneshot::Receiver<Result<SessionDescription, RtcError>> {
        let (tx, rx) = oneshot::channel();
        pc.create_offer(OfferOptions::default(), move |res| {
            let _ = tx.send(res);
        });
        rx
    }

    fn create_answer(
        pc: &PeerConnection,
    ) -> oneshot::Receiver<Result<SessionDescription, RtcError>> {
        let (tx, rx) = oneshot::channel();
        pc.create_answer(AnswerOptions::default(), move |res| {
            let _ = tx.send(res);
        });
        rx
    }

    fn set_local(
        pc: &PeerConnection,
        desc: SessionDescription,
    ) -> oneshot::Receiver<Result<(), RtcError>> {
        let (tx, rx) = oneshot::channel();
        pc.set_local_description(desc, move |res| {
            let _ = tx.send(res);
        });
        rx
    }

    fn set_remote(
        pc: &PeerConnection,
        desc: SessionDescription,
    ) -> oneshot::Receiver<Result<(), RtcError>> {
        let (tx, rx) = oneshot::channel();
        pc.set_remote_description(desc, move |res| {
            let _ = tx.send(res);
        });
        rx
    }

    #[tokio::test]
    async fn negotiate_pc() {
        let _ = env_logger::builder().is_test(true).try_init();

        let factory = PeerConnectionFactory::default();
        let config = RtcConfiguration {
            ice_servers: vec![IceServer {
                urls: vec!["stun:stun1.l.google.com:19302".to_string()],
                username: "".into(),
                password: "".into(),
            }],
            ..Default::default()
        };

        let bob = factory.create_peer_connection(config.clone()).unwrap();
        let alice = factory.create_peer_connection(config.clone()).unwrap();

        let (bob_ice_tx, mut bob_ice_rx) = mpsc::unbounded_channel::<IceCandidate>();
        let (alice_dc_tx, mut alice_dc_rx) = mpsc::unbounded_channel::<DataChannel>();

        bob.on_ice_candidate(Some(Box::new(move |candidate| {
            let _ = bob_ice_tx.send(candidate);
        })));

        alice.on_data_channel(Some(Box::new(move |dc| {
            let _ = alice_dc_tx.send(dc);
        })));

        let bob_dc = bob.create_data_channel("test_dc", DataChannelInit::default()).unwrap();
        assert_eq!(bob_dc.label(), "test_dc");

        let offer = create_offer(&bob).await.unwrap().unwrap();
        trace!("Bob offer: {:?}", offer);
        assert!(offer.sdp().contains("v=0"));

        set_local(&bob, offer.clone()).await.unwrap().unwrap();
        assert_eq!(bob.signaling_state(), SignalingState::HaveLocalOffer);

        set_remote(&alice, offer).await.unwrap().unwrap();
        assert_eq!(alice.signaling_state(), SignalingState::HaveRemoteOffer);

        let answer = create_answer(&alice).await.unwrap().unwrap();
        trace!("Alice answer: {:?}", answer);
        assert_eq!(answer.sdp_type(), SdpType::Answer);

        set_local(&alice, answer.clone()).await.unwrap().unwrap();
        set_remote(&bob, answer).await.unwrap().unwrap();

        assert_eq!(bob.signaling_state(), SignalingState::Stable);
        assert_eq!(alice.signaling_state(), SignalingState::Stable);

        let bob_ice = recv(&mut bob_ice_rx).await;
        alice.add_ice_candidate(bob_ice).unwrap();

        let alice_dc = recv(&mut alice_dc_rx).await;
        assert_eq!(alice_dc.label(), "test_dc");

        let (data_tx, mut data_rx) = mpsc::unbounded_channel::<String>();
        alice_dc.on_message(Some(Box::new(move |buffer| {
            let _ = data_tx.send(String::from_utf8_lossy(buffer.data).to_string());
        })));

        bob_dc.send(b"This is a test", true).unwrap();
        assert_eq!(recv(&mut data_rx).await, "This is a test");

        alice.close();
        bob.close();
    }

    #[tokio::test]
    async fn signaling_events_are_forwarded() {
        let factory = PeerConnectionFactory::default();
        let pc = factory.create_peer_connection(RtcConfiguration::default()).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel::<SignalingState>();
        pc.on_signaling_state_change(Some(Box::new(move |state| {
            let _ = tx.send(state);
        })));

        let _dc = pc.create_data_channel("events", DataChannelInit::default()).unwrap();
        let offer = create_offer(&pc).await.unwrap().unwrap();
        set_local(&pc, offer).await.unwrap().unwrap();

        assert_eq!(recv(&mut rx).await, SignalingState::HaveLocalOffer);
        pc.close();
    }

    #[tokio::test]
    async fn end_of_candidates_marker_is_accepted() {
        let factory = PeerConnectionFactory::default();
        let pc = factory.create_peer_connection(RtcConfiguration::default()).unwrap();
        pc.add_ice_candidate(IceCandidate::end_of_candidates()).unwrap();
        pc.close();
    }

    #[tokio::test]
    async fn malformed_candidate_is_rejected() {
        let factory = PeerConnectionFactory::default();
        let pc = factory.create_peer_connection(RtcConfiguration::default()).unwrap();
        let err =
            pc.add_ice_candidate(IceCandidate::new("garbage", Some("0"), 0)).unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::IceRejected);
        pc.close();
    }

    #[tokio::test]
    async fn operations_after_close_fail_without_reaching_the_engine() {
        let factory = PeerConnectionFactory::default();
        let pc = factory.create_peer_connection(RtcConfiguration::default()).unwrap();
        pc.close();

        let err = create_offer(&pc).await.unwrap().unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::SessionClosed);

        let err = create_answer(&pc).await.unwrap().unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::SessionClosed);

        let desc = SessionDescription::parse("v=0\r\ns=-\r\n", SdpType::Offer).unwrap();
        let err = set_local(&pc, desc.clone()).await.unwrap().unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::SessionClosed);
        let err = set_remote(&pc, desc).await.unwrap().unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::SessionClosed);

        let err = pc.add_ice_candidate(IceCandidate::end_of_candidates()).unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::SessionClosed);

        let err = pc.create_data_channel("late", DataChannelInit::default()).unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::SessionClosed);
    }

    // The engine must see no call at all for a closed session, not merely
    // report an error.
    #[derive(Default)]
    struct CountingEngine {
        calls: Arc<AtomicUsize>,
    }

    struct CountingSession {
        calls: Arc<AtomicUsize>,
    }

    impl SessionEngine for CountingEngine {
        fn create_session(
            &self,
            _config: EngineConfig,
            _observer: Arc<dyn crate::engine::SessionObserver>,
        ) -> Result<Arc<dyn crate::engine::EngineSession>, RtcError> {
            Ok(Arc::new(CountingSession { calls: self.calls.clone() }))
        }

        fn create_media_track(
            &self,
            _kind: MediaType,
            _id: String,
        ) -> Arc<dyn crate::engine::EngineMediaTrack> {
            unimplemented!("not used by this test")
        }
    }

    impl crate::engine::EngineSession for CountingSession {
        fn create_offer(&self, _options: OfferOptions, observer: Arc<CreateSdpObserver>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            observer.failure("unexpected".to_owned());
        }

        fn create_answer(&self, _options: AnswerOptions, observer: Arc<CreateSdpObserver>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            observer.failure("unexpected".to_owned());
        }

        fn set_local_description(
            &self,
            _desc: SessionDescription,
            observer: Arc<SetSdpObserver>,
        ) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            observer.failure("unexpected".to_owned());
        }

        fn set_remote_description(
            &self,
            _desc: SessionDescription,
            observer: Arc<SetSdpObserver>,
        ) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            observer.failure("unexpected".to_owned());
        }

        fn add_ice_candidate(&self, _candidate: IceCandidate) -> Result<(), RtcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn add_track(
            &self,
            _track: Arc<dyn crate::engine::EngineMediaTrack>,
            _stream_ids: Vec<String>,
        ) -> Result<(), RtcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn create_data_channel(
            &self,
            _label: &str,
            _init: DataChannelInit,
        ) -> Result<Arc<dyn EngineDataChannel>, RtcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RtcError { error_type: RtcErrorType::Internal, message: "unexpected".into() })
        }

        fn close(&self) {}

        fn connection_state(&self) -> PeerConnectionState {
            PeerConnectionState::Closed
        }

        fn ice_connection_state(&self) -> IceConnectionState {
            IceConnectionState::Closed
        }

        fn ice_gathering_state(&self) -> IceGatheringState {
            IceGatheringState::New
        }

        fn signaling_state(&self) -> SignalingState {
            SignalingState::Closed
        }

        fn current_local_description(&self) -> Option<SessionDescription> {
            None
        }

        fn current_remote_description(&self) -> Option<SessionDescription> {
            None
        }
    }

    #[tokio::test]
    async fn closed_session_produces_no_engine_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = PeerConnectionFactory::with_engine(Arc::new(CountingEngine {
            calls: calls.clone(),
        }));
        let pc = factory.create_peer_connection(RtcConfiguration::default()).unwrap();
        pc.close();

        let _ = create_offer(&pc).await.unwrap();
        let desc = SessionDescription::parse("v=0\r\ns=-\r\n", SdpType::Offer).unwrap();
        let _ = set_remote(&pc, desc).await.unwrap();
        let _ = pc.add_ice_candidate(IceCandidate::end_of_candidates());
        let _ = pc.create_data_channel("dc", DataChannelInit::default());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
