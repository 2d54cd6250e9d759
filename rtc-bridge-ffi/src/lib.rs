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

//! Flat C ABI over the `rtc-bridge` core.
//!
//! Ownership rules: every pointer returned by a `rtc_*` function is a fresh
//! heap value released by exactly one matching `*_free` call. Pointers
//! handed to an event callback are valid only for the duration of the call
//! (use [`rtc_ice_candidate_clone`] to retain a candidate), except
//! data-channel and track handles, whose ownership transfers to the caller.
//!
//! Event callbacks fire on engine threads; they must be thread-safe and must
//! not block. A null events table or a null callback field drops the event
//! silently. `rtc_session_close` detaches every callback; events already in
//! flight may still be delivered while it runs, but none after it returns.

use std::{
    os::raw::{c_char, c_int, c_void},
    panic,
};

use rtc_bridge::prelude::*;

pub mod conversion;
pub use conversion::{
    RtcDataChannelOptions, RtcIceCandidate, RtcIceServer, RtcSessionConfig,
    RtcSessionDescription,
};

pub struct RtcFactory {
    inner: PeerConnectionFactory,
}

pub struct RtcSession {
    inner: PeerConnection,
}

pub struct RtcDataChannel {
    inner: DataChannel,
}

pub struct RtcMediaTrack {
    inner: MediaStreamTrack,
}

pub type RtcCreateDescriptionCallback =
    extern "C" fn(error: *const c_char, desc: *const RtcSessionDescription, ctx: *mut c_void);
pub type RtcSetDescriptionCallback = extern "C" fn(error: *const c_char, ctx: *mut c_void);
pub type RtcStateCallback = extern "C" fn(state: c_int, ctx: *mut c_void);
pub type RtcIceCandidateCallback =
    extern "C" fn(candidate: *const RtcIceCandidate, ctx: *mut c_void);
pub type RtcDataChannelCallback =
    extern "C" fn(channel: *mut RtcDataChannel, ctx: *mut c_void);
pub type RtcTrackCallback = extern "C" fn(track: *mut RtcMediaTrack, ctx: *mut c_void);
pub type RtcVoidCallback = extern "C" fn(ctx: *mut c_void);
pub type RtcMessageCallback =
    extern "C" fn(data: *const u8, len: usize, binary: bool, ctx: *mut c_void);

/// Connection event table, copied when the session is created. Field order
/// is part of the ABI.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RtcSessionEvents {
    pub on_signaling_change: Option<RtcStateCallback>,
    pub on_data_channel: Option<RtcDataChannelCallback>,
    pub on_ice_gathering_change: Option<RtcStateCallback>,
    pub on_ice_candidate: Option<RtcIceCandidateCallback>,
    pub on_renegotiation_needed: Option<RtcVoidCallback>,
    pub on_ice_connection_change: Option<RtcStateCallback>,
    pub on_track: Option<RtcTrackCallback>,
    pub on_connection_change: Option<RtcStateCallback>,
}

/// The caller's context pointer, forwarded verbatim to every callback. The
/// caller guarantees it stays valid and usable from any thread until the
/// session is closed.
#[derive(Clone, Copy)]
struct CallerCtx(*mut c_void);

unsafe impl Send for CallerCtx {}
unsafe impl Sync for CallerCtx {}

impl CallerCtx {
    fn get(self) -> *mut c_void {
        self.0
    }
}

fn wire_events(pc: &PeerConnection, events: &RtcSessionEvents, ctx: *mut c_void) {
    let ctx = CallerCtx(ctx);

    if let Some(cb) = events.on_signaling_change {
        pc.on_signaling_state_change(Some(Box::new(move |state| {
            cb(conversion::signaling_state_to_c(state), ctx.get());
        })));
    }
    if let Some(cb) = events.on_connection_change {
        pc.on_connection_state_change(Some(Box::new(move |state| {
            cb(conversion::connection_state_to_c(state), ctx.get());
        })));
    }
    if let Some(cb) = events.on_ice_gathering_change {
        pc.on_ice_gathering_state_change(Some(Box::new(move |state| {
            cb(conversion::ice_gathering_state_to_c(state), ctx.get());
        })));
    }
    if let Some(cb) = events.on_ice_connection_change {
        pc.on_ice_connection_state_change(Some(Box::new(move |state| {
            cb(conversion::ice_connection_state_to_c(state), ctx.get());
        })));
    }
    if let Some(cb) = events.on_ice_candidate {
        pc.on_ice_candidate(Some(Box::new(move |candidate| {
            let raw = conversion::encode_candidate(&candidate);
            cb(raw, ctx.get());
            conversion::free_candidate(raw);
        })));
    }
    if let Some(cb) = events.on_data_channel {
        pc.on_data_channel(Some(Box::new(move |channel| {
            let handle = Box::into_raw(Box::new(RtcDataChannel { inner: channel }));
            cb(handle, ctx.get());
        })));
    }
    if let Some(cb) = events.on_track {
        pc.on_track(Some(Box::new(move |event| {
            let handle = Box::into_raw(Box::new(RtcMediaTrack { inner: event.track }));
            cb(handle, ctx.get());
        })));
    }
    if let Some(cb) = events.on_renegotiation_needed {
        pc.on_renegotiation_needed(Some(Box::new(move || {
            cb(ctx.get());
        })));
    }
}

#[no_mangle]
pub extern "C" fn rtc_factory_create() -> *mut RtcFactory {
    Box::into_raw(Box::new(RtcFactory { inner: PeerConnectionFactory::default() }))
}

/// # Safety
///
/// `factory` must come from [`rtc_factory_create`] and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn rtc_factory_free(factory: *mut RtcFactory) {
    if !factory.is_null() {
        drop(Box::from_raw(factory));
    }
}

/// # Safety
///
/// The foreign language must only provide valid pointers. `id` must be a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn rtc_factory_create_audio_track(
    factory: *mut RtcFactory,
    id: *const c_char,
) -> *mut RtcMediaTrack {
    let Some(factory) = factory.as_ref() else {
        return std::ptr::null_mut();
    };
    let track = factory
        .inner
        .create_audio_track(&conversion::c_string_lossy(id), NativeAudioSource::default());
    Box::into_raw(Box::new(RtcMediaTrack { inner: track.into() }))
}

/// # Safety
///
/// Same contract as [`rtc_factory_create_audio_track`].
#[no_mangle]
pub unsafe extern "C" fn rtc_factory_create_video_track(
    factory: *mut RtcFactory,
    id: *const c_char,
) -> *mut RtcMediaTrack {
    let Some(factory) = factory.as_ref() else {
        return std::ptr::null_mut();
    };
    let track = factory
        .inner
        .create_video_track(&conversion::c_string_lossy(id), NativeVideoSource::default());
    Box::into_raw(Box::new(RtcMediaTrack { inner: track.into() }))
}

/// # Safety
///
/// `track` must come from this library and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn rtc_media_track_free(track: *mut RtcMediaTrack) {
    if !track.is_null() {
        drop(Box::from_raw(track));
    }
}

/// Creates a session. `config` and `events` may be null; `ctx` is forwarded
/// verbatim to every event callback. Returns null on failure, in which case
/// `error_out` (when non-null) receives a message released with
/// [`rtc_string_free`].
///
/// # Safety
///
/// The foreign language must only provide valid pointers, and `ctx` must
/// stay valid until the session is closed.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_create(
    factory: *mut RtcFactory,
    config: *const RtcSessionConfig,
    events: *const RtcSessionEvents,
    ctx: *mut c_void,
    error_out: *mut *mut c_char,
) -> *mut RtcSession {
    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let Some(factory) = factory.as_ref() else {
            return Err("factory is null".to_string());
        };
        let config = conversion::decode_config(config);
        let pc = factory.inner.create_peer_connection(config).map_err(|e| e.to_string())?;
        if let Some(events) = events.as_ref() {
            wire_events(&pc, events, ctx);
        }
        Ok(Box::into_raw(Box::new(RtcSession { inner: pc })))
    }));

    match result {
        Ok(Ok(session)) => session,
        Ok(Err(message)) => {
            if !error_out.is_null() {
                *error_out = conversion::c_string_dup(&message);
            }
            std::ptr::null_mut()
        }
        Err(_) => {
            log::error!("panic while creating a session");
            if !error_out.is_null() {
                *error_out = conversion::c_string_dup("panic while creating a session");
            }
            std::ptr::null_mut()
        }
    }
}

/// # Safety
///
/// The foreign language must only provide valid pointers. `cb` (when
/// non-null) fires exactly once, possibly on another thread; the encoded
/// description is released by the bridge once `cb` returns.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_create_offer(
    session: *mut RtcSession,
    cb: Option<RtcCreateDescriptionCallback>,
    ctx: *mut c_void,
) {
    let Some(session) = session.as_ref() else {
        return;
    };
    let ctx = CallerCtx(ctx);
    session.inner.create_offer(OfferOptions::default(), move |result| {
        deliver_description(cb, ctx, result);
    });
}

/// # Safety
///
/// Same contract as [`rtc_session_create_offer`].
#[no_mangle]
pub unsafe extern "C" fn rtc_session_create_answer(
    session: *mut RtcSession,
    cb: Option<RtcCreateDescriptionCallback>,
    ctx: *mut c_void,
) {
    let Some(session) = session.as_ref() else {
        return;
    };
    let ctx = CallerCtx(ctx);
    session.inner.create_answer(AnswerOptions::default(), move |result| {
        deliver_description(cb, ctx, result);
    });
}

fn deliver_description(
    cb: Option<RtcCreateDescriptionCallback>,
    ctx: CallerCtx,
    result: Result<SessionDescription, RtcError>,
) {
    let Some(cb) = cb else {
        return;
    };
    match result {
        Ok(desc) => {
            let raw = conversion::encode_description(&desc);
            cb(std::ptr::null(), raw, ctx.get());
            conversion::free_description(raw);
        }
        Err(e) => {
            let error = conversion::c_string_dup(&e.to_string());
            cb(error, std::ptr::null(), ctx.get());
            conversion::c_string_drop(error);
        }
    }
}

fn deliver_completion(cb: Option<RtcSetDescriptionCallback>, ctx: CallerCtx, result: Result<(), RtcError>) {
    let Some(cb) = cb else {
        return;
    };
    match result {
        Ok(()) => cb(std::ptr::null(), ctx.get()),
        Err(e) => {
            let error = conversion::c_string_dup(&e.to_string());
            cb(error, ctx.get());
            conversion::c_string_drop(error);
        }
    }
}

/// # Safety
///
/// The foreign language must only provide valid pointers; `desc` is copied
/// and may be released as soon as this returns.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_set_local_description(
    session: *mut RtcSession,
    desc: *const RtcSessionDescription,
    cb: Option<RtcSetDescriptionCallback>,
    ctx: *mut c_void,
) {
    let Some(session) = session.as_ref() else {
        return;
    };
    let ctx = CallerCtx(ctx);
    match conversion::decode_description(desc) {
        Ok(desc) => session.inner.set_local_description(desc, move |result| {
            deliver_completion(cb, ctx, result);
        }),
        Err(message) => deliver_completion(
            cb,
            ctx,
            Err(RtcError { error_type: RtcErrorType::InvalidSdp, message }),
        ),
    }
}

/// # Safety
///
/// Same contract as [`rtc_session_set_local_description`].
#[no_mangle]
pub unsafe extern "C" fn rtc_session_set_remote_description(
    session: *mut RtcSession,
    desc: *const RtcSessionDescription,
    cb: Option<RtcSetDescriptionCallback>,
    ctx: *mut c_void,
) {
    let Some(session) = session.as_ref() else {
        return;
    };
    let ctx = CallerCtx(ctx);
    match conversion::decode_description(desc) {
        Ok(desc) => session.inner.set_remote_description(desc, move |result| {
            deliver_completion(cb, ctx, result);
        }),
        Err(message) => deliver_completion(
            cb,
            ctx,
            Err(RtcError { error_type: RtcErrorType::InvalidSdp, message }),
        ),
    }
}

/// Returns false when the candidate is rejected or the session is closed.
/// An empty candidate string is the end-of-candidates marker and is
/// accepted.
///
/// # Safety
///
/// The foreign language must only provide valid pointers; `candidate` is
/// copied and may be released as soon as this returns.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_add_ice_candidate(
    session: *mut RtcSession,
    candidate: *const RtcIceCandidate,
) -> bool {
    let (Some(session), Some(candidate)) = (session.as_ref(), candidate.as_ref()) else {
        return false;
    };
    match session.inner.add_ice_candidate(conversion::decode_candidate(candidate)) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("candidate not added: {}", e);
            false
        }
    }
}

/// # Safety
///
/// The foreign language must only provide valid pointers. `stream_id` may
/// be null; the track handle stays owned by the caller.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_add_track(
    session: *mut RtcSession,
    track: *mut RtcMediaTrack,
    stream_id: *const c_char,
) -> bool {
    let (Some(session), Some(track)) = (session.as_ref(), track.as_ref()) else {
        return false;
    };
    let stream_ids = match conversion::c_string_opt(stream_id) {
        Some(stream_id) => vec![stream_id],
        None => vec![],
    };
    match session.inner.add_track(track.inner.clone(), &stream_ids) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("track not added: {}", e);
            false
        }
    }
}

/// Returns null on failure (conflicting options, closed session). `options`
/// may be null for the defaults.
///
/// # Safety
///
/// The foreign language must only provide valid pointers; `label` must be a
/// NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_create_data_channel(
    session: *mut RtcSession,
    label: *const c_char,
    options: *const RtcDataChannelOptions,
) -> *mut RtcDataChannel {
    let Some(session) = session.as_ref() else {
        return std::ptr::null_mut();
    };
    let label = conversion::c_string_lossy(label);
    let init = conversion::decode_data_channel_options(options);
    match session.inner.create_data_channel(&label, init) {
        Ok(channel) => Box::into_raw(Box::new(RtcDataChannel { inner: channel })),
        Err(e) => {
            log::warn!("data channel not created: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Returns the current local description, or null when none is set. Release
/// with [`rtc_session_description_free`].
///
/// # Safety
///
/// `session` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_local_description(
    session: *mut RtcSession,
) -> *mut RtcSessionDescription {
    match session.as_ref().and_then(|s| s.inner.current_local_description()) {
        Some(desc) => conversion::encode_description(&desc),
        None => std::ptr::null_mut(),
    }
}

/// # Safety
///
/// Same contract as [`rtc_session_local_description`].
#[no_mangle]
pub unsafe extern "C" fn rtc_session_remote_description(
    session: *mut RtcSession,
) -> *mut RtcSessionDescription {
    match session.as_ref().and_then(|s| s.inner.current_remote_description()) {
        Some(desc) => conversion::encode_description(&desc),
        None => std::ptr::null_mut(),
    }
}

/// # Safety
///
/// `session` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_signaling_state(session: *mut RtcSession) -> c_int {
    match session.as_ref() {
        Some(session) => conversion::signaling_state_to_c(session.inner.signaling_state()),
        None => conversion::signaling_state_to_c(SignalingState::Closed),
    }
}

/// # Safety
///
/// `session` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_connection_state(session: *mut RtcSession) -> c_int {
    match session.as_ref() {
        Some(session) => conversion::connection_state_to_c(session.inner.connection_state()),
        None => conversion::connection_state_to_c(PeerConnectionState::Closed),
    }
}

/// Detaches every callback and closes the session. Idempotent; events
/// already in flight may still be delivered while this runs, but none after
/// it returns.
///
/// # Safety
///
/// `session` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_close(session: *mut RtcSession) {
    if let Some(session) = session.as_ref() {
        session.inner.close();
    }
}

/// Closes the session if the caller has not already, then releases the
/// handle.
///
/// # Safety
///
/// `session` must come from this library and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_free(session: *mut RtcSession) {
    if session.is_null() {
        return;
    }
    let session = Box::from_raw(session);
    session.inner.close();
}

/// Returns the channel label. Release with [`rtc_string_free`].
///
/// # Safety
///
/// `channel` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rtc_data_channel_label(
    channel: *mut RtcDataChannel,
) -> *mut c_char {
    match channel.as_ref() {
        Some(channel) => conversion::c_string_dup(&channel.inner.label()),
        None => std::ptr::null_mut(),
    }
}

/// # Safety
///
/// `channel` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rtc_data_channel_id(channel: *mut RtcDataChannel) -> c_int {
    match channel.as_ref() {
        Some(channel) => channel.inner.id(),
        None => -1,
    }
}

/// # Safety
///
/// `channel` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rtc_data_channel_state(channel: *mut RtcDataChannel) -> c_int {
    match channel.as_ref() {
        Some(channel) => conversion::data_channel_state_to_c(channel.inner.state()),
        None => conversion::data_channel_state_to_c(DataChannelState::Closed),
    }
}

/// Returns false when the channel is not open or the payload is not valid
/// UTF-8 text (`binary == false`).
///
/// # Safety
///
/// `data` must point to `len` readable bytes; the payload is copied before
/// this returns.
#[no_mangle]
pub unsafe extern "C" fn rtc_data_channel_send(
    channel: *mut RtcDataChannel,
    data: *const u8,
    len: usize,
    binary: bool,
) -> bool {
    let Some(channel) = channel.as_ref() else {
        return false;
    };
    if data.is_null() && len > 0 {
        return false;
    }
    let data = if len == 0 { &[] } else { std::slice::from_raw_parts(data, len) };
    match channel.inner.send(data, binary) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("data channel send failed: {}", e);
            false
        }
    }
}

/// # Safety
///
/// `channel` must come from this library; `ctx` must stay valid until the
/// handler is replaced or the channel is freed.
#[no_mangle]
pub unsafe extern "C" fn rtc_data_channel_on_message(
    channel: *mut RtcDataChannel,
    cb: Option<RtcMessageCallback>,
    ctx: *mut c_void,
) {
    let Some(channel) = channel.as_ref() else {
        return;
    };
    match cb {
        Some(cb) => {
            let ctx = CallerCtx(ctx);
            channel.inner.on_message(Some(Box::new(move |buffer| {
                cb(buffer.data.as_ptr(), buffer.data.len(), buffer.binary, ctx.get());
            })));
        }
        None => channel.inner.on_message(None),
    }
}

/// # Safety
///
/// Same contract as [`rtc_data_channel_on_message`].
#[no_mangle]
pub unsafe extern "C" fn rtc_data_channel_on_state_change(
    channel: *mut RtcDataChannel,
    cb: Option<RtcStateCallback>,
    ctx: *mut c_void,
) {
    let Some(channel) = channel.as_ref() else {
        return;
    };
    match cb {
        Some(cb) => {
            let ctx = CallerCtx(ctx);
            channel.inner.on_state_change(Some(Box::new(move |state| {
                cb(conversion::data_channel_state_to_c(state), ctx.get());
            })));
        }
        None => channel.inner.on_state_change(None),
    }
}

/// # Safety
///
/// `channel` must come from this library.
#[no_mangle]
pub unsafe extern "C" fn rtc_data_channel_close(channel: *mut RtcDataChannel) {
    if let Some(channel) = channel.as_ref() {
        channel.inner.close();
    }
}

/// Releases the handle; the channel itself is closed only through
/// [`rtc_data_channel_close`] or the session.
///
/// # Safety
///
/// `channel` must come from this library and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn rtc_data_channel_free(channel: *mut RtcDataChannel) {
    if !channel.is_null() {
        drop(Box::from_raw(channel));
    }
}

/// # Safety
///
/// `desc` must come from this library and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn rtc_session_description_free(desc: *mut RtcSessionDescription) {
    conversion::free_description(desc);
}

/// Copies a candidate, typically to retain an event payload beyond the
/// callback. Release with [`rtc_ice_candidate_free`].
///
/// # Safety
///
/// `candidate` must point to a valid candidate.
#[no_mangle]
pub unsafe extern "C" fn rtc_ice_candidate_clone(
    candidate: *const RtcIceCandidate,
) -> *mut RtcIceCandidate {
    match candidate.as_ref() {
        Some(candidate) => conversion::encode_candidate(&conversion::decode_candidate(candidate)),
        None => std::ptr::null_mut(),
    }
}

/// # Safety
///
/// `candidate` must come from this library and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn rtc_ice_candidate_free(candidate: *mut RtcIceCandidate) {
    conversion::free_candidate(candidate);
}

/// # Safety
///
/// `s` must come from this library and not be freed twice.
#[no_mangle]
pub unsafe extern "C" fn rtc_string_free(s: *mut c_char) {
    conversion::c_string_drop(s);
}

#[cfg(test)]
mod tests {
    use std::{
        ffi::CString,
        ptr,
        sync::mpsc,
        time::Duration,
    };

    use super::*;

    type DescResult = Result<(String, String), String>;

    fn recv<T>(rx: &mpsc::Receiver<T>) -> T {
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    extern "C" fn desc_cb(
        error: *const c_char,
        desc: *const RtcSessionDescription,
        ctx: *mut c_void,
    ) {
        let tx = unsafe { &*(ctx as *const mpsc::Sender<DescResult>) };
        let result = if error.is_null() {
            let desc = unsafe { &*desc };
            unsafe {
                Ok((
                    conversion::c_string_lossy(desc.kind),
                    conversion::c_string_lossy(desc.sdp),
                ))
            }
        } else {
            Err(unsafe { conversion::c_string_lossy(error) })
        };
        let _ = tx.send(result);
    }

    extern "C" fn set_cb(error: *const c_char, ctx: *mut c_void) {
        let tx = unsafe { &*(ctx as *const mpsc::Sender<Option<String>>) };
        let error = if error.is_null() {
            None
        } else {
            Some(unsafe { conversion::c_string_lossy(error) })
        };
        let _ = tx.send(error);
    }

    extern "C" fn dc_cb(channel: *mut RtcDataChannel, ctx: *mut c_void) {
        let tx = unsafe { &*(ctx as *const mpsc::Sender<usize>) };
        let _ = tx.send(channel as usize);
    }

    extern "C" fn message_cb(data: *const u8, len: usize, binary: bool, ctx: *mut c_void) {
        let tx = unsafe { &*(ctx as *const mpsc::Sender<(Vec<u8>, bool)>) };
        let bytes = unsafe { std::slice::from_raw_parts(data, len) }.to_vec();
        let _ = tx.send((bytes, binary));
    }

    fn empty_events() -> RtcSessionEvents {
        RtcSessionEvents {
            on_signaling_change: None,
            on_data_channel: None,
            on_ice_gathering_change: None,
            on_ice_candidate: None,
            on_renegotiation_needed: None,
            on_ice_connection_change: None,
            on_track: None,
            on_connection_change: None,
        }
    }

    fn borrowed_description(kind: &CString, sdp: &CString) -> RtcSessionDescription {
        RtcSessionDescription {
            kind: kind.as_ptr() as *mut c_char,
            sdp: sdp.as_ptr() as *mut c_char,
        }
    }

    #[test]
    fn negotiates_a_session_through_the_c_surface() {
        let _ = env_logger::builder().is_test(true).try_init();
        unsafe {
            let factory = rtc_factory_create();

            let (dc_tx, dc_rx) = mpsc::channel::<usize>();
            let dc_tx = Box::new(dc_tx);
            let events =
                RtcSessionEvents { on_data_channel: Some(dc_cb), ..empty_events() };

            let bob =
                rtc_session_create(factory, ptr::null(), ptr::null(), ptr::null_mut(), ptr::null_mut());
            let alice = rtc_session_create(
                factory,
                ptr::null(),
                &events,
                &*dc_tx as *const mpsc::Sender<usize> as *mut c_void,
                ptr::null_mut(),
            );
            assert!(!bob.is_null());
            assert!(!alice.is_null());

            let label = CString::new("chat").unwrap();
            let bob_dc = rtc_session_create_data_channel(bob, label.as_ptr(), ptr::null());
            assert!(!bob_dc.is_null());

            let (desc_tx, desc_rx) = mpsc::channel::<DescResult>();
            let desc_tx = Box::new(desc_tx);
            let desc_ctx = &*desc_tx as *const mpsc::Sender<DescResult> as *mut c_void;
            let (set_tx, set_rx) = mpsc::channel::<Option<String>>();
            let set_tx = Box::new(set_tx);
            let set_ctx = &*set_tx as *const mpsc::Sender<Option<String>> as *mut c_void;

            rtc_session_create_offer(bob, Some(desc_cb), desc_ctx);
            let (kind, sdp) = recv(&desc_rx).unwrap();
            assert_eq!(kind, "offer");
            assert!(sdp.contains("v=0"));

            let kind = CString::new(kind).unwrap();
            let sdp = CString::new(sdp).unwrap();
            let offer = borrowed_description(&kind, &sdp);
            rtc_session_set_local_description(bob, &offer, Some(set_cb), set_ctx);
            assert_eq!(recv(&set_rx), None);
            rtc_session_set_remote_description(alice, &offer, Some(set_cb), set_ctx);
            assert_eq!(recv(&set_rx), None);

            let local = rtc_session_local_description(bob);
            assert!(!local.is_null());
            rtc_session_description_free(local);

            rtc_session_create_answer(alice, Some(desc_cb), desc_ctx);
            let (kind, sdp) = recv(&desc_rx).unwrap();
            assert_eq!(kind, "answer");

            let kind = CString::new(kind).unwrap();
            let sdp = CString::new(sdp).unwrap();
            let answer = borrowed_description(&kind, &sdp);
            rtc_session_set_local_description(alice, &answer, Some(set_cb), set_ctx);
            assert_eq!(recv(&set_rx), None);
            rtc_session_set_remote_description(bob, &answer, Some(set_cb), set_ctx);
            assert_eq!(recv(&set_rx), None);

            let alice_dc = recv(&dc_rx) as *mut RtcDataChannel;
            let alice_label = rtc_data_channel_label(alice_dc);
            assert_eq!(conversion::c_string_lossy(alice_label), "chat");
            rtc_string_free(alice_label);

            let (msg_tx, msg_rx) = mpsc::channel::<(Vec<u8>, bool)>();
            let msg_tx = Box::new(msg_tx);
            rtc_data_channel_on_message(
                alice_dc,
                Some(message_cb),
                &*msg_tx as *const mpsc::Sender<(Vec<u8>, bool)> as *mut c_void,
            );

            let payload = b"hello over the wire";
            assert!(rtc_data_channel_send(bob_dc, payload.as_ptr(), payload.len(), true));
            let (bytes, binary) = recv(&msg_rx);
            assert_eq!(bytes, payload);
            assert!(binary);

            rtc_session_close(alice);
            rtc_session_close(bob);
            rtc_data_channel_free(alice_dc);
            rtc_data_channel_free(bob_dc);
            rtc_session_free(alice);
            rtc_session_free(bob);
            rtc_factory_free(factory);
        }
    }

    #[test]
    fn empty_candidate_is_accepted_and_garbage_is_not() {
        unsafe {
            let factory = rtc_factory_create();
            let session =
                rtc_session_create(factory, ptr::null(), ptr::null(), ptr::null_mut(), ptr::null_mut());

            let empty = CString::new("").unwrap();
            let marker = RtcIceCandidate {
                candidate: empty.as_ptr() as *mut c_char,
                sdp_mid: ptr::null_mut(),
                sdp_mline_index: 0,
            };
            assert!(rtc_session_add_ice_candidate(session, &marker));

            let garbage = CString::new("garbage").unwrap();
            let bad = RtcIceCandidate {
                candidate: garbage.as_ptr() as *mut c_char,
                sdp_mid: ptr::null_mut(),
                sdp_mline_index: 0,
            };
            assert!(!rtc_session_add_ice_candidate(session, &bad));

            rtc_session_free(session);
            rtc_factory_free(factory);
        }
    }

    #[test]
    fn closed_session_reports_session_closed() {
        unsafe {
            let factory = rtc_factory_create();
            let session =
                rtc_session_create(factory, ptr::null(), ptr::null(), ptr::null_mut(), ptr::null_mut());
            rtc_session_close(session);

            let (desc_tx, desc_rx) = mpsc::channel::<DescResult>();
            let desc_tx = Box::new(desc_tx);
            rtc_session_create_offer(
                session,
                Some(desc_cb),
                &*desc_tx as *const mpsc::Sender<DescResult> as *mut c_void,
            );
            let error = recv(&desc_rx).unwrap_err();
            assert!(error.contains("closed"), "{}", error);

            let label = CString::new("late").unwrap();
            assert!(rtc_session_create_data_channel(session, label.as_ptr(), ptr::null())
                .is_null());

            rtc_session_free(session);
            rtc_factory_free(factory);
        }
    }

    #[test]
    fn session_accepts_a_wire_config_with_ice_servers() {
        unsafe {
            let factory = rtc_factory_create();
            let url = CString::new("stun:stun1.l.google.com:19302").unwrap();
            let urls = [url.as_ptr()];
            let server = RtcIceServer {
                urls: urls.as_ptr(),
                urls_len: 1,
                username: ptr::null(),
                password: ptr::null(),
            };
            let config = RtcSessionConfig {
                bundle_policy: 3,
                ice_transport_policy: 4,
                rtcp_mux_policy: 2,
                ice_candidate_pool_size: 1,
                ice_servers: &server,
                ice_servers_len: 1,
            };
            let session =
                rtc_session_create(factory, &config, ptr::null(), ptr::null_mut(), ptr::null_mut());
            assert!(!session.is_null());
            rtc_session_free(session);
            rtc_factory_free(factory);
        }
    }

    #[test]
    fn added_track_appears_in_the_offer() {
        unsafe {
            let factory = rtc_factory_create();
            let session =
                rtc_session_create(factory, ptr::null(), ptr::null(), ptr::null_mut(), ptr::null_mut());

            let id = CString::new("mic").unwrap();
            let track = rtc_factory_create_audio_track(factory, id.as_ptr());
            let stream = CString::new("stream_0").unwrap();
            assert!(rtc_session_add_track(session, track, stream.as_ptr()));

            let (desc_tx, desc_rx) = mpsc::channel::<DescResult>();
            let desc_tx = Box::new(desc_tx);
            rtc_session_create_offer(
                session,
                Some(desc_cb),
                &*desc_tx as *const mpsc::Sender<DescResult> as *mut c_void,
            );
            let (_, sdp) = recv(&desc_rx).unwrap();
            assert!(sdp.contains("m=audio"));
            assert!(sdp.contains("a=msid:stream_0 mic"));

            rtc_media_track_free(track);
            rtc_session_free(session);
            rtc_factory_free(factory);
        }
    }

    #[test]
    fn free_functions_accept_null() {
        unsafe {
            rtc_factory_free(ptr::null_mut());
            rtc_session_free(ptr::null_mut());
            rtc_data_channel_free(ptr::null_mut());
            rtc_media_track_free(ptr::null_mut());
            rtc_session_description_free(ptr::null_mut());
            rtc_ice_candidate_free(ptr::null_mut());
            rtc_string_free(ptr::null_mut());
        }
    }
}
