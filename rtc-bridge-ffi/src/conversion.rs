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

//! Wire structs and codecs for the C boundary.
//!
//! Every heap value crossing outward is a fresh copy owned by exactly one
//! matching free function. Optional enums use the offset-by-one encoding:
//! 0 on the wire means unset, any other value is the enum discriminant
//! starting at 1. Data-channel retransmit fields use 0 = unset and
//! value - 1 otherwise; the externally-negotiated channel id uses -1 for
//! unset.

use std::{
    ffi::{CStr, CString},
    os::raw::{c_char, c_int},
    str::FromStr,
};

use rtc_bridge::prelude::*;

#[repr(C)]
pub struct RtcSessionDescription {
    /// Type tag, one of "offer", "pranswer", "answer", "rollback".
    pub kind: *mut c_char,
    pub sdp: *mut c_char,
}

#[repr(C)]
pub struct RtcIceCandidate {
    pub candidate: *mut c_char,
    /// Null when no mid is attached.
    pub sdp_mid: *mut c_char,
    pub sdp_mline_index: c_int,
}

#[repr(C)]
pub struct RtcIceServer {
    pub urls: *const *const c_char,
    pub urls_len: c_int,
    pub username: *const c_char,
    pub password: *const c_char,
}

/// Session configuration as it crosses the wire. Policy fields are
/// offset-by-one encoded; out-of-range values decode as unset rather than
/// failing, so decoding is total.
#[repr(C)]
pub struct RtcSessionConfig {
    /// 0 = unset, 1 = balanced, 2 = max-compat, 3 = max-bundle.
    pub bundle_policy: c_int,
    /// 0 = unset, 1 = none, 2 = relay, 3 = no-host, 4 = all.
    pub ice_transport_policy: c_int,
    /// 0 = unset, 1 = negotiate, 2 = require.
    pub rtcp_mux_policy: c_int,
    /// Negative values decode as 0.
    pub ice_candidate_pool_size: c_int,
    pub ice_servers: *const RtcIceServer,
    pub ice_servers_len: c_int,
}

#[repr(C)]
pub struct RtcDataChannelOptions {
    pub ordered: bool,
    /// 0 = unset, otherwise value - 1 milliseconds.
    pub max_retransmit_time: u64,
    /// 0 = unset, otherwise value - 1 retransmissions.
    pub max_retransmits: u64,
    pub protocol: *const c_char,
    pub negotiated: bool,
    /// Externally negotiated stream id, -1 = unset.
    pub id: c_int,
    /// 0 = unset, 1 = very low, 2 = low, 3 = medium, 4 = high.
    pub priority: c_int,
}

/// Copies a Rust string to a fresh NUL-terminated C string. Interior NUL
/// bytes cannot occur in the values produced by the core (descriptions
/// reject them at parse), but a defensive empty string is returned rather
/// than panicking if one slips through.
pub(crate) fn c_string_dup(s: &str) -> *mut c_char {
    CString::new(s).unwrap_or_default().into_raw()
}

pub(crate) fn c_string_drop(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

pub(crate) unsafe fn c_string_lossy(s: *const c_char) -> String {
    if s.is_null() {
        String::new()
    } else {
        CStr::from_ptr(s).to_string_lossy().into_owned()
    }
}

pub(crate) unsafe fn c_string_opt(s: *const c_char) -> Option<String> {
    if s.is_null() {
        None
    } else {
        Some(c_string_lossy(s))
    }
}

pub(crate) fn encode_description(desc: &SessionDescription) -> *mut RtcSessionDescription {
    Box::into_raw(Box::new(RtcSessionDescription {
        kind: c_string_dup(&desc.sdp_type().to_string()),
        sdp: c_string_dup(desc.sdp()),
    }))
}

pub(crate) unsafe fn decode_description(
    raw: *const RtcSessionDescription,
) -> Result<SessionDescription, String> {
    let raw = raw.as_ref().ok_or_else(|| "description is null".to_string())?;
    let sdp_type =
        SdpType::from_str(&c_string_lossy(raw.kind)).map_err(|e| e.to_string())?;
    SessionDescription::parse(&c_string_lossy(raw.sdp), sdp_type).map_err(|e| e.to_string())
}

pub(crate) fn free_description(raw: *mut RtcSessionDescription) {
    if raw.is_null() {
        return;
    }
    let desc = unsafe { Box::from_raw(raw) };
    c_string_drop(desc.kind);
    c_string_drop(desc.sdp);
}

pub(crate) fn encode_candidate(candidate: &IceCandidate) -> *mut RtcIceCandidate {
    Box::into_raw(Box::new(RtcIceCandidate {
        candidate: c_string_dup(&candidate.candidate),
        sdp_mid: match &candidate.sdp_mid {
            Some(mid) => c_string_dup(mid),
            None => std::ptr::null_mut(),
        },
        sdp_mline_index: candidate.sdp_mline_index,
    }))
}

pub(crate) unsafe fn decode_candidate(raw: &RtcIceCandidate) -> IceCandidate {
    IceCandidate {
        candidate: c_string_lossy(raw.candidate),
        sdp_mid: c_string_opt(raw.sdp_mid),
        sdp_mline_index: raw.sdp_mline_index,
    }
}

pub(crate) fn free_candidate(raw: *mut RtcIceCandidate) {
    if raw.is_null() {
        return;
    }
    let candidate = unsafe { Box::from_raw(raw) };
    c_string_drop(candidate.candidate);
    c_string_drop(candidate.sdp_mid);
}

fn decode_bundle_policy(raw: c_int) -> Option<BundlePolicy> {
    match raw {
        1 => Some(BundlePolicy::Balanced),
        2 => Some(BundlePolicy::MaxCompat),
        3 => Some(BundlePolicy::MaxBundle),
        _ => None,
    }
}

fn decode_ice_transport_policy(raw: c_int) -> Option<IceTransportsType> {
    match raw {
        1 => Some(IceTransportsType::None),
        2 => Some(IceTransportsType::Relay),
        3 => Some(IceTransportsType::NoHost),
        4 => Some(IceTransportsType::All),
        _ => None,
    }
}

fn decode_rtcp_mux_policy(raw: c_int) -> Option<RtcpMuxPolicy> {
    match raw {
        1 => Some(RtcpMuxPolicy::Negotiate),
        2 => Some(RtcpMuxPolicy::Require),
        _ => None,
    }
}

fn decode_priority(raw: c_int) -> Option<Priority> {
    match raw {
        1 => Some(Priority::VeryLow),
        2 => Some(Priority::Low),
        3 => Some(Priority::Medium),
        4 => Some(Priority::High),
        _ => None,
    }
}

unsafe fn decode_ice_server(raw: &RtcIceServer) -> IceServer {
    let urls = if raw.urls.is_null() || raw.urls_len <= 0 {
        vec![]
    } else {
        std::slice::from_raw_parts(raw.urls, raw.urls_len as usize)
            .iter()
            .map(|url| c_string_lossy(*url))
            .collect()
    };
    IceServer {
        urls,
        username: c_string_lossy(raw.username),
        password: c_string_lossy(raw.password),
    }
}

/// Total: a null pointer and any out-of-range field decode to defaults.
pub(crate) unsafe fn decode_config(raw: *const RtcSessionConfig) -> RtcConfiguration {
    let Some(raw) = raw.as_ref() else {
        return RtcConfiguration::default();
    };

    let ice_servers = if raw.ice_servers.is_null() || raw.ice_servers_len <= 0 {
        vec![]
    } else {
        std::slice::from_raw_parts(raw.ice_servers, raw.ice_servers_len as usize)
            .iter()
            .map(|server| decode_ice_server(server))
            .collect()
    };

    RtcConfiguration {
        ice_servers,
        bundle_policy: decode_bundle_policy(raw.bundle_policy),
        ice_transport_type: decode_ice_transport_policy(raw.ice_transport_policy),
        rtcp_mux_policy: decode_rtcp_mux_policy(raw.rtcp_mux_policy),
        ice_candidate_pool_size: raw.ice_candidate_pool_size.max(0) as u16,
    }
}

pub(crate) unsafe fn decode_data_channel_options(
    raw: *const RtcDataChannelOptions,
) -> DataChannelInit {
    let Some(raw) = raw.as_ref() else {
        return DataChannelInit::default();
    };

    DataChannelInit {
        ordered: raw.ordered,
        max_retransmit_time: (raw.max_retransmit_time > 0)
            .then(|| (raw.max_retransmit_time - 1) as i32),
        max_retransmits: (raw.max_retransmits > 0).then(|| (raw.max_retransmits - 1) as i32),
        protocol: c_string_lossy(raw.protocol),
        negotiated: raw.negotiated,
        id: raw.id,
        priority: decode_priority(raw.priority),
    }
}

pub(crate) fn signaling_state_to_c(state: SignalingState) -> c_int {
    match state {
        SignalingState::Stable => 0,
        SignalingState::HaveLocalOffer => 1,
        SignalingState::HaveLocalPrAnswer => 2,
        SignalingState::HaveRemoteOffer => 3,
        SignalingState::HaveRemotePrAnswer => 4,
        SignalingState::Closed => 5,
    }
}

pub(crate) fn connection_state_to_c(state: PeerConnectionState) -> c_int {
    match state {
        PeerConnectionState::New => 0,
        PeerConnectionState::Connecting => 1,
        PeerConnectionState::Connected => 2,
        PeerConnectionState::Disconnected => 3,
        PeerConnectionState::Failed => 4,
        PeerConnectionState::Closed => 5,
    }
}

pub(crate) fn ice_gathering_state_to_c(state: IceGatheringState) -> c_int {
    match state {
        IceGatheringState::New => 0,
        IceGatheringState::Gathering => 1,
        IceGatheringState::Complete => 2,
    }
}

pub(crate) fn ice_connection_state_to_c(state: IceConnectionState) -> c_int {
    match state {
        IceConnectionState::New => 0,
        IceConnectionState::Checking => 1,
        IceConnectionState::Connected => 2,
        IceConnectionState::Completed => 3,
        IceConnectionState::Failed => 4,
        IceConnectionState::Disconnected => 5,
        IceConnectionState::Closed => 6,
    }
}

pub(crate) fn data_channel_state_to_c(state: DataChannelState) -> c_int {
    match state {
        DataChannelState::Connecting => 0,
        DataChannelState::Open => 1,
        DataChannelState::Closing => 2,
        DataChannelState::Closed => 3,
    }
}
