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

//! Minimal SDP construction and inspection for the in-process engine.
//!
//! Only the handful of attributes the engine negotiates with are written and
//! read back: the origin session id (used to match a description to the
//! session that produced it), data-channel labels and track msid lines.
//! Everything else in an incoming description is ignored, never an error.

use crate::MediaType;

#[derive(Debug, Clone)]
pub(crate) struct ChannelDesc {
    pub label: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TrackDesc {
    pub kind: MediaType,
    pub id: String,
    pub stream_ids: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct SdpInfo {
    pub session_id: u64,
    pub channels: Vec<ChannelDesc>,
    pub tracks: Vec<TrackDesc>,
}

pub(crate) fn build(
    session_id: u64,
    ice_ufrag: &str,
    ice_pwd: &str,
    channels: &[ChannelDesc],
    tracks: &[TrackDesc],
) -> String {
    let mut out = String::new();
    out.push_str("v=0\r\n");
    out.push_str(&format!("o=- {} 2 IN IP4 127.0.0.1\r\n", session_id));
    out.push_str("s=-\r\n");
    out.push_str("t=0 0\r\n");
    out.push_str("a=msid-semantic: WMS\r\n");

    let section_count = tracks.len() + usize::from(!channels.is_empty());
    if section_count > 0 {
        out.push_str("a=group:BUNDLE");
        for mid in 0..section_count {
            out.push_str(&format!(" {}", mid));
        }
        out.push_str("\r\n");
    }

    let mut mid = 0;
    if !channels.is_empty() {
        out.push_str("m=application 9 UDP/DTLS/SCTP webrtc-datachannel\r\n");
        out.push_str("c=IN IP4 0.0.0.0\r\n");
        out.push_str(&format!("a=ice-ufrag:{}\r\n", ice_ufrag));
        out.push_str(&format!("a=ice-pwd:{}\r\n", ice_pwd));
        out.push_str(&format!("a=mid:{}\r\n", mid));
        out.push_str("a=sctp-port:5000\r\n");
        for channel in channels {
            out.push_str(&format!("a=dc-label:{}\r\n", channel.label));
        }
        mid += 1;
    }

    for track in tracks {
        let media = match track.kind {
            MediaType::Audio => "m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n",
            _ => "m=video 9 UDP/TLS/RTP/SAVPF 96\r\n",
        };
        out.push_str(media);
        out.push_str("c=IN IP4 0.0.0.0\r\n");
        out.push_str(&format!("a=ice-ufrag:{}\r\n", ice_ufrag));
        out.push_str(&format!("a=ice-pwd:{}\r\n", ice_pwd));
        out.push_str(&format!("a=mid:{}\r\n", mid));
        out.push_str("a=sendrecv\r\n");
        if track.stream_ids.is_empty() {
            out.push_str(&format!("a=msid:- {}\r\n", track.id));
        } else {
            for stream_id in &track.stream_ids {
                out.push_str(&format!("a=msid:{} {}\r\n", stream_id, track.id));
            }
        }
        mid += 1;
    }

    out
}

pub(crate) fn inspect(sdp: &str) -> SdpInfo {
    let mut info = SdpInfo::default();
    let mut section = None;

    for line in sdp.lines() {
        if let Some(origin) = line.strip_prefix("o=") {
            info.session_id =
                origin.split_whitespace().nth(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        } else if let Some(media) = line.strip_prefix("m=") {
            section = match media.split_whitespace().next() {
                Some("application") => Some(MediaType::Data),
                Some("audio") => Some(MediaType::Audio),
                Some("video") => Some(MediaType::Video),
                _ => Some(MediaType::Unsupported),
            };
        } else if let Some(label) = line.strip_prefix("a=dc-label:") {
            if section == Some(MediaType::Data) {
                info.channels.push(ChannelDesc { label: label.to_string() });
            }
        } else if let Some(msid) = line.strip_prefix("a=msid:") {
            let kind = match section {
                Some(kind @ (MediaType::Audio | MediaType::Video)) => kind,
                _ => continue,
            };
            let mut parts = msid.split_whitespace();
            let (stream_id, track_id) = match (parts.next(), parts.next()) {
                (Some(stream_id), Some(track_id)) => (stream_id, track_id),
                _ => continue,
            };
            match info.tracks.iter_mut().find(|t| t.id == track_id) {
                Some(track) if stream_id != "-" => {
                    track.stream_ids.push(stream_id.to_string());
                }
                Some(_) => {}
                None => info.tracks.push(TrackDesc {
                    kind,
                    id: track_id.to_string(),
                    stream_ids: if stream_id == "-" {
                        vec![]
                    } else {
                        vec![stream_id.to_string()]
                    },
                }),
            }
        }
    }

    info
}
