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

use std::fmt::Debug;

/// One ICE candidate. Construction is syntactically total; malformed
/// candidates are rejected later by the engine when they are added to a
/// session.
///
/// An empty `candidate` string is the reserved end-of-candidates marker and
/// is a valid input to `add_ice_candidate`.
#[derive(Clone, PartialEq, Eq)]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_mline_index: i32,
}

impl IceCandidate {
    pub fn new(candidate: &str, sdp_mid: Option<&str>, sdp_mline_index: i32) -> Self {
        Self {
            candidate: candidate.to_string(),
            sdp_mid: sdp_mid.map(str::to_string),
            sdp_mline_index,
        }
    }

    pub fn end_of_candidates() -> Self {
        Self { candidate: String::new(), sdp_mid: None, sdp_mline_index: 0 }
    }

    pub fn is_end_of_candidates(&self) -> bool {
        self.candidate.is_empty()
    }
}

impl ToString for IceCandidate {
    fn to_string(&self) -> String {
        self.candidate.clone()
    }
}

impl Debug for IceCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IceCandidate")
            .field("candidate", &self.candidate)
            .field("sdp_mid", &self.sdp_mid)
            .field("sdp_mline_index", &self.sdp_mline_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_preserved() {
        let candidate = IceCandidate::new(
            "candidate:2395300328 1 udp 2122260223 192.168.1.7 54321 typ host",
            Some("0"),
            0,
        );
        assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.sdp_mline_index, 0);
        assert!(!candidate.is_end_of_candidates());
    }

    #[test]
    fn empty_candidate_is_end_of_candidates() {
        assert!(IceCandidate::end_of_candidates().is_end_of_candidates());
        assert!(IceCandidate::new("", None, 0).is_end_of_candidates());
    }
}
