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

use std::{
    fmt::{Debug, Display},
    str::FromStr,
};

use thiserror::Error;

use crate::{RtcError, RtcErrorType};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    PrAnswer,
    Answer,
    Rollback,
}

impl FromStr for SdpType {
    type Err = RtcError;

    // Unknown tags are rejected, never mapped to Rollback.
    fn from_str(sdp_type: &str) -> Result<Self, Self::Err> {
        match sdp_type {
            "offer" => Ok(Self::Offer),
            "pranswer" => Ok(Self::PrAnswer),
            "answer" => Ok(Self::Answer),
            "rollback" => Ok(Self::Rollback),
            _ => Err(RtcError {
                error_type: RtcErrorType::InvalidSdpType,
                message: format!("unknown sdp type: {}", sdp_type),
            }),
        }
    }
}

impl Display for SdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SdpType::Offer => "offer",
            SdpType::PrAnswer => "pranswer",
            SdpType::Answer => "answer",
            SdpType::Rollback => "rollback",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Error, Debug)]
#[error("failed to parse sdp: {line} - {description}")]
pub struct SdpParseError {
    pub line: String,
    pub description: String,
}

/// An immutable offer/answer payload. Values are copied across the engine
/// and FFI boundaries, never aliased.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionDescription {
    sdp_type: SdpType,
    sdp: String,
}

impl SessionDescription {
    pub fn parse(sdp: &str, sdp_type: SdpType) -> Result<Self, SdpParseError> {
        if !sdp.starts_with("v=") {
            return Err(SdpParseError {
                line: sdp.lines().next().unwrap_or("").to_string(),
                description: "SDP must start with 'v='".to_string(),
            });
        }

        if sdp.contains('\0') {
            return Err(SdpParseError {
                line: sdp.lines().next().unwrap_or("").to_string(),
                description: "SDP must not contain nul bytes".to_string(),
            });
        }

        Ok(Self { sdp_type, sdp: sdp.to_string() })
    }

    pub fn sdp_type(&self) -> SdpType {
        self.sdp_type
    }

    pub fn sdp(&self) -> &str {
        &self.sdp
    }
}

impl ToString for SessionDescription {
    fn to_string(&self) -> String {
        self.sdp.clone()
    }
}

impl Debug for SessionDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionDescription").field("sdp_type", &self.sdp_type).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SDP: &str = "v=0\r\no=- 4 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n";

    #[test]
    fn parse_keeps_type_and_text() {
        let desc = SessionDescription::parse(SDP, SdpType::Offer).unwrap();
        assert_eq!(desc.sdp_type(), SdpType::Offer);
        assert_eq!(desc.sdp(), SDP);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(SessionDescription::parse("not sdp", SdpType::Offer).is_err());
        assert!(SessionDescription::parse("", SdpType::Answer).is_err());
    }

    #[test]
    fn type_tags_round_trip() {
        for sdp_type in
            [SdpType::Offer, SdpType::PrAnswer, SdpType::Answer, SdpType::Rollback]
        {
            assert_eq!(sdp_type.to_string().parse::<SdpType>().unwrap(), sdp_type);
        }
    }

    #[test]
    fn unknown_type_tag_fails() {
        let err = "provisional".parse::<SdpType>().unwrap_err();
        assert_eq!(err.error_type, RtcErrorType::InvalidSdpType);
    }
}
