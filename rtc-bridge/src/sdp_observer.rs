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

//! One-shot completion handles for the asynchronous engine operations.
//!
//! Each observer wraps exactly one caller-supplied callback and fires it
//! exactly once, no matter how many success/failure notifications a
//! misbehaving engine delivers. The observer is shared with the engine via
//! `Arc` and releases itself once the engine drops its reference; the caller
//! never destroys it explicitly.
//!
//! A notification arriving after the callback has been consumed is a no-op,
//! never a fault: engine threads may still deliver completions that were
//! already queued when the session was closed.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{session_description::SessionDescription, RtcError, RtcErrorType};

pub type CreateSdpCallback = Box<dyn FnOnce(Result<SessionDescription, RtcError>) + Send>;
pub type SetSdpCallback = Box<dyn FnOnce(Result<(), RtcError>) + Send>;

/// Completion handle for `create_offer`/`create_answer`.
pub struct CreateSdpObserver {
    callback: Mutex<Option<CreateSdpCallback>>,
}

impl CreateSdpObserver {
    pub fn new(
        callback: impl FnOnce(Result<SessionDescription, RtcError>) + Send + 'static,
    ) -> Arc<Self> {
        Arc::new(Self { callback: Mutex::new(Some(Box::new(callback))) })
    }

    pub fn success(&self, description: SessionDescription) {
        self.fire(Ok(description));
    }

    /// Reports the engine's error message verbatim.
    pub fn failure(&self, message: String) {
        self.fire(Err(RtcError { error_type: RtcErrorType::Internal, message }));
    }

    pub fn reject(&self, error: RtcError) {
        self.fire(Err(error));
    }

    fn fire(&self, result: Result<SessionDescription, RtcError>) {
        match self.callback.lock().take() {
            Some(callback) => callback(result),
            None => {
                log::warn!("create sdp observer notified more than once, dropping notification");
            }
        }
    }
}

/// Completion handle for `set_local_description`/`set_remote_description`.
pub struct SetSdpObserver {
    callback: Mutex<Option<SetSdpCallback>>,
}

impl SetSdpObserver {
    pub fn new(callback: impl FnOnce(Result<(), RtcError>) + Send + 'static) -> Arc<Self> {
        Arc::new(Self { callback: Mutex::new(Some(Box::new(callback))) })
    }

    pub fn success(&self) {
        self.fire(Ok(()));
    }

    pub fn failure(&self, message: String) {
        self.fire(Err(RtcError { error_type: RtcErrorType::Internal, message }));
    }

    pub fn reject(&self, error: RtcError) {
        self.fire(Err(error));
    }

    fn fire(&self, result: Result<(), RtcError>) {
        match self.callback.lock().take() {
            Some(callback) => callback(result),
            None => {
                log::warn!("set sdp observer notified more than once, dropping notification");
            }
        }
    }
}
