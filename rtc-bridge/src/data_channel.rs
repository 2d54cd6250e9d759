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

use std::{fmt::Debug, str::Utf8Error, sync::Arc};

use parking_lot::Mutex;
use serde::Deserialize;
use thiserror::Error;

use crate::engine::{DataChannelEvents, EngineDataChannel};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Priority {
    VeryLow,
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug)]
pub struct DataChannelInit {
    pub ordered: bool,
    /// Cannot be set along with `max_retransmits`.
    pub max_retransmit_time: Option<i32>,
    /// Cannot be set along with `max_retransmit_time`.
    pub max_retransmits: Option<i32>,
    pub protocol: String,
    pub negotiated: bool,
    /// Externally negotiated stream id, -1 if unset.
    pub id: i32,
    pub priority: Option<Priority>,
}

impl Default for DataChannelInit {
    fn default() -> Self {
        Self {
            ordered: true,
            max_retransmit_time: None,
            max_retransmits: None,
            protocol: String::new(),
            negotiated: false,
            id: -1,
            priority: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DataChannelError {
    #[error("failed to send data, dc not open? send buffer is full ?")]
    Send,
    #[error("only utf8 strings can be sent")]
    Utf8(#[from] Utf8Error),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

#[derive(Debug)]
pub struct DataBuffer<'a> {
    pub data: &'a [u8],
    pub binary: bool,
}

pub type OnStateChange = Box<dyn FnMut(DataChannelState) + Send + Sync>;
pub type OnMessage = Box<dyn FnMut(DataBuffer) + Send + Sync>;
pub type OnBufferedAmountChange = Box<dyn FnMut(u64) + Send + Sync>;

/// Owning wrapper around an engine data channel. Remote channels surfaced
/// through the event observer are owned jointly by the caller and the engine
/// until the caller releases its wrapper.
#[derive(Clone)]
pub struct DataChannel {
    observer: Arc<DataChannelObserver>,
    pub(crate) handle: Arc<dyn EngineDataChannel>,
}

impl DataChannel {
    pub(crate) fn configure(handle: Arc<dyn EngineDataChannel>) -> Self {
        let observer = Arc::new(DataChannelObserver::default());
        handle.register_observer(observer.clone());
        Self { handle, observer }
    }

    pub fn send(&self, data: &[u8], binary: bool) -> Result<(), DataChannelError> {
        if !binary {
            std::str::from_utf8(data)?;
        }

        self.handle.send(data, binary).then_some(()).ok_or(DataChannelError::Send)
    }

    pub fn id(&self) -> i32 {
        self.handle.id()
    }

    pub fn label(&self) -> String {
        self.handle.label()
    }

    pub fn state(&self) -> DataChannelState {
        self.handle.state()
    }

    pub fn buffered_amount(&self) -> u64 {
        self.handle.buffered_amount()
    }

    pub fn close(&self) {
        self.handle.close();
    }

    pub fn on_state_change(&self, handler: Option<OnStateChange>) {
        *self.observer.state_change_handler.lock() = handler;
    }

    pub fn on_message(&self, handler: Option<OnMessage>) {
        *self.observer.message_handler.lock() = handler;
    }

    pub fn on_buffered_amount_change(&self, handler: Option<OnBufferedAmountChange>) {
        *self.observer.buffered_amount_change_handler.lock() = handler;
    }
}

impl Debug for DataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChannel")
            .field("id", &self.id())
            .field("label", &self.label())
            .field("state", &self.state())
            .finish()
    }
}

#[derive(Default)]
struct DataChannelObserver {
    state_change_handler: Mutex<Option<OnStateChange>>,
    message_handler: Mutex<Option<OnMessage>>,
    buffered_amount_change_handler: Mutex<Option<OnBufferedAmountChange>>,
}

impl DataChannelEvents for DataChannelObserver {
    fn on_state_change(&self, state: DataChannelState) {
        if let Some(f) = self.state_change_handler.lock().as_mut() {
            f(state);
        }
    }

    fn on_message(&self, data: &[u8], binary: bool) {
        if let Some(f) = self.message_handler.lock().as_mut() {
            f(DataBuffer { data, binary });
        }
    }

    fn on_buffered_amount_change(&self, amount: u64) {
        if let Some(f) = self.buffered_amount_change_handler.lock().as_mut() {
            f(amount);
        }
    }
}
