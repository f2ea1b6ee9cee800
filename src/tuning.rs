//! Provides the live tuning protocol.
//!
//! Every tuned value is mirrored into a named slot of a [TuningTransport]. External tools
//! edit the slots, the drivetrain reads the slots back once per tick. Edits are buffered
//! by the transport until [TuningTransport::poll] is called so that the values that are
//! in use can only change at a single, well defined, point in the tick.

use std::{collections::HashMap, fmt::Display};

use crossbeam_channel::{Receiver, Sender};

use crate::{
    gains::{GainField, GainSet},
    Error,
};

#[cfg(test)]
#[path = "tuning_tests.rs"]
mod tuning_tests;

/// The value stored in a tuning slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SlotValue {
    /// A flag
    Bool(bool),

    /// A number
    Number(f64),
}

impl Display for SlotValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotValue::Bool(v) => write!(f, "{}", v),
            SlotValue::Number(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for SlotValue {
    fn from(value: bool) -> Self {
        SlotValue::Bool(value)
    }
}

impl From<f64> for SlotValue {
    fn from(value: f64) -> Self {
        SlotValue::Number(value)
    }
}

impl TryFrom<SlotValue> for bool {
    type Error = SlotValue;

    fn try_from(value: SlotValue) -> Result<Self, Self::Error> {
        match value {
            SlotValue::Bool(v) => Ok(v),
            _ => Err(value),
        }
    }
}

impl TryFrom<SlotValue> for f64 {
    type Error = SlotValue;

    /// Only finite numbers convert.
    fn try_from(value: SlotValue) -> Result<Self, Self::Error> {
        match value {
            SlotValue::Number(v) if v.is_finite() => Ok(v),
            _ => Err(value),
        }
    }
}

/// Defines the interface for the store of tuning slots that is shared with external
/// tuning tools.
pub trait TuningTransport {
    /// Makes the external edits that arrived since the last call visible to
    /// [TuningTransport::read].
    fn poll(&mut self);

    /// Writes the authoritative value of a slot, replacing any external edit.
    fn publish(&mut self, key: &str, value: SlotValue);

    /// Returns the current value of a slot, or `None` if the slot does not exist.
    fn read(&self, key: &str) -> Option<SlotValue>;
}

/// A [TuningTransport] that receives external edits over a channel.
///
/// Edits are made through a [TuningEditor], which can be cloned and moved to other
/// threads. The edits queue up in the channel until [TuningTransport::poll] is called.
pub struct ChannelTuningTransport {
    /// The active slot values.
    slots: HashMap<String, SlotValue>,

    /// The template of the channel sender that is handed to the editors.
    sender_template: Sender<(String, SlotValue)>,

    /// The pending edits.
    receiver: Receiver<(String, SlotValue)>,
}

impl ChannelTuningTransport {
    /// Returns an editor that sends edits to this transport.
    pub fn editor(&self) -> TuningEditor {
        TuningEditor {
            sender: self.sender_template.clone(),
        }
    }

    /// Returns the keys of all slots, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.slots.keys().cloned().collect::<Vec<String>>();
        keys.sort();
        keys
    }

    /// Creates a new [ChannelTuningTransport] without any slots.
    pub fn new() -> Self {
        let (sender_template, receiver) = crossbeam_channel::unbounded();
        Self {
            slots: HashMap::new(),
            sender_template,
            receiver,
        }
    }
}

impl Default for ChannelTuningTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TuningTransport for ChannelTuningTransport {
    fn poll(&mut self) {
        while let Ok((key, value)) = self.receiver.try_recv() {
            log::debug!("Tuning slot {} edited to {}", key, value);
            self.slots.insert(key, value);
        }
    }

    fn publish(&mut self, key: &str, value: SlotValue) {
        self.slots.insert(key.to_string(), value);
    }

    fn read(&self, key: &str) -> Option<SlotValue> {
        self.slots.get(key).copied()
    }
}

/// Sends edits to a [ChannelTuningTransport].
#[derive(Clone, Debug)]
pub struct TuningEditor {
    sender: Sender<(String, SlotValue)>,
}

impl TuningEditor {
    /// Queues an edit of a flag slot.
    ///
    /// ## Errors
    ///
    /// * [Error::FailedToSendTuningEdit] - Returned when the transport no longer exists.
    pub fn set_bool(&self, key: &str, value: bool) -> Result<(), Error> {
        self.send(key, SlotValue::Bool(value))
    }

    /// Queues an edit of a number slot.
    ///
    /// ## Errors
    ///
    /// * [Error::FailedToSendTuningEdit] - Returned when the transport no longer exists.
    pub fn set_number(&self, key: &str, value: f64) -> Result<(), Error> {
        self.send(key, SlotValue::Number(value))
    }

    fn send(&self, key: &str, value: SlotValue) -> Result<(), Error> {
        self.sender
            .send((key.to_string(), value))
            .map_err(|_| Error::FailedToSendTuningEdit {
                key: key.to_string(),
            })
    }
}

/// Mirrors the tracked fields of a [GainSet] into tuning slots.
///
/// The slots are named `<prefix>/<label>`, for instance `Drivetrain/Drive/kP`.
pub struct GainTuner {
    prefix: String,
    initialized: bool,
}

impl GainTuner {
    /// Returns the key of the slot for the given gain.
    pub fn key(&self, field: GainField) -> String {
        format!("{}/{}", self.prefix, field.label())
    }

    /// Creates a new [GainTuner] that publishes under the given prefix.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            initialized: false,
        }
    }

    /// Synchronizes the gains with the slots.
    ///
    /// The first call publishes the current gains. Later calls write the slot values into
    /// the gains, which marks the gains dirty if a value changed. Values the gains reject
    /// are logged and the slot is reset to the current gain value. The dirty flag is never
    /// cleared here.
    ///
    /// ## Returns
    ///
    /// `true` if any gain changed.
    pub fn periodic(&mut self, transport: &mut dyn TuningTransport, gains: &mut GainSet) -> bool {
        if !self.initialized {
            for field in GainField::TRACKED {
                transport.publish(&self.key(field), SlotValue::Number(gains.get(field)));
            }

            self.initialized = true;
            return false;
        }

        let mut changed = false;

        // The limits move together so that a range can be shifted past its old bounds.
        let output_min = self.read_number(transport, gains, GainField::OutputMin);
        let output_max = self.read_number(transport, gains, GainField::OutputMax);
        match gains.set_output_range(output_min, output_max) {
            Ok(c) => changed |= c,
            Err(e) => {
                log::warn!("Rejected tuning of {}: {}", self.prefix, e);
                self.republish(transport, gains, GainField::OutputMin);
                self.republish(transport, gains, GainField::OutputMax);
            }
        }

        for field in GainField::TRACKED {
            if matches!(field, GainField::OutputMin | GainField::OutputMax) {
                continue;
            }

            let value = self.read_number(transport, gains, field);
            match gains.set(field, value) {
                Ok(c) => {
                    if c {
                        log::debug!("{} changed to {}", self.key(field), value);
                    }

                    changed |= c;
                }
                Err(e) => {
                    log::warn!("Rejected tuning of {}: {}", self.key(field), e);
                    self.republish(transport, gains, field);
                }
            }
        }

        changed
    }

    /// Returns the slot value for the given gain. A missing slot or a slot that does not
    /// hold a finite number is reset to the current gain value.
    fn read_number(&self, transport: &mut dyn TuningTransport, gains: &GainSet, field: GainField) -> f64 {
        let key = self.key(field);
        match transport.read(&key).map(f64::try_from) {
            Some(Ok(value)) => value,
            Some(Err(value)) => {
                log::warn!("Rejected tuning of {}: {} is not a finite number", key, value);
                self.republish(transport, gains, field);
                gains.get(field)
            }
            None => {
                self.republish(transport, gains, field);
                gains.get(field)
            }
        }
    }

    fn republish(&self, transport: &mut dyn TuningTransport, gains: &GainSet, field: GainField) {
        transport.publish(&self.key(field), SlotValue::Number(gains.get(field)));
    }
}
