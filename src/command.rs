//! Control commands and the lock-free queue carrying them to the audio thread.
//!
//! The control side owns a [`CommandSender`], the engine owns the matching
//! [`CommandReceiver`] and drains it between blocks. Commands are plain
//! `Copy` values so the audio thread never frees heap memory.

use ringbuf::{HeapConsumer, HeapProducer, HeapRb};

use crate::dsp::branch::{BranchSettings, BranchUpdate, MAX_BRANCHES};
use crate::dsp::scale::ScaleSpec;
use crate::error::EngineError;

/// Upper bound on commands applied before a single block is rendered.
pub const MAX_COMMANDS_PER_BLOCK: usize = 64;

#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCommand {
    /// Partial update of one branch's targets. Out-of-range indices are ignored.
    SetBranch { index: usize, update: BranchUpdate },
    /// Replace the first `count` branches' targets and snap their smoothed
    /// values.
    SetAllBranches {
        count: usize,
        branches: [BranchSettings; MAX_BRANCHES],
    },
    SetScale(ScaleSpec),
    /// Clear all filter history and rain envelopes.
    Reset,
}

impl EngineCommand {
    /// Build a bulk update from a slice; entries past `MAX_BRANCHES` are dropped.
    pub fn set_all(settings: &[BranchSettings]) -> Self {
        let mut branches = [BranchSettings::default(); MAX_BRANCHES];
        let count = settings.len().min(MAX_BRANCHES);
        branches[..count].copy_from_slice(&settings[..count]);
        EngineCommand::SetAllBranches { count, branches }
    }
}

pub struct CommandSender {
    producer: HeapProducer<EngineCommand>,
}

impl CommandSender {
    /// Queue a command. Fails with [`EngineError::QueueFull`] when the audio
    /// thread has fallen behind; the command is dropped.
    pub fn send(&mut self, command: EngineCommand) -> Result<(), EngineError> {
        self.producer.push(command).map_err(|_| {
            log::warn!("command queue full, dropping command");
            EngineError::QueueFull
        })
    }
}

pub struct CommandReceiver {
    consumer: HeapConsumer<EngineCommand>,
}

impl CommandReceiver {
    #[inline]
    pub fn pop(&mut self) -> Option<EngineCommand> {
        self.consumer.pop()
    }
}

/// Create a single-producer/single-consumer command queue.
pub fn command_queue(capacity: usize) -> (CommandSender, CommandReceiver) {
    let (producer, consumer) = HeapRb::<EngineCommand>::new(capacity).split();
    (CommandSender { producer }, CommandReceiver { consumer })
}
