// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
//! The synthesizer split into a main-thread controller and an audio-thread
//! renderer.
//!
//! The controller never touches synth state directly. It pushes commands onto
//! a bounded channel that the renderer drains at the start of every fill, and
//! anything the renderer lets go of (banks, sequences) is sent back so that
//! it is freed off the audio thread.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::{info, warn};

use super::bank::PatchBank;
use super::engine::SynthEngine;
use super::error::SynthError;
use super::resource::BankResource;
use super::ring::SampleRing;
use super::sequencer::{Sequence, Sequencer};
use crate::config;
use crate::midi::{MidiFile, TimeMap};

/// Frames synthesized per engine call.
pub const CHUNK_SIZE: usize = 256;

/// Playback state of the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SynthState {
    /// No MIDI file loaded.
    Idle = 0,
    Playing = 1,
    /// A MIDI file is loaded but not playing.
    Stopped = 2,
}

impl SynthState {
    fn from_u8(value: u8) -> SynthState {
        match value {
            1 => SynthState::Playing,
            2 => SynthState::Stopped,
            _ => SynthState::Idle,
        }
    }
}

impl fmt::Display for SynthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthState::Idle => write!(f, "idle"),
            SynthState::Playing => write!(f, "playing"),
            SynthState::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Clone)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn load(&self) -> SynthState {
        SynthState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: SynthState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

enum SynthCommand {
    LoadBank(Arc<PatchBank>),
    LoadMidi(Arc<Sequence>),
    Play,
    Stop,
    UnloadMidi,
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
    NoteOffAll,
    ProgramChange { channel: u8, program: u8 },
}

/// Objects the renderer hands back to be dropped on the main thread.
enum Retired {
    Bank(Arc<PatchBank>),
    Sequence(Arc<Sequence>),
}

/// Creates the controller and renderer pair.
pub struct SampleSynthesizer {
    controller: SynthController,
    renderer: SynthRenderer,
}

impl SampleSynthesizer {
    pub fn new(sample_rate: u32, config: &config::Synth) -> SampleSynthesizer {
        let queue_size = config.command_queue_size();
        let (command_tx, command_rx) = crossbeam_channel::bounded(queue_size);
        let (retired_tx, retired_rx) = crossbeam_channel::bounded(queue_size);
        let state = SharedState(Arc::new(AtomicU8::new(SynthState::Idle as u8)));

        let sample_rate = sample_rate.max(1);
        SampleSynthesizer {
            controller: SynthController {
                sample_rate,
                commands: command_tx,
                retired: retired_rx,
                state: state.clone(),
            },
            renderer: SynthRenderer {
                engine: SynthEngine::new(sample_rate, config),
                sequencer: Sequencer::new(),
                ring: SampleRing::new(sample_rate as usize),
                chunk: vec![0.0; CHUNK_SIZE],
                commands: command_rx,
                retired: retired_tx,
                state,
            },
        }
    }

    pub fn controller(&self) -> &SynthController {
        &self.controller
    }

    pub fn renderer_mut(&mut self) -> &mut SynthRenderer {
        &mut self.renderer
    }

    /// Splits into the main-thread and audio-thread halves.
    pub fn split(self) -> (SynthController, SynthRenderer) {
        (self.controller, self.renderer)
    }
}

/// Main-thread handle to the synthesizer.
pub struct SynthController {
    sample_rate: u32,
    commands: Sender<SynthCommand>,
    retired: Receiver<Retired>,
    state: SharedState,
}

impl fmt::Debug for SynthController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthController")
            .field("sample_rate", &self.sample_rate)
            .field("state", &self.state())
            .field("pending_commands", &self.commands.len())
            .finish()
    }
}

impl SynthController {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> SynthState {
        self.state.load()
    }

    /// Replaces the patch bank.
    pub fn load_bank(&self, bank: Arc<PatchBank>) -> Result<(), SynthError> {
        info!(bank = bank.name(), "Loading patch bank");
        self.send(SynthCommand::LoadBank(bank))
    }

    /// Loads a bank from the resource and replaces the current one.
    pub fn load_bank_from(
        &self,
        resource: &dyn BankResource,
        manifest_name: &str,
    ) -> Result<(), SynthError> {
        let bank = PatchBank::load(resource, manifest_name)?;
        self.load_bank(Arc::new(bank))
    }

    /// Replaces any loaded MIDI file and starts playing from the beginning.
    pub fn load_midi(&self, file: &MidiFile) -> Result<(), SynthError> {
        let time_map = TimeMap::build(file);
        let sequence = Sequence::build(file, &time_map, self.sample_rate);
        self.send(SynthCommand::LoadMidi(Arc::new(sequence)))?;
        self.state.store(SynthState::Playing);
        Ok(())
    }

    /// Restarts the loaded MIDI file from the beginning.
    pub fn play(&self) -> Result<(), SynthError> {
        if self.state() == SynthState::Idle {
            warn!("No MIDI file loaded, ignoring play");
            return Ok(());
        }
        self.send(SynthCommand::Play)?;
        self.state.store(SynthState::Playing);
        Ok(())
    }

    pub fn stop(&self) -> Result<(), SynthError> {
        self.send(SynthCommand::Stop)?;
        if self.state() != SynthState::Idle {
            self.state.store(SynthState::Stopped);
        }
        Ok(())
    }

    pub fn unload_midi(&self) -> Result<(), SynthError> {
        self.send(SynthCommand::UnloadMidi)?;
        self.state.store(SynthState::Idle);
        Ok(())
    }

    pub fn note_on(&self, channel: u8, key: u8, velocity: u8) -> Result<(), SynthError> {
        self.send(SynthCommand::NoteOn {
            channel,
            key,
            velocity,
        })
    }

    pub fn note_off(&self, channel: u8, key: u8) -> Result<(), SynthError> {
        self.send(SynthCommand::NoteOff { channel, key })
    }

    pub fn note_off_all(&self) -> Result<(), SynthError> {
        self.send(SynthCommand::NoteOffAll)
    }

    pub fn program_change(&self, channel: u8, program: u8) -> Result<(), SynthError> {
        self.send(SynthCommand::ProgramChange { channel, program })
    }

    /// Drops everything the renderer has retired. Returns how many objects
    /// were freed.
    pub fn collect_garbage(&self) -> usize {
        let mut freed = 0;
        while let Ok(retired) = self.retired.try_recv() {
            match retired {
                Retired::Bank(bank) => drop(bank),
                Retired::Sequence(sequence) => drop(sequence),
            }
            freed += 1;
        }
        freed
    }

    fn send(&self, command: SynthCommand) -> Result<(), SynthError> {
        self.collect_garbage();
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => SynthError::CommandQueueFull,
            TrySendError::Disconnected(_) => SynthError::RendererDisconnected,
        })
    }
}

/// Audio-thread half of the synthesizer. Owns all mutable synth state.
pub struct SynthRenderer {
    engine: SynthEngine,
    sequencer: Sequencer,
    ring: SampleRing,
    chunk: Vec<f32>,
    commands: Receiver<SynthCommand>,
    retired: Sender<Retired>,
    state: SharedState,
}

impl fmt::Debug for SynthRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthRenderer")
            .field("engine", &self.engine)
            .field("buffered", &self.ring.len())
            .field("capacity", &self.ring.capacity())
            .finish()
    }
}

impl SynthRenderer {
    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    /// Mono samples the internal buffer can hold.
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// True while a loaded MIDI file is still playing.
    pub fn is_playing(&self) -> bool {
        self.sequencer.is_playing()
    }

    /// Fills an interleaved buffer with `channel_count` channels. Every
    /// channel gets the same mono signal.
    pub fn fill_output_buffer(&mut self, buffer: &mut [f32], channel_count: usize) {
        self.process_commands();

        if channel_count == 0 {
            buffer.fill(0.0);
            return;
        }

        let requested = buffer.len() / channel_count;
        let frames = if requested > self.ring.capacity() {
            warn!(
                requested,
                capacity = self.ring.capacity(),
                "Requested more samples than the buffer holds, clamping"
            );
            self.ring.capacity()
        } else {
            requested
        };

        while self.ring.len() < frames {
            let chunk_len = CHUNK_SIZE.min(self.ring.space());
            let chunk = &mut self.chunk[..chunk_len];
            self.sequencer.render(&mut self.engine, chunk);
            self.ring.write(chunk);
        }

        for frame in buffer[..frames * channel_count].chunks_exact_mut(channel_count) {
            frame.fill(self.ring.pop().unwrap_or(0.0));
        }
        buffer[frames * channel_count..].fill(0.0);

        if !self.sequencer.is_playing() && self.state.load() == SynthState::Playing {
            self.state.store(SynthState::Stopped);
        }
    }

    fn process_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                SynthCommand::LoadBank(bank) => {
                    if let Some(previous) = self.engine.set_bank(Some(bank)) {
                        self.retire(Retired::Bank(previous));
                    }
                }
                SynthCommand::LoadMidi(sequence) => {
                    self.reset_playback();
                    if let Some(previous) = self.sequencer.load(sequence) {
                        self.retire(Retired::Sequence(previous));
                    }
                    self.state.store(SynthState::Playing);
                }
                SynthCommand::Play => {
                    self.reset_playback();
                    if self.sequencer.play() {
                        self.state.store(SynthState::Playing);
                    }
                }
                SynthCommand::Stop => {
                    self.reset_playback();
                    self.sequencer.stop();
                    if self.sequencer.is_loaded() {
                        self.state.store(SynthState::Stopped);
                    }
                }
                SynthCommand::UnloadMidi => {
                    self.reset_playback();
                    if let Some(previous) = self.sequencer.unload() {
                        self.retire(Retired::Sequence(previous));
                    }
                    self.state.store(SynthState::Idle);
                }
                SynthCommand::NoteOn {
                    channel,
                    key,
                    velocity,
                } => self.engine.note_on(channel, key, velocity),
                SynthCommand::NoteOff { channel, key } => self.engine.note_off(channel, key),
                SynthCommand::NoteOffAll => self.engine.note_off_all(false),
                SynthCommand::ProgramChange { channel, program } => {
                    self.engine.program_change(channel, program)
                }
            }
        }
    }

    /// Silences the engine and drops anything already buffered.
    fn reset_playback(&mut self) {
        self.engine.reset();
        self.ring.clear();
    }

    fn retire(&self, retired: Retired) {
        // A full queue means the controller is not collecting. The object is
        // then dropped here.
        let _ = self.retired.try_send(retired);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::bank::Patch;
    use crate::synth::resource::MemoryResource;
    use crate::testutil::{midi_bytes, note_off, note_on, program, tempo, wav_bytes};

    const RATE: u32 = 1000;

    fn bank() -> Arc<PatchBank> {
        let mut bank = PatchBank::new("test");
        bank.insert(
            0,
            Patch {
                name: "tone".to_string(),
                data: (0..4000).map(|i| ((i % 10) as f32 - 4.5) / 10.0).collect(),
                sample_rate: RATE,
                root_key: 60,
                gain: 1.0,
                loop_region: None,
            },
        )
        .unwrap();
        Arc::new(bank)
    }

    fn synthesizer() -> SampleSynthesizer {
        SampleSynthesizer::new(RATE, &config::Synth::new(16, 0.0, 1.0))
    }

    fn song() -> MidiFile {
        let bytes = midi_bytes(
            480,
            vec![
                vec![tempo(0, 500_000)],
                vec![
                    program(0, 0, 0),
                    note_on(0, 0, 60, 127),
                    note_off(960, 0, 60),
                ],
            ],
        );
        MidiFile::parse(&bytes).unwrap()
    }

    #[test]
    fn test_silence_without_bank() {
        let mut synth = synthesizer();
        synth.controller().note_on(0, 60, 100).unwrap();

        let mut buffer = vec![1.0; 64];
        synth.renderer_mut().fill_output_buffer(&mut buffer, 2);
        assert!(buffer.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_channels_are_identical() {
        let mut synth = synthesizer();
        synth.controller().load_bank(bank()).unwrap();
        synth.controller().note_on(0, 60, 127).unwrap();

        let mut buffer = vec![0.0; 300 * 3];
        synth.renderer_mut().fill_output_buffer(&mut buffer, 3);

        for frame in buffer.chunks_exact(3) {
            assert_eq!(frame[0], frame[1]);
            assert_eq!(frame[1], frame[2]);
        }
        assert!(buffer.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_oversize_request_is_clamped() {
        let mut synth = synthesizer();
        synth.controller().load_bank(bank()).unwrap();
        synth.controller().note_on(0, 60, 127).unwrap();

        let capacity = synth.renderer_mut().capacity();
        assert_eq!(capacity, RATE as usize);

        let mut buffer = vec![1.0; (capacity + 100) * 2];
        synth.renderer_mut().fill_output_buffer(&mut buffer, 2);
        assert!(buffer[capacity * 2..].iter().all(|s| *s == 0.0));
        assert!(buffer[..capacity * 2].iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_state_transitions() {
        let mut synth = synthesizer();
        assert_eq!(synth.controller().state(), SynthState::Idle);

        synth.controller().load_bank(bank()).unwrap();
        synth.controller().load_midi(&song()).unwrap();
        assert_eq!(synth.controller().state(), SynthState::Playing);

        let mut buffer = vec![0.0; 200];
        synth.renderer_mut().fill_output_buffer(&mut buffer, 1);
        assert!(synth.renderer_mut().is_playing());
        assert!(buffer.iter().any(|s| *s != 0.0));

        synth.controller().stop().unwrap();
        assert_eq!(synth.controller().state(), SynthState::Stopped);
        synth.renderer_mut().fill_output_buffer(&mut buffer, 1);
        assert!(buffer.iter().all(|s| *s == 0.0));

        synth.controller().play().unwrap();
        assert_eq!(synth.controller().state(), SynthState::Playing);

        synth.controller().unload_midi().unwrap();
        assert_eq!(synth.controller().state(), SynthState::Idle);
        synth.renderer_mut().fill_output_buffer(&mut buffer, 1);
        assert!(!synth.renderer_mut().is_playing());
    }

    #[test]
    fn test_sequence_end_stops() {
        let mut synth = synthesizer();
        synth.controller().load_bank(bank()).unwrap();
        synth.controller().load_midi(&song()).unwrap();

        // The song is one second long.
        let mut buffer = vec![0.0; 500];
        for _ in 0..3 {
            synth.renderer_mut().fill_output_buffer(&mut buffer, 1);
        }
        assert_eq!(synth.controller().state(), SynthState::Stopped);
    }

    #[test]
    fn test_retired_objects_return() {
        let mut synth = synthesizer();
        let first = bank();
        synth.controller().load_bank(first.clone()).unwrap();
        synth.controller().load_bank(bank()).unwrap();

        let mut buffer = vec![0.0; 16];
        synth.renderer_mut().fill_output_buffer(&mut buffer, 1);
        assert_eq!(Arc::strong_count(&first), 2);
        assert_eq!(synth.controller().collect_garbage(), 1);
        assert_eq!(Arc::strong_count(&first), 1);
    }

    #[test]
    fn test_command_queue_full() {
        let synth = SampleSynthesizer::new(RATE, &config::Synth::default().with_command_queue_size(2));
        synth.controller().note_off_all().unwrap();
        synth.controller().note_off_all().unwrap();
        assert!(matches!(
            synth.controller().note_off_all(),
            Err(SynthError::CommandQueueFull)
        ));
    }

    #[test]
    fn test_renderer_dropped() {
        let (controller, renderer) = synthesizer().split();
        drop(renderer);
        assert!(matches!(
            controller.note_on(0, 60, 100),
            Err(SynthError::RendererDisconnected)
        ));
    }

    #[test]
    fn test_load_bank_from_resource() {
        let resource = MemoryResource::new()
            .with(
                "bank.yaml",
                b"default_program: 0\nprograms:\n  0: { file: tone.wav }".to_vec(),
            )
            .with("tone.wav", wav_bytes(&[0.5; 2000], 1, RATE).unwrap());

        let mut synth = synthesizer();
        synth
            .controller()
            .load_bank_from(&resource, "bank.yaml")
            .unwrap();
        synth.controller().program_change(3, 12).unwrap();
        synth.controller().note_on(3, 60, 127).unwrap();

        let mut buffer = vec![0.0; 10];
        synth.renderer_mut().fill_output_buffer(&mut buffer, 1);
        // Volume defaults to 100/127.
        let expected = 0.5 * 100.0 / 127.0;
        assert!(buffer.iter().all(|s| (s - expected).abs() < 1e-6));

        assert!(matches!(
            synth.controller().load_bank_from(&resource, "missing.yaml"),
            Err(SynthError::Resource(_))
        ));
    }
}
