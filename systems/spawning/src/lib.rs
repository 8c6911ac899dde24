#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave controller responsible for emitting creep spawn commands.

use std::time::Duration;

use creep_defence_core::{Command, CreepStats, CreepTrait, Event, GameOutcome};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const VARIETIES: [Option<CreepTrait>; 7] = [
    None,
    Some(CreepTrait::Flying),
    Some(CreepTrait::WaterAdverse),
    Some(CreepTrait::WaterLoving),
    Some(CreepTrait::MountainAdverse),
    Some(CreepTrait::MountainLoving),
    Some(CreepTrait::Immune),
];

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    wave_delay: Duration,
    first_wave_after: Duration,
    spawn_interval: Duration,
    creeps_per_wave: u32,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration.
    #[must_use]
    pub const fn new(
        wave_delay: Duration,
        first_wave_after: Duration,
        spawn_interval: Duration,
        creeps_per_wave: u32,
        rng_seed: u64,
    ) -> Self {
        Self {
            wave_delay,
            first_wave_after,
            spawn_interval,
            creeps_per_wave,
            rng_seed,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(25),
            Duration::from_secs(5),
            Duration::from_secs(1),
            20,
            0,
        )
    }
}

/// Flavour of a wave, chosen from its number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaveKind {
    /// Plain creeps.
    Normal,
    /// Quick creeps, every third wave.
    Fiz,
    /// Strong creeps, every fifth wave.
    Buzz,
    /// A single boss, every fifteenth wave.
    FizBuzz,
}

impl WaveKind {
    /// Kind of the wave with the provided number.
    #[must_use]
    pub const fn for_wave(wave: u32) -> Self {
        if wave == 0 {
            Self::Normal
        } else if wave % 15 == 0 {
            Self::FizBuzz
        } else if wave % 5 == 0 {
            Self::Buzz
        } else if wave % 3 == 0 {
            Self::Fiz
        } else {
            Self::Normal
        }
    }

    /// Trait applied to every creep of the wave.
    #[must_use]
    pub const fn creep_trait(self) -> Option<CreepTrait> {
        match self {
            Self::Normal => None,
            Self::Fiz => Some(CreepTrait::Quick),
            Self::Buzz => Some(CreepTrait::Strong),
            Self::FizBuzz => Some(CreepTrait::Boss),
        }
    }

    /// Number of creeps the wave spawns.
    #[must_use]
    pub const fn creep_count(self, creeps_per_wave: u32) -> u32 {
        match self {
            Self::FizBuzz => 1,
            _ => creeps_per_wave,
        }
    }
}

#[derive(Clone, Debug)]
struct ActiveWave {
    number: u32,
    traits: Vec<CreepTrait>,
    remaining: u32,
    since_last_spawn: Duration,
    bonus: u32,
}

/// Pure system that starts waves on a timer and spawns their creeps.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    rng: ChaCha8Rng,
    next_wave: u32,
    until_next_wave: Duration,
    active: Vec<ActiveWave>,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            next_wave: 1,
            until_next_wave: config.first_wave_after,
            active: Vec::new(),
            config,
        }
    }

    /// Number the next wave will carry.
    #[must_use]
    pub const fn next_wave(&self) -> u32 {
        self.next_wave
    }

    /// Time left before the next wave starts on its own.
    #[must_use]
    pub const fn until_next_wave(&self) -> Duration {
        self.until_next_wave
    }

    /// Consumes world events to emit spawn and bonus commands.
    pub fn handle(&mut self, events: &[Event], outcome: GameOutcome, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::NewGameStarted { .. } => self.reset(),
                _ if !outcome.is_in_progress() => {}
                Event::WaveCallRequested => {
                    let bonus = bravery_bonus(self.until_next_wave);
                    self.start_wave(bonus, out);
                }
                Event::TimeAdvanced { dt, .. } => self.advance(*dt, out),
                _ => {}
            }
        }
    }

    fn reset(&mut self) {
        self.next_wave = 1;
        self.until_next_wave = self.config.first_wave_after;
        self.active.clear();
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        let interval = self.config.spawn_interval;
        let mut finished = Vec::new();
        for (index, wave) in self.active.iter_mut().enumerate() {
            wave.since_last_spawn = wave.since_last_spawn.saturating_add(dt);
            while wave.remaining > 0 && wave.since_last_spawn >= interval {
                wave.since_last_spawn -= interval;
                spawn_from(wave, out);
            }
            if wave.remaining == 0 {
                finished.push(index);
            }
        }
        for index in finished.into_iter().rev() {
            let wave = self.active.remove(index);
            finish(&wave, out);
        }

        self.until_next_wave = self.until_next_wave.saturating_sub(dt);
        if self.until_next_wave.is_zero() {
            self.start_wave(0, out);
        }
    }

    fn start_wave(&mut self, bonus: u32, out: &mut Vec<Command>) {
        let number = self.next_wave;
        self.next_wave = self.next_wave.saturating_add(1);
        self.until_next_wave = self.config.wave_delay;

        let kind = WaveKind::for_wave(number);
        let variety = VARIETIES[self.rng.gen_range(0..VARIETIES.len())];
        let traits: Vec<CreepTrait> = variety.into_iter().chain(kind.creep_trait()).collect();
        let remaining = kind.creep_count(self.config.creeps_per_wave);
        tracing::info!(wave = number, ?kind, ?variety, remaining, bonus, "wave started");

        let mut wave = ActiveWave {
            number,
            traits,
            remaining,
            since_last_spawn: Duration::ZERO,
            bonus,
        };
        if wave.remaining == 0 {
            finish(&wave, out);
            return;
        }
        spawn_from(&mut wave, out);
        if wave.remaining == 0 {
            finish(&wave, out);
        } else {
            self.active.push(wave);
        }
    }
}

fn spawn_from(wave: &mut ActiveWave, out: &mut Vec<Command>) {
    wave.remaining -= 1;
    let stats = CreepStats::for_wave(wave.number).with_traits(&wave.traits);
    out.push(Command::SpawnCreep { stats });
}

fn finish(wave: &ActiveWave, out: &mut Vec<Command>) {
    if wave.bonus > 0 {
        out.push(Command::AwardBonus { points: wave.bonus });
    }
}

/// Score paid for calling a wave `remaining` before it was due.
#[must_use]
pub fn bravery_bonus(remaining: Duration) -> u32 {
    u32::try_from(remaining.as_millis() / 100).unwrap_or(u32::MAX)
}
