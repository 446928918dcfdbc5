//! Hard To Get - economy and win-condition engine
//!
//! Players pay per message to court a scripted AI persona; losing
//! rounds grow a shared jackpot, a win transfers it in full and resets
//! it to the seed. This crate is the monetary core: ledger, pool,
//! interaction log, reply interpreter and the transaction processor
//! that ties them together. Transport and rendering live elsewhere.

pub mod config;
pub mod engine;
pub mod error;
pub mod interpreter;
pub mod persona;
pub mod speech;
pub mod storage;
pub mod types;

pub use config::GameConfig;
pub use engine::GameEngine;
pub use error::{EngineError, Result};
pub use interpreter::ReplyInterpreter;
pub use persona::{ChatPersona, ChatTurn, PersonaClient, PersonaConfig};
pub use speech::{NullSpeech, SpeechClip, SpeechSynthesizer, VisemeFrame};
pub use types::{
    Amount, GameEvent, GameStatus, InteractionRecord, Player, PoolState, Registration,
    RoundOutcome, RoundResult,
};
