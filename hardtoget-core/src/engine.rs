use crate::config::GameConfig;
use crate::error::{EngineError, Result};
use crate::interpreter::ReplyInterpreter;
use crate::persona::{ChatTurn, PersonaClient};
use crate::speech::SpeechSynthesizer;
use crate::storage::{interaction_log, player_store, pool_store};
use crate::storage::{InteractionLog, PlayerStore, PoolStore, Storage};
use crate::types::{Amount, GameEvent, GameStatus, Registration, RoundOutcome, RoundResult};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Shown in place of a reply when the persona times out or errors.
/// The round is still charged and settled as a loss.
const PLACEHOLDER_REPLY: &str = "(she glances at her phone and ignores you)";

/// Minimal contract the persona must honor so the interpreter can do
/// its job. Everything else about the personality is deployment config.
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a hard-to-get date the players are trying to win over.\n\
End every reply with a tag [SENTIMENT: X] where X is 0-100, how much\n\
the current suitor impresses you. If, and only if, you decide to accept\n\
the date, also write exactly [ACCEPTED].";

/// The transaction processor: the only component that writes to more
/// than one store in a single operation. One instance per process,
/// shared via `Arc` across concurrent round tasks.
pub struct GameEngine {
    storage: Arc<Storage>,
    config: GameConfig,
    interpreter: ReplyInterpreter,
    persona: Arc<dyn PersonaClient>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    system_prompt: String,
    events: broadcast::Sender<GameEvent>,
}

impl GameEngine {
    pub async fn new(
        data_dir: &Path,
        config: GameConfig,
        persona: Arc<dyn PersonaClient>,
    ) -> Result<Self> {
        config.validate()?;

        let db_path = data_dir.join("hardtoget.db");
        let storage = Arc::new(Storage::new(&db_path, config.jackpot_seed).await?);
        let (events, _) = broadcast::channel(64);

        Ok(Self {
            storage,
            interpreter: ReplyInterpreter::new(config.implicit_win_threshold),
            config,
            persona,
            speech: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            events,
        })
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Events produced for whatever transport broadcasts them.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Idempotent identity bootstrap. A fresh key is minted when none
    /// is supplied; an existing key returns the existing record
    /// untouched. The very first player also becomes the turn holder.
    pub async fn register(
        &self,
        display_name: &str,
        existing_key: Option<&str>,
    ) -> Result<Registration> {
        let display_name = display_name.trim();

        let key = match existing_key {
            Some(k) if !k.trim().is_empty() => k.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let players = PlayerStore::new(&self.storage);
        let name = if display_name.is_empty() {
            None
        } else {
            Some(display_name)
        };
        let player = players
            .get_or_create(&key, name, self.config.starting_balance)
            .await?;

        // Seeding the turn does not count a round
        PoolStore::new(&self.storage).seed_turn(&player.key).await?;

        tracing::info!("Player '{}' registered with key {}", player.display_name, player.key);
        let _ = self.events.send(GameEvent::PlayerJoined {
            player_key: player.key.clone(),
            display_name: player.display_name.clone(),
        });

        Ok(Registration {
            player_key: player.key,
            display_name: player.display_name,
            balance: player.balance,
        })
    }

    /// One full round: pre-check, charge, persona call, interpret,
    /// settle. Collaborator failures degrade into a loss result;
    /// only validation, funds and storage problems surface as errors.
    pub async fn chat(&self, player_key: &str, message: &str) -> Result<RoundResult> {
        if player_key.trim().is_empty() {
            return Err(EngineError::validation("player key is required"));
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(EngineError::validation("message must not be empty"));
        }

        let players = PlayerStore::new(&self.storage);
        let player = players
            .get(player_key)
            .await?
            .ok_or_else(|| EngineError::PlayerNotFound {
                key: player_key.to_string(),
            })?;

        // Pre-check, then charge. Not atomic with each other: a burst
        // from one player can overspend by at most one message cost.
        if player.balance < self.config.message_cost {
            return Err(EngineError::InsufficientFunds {
                need: self.config.message_cost,
                available: player.balance,
            });
        }
        players.debit(player_key, self.config.message_cost).await?;

        // Cost is charged for attempting, not for succeeding: nothing
        // past this point refunds the debit.
        let transcript = self.build_transcript(&player.display_name, message).await?;
        let reply = tokio::time::timeout(
            self.config.persona_timeout,
            self.persona.reply(&transcript),
        )
        .await;

        let (outcome, contribute) = match reply {
            Ok(Ok(raw)) => (self.interpreter.interpret(&raw), true),
            Ok(Err(e)) => {
                tracing::warn!("Persona failed for {}: {}", player_key, e);
                (degraded_outcome(), false)
            }
            Err(_) => {
                tracing::warn!(
                    "Persona timed out after {:?} for {}",
                    self.config.persona_timeout,
                    player_key
                );
                (degraded_outcome(), false)
            }
        };

        let (amount_won, new_balance, new_jackpot) = self
            .settle(player_key, message, &outcome, contribute)
            .await?;

        let _ = self.events.send(GameEvent::RoundSettled {
            player_key: player_key.to_string(),
            display_text: outcome.display_text.clone(),
            sentiment: outcome.sentiment,
            is_win: outcome.is_win,
            jackpot: new_jackpot,
        });
        if outcome.is_win {
            tracing::info!(
                "Player '{}' won the jackpot: {}",
                player.display_name,
                amount_won
            );
            let _ = self.events.send(GameEvent::JackpotWon {
                player_key: player_key.to_string(),
                display_name: player.display_name.clone(),
                amount: amount_won,
            });
        }

        // Presentation only; a failure here never touches the ledger
        let speech = match &self.speech {
            Some(synth) => match synth.synthesize(&outcome.display_text).await {
                Ok(clip) => Some(clip),
                Err(e) => {
                    tracing::warn!("Speech synthesis failed: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(RoundResult {
            display_text: outcome.display_text,
            sentiment: outcome.sentiment,
            is_win: outcome.is_win,
            amount_won,
            new_balance,
            new_jackpot,
            speech,
        })
    }

    /// Read-only snapshot, safe to poll.
    pub async fn status(&self, caller_key: Option<&str>) -> Result<GameStatus> {
        let players = PlayerStore::new(&self.storage).list_all().await?;
        let pool = PoolStore::new(&self.storage).read().await?;
        let recent = InteractionLog::new(&self.storage)
            .recent(self.config.history_depth)
            .await?;

        let current_turn_name = pool.current_turn_key.as_ref().and_then(|key| {
            players
                .iter()
                .find(|p| &p.key == key)
                .map(|p| p.display_name.clone())
        });
        let caller_balance = caller_key.and_then(|key| {
            players.iter().find(|p| p.key == key).map(|p| p.balance)
        });

        Ok(GameStatus {
            recent_messages: recent,
            current_turn_key: pool.current_turn_key,
            current_turn_name,
            caller_balance,
            jackpot: pool.jackpot,
            players,
        })
    }

    /// Administrative recovery, not part of the round flow.
    pub async fn reset_balance(&self, player_key: &str) -> Result<Amount> {
        let players = PlayerStore::new(&self.storage);
        if players.get(player_key).await?.is_none() {
            return Err(EngineError::PlayerNotFound {
                key: player_key.to_string(),
            });
        }
        players
            .reset_balance(player_key, self.config.starting_balance)
            .await
    }

    /// Groups the loss/win pool mutation, the log append and the turn
    /// advance into one SQLite transaction: either the whole settle
    /// lands or none of it does.
    async fn settle(
        &self,
        player_key: &str,
        message: &str,
        outcome: &RoundOutcome,
        contribute: bool,
    ) -> Result<(Amount, Amount, Amount)> {
        let mut conn = self.storage.get_connection().await;
        let tx = conn.transaction()?;

        let amount_won = if outcome.is_win {
            pool_store::apply_payout_and_reset(&tx, player_key, self.config.jackpot_seed)?
        } else {
            if contribute {
                pool_store::apply_increment_jackpot(&tx, self.config.loss_contribution)?;
            }
            Amount::ZERO
        };

        interaction_log::apply_append(
            &tx,
            player_key,
            message,
            &outcome.display_text,
            outcome.is_win,
        )?;
        pool_store::apply_advance_turn(&tx, player_key)?;

        let new_balance = player_store::current_balance(&tx, player_key)?;
        let new_jackpot = pool_store::query_pool(&tx)?.jackpot;

        tx.commit()?;
        Ok((amount_won, new_balance, new_jackpot))
    }

    /// System prompt, the last N interactions across all players as
    /// speaker-prefixed turns, then the current message with a note
    /// naming the addressee.
    async fn build_transcript(&self, display_name: &str, message: &str) -> Result<Vec<ChatTurn>> {
        let recent = InteractionLog::new(&self.storage)
            .recent(self.config.history_depth)
            .await?;
        let players = PlayerStore::new(&self.storage).list_all().await?;
        let name_of = |key: &str| {
            players
                .iter()
                .find(|p| p.key == key)
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| key.to_string())
        };

        let mut transcript = vec![ChatTurn::system(&self.system_prompt)];
        for record in &recent {
            transcript.push(ChatTurn::user(format!(
                "{}: {}",
                name_of(&record.player_key),
                record.message
            )));
            transcript.push(ChatTurn::assistant(&record.reply));
        }
        transcript.push(ChatTurn::user(format!(
            "{}: {}\n\n(System note: you are replying to '{}'.)",
            display_name, message, display_name
        )));

        Ok(transcript)
    }
}

fn degraded_outcome() -> RoundOutcome {
    RoundOutcome {
        display_text: PLACEHOLDER_REPLY.to_string(),
        sentiment: 0,
        is_win: false,
    }
}
