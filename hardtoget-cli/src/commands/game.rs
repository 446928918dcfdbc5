use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Input;
use hardtoget_core::{GameEngine, Result, RoundResult};

pub async fn handle_register(
    engine: &GameEngine,
    nickname: &str,
    key: Option<&str>,
) -> Result<()> {
    let registration = engine.register(nickname, key).await?;

    println!("Registered '{}'", registration.display_name);
    println!("  Player key: {}", registration.player_key);
    println!("  Balance: {}", registration.balance);

    Ok(())
}

pub async fn handle_chat(engine: &GameEngine, key: &str, message: &str) -> Result<()> {
    let result = engine.chat(key, message).await?;
    print_round(&result);
    Ok(())
}

pub async fn handle_status(engine: &GameEngine, key: Option<&str>) -> Result<()> {
    let status = engine.status(key).await?;

    println!("Jackpot: {}", status.jackpot);
    println!(
        "Current turn: {}",
        status.current_turn_name.as_deref().unwrap_or("nobody yet")
    );
    if let Some(balance) = status.caller_balance {
        println!("Your balance: {}", balance);
    }

    if !status.players.is_empty() {
        println!();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Player", "Balance", "Messages", "Joined"]);
        for player in &status.players {
            table.add_row(vec![
                player.display_name.clone(),
                player.balance.to_string(),
                player.messages_count.to_string(),
                player.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]);
        }
        println!("{table}");
    }

    if !status.recent_messages.is_empty() {
        println!();
        println!("Recent rounds:");
        for record in &status.recent_messages {
            let flag = if record.is_win { " [WIN]" } else { "" };
            println!("  > {}", record.message);
            println!("  < {}{}", record.reply, flag);
        }
    }

    Ok(())
}

pub async fn handle_reset_balance(engine: &GameEngine, key: &str) -> Result<()> {
    let balance = engine.reset_balance(key).await?;
    println!("Balance restored to {}", balance);
    Ok(())
}

/// Register (prompting for a nickname if none was given) and keep
/// chatting until the player quits or takes the jackpot.
pub async fn handle_play(engine: &GameEngine, nickname: Option<&str>) -> Result<()> {
    let nickname = match nickname {
        Some(n) => n.to_string(),
        None => Input::new()
            .with_prompt("Your name")
            .interact_text()
            .map_err(|e| hardtoget_core::EngineError::validation(e.to_string()))?,
    };

    let registration = engine.register(&nickname, None).await?;
    let status = engine.status(Some(&registration.player_key)).await?;
    println!(
        "Welcome, {}. Balance: {}. Jackpot: {}.",
        registration.display_name, registration.balance, status.jackpot
    );
    println!("Type your messages; 'quit' to leave.");

    loop {
        let message: String = Input::new()
            .with_prompt(&nickname)
            .interact_text()
            .map_err(|e| hardtoget_core::EngineError::validation(e.to_string()))?;
        if message.trim().eq_ignore_ascii_case("quit") {
            break;
        }

        match engine.chat(&registration.player_key, &message).await {
            Ok(result) => {
                let won = result.is_win;
                print_round(&result);
                if won {
                    break;
                }
            }
            Err(hardtoget_core::EngineError::InsufficientFunds { need, available }) => {
                println!("Out of credit (need {}, have {}).", need, available);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn print_round(result: &RoundResult) {
    println!("{}", result.display_text);
    println!("  Sentiment: {}/100", result.sentiment);
    if result.is_win {
        println!("  SHE SAID YES! You take the jackpot: {}", result.amount_won);
    }
    println!(
        "  Balance: {} | Jackpot: {}",
        result.new_balance, result.new_jackpot
    );
}
