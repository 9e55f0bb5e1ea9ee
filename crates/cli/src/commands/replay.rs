//! `solace replay`: Feed agent commands through the command queue.

use solace_workflow::{BoardEntry, Command, CommandQueue, CoordinationBoard, QueueStats};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub async fn run(file: &Path) -> anyhow::Result<()> {
    let commands: Vec<Command> = super::read_json(file)?;
    let (stats, rejected, board) = replay(commands).await?;

    println!(
        "📨 Processed {} command(s), {} failed, {} rejected",
        stats.processed, stats.failed, rejected
    );
    println!("{}", serde_json::to_string_pretty(&board)?);
    Ok(())
}

pub(crate) async fn replay(
    commands: Vec<Command>,
) -> anyhow::Result<(QueueStats, usize, BTreeMap<String, BoardEntry>)> {
    let board = Arc::new(CoordinationBoard::new());
    let queue = CommandQueue::start(board.clone());

    let mut rejected = 0;
    for command in commands {
        if let Err(e) = queue.enqueue(command).await {
            warn!(error = %e, "Skipping invalid command");
            rejected += 1;
        }
    }
    let stats = queue.stop().await?;
    Ok((stats, rejected, board.snapshot().await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn valid_commands_land_on_the_board() {
        let commands: Vec<Command> = serde_json::from_value(json!([
            {"type": "update_context", "key": "focus", "value": "sleep",
             "source_agent": "journal", "target_agent": "coach"},
            {"type": "request_help", "issue": "", "priority": "high", "context": "x",
             "source_agent": "journal", "target_agent": "coach"}
        ]))
        .unwrap();

        let (stats, rejected, board) = replay(commands).await.unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(rejected, 1);
        assert_eq!(board["focus"].value, json!("sleep"));
    }
}
