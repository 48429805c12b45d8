pub mod command;
pub mod parse;

use crate::{
    ops::Operations,
    shell::{command::execute_command, parse::parse_command},
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use reedline::{
    DefaultCompleter, DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal,
};
use std::{error::Error, io::stdout, path::PathBuf};

const COMMANDS: [&str; 19] = [
    "help", "ls", "pwd", "cd", "mkdir", "rmdir", "touch", "rm", "ln", "mv", "cat", "write",
    "truncate", "chmod", "stat", "df", "format", "sync", "exit",
];

/// 运行交互式 shell，退出时卸载文件系统
pub fn start_shell(mut ops: Operations) -> Result<(), Box<dyn Error>> {
    welcome(&ops)?;

    let username = whoami::username();
    let hostname = whoami::fallible::hostname().unwrap_or_else(|_| "localhost".to_string());
    let mut current_dir = String::from("/");

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline
    let history_path = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chainfs_history");
    let completer = DefaultCompleter::new_with_wordlen(
        COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        2,
    );
    let mut line_editor = Reedline::create()
        .with_history(Box::new(FileBackedHistory::with_file(100, history_path)?))
        .with_completer(Box::new(completer));

    loop {
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(format!(
                "{}:{}",
                format!("{}@{}", username, hostname).green(),
                current_dir.blue()
            )),
            DefaultPromptSegment::Basic("ChainFS".bright_blue().bold().to_string()),
        );

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                let trimmed = buffer.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_command(trimmed) {
                    Some(cmd) => {
                        if let Err(e) = execute_command(&cmd, &mut ops, &mut current_dir) {
                            println!("{} {}", "❌ Error:".red().bold(), e);
                        }
                        if matches!(cmd, command::Command::Exit) {
                            break;
                        }
                    }
                    None => println!(
                        "{}",
                        "⚠️  Unknown command or bad arguments. Type 'help' for command list."
                            .yellow()
                    ),
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting ChainFS...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    ops.into_inner().unmount()?;
    println!("{}", "GoodBye!".bright_yellow());
    Ok(())
}

fn welcome(ops: &Operations) -> Result<(), Box<dyn Error>> {
    let fs = ops.fs();
    execute!(
        stdout(),
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!("Welcome to ChainFS v{}\n", env!("CARGO_PKG_VERSION"))),
        ResetColor
    )?;
    println!(
        "{}",
        format!(
            "📁 {} blocks, {} free blocks, {} free inodes",
            fs.layout().total_blocks,
            fs.free_blocks(),
            fs.free_inodes()
        )
        .bright_black()
    );
    Ok(())
}
