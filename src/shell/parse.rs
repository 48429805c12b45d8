use crate::shell::command::Command;

fn one(args: &[&str], build: fn(String) -> Command) -> Option<Command> {
    args.first().map(|&arg| build(arg.to_string()))
}

fn two(args: &[&str], build: fn(String, String) -> Command) -> Option<Command> {
    match args {
        [a, b, ..] => Some(build(a.to_string(), b.to_string())),
        _ => None,
    }
}

pub fn parse_command(input: &str) -> Option<Command> {
    let tokens: Vec<&str> = input.trim().split_ascii_whitespace().collect();
    let (&cmd, args) = tokens.split_first()?;

    match cmd {
        "help" => Some(Command::Help),
        "ls" => Some(Command::Ls(args.first().map(|dir| dir.to_string()))),
        "pwd" => Some(Command::Pwd),
        "cd" => one(args, Command::Cd),
        "mkdir" => one(args, Command::Mkdir),
        "rmdir" => one(args, Command::Rmdir),
        "touch" => one(args, Command::Touch),
        "rm" => one(args, Command::Rm),
        "ln" => two(args, Command::Ln),
        "mv" => two(args, Command::Mv),
        "cat" => one(args, Command::Cat),
        "write" => {
            if args.len() >= 2 {
                Some(Command::Write(args[0].to_string(), args[1..].join(" ")))
            } else {
                None
            }
        }
        "truncate" => match args {
            [file, size, ..] => size
                .parse()
                .ok()
                .map(|size| Command::Truncate(file.to_string(), size)),
            _ => None,
        },
        "chmod" => match args {
            [mode, file, ..] => u32::from_str_radix(mode, 8)
                .ok()
                .map(|mode| Command::Chmod(mode, file.to_string())),
            _ => None,
        },
        "stat" => one(args, Command::Stat),
        "df" => Some(Command::Df),
        "format" => Some(Command::Format),
        "sync" => Some(Command::Sync),
        "exit" | "quit" => Some(Command::Exit),
        _ => None,
    }
}
