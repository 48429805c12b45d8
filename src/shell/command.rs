use colored::*;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::{error::Error, io, time::Duration};

use crate::{
    fs::{path::components, Mode, Stat},
    ops::Operations,
    utils::{current_timestamp, format_timestamp},
};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Ls(Option<String>),
    Pwd,
    Cd(String),
    Mkdir(String),
    Rmdir(String),
    Touch(String),
    Rm(String),
    Ln(String, String),
    Mv(String, String),
    Cat(String),
    Write(String, String),
    Truncate(String, u64),
    Chmod(u32, String),
    Stat(String),
    Df,
    Format,
    Sync,
    Exit,
}

/// 把相对路径拼到当前目录上，并处理 `.` 和 `..`
pub fn absolute(current_dir: &str, arg: &str) -> String {
    let mut parts: Vec<&str> = if arg.starts_with('/') {
        Vec::new()
    } else {
        components(current_dir).collect()
    };
    for component in components(arg) {
        match component {
            "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    format!("/{}", parts.join("/"))
}

// 负的 errno 转成带系统描述的错误
fn check(rv: i32) -> Result<i32, Box<dyn Error>> {
    if rv < 0 {
        Err(Box::new(io::Error::from_raw_os_error(-rv)))
    } else {
        Ok(rv)
    }
}

fn stat_of(ops: &mut Operations, path: &str) -> Result<Stat, Box<dyn Error>> {
    let mut st = Stat::default();
    check(ops.getattr(path, &mut st))?;
    Ok(st)
}

pub fn execute_command(
    cmd: &Command,
    ops: &mut Operations,
    current_dir: &mut String,
) -> Result<(), Box<dyn Error>> {
    let cwd = current_dir.clone();
    let at = |arg: &str| absolute(&cwd, arg);

    match cmd {
        Command::Help => print_help(),
        Command::Ls(dir) => {
            let path = dir.as_deref().map_or_else(|| cwd.clone(), at);
            let mut entries = Vec::new();
            check(ops.readdir(&path, |name, st| {
                if name != "." {
                    entries.push((name.to_string(), st.clone()));
                }
            }))?;
            for (name, st) in entries {
                if st.is_dir() {
                    println!("📁  {}", name.blue().bold());
                } else {
                    println!("📄  {:<32} {}", name, format!("{} B", st.size).bright_black());
                }
            }
        }
        Command::Pwd => println!("📍 {}", current_dir.cyan()),
        Command::Cd(dir) => {
            let path = at(dir);
            if !stat_of(ops, &path)?.is_dir() {
                return Err(Box::new(io::Error::from_raw_os_error(libc::ENOTDIR)));
            }
            *current_dir = path;
        }
        Command::Mkdir(dir) => {
            let path = at(dir);
            check(ops.mkdir(&path, 0o755))?;
            println!("✅ Created directory: {}", path.green());
        }
        Command::Rmdir(dir) => {
            check(ops.rmdir(&at(dir)))?;
        }
        Command::Touch(file) => {
            let path = at(file);
            if ops.open(&path) == 0 {
                let now = current_timestamp();
                check(ops.utimens(&path, [now, now]))?;
            } else {
                check(ops.mknod(&path, Mode::file(0o644).bits()))?;
                println!("📝 Created file: {}", path.green());
            }
        }
        Command::Rm(file) => {
            let path = at(file);
            check(ops.unlink(&path))?;
            println!("❌ Deleted: {}", path.red());
        }
        Command::Ln(target, link) => {
            let (target, link) = (at(target), at(link));
            check(ops.link(&target, &link))?;
            println!("🔗 {} -> {}", link.green(), target);
        }
        Command::Mv(from, to) => {
            let (from, to) = (at(from), at(to));
            check(ops.rename(&from, &to))?;
            println!("🚚 {} => {}", from, to.green());
        }
        Command::Cat(file) => {
            let path = at(file);
            let size = stat_of(ops, &path)?.size;
            let mut buf = vec![0u8; size as usize];
            let n = check(ops.read(&path, &mut buf, 0))? as usize;
            println!("{}", String::from_utf8_lossy(&buf[..n]));
        }
        Command::Write(file, content) => {
            let path = at(file);
            if ops.open(&path) != 0 {
                check(ops.mknod(&path, Mode::file(0o644).bits()))?;
            }
            check(ops.truncate(&path, 0))?;
            let n = check(ops.write(&path, content.as_bytes(), 0))?;
            println!("✏️  Wrote {} bytes to {}", n, path.cyan());
        }
        Command::Truncate(file, size) => {
            let size = i64::try_from(*size)
                .map_err(|_| io::Error::from_raw_os_error(libc::EFBIG))?;
            check(ops.truncate(&at(file), size))?;
        }
        Command::Chmod(mode, file) => {
            check(ops.chmod(&at(file), *mode))?;
        }
        Command::Stat(file) => {
            let path = at(file);
            let st = stat_of(ops, &path)?;
            println!(
                "{}\n{}: {}\n{}: {}\n{}: {}\n{}: {} bytes ({} blocks)\n\
                 {}: {:06o}\n{}: {}\n{}: {}\n{}: {}\n{}: {}",
                "📊 File Info".bright_yellow().bold(),
                "Name".blue(),
                path,
                "Type".blue(),
                if st.is_dir() { "Directory" } else { "File" },
                "Inode".blue(),
                st.inum,
                "Size".blue(),
                st.size,
                st.blocks,
                "Mode".blue(),
                st.mode,
                "Links".blue(),
                st.refs,
                "Access".blue(),
                format_timestamp(st.atime),
                "Modify".blue(),
                format_timestamp(st.mtime),
                "Change".blue(),
                format_timestamp(st.ctime),
            );
        }
        Command::Df => {
            let fs = ops.fs();
            let layout = fs.layout();
            println!(
                "{}\n{}: {} / {} free\n{}: {} / {} free",
                "💽 Disk Usage".bright_yellow().bold(),
                "Data blocks".blue(),
                fs.free_blocks(),
                layout.data_blocks(),
                "Inodes".blue(),
                fs.free_inodes(),
                layout.total_inodes,
            );
        }
        Command::Format => {
            let confirmed = Confirm::new()
                .with_prompt("Erase everything on the disk?")
                .default(false)
                .interact()?;
            if !confirmed {
                println!("{}", "Format cancelled.".yellow());
                return Ok(());
            }

            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(Duration::from_millis(80));
            pb.set_message("💾 Formatting virtual disk...");
            ops.fs_mut().format()?;
            pb.finish_with_message("✅ Disk formatted successfully!");
            *current_dir = "/".to_string();
        }
        Command::Sync => {
            check(ops.sync())?;
            println!("{}", "💾 Synced.".green());
        }
        Command::Exit => println!("{}", "👋 Exiting ChainFS shell...".yellow().bold()),
    }

    Ok(())
}

fn print_help() {
    println!("{}", "📘 ChainFS Commands".bright_cyan().bold());
    println!(
        "{}",
        "
  ls [dir]              List directory
  pwd                   Print current path
  cd <dir>              Change directory
  mkdir <dir>           Create directory
  rmdir <dir>           Remove directory (not supported)
  touch <file>          Create file or update its times
  rm <path>             Remove a name
  ln <target> <link>    Create a hard link
  mv <from> <to>        Rename or move
  cat <file>            Print file content
  write <file> <text>   Replace file content
  truncate <file> <n>   Set file size
  chmod <octal> <path>  Change permission bits
  stat <path>           Show file info
  df                    Show free blocks and inodes
  format                Format virtual disk
  sync                  Write everything to the image
  help                  Show this help message
  exit                  Quit the shell
"
        .bright_black()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{disk::MemDisk, fs::FileSystem};

    fn ops() -> Operations {
        Operations::new(FileSystem::mount(Box::new(MemDisk::new(64))).unwrap())
    }

    #[test]
    fn absolute_paths() {
        assert_eq!(absolute("/", "a"), "/a");
        assert_eq!(absolute("/a/b", "c"), "/a/b/c");
        assert_eq!(absolute("/a/b", ".."), "/a");
        assert_eq!(absolute("/a", "../../x"), "/x");
        assert_eq!(absolute("/a", "/y/./z"), "/y/z");
        assert_eq!(absolute("/a", "."), "/a");
    }

    #[test]
    fn cd_into_directory_only() {
        let mut ops = ops();
        let mut cwd = "/".to_string();
        execute_command(&Command::Mkdir("d".into()), &mut ops, &mut cwd).unwrap();
        execute_command(&Command::Touch("f".into()), &mut ops, &mut cwd).unwrap();

        assert!(execute_command(&Command::Cd("f".into()), &mut ops, &mut cwd).is_err());
        assert!(execute_command(&Command::Cd("nope".into()), &mut ops, &mut cwd).is_err());
        execute_command(&Command::Cd("d".into()), &mut ops, &mut cwd).unwrap();
        assert_eq!(cwd, "/d");
    }

    #[test]
    fn write_replaces_content() {
        let mut ops = ops();
        let mut cwd = "/".to_string();
        execute_command(&Command::Write("f".into(), "long text".into()), &mut ops, &mut cwd)
            .unwrap();
        execute_command(&Command::Write("f".into(), "short".into()), &mut ops, &mut cwd).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(ops.read("/f", &mut buf, 0), 5);
        assert_eq!(&buf[..5], b"short");
    }

    #[test]
    fn rmdir_reports_error() {
        let mut ops = ops();
        let mut cwd = "/".to_string();
        execute_command(&Command::Mkdir("d".into()), &mut ops, &mut cwd).unwrap();
        assert!(execute_command(&Command::Rmdir("d".into()), &mut ops, &mut cwd).is_err());
    }
}
