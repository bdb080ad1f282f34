use mirror_sync::AppConfig;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

pub fn prompt_value(prompt: &str) -> io::Result<String> {
    let mut input = String::new();
    print!("{} ", prompt);
    io::stdout().flush()?;
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Ask for whatever the configuration is still missing. Does nothing when
/// stdin is not a terminal; validation reports the gaps instead.
pub fn fill_missing(config: &mut AppConfig, want_interval: bool) -> io::Result<()> {
    if !io::stdin().is_terminal() {
        return Ok(());
    }

    if config.source_path.is_none() {
        config.source_path = non_empty(prompt_value("Enter source folder path:")?);
    }
    if config.replica_path.is_none() {
        config.replica_path = non_empty(prompt_value(
            "Enter replica folder path (new folder will be created if it does not exist):",
        )?);
    }
    if config.log_file_path.is_none() {
        config.log_file_path = non_empty(prompt_value(
            "Enter log file path (new file will be created if it does not exist):",
        )?);
    }
    while want_interval && config.interval_secs.is_none() {
        let input = prompt_value("Enter the synchronization interval in seconds:")?;
        match input.parse::<u64>() {
            Ok(secs) => config.interval_secs = Some(secs),
            Err(_) => println!("'{}' is not a whole number of seconds", input),
        }
    }

    Ok(())
}

fn non_empty(input: String) -> Option<PathBuf> {
    if input.is_empty() {
        None
    } else {
        Some(PathBuf::from(input))
    }
}

/// Block until a line (or EOF) arrives on stdin.
pub fn wait_for_enter() -> io::Result<()> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(())
}
