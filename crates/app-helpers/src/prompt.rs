use std::io::{self, BufRead, Write};

use app_logger::warn;

fn read_line() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;

    Ok(line)
}

/// Ask a yes/no question on the terminal. Anything but `y`/`yes` is a no.
///
/// Without a terminal on stdin there is nobody to ask, so the answer is no.
pub fn confirm(question: &str) -> anyhow::Result<bool> {
    if atty::isnt(atty::Stream::Stdin) {
        warn!("stdin is not a terminal, assuming \"no\" for {question:?}");
        return Ok(false);
    }

    print!("{question} (y/N): ");
    io::stdout().flush()?;

    Ok(is_yes(&read_line()?))
}

/// Block until enter is pressed. Returns right away without a terminal.
pub fn wait_for_enter(message: &str) -> anyhow::Result<()> {
    if atty::isnt(atty::Stream::Stdin) {
        return Ok(());
    }

    print!("{message}");
    io::stdout().flush()?;
    read_line()?;

    Ok(())
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_y_and_yes_confirm() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
