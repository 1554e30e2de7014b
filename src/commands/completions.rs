use clap::CommandFactory;
use clap_complete::Shell;
use eyre::Result;
use std::io::{self, Write};

use crate::cli::Cli;

pub fn run(shell: Shell) -> Result<()> {
    write_completions(shell, &mut io::stdout().lock())
}

fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, out);
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_cover_subcommands() {
        let mut buf = Vec::new();
        write_completions(Shell::Bash, &mut buf).unwrap();
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("moltlog"));
        for sub in ["run", "persona", "memory", "doctor"] {
            assert!(script.contains(sub), "missing {}", sub);
        }
    }
}
