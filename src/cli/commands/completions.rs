//! Completions command - print shell completion scripts

use crate::cli::args::{Cli, CompletionsArgs};
use clap::CommandFactory;
use std::io;

/// Execute the completions command
pub fn execute(args: CompletionsArgs) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(args.shell, &mut command, name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_complete::Shell;

    #[test]
    fn generates_bash_script() {
        let mut command = Cli::command();
        let mut buf = Vec::new();
        clap_complete::generate(Shell::Bash, &mut command, "polybuild", &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("polybuild"));
        assert!(script.contains("signature"));
    }
}
