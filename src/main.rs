use greetings::cli;

fn main() -> anyhow::Result<()> {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use greetings::cli::{Command, GreetingsCli};

    #[test]
    fn parallel_command_defaults_to_four() {
        let cli = GreetingsCli::parse_from(["greetings", "parallel", "World"]);
        assert_eq!(
            cli.command(),
            &Command::Parallel {
                name: "World".into(),
                count: 4
            }
        );
    }

    #[test]
    fn print_command_defaults_to_world() {
        let cli = GreetingsCli::parse_from(["greetings", "print"]);
        match cli.command() {
            Command::Print { name } => assert_eq!(name, "World"),
            other => panic!("expected print command, got {other:?}"),
        }
    }

    #[test]
    fn greet_takes_first_and_last_name() {
        let cli = GreetingsCli::parse_from(["greetings", "greet", "John", "Smith", "--metrics"]);
        assert_eq!(
            cli.command(),
            &Command::Greet {
                first: "John".into(),
                last: "Smith".into()
            }
        );
    }
}
